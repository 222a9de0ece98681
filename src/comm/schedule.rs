//! Halo-exchange schedules for the solid and fluid subdomains.
//!
//! The mesher records only the *receive* side of each rank's halo
//! relationships: the peer list, the per-peer shared-node counts, and the
//! local node index each message slot maps to. The send side is derived by
//! [`derive_send`]. The schedules built here are reused unchanged on every
//! time step of the simulation; nothing in this module performs any
//! communication, it only prepares buffers and handle slots for the solver's
//! exchange step.
//!
//! Per-peer index lists are ragged by construction (`Vec` per peer), so no
//! caller ever has to remember to bound a loop by the peer's message size —
//! slots beyond it simply do not exist.

use crate::comm::Communicator;
use crate::error::AxipartError;
use crate::io::cursor::DbCursor;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Subdomain a schedule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    Solid,
    Fluid,
}

impl Domain {
    /// Physical components exchanged per shared node: a displacement vector
    /// in the solid, a scalar potential in the fluid.
    pub const fn components(self) -> usize {
        match self {
            Domain::Solid => 3,
            Domain::Fluid => 1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Domain::Solid => "solid",
            Domain::Fluid => "fluid",
        }
    }
}

/// Shared nodes with one neighbor rank, in message-slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerLink {
    /// Neighbor process identifier.
    pub rank: usize,
    /// Local node index participating in each slot of the message.
    pub nodes: Vec<usize>,
}

impl PeerLink {
    /// Count of shared nodes with this peer.
    #[inline]
    pub fn message_size(&self) -> usize {
        self.nodes.len()
    }
}

/// One direction of a halo exchange: peers, sizes, and slot→node maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    domain: Domain,
    links: Vec<PeerLink>,
}

impl Schedule {
    /// Assemble a schedule from per-peer links. Links keep file order; the
    /// mesher writes peers in a deterministic order and both sides of every
    /// pairing rely on it.
    pub fn new(domain: Domain, links: Vec<PeerLink>) -> Self {
        Self { domain, links }
    }

    #[inline]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    #[inline]
    pub fn links(&self) -> &[PeerLink] {
        &self.links
    }

    #[inline]
    pub fn peer_count(&self) -> usize {
        self.links.len()
    }

    /// Largest per-peer message size; 0 when there are no peers.
    pub fn max_message_size(&self) -> usize {
        self.links
            .iter()
            .map(PeerLink::message_size)
            .max()
            .unwrap_or(0)
    }

    /// Total shared nodes across all peers.
    pub fn total_halo_nodes(&self) -> usize {
        self.links.iter().map(PeerLink::message_size).sum()
    }
}

/// Derive the send schedule from the receive schedule.
///
/// The decomposition guarantees symmetric halos: if rank A receives from B,
/// A also sends to B with the identical node ordering, so the send side is a
/// structural copy of the receive side. The copy is deep — the two schedules
/// own independent storage and can later diverge in buffer contents without
/// aliasing. If an upstream partitioner ever produced asymmetric halos this
/// derivation would be wrong; the database format carries no second index map
/// to describe that case.
pub fn derive_send(recv: &Schedule) -> Schedule {
    Schedule {
        domain: recv.domain,
        links: recv.links.clone(),
    }
}

/// One reusable, fixed-capacity message buffer per peer.
///
/// Each buffer holds exactly `message_size * components` values — never
/// `max_message_size`, so no unused slot is ever stored or transmitted. The
/// loader guarantees sizing and initial zeroing; exclusive-write discipline
/// across time steps is the consuming solver's contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeBuffers {
    slots: Vec<Vec<f64>>,
}

impl ExchangeBuffers {
    /// Allocate zeroed buffers matching a schedule's per-peer sizes.
    pub fn for_schedule(schedule: &Schedule) -> Self {
        let components = schedule.domain().components();
        let slots = schedule
            .links()
            .iter()
            .map(|link| vec![0.0; link.message_size() * components])
            .collect();
        Self { slots }
    }

    #[inline]
    pub fn peer_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn peer(&self, idx: usize) -> &[f64] {
        &self.slots[idx]
    }

    #[inline]
    pub fn peer_mut(&mut self, idx: usize) -> &mut [f64] {
        &mut self.slots[idx]
    }
}

/// Complete exchange state for one subdomain: mirrored schedules plus
/// independently owned send/receive scratch buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct HaloExchange {
    pub recv: Schedule,
    pub send: Schedule,
    pub recv_buffers: ExchangeBuffers,
    pub send_buffers: ExchangeBuffers,
}

impl HaloExchange {
    /// Build the full exchange state from the receive-side schedule.
    pub fn from_receive(recv: Schedule) -> Self {
        let send = derive_send(&recv);
        let recv_buffers = ExchangeBuffers::for_schedule(&recv);
        let send_buffers = ExchangeBuffers::for_schedule(&send);
        Self {
            recv,
            send,
            recv_buffers,
            send_buffers,
        }
    }

    #[inline]
    pub fn domain(&self) -> Domain {
        self.recv.domain()
    }

    #[inline]
    pub fn peer_count(&self) -> usize {
        self.recv.peer_count()
    }
}

/// Pre-reserved asynchronous-operation slots, one per peer per direction.
///
/// The loader only reserves these; the solver's exchange step fills them with
/// live handles each time step and drains them before reusing the buffers.
pub struct ExchangeHandles<C: Communicator> {
    pub send: Vec<Option<C::SendHandle>>,
    pub recv: Vec<Option<C::RecvHandle>>,
}

impl<C: Communicator> std::fmt::Debug for ExchangeHandles<C>
where
    C::SendHandle: std::fmt::Debug,
    C::RecvHandle: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeHandles")
            .field("send", &self.send)
            .field("recv", &self.recv)
            .finish()
    }
}

impl<C: Communicator> ExchangeHandles<C> {
    pub fn reserve(exchange: &HaloExchange) -> Self {
        let n = exchange.peer_count();
        Self {
            send: (0..n).map(|_| None).collect(),
            recv: (0..n).map(|_| None).collect(),
        }
    }

    #[inline]
    pub fn peer_count(&self) -> usize {
        debug_assert_eq!(self.send.len(), self.recv.len());
        self.recv.len()
    }
}

/// Read one communication block from the database stream.
///
/// Returns `Ok(None)` when the block declares zero peers: an isolated rank
/// legitimately has no exchange state at all, not zero-length placeholders.
/// Every local node index is validated against `npoin`. Any truncation,
/// negative or zero message size, or duplicated peer is fatal corruption —
/// a malformed schedule would silently desynchronize the distributed solve.
pub fn read_halo_exchange<R: Read>(
    cursor: &mut DbCursor<R>,
    domain: Domain,
    npoin: usize,
) -> Result<Option<HaloExchange>, AxipartError> {
    let peer_count = cursor.read_count("peer count")?;
    if peer_count == 0 {
        log::debug!("{} halo: no neighbors", domain.label());
        return Ok(None);
    }

    let peers = cursor.read_index_vec(peer_count, i32::MAX as usize, "peer ranks")?;
    if let Some(&dup) = peers.iter().duplicates().next() {
        return Err(AxipartError::DuplicatePeer {
            peer: dup,
            domain: domain.label(),
        });
    }

    let raw_sizes = cursor.read_i32_vec(peer_count, "message sizes")?;
    let mut links = Vec::with_capacity(peer_count);
    for (&peer, &size) in peers.iter().zip(&raw_sizes) {
        if size <= 0 {
            return Err(AxipartError::InvalidMessageSize {
                peer,
                size: size as i64,
            });
        }
        links.push(PeerLink {
            rank: peer,
            nodes: Vec::with_capacity(size as usize),
        });
    }

    // Index maps are stored grouped per peer, in peer-list order.
    for (link, &size) in links.iter_mut().zip(&raw_sizes) {
        link.nodes = cursor.read_index_vec(size as usize, npoin, "halo node indices")?;
    }

    let recv = Schedule::new(domain, links);
    log::debug!(
        "{} halo: {} peers, {} shared nodes, max message {}",
        domain.label(),
        recv.peer_count(),
        recv.total_halo_nodes(),
        recv.max_message_size()
    );
    Ok(Some(HaloExchange::from_receive(recv)))
}
