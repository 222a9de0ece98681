//! Advisory cross-rank aggregation of mesh metrics.
//!
//! Everything here is derived, never authoritative: reductions exist so the
//! run log shows global totals, and their absence would not change the
//! correctness of the loaded partition or its schedules.

use crate::comm::schedule::HaloExchange;
use crate::comm::{Communicator, ReduceOp};
use crate::mesh::MeshPartition;
use serde::{Deserialize, Serialize};

/// Globally reduced mesh metrics, identical on every rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalDiagnostics {
    pub ranks: u64,
    pub total_axial_elements: u64,
    pub solid_axial_elements: u64,
    pub fluid_axial_elements: u64,
    pub solid_halo_nodes: u64,
    pub fluid_halo_nodes: u64,
    pub hmin: f64,
    pub hmax: f64,
}

impl GlobalDiagnostics {
    /// Reduce local metrics across all ranks and log a summary.
    pub fn gather<C: Communicator>(
        comm: &C,
        mesh: &MeshPartition,
        solid: Option<&HaloExchange>,
        fluid: Option<&HaloExchange>,
    ) -> Self {
        let halo_nodes = |ex: Option<&HaloExchange>| {
            ex.map_or(0, |e| e.recv.total_halo_nodes() as u64)
        };
        let diag = Self {
            ranks: comm.size() as u64,
            total_axial_elements: comm
                .allreduce_u64(mesh.axial.total().len() as u64, ReduceOp::Sum),
            solid_axial_elements: comm
                .allreduce_u64(mesh.axial.solid().len() as u64, ReduceOp::Sum),
            fluid_axial_elements: comm
                .allreduce_u64(mesh.axial.fluid().len() as u64, ReduceOp::Sum),
            solid_halo_nodes: comm.allreduce_u64(halo_nodes(solid), ReduceOp::Sum),
            fluid_halo_nodes: comm.allreduce_u64(halo_nodes(fluid), ReduceOp::Sum),
            hmin: comm.allreduce_f64(mesh.params.hmin_global, ReduceOp::Min),
            hmax: comm.allreduce_f64(mesh.params.hmax_global, ReduceOp::Max),
        };
        if comm.rank() == 0 {
            log::info!(
                "global mesh: {} axial elements ({} solid / {} fluid), {} solid + {} fluid halo nodes, h in [{:.3e}, {:.3e}]",
                diag.total_axial_elements,
                diag.solid_axial_elements,
                diag.fluid_axial_elements,
                diag.solid_halo_nodes,
                diag.fluid_halo_nodes,
                diag.hmin,
                diag.hmax
            );
        }
        diag
    }
}
