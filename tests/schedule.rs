//! Halo-exchange schedule construction from communication blocks.

mod util;

use axipart::prelude::*;
use std::io::Cursor;

const NPOIN: usize = 13;

fn read_block(bytes: Vec<u8>, domain: Domain) -> Result<Option<HaloExchange>, AxipartError> {
    let mut db = MeshDatabase::from_reader(Cursor::new(bytes), "block");
    db.read_halo(domain, NPOIN)
}

#[test]
fn one_peer_block_builds_mirrored_exchange() {
    let recv = util::one_peer_solid();
    let mut w = DbWriter::new(Vec::new());
    w.write_halo_block(Some(&recv)).unwrap();

    let ex = read_block(w.into_inner(), Domain::Solid).unwrap().unwrap();
    assert_eq!(ex.recv, recv);
    assert_eq!(ex.send, ex.recv);
    assert_eq!(ex.peer_count(), 1);
    assert_eq!(ex.recv.links()[0].nodes, vec![2, 5, 9]);

    // 3 shared nodes * 3 displacement components, zero-initialized.
    assert_eq!(ex.recv_buffers.peer(0).len(), 9);
    assert_eq!(ex.send_buffers.peer(0).len(), 9);
    assert!(ex.recv_buffers.peer(0).iter().all(|&v| v == 0.0));

    let handles = ExchangeHandles::<NoComm>::reserve(&ex);
    assert_eq!(handles.peer_count(), 1);
}

#[test]
fn send_buffers_do_not_alias_recv_buffers() {
    let recv = util::one_peer_solid();
    let mut w = DbWriter::new(Vec::new());
    w.write_halo_block(Some(&recv)).unwrap();

    let mut ex = read_block(w.into_inner(), Domain::Solid).unwrap().unwrap();
    ex.send_buffers.peer_mut(0)[0] = 42.0;
    assert_eq!(ex.recv_buffers.peer(0)[0], 0.0);
}

#[test]
fn zero_peer_block_yields_no_exchange() {
    let mut w = DbWriter::new(Vec::new());
    w.write_halo_block(None).unwrap();
    assert!(read_block(w.into_inner(), Domain::Fluid).unwrap().is_none());
}

#[test]
fn duplicate_peer_is_corrupt() {
    let mut w = DbWriter::new(Vec::new());
    w.write_count(2).unwrap();
    w.write_count(1).unwrap();
    w.write_count(1).unwrap(); // same peer twice
    w.write_count(1).unwrap();
    w.write_count(1).unwrap();
    w.write_index_slice(&[0, 1]).unwrap();

    let err = read_block(w.into_inner(), Domain::Solid).unwrap_err();
    assert!(matches!(err, AxipartError::DuplicatePeer { peer: 1, .. }));
    assert_eq!(err.class(), FailureClass::CorruptDatabase);
}

#[test]
fn zero_message_size_is_corrupt() {
    let mut w = DbWriter::new(Vec::new());
    w.write_count(1).unwrap();
    w.write_count(4).unwrap(); // peer rank
    w.write_count(0).unwrap(); // message size

    let err = read_block(w.into_inner(), Domain::Solid).unwrap_err();
    assert!(matches!(
        err,
        AxipartError::InvalidMessageSize { peer: 4, size: 0 }
    ));
}

#[test]
fn negative_message_size_is_corrupt() {
    let mut w = DbWriter::new(Vec::new());
    w.write_count(1).unwrap();
    w.write_count(4).unwrap();
    w.write_i32(-2).unwrap();

    let err = read_block(w.into_inner(), Domain::Solid).unwrap_err();
    assert!(matches!(
        err,
        AxipartError::InvalidMessageSize { peer: 4, size: -2 }
    ));
}

#[test]
fn out_of_range_node_index_is_corrupt() {
    let recv = Schedule::new(
        Domain::Solid,
        vec![PeerLink {
            rank: 1,
            nodes: vec![2, NPOIN], // one past the last valid node
        }],
    );
    let mut w = DbWriter::new(Vec::new());
    w.write_halo_block(Some(&recv)).unwrap();

    let err = read_block(w.into_inner(), Domain::Solid).unwrap_err();
    assert!(matches!(err, AxipartError::IndexOutOfRange { .. }));
}

#[test]
fn truncated_block_is_corrupt() {
    let mut w = DbWriter::new(Vec::new());
    w.write_halo_block(Some(&util::one_peer_solid())).unwrap();
    let mut bytes = w.into_inner();
    bytes.truncate(bytes.len() - 2);

    let err = read_block(bytes, Domain::Solid).unwrap_err();
    assert!(matches!(err, AxipartError::Truncated { .. }));
}

#[test]
fn peer_order_is_preserved_from_the_stream() {
    let recv = Schedule::new(
        Domain::Solid,
        vec![
            PeerLink {
                rank: 5,
                nodes: vec![1],
            },
            PeerLink {
                rank: 0,
                nodes: vec![3, 4],
            },
            PeerLink {
                rank: 2,
                nodes: vec![7],
            },
        ],
    );
    let mut w = DbWriter::new(Vec::new());
    w.write_halo_block(Some(&recv)).unwrap();

    let ex = read_block(w.into_inner(), Domain::Solid).unwrap().unwrap();
    let ranks: Vec<usize> = ex.recv.links().iter().map(|l| l.rank).collect();
    assert_eq!(ranks, vec![5, 0, 2]);
    assert_eq!(ex.recv.max_message_size(), 2);
    assert_eq!(ex.recv.total_halo_nodes(), 4);
}
