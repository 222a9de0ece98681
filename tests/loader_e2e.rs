//! Full pipeline runs against on-disk databases, single rank.

mod util;

use axipart::prelude::*;
use serial_test::serial;
use util::{one_peer_solid, sample_raw, temp_dir, write_rank_db};

#[test]
fn loads_solid_partition_end_to_end() {
    let dir = temp_dir("solid");
    write_rank_db(&dir, 0, &sample_raw(false), Some(&one_peer_solid()), None);

    let ctx = load_partition(&LoaderConfig::new(&dir), &BuiltinCatalog, &NoComm).unwrap();

    // Axis nodes of element 0 (partition nodes 0, 6, 7) are exactly zero
    // despite the rounding noise in the file.
    assert_eq!(ctx.mesh.coords.s(0), 0.0);
    assert_eq!(ctx.mesh.coords.s(6), 0.0);
    assert_eq!(ctx.mesh.coords.s(7), 0.0);
    assert_eq!(ctx.mesh.coords.s(1), 1.0);

    assert_eq!(ctx.mesh.axial.solid(), &[0]);
    assert!(ctx.mesh.axial.fluid().is_empty());
    assert!(!ctx.mesh.has_fluid());

    let solid = ctx.solid.as_ref().unwrap();
    assert_eq!(solid.peer_count(), 1);
    assert_eq!(solid.send, solid.recv);
    assert_eq!(solid.recv_buffers.peer(0).len(), 9);
    assert!(ctx.fluid.is_none());

    // Handle slots come pre-reserved, one per peer per direction, all empty.
    let handles = ctx.solid_handles.as_ref().unwrap();
    assert_eq!(handles.peer_count(), 1);
    assert!(handles.send.iter().all(Option::is_none));
    assert!(handles.recv.iter().all(Option::is_none));
    assert!(ctx.fluid_handles.is_none());

    // Single rank: reductions are the identity.
    assert_eq!(ctx.diagnostics.ranks, 1);
    assert_eq!(ctx.diagnostics.total_axial_elements, 1);
    assert_eq!(ctx.diagnostics.solid_halo_nodes, 3);
    assert_eq!(ctx.diagnostics.fluid_halo_nodes, 0);
    assert_eq!(ctx.diagnostics.hmin, 9.5e3);
    assert_eq!(ctx.diagnostics.hmax, 7.2e4);
}

#[test]
fn loads_fluid_partition_end_to_end() {
    let dir = temp_dir("fluid");
    let raw = sample_raw(true);
    let fluid = Schedule::new(
        Domain::Fluid,
        vec![PeerLink {
            rank: 1,
            nodes: vec![8],
        }],
    );
    write_rank_db(&dir, 0, &raw, Some(&one_peer_solid()), Some(&fluid));

    let ctx = load_partition(&LoaderConfig::new(&dir), &BuiltinCatalog, &NoComm).unwrap();

    assert!(ctx.mesh.has_fluid());
    assert_eq!(ctx.mesh.axial.solid(), &[0]);
    assert_eq!(ctx.mesh.axial.fluid(), &[1]);
    // The fluid axial element is normalized too: its axis-local nodes are
    // partition nodes 1, 12 and 5.
    assert_eq!(ctx.mesh.coords.s(1), 0.0);
    assert_eq!(ctx.mesh.coords.s(12), 0.0);
    assert_eq!(ctx.mesh.coords.s(5), 0.0);

    let f = ctx.fluid.as_ref().unwrap();
    assert_eq!(f.domain(), Domain::Fluid);
    // One shared node, one scalar component.
    assert_eq!(f.recv_buffers.peer(0).len(), 1);
    assert_eq!(ctx.fluid_handles.as_ref().unwrap().peer_count(), 1);
    assert_eq!(ctx.diagnostics.fluid_axial_elements, 1);
}

#[test]
fn isolated_rank_has_no_exchange_state() {
    let dir = temp_dir("isolated");
    write_rank_db(&dir, 0, &sample_raw(false), None, None);

    let ctx = load_partition(&LoaderConfig::new(&dir), &BuiltinCatalog, &NoComm).unwrap();
    assert!(ctx.solid.is_none());
    assert!(ctx.solid_handles.is_none());
    assert!(ctx.fluid.is_none());
    assert!(ctx.fluid_handles.is_none());
    assert_eq!(ctx.diagnostics.solid_halo_nodes, 0);
}

#[test]
#[serial]
fn staggered_open_completes_for_every_rank() {
    LocalComm::reset_mailbox();
    let dir = temp_dir("staggered");
    for rank in 0..3 {
        write_rank_db(&dir, rank, &sample_raw(false), Some(&one_peer_solid()), None);
    }

    // One rank per wave: more waves than any single rank opens in, so the
    // barrier accounting must line up on both sides of the open.
    let mut cfg = LoaderConfig::new(&dir);
    cfg.io_stagger = 1;

    let handles: Vec<_> = (0..3)
        .map(|rank| {
            let cfg = cfg.clone();
            std::thread::spawn(move || {
                let comm = LocalComm::new(rank, 3);
                load_partition(&cfg, &BuiltinCatalog, &comm).unwrap()
            })
        })
        .collect();
    for h in handles {
        let ctx = h.join().unwrap();
        assert_eq!(ctx.diagnostics.ranks, 3);
        assert_eq!(ctx.diagnostics.total_axial_elements, 3);
        assert_eq!(ctx.diagnostics.solid_halo_nodes, 9);
        assert_eq!(ctx.solid_handles.as_ref().unwrap().peer_count(), 1);
    }
}

#[test]
fn missing_database_is_an_io_failure() {
    let dir = temp_dir("missing");
    let err = load_partition(&LoaderConfig::new(&dir), &BuiltinCatalog, &NoComm).unwrap_err();
    assert_eq!(err.class(), FailureClass::Io);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn garbage_database_is_corrupt() {
    let dir = temp_dir("garbage");
    std::fs::write(dir.join("meshdb.dat.0000"), b"not a database at all").unwrap();

    let err = load_partition(&LoaderConfig::new(&dir), &BuiltinCatalog, &NoComm).unwrap_err();
    assert_eq!(err.class(), FailureClass::CorruptDatabase);
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn attenuation_against_elastic_model_is_a_configuration_failure() {
    let dir = temp_dir("elastic");
    let mut raw = sample_raw(false);
    raw.model_name = "homogeneous".into();
    write_rank_db(&dir, 0, &raw, None, None);

    let mut cfg = LoaderConfig::new(&dir);
    cfg.attenuation = true;
    let err = load_partition(&cfg, &BuiltinCatalog, &NoComm).unwrap_err();
    assert!(matches!(err, AxipartError::AnelasticUnsupported { .. }));
    assert_eq!(err.exit_code(), 4);

    // The same database loads fine without attenuation.
    cfg.attenuation = false;
    load_partition(&cfg, &BuiltinCatalog, &NoComm).unwrap();
}

#[test]
fn external_model_table_is_loaded_alongside_the_mesh() {
    let dir = temp_dir("external");
    let mut raw = sample_raw(false);
    raw.model_name = "external".into();
    write_rank_db(&dir, 0, &raw, None, None);
    std::fs::write(
        dir.join("external_model.bm"),
        "# radius vp vs rho qka qmu\n6371000. 5800. 3200. 2600. 57823. 600.\n3480000. 8064. 0. 9903. 57823. 0.\n",
    )
    .unwrap();

    let ctx = load_partition(&LoaderConfig::new(&dir), &BuiltinCatalog, &NoComm).unwrap();
    let table = ctx.mesh.model.external.as_ref().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(ctx.mesh.model.name, "external");
}

#[test]
fn missing_external_model_is_a_configuration_failure() {
    let dir = temp_dir("external-missing");
    let mut raw = sample_raw(false);
    raw.model_name = "external".into();
    write_rank_db(&dir, 0, &raw, None, None);

    let err = load_partition(&LoaderConfig::new(&dir), &BuiltinCatalog, &NoComm).unwrap_err();
    assert_eq!(err.class(), FailureClass::Configuration);
}

#[test]
fn unknown_model_is_a_configuration_failure() {
    let dir = temp_dir("unknown-model");
    let mut raw = sample_raw(false);
    raw.model_name = "made_up_model".into();
    write_rank_db(&dir, 0, &raw, None, None);

    let err = load_partition(&LoaderConfig::new(&dir), &BuiltinCatalog, &NoComm).unwrap_err();
    assert!(matches!(err, AxipartError::UnknownModel { .. }));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn diagnostics_serialize_for_run_logs() {
    let dir = temp_dir("serde");
    write_rank_db(&dir, 0, &sample_raw(false), Some(&one_peer_solid()), None);

    let ctx = load_partition(&LoaderConfig::new(&dir), &BuiltinCatalog, &NoComm).unwrap();
    let json = serde_json::to_string(&ctx.diagnostics).unwrap();
    let back: GlobalDiagnostics = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ctx.diagnostics);
}
