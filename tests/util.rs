//! Shared helpers for integration tests: synthetic databases on disk and in
//! memory.
#![allow(dead_code)]

use axipart::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering::Relaxed};

/// A small two-element partition. With `has_fluid` the second element (and
/// its axial entry) belongs to the fluid domain; otherwise both are solid.
///
/// Node 0 sits on the axis with deliberate rounding noise in `s`, so loader
/// tests can observe axial normalization. Element 0 is axial; its local
/// nodes 0, 6 and 7 are partition nodes 0, 6 and 7.
pub fn sample_raw(has_fluid: bool) -> RawDatabase {
    let mut coords = vec![
        (3.0e-14, 0.0),  // 0: axis, noisy s
        (1.0, 0.0),      // 1
        (1.0, 1.0),      // 2
        (0.0, 1.0),      // 3
        (0.5, 0.0),      // 4
        (1.0, 0.5),      // 5
        (0.5, 1.0),      // 6: axis-adjacent mid-side of element 0
        (-2.0e-15, 0.5), // 7: axis, noisy s
        (2.0, 0.0),      // 8
        (2.0, 1.0),      // 9
        (1.5, 0.0),      // 10
        (2.0, 0.5),      // 11
        (1.5, 1.0),      // 12
    ];
    // Element 0's axial corner/mid-side nodes are 0, 6, 7 per the
    // serendipity convention; leave the noise in place for the loader to fix.
    coords[6].0 = 5.0e-16;

    let connectivity = vec![
        [0, 1, 2, 3, 4, 5, 6, 7],
        [1, 8, 9, 2, 10, 11, 12, 5],
    ];

    let (nel_solid, nel_fluid) = if has_fluid { (1, 1) } else { (2, 0) };
    let (axial_elements, solid_axial, fluid_axial) = if has_fluid {
        (vec![0, 1], 1, 1)
    } else {
        (vec![0], 1, 0)
    };

    RawDatabase {
        coords,
        connectivity,
        nel_solid,
        nel_fluid,
        npol: 4,
        dump: DumpKind::FullFields,
        points_per_wavelength: 1.5,
        period: 50.0,
        courant: 0.6,
        timestep: 0.1,
        model_name: "prem_iso".into(),
        override_external_q: false,
        outer_radius: 6.371e6,
        has_fluid,
        discontinuities: vec![
            Discontinuity {
                radius: 6.371e6,
                is_solid: true,
                fluid_domain_index: 0,
            },
            Discontinuity {
                radius: 3.48e6,
                is_solid: false,
                fluid_domain_index: 1,
            },
        ],
        rmin: 1.2e6,
        min_inner_core_h: 1.0e4,
        max_inner_core_h: 5.0e4,
        max_icb_h: 3.0e4,
        hmin_global: 9.5e3,
        hmax_global: 7.2e4,
        min_distance_dim: 4.1e3,
        min_distance_nondim: 6.4e-4,
        time_ratio_max: CharacteristicExtremum {
            value: 0.92,
            element: 1040,
            radius_fraction: 0.55,
            colatitude_deg: 88.5,
        },
        time_ratio_min: CharacteristicExtremum {
            value: 0.11,
            element: 7,
            radius_fraction: 0.02,
            colatitude_deg: 3.25,
        },
        solid_axial,
        fluid_axial,
        axial_elements,
    }
}

/// Solid receive schedule matching the end-to-end scenario: one peer (rank 1)
/// sharing three nodes.
pub fn one_peer_solid() -> Schedule {
    Schedule::new(
        Domain::Solid,
        vec![PeerLink {
            rank: 1,
            nodes: vec![2, 5, 9],
        }],
    )
}

/// Serialize a database image to bytes.
pub fn db_bytes(raw: &RawDatabase, solid: Option<&Schedule>, fluid: Option<&Schedule>) -> Vec<u8> {
    let mut writer = DbWriter::new(Vec::new());
    writer
        .write_database(raw, solid, fluid)
        .expect("in-memory write cannot fail");
    writer.into_inner()
}

static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

/// Fresh scratch directory for one test scenario.
pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "axipart-test-{}-{tag}-{}",
        std::process::id(),
        DIR_SEQ.fetch_add(1, Relaxed)
    ));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Write a rank's database file under `dir`.
pub fn write_rank_db(
    dir: &std::path::Path,
    rank: usize,
    raw: &RawDatabase,
    solid: Option<&Schedule>,
    fluid: Option<&Schedule>,
) {
    let path = dir.join(format!("meshdb.dat.{rank:04}"));
    std::fs::write(path, db_bytes(raw, solid, fluid)).expect("write rank database");
}
