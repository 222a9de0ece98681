//! In-memory mesh structures for one rank's partition.
//!
//! Raw record data from the database becomes control-node coordinates,
//! element connectivity, the discontinuity table, and the axial element set.
//! The one mutation applied after load is axial normalization: nodes on the
//! symmetry axis get their `s` coordinate forced to exactly zero, overriding
//! rounding noise from the mesher's floating-point pipeline. Downstream
//! kernels assume exact axisymmetry, so this step is correctness critical.

use crate::error::AxipartError;
use crate::io::database::RawDatabase;
use crate::model::ModelHandle;
use serde::{Deserialize, Serialize};

/// Nodes per element in the serendipity corner/mid-side numbering.
pub const SERENDIPITY_NODES: usize = 8;

/// Local node positions touching the symmetry axis (serendipity positions
/// 1, 7 and 8 in the 1-based convention).
pub const AXIAL_LOCAL_NODES: [usize; 3] = [0, 6, 7];

/// Cylindrical `(s, z)` coordinates for every control node of the partition.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCoordinates {
    s: Vec<f64>,
    z: Vec<f64>,
}

impl NodeCoordinates {
    pub fn from_pairs(pairs: Vec<(f64, f64)>) -> Self {
        let (s, z) = pairs.into_iter().unzip();
        Self { s, z }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.s.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    #[inline]
    pub fn s(&self, node: usize) -> f64 {
        self.s[node]
    }

    #[inline]
    pub fn z(&self, node: usize) -> f64 {
        self.z[node]
    }

    #[inline]
    pub fn coords(&self, node: usize) -> (f64, f64) {
        (self.s[node], self.z[node])
    }

    #[inline]
    pub fn set_s(&mut self, node: usize, value: f64) {
        self.s[node] = value;
    }
}

/// Element-to-node connectivity in serendipity ordering.
///
/// Every index is a valid `NodeCoordinates` entry; the reader enforced this
/// at load time. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementConnectivity {
    rows: Vec<[usize; SERENDIPITY_NODES]>,
}

impl ElementConnectivity {
    pub fn new(rows: Vec<[usize; SERENDIPITY_NODES]>) -> Self {
        Self { rows }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn element(&self, e: usize) -> &[usize; SERENDIPITY_NODES] {
        &self.rows[e]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize; SERENDIPITY_NODES]> {
        self.rows.iter()
    }
}

/// One background-model discontinuity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discontinuity {
    pub radius: f64,
    pub is_solid: bool,
    pub fluid_domain_index: i32,
}

/// Ordered discontinuity table; length fixed at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscontinuityTable(Vec<Discontinuity>);

impl DiscontinuityTable {
    pub fn new(rows: Vec<Discontinuity>) -> Self {
        Self(rows)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Discontinuity] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Discontinuity> {
        self.0.iter()
    }
}

/// Elements lying on the symmetry axis, partitioned by domain.
///
/// Elements are ordered solid-first in the database, so domain membership of
/// an axial element follows from comparing its index with the solid element
/// count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxialElementSet {
    total: Vec<usize>,
    solid: Vec<usize>,
    fluid: Vec<usize>,
}

impl AxialElementSet {
    /// Split the total axial list by the solid-first ordering.
    pub fn partition(total: Vec<usize>, nel_solid: usize) -> Self {
        let (solid, fluid) = total.iter().copied().partition(|&e| e < nel_solid);
        Self {
            total,
            solid,
            fluid,
        }
    }

    #[inline]
    pub fn total(&self) -> &[usize] {
        &self.total
    }

    #[inline]
    pub fn solid(&self) -> &[usize] {
        &self.solid
    }

    #[inline]
    pub fn fluid(&self) -> &[usize] {
        &self.fluid
    }
}

/// How GLL fields were dumped by the mesher; fixes the index windows the
/// solver reads per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpKind {
    /// Full GLL field dump.
    FullFields,
    /// Coarse strain-only dump; the outermost GLL layer is absent.
    StrainOnly,
}

impl DumpKind {
    pub fn from_flag(value: i32) -> Result<Self, AxipartError> {
        match value {
            0 => Ok(DumpKind::FullFields),
            1 => Ok(DumpKind::StrainOnly),
            _ => Err(AxipartError::InvalidDumpType { value }),
        }
    }

    pub const fn flag(self) -> i32 {
        match self {
            DumpKind::FullFields => 0,
            DumpKind::StrainOnly => 1,
        }
    }
}

/// Per-element GLL index bounds fixed by the dump type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexWindow {
    pub ibeg: usize,
    pub iend: usize,
    pub jbeg: usize,
    pub jend: usize,
}

impl IndexWindow {
    pub fn for_dump(kind: DumpKind, npol: usize) -> Self {
        match kind {
            DumpKind::FullFields => Self {
                ibeg: 0,
                iend: npol,
                jbeg: 0,
                jend: npol,
            },
            DumpKind::StrainOnly => Self {
                ibeg: 1,
                iend: npol.saturating_sub(1),
                jbeg: 1,
                jend: npol.saturating_sub(1),
            },
        }
    }
}

/// One characteristic-time-ratio extremum reported by the mesher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicExtremum {
    pub value: f64,
    pub element: i32,
    pub radius_fraction: f64,
    pub colatitude_deg: f64,
}

/// Scalar mesh and time-stepping parameters from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshParams {
    pub npol: usize,
    pub dump: DumpKind,
    pub window: IndexWindow,
    pub points_per_wavelength: f64,
    pub period: f64,
    pub courant: f64,
    pub timestep: f64,
    pub override_external_q: bool,
    pub outer_radius: f64,
    pub has_fluid: bool,
    pub rmin: f64,
    pub min_inner_core_h: f64,
    pub max_inner_core_h: f64,
    pub max_icb_h: f64,
    pub hmin_global: f64,
    pub hmax_global: f64,
    pub min_distance_dim: f64,
    pub min_distance_nondim: f64,
    pub time_ratio_max: CharacteristicExtremum,
    pub time_ratio_min: CharacteristicExtremum,
}

/// One rank's slice of the mesh, fully built and normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPartition {
    pub coords: NodeCoordinates,
    pub connectivity: ElementConnectivity,
    pub nel_solid: usize,
    pub nel_fluid: usize,
    pub discontinuities: DiscontinuityTable,
    pub axial: AxialElementSet,
    pub params: MeshParams,
    pub model: ModelHandle,
}

impl MeshPartition {
    /// Turn raw record data into the in-memory partition.
    ///
    /// Validates that requested attenuation is supported by the background
    /// model (a configuration error, distinct from I/O failure), cross-checks
    /// the declared axial domain counts against the derived partition, and
    /// applies axial normalization.
    pub fn build(
        raw: RawDatabase,
        model: ModelHandle,
        attenuation: bool,
    ) -> Result<Self, AxipartError> {
        if attenuation && !model.flags.anelastic {
            return Err(AxipartError::AnelasticUnsupported {
                model: model.name.clone(),
            });
        }

        let axial = AxialElementSet::partition(raw.axial_elements, raw.nel_solid);
        if axial.solid().len() != raw.solid_axial {
            return Err(AxipartError::CountMismatch {
                field: "solid axial elements",
                expected: raw.solid_axial,
                found: axial.solid().len(),
            });
        }
        if axial.fluid().len() != raw.fluid_axial {
            return Err(AxipartError::CountMismatch {
                field: "fluid axial elements",
                expected: raw.fluid_axial,
                found: axial.fluid().len(),
            });
        }

        let window = IndexWindow::for_dump(raw.dump, raw.npol);
        let params = MeshParams {
            npol: raw.npol,
            dump: raw.dump,
            window,
            points_per_wavelength: raw.points_per_wavelength,
            period: raw.period,
            courant: raw.courant,
            timestep: raw.timestep,
            override_external_q: raw.override_external_q,
            outer_radius: raw.outer_radius,
            has_fluid: raw.has_fluid,
            rmin: raw.rmin,
            min_inner_core_h: raw.min_inner_core_h,
            max_inner_core_h: raw.max_inner_core_h,
            max_icb_h: raw.max_icb_h,
            hmin_global: raw.hmin_global,
            hmax_global: raw.hmax_global,
            min_distance_dim: raw.min_distance_dim,
            min_distance_nondim: raw.min_distance_nondim,
            time_ratio_max: raw.time_ratio_max,
            time_ratio_min: raw.time_ratio_min,
        };

        let mut partition = Self {
            coords: NodeCoordinates::from_pairs(raw.coords),
            connectivity: ElementConnectivity::new(raw.connectivity),
            nel_solid: raw.nel_solid,
            nel_fluid: raw.nel_fluid,
            discontinuities: DiscontinuityTable::new(raw.discontinuities),
            axial,
            params,
            model,
        };
        partition.normalize_axial();
        log::debug!(
            "partition built: {} nodes, {} elements ({} solid / {} fluid), {} axial",
            partition.coords.len(),
            partition.connectivity.len(),
            partition.nel_solid,
            partition.nel_fluid,
            partition.axial.total().len()
        );
        Ok(partition)
    }

    /// Force the `s` coordinate of axis-adjacent nodes to exactly zero.
    ///
    /// Idempotent: `s == 0` is a fixed point.
    pub fn normalize_axial(&mut self) {
        for &e in self.axial.total() {
            let nodes = *self.connectivity.element(e);
            for local in AXIAL_LOCAL_NODES {
                self.coords.set_s(nodes[local], 0.0);
            }
        }
    }

    /// True when the mesh carries a fluid region.
    #[inline]
    pub fn has_fluid(&self) -> bool {
        self.params.has_fluid
    }
}
