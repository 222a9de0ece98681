//! `MeshDatabase`: the per-rank record stream.
//!
//! Records are consumed strictly in the fixed order the mesher wrote them;
//! there is no random access and no schema negotiation. The mesh records
//! (everything up to the communication blocks) land in a [`RawDatabase`];
//! the solid/fluid communication blocks are consumed afterwards on the same
//! cursor by the schedule builder, and [`MeshDatabase::finish`] verifies the
//! stream is exhausted.

use crate::comm::schedule::{self, Domain, HaloExchange};
use crate::error::AxipartError;
use crate::io::cursor::DbCursor;
use crate::mesh::{CharacteristicExtremum, Discontinuity, DumpKind, SERENDIPITY_NODES};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Raw record data for one rank, before mesh structures are built.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDatabase {
    pub coords: Vec<(f64, f64)>,
    pub connectivity: Vec<[usize; SERENDIPITY_NODES]>,
    pub nel_solid: usize,
    pub nel_fluid: usize,
    pub npol: usize,
    pub dump: DumpKind,
    pub points_per_wavelength: f64,
    pub period: f64,
    pub courant: f64,
    pub timestep: f64,
    pub model_name: String,
    pub override_external_q: bool,
    pub outer_radius: f64,
    pub has_fluid: bool,
    pub discontinuities: Vec<Discontinuity>,
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
    pub solid_axial: usize,
    pub fluid_axial: usize,
    pub axial_elements: Vec<usize>,
}

impl RawDatabase {
    /// Control-node count of this partition.
    #[inline]
    pub fn npoin(&self) -> usize {
        self.coords.len()
    }

    /// Element count of this partition.
    #[inline]
    pub fn nelem(&self) -> usize {
        self.connectivity.len()
    }
}

/// Handle on one rank's database stream.
pub struct MeshDatabase<R> {
    cursor: DbCursor<R>,
    label: String,
}

impl MeshDatabase<BufReader<File>> {
    /// Open the database for `rank` under `data_dir`.
    ///
    /// A missing or unreadable file is fatal for the whole run; the loader
    /// synchronizes before propagating so every rank's diagnostics flush.
    pub fn open(data_dir: &Path, rank: usize) -> Result<Self, AxipartError> {
        let path = crate::io::database_path(data_dir, rank);
        let file = File::open(&path).map_err(|source| AxipartError::Io {
            rank,
            path: path.clone(),
            source,
        })?;
        log::debug!("rank {rank}: opened {}", path.display());
        Ok(Self {
            cursor: DbCursor::new(BufReader::new(file)),
            label: path.display().to_string(),
        })
    }
}

impl<R: Read> MeshDatabase<R> {
    /// Wrap an in-memory or already-open stream (tests, bundled payloads).
    pub fn from_reader(inner: R, label: impl Into<String>) -> Self {
        Self {
            cursor: DbCursor::new(inner),
            label: label.into(),
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Consume the header and all mesh records, up to the communication
    /// blocks.
    pub fn read_raw(&mut self) -> Result<RawDatabase, AxipartError> {
        let c = &mut self.cursor;
        c.read_header()?;

        // Mesh basics: nodes, elements, domain split, connectivity.
        let npoin = c.read_count("npoin")?;
        let coords = c.read_f64_pairs(npoin, "node coordinates")?;
        let nelem = c.read_count("nelem")?;
        let nel_solid = c.read_count("nel_solid")?;
        let nel_fluid = c.read_count("nel_fluid")?;
        if nel_solid + nel_fluid != nelem {
            return Err(AxipartError::CountMismatch {
                field: "element domain counts",
                expected: nelem,
                found: nel_solid + nel_fluid,
            });
        }
        let flat = c.read_index_vec(nelem * SERENDIPITY_NODES, npoin, "connectivity")?;
        let connectivity = flat
            .chunks_exact(SERENDIPITY_NODES)
            .map(|chunk| {
                let mut row = [0usize; SERENDIPITY_NODES];
                row.copy_from_slice(chunk);
                row
            })
            .collect();

        // Mesh advanced: polynomial order and dump windows.
        let npol = c.read_count("npol")?;
        if npol < 1 {
            return Err(AxipartError::InvalidPolynomialOrder { value: npol });
        }
        let dump = DumpKind::from_flag(c.read_i32("dump_type")?)?;

        // Numerical parameters.
        let points_per_wavelength = c.read_f64("points_per_wavelength")?;
        let period = c.read_f64("period")?;
        let courant = c.read_f64("courant")?;
        let timestep = c.read_f64("timestep")?;

        // Background model.
        let model_name = c.read_name("model name")?;
        let override_external_q = c.read_bool("override_external_q")?;

        let outer_radius = c.read_f64("outer_radius")?;
        let has_fluid = c.read_bool("has_fluid")?;

        // Discontinuity table.
        let ndisc = c.read_count("ndisc")?;
        let mut discontinuities = Vec::with_capacity(ndisc);
        for _ in 0..ndisc {
            let row = c.read_disc("discontinuity")?;
            let is_solid = match row.is_solid_raw() {
                0 => false,
                1 => true,
                value => {
                    return Err(AxipartError::InvalidBool {
                        field: "discontinuity is_solid",
                        value,
                    });
                }
            };
            discontinuities.push(Discontinuity {
                radius: row.radius(),
                is_solid,
                fluid_domain_index: row.fluid_domain(),
            });
        }

        // Radial mesh metrics.
        let rmin = c.read_f64("rmin")?;
        let min_inner_core_h = c.read_f64("min_inner_core_h")?;
        let max_inner_core_h = c.read_f64("max_inner_core_h")?;
        let max_icb_h = c.read_f64("max_icb_h")?;
        let hmin_global = c.read_f64("hmin_global")?;
        let hmax_global = c.read_f64("hmax_global")?;
        let min_distance_dim = c.read_f64("min_distance_dim")?;
        let min_distance_nondim = c.read_f64("min_distance_nondim")?;

        // Characteristic-time-ratio extrema, max then min.
        let (value, element, radius_fraction, colatitude_deg) =
            c.read_extremum("time ratio max")?.decode();
        let time_ratio_max = CharacteristicExtremum {
            value,
            element,
            radius_fraction,
            colatitude_deg,
        };
        let (value, element, radius_fraction, colatitude_deg) =
            c.read_extremum("time ratio min")?.decode();
        let time_ratio_min = CharacteristicExtremum {
            value,
            element,
            radius_fraction,
            colatitude_deg,
        };

        // Axial element list.
        let total_axial = c.read_count("total_axial")?;
        let solid_axial = c.read_count("solid_axial")?;
        let fluid_axial = c.read_count("fluid_axial")?;
        if solid_axial + fluid_axial != total_axial {
            return Err(AxipartError::CountMismatch {
                field: "axial domain counts",
                expected: total_axial,
                found: solid_axial + fluid_axial,
            });
        }
        let axial_elements = c.read_index_vec(total_axial, nelem, "axial elements")?;

        log::debug!(
            "{}: {npoin} nodes, {nelem} elements, npol {npol}, model `{model_name}`, {ndisc} discontinuities, {total_axial} axial",
            self.label
        );

        Ok(RawDatabase {
            coords,
            connectivity,
            nel_solid,
            nel_fluid,
            npol,
            dump,
            points_per_wavelength,
            period,
            courant,
            timestep,
            model_name,
            override_external_q,
            outer_radius,
            has_fluid,
            discontinuities,
            rmin,
            min_inner_core_h,
            max_inner_core_h,
            max_icb_h,
            hmin_global,
            hmax_global,
            min_distance_dim,
            min_distance_nondim,
            time_ratio_max,
            time_ratio_min,
            solid_axial,
            fluid_axial,
            axial_elements,
        })
    }

    /// Consume the next communication block for `domain`.
    pub fn read_halo(
        &mut self,
        domain: Domain,
        npoin: usize,
    ) -> Result<Option<HaloExchange>, AxipartError> {
        schedule::read_halo_exchange(&mut self.cursor, domain, npoin)
    }

    /// Require the stream to be fully consumed and close it.
    pub fn finish(mut self) -> Result<(), AxipartError> {
        self.cursor.expect_eof()
    }
}
