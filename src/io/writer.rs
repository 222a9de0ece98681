//! `DbWriter`: produces the same record layout the reader consumes.
//!
//! The production databases come from the mesher; this writer exists for
//! synthetic partitions (tests, small demo meshes) and keeps the two sides of
//! the format in one crate so they cannot drift apart silently.

use crate::comm::schedule::Schedule;
use crate::io::database::RawDatabase;
use crate::io::wire::{MODEL_NAME_LEN, WireDisc, WireExtremum, WireHeader};
use crate::mesh::CharacteristicExtremum;
use std::io::{self, Write};

/// Sequential little-endian record writer.
pub struct DbWriter<W> {
    inner: W,
}

impl<W: Write> DbWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.inner.write_all(bytemuck::bytes_of(&WireHeader::new()))
    }

    pub fn write_i32(&mut self, v: i32) -> io::Result<()> {
        self.inner.write_all(&v.to_le_bytes())
    }

    pub fn write_count(&mut self, v: usize) -> io::Result<()> {
        self.write_i32(v as i32)
    }

    pub fn write_f64(&mut self, v: f64) -> io::Result<()> {
        self.inner.write_all(&v.to_le_bytes())
    }

    pub fn write_bool(&mut self, v: bool) -> io::Result<()> {
        self.write_i32(v as i32)
    }

    /// Write the fixed-width, space-padded model name field.
    pub fn write_name(&mut self, name: &str) -> io::Result<()> {
        let mut raw = [b' '; MODEL_NAME_LEN];
        let bytes = name.as_bytes();
        let n = bytes.len().min(MODEL_NAME_LEN);
        raw[..n].copy_from_slice(&bytes[..n]);
        self.inner.write_all(&raw)
    }

    pub fn write_index_slice(&mut self, indices: &[usize]) -> io::Result<()> {
        for &idx in indices {
            self.write_i32(idx as i32)?;
        }
        Ok(())
    }

    fn write_extremum(&mut self, e: &CharacteristicExtremum) -> io::Result<()> {
        let rec = WireExtremum::new(e.value, e.element, e.radius_fraction, e.colatitude_deg);
        self.inner.write_all(bytemuck::bytes_of(&rec))
    }

    /// Write one communication block: peers, sizes, grouped index maps.
    /// `None` writes an empty block (zero peers).
    pub fn write_halo_block(&mut self, schedule: Option<&Schedule>) -> io::Result<()> {
        let Some(schedule) = schedule else {
            return self.write_count(0);
        };
        self.write_count(schedule.peer_count())?;
        for link in schedule.links() {
            self.write_count(link.rank)?;
        }
        for link in schedule.links() {
            self.write_count(link.message_size())?;
        }
        for link in schedule.links() {
            self.write_index_slice(&link.nodes)?;
        }
        Ok(())
    }

    /// Write a complete database: mesh records plus communication blocks.
    ///
    /// The fluid block is written only when `raw.has_fluid`, mirroring the
    /// reader, which never attempts to read it otherwise.
    pub fn write_database(
        &mut self,
        raw: &RawDatabase,
        solid: Option<&Schedule>,
        fluid: Option<&Schedule>,
    ) -> io::Result<()> {
        self.write_header()?;

        self.write_count(raw.npoin())?;
        for &(s, z) in &raw.coords {
            self.write_f64(s)?;
            self.write_f64(z)?;
        }
        self.write_count(raw.nelem())?;
        self.write_count(raw.nel_solid)?;
        self.write_count(raw.nel_fluid)?;
        for row in &raw.connectivity {
            self.write_index_slice(row)?;
        }

        self.write_count(raw.npol)?;
        self.write_i32(raw.dump.flag())?;

        self.write_f64(raw.points_per_wavelength)?;
        self.write_f64(raw.period)?;
        self.write_f64(raw.courant)?;
        self.write_f64(raw.timestep)?;

        self.write_name(&raw.model_name)?;
        self.write_bool(raw.override_external_q)?;

        self.write_f64(raw.outer_radius)?;
        self.write_bool(raw.has_fluid)?;

        self.write_count(raw.discontinuities.len())?;
        for d in &raw.discontinuities {
            let rec = WireDisc::new(d.radius, d.is_solid, d.fluid_domain_index);
            self.inner.write_all(bytemuck::bytes_of(&rec))?;
        }

        self.write_f64(raw.rmin)?;
        self.write_f64(raw.min_inner_core_h)?;
        self.write_f64(raw.max_inner_core_h)?;
        self.write_f64(raw.max_icb_h)?;
        self.write_f64(raw.hmin_global)?;
        self.write_f64(raw.hmax_global)?;
        self.write_f64(raw.min_distance_dim)?;
        self.write_f64(raw.min_distance_nondim)?;

        self.write_extremum(&raw.time_ratio_max)?;
        self.write_extremum(&raw.time_ratio_min)?;

        self.write_count(raw.axial_elements.len())?;
        self.write_count(raw.solid_axial)?;
        self.write_count(raw.fluid_axial)?;
        self.write_index_slice(&raw.axial_elements)?;

        self.write_halo_block(solid)?;
        if raw.has_fluid {
            self.write_halo_block(fluid)?;
        }
        Ok(())
    }
}
