//! Fixed, versioned, little-endian wire records for the mesh database file.
//!
//! The mesher and this reader agree on layout by contract, not by
//! self-description. All multi-byte integers are **little-endian** on disk;
//! floats are stored as the little-endian bit pattern of their IEEE-754
//! representation. We store pre-LE with `.to_le()` and decode with
//! `u*::from_le`.

use bytemuck::{Pod, Zeroable};
use std::mem::{align_of, size_of};

/// First four bytes of every mesh database file ("AXDB").
pub const DB_MAGIC: u32 = 0x4158_4442;

/// Bump when the record layout changes in incompatible ways.
pub const DB_VERSION: u16 = 1;

/// Fixed width of the background model name field, space padded.
pub const MODEL_NAME_LEN: usize = 32;

#[inline]
pub fn f64_to_bits_le(v: f64) -> u64 {
    v.to_bits().to_le()
}

#[inline]
pub fn f64_from_bits_le(bits: u64) -> f64 {
    f64::from_bits(u64::from_le(bits))
}

/// File header: magic, format version, reserved (keep zero).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireHeader {
    pub magic_le: u32,
    pub version_le: u16,
    pub reserved_le: u16,
}

impl WireHeader {
    pub fn new() -> Self {
        Self {
            magic_le: DB_MAGIC.to_le(),
            version_le: DB_VERSION.to_le(),
            reserved_le: 0,
        }
    }
    pub fn magic(&self) -> u32 {
        u32::from_le(self.magic_le)
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
}

impl Default for WireHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// One discontinuity table row: `(radius, is_solid, fluid_domain_index)`.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireDisc {
    pub radius_bits_le: u64,
    pub is_solid_le: i32,
    pub fluid_domain_le: i32,
}

impl WireDisc {
    pub fn new(radius: f64, is_solid: bool, fluid_domain: i32) -> Self {
        Self {
            radius_bits_le: f64_to_bits_le(radius),
            is_solid_le: (is_solid as i32).to_le(),
            fluid_domain_le: fluid_domain.to_le(),
        }
    }
    pub fn radius(&self) -> f64 {
        f64_from_bits_le(self.radius_bits_le)
    }
    pub fn is_solid_raw(&self) -> i32 {
        i32::from_le(self.is_solid_le)
    }
    pub fn fluid_domain(&self) -> i32 {
        i32::from_le(self.fluid_domain_le)
    }
}

/// One characteristic-time-ratio extremum block.
///
/// The 4 reserved bytes after the element id pad the record to 8-byte
/// alignment (explicit, always zero on disk).
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireExtremum {
    pub value_bits_le: u64,
    pub element_le: i32,
    pub _pad: u32,
    pub radius_fraction_bits_le: u64,
    pub colatitude_bits_le: u64,
}

impl WireExtremum {
    pub fn new(value: f64, element: i32, radius_fraction: f64, colatitude_deg: f64) -> Self {
        Self {
            value_bits_le: f64_to_bits_le(value),
            element_le: element.to_le(),
            _pad: 0,
            radius_fraction_bits_le: f64_to_bits_le(radius_fraction),
            colatitude_bits_le: f64_to_bits_le(colatitude_deg),
        }
    }
    pub fn decode(&self) -> (f64, i32, f64, f64) {
        (
            f64_from_bits_le(self.value_bits_le),
            i32::from_le(self.element_le),
            f64_from_bits_le(self.radius_fraction_bits_le),
            f64_from_bits_le(self.colatitude_bits_le),
        )
    }
}

// ===== Compile-time sanity checks =========================================

const _: () = {
    // Pod/Zeroable ensures no padding contains uninit when cast to bytes.
    assert!(size_of::<WireHeader>() == 8);
    assert!(size_of::<WireDisc>() == 16);
    assert!(size_of::<WireExtremum>() == 32);
    assert!(align_of::<WireExtremum>() == 8);
};
