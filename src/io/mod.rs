//! Binary mesh database I/O.
//!
//! One fixed-layout file per rank, produced by the mesher and consumed here
//! in a single forward pass. [`cursor::DbCursor`] enforces read order,
//! [`database::MeshDatabase`] walks the record sequence, and
//! [`writer::DbWriter`] produces the same layout for synthetic databases and
//! round-trip tests.

pub mod cursor;
pub mod database;
pub mod wire;
pub mod writer;

pub use database::{MeshDatabase, RawDatabase};

use std::path::{Path, PathBuf};

/// Per-rank database file path: `<dir>/meshdb.dat.<rank:04>`.
pub fn database_path(dir: &Path, rank: usize) -> PathBuf {
    dir.join(format!("meshdb.dat.{rank:04}"))
}
