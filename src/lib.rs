//! # axipart
//!
//! axipart is the per-rank loader and communication-topology builder for a
//! domain-decomposed axisymmetric spectral-element mesh. A separate meshing
//! stage partitions the global mesh across N ranks and writes one binary
//! database per rank; at solver start-up every rank parses its own database
//! without cross-rank negotiation, reconstructs its slice of the mesh, and
//! builds the exact send/receive halo-exchange layout it will reuse on every
//! time step.
//!
//! ## What lives here
//! - A typed, order-enforcing binary reader for the fixed-layout database
//!   (and the matching writer, so the format cannot drift)
//! - Mesh structures: control-node coordinates, serendipity connectivity,
//!   discontinuity table, axial element set with exact-axis normalization
//! - Solid/fluid halo-exchange schedules with mirrored send/receive sides,
//!   exactly-sized reusable buffers, and reserved per-peer handle slots
//! - Pluggable communication backends (serial, threaded, MPI) for the
//!   barriers and reductions the pipeline uses
//!
//! ## Determinism
//!
//! The pipeline is a single forward pass over a fixed record order; peer
//! lists and index maps keep file order, so every run of the same database
//! produces byte-identical schedules.
//!
//! ## Failure model
//!
//! There is no retry or degraded startup: a missing or malformed partition
//! aborts the whole run with a class-specific exit code (see
//! [`error::AxipartError::exit_code`]).

pub mod comm;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod loader;
pub mod mesh;
pub mod model;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::comm::schedule::{
        Domain, ExchangeBuffers, ExchangeHandles, HaloExchange, PeerLink, Schedule, derive_send,
    };
    pub use crate::comm::{Communicator, LocalComm, NoComm, ReduceOp, Wait};
    pub use crate::diagnostics::GlobalDiagnostics;
    pub use crate::error::{AxipartError, FailureClass};
    pub use crate::io::{MeshDatabase, RawDatabase, writer::DbWriter};
    pub use crate::loader::{LoaderConfig, PartitionContext, load_partition};
    pub use crate::mesh::{
        AXIAL_LOCAL_NODES, AxialElementSet, CharacteristicExtremum, Discontinuity,
        DiscontinuityTable, DumpKind, ElementConnectivity, IndexWindow, MeshParams, MeshPartition,
        NodeCoordinates, SERENDIPITY_NODES,
    };
    pub use crate::model::{
        BuiltinCatalog, ExternalModelTable, ModelCatalog, ModelFlags, ModelHandle,
    };
}
