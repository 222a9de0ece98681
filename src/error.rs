//! AxipartError: unified error type for the axipart public APIs.
//!
//! Every fallible operation in the crate returns this type. There is no retry
//! or partial-recovery path: a missing or malformed partition makes the whole
//! distributed run meaningless, so the loader fails fast and the embedding
//! solver aborts with [`AxipartError::exit_code`].

use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure taxonomy exposed to the embedding solver.
///
/// Each class maps to a distinguishable non-zero exit status so that batch
/// schedulers can tell an unreadable filesystem apart from a bad run setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The rank's database file is missing or unreadable.
    Io,
    /// The database stream violates the fixed record format.
    CorruptDatabase,
    /// The run configuration contradicts the loaded database.
    Configuration,
}

impl FailureClass {
    /// Process exit status for this failure class.
    pub const fn exit_code(self) -> i32 {
        match self {
            FailureClass::Io => 2,
            FailureClass::CorruptDatabase => 3,
            FailureClass::Configuration => 4,
        }
    }
}

/// Unified error type for axipart operations.
#[derive(Debug, Error)]
pub enum AxipartError {
    /// The per-rank database file could not be opened or read.
    #[error("rank {rank}: cannot access mesh database `{path}`: {source}")]
    Io {
        rank: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operating system failed a read on an already-open database.
    #[error("I/O failure while reading `{field}` at byte offset {offset}: {source}")]
    ReadFailed {
        field: &'static str,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// The stream ended inside a record.
    #[error("corrupt database: stream truncated while reading `{field}` at byte offset {offset}")]
    Truncated { field: &'static str, offset: u64 },

    /// A count field was negative.
    #[error("corrupt database: `{field}` has negative count {value}")]
    NegativeCount { field: &'static str, value: i64 },

    /// The file does not start with the expected magic bytes.
    #[error("corrupt database: bad magic {found:#010x}, not a mesh database")]
    BadMagic { found: u32 },

    /// The format version is not one this reader understands.
    #[error("corrupt database: unsupported format version {found}")]
    UnsupportedVersion { found: u16 },

    /// A boolean field held something other than 0 or 1.
    #[error("corrupt database: `{field}` holds {value}, expected a 0/1 boolean")]
    InvalidBool { field: &'static str, value: i32 },

    /// The dump-type flag is not a known variant.
    #[error("corrupt database: unknown dump type flag {value}")]
    InvalidDumpType { value: i32 },

    /// The GLL polynomial order is outside its valid range.
    #[error("corrupt database: polynomial order {value} out of range, must be at least 1")]
    InvalidPolynomialOrder { value: usize },

    /// The background model name field is not printable ASCII.
    #[error("corrupt database: model name is not printable ASCII")]
    BadModelName,

    /// Two length-bearing records disagree.
    #[error("corrupt database: `{field}` expected {expected} entries, found {found}")]
    CountMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// An index points outside the structure it refers into.
    #[error("corrupt database: `{field}` index {index} out of range (limit {limit})")]
    IndexOutOfRange {
        field: &'static str,
        index: i64,
        limit: usize,
    },

    /// A peer rank appears twice in one communication block.
    #[error("corrupt database: peer rank {peer} listed twice in {domain} communication block")]
    DuplicatePeer { peer: usize, domain: &'static str },

    /// A listed peer carries a non-positive message size.
    #[error("corrupt database: peer rank {peer} has invalid message size {size}")]
    InvalidMessageSize { peer: usize, size: i64 },

    /// Bytes remained after the final record.
    #[error("corrupt database: {extra} trailing bytes after the final record")]
    TrailingBytes { extra: u64 },

    /// The named background model is not in the catalog.
    #[error("configuration error: unknown background model `{name}`")]
    UnknownModel { name: String },

    /// Attenuation was requested against an elastic-only model.
    #[error("configuration error: anelastic attenuation requested but model `{model}` is elastic-only")]
    AnelasticUnsupported { model: String },

    /// The external model table could not be parsed.
    #[error("configuration error: external model file `{path}` line {line}: {reason}")]
    ExternalModelParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl AxipartError {
    /// Classify this error into the coarse taxonomy.
    pub fn class(&self) -> FailureClass {
        match self {
            AxipartError::Io { .. } | AxipartError::ReadFailed { .. } => FailureClass::Io,
            AxipartError::UnknownModel { .. }
            | AxipartError::AnelasticUnsupported { .. }
            | AxipartError::ExternalModelParse { .. } => FailureClass::Configuration,
            _ => FailureClass::CorruptDatabase,
        }
    }

    /// Exit status the embedding process should abort with.
    pub fn exit_code(&self) -> i32 {
        self.class().exit_code()
    }
}
