//! Prelude module for convenient imports
//!
//! Re-exports the types most callers need: the decompiler entry point, the
//! work descriptor family, the fetch seam, and the error taxonomy.

// Entry point
pub use crate::decompiler::Decompiler;

// Work metadata and dispatch
pub use crate::work::{WorkDescriptor, WorkKind, safe_filename};

// Graph reconstruction types
pub use crate::graph::{
    ActorGraph, BlockRule, CompiledBlockRecord, Edge, FunctionTable, ParamValue,
    ReconstructedBlock, Reconstructor,
};

// Shadow markup
pub use crate::shadow::ShadowKind;

// External collaborator seams
pub use crate::fetch::{Fetch, HttpFetcher};

// Error types
pub use crate::error::{
    CodecError, DecompileError, IoError, NetworkError, PayloadError, RecordError,
};

/// Result type alias for fallible decompiler operations.
pub type Result<T> = std::result::Result<T, DecompileError>;
