//! # Fukugen - Block Project Decompiler
//!
//! **Fukugen** reconstructs an editable, block-based project from the
//! compiled form the Codemao platform serves for a published work. The
//! player bundle only ships a flattened, partially stripped representation;
//! this crate rebuilds the typed block graph (statements, expressions,
//! control structures, user-defined procedures) that the visual editor can
//! load again, synthesizing the placeholder nodes the compiled form omits.
//!
//! ## Core Workflow
//!
//! 1. **Describe**: work metadata is fetched and normalized into a
//!    [`work::WorkDescriptor`], which selects the format strategy.
//! 2. **Recover**: encrypted exports pass through the codec layer
//!    ([`codec::decrypt`]) and the resilient parser
//!    ([`codec::parse_resilient`]), which repairs payloads truncated in
//!    transit instead of discarding them.
//! 3. **Reconstruct**: for block-graph formats, every actor's flattened
//!    record map is rebuilt into connected blocks by
//!    [`graph::Reconstructor`], with [`shadow`] markup filling the empty
//!    input sockets and the [`graph::FunctionTable`] linking procedure
//!    calls to their definitions.
//! 4. **Write**: the assembled project document (or, for Nemo works, a
//!    directory tree) is written out and its absolute path returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fukugen::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let decompiler = Decompiler::new();
//!     let saved = decompiler.decompile(174_408_420, Path::new("decompiled"))?;
//!     println!("saved to {}", saved.display());
//!     Ok(())
//! }
//! ```
//!
//! Unknown or damaged fragments of a work degrade to disabled placeholder
//! blocks rather than failing the whole reconstruction; only envelope
//! authentication failures, unrepairable payloads, and unsupported format
//! variants abort a work.

pub mod codec;
pub mod decompiler;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod output;
pub mod prelude;
pub mod shadow;
pub mod strategy;
pub mod work;

pub use decompiler::Decompiler;
