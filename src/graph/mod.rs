pub mod block;
pub mod linker;
pub mod record;
pub mod reconstruct;

pub use block::*;
pub use linker::*;
pub use record::*;
pub use reconstruct::*;
