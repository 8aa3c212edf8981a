//! Vector index backends: LanceDB (one table per namespace) and an in-memory
//! index with the same contract.

pub mod lance;
pub mod memory;
pub mod schema;
pub mod table;

pub use lance::LanceIndex;
pub use memory::MemoryIndex;
