//! Retrieval engine: ingest documents into namespaced vector partitions and
//! answer top-k similarity queries, degrading to an empty context when the
//! index is not available.

pub mod connect;
pub mod engine;
pub mod reset;
pub mod state;

pub use connect::{connect, DynEngine};
pub use engine::{EngineOptions, RetrievalEngine};
pub use reset::ResetReport;
pub use state::{EngineState, EngineStatus};
