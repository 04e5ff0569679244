pub mod engine;
pub mod memory;
pub mod outcome;

pub use engine::{EngineSettings, SyncEngine};
pub use memory::InMemoryCatalog;
pub use outcome::{SkipReason, SyncReport, UpdateOutcome, UpdateSummary};
