pub mod cache;
pub mod pipeline;
pub mod sessions;
pub mod store;

pub use cache::{SegmentCache, SweepStats};
pub use pipeline::{Adapters, PipelineOrchestrator, StageError};
pub use sessions::{SessionError, SessionRegistry};
pub use store::FileStore;
