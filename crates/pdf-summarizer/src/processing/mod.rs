//! Task lifecycle: store, validation and the processing engine

pub mod engine;
pub mod store;
pub mod validation;

pub use engine::{SubmitReceipt, TaskEngine, PROGRESS_EXTRACTED, PROGRESS_EXTRACTING};
pub use store::{StoreStats, TaskStore, MAX_PROCESSING_PROGRESS};
pub use validation::{check_page_count, validate_upload, Upload};
