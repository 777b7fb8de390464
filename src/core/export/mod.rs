//! Export orchestration and batch processing
//!
//! This module provides the core export logic, including:
//! - Estimating how many documents match the filter
//! - Planning fixed-size batch windows
//! - Fetching and appending windows with bounded concurrency
//! - Coordinating a run end to end, including teardown
//! - Summary and reporting

pub mod batch;
pub mod coordinator;
pub mod estimator;
pub mod pipeline;
pub mod summary;

pub use batch::{plan_batches, BatchPlan, BATCH_SIZE};
pub use coordinator::{ExportCoordinator, RunContext};
pub use estimator::{CountEstimator, INDEX_REQUIRED_MESSAGE};
pub use pipeline::{ExportPipeline, PipelineReport};
pub use summary::ExportSummary;
