//! Orchestration of the batch run.
//!
//! Control flow is strictly linear:
//!
//! ```text
//! Source ─> Cleaning ─> Normalization ─> Aggregation ─> Sink
//! ```
//!
//! # Example
//!
//! ```no_run
//! use orders_etl::config::PipelineConfig;
//! use orders_etl::pipeline::{RunMode, log_report, run_pipeline};
//!
//! let config = PipelineConfig::default();
//! let report = run_pipeline(&config, RunMode::Full)?;
//! log_report(&report);
//! # Ok::<(), orders_etl::error::EtlError>(())
//! ```

pub mod executor;
pub mod report;

pub use executor::{RunMode, run_pipeline, verify_run};
pub use report::{RunReport, log_report};
