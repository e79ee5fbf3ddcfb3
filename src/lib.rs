//! # orders-etl - batch cleaning and reporting for e-commerce orders
//!
//! Reads raw orders, order items, customers and products, cleans the orders,
//! answers three fixed business questions and writes the results as CSV and
//! Parquet.
//!
//! ## Quick Start
//!
//! ```no_run
//! use orders_etl::config::PipelineConfig;
//! use orders_etl::pipeline::{RunMode, run_pipeline};
//!
//! let report = run_pipeline(&PipelineConfig::default(), RunMode::Full)?;
//! println!("{}", report.summary());
//! # Ok::<(), orders_etl::error::EtlError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`source`]: input discovery and loading
//! - [`transform`]: cleaning, date normalization and aggregation
//!   - [`transform::cleaning`]: null handling and duplicate resolution
//!   - [`transform::normalize`]: best-effort `order_date` coercion
//!   - [`transform::aggregate`]: customer spend, best seller, monthly revenue
//! - [`sink`]: staged CSV/Parquet output
//! - [`pipeline`]: the executor and its run report
//! - [`model`]: typed records for every table
//! - [`error`]: error types and handling utilities
//!
//! ## Typed Records
//!
//! Polars is used at the edges (CSV and Parquet I/O, dtype summaries). The
//! stages in between operate on structs from [`model`], where a missing value
//! is an `Option` rather than a sentinel.

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod transform;
