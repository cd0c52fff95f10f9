//! Request pipeline: many logical validators on one worker thread.
//!
//! - **Worker**: owns every session and the shared project cache, and
//!   answers requests strictly in arrival order
//! - **Client**: per-instance handles that buffer calls until the
//!   instance is initialized and match responses to calls in FIFO order
//!
//! # Example
//!
//! ```ignore
//! let pipeline = Pipeline::new()?;
//! let validator = pipeline.validator(ValidatorOptions::new("schemas"));
//! let reasons = validator
//!     .diagnose(TypeSelector::module(".", "User"), json!({"name": "ada"}))
//!     .await?;
//! ```

mod client;
mod messages;
mod worker;

pub use client::{Phase, Pipeline, PipelineValidator};
pub use messages::{Envelope, InstanceId, Request, Response, WorkerCommand};
pub use worker::ProjectRegistry;
