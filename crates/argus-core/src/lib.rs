//! # Argus Core
//!
//! Leaf types shared by every stage of the Argus request pipeline.
//!
//! - [`CorrelationContext`] - Per-request trace ID and request ID
//! - [`RuntimeMode`] - The single explicit development/production switch
//! - [`Failure`] - Tagged union of everything a handler can fail with
//! - [`ErrorClassifier`] - Pure mapping from a [`Failure`] to a [`ClassifiedError`]
//!
//! Nothing in this crate performs I/O or holds shared state.

#![doc(html_root_url = "https://docs.rs/argus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod classify;
mod context;
mod failure;
mod mode;

pub use classify::{classify, ClassifiedError, ErrorClassifier};
pub use context::{CorrelationContext, RequestId, TraceId, REQUEST_ID_HEADER, TRACE_ID_HEADER};
pub use failure::{ConstraintKind, ConstraintViolation, ErrorMessage, Failure, HttpPayload};
pub use mode::{ParseModeError, RuntimeMode};
