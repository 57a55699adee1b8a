//! Client for the deckshift conversion endpoint.
//!
//! [`ConversionPipeline`] drives the optimistic three-step progress display
//! and reconciles it with the result of a single [`ConversionTransport`]
//! call. [`HttpTransport`] is the production transport.

pub mod error;
pub mod pipeline;
pub mod transport;

pub use error::ClientError;
pub use pipeline::{
    ConversionPipeline, ConversionResult, PipelineSnapshot, PipelineTiming, StepStatus,
    STEP_COUNT, STEP_LABELS,
};
pub use transport::{ConversionTransport, HttpTransport, ServerReply, Upload};
