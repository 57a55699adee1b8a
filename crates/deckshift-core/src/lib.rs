//! deckshift-core – conversion job orchestration.
//!
//! A single conversion request flows through four pieces, leaf-first:
//!
//! ```text
//! ConversionRequest
//!  │
//!  ├─ workspace   allocate a unique (input, output) path pair under the scratch root
//!  ├─ invoker     run the external converter against the staged input (bounded by a timeout)
//!  ├─ classifier  map a non-zero exit + stderr into a user-facing category and hint
//!  └─ endpoint    drive the above in order and produce exactly one ConversionOutcome
//! ```
//!
//! The workspace is released on every exit path by its `Drop` impl, so the
//! staged input and the produced artifact never outlive the request.

pub mod classifier;
pub mod endpoint;
pub mod error;
pub mod invoker;
pub mod naming;
pub mod outcome;
pub mod workspace;

pub use classifier::{classify, FailureCategory};
pub use endpoint::{ConversionRequest, ConversionService, UploadedFile};
pub use error::{LaunchFailure, WorkspaceError};
pub use invoker::{ConversionOptions, Converter, ConverterConfig, ProcessConverter, ProcessResult};
pub use naming::{derive_artifact_name, has_accepted_extension, ARTIFACT_CONTENT_TYPE};
pub use outcome::{ConversionOutcome, ErrorBody};
pub use workspace::{ScratchDir, Workspace};
