//! Error model, normalization and rendering.
//!
//! Every failure raised while serving a request ends up here:
//! gate or handler error → [`ApiError`] → [`normalize`] → [`HttpError`] →
//! [`ErrorRenderer`] → JSON response. No failure escapes the pipeline
//! without being normalized and rendered.

pub mod layer;
pub mod model;
pub mod normalize;
pub mod render;

pub use layer::{RenderErrors, RenderErrorsLayer};
pub use model::{valid_status, ApiError, Fault, HttpError, DEFAULT_INTERNAL_ERROR_MESSAGE};
pub use normalize::{normalize, normalize_panic};
pub use render::{ErrorRenderer, RenderedErrorBody, RequestInfo};
