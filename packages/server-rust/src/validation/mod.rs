//! Request validation: gates that run schemas ahead of handlers, and the
//! extractor handlers use to receive the parsed values.

pub mod extract;
pub mod gate;

pub use extract::Valid;
pub use gate::{admit, Gate, GateLayer, RequestPart, DEFAULT_BODY_LIMIT};
