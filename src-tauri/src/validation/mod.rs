//! Request validation for the split engine.
//!
//! Rejects malformed requests before any file is opened for reading.

pub mod request_validator;

pub use request_validator::{
    validate_options, validate_request, SplitOptions, SplitRequest, ValidatedRequest,
    DEFAULT_LINES_PER_FILE,
};
