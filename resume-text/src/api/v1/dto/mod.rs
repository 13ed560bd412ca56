//! v1 API Data Transfer Objects.
//!
//! These types define the wire format for the v1 REST API, separate from the
//! extraction models in `src/models/`.

pub mod resumes;

pub use resumes::*;
