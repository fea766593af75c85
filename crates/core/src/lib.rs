//! Linewatch domain logic.
//!
//! Pure types and functions shared by the pipeline and the API server:
//! reading/bounds/status types, payload normalization, threshold
//! evaluation, stats window computation, and the sensor topic tables.
//! No I/O happens in this crate.

pub mod error;
pub mod normalize;
pub mod reading;
pub mod stats;
pub mod threshold;
pub mod topics;
pub mod types;
