//! bioscience-common — Shared records, errors and the sample dataset used
//! across the bioscience crates.

pub mod error;
pub mod entities;
pub mod fixtures;

// Re-export commonly used types
pub use entities::{Publication, PublicationId, PublicationStats, PublicationsResponse};
pub use error::{ApiError, Result};
