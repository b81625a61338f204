//! `bau-core`: shared domain primitives for the staffing platform.
//!
//! Only identifiers and the domain error model live here; no IO.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{BetriebId, UserId};
