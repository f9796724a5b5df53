//! Business logic between handlers and repositories.

pub mod admission;
pub mod token_service;
pub mod verification;

pub use admission::AdmissionController;
pub use token_service::{IssuedToken, TokenIssuer};
pub use verification::{InvalidReason, Verification, VerificationEngine};
