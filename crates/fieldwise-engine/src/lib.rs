//! Fieldwise Engine - Validation, bounded repair, and orchestration
//!
//! Ties the extraction pipeline together for one document page: resolve the
//! schema, prompt the model gateway, parse the response, validate the
//! candidate, and - within a bounded repair budget - re-prompt with a
//! corrective instruction naming exactly the problematic fields.

pub mod orchestrator;
pub mod prompt;
pub mod validator;

pub use orchestrator::Orchestrator;
