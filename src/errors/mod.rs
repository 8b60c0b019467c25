//! Error types and error handling for the resolver.
//!
//! This module defines the diagnostic records produced by the semantic
//! engine. It includes:
//!
//! - Error structures with source position information
//! - Specific error variants for each semantic failure class
//! - Error formatting and display functionality
//! - Helpful error messages and suggestions
//!
//! Internal-consistency violations are deliberately absent: those are not
//! user diagnostics and are logged through `tracing` instead.

pub mod errors;
