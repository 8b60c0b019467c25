//! Semantic resolution module.
//!
//! This module turns a forest of scope-linked syntax trees into a fully
//! resolved program:
//!
//! - Binding every name to a unique declaration
//! - Reducing every type expression to canonical form
//! - Instantiating generic classes for their concrete arguments
//! - Ranking implicit/explicit conversion and construction paths
//! - Assigning every declaration its canonical mangled symbol
//!
//! The five algorithms are mutually recursive over one `Resolver` value and
//! its `Context`; re-entrancy is bounded by explicit guard stacks, never by
//! timeouts. Failures are sentinels plus diagnostics in the shared sink,
//! never unwinding.

pub mod context;
pub mod convert;
pub mod mangle;
pub mod reach;
pub mod template;
pub mod types;
pub mod validate;
