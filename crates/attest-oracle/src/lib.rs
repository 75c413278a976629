//! Attest oracle: matches incoming request records against a corpus of
//! recorded test cases and reports field-level diffs for near misses.
//!
//! The library is organized leaf-first: [`key`] derives comparison keys,
//! [`store`] owns the corpus and its durable update operations, [`matcher`]
//! finds exact matches or ranks candidates, [`diff`] explains what differs,
//! and [`service`] speaks the line-oriented wire exchange.

pub mod config;
pub mod diff;
pub mod error;
pub mod key;
pub mod matcher;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::OracleError;
pub use matcher::{match_request, MatchOutcome};
pub use store::CaseSet;
