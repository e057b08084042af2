// docshield-core/src/engines/mod.rs
//! Concrete `MatchEngine` implementations and the shared overlap pass.
//!
//! # License
//! MIT OR APACHE 2.0

pub mod overlap;
pub mod regex_engine;
