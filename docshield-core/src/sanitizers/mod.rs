// docshield-core/src/sanitizers/mod.rs
//! Rule compilation ahead of scanning.

pub mod compiler;
