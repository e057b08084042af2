// docshield/src/lib.rs
//! # Docshield CLI and HTTP server
//!
//! This crate provides the terminal and HTTP front ends for the
//! `docshield-core` redaction engine. Both front ends operate on a
//! [`docshield_core::JsonFileStore`]; the library is exposed so the
//! integration tests can drive the router and the command helpers directly.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod server;
pub mod ui;

pub use server::{AppState, router};
