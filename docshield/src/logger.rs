// docshield/src/logger.rs
//! Logger bootstrap for the docshield binary.
//!
//! `RUST_LOG` is honored unless an explicit level is passed. Log lines go to
//! stderr so that redacted output on stdout stays clean.

use std::io::Write;

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Initializes `env_logger`. `level` overrides `RUST_LOG` for every target when set.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder
        .target(Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    let _ = builder.try_init();
}

/// Picks the effective level from the `--quiet` and `--debug` flags.
pub fn level_from_flags(quiet: bool, debug: bool) -> Option<LevelFilter> {
    match (quiet, debug) {
        (true, _) => Some(LevelFilter::Off),
        (false, true) => Some(LevelFilter::Debug),
        (false, false) => None,
    }
}
