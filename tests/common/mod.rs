//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Once;

use expects::{ExpectationEngine, Mode};

static INIT_LOGGING: Once = Once::new();

/// Routes `tracing` output through the test harness. `RUST_LOG` filters it.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("expects=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub const SUITE: &str = "Suite";
pub const TEST: &str = "Suite.Test";

pub fn suite_source(dir: &Path) -> PathBuf {
    dir.join("suite.robot")
}

pub fn expectation_file(dir: &Path) -> PathBuf {
    dir.join("suite.json")
}

/// Runs one suite with a single test, then saves the expectation file.
///
/// Returns whatever `body` returned, after the suite has ended.
pub fn run_test<T>(
    dir: &Path,
    mode: Mode,
    body: impl FnOnce(&mut ExpectationEngine) -> T,
) -> T {
    let engine = ExpectationEngine::with_mode(mode).unwrap();
    run_test_with(dir, engine, body)
}

pub fn run_test_with<T>(
    dir: &Path,
    mut engine: ExpectationEngine,
    body: impl FnOnce(&mut ExpectationEngine) -> T,
) -> T {
    init_test_logging();
    engine.start_suite(SUITE, &suite_source(dir)).unwrap();
    engine.start_test("Test", TEST);
    let out = body(&mut engine);
    engine.end_test("Test", TEST);
    engine.end_suite(SUITE).unwrap();
    out
}
