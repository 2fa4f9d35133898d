//! Optional `-fsyntax-only` pass over an accepted candidate.

use std::process::Command;
use tracing::debug;

use crate::error::PigenError;

/// Compile `code` with `{compiler} -fsyntax-only` in a scratch directory.
///
/// Returns (success, combined compiler output). Only the configured compiler
/// is run; the model's own build command never is.
pub fn syntax_check(compiler: &str, code: &str) -> Result<(bool, String), PigenError> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("candidate.c");
    std::fs::write(&source, code)?;

    debug!("Running {} -fsyntax-only on {}", compiler, source.display());
    let output = Command::new(compiler)
        .arg("-fsyntax-only")
        .arg(&source)
        .current_dir(dir.path())
        .output()?;

    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok((output.status.success(), combined))
}

/// Retry instruction quoting the compiler diagnostics
pub fn syntax_reason(compiler: &str, diagnostics: &str) -> String {
    format!(
        "The code must pass `{} -fsyntax-only` without errors. Fix these diagnostics:\n{}",
        compiler,
        diagnostics.trim().replace("candidate.c", "the program")
    )
}
