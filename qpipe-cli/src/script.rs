//! Pipeline script resolution

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Resolves the script argument to an absolute path
///
/// An absolute path must name an existing file. A relative path is tried
/// against the current directory, then against the directory holding the
/// `qpipe` executable.
pub fn resolve_script(arg: &str) -> Result<PathBuf> {
    let path = Path::new(arg);

    if path.is_absolute() {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        bail!("Script file not found: {}", arg);
    }

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    resolve_relative(path, &cwd, exe_dir.as_deref())
}

fn resolve_relative(path: &Path, cwd: &Path, exe_dir: Option<&Path>) -> Result<PathBuf> {
    let candidates = std::iter::once(cwd).chain(exe_dir);

    for base in candidates {
        let candidate = base.join(path);
        if candidate.is_file() {
            return candidate
                .canonicalize()
                .with_context(|| format!("Failed to resolve {}", candidate.display()));
        }
    }

    bail!("Script file not found: {}", path.display())
}
