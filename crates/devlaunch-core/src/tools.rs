use anyhow::Result;
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Locate an executable on the current `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    find_executable_in(name, &path_var)
}

/// Locate an executable using an explicit `PATH`-style search list.
///
/// Names that already contain a path separator are checked as-is. On Windows
/// each directory is tried with every `PATHEXT` extension, so `npm` resolves
/// to `npm.cmd`.
pub fn find_executable_in(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return candidates(direct).into_iter().find(|p| is_executable(p));
    }

    env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidates(&dir.join(name)))
        .find(|p| is_executable(p))
}

/// Fail if any of `names` cannot be found on `PATH`.
pub fn ensure_tools(names: &[String]) -> Result<()> {
    for name in names {
        if find_executable(name).is_none() {
            anyhow::bail!(
                "Required tool '{}' not found in PATH. Install it or adjust PATH.",
                name
            );
        }
    }
    Ok(())
}

#[cfg(windows)]
fn candidates(base: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if base.extension().is_some() {
        out.push(base.to_path_buf());
    }
    let exts = env::var_os("PATHEXT").unwrap_or_else(|| std::ffi::OsString::from(".COM;.EXE;.BAT;.CMD"));
    for ext in exts.to_string_lossy().split(';').filter(|e| !e.is_empty()) {
        let mut file = base.as_os_str().to_os_string();
        file.push(ext.to_ascii_lowercase());
        out.push(PathBuf::from(file));
    }
    out
}

#[cfg(not(windows))]
fn candidates(base: &Path) -> Vec<PathBuf> {
    vec![base.to_path_buf()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
