//! Config writer and patcher
//!
//! Patching replaces ALL literal occurrences of the search text. The stock
//! unit files contain the hardening flag once, so in practice one line
//! changes.

use hostkit::Host;

use super::error::ProvisionError;

/// Result of [`ensure_patched`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Search text replaced this many times and the file written back
    Patched { replacements: usize },
    /// Search text absent, replacement already present; nothing written
    AlreadyPatched,
}

/// Deliver `content` as the complete contents of `path`.
pub fn write_config(host: &dyn Host, path: &str, content: &str) -> Result<(), ProvisionError> {
    host.write_file(path, content)
        .map_err(|source| ProvisionError::WriteError {
            path: path.to_string(),
            source,
        })
}

/// Replace every occurrence of `search` in `content`.
///
/// Returns the new text and the number of replacements, or `None` when
/// `search` does not occur.
pub fn patch_text(content: &str, search: &str, replace: &str) -> Option<(String, usize)> {
    if search.is_empty() {
        return None;
    }
    let count = content.matches(search).count();
    if count == 0 {
        return None;
    }
    Some((content.replace(search, replace), count))
}

fn read_existing(host: &dyn Host, path: &str) -> Result<String, ProvisionError> {
    match host.read_file(path) {
        Ok(Some(content)) => Ok(content),
        Ok(None) => Err(ProvisionError::PatchError {
            path: path.to_string(),
            reason: "file does not exist".to_string(),
        }),
        Err(e) => Err(ProvisionError::PatchError {
            path: path.to_string(),
            reason: format!("cannot read file: {e}"),
        }),
    }
}

fn write_patched(
    host: &dyn Host,
    path: &str,
    content: &str,
    search: &str,
    replace: &str,
) -> Result<usize, ProvisionError> {
    let Some((patched, count)) = patch_text(content, search, replace) else {
        return Err(ProvisionError::PatchError {
            path: path.to_string(),
            reason: format!("{search:?} not found"),
        });
    };

    host.write_file(path, &patched)
        .map_err(|e| ProvisionError::PatchError {
            path: path.to_string(),
            reason: format!("cannot write file: {e}"),
        })?;

    Ok(count)
}

/// Literal find/replace on an existing file.
///
/// Fails with [`ProvisionError::PatchError`] when the file is missing or
/// `search` does not occur: a silent no-op would hide a stock file that no
/// longer looks the way this tool expects.
pub fn patch_config(
    host: &dyn Host,
    path: &str,
    search: &str,
    replace: &str,
) -> Result<usize, ProvisionError> {
    let content = read_existing(host, path)?;
    write_patched(host, path, &content, search, replace)
}

/// Re-run tolerant [`patch_config`].
///
/// A file that no longer contains `search` but already contains `replace`
/// is reported as [`PatchOutcome::AlreadyPatched`] and left untouched.
pub fn ensure_patched(
    host: &dyn Host,
    path: &str,
    search: &str,
    replace: &str,
) -> Result<PatchOutcome, ProvisionError> {
    let content = read_existing(host, path)?;

    if !content.contains(search) && !replace.is_empty() && content.contains(replace) {
        log::info!("{path} already contains {replace:?}");
        return Ok(PatchOutcome::AlreadyPatched);
    }

    let replacements = write_patched(host, path, &content, search, replace)?;
    Ok(PatchOutcome::Patched { replacements })
}
