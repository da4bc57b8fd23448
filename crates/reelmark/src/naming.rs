use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{ReelError, Result};

const UNNAMED: &str = "unnamed";
const SUBSTITUTE: char = '_';
const DIGEST_CHARS: usize = 12;
/// Leaves room for `_<unix-seconds>.<ext>` under the usual 255-byte name limit.
const MAX_BASE_NAME_BYTES: usize = 200;
const MAX_EXECUTION_PREFIX_BYTES: usize = 64;

/// Maps a test name to a file-system safe base name. Deterministic: path
/// separators, brackets from parameterized names, characters Windows rejects
/// and control characters all become `_`. Over-long names are cut and keep a
/// digest of the full name.
#[must_use]
pub fn resolve_name(test_name: &str) -> String {
    let out = sanitize(test_name);
    if out.len() <= MAX_BASE_NAME_BYTES {
        return out;
    }
    let keep = MAX_BASE_NAME_BYTES - DIGEST_CHARS - 1;
    format!("{}-{}", truncate_at_char_boundary(&out, keep), short_digest(test_name))
}

fn sanitize(test_name: &str) -> String {
    let out = test_name
        .chars()
        .map(|c| {
            if is_unsafe(c) {
                SUBSTITUTE
            } else {
                c
            }
        })
        .collect::<String>();
    if out.is_empty() {
        return UNNAMED.to_string();
    }
    if out.chars().all(|c| c == '.') {
        return out.chars().map(|_| SUBSTITUTE).collect();
    }
    out
}

fn is_unsafe(c: char) -> bool {
    matches!(c, '/' | '\\' | '[' | ']' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

fn short_digest(raw: &str) -> String {
    blake3::hash(raw.as_bytes()).to_hex().as_str()[..DIGEST_CHARS].to_string()
}

fn truncate_at_char_boundary(raw: &str, max_bytes: usize) -> &str {
    if raw.len() <= max_bytes {
        return raw;
    }
    let mut end = max_bytes;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

/// Private recorder directory name for one execution. The digest keeps
/// identities that sanitize or truncate to the same prefix apart.
#[must_use]
pub fn execution_dir_name(test_identity: &str) -> String {
    let sanitized = sanitize(test_identity);
    format!(
        "{}-{}",
        truncate_at_char_boundary(&sanitized, MAX_EXECUTION_PREFIX_BYTES),
        short_digest(test_identity)
    )
}

/// Moves `source` to `target_dir/base_name.ext`, falling back once to a
/// `_<unix-seconds>` suffix. Never overwrites; on failure `source` stays put.
pub fn place(source: &Path, target_dir: &Path, base_name: &str, extension: &str) -> Result<PathBuf> {
    place_at(source, target_dir, base_name, extension, Utc::now().timestamp())
}

pub(crate) fn place_at(
    source: &Path,
    target_dir: &Path,
    base_name: &str,
    extension: &str,
    timestamp: i64,
) -> Result<PathBuf> {
    let primary = target_dir.join(format!("{base_name}.{extension}"));
    if source == primary {
        return Ok(primary);
    }
    let unresolved = |target: PathBuf, reason: String| ReelError::RenameCollisionUnresolved {
        source_path: source.to_path_buf(),
        target,
        reason,
    };
    if !source.is_file() {
        return Err(unresolved(primary, "source artifact vanished".to_string()));
    }
    fs::create_dir_all(target_dir)?;

    let target = match reserve(&primary) {
        Ok(()) => primary,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            let suffixed = target_dir.join(format!("{base_name}_{timestamp}.{extension}"));
            match reserve(&suffixed) {
                Ok(()) => suffixed,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    return Err(unresolved(
                        suffixed,
                        "suffixed target already exists".to_string(),
                    ));
                }
                Err(err) => return Err(unresolved(suffixed, err.to_string())),
            }
        }
        Err(err) => return Err(unresolved(primary, err.to_string())),
    };

    // The rename only ever replaces the placeholder this call created.
    if let Err(err) = fs::rename(source, &target) {
        let _ = fs::remove_file(&target);
        return Err(unresolved(target, err.to_string()));
    }
    Ok(target)
}

/// Claims `target` with an empty placeholder; fails if anything is there.
fn reserve(target: &Path) -> std::io::Result<()> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map(|_| ())
}
