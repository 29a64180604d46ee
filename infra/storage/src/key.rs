use crate::error::StorageError;
use std::fmt::Write as _;

/// Separator between key segments.
pub const SEPARATOR: char = '/';

fn is_key_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | '%')
}

/// Validates a store key: `/`-separated, non-empty segments of `[a-z0-9_.%-]`
/// that never start with a dot.
///
/// Dot-led segments are reserved, which rules out `.`/`..` traversal and keeps
/// backend bookkeeping files out of the key space.
///
/// # Errors
/// Returns [`StorageError::InvalidKey`] describing the first violation.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(invalid(key, "Key cannot be empty"));
    }

    for segment in key.split(SEPARATOR) {
        if segment.is_empty() {
            return Err(invalid(key, "Key contains an empty segment"));
        }
        if segment.starts_with('.') {
            return Err(invalid(key, "Key segments cannot start with '.'"));
        }
        if !segment.chars().all(is_key_char) {
            return Err(invalid(key, "Key contains illegal characters"));
        }
    }

    Ok(())
}

/// Validates a prefix passed to `keys`. The empty prefix matches everything.
pub(crate) fn validate_prefix(prefix: &str) -> Result<(), StorageError> {
    if prefix.is_empty() {
        return Ok(());
    }
    validate_key(prefix.trim_end_matches(SEPARATOR))
}

/// Joins validated segments into a key.
///
/// # Errors
/// Returns [`StorageError::InvalidKey`] if the joined key is not valid.
pub fn join_key<I, S>(segments: I) -> Result<String, StorageError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = String::new();
    for segment in segments {
        if !key.is_empty() {
            key.push(SEPARATOR);
        }
        key.push_str(segment.as_ref());
    }
    validate_key(&key)?;
    Ok(key)
}

/// Encodes arbitrary text (user ids, e-mail addresses) as a single key segment.
///
/// Bytes outside `[a-z0-9_-]`, a leading `.`, and `%` itself are written as `%xx`,
/// so distinct inputs never collide. The empty string becomes a lone `%`.
#[must_use]
pub fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, byte) in raw.bytes().enumerate() {
        let c = char::from(byte);
        let plain = c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || c == '_'
            || c == '-'
            || (c == '.' && i > 0);
        if plain {
            out.push(c);
        } else {
            let _ = write!(out, "%{byte:02x}");
        }
    }
    if out.is_empty() {
        out.push('%');
    }
    out
}

fn invalid(key: &str, reason: &'static str) -> StorageError {
    StorageError::InvalidKey { message: key.to_owned().into(), context: Some(reason.into()) }
}
