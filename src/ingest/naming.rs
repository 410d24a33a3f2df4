//! Destination filenames for stored uploads.
//!
//! Two strategies exist:
//!
//! - **Generated**: `{unix_millis}-{suffix}{ext}` where `suffix` is six random
//!   alphanumeric characters and `ext` comes from the uploaded filename.
//! - **Requested**: the client supplies a name hint. Its extension is split
//!   off, the base is sanitized, and an extension is re-appended, preferring
//!   the hint's own over the uploaded file's.
//!
//! Every produced name matches `[A-Za-z0-9._-]+`, never starts with a dot and
//! never contains a path separator, so it can be joined onto the storage
//! directory as a single entry.
//!
//! # Collisions
//!
//! The suffix alphabet has 62 symbols, so two generated names from the same
//! millisecond collide with probability `62^-6` (about `1.8e-11`). For `n`
//! uploads landing in one millisecond the birthday bound is `n^2 / (2 * 62^6)`,
//! roughly `8.8e-6` for `n = 1000`.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random suffix in generated names.
pub const SUFFIX_LEN: usize = 6;

/// Replacement for characters outside the allow-list.
const REPLACEMENT: char = '-';

/// How a filename was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    /// No hint was given
    Generated,
    /// The client's hint was used
    Requested,
    /// A hint was given but sanitized to nothing, so a generated name was used
    Fallback,
}

/// Result of naming an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedName {
    /// Filename to store under
    pub filename: String,
    /// Strategy that produced it
    pub mode: NamingMode,
}

/// Derive a filename using the wall clock and the thread-local RNG.
pub fn derive_filename(hint: Option<&str>, original_name: &str) -> DerivedName {
    derive_filename_with(
        hint,
        original_name,
        current_millis(),
        &mut rand::thread_rng(),
    )
}

/// Derive a filename from explicit time and randomness sources.
pub fn derive_filename_with<R: Rng>(
    hint: Option<&str>,
    original_name: &str,
    now_millis: u128,
    rng: &mut R,
) -> DerivedName {
    let original_ext = extension(original_name);

    let Some(hint) = hint.filter(|h| !h.is_empty()) else {
        return DerivedName {
            filename: generated_name(now_millis, rng, original_ext),
            mode: NamingMode::Generated,
        };
    };

    let hint_ext = extension(hint);
    let base = sanitize_base(&hint[..hint.len() - hint_ext.len()]);
    let ext = if hint_ext.is_empty() {
        original_ext
    } else {
        hint_ext
    };

    if base.is_empty() {
        return DerivedName {
            filename: generated_name(now_millis, rng, ext),
            mode: NamingMode::Fallback,
        };
    }

    DerivedName {
        filename: format!("{}{}", base, sanitize(ext)),
        mode: NamingMode::Requested,
    }
}

/// Build a generated name: `{now_millis}-{suffix}{extension}`.
pub fn generated_name<R: Rng>(now_millis: u128, rng: &mut R, extension: &str) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    format!("{}-{}{}", now_millis, suffix, sanitize(extension))
}

/// Extension of the last path segment of `name`, including its leading dot.
///
/// Returns an empty string when there is no dot, or when the only dots lead
/// the segment (`.bashrc`, `..`).
pub fn extension(name: &str) -> &str {
    let segment_start = name
        .rfind(|c| c == '/' || c == '\\')
        .map_or(0, |i| i + 1);
    let segment = &name[segment_start..];

    match segment.rfind('.') {
        Some(dot) if segment[..dot].chars().any(|c| c != '.') => &name[segment_start + dot..],
        _ => "",
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `-`.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if is_allowed_char(c) { c } else { REPLACEMENT })
        .collect()
}

/// Sanitize a base name and drop leading dots.
fn sanitize_base(base: &str) -> String {
    sanitize(base).trim_start_matches('.').to_string()
}

/// Whether `c` may appear in a stored filename.
pub fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Whether `name` could have been produced by this module.
///
/// Used to reject retrieval requests before touching the filesystem.
pub fn is_stored_filename(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && name.chars().all(is_allowed_char)
}

fn current_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================
