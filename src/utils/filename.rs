//! Object key sanitization
//!
//! Uploaded filenames are client-controlled. Before one is used as an object
//! key it is reduced to a flat name made of `[A-Za-z0-9_.-]`, so a key can
//! never address a "directory" or climb out of one.

use unicode_normalization::UnicodeNormalization;

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
    "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Turn a user-supplied filename into a safe object key.
///
/// The name is NFKD-decomposed so accented letters and ligatures keep their
/// ASCII base (`é` -> `e`, `ﬁ` -> `fi`), then any remaining non-ASCII is
/// dropped. Path separators and whitespace runs become `_`, anything outside
/// `[A-Za-z0-9_.-]` is removed and leading or trailing `.`/`_` are trimmed.
/// Names that collide with Windows device files get a `_` prefix.
///
/// `\` is treated as a separator on every host, not only on Windows, so
/// `..\\a\\b` becomes `a_b` rather than `ab`.
///
/// The result may be empty (e.g. for `".."`); callers must reject that.
///
/// ```
/// use bucket_gate::utils::secure_filename;
///
/// assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// ```
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    if is_windows_device_name(trimmed) {
        format!("_{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

fn is_windows_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or_default();
    WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
}
