//! Utilities for reading environment variables.

use std::ffi::OsStr;

/// Values that we consider "false" for an environment variable.
static FALSEY: &[&str] = &["0", "", "no", "false", "off"];

/// Returns true if the environment variable is set, and is _not_ one of the following:
/// `'0', '', 'no', 'false', 'off'`.
pub fn is_truthy<K: AsRef<OsStr>>(var: K) -> bool {
    // Return early if the value is not set.
    let Some(value) = std::env::var_os(var) else {
        return false;
    };
    is_truthy_value(&value)
}

/// Returns true if `value` is not one of our "falsey" candidates, ignoring case.
pub fn is_truthy_value(value: &OsStr) -> bool {
    let mut value = value.to_os_string();
    value.make_ascii_lowercase();
    !FALSEY.iter().any(|falsey| value == *falsey)
}
