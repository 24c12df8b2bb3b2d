//! Shared helpers with no knowledge of assets or bundles.

pub mod fs;
pub mod kv;
pub mod path;

/// Returns `"s"` when `count != 1`, for log lines like `3 bundles`.
#[inline]
pub const fn plural_s(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// Formats `count` followed by `noun`, pluralized with a trailing `s`.
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{count} {noun}{}", plural_s(count))
}
