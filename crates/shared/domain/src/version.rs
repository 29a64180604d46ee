//! Dot-separated numeric version comparison.
//!
//! Segments compare numerically and a missing segment counts as `0`, so `"2"`,
//! `"2.0"` and `"2.0.0"` are equal. Non-digit suffixes inside a segment
//! (`"3-beta"`) are ignored; a segment without leading digits counts as `0`.

use std::cmp::Ordering;

fn segment_value(segment: &str) -> u64 {
    segment
        .trim()
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, b| acc.saturating_mul(10).saturating_add(u64::from(b - b'0')))
}

/// Compares two versions segment by segment.
///
/// ```rust
/// use fstone_domain::version::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
/// assert_eq!(compare_versions("2", "2.0.0"), Ordering::Equal);
/// ```
#[must_use]
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let mut a = left.split('.').map(segment_value);
    let mut b = right.split('.').map(segment_value);
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (x, y) => match x.unwrap_or(0).cmp(&y.unwrap_or(0)) {
                Ordering::Equal => {},
                other => return other,
            },
        }
    }
}

/// Whether `version` lies within `min..=max` (`max` is optional).
#[must_use]
pub fn satisfies(version: &str, min: &str, max: Option<&str>) -> bool {
    compare_versions(version, min) != Ordering::Less
        && max.is_none_or(|max| compare_versions(version, max) != Ordering::Greater)
}
