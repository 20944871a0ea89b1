//! Label normalisation and natural ordering helpers.

use std::cmp::Ordering;

/// Reduces an extracted label to BIDS-safe alphanumerics, dropping a
/// leading `<entity>-` prefix left over from legacy patterns.
///
/// Returns `None` when nothing usable remains.
pub fn sanitize_label(entity: &str, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let prefix_len = entity.len() + 1;
    let without_prefix = match trimmed.get(..prefix_len) {
        Some(head)
            if head
                .get(..entity.len())
                .is_some_and(|name| name.eq_ignore_ascii_case(entity))
                && head.ends_with(['-', '_']) =>
        {
            &trimmed[prefix_len..]
        }
        _ => trimmed,
    };
    let cleaned: String = without_prefix
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Compares strings treating runs of ASCII digits as numbers.
pub fn natural_cmp(left: &str, right: &str) -> Ordering {
    let mut a = left.as_bytes();
    let mut b = right.as_bytes();
    loop {
        match (a.first(), b.first()) {
            (None, None) => return left.cmp(right),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (num_a, rest_a) = split_digits(a);
                let (num_b, rest_b) = split_digits(b);
                let trimmed_a = trim_zeros(num_a);
                let trimmed_b = trim_zeros(num_b);
                let ordering = trimmed_a
                    .len()
                    .cmp(&trimmed_b.len())
                    .then_with(|| trimmed_a.cmp(trimmed_b));
                if ordering != Ordering::Equal {
                    return ordering;
                }
                a = rest_a;
                b = rest_b;
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(y);
                }
                a = &a[1..];
                b = &b[1..];
            }
        }
    }
}

fn split_digits(bytes: &[u8]) -> (&[u8], &[u8]) {
    let end = bytes
        .iter()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(bytes.len());
    bytes.split_at(end)
}

fn trim_zeros(digits: &[u8]) -> &[u8] {
    let start = digits
        .iter()
        .position(|byte| *byte != b'0')
        .unwrap_or(digits.len());
    &digits[start..]
}
