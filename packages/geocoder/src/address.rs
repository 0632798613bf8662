//! Address normalisation for geocoding queries.
//!
//! The normalised form is the cache key: surrounding whitespace is removed
//! and inner runs of whitespace collapse to a single space. Case is kept as
//! typed.

/// Normalises a free-text address. Returns an empty string for blank input.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds the provider query by appending the locality suffix.
///
/// The suffix is not repeated when the address already ends with it
/// (compared case-insensitively), and an empty suffix leaves the address
/// unchanged.
#[must_use]
pub fn with_locality(address: &str, suffix: &str) -> String {
    let suffix = suffix.trim();
    if suffix.is_empty() {
        return address.to_string();
    }

    let already_suffixed = address.len() >= suffix.len()
        && address
            .get(address.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix));

    if already_suffixed {
        address.to_string()
    } else {
        format!("{address}, {suffix}")
    }
}
