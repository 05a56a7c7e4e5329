//! URL slugs for categories.
//!
//! A slug is lowercase ASCII letters and digits separated by single hyphens,
//! with no leading or trailing hyphen.

const SEPARATOR: char = '-';

/// Static segments under the categories route that would shadow a
/// category looked up by slug.
pub const RESERVED_SLUGS: &[&str] = &["tree", "repair"];

/// Derive a slug from a display name.
///
/// Every maximal run of characters outside `[a-z0-9]` (after lowercasing)
/// becomes one separator, and separators at either end are stripped. The
/// result can be empty when the name has no ASCII alphanumerics.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push(SEPARATOR);
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Return `true` when `value` is already in canonical slug form.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == SEPARATOR)
        && !value.starts_with(SEPARATOR)
        && !value.ends_with(SEPARATOR)
        && !value.contains("--")
}

pub fn is_reserved_slug(value: &str) -> bool {
    RESERVED_SLUGS.contains(&value)
}

/// Normalise an explicitly supplied slug (trim + lowercase) and check it.
pub fn normalize_slug(value: &str) -> Option<String> {
    let normalized = value.trim().to_lowercase();
    is_valid_slug(&normalized).then_some(normalized)
}
