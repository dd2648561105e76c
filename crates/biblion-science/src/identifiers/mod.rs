//! Form checks for the identifiers carried by cooked records.

pub mod doi;
pub mod isbn;
pub mod issn;

pub use doi::Doi;
pub use isbn::Isbn;
pub use issn::Issn;

/// Strip `doi:`, `issn:`, `eisbn:` style labels and surrounding space.
pub fn strip_label<'a>(value: &'a str, labels: &[&str]) -> &'a str {
    let trimmed = value.trim();
    for label in labels {
        if trimmed.len() >= label.len()
            && trimmed.is_char_boundary(label.len())
            && trimmed[..label.len()].eq_ignore_ascii_case(label)
        {
            return trimmed[label.len()..].trim_start();
        }
    }
    trimmed
}

/// Comparable form of an ISSN/ISBN: label, hyphens and spaces removed, upper-cased.
pub fn normalize_id(value: &str) -> String {
    strip_label(value, &["eissn:", "issn:", "eisbn:", "isbn:"])
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .collect::<String>()
        .to_ascii_uppercase()
}
