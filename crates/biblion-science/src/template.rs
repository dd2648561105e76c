//! `${param}` substitution for aspect roots and patterns.

use once_cell::sync::Lazy;
use regex::Regex;

use biblion_core::CollectionParams;

use crate::error::{Result, ScienceError};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*|[0-9]+)\}").expect("valid placeholder regex")
});

/// How substituted values are written into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Value inserted as-is (roots, plain strings).
    Literal,
    /// Value escaped so it matches itself inside a regex.
    Regex,
}

/// Resolve every named placeholder against `params`.
///
/// Numeric placeholders such as `${1}` are capture references and are
/// left untouched. An unknown or unset parameter is a configuration error.
pub fn substitute(template: &str, params: &CollectionParams, escape: Escape) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let name = &caps[1];
        out.push_str(&template[last..whole.start]);
        last = whole.end;

        if name.chars().all(|c| c.is_ascii_digit()) {
            out.push_str(&template[whole]);
            continue;
        }
        let value = params.get(name).ok_or_else(|| {
            ScienceError::Config(format!(
                "parameter '{name}' used in '{template}' is not set"
            ))
        })?;
        match escape {
            Escape::Literal => out.push_str(value),
            Escape::Regex => out.push_str(&regex::escape(value)),
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CollectionParams {
        CollectionParams {
            base_url: "http://www.example.org/".to_string(),
            volume_name: Some("12".to_string()),
            extra: [("journal_dir".to_string(), "j.o+t".to_string())].into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_literal_substitution() {
        let out = substitute("${base_url}vol${volume_name}/", &params(), Escape::Literal).unwrap();
        assert_eq!(out, "http://www.example.org/vol12/");
    }

    #[test]
    fn test_regex_escaping() {
        let out = substitute(r"${journal_dir}/(\d+)", &params(), Escape::Regex).unwrap();
        assert_eq!(out, r"j\.o\+t/(\d+)");
    }

    #[test]
    fn test_capture_references_survive() {
        let out = substitute("${1}-${volume_name}", &params(), Escape::Literal).unwrap();
        assert_eq!(out, "${1}-12");
    }

    #[test]
    fn test_unset_parameter_is_config_error() {
        let err = substitute("${year}/x", &params(), Escape::Literal).unwrap_err();
        assert!(matches!(err, ScienceError::Config(_)));
        assert!(substitute("${nope}", &params(), Escape::Literal).is_err());
    }
}
