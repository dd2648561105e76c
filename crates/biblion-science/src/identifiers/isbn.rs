use crate::error::{Result, ScienceError};
use crate::identifiers::strip_label;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isbn {
    pub isbn13: String,
    pub isbn10: Option<String>,
}

fn compact(input: &str) -> String {
    strip_label(input, &["eisbn:", "isbn:"])
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Digit values; a trailing `X` counts as 10 when `x_allowed`.
fn digits(s: &str, x_allowed: bool) -> Option<Vec<u32>> {
    let last = s.len().checked_sub(1)?;
    s.chars()
        .enumerate()
        .map(|(i, c)| match c {
            'X' if x_allowed && i == last => Some(10),
            c => c.to_digit(10),
        })
        .collect()
}

fn isbn13_sum(d: &[u32]) -> u32 {
    d.iter()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d } else { d * 3 })
        .sum()
}

fn isbn10_check_char(d9: &[u32]) -> char {
    let sum: u32 = d9
        .iter()
        .enumerate()
        .map(|(i, &d)| (i as u32 + 1) * d)
        .sum();
    match sum % 11 {
        10 => 'X',
        n => char::from_digit(n, 10).unwrap_or('0'),
    }
}

impl Isbn {
    /// Strict parse with checksum verification.
    pub fn parse(input: &str) -> Result<Self> {
        let s = compact(input);
        let invalid = || ScienceError::InvalidIsbn(input.to_string());

        match s.len() {
            13 => {
                let d = digits(&s, false).ok_or_else(invalid)?;
                if isbn13_sum(&d) % 10 != 0 {
                    return Err(invalid());
                }
                let isbn10 = s.starts_with("978").then(|| {
                    let mut ten: String = s[3..12].to_string();
                    ten.push(isbn10_check_char(&d[3..12]));
                    ten
                });
                Ok(Self { isbn13: s, isbn10 })
            }
            10 => {
                let d = digits(&s, true).ok_or_else(invalid)?;
                let weighted: u32 = d
                    .iter()
                    .enumerate()
                    .map(|(i, &d)| (10 - i as u32) * d)
                    .sum();
                if weighted % 11 != 0 {
                    return Err(invalid());
                }
                let mut d13 = vec![9, 7, 8];
                d13.extend_from_slice(&d[..9]);
                let check = (10 - isbn13_sum(&d13) % 10) % 10;
                d13.push(check);
                let isbn13 = d13.iter().map(|d| d.to_string()).collect();
                Ok(Self {
                    isbn13,
                    isbn10: Some(s),
                })
            }
            _ => Err(invalid()),
        }
    }

    /// Form-only check used while cooking: 10 or 13 characters of digits
    /// (the last may be `X`) once punctuation is removed. Checksums are
    /// not verified since publishers emit malformed ones. Returns the
    /// value with any `isbn:` label removed.
    pub fn check_form(input: &str) -> Result<String> {
        let s = compact(input);
        let well_formed = matches!(s.len(), 10 | 13) && digits(&s, true).is_some();
        if !well_formed {
            return Err(ScienceError::InvalidIsbn(input.to_string()));
        }
        Ok(strip_label(input, &["eisbn:", "isbn:"]).to_string())
    }
}
