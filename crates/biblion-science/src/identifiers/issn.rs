use crate::error::{Result, ScienceError};
use crate::identifiers::strip_label;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issn {
    /// `NNNN-NNNC`, upper-case check character.
    pub value: String,
}

impl Issn {
    /// Form-only parse: `NNNN-NNNC` with the hyphen optional. The check
    /// character is not verified.
    pub fn parse(input: &str) -> Result<Self> {
        let bare = strip_label(input, &["eissn:", "issn:"]);
        let compact: String = bare
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();

        let valid = compact.len() == 8
            && compact
                .chars()
                .enumerate()
                .all(|(i, c)| c.is_ascii_digit() || (i == 7 && c == 'X'))
            && bare.matches('-').count() <= 1
            && (!bare.contains('-') || bare.find('-') == Some(4));
        if !valid {
            return Err(ScienceError::InvalidIssn(input.to_string()));
        }

        Ok(Self {
            value: format!("{}-{}", &compact[..4], &compact[4..]),
        })
    }
}
