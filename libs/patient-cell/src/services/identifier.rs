use std::fmt;

use thiserror::Error;

/// Highest sequence number within one series.
pub const MAX_SEQUENCE: u32 = 99_999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("Identifier prefix must be exactly three letters, got '{0}'")]
    InvalidPrefix(String),

    #[error("Malformed visible identifier '{0}'")]
    Malformed(String),
}

/// Human-readable patient identifier, treated as an odometer.
///
/// Sequence: `APL-00001` .. `APL-99999`, `APL-A-00001` .. `APL-Z-99999`,
/// then the prefix itself advances (`APM-A-00001`), carrying right to left
/// with `Z` wrapping to `A`. Field order gives the derived `Ord` the same
/// order as the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisibleId {
    prefix: [u8; 3],
    series: Option<u8>,
    number: u32,
}

impl VisibleId {
    /// First identifier of a prefix, `PFX-00001`.
    pub fn first(prefix: &str) -> Result<Self, IdentifierError> {
        Ok(Self {
            prefix: normalize_prefix(prefix)?,
            series: None,
            number: 1,
        })
    }

    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let malformed = || IdentifierError::Malformed(value.to_string());
        let parts: Vec<&str> = value.trim().split('-').collect();

        let (prefix, series, digits) = match parts.as_slice() {
            [prefix, digits] => (*prefix, None, *digits),
            [prefix, series, digits] => {
                let letter = match series.as_bytes() {
                    [b] if b.is_ascii_uppercase() => *b,
                    _ => return Err(malformed()),
                };
                (*prefix, Some(letter), *digits)
            }
            _ => return Err(malformed()),
        };

        if prefix.len() != 3 || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(malformed());
        }
        if digits.len() != 5 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let number: u32 = digits.parse().map_err(|_| malformed())?;

        Ok(Self {
            prefix: normalize_prefix(prefix)?,
            series,
            number,
        })
    }

    pub fn prefix(&self) -> String {
        self.prefix.iter().map(|&b| b as char).collect()
    }

    pub fn series(&self) -> Option<char> {
        self.series.map(char::from)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// `ZZZ-Z-99999`, the last value before the odometer wraps.
    pub fn is_exhausted(&self) -> bool {
        self.prefix == *b"ZZZ" && self.series == Some(b'Z') && self.number >= MAX_SEQUENCE
    }

    pub fn increment(self) -> Self {
        if self.number < MAX_SEQUENCE {
            return Self {
                number: self.number + 1,
                ..self
            };
        }

        match self.series {
            None => Self {
                series: Some(b'A'),
                number: 1,
                ..self
            },
            Some(b'Z') => Self {
                prefix: carry_prefix(self.prefix),
                series: Some(b'A'),
                number: 1,
            },
            Some(letter) => Self {
                series: Some(letter + 1),
                number: 1,
                ..self
            },
        }
    }
}

impl fmt::Display for VisibleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.series {
            Some(letter) => write!(f, "{}-{}-{:05}", self.prefix(), letter as char, self.number),
            None => write!(f, "{}-{:05}", self.prefix(), self.number),
        }
    }
}

/// Next identifier after `previous_max`, or the first one for `prefix`.
pub fn next_identifier(prefix: &str, previous_max: Option<&str>) -> Result<String, IdentifierError> {
    let next = match previous_max {
        Some(previous) => VisibleId::parse(previous)?.increment(),
        None => VisibleId::first(prefix)?,
    };
    Ok(next.to_string())
}

fn normalize_prefix(prefix: &str) -> Result<[u8; 3], IdentifierError> {
    let upper = prefix.trim().to_ascii_uppercase();
    match upper.as_bytes() {
        [a, b, c] if [a, b, c].iter().all(|ch| ch.is_ascii_uppercase()) => Ok([*a, *b, *c]),
        _ => Err(IdentifierError::InvalidPrefix(prefix.to_string())),
    }
}

fn carry_prefix(mut prefix: [u8; 3]) -> [u8; 3] {
    for slot in prefix.iter_mut().rev() {
        if *slot == b'Z' {
            *slot = b'A';
        } else {
            *slot += 1;
            break;
        }
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_sequence_increments() {
        assert_eq!(next_identifier("APL", Some("APL-00001")).unwrap(), "APL-00002");
        assert_eq!(next_identifier("APL", Some("APL-00999")).unwrap(), "APL-01000");
    }

    #[test]
    fn test_first_identifier_for_empty_prefix() {
        assert_eq!(next_identifier("apl", None).unwrap(), "APL-00001");
    }

    #[test]
    fn test_overflow_introduces_series_letter() {
        assert_eq!(next_identifier("APL", Some("APL-99999")).unwrap(), "APL-A-00001");
        assert_eq!(next_identifier("APL", Some("APL-A-99999")).unwrap(), "APL-B-00001");
    }

    #[test]
    fn test_series_overflow_carries_into_prefix() {
        assert_eq!(next_identifier("APL", Some("APL-Z-99999")).unwrap(), "APM-A-00001");
        assert_eq!(next_identifier("APL", Some("APZ-Z-99999")).unwrap(), "AQA-A-00001");
        assert_eq!(next_identifier("APL", Some("AZZ-Z-99999")).unwrap(), "BAA-A-00001");
    }

    #[test]
    fn test_exhausted_odometer_wraps() {
        let last = VisibleId::parse("ZZZ-Z-99999").unwrap();
        assert!(last.is_exhausted());
        assert_eq!(last.increment().to_string(), "AAA-A-00001");
    }

    #[test]
    fn test_ordering_follows_sequence() {
        let ids = ["APL-00002", "APL-99999", "APL-A-00001", "APL-Z-99999", "APM-A-00001"];
        let parsed: Vec<VisibleId> = ids.iter().map(|id| VisibleId::parse(id).unwrap()).collect();
        assert!(parsed.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        for bad in ["APL-1", "APL-0001A", "AP-00001", "APL-AB-00001", "apl-00001", "APL-a-00001", ""] {
            assert!(VisibleId::parse(bad).is_err(), "{} should not parse", bad);
        }
        assert_eq!(
            VisibleId::first("AP1"),
            Err(IdentifierError::InvalidPrefix("AP1".to_string()))
        );
    }
}
