use serde::{Deserialize, Serialize};

/// Variable data field indicator.
///
/// A missing or empty indicator is stored as a blank (`' '`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Indicator(pub [char; 2]);

impl Indicator {
    pub const BLANK: char = ' ';

    /// Creates an indicator from `ind1`/`ind2` attribute values.
    ///
    /// Only the first char of each value is kept.
    pub fn from_attrs(ind1: Option<&str>, ind2: Option<&str>) -> Self {
        Indicator([first_char(ind1), first_char(ind2)])
    }

    pub fn first(&self) -> char {
        self.0[0]
    }

    pub fn second(&self) -> char {
        self.0[1]
    }
}

fn first_char(value: Option<&str>) -> char {
    value
        .and_then(|v| v.chars().next())
        .unwrap_or(Indicator::BLANK)
}

impl Default for Indicator {
    fn default() -> Self {
        Indicator([Indicator::BLANK; 2])
    }
}

impl From<[char; 2]> for Indicator {
    fn from(s: [char; 2]) -> Indicator {
        Indicator(s)
    }
}

impl From<&'_ str> for Indicator {
    fn from(s: &'_ str) -> Indicator {
        let mut chars = s.chars();
        Indicator([
            chars.next().unwrap_or(Indicator::BLANK),
            chars.next().unwrap_or(Indicator::BLANK),
        ])
    }
}

impl From<&'_ [u8; 2]> for Indicator {
    fn from(s: &'_ [u8; 2]) -> Indicator {
        Indicator([s[0] as char, s[1] as char])
    }
}

impl PartialEq<[char; 2]> for Indicator {
    fn eq(&self, other: &[char; 2]) -> bool {
        self.0 == *other
    }
}

impl PartialEq<str> for Indicator {
    fn eq(&self, other: &str) -> bool {
        *self == Indicator::from(other) && other.chars().count() == 2
    }
}

impl PartialEq<&'_ str> for Indicator {
    fn eq(&self, other: &&'_ str) -> bool {
        *self == **other
    }
}

impl PartialEq<Indicator> for str {
    fn eq(&self, other: &Indicator) -> bool {
        *other == *self
    }
}

impl PartialEq<Indicator> for &'_ str {
    fn eq(&self, other: &Indicator) -> bool {
        *other == *self
    }
}

#[cfg(test)]
mod tests {
    use super::Indicator;

    #[test]
    fn should_default_missing_values_to_blank() {
        let ind = Indicator::from_attrs(Some("1"), None);
        assert_eq!(ind.first(), '1');
        assert_eq!(ind.second(), ' ');
        assert_eq!(Indicator::from_attrs(Some(""), Some("04")), " 0");
    }
}
