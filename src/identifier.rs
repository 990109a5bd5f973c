use std::fmt;

use serde::{Deserialize, Serialize};

/// Subfield identifier (the subfield code).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(pub char);

impl Identifier {
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl From<Identifier> for char {
    fn from(x: Identifier) -> Self {
        x.0
    }
}

impl From<char> for Identifier {
    fn from(x: char) -> Identifier {
        Identifier(x)
    }
}

impl From<u8> for Identifier {
    fn from(x: u8) -> Identifier {
        Identifier(x as char)
    }
}

impl PartialEq<char> for Identifier {
    fn eq(&self, other: &char) -> bool {
        self.0 == *other
    }
}

impl PartialEq<&'_ char> for Identifier {
    fn eq(&self, other: &&'_ char) -> bool {
        self.0 == **other
    }
}

impl PartialEq<u8> for Identifier {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other as char
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        let mut chars = other.chars();
        chars.next() == Some(self.0) && chars.next().is_none()
    }
}

impl PartialEq<&'_ str> for Identifier {
    fn eq(&self, other: &&'_ str) -> bool {
        *self == **other
    }
}

impl PartialEq<Identifier> for char {
    fn eq(&self, other: &Identifier) -> bool {
        *other == *self
    }
}

impl PartialEq<Identifier> for u8 {
    fn eq(&self, other: &Identifier) -> bool {
        *other == *self
    }
}

impl PartialEq<Identifier> for str {
    fn eq(&self, other: &Identifier) -> bool {
        *other == *self
    }
}

impl PartialEq<Identifier> for &'_ str {
    fn eq(&self, other: &Identifier) -> bool {
        *other == *self
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
