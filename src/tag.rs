use std::{fmt, str};

use serde::{Deserialize, Serialize};

/// Tag of a field
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Creates a tag from the given string.
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Tag(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Control field tags start with `00`.
    pub fn is_control(&self) -> bool {
        self.0.starts_with("00")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&'_ str> for Tag {
    fn eq(&self, other: &&'_ str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<[u8; 3]> for Tag {
    fn eq(&self, other: &[u8; 3]) -> bool {
        self.0.as_bytes() == other
    }
}

impl PartialEq<&'_ [u8; 3]> for Tag {
    fn eq(&self, other: &&'_ [u8; 3]) -> bool {
        self.0.as_bytes() == *other
    }
}

impl PartialEq<Tag> for str {
    fn eq(&self, other: &Tag) -> bool {
        *other == *self
    }
}

impl PartialEq<Tag> for &'_ str {
    fn eq(&self, other: &Tag) -> bool {
        *other == *self
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'_ str> for Tag {
    fn from(s: &'_ str) -> Tag {
        Tag::new(s)
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Tag {
        Tag(s)
    }
}

impl From<&'_ [u8; 3]> for Tag {
    fn from(s: &'_ [u8; 3]) -> Tag {
        Tag(String::from_utf8_lossy(s).into_owned())
    }
}

impl From<&'_ Tag> for Tag {
    fn from(t: &'_ Tag) -> Tag {
        t.clone()
    }
}
