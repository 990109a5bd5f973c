pub mod subfield;

use std::fmt;

use serde::{Deserialize, Serialize};

use self::subfield::Subfield;
use crate::{Identifier, Indicator, Tag};

/// Control field (`00X`) of a MARC record: a tag and a flat value.
#[derive(Eq, PartialEq, Clone, Debug, Default, Serialize, Deserialize)]
pub struct ControlField {
    tag: Tag,
    value: String,
}

impl ControlField {
    pub fn new<T: Into<Tag>, D: Into<String>>(tag: T, value: D) -> ControlField {
        ControlField {
            tag: tag.into(),
            value: value.into(),
        }
    }

    /// Returns tag of the field.
    pub fn get_tag(&self) -> &Tag {
        &self.tag
    }

    /// Returns the value exactly as it appeared in the source.
    pub fn get_data(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ControlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "={}  {}", self.tag, self.value.replace(' ', "\\"))
    }
}

/// Variable data field of a MARC record
#[derive(Eq, PartialEq, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Field {
    tag: Tag,
    indicator: Indicator,
    subfields: Vec<Subfield>,
}

impl Field {
    pub fn new<T: Into<Tag>, I: Into<Indicator>>(tag: T, indicator: I) -> Field {
        Field {
            tag: tag.into(),
            indicator: indicator.into(),
            subfields: Vec::new(),
        }
    }

    /// Will find all subfields with identifier `ident`.
    pub fn subfield<Ident: Into<Identifier>>(&self, ident: Ident) -> Vec<&Subfield> {
        Subfield::find(self, ident)
    }

    /// Subfields in source order.
    pub fn subfields(&self) -> &[Subfield] {
        &self.subfields
    }

    /// Appends a subfield, keeping source order.
    pub fn push_subfield(&mut self, subfield: Subfield) {
        self.subfields.push(subfield);
    }

    /// Returns tag of the field.
    pub fn get_tag(&self) -> &Tag {
        &self.tag
    }

    /// Returns both indicators of the field.
    pub fn get_indicator(&self) -> Indicator {
        self.indicator
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blank = |c: char| if c == ' ' { '\\' } else { c };
        write!(
            f,
            "={}  {}{}",
            self.tag,
            blank(self.indicator.first()),
            blank(self.indicator.second())
        )?;
        for sf in &self.subfields {
            write!(f, "${}{}", sf.get_identifier(), sf.get_data())?;
        }
        Ok(())
    }
}

/// Either kind of field, as accepted by `RecordBuilder::add_field`.
#[derive(Eq, PartialEq, Clone, Debug)]
pub enum FieldRepr {
    Control(ControlField),
    Data(Field),
}

impl FieldRepr {
    pub fn get_tag(&self) -> &Tag {
        match self {
            FieldRepr::Control(cf) => cf.get_tag(),
            FieldRepr::Data(df) => df.get_tag(),
        }
    }
}

impl<T, Ind, Ident, D> From<(T, Ind, Vec<(Ident, D)>)> for Field
where
    T: Into<Tag>,
    Ind: Into<Indicator>,
    Ident: Into<Identifier>,
    D: Into<String>,
{
    fn from((tag, indicator, subfields): (T, Ind, Vec<(Ident, D)>)) -> Field {
        let mut field = Field::new(tag, indicator);
        for (identifier, data) in subfields {
            field.push_subfield(Subfield::new(identifier, data));
        }
        field
    }
}

impl<T: Into<Tag>, D: Into<String>> From<(T, D)> for ControlField {
    fn from((tag, data): (T, D)) -> ControlField {
        ControlField::new(tag, data)
    }
}

impl<T, Ind, Ident, D> From<(T, Ind, Vec<(Ident, D)>)> for FieldRepr
where
    T: Into<Tag>,
    Ind: Into<Indicator>,
    Ident: Into<Identifier>,
    D: Into<String>,
{
    fn from(parts: (T, Ind, Vec<(Ident, D)>)) -> FieldRepr {
        FieldRepr::Data(parts.into())
    }
}

impl<T: Into<Tag>, D: Into<String>> From<(T, D)> for FieldRepr {
    fn from(parts: (T, D)) -> FieldRepr {
        FieldRepr::Control(parts.into())
    }
}

impl From<Field> for FieldRepr {
    fn from(f: Field) -> FieldRepr {
        FieldRepr::Data(f)
    }
}

impl From<ControlField> for FieldRepr {
    fn from(f: ControlField) -> FieldRepr {
        FieldRepr::Control(f)
    }
}
