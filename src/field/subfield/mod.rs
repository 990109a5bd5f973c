use serde::{Deserialize, Serialize};

use crate::{field::Field, Identifier};

/// Subfield of a MARC data field
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct Subfield {
    identifier: Identifier,
    data: String,
}

impl Subfield {
    pub fn new<Ident: Into<Identifier>, D: Into<String>>(identifier: Ident, data: D) -> Subfield {
        Subfield {
            identifier: identifier.into(),
            data: data.into(),
        }
    }

    #[doc(hidden)]
    pub fn find<Ident>(f: &Field, identifier: Ident) -> Vec<&Subfield>
    where
        Ident: Into<Identifier>,
    {
        let identifier = identifier.into();
        f.subfields()
            .iter()
            .filter(|sf| sf.identifier == identifier)
            .collect()
    }

    /// Returns identifier of this subfield
    pub fn get_identifier(&self) -> Identifier {
        self.identifier
    }

    /// Returns the accumulated text of this subfield.
    pub fn get_data(&self) -> &str {
        &self.data
    }
}

#[cfg(test)]
mod test {
    use crate::field::Field;

    #[test]
    fn should_find_subfields() {
        let field1 = Field::from(("979", "  ", vec![('a', "a"), ('b', "b"), ('b', "c")]));
        let field2 = Field::from(("650", " 0", Vec::<(char, &str)>::new()));

        let subfields1 = field1.subfield('a');
        let subfields2 = field1.subfield(b'b');
        let subfields3 = field1.subfield('c');
        let subfields4 = field2.subfield('a');

        assert_eq!(subfields1.len(), 1);
        assert_eq!(subfields2.len(), 2);
        assert_eq!(subfields2[1].get_data(), "c");
        assert_eq!(subfields3.len(), 0);
        assert_eq!(subfields4.len(), 0);
    }
}
