//! Flattened field rows, one per control field or subfield, as handed to bulk loaders.

use serde::{Deserialize, Serialize};

use crate::{Record, Tag};

/// Tag used for the leader row.
pub const LEADER_TAG: &str = "LDR";

/// A single flattened field row.
///
/// Control fields and the leader carry neither indicators nor a subfield code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatField {
    pub fld_no: u32,
    pub tag: Tag,
    pub ind1: Option<char>,
    pub ind2: Option<char>,
    pub code: Option<char>,
    pub contents: String,
}

impl FlatField {
    fn control(fld_no: u32, tag: Tag, contents: &str) -> FlatField {
        FlatField {
            fld_no,
            tag,
            ind1: None,
            ind2: None,
            code: None,
            contents: contents.to_string(),
        }
    }
}

impl Record {
    /// Flattens this record.
    ///
    /// The leader, if any, comes first with field number 0. Control fields follow, then one
    /// row per subfield of each data field. Field numbers start at 1 in document order and
    /// the subfields of a data field share its number.
    pub fn flat_fields(&self) -> Vec<FlatField> {
        let mut rows = Vec::new();
        if let Some(leader) = self.leader() {
            rows.push(FlatField::control(0, Tag::new(LEADER_TAG), leader));
        }

        let mut fld_no = 0;
        for cf in self.control_fields() {
            fld_no += 1;
            rows.push(FlatField::control(fld_no, cf.get_tag().clone(), cf.get_data()));
        }
        for df in self.data_fields() {
            fld_no += 1;
            let indicator = df.get_indicator();
            rows.extend(df.subfields().iter().map(|sf| FlatField {
                fld_no,
                tag: df.get_tag().clone(),
                ind1: Some(indicator.first()),
                ind2: Some(indicator.second()),
                code: Some(sf.get_identifier().as_char()),
                contents: sf.get_data().to_string(),
            }));
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fields, RecordBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn should_flatten_in_document_order() {
        let mut builder = RecordBuilder::new();
        builder.set_leader("00714cam a2200205 a 4500").add_fields(fields!(
            control fields: [b"001" => "X2"];
            data fields: [
                b"650", b" 0", [],
                b"700", b"1 ", [
                    b'a' => "Doe, Jane",
                    b'd' => "1900-",
                ],
            ];
        ));
        let rows = builder.build().flat_fields();

        let summary: Vec<(u32, &str, Option<char>, &str)> = rows
            .iter()
            .map(|r| (r.fld_no, r.tag.as_str(), r.code, r.contents.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "LDR", None, "00714cam a2200205 a 4500"),
                (1, "001", None, "X2"),
                (3, "700", Some('a'), "Doe, Jane"),
                (3, "700", Some('d'), "1900-"),
            ]
        );
        assert_eq!(rows[2].ind1, Some('1'));
        assert_eq!(rows[2].ind2, Some(' '));
    }
}
