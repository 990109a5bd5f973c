//! # Incremental record assembler
//!
//! Turns a flat sequence of markup events (element open, text, element close) into complete
//! [`Record`]s. Only the record currently being built is held in memory, and a record leaves
//! the assembler exactly once, as the return value of the `on_close` call that closes it.
//!
//! The assembler knows nothing about the tokenizer. [`Records`](crate::Records) drives it
//! from an `xml-rs` reader, but it may be fed by hand:
//!
//! ```rust
//! # use marc_stream::assembler::Assembler;
//! # fn main() -> Result<(), marc_stream::ParseError> {
//! let mut asm = Assembler::new();
//! asm.on_open("record", [])?;
//! asm.on_open("controlfield", [("tag", "001")])?;
//! asm.on_text("  rec-1 ")?;
//! asm.on_close("controlfield")?;
//! let record = asm.on_close("record")?.expect("record is complete");
//! asm.finish()?;
//!
//! assert_eq!(record.identifier(), Some("rec-1"));
//! assert_eq!(record.control_fields()[0].get_data(), "  rec-1 ");
//! # Ok(())
//! # }
//! ```

use std::{borrow::Cow, fmt, mem};

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ParseError, ParseErrorKind},
    field::{subfield::Subfield, ControlField, Field},
    Identifier, Indicator, Record, RecordBuilder, Tag,
};

/// Tag of the control field whose value becomes the record identifier.
pub const DEFAULT_IDENTIFIER_TAG: &str = "001";

/// Structural category of a markup element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Record,
    Leader,
    ControlField,
    DataField,
    Subfield,
    Other,
}

impl Element {
    /// Classifies an element by its local name; a namespace prefix such as `marc:` is ignored.
    pub fn classify(name: &str) -> Element {
        let local = name.rsplit(':').next().unwrap_or(name);
        match local {
            "record" => Element::Record,
            "leader" => Element::Leader,
            "controlfield" => Element::ControlField,
            "datafield" => Element::DataField,
            "subfield" => Element::Subfield,
            _ => Element::Other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Element::Record => "record",
            Element::Leader => "leader",
            Element::ControlField => "controlfield",
            Element::DataField => "datafield",
            Element::Subfield => "subfield",
            Element::Other => "other",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build state. Each variant owns whatever is in progress at that depth.
#[derive(Debug)]
enum State {
    Idle,
    InRecord(RecordBuilder),
    InLeader(RecordBuilder, String),
    InControlField(RecordBuilder, Tag, String),
    InDataField(RecordBuilder, Field),
    InSubfield(RecordBuilder, Field, Identifier, String),
    Failed,
}

impl State {
    /// Innermost open structure.
    fn open_element(&self) -> Option<Element> {
        match self {
            State::Idle | State::Failed => None,
            State::InRecord(_) => Some(Element::Record),
            State::InLeader(..) => Some(Element::Leader),
            State::InControlField(..) => Some(Element::ControlField),
            State::InDataField(..) => Some(Element::DataField),
            State::InSubfield(..) => Some(Element::Subfield),
        }
    }

    fn context(&self) -> Cow<'static, str> {
        match self.open_element() {
            None => Cow::Borrowed("outside any record"),
            Some(open) => Cow::Owned(format!("inside <{}>", open)),
        }
    }
}

/// Event-driven MARC record assembler.
#[derive(Debug)]
pub struct Assembler {
    state: State,
    identifier_tag: Tag,
    emitted: u64,
}

impl Assembler {
    /// Creates an assembler taking identifiers from the `001` control field.
    pub fn new() -> Assembler {
        Assembler::with_identifier_tag(DEFAULT_IDENTIFIER_TAG)
    }

    /// Creates an assembler taking identifiers from the given control field tag.
    pub fn with_identifier_tag<T: Into<Tag>>(tag: T) -> Assembler {
        Assembler {
            state: State::Idle,
            identifier_tag: tag.into(),
            emitted: 0,
        }
    }

    /// Number of records emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Innermost structure currently open, `None` between records.
    pub fn open_element(&self) -> Option<Element> {
        self.state.open_element()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed)
    }

    /// Handles an element-open event.
    ///
    /// Unknown elements are ignored. A known element opened where its category is not
    /// allowed (e.g. a subfield outside a data field) is a fatal structural error.
    pub fn on_open<'a, A>(&mut self, name: &str, attrs: A) -> Result<(), ParseError>
    where
        A: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.check_poisoned()?;
        let element = Element::classify(name);
        if element == Element::Other {
            return Ok(());
        }
        let attrs: Vec<(&str, &str)> = attrs.into_iter().collect();

        // left as `Failed` if any of the arms below bail out
        let state = mem::replace(&mut self.state, State::Failed);
        self.state = match (state, element) {
            (State::Idle, Element::Record) => State::InRecord(RecordBuilder::new()),
            (State::InRecord(rec), Element::Leader) => State::InLeader(rec, String::new()),
            (State::InRecord(rec), Element::ControlField) => {
                let tag = self.required(&attrs, element, "tag")?;
                State::InControlField(rec, Tag::new(tag), String::new())
            }
            (State::InRecord(rec), Element::DataField) => {
                let tag = self.required(&attrs, element, "tag")?;
                let indicator = Indicator::from_attrs(attr(&attrs, "ind1"), attr(&attrs, "ind2"));
                State::InDataField(rec, Field::new(tag, indicator))
            }
            (State::InDataField(rec, field), Element::Subfield) => {
                let code = self.required(&attrs, element, "code")?;
                // `required` never returns an empty value
                let code = code.chars().next().unwrap_or_default();
                State::InSubfield(rec, field, Identifier(code), String::new())
            }
            (state, element) => {
                return Err(self.error(ParseErrorKind::UnexpectedOpen {
                    element,
                    context: state.context(),
                }))
            }
        };
        Ok(())
    }

    /// Handles a text event.
    ///
    /// Text is appended verbatim to the open control field, subfield or leader; anywhere else
    /// it is structural whitespace and is dropped.
    pub fn on_text(&mut self, text: &str) -> Result<(), ParseError> {
        self.check_poisoned()?;
        match &mut self.state {
            State::InLeader(_, acc)
            | State::InControlField(_, _, acc)
            | State::InSubfield(_, _, _, acc) => acc.push_str(text),
            _ => (),
        }
        Ok(())
    }

    /// Handles an element-close event.
    ///
    /// Returns the completed record when `name` closes a record.
    pub fn on_close(&mut self, name: &str) -> Result<Option<Record>, ParseError> {
        self.check_poisoned()?;
        let element = Element::classify(name);
        if element == Element::Other {
            return Ok(None);
        }

        let state = mem::replace(&mut self.state, State::Failed);
        let (next, emitted) = match (state, element) {
            (State::InSubfield(rec, mut field, code, data), Element::Subfield) => {
                field.push_subfield(Subfield::new(code, data));
                (State::InDataField(rec, field), None)
            }
            (State::InDataField(mut rec, field), Element::DataField) => {
                rec.add_field(field);
                (State::InRecord(rec), None)
            }
            (State::InControlField(mut rec, tag, value), Element::ControlField) => {
                if tag == self.identifier_tag {
                    rec.set_identifier(value.trim());
                }
                rec.add_field(ControlField::new(tag, value));
                (State::InRecord(rec), None)
            }
            (State::InLeader(mut rec, leader), Element::Leader) => {
                rec.set_leader(leader);
                (State::InRecord(rec), None)
            }
            (State::InRecord(rec), Element::Record) => {
                self.emitted += 1;
                (State::Idle, Some(rec.build()))
            }
            (state, element) => {
                return Err(self.error(ParseErrorKind::UnexpectedClose {
                    element,
                    context: state.context(),
                }))
            }
        };
        self.state = next;
        Ok(emitted)
    }

    /// Signals the end of input.
    ///
    /// Fails with a truncation error if a record is still open; the partial record is dropped.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        match mem::replace(&mut self.state, State::Failed) {
            State::Idle => {
                self.state = State::Idle;
                Ok(())
            }
            State::Failed => Err(self.error(ParseErrorKind::Poisoned)),
            open => Err(self.error(ParseErrorKind::Truncated {
                open: open.open_element().unwrap_or(Element::Record),
            })),
        }
    }

    /// Marks the assembler failed and returns the error to report.
    ///
    /// Used by drivers when the tokenizer itself fails.
    pub fn abort(&mut self, kind: ParseErrorKind) -> ParseError {
        self.state = State::Failed;
        self.error(kind)
    }

    fn check_poisoned(&self) -> Result<(), ParseError> {
        match self.state {
            State::Failed => Err(self.error(ParseErrorKind::Poisoned)),
            _ => Ok(()),
        }
    }

    fn required<'a>(
        &self,
        attrs: &[(&'a str, &'a str)],
        element: Element,
        name: &'static str,
    ) -> Result<&'a str, ParseError> {
        match attr(attrs, name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.error(ParseErrorKind::MissingAttribute {
                element,
                attribute: Cow::Borrowed(name),
            })),
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.emitted + 1, kind)
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

fn attr<'a>(attrs: &[(&'a str, &'a str)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| local(key) == name)
        .map(|&(_, value)| value)
}

fn local(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn open(asm: &mut Assembler, name: &str, attrs: &[(&str, &str)]) {
        asm.on_open(name, attrs.iter().copied()).unwrap();
    }

    fn close(asm: &mut Assembler, name: &str) -> Option<Record> {
        asm.on_close(name).unwrap()
    }

    #[test]
    fn should_assemble_record_in_source_order() {
        let mut asm = Assembler::new();
        open(&mut asm, "collection", &[]);
        asm.on_text("\n  ").unwrap();
        open(&mut asm, "record", &[]);
        open(&mut asm, "controlfield", &[("tag", "001")]);
        asm.on_text("  en  ").unwrap();
        assert!(close(&mut asm, "controlfield").is_none());
        open(&mut asm, "datafield", &[("tag", "700"), ("ind1", "1"), ("ind2", " ")]);
        open(&mut asm, "subfield", &[("code", "a")]);
        asm.on_text("Doe, ").unwrap();
        asm.on_text("Jane").unwrap();
        close(&mut asm, "subfield");
        open(&mut asm, "subfield", &[("code", "d")]);
        asm.on_text("1900-").unwrap();
        close(&mut asm, "subfield");
        close(&mut asm, "datafield");
        let record = close(&mut asm, "record").unwrap();
        close(&mut asm, "collection");
        asm.finish().unwrap();

        assert_eq!(record.identifier(), Some("en"));
        assert_eq!(record.control_fields(), &[ControlField::new("001", "  en  ")]);
        assert_eq!(
            record.data_fields(),
            &[Field::from(("700", "1 ", vec![('a', "Doe, Jane"), ('d', "1900-")]))]
        );
        assert_eq!(asm.emitted(), 1);
    }

    #[test]
    fn should_ignore_namespace_prefixes_and_unknown_elements() {
        let mut asm = Assembler::new();
        open(&mut asm, "mx:record", &[]);
        open(&mut asm, "mx:note", &[]);
        asm.on_text("ignored").unwrap();
        close(&mut asm, "mx:note");
        open(&mut asm, "mx:datafield", &[("tag", "375")]);
        open(&mut asm, "mx:subfield", &[("code", "a")]);
        asm.on_text("female").unwrap();
        close(&mut asm, "mx:subfield");
        close(&mut asm, "mx:datafield");
        let record = close(&mut asm, "mx:record").unwrap();

        assert_eq!(record.identifier(), None);
        let field = &record.data_fields()[0];
        assert_eq!(field.get_indicator(), "  ");
        assert_eq!(field.subfield('a')[0].get_data(), "female");
    }

    #[test]
    fn should_capture_leader() {
        let mut asm = Assembler::new();
        open(&mut asm, "record", &[]);
        open(&mut asm, "leader", &[]);
        asm.on_text("00714cam a2200205 a 4500").unwrap();
        close(&mut asm, "leader");
        let record = close(&mut asm, "record").unwrap();
        assert_eq!(record.leader(), Some("00714cam a2200205 a 4500"));
        assert!(record.is_book());
    }

    #[test]
    fn should_use_configured_identifier_tag() {
        let mut asm = Assembler::with_identifier_tag("035");
        open(&mut asm, "record", &[]);
        open(&mut asm, "controlfield", &[("tag", "001")]);
        asm.on_text("a").unwrap();
        close(&mut asm, "controlfield");
        open(&mut asm, "controlfield", &[("tag", "035")]);
        asm.on_text(" b ").unwrap();
        close(&mut asm, "controlfield");
        let record = close(&mut asm, "record").unwrap();
        assert_eq!(record.identifier(), Some("b"));
    }

    #[test]
    fn should_reject_subfield_outside_datafield() {
        let mut asm = Assembler::new();
        open(&mut asm, "record", &[]);
        let err = asm.on_open("subfield", [("code", "a")]).unwrap_err();
        assert_eq!(err.record, 1);
        assert_eq!(
            err.kind,
            ParseErrorKind::UnexpectedOpen {
                element: Element::Subfield,
                context: "inside <record>".into(),
            }
        );
        // poisoned from here on
        assert_eq!(asm.on_text("x").unwrap_err().kind, ParseErrorKind::Poisoned);
        assert_eq!(asm.on_close("record").unwrap_err().kind, ParseErrorKind::Poisoned);
    }

    #[test]
    fn should_reject_close_without_open() {
        let mut asm = Assembler::new();
        open(&mut asm, "record", &[]);
        close(&mut asm, "record");
        open(&mut asm, "record", &[]);
        open(&mut asm, "datafield", &[("tag", "245")]);
        let err = asm.on_close("subfield").unwrap_err();
        assert_eq!(err.record, 2);
        assert_eq!(
            err.kind,
            ParseErrorKind::UnexpectedClose {
                element: Element::Subfield,
                context: "inside <datafield>".into(),
            }
        );
        assert!(asm.is_failed());
    }

    #[test]
    fn should_reject_nested_record_and_stray_fields() {
        let mut asm = Assembler::new();
        assert!(asm.on_open("controlfield", [("tag", "001")]).is_err());

        let mut asm = Assembler::new();
        open(&mut asm, "record", &[]);
        assert!(asm.on_open("record", []).is_err());
    }

    #[test]
    fn should_require_tag_and_code() {
        let mut asm = Assembler::new();
        open(&mut asm, "record", &[]);
        let err = asm.on_open("datafield", [("ind1", "0")]).unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::MissingAttribute {
                element: Element::DataField,
                attribute: "tag".into(),
            }
        );

        let mut asm = Assembler::new();
        open(&mut asm, "record", &[]);
        open(&mut asm, "datafield", &[("tag", "245")]);
        assert!(asm.on_open("subfield", [("code", "")]).is_err());
    }

    #[test]
    fn should_report_truncation_without_emitting() {
        let mut asm = Assembler::new();
        open(&mut asm, "record", &[]);
        open(&mut asm, "datafield", &[("tag", "245")]);
        open(&mut asm, "subfield", &[("code", "a")]);
        asm.on_text("partial").unwrap();
        let err = asm.finish().unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::Truncated {
                open: Element::Subfield
            }
        );
        assert_eq!(asm.emitted(), 0);
    }

    #[test]
    fn should_drop_text_outside_accumulators() {
        let mut asm = Assembler::new();
        asm.on_text("stray").unwrap();
        open(&mut asm, "record", &[]);
        asm.on_text("\n   ").unwrap();
        open(&mut asm, "datafield", &[("tag", "245")]);
        asm.on_text("\n     ").unwrap();
        close(&mut asm, "datafield");
        let record = close(&mut asm, "record").unwrap();
        assert!(record.data_fields()[0].subfields().is_empty());
        assert!(record.control_fields().is_empty());
    }
}
