//! # Streaming MARC XML records with flow-controlled delivery
//!
//! The crate reads MARC XML dumps (Library of Congress `collection` documents, or VIAF-style
//! `key<TAB>xml` lines) one record at a time, and moves the records to a consumer through a
//! pipeline that pauses the parser when the consumer falls behind.
//!
//! ## Examples
//!
//! ### Reading
//!
//! ```rust
//! # use marc_stream::*;
//! # fn main() -> std::result::Result<(), ParseError> {
//! let input = r#"<collection xmlns="http://www.loc.gov/MARC21/slim">
//!   <record>
//!     <controlfield tag="001">  en  </controlfield>
//!     <datafield tag="700" ind1="1" ind2=" ">
//!       <subfield code="a">Doe, Jane</subfield>
//!     </datafield>
//!   </record>
//!   <record>
//!     <controlfield tag="001">X2</controlfield>
//!   </record>
//! </collection>"#;
//!
//! let records = Records::new(input.as_bytes()).collect::<std::result::Result<Vec<_>, _>>()?;
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[0].identifier(), Some("en"));
//! assert_eq!(records[0].field("700")[0].subfield('a')[0].get_data(), "Doe, Jane");
//! assert_eq!(records[1].identifier(), Some("X2"));
//! assert!(records[1].data_fields().is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ### Creating
//!
//! ```rust
//! # use marc_stream::*;
//! let mut builder = RecordBuilder::new();
//! let record = builder
//!     .set_identifier("000000002")
//!     .add_fields(fields!(
//!         control fields: [
//!             b"001" => "000000002",
//!             b"003" => "RuMoRGB",
//!         ];
//!         data fields: [
//!             b"979", b"  ", [
//!                 b'a' => "autoref",
//!                 b'a' => "dlopen",
//!             ],
//!         ];
//!     ))
//!     .get_record();
//! assert_eq!(record.to_string(), "=001  000000002\n=003  RuMoRGB\n=979  \\\\$aautoref$adlopen\n");
//! ```
//!
//! ### Delivering
//!
//! ```rust
//! # use marc_stream::*;
//! # fn main() -> marc_stream::Result<()> {
//! let input = "<collection><record><controlfield tag=\"001\">a</controlfield></record>\
//!              </collection>";
//! let pipeline = Pipeline::new(PipelineConfig::default(), JobContext::new("example"))?;
//! let completion = pipeline.run(input.as_bytes(), Vec::<Record>::new())?;
//! assert_eq!(completion.records, 1);
//! assert_eq!(completion.sink[0].identifier(), Some("a"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms, future_incompatible)]
#![recursion_limit = "1024"]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod assembler;
pub mod config;
pub mod context;
pub mod errors;
mod field;
pub mod flat;
mod identifier;
mod indicator;
pub mod pipeline;
pub mod reader;
mod tag;
pub mod worker;
pub mod xml;

pub use errors::*;

#[doc(inline)]
pub use assembler::Assembler;
#[doc(inline)]
pub use config::{InputFormat, PipelineConfig};
#[doc(inline)]
pub use context::JobContext;
#[doc(inline)]
pub use field::subfield::Subfield;
#[doc(inline)]
pub use field::{ControlField, Field, FieldRepr};
#[doc(inline)]
pub use flat::FlatField;
#[doc(inline)]
pub use identifier::Identifier;
#[doc(inline)]
pub use indicator::Indicator;
#[doc(inline)]
pub use pipeline::{CancelHandle, Completion, Pipeline, RecordSink};
#[doc(inline)]
pub use reader::{DelimitedRecords, Records};
#[doc(inline)]
pub use tag::Tag;
#[doc(inline)]
pub use xml::MarcXml;

macro_rules! get {
    ($name:ident, $sname:ident, $num:expr) => {
        pub fn $sname(&self) -> Option<$name> {
            self.leader
                .as_deref()
                .and_then(|leader| leader.chars().nth($num))
                .map(Into::into)
        }
    };
}

/// Assembled MARC Record.
///
/// Fields keep the order in which they appeared in the source document.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    leader: Option<String>,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_id: Option<String>,
    #[serde(default)]
    control_fields: Vec<ControlField>,
    #[serde(default)]
    data_fields: Vec<Field>,
}

impl Record {
    /// Value of the identifier control field (`001` unless configured otherwise), trimmed.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Line key of a record read from a delimited dump.
    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn leader(&self) -> Option<&str> {
        self.leader.as_deref()
    }

    pub fn control_fields(&self) -> &[ControlField] {
        &self.control_fields
    }

    pub fn data_fields(&self) -> &[Field] {
        &self.data_fields
    }

    /// Will return data fields with tag == `Tag`
    pub fn field<T: Into<Tag>>(&self, tag: T) -> Vec<&Field> {
        let tag = tag.into();
        self.data_fields
            .iter()
            .filter(|f| *f.get_tag() == tag)
            .collect()
    }

    /// Will return the value of the first control field with tag == `Tag`
    pub fn control_field<T: Into<Tag>>(&self, tag: T) -> Option<&str> {
        let tag = tag.into();
        self.control_fields
            .iter()
            .find(|cf| *cf.get_tag() == tag)
            .map(ControlField::get_data)
    }

    /// Library of Congress control number (`010$a`), trimmed.
    pub fn lccn(&self) -> Option<&str> {
        self.field("010")
            .into_iter()
            .flat_map(|f| f.subfield('a'))
            .map(|sf| sf.get_data().trim())
            .next()
    }

    /// Government publication code (position 28 of the `008` control field).
    pub fn gov_pub_code(&self) -> Option<char> {
        self.control_field("008").and_then(|cf| cf.chars().nth(28))
    }

    /// Whether this record describes a book: language material that is not a government
    /// document.
    pub fn is_book(&self) -> bool {
        match self.type_of_record() {
            Some(TypeOfRecord::LanguageMaterial)
            | Some(TypeOfRecord::ManuscriptLanguageMaterial) => {
                matches!(self.gov_pub_code(), None | Some(' ') | Some('|'))
            }
            _ => false,
        }
    }

    pub(crate) fn set_source_id(&mut self, key: String) {
        self.source_id = Some(key);
    }

    get!(RecordStatus, record_status, 5);
    get!(TypeOfRecord, type_of_record, 6);
    get!(BibliographicLevel, bibliographic_level, 7);
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(leader) = &self.leader {
            writeln!(f, "=LDR  {}", leader)?;
        }
        for field in &self.control_fields {
            writeln!(f, "{}", field)?;
        }
        for field in &self.data_fields {
            writeln!(f, "{}", field)?;
        }
        Ok(())
    }
}

/// Record builder.
///
/// Fields are kept in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Creates an empty record builder
    pub fn new() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// Creates record builder from existing record
    pub fn from_record(record: &Record) -> RecordBuilder {
        RecordBuilder {
            record: record.clone(),
        }
    }

    /// Adds a control field or a data field.
    pub fn add_field<T: Into<FieldRepr>>(&mut self, f: T) -> &mut Self {
        match f.into() {
            FieldRepr::Control(cf) => self.record.control_fields.push(cf),
            FieldRepr::Data(df) => self.record.data_fields.push(df),
        }
        self
    }

    /// Adds multiple fields, e.g. the output of [`fields!`].
    pub fn add_fields<T: Into<FieldRepr>>(&mut self, fs: Vec<T>) -> &mut Self {
        for f in fs {
            self.add_field(f);
        }
        self
    }

    pub fn set_identifier<S: Into<String>>(&mut self, identifier: S) -> &mut Self {
        self.record.identifier = Some(identifier.into());
        self
    }

    pub fn set_leader<S: Into<String>>(&mut self, leader: S) -> &mut Self {
        self.record.leader = Some(leader.into());
        self
    }

    /// Will filter fields of this builder by `fun` predicate.
    pub fn filter_fields<F>(&mut self, mut fun: F) -> &mut Self
    where
        F: FnMut(&Field) -> bool,
    {
        self.record.data_fields.retain(|f| fun(f));
        self
    }

    /// Returns a copy of the record built so far.
    pub fn get_record(&self) -> Record {
        self.record.clone()
    }

    /// Consumes the builder, returning the record.
    pub fn build(self) -> Record {
        self.record
    }
}

macro_rules! leader_field(
    ($name:ident {
        $($val:expr => $kind:ident,)+
    }) => (
        #[derive(Debug, PartialEq, Eq, Clone, Copy)]
        pub enum $name {
            $($kind),+,
            Unknown(char),
        }

        impl From<char> for $name {
            fn from(x: char) -> $name {
                match x {
                    $($val => $name::$kind),+,
                    c => $name::Unknown(c),
                }
            }
        }

        impl From<$name> for char {
            fn from(x: $name) -> char {
                match x {
                    $($name::$kind => $val),+,
                    $name::Unknown(c) => c,
                }
            }
        }
    );
);

leader_field! {
    RecordStatus {
        'a' => IncreaseInEncodingLevel,
        'c' => CorrectedOrRevised,
        'd' => Deleted,
        'n' => New,
        'p' => IncreaseInEncodingLevelFromPrepublication,
    }
}

leader_field! {
    TypeOfRecord {
        'a' => LanguageMaterial,
        'c' => NotatedMusic,
        'd' => ManuscriptNotatedMusic,
        'e' => CartographicMaterial,
        'f' => ManuscriptCartographicMaterial,
        'g' => ProjectedMedium,
        'i' => NonmusicalSoundRecording,
        'j' => MusicalSoundRecording,
        'k' => TwoDimensionalNonprojectableGraphic,
        'm' => ComputerFile,
        'o' => Kit,
        'p' => MixedMaterials,
        'r' => ThreeDimensionalArtifactOrNaturallyOccurringObject,
        't' => ManuscriptLanguageMaterial,
    }
}

leader_field! {
    BibliographicLevel {
        'a' => MonographicComponentPart,
        'b' => SerialComponentPart,
        'c' => Collection,
        'd' => Subunit,
        'i' => IntegratingResource,
        'm' => MonographOrItem,
        's' => Serial,
    }
}

#[macro_export]
/// Intended to use with `RecordBuilder::add_fields`.
///
/// ```rust
/// # use marc_stream::{fields, RecordBuilder};
/// # let mut builder = RecordBuilder::new();
/// builder.add_fields(fields!(
///     control fields: [b"001" => "foo"];
///     data fields: [
///         b"856", b"41", [
///             b'q' => "bar",
///             b'u' => "baz",
///         ],
///     ];
/// ));
/// ```
macro_rules! fields {
    (
        control fields: [$($ctag:expr => $cdata:expr),* $(,)?];
    ) => (
        $crate::fields!( control fields: [ $($ctag => $cdata,)* ];
                         data fields: [ ]; )
    );
    (
        data fields: [ $( $dtag:expr, $dind:expr, [$($sfident:expr => $sfdata:expr),* $(,)?] ),* $(,)? ];
    ) => (
        $crate::fields!( control fields: [ ];
                         data fields: [ $($dtag, $dind, [ $($sfident => $sfdata,)* ],)* ]; )
    );
    (
        data fields: [ $( $dtag:expr, $dind:expr, [$($sfident:expr => $sfdata:expr),* $(,)?] ),* $(,)? ];
        control fields: [$($ctag:expr => $cdata:expr),* $(,)?];
    ) => (
        $crate::fields!( control fields: [ $($ctag => $cdata,)* ];
                         data fields: [ $($dtag, $dind, [ $($sfident => $sfdata,)* ],)* ]; )
    );
    (
        control fields: [$($ctag:expr => $cdata:expr),* $(,)?];
        data fields: [ $( $dtag:expr, $dind:expr, [$($sfident:expr => $sfdata:expr),* $(,)?] ),* $(,)? ];
    ) => ({
        let mut out: Vec<$crate::FieldRepr> = vec![];
        $(out.push(
            $crate::FieldRepr::from(
                ($crate::Tag::from($ctag), String::from($cdata))
            )
        );)*
        $({
            let mut sfs: Vec<($crate::Identifier, String)> = vec![];
            $(sfs.push(($crate::Identifier::from($sfident), String::from($sfdata)));)*
            out.push(
                $crate::FieldRepr::from(
                    ($crate::Tag::from($dtag), $crate::Indicator::from($dind), sfs)
                )
            )
        })*
        out
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_record() -> Record {
        let mut builder = RecordBuilder::new();
        builder
            .set_leader("00220nam  2200097 i 4500")
            .set_identifier("000000001")
            .add_fields(fields!(
                data fields: [
                    b"264", b" 1", [
                        b'a' => "León, Spain",
                    ],
                    b"245", b"00", [
                        b'a' => "Book title",
                        b'b' => "Book Subtitle",
                    ],
                    b"010", b"  ", [
                        b'a' => " 91008563 ",
                    ],
                ];
                control fields: [
                    b"001" => "000000001",
                    b"008" => "210128t20212021enka    sb    000 0 eng d",
                ];
            ));
        builder.build()
    }

    #[test]
    fn should_keep_insertion_order() {
        let record = test_record();
        let tags: Vec<&str> = record
            .data_fields()
            .iter()
            .map(|f| f.get_tag().as_str())
            .collect();
        assert_eq!(tags, vec!["264", "245", "010"]);
    }

    #[test]
    fn should_get_fields() {
        let record = test_record();
        assert_eq!(record.field(b"245").len(), 1);
        assert_eq!(record.field("245")[0].subfield('b')[0].get_data(), "Book Subtitle");
        assert!(record.field("999").is_empty());
        assert_eq!(record.control_field("001"), Some("000000001"));
        assert_eq!(record.control_field("005"), None);
        assert_eq!(record.lccn(), Some("91008563"));
    }

    #[test]
    fn should_decode_leader() {
        let record = test_record();
        assert_eq!(record.record_status(), Some(RecordStatus::New));
        assert_eq!(record.type_of_record(), Some(TypeOfRecord::LanguageMaterial));
        assert_eq!(
            record.bibliographic_level(),
            Some(BibliographicLevel::MonographOrItem)
        );
        assert_eq!(record.gov_pub_code(), Some(' '));
        assert!(record.is_book());

        let bare = RecordBuilder::new().build();
        assert_eq!(bare.record_status(), None);
        assert!(!bare.is_book());
        assert_eq!(RecordStatus::from('x'), RecordStatus::Unknown('x'));
    }

    #[test]
    fn should_not_treat_government_documents_as_books() {
        let mut builder = RecordBuilder::from_record(&test_record());
        builder.add_field((b"008", format!("{}f", " ".repeat(28))));
        // the first 008 still wins
        assert!(builder.get_record().is_book());

        let mut builder = RecordBuilder::new();
        builder
            .set_leader("00220nam  2200097 i 4500")
            .add_field(("008", format!("{}f000 0 eng d", " ".repeat(28))));
        assert_eq!(builder.get_record().gov_pub_code(), Some('f'));
        assert!(!builder.get_record().is_book());
    }

    #[test]
    fn should_filter_fields() {
        let mut builder = RecordBuilder::from_record(&test_record());
        builder.filter_fields(|f| f.get_tag() != "264");
        let record = builder.build();
        assert_eq!(record.data_fields().len(), 2);
        assert_eq!(record.control_fields().len(), 2);
    }

    #[test]
    fn should_display_record() {
        let expected = "=LDR  00220nam  2200097 i 4500\n\
                        =001  000000001\n\
                        =008  210128t20212021enka\\\\\\\\sb\\\\\\\\000\\0\\eng\\d\n\
                        =264  \\1$aLeón, Spain\n\
                        =245  00$aBook title$bBook Subtitle\n\
                        =010  \\\\$a 91008563 \n";
        assert_eq!(test_record().to_string(), expected);
    }
}
