//! # Module to convert assembled records back to MARC XML

use std::io::Write;

use xml::writer::{EmitterConfig, EventWriter, XmlEvent};

use crate::{ControlField, Field, Record, Result, Subfield};

const MARCXML_NS: &[(&str, &str)] = &[
    ("xmlns:marc", "http://www.loc.gov/MARC21/slim"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
    (
        "xsi:schemaLocation",
        "http://www.loc.gov/MARC21/slim http://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd",
    ),
];

pub trait XmlElement {
    fn xml_element<W: Write>(&self, w: &mut EventWriter<W>) -> Result<()>;
}

pub trait XmlRootElement {
    fn xml_root_element<W: Write>(&self, w: &mut EventWriter<W>) -> Result<()>;
}

/// Output a single record or a collection of records as MARC XML.
///
/// The output reads back through [`Records`](crate::Records) into equal records, apart from the
/// `source_id` which is not part of MARC XML.
///
/// ```rust
/// # use marc_stream::*;
/// # fn main() -> marc_stream::Result<()> {
/// let mut builder = RecordBuilder::new();
/// let record = builder
///     .set_identifier("000000002")
///     .add_fields(fields!(
///         control fields: [b"001" => "000000002"];
///         data fields: [
///             b"979", b"  ", [
///                 b'a' => "autoref",
///             ],
///         ];
///     ))
///     .get_record();
/// let xml = String::from_utf8(record.xml_minified()?).unwrap();
/// let (declaration, body) = xml.split_once("?>").unwrap();
/// assert!(declaration.to_lowercase().contains("encoding=\"utf-8\""));
/// assert_eq!(body, "<marc:record xmlns:marc=\"http://www.loc.gov/MARC21/slim\" xmlns:xsi=\"h\
/// ttp://www.w3.org/2001/XMLSchema-instance\" xsi:schemaLocation=\"http://www.loc.gov/MARC21/sli\
/// m http://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd\"><marc:controlfield tag=\"001\"\
/// >000000002</marc:controlfield><marc:datafield tag=\"979\" ind1=\" \" ind2=\" \"><marc:subfie\
/// ld code=\"a\">autoref</marc:subfield></marc:datafield></marc:record>");
/// # Ok(())
/// # }
/// ```
pub trait MarcXml
where
    Self: XmlRootElement,
{
    /// Output MARC XML
    fn xml(&self, pretty_print: bool) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut writer = EmitterConfig::new()
            .perform_indent(pretty_print)
            .create_writer(&mut buffer);

        self.xml_root_element(&mut writer)?;
        Ok(buffer)
    }

    /// Output minified (outdented) MARC XML
    fn xml_minified(&self) -> Result<Vec<u8>> {
        Self::xml(self, false)
    }

    /// Output pretty-print (indented) MARC XML
    fn xml_pretty(&self) -> Result<Vec<u8>> {
        Self::xml(self, true)
    }
}

impl MarcXml for Vec<Record> {}
impl MarcXml for Record {}

impl XmlRootElement for Vec<Record> {
    fn xml_root_element<W: Write>(&self, w: &mut EventWriter<W>) -> Result<()> {
        write_element("marc:collection", MARCXML_NS, w, |w| {
            for record in self {
                record.xml_element(w)?;
            }
            Ok(())
        })
    }
}

impl XmlRootElement for Record {
    fn xml_root_element<W: Write>(&self, w: &mut EventWriter<W>) -> Result<()> {
        write_element("marc:record", MARCXML_NS, w, |w| self.write_fields(w))
    }
}

impl XmlElement for Record {
    fn xml_element<W: Write>(&self, w: &mut EventWriter<W>) -> Result<()> {
        write_element("marc:record", &[], w, |w| self.write_fields(w))
    }
}

impl Record {
    fn write_fields<W: Write>(&self, w: &mut EventWriter<W>) -> Result<()> {
        if let Some(leader) = self.leader() {
            write_element("marc:leader", &[], w, |w| {
                w.write(XmlEvent::Characters(leader)).map_err(Into::into)
            })?;
        }
        for field in self.control_fields() {
            field.xml_element(w)?;
        }
        for field in self.data_fields() {
            field.xml_element(w)?;
        }
        Ok(())
    }
}

impl XmlElement for ControlField {
    fn xml_element<W: Write>(&self, w: &mut EventWriter<W>) -> Result<()> {
        let attributes = [("tag", self.get_tag().as_str())];
        write_element("marc:controlfield", &attributes, w, |w| {
            w.write(XmlEvent::Characters(self.get_data()))
                .map_err(Into::into)
        })
    }
}

impl XmlElement for Field {
    fn xml_element<W: Write>(&self, w: &mut EventWriter<W>) -> Result<()> {
        let indicator = self.get_indicator();
        let (ind1, ind2) = (
            indicator.first().to_string(),
            indicator.second().to_string(),
        );
        let attributes = [
            ("tag", self.get_tag().as_str()),
            ("ind1", ind1.as_str()),
            ("ind2", ind2.as_str()),
        ];
        write_element("marc:datafield", &attributes, w, |w| {
            for subfield in self.subfields() {
                subfield.xml_element(w)?;
            }
            Ok(())
        })
    }
}

impl XmlElement for Subfield {
    fn xml_element<W: Write>(&self, w: &mut EventWriter<W>) -> Result<()> {
        let code = self.get_identifier().as_char().to_string();
        write_element("marc:subfield", &[("code", code.as_str())], w, |w| {
            w.write(XmlEvent::Characters(self.get_data()))
                .map_err(Into::into)
        })
    }
}

fn write_element<W: Write, F: FnOnce(&mut EventWriter<W>) -> Result<()>>(
    element: &str,
    attr: &[(&str, &str)],
    w: &mut EventWriter<W>,
    f: F,
) -> Result<()> {
    let mut event_builder = XmlEvent::start_element(element);

    for &(k, v) in attr {
        event_builder = event_builder.attr(k, v);
    }

    let mut event: XmlEvent<'_> = event_builder.into();
    w.write(event)?;
    f(w)?;
    event = XmlEvent::end_element().into();
    w.write(event).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use crate::{fields, MarcXml, Record, RecordBuilder, Records};
    use pretty_assertions::assert_eq;
    use xml::writer::XmlEvent;
    use xml::EmitterConfig;

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
                ];
                control fields: [
                    b"001" => "000000001",
                    b"008" => "210128t20212021enka    sb    000 0 eng d",
                ];
            ));
        builder.build()
    }

    #[test]
    fn should_output_minified_xml_record() {
        let minified_xml = test_record()
            .xml_minified()
            .map(String::from_utf8)
            .unwrap()
            .unwrap();

        let (declaration, body) = minified_xml.split_once("?>").unwrap();
        assert_eq!(
            declaration.to_lowercase(),
            "<?xml version=\"1.0\" encoding=\"utf-8\""
        );

        let expected = "<marc:record xmlns:marc=\"http://www.loc.gov/MARC21/slim\" \
                               xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
                               xsi:schemaLocation=\"http://www.loc.gov/MARC21/slim \
                               http://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd\">\
                               <marc:leader>00220nam  2200097 i 4500</marc:leader>\
                               <marc:controlfield tag=\"001\">000000001</marc:controlfield>\
                               <marc:controlfield tag=\"008\">\
                               210128t20212021enka    sb    000 0 eng d</marc:controlfield>\
                               <marc:datafield tag=\"264\" ind1=\" \" ind2=\"1\">\
                               <marc:subfield code=\"a\">León, Spain</marc:subfield>\
                               </marc:datafield>\
                               <marc:datafield tag=\"245\" ind1=\"0\" ind2=\"0\">\
                               <marc:subfield code=\"a\">Book title</marc:subfield>\
                               <marc:subfield code=\"b\">Book Subtitle</marc:subfield>\
                               </marc:datafield>\
                               </marc:record>";
        assert_eq!(body, expected);
    }

    #[test]
    fn should_read_back_pretty_collection() {
        let records = vec![test_record(), RecordBuilder::new().build()];
        let xml = records.xml_pretty().unwrap();

        let read = Records::new(xml.as_slice())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn should_write_element() {
        let mut buffer = Vec::new();
        let mut writer = EmitterConfig::new()
            .write_document_declaration(false)
            .create_writer(&mut buffer);

        super::write_element(
            "test_element",
            &[("attr1", "value1"), ("attr2", "value2")],
            &mut writer,
            |w| {
                let event = XmlEvent::characters("test content");
                w.write(event).map_err(Into::into)
            },
        )
        .ok();
        let xml_str = String::from_utf8(buffer).unwrap();

        let expected_xml =
            r#"<test_element attr1="value1" attr2="value2">test content</test_element>"#;
        assert_eq!(xml_str, expected_xml);
    }
}
