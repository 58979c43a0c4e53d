//! Indented XML output with declaration header

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use super::{XmlElement, XmlNode};
use crate::errors::XmltvError;

pub fn write_document(root: &XmlElement) -> Result<Vec<u8>, XmltvError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| XmltvError::write(e.to_string()))?;
    write_element(&mut writer, root)?;

    let mut output = writer.into_inner();
    output.push(b'\n');
    Ok(output)
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<(), XmltvError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| XmltvError::write(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| XmltvError::write(e.to_string()))?;

    for child in &element.children {
        match child {
            XmlNode::Element(el) => write_element(writer, el)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| XmltvError::write(e.to_string()))?,
            XmlNode::CData(text) => writer
                .write_event(Event::CData(BytesCData::new(text.as_str())))
                .map_err(|e| XmltvError::write(e.to_string()))?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| XmltvError::write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root_writes_self_closing_tag() {
        let root = XmlElement::new("tv")
            .with_attribute("generator-info-name", "EPG Merger")
            .with_attribute("generator-info-url", "http://localhost");
        let output = String::from_utf8(write_document(&root).unwrap()).unwrap();
        assert_eq!(
            output,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<tv generator-info-name=\"EPG Merger\" generator-info-url=\"http://localhost\"/>\n"
        );
    }

    #[test]
    fn test_nested_elements_are_indented_and_escaped() {
        let root = XmlElement::new("tv").with_child(
            XmlElement::new("channel")
                .with_attribute("id", "a&b")
                .with_child(XmlElement::new("display-name").with_text("News <24>")),
        );
        let output = String::from_utf8(write_document(&root).unwrap()).unwrap();
        assert!(output.contains("\n  <channel id=\"a&amp;b\">\n"));
        assert!(output.contains("\n    <display-name>News &lt;24&gt;</display-name>\n"));
        assert!(output.trim_end().ends_with("</tv>"));
    }
}
