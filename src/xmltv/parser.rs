//! Quick-XML based tree builder
//!
//! Names, attribute values and text are decoded with the encoding declared in
//! the prolog (or signalled by a BOM), so non-UTF-8 feeds come out as
//! ordinary strings. Whitespace-only text is dropped so re-serialization can apply its own
//! indentation; all other text is kept verbatim. Comments, processing
//! instructions and the doctype are discarded.

use quick_xml::encoding::Decoder;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;

use super::{XmlElement, XmlNode};
use crate::errors::XmltvError;

pub fn parse_document(content: &[u8]) -> Result<XmlElement, XmltvError> {
    let mut reader = Reader::from_reader(content);
    let mut buf = Vec::new();

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            XmltvError::malformed(format!("{e} at position {}", reader.buffer_position()))
        })?;
        let decoder = reader.decoder();

        match event {
            Event::Start(ref e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmltvError::malformed("multiple root elements"));
                }
                stack.push(element_from_start(e, decoder)?);
            }
            Event::Empty(ref e) => {
                let element = element_from_start(e, decoder)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmltvError::malformed("unexpected closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                let raw = decode(decoder, e, "text")?;
                let text = unescape(&raw)
                    .map_err(|e| XmltvError::malformed(format!("invalid text: {e}")))?;
                if !text.trim().is_empty() {
                    push_text(&mut stack, XmlNode::Text(text.into_owned()))?;
                }
            }
            Event::CData(ref e) => {
                let text = decode(decoder, e, "CDATA")?;
                push_text(&mut stack, XmlNode::CData(text.into_owned()))?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(XmltvError::malformed(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| XmltvError::malformed("document has no root element"))
}

fn decode<'b>(
    decoder: Decoder,
    bytes: &'b [u8],
    what: &str,
) -> Result<Cow<'b, str>, XmltvError> {
    decoder
        .decode(bytes)
        .map_err(|e| XmltvError::malformed(format!("undecodable {what}: {e}")))
}

fn element_from_start(start: &BytesStart, decoder: Decoder) -> Result<XmlElement, XmltvError> {
    let name = decode(decoder, start.name().as_ref(), "element name")?.into_owned();

    let mut element = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmltvError::malformed(format!("bad attribute: {e}")))?;
        let key = decode(decoder, attr.key.as_ref(), "attribute name")?.into_owned();
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(|e| XmltvError::malformed(format!("bad value for attribute '{key}': {e}")))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmltvError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_some() => return Err(XmltvError::malformed("multiple root elements")),
        None => *root = Some(element),
    }
    Ok(())
}

fn push_text(stack: &mut [XmlElement], node: XmlNode) -> Result<(), XmltvError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None => Err(XmltvError::malformed("text content outside the root element")),
    }
}
