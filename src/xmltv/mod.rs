//! XMLTV document tree
//!
//! Upstream channel and programme elements are carried through the merge
//! verbatim, so documents are kept as a small generic element tree instead of
//! being mapped onto typed XMLTV structs. Parsing uses the quick-xml event
//! reader (see [`parser`]); output goes through the quick-xml writer with two
//! space indentation and an XML declaration (see [`writer`]).

pub mod parser;
pub mod writer;

use crate::errors::XmltvError;

pub const CHANNEL_TAG: &str = "channel";
pub const PROGRAMME_TAG: &str = "programme";

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text<T: Into<String>>(mut self, text: T) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements with the given tag name
    pub fn child_elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter_map(move |node| match node {
            XmlNode::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }
}

/// A parsed feed or a merged output
#[derive(Debug, Clone, PartialEq)]
pub struct XmltvDocument {
    root: XmlElement,
}

impl XmltvDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    pub fn parse(content: &[u8]) -> Result<Self, XmltvError> {
        parser::parse_document(content).map(Self::new)
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn channels(&self) -> impl Iterator<Item = &XmlElement> {
        self.root.child_elements(CHANNEL_TAG)
    }

    pub fn programmes(&self) -> impl Iterator<Item = &XmlElement> {
        self.root.child_elements(PROGRAMME_TAG)
    }

    pub fn channel_count(&self) -> usize {
        self.channels().count()
    }

    pub fn programme_count(&self) -> usize {
        self.programmes().count()
    }

    /// Split the top-level children into channel and programme elements,
    /// each in document order. Anything else under the root is dropped.
    pub fn into_channels_and_programmes(self) -> (Vec<XmlElement>, Vec<XmlElement>) {
        let mut channels = Vec::new();
        let mut programmes = Vec::new();
        for node in self.root.children {
            if let XmlNode::Element(el) = node {
                match el.name.as_str() {
                    CHANNEL_TAG => channels.push(el),
                    PROGRAMME_TAG => programmes.push(el),
                    _ => {}
                }
            }
        }
        (channels, programmes)
    }

    pub fn to_xml_bytes(&self) -> Result<Vec<u8>, XmltvError> {
        writer::write_document(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE tv SYSTEM "xmltv.dtd">
<tv generator-info-name="upstream">
  <!-- channels first -->
  <channel id="bbc1.uk">
    <display-name lang="en">BBC One</display-name>
    <icon src="http://logo/bbc1.png"/>
  </channel>
  <programme start="20240501060000 +0000" stop="20240501070000 +0000" channel="bbc1.uk">
    <title lang="en">Breakfast &amp; News</title>
    <desc><![CDATA[Morning <news> show]]></desc>
  </programme>
  <programme start="20240501070000 +0000" channel="bbc1.uk">
    <title>Later</title>
  </programme>
</tv>"#;

    #[test]
    fn test_extracts_channels_and_programmes() {
        let doc = XmltvDocument::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.root().name, "tv");
        assert_eq!(doc.channel_count(), 1);
        assert_eq!(doc.programme_count(), 2);

        let channel = doc.channels().next().unwrap();
        assert_eq!(channel.attribute("id"), Some("bbc1.uk"));
        let display = channel.child_elements("display-name").next().unwrap();
        assert_eq!(display.text(), "BBC One");
        assert_eq!(display.attribute("lang"), Some("en"));

        let first = doc.programmes().next().unwrap();
        assert_eq!(first.child_elements("title").next().unwrap().text(), "Breakfast & News");
        assert_eq!(first.child_elements("desc").next().unwrap().text(), "Morning <news> show");
    }

    #[test]
    fn test_split_keeps_document_order() {
        let doc = XmltvDocument::parse(SAMPLE.as_bytes()).unwrap();
        let (channels, programmes) = doc.into_channels_and_programmes();
        assert_eq!(channels.len(), 1);
        let starts: Vec<_> = programmes
            .iter()
            .map(|p| p.attribute("start").unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            starts,
            vec!["20240501060000 +0000", "20240501070000 +0000"]
        );
    }

    #[test]
    fn test_written_document_parses_back_identically() {
        let doc = XmltvDocument::parse(SAMPLE.as_bytes()).unwrap();
        let bytes = doc.to_xml_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("\n  <channel id=\"bbc1.uk\">"));
        assert!(text.contains("Breakfast &amp; News"));

        let reparsed = XmltvDocument::parse(&bytes).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_empty_root_is_valid_and_empty() {
        let doc = XmltvDocument::parse(b"<tv/>").unwrap();
        assert_eq!(doc.channel_count(), 0);
        assert_eq!(doc.programme_count(), 0);
    }
}
