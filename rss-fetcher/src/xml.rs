use crate::types::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

/// Owned XML element with its namespace already resolved.
///
/// `text` is the concatenation of the element's own text and CDATA nodes,
/// without the text of its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn is(&self, namespace: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == namespace
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text, or `None` when the element has no non-whitespace text.
    pub fn trimmed_text(&self) -> Option<&str> {
        let text = self.text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn children_where<'a, F>(&'a self, pred: F) -> impl Iterator<Item = &'a Element> + 'a
    where
        F: Fn(&Element) -> bool + 'a,
    {
        self.children.iter().filter(move |child| pred(child))
    }

    /// All descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect_descendants(self, &mut out);
        out
    }
}

fn collect_descendants<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
    for child in &element.children {
        out.push(child);
        collect_descendants(child, out);
    }
}

fn malformed(message: impl ToString) -> ParseError {
    ParseError::MalformedContent(message.to_string())
}

fn resolve_namespace(resolved: ResolveResult) -> Result<Option<String>, ParseError> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(malformed(format!(
            "unbound namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn open_element(namespace: Option<String>, start: &BytesStart) -> Result<Element, ParseError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        namespace,
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn close_element(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Parse a complete document into its root element.
///
/// Anything the XML grammar rejects (mismatched or unclosed tags, undefined
/// entities, unbound prefixes, a second root, text after the root, no root at
/// all) is reported as [`ParseError::MalformedContent`].
pub fn parse_document(content: &str) -> Result<Element, ParseError> {
    let mut reader = NsReader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (namespace, event) = match reader.read_resolved_event() {
            Ok((resolved, event)) => (resolve_namespace(resolved)?, event),
            Err(e) => return Err(malformed(format!("{} at byte {}", e, reader.error_position()))),
        };

        match event {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(malformed("junk after document element"));
                }
                let element = open_element(namespace, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(malformed("junk after document element"));
                }
                let element = open_element(namespace, &start)?;
                close_element(&mut stack, &mut root, element);
            }
            Event::End(_) => match stack.pop() {
                Some(element) => close_element(&mut stack, &mut root, element),
                None => return Err(malformed("unexpected closing tag")),
            },
            Event::Text(text) => {
                let text = text.unescape().map_err(malformed)?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(malformed("text outside of the document element")),
                }
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&String::from_utf8_lossy(&bytes)),
                    None => return Err(malformed("CDATA outside of the document element")),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| malformed("no element found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = "http://www.w3.org/2005/Atom";

    #[test]
    fn resolves_default_and_prefixed_namespaces() {
        let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:dc="http://purl.org/dc/elements/1.1/">
            <entry><title>T</title><dc:date>2024-01-01</dc:date></entry>
        </feed>"#;
        let root = parse_document(doc).unwrap();
        assert!(root.is(Some(ATOM), "feed"));
        let entry = &root.children[0];
        assert!(entry.is(Some(ATOM), "entry"));
        assert!(entry.children[0].is(Some(ATOM), "title"));
        assert!(entry.children[1].is(Some("http://purl.org/dc/elements/1.1/"), "date"));
    }

    #[test]
    fn keeps_text_cdata_and_attributes() {
        let doc = r#"<rss><channel><item>
            <description><![CDATA[<p>Hi &amp; bye</p>]]></description>
            <link rel="alternate" href="https://a.example/x?y=1&amp;z=2"/>
            <title>A &amp; B</title>
        </item></channel></rss>"#;
        let root = parse_document(doc).unwrap();
        let item = &root.children[0].children[0];
        assert_eq!(item.children[0].trimmed_text(), Some("<p>Hi &amp; bye</p>"));
        assert_eq!(item.children[1].attr("href"), Some("https://a.example/x?y=1&z=2"));
        assert_eq!(item.children[1].attr("rel"), Some("alternate"));
        assert_eq!(item.children[2].trimmed_text(), Some("A & B"));
    }

    #[test]
    fn descendants_are_in_document_order() {
        let root = parse_document("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<&str> = root.descendants().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn rejects_malformed_documents() {
        for doc in [
            "<rss><channel></rss>",
            "<rss><channel>",
            "<rss/><rss/>",
            "<rss/>trailing",
            "just text",
            "<x:rss/>",
        ] {
            assert!(
                matches!(parse_document(doc), Err(ParseError::MalformedContent(_))),
                "accepted {:?}",
                doc
            );
        }
    }
}
