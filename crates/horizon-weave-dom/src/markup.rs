//! Markup fragment parsing.
//!
//! Fragments are parsed with `quick-xml`, so they must be well formed: every
//! element is closed (`<br/>` rather than `<br>`) and attribute values are
//! quoted. A fragment may contain any number of top-level nodes.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::config::DocumentConfig;
use crate::error::{DomError, Result};

/// A node produced by the parser, before it is placed in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParsedNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<ParsedNode>,
    },
    Text(String),
    Comment(String),
}

struct OpenElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<ParsedNode>,
}

impl OpenElement {
    fn close(self) -> ParsedNode {
        ParsedNode::Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

/// Parse `markup` into its top-level nodes.
#[tracing::instrument(skip_all, target = "horizon_weave_dom::document", level = "trace", fields(len = markup.len()))]
pub(crate) fn parse_fragment(markup: &str, config: &DocumentConfig) -> Result<Vec<ParsedNode>> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = config.check_end_names;

    let mut roots: Vec<ParsedNode> = Vec::new();
    let mut stack: Vec<OpenElement> = Vec::new();

    let push = |stack: &mut Vec<OpenElement>, roots: &mut Vec<ParsedNode>, node: ParsedNode| {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    };

    loop {
        let event = reader
            .read_event()
            .map_err(|err| DomError::markup(err.to_string(), reader.error_position()))?;

        match event {
            Event::Start(start) => {
                stack.push(OpenElement {
                    tag: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                    attributes: read_attributes(&start, &reader)?,
                    children: Vec::new(),
                });
            }
            Event::Empty(empty) => {
                let node = ParsedNode::Element {
                    tag: String::from_utf8_lossy(empty.name().as_ref()).into_owned(),
                    attributes: read_attributes(&empty, &reader)?,
                    children: Vec::new(),
                };
                push(&mut stack, &mut roots, node);
            }
            Event::End(_) => {
                let Some(open) = stack.pop() else {
                    return Err(DomError::markup(
                        "closing tag without an open element",
                        reader.buffer_position(),
                    ));
                };
                push(&mut stack, &mut roots, open.close());
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|err| DomError::markup(err.to_string(), reader.buffer_position()))?;
                let blank = text.trim().is_empty();
                if !text.is_empty() && !(blank && config.trim_text) {
                    push(&mut stack, &mut roots, ParsedNode::Text(text.into_owned()));
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                push(&mut stack, &mut roots, ParsedNode::Text(text));
            }
            Event::Comment(comment) => {
                let text = String::from_utf8_lossy(&comment).into_owned();
                push(&mut stack, &mut roots, ParsedNode::Comment(text));
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(DomError::markup(
            format!("unclosed element <{}>", open.tag),
            reader.buffer_position(),
        ));
    }

    Ok(roots)
}

fn read_attributes(
    start: &quick_xml::events::BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| DomError::markup(err.to_string(), reader.buffer_position()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| DomError::markup(err.to_string(), reader.buffer_position()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}
