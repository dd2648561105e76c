use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

pub type NodeId = usize;

#[derive(Debug, Clone)]
enum Child {
    Element(NodeId),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<Child>,
}

/// An element tree built from one XML document.
///
/// Node 0 is a synthetic document node whose children are the top-level
/// elements. Ids grow in document order.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse a complete document. Errors carry the reader's message.
    pub fn parse(xml: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut nodes = vec![Node {
            name: String::new(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }];
        let mut stack: Vec<NodeId> = vec![0];
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let id = push_element(&mut nodes, &stack, e);
                    stack.push(id);
                }
                Ok(Event::Empty(ref e)) => {
                    push_element(&mut nodes, &stack, e);
                }
                Ok(Event::End(_)) => {
                    if stack.len() <= 1 {
                        return Err("unbalanced end tag".to_string());
                    }
                    stack.pop();
                }
                Ok(Event::Text(ref e)) => {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(_) => String::from_utf8_lossy(e).into_owned(),
                    };
                    push_text(&mut nodes, &stack, text);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    push_text(&mut nodes, &stack, text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(format!("at byte {}: {e}", reader.buffer_position())),
            }
            buf.clear();
        }

        if stack.len() > 1 {
            return Err(format!("unclosed element <{}>", nodes[stack[stack.len() - 1]].name));
        }
        let has_root = nodes[0]
            .children
            .iter()
            .any(|c| matches!(c, Child::Element(_)));
        if !has_root {
            return Err("no root element".to_string());
        }
        Ok(Self { nodes })
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id].name
    }

    /// Name without namespace prefix.
    pub fn local_name(&self, id: NodeId) -> &str {
        local(&self.nodes[id].name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        &self.nodes[id].attributes
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id]
            .attributes
            .iter()
            .find(|(key, _)| name_matches(name, key))
            .map(|(_, value)| value.as_str())
    }

    /// Element children in document order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id].children.iter().filter_map(|c| match c {
            Child::Element(child) => Some(*child),
            Child::Text(_) => None,
        })
    }

    /// First element child called `name`.
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .find(|child| name_matches(name, self.name(*child)))
    }

    /// All element descendants in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut kids: Vec<NodeId> = self.children(next).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Concatenated text of the subtree with whitespace collapsed.
    pub fn text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_text(id, &mut raw);
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Text of the first child called `name`, if non-empty.
    pub fn child_text(&self, id: NodeId, name: &str) -> Option<String> {
        self.child(id, name)
            .map(|child| self.text(child))
            .filter(|text| !text.is_empty())
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for child in &self.nodes[id].children {
            match child {
                Child::Text(text) => out.push_str(text),
                Child::Element(el) => {
                    // element boundaries separate words
                    out.push(' ');
                    self.collect_text(*el, out);
                    out.push(' ');
                }
            }
        }
    }
}

fn push_element(nodes: &mut Vec<Node>, stack: &[NodeId], start: &BytesStart<'_>) -> NodeId {
    let parent = stack.last().copied().unwrap_or(0);
    let attributes = start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            (key, value)
        })
        .collect();
    let id = nodes.len();
    nodes.push(Node {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attributes,
        parent: Some(parent),
        children: Vec::new(),
    });
    nodes[parent].children.push(Child::Element(id));
    id
}

fn push_text(nodes: &mut [Node], stack: &[NodeId], text: String) {
    let parent = stack.last().copied().unwrap_or(0);
    if parent == 0 {
        // whitespace between prolog and root
        return;
    }
    nodes[parent].children.push(Child::Text(text));
}

fn local(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name)
}

/// `wanted` without a prefix matches any prefix; with one it must match exactly.
pub(crate) fn name_matches(wanted: &str, actual: &str) -> bool {
    if wanted.contains(':') {
        wanted == actual
    } else {
        wanted == local(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<records>
  <record id="a1">
    <title>Fish &amp; <i>Chips</i></title>
    <x:note xmlns:x="urn:x"><![CDATA[raw <text>]]></x:note>
  </record>
  <record id="a2"/>
</records>"#;

    #[test]
    fn test_tree_shape() {
        let doc = Document::parse(SAMPLE).unwrap();
        let root = doc.children(doc.root()).next().unwrap();
        assert_eq!(doc.name(root), "records");
        let records: Vec<_> = doc.children(root).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(doc.attr(records[1], "id"), Some("a2"));
        assert_eq!(doc.parent(records[0]), Some(root));
    }

    #[test]
    fn test_text_content() {
        let doc = Document::parse(SAMPLE).unwrap();
        let root = doc.children(doc.root()).next().unwrap();
        let record = doc.children(root).next().unwrap();
        assert_eq!(doc.child_text(record, "title").as_deref(), Some("Fish & Chips"));
        assert_eq!(doc.child_text(record, "note").as_deref(), Some("raw <text>"));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = Document::parse(SAMPLE).unwrap();
        let names: Vec<&str> = doc
            .descendants(doc.root())
            .into_iter()
            .map(|id| doc.local_name(id))
            .collect();
        assert_eq!(names, vec!["records", "record", "title", "i", "note", "record"]);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(Document::parse("<a><b></a>").is_err());
        assert!(Document::parse("<a>").is_err());
        assert!(Document::parse("just text").is_err());
    }
}
