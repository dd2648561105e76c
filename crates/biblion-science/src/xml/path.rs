//! A small XPath subset, compiled once when a schema is built.
//!
//! Supported: absolute `/a/b`, descendant `//a` and `a//b`, relative
//! `a/b`, `.`, `..`, `*`, attributes `@x` and `a/@x`, predicates
//! `[child='v']`, `[@attr='v']`, `[child]`, `[2]`, disjunctions
//! `[a='v' or b='w']`, and top-level alternation `p | q`.

use crate::error::{Result, ScienceError};
use crate::xml::dom::{Document, NodeId, name_matches};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    SelfNode,
    Parent,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Any,
}

impl NodeTest {
    fn accepts(&self, name: &str) -> bool {
        match self {
            NodeTest::Any => true,
            NodeTest::Name(wanted) => name_matches(wanted, name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Equals(LocationPath, String),
    Exists(LocationPath),
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    /// Each predicate is a disjunction of conditions.
    predicates: Vec<Vec<Condition>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

/// A node or one attribute of a node selected by a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Hit {
    Node(NodeId),
    Attribute(NodeId, usize),
}

impl Hit {
    /// Text content of a node, or an attribute's value.
    pub fn value(&self, doc: &Document) -> String {
        match *self {
            Hit::Node(id) => doc.text(id),
            Hit::Attribute(id, idx) => doc
                .attributes(id)
                .get(idx)
                .map(|(_, v)| v.trim().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn node(&self) -> NodeId {
        match *self {
            Hit::Node(id) | Hit::Attribute(id, _) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    source: String,
    alternatives: Vec<LocationPath>,
}

impl XPath {
    pub fn compile(expr: &str) -> Result<Self> {
        let mut parser = Parser {
            src: expr,
            pos: 0,
        };
        let alternatives = parser.union()?;
        Ok(Self {
            source: expr.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when every alternative selects attributes.
    pub fn selects_attributes(&self) -> bool {
        self.alternatives
            .iter()
            .all(|p| p.steps.last().is_some_and(|s| s.axis == Axis::Attribute))
    }

    /// Evaluate relative to `context`. Results are in document order.
    pub fn select(&self, doc: &Document, context: NodeId) -> Vec<Hit> {
        let mut hits: Vec<Hit> = self
            .alternatives
            .iter()
            .flat_map(|path| eval_path(path, doc, context))
            .collect();
        hits.sort();
        hits.dedup();
        hits
    }

    pub fn select_nodes(&self, doc: &Document, context: NodeId) -> Vec<NodeId> {
        self.select(doc, context)
            .into_iter()
            .filter_map(|hit| match hit {
                Hit::Node(id) => Some(id),
                Hit::Attribute(..) => None,
            })
            .collect()
    }
}

// ─── Evaluation ────────────────────────────────────────────

fn eval_path(path: &LocationPath, doc: &Document, context: NodeId) -> Vec<Hit> {
    let mut current = vec![if path.absolute { doc.root() } else { context }];

    for step in &path.steps {
        if step.axis == Axis::Attribute {
            let mut hits = Vec::new();
            for node in &current {
                for (idx, (key, _)) in doc.attributes(*node).iter().enumerate() {
                    if step.test.accepts(key) {
                        hits.push(Hit::Attribute(*node, idx));
                    }
                }
            }
            return hits;
        }

        let mut next = Vec::new();
        for node in &current {
            let candidates: Vec<NodeId> = match step.axis {
                Axis::Child => doc.children(*node).collect(),
                Axis::Descendant => doc.descendants(*node),
                Axis::SelfNode => vec![*node],
                Axis::Parent => doc.parent(*node).into_iter().collect(),
                Axis::Attribute => Vec::new(),
            };
            let named: Vec<NodeId> = candidates
                .into_iter()
                .filter(|id| match step.axis {
                    Axis::SelfNode | Axis::Parent => true,
                    _ => step.test.accepts(doc.name(*id)),
                })
                .collect();
            next.extend(apply_predicates(&step.predicates, doc, named));
        }
        next.sort_unstable();
        next.dedup();
        current = next;
    }

    current.into_iter().map(Hit::Node).collect()
}

fn apply_predicates(
    predicates: &[Vec<Condition>],
    doc: &Document,
    mut nodes: Vec<NodeId>,
) -> Vec<NodeId> {
    for any_of in predicates {
        nodes = nodes
            .iter()
            .enumerate()
            .filter(|(pos, node)| any_of.iter().any(|c| holds(c, doc, **node, pos + 1)))
            .map(|(_, node)| *node)
            .collect();
    }
    nodes
}

fn holds(condition: &Condition, doc: &Document, node: NodeId, position: usize) -> bool {
    match condition {
        Condition::Position(n) => *n == position,
        Condition::Exists(path) => !eval_path(path, doc, node).is_empty(),
        Condition::Equals(path, literal) => eval_path(path, doc, node)
            .iter()
            .any(|hit| hit.value(doc) == *literal),
    }
}

// ─── Parsing ───────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> ScienceError {
        ScienceError::Config(format!(
            "invalid path '{}': {reason} at offset {}",
            self.src, self.pos
        ))
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn union(&mut self) -> Result<Vec<LocationPath>> {
        let mut paths = Vec::new();
        loop {
            self.skip_ws();
            paths.push(self.path()?);
            self.skip_ws();
            if self.eat("|") {
                continue;
            }
            if self.pos < self.src.len() {
                return Err(self.error("unexpected character"));
            }
            return Ok(paths);
        }
    }

    fn path(&mut self) -> Result<LocationPath> {
        let (absolute, mut axis) = if self.eat("//") {
            (true, Axis::Descendant)
        } else if self.eat("/") {
            (true, Axis::Child)
        } else {
            (false, Axis::Child)
        };

        let mut steps = Vec::new();
        loop {
            let step = self.step(axis)?;
            let is_attribute = step.axis == Axis::Attribute;
            steps.push(step);

            axis = if self.eat("//") {
                Axis::Descendant
            } else if self.eat("/") {
                Axis::Child
            } else {
                break;
            };
            if is_attribute {
                return Err(self.error("attribute step must be last"));
            }
        }
        Ok(LocationPath { absolute, steps })
    }

    fn step(&mut self, axis: Axis) -> Result<Step> {
        let (axis, test) = if self.eat("@") {
            if axis == Axis::Descendant {
                return Err(self.error("'//@' is not supported"));
            }
            (Axis::Attribute, self.node_test()?)
        } else if self.eat("..") {
            (Axis::Parent, NodeTest::Any)
        } else if self.eat(".") {
            (Axis::SelfNode, NodeTest::Any)
        } else {
            (axis, self.node_test()?)
        };

        let mut predicates = Vec::new();
        while self.eat("[") {
            predicates.push(self.predicate()?);
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest> {
        if self.eat("*") {
            return Ok(NodeTest::Any);
        }
        let start = self.pos;
        for (i, c) in self.src[start..].char_indices() {
            let ok = if i == 0 {
                c.is_alphabetic() || c == '_'
            } else {
                c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
            };
            if !ok {
                break;
            }
            self.pos = start + i + c.len_utf8();
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(NodeTest::Name(self.src[start..self.pos].to_string()))
    }

    fn predicate(&mut self) -> Result<Vec<Condition>> {
        self.skip_ws();
        let digits: String = self.rest().chars().take_while(char::is_ascii_digit).collect();
        if !digits.is_empty() {
            self.pos += digits.len();
            self.skip_ws();
            if !self.eat("]") {
                return Err(self.error("expected ']'"));
            }
            let n = digits
                .parse()
                .map_err(|_| self.error("position out of range"))?;
            return Ok(vec![Condition::Position(n)]);
        }

        let mut any_of = Vec::new();
        loop {
            self.skip_ws();
            let operand = self.path()?;
            if operand.absolute {
                return Err(self.error("predicates take relative paths"));
            }
            self.skip_ws();
            if self.eat("=") {
                self.skip_ws();
                any_of.push(Condition::Equals(operand, self.literal()?));
            } else {
                any_of.push(Condition::Exists(operand));
            }
            self.skip_ws();
            if self.eat("]") {
                return Ok(any_of);
            }
            let before = self.pos;
            if self.eat("or") && self.peek().is_some_and(char::is_whitespace) {
                continue;
            }
            self.pos = before;
            return Err(self.error("expected 'or' or ']'"));
        }
    }

    fn literal(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted literal")),
        };
        self.pos += 1;
        let Some(len) = self.rest().find(quote) else {
            return Err(self.error("unterminated literal"));
        };
        let value = self.rest()[..len].to_string();
        self.pos += len + 1;
        Ok(value)
    }
}
