//! Parsed HTML document and its traversal contract.
//!
//! # Responsibilities
//! - Parse decoded text into a mutable tree (html5ever + rcdom)
//! - Walk the tree once, handing elements and text nodes to a [`Visitor`]
//! - Serialize the (possibly mutated) tree back to UTF-8 bytes
//!
//! # Design Decisions
//! - Traversal is iterative so deeply nested markup cannot exhaust the stack
//! - Visitors only see element attributes and text contents; they can never
//!   add or remove nodes
//! - Comments, doctypes and processing instructions are not text
//! - Scripting is off for both parse and serialize, so `<noscript>` children
//!   are ordinary elements and text rather than one raw-text blob

use std::cell::RefCell;
use std::io;

use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, Attribute, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

/// Callbacks invoked by [`Document::walk`].
pub trait Visitor {
    /// Called for every element, before its children.
    fn element(&mut self, _name: &QualName, _attrs: &RefCell<Vec<Attribute>>) {}

    /// Called for every text node with the name of its immediate parent element.
    fn text(&mut self, _parent: Option<&QualName>, _contents: &RefCell<StrTendril>) {}
}

/// An in-memory HTML tree owned by a single rewrite.
pub struct Document {
    dom: RcDom,
}

impl Document {
    /// Parse a full HTML document. html5ever recovers from any markup error,
    /// so parsing itself cannot fail once the bytes are decoded.
    pub fn parse(html: &str) -> Self {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let dom = parse_document(RcDom::default(), opts).one(StrTendril::from_slice(html));
        Self { dom }
    }

    /// Pre-order walk over the whole tree, template contents included.
    pub fn walk<V: Visitor>(&self, visitor: &mut V) {
        let mut stack: Vec<(Handle, Option<QualName>)> = vec![(self.dom.document.clone(), None)];

        while let Some((node, parent)) = stack.pop() {
            // Children are pushed in reverse so they pop in document order.
            let child_parent = match &node.data {
                NodeData::Element {
                    name,
                    attrs,
                    template_contents,
                    ..
                } => {
                    visitor.element(name, attrs);
                    if let Some(fragment) = template_contents.borrow().as_ref() {
                        for child in fragment.children.borrow().iter().rev() {
                            stack.push((child.clone(), Some(name.clone())));
                        }
                    }
                    Some(name.clone())
                }
                NodeData::Text { contents } => {
                    visitor.text(parent.as_ref(), contents);
                    continue;
                }
                NodeData::Document => None,
                _ => continue,
            };

            for child in node.children.borrow().iter().rev() {
                stack.push((child.clone(), child_parent.clone()));
            }
        }
    }

    /// Serialize the document back to UTF-8 HTML.
    pub fn to_html(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let handle: SerializableHandle = self.dom.document.clone().into();
        let opts = SerializeOpts {
            scripting_enabled: false,
            ..Default::default()
        };
        serialize(&mut out, &handle, opts)?;
        Ok(out)
    }
}
