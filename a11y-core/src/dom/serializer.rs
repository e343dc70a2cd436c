use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use std::io;
use tracing::warn;

use super::{Document, NodeId, NodeKind};

#[derive(Debug, Clone)]
pub struct SerializeOptions {
    pub include_comments: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            include_comments: true,
        }
    }
}

/// A node of the arena as html5ever sees it.
struct Subtree<'a> {
    document: &'a Document,
    node: NodeId,
    include_comments: bool,
}

enum Edge {
    Open(NodeId),
    Close(NodeId),
}

impl Serialize for Subtree<'_> {
    fn serialize<S: Serializer>(
        &self,
        serializer: &mut S,
        traversal_scope: TraversalScope,
    ) -> io::Result<()> {
        let include_self = traversal_scope == TraversalScope::IncludeNode;
        let mut stack = vec![Edge::Open(self.node)];

        while let Some(edge) = stack.pop() {
            match edge {
                Edge::Open(id) => {
                    let write = id != self.node || include_self;
                    match self.document.kind(id) {
                        Some(NodeKind::Element(el)) if write => {
                            serializer.start_elem(el.qual_name().clone(), el.qualified_attrs())?;
                            stack.push(Edge::Close(id));
                        }
                        Some(NodeKind::Text(text)) if write => serializer.write_text(text)?,
                        Some(NodeKind::Comment(text)) if write && self.include_comments => {
                            serializer.write_comment(text)?
                        }
                        Some(NodeKind::Doctype(name)) if write => serializer.write_doctype(name)?,
                        _ => {}
                    }
                    let children = self.document.children(id);
                    stack.extend(children.iter().rev().map(|child| Edge::Open(*child)));
                }
                Edge::Close(id) => {
                    if let Some(el) = self.document.element(id) {
                        serializer.end_elem(el.qual_name().clone())?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Document {
    /// Serialise the whole document back to markup.
    pub fn to_html(&self) -> String {
        self.to_html_with(&SerializeOptions::default())
    }

    pub fn to_html_with(&self, options: &SerializeOptions) -> String {
        self.render(self.root(), TraversalScope::ChildrenOnly(None), options.include_comments)
    }

    /// Markup of a single node including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        self.render(id, TraversalScope::IncludeNode, true)
    }

    fn render(&self, node: NodeId, traversal_scope: TraversalScope, include_comments: bool) -> String {
        let subtree = Subtree {
            document: self,
            node,
            include_comments,
        };
        let opts = SerializeOpts {
            traversal_scope,
            ..SerializeOpts::default()
        };

        let mut buffer = Vec::new();
        if let Err(e) = serialize(&mut buffer, &subtree, opts) {
            warn!("Failed to serialise node {}: {}", node.index(), e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
