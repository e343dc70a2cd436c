use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Document, NodeId};

/// Where a violation was found.
///
/// `node` is the arena index, valid in the evaluated document and in any
/// clone of it. `path` is an ancestor chain such as
/// `/html/body/div[@id='main']/ul/li[2]/img` kept for reports and as a
/// fallback when the index no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    node: NodeId,
    path: String,
}

impl Location {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Document {
    pub fn location_of(&self, id: NodeId) -> Location {
        Location {
            node: id,
            path: self.path_of(id),
        }
    }

    /// Ancestor-chain descriptor. Segments carry `[@id='..']` when the element
    /// has an id, or a 1-based position when same-named siblings exist.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut chain: Vec<NodeId> = self.ancestors(id).collect();
        chain.reverse();
        if self.is_element(id) {
            chain.push(id);
        }

        let mut path = String::new();
        for element in chain {
            path.push('/');
            path.push_str(&self.path_segment(element));
        }
        path
    }

    fn path_segment(&self, id: NodeId) -> String {
        let tag = self.tag(id).unwrap_or_default();
        if let Some(value) = self.non_empty_attr(id, "id") {
            return format!("{tag}[@id='{value}']");
        }
        let Some(parent) = self.parent(id) else {
            return tag.to_string();
        };
        let (mut count, mut position) = (0, 0);
        for sibling in self.children(parent) {
            if self.tag(*sibling) == Some(tag) {
                count += 1;
                if *sibling == id {
                    position = count;
                }
            }
        }
        if count > 1 {
            format!("{tag}[{position}]")
        } else {
            tag.to_string()
        }
    }

    /// Resolve a location recorded against this document or an ancestor clone.
    ///
    /// The arena index is authoritative while it names an attached element;
    /// otherwise the first element whose current path equals the recorded
    /// one is used.
    pub fn locate(&self, location: &Location) -> Option<NodeId> {
        let node = location.node;
        if self.is_element(node) && self.is_attached(node) {
            return Some(node);
        }

        let matches: Vec<NodeId> = self
            .elements()
            .into_iter()
            .filter(|id| self.path_of(*id) == location.path)
            .collect();
        if matches.len() > 1 {
            warn!(
                "Location {} is ambiguous ({} matches), using the first",
                location.path,
                matches.len()
            );
        }
        matches.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_uses_ids_and_positions() {
        let doc = Document::parse(
            "<div id='main'><ul><li>a</li><li><img src='x.png'></li></ul></div>",
        );
        let img = doc.first_element_by_tag("img").unwrap();
        assert_eq!(
            doc.path_of(img),
            "/html/body/div[@id='main']/ul/li[2]/img"
        );
    }

    #[test]
    fn test_locate_in_clone() {
        let doc = Document::parse("<p>a</p><p><img src='x.png'></p>");
        let img = doc.first_element_by_tag("img").unwrap();
        let location = doc.location_of(img);
        let copy = doc.clone();
        assert_eq!(copy.locate(&location), Some(img));
    }

    #[test]
    fn test_locate_falls_back_to_path() {
        let doc = Document::parse("<div><span>1</span><span>2</span></div><img src='x.png'>");
        let img = doc.first_element_by_tag("img").unwrap();
        let location = doc.location_of(img);
        assert_eq!(location.path(), "/html/body/img");

        // A smaller document: the recorded index is out of range.
        let other = Document::parse("<img src='x.png'>");
        assert!(!other.contains(location.node()));
        let resolved = other.locate(&location).unwrap();
        assert_eq!(other.tag(resolved), Some("img"));
    }

    #[test]
    fn test_locate_detached_without_path_match() {
        let mut doc = Document::parse("<p><img src='x.png'></p>");
        let img = doc.first_element_by_tag("img").unwrap();
        let location = doc.location_of(img);
        doc.detach(img);
        assert_eq!(doc.locate(&location), None);
    }
}
