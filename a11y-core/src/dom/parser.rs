use scraper::{Html, Node as HtmlNode};
use tracing::debug;

use super::{Document, ElementData, NodeKind};

impl Document {
    /// Parse a full markup document.
    ///
    /// html5ever never rejects input: malformed markup is repaired the way a
    /// browser would, and missing `html`/`head`/`body` elements are created.
    pub fn parse(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        let mut document = Document::empty();

        // Pre-order walk so arena ids follow document order.
        let root = document.root();
        let top: Vec<_> = html.tree.root().children().collect();
        let mut stack: Vec<_> = top.into_iter().rev().map(|node| (node, root)).collect();

        while let Some((source, parent)) = stack.pop() {
            let kind = match source.value() {
                HtmlNode::Doctype(doctype) => NodeKind::Doctype(doctype.name().to_string()),
                HtmlNode::Comment(comment) => NodeKind::Comment((**comment).to_owned()),
                HtmlNode::Text(text) => NodeKind::Text((**text).to_owned()),
                HtmlNode::Element(element) => NodeKind::Element(ElementData::from_parts(
                    element.name.clone(),
                    element
                        .attrs
                        .iter()
                        .map(|(name, value)| (name.clone(), (**value).to_owned()))
                        .collect(),
                )),
                _ => continue,
            };

            let id = document.push_node(kind);
            document.append_child(parent, id);

            let children: Vec<_> = source.children().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, id)));
        }

        if !html.errors.is_empty() {
            debug!("Markup repaired by parser: {} issue(s)", html.errors.len());
        }

        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fills_in_document_skeleton() {
        let doc = Document::parse("<p>only a paragraph</p>");
        assert!(doc.html_element().is_some());
        assert!(doc.head().is_some());
        assert!(doc.body().is_some());
    }

    #[test]
    fn test_parse_keeps_comments_and_doctype() {
        let doc = Document::parse("<!DOCTYPE html><html><body><!-- note --><p>x</p></body></html>");
        let kinds: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .filter_map(|id| match doc.kind(id) {
                Some(NodeKind::Doctype(name)) => Some(format!("doctype:{name}")),
                Some(NodeKind::Comment(text)) => Some(format!("comment:{}", text.trim())),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec!["doctype:html", "comment:note"]);
    }

    #[test]
    fn test_parse_preserves_attribute_order() {
        let doc = Document::parse(r#"<img src="a.png" width="10" alt="A" height="10">"#);
        let img = doc.first_element_by_tag("img").unwrap();
        let names: Vec<_> = doc.element(img).unwrap().attrs().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["src", "width", "alt", "height"]);
    }

    #[test]
    fn test_parse_keeps_foreign_namespaces() {
        let doc = Document::parse(r#"<svg viewBox="0 0 10 10"><title>Chart</title></svg>"#);
        let svg = doc.first_element_by_tag("svg").unwrap();
        let element = doc.element(svg).unwrap();
        assert_eq!(&*element.qual_name().ns, "http://www.w3.org/2000/svg");
        assert_eq!(doc.attr(svg, "viewBox"), Some("0 0 10 10"));
    }

    #[test]
    fn test_parse_empty_input() {
        let doc = Document::parse("");
        assert!(doc.body().is_some());
        assert!(doc.text(doc.root()).is_empty());
    }
}
