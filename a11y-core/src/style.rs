// Inline `style` attribute handling. No cascade: only declarations written
// on the element itself are seen.

use std::collections::HashSet;
use std::fmt;

use crate::color::{parse_color, Rgb};
use crate::dom::{Document, NodeId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn parse(style: &str) -> Self {
        let declarations = style
            .split(';')
            .filter_map(|declaration| {
                let (property, value) = declaration.split_once(':')?;
                let property = property.trim().to_ascii_lowercase();
                let value = value.trim();
                if property.is_empty() || value.is_empty() {
                    return None;
                }
                Some((property, value.to_string()))
            })
            .collect();
        Self { declarations }
    }

    pub fn of(document: &Document, id: NodeId) -> Self {
        Self::parse(document.attr(id, "style").unwrap_or_default())
    }

    /// Value of the last declaration for `property`, without `!important`.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.trim_end_matches("!important").trim())
    }

    pub fn set(&mut self, property: &str, value: &str) {
        self.declarations.retain(|(name, _)| name != property);
        self.declarations
            .push((property.to_string(), value.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn foreground(&self) -> Option<Rgb> {
        self.get("color").and_then(parse_color)
    }

    /// `background-color`, or the first colour token of a `background` shorthand.
    pub fn background(&self) -> Option<Rgb> {
        if let Some(color) = self.get("background-color").and_then(parse_color) {
            return Some(color);
        }
        let shorthand = self.get("background")?;
        parse_color(shorthand).or_else(|| {
            shorthand.split_whitespace().find_map(parse_color)
        })
    }

    pub fn declares_background(&self) -> bool {
        self.get("background-color").is_some() || self.get("background").is_some()
    }

    pub fn hides_element(&self) -> bool {
        let is = |property: &str, expected: &str| {
            self.get(property)
                .is_some_and(|value| value.eq_ignore_ascii_case(expected))
        };
        is("display", "none")
            || is("visibility", "hidden")
            || self
                .get("opacity")
                .and_then(|value| value.parse::<f64>().ok())
                .is_some_and(|opacity| opacity == 0.0)
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect();
        write!(f, "{}", rendered.join(" "))
    }
}

/// Rewrite one declaration of the element's inline style.
pub fn set_style_property(document: &mut Document, id: NodeId, property: &str, value: &str) {
    let mut style = InlineStyle::of(document, id);
    style.set(property, value);
    document.set_attr(id, "style", &style.to_string());
}

/// Hidden by the element itself or an ancestor: `hidden` attribute or an
/// inline `display: none`, `visibility: hidden` or `opacity: 0`.
pub fn is_hidden(document: &Document, id: NodeId) -> bool {
    std::iter::once(id)
        .chain(document.ancestors(id))
        .any(|node| document.has_attr(node, "hidden") || InlineStyle::of(document, node).hides_element())
}

/// Every element [`is_hidden`] reports, found in one pass.
pub fn hidden_elements(document: &Document) -> HashSet<NodeId> {
    let mut hidden = HashSet::new();
    let mut stack = vec![(document.root(), false)];
    while let Some((id, inherited)) = stack.pop() {
        let hides = document.is_element(id)
            && (inherited
                || document.has_attr(id, "hidden")
                || InlineStyle::of(document, id).hides_element());
        if hides {
            hidden.insert(id);
        }
        stack.extend(document.children(id).iter().map(|child| (*child, hides)));
    }
    hidden
}
