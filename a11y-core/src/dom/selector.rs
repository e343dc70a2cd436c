// CSS selectors over the arena document.
//
// Parsing and matching are the `selectors` crate's, using the `Simple`
// selector implementation scraper queries with: full Level 4 syntax minus
// stateful pseudo-classes (`:hover`, `:focus`, `:visited`). Values compare
// case-sensitively unless the selector says `[attr=value i]`.

use html5ever::Namespace;
use scraper::error::SelectorErrorKind;
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::matching::{
    self, ElementSelectorFlags, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode,
    NeedsSelectorFlags, QuirksMode,
};
use selectors::parser::ParseRelative;
use selectors::{Element, NthIndexCache, OpaqueElement, SelectorList};

use super::{Document, ElementData, NodeId, NodeKind};
use crate::error::A11yError;

#[derive(Debug, Clone)]
pub struct Selector {
    list: SelectorList<Simple>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, A11yError> {
        let mut input = cssparser::ParserInput::new(source);
        let mut parser = cssparser::Parser::new(&mut input);
        SelectorList::parse(&scraper::selector::Parser, &mut parser, ParseRelative::No)
            .map(|list| Self { list })
            .map_err(|e| A11yError::Selector {
                selector: source.to_string(),
                reason: SelectorErrorKind::from(e).to_string(),
            })
    }

    pub fn matches(&self, document: &Document, id: NodeId) -> bool {
        self.matches_cached(document, id, &mut NthIndexCache::default())
    }

    // The cache is keyed by selector and element addresses; it must not
    // outlive one borrow of `document`.
    fn matches_cached(&self, document: &Document, id: NodeId, cache: &mut NthIndexCache) -> bool {
        let Some(element) = ArenaElement::new(document, id) else {
            return false;
        };
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            cache,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            IgnoreNthChildForInvalidation::No,
        );
        self.list
            .0
            .iter()
            .any(|selector| matching::matches_selector(selector, 0, None, &element, &mut context))
    }
}

impl Document {
    /// Elements matching `selector`, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        let mut cache = NthIndexCache::default();
        self.elements()
            .into_iter()
            .filter(|id| selector.matches_cached(self, *id, &mut cache))
            .collect()
    }

    /// Descendant elements of `scope` matching `selector`, in document order.
    pub fn select_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut cache = NthIndexCache::default();
        self.descendant_elements(scope)
            .into_iter()
            .filter(|id| selector.matches_cached(self, *id, &mut cache))
            .collect()
    }
}

/// Element handle the selector matcher walks.
#[derive(Debug, Clone, Copy)]
struct ArenaElement<'a> {
    document: &'a Document,
    id: NodeId,
    element: &'a ElementData,
}

impl<'a> ArenaElement<'a> {
    fn new(document: &'a Document, id: NodeId) -> Option<Self> {
        document
            .element(id)
            .map(|element| Self { document, id, element })
    }

    fn wrap(&self, id: Option<NodeId>) -> Option<Self> {
        id.and_then(|id| Self::new(self.document, id))
    }

    fn data(&self) -> &'a ElementData {
        self.element
    }
}

impl<'a> Element for ArenaElement<'a> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.data())
    }

    fn parent_element(&self) -> Option<Self> {
        self.wrap(self.document.parent_element(self.id))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.wrap(self.document.previous_element_sibling(self.id))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.wrap(self.document.next_element_sibling(self.id))
    }

    fn first_element_child(&self) -> Option<Self> {
        let first = self
            .document
            .children(self.id)
            .iter()
            .copied()
            .find(|child| self.document.is_element(*child));
        self.wrap(first)
    }

    fn is_html_element_in_html_document(&self) -> bool {
        &*self.data().qual_name().ns == "http://www.w3.org/1999/xhtml"
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.data().qual_name().local == name.0
    }

    fn has_namespace(&self, namespace: &Namespace) -> bool {
        &self.data().qual_name().ns == namespace
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.data().qual_name() == other.data().qual_name()
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&Namespace>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        self.data().qualified_attrs().any(|(key, value)| {
            !matches!(*ns, NamespaceConstraint::Specific(url) if *url != key.ns)
                && local_name.0 == key.local
                && operation.eval_str(value)
        })
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.data().name(), "a" | "area" | "link") && self.data().attr("href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.data()
            .attr("id")
            .is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.data()
            .classes()
            .any(|class| case_sensitivity.eq(name.0.as_bytes(), class.as_bytes()))
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        !self.document.children(self.id).iter().any(|child| {
            matches!(
                self.document.kind(*child),
                Some(NodeKind::Element(_)) | Some(NodeKind::Text(_))
            )
        })
    }

    fn is_root(&self) -> bool {
        self.document
            .parent(self.id)
            .is_some_and(|parent| matches!(self.document.kind(parent), Some(NodeKind::Document)))
    }
}
