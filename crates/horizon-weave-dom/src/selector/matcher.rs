//! Selector matching algorithm.

use super::{Combinator, Selector, SelectorList, SelectorPart, TypeSelector};

/// Element data needed for selector matching.
#[derive(Debug, Clone, Copy)]
pub struct ElementContext<'a> {
    /// Tag name (e.g., "div", "li").
    pub tag: &'a str,
    /// Attributes in document order.
    pub attributes: &'a [(String, String)],
}

impl<'a> ElementContext<'a> {
    /// Create a context for an element.
    pub fn new(tag: &'a str, attributes: &'a [(String, String)]) -> Self {
        Self { tag, attributes }
    }

    /// Value of attribute `name`.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The element's `id` attribute.
    pub fn id(&self) -> Option<&'a str> {
        self.attribute("id")
    }

    /// Returns true if the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }
}

/// Selector matching engine.
pub struct SelectorMatcher;

impl SelectorMatcher {
    /// Check if a selector part matches the element.
    pub fn part_matches(part: &SelectorPart, context: &ElementContext<'_>) -> bool {
        // Check type selector
        if let Some(type_sel) = &part.type_selector {
            match type_sel {
                TypeSelector::Universal => {}
                TypeSelector::Type(name) => {
                    if !name.eq_ignore_ascii_case(context.tag) {
                        return false;
                    }
                }
            }
        }

        // Check ID selector
        if let Some(id) = &part.id {
            match context.id() {
                Some(own) if own == id => {}
                _ => return false,
            }
        }

        // Check class selectors (all must match)
        if !part.classes.iter().all(|class| context.has_class(class)) {
            return false;
        }

        // Check attribute selectors (all must match)
        part.attributes.iter().all(|attr| match (&attr.value, context.attribute(&attr.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

/// Check if a full selector matches, considering combinators.
///
/// `ancestors` lists the element's ancestors from its parent up to the root.
/// Parts are matched right to left; a descendant combinator backtracks when
/// a nearer ancestor matches but the rest of the chain does not.
pub fn matches_full(
    selector: &Selector,
    context: &ElementContext<'_>,
    ancestors: &[ElementContext<'_>],
) -> bool {
    let Some(subject) = selector.subject() else {
        return false;
    };
    if !SelectorMatcher::part_matches(subject, context) {
        return false;
    }
    matches_ancestors(selector, selector.parts.len() - 1, ancestors)
}

/// Check if any selector of a list matches.
pub fn matches_any(
    list: &SelectorList,
    context: &ElementContext<'_>,
    ancestors: &[ElementContext<'_>],
) -> bool {
    list.selectors()
        .iter()
        .any(|selector| matches_full(selector, context, ancestors))
}

/// Match parts left of `matched` against `ancestors`.
fn matches_ancestors(selector: &Selector, matched: usize, ancestors: &[ElementContext<'_>]) -> bool {
    if matched == 0 {
        return true;
    }
    let part = &selector.parts[matched - 1];

    match selector.combinators[matched - 1] {
        Combinator::Child => match ancestors.first() {
            Some(parent) => {
                SelectorMatcher::part_matches(part, parent)
                    && matches_ancestors(selector, matched - 1, &ancestors[1..])
            }
            None => false,
        },
        Combinator::Descendant => (0..ancestors.len()).any(|i| {
            SelectorMatcher::part_matches(part, &ancestors[i])
                && matches_ancestors(selector, matched - 1, &ancestors[i + 1..])
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::parse_selector;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_compound_part() {
        let a = attrs(&[("id", "main"), ("class", "card  active"), ("data-kind", "x")]);
        let ctx = ElementContext::new("DIV", &a);

        for source in ["div", "*", "#main", ".card", ".card.active", "div#main.active", "[data-kind]", "[data-kind=x]"] {
            let list = parse_selector(source).unwrap();
            assert!(matches_any(&list, &ctx, &[]), "{source} should match");
        }
        for source in ["span", "#other", ".missing", "[data-kind=y]", "[title]"] {
            let list = parse_selector(source).unwrap();
            assert!(!matches_any(&list, &ctx, &[]), "{source} should not match");
        }
    }

    #[test]
    fn test_child_combinator_requires_direct_parent() {
        let none = attrs(&[]);
        let leaf = ElementContext::new("a", &none);
        let chain = [ElementContext::new("li", &none), ElementContext::new("ul", &none)];

        assert!(matches_any(&parse_selector("li > a").unwrap(), &leaf, &chain));
        assert!(!matches_any(&parse_selector("ul > a").unwrap(), &leaf, &chain));
        assert!(matches_any(&parse_selector("ul a").unwrap(), &leaf, &chain));
    }

    #[test]
    fn test_descendant_backtracks() {
        // div > p span: the nearest p is not a child of a div, the outer one is.
        let none = attrs(&[]);
        let span = ElementContext::new("span", &none);
        let chain = [
            ElementContext::new("p", &none),
            ElementContext::new("section", &none),
            ElementContext::new("p", &none),
            ElementContext::new("div", &none),
        ];
        assert!(matches_any(&parse_selector("div > p span").unwrap(), &span, &chain));
        assert!(!matches_any(&parse_selector("div > section span").unwrap(), &span, &chain));
    }
}
