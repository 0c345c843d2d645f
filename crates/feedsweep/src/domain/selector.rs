//! Minimal CSS-like selectors used as structural signatures.
//!
//! Supported grammar: compound selectors (`tag`, `*`, `#id`, `.class`,
//! `[attr]`, `[attr="value"]`) joined by the descendant combinator
//! (whitespace). That covers every signature in the matcher table; anything
//! else is rejected at compile time rather than silently never matching.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::dom::Dom;
use crate::domain::errors::SignatureError;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\*|[A-Za-z][A-Za-z0-9-]*)").expect("valid tag regex"));

static PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:\.([A-Za-z0-9_-]+)|#([A-Za-z0-9_-]+)|\[\s*([A-Za-z0-9_:-]+)\s*(?:=\s*(?:"([^"]*)"|'([^']*)'|([^\]\s"']+)))?\s*\])"#,
    )
    .expect("valid selector part regex")
});

/// A compiled selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeTest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeTest {
    name: String,
    value: Option<String>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SignatureError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SignatureError::Empty);
        }

        let compounds = split_compounds(trimmed)?
            .into_iter()
            .map(|part| parse_compound(trimmed, part))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: trimmed.to_owned(),
            compounds,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` matches. Earlier compounds are tested against ancestors.
    pub fn matches<D: Dom>(&self, dom: &D, node: D::Node) -> bool {
        let Some((last, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(dom, node) {
            return false;
        }

        let mut cursor = dom.parent(node);
        for compound in rest.iter().rev() {
            loop {
                let Some(current) = cursor else {
                    return false;
                };
                cursor = dom.parent(current);
                if compound.matches(dom, current) {
                    break;
                }
            }
        }
        true
    }

    /// Matching descendants of `scope` in document order, `scope` excluded.
    pub fn select_all<D: Dom>(&self, dom: &D, scope: D::Node) -> Vec<D::Node> {
        dom.descendants(scope)
            .into_iter()
            .filter(|node| self.matches(dom, *node))
            .collect()
    }

    /// Like [`Selector::select_all`] but also tests `scope` itself, first.
    pub fn select_inclusive<D: Dom>(&self, dom: &D, scope: D::Node) -> Vec<D::Node> {
        let mut found = Vec::new();
        if self.matches(dom, scope) {
            found.push(scope);
        }
        found.extend(self.select_all(dom, scope));
        found
    }

    /// First matching descendant of `scope` in document order.
    pub fn select_first<D: Dom>(&self, dom: &D, scope: D::Node) -> Option<D::Node> {
        dom.first_descendant(scope, |node| self.matches(dom, node))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Compound {
    fn matches<D: Dom>(&self, dom: &D, node: D::Node) -> bool {
        if !dom.is_element(node) {
            return false;
        }
        if let Some(tag) = &self.tag
            && !dom.tag_name(node).eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(id) = &self.id
            && dom.attribute(node, "id") != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|class| dom.has_class(node, class)) {
            return false;
        }
        self.attributes.iter().all(|test| match &test.value {
            None => dom.has_attribute(node, &test.name),
            Some(expected) => dom.attribute(node, &test.name) == Some(expected.as_str()),
        })
    }
}

/// Split on whitespace that sits outside attribute brackets and quotes.
fn split_compounds(selector: &str) -> Result<Vec<&str>, SignatureError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start: Option<usize> = None;

    for (idx, ch) in selector.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if depth > 0 => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if c.is_whitespace() && depth == 0 => {
                if let Some(begin) = start.take() {
                    parts.push(&selector[begin..idx]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(idx);
        }
    }

    if depth > 0 || quote.is_some() {
        return Err(SignatureError::Unterminated(selector.to_owned()));
    }
    if let Some(begin) = start {
        parts.push(&selector[begin..]);
    }
    Ok(parts)
}

fn parse_compound(selector: &str, part: &str) -> Result<Compound, SignatureError> {
    let mut compound = Compound::default();
    let mut rest = part;

    if let Some(tag) = TAG_RE.find(rest) {
        if tag.as_str() != "*" {
            compound.tag = Some(tag.as_str().to_ascii_lowercase());
        }
        rest = &rest[tag.end()..];
    }

    while !rest.is_empty() {
        let Some(caps) = PART_RE.captures(rest) else {
            return Err(SignatureError::Unexpected {
                selector: selector.to_owned(),
                rest: rest.to_owned(),
            });
        };
        if let Some(class) = caps.get(1) {
            compound.classes.push(class.as_str().to_owned());
        } else if let Some(id) = caps.get(2) {
            compound.id = Some(id.as_str().to_owned());
        } else if let Some(name) = caps.get(3) {
            let value = caps
                .get(4)
                .or_else(|| caps.get(5))
                .or_else(|| caps.get(6))
                .map(|m| m.as_str().to_owned());
            compound.attributes.push(AttributeTest {
                name: name.as_str().to_ascii_lowercase(),
                value,
            });
        }
        let consumed = caps.get(0).map_or(rest.len(), |m| m.end());
        rest = &rest[consumed..];
    }

    Ok(compound)
}
