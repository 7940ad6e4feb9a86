//! CSS selector matching
//!
//! Supported grammar:
//!
//! ```text
//! list     := chain ("," chain)*
//! chain    := compound (combinator compound)*
//! combinator := " " | ">" | "+" | "~"
//! compound := ("*" | tag)? ("#id" | ".class" | "[attr(op value)?]" | ":pseudo")*
//! op       := "=" | "~=" | "^=" | "$=" | "*="
//! pseudo   := first-child | last-child | only-child | disabled | enabled
//! ```
//!
//! Chains are matched right to left, the usual way.

use ahash::AHashSet;

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::types::{DomNode, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrCondition {
    fn matches(&self, node: &DomNode) -> bool {
        let Some(actual) = node.attr(&self.name) else {
            return false;
        };
        let expected = self.value.as_str();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => actual.split_ascii_whitespace().any(|t| t == expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    Disabled,
    Enabled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    pseudo: Vec<PseudoClass>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    /// Relation to the part on the left
    combinator: Option<Combinator>,
}

/// A parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    chains: Vec<Vec<Part>>,
}

impl SelectorList {
    pub fn parse(selector: &str) -> Result<Self> {
        let invalid = || DomError::InvalidSelector(selector.to_string());
        let mut chains = Vec::new();
        for group in split_top_level(selector, ',').ok_or_else(invalid)? {
            chains.push(parse_chain(group.trim()).ok_or_else(invalid)?);
        }
        Ok(Self { chains })
    }

    /// Whether the element matches any chain of the list
    pub fn matches(&self, arena: &DomArena, node_id: NodeId) -> Result<bool> {
        for chain in &self.chains {
            if matches_chain(arena, node_id, chain)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// All matching element descendants of `scope`, in document order
    pub fn query_all(&self, arena: &DomArena, scope: NodeId) -> Result<Vec<NodeId>> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        for candidate in arena.descendant_elements(scope)? {
            if self.matches(arena, candidate)? && seen.insert(candidate) {
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

/// Split on `sep` outside brackets and quotes
fn split_top_level(input: &str, sep: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1)?,
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    parts.push(&input[start..]);
    Some(parts)
}

fn parse_chain(input: &str) -> Option<Vec<Part>> {
    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        let combinator = match rest.chars().next()? {
            '>' => Some(Combinator::Child),
            '+' => Some(Combinator::AdjacentSibling),
            '~' => Some(Combinator::GeneralSibling),
            _ => None,
        };
        if let Some(c) = combinator {
            if parts.is_empty() || pending.is_some_and(|p| p != Combinator::Descendant) {
                return None;
            }
            pending = Some(c);
            rest = rest[1..].trim_start();
            continue;
        }

        let (compound, remaining) = parse_compound(rest)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(Part {
            compound,
            combinator,
        });

        let trimmed = remaining.trim_start();
        if trimmed.len() != remaining.len() && !trimmed.is_empty() {
            pending = Some(Combinator::Descendant);
        }
        rest = trimmed;
    }

    if parts.is_empty() || pending.is_some_and(|p| p != Combinator::Descendant) {
        return None;
    }
    Some(parts)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(input: &str) -> Option<(&str, &str)> {
    let end = input
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(input.len());
    if end == 0 {
        None
    } else {
        Some((&input[..end], &input[end..]))
    }
}

fn parse_compound(input: &str) -> Option<(Compound, &str)> {
    let mut compound = Compound::default();
    let mut rest = input;
    let mut universal = false;

    if let Some(r) = rest.strip_prefix('*') {
        universal = true;
        rest = r;
    } else if let Some((tag, r)) = take_ident(rest) {
        compound.tag = Some(tag.to_ascii_lowercase());
        rest = r;
    }

    loop {
        match rest.chars().next() {
            Some('#') => {
                let (id, r) = take_ident(&rest[1..])?;
                if compound.id.replace(id.to_string()).is_some() {
                    return None;
                }
                rest = r;
            }
            Some('.') => {
                let (class, r) = take_ident(&rest[1..])?;
                compound.classes.push(class.to_string());
                rest = r;
            }
            Some('[') => {
                let close = rest.find(']')?;
                compound.attrs.push(parse_attr(&rest[1..close])?);
                rest = &rest[close + 1..];
            }
            Some(':') => {
                let (name, r) = take_ident(&rest[1..])?;
                compound.pseudo.push(match name {
                    "first-child" => PseudoClass::FirstChild,
                    "last-child" => PseudoClass::LastChild,
                    "only-child" => PseudoClass::OnlyChild,
                    "disabled" => PseudoClass::Disabled,
                    "enabled" => PseudoClass::Enabled,
                    _ => return None,
                });
                rest = r;
            }
            _ => break,
        }
    }

    let empty = compound == Compound::default();
    if empty && !universal {
        return None;
    }
    Some((compound, rest))
}

fn parse_attr(inner: &str) -> Option<AttrCondition> {
    let inner = inner.trim();
    let (name, op, value) = match inner.find('=') {
        Some(eq) => {
            let (name, op) = match inner[..eq].chars().last() {
                Some('~') => (&inner[..eq - 1], AttrOp::Includes),
                Some('^') => (&inner[..eq - 1], AttrOp::Prefix),
                Some('$') => (&inner[..eq - 1], AttrOp::Suffix),
                Some('*') => (&inner[..eq - 1], AttrOp::Substring),
                _ => (&inner[..eq], AttrOp::Equals),
            };
            (name.trim(), op, unquote(inner[eq + 1..].trim())?)
        }
        None => (inner, AttrOp::Exists, ""),
    };

    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    Some(AttrCondition {
        name: name.to_ascii_lowercase(),
        op,
        value: value.to_string(),
    })
}

fn unquote(raw: &str) -> Option<&str> {
    for q in ['"', '\''] {
        if let Some(stripped) = raw.strip_prefix(q) {
            return stripped.strip_suffix(q);
        }
    }
    if raw.chars().all(is_ident_char) {
        Some(raw)
    } else {
        None
    }
}

fn matches_compound(arena: &DomArena, node_id: NodeId, compound: &Compound) -> Result<bool> {
    let node = arena.get(node_id)?;
    if !node.is_element() {
        return Ok(false);
    }
    if let Some(tag) = &compound.tag {
        if node.node_name != *tag {
            return Ok(false);
        }
    }
    if let Some(id) = &compound.id {
        if node.attr("id") != Some(id.as_str()) {
            return Ok(false);
        }
    }
    if !compound.classes.iter().all(|c| node.has_class(c)) {
        return Ok(false);
    }
    if !compound.attrs.iter().all(|a| a.matches(node)) {
        return Ok(false);
    }
    for pseudo in &compound.pseudo {
        let ok = match pseudo {
            PseudoClass::Disabled => node.attributes.contains("disabled"),
            PseudoClass::Enabled => !node.attributes.contains("disabled"),
            PseudoClass::FirstChild | PseudoClass::LastChild | PseudoClass::OnlyChild => {
                let Some(parent_id) = node.parent_id else {
                    return Ok(false);
                };
                let siblings = arena.element_children(parent_id)?;
                match pseudo {
                    PseudoClass::FirstChild => siblings.first() == Some(&node_id),
                    PseudoClass::LastChild => siblings.last() == Some(&node_id),
                    _ => siblings.len() == 1,
                }
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_chain(arena: &DomArena, node_id: NodeId, chain: &[Part]) -> Result<bool> {
    let Some((last, init)) = chain.split_last() else {
        return Ok(false);
    };
    if !matches_compound(arena, node_id, &last.compound)? {
        return Ok(false);
    }
    let Some(combinator) = last.combinator else {
        return Ok(true);
    };

    match combinator {
        Combinator::Child => match arena.parent_element_id(node_id)? {
            Some(parent) => matches_chain(arena, parent, init),
            None => Ok(false),
        },
        Combinator::Descendant => {
            let mut cursor = arena.parent_element_id(node_id)?;
            while let Some(ancestor) = cursor {
                if matches_chain(arena, ancestor, init)? {
                    return Ok(true);
                }
                cursor = arena.parent_element_id(ancestor)?;
            }
            Ok(false)
        }
        Combinator::AdjacentSibling => match arena.previous_element_sibling(node_id)? {
            Some(sibling) => matches_chain(arena, sibling, init),
            None => Ok(false),
        },
        Combinator::GeneralSibling => {
            let mut cursor = arena.previous_element_sibling(node_id)?;
            while let Some(sibling) = cursor {
                if matches_chain(arena, sibling, init)? {
                    return Ok(true);
                }
                cursor = arena.previous_element_sibling(sibling)?;
            }
            Ok(false)
        }
    }
}
