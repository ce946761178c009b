//! The selector subset used for element lookup.
//!
//! Supported: type and universal selectors, `#id`, `.class`, `[attr]`,
//! `[attr=value]` (optionally quoted), descendant and child (`>`)
//! combinators, and comma-separated groups.

use std::iter::Peekable;
use std::str::Chars;

use crate::document::Document;
use crate::error::DomError;
use crate::NodeId;

/// A parsed, comma-separated selector group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    // The combinator attached to a compound links it to the compound before it;
    // the first entry's combinator is unused.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if tag != "*" && el.tag() != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|(name, value)| {
            if name == "class" {
                return match value {
                    None => !el.classes().is_empty(),
                    Some(v) => el.classes().join(" ") == *v,
                };
            }
            match (el.attribute(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            }
        })
    }
}

impl SelectorList {
    /// Parse selector text.
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let invalid = |reason| DomError::InvalidSelector {
            selector: input.to_owned(),
            reason,
        };
        let mut selectors = Vec::new();
        for group in input.split(',') {
            let group = group.trim();
            if group.is_empty() {
                return Err(invalid("empty selector"));
            }
            selectors.push(parse_complex(group).map_err(invalid)?);
        }
        Ok(Self { selectors })
    }

    /// Whether `node` matches any selector in the group.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors
            .iter()
            .any(|complex| matches_from(doc, node, &complex.parts))
    }
}

/// Match `parts` right to left, starting with `node` against the last part.
fn matches_from(doc: &Document, node: NodeId, parts: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), rest)) = parts.split_last() else {
        return true;
    };
    if !compound.matches(doc, node) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    let mut ancestor = doc.parent(node);
    match combinator {
        Combinator::Child => ancestor.is_some_and(|parent| matches_from(doc, parent, rest)),
        Combinator::Descendant => {
            while let Some(candidate) = ancestor {
                if matches_from(doc, candidate, rest) {
                    return true;
                }
                ancestor = doc.parent(candidate);
            }
            false
        }
    }
}

fn parse_complex(input: &str) -> Result<Complex, &'static str> {
    let mut chars = input.chars().peekable();
    let mut parts = Vec::new();
    let mut combinator = Combinator::Descendant;
    let mut current = Compound::default();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '>' => {
                let mut next = Combinator::Descendant;
                while let Some(&c) = chars.peek() {
                    match c {
                        ' ' | '\t' | '\n' => {
                            chars.next();
                        }
                        '>' if next == Combinator::Descendant => {
                            next = Combinator::Child;
                            chars.next();
                        }
                        '>' => return Err("doubled child combinator"),
                        _ => break,
                    }
                }
                if current.is_empty() {
                    return Err("combinator without a preceding selector");
                }
                parts.push((combinator, std::mem::take(&mut current)));
                combinator = next;
            }
            '#' => {
                chars.next();
                current.id = Some(ident(&mut chars)?);
            }
            '.' => {
                chars.next();
                current.classes.push(ident(&mut chars)?);
            }
            '[' => {
                chars.next();
                current.attrs.push(attribute(&mut chars)?);
            }
            '*' => {
                chars.next();
                if !current.is_empty() {
                    return Err("universal selector must come first");
                }
                current.tag = Some("*".into());
            }
            c if is_ident_char(c) => {
                if !current.is_empty() {
                    return Err("type selector must come first");
                }
                current.tag = Some(ident(&mut chars)?.to_ascii_lowercase());
            }
            _ => return Err("unexpected character"),
        }
    }

    if current.is_empty() {
        return Err("dangling combinator");
    }
    parts.push((combinator, current));
    Ok(Complex { parts })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn ident(chars: &mut Peekable<Chars<'_>>) -> Result<String, &'static str> {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    if out.is_empty() {
        Err("expected an identifier")
    } else {
        Ok(out)
    }
}

fn attribute(chars: &mut Peekable<Chars<'_>>) -> Result<(String, Option<String>), &'static str> {
    let name = ident(chars)?.to_ascii_lowercase();
    match chars.next() {
        Some(']') => Ok((name, None)),
        Some('=') => {
            let value = match chars.peek() {
                Some(&quote @ ('"' | '\'')) => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => break,
                            Some(c) => value.push(c),
                            None => return Err("unterminated string"),
                        }
                    }
                    value
                }
                _ => ident(chars)?,
            };
            match chars.next() {
                Some(']') => Ok((name, Some(value))),
                _ => Err("expected `]`"),
            }
        }
        _ => Err("expected `]` or `=`"),
    }
}
