//! CSS selector parsing and matching against the arena document.
//!
//! The supported grammar covers what address generation emits and what
//! ordinary author stylesheets use: type/universal, `#id`, `.class`, attribute
//! operators, structural pseudo-classes, `:not()`, the four combinators and
//! comma-separated lists. Dynamic pseudo-classes and pseudo-elements parse but
//! never match. Control-surface elements are invisible to matching, including
//! sibling counting.

use super::document::Document;
use super::node::{ElementData, NodeId};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid selector '{}': {}", self.selector, self.reason)
    }
}

impl std::error::Error for SelectorError {}

/// `(ids, classes/attributes/pseudo-classes, types)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl std::ops::Add for Specificity {
    type Output = Specificity;

    fn add(self, rhs: Self) -> Self {
        Specificity(self.0 + rhs.0, self.1 + rhs.1, self.2 + rhs.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    test: Option<(AttrOp, String)>,
    case_insensitive: bool,
}

/// `an+b`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Nth {
    a: i64,
    b: i64,
}

impl Nth {
    fn matches(self, index: i64) -> bool {
        if self.a == 0 {
            return index == self.b;
        }
        let diff = index - self.b;
        diff % self.a == 0 && diff / self.a >= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pseudo {
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    OnlyChild,
    OnlyOfType,
    Root,
    Empty,
    Link,
    Checked,
    Disabled,
    Enabled,
    Not(Vec<Compound>),
    /// Dynamic state or pseudo-element: never matches a static tree.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    pseudos: Vec<Pseudo>,
    pseudo_element: bool,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.pseudos.is_empty()
            && !self.pseudo_element
    }

    fn specificity(&self) -> Specificity {
        let mut spec = Specificity(
            self.ids.len() as u32,
            (self.classes.len() + self.attrs.len()) as u32,
            u32::from(self.tag.as_deref().is_some_and(|t| t != "*")),
        );
        for pseudo in &self.pseudos {
            spec = spec
                + match pseudo {
                    Pseudo::Not(inner) => inner
                        .iter()
                        .map(Compound::specificity)
                        .max()
                        .unwrap_or_default(),
                    _ => Specificity(0, 1, 0),
                };
        }
        if self.pseudo_element {
            spec = spec + Specificity(0, 0, 1);
        }
        spec
    }
}

/// One selector of a list: compounds joined by combinators, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl ComplexSelector {
    pub fn specificity(&self) -> Specificity {
        self.compounds
            .iter()
            .fold(Specificity::default(), |acc, c| acc + c.specificity())
    }
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let fail = |reason: &str| SelectorError {
            selector: input.to_string(),
            reason: reason.to_string(),
        };
        let mut selectors = Vec::new();
        for part in split_top_level(input, ',') {
            let mut parser = Parser::new(part);
            let complex = parser.complex().map_err(|e| fail(&e))?;
            selectors.push(complex);
        }
        if selectors.is_empty() {
            return Err(fail("empty selector"));
        }
        Ok(Self { selectors })
    }

    pub fn selectors(&self) -> &[ComplexSelector] {
        &self.selectors
    }

    /// True when any selector of the list matches `id`.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.selectors.iter().any(|s| matches_complex(doc, id, s))
    }

    /// Highest specificity among the selectors that match `id`.
    pub fn matching_specificity(&self, doc: &Document, id: NodeId) -> Option<Specificity> {
        self.selectors
            .iter()
            .filter(|s| matches_complex(doc, id, s))
            .map(ComplexSelector::specificity)
            .max()
    }
}

impl Document {
    /// All non-control-surface elements below `scope` matching `selector`, in
    /// document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(el) = self.element(id) else {
                continue;
            };
            if el.has_attr(super::CONTROL_SURFACE_ATTR) {
                continue;
            }
            if selector.matches(self, id) {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }
}

// ============================================================================
// Matching
// ============================================================================

fn visible_element<'a>(doc: &'a Document, id: NodeId) -> Option<&'a ElementData> {
    doc.element(id)
        .filter(|el| !el.has_attr(super::CONTROL_SURFACE_ATTR))
}

fn matches_complex(doc: &Document, id: NodeId, selector: &ComplexSelector) -> bool {
    let last = selector.compounds.len() - 1;
    match_at(doc, id, selector, last)
}

fn match_at(doc: &Document, id: NodeId, selector: &ComplexSelector, index: usize) -> bool {
    if !matches_compound(doc, id, &selector.compounds[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match selector.combinators[index - 1] {
        Combinator::Child => doc
            .parent_element(id)
            .is_some_and(|p| match_at(doc, p, selector, index - 1)),
        Combinator::Descendant => doc
            .ancestors(id)
            .filter(|a| doc.node(*a).is_element())
            .any(|a| match_at(doc, a, selector, index - 1)),
        Combinator::NextSibling => previous_siblings(doc, id)
            .first()
            .is_some_and(|s| match_at(doc, *s, selector, index - 1)),
        Combinator::SubsequentSibling => previous_siblings(doc, id)
            .iter()
            .any(|s| match_at(doc, *s, selector, index - 1)),
    }
}

/// Visible element siblings before `id`, nearest first.
fn previous_siblings(doc: &Document, id: NodeId) -> Vec<NodeId> {
    let Some(parent) = doc.parent(id) else {
        return Vec::new();
    };
    let mut out: Vec<NodeId> = doc
        .children(parent)
        .iter()
        .copied()
        .take_while(|c| *c != id)
        .filter(|c| visible_element(doc, *c).is_some())
        .collect();
    out.reverse();
    out
}

/// Visible element siblings of `id` including itself, in order.
fn sibling_elements(doc: &Document, id: NodeId) -> Vec<NodeId> {
    match doc.parent(id) {
        Some(parent) => doc
            .children(parent)
            .iter()
            .copied()
            .filter(|c| visible_element(doc, *c).is_some())
            .collect(),
        None => vec![id],
    }
}

/// 1-based `(index, count)` of `id` among `siblings` filtered by `same`.
fn position_among(
    siblings: &[NodeId],
    id: NodeId,
    same: impl Fn(NodeId) -> bool,
) -> (i64, i64) {
    let filtered: Vec<NodeId> = siblings.iter().copied().filter(|s| same(*s)).collect();
    let index = filtered
        .iter()
        .position(|s| *s == id)
        .map(|p| p as i64 + 1)
        .unwrap_or(0);
    (index, filtered.len() as i64)
}

fn matches_compound(doc: &Document, id: NodeId, compound: &Compound) -> bool {
    let Some(el) = visible_element(doc, id) else {
        return false;
    };
    if compound.pseudo_element {
        return false;
    }
    if let Some(tag) = &compound.tag {
        if tag != "*" && *tag != el.tag {
            return false;
        }
    }
    if !compound.ids.iter().all(|i| el.attr("id") == Some(i.as_str())) {
        return false;
    }
    if !compound.classes.iter().all(|c| el.has_class(c)) {
        return false;
    }
    if !compound.attrs.iter().all(|a| matches_attr(el, a)) {
        return false;
    }
    compound
        .pseudos
        .iter()
        .all(|p| matches_pseudo(doc, id, el, p))
}

fn matches_attr(el: &ElementData, selector: &AttrSelector) -> bool {
    let Some(value) = el.attr(&selector.name) else {
        return false;
    };
    let Some((op, expected)) = &selector.test else {
        return true;
    };
    let (value, expected) = if selector.case_insensitive {
        (value.to_lowercase(), expected.to_lowercase())
    } else {
        (value.to_string(), expected.clone())
    };
    match op {
        AttrOp::Equals => value == expected,
        AttrOp::Includes => value.split_ascii_whitespace().any(|t| t == expected),
        AttrOp::DashMatch => value == expected || value.starts_with(&format!("{}-", expected)),
        AttrOp::Prefix => !expected.is_empty() && value.starts_with(&expected),
        AttrOp::Suffix => !expected.is_empty() && value.ends_with(&expected),
        AttrOp::Substring => !expected.is_empty() && value.contains(&expected),
    }
}

fn matches_pseudo(doc: &Document, id: NodeId, el: &ElementData, pseudo: &Pseudo) -> bool {
    let same_type = |s: NodeId| doc.tag_name(s) == Some(el.tag.as_str());
    match pseudo {
        Pseudo::NthChild(nth) => {
            let (index, _) = position_among(&sibling_elements(doc, id), id, |_| true);
            nth.matches(index)
        }
        Pseudo::NthLastChild(nth) => {
            let (index, count) = position_among(&sibling_elements(doc, id), id, |_| true);
            nth.matches(count - index + 1)
        }
        Pseudo::NthOfType(nth) => {
            let (index, _) = position_among(&sibling_elements(doc, id), id, same_type);
            nth.matches(index)
        }
        Pseudo::NthLastOfType(nth) => {
            let (index, count) = position_among(&sibling_elements(doc, id), id, same_type);
            nth.matches(count - index + 1)
        }
        Pseudo::OnlyChild => sibling_elements(doc, id).len() == 1,
        Pseudo::OnlyOfType => position_among(&sibling_elements(doc, id), id, same_type).1 == 1,
        Pseudo::Root => doc.parent(id) == Some(doc.root()),
        Pseudo::Empty => doc.children(id).iter().all(|c| match &doc.node(*c).data {
            super::NodeData::Text(t) => t.is_empty(),
            super::NodeData::Comment(_) => true,
            _ => false,
        }),
        Pseudo::Link => matches!(el.tag.as_str(), "a" | "area") && el.has_attr("href"),
        Pseudo::Checked => el.has_attr("checked") || el.has_attr("selected"),
        Pseudo::Disabled => el.has_attr("disabled"),
        Pseudo::Enabled => {
            matches!(
                el.tag.as_str(),
                "button" | "input" | "select" | "textarea" | "option" | "fieldset"
            ) && !el.has_attr("disabled")
        }
        Pseudo::Not(inner) => !inner.iter().any(|c| matches_compound(doc, id, c)),
        Pseudo::Never => false,
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Splits on `sep` outside of quotes, brackets and parentheses.
pub(crate) fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

const DYNAMIC_PSEUDO_CLASSES: &[&str] = &[
    "hover",
    "focus",
    "focus-within",
    "focus-visible",
    "active",
    "visited",
    "target",
    "target-within",
    "placeholder-shown",
    "autofill",
    "user-invalid",
    "user-valid",
    "invalid",
    "valid",
    "indeterminate",
    "default",
    "defined",
];

const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn complex(&mut self) -> Result<ComplexSelector, String> {
        self.skip_ws();
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            if self.at_end() {
                break;
            }
            let combinator = match self.peek() {
                Some('>') => {
                    self.bump();
                    Combinator::Child
                }
                Some('+') => {
                    self.bump();
                    Combinator::NextSibling
                }
                Some('~') => {
                    self.bump();
                    Combinator::SubsequentSibling
                }
                _ if had_ws => Combinator::Descendant,
                Some(c) => return Err(format!("unexpected character '{}'", c)),
                None => break,
            };
            self.skip_ws();
            if compounds.last().is_some_and(|c| c.pseudo_element) {
                return Err("combinator after pseudo-element".to_string());
            }
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound, String> {
        let mut compound = Compound::default();
        if self.eat('*') {
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_start) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.ids.push(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => {
                    self.bump();
                    if self.eat(':') {
                        self.ident()?;
                        if self.eat('(') {
                            self.until_close_paren()?;
                        }
                        compound.pseudo_element = true;
                    } else {
                        let pseudo = self.pseudo_class()?;
                        compound.pseudos.push(pseudo);
                    }
                }
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(match self.peek() {
                Some(c) => format!("unexpected character '{}'", c),
                None => "expected a selector".to_string(),
            });
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String, String> {
        let mut out = String::new();
        if self.peek() == Some('-') {
            out.push('-');
            self.bump();
        }
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.bump();
                out.push(self.escape()?);
            } else if is_ident_char(ch) {
                out.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        if out.is_empty() || out == "-" {
            return Err("expected identifier".to_string());
        }
        Ok(out)
    }

    fn escape(&mut self) -> Result<char, String> {
        let mut hex = String::new();
        while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            hex.push(self.bump().unwrap_or('0'));
        }
        if hex.is_empty() {
            return self.bump().ok_or_else(|| "dangling escape".to_string());
        }
        if self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let code = u32::from_str_radix(&hex, 16).map_err(|e| e.to_string())?;
        Ok(char::from_u32(code)
            .filter(|c| *c != '\0')
            .unwrap_or('\u{fffd}'))
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn attribute(&mut self) -> Result<AttrSelector, String> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        if self.eat(']') {
            return Ok(AttrSelector {
                name,
                test: None,
                case_insensitive: false,
            });
        }
        let op = match (self.bump(), self.peek()) {
            (Some('='), _) => AttrOp::Equals,
            (Some('~'), Some('=')) => AttrOp::Includes,
            (Some('|'), Some('=')) => AttrOp::DashMatch,
            (Some('^'), Some('=')) => AttrOp::Prefix,
            (Some('$'), Some('=')) => AttrOp::Suffix,
            (Some('*'), Some('=')) => AttrOp::Substring,
            _ => return Err("bad attribute operator".to_string()),
        };
        if op != AttrOp::Equals {
            self.bump();
        }
        self.skip_ws();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                self.string(q)?
            }
            _ => self.ident()?,
        };
        self.skip_ws();
        let mut case_insensitive = false;
        if matches!(self.peek(), Some('i' | 'I' | 's' | 'S')) {
            case_insensitive = matches!(self.bump(), Some('i' | 'I'));
            self.skip_ws();
        }
        if !self.eat(']') {
            return Err("unterminated attribute selector".to_string());
        }
        Ok(AttrSelector {
            name,
            test: Some((op, value)),
            case_insensitive,
        })
    }

    fn until_close_paren(&mut self) -> Result<String, String> {
        let mut depth = 1usize;
        let mut out = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                }
                _ => {}
            }
            out.push(ch);
        }
        Err("unterminated parenthesis".to_string())
    }

    fn pseudo_class(&mut self) -> Result<Pseudo, String> {
        let name = self.ident()?.to_ascii_lowercase();
        if self.eat('(') {
            let args = self.until_close_paren()?;
            return match name.as_str() {
                "nth-child" => Ok(Pseudo::NthChild(parse_nth(&args)?)),
                "nth-last-child" => Ok(Pseudo::NthLastChild(parse_nth(&args)?)),
                "nth-of-type" => Ok(Pseudo::NthOfType(parse_nth(&args)?)),
                "nth-last-of-type" => Ok(Pseudo::NthLastOfType(parse_nth(&args)?)),
                "not" => {
                    let mut inner = Vec::new();
                    for part in split_top_level(&args, ',') {
                        let mut parser = Parser::new(part);
                        parser.skip_ws();
                        let compound = parser.compound()?;
                        parser.skip_ws();
                        if !parser.at_end() {
                            return Err(":not() accepts compound selectors only".to_string());
                        }
                        inner.push(compound);
                    }
                    Ok(Pseudo::Not(inner))
                }
                _ => Err(format!("unsupported pseudo-class ':{}()'", name)),
            };
        }
        match name.as_str() {
            "first-child" => Ok(Pseudo::NthChild(Nth { a: 0, b: 1 })),
            "last-child" => Ok(Pseudo::NthLastChild(Nth { a: 0, b: 1 })),
            "first-of-type" => Ok(Pseudo::NthOfType(Nth { a: 0, b: 1 })),
            "last-of-type" => Ok(Pseudo::NthLastOfType(Nth { a: 0, b: 1 })),
            "only-child" => Ok(Pseudo::OnlyChild),
            "only-of-type" => Ok(Pseudo::OnlyOfType),
            "root" => Ok(Pseudo::Root),
            "empty" => Ok(Pseudo::Empty),
            "link" | "any-link" => Ok(Pseudo::Link),
            "checked" => Ok(Pseudo::Checked),
            "disabled" => Ok(Pseudo::Disabled),
            "enabled" => Ok(Pseudo::Enabled),
            n if DYNAMIC_PSEUDO_CLASSES.contains(&n) || LEGACY_PSEUDO_ELEMENTS.contains(&n) => {
                Ok(Pseudo::Never)
            }
            _ => Err(format!("unsupported pseudo-class ':{}'", name)),
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || ch == '\\' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn parse_nth(args: &str) -> Result<Nth, String> {
    let compact: String = args
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "odd" => return Ok(Nth { a: 2, b: 1 }),
        "even" => return Ok(Nth { a: 2, b: 0 }),
        _ => {}
    }
    let bad = || format!("bad nth expression '{}'", args.trim());
    match compact.split_once('n') {
        Some((a, b)) => {
            let a = match a {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse::<i64>().map_err(|_| bad())?,
            };
            let b = if b.is_empty() {
                0
            } else {
                b.parse::<i64>().map_err(|_| bad())?
            };
            Ok(Nth { a, b })
        }
        None => Ok(Nth {
            a: 0,
            b: compact.parse::<i64>().map_err(|_| bad())?,
        }),
    }
}

/// Escapes a string for use as a CSS identifier (`#id`, `.class`).
pub fn escape_ident(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, ch) in value.chars().enumerate() {
        let leading_digit = ch.is_ascii_digit()
            && (i == 0 || (i == 1 && value.starts_with('-')));
        if ch == '\0' {
            out.push('\u{fffd}');
        } else if ch.is_control() || leading_digit {
            out.push_str(&format!("\\{:x} ", ch as u32));
        } else if i == 0 && ch == '-' && value.len() == 1 {
            out.push_str("\\-");
        } else if is_ident_char(ch) {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}
