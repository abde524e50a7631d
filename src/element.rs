//! Grammar elements: the terminals and combinators a grammar author builds
//! with directly. An [`Element`] is a reference-counted handle with identity
//! semantics — cloning shares the same underlying node, and equality/hash
//! are by identity, never by structure. Call [`Element::set_name`] to get a
//! fresh identity that shares structure but can be bound under a different
//! role (e.g. reusing a `color` element for both a "from" and "to" slot).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops;
use std::rc::Rc;

use regex::{Regex, RegexBuilder};

use crate::error::ValueError;
use crate::result::{ParseResult, ResultValue};

pub type ResultCallback = Rc<dyn Fn(&mut ParseResult)>;

#[derive(Clone)]
pub(crate) enum Kind {
  StringLit { text: String, case_sensitive: bool },
  StringSet { set: Vec<String>, case_sensitive: bool },
  RegexLit { pattern: String, compiled: Regex, whole_match: bool },
  Null,
  And(Vec<Element>),
  Or(Vec<Element>),
  Optional(Element),
  OneOrMore(Element),
  ZeroOrMore(Element),
}

impl Kind {
  fn class_name(&self) -> &'static str {
    match self {
      Kind::StringLit { .. } => "StringLit",
      Kind::StringSet { .. } => "StringSet",
      Kind::RegexLit { .. } => "RegexLit",
      Kind::Null => "Null",
      Kind::And(_) => "And",
      Kind::Or(_) => "Or",
      Kind::Optional(_) => "Optional",
      Kind::OneOrMore(_) => "OneOrMore",
      Kind::ZeroOrMore(_) => "ZeroOrMore",
    }
  }

  fn is_terminal(&self) -> bool {
    matches!(
      self,
      Kind::StringLit { .. } | Kind::StringSet { .. } | Kind::RegexLit { .. } | Kind::Null
    )
  }

  fn as_list(&self) -> bool {
    matches!(self, Kind::OneOrMore(_) | Kind::ZeroOrMore(_))
  }
}

pub(crate) struct ElementInner {
  pub(crate) kind: Kind,
  name: RefCell<Option<String>>,
  variable_name: RefCell<Option<String>>,
  canonical_name: RefCell<Option<String>>,
  pub(crate) callbacks: RefCell<Vec<ResultCallback>>,
  pub(crate) ignore_in_result: Cell<bool>,
  pub(crate) streamlined: Cell<bool>,
}

/// A grammar symbol: a terminal matcher or a combinator over child
/// elements. Cheap to clone (an `Rc` bump); clones share identity.
#[derive(Clone)]
pub struct Element(pub(crate) Rc<ElementInner>);

impl Element {
  fn from_kind(kind: Kind) -> Element {
    Element(Rc::new(ElementInner {
      kind,
      name: RefCell::new(None),
      variable_name: RefCell::new(None),
      canonical_name: RefCell::new(None),
      callbacks: RefCell::new(Vec::new()),
      ignore_in_result: Cell::new(false),
      streamlined: Cell::new(false),
    }))
  }

  /// Case-insensitive literal string match.
  pub fn string(text: impl Into<String>) -> Result<Element, ValueError> {
    Self::string_impl(text, false)
  }

  /// Case-sensitive literal string match.
  pub fn string_cs(text: impl Into<String>) -> Result<Element, ValueError> {
    Self::string_impl(text, true)
  }

  fn string_impl(text: impl Into<String>, case_sensitive: bool) -> Result<Element, ValueError> {
    let text = text.into();
    if text.is_empty() {
      return Err(ValueError::EmptyPattern);
    }
    let text = if case_sensitive { text } else { text.to_lowercase() };
    Ok(Element::from_kind(Kind::StringLit { text, case_sensitive }))
  }

  /// Case-insensitive membership in a fixed set of whole-string alternatives.
  pub fn string_set<I, S>(strings: I) -> Result<Element, ValueError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self::string_set_impl(strings, false)
  }

  /// Case-sensitive membership in a fixed set of whole-string alternatives.
  pub fn string_set_cs<I, S>(strings: I) -> Result<Element, ValueError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self::string_set_impl(strings, true)
  }

  fn string_set_impl<I, S>(strings: I, case_sensitive: bool) -> Result<Element, ValueError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let set: Vec<String> = strings
      .into_iter()
      .map(|s| {
        let s = s.into();
        if case_sensitive {
          s
        } else {
          s.to_lowercase()
        }
      })
      .collect();
    if set.is_empty() {
      return Err(ValueError::EmptyPattern);
    }
    Ok(Element::from_kind(Kind::StringSet { set, case_sensitive }))
  }

  /// Case-insensitive regex match, anchored at both ends unless
  /// `whole_match` is false.
  pub fn regex(pattern: impl AsRef<str>, whole_match: bool) -> Result<Element, ValueError> {
    Self::regex_impl(pattern, whole_match, false)
  }

  /// Case-sensitive regex match.
  pub fn regex_cs(pattern: impl AsRef<str>, whole_match: bool) -> Result<Element, ValueError> {
    Self::regex_impl(pattern, whole_match, true)
  }

  fn regex_impl(
    pattern: impl AsRef<str>,
    whole_match: bool,
    case_sensitive: bool,
  ) -> Result<Element, ValueError> {
    let pattern = pattern.as_ref();
    if pattern.is_empty() {
      return Err(ValueError::EmptyPattern);
    }
    let anchored = if whole_match {
      format!("^(?:{})$", pattern)
    } else {
      pattern.to_string()
    };
    let compiled = RegexBuilder::new(&anchored)
      .case_insensitive(!case_sensitive)
      .build()
      .map_err(|e| ValueError::BadRegex(pattern.to_string(), e.to_string()))?;
    Ok(Element::from_kind(Kind::RegexLit {
      pattern: anchored,
      compiled,
      whole_match,
    }))
  }

  /// The sentinel Null element, shared by identity across a thread. Used
  /// internally by nullable productions; never matches.
  pub fn null() -> Element {
    NULL_SINGLETON.with(|n| n.clone())
  }

  pub fn and(children: Vec<Element>) -> Element {
    Element::from_kind(Kind::And(children))
  }

  pub fn or(children: Vec<Element>) -> Element {
    Element::from_kind(Kind::Or(children))
  }

  pub fn optional(self) -> Element {
    Element::from_kind(Kind::Optional(self))
  }

  pub fn one_or_more(self) -> Element {
    Element::from_kind(Kind::OneOrMore(self))
  }

  pub fn zero_or_more(self) -> Element {
    Element::from_kind(Kind::ZeroOrMore(self))
  }

  /// `m` exact copies of `self` under a fresh `And`. `m == 1` returns `self`
  /// unchanged (no wrapping `And` of one).
  pub fn repeat(self, m: i64) -> Result<Element, ValueError> {
    if m <= 0 {
      return Err(ValueError::NonPositiveMultiplier(m));
    }
    if m == 1 {
      return Ok(self);
    }
    Ok(Element::and((0..m).map(|_| self.clone()).collect()))
  }

  /// `(m, n)` range repetition, `n >= m`, either bound optional. Desugars
  /// per spec.md §4.1:
  /// - `(None, None)` => `ZeroOrMore`
  /// - `(m, None)` => `m` copies `And`-ed with `ZeroOrMore` (or `OneOrMore`/
  ///   `ZeroOrMore` directly for `m == 1`/`m == 0`)
  /// - `(None, n)` / `(m, n)` => `m` required copies plus `n - m` `Optional`s
  pub fn repeat_range(self, m: Option<u32>, n: Option<u32>) -> Result<Element, ValueError> {
    let m = m.unwrap_or(0);
    match n {
      None => {
        if m == 0 {
          Ok(self.zero_or_more())
        } else if m == 1 {
          Ok(self.one_or_more())
        } else {
          let head = self.clone().repeat(m as i64)?;
          Ok(head + self.zero_or_more())
        }
      }
      Some(n) => {
        if n < m {
          return Err(ValueError::InvertedRange { min: m, max: n });
        }
        if m == 0 && n == 1 {
          Ok(self.optional())
        } else if m == n {
          self.repeat(m as i64)
        } else {
          let mut parts: Vec<Element> = (0..m).map(|_| self.clone()).collect();
          for _ in 0..(n - m) {
            parts.push(self.clone().optional());
          }
          Ok(Element::and(parts))
        }
      }
    }
  }

  pub fn at_least(self, m: u32) -> Result<Element, ValueError> {
    self.repeat_range(Some(m), None)
  }

  pub fn at_most(self, n: u32) -> Result<Element, ValueError> {
    self.repeat_range(None, Some(n))
  }

  pub fn between(self, m: u32, n: u32) -> Result<Element, ValueError> {
    self.repeat_range(Some(m), Some(n))
  }

  /// Returns a new element, a distinct identity, sharing structure but
  /// carrying `name` and a copy of the current callbacks. Used to reuse a
  /// common sub-grammar under multiple distinct roles without name
  /// collision.
  pub fn set_name(&self, name: impl Into<String>) -> Element {
    let copy = ElementInner {
      kind: self.0.kind.clone(),
      name: RefCell::new(Some(name.into())),
      variable_name: RefCell::new(None),
      canonical_name: RefCell::new(None),
      callbacks: RefCell::new(self.0.callbacks.borrow().clone()),
      ignore_in_result: Cell::new(self.0.ignore_in_result.get()),
      streamlined: Cell::new(false),
    };
    Element(Rc::new(copy))
  }

  /// Installs post-parse callbacks, run in order against the `ParseResult`
  /// of every completed derivation of this element. Mutates this element in
  /// place (same identity) and returns it for chaining.
  pub fn set_result_action(self, callbacks: impl IntoIterator<Item = ResultCallback>) -> Element {
    *self.0.callbacks.borrow_mut() = callbacks.into_iter().collect();
    self
  }

  /// Shortcut for a single callback that overwrites the result's main value.
  pub fn replace_result_with(self, value: ResultValue) -> Element {
    let cb: ResultCallback = Rc::new(move |r: &mut ParseResult| r.set(value.clone()));
    self.set_result_action([cb])
  }

  /// Marks this element so completed derivations contribute no entry to the
  /// result and are skipped entirely during result construction. Mutates in
  /// place and returns self for chaining.
  pub fn ignore(self) -> Element {
    self.0.ignore_in_result.set(true);
    self
  }

  pub fn ignore_in_result(&self) -> bool {
    self.0.ignore_in_result.get()
  }

  /// Runs this element's post-parse callbacks, in declared order, against
  /// `result` — the tree-to-result fold's last step for every node (§4.7).
  pub(crate) fn run_callbacks(&self, result: &mut ParseResult) {
    for cb in self.0.callbacks.borrow().iter() {
      cb(result);
    }
  }

  pub fn is_terminal(&self) -> bool {
    self.0.kind.is_terminal()
  }

  pub fn as_list(&self) -> bool {
    self.0.kind.as_list()
  }

  pub(crate) fn is_null(&self) -> bool {
    matches!(self.0.kind, Kind::Null)
  }

  /// The display name: explicit (`set_name`), else the host-binding
  /// variable name assigned at grammar-compile time, else a canonical
  /// `Kind(children...)` fallback computed (and cached) on first use.
  pub fn name(&self) -> String {
    if let Some(n) = self.0.name.borrow().as_ref() {
      return n.clone();
    }
    if let Some(n) = self.0.variable_name.borrow().as_ref() {
      return n.clone();
    }
    if let Some(n) = self.0.canonical_name.borrow().as_ref() {
      return n.clone();
    }
    let canon = format!("{}({})", self.0.kind.class_name(), self.default_name());
    *self.0.canonical_name.borrow_mut() = Some(canon.clone());
    canon
  }

  pub(crate) fn set_variable_name(&self, name: impl Into<String>) {
    *self.0.variable_name.borrow_mut() = Some(name.into());
  }

  pub(crate) fn has_explicit_or_variable_name(&self) -> bool {
    self.0.name.borrow().is_some() || self.0.variable_name.borrow().is_some()
  }

  fn default_name(&self) -> String {
    match &self.0.kind {
      Kind::StringLit { text, .. } => text.clone(),
      Kind::StringSet { set, .. } => set.join("|"),
      Kind::RegexLit { pattern, .. } => pattern.clone(),
      Kind::Null => "Null".to_string(),
      Kind::And(children) | Kind::Or(children) => {
        children.iter().map(|e| e.name()).collect::<Vec<_>>().join(", ")
      }
      Kind::Optional(e) | Kind::OneOrMore(e) | Kind::ZeroOrMore(e) => e.name(),
    }
  }

  /// Whole-token match against `token`. Non-atomic (combinator) elements
  /// never call this directly — they exist only to yield productions.
  pub fn parse(&self, token: &str) -> bool {
    match &self.0.kind {
      Kind::StringLit { text, case_sensitive } => {
        if *case_sensitive {
          text == token
        } else {
          text == &token.to_lowercase()
        }
      }
      Kind::StringSet { set, case_sensitive } => {
        if *case_sensitive {
          set.iter().any(|s| s == token)
        } else {
          let lowered = token.to_lowercase();
          set.iter().any(|s| s == &lowered)
        }
      }
      Kind::RegexLit { compiled, .. } => compiled.is_match(token),
      Kind::Null => false,
      _ => panic!("parse() called on a non-atomic element: {}", self.name()),
    }
  }

  /// The productions this element contributes to a grammar, one group per
  /// way it can be derived. Atomic elements yield a single `LHS -> [LHS]`
  /// terminal production; combinators yield the shapes spec.md documents
  /// for `And`/`Or`/`Optional`/`OneOrMore`/`ZeroOrMore`.
  pub(crate) fn yield_productions(&self) -> Vec<crate::grammar::Production> {
    use crate::grammar::Production;
    match &self.0.kind {
      Kind::StringLit { .. } | Kind::StringSet { .. } | Kind::RegexLit { .. } | Kind::Null => {
        vec![Production::new(self.clone(), vec![self.clone()])]
      }
      Kind::And(children) => vec![Production::new(self.clone(), children.clone())],
      Kind::Or(children) => children
        .iter()
        .map(|c| Production::new(self.clone(), vec![c.clone()]))
        .collect(),
      Kind::Optional(e) => vec![
        Production::new(self.clone(), vec![Element::null()]),
        Production::new(self.clone(), vec![e.clone()]),
      ],
      Kind::OneOrMore(e) => vec![
        Production::new(self.clone(), vec![e.clone()]),
        Production::new(self.clone(), vec![e.clone(), self.clone()]),
      ],
      Kind::ZeroOrMore(e) => vec![
        Production::new(self.clone(), vec![Element::null()]),
        Production::new(self.clone(), vec![e.clone()]),
        Production::new(self.clone(), vec![e.clone(), self.clone()]),
      ],
    }
  }

  pub(crate) fn children(&self) -> Vec<Element> {
    match &self.0.kind {
      Kind::And(cs) | Kind::Or(cs) => cs.clone(),
      Kind::Optional(e) | Kind::OneOrMore(e) | Kind::ZeroOrMore(e) => vec![e.clone()],
      _ => Vec::new(),
    }
  }

  /// Flattens one level of nested same-kind `And`/`Or` with no callbacks
  /// and no bound name, per spec.md's streamlining invariant. Does not
  /// recurse beyond one level, and does not recurse into children — the
  /// grammar compiler calls this depth-first itself.
  pub(crate) fn streamline(&self) -> Element {
    if self.0.streamlined.get() {
      return self.clone();
    }
    self.0.streamlined.set(true);

    let flattened = match &self.0.kind {
      Kind::And(cs) => {
        let merged = flatten_same_kind(cs, |k| matches!(k, Kind::And(_)));
        (merged != *cs).then(|| Kind::And(merged))
      }
      Kind::Or(cs) => {
        let merged = flatten_same_kind(cs, |k| matches!(k, Kind::Or(_)));
        (merged != *cs).then(|| Kind::Or(merged))
      }
      _ => None,
    };

    match flattened {
      // Only mint a new identity when something actually merged — otherwise
      // this element keeps being itself, so any RHS reference elsewhere in
      // the grammar (including `compile`'s own `goal`) still resolves.
      Some(kind) => {
        let copy = ElementInner {
          kind,
          name: self.0.name.clone(),
          variable_name: self.0.variable_name.clone(),
          canonical_name: RefCell::new(None),
          callbacks: self.0.callbacks.clone(),
          ignore_in_result: Cell::new(self.0.ignore_in_result.get()),
          streamlined: Cell::new(true),
        };
        Element(Rc::new(copy))
      }
      None => self.clone(),
    }
  }

  fn is_mergeable(&self, same_kind: impl Fn(&Kind) -> bool) -> bool {
    same_kind(&self.0.kind) && self.0.callbacks.borrow().is_empty() && !self.has_explicit_or_variable_name()
  }
}

fn flatten_same_kind(children: &[Element], same_kind: impl Fn(&Kind) -> bool + Copy) -> Vec<Element> {
  if children.len() != 2 {
    return children.to_vec();
  }
  let mut out = Vec::with_capacity(children.len() + 1);
  let first = &children[0];
  let last = &children[1];
  if first.is_mergeable(same_kind) {
    out.extend(first.children());
  } else {
    out.push(first.clone());
  }
  if last.is_mergeable(same_kind) {
    out.extend(last.children());
  } else {
    out.push(last.clone());
  }
  out
}

thread_local! {
  static NULL_SINGLETON: Element = Element::from_kind(Kind::Null);
}

impl PartialEq for Element {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for Element {}

impl Hash for Element {
  fn hash<H: Hasher>(&self, state: &mut H) {
    (Rc::as_ptr(&self.0) as usize).hash(state);
  }
}

impl fmt::Debug for Element {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl fmt::Display for Element {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl ops::Add<Element> for Element {
  type Output = Element;
  fn add(self, rhs: Element) -> Element {
    Element::and(vec![self, rhs])
  }
}

impl ops::BitOr<Element> for Element {
  type Output = Element;
  fn bitor(self, rhs: Element) -> Element {
    Element::or(vec![self, rhs])
  }
}

impl ops::Mul<i64> for Element {
  type Output = Result<Element, ValueError>;
  fn mul(self, m: i64) -> Self::Output {
    self.repeat(m)
  }
}
