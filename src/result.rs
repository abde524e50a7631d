//! The record a completed parse produces: a nested, JSON-serializable
//! structure assembled by the tree walk and mutated along the way by each
//! element's post-parse callbacks (see [`crate::element::Element::set_result_action`]).

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

use serde::Serialize;
use serde_json::Value as Json;

/// A value a named field of a [`ParseResult`] can hold. Scalars come from
/// terminal text or from a callback's arithmetic (the numbers/times
/// grammars' `result_sum`/`result_mul`-equivalent callbacks replace a
/// node's text with a computed integer); `Result` nests a child's whole
/// record; `List` holds the per-repetition values of an `OneOrMore`/
/// `ZeroOrMore` field, or the flattened collision of two scalars sharing a
/// name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultValue {
  Text(String),
  Number(i64),
  Result(ParseResult),
  List(Vec<ResultValue>),
}

impl ResultValue {
  /// Reads this value back as an integer, the way a numbers/times
  /// callback reads a child's current main value before summing or
  /// multiplying it. A `Text` that parses as an integer counts too, since
  /// a digit terminal (`Regex(r"\d+")`) starts out as plain text until a
  /// callback replaces it.
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      ResultValue::Number(n) => Some(*n),
      ResultValue::Text(t) => t.parse().ok(),
      ResultValue::Result(r) => r.number(),
      ResultValue::List(_) => None,
    }
  }
}

/// A parsed record: an optional scalar "own text" value (set when the node
/// is, or stands in for, a terminal) plus a map of named child fields.
///
/// Field access is by name rather than by Rust field/method, mirroring the
/// dynamic attribute access a hand-written grammar's callbacks expect —
/// `get`/`add_item` are this crate's equivalent of reading and writing an
/// arbitrary attribute at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
  #[serde(skip_serializing_if = "Option::is_none")]
  value: Option<ResultValue>,
  #[serde(flatten)]
  items: BTreeMap<String, ResultValue>,
}

impl ParseResult {
  pub fn new() -> Self {
    Self::default()
  }

  /// This record's own scalar text, when the current main value is a
  /// `Text`. `None` for a `Number` main value, a replaced-with-`Result`
  /// record, or a node that never had a scalar set.
  pub fn text(&self) -> Option<&str> {
    match &self.value {
      Some(ResultValue::Text(t)) => Some(t),
      _ => None,
    }
  }

  /// This record's own value read back as an integer, whether it was set
  /// as a `Number` directly or as digit `Text` a callback hasn't converted
  /// yet.
  pub fn number(&self) -> Option<i64> {
    self.value.as_ref().and_then(ResultValue::as_i64)
  }

  /// `name`'s value read as a list, the attribute-style convenience a host
  /// caller reaches for when it already knows a field is multi-cardinality
  /// (a `OneOrMore`/`ZeroOrMore` field, or one two sibling clauses collided
  /// into). A scalar field or a missing name both read back as `None` —
  /// callers that don't know the cardinality ahead of time should match on
  /// [`ParseResult::get`] directly instead.
  pub fn list(&self, name: &str) -> Option<&[ResultValue]> {
    match self.items.get(name) {
      Some(ResultValue::List(items)) => Some(items.as_slice()),
      _ => None,
    }
  }

  pub fn set_text(&mut self, text: impl Into<String>) {
    self.value = Some(ResultValue::Text(text.into()));
  }

  /// Overwrites this record wholesale, the way a callback takes over a
  /// node's result entirely: any fields already collected from children are
  /// dropped, whatever the new value's shape. This is what
  /// [`Element::replace_result_with`][crate::element::Element::replace_result_with]
  /// and a numbers/times-style arithmetic callback both call — either is
  /// meant to replace this node's meaning, not add to it.
  pub fn set(&mut self, value: ResultValue) {
    match value {
      ResultValue::Text(t) => {
        self.value = Some(ResultValue::Text(t));
        self.items.clear();
      }
      ResultValue::Number(n) => {
        self.value = Some(ResultValue::Number(n));
        self.items.clear();
      }
      ResultValue::Result(r) => {
        self.value = r.value;
        self.items = r.items;
      }
      ResultValue::List(items) => {
        self.value = None;
        self.items.clear();
        self.items.insert("value".to_string(), ResultValue::List(items));
      }
    }
  }

  /// Records this node's own computed main value without disturbing fields
  /// already absorbed from children — the tree fold's internal counterpart
  /// to [`ParseResult::set`], used once per node for the "replace the main
  /// value with the list of child main values" step (spec.md §4.7) before
  /// any callback runs. A `List`/scalar is stashed as this node's own
  /// `"value"`, coexisting with any same-named fields a child already
  /// contributed (the documented `ZeroOrMore` dual string/list shape is a
  /// direct consequence, not a special case here).
  pub(crate) fn set_main_value(&mut self, value: ResultValue) {
    match value {
      ResultValue::Result(r) => {
        self.value = r.value;
        for (k, v) in r.items {
          self.add_item(&k, v);
        }
      }
      ResultValue::List(items) => {
        self.value = None;
        self.items.insert("value".to_string(), ResultValue::List(items));
      }
      other => self.value = Some(other),
    }
  }

  pub fn get(&self, name: &str) -> Option<&ResultValue> {
    self.items.get(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &String> {
    self.items.keys()
  }

  pub fn is_empty(&self) -> bool {
    self.value.is_none() && self.items.is_empty()
  }

  /// Adds a named child value. A name seen for the first time is stored as
  /// a scalar; a second value under the same name promotes both into a
  /// `List`; a name already holding a `List` keeps appending. This is the
  /// collision rule that lets a repeated or reused element accumulate
  /// multiple hits under one field without the caller pre-declaring it as
  /// a list.
  pub fn add_item(&mut self, name: &str, value: ResultValue) {
    match self.items.remove(name) {
      None => {
        self.items.insert(name.to_string(), value);
      }
      Some(ResultValue::List(mut existing)) => {
        existing.push(value);
        self.items.insert(name.to_string(), ResultValue::List(existing));
      }
      Some(existing) => {
        self.items.insert(name.to_string(), ResultValue::List(vec![existing, value]));
      }
    }
  }

  /// Splices another record's fields into this one, field by field,
  /// applying the same collision rule as [`ParseResult::add_item`]. Used
  /// when a child element is marked `ignore_in_result`: its own name never
  /// appears, but its fields still surface on the parent.
  pub fn absorb(&mut self, other: ParseResult) {
    for (name, value) in other.items {
      self.add_item(&name, value);
    }
  }

  pub fn to_json(&self) -> Json {
    serde_json::to_value(self).unwrap_or(Json::Null)
  }

  /// This record's own main value, the way a caller reading `result.get()`
  /// with no field name would see it: the scalar text if one was ever set,
  /// the list stashed under the reserved `"value"` key if [`ParseResult::set`]
  /// was last given a [`ResultValue::List`], or the whole record otherwise
  /// (a node whose value was replaced by a nested [`ResultValue::Result`],
  /// or that never had a scalar set at all, stands for its own main value).
  pub fn main_value(&self) -> ResultValue {
    if let Some(v) = &self.value {
      v.clone()
    } else if let Some(ResultValue::List(items)) = self.items.get("value") {
      ResultValue::List(items.clone())
    } else {
      ResultValue::Result(self.clone())
    }
  }
}

/// `result["field"]` map-style access, the Rust analogue of the dynamic
/// attribute access spec.md §9 calls for (Rust has no `__getattr__`, so
/// named-field access goes through `Index`/[`ParseResult::get`] rather than
/// `result.field`). Panics on a missing field, matching `Index`'s usual
/// contract elsewhere in std (`HashMap`'s `Index`, slices) — callers unsure
/// whether a field is present should use [`ParseResult::get`] instead.
impl Index<&str> for ParseResult {
  type Output = ResultValue;

  fn index(&self, name: &str) -> &ResultValue {
    self.items.get(name).unwrap_or_else(|| panic!("no field named {name:?} in parse result"))
  }
}

impl fmt::Display for ParseResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_json())
  }
}
