//! The 2-D chart: edges keyed by `(start, end)` span, each completed
//! derivation recorded as a backpointer tuple so an ambiguous edge can later
//! yield every tree that derives it, not just one. Also the work-list
//! ([`Agenda`]) the chart rules drain to fixpoint.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::element::Element;
use crate::grammar::{Grammar, Production};

/// A dotted production anchored to a span: `production.rhs[..dot]` has
/// matched `input[start..end]`, with `production.rhs[dot..]` still to go.
/// `dot == production.rhs.len()` marks the edge complete.
#[derive(Clone)]
pub struct Edge {
  pub start: usize,
  pub end: usize,
  pub production: Production,
  pub dot: usize,
  /// Computed once per `Edge` construction rather than re-walked on every
  /// chart lookup — an edge is hashed constantly while draining the agenda
  /// and probing [`IncrementalChart::backpointers_for`].
  hash_cache: u64,
}

fn edge_hash(start: usize, end: usize, production: &Production, dot: usize) -> u64 {
  let mut hasher = DefaultHasher::new();
  start.hash(&mut hasher);
  end.hash(&mut hasher);
  dot.hash(&mut hasher);
  production.hash(&mut hasher);
  hasher.finish()
}

impl Edge {
  pub fn new(start: usize, end: usize, production: Production, dot: usize) -> Edge {
    let hash_cache = edge_hash(start, end, &production, dot);
    Edge { start, end, production, dot, hash_cache }
  }

  pub fn is_complete(&self) -> bool {
    self.dot >= self.production.rhs.len()
  }

  pub fn next_symbol(&self) -> Option<&Element> {
    self.production.rhs.get(self.dot)
  }

  /// Advances the dot past a child that ended at `new_end`, widening this
  /// edge's span to match. Panics if this edge is already complete, or if
  /// `new_end` would move the span backwards — callers only ever merge a
  /// left edge with a child edge/token that starts where it left off.
  pub fn merge_and_forward(&self, new_end: usize) -> Edge {
    assert!(!self.is_complete(), "merge_and_forward on a complete edge");
    assert!(new_end >= self.end, "merge_and_forward would move the span backwards");
    Edge::new(self.start, new_end, self.production.clone(), self.dot + 1)
  }
}

impl PartialEq for Edge {
  fn eq(&self, other: &Self) -> bool {
    self.start == other.start && self.end == other.end && self.dot == other.dot && self.production == other.production
  }
}

impl Eq for Edge {}

impl Hash for Edge {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_u64(self.hash_cache);
  }
}

impl fmt::Debug for Edge {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self)
  }
}

impl fmt::Display for Edge {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}, {}] {} ->", self.start, self.end, self.production.lhs.name())?;
    for (i, sym) in self.production.rhs.iter().enumerate() {
      if i == self.dot {
        write!(f, " .")?;
      }
      write!(f, " {}", sym.name())?;
    }
    if self.is_complete() {
      write!(f, " .")?;
    }
    Ok(())
  }
}

/// A recorded derivation: the child edges that, left to right, realized an
/// edge's RHS. Tuple length always equals the edge's dot.
pub type Backpointer = Vec<Edge>;

/// The chart proper: every edge ever added, plus every distinct
/// backpointer tuple recorded for it (more than one tuple means the edge
/// is ambiguous). Indexed `[start][end]` per spec.md's 2-D layout rather
/// than the single-position state sets an Earley recognizer usually keeps,
/// since extraction needs to walk both ends of a span independently. Grows
/// past its original token-count estimate in fixed steps rather than being
/// resized one token at a time, the shape an incremental, token-at-a-time
/// parse needs.
///
/// A terminal edge never gets a backpointer entry — it was matched
/// directly against input, not assembled from children. Tree extraction's
/// leaf test is exactly this absence of a backpointer entry (see
/// [`IncrementalChart::add_edge`]), not `production.is_terminal`: a
/// nullable production's immediate zero-width completion has no
/// backpointer either, despite not being a terminal production.
pub struct IncrementalChart<'g> {
  grammar: &'g Grammar,
  capacity: usize,
  inc_size: usize,
  edges: Vec<Vec<HashSet<Edge>>>,
  backpointers: HashMap<Edge, HashSet<Backpointer>>,
  filled: usize,
}

impl<'g> IncrementalChart<'g> {
  pub fn new(grammar: &'g Grammar, inc_size: usize) -> IncrementalChart<'g> {
    assert!(inc_size > 0);
    let mut chart = IncrementalChart {
      grammar,
      capacity: 0,
      inc_size,
      edges: Vec::new(),
      backpointers: HashMap::new(),
      filled: 0,
    };
    chart.increase_capacity(inc_size);
    chart
  }

  pub fn grammar(&self) -> &'g Grammar {
    self.grammar
  }

  pub fn filled(&self) -> usize {
    self.filled
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Grows the backing matrix in `inc_size`-sized steps until it holds at
  /// least `needed` token positions.
  pub fn increase_capacity(&mut self, needed: usize) {
    while self.capacity < needed {
      self.capacity += self.inc_size;
      let new_len = self.capacity + 1;
      for row in &mut self.edges {
        row.resize_with(new_len, HashSet::new);
      }
      self.edges.resize_with(new_len, || vec![HashSet::new(); new_len]);
    }
  }

  pub fn advance(&mut self) {
    self.filled += 1;
    self.increase_capacity(self.filled);
  }

  /// Inserts `edge` if new, and — when `child` is given and differs from
  /// `edge` itself (guarding against a degenerate self-as-own-child
  /// registration) — records a backpointer tuple for it. Per spec.md §4.3:
  /// when `prev` already has backpointer tuples, each gets extended by
  /// `child`; when `prev` is `None` (or has none recorded, i.e.
  /// `prev.dot == 0`), a single `(child,)` tuple is recorded. `child` is
  /// omitted for edges with no predecessor (initial/predicted edges and
  /// terminal scans), which then get no backpointer entry at all. Returns
  /// `true` iff `edge` is new to the chart.
  pub fn add_edge(&mut self, edge: Edge, prev: Option<&Edge>, child: Option<Edge>) -> bool {
    self.increase_capacity(edge.end);
    let is_new = self.edges[edge.start][edge.end].insert(edge.clone());
    if let Some(child) = child {
      if child != edge {
        let new_tuples: Vec<Backpointer> = match prev.and_then(|p| self.backpointers.get(p)) {
          Some(existing) if !existing.is_empty() => existing
            .iter()
            .map(|t| {
              let mut t = t.clone();
              t.push(child.clone());
              t
            })
            .collect(),
          _ => vec![vec![child]],
        };
        let entry = self.backpointers.entry(edge).or_default();
        for t in new_tuples {
          entry.insert(t);
        }
      }
    }
    is_new
  }

  pub fn edges_at(&self, start: usize, end: usize) -> impl Iterator<Item = &Edge> {
    self.edges[start][end].iter()
  }

  pub fn completed_edges_for(&self, lhs: &Element, start: usize, end: usize) -> impl Iterator<Item = &Edge> {
    self.edges[start][end]
      .iter()
      .filter(move |e| e.is_complete() && e.production.lhs == *lhs)
  }

  pub fn active_edges_waiting_for(&self, symbol: &Element, start: usize, end: usize) -> impl Iterator<Item = &Edge> {
    self.edges[start][end]
      .iter()
      .filter(move |e| !e.is_complete() && e.next_symbol() == Some(symbol))
  }

  pub fn backpointers_for(&self, edge: &Edge) -> Option<&HashSet<Backpointer>> {
    self.backpointers.get(edge)
  }

  pub fn is_ambiguous(&self, edge: &Edge) -> bool {
    self.backpointers.get(edge).map(|bps| bps.len() > 1).unwrap_or(false)
  }

  pub fn goal_edges_through(&self, end: usize) -> impl Iterator<Item = &Edge> {
    self.completed_edges_for(self.grammar.goal(), 0, end)
  }

  pub fn edges_starting_at(&self, start: usize) -> impl Iterator<Item = &Edge> {
    self.edges[start].iter().flat_map(|set| set.iter())
  }

  pub fn edges_ending_at(&self, end: usize) -> impl Iterator<Item = &Edge> {
    self.edges.iter().flat_map(move |row| row[end].iter())
  }

  pub fn print_backpointers(&self) -> String {
    let mut lines: Vec<String> = self
      .backpointers
      .iter()
      .map(|(edge, tuples)| {
        let tuples_str = tuples
          .iter()
          .map(|t| format!("({})", t.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")))
          .collect::<Vec<_>>()
          .join(", ");
        format!("{} :-> {}", edge, tuples_str)
      })
      .collect();
    lines.sort();
    lines.join("\n")
  }
}

impl fmt::Display for IncrementalChart<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut lines: Vec<String> = Vec::new();
    for row in &self.edges {
      for cell in row {
        for edge in cell {
          lines.push(edge.to_string());
        }
      }
    }
    lines.sort();
    write!(f, "{}", lines.join("\n"))
  }
}

/// A LIFO work-list of edges awaiting rule application, plus a running
/// count of everything ever pushed — the count is a cheap proxy for how
/// much work a parse did, logged at the end of a parse.
#[derive(Default)]
pub struct Agenda {
  stack: Vec<Edge>,
  total: usize,
}

impl Agenda {
  pub fn new() -> Agenda {
    Agenda::default()
  }

  pub fn push(&mut self, edge: Edge) {
    self.total += 1;
    self.stack.push(edge);
  }

  pub fn pop(&mut self) -> Option<Edge> {
    self.stack.pop()
  }

  pub fn is_empty(&self) -> bool {
    self.stack.is_empty()
  }

  pub fn total(&self) -> usize {
    self.total
  }
}
