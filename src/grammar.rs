//! Compiles a goal [`Element`] into a [`Grammar`]: a flat production set plus
//! the indices the chart engine's rules need (by-LHS lookup, terminal vs.
//! nonterminal partition, left-corner closures for the left-corner
//! strategy). Mirrors the distilled grammar's single-pass compiler: name
//! assignment, streamlining, production generation, one-level nullable
//! elimination, then index construction.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::element::Element;
use crate::error::GrammarError;

/// One rewrite rule: `lhs -> rhs[0] rhs[1] ...`. Equality and hashing are by
/// the identity of `lhs` and of each `rhs` symbol, same as [`Element`] —
/// two `Production`s are equal only when built from the literal same
/// element instances.
#[derive(Clone)]
pub struct Production {
  pub lhs: Element,
  pub rhs: Vec<Element>,
  /// `true` iff this is a `LHS -> [LHS]` terminal-matching production.
  pub is_terminal: bool,
  /// `true` iff `lhs` itself appears somewhere in `rhs` (the shape
  /// `OneOrMore`/`ZeroOrMore` generate for their repeating case).
  pub is_recursive: bool,
  /// `true` iff `lhs` is a `OneOrMore`/`ZeroOrMore` element, so completed
  /// derivations of it should splice into a flat sibling list rather than
  /// nest.
  pub as_list: bool,
  /// `hash((lhs,) + tuple(rhs))`, computed once here rather than re-walked
  /// on every `HashSet`/`HashMap` lookup — a production is looked up
  /// constantly during grammar compilation and left-corner closure, so
  /// this is worth caching even though each `Element`'s own hash is just a
  /// pointer cast.
  hash_cache: u64,
}

impl Production {
  pub(crate) fn new(lhs: Element, rhs: Vec<Element>) -> Production {
    let is_terminal = lhs.is_terminal() && rhs.len() == 1 && rhs[0] == lhs;
    let is_recursive = rhs.iter().any(|r| *r == lhs);
    let as_list = lhs.as_list();
    let mut hasher = DefaultHasher::new();
    lhs.hash(&mut hasher);
    rhs.hash(&mut hasher);
    let hash_cache = hasher.finish();
    Production { lhs, rhs, is_terminal, is_recursive, as_list, hash_cache }
  }
}

impl PartialEq for Production {
  fn eq(&self, other: &Self) -> bool {
    self.lhs == other.lhs && self.rhs == other.rhs
  }
}

impl Eq for Production {}

impl Hash for Production {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_u64(self.hash_cache);
  }
}

impl fmt::Debug for Production {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self)
  }
}

impl fmt::Display for Production {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rhs = self.rhs.iter().map(|e| e.name()).collect::<Vec<_>>().join(" ");
    write!(f, "{} -> {}", self.lhs.name(), rhs)
  }
}

/// Accumulates host-code variable bindings while a grammar is being
/// constructed, then compiles them into a [`Grammar`]. This is the
/// Rust-idiomatic stand-in for a hand-written grammar's reflection over
/// its own field names: since Rust has no runtime access to the names of
/// the `let` bindings holding each [`Element`], the grammar author
/// registers each one explicitly via [`GrammarBuilder::bind`].
#[derive(Default)]
pub struct GrammarBuilder {
  bindings: Vec<(String, Element)>,
}

impl GrammarBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `element` under `name` and returns it unchanged, so a call
  /// site can wrap a `let` binding: `let color = b.bind("color", ...);`.
  /// An element that already carries an explicit [`Element::set_name`] or
  /// an earlier binding keeps that name — first binding wins, matching the
  /// distilled grammar's "first assignment sticks" naming pass.
  pub fn bind(&mut self, name: &str, element: Element) -> Element {
    self.bindings.push((name.to_string(), element.clone()));
    element
  }

  pub fn compile(self, goal: Element) -> Result<Grammar, GrammarError> {
    Grammar::compile(goal, self.bindings)
  }
}

/// A compiled, ready-to-parse grammar: a goal symbol, the flattened
/// production set reachable from it, and the indices the chart engine's
/// rules consult at each step.
pub struct Grammar {
  goal: Element,
  productions: Vec<Production>,
  by_lhs: HashMap<Element, Vec<Production>>,
  terminals: HashSet<Element>,
  nonterminals: HashSet<Element>,
  lc_words: HashMap<Element, HashSet<Element>>,
  lc_cats: HashMap<Element, HashSet<Element>>,
  lc_terminal_productions: HashMap<Production, HashSet<Production>>,
  lc_category_productions: HashMap<Production, HashSet<Production>>,
}

impl Grammar {
  pub fn goal(&self) -> &Element {
    &self.goal
  }

  pub fn productions(&self) -> &[Production] {
    &self.productions
  }

  pub fn productions_for(&self, lhs: &Element) -> &[Production] {
    self.by_lhs.get(lhs).map(|v| v.as_slice()).unwrap_or(&[])
  }

  pub fn is_terminal(&self, e: &Element) -> bool {
    self.terminals.contains(e)
  }

  pub fn is_nonterminal(&self, e: &Element) -> bool {
    self.nonterminals.contains(e)
  }

  pub fn terminals(&self) -> &HashSet<Element> {
    &self.terminals
  }

  pub fn nonterminals(&self) -> &HashSet<Element> {
    &self.nonterminals
  }

  pub fn left_corner_words(&self, nt: &Element) -> Option<&HashSet<Element>> {
    self.lc_words.get(nt)
  }

  pub fn left_corner_cats(&self, nt: &Element) -> Option<&HashSet<Element>> {
    self.lc_cats.get(nt)
  }

  /// Whether `word_terminal` can begin some derivation of `nt` by always
  /// expanding the leftmost child (the left-corner relation the
  /// left-corner strategy's predict/scan rule consults).
  pub fn is_left_corner_word(&self, nt: &Element, word_terminal: &Element) -> bool {
    self.lc_words.get(nt).map(|s| s.contains(word_terminal)).unwrap_or(false)
  }

  pub fn is_left_corner_cat(&self, nt: &Element, cat: &Element) -> bool {
    self.lc_cats.get(nt).map(|s| s.contains(cat)).unwrap_or(false)
  }

  /// The terminal productions reachable from `production` by repeatedly
  /// expanding its leftmost RHS symbol — what the left-corner strategy's
  /// predict/scan rule scans the lookahead token against before committing
  /// to `production` as a hypothesis.
  pub fn left_corner_terminal_productions(&self, production: &Production) -> Option<&HashSet<Production>> {
    self.lc_terminal_productions.get(production)
  }

  /// Every production (including `production` itself) sitting on the
  /// leftmost-symbol chain between `production` and the terminals
  /// `left_corner_terminal_productions` finds — the whole chain the
  /// left-corner rule predicts at once so `Complete` has something to climb
  /// back up once the terminal at the bottom of the chain is scanned.
  pub fn left_corner_category_productions(&self, production: &Production) -> Option<&HashSet<Production>> {
    self.lc_category_productions.get(production)
  }

  fn compile(goal: Element, bindings: Vec<(String, Element)>) -> Result<Grammar, GrammarError> {
    for (name, element) in &bindings {
      if name == "Null" {
        return Err(GrammarError::ReservedName(name.clone()));
      }
      if !element.has_explicit_or_variable_name() {
        element.set_variable_name(name.clone());
      }
    }

    let mut visited: HashSet<Element> = HashSet::new();
    let mut order: Vec<Element> = Vec::new();
    collect_reachable(&goal, &mut visited, &mut order);

    let streamlined: Vec<Element> = order.iter().map(|e| e.streamline()).collect();

    // `streamline` mints a new identity for any `And`/`Or` that actually
    // merges a nested same-kind child into itself, but every RHS reference
    // anywhere in the grammar (including `goal` itself) was collected from
    // the original, pre-streamline tree. This map carries every production's
    // LHS/RHS symbols over to their streamlined identity so a renamed node
    // stays reachable from its parents.
    let identities: HashMap<Element, Element> = order.iter().cloned().zip(streamlined.iter().cloned()).collect();
    let remap = |e: &Element| identities.get(e).cloned().unwrap_or_else(|| e.clone());

    let goal = streamlined.first().cloned().unwrap_or(goal);

    let mut seen_productions: HashSet<Production> = HashSet::new();
    let mut productions: Vec<Production> = Vec::new();
    for element in &streamlined {
      for production in element.yield_productions() {
        let production = Production::new(remap(&production.lhs), production.rhs.iter().map(|r| remap(r)).collect());
        if seen_productions.insert(production.clone()) {
          productions.push(production);
        }
      }
    }

    if productions.is_empty() {
      return Err(GrammarError::MissingGoal);
    }

    // Nullable elimination (spec.md's "one-level" pass, matching the
    // distilled grammar's single, non-recursive `_eliminate_null_and_expand`):
    // find every LHS whose only derivation is the empty `[NULL]` RHS, drop
    // those null-only productions and any leftover `X -> [X]` identity
    // production outright, then for every remaining production generate one
    // copy per non-empty subset of its nullable RHS positions with that
    // subset deleted. A production needing a second, simultaneous round of
    // elimination (deleting a symbol that only becomes nullable once this
    // pass's output is considered) keeps its nullable symbols — deliberately
    // not re-applied to its own output, the distilled grammar's documented
    // limitation.
    let null_productions: HashSet<Production> = productions
      .iter()
      .filter(|p| p.rhs.len() == 1 && p.rhs[0].is_null())
      .cloned()
      .collect();
    productions.retain(|p| !null_productions.contains(p));
    seen_productions.retain(|p| !null_productions.contains(p));

    let null_elements: HashSet<Element> = null_productions.iter().map(|p| p.lhs.clone()).collect();

    productions.retain(|p| !(p.rhs.len() == 1 && !p.is_terminal && p.rhs[0] == p.lhs));

    let mut expansions: Vec<Production> = Vec::new();
    for p in &productions {
      let nullable_positions: Vec<usize> =
        p.rhs.iter().enumerate().filter(|(_, sym)| null_elements.contains(sym)).map(|(i, _)| i).collect();
      for subset in powerset_nonempty(&nullable_positions) {
        let new_rhs: Vec<Element> = p
          .rhs
          .iter()
          .enumerate()
          .filter(|(i, _)| !subset.contains(i))
          .map(|(_, sym)| sym.clone())
          .collect();
        if new_rhs.is_empty() {
          let candidate = Production::new(p.lhs.clone(), vec![Element::null()]);
          if !null_productions.contains(&candidate) {
            expansions.push(candidate);
          }
        } else {
          expansions.push(Production::new(p.lhs.clone(), new_rhs));
        }
      }
    }
    for p in expansions {
      if seen_productions.insert(p.clone()) {
        productions.push(p);
      }
    }

    // A sentinel terminal production for NULL itself: never reachable from
    // the goal via `Element::children` (`Optional`/`ZeroOrMore` never list
    // their implicit `Null` branch as a child), so it has to be inserted by
    // hand, exactly once per grammar.
    let null_sentinel = Production::new(Element::null(), vec![Element::null()]);
    if seen_productions.insert(null_sentinel.clone()) {
      productions.push(null_sentinel);
    }

    let mut by_lhs: HashMap<Element, Vec<Production>> = HashMap::new();
    let mut terminals: HashSet<Element> = HashSet::new();
    let mut nonterminals: HashSet<Element> = HashSet::new();
    for p in &productions {
      by_lhs.entry(p.lhs.clone()).or_default().push(p.clone());
      if p.is_terminal {
        terminals.insert(p.lhs.clone());
      } else {
        nonterminals.insert(p.lhs.clone());
      }
    }

    // Left-corner closure, per production rather than per symbol: each
    // production seeds its own chain of leftmost-symbol expansions down to
    // the terminals that could start it, recording every intermediate
    // production along the way so the left-corner strategy's rule can
    // predict a whole chain at once the moment the lookahead token matches
    // its bottom. Guards against revisiting a production already on the
    // current chain, a minor, deliberate divergence from the distilled
    // grammar's unguarded recursion — one that only matters for grammars
    // with genuine left recursion outside `OneOrMore`/`ZeroOrMore`'s own
    // (right-recursive) shape, which would otherwise recurse forever here.
    let mut lc_terminal_productions: HashMap<Production, HashSet<Production>> = HashMap::new();
    let mut lc_category_productions: HashMap<Production, HashSet<Production>> = HashMap::new();
    let terminal_production_for: HashMap<Element, Production> =
      productions.iter().filter(|p| p.is_terminal).map(|p| (p.lhs.clone(), p.clone())).collect();

    fn add_to_left_corner(
      seed: &Production,
      from: &Production,
      by_lhs: &HashMap<Element, Vec<Production>>,
      terminal_production_for: &HashMap<Element, Production>,
      lc_terminal_productions: &mut HashMap<Production, HashSet<Production>>,
      lc_category_productions: &mut HashMap<Production, HashSet<Production>>,
    ) {
      let Some(rhs0) = from.rhs.first() else { return };
      if rhs0.is_null() {
        return;
      }
      if let Some(terminal_production) = terminal_production_for.get(rhs0) {
        lc_terminal_productions.entry(seed.clone()).or_default().insert(terminal_production.clone());
      } else if let Some(expansions) = by_lhs.get(rhs0) {
        for next in expansions.clone() {
          if lc_category_productions.entry(seed.clone()).or_default().insert(next.clone()) {
            add_to_left_corner(seed, &next, by_lhs, terminal_production_for, lc_terminal_productions, lc_category_productions);
          }
        }
      }
    }

    for p in &productions {
      lc_terminal_productions.entry(p.clone()).or_default();
      lc_category_productions.entry(p.clone()).or_default().insert(p.clone());
      add_to_left_corner(p, p, &by_lhs, &terminal_production_for, &mut lc_terminal_productions, &mut lc_category_productions);
    }

    let mut lc_words: HashMap<Element, HashSet<Element>> =
      nonterminals.iter().map(|nt| (nt.clone(), HashSet::new())).collect();
    let mut lc_cats: HashMap<Element, HashSet<Element>> =
      nonterminals.iter().map(|nt| (nt.clone(), HashSet::new())).collect();
    for p in &productions {
      if p.is_terminal {
        continue;
      }
      let words = lc_words.entry(p.lhs.clone()).or_default();
      for t in lc_terminal_productions.get(p).into_iter().flatten() {
        words.insert(t.lhs.clone());
      }
      let cats = lc_cats.entry(p.lhs.clone()).or_default();
      for c in lc_category_productions.get(p).into_iter().flatten() {
        if c.lhs != p.lhs {
          cats.insert(c.lhs.clone());
        }
      }
    }

    debug!(
      productions = productions.len(),
      terminals = terminals.len(),
      nonterminals = nonterminals.len(),
      "compiled grammar"
    );

    Ok(Grammar {
      goal,
      productions,
      by_lhs,
      terminals,
      nonterminals,
      lc_words,
      lc_cats,
      lc_terminal_productions,
      lc_category_productions,
    })
  }
}

/// Every non-empty subset of `positions`, as index lists — the RHS
/// positions a nullable-elimination pass deletes together. `positions` is
/// always small (one grammar symbol can only be nullable so many times in
/// one production's RHS), so a bitmask walk is simpler than a recursive
/// combinator.
fn powerset_nonempty(positions: &[usize]) -> Vec<Vec<usize>> {
  let n = positions.len();
  let mut out = Vec::new();
  for mask in 1..(1u32 << n) {
    let subset: Vec<usize> = (0..n).filter(|i| mask & (1 << i) != 0).map(|i| positions[i]).collect();
    out.push(subset);
  }
  out
}

fn collect_reachable(element: &Element, visited: &mut HashSet<Element>, order: &mut Vec<Element>) {
  if !visited.insert(element.clone()) {
    return;
  }
  order.push(element.clone());
  for child in element.children() {
    collect_reachable(&child, visited, order);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn color() -> Element {
    Element::string_set(["red", "green", "blue"]).unwrap()
  }

  #[test]
  fn compiling_without_productions_is_missing_goal() {
    let goal = Element::null();
    let err = GrammarBuilder::new().compile(goal).unwrap_err();
    assert_eq!(err, GrammarError::MissingGoal);
  }

  #[test]
  fn simple_and_grammar_compiles() {
    let mut b = GrammarBuilder::new();
    let verb = b.bind("verb", Element::string_set(["turn"]).unwrap());
    let color = b.bind("color", color());
    let goal = b.bind("goal", verb + color);
    let grammar = b.compile(goal).unwrap();
    assert!(grammar.is_nonterminal(grammar.goal()));
    assert!(!grammar.productions().is_empty());
  }

  #[test]
  fn optional_element_is_nullable_and_expands_host_production() {
    let mut b = GrammarBuilder::new();
    let please = b.bind("please", Element::string("please").unwrap().optional());
    let verb = b.bind("verb", Element::string("stop").unwrap());
    let goal = b.bind("goal", verb + please);
    let grammar = b.compile(goal).unwrap();
    let goal_prods: Vec<&Production> = grammar.productions().iter().filter(|p| p.lhs == *grammar.goal()).collect();
    assert!(goal_prods.iter().any(|p| p.rhs.len() == 1));
  }

  #[test]
  fn left_corner_closure_includes_terminal_leaves() {
    let mut b = GrammarBuilder::new();
    let num = b.bind("num", Element::regex(r"\d+", true).unwrap());
    let goal = b.bind("goal", num);
    let grammar = b.compile(goal).unwrap();
    assert!(grammar.left_corner_words(grammar.goal()).is_some());
  }

  #[test]
  fn or_grammar_yields_one_production_per_alternative() {
    let mut b = GrammarBuilder::new();
    let red = Element::string("red").unwrap();
    let blue = Element::string("blue").unwrap();
    let goal = b.bind("goal", red | blue);
    let grammar = b.compile(goal.clone()).unwrap();
    assert_eq!(grammar.productions_for(&goal).len(), 2);
  }
}
