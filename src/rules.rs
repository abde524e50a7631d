//! The seven chart rules and the three [`ParsingStrategy`] assemblies built
//! from them. Every strategy shares one [`Complete`] rule; what differs is
//! how each seeds the chart (init rules, applied once per token position)
//! and how each grows an edge once it's on the agenda (edge rules, applied
//! once per popped edge). Rule signatures and the `progressed` bool they
//! return mirror the distilled grammar's `ChartRule.apply`, which every
//! rule implements even though most always return `False`.

use crate::chart::{Agenda, IncrementalChart};
use crate::chart::Edge;
use crate::grammar::{Grammar, Production};

/// Seeds the chart at a token position with no existing edge to react to —
/// `TopDownInit` at position 0 (and, every position, to repopulate the
/// agenda from the chart's own frontier), `BottomUpScan` at every position
/// with a token.
pub trait InitRule {
  fn apply(&self, grammar: &Grammar, chart: &mut IncrementalChart, agenda: &mut Agenda, position: usize, token: Option<&str>) -> bool;
}

/// Reacts to one edge popped off the agenda, proposing zero or more new
/// edges. `position` is the token position currently being processed (the
/// boundary the active phrase starts at), needed by the top-down rules to
/// only react to edges sitting exactly at that frontier.
pub trait EdgeRule {
  fn apply(&self, grammar: &Grammar, chart: &mut IncrementalChart, agenda: &mut Agenda, edge: &Edge, position: usize, lookahead: Option<&str>) -> bool;
}

/// Records `edge` in the chart — deriving its backpointer tuple from
/// `prev`'s current tuples extended by `child`, per [`IncrementalChart::add_edge`]
/// — and schedules it for further rule application only if it's genuinely
/// new. An edge seen before with a fresh derivation still gets that
/// derivation recorded, but isn't re-processed, since re-processing would
/// re-derive everything reachable from it all over again.
fn propose(chart: &mut IncrementalChart, agenda: &mut Agenda, edge: Edge, prev: Option<&Edge>, child: Option<Edge>) -> bool {
  let is_new = chart.add_edge(edge.clone(), prev, child);
  if is_new {
    agenda.push(edge);
  }
  is_new
}

/// Predicts production `p` at position `k`, and — since a `Null`-only RHS
/// never gets scanned from input — immediately completes it as a
/// zero-width edge too. This is the engine's one concession to nullable
/// productions: everywhere else a completed edge comes from consuming a
/// token or merging two existing edges. Both the prediction and the
/// immediate completion get no backpointer entry (no `prev`/`child`),
/// exactly like a terminal scan, so tree extraction treats them as leaves.
fn propose_prediction(chart: &mut IncrementalChart, agenda: &mut Agenda, p: &Production, k: usize) {
  propose(chart, agenda, Edge::new(k, k, p.clone(), 0), None, None);
  if p.rhs.len() == 1 && p.rhs[0].is_null() {
    propose(chart, agenda, Edge::new(k, k, p.clone(), 1), None, None);
  }
}

/// At position 0, seeds one empty (`dot == 0`) edge per production of the
/// grammar's goal symbol — top-down parsing's starting hypothesis that the
/// input is a goal. Degenerate grammars with no goal productions fall back
/// to seeding every production in the grammar. At every position (this one
/// included), if the agenda ends up empty, it's repopulated from the edges
/// already sitting at the current frontier so prediction/scan can continue
/// across token boundaries — without this, only the very first token would
/// ever get scanned under the top-down strategy.
pub struct TopDownInit;

impl InitRule for TopDownInit {
  fn apply(&self, grammar: &Grammar, chart: &mut IncrementalChart, agenda: &mut Agenda, position: usize, _token: Option<&str>) -> bool {
    if position == 0 {
      let goal_productions = grammar.productions_for(grammar.goal());
      if !goal_productions.is_empty() {
        for p in goal_productions {
          propose(chart, agenda, Edge::new(0, 0, p.clone(), 0), None, None);
        }
      } else {
        for p in grammar.productions() {
          propose(chart, agenda, Edge::new(0, 0, p.clone(), 0), None, None);
        }
      }
    }
    if agenda.is_empty() {
      let refill: Vec<Edge> = chart.edges_ending_at(position).cloned().collect();
      for e in refill {
        agenda.push(e);
      }
    }
    false
  }
}

/// At every token position, scans the token directly against every
/// terminal production in the grammar, with no goal-directed hypothesis
/// required first — bottom-up parsing's starting point.
pub struct BottomUpScan;

impl InitRule for BottomUpScan {
  fn apply(&self, grammar: &Grammar, chart: &mut IncrementalChart, agenda: &mut Agenda, position: usize, token: Option<&str>) -> bool {
    let Some(tok) = token else { return false };
    let mut matched = false;
    for p in grammar.productions().iter().filter(|p| p.is_terminal) {
      if p.lhs.parse(tok) {
        matched = true;
        let edge = Edge::new(position, position + 1, p.clone(), 1);
        propose(chart, agenda, edge, None, None);
      }
    }
    matched
  }
}

/// For an active edge waiting on a nonterminal and sitting exactly at the
/// current frontier, hypothesizes every production of that nonterminal,
/// unconditionally — pure top-down expansion with no lookahead filtering.
pub struct TopDownPredict;

impl EdgeRule for TopDownPredict {
  fn apply(&self, grammar: &Grammar, chart: &mut IncrementalChart, agenda: &mut Agenda, edge: &Edge, position: usize, _lookahead: Option<&str>) -> bool {
    if edge.is_complete() || edge.end != position {
      return false;
    }
    let Some(sym) = edge.next_symbol() else { return false };
    if !grammar.is_nonterminal(sym) {
      return false;
    }
    for p in grammar.productions_for(sym) {
      propose_prediction(chart, agenda, p, edge.end);
    }
    false
  }
}

/// For an active edge waiting on a terminal and sitting exactly at the
/// current frontier, scans the current lookahead token against it
/// directly, producing a completed one-symbol (leaf) edge for [`Complete`]
/// to merge in.
pub struct TopDownScan;

impl EdgeRule for TopDownScan {
  fn apply(&self, grammar: &Grammar, chart: &mut IncrementalChart, agenda: &mut Agenda, edge: &Edge, position: usize, lookahead: Option<&str>) -> bool {
    if edge.is_complete() || edge.end != position {
      return false;
    }
    let Some(sym) = edge.next_symbol() else { return false };
    if !grammar.is_terminal(sym) {
      return false;
    }
    let Some(tok) = lookahead else { return false };
    if !sym.parse(tok) {
      return false;
    }
    for p in grammar.productions_for(sym) {
      let scanned = Edge::new(edge.end, edge.end + 1, p.clone(), 1);
      propose(chart, agenda, scanned, None, None);
    }
    true
  }
}

/// For a newly completed edge, hypothesizes every production that could
/// have this edge's category as its leftmost symbol, seeded at the
/// completed edge's own start — pure bottom-up expansion, the mirror image
/// of `TopDownPredict`.
pub struct BottomUpPredict;

impl EdgeRule for BottomUpPredict {
  fn apply(&self, grammar: &Grammar, chart: &mut IncrementalChart, agenda: &mut Agenda, edge: &Edge, _position: usize, _lookahead: Option<&str>) -> bool {
    if !edge.is_complete() {
      return false;
    }
    let lhs = &edge.production.lhs;
    for p in grammar.productions().iter().filter(|p| p.rhs.first() == Some(lhs)) {
      propose(chart, agenda, Edge::new(edge.start, edge.start, p.clone(), 0), None, None);
    }
    false
  }
}

/// For an active edge waiting on a nonterminal, predicts only the
/// productions of that nonterminal whose leftmost symbol could plausibly
/// consume the current lookahead token — using the grammar's precomputed
/// left-corner closure to prune hypotheses the top-down strategy would
/// otherwise propose and immediately dead-end. When a production's own
/// leftmost symbol is that terminal, also scans it immediately, folding
/// what would otherwise be a separate scan step into the same prediction.
pub struct LeftCornerPredictScan;

impl EdgeRule for LeftCornerPredictScan {
  fn apply(&self, grammar: &Grammar, chart: &mut IncrementalChart, agenda: &mut Agenda, edge: &Edge, _position: usize, lookahead: Option<&str>) -> bool {
    if edge.is_complete() {
      return false;
    }
    let Some(sym) = edge.next_symbol() else { return false };
    let Some(tok) = lookahead else { return false };
    let mut matched = false;
    // `productions_for(sym)` already gives the right candidate set whether
    // `sym` is terminal (the single `sym -> sym` production) or nonterminal
    // (every alternative) — no separate branch needed.
    for p in grammar.productions_for(sym) {
      let Some(terminal_productions) = grammar.left_corner_terminal_productions(p) else { continue };
      for terminal_production in terminal_productions {
        if !terminal_production.lhs.parse(tok) {
          continue;
        }
        matched = true;
        let scanned = Edge::new(edge.end, edge.end + 1, terminal_production.clone(), 1);
        propose(chart, agenda, scanned, None, None);
        if p.is_terminal {
          continue;
        }
        // Predict every production on the left-corner chain between `p`
        // and this terminal at once, so `Complete` has an active edge to
        // climb back up through at each link once the terminal below it is
        // scanned.
        let Some(categories) = grammar.left_corner_category_productions(p) else { continue };
        for category in categories {
          let reaches_terminal = grammar
            .left_corner_terminal_productions(category)
            .map(|ts| ts.contains(terminal_production))
            .unwrap_or(false);
          if reaches_terminal {
            propose(chart, agenda, Edge::new(edge.end, edge.end, category.clone(), 0), None, None);
          }
        }
      }
    }
    matched
  }
}

/// The merge rule every strategy shares: when a completed edge arrives,
/// advance every active edge ending where it begins; when an active edge
/// arrives, advance it past every already-completed edge for the symbol
/// it's waiting on. Applying both directions means the rule doesn't care
/// which of the two edges the agenda happens to deliver first. Skips a
/// merge that would leave the forwarded edge identical to the edge that
/// triggered it, the self-merge a recursive production's own completed
/// child would otherwise produce forever.
pub struct Complete;

impl EdgeRule for Complete {
  fn apply(&self, _grammar: &Grammar, chart: &mut IncrementalChart, agenda: &mut Agenda, edge: &Edge, _position: usize, _lookahead: Option<&str>) -> bool {
    if edge.is_complete() {
      let lhs = edge.production.lhs.clone();
      let waiting: Vec<Edge> = chart
        .edges_ending_at(edge.start)
        .filter(|w| !w.is_complete() && w.next_symbol() == Some(&lhs))
        .cloned()
        .collect();
      for w in waiting {
        let advanced = w.merge_and_forward(edge.end);
        if *edge != advanced {
          propose(chart, agenda, advanced, Some(&w), Some(edge.clone()));
        }
      }
    } else {
      let Some(sym) = edge.next_symbol().cloned() else { return false };
      let matches: Vec<Edge> = chart
        .edges_starting_at(edge.end)
        .filter(|m| m.is_complete() && m.production.lhs == sym)
        .cloned()
        .collect();
      for m in matches {
        let advanced = edge.merge_and_forward(m.end);
        if *edge != advanced {
          propose(chart, agenda, advanced, Some(edge), Some(m));
        }
      }
    }
    false
  }
}

/// One of the three ways to schedule the seven rules above: which init
/// rules seed a token position, and which edge rules fire on each popped
/// edge. Every strategy ends its edge rules with [`Complete`].
pub struct ParsingStrategy {
  pub name: &'static str,
  pub init_rules: Vec<Box<dyn InitRule>>,
  pub edge_rules: Vec<Box<dyn EdgeRule>>,
}

impl ParsingStrategy {
  pub fn top_down() -> ParsingStrategy {
    ParsingStrategy {
      name: "top-down",
      init_rules: vec![Box::new(TopDownInit)],
      edge_rules: vec![Box::new(TopDownPredict), Box::new(TopDownScan), Box::new(Complete)],
    }
  }

  pub fn bottom_up() -> ParsingStrategy {
    ParsingStrategy {
      name: "bottom-up",
      init_rules: vec![Box::new(BottomUpScan)],
      edge_rules: vec![Box::new(BottomUpPredict), Box::new(Complete)],
    }
  }

  pub fn left_corner() -> ParsingStrategy {
    ParsingStrategy {
      name: "left-corner",
      init_rules: vec![Box::new(TopDownInit)],
      edge_rules: vec![Box::new(LeftCornerPredictScan), Box::new(Complete)],
    }
  }
}
