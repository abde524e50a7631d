//! The robust driver (spec.md §4.5): an adaptive tokenizer and scheduler
//! that runs a [`ParsingStrategy`] over a chart, retrying longer phrases on
//! stall and skipping tokens the grammar doesn't recognize. Mirrors the
//! distilled grammar's `RobustParser`, down to the chart-reuse bookkeeping
//! in `_parse_multi_token`.

use tracing::{debug, trace};

use crate::chart::{Agenda, IncrementalChart};
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::result::ParseResult;
use crate::rules::ParsingStrategy;
use crate::tree::{self, TreeNode};
use crate::util::strip_whitespace;

/// `IncrementalChart`'s growth step, matching the distilled grammar's
/// `IncrementalChart(init_size=10, inc_size=10)` default closely enough to
/// avoid the first few tokens of a typical command triggering a resize.
const INC_SIZE: usize = 16;

/// Runs every init rule once, then drains the agenda through every edge
/// rule, for a single candidate phrase at `position` — spec.md's
/// `parse_single_token`. Returns whether any rule recognized `phrase`.
fn parse_single_token(
  strategy: &ParsingStrategy,
  grammar: &Grammar,
  chart: &mut IncrementalChart,
  agenda: &mut Agenda,
  position: usize,
  phrase: Option<&str>,
) -> bool {
  let mut progressed = false;
  for rule in &strategy.init_rules {
    progressed |= rule.apply(grammar, chart, agenda, position, phrase);
  }
  while let Some(edge) = agenda.pop() {
    for rule in &strategy.edge_rules {
      progressed |= rule.apply(grammar, chart, agenda, &edge, position, phrase);
    }
  }
  progressed
}

/// A chart-backed parser bound to one compiled grammar and parsing
/// strategy. Owns the chart, the pending-token buffer, and the accepted-
/// token list for one logical parse session — per spec.md §5, never
/// shared across concurrent parses, though the `&Grammar` it borrows may
/// be shared read-only across as many parsers as callers want.
pub struct RobustParser<'g> {
  grammar: &'g Grammar,
  strategy: ParsingStrategy,
  chart: Option<IncrementalChart<'g>>,
  /// The chart position boundary at which prediction/scan last ran —
  /// `chart_i` in the distilled grammar. Kept across [`RobustParser::parse_multi_token`]
  /// calls so an incremental session resumes at the same frontier rather
  /// than skipping a slot.
  frontier: usize,
  pending: Vec<String>,
  accepted_tokens: Vec<String>,
}

impl<'g> RobustParser<'g> {
  pub fn new(grammar: &'g Grammar, strategy: ParsingStrategy) -> RobustParser<'g> {
    RobustParser {
      grammar,
      strategy,
      chart: None,
      frontier: 0,
      pending: Vec::new(),
      accepted_tokens: Vec::new(),
    }
  }

  pub fn grammar(&self) -> &'g Grammar {
    self.grammar
  }

  pub fn chart(&self) -> Option<&IncrementalChart<'g>> {
    self.chart.as_ref()
  }

  pub fn accepted_tokens(&self) -> &[String] {
    &self.accepted_tokens
  }

  /// Drops all incremental-session state. Used between unrelated sentences
  /// when a parser is reused, e.g. in a long-running server.
  pub fn clear_cache(&mut self) {
    self.pending.clear();
    self.accepted_tokens.clear();
    self.chart = None;
    self.frontier = 0;
  }

  /// One phrase-at-a-time scheduling pass over `tokens`: grows the active
  /// phrase on stall, advances past it on progress, reusing `self.chart`
  /// across calls within one session (spec.md's `parse_multi_token`).
  /// Returns the phrases newly recognized as single terminal matches.
  fn parse_multi_token(&mut self, tokens: &[String]) -> Vec<String> {
    let length = tokens.len();
    if length == 0 {
      return Vec::new();
    }
    if self.chart.is_none() {
      self.chart = Some(IncrementalChart::new(self.grammar, INC_SIZE));
      self.frontier = 0;
    } else {
      // Continue from where we left off: re-examine the previous frontier
      // so prediction/scan can react to the next phrase there, exactly
      // like resetting `chart.chart_i = chart.size - 1` before the loop's
      // first iteration re-increments it back.
      self.frontier = self.frontier.saturating_sub(1);
    }
    let chart = self.chart.as_mut().expect("chart just initialized above");

    let mut agenda = Agenda::new();
    let mut new_tokens = Vec::new();
    let mut progressed = false;
    let mut phrase_start = 0usize;
    let mut phrase_end = 0usize;
    while phrase_end < length {
      if progressed || phrase_end == 0 {
        self.frontier += 1;
        phrase_start = phrase_end;
        phrase_end += 1;
      } else {
        // Stalled on a one-word phrase at this frontier: try a longer one
        // instead of giving up on the position.
        phrase_end += 1;
      }
      let phrase = tokens[phrase_start..phrase_end].join(" ");
      progressed = parse_single_token(
        &self.strategy,
        self.grammar,
        chart,
        &mut agenda,
        self.frontier - 1,
        Some(&phrase),
      );
      if progressed {
        new_tokens.push(phrase);
      }
    }
    debug!(agenda_total = agenda.total(), "parse_multi_token finished");
    new_tokens
  }

  /// Parses a whole sentence from scratch (spec.md's `parse_robust`):
  /// whitespace-normalizes, then repeatedly retries the pending suffix,
  /// dropping the first pending token when nothing at all parses and
  /// otherwise accumulating what did parse and skipping past the token
  /// where progress stalled. Populates `self.chart`/`accepted_tokens` for
  /// [`RobustParser::parse`] or direct inspection to read back.
  pub fn parse_to_chart(&mut self, sentence: &str) -> Result<(), ParseError> {
    self.chart = None;
    self.frontier = 0;
    self.accepted_tokens.clear();

    let normalized = strip_whitespace(sentence);
    if normalized.is_empty() {
      return Err(ParseError::EmptyInput);
    }
    let mut to_be_parsed: Vec<String> = normalized.split(' ').map(String::from).collect();

    while !to_be_parsed.is_empty() {
      let parsed = self.parse_multi_token(&to_be_parsed);
      let consumed_words: usize = parsed.iter().map(|t| t.split(' ').count()).sum();
      if consumed_words == 0 {
        to_be_parsed.remove(0);
      } else if consumed_words == to_be_parsed.len() {
        self.accepted_tokens.extend(parsed);
        break;
      } else {
        self.accepted_tokens.extend(parsed);
        to_be_parsed = to_be_parsed.split_off(consumed_words + 1);
      }
    }

    if let Some(chart) = &self.chart {
      trace!(chart = %chart, backpointers = %chart.print_backpointers(), "parse_to_chart finished");
    }
    Ok(())
  }

  fn trees(&self, only_goal: bool) -> Vec<(usize, TreeNode)> {
    let Some(chart) = self.chart.as_ref() else {
      return Vec::new();
    };
    let goal = if only_goal { Some(self.grammar.goal()) } else { None };
    tree::trees(chart, &self.accepted_tokens, false, goal)
  }

  /// Parses `text` in one shot and returns the best (smallest) derivation
  /// tree and its folded result, per spec.md §4.8.
  pub fn parse(&mut self, text: &str) -> Result<(TreeNode, ParseResult), ParseError> {
    self.parse_to_chart(text)?;
    tree::best_tree_with_result(self.trees(true))
  }

  /// Incremental, token-at-a-time parsing (spec.md's `incremental_parse`):
  /// appends `token` to the pending buffer, retries the longest possible
  /// suffix-joined phrase until progress or exhaustion, clears the pending
  /// buffer on progress, then attempts most-compact tree extraction.
  /// `is_final` clears all session state afterward regardless of outcome,
  /// returning `None` when no tree covers the accepted tokens.
  pub fn incremental_parse(
    &mut self,
    token: &str,
    is_final: bool,
    only_goal: bool,
  ) -> Option<(TreeNode, ParseResult)> {
    self.pending.push(token.to_string());

    let mut progress = 0usize;
    let mut parsed_tokens = Vec::new();
    while progress < self.pending.len() && parsed_tokens.is_empty() {
      let suffix = vec![self.pending[progress..].join(" ")];
      parsed_tokens = self.parse_multi_token(&suffix);
      if !parsed_tokens.is_empty() {
        self.pending.clear();
      }
      progress += 1;
    }
    if !parsed_tokens.is_empty() {
      self.accepted_tokens.extend(parsed_tokens);
    }

    let result = tree::best_tree_with_result(self.trees(only_goal)).ok();

    if is_final {
      self.pending.clear();
      self.accepted_tokens.clear();
      self.chart = None;
      self.frontier = 0;
    }
    result
  }
}
