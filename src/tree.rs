//! Tree extraction (spec.md §4.6) and the fold from a [`TreeNode`] into a
//! [`ParseResult`] (§4.7). A tree is read back out of a chart's
//! backpointers rather than built up during parsing — the chart is the
//! only structure the engine mutates while scanning tokens, and a tree is
//! just one way of walking it.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value as Json;

use crate::chart::{Backpointer, Edge, IncrementalChart};
use crate::element::Element;
use crate::error::ParseError;
use crate::result::{ParseResult, ResultValue};
use crate::util::combinations;

/// One node of a derivation: the edge it realizes, its ordered children,
/// and the span of input text it covers (empty for a zero-width nullable
/// completion). Self-recursive productions (`OneOrMore`/`ZeroOrMore`) have
/// their same-LHS child spliced into a flat sibling list at construction
/// time, so a three-deep right-recursive chain of `light_name -> light
/// light_name` reads back as one node with three `light` children rather
/// than three nested `light_name` wrappers.
#[derive(Debug, Clone)]
pub struct TreeNode {
  pub edge: Edge,
  pub children: Vec<TreeNode>,
  pub lexicon: String,
}

impl TreeNode {
  pub fn new(edge: Edge, children: Vec<TreeNode>, lexicon: String) -> TreeNode {
    let children = if edge.production.is_recursive {
      let mut spliced = Vec::with_capacity(children.len());
      for child in children {
        if child.edge.production.lhs == edge.production.lhs {
          spliced.extend(child.children);
        } else {
          spliced.push(child);
        }
      }
      spliced
    } else {
      children
    };
    TreeNode { edge, children, lexicon }
  }

  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }

  pub fn name(&self) -> String {
    self.edge.production.lhs.name()
  }

  /// `1 + Σ size(child)` — the tree-size law §8 best-tree selection
  /// minimizes.
  pub fn size(&self) -> usize {
    1 + self.children.iter().map(TreeNode::size).sum::<usize>()
  }

  /// `{name: lexicon}` for a leaf, `{name: [child...]}` otherwise — the
  /// spec's JSON output surface for a raw tree (distinct from the named
  /// record [`TreeNode::to_result`] builds).
  pub fn to_json(&self) -> Json {
    let name = self.name();
    if self.is_leaf() {
      serde_json::json!({ name: self.lexicon })
    } else {
      let children: Vec<Json> = self.children.iter().map(TreeNode::to_json).collect();
      serde_json::json!({ name: children })
    }
  }

  /// Folds this tree, post-order, into a [`ParseResult`] per spec.md §4.7.
  /// Returns `None` when the root itself is ignored or covers no text —
  /// exactly the case a parent drops this subtree as a contributing child.
  pub fn to_result(&self) -> Option<ParseResult> {
    build_result(self).map(|(_, r)| r)
  }

  fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    write!(f, "{:indent$}({}", "", self.name(), indent = indent)?;
    if self.is_leaf() {
      write!(f, " {:?})", self.lexicon)
    } else {
      writeln!(f)?;
      for child in &self.children {
        child.write_indented(f, indent + 2)?;
        writeln!(f)?;
      }
      write!(f, "{:indent$})", "", indent = indent)
    }
  }
}

impl fmt::Display for TreeNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.write_indented(f, 0)
  }
}

/// The fields a child contributes for the name-collision check below. A
/// leaf's record holds nothing but its own `{name: lexicon}` entry, so it
/// contributes exactly its own name; a node with surviving children
/// contributes whatever field names those children already merged into it
/// (its own name was never entered as a key, only its computed main value).
fn contributed_names(is_leaf: bool, name: &str, result: &ParseResult) -> Vec<String> {
  if is_leaf {
    vec![name.to_string()]
  } else {
    let mut names = vec![name.to_string()];
    names.extend(result.names().cloned());
    names
  }
}

fn build_result(node: &TreeNode) -> Option<(String, ParseResult)> {
  let lhs = &node.edge.production.lhs;
  if lhs.ignore_in_result() || node.lexicon.is_empty() {
    return None;
  }
  let name = lhs.name();
  let parent_flat = !lhs.as_list();

  let mut record = ParseResult::new();
  record.set_text(node.lexicon.clone());

  let child_results: Vec<(bool, String, ParseResult)> = node
    .children
    .iter()
    .filter_map(|c| build_result(c).map(|(n, r)| (c.is_leaf(), n, r)))
    .collect();

  if child_results.is_empty() {
    // A true leaf, or a node whose children were all ignored/empty, seeds
    // its own field under its own name so a parent that absorbs it (rather
    // than nesting it) still sees it.
    record.add_item(&name, ResultValue::Text(node.lexicon.clone()));
  } else {
    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for (is_leaf, cname, cresult) in &child_results {
      for field in contributed_names(*is_leaf, cname, cresult) {
        *name_counts.entry(field).or_insert(0) += 1;
      }
    }

    let mut main_values: Vec<ResultValue> = Vec::with_capacity(child_results.len());
    for (is_leaf, cname, cresult) in &child_results {
      let as_flat = parent_flat
        && contributed_names(*is_leaf, cname, cresult).iter().all(|n| name_counts[n] == 1);
      if *is_leaf || as_flat {
        record.absorb(cresult.clone());
      } else {
        record.add_item(cname, ResultValue::Result(cresult.clone()));
      }
      main_values.push(cresult.main_value());
    }

    if main_values.len() == 1 && parent_flat {
      record.set_main_value(main_values.into_iter().next().unwrap());
    } else {
      record.set_main_value(ResultValue::List(main_values));
    }
  }

  lhs.run_callbacks(&mut record);
  Some((name, record))
}

/// A stable sort key for a backpointer tuple — the `(start, end, dot)` of
/// each child edge in order — so "most compact" tie-breaking doesn't
/// depend on `HashSet`'s unspecified iteration order.
fn tuple_key(tuple: &Backpointer) -> Vec<(usize, usize, usize)> {
  tuple.iter().map(|e| (e.start, e.end, e.dot)).collect()
}

fn lexicon_for(tokens: &[String], edge: &Edge) -> String {
  tokens.get(edge.start..edge.end).map(|s| s.join(" ")).unwrap_or_default()
}

/// All-trees mode (§4.6): the full Cartesian product of every backpointer
/// tuple recorded for `edge`, recursively expanded. Exponential in the
/// chart's ambiguity; intended for small grammars or debugging, never the
/// default extraction path.
pub fn all_trees(chart: &IncrementalChart, edge: &Edge, tokens: &[String]) -> Vec<TreeNode> {
  let lexicon = lexicon_for(tokens, edge);
  match chart.backpointers_for(edge) {
    Some(tuples) if !tuples.is_empty() => {
      let mut sorted: Vec<&Backpointer> = tuples.iter().collect();
      sorted.sort_by_key(|t| tuple_key(t));
      let mut out = Vec::new();
      for tuple in sorted {
        let child_trees: Vec<Vec<TreeNode>> =
          tuple.iter().map(|c| all_trees(chart, c, tokens)).collect();
        for combo in combinations(&child_trees) {
          out.push(TreeNode::new(edge.clone(), combo, lexicon.clone()));
        }
      }
      out
    }
    _ => vec![TreeNode::new(edge.clone(), Vec::new(), lexicon)],
  }
}

/// Most-compact mode (§4.6): among backpointer tuples of minimal arity,
/// recursively pick the minimum-size subtrees, breaking ties by smallest
/// summed child size and then by [`tuple_key`] for determinism.
pub fn most_compact_trees(chart: &IncrementalChart, edge: &Edge, tokens: &[String]) -> Vec<TreeNode> {
  let lexicon = lexicon_for(tokens, edge);
  match chart.backpointers_for(edge) {
    Some(tuples) if !tuples.is_empty() => {
      let min_len = tuples.iter().map(|t| t.len()).min().unwrap();
      let mut candidates: Vec<&Backpointer> = tuples.iter().filter(|t| t.len() == min_len).collect();
      candidates.sort_by_key(|t| tuple_key(t));

      let mut best: Option<(usize, Vec<Vec<TreeNode>>)> = None;
      for tuple in candidates {
        let child_trees: Vec<Vec<TreeNode>> =
          tuple.iter().map(|c| most_compact_trees(chart, c, tokens)).collect();
        let total_size: usize = child_trees.iter().map(|ts| ts[0].size()).sum();
        let better = match &best {
          None => true,
          Some((best_size, _)) => total_size < *best_size,
        };
        if better {
          best = Some((total_size, child_trees));
        }
      }

      let (_, child_trees) = best.expect("at least one candidate backpointer tuple");
      combinations(&child_trees)
        .into_iter()
        .map(|combo| TreeNode::new(edge.clone(), combo, lexicon.clone()))
        .collect()
    }
    _ => vec![TreeNode::new(edge.clone(), Vec::new(), lexicon)],
  }
}

/// Every complete root edge spanning all of `tokens`, filtered to `goal`
/// when given, expanded by either [`all_trees`] or [`most_compact_trees`].
/// `tokens` is the accepted-token list (one entry per parsed phrase, not
/// per word) — the same list a [`crate::driver::RobustParser`] hands back
/// from a parse.
pub fn trees<'a>(
  chart: &'a IncrementalChart,
  tokens: &[String],
  all: bool,
  goal: Option<&Element>,
) -> Vec<(usize, TreeNode)> {
  let end = tokens.len();
  let mut out = Vec::new();
  let mut i = 0usize;
  let mut roots: Vec<&Edge> = chart.edges_at(0, end).filter(|e| e.is_complete()).collect();
  roots.sort_by_key(|e| (e.production.lhs.name(), e.start, e.end, e.dot));
  for root in roots {
    if let Some(g) = goal {
      if root.production.lhs != *g {
        continue;
      }
    }
    i += 1;
    if all {
      for t in all_trees(chart, root, tokens) {
        out.push((i, t));
      }
    } else {
      for t in most_compact_trees(chart, root, tokens) {
        out.push((i, t));
      }
    }
  }
  out
}

/// The single minimum-`size` tree across every root, plus its folded
/// result — the final step of [`crate::driver::RobustParser::parse`].
pub fn best_tree_with_result(trees: Vec<(usize, TreeNode)>) -> Result<(TreeNode, ParseResult), ParseError> {
  if trees.is_empty() {
    return Err(ParseError::NoParseTree);
  }
  let mut trees = trees;
  trees.sort_by_key(|(_, t)| t.size());
  let (_, best) = trees.into_iter().next().expect("checked non-empty above");
  let result = best.to_result().unwrap_or_default();
  Ok((best, result))
}
