//! End-to-end scenarios over the demo grammars in `tests/common`, one per
//! literal example spec.md walks through: numbers, times, single- and
//! multi-clause light commands, token-skipping robustness, and incremental
//! parsing equivalence.

mod common;

use semgram::{ParsingStrategy, ResultValue, RobustParser};

#[test]
fn numbers_phrase_sums_to_expected_total() {
  let g = common::numbers_grammar();
  let mut p = RobustParser::new(&g, ParsingStrategy::left_corner());
  let (_, result) = p.parse("one hundred thousand five hundred sixty one").unwrap();
  assert_eq!(result.main_value(), ResultValue::Number(100_561));
}

#[test]
fn times_phrase_reads_irregular_and_regular_multipliers() {
  let g = common::times_grammar();

  let mut once = RobustParser::new(&g, ParsingStrategy::left_corner());
  let (_, r) = once.parse("once").unwrap();
  assert_eq!(r.main_value(), ResultValue::Number(1));

  let mut five = RobustParser::new(&g, ParsingStrategy::left_corner());
  let (_, r) = five.parse("five times").unwrap();
  assert_eq!(r.main_value(), ResultValue::Number(5));

  let mut million = RobustParser::new(&g, ParsingStrategy::left_corner());
  let (_, r) = million.parse("a million times").unwrap();
  assert_eq!(r.main_value(), ResultValue::Number(1_000_000));
}

#[test]
fn single_clause_light_command_names_its_fields() {
  let g = common::colored_light_grammar();
  let mut p = RobustParser::new(&g, ParsingStrategy::left_corner());
  let (_, result) = p.parse("set my top light to red").unwrap();

  match result.get("one_parse").expect("goal absorbs a single one_parse field") {
    ResultValue::Result(clause) => {
      assert!(matches!(clause.get("light_specific_name"), Some(ResultValue::Text(t)) if t == "top"));
      assert!(matches!(clause.get("color"), Some(ResultValue::Text(t)) if t == "red"));
    }
    other => panic!("expected a single one_parse record, got {other:?}"),
  }
}

#[test]
fn multi_clause_light_command_lists_each_clause() {
  let g = common::colored_light_grammar();
  let mut p = RobustParser::new(&g, ParsingStrategy::left_corner());
  let (_, result) = p.parse("turn off the top light and turn on the bottom light").unwrap();

  match result.get("one_parse").expect("goal absorbs the one_parse field") {
    ResultValue::List(clauses) => {
      assert!(clauses.len() >= 2, "expected at least two clauses, got {clauses:?}");
      let names: Vec<&str> = clauses
        .iter()
        .filter_map(|c| match c {
          ResultValue::Result(r) => match r.get("light_specific_name") {
            Some(ResultValue::Text(t)) => Some(t.as_str()),
            _ => None,
          },
          _ => None,
        })
        .collect();
      assert!(names.contains(&"top"));
      assert!(names.contains(&"bottom"));
    }
    other => panic!("expected a list of one_parse records, got {other:?}"),
  }
}

#[test]
fn robust_driver_skips_filler_and_keeps_multiword_phrase_intact() {
  let g = common::colored_light_grammar();
  let mut p = RobustParser::new(&g, ParsingStrategy::left_corner());
  let (tree, _) = p.parse("I want to turn off the top light please").unwrap();

  assert_eq!(tree.name(), "goal");
  // "turn off" scans as one phrase, not two separate unrecognized words.
  assert!(p.accepted_tokens().contains(&"turn off".to_string()));
  assert!(!p.accepted_tokens().iter().any(|t| t == "I" || t == "want" || t == "please"));
}

#[test]
fn incremental_parse_matches_whole_sentence_parse() {
  let g = common::colored_light_grammar();

  // Single-word tokens throughout (no multi-word literal, no filler to
  // skip) so the incremental per-token buffer and the whole-sentence
  // driver walk the exact same scan sequence.
  let mut whole = RobustParser::new(&g, ParsingStrategy::left_corner());
  let (whole_tree, whole_result) = whole.parse("bright top light").unwrap();

  let mut inc = RobustParser::new(&g, ParsingStrategy::left_corner());
  let words = ["bright", "top", "light"];
  let mut last = None;
  for (i, word) in words.iter().enumerate() {
    last = inc.incremental_parse(word, i == words.len() - 1, true);
  }
  let (inc_tree, inc_result) = last.expect("incremental parse should find a tree by the last token");

  assert_eq!(whole_tree.to_string(), inc_tree.to_string());
  assert_eq!(whole_result.main_value(), inc_result.main_value());
}
