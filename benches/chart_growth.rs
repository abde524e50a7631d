use criterion::{black_box, criterion_group, criterion_main, Criterion};

use semgram::tree;
use semgram::{Element, Grammar, GrammarBuilder, ParsingStrategy, RobustParser};

/// Builds the `S -> x | S S` shape's ambiguity, unrolled to a fixed span
/// length `n` (the element combinator API has no cyclic self-reference, so
/// the classic two-rule grammar is expressed here as one `Sk` production
/// per span length `1..=n`, each an `Or` over every split of `Sk` into two
/// shorter spans). `Sn` over `n` repeated `x`s then carries exactly the
/// Catalan number of derivations the original shape would.
fn ambiguous_grammar(n: usize) -> (Grammar, Vec<String>) {
  let mut b = GrammarBuilder::new();
  let x = b.bind("x", Element::string("x").unwrap());
  let mut spans = vec![x.clone(), b.bind("S1", x)];
  for k in 2..=n {
    let mut splits = (1..k).map(|i| spans[i].clone() + spans[k - i].clone());
    let first = splits.next().expect("k >= 2 has at least one split");
    let combined = splits.fold(first, |acc, next| acc | next);
    spans.push(b.bind(&format!("S{k}"), combined));
  }
  let goal = spans[n].clone();
  let grammar = b.compile(goal).unwrap();
  let tokens = vec!["x".to_string(); n];
  (grammar, tokens)
}

/// Parses `input` and counts every derivation tree over the grammar's goal.
fn count_all_trees(grammar: &Grammar, input: &str) -> usize {
  let mut parser = RobustParser::new(grammar, ParsingStrategy::left_corner());
  parser.parse_to_chart(input).unwrap();
  let chart = parser.chart().unwrap();
  tree::trees(chart, parser.accepted_tokens(), true, Some(grammar.goal())).len()
}

fn criterion_benchmark(c: &mut Criterion) {
  let (short_grammar, short_tokens) = ambiguous_grammar(4);
  let short_input = short_tokens.join(" ");
  let (long_grammar, long_tokens) = ambiguous_grammar(8);
  let long_input = long_tokens.join(" ");

  c.bench_function("chart growth, 4-way ambiguous span", |b| {
    b.iter(|| count_all_trees(black_box(&short_grammar), black_box(&short_input)))
  });

  c.bench_function("chart growth, 8-way ambiguous span", |b| {
    b.iter(|| count_all_trees(black_box(&long_grammar), black_box(&long_input)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
