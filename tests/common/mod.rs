//! Test-only demo grammars transliterated from `numbers.py` / `times.py` /
//! `colored_light.py` (see `examples/original_source/parsetron/grammars/`).
//! These are grammar-API clients exercising the engine end-to-end, per
//! spec.md's explicit scoping of example grammars out of `src/` — nothing
//! here is part of the public crate surface.

use std::rc::Rc;

use semgram::element::ResultCallback;
use semgram::{Element, Grammar, GrammarBuilder, ResultValue};

/// Reads a value back as a flat sum: a list sums its elements (each read
/// the same way), anything else is read as a plain integer — mirrors
/// `numbers.py`'s `result_sum`, which falls back to the scalar itself when
/// `r.get()` isn't a list.
fn sum_value(v: &ResultValue) -> i64 {
  match v {
    ResultValue::List(items) => items.iter().map(sum_value).sum(),
    ResultValue::Result(r) => sum_value(&r.main_value()),
    other => other.as_i64().unwrap_or(0),
  }
}

/// Mirrors `numbers.py`'s `result_mul`: a list multiplies its elements,
/// anything else passes through unchanged.
fn mul_value(v: &ResultValue) -> i64 {
  match v {
    ResultValue::List(items) => items.iter().map(sum_value).product(),
    ResultValue::Result(r) => mul_value(&r.main_value()),
    other => other.as_i64().unwrap_or(1),
  }
}

fn result_sum() -> ResultCallback {
  Rc::new(|r| {
    let total = sum_value(&r.main_value());
    r.set(ResultValue::Number(total));
  })
}

fn result_mul() -> ResultCallback {
  Rc::new(|r| {
    let total = mul_value(&r.main_value());
    r.set(ResultValue::Number(total));
  })
}

fn replaced_string(text: &str, value: i64) -> Element {
  Element::string(text).unwrap().replace_result_with(ResultValue::Number(value))
}

/// Builds the numbers sub-grammar (English numerals 0 through the
/// trillions, plus bare digit strings) into `b`, returning the unbound
/// top-level phrase element so callers can bind it under whatever name
/// fits their own grammar (`"goal"` standalone, `"numbers"` when embedded
/// in the times grammar below).
pub fn numbers_phrase(b: &mut GrammarBuilder) -> Element {
  const SINGLE_MAPS: &[(&str, i64)] = &[
    ("zero", 0), ("o", 0), ("oh", 0), ("nada", 0), ("one", 1), ("a", 1),
    ("two", 2), ("three", 3), ("four", 4), ("five", 5), ("six", 6),
    ("seven", 7), ("eight", 8), ("nine", 9), ("ten", 10), ("eleven", 11),
    ("twelve", 12), ("thirteen", 13), ("fourteen", 14), ("forteen", 14),
    ("fifteen", 15), ("sixteen", 16), ("seventeen", 17), ("eighteen", 18),
    ("nineteen", 19),
  ];
  const TEN_MAPS: &[(&str, i64)] = &[
    ("ten", 10), ("twenty", 20), ("thirty", 30), ("forty", 40),
    ("fourty", 40), ("fifty", 50), ("sixty", 60), ("seventy", 70),
    ("eighty", 80), ("ninety", 90),
  ];
  const ZERO_MAPS: &[(&str, i64)] = &[
    ("hundred", 100), ("thousand", 1_000), ("million", 1_000_000),
    ("billion", 1_000_000_000), ("trillion", 1_000_000_000_000),
  ];

  let digits = Element::regex(r"\d+", true)
    .unwrap()
    .set_result_action([Rc::new(|r: &mut semgram::ParseResult| {
      let n: i64 = r.text().and_then(|t| t.parse().ok()).unwrap_or(0);
      r.set(ResultValue::Number(n));
    }) as ResultCallback]);

  let single = Element::or(SINGLE_MAPS.iter().map(|(s, v)| replaced_string(s, *v)).collect());
  let ten = Element::or(TEN_MAPS.iter().map(|(s, v)| replaced_string(s, *v)).collect());

  let double_and = (ten.optional() + single.optional()).set_result_action([result_sum()]);
  let double = b.bind("double", double_and | digits);

  let a_hundred = replaced_string("hundred", 100);
  let zero = Element::or(ZERO_MAPS.iter().map(|(s, v)| replaced_string(s, *v)).collect());
  let zeros = b.bind("zeros", zero.zero_or_more().set_result_action([result_mul()]));

  let hundred_inner = (double.clone() + a_hundred).set_result_action([result_mul()]);
  let hundred_outer = (hundred_inner + double.clone().optional()).set_result_action([result_sum()]);
  let hundred = b.bind("hundred", hundred_outer);

  let unit = b.bind(
    "unit",
    ((double | hundred) + zeros).set_result_action([result_mul()]),
  );

  unit.one_or_more().set_result_action([result_sum()])
}

pub fn numbers_grammar() -> Grammar {
  let mut b = GrammarBuilder::new();
  let phrase = numbers_phrase(&mut b);
  let goal = b.bind("goal", phrase);
  b.compile(goal).unwrap()
}

/// Times grammar (`times.py`): a handful of irregular multiplier words
/// (`once`/`twice`/`thrice`) plus "<number> time(s)", the suffix word
/// ignored so it never surfaces in the result.
pub fn times_grammar() -> Grammar {
  let mut b = GrammarBuilder::new();
  const SPECIAL_MAPS: &[(&str, i64)] = &[("once", 1), ("twice", 2), ("thrice", 3)];
  let special = Element::or(SPECIAL_MAPS.iter().map(|(s, v)| replaced_string(s, *v)).collect());
  let phrase = numbers_phrase(&mut b);
  let numbers = b.bind("numbers", phrase);
  let suffix = Element::string_set(["times", "time"]).unwrap().ignore();
  let goal = b.bind("goal", special | (numbers + suffix));
  b.compile(goal).unwrap()
}

/// A small colored-light command grammar transliterated from
/// `colored_light.py`, trimmed to the handful of colors spec.md's literal
/// scenarios need (the full ~150-entry HTML color table in `colors.py` is
/// peripheral per spec.md §9 and not reproduced here).
pub fn colored_light_grammar() -> Grammar {
  let mut b = GrammarBuilder::new();

  let on = Element::string_set(["turn on", "on", "hit"]).unwrap();
  let off = Element::string_set(["turn off", "off", "kill"]).unwrap();
  let on_off = b.bind("on_off", on | off);

  let general_name = Element::string_set(["lights", "light", "lamp", "bulb", "lightbulb"]).unwrap();
  let specific_name = b.bind(
    "light_specific_name",
    Element::string_set(["top", "bottom", "middle", "kitchen", "bedroom"]).unwrap(),
  );
  let quantifier = Element::string_set(["both", "all"]).unwrap();
  let light_name = b.bind(
    "light_name",
    quantifier.optional() + specific_name.zero_or_more() + general_name.optional(),
  );

  let action = b.bind("action", Element::string_set(["blink", "flash"]).unwrap().optional());

  let brightness_more = Element::string_set(["bright", "brighter", "strong", "stronger"]).unwrap();
  let brightness_less = Element::string_set(["dim", "dimmer", "soft", "softer"]).unwrap();
  let brightness = b.bind("brightness", brightness_more | brightness_less);

  let color = b.bind(
    "color",
    Element::string_set(["red", "green", "blue", "yellow", "purple", "white"]).unwrap(),
  );

  let one_parse = b.bind(
    "one_parse",
    on_off.clone()
      | (light_name.clone() + on_off.clone())
      | (on_off + light_name.clone())
      | (light_name.clone() + color.clone())
      | (light_name.clone() + brightness.clone())
      | (brightness + light_name.clone())
      | light_name,
  );

  let goal = b.bind("goal", action + one_parse.one_or_more());
  b.compile(goal).unwrap()
}
