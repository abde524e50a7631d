//! An interactive REPL over a small built-in demo grammar: read a line,
//! tokenize, parse it with [`RobustParser`], and print the result (and,
//! with `-c`/`--chart`, the chart it was built from).

use std::env;
use std::io;
use std::io::Write;
use std::process;

use semgram::{Element, Grammar, GrammarBuilder, ParsingStrategy, RobustParser};

fn usage(prog_name: &str) -> String {
  format!(
    r"
Usage: {} [options]

Reads sentences from stdin and parses them against a built-in colored-light
demo grammar (turn lights on/off, blink, set brightness or color).

Options:
  -h, --help    Print this message
  -c, --chart   Print the parse chart for each line (defaults to not printing)
  -s, --strategy top-down|bottom-up|left-corner   Parsing strategy to use (default: left-corner)",
    prog_name
  )
}

fn colored_light_grammar() -> Grammar {
  let mut b = GrammarBuilder::new();

  let on = Element::string_set(["turn on", "on", "hit"]).unwrap();
  let off = Element::string_set(["turn off", "off", "kill"]).unwrap();
  let on_off = b.bind("on_off", on | off);

  let general_name = Element::string_set(["lights", "light", "lamp", "bulb", "lightbulb"]).unwrap();
  let specific_name = Element::string_set(["top", "bottom", "middle", "kitchen", "bedroom"]).unwrap();
  let quantifier = Element::string_set(["both", "all"]).unwrap();
  let light_name = b.bind(
    "light_name",
    quantifier.optional() + specific_name.zero_or_more() + general_name.optional(),
  );

  let action_blink = b.bind("action_blink", Element::string_set(["blink", "flash"]).unwrap().optional());

  let brightness_more = Element::string_set(["bright", "brighter", "strong", "stronger"]).unwrap();
  let brightness_less = Element::string_set(["dim", "dimmer", "soft", "softer"]).unwrap();
  let brightness = b.bind("brightness", brightness_more | brightness_less);

  let color = b.bind(
    "color",
    Element::string_set(["red", "green", "blue", "yellow", "purple", "white"]).unwrap(),
  );

  let one_clause = b.bind(
    "one_clause",
    on_off.clone()
      | (light_name.clone() + on_off.clone())
      | (on_off + light_name.clone())
      | (light_name.clone() + color.clone())
      | (light_name.clone() + brightness.clone())
      | (brightness + light_name.clone())
      | light_name,
  );

  let goal = b.bind("goal", action_blink + one_clause.one_or_more());
  b.compile(goal).unwrap()
}

fn strategy_from_flag(name: &str) -> ParsingStrategy {
  match name {
    "top-down" => ParsingStrategy::top_down(),
    "bottom-up" => ParsingStrategy::bottom_up(),
    "left-corner" => ParsingStrategy::left_corner(),
    other => {
      eprintln!("unknown strategy {other:?}, falling back to left-corner");
      ParsingStrategy::left_corner()
    }
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let mut opts = env::args();
  let prog_name = opts.next().unwrap_or_else(|| "cli".to_string());

  let mut print_chart = false;
  let mut strategy_name = "left-corner".to_string();
  let mut opts = opts.peekable();
  while let Some(o) = opts.next() {
    if o == "-h" || o == "--help" {
      println!("{}", usage(&prog_name));
      process::exit(0);
    } else if o == "-c" || o == "--chart" {
      print_chart = true;
    } else if o == "-s" || o == "--strategy" {
      strategy_name = opts.next().unwrap_or_else(|| "left-corner".to_string());
    }
  }

  let grammar = colored_light_grammar();
  let strategy = strategy_from_flag(&strategy_name);
  let mut parser = RobustParser::new(&grammar, strategy);

  let mut input = String::new();
  loop {
    print!("> ");
    if io::stdout().flush().is_err() {
      return;
    }

    match io::stdin().read_line(&mut input) {
      Ok(0) => return, // EOF (ctrl+d)
      Ok(_) => {
        let line = input.trim().to_ascii_lowercase();
        if !line.is_empty() {
          match parser.parse(&line) {
            Ok((tree, result)) => {
              if print_chart {
                if let Some(chart) = parser.chart() {
                  println!("chart:\n{}\n", chart);
                }
              }
              println!("{}", tree);
              println!("{}", result);
            }
            Err(e) => println!("no parse: {}", e),
          }
        }
        input.clear();
      }
      Err(e) => {
        eprintln!("error reading stdin: {}", e);
        return;
      }
    }
  }
}
