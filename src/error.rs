use thiserror::Error;

/// Raised immediately from the author-facing grammar API; a grammar with
/// one of these defects can never be compiled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
  #[error("grammar has no GOAL element")]
  MissingGoal,

  #[error("element name {0:?} is reserved")]
  ReservedName(String),
}

/// Invalid arguments to a combinator (repetition counts, empty terminals).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
  #[error("repetition count must be positive, got {0}")]
  NonPositiveMultiplier(i64),

  #[error("repetition range ({min}, {max}) has max < min")]
  InvertedRange { min: u32, max: u32 },

  #[error("string/regex terminal can't be empty")]
  EmptyPattern,

  #[error("invalid regex pattern {0:?}: {1}")]
  BadRegex(String, String),
}

/// Raised only when a caller asks for a tree or result and none covers the
/// required span. Match-time (single-token) failures never surface this —
/// the engine swallows those internally and keeps going.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
  #[error("input string is empty")]
  EmptyInput,

  #[error("no parse tree found")]
  NoParseTree,
}
