use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
  static ref WHITESPACE_RUN: Regex = Regex::new(r"[\t ]+").unwrap();
}

/// Collapses runs of tabs/spaces into a single space and trims the ends.
///
/// ```
/// use semgram::util::strip_whitespace;
/// assert_eq!(strip_whitespace("  flash\t\tthe   light  "), "flash the light");
/// ```
pub fn strip_whitespace(s: &str) -> String {
  WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}

/// Returns the (start, end) byte-offset span of every whitespace-delimited
/// word in `s`, plus the sets of all start and all end offsets.
///
/// Used by callers that need to map a parsed token span back onto byte
/// offsets in the original sentence; the core driver itself only needs
/// token indices, but this is kept as a small public utility the way
/// the distilled grammar's original implementation exposed it.
pub fn find_word_boundaries(s: &str) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
  let mut boundaries = Vec::new();
  let mut start = 0usize;
  for (i, c) in s.char_indices() {
    if c == ' ' {
      if i > start {
        boundaries.push((start, i));
      }
      start = i + c.len_utf8();
    }
  }
  if start < s.len() {
    boundaries.push((start, s.len()));
  }
  let starts = boundaries.iter().map(|&(s, _)| s).collect();
  let ends = boundaries.iter().map(|&(_, e)| e).collect();
  (boundaries, starts, ends)
}

/// Takes a list where each element is a set of choices, and returns all the
/// possible sequences generated by picking one choice per position. Used to
/// enumerate the Cartesian product of backpointer-tuple children when
/// expanding all derivations of an ambiguous edge.
///
/// ```
/// let v = vec![
///   vec![1],
///   vec![2, 3],
///   vec![4],
/// ];
///
/// assert_eq!(semgram::util::combinations(&v), vec![
///   vec![1, 2, 4],
///   vec![1, 3, 4],
/// ]);
/// ```
pub fn combinations<T>(list: &[Vec<T>]) -> Vec<Vec<T>>
where
  T: Clone,
{
  if list.is_empty() {
    Vec::new()
  } else if list.len() == 1 {
    list[0].iter().map(|e| vec![e.clone()]).collect()
  } else {
    let (head, tail) = list.split_at(1);
    let head = &head[0];

    combinations(tail)
      .into_iter()
      .flat_map(|subseq| {
        head.iter().map(move |v| {
          let mut newseq = subseq.clone();
          newseq.insert(0, v.clone());
          newseq
        })
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strip_whitespace_idempotent() {
    let s = "  a\t\tb   c ";
    let once = strip_whitespace(s);
    assert_eq!(strip_whitespace(&once), once);
    assert_eq!(once, "a b c");
  }

  #[test]
  fn word_boundaries_basic() {
    let (b, starts, ends) = find_word_boundaries("my lights are off");
    assert_eq!(b, vec![(0, 2), (3, 9), (10, 13), (14, 17)]);
    assert_eq!(starts, vec![0, 3, 10, 14]);
    assert_eq!(ends, vec![2, 9, 13, 17]);
  }

  #[test]
  fn combinations_cartesian_product() {
    let v = vec![vec![1], vec![2, 3], vec![4]];
    assert_eq!(combinations(&v), vec![vec![1, 2, 4], vec![1, 3, 4]]);
  }

  #[test]
  fn combinations_empty_is_empty() {
    let v: Vec<Vec<i32>> = vec![];
    assert!(combinations(&v).is_empty());
  }
}
