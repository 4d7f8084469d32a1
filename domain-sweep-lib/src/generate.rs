//! Candidate name and task generation.
//!
//! Everything here is pure apart from reading the word list: the same
//! inputs always give the same task list, in the same order.
//!
//! For each suffix (in configured order) the names are:
//! 1. the word list entries, in file order
//! 2. repeated-character runs for every configured length: `00`..`99`
//!    then `aa`..`zz` for length 2
//! 3. names expanded from wildcard patterns
//!
//! # Pattern Syntax
//!
//! - `\w`: lowercase letter (a-z)
//! - `\d`: digit (0-9)
//! - `?`: letter or digit
//! - `\\`: literal backslash
//! - any other character: itself, lowercased
//!
//! ```
//! use domain_sweep_lib::generate::{expand_pattern, repeated_runs};
//!
//! assert_eq!(expand_pattern("go\\d").unwrap().len(), 10);
//! assert_eq!(repeated_runs(2)[0], "00");
//! ```

use crate::error::SweepError;
use crate::types::{SweepConfig, Task};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Upper bound on names a single pattern may expand to.
pub const MAX_PATTERN_EXPANSION: usize = 1_000_000;

/// Names made of one character repeated `length` times.
///
/// Digits come first, then letters: `["00", "11", ..., "99", "aa", ..., "zz"]`.
/// A length of zero yields nothing.
pub fn repeated_runs(length: usize) -> Vec<String> {
    if length == 0 {
        return Vec::new();
    }
    ('0'..='9')
        .chain('a'..='z')
        .map(|c| c.to_string().repeat(length))
        .collect()
}

/// Load the word list: a JSON array of strings.
///
/// Entries are trimmed and lowercased; empty entries are dropped. Any
/// failure to read or parse the file is fatal for the run.
pub fn load_word_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SweepError> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    let content = fs::read_to_string(path)
        .map_err(|e| SweepError::word_list(path_str.as_ref(), e.to_string()))?;

    let words: Vec<String> = serde_json::from_str(&content).map_err(|e| {
        SweepError::word_list(
            path_str.as_ref(),
            format!("expected a JSON array of strings: {}", e),
        )
    })?;

    Ok(words
        .into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect())
}

#[derive(Debug, Clone)]
enum Slot {
    Literal(char),
    Charset(Vec<char>),
}

fn letters() -> Vec<char> {
    ('a'..='z').collect()
}

fn digits() -> Vec<char> {
    ('0'..='9').collect()
}

fn parse_pattern(pattern: &str) -> Result<Vec<Slot>, SweepError> {
    if pattern.is_empty() {
        return Err(SweepError::invalid_pattern(pattern, "pattern cannot be empty"));
    }

    let mut slots = Vec::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        let slot = match ch {
            '\\' => match chars.next() {
                Some('w') => Slot::Charset(letters()),
                Some('d') => Slot::Charset(digits()),
                Some('\\') => Slot::Literal('\\'),
                Some(other) => {
                    return Err(SweepError::invalid_pattern(
                        pattern,
                        format!("unknown escape sequence '\\{}'", other),
                    ));
                }
                None => return Err(SweepError::invalid_pattern(pattern, "trailing backslash")),
            },
            '?' => Slot::Charset(digits().into_iter().chain(letters()).collect()),
            other => Slot::Literal(other.to_ascii_lowercase()),
        };
        slots.push(slot);
    }
    Ok(slots)
}

/// Number of names a pattern expands to.
pub fn estimate_pattern_count(pattern: &str) -> Result<usize, SweepError> {
    Ok(parse_pattern(pattern)?
        .iter()
        .map(|slot| match slot {
            Slot::Literal(_) => 1,
            Slot::Charset(chars) => chars.len(),
        })
        .fold(1usize, |acc, n| acc.saturating_mul(n)))
}

/// Expand a wildcard pattern into every matching name, in lexical order of
/// the slot charsets (rightmost slot varies fastest).
pub fn expand_pattern(pattern: &str) -> Result<Vec<String>, SweepError> {
    let count = estimate_pattern_count(pattern)?;
    if count > MAX_PATTERN_EXPANSION {
        return Err(SweepError::invalid_pattern(
            pattern,
            format!(
                "expands to {} names (limit {})",
                count, MAX_PATTERN_EXPANSION
            ),
        ));
    }

    let mut names = vec![String::new()];
    for slot in parse_pattern(pattern)? {
        names = match slot {
            Slot::Literal(c) => names
                .into_iter()
                .map(|mut n| {
                    n.push(c);
                    n
                })
                .collect(),
            Slot::Charset(chars) => names
                .iter()
                .flat_map(|n| chars.iter().map(move |c| format!("{}{}", n, c)))
                .collect(),
        };
    }
    Ok(names)
}

/// Ordered, de-duplicated names checked under every suffix.
pub fn candidate_names(
    words: &[String],
    lengths: &[usize],
    patterns: &[String],
) -> Result<Vec<String>, SweepError> {
    let mut names: Vec<String> = words.to_vec();
    for &length in lengths {
        names.extend(repeated_runs(length));
    }
    for pattern in patterns {
        names.extend(expand_pattern(pattern)?);
    }

    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
    Ok(names)
}

/// Pair every name with every suffix, suffix-major.
pub fn build_tasks(suffixes: &[String], names: &[String]) -> Vec<Task> {
    suffixes
        .iter()
        .flat_map(|suffix| names.iter().map(move |name| Task::new(name.clone(), suffix.clone())))
        .collect()
}

/// Build the full task list for a run from its configuration.
///
/// Reads the word list from `config.words_path`; fails with
/// [`SweepError::WordListUnavailable`] before producing any task if it
/// cannot be loaded.
pub fn tasks_for_config(config: &SweepConfig) -> Result<Vec<Task>, SweepError> {
    let words = load_word_list(&config.words_path)?;
    let names = candidate_names(&words, &config.lengths, &config.patterns)?;
    Ok(build_tasks(&config.suffixes, &names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_repeated_runs_order_and_count() {
        let runs = repeated_runs(2);
        assert_eq!(runs.len(), 36);
        assert_eq!(runs[0], "00");
        assert_eq!(runs[9], "99");
        assert_eq!(runs[10], "aa");
        assert_eq!(runs[35], "zz");
        assert_eq!(repeated_runs(3)[11], "bbb");
        assert!(repeated_runs(0).is_empty());
    }

    #[test]
    fn test_expand_digits() {
        let names = expand_pattern("app\\d").unwrap();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "app0");
        assert_eq!(names[9], "app9");
    }

    #[test]
    fn test_expand_mixed_and_question_mark() {
        assert_eq!(expand_pattern("\\w\\d").unwrap().len(), 260);
        let any = expand_pattern("x?").unwrap();
        assert_eq!(any.len(), 36);
        assert_eq!(any[0], "x0");
        assert_eq!(any[35], "xz");
    }

    #[test]
    fn test_expand_literal_is_lowercased() {
        assert_eq!(expand_pattern("Hello").unwrap(), vec!["hello"]);
    }

    #[test]
    fn test_pattern_errors() {
        assert!(expand_pattern("").is_err());
        assert!(expand_pattern("ab\\x").is_err());
        assert!(expand_pattern("ab\\").is_err());
        // 36^5 > limit
        assert!(matches!(
            expand_pattern("?????"),
            Err(SweepError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_estimate_pattern_count() {
        assert_eq!(estimate_pattern_count("abc").unwrap(), 1);
        assert_eq!(estimate_pattern_count("\\d\\d").unwrap(), 100);
        assert_eq!(estimate_pattern_count("\\w?").unwrap(), 26 * 36);
    }

    #[test]
    fn test_candidate_names_words_first_then_runs_deduplicated() {
        let words = strings(&["hello", "aa", "world"]);
        let names = candidate_names(&words, &[2], &[]).unwrap();

        assert_eq!(&names[..3], &["hello", "aa", "world"]);
        assert_eq!(names[3], "00");
        // "aa" from the runs is dropped, it already came from the word list
        assert_eq!(names.iter().filter(|n| *n == "aa").count(), 1);
        assert_eq!(names.len(), 3 + 36 - 1);
    }

    #[test]
    fn test_build_tasks_is_suffix_major() {
        let tasks = build_tasks(&strings(&[".loc.cc", ".hidns.co"]), &strings(&["aa", "bb"]));
        let keys: Vec<String> = tasks.iter().map(Task::key).collect();
        assert_eq!(
            keys,
            vec!["aa.loc.cc", "bb.loc.cc", "aa.hidns.co", "bb.hidns.co"]
        );
    }

    #[test]
    fn test_load_word_list() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"["Hello", " world ", ""]"#).unwrap();
        file.flush().unwrap();

        let words = load_word_list(file.path()).unwrap();
        assert_eq!(words, vec!["hello", "world"]);
    }

    #[test]
    fn test_load_word_list_missing_or_invalid() {
        assert!(matches!(
            load_word_list("/definitely/not/here/words.json"),
            Err(SweepError::WordListUnavailable { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"words": ["a"]}"#).unwrap();
        file.flush().unwrap();
        assert!(matches!(
            load_word_list(file.path()),
            Err(SweepError::WordListUnavailable { .. })
        ));
    }

    #[test]
    fn test_tasks_for_config_fails_without_word_list() {
        let config = SweepConfig {
            words_path: "/definitely/not/here/words.json".to_string(),
            ..SweepConfig::default()
        };
        assert!(matches!(
            tasks_for_config(&config),
            Err(SweepError::WordListUnavailable { .. })
        ));
    }
}
