//! Core data types for a sweep run.
//!
//! Tasks are ephemeral inputs, outcomes are what a checker reports, and
//! records are the persisted form kept in the result store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default registrar suffixes, checked in this order.
pub const DEFAULT_SUFFIXES: &[&str] = &[".loc.cc", ".hidns.co", ".hidns.vip"];

/// Default location of the JSON word list.
pub const DEFAULT_WORDS_PATH: &str = "words.json";

/// Default location of the CSV result store.
pub const DEFAULT_STORE_PATH: &str = "output.csv";

/// One (name, suffix) pair to check.
///
/// The key is the plain concatenation `name + suffix`; suffixes start with
/// a `.` so two different pairs never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub suffix: String,
}

impl Task {
    pub fn new<N: Into<String>, S: Into<String>>(name: N, suffix: S) -> Self {
        Self {
            name: name.into(),
            suffix: suffix.into(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}{}", self.name, self.suffix)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.suffix)
    }
}

/// Classified result of a single registrar lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Registrar accepted the name; detail is its result payload
    Available { detail: String },

    /// Registrar reported the name as taken, invalid or rejected
    Unavailable { detail: String },

    /// The lookup itself failed; not a registrar verdict
    TransportError { detail: String },
}

impl Outcome {
    pub fn detail(&self) -> &str {
        match self {
            Outcome::Available { detail }
            | Outcome::Unavailable { detail }
            | Outcome::TransportError { detail } => detail,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Outcome::Available { .. } => Status::Available,
            Outcome::Unavailable { .. } | Outcome::TransportError { .. } => Status::Unavailable,
        }
    }
}

/// Persisted status glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "✅")]
    Available,
    #[serde(rename = "❌")]
    Unavailable,
}

impl Status {
    pub fn glyph(&self) -> &'static str {
        match self {
            Status::Available => "✅",
            Status::Unavailable => "❌",
        }
    }

    pub fn from_glyph(glyph: &str) -> Option<Self> {
        match glyph {
            "✅" => Some(Status::Available),
            "❌" => Some(Status::Unavailable),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Latest known result for one task key, as stored on disk.
///
/// Field names follow the store header `sld,tld,status,message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub sld: String,
    pub tld: String,
    pub status: Status,
    pub message: String,
}

impl Record {
    pub fn from_outcome(task: &Task, outcome: &Outcome) -> Self {
        Self {
            sld: task.name.clone(),
            tld: task.suffix.clone(),
            status: outcome.status(),
            message: outcome.detail().to_string(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}{}", self.sld, self.tld)
    }
}

/// Settings for a sweep run.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Maximum number of lookups in flight
    /// Default: 5, Range: 1-100
    pub concurrency: usize,

    /// Optional per-lookup deadline; a lookup that exceeds it is recorded
    /// as a transport failure. Default: none
    pub timeout: Option<Duration>,

    /// Suffixes to sweep, in order
    pub suffixes: Vec<String>,

    /// Lengths of the repeated-character runs (`aa`, `000`, ...)
    /// Default: [2]
    pub lengths: Vec<usize>,

    /// Extra wildcard patterns expanded into names
    pub patterns: Vec<String>,

    /// Path of the JSON word list
    pub words_path: String,

    /// Path of the CSV result store
    pub store_path: String,

    /// Skip keys already present in the loaded store. Default: false
    pub skip_known: bool,

    /// Extra registrar routes (suffix prefix -> endpoint URL)
    pub routes: HashMap<String, String>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            timeout: None,
            suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            lengths: vec![2],
            patterns: Vec::new(),
            words_path: DEFAULT_WORDS_PATH.to_string(),
            store_path: DEFAULT_STORE_PATH.to_string(),
            skip_known: false,
            routes: HashMap::new(),
        }
    }
}

impl SweepConfig {
    /// Set the concurrency budget, capped to 1-100.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 100);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn with_skip_known(mut self, enabled: bool) -> Self {
        self.skip_known = enabled;
        self
    }
}

/// Counters reported when a run finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Tasks handed to the scheduler
    pub total: usize,
    pub available: usize,
    pub unavailable: usize,
    /// Tasks whose lookup failed (transport error, timeout, panic)
    pub failed: usize,
    /// Tasks not dispatched because their key was already stored
    pub skipped: usize,
    /// Highest number of lookups observed in flight at once
    pub peak_in_flight: usize,
    #[serde(skip)]
    pub duration: Duration,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.available + self.unavailable + self.failed
    }
}

/// One completed task, as reported to progress observers.
#[derive(Debug, Clone)]
pub struct Progress {
    pub task: Task,
    pub outcome: Outcome,
    pub completed: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_key_is_plain_concatenation() {
        let task = Task::new("aa", ".loc.cc");
        assert_eq!(task.key(), "aa.loc.cc");
        assert_eq!(task.to_string(), "aa.loc.cc");
    }

    #[test]
    fn test_record_from_outcomes() {
        let task = Task::new("bb", ".hidns.co");

        let ok = Record::from_outcome(&task, &Outcome::Available { detail: "1".into() });
        assert_eq!(ok.status, Status::Available);
        assert_eq!(ok.message, "1");
        assert_eq!(ok.key(), "bb.hidns.co");

        let taken = Record::from_outcome(
            &task,
            &Outcome::Unavailable {
                detail: "Domain is already registered".into(),
            },
        );
        assert_eq!(taken.status, Status::Unavailable);

        let failed = Record::from_outcome(
            &task,
            &Outcome::TransportError {
                detail: "connection refused".into(),
            },
        );
        assert_eq!(failed.status, Status::Unavailable);
        assert_eq!(failed.message, "connection refused");
    }

    #[test]
    fn test_status_glyphs() {
        assert_eq!(Status::from_glyph("✅"), Some(Status::Available));
        assert_eq!(Status::from_glyph("❌"), Some(Status::Unavailable));
        assert_eq!(Status::from_glyph("?"), None);
        assert_eq!(Status::Available.to_string(), "✅");
    }

    #[test]
    fn test_concurrency_is_clamped() {
        assert_eq!(SweepConfig::default().with_concurrency(0).concurrency, 1);
        assert_eq!(SweepConfig::default().with_concurrency(500).concurrency, 100);
        assert_eq!(SweepConfig::default().with_concurrency(12).concurrency, 12);
    }
}
