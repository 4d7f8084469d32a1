//! Durable result store.
//!
//! The store maps task keys to their most recent [`Record`]. Every save
//! rewrites the whole backing resource, so what a reader sees is always a
//! complete serialization of the map as of the last completed write.
//!
//! # File format
//!
//! ```text
//! sld,tld,status,message
//! "aa",".loc.cc","✅","1"
//! "bb",".loc.cc","❌","Domain is already registered"
//! ```
//!
//! Values are always quoted. An embedded `"` is written as `""`, and quoted
//! values may contain commas and line breaks.

use crate::error::SweepError;
use crate::types::{Record, Status};
use indexmap::IndexMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Task key -> latest record, in first-insertion order.
pub type RecordMap = IndexMap<String, Record>;

/// Header row of the CSV store.
pub const CSV_HEADER: &str = "sld,tld,status,message";

/// Backing storage for the result map.
pub trait DurableStore: Send + Sync {
    /// Read the persisted map. A store that has never been written loads
    /// as an empty map.
    fn load(&self) -> Result<RecordMap, SweepError>;

    /// Replace the persisted map with `records`.
    fn save(&self, records: &RecordMap) -> Result<(), SweepError>;
}

/// CSV file store.
///
/// `load` refuses to continue past a malformed row and reports it as
/// [`SweepError::CorruptStore`]; a corrupt store is never overwritten
/// silently.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("store");
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }
}

impl DurableStore for CsvStore {
    fn load(&self) -> Result<RecordMap, SweepError> {
        if !self.path.exists() {
            return Ok(RecordMap::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            SweepError::file_error(
                self.path.to_string_lossy(),
                format!("Failed to read store: {}", e),
            )
        })?;

        decode_csv(&content, &self.path.to_string_lossy())
    }

    fn save(&self, records: &RecordMap) -> Result<(), SweepError> {
        let path_str = self.path.to_string_lossy();
        let content = encode_csv(records);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| SweepError::store_write(path_str.as_ref(), e.to_string()))?;
            }
        }

        // Write the full content next to the store, then swap it in.
        let tmp_path = self.temp_path();
        let write_tmp = || -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()
        };
        if let Err(e) = write_tmp().and_then(|_| fs::rename(&tmp_path, &self.path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(SweepError::store_write(path_str.as_ref(), e.to_string()));
        }
        Ok(())
    }
}

/// In-process store.
///
/// Clones share the same map, which lets tests and embedders inspect what
/// a scheduler persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: RecordMap,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-populated map.
    pub fn with_records(records: RecordMap) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState { records, saves: 0 })),
        }
    }

    /// Copy of the last saved map.
    pub fn snapshot(&self) -> RecordMap {
        self.inner
            .lock()
            .map(|state| state.records.clone())
            .unwrap_or_default()
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        self.inner.lock().map(|state| state.saves).unwrap_or(0)
    }
}

impl DurableStore for MemoryStore {
    fn load(&self) -> Result<RecordMap, SweepError> {
        let state = self
            .inner
            .lock()
            .map_err(|_| SweepError::internal("Failed to acquire memory store lock"))?;
        Ok(state.records.clone())
    }

    fn save(&self, records: &RecordMap) -> Result<(), SweepError> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| SweepError::internal("Failed to acquire memory store lock"))?;
        state.records = records.clone();
        state.saves += 1;
        Ok(())
    }
}

/// The in-memory result map paired with the store it is persisted to.
///
/// `commit` is the unit of the upsert-then-save protocol; callers serialize
/// access to it (the scheduler keeps the ledger behind a mutex).
pub struct Ledger {
    records: RecordMap,
    store: Box<dyn DurableStore>,
}

impl Ledger {
    /// Load the store's current contents into a new ledger.
    pub fn open(store: Box<dyn DurableStore>) -> Result<Self, SweepError> {
        let records = store.load()?;
        Ok(Self { records, store })
    }

    /// Upsert `record` under its key and persist the full map.
    pub fn commit(&mut self, record: Record) -> Result<(), SweepError> {
        self.records.insert(record.key(), record);
        self.store.save(&self.records)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &RecordMap {
        &self.records
    }
}

/// Serialize a record map into the CSV store format.
pub fn encode_csv(records: &RecordMap) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + records.len() * 48);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for record in records.values() {
        let fields = [
            record.sld.as_str(),
            record.tld.as_str(),
            record.status.glyph(),
            record.message.as_str(),
        ];
        let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Parse the CSV store format back into a record map.
///
/// `origin` names the source in error messages. Blank content is an empty
/// map; any malformed row fails the whole load.
pub fn decode_csv(content: &str, origin: &str) -> Result<RecordMap, SweepError> {
    let mut records = RecordMap::new();
    if content.trim().is_empty() {
        return Ok(records);
    }

    let rows = parse_rows(content).map_err(|(line, reason)| {
        SweepError::corrupt_store(origin, line, reason)
    })?;

    let mut rows = rows.into_iter();
    match rows.next() {
        Some((_, header)) if header.iter().map(String::as_str).eq(CSV_HEADER.split(',')) => {}
        Some((line, header)) => {
            return Err(SweepError::corrupt_store(
                origin,
                line,
                format!("unexpected header '{}'", header.join(",")),
            ));
        }
        None => return Ok(records),
    }

    for (line, fields) in rows {
        if fields.len() != 4 {
            return Err(SweepError::corrupt_store(
                origin,
                line,
                format!("expected 4 fields, found {}", fields.len()),
            ));
        }

        let mut fields = fields.into_iter();
        let sld = fields.next().unwrap_or_default();
        let tld = fields.next().unwrap_or_default();
        let status_raw = fields.next().unwrap_or_default();
        let message = fields.next().unwrap_or_default();

        let status = Status::from_glyph(&status_raw).ok_or_else(|| {
            SweepError::corrupt_store(origin, line, format!("unknown status '{}'", status_raw))
        })?;

        let record = Record {
            sld,
            tld,
            status,
            message,
        };
        records.insert(record.key(), record);
    }

    Ok(records)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Split CSV content into rows of fields, tagged with their starting line.
///
/// Unquoted fields are trimmed; quoted fields are taken verbatim. Blank
/// lines are skipped.
fn parse_rows(content: &str) -> Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;
    let mut line = 1;
    let mut row_line = 1;

    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if !was_quoted && field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
                was_quoted = true;
            }
            '"' => return Err((line, "unexpected quote inside field".to_string())),
            ',' => fields.push(finish_field(&mut field, &mut was_quoted)),
            '\r' => {}
            '\n' => {
                let last = finish_field(&mut field, &mut was_quoted);
                push_row(&mut rows, &mut fields, last, row_line);
                line += 1;
                row_line = line;
            }
            _ if was_quoted => {
                if !ch.is_whitespace() {
                    return Err((line, "text after closing quote".to_string()));
                }
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err((row_line, "unterminated quoted field".to_string()));
    }

    let had_quote = was_quoted;
    let last = finish_field(&mut field, &mut was_quoted);
    if had_quote || !last.is_empty() || !fields.is_empty() {
        push_row(&mut rows, &mut fields, last, row_line);
    }

    Ok(rows)
}

fn finish_field(field: &mut String, was_quoted: &mut bool) -> String {
    let value = if *was_quoted {
        std::mem::take(field)
    } else {
        let trimmed = field.trim().to_string();
        field.clear();
        trimmed
    };
    *was_quoted = false;
    value
}

fn push_row(
    rows: &mut Vec<(usize, Vec<String>)>,
    fields: &mut Vec<String>,
    last: String,
    row_line: usize,
) {
    if fields.is_empty() && last.is_empty() {
        // blank line
        return;
    }
    fields.push(last);
    rows.push((row_line, std::mem::take(fields)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(sld: &str, tld: &str, status: Status, message: &str) -> Record {
        Record {
            sld: sld.to_string(),
            tld: tld.to_string(),
            status,
            message: message.to_string(),
        }
    }

    fn sample_map() -> RecordMap {
        let mut map = RecordMap::new();
        for r in [
            record("aa", ".loc.cc", Status::Available, "1"),
            record("bb", ".loc.cc", Status::Unavailable, "Domain is already registered"),
            record("hello", ".hidns.vip", Status::Unavailable, "error sending request"),
        ] {
            map.insert(r.key(), r);
        }
        map
    }

    #[test]
    fn test_encode_matches_simple_format() {
        let encoded = encode_csv(&sample_map());
        let expected = "sld,tld,status,message\n\
                        \"aa\",\".loc.cc\",\"✅\",\"1\"\n\
                        \"bb\",\".loc.cc\",\"❌\",\"Domain is already registered\"\n\
                        \"hello\",\".hidns.vip\",\"❌\",\"error sending request\"\n";
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_encode_empty_map_is_header_only() {
        assert_eq!(encode_csv(&RecordMap::new()), "sld,tld,status,message\n");
    }

    #[test]
    fn test_roundtrip_preserves_order_and_values() {
        let map = sample_map();
        let decoded = decode_csv(&encode_csv(&map), "test").unwrap();
        assert_eq!(decoded, map);
        let keys: Vec<&String> = decoded.keys().collect();
        assert_eq!(keys, vec!["aa.loc.cc", "bb.loc.cc", "hello.hidns.vip"]);
    }

    #[test]
    fn test_roundtrip_with_commas_quotes_and_newlines() {
        let mut map = RecordMap::new();
        let tricky = record(
            "cc",
            ".hidns.co",
            Status::Unavailable,
            "bad \"sld\", try again\nlater",
        );
        map.insert(tricky.key(), tricky);

        let decoded = decode_csv(&encode_csv(&map), "test").unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_decode_accepts_crlf_and_blank_lines() {
        let content = "sld,tld,status,message\r\n\r\n\"aa\",\".loc.cc\",\"✅\",\"1\"\r\n\n";
        let decoded = decode_csv(content, "test").unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["aa.loc.cc"].message, "1");
    }

    #[test]
    fn test_decode_later_row_overwrites_in_place() {
        let content = "sld,tld,status,message\n\
                       \"aa\",\".loc.cc\",\"❌\",\"old\"\n\
                       \"bb\",\".loc.cc\",\"❌\",\"x\"\n\
                       \"aa\",\".loc.cc\",\"✅\",\"new\"\n";
        let decoded = decode_csv(content, "test").unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.get_index(0).unwrap().1.message, "new");
    }

    #[test]
    fn test_decode_rejects_wrong_field_count() {
        let content = "sld,tld,status,message\n\"aa\",\".loc.cc\",\"✅\"\n";
        match decode_csv(content, "out.csv") {
            Err(SweepError::CorruptStore { line, reason, .. }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("expected 4 fields"));
            }
            other => panic!("expected CorruptStore, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let content = "sld,tld,status,message\n\"aa\",\".loc.cc\",\"maybe\",\"1\"\n";
        assert!(matches!(
            decode_csv(content, "out.csv"),
            Err(SweepError::CorruptStore { line: 2, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_header_and_unterminated_quote() {
        assert!(matches!(
            decode_csv("name,suffix\n", "out.csv"),
            Err(SweepError::CorruptStore { line: 1, .. })
        ));
        assert!(matches!(
            decode_csv("sld,tld,status,message\n\"aa,\".loc.cc\"\n", "out.csv"),
            Err(SweepError::CorruptStore { .. })
        ));
    }

    #[test]
    fn test_csv_store_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path().join("output.csv"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_csv_store_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("output.csv");
        let store = CsvStore::new(&path);

        store.save(&sample_map()).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("nested").join(".output.csv.tmp").exists());
        assert_eq!(store.load().unwrap(), sample_map());
    }

    #[test]
    fn test_csv_store_failed_save_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.csv");
        // a non-empty directory at the store path makes the rename fail
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let result = CsvStore::new(&path).save(&sample_map());

        assert!(matches!(result, Err(SweepError::StoreWrite { .. })));
        assert!(!dir.path().join(".output.csv.tmp").exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_ledger_commit_upserts_and_persists() {
        let store = MemoryStore::new();
        let mut ledger = Ledger::open(Box::new(store.clone())).unwrap();

        ledger
            .commit(record("aa", ".loc.cc", Status::Unavailable, "first"))
            .unwrap();
        ledger
            .commit(record("bb", ".loc.cc", Status::Available, "1"))
            .unwrap();
        ledger
            .commit(record("aa", ".loc.cc", Status::Available, "second"))
            .unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(store.save_count(), 3);

        let persisted = store.snapshot();
        assert_eq!(persisted["aa.loc.cc"].message, "second");
        assert_eq!(persisted.get_index(0).unwrap().0, "aa.loc.cc");
    }

    #[test]
    fn test_ledger_open_surfaces_corrupt_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output.csv");
        fs::write(&path, "sld,tld,status,message\n\"aa\"\n").unwrap();

        let result = Ledger::open(Box::new(CsvStore::new(&path)));
        assert!(matches!(result, Err(SweepError::CorruptStore { .. })));
    }
}
