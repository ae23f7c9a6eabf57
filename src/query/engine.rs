//! Load and select over `T.tbl` / `T.idx` pairs.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::common::config::IndexConfig;
use crate::common::{Error, Key, Result};
use crate::index::BTreeIndex;
use crate::record::RecordFile;
use crate::storage::OpenMode;

use super::condition::{Attr, CompOp, Condition, Projection};

/// Outcome of [`QueryEngine::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Tuples appended to the table.
    pub loaded: usize,
    /// Lines that could not be loaded.
    pub skipped: usize,
}

/// Outcome of [`QueryEngine::select`].
///
/// `Display` renders it one line per tuple: `key`, `value`, `key 'value'`,
/// or just the count for [`Projection::Count`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectResult {
    pub projection: Projection,
    /// Matching tuples in scan order; empty for [`Projection::Count`].
    pub tuples: Vec<(Key, String)>,
    pub count: usize,
    /// Whether the tuples were reached through the index.
    pub used_index: bool,
}

impl SelectResult {
    fn new(projection: Projection) -> Self {
        Self {
            projection,
            tuples: Vec::new(),
            count: 0,
            used_index: false,
        }
    }

    fn push(&mut self, key: Key, value: String) {
        self.count += 1;
        if self.projection != Projection::Count {
            self.tuples.push((key, value));
        }
    }

    /// Keys of the matching tuples.
    pub fn keys(&self) -> Vec<Key> {
        self.tuples.iter().map(|(key, _)| *key).collect()
    }
}

impl fmt::Display for SelectResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.projection == Projection::Count {
            return writeln!(f, "{}", self.count);
        }
        for (key, value) in &self.tuples {
            match self.projection {
                Projection::Key => writeln!(f, "{}", key)?,
                Projection::Value => writeln!(f, "{}", value)?,
                _ => writeln!(f, "{} '{}'", key, value)?,
            }
        }
        Ok(())
    }
}

/// Where an index-driven select starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStart {
    First,
    From(Key),
}

/// Runs loads and selects against the tables of one directory.
///
/// # Example
/// ```no_run
/// use pageidx::query::{CompOp, Condition, Projection, QueryEngine};
///
/// let engine = QueryEngine::new("data");
/// engine.load("movie", "movie.del", true)?;
///
/// let result = engine.select(
///     Projection::All,
///     "movie",
///     &[Condition::key(CompOp::Ge, 1000), Condition::key(CompOp::Lt, 1100)],
/// )?;
/// print!("{}", result);
/// # Ok::<(), pageidx::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct QueryEngine {
    dir: PathBuf,
    index_config: IndexConfig,
}

impl QueryEngine {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            index_config: IndexConfig::default(),
        }
    }

    /// Node capacities used for indexes this engine creates or reads.
    pub fn with_index_config(mut self, config: IndexConfig) -> Self {
        self.index_config = config;
        self
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.tbl", table))
    }

    pub fn index_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.idx", table))
    }

    /// Append every `key, value` line of `load_file` to `table`.
    ///
    /// With `with_index`, each tuple is also inserted into the table's index,
    /// which is created if missing. Lines that are not UTF-8, do not parse,
    /// or whose value is too long are skipped and counted.
    ///
    /// Both files are closed even when the load fails part way, so the
    /// index always covers exactly the tuples that reached the table.
    ///
    /// # Errors
    /// Returns `Error::Open` if the load file cannot be opened and
    /// propagates storage errors.
    pub fn load<P: AsRef<Path>>(&self, table: &str, load_file: P, with_index: bool) -> Result<LoadSummary> {
        let load_file = load_file.as_ref();
        let file = File::open(load_file).map_err(|source| Error::Open {
            path: load_file.to_path_buf(),
            source,
        })?;

        let mut records = RecordFile::open(self.table_path(table), OpenMode::Write)?;
        let mut index = if with_index {
            Some(BTreeIndex::open_with(
                self.index_path(table),
                OpenMode::Write,
                self.index_config,
            )?)
        } else {
            None
        };

        let loaded = Self::load_lines(BufReader::new(file), &mut records, index.as_mut());
        let records_closed = records.close();
        let index_closed = index.map_or(Ok(()), BTreeIndex::close);

        let summary = loaded?;
        records_closed?;
        index_closed?;

        debug!(
            table,
            loaded = summary.loaded,
            skipped = summary.skipped,
            "load finished"
        );
        Ok(summary)
    }

    fn load_lines<R: BufRead>(
        mut reader: R,
        records: &mut RecordFile,
        mut index: Option<&mut BTreeIndex>,
    ) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line,
                Err(e) => {
                    warn!(line = line_no, error = %e, "skipping load line");
                    summary.skipped += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let (key, value) = match parse_load_line(line) {
                Ok(tuple) => tuple,
                Err(e) => {
                    warn!(line = line_no, error = %e, "skipping load line");
                    summary.skipped += 1;
                    continue;
                }
            };

            let rid = match records.append(key, &value) {
                Ok(rid) => rid,
                Err(e @ Error::ValueTooLong { .. }) => {
                    warn!(line = line_no, error = %e, "skipping load line");
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(index) = index.as_deref_mut() {
                index.insert(key, rid)?;
            }
            summary.loaded += 1;
        }

        Ok(summary)
    }

    /// Return the tuples of `table` that satisfy every condition.
    ///
    /// The index is used when it exists and some key condition other than
    /// `<>` bounds the scan; otherwise the whole table is read.
    ///
    /// # Errors
    /// - `Error::TableNotFound` if the table has no record file
    /// - `Error::InvalidCondition` if a key literal is not an integer
    pub fn select(&self, projection: Projection, table: &str, conditions: &[Condition]) -> Result<SelectResult> {
        for cond in conditions.iter().filter(|c| c.attr == Attr::Key) {
            cond.key_literal()?;
        }

        let mut records = match RecordFile::open(self.table_path(table), OpenMode::Read) {
            Ok(records) => records,
            Err(Error::Open { .. }) => return Err(Error::TableNotFound(table.to_string())),
            Err(e) => return Err(e),
        };

        let mut result = SelectResult::new(projection);
        let index_path = self.index_path(table);

        match Self::scan_start(conditions)? {
            Some(start) if index_path.exists() => {
                let mut index = BTreeIndex::open_with(&index_path, OpenMode::Read, self.index_config)?;
                Self::select_with_index(&mut index, &mut records, start, conditions, &mut result)?;
                index.close()?;
                result.used_index = true;
            }
            _ => Self::select_with_scan(&mut records, conditions, &mut result)?,
        }

        records.close()?;
        debug!(table, count = result.count, used_index = result.used_index, "select finished");
        Ok(result)
    }

    fn select_with_index(
        index: &mut BTreeIndex,
        records: &mut RecordFile,
        start: ScanStart,
        conditions: &[Condition],
        result: &mut SelectResult,
    ) -> Result<()> {
        let mut cursor = match start {
            ScanStart::First => index.locate_first()?,
            ScanStart::From(key) => index.locate(key)?,
        };

        while let Some((key, rid)) = index.read_forward(&mut cursor)? {
            if Self::past_upper_bound(conditions, key)? {
                break;
            }
            let (key, value) = records.read(rid)?;
            if Self::matches_all(conditions, key, &value)? {
                result.push(key, value);
            }
        }
        Ok(())
    }

    fn select_with_scan(records: &mut RecordFile, conditions: &[Condition], result: &mut SelectResult) -> Result<()> {
        for tuple in records.iter() {
            let (_, key, value) = tuple?;
            if Self::matches_all(conditions, key, &value)? {
                result.push(key, value);
            }
        }
        Ok(())
    }

    /// First key equality wins; otherwise the tightest lower bound.
    fn scan_start(conditions: &[Condition]) -> Result<Option<ScanStart>> {
        let mut start = None;
        for cond in conditions.iter().filter(|c| c.attr == Attr::Key) {
            match cond.op {
                CompOp::Eq => return Ok(Some(ScanStart::From(cond.key_literal()?))),
                CompOp::Gt | CompOp::Ge => {
                    let bound = cond.key_literal()?;
                    start = match start {
                        Some(ScanStart::From(current)) if current >= bound => start,
                        _ => Some(ScanStart::From(bound)),
                    };
                }
                CompOp::Lt | CompOp::Le => {
                    start = start.or(Some(ScanStart::First));
                }
                CompOp::Ne => {}
            }
        }
        Ok(start)
    }

    /// Whether `key`, and so every later key, fails an upper-bounding condition.
    fn past_upper_bound(conditions: &[Condition], key: Key) -> Result<bool> {
        for cond in conditions.iter().filter(|c| c.attr == Attr::Key) {
            let literal = cond.key_literal()?;
            let passed = match cond.op {
                CompOp::Eq | CompOp::Le => key > literal,
                CompOp::Lt => key >= literal,
                _ => false,
            };
            if passed {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn matches_all(conditions: &[Condition], key: Key, value: &str) -> Result<bool> {
        for cond in conditions {
            if !cond.matches(key, value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Parse one load-file line of the form `key, value`.
///
/// Leading blanks are ignored. The value may be wrapped in `'` or `"`, in
/// which case it ends at the closing quote; otherwise it runs to the end of
/// the line. A missing value is the empty string.
///
/// # Errors
/// Returns `Error::InvalidLoadLine` if there is no comma or the key is not
/// an integer.
pub fn parse_load_line(line: &str) -> Result<(Key, String)> {
    let invalid = || Error::InvalidLoadLine(line.to_string());

    let (key, rest) = line.split_once(',').ok_or_else(invalid)?;
    let key: Key = key.trim().parse().map_err(|_| invalid())?;

    let rest = rest
        .trim_start_matches([' ', '\t'])
        .trim_end_matches(['\r', '\n']);
    let value = match rest.chars().next() {
        Some(quote @ ('\'' | '"')) => {
            let body = &rest[1..];
            match body.find(quote) {
                Some(end) => &body[..end],
                None => body,
            }
        }
        _ => rest,
    };

    Ok((key, value.to_string()))
}
