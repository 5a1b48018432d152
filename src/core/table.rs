//! Random tables: tab-separated text parsing, roll ranges and lookup.
//!
//! A table file starts with a header line naming its columns, separated by
//! one or more tabs. Each following line is one entry. The first field of
//! an entry may be a die roll (`5`) or a range of rolls (`01-08`); a range
//! makes the entry proportionally more likely. Entries without a roll are
//! numbered automatically.
//!
//! ```text
//! Government
//! 01-08	Autocracy
//! 09-13	Bureaucracy
//! 95	Kleptocracy
//! 96-00	Theocracy
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

use crate::core::weighted::{SamplerError, WeightedSampler};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("table has no header line")]
    MissingHeader,
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    #[error("malformed roll range {low}-{high}")]
    MalformedRange { low: u64, high: u64 },
    #[error("roll '{0}' is not a usable number")]
    InvalidRoll(String),
    #[error("expected {expected} values, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },
    #[error("invalid table record: {0}")]
    InvalidRecord(String),
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

/// The roll prefix of an entry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollSpec {
    /// The first field is not a roll; the entry is auto-numbered.
    NoRoll,
    /// A single die value, e.g. `95`.
    Single(u64),
    /// An inclusive range of die values, e.g. `01-08`.
    Range(u64, u64),
}

impl RollSpec {
    /// Tokenize a field as `digits [ '-' digits ]`.
    ///
    /// Anything else is `NoRoll`. An upper bound made only of zeros is the
    /// percentile convention (`96-00` means 96 through 100).
    pub fn parse(field: &str) -> Result<RollSpec, TableError> {
        let (low, high) = match field.split_once('-') {
            Some((low, high)) => (low, Some(high)),
            None => (field, None),
        };
        if !is_digits(low) || high.is_some_and(|h| !is_digits(h)) {
            return Ok(RollSpec::NoRoll);
        }

        let low_value = parse_number(low)?;
        let Some(high) = high else {
            return Ok(RollSpec::Single(low_value));
        };

        let high_value = if high.len() > 1 && high.bytes().all(|b| b == b'0') {
            u32::try_from(high.len())
                .ok()
                .and_then(|digits| 10u64.checked_pow(digits))
                .ok_or_else(|| TableError::InvalidRoll(field.to_string()))?
        } else {
            parse_number(high)?
        };

        if high_value < low_value {
            return Err(TableError::MalformedRange {
                low: low_value,
                high: high_value,
            });
        }
        Ok(RollSpec::Range(low_value, high_value))
    }

    /// Relative weight of an entry carrying this roll.
    pub fn weight(&self) -> Result<u32, TableError> {
        match *self {
            RollSpec::NoRoll | RollSpec::Single(_) => Ok(1),
            RollSpec::Range(low, high) => u32::try_from(high - low + 1)
                .map_err(|_| TableError::InvalidRoll(format!("{}-{}", low, high))),
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_number(s: &str) -> Result<u64, TableError> {
    s.parse().map_err(|_| TableError::InvalidRoll(s.to_string()))
}

/// One table row: column values in header order, plus its roll range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub fields: Vec<(String, String)>,
    pub weight: u32,
    /// The roll label exactly as written in the source, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<String>,
    /// First die value that lands on this entry.
    pub first_roll: u64,
}

impl Entry {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }

    /// All die values that land on this entry.
    pub fn rolls(&self) -> RangeInclusive<u64> {
        self.first_roll..=(self.first_roll + u64::from(self.weight)).saturating_sub(1)
    }

    /// Roll label for display: the source label, or the computed range.
    pub fn roll_label(&self) -> String {
        match &self.roll {
            Some(label) => label.clone(),
            None if self.weight == 1 => self.first_roll.to_string(),
            None => format!("{}-{}", self.rolls().start(), self.rolls().end()),
        }
    }
}

/// A line that was skipped while parsing a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIssue {
    /// 1-based line number within the source.
    pub line: usize,
    pub text: String,
    pub error: TableError,
}

/// A parsed table and the lines it had to skip.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub table: TableModel,
    pub issues: Vec<LineIssue>,
}

/// A die roll against a table and the entry it landed on.
#[derive(Debug, Clone, Copy)]
pub struct TableRoll<'a> {
    pub roll: u64,
    pub entry: &'a Entry,
}

/// A random table with weighted entries.
///
/// Serializes as its name, columns, entries and max roll. Deserializing
/// re-checks the header, that entries match it and that roll ranges are
/// contiguous, then rebuilds the sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TableRecord", into = "TableRecord")]
pub struct TableModel {
    name: String,
    columns: Vec<String>,
    entries: Vec<Entry>,
    max_roll: u64,
    sampler: WeightedSampler<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableRecord {
    name: String,
    columns: Vec<String>,
    entries: Vec<Entry>,
    max_roll: u64,
}

impl TableModel {
    /// Parse a table from its header line and data lines.
    ///
    /// Bad data lines are skipped and reported in [`ParsedTable::issues`];
    /// only a missing or duplicated header fails the whole table.
    pub fn parse<'a, I>(name: &str, header: &str, lines: I) -> Result<ParsedTable, TableError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        // Header is line 1.
        let numbered = lines.into_iter().enumerate().map(|(i, l)| (i + 2, l));
        Self::parse_numbered(name, header, numbered)
    }

    /// Parse a whole table file; the first non-blank line is the header.
    pub fn parse_text(name: &str, text: &str) -> Result<ParsedTable, TableError> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));
        let header = lines
            .by_ref()
            .find(|(_, l)| !l.trim().is_empty())
            .map(|(_, l)| l)
            .ok_or(TableError::MissingHeader)?;
        Self::parse_numbered(name, header, lines)
    }

    fn parse_numbered<'a, I>(name: &str, header: &str, lines: I) -> Result<ParsedTable, TableError>
    where
        I: Iterator<Item = (usize, &'a str)>,
    {
        let columns = split_fields(header)
            .map(str::to_string)
            .collect::<Vec<_>>();
        check_columns(&columns)?;

        let mut builder = TableBuilder::new(name, columns);
        let mut issues = Vec::new();
        for (line_no, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            if let Err(error) = builder.push_line(line) {
                log::warn!("table '{}' line {}: {}", name, line_no, error);
                issues.push(LineIssue {
                    line: line_no,
                    text: line.to_string(),
                    error,
                });
            }
        }

        Ok(ParsedTable {
            table: builder.finish(),
            issues,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Sum of all entry weights; the size of the die this table uses.
    pub fn max_roll(&self) -> u64 {
        self.max_roll
    }

    /// Pick an entry at random, weighted by roll range.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Entry, TableError> {
        let index = self.sampler.draw(rng)?;
        Ok(&self.entries[*index])
    }

    /// Look up the entry for an explicit die value.
    pub fn roll_die(&self, roll: u64) -> Result<&Entry, TableError> {
        let index = self.sampler.resolve(roll)?;
        Ok(&self.entries[*index])
    }

    /// Roll the table's die and report the value alongside the entry.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TableRoll<'_>, TableError> {
        if self.max_roll == 0 {
            return Err(SamplerError::EmptyContainer.into());
        }
        let roll = rng.gen_range(1..=self.max_roll);
        Ok(TableRoll {
            roll,
            entry: self.roll_die(roll)?,
        })
    }
}

impl TryFrom<TableRecord> for TableModel {
    type Error = TableError;

    fn try_from(record: TableRecord) -> Result<Self, Self::Error> {
        check_columns(&record.columns)?;
        let mut builder = TableBuilder::new(&record.name, record.columns);
        for entry in record.entries {
            let names = entry.fields.iter().map(|(name, _)| name);
            if !names.eq(builder.columns.iter()) {
                return Err(TableError::InvalidRecord(format!(
                    "entry {} does not match the header",
                    entry.roll_label()
                )));
            }
            if entry.first_roll != builder.next_roll {
                return Err(TableError::InvalidRecord(format!(
                    "entry {} starts at {}, expected {}",
                    entry.roll_label(),
                    entry.first_roll,
                    builder.next_roll
                )));
            }
            builder.push_entry(entry)?;
        }
        let table = builder.finish();
        if table.max_roll != record.max_roll {
            return Err(TableError::InvalidRecord(format!(
                "max roll {} does not match entry weights ({})",
                record.max_roll, table.max_roll
            )));
        }
        Ok(table)
    }
}

impl From<TableModel> for TableRecord {
    fn from(table: TableModel) -> Self {
        TableRecord {
            name: table.name,
            columns: table.columns,
            entries: table.entries,
            max_roll: table.max_roll,
        }
    }
}

/// Accumulates entries for one parse; the roll counter lives here, not in
/// the table.
struct TableBuilder {
    name: String,
    columns: Vec<String>,
    entries: Vec<Entry>,
    sampler: WeightedSampler<usize>,
    next_roll: u64,
}

impl TableBuilder {
    fn new(name: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            entries: Vec::new(),
            sampler: WeightedSampler::new(),
            next_roll: 1,
        }
    }

    fn push_line(&mut self, line: &str) -> Result<(), TableError> {
        let mut values: Vec<&str> = split_fields(line).collect();
        let spec = match values.first() {
            Some(first) => RollSpec::parse(first)?,
            None => RollSpec::NoRoll,
        };
        let label = match spec {
            RollSpec::NoRoll => None,
            RollSpec::Single(_) | RollSpec::Range(..) => Some(values.remove(0).to_string()),
        };

        if values.len() != self.columns.len() {
            return Err(TableError::ColumnCountMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }

        let fields = self
            .columns
            .iter()
            .cloned()
            .zip(values.into_iter().map(str::to_string))
            .collect();
        self.push_entry(Entry {
            fields,
            weight: spec.weight()?,
            roll: label,
            first_roll: self.next_roll,
        })
    }

    fn push_entry(&mut self, entry: Entry) -> Result<(), TableError> {
        self.sampler.add(entry.weight, self.entries.len())?;
        self.next_roll += u64::from(entry.weight);
        self.entries.push(entry);
        Ok(())
    }

    fn finish(self) -> TableModel {
        TableModel {
            name: self.name,
            columns: self.columns,
            entries: self.entries,
            max_roll: self.next_roll - 1,
            sampler: self.sampler,
        }
    }
}

/// A header needs at least one column and no repeated names.
fn check_columns(columns: &[String]) -> Result<(), TableError> {
    if columns.is_empty() {
        return Err(TableError::MissingHeader);
    }
    for (i, column) in columns.iter().enumerate() {
        if columns[..i].contains(column) {
            return Err(TableError::DuplicateColumn(column.clone()));
        }
    }
    Ok(())
}

/// Split on runs of tabs, dropping empty fields.
fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split('\t')
        .map(|f| f.trim_end_matches('\r'))
        .filter(|f| !f.is_empty())
}

/// Turn a file or directory stem into a display name.
///
/// Leading digits are dropped, underscores become spaces and camel-case
/// boundaries are split: `01_GovernmentTypes` becomes `Government Types`.
pub fn display_name(raw: &str) -> String {
    let stripped = raw.trim_start_matches(|c: char| c.is_ascii_digit());
    let mut out = String::with_capacity(stripped.len() + 4);
    let mut prev: Option<char> = None;
    for c in stripped.chars() {
        if c == '_' {
            if !out.ends_with(' ') {
                out.push(' ');
            }
        } else {
            if c.is_uppercase() && prev.is_some_and(char::is_lowercase) {
                out.push(' ');
            }
            out.push(c);
        }
        prev = Some(c);
    }
    out.trim().to_string()
}
