//! Periodic-table CSV provider.
//!
//! Reads the element table, drops the placeholder element and moves the
//! f-block below the main table so every synthesizable row has a positive
//! period and group. Rows are returned unvalidated; the batch driver decides
//! what is usable.

use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::element::ElementRow;
use crate::error::ProviderError;

/// Symbols that are never rendered.
const PLACEHOLDER_SYMBOLS: &[&str] = &["Uue"];

/// Groups handed to relocated f-block rows start here.
const RELOCATED_FIRST_GROUP: u32 = 4;

/// Rows without a group move this many periods down.
const RELOCATED_PERIOD_OFFSET: u32 = 3;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    atomic_number: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    block: Option<String>,
}

/// Lenient positive-integer cell: `"6"`, `" 6 "` and `"6.0"` all read as 6.
fn parse_count(cell: Option<&str>) -> Option<u32> {
    let cell = cell?.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(v) = cell.parse::<u32>() {
        return Some(v);
    }
    let v = cell.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

fn non_empty(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Read rows from any CSV source with a header line.
///
/// Only an unreadable source or header is an error. A record that fails to
/// decode, or has no usable atomic number, is skipped with a warning naming
/// its line.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<ElementRow>, ProviderError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    csv.headers()?;

    let mut rows = Vec::new();
    for (index, record) in csv.deserialize::<CsvRow>().enumerate() {
        // Header is line 1, so data row `index` sits on line `index + 2`.
        let line = index + 2;
        let raw = match record {
            Ok(raw) => raw,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                let line = e.position().map_or(line as u64, |p| p.line());
                warn!("skipping table line {line}: {e}");
                continue;
            }
        };
        let Some(atomic_number) = parse_count(raw.atomic_number.as_deref()).filter(|&n| n > 0)
        else {
            warn!("skipping table line {line}: no usable atomic_number");
            continue;
        };
        rows.push(ElementRow {
            atomic_number,
            symbol: non_empty(raw.symbol),
            name: non_empty(raw.name),
            period: parse_count(raw.period.as_deref()),
            group: parse_count(raw.group.as_deref()),
            block: non_empty(raw.block),
        });
    }
    Ok(rows)
}

pub fn read_path(path: &Path) -> Result<Vec<ElementRow>, ProviderError> {
    let file = std::fs::File::open(path).map_err(|source| ProviderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_rows(std::io::BufReader::new(file))
}

/// Drop placeholder elements.
pub fn clean(rows: Vec<ElementRow>) -> Vec<ElementRow> {
    rows.into_iter()
        .filter(|r| {
            !r.symbol
                .as_deref()
                .is_some_and(|s| PLACEHOLDER_SYMBOLS.contains(&s))
        })
        .collect()
}

fn is_f_block(row: &ElementRow) -> bool {
    row.block
        .as_deref()
        .is_some_and(|b| b.trim().to_ascii_lowercase().starts_with('f'))
}

/// Move the f-block below the main table.
///
/// f-block rows of periods 6 and 7 sitting past group 2 lose their group.
/// Every row without a group (or with group 0) then moves three periods
/// down and is numbered 4, 5, 6, … in table order within its new period.
pub fn relocate_f_block(rows: &mut [ElementRow]) {
    for row in rows.iter_mut() {
        if matches!(row.period, Some(6 | 7)) && row.group.is_some_and(|g| g > 2) && is_f_block(row) {
            row.group = None;
        }
    }

    let mut next_group: HashMap<Option<u32>, u32> = HashMap::new();
    for row in rows.iter_mut() {
        if row.group.is_some_and(|g| g > 0) {
            continue;
        }
        row.period = row.period.map(|p| p + RELOCATED_PERIOD_OFFSET);
        let slot = next_group.entry(row.period).or_insert(RELOCATED_FIRST_GROUP);
        row.group = Some(*slot);
        *slot += 1;
    }
}

/// Read, clean and lay out the table in one step.
pub fn load(path: &Path) -> Result<Vec<ElementRow>, ProviderError> {
    let mut rows = clean(read_path(path)?);
    relocate_f_block(&mut rows);
    Ok(rows)
}
