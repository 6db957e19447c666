//! Season archive CSV matrix.
//!
//! Row 0: date per column (`YYYY/MM/DD`, may be sparse when hand-edited).
//! Row 1: match index per column.
//! Row 2+: player name, then that player's point per column or empty.
//!
//! Written as UTF-8 with a BOM. Files saved by spreadsheet tools in the
//! Japanese locale arrive as cp932 and are read back as Shift_JIS.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, WriterBuilder};
use encoding_rs::SHIFT_JIS;

use crate::record::{
    MatchResultRecord, SkipReason, normalize_date, parse_date, round_point, skip_reason_label,
};
use crate::registry::PlayerRegistry;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Default)]
pub struct DecodeReport {
    pub records: Vec<MatchResultRecord>,
    pub columns: usize,
    pub rows_read: usize,
    pub rows_skipped: BTreeMap<SkipReason, usize>,
    pub cells_skipped: BTreeMap<SkipReason, usize>,
}

impl DecodeReport {
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "{} records from {} rows x {} columns",
            self.records.len(),
            self.rows_read,
            self.columns
        )];
        for (reason, count) in &self.rows_skipped {
            parts.push(format!("{count} rows {}", skip_reason_label(*reason)));
        }
        for (reason, count) in &self.cells_skipped {
            if *reason == SkipReason::Blank {
                continue;
            }
            parts.push(format!("{count} cells {}", skip_reason_label(*reason)));
        }
        parts.join(", ")
    }
}

/// Encode records as the two-header-row matrix. Every registered player gets
/// a row, sorted by name. Two records for the same (date, match, player)
/// are a caller error; the later one wins.
pub fn encode(records: &[MatchResultRecord], registry: &PlayerRegistry) -> Result<Vec<u8>> {
    let mut columns: BTreeSet<(String, u32)> = BTreeSet::new();
    let mut values: HashMap<(&str, &str, u32), f64> = HashMap::new();
    for record in records {
        if !registry.contains(&record.player) {
            continue;
        }
        columns.insert((record.date.clone(), record.match_index));
        values.insert(
            (record.player.as_str(), record.date.as_str(), record.match_index),
            record.point,
        );
    }

    let mut buf = UTF8_BOM.to_vec();
    {
        let mut writer = WriterBuilder::new().from_writer(&mut buf);

        let mut dates_row = vec![String::new()];
        let mut match_row = vec![String::new()];
        for (date, match_index) in &columns {
            let label = parse_date(date)
                .map(|d| d.format("%Y/%m/%d").to_string())
                .ok_or_else(|| anyhow!("record date {date} is not YYYYMMDD"))?;
            dates_row.push(label);
            match_row.push(match_index.to_string());
        }
        writer.write_record(&dates_row).context("write date row")?;
        writer.write_record(&match_row).context("write match row")?;

        for player in registry.players_sorted() {
            let mut row = Vec::with_capacity(columns.len() + 1);
            row.push(player.clone());
            for (date, match_index) in &columns {
                let cell = values
                    .get(&(player.as_str(), date.as_str(), *match_index))
                    .map(|point| format!("{:.1}", round_point(*point)))
                    .unwrap_or_default();
                row.push(cell);
            }
            writer
                .write_record(&row)
                .with_context(|| format!("write row for {player}"))?;
        }
        writer.flush().context("flush archive csv")?;
    }
    Ok(buf)
}

pub fn decode(bytes: &[u8], registry: &PlayerRegistry) -> Vec<MatchResultRecord> {
    decode_with_report(bytes, registry).records
}

/// Best-effort import. Bad rows and cells are counted and skipped; nothing
/// here fails the whole file.
pub fn decode_with_report(bytes: &[u8], registry: &PlayerRegistry) -> DecodeReport {
    let mut report = DecodeReport::default();
    let text = decode_text(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let rows = reader
        .records()
        .filter_map(|row| row.ok())
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    if rows.len() < 2 {
        return report;
    }

    let dates_row = &rows[0];
    let match_row = &rows[1];
    report.columns = dates_row.len().max(match_row.len()).saturating_sub(1);

    for row in &rows[2..] {
        report.rows_read += 1;
        let player = match resolve_player(row.first().map(|s| s.as_str()), registry) {
            Ok(player) => player,
            Err(reason) => {
                *report.rows_skipped.entry(reason).or_insert(0) += 1;
                continue;
            }
        };
        let Some(owner) = registry.owner_of(player) else {
            continue;
        };

        for (col, cell) in row.iter().enumerate().skip(1) {
            let point = match parse_point_cell(cell) {
                Ok(point) => point,
                Err(reason) => {
                    *report.cells_skipped.entry(reason).or_insert(0) += 1;
                    continue;
                }
            };
            let Some(date) = carry_left_date(dates_row, col).and_then(normalize_date) else {
                *report.cells_skipped.entry(SkipReason::BadDate).or_insert(0) += 1;
                continue;
            };
            let match_index = match_row
                .get(col)
                .map(|cell| parse_match_index(cell))
                .unwrap_or(1);

            report.records.push(MatchResultRecord {
                date,
                match_index,
                player: player.to_string(),
                point,
                owner: owner.to_string(),
            });
        }
    }

    report
}

fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    if let Some(utf8) = bytes.strip_prefix(UTF8_BOM) {
        return String::from_utf8_lossy(utf8);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => SHIFT_JIS.decode_without_bom_handling(bytes).0,
    }
}

fn resolve_player<'a>(
    cell: Option<&str>,
    registry: &'a PlayerRegistry,
) -> Result<&'a str, SkipReason> {
    let name = cell.map(str::trim).unwrap_or_default();
    if name.is_empty() || name.eq_ignore_ascii_case("nan") {
        return Err(SkipReason::Blank);
    }
    registry.lookup(name).ok_or(SkipReason::UnknownPlayer)
}

/// Nearest non-empty date cell at or left of `col` (column 0 is the name
/// column and never holds a date).
fn carry_left_date(dates_row: &[String], col: usize) -> Option<&str> {
    (1..=col)
        .rev()
        .filter_map(|c| dates_row.get(c))
        .map(|cell| cell.trim())
        .find(|cell| !cell.is_empty())
}

fn parse_point_cell(cell: &str) -> Result<f64, SkipReason> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Err(SkipReason::Blank);
    }
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| SkipReason::NotANumber)?;
    if !value.is_finite() {
        return Err(SkipReason::NotANumber);
    }
    Ok(value)
}

/// "2", "2.0", "第2試合" -> 2. Anything else falls back to 1.
fn parse_match_index(cell: &str) -> u32 {
    let trimmed = cell.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return n.max(1);
    }
    if let Ok(f) = trimmed.parse::<f64>()
        && f.is_finite()
        && f >= 1.0
        && f.fract() == 0.0
    {
        return f as u32;
    }
    let digits = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>();
    digits
        .parse::<u32>()
        .ok()
        .filter(|n| *n >= 1)
        .unwrap_or(1)
}
