//! Results page -> match records.
//!
//! The page markup drifts between seasons, so the primary anchor is any
//! element whose `id` embeds an 8-digit date. Inside each anchor the text is
//! flattened into name/point tokens and paired by adjacency. A class-based
//! structural pass runs alongside as a cross-check and must agree on
//! well-formed pages.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::record::{
    MATCH_SIZE, MatchResultRecord, SeasonWindow, SkipReason, normalize_date, point_tenths,
};
use crate::registry::PlayerRegistry;

/// Points beyond this are seat scores, carry-overs or other page numbers.
pub const MAX_ABS_POINT: f64 = 150.0;

static DATE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{8}").expect("valid date regex"));
static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("valid numeric regex"));
static MATCH_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"第\s*(\d+)\s*試合|(\d+)\s*試合目|(?i:game)\s*(\d+)").expect("valid label regex")
});
static ID_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[id]").expect("valid id selector"));

const NEGATIVE_MARKERS: [char; 4] = ['▲', '−', '－', '△'];
const POINT_SUFFIXES: [&str; 6] = ["ポイント", "points", "point", "pts", "pt", "p"];

/// Class selectors for the structural pass. Name and point elements are
/// zipped positionally.
#[derive(Debug, Clone)]
pub struct StructuralSelectors {
    pub name: Selector,
    pub point: Selector,
}

impl Default for StructuralSelectors {
    fn default() -> Self {
        Self {
            name: Selector::parse(r#"[class*="name"]"#).expect("valid name selector"),
            point: Selector::parse(r#"[class*="point"]"#).expect("valid point selector"),
        }
    }
}

impl StructuralSelectors {
    pub fn parse(name: &str, point: &str) -> Option<Self> {
        Some(Self {
            name: Selector::parse(name).ok()?,
            point: Selector::parse(point).ok()?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    pub records: Vec<MatchResultRecord>,
    pub containers_seen: usize,
    pub containers_outside_window: usize,
    pub matches: usize,
    pub incomplete_chunks: usize,
    pub duplicate_pairs: usize,
    pub duplicate_matches: usize,
    pub warnings: Vec<String>,
}

impl ExtractReport {
    pub fn summary(&self) -> String {
        format!(
            "{} matches / {} records from {} containers ({} outside season, {} incomplete, {} duplicate)",
            self.matches,
            self.records.len(),
            self.containers_seen,
            self.containers_outside_window,
            self.incomplete_chunks,
            self.duplicate_matches + self.duplicate_pairs
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Pair {
    player: String,
    point: f64,
}

impl Pair {
    fn same_as(&self, other: &Pair) -> bool {
        self.player == other.player && point_tenths(self.point) == point_tenths(other.point)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Point(f64),
}

#[derive(Debug, Default)]
struct ContainerScan {
    tokens: Vec<Token>,
    labels: BTreeSet<u32>,
}

#[derive(Debug, Default)]
struct Chunking {
    chunks: Vec<Vec<Pair>>,
    incomplete: usize,
    duplicate_pairs: usize,
}

pub fn extract(
    document: &Html,
    registry: &PlayerRegistry,
    window: &SeasonWindow,
) -> Vec<MatchResultRecord> {
    extract_with_report(document, registry, window).records
}

pub fn extract_html(
    raw: &str,
    registry: &PlayerRegistry,
    window: &SeasonWindow,
) -> ExtractReport {
    let document = Html::parse_document(raw);
    extract_with_report(&document, registry, window)
}

pub fn extract_with_report(
    document: &Html,
    registry: &PlayerRegistry,
    window: &SeasonWindow,
) -> ExtractReport {
    extract_with_selectors(document, registry, window, &StructuralSelectors::default())
}

pub fn extract_with_selectors(
    document: &Html,
    registry: &PlayerRegistry,
    window: &SeasonWindow,
    selectors: &StructuralSelectors,
) -> ExtractReport {
    let mut report = ExtractReport::default();
    // date -> complete chunks in document order
    let mut by_date: BTreeMap<String, Vec<Vec<Pair>>> = BTreeMap::new();

    for DateContainer {
        element,
        date,
        inner,
    } in date_containers(document)
    {
        report.containers_seen += 1;
        if !window.contains(&date) {
            report.containers_outside_window += 1;
            continue;
        }

        let scan = scan_container(element, &inner, registry);
        let chunking = chunk_pairs(pair_tokens(&scan.tokens));
        report.incomplete_chunks += chunking.incomplete;
        report.duplicate_pairs += chunking.duplicate_pairs;

        let structural = chunk_pairs(structural_pairs(element, &inner, registry, selectors));
        if !structural.chunks.is_empty() && !same_chunks(&structural.chunks, &chunking.chunks) {
            report.warnings.push(format!(
                "{date}: structural selectors found {} matches, adjacency found {}; using adjacency",
                structural.chunks.len(),
                chunking.chunks.len()
            ));
        }

        if !scan.labels.is_empty() && scan.labels.len() != chunking.chunks.len() {
            report.warnings.push(format!(
                "{date}: page labels {} matches, paired {}",
                scan.labels.len(),
                chunking.chunks.len()
            ));
        }

        let day = by_date.entry(date).or_default();
        for chunk in chunking.chunks {
            if day.iter().any(|seen| same_match(seen, &chunk)) {
                report.duplicate_matches += 1;
                continue;
            }
            day.push(chunk);
        }
    }

    let mut seen = HashSet::new();
    for (date, chunks) in by_date {
        for (idx, chunk) in chunks.into_iter().enumerate() {
            report.matches += 1;
            let match_index = idx as u32 + 1;
            for pair in chunk {
                let Some(owner) = registry.owner_of(&pair.player) else {
                    continue;
                };
                let record = MatchResultRecord {
                    date: date.clone(),
                    match_index,
                    player: pair.player,
                    point: pair.point,
                    owner: owner.to_string(),
                };
                if seen.insert(record.key()) {
                    report.records.push(record);
                }
            }
        }
    }

    report
}

struct DateContainer<'a> {
    element: ElementRef<'a>,
    date: String,
    /// Date anchors nested inside `element`; their subtrees belong to them.
    inner: Vec<ElementRef<'a>>,
}

/// Every element whose `id` carries a valid `YYYYMMDD` run, in document
/// order. A wrapping anchor keeps only the text outside its nested anchors,
/// so each match is attributed to its most specific date.
fn date_containers(document: &Html) -> Vec<DateContainer<'_>> {
    let anchors = document
        .select(&ID_SELECTOR)
        .filter_map(|el| {
            let id = el.value().id()?;
            let date = id_date(id)?;
            Some((el, date))
        })
        .collect::<Vec<_>>();

    anchors
        .iter()
        .map(|(element, date)| DateContainer {
            element: *element,
            date: date.clone(),
            inner: anchors
                .iter()
                .map(|(other, _)| *other)
                .filter(|other| {
                    other.id() != element.id() && other.ancestors().any(|a| a.id() == element.id())
                })
                .collect(),
        })
        .collect()
}

fn under_inner_anchor(el: ElementRef<'_>, inner: &[ElementRef<'_>]) -> bool {
    inner
        .iter()
        .any(|anchor| el.id() == anchor.id() || el.ancestors().any(|a| a.id() == anchor.id()))
}

fn id_date(id: &str) -> Option<String> {
    DATE_RUN
        .find_iter(id)
        .find_map(|m| normalize_date(m.as_str()))
}

fn scan_container(
    container: ElementRef<'_>,
    inner: &[ElementRef<'_>],
    registry: &PlayerRegistry,
) -> ContainerScan {
    let mut scan = ContainerScan::default();
    let mut pending_negative = false;

    for node in container.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if matches!(parent.value().name(), "script" | "style" | "noscript") {
            continue;
        }
        if under_inner_anchor(parent, inner) {
            continue;
        }
        let raw: &str = text;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(name) = registry.lookup(trimmed) {
            scan.tokens.push(Token::Name(name.to_string()));
            pending_negative = false;
            continue;
        }

        for caps in MATCH_LABEL.captures_iter(trimmed) {
            let n = caps
                .iter()
                .skip(1)
                .flatten()
                .find_map(|m| m.as_str().parse::<u32>().ok());
            if let Some(n) = n {
                scan.labels.insert(n);
            }
        }

        if is_sign_only(trimmed) {
            pending_negative = trimmed.chars().any(|c| c == '-' || NEGATIVE_MARKERS.contains(&c));
            continue;
        }

        if let Ok(point) = parse_point_token(trimmed) {
            let point = if pending_negative && point > 0.0 {
                -point
            } else {
                point
            };
            scan.tokens.push(Token::Point(point));
            pending_negative = false;
            continue;
        }
        pending_negative = false;

        // "Alice +30.5" or "Alice+30.5" in a single text node.
        for part in trimmed.split_whitespace() {
            if let Some(name) = registry.lookup(part) {
                scan.tokens.push(Token::Name(name.to_string()));
            } else if let Ok(point) = parse_point_token(part) {
                scan.tokens.push(Token::Point(point));
            } else if let Some((name, rest)) = registry.split_name_prefix(part)
                && let Ok(point) = parse_point_token(rest)
            {
                scan.tokens.push(Token::Name(name.to_string()));
                scan.tokens.push(Token::Point(point));
            }
        }
    }

    scan
}

fn is_sign_only(s: &str) -> bool {
    let mut chars = s.chars().filter(|c| !c.is_whitespace());
    match (chars.next(), chars.next()) {
        (Some(c), None) => c == '+' || c == '-' || c == '＋' || NEGATIVE_MARKERS.contains(&c),
        _ => false,
    }
}

/// Parse one point-like text token. Decorative minus glyphs, a trailing
/// "pt"-style suffix and internal spaces are removed first.
pub fn parse_point_token(raw: &str) -> Result<f64, SkipReason> {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_whitespace() {
            continue;
        }
        let c = match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '．' => '.',
            '＋' => '+',
            c if NEGATIVE_MARKERS.contains(&c) => '-',
            c => c,
        };
        cleaned.push(c);
    }
    if cleaned.is_empty() {
        return Err(SkipReason::Blank);
    }

    let lower = cleaned.to_lowercase();
    let mut body = lower.as_str();
    for suffix in POINT_SUFFIXES {
        if let Some(stripped) = body.strip_suffix(suffix) {
            body = stripped;
            break;
        }
    }
    if !NUMERIC.is_match(body) {
        return Err(SkipReason::NotANumber);
    }
    let value = body.parse::<f64>().map_err(|_| SkipReason::NotANumber)?;
    if !value.is_finite() || value.abs() > MAX_ABS_POINT {
        return Err(SkipReason::OutOfRange);
    }
    Ok(value)
}

fn pair_tokens(tokens: &[Token]) -> Vec<Pair> {
    let mut pairs = Vec::new();
    let mut idx = 0;
    while idx < tokens.len() {
        if let (Token::Name(player), Some(Token::Point(point))) = (&tokens[idx], tokens.get(idx + 1))
        {
            pairs.push(Pair {
                player: player.clone(),
                point: *point,
            });
            idx += 2;
        } else {
            idx += 1;
        }
    }
    pairs
}

fn structural_pairs(
    container: ElementRef<'_>,
    inner: &[ElementRef<'_>],
    registry: &PlayerRegistry,
    selectors: &StructuralSelectors,
) -> Vec<Pair> {
    let names = leaf_texts(container, inner, &selectors.name);
    let points = leaf_texts(container, inner, &selectors.point);
    names
        .iter()
        .zip(points.iter())
        .filter_map(|(name, point)| {
            let player = registry.lookup(name)?;
            let point = parse_point_token(point).ok()?;
            Some(Pair {
                player: player.to_string(),
                point,
            })
        })
        .collect()
}

// Only elements without child elements, so wrapper classes like
// "player-name-box" do not double-count their inner label.
fn leaf_texts(
    container: ElementRef<'_>,
    inner: &[ElementRef<'_>],
    selector: &Selector,
) -> Vec<String> {
    container
        .select(selector)
        .filter(|el| !el.children().any(|child| child.value().is_element()))
        .filter(|el| !under_inner_anchor(*el, inner))
        .map(|el| el.text().collect::<String>())
        .collect()
}

/// Cut the pair stream into matches of four. A repeated pair (same node
/// matched twice) is skipped; a player reappearing with a different point
/// abandons the partial match.
///
/// Right after a match closes, a repeat of its last pair is ambiguous: the
/// next match may open with the same seat and point. It counts as a
/// duplicate only when the stream ends there or the following pair is
/// doubled as well.
fn chunk_pairs(pairs: Vec<Pair>) -> Chunking {
    let mut out = Chunking::default();
    let mut current: Vec<Pair> = Vec::with_capacity(MATCH_SIZE);
    let mut last: Option<&Pair> = None;

    for (idx, pair) in pairs.iter().enumerate() {
        if let Some(prev) = last
            && prev.same_as(pair)
            && (!current.is_empty() || doubled_from(&pairs, idx + 1))
        {
            out.duplicate_pairs += 1;
            continue;
        }
        if let Some(existing) = current.iter().find(|p| p.player == pair.player) {
            if existing.same_as(pair) {
                out.duplicate_pairs += 1;
                continue;
            }
            out.incomplete += 1;
            current.clear();
        }
        last = Some(pair);
        current.push(pair.clone());
        if current.len() == MATCH_SIZE {
            out.chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.incomplete += 1;
    }
    out
}

fn doubled_from(pairs: &[Pair], idx: usize) -> bool {
    match (pairs.get(idx), pairs.get(idx + 1)) {
        (None, _) => true,
        (Some(a), Some(b)) => a.same_as(b),
        (Some(_), None) => false,
    }
}

fn match_signature(chunk: &[Pair]) -> Vec<(&str, i64)> {
    let mut sig = chunk
        .iter()
        .map(|p| (p.player.as_str(), point_tenths(p.point)))
        .collect::<Vec<_>>();
    sig.sort();
    sig
}

fn same_match(a: &[Pair], b: &[Pair]) -> bool {
    match_signature(a) == match_signature(b)
}

fn same_chunks(a: &[Vec<Pair>], b: &[Vec<Pair>]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| same_match(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_tokens_strip_decoration() {
        assert_eq!(parse_point_token("+30.5pt"), Ok(30.5));
        assert_eq!(parse_point_token("▲10.0"), Ok(-10.0));
        assert_eq!(parse_point_token("- 5.5 pt"), Ok(-5.5));
        assert_eq!(parse_point_token("＋１２．３"), Ok(12.3));
        assert_eq!(parse_point_token("42.1ポイント"), Ok(42.1));
    }

    #[test]
    fn point_tokens_reject_noise() {
        assert_eq!(parse_point_token("   "), Err(SkipReason::Blank));
        assert_eq!(parse_point_token("1位"), Err(SkipReason::NotANumber));
        assert_eq!(parse_point_token("45,300"), Err(SkipReason::NotANumber));
        assert_eq!(parse_point_token("45300"), Err(SkipReason::OutOfRange));
        assert_eq!(parse_point_token("-150.1"), Err(SkipReason::OutOfRange));
        assert_eq!(parse_point_token("150"), Ok(150.0));
    }

    #[test]
    fn id_date_requires_a_real_date() {
        assert_eq!(id_date("js-modal-20250101").as_deref(), Some("20250101"));
        assert_eq!(id_date("game-2025010112").as_deref(), Some("20250101"));
        assert_eq!(id_date("row-12345678"), None);
        assert_eq!(id_date("header"), None);
    }

    fn pair(player: &str, point: f64) -> Pair {
        Pair {
            player: player.to_string(),
            point,
        }
    }

    #[test]
    fn chunking_drops_trailing_remainder() {
        let out = chunk_pairs(vec![
            pair("A", 1.0),
            pair("B", 2.0),
            pair("C", 3.0),
            pair("D", -6.0),
            pair("A", 5.0),
            pair("B", -5.0),
        ]);
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.incomplete, 1);
    }

    #[test]
    fn chunking_skips_repeated_pairs() {
        let out = chunk_pairs(vec![
            pair("A", 1.0),
            pair("A", 1.0),
            pair("B", 2.0),
            pair("C", 3.0),
            pair("B", 2.0),
            pair("D", -6.0),
            pair("D", -6.0),
        ]);
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.duplicate_pairs, 3);
        assert_eq!(out.incomplete, 0);
    }

    #[test]
    fn next_match_may_open_with_the_closing_pair() {
        let out = chunk_pairs(vec![
            pair("A", 1.0),
            pair("B", 2.0),
            pair("C", 3.0),
            pair("D", -6.0),
            pair("D", -6.0),
            pair("E", 2.0),
            pair("F", 1.0),
            pair("G", 3.0),
        ]);
        assert_eq!(out.chunks.len(), 2);
        assert_eq!(out.chunks[1][0], pair("D", -6.0));
        assert_eq!(out.duplicate_pairs, 0);
        assert_eq!(out.incomplete, 0);
    }

    #[test]
    fn doubled_pairs_across_a_match_boundary_are_skipped() {
        let out = chunk_pairs(vec![
            pair("A", 1.0),
            pair("B", 2.0),
            pair("C", 3.0),
            pair("D", -6.0),
            pair("D", -6.0),
            pair("E", 2.0),
            pair("E", 2.0),
            pair("F", 1.0),
            pair("G", 3.0),
            pair("H", -6.0),
        ]);
        assert_eq!(out.chunks.len(), 2);
        assert_eq!(out.chunks[1][0], pair("E", 2.0));
        assert_eq!(out.duplicate_pairs, 2);
        assert_eq!(out.incomplete, 0);
    }

    #[test]
    fn pairing_needs_adjacent_point() {
        let pairs = pair_tokens(&[
            Token::Name("A".to_string()),
            Token::Name("B".to_string()),
            Token::Point(3.0),
            Token::Point(4.0),
        ]);
        assert_eq!(pairs, vec![pair("B", 3.0)]);
    }
}
