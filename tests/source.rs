use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use pog_standings::archive;
use pog_standings::config::AppConfig;
use pog_standings::extract::ExtractReport;
use pog_standings::record::{MatchResultRecord, SeasonWindow};
use pog_standings::registry::PlayerRegistry;
use pog_standings::results_fetch::{LiveFetch, fetch_and_extract};
use pog_standings::season_config::{SeasonConfig, SeasonRegistry};
use pog_standings::source::{
    SeasonMode, SeasonSource, archive_file_name, archive_path, export_snapshot, season_mode,
};

const SEASONS: &str = r#"{
    "2024-25": {
        "start_date": "20240916",
        "end_date": "20250331",
        "teams": {
            "TeamA": {"players": ["Alice", "Bob"]},
            "TeamB": {"players": ["Carol", "Dave"]}
        }
    }
}"#;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pog_standings_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

fn season() -> SeasonConfig {
    SeasonRegistry::parse_str(SEASONS)
        .unwrap()
        .get("2024-25")
        .unwrap()
        .clone()
}

fn source(dir: &PathBuf) -> SeasonSource {
    let config = AppConfig {
        archive_dir: dir.clone(),
        cache_ttl: Duration::from_secs(60),
        ..AppConfig::default()
    };
    SeasonSource::new(&config)
}

fn record(date: &str, player: &str, owner: &str, point: f64) -> MatchResultRecord {
    MatchResultRecord {
        date: date.to_string(),
        match_index: 1,
        player: player.to_string(),
        point,
        owner: owner.to_string(),
    }
}

fn one_match() -> Vec<MatchResultRecord> {
    vec![
        record("20250101", "Alice", "TeamA", 30.5),
        record("20250101", "Bob", "TeamA", -10.0),
        record("20250101", "Carol", "TeamB", -5.5),
        record("20250101", "Dave", "TeamB", -15.0),
    ]
}

fn live(records: Vec<MatchResultRecord>) -> LiveFetch {
    LiveFetch {
        report: ExtractReport {
            matches: records.len() / 4,
            records,
            ..ExtractReport::default()
        },
        error: None,
    }
}

fn failed(err: &str) -> LiveFetch {
    LiveFetch {
        report: ExtractReport::default(),
        error: Some(err.to_string()),
    }
}

#[test]
fn archive_file_names_are_path_safe() {
    assert_eq!(archive_file_name("2024-25"), "history_2024-25.csv");
    assert_eq!(archive_file_name("2024/25"), "history_2024_25.csv");
}

#[test]
fn live_results_are_cached_until_ttl() {
    let dir = scratch_dir("cache_ttl");
    let mut source = source(&dir);
    let season = season();
    let registry = PlayerRegistry::from_season(&season).unwrap();
    let calls = Cell::new(0);
    let fetch = |_: &SeasonWindow| {
        calls.set(calls.get() + 1);
        live(one_match())
    };

    let t0 = Instant::now();
    let first = source
        .load_with("2024-25", &season, &registry, t0, fetch)
        .unwrap();
    assert_eq!(first.mode, SeasonMode::Live);
    assert!(!first.from_cache);
    assert_eq!(first.records.len(), 4);
    assert!(first.notes[0].starts_with("[INFO] 2024-25: fetched"));

    let second = source
        .load_with("2024-25", &season, &registry, t0 + Duration::from_secs(30), fetch)
        .unwrap();
    assert!(second.from_cache);
    assert!(second.notes[0].contains("cached 30s ago"));
    assert_eq!(second.records, first.records);
    assert_eq!(calls.get(), 1);

    let third = source
        .load_with("2024-25", &season, &registry, t0 + Duration::from_secs(61), fetch)
        .unwrap();
    assert!(!third.from_cache);
    assert_eq!(calls.get(), 2);
}

#[test]
fn failed_fetch_is_not_cached() {
    let dir = scratch_dir("no_cache_err");
    let mut source = source(&dir);
    let season = season();
    let registry = PlayerRegistry::from_season(&season).unwrap();
    let now = Instant::now();

    let data = source
        .load_with("2024-25", &season, &registry, now, |_| failed("timed out"))
        .unwrap();
    assert!(data.is_empty());
    assert_eq!(data.error.as_deref(), Some("timed out"));
    assert!(data.notes.iter().any(|n| n.contains("fetch failed")));

    let data = source
        .load_with("2024-25", &season, &registry, now, |_| live(one_match()))
        .unwrap();
    assert!(!data.from_cache);
    assert_eq!(data.records.len(), 4);
    assert!(data.error.is_none());
}

#[test]
fn refresh_forces_a_new_fetch() {
    let dir = scratch_dir("refresh");
    let mut source = source(&dir);
    let season = season();
    let registry = PlayerRegistry::from_season(&season).unwrap();
    let now = Instant::now();

    source
        .load_with("2024-25", &season, &registry, now, |_| live(one_match()))
        .unwrap();
    source.refresh(&season).unwrap();
    let data = source
        .load_with("2024-25", &season, &registry, now, |_| live(Vec::new()))
        .unwrap();
    assert!(!data.from_cache);
    assert!(data.is_empty());
}

#[test]
fn extractor_warnings_reach_the_notes() {
    let dir = scratch_dir("warnings");
    let mut source = source(&dir);
    let season = season();
    let registry = PlayerRegistry::from_season(&season).unwrap();
    let mut fetched = live(one_match());
    fetched
        .report
        .warnings
        .push("20250101: page labels 2 matches, paired 1".to_string());

    let data = source
        .load_with("2024-25", &season, &registry, Instant::now(), |_| fetched)
        .unwrap();
    assert!(
        data.notes
            .iter()
            .any(|n| n == "[WARN] 20250101: page labels 2 matches, paired 1")
    );
}

#[test]
fn archive_takes_precedence_over_live_fetch() {
    let dir = scratch_dir("archive_first");
    let mut source = source(&dir);
    let season = season();
    let registry = PlayerRegistry::from_season(&season).unwrap();

    let mut records = one_match();
    records.push(record("20250501", "Alice", "TeamA", 99.0));
    let bytes = archive::encode(&records, &registry).unwrap();
    fs::write(archive_path(&dir, "2024-25"), bytes).unwrap();
    assert_eq!(season_mode(&dir, "2024-25"), SeasonMode::Archived);

    let data = source
        .load_with("2024-25", &season, &registry, Instant::now(), |_| {
            panic!("archived seasons must not be fetched")
        })
        .unwrap();
    assert_eq!(data.mode, SeasonMode::Archived);
    assert_eq!(data.records.len(), 4);
    assert!(data.records.iter().all(|r| r.date == "20250101"));
    assert!(data.notes.iter().any(|n| n.contains("outside 20240916..20250331")));
}

#[test]
fn snapshot_export_writes_a_decodable_archive() {
    let dir = scratch_dir("export");
    let mut source = source(&dir);
    let season = season();
    let registry = PlayerRegistry::from_season(&season).unwrap();
    let now = Instant::now();

    let data = source
        .load_with("2024-25", &season, &registry, now, |_| live(one_match()))
        .unwrap();
    let out_dir = dir.join("exports");
    let path = export_snapshot(&data, &registry, &out_dir).unwrap();
    assert_eq!(path, out_dir.join("history_2024-25.csv"));
    let decoded = archive::decode(&fs::read(&path).unwrap(), &registry);
    assert_eq!(decoded.len(), 4);

    let mut archived = data.clone();
    archived.mode = SeasonMode::Archived;
    assert!(export_snapshot(&archived, &registry, &out_dir).is_err());

    let mut empty = data;
    empty.records.clear();
    assert!(export_snapshot(&empty, &registry, &out_dir).is_err());
}

#[test]
fn unreachable_url_yields_empty_report_with_error() {
    let season = season();
    let registry = PlayerRegistry::from_season(&season).unwrap();
    let window = season.window().unwrap();
    let fetched = fetch_and_extract("not a url", &registry, &window);
    assert!(fetched.report.records.is_empty());
    assert!(fetched.error.is_some());
}
