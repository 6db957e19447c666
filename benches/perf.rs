use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use pog_standings::archive;
use pog_standings::extract::extract_html;
use pog_standings::record::{MatchResultRecord, SeasonWindow};
use pog_standings::registry::PlayerRegistry;
use pog_standings::standings::{match_groups, owner_standings, player_standings};

fn registry() -> PlayerRegistry {
    PlayerRegistry::from_pairs([
        ("Alice", "TeamA"),
        ("Bob", "TeamA"),
        ("Carol", "TeamB"),
        ("Dave", "TeamB"),
        ("Erin", "TeamC"),
        ("Frank", "TeamC"),
        ("Grace", "TeamD"),
        ("Heidi", "TeamD"),
    ])
    .expect("valid registry")
}

fn window() -> SeasonWindow {
    SeasonWindow::new("20240916", "20250331").expect("valid window")
}

// A full season: ~120 match days, two matches each.
fn season_records(registry: &PlayerRegistry) -> Vec<MatchResultRecord> {
    let players = registry.players_sorted();
    let mut out = Vec::new();
    let mut day = chrono::NaiveDate::from_ymd_opt(2024, 10, 1).expect("valid date");
    for d in 0..120u32 {
        let date = day.format("%Y%m%d").to_string();
        for match_index in 1..=2u32 {
            let offset = (d as usize + match_index as usize) % players.len();
            for seat in 0..4usize {
                let player = &players[(offset + seat * 2) % players.len()];
                let point = [45.3, 12.1, -17.8, -39.6][seat];
                out.push(MatchResultRecord {
                    date: date.clone(),
                    match_index,
                    player: player.clone(),
                    point,
                    owner: registry.owner_of(player).unwrap_or_default().to_string(),
                });
            }
        }
        day = day.succ_opt().expect("next day");
    }
    out
}

fn bench_extract_fixture(c: &mut Criterion) {
    let registry = registry();
    let window = window();
    c.bench_function("extract_fixture_page", |b| {
        b.iter(|| {
            let report = extract_html(black_box(RESULTS_HTML), &registry, &window);
            black_box(report.records.len());
        })
    });
}

fn bench_archive_encode(c: &mut Criterion) {
    let registry = registry();
    let records = season_records(&registry);
    c.bench_function("archive_encode_season", |b| {
        b.iter(|| {
            let bytes = archive::encode(black_box(&records), &registry).unwrap();
            black_box(bytes.len());
        })
    });
}

fn bench_archive_decode(c: &mut Criterion) {
    let registry = registry();
    let bytes = archive::encode(&season_records(&registry), &registry).unwrap();
    c.bench_function("archive_decode_season", |b| {
        b.iter(|| {
            let records = archive::decode(black_box(&bytes), &registry);
            black_box(records.len());
        })
    });
}

fn bench_standings(c: &mut Criterion) {
    let registry = registry();
    let records = season_records(&registry);
    c.bench_function("standings_rollup", |b| {
        b.iter(|| {
            let owners = owner_standings(black_box(&records), &registry);
            let players = player_standings(&records, &registry);
            let groups = match_groups(&records);
            black_box((owners.len(), players.len(), groups.len()));
        })
    });
}

criterion_group!(
    perf,
    bench_extract_fixture,
    bench_archive_encode,
    bench_archive_decode,
    bench_standings
);
criterion_main!(perf);

static RESULTS_HTML: &str = include_str!("../tests/fixtures/results_page.html");
