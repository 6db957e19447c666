use pog_standings::record::MatchResultRecord;
use pog_standings::registry::PlayerRegistry;
use pog_standings::season_config::SeasonRegistry;
use pog_standings::standings::{
    cumulative_owner_series, daily_owner_totals, match_groups, owner_standings, player_standings,
};

fn registry() -> PlayerRegistry {
    PlayerRegistry::from_pairs([
        ("Alice", "TeamA"),
        ("Bob", "TeamA"),
        ("Carol", "TeamB"),
        ("Dave", "TeamB"),
        ("Erin", "TeamC"),
    ])
    .expect("valid registry")
}

fn record(date: &str, match_index: u32, player: &str, owner: &str, point: f64) -> MatchResultRecord {
    MatchResultRecord {
        date: date.to_string(),
        match_index,
        player: player.to_string(),
        point,
        owner: owner.to_string(),
    }
}

fn sample() -> Vec<MatchResultRecord> {
    vec![
        record("20250101", 1, "Alice", "TeamA", 30.5),
        record("20250101", 1, "Bob", "TeamA", -10.0),
        record("20250101", 1, "Carol", "TeamB", -5.5),
        record("20250101", 1, "Dave", "TeamB", -15.0),
        record("20250102", 1, "Alice", "TeamA", -20.0),
        record("20250102", 1, "Carol", "TeamB", 25.1),
        record("20250102", 2, "Bob", "TeamA", 4.0),
        record("20250102", 2, "Carol", "TeamB", 0.4),
    ]
}

#[test]
fn owner_totals_include_idle_owners() {
    let rows = owner_standings(&sample(), &registry());
    let got = rows
        .iter()
        .map(|r| (r.rank, r.owner.as_str(), r.total, r.appearances))
        .collect::<Vec<_>>();
    assert_eq!(
        got,
        vec![
            (1, "TeamB", 5.0, 4),
            (2, "TeamA", 4.5, 4),
            (3, "TeamC", 0.0, 0),
        ]
    );
}

#[test]
fn equal_totals_share_a_rank_and_keep_registry_order() {
    let records = vec![
        record("20250101", 1, "Alice", "TeamA", 10.0),
        record("20250101", 1, "Carol", "TeamB", 10.0),
        record("20250101", 1, "Erin", "TeamC", -20.0),
    ];
    let rows = owner_standings(&records, &registry());
    let got = rows
        .iter()
        .map(|r| (r.rank, r.owner.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(got, vec![(1, "TeamA"), (1, "TeamB"), (3, "TeamC")]);
}

#[test]
fn owner_total_matches_sum_of_player_totals() {
    let records = sample();
    let registry = registry();
    let owners = owner_standings(&records, &registry);
    let players = player_standings(&records, &registry);
    for owner in &owners {
        let sum: f64 = players
            .iter()
            .filter(|p| p.owner == owner.owner)
            .map(|p| p.total)
            .sum();
        assert!((sum - owner.total).abs() < 1e-9, "{}", owner.owner);
    }
}

#[test]
fn player_rows_cover_the_registry() {
    let rows = player_standings(&sample(), &registry());
    assert_eq!(rows.len(), 5);
    let carol = rows.iter().find(|r| r.player == "Carol").unwrap();
    assert_eq!(carol.rank, 1);
    assert_eq!(carol.total, 20.0);
    assert_eq!(carol.matches, 3);
    assert_eq!(carol.best, Some(25.1));
    assert_eq!(carol.average(), Some(6.7));

    let erin = rows.iter().find(|r| r.player == "Erin").unwrap();
    assert_eq!(erin.matches, 0);
    assert_eq!(erin.best, None);
    assert_eq!(erin.average(), None);
    assert_eq!(erin.owner, "TeamC");
}

#[test]
fn daily_and_cumulative_totals() {
    let records = sample();
    let days = daily_owner_totals(&records);
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].date, "20250101");
    assert_eq!(days[0].totals.get("TeamA"), Some(&20.5));
    assert_eq!(days[0].totals.get("TeamB"), Some(&-20.5));
    assert_eq!(days[1].totals.get("TeamA"), Some(&-16.0));
    assert!(!days[1].totals.contains_key("TeamC"));

    let series = cumulative_owner_series(&records, &registry());
    let team_b = series.iter().find(|(owner, _)| owner == "TeamB").unwrap();
    assert_eq!(
        team_b.1,
        vec![("20250101".to_string(), -20.5), ("20250102".to_string(), 5.0)]
    );
    let team_c = series.iter().find(|(owner, _)| owner == "TeamC").unwrap();
    assert!(team_c.1.iter().all(|(_, total)| *total == 0.0));
}

#[test]
fn matches_are_grouped_newest_first() {
    let groups = match_groups(&sample());
    let uids = groups.iter().map(|g| g.match_uid.as_str()).collect::<Vec<_>>();
    assert_eq!(uids, vec!["20250102_1", "20250102_2", "20250101_1"]);
    assert_eq!(groups[2].results.len(), 4);
    assert_eq!(groups[2].results[0].0, "Alice");
}

#[test]
fn empty_records_give_zeroed_views() {
    let registry = registry();
    let owners = owner_standings(&[], &registry);
    assert_eq!(owners.len(), 3);
    assert!(owners.iter().all(|o| o.total == 0.0 && o.rank == 1));
    assert!(match_groups(&[]).is_empty());
    assert!(daily_owner_totals(&[]).is_empty());
}

#[test]
fn owner_colors_come_from_season_config() {
    let seasons = SeasonRegistry::parse_str(
        r##"{
            "2024-25": {
                "start_date": "20240916",
                "end_date": "20250331",
                "teams": {
                    "TeamA": {"color": "#ff0000", "players": ["Alice"]},
                    "TeamB": {"players": ["Carol"]}
                }
            }
        }"##,
    )
    .expect("valid config");
    let registry = PlayerRegistry::from_season(seasons.get("2024-25").unwrap()).unwrap();
    let rows = owner_standings(&[record("20250101", 1, "Alice", "TeamA", 1.0)], &registry);
    assert_eq!(rows[0].color.as_deref(), Some("#ff0000"));
    assert_eq!(rows[1].color, None);
}
