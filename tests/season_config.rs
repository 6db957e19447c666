use std::fs;
use std::path::PathBuf;

use pog_standings::registry::PlayerRegistry;
use pog_standings::season_config::SeasonRegistry;

const TWO_SEASONS: &str = r##"{
    "2025-26": {
        "start_date": "2025/09/15",
        "end_date": "20260331",
        "teams": {
            "Aoki": {"color": "#e74c3c", "players": ["Alice", "Bob"]},
            "Baba": {"color": "#3498db", "players": ["Carol"]}
        }
    },
    "2024-25": {
        "start_date": "20240916",
        "end_date": "20250331",
        "teams": {
            "Aoki": {"players": ["Dave"]}
        }
    }
}"##;

#[test]
fn seasons_parse_and_sort_by_label() {
    let seasons = SeasonRegistry::parse_str(TWO_SEASONS).expect("valid config");
    assert_eq!(seasons.len(), 2);
    assert_eq!(seasons.labels(), vec!["2024-25", "2025-26"]);
    assert_eq!(seasons.latest_label(), Some("2025-26"));

    let current = seasons.get("2025-26").unwrap();
    let window = current.window().unwrap();
    assert_eq!(window.start_date, "20250915");
    assert_eq!(window.end_date, "20260331");
    assert!(seasons.get("2019-20").is_none());
}

#[test]
fn registry_from_season_maps_players_to_owners() {
    let seasons = SeasonRegistry::parse_str(TWO_SEASONS).unwrap();
    let registry = PlayerRegistry::from_season(seasons.get("2025-26").unwrap()).unwrap();
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.owner_of("Bob"), Some("Aoki"));
    assert_eq!(registry.owner_of("Carol"), Some("Baba"));
    assert_eq!(registry.owner_of("Dave"), None);
    assert_eq!(registry.players_of("Aoki"), vec!["Alice", "Bob"]);
    assert_eq!(registry.color_of("Baba"), Some("#3498db"));
}

#[test]
fn empty_or_broken_config_is_an_error() {
    assert!(SeasonRegistry::parse_str("").is_err());
    assert!(SeasonRegistry::parse_str("   \n").is_err());
    assert!(SeasonRegistry::parse_str("{}").is_err());
    assert!(SeasonRegistry::parse_str("{\"2024-25\": ").is_err());
}

#[test]
fn reversed_or_invalid_window_is_rejected() {
    let reversed = r#"{"x": {"start_date": "20250331", "end_date": "20240916"}}"#;
    assert!(SeasonRegistry::parse_str(reversed).is_err());
    let bogus = r#"{"x": {"start_date": "20241340", "end_date": "20250331"}}"#;
    assert!(SeasonRegistry::parse_str(bogus).is_err());
}

#[test]
fn player_under_two_owners_is_rejected() {
    let raw = r#"{
        "2024-25": {
            "start_date": "20240916",
            "end_date": "20250331",
            "teams": {
                "Aoki": {"players": ["Alice"]},
                "Baba": {"players": ["Alice"]}
            }
        }
    }"#;
    let seasons = SeasonRegistry::parse_str(raw).unwrap();
    let err = PlayerRegistry::from_season(seasons.get("2024-25").unwrap()).unwrap_err();
    assert!(err.to_string().contains("Alice"));
}

#[test]
fn missing_file_names_the_path() {
    let path = PathBuf::from("does/not/exist/seasons.json");
    let err = SeasonRegistry::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("does/not/exist/seasons.json"));
}

#[test]
fn bundled_config_loads() {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("config");
    path.push("seasons.json");
    assert!(fs::metadata(&path).is_ok());
    let seasons = SeasonRegistry::load(&path).expect("bundled seasons load");
    for label in seasons.labels() {
        let season = seasons.get(&label).unwrap();
        let registry = PlayerRegistry::from_season(season).expect("bundled registry");
        assert!(!registry.is_empty(), "{label}");
    }
}
