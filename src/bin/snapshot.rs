use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};

use pog_standings::archive;
use pog_standings::config::AppConfig;
use pog_standings::registry::PlayerRegistry;
use pog_standings::season_config::SeasonRegistry;
use pog_standings::source::{SeasonSource, archive_file_name, mode_label};
use pog_standings::standings;

fn main() -> Result<()> {
    let config = AppConfig::from_env();
    let seasons = SeasonRegistry::load(&config.seasons_path)?;

    let label = parse_arg("--season")
        .or_else(|| config.initial_season.clone())
        .or_else(|| seasons.latest_label().map(|s| s.to_string()))
        .context("unable to resolve season label")?;
    let season = seasons
        .get(&label)
        .ok_or_else(|| anyhow!("season {label} not in {}", config.seasons_path.display()))?;
    let registry = PlayerRegistry::from_season(season)?;

    let mut source = SeasonSource::new(&config);
    let data = source.load(&label, season, &registry, Instant::now())?;
    for note in &data.notes {
        println!("{note}");
    }
    if let Some(err) = &data.error {
        return Err(anyhow!("no data for {label}: {err}"));
    }
    if data.records.is_empty() {
        return Err(anyhow!("no records for {label}"));
    }

    let out = parse_arg("--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.export_dir.join(archive_file_name(&label)));
    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let bytes = archive::encode(&data.records, &registry)?;
    fs::write(&out, bytes).with_context(|| format!("write {}", out.display()))?;

    println!("Snapshot complete");
    println!("Season: {label} ({})", mode_label(data.mode));
    println!("Window: {}", data.window);
    println!("Records: {}", data.records.len());
    println!("Output: {}", out.display());
    for row in standings::owner_standings(&data.records, &registry) {
        println!("  {:>2}. {:<16} {:>+8.1}", row.rank, row.owner, row.total);
    }

    Ok(())
}

fn parse_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
