use std::io;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::widgets::{
    Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Clear, Dataset, GraphType,
    Paragraph, Row, Table, TableState,
};

use pog_standings::config::AppConfig;
use pog_standings::record::parse_date;
use pog_standings::registry::PlayerRegistry;
use pog_standings::season_config::SeasonRegistry;
use pog_standings::source::{self, SeasonMode, SeasonSource, mode_label};
use pog_standings::state::{AppState, Screen, screen_label};

struct App {
    config: AppConfig,
    seasons: SeasonRegistry,
    registry: Option<PlayerRegistry>,
    source: SeasonSource,
    state: AppState,
    should_quit: bool,
    pending_load: bool,
}

impl App {
    fn new(config: AppConfig, seasons: SeasonRegistry) -> Self {
        let state = AppState::new(seasons.labels(), config.initial_season.as_deref());
        let source = SeasonSource::new(&config);
        Self {
            config,
            seasons,
            registry: None,
            source,
            state,
            should_quit: false,
            pending_load: true,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.state.set_screen(Screen::Standings),
            KeyCode::Char('2') => self.state.set_screen(Screen::Players),
            KeyCode::Char('3') => self.state.set_screen(Screen::Matches),
            KeyCode::Char('s') => {
                self.state.cycle_season_next();
                self.pending_load = true;
            }
            KeyCode::Char('S') => {
                self.state.cycle_season_prev();
                self.pending_load = true;
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.refresh(),
            KeyCode::Char('e') | KeyCode::Char('E') => self.export_snapshot(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn load_selected(&mut self) {
        self.pending_load = false;
        let Some(label) = self.state.selected_season().map(|s| s.to_string()) else {
            self.state.push_log("[WARN] No season selected");
            return;
        };
        let Some(season) = self.seasons.get(&label) else {
            self.state.push_log(format!("[WARN] Season {label} missing from config"));
            return;
        };

        let registry = match PlayerRegistry::from_season(season) {
            Ok(registry) => registry,
            Err(err) => {
                self.state.clear_season();
                self.state
                    .push_log(format!("[WARN] {label}: invalid rosters: {err:#}"));
                return;
            }
        };

        match self.source.load(&label, season, &registry, Instant::now()) {
            Ok(data) => self.state.apply_season(data, &registry),
            Err(err) => {
                self.state.clear_season();
                self.state.push_log(format!("[WARN] {label}: {err:#}"));
            }
        }
        self.registry = Some(registry);
    }

    fn refresh(&mut self) {
        let Some(label) = self.state.selected_season().map(|s| s.to_string()) else {
            return;
        };
        let Some(season) = self.seasons.get(&label) else {
            return;
        };
        if self.state.mode() == Some(SeasonMode::Archived) {
            self.state
                .push_log(format!("[INFO] {label}: archived, reloading from file"));
        } else if let Err(err) = self.source.refresh(season) {
            self.state.push_log(format!("[WARN] {label}: {err:#}"));
            return;
        } else {
            self.state.push_log(format!("[INFO] {label}: refresh requested"));
        }
        self.pending_load = true;
    }

    fn export_snapshot(&mut self) {
        let now = Instant::now();
        let (Some(data), Some(registry)) = (self.state.data.as_ref(), self.registry.as_ref())
        else {
            self.state.push_log("[INFO] Nothing loaded to export");
            return;
        };
        if !self.state.can_export() {
            let msg = match data.mode {
                SeasonMode::Archived => "[WARN] Archived season: snapshot download unavailable",
                SeasonMode::Live => "[WARN] No records to export",
            };
            self.state.push_log(msg);
            return;
        }
        match source::export_snapshot(data, registry, &self.config.export_dir) {
            Ok(path) => {
                let shown = path.display().to_string();
                self.state
                    .export
                    .finish(Some(shown.clone()), "Snapshot saved", now);
                self.state.push_log(format!("[INFO] Snapshot saved to {shown}"));
            }
            Err(err) => {
                self.state
                    .export
                    .finish(None, format!("Export failed: {err:#}"), now);
                self.state.push_log(format!("[WARN] Export failed: {err:#}"));
            }
        }
    }
}

fn main() -> ExitCode {
    let config = AppConfig::from_env();

    // Without rosters nothing can be attributed, so stop before touching the terminal.
    let seasons = match SeasonRegistry::load(&config.seasons_path) {
        Ok(seasons) => seasons,
        Err(err) => {
            eprintln!("error: {err:#}");
            eprintln!("set POG_SEASONS_PATH to a season config file");
            return ExitCode::FAILURE;
        }
    };

    match run(App::new(config, seasons)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(mut app: App) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        if app.pending_load {
            terminal.draw(|f| render_loading(f, &app.state))?;
            app.load_selected();
        }

        app.state.maybe_clear_export(Instant::now());
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn render_loading(frame: &mut Frame, state: &AppState) {
    let label = state.selected_season().unwrap_or("-");
    let text = format!("Loading {label}...");
    let popup = centered_rect(40, 20, frame.size());
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text).block(Block::default().title("POG").borders(Borders::ALL)),
        popup,
    );
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    if !app.state.has_records() {
        render_empty(frame, chunks[1], &app.state);
    } else {
        match app.state.screen {
            Screen::Standings => render_standings(frame, chunks[1], app),
            Screen::Players => render_players(frame, chunks[1], &app.state),
            Screen::Matches => render_matches(frame, chunks[1], &app.state),
        }
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let season = state.selected_season().unwrap_or("-");
    let mode = state.mode().map(mode_label).unwrap_or("NO DATA");
    let line1 = format!(
        "POG STANDINGS | {season} | {mode} | {}",
        screen_label(state.screen)
    );
    let line2 = match &state.data {
        Some(data) => {
            let cached = if data.from_cache { " (cached)" } else { "" };
            format!(
                "{} - {} | {} records{cached}",
                format_date(&data.window.start_date),
                format_date(&data.window.end_date),
                data.records.len()
            )
        }
        None => String::new(),
    };
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    let export = if state.can_export() { " | e Save CSV" } else { "" };
    let status = if state.export.done {
        format!(" | {}", state.export.message)
    } else {
        String::new()
    };
    format!(
        "1 Standings | 2 Players | 3 Matches | s/S Season | r Refresh{export} | j/k Move | ? Help | q Quit{status}"
    )
}

fn render_empty(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut lines = vec!["No data available".to_string()];
    if let Some(err) = state.data.as_ref().and_then(|d| d.error.as_ref()) {
        lines.push(format!("Fetch failed: {err}"));
        lines.push("Press r to retry".to_string());
    }
    let empty = Paragraph::new(lines.join("\n"))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(empty, area);
}

fn render_standings(frame: &mut Frame, area: Rect, app: &App) {
    let state = &app.state;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ])
        .split(columns[1]);

    let rows = state.owners.iter().map(|o| {
        let style = owner_style(o.color.as_deref());
        Row::new(vec![
            Cell::from(o.rank.to_string()),
            Cell::from(o.owner.clone()).style(style),
            Cell::from(format!("{:+.1}", o.total)),
            Cell::from(o.appearances.to_string()),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(12),
            Constraint::Length(9),
            Constraint::Length(6),
        ],
    )
    .header(bold_row(["#", "Owner", "Total", "Games"]))
    .block(Block::default().title("Owners").borders(Borders::ALL))
    .highlight_style(Style::default().bg(Color::DarkGray));
    let mut table_state = TableState::default().with_selected(Some(state.selected));
    frame.render_stateful_widget(table, columns[0], &mut table_state);

    frame.render_widget(owner_bar_chart(state), right[0]);
    render_trend(frame, right[1], state);

    let roster = Paragraph::new(selected_owner_text(app))
        .block(Block::default().title("Roster").borders(Borders::ALL));
    frame.render_widget(roster, right[2]);
}

fn render_trend(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Cumulative pt").borders(Borders::ALL);
    let days = state.days.len();
    if days < 2 {
        let text = Paragraph::new("Trend needs two or more match days").block(block);
        frame.render_widget(text, area);
        return;
    }

    // x = match-day ordinal, y = running total
    let points = state
        .trend
        .iter()
        .map(|(_, series)| {
            series
                .iter()
                .enumerate()
                .map(|(idx, (_, total))| (idx as f64, *total))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let (mut lo, mut hi) = (0.0_f64, 0.0_f64);
    for (_, y) in points.iter().flatten() {
        lo = lo.min(*y);
        hi = hi.max(*y);
    }
    if hi - lo < 1.0 {
        hi = lo + 1.0;
    }

    let datasets = state
        .trend
        .iter()
        .zip(points.iter())
        .map(|((owner, _), data)| {
            let color = state
                .owners
                .iter()
                .find(|o| &o.owner == owner)
                .and_then(|o| owner_color(o.color.as_deref()))
                .unwrap_or(Color::Gray);
            Dataset::default()
                .name(owner.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(data)
        })
        .collect::<Vec<_>>();

    let first = state.days.first().map(|d| format_date(&d.date)).unwrap_or_default();
    let last = state.days.last().map(|d| format_date(&d.date)).unwrap_or_default();
    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, (days - 1) as f64])
                .labels(vec![Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .bounds([lo, hi])
                .labels(vec![
                    Span::raw(format!("{lo:+.0}")),
                    Span::raw(format!("{hi:+.0}")),
                ]),
        );
    frame.render_widget(chart, area);
}

fn owner_bar_chart(state: &AppState) -> BarChart<'static> {
    let bars = state
        .owners
        .iter()
        .map(|o| {
            let fg = if o.total < 0.0 {
                Color::Red
            } else {
                owner_color(o.color.as_deref()).unwrap_or(Color::Green)
            };
            Bar::default()
                .value(o.total.abs().round() as u64)
                .label(Line::from(o.owner.clone()))
                .text_value(format!("{:+.1}", o.total))
                .style(Style::default().fg(fg))
        })
        .collect::<Vec<_>>();

    BarChart::default()
        .block(Block::default().title("Total pt").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
}

fn selected_owner_text(app: &App) -> String {
    let state = &app.state;
    let Some(owner) = state.owners.get(state.selected) else {
        return "No owner selected".to_string();
    };
    let mut lines = vec![format!("{} ({:+.1})", owner.owner, owner.total)];
    for p in state.players.iter().filter(|p| p.owner == owner.owner) {
        lines.push(format!("  {:<16} {:>+8.1} ({} games)", p.player, p.total, p.matches));
    }
    if let Some(day) = state.days.last() {
        let last = day.totals.get(&owner.owner).copied().unwrap_or(0.0);
        lines.push(format!("Last day {}: {:+.1}", format_date(&day.date), last));
    }
    if app.registry.is_none() {
        lines.push("Rosters unavailable".to_string());
    }
    lines.join("\n")
}

fn render_players(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = state.players.iter().map(|p| {
        let avg = p
            .average()
            .map(|a| format!("{a:+.1}"))
            .unwrap_or_else(|| "-".to_string());
        let best = p
            .best
            .map(|b| format!("{b:+.1}"))
            .unwrap_or_else(|| "-".to_string());
        Row::new(vec![
            Cell::from(p.rank.to_string()),
            Cell::from(p.player.clone()),
            Cell::from(p.owner.clone()),
            Cell::from(format!("{:+.1}", p.total)),
            Cell::from(p.matches.to_string()),
            Cell::from(avg),
            Cell::from(best),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(16),
            Constraint::Min(12),
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(bold_row(["#", "Player", "Owner", "Total", "Games", "Avg", "Best"]))
    .block(Block::default().title("Players").borders(Borders::ALL))
    .highlight_style(Style::default().bg(Color::DarkGray));
    let mut table_state = TableState::default().with_selected(Some(state.selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_matches(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Matches").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(state.selected, state.matches.len(), visible);
    let lines = (start..end)
        .map(|idx| {
            let m = &state.matches[idx];
            let prefix = if idx == state.selected { "> " } else { "  " };
            let results = m
                .results
                .iter()
                .map(|(player, _, point)| format!("{player} {point:+.1}"))
                .collect::<Vec<_>>()
                .join(" | ");
            format!(
                "{prefix}{} #{}  {results}",
                format_date(&m.date),
                m.match_index
            )
        })
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(lines.join("\n")), inner);
}

fn bold_row<const N: usize>(titles: [&'static str; N]) -> Row<'static> {
    Row::new(titles.map(Cell::from)).style(Style::default().add_modifier(Modifier::BOLD))
}

fn owner_style(color: Option<&str>) -> Style {
    match owner_color(color) {
        Some(c) => Style::default().fg(c),
        None => Style::default(),
    }
}

fn owner_color(raw: Option<&str>) -> Option<Color> {
    let hex = raw?.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn format_date(raw: &str) -> String {
    parse_date(raw)
        .map(|d| d.format("%Y/%m/%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "POG Standings - Help",
        "",
        "Views:",
        "  1            Owner standings",
        "  2            Player totals",
        "  3            Match history",
        "",
        "Season:",
        "  s / S        Next / previous season",
        "  r            Refresh (refetch live data)",
        "  e            Save live snapshot as CSV",
        "",
        "  j/k or ↑/↓   Move",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
