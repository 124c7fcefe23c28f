//! Interactive terminal leaderboard.
//!
//! Shows the ranked table with inline per-run rows for expanded entries, a
//! detail pane for the selected entry, the summary chart, a message log and
//! the run viewer overlay.
//!
//! Launch with `benchboard console` (the default command).

use std::collections::{HashMap, HashSet};
use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use benchboard_protocol::{BoardError, DetailDocument, DisplayMode};
use benchboard_state::palette::Hsla;
use benchboard_state::{ChartKind, ChartSpec, Theme, ThemePalette};

use crate::detail::{DetailFetch, DetailPanel, ToggleOutcome};
use crate::fetcher::fetch_json;
use crate::leaderboard::{LeaderboardController, LeaderboardView};
use crate::render::{mount, unmount, ChartRenderer, SurfaceId};
use crate::run_viewer::{
    discover_total, load_request, Direction, NavTicket, PrefetchTicket, RequestContent, StepOutcome,
    TotalRequest,
};

/// Results of spawned fetches, applied on the console loop.
enum ConsoleEvent {
    Detail(DetailFetch, Result<DetailDocument, BoardError>),
    Request(NavTicket, RequestContent),
    Total(TotalRequest, u32),
    Prefetched(PrefetchTicket, RequestContent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Entry { rank: usize },
    Run { rank: usize, row: usize },
}

enum KeyAction {
    None,
    Quit,
    Activate,
    NextVersion,
    Step(Direction),
    JumpRun(isize),
}

/// Chart surfaces drawn by the console.
#[derive(Default)]
pub struct TerminalCharts {
    surfaces: HashMap<SurfaceId, Option<ChartSpec>>,
}

impl TerminalCharts {
    pub fn chart(&self, id: &SurfaceId) -> Option<&ChartSpec> {
        self.surfaces.get(id).and_then(Option::as_ref)
    }

    pub fn has_container(&self, id: &SurfaceId) -> bool {
        self.surfaces.contains_key(id)
    }

    pub fn clear(&mut self) {
        self.surfaces.clear();
    }
}

impl ChartRenderer for TerminalCharts {
    fn insert_container(&mut self, id: &SurfaceId) {
        self.surfaces.insert(id.clone(), None);
    }

    fn attach_chart(&mut self, id: &SurfaceId, spec: &ChartSpec) -> Result<(), BoardError> {
        match self.surfaces.get_mut(id) {
            Some(slot) => {
                *slot = Some(spec.clone());
                Ok(())
            }
            None => Err(BoardError::Render(format!("no container for {id}"))),
        }
    }

    fn remove_container(&mut self, id: &SurfaceId) {
        self.surfaces.remove(id);
    }
}

struct BoardConsole {
    controller: LeaderboardController,
    events: mpsc::UnboundedSender<ConsoleEvent>,
    charts: TerminalCharts,
    /// Index into the flattened selection list.
    selected: usize,
    show_help: bool,
    /// Runs whose request count is being discovered in the background.
    counting: HashSet<String>,
    /// Messages displayed in the console output area.
    console_messages: Vec<(chrono::DateTime<chrono::Utc>, String, Color)>,
}

impl BoardConsole {
    fn new(controller: LeaderboardController, events: mpsc::UnboundedSender<ConsoleEvent>) -> Self {
        let mut console = Self {
            controller,
            events,
            charts: TerminalCharts::default(),
            selected: 0,
            show_help: false,
            counting: HashSet::new(),
            console_messages: Vec::new(),
        };
        console.add_message("Benchboard ready. Enter expands a row or opens a run.", Color::Cyan);
        console.add_message("Keys: j/k move, Enter toggle, v next version, q quit", Color::DarkGray);
        if let Some(notice) = console.controller.view().notice.clone() {
            console.add_message(&notice, Color::Yellow);
        }
        console.mount_summary();
        console
    }

    fn add_message(&mut self, msg: &str, color: Color) {
        self.console_messages
            .push((chrono::Utc::now(), msg.to_string(), color));
        // Cap at 500 messages.
        if self.console_messages.len() > 500 {
            self.console_messages.remove(0);
        }
    }

    fn mount_summary(&mut self) {
        if let Some(spec) = self.controller.view().summary.clone() {
            let id = LeaderboardView::summary_surface();
            if let Err(e) = mount(&mut self.charts, [(&id, &spec)]) {
                self.add_message(&format!("Summary chart unavailable: {e}"), Color::Yellow);
            }
        }
    }

    fn selections(&self) -> Vec<Selection> {
        let panels = self.controller.panels();
        let mut out = Vec::new();
        for row in &self.controller.view().rows {
            out.push(Selection::Entry { rank: row.rank });
            if let Some(panel) = panels.panel(&row.key) {
                out.extend((0..panel.runs.len()).map(|i| Selection::Run {
                    rank: row.rank,
                    row: i,
                }));
            }
        }
        out
    }

    fn current(&self) -> Option<Selection> {
        self.selections().get(self.selected).copied()
    }

    fn selected_rank(&self) -> Option<usize> {
        match self.current()? {
            Selection::Entry { rank } | Selection::Run { rank, .. } => Some(rank),
        }
    }

    fn selected_panel(&self) -> Option<&DetailPanel> {
        let rank = self.selected_rank()?;
        let row = self.controller.view().row(rank)?;
        self.controller.panels().panel(&row.key)
    }

    fn handle_event(&mut self, event: ConsoleEvent) {
        match event {
            ConsoleEvent::Detail(fetch, result) => {
                let error = result
                    .as_ref()
                    .err()
                    .map(|e| (e.to_string(), e.is_fetch_failure()));
                if !self.controller.panels_mut().resolve(&fetch, result) {
                    return;
                }
                if let Some(panel) = self.controller.panels().panel(&fetch.row_key) {
                    if let Err(e) = mount(&mut self.charts, panel.charts()) {
                        tracing::warn!(error = %e, "Detail charts not mounted");
                    }
                }
                match error {
                    Some((e, true)) => self.add_message(
                        &format!("Details for {} could not be fetched: {e}", fetch.identity),
                        Color::Red,
                    ),
                    Some((e, false)) => self.add_message(
                        &format!("Details for {} are unreadable: {e}", fetch.identity),
                        Color::Yellow,
                    ),
                    None => self.add_message(
                        &format!("Loaded details for {}", fetch.identity),
                        Color::Green,
                    ),
                }
            }
            ConsoleEvent::Request(ticket, content) => {
                if self.controller.viewer_mut().apply(&ticket, content) {
                    self.spawn_prefetch();
                }
            }
            ConsoleEvent::Total(request, total) => {
                if request.pending.is_none() {
                    self.counting.remove(&request.run_id);
                }
                if let Some(ticket) = self.controller.viewer_mut().resume_step(&request, total) {
                    self.follow(ticket);
                }
            }
            ConsoleEvent::Prefetched(ticket, content) => {
                self.controller.viewer_mut().store_prefetched(&ticket, content);
            }
        }
    }

    /// Start everything a fresh navigation needs: its content, the count of
    /// its run and, once shown, its neighbours.
    fn follow(&mut self, ticket: NavTicket) {
        if ticket.needs_load() {
            self.spawn_request(ticket);
        } else {
            self.spawn_prefetch();
        }
        if let Some(request) = self.controller.viewer().total_request() {
            if self.counting.insert(request.run_id.clone()) {
                self.spawn_total(request);
            }
        }
    }

    fn spawn_detail(&self, fetch: DetailFetch) {
        let fetcher = self.controller.fetcher();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = fetch_json::<DetailDocument>(fetcher.as_ref(), &fetch.path).await;
            let _ = events.send(ConsoleEvent::Detail(fetch, result));
        });
    }

    fn spawn_request(&self, ticket: NavTicket) {
        if !ticket.needs_load() {
            return;
        }
        let Some(locator) = self.controller.viewer().locator().cloned() else {
            return;
        };
        let fetcher = self.controller.fetcher();
        let events = self.events.clone();
        tokio::spawn(async move {
            let content = load_request(
                fetcher.as_ref(),
                &locator,
                &ticket.run_id,
                ticket.position.request_index,
            )
            .await;
            let _ = events.send(ConsoleEvent::Request(ticket, content));
        });
    }

    fn spawn_total(&self, request: TotalRequest) {
        let Some(locator) = self.controller.viewer().locator().cloned() else {
            return;
        };
        let fetcher = self.controller.fetcher();
        let events = self.events.clone();
        tokio::spawn(async move {
            let total = discover_total(fetcher.as_ref(), &locator, &request.run_id).await;
            let _ = events.send(ConsoleEvent::Total(request, total));
        });
    }

    fn spawn_prefetch(&self) {
        let viewer = self.controller.viewer();
        let Some(locator) = viewer.locator().cloned() else {
            return;
        };
        for ticket in viewer.prefetch_targets() {
            let fetcher = self.controller.fetcher();
            let events = self.events.clone();
            let locator = locator.clone();
            tokio::spawn(async move {
                let content =
                    load_request(fetcher.as_ref(), &locator, &ticket.run_id, ticket.request_index).await;
                let _ = events.send(ConsoleEvent::Prefetched(ticket, content));
            });
        }
    }

    async fn activate(&mut self) {
        match self.current() {
            Some(Selection::Entry { rank }) => self.toggle_entry(rank),
            Some(Selection::Run { rank, row }) => self.open_run(rank, row).await,
            None => {}
        }
    }

    fn toggle_entry(&mut self, rank: usize) {
        let Some(click) = self.controller.row_click(rank) else {
            return;
        };
        let surfaces = [
            SurfaceId::for_chart("histogram", click.key.as_str()),
            SurfaceId::for_chart("pie", click.key.as_str()),
        ];
        match self.controller.toggle_row(rank) {
            Some(ToggleOutcome::Fetch(fetch)) => {
                self.add_message(&format!("Loading details for {}...", click.identity), Color::White);
                self.spawn_detail(fetch);
            }
            Some(ToggleOutcome::Expanded) => {
                if let Some(panel) = self.controller.panels().panel(&click.key) {
                    if let Err(e) = mount(&mut self.charts, panel.charts()) {
                        tracing::warn!(error = %e, "Detail charts not mounted");
                    }
                }
            }
            Some(ToggleOutcome::Collapsed) => {
                unmount(&mut self.charts, &surfaces);
                let len = self.selections().len();
                self.selected = self.selected.min(len.saturating_sub(1));
            }
            Some(ToggleOutcome::Pending) => {
                self.add_message("Details are still loading", Color::DarkGray);
            }
            None => {}
        }
    }

    async fn open_run(&mut self, rank: usize, row: usize) {
        let Some(request) = self.selected_panel().and_then(|p| p.open_request(row)) else {
            self.add_message(&format!("Run {} of entry #{rank} has no recorded run id", row + 1), Color::DarkGray);
            return;
        };
        let fetcher = self.controller.fetcher();
        match self.controller.viewer_mut().open(fetcher.as_ref(), request).await {
            Ok(ticket) => {
                self.counting.clear();
                self.follow(ticket);
            }
            Err(e) => {
                tracing::info!(error = %e, "Run viewer not opened");
                self.add_message("No recorded requests for this run", Color::Yellow);
            }
        }
    }

    async fn next_version(&mut self) {
        let Some(version) = self.controller.next_version() else {
            return;
        };
        match self.controller.switch_version(&version).await {
            Ok(()) => {
                self.charts.clear();
                self.selected = 0;
                self.mount_summary();
                self.add_message(&format!("Switched to version {version}"), Color::Cyan);
                if let Some(notice) = self.controller.view().notice.clone() {
                    self.add_message(&notice, Color::Yellow);
                }
            }
            Err(e) => self.add_message(&format!("Cannot switch version: {e}"), Color::Red),
        }
    }

    fn step(&mut self, dir: Direction) {
        match self.controller.viewer_mut().step(dir) {
            Some(StepOutcome::Moved(ticket)) => self.follow(ticket),
            Some(StepOutcome::NeedsTotal(request)) => self.spawn_total(request),
            None => {}
        }
    }

    fn jump_run(&mut self, delta: isize) {
        if let Some(ticket) = self.controller.viewer_mut().jump_run(delta) {
            self.follow(ticket);
        }
    }

    /// Map a key press to an action. Viewer keys take over while it is open.
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (code, modifiers) {
            return KeyAction::Quit;
        }

        if self.controller.viewer().is_open() {
            return match code {
                KeyCode::Esc => {
                    self.controller.viewer_mut().close();
                    self.show_help = false;
                    KeyAction::None
                }
                KeyCode::Char('?') => {
                    self.show_help = !self.show_help;
                    KeyAction::None
                }
                KeyCode::Left | KeyCode::Char('h') => KeyAction::Step(Direction::Backward),
                KeyCode::Right | KeyCode::Char('l') => KeyAction::Step(Direction::Forward),
                KeyCode::Up | KeyCode::Char('k') => KeyAction::JumpRun(-1),
                KeyCode::Down | KeyCode::Char('j') => KeyAction::JumpRun(1),
                _ => KeyAction::None,
            };
        }

        let len = self.selections().len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
            KeyCode::Enter | KeyCode::Char(' ') => KeyAction::Activate,
            KeyCode::Char('v') => KeyAction::NextVersion,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                KeyAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < len {
                    self.selected += 1;
                }
                KeyAction::None
            }
            KeyCode::Home => {
                self.selected = 0;
                KeyAction::None
            }
            KeyCode::End => {
                self.selected = len.saturating_sub(1);
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    /// Render the full console layout.
    fn render(&self, frame: &mut Frame) {
        let outer = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([
                Constraint::Length(3), // Status bar
                Constraint::Min(10),   // Table + detail
                Constraint::Length(3), // Key hints
            ])
            .split(frame.area());

        self.render_status_bar(frame, outer[0]);
        self.render_main_area(frame, outer[1]);
        self.render_hints(frame, outer[2]);

        if self.controller.viewer().is_open() {
            self.render_viewer(frame, centered(frame.area(), 90, 85));
            if self.show_help {
                render_help(frame, centered(frame.area(), 40, 40));
            }
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Benchboard ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let version = self.controller.version_label().unwrap_or("-").to_string();
        let mode = match self.controller.mode() {
            DisplayMode::Model => "Models",
            DisplayMode::Community => "Community strategies",
        };
        let status_line = Line::from(vec![
            Span::styled("  Benchmark: ", Style::default().fg(Color::Gray)),
            Span::styled(mode, Style::default().fg(Color::White)),
            Span::styled("  |  Version: ", Style::default().fg(Color::Gray)),
            Span::styled(version, Style::default().fg(Color::Magenta)),
            Span::styled("  |  Entries: ", Style::default().fg(Color::Gray)),
            Span::styled(
                self.controller.view().rows.len().to_string(),
                Style::default().fg(Color::Green),
            ),
            Span::styled("  |  Expanded: ", Style::default().fg(Color::Gray)),
            Span::styled(
                self.controller.panels().expanded_count().to_string(),
                Style::default().fg(Color::LightCyan),
            ),
            Span::styled("  |  Theme: ", Style::default().fg(Color::Gray)),
            Span::styled(self.controller.theme().to_string(), Style::default().fg(Color::White)),
        ]);

        frame.render_widget(Paragraph::new(status_line).block(block), area);
    }

    fn render_main_area(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(LayoutDirection::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        self.render_table(frame, columns[0]);

        let right = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([Constraint::Min(10), Constraint::Length(8)])
            .split(columns[1]);

        self.render_detail(frame, right[0]);
        self.render_console_output(frame, right[1]);
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let view = self.controller.view();
        let (name_header, owner_header) = match self.controller.mode() {
            DisplayMode::Model => ("Model", "Vendor"),
            DisplayMode::Community => ("Strategy", "Author"),
        };
        let block = Block::default()
            .title(format!(" Leaderboard ({}) ", view.rows.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        if let Some(notice) = &view.notice {
            let color = if view.rows.is_empty() && notice != crate::leaderboard::NO_DATA_NOTICE {
                Color::Red
            } else {
                Color::DarkGray
            };
            let text = Paragraph::new(Line::from(Span::styled(
                format!("  {notice}"),
                Style::default().fg(color),
            )))
            .block(block);
            frame.render_widget(text, area);
            return;
        }

        let selections = self.selections();
        let visible = area.height.saturating_sub(3) as usize;
        let offset = self.selected.saturating_sub(visible.saturating_sub(1));

        let rows: Vec<Row> = selections
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .filter_map(|(i, sel)| {
                let style = if i == self.selected {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                self.table_row(*sel).map(|r| r.style(style))
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Percentage(22),
                Constraint::Percentage(12),
                Constraint::Length(11),
                Constraint::Length(12),
                Constraint::Length(13),
                Constraint::Length(13),
                Constraint::Length(13),
                Constraint::Length(13),
            ],
        )
        .block(block)
        .header(
            Row::new(vec![
                "  #",
                name_header,
                owner_header,
                "Round",
                "OK/Fail/Err",
                "In tok",
                "Out tok",
                "Time s",
                "Cost m$",
            ])
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        );

        frame.render_widget(table, area);
    }

    fn table_row(&self, sel: Selection) -> Option<Row<'static>> {
        let view = self.controller.view();
        match sel {
            Selection::Entry { rank } => {
                let row = view.row(rank)?;
                let marker = if self.controller.panels().is_expanded(&row.key) {
                    "▾"
                } else if self.controller.panels().is_loading(&row.key) {
                    "…"
                } else {
                    "▸"
                };
                let vendor = hsla_color(benchboard_state::palette::vendor_color(
                    self.controller.theme(),
                    row.identity.vendor(),
                ));
                Some(Row::new(vec![
                    Cell::from(format!("{marker}{:>3}", row.rank)),
                    Cell::from(Span::styled(
                        row.identity.primary().to_string(),
                        Style::default().fg(Color::White),
                    )),
                    Cell::from(Span::styled(
                        row.identity.secondary().to_string(),
                        Style::default().fg(vendor),
                    )),
                    Cell::from(row.round.to_string()),
                    Cell::from(format!(
                        "{}/{}/{}",
                        row.shares.successful, row.shares.failed, row.shares.error
                    )),
                    Cell::from(row.metrics.input_tokens.to_string()),
                    Cell::from(row.metrics.output_tokens.to_string()),
                    Cell::from(row.metrics.time.to_string()),
                    Cell::from(row.metrics.cost.to_string()),
                ]))
            }
            Selection::Run { rank, row } => {
                let entry = view.row(rank)?;
                let panel = self.controller.panels().panel(&entry.key)?;
                let run = panel.runs.get(row)?;
                let link = if run.run_index.is_some() { "↳" } else { " " };
                let dim = Style::default().fg(Color::Gray);
                Some(Row::new(vec![
                    Cell::from(""),
                    Cell::from(Span::styled(format!("  {link} {}", run.seed), dim)),
                    Cell::from(""),
                    Cell::from(Span::styled(run.final_round.to_string(), dim)),
                    Cell::from(Span::styled(
                        format!("{}/{}/{}", run.shares.successful, run.shares.failed, run.shares.error),
                        dim,
                    )),
                    Cell::from(Span::styled(run.metrics.input_tokens.to_string(), dim)),
                    Cell::from(Span::styled(run.metrics.output_tokens.to_string(), dim)),
                    Cell::from(Span::styled(run.metrics.time.to_string(), dim)),
                    Cell::from(Span::styled(run.metrics.cost.to_string(), dim)),
                ]))
            }
        }
    }

    /// Detail pane: the selected entry's panel, or the summary chart.
    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let theme = self.controller.theme();
        if let Some(panel) = self.selected_panel() {
            let parts = Layout::default()
                .direction(LayoutDirection::Vertical)
                .constraints([Constraint::Min(6), Constraint::Length(7), Constraint::Length(5)])
                .split(area);
            let title = format!(" {} • final rounds ", panel.identity);
            match self.charts.chart(&panel.histogram_surface) {
                Some(spec) => render_spec(frame, parts[0], spec, &title, theme),
                None => render_placeholder(frame, parts[0], &title, "Preparing chart..."),
            }
            match self.charts.chart(&panel.providers_surface) {
                Some(spec) => render_spec(frame, parts[1], spec, " Providers ", theme),
                None => render_placeholder(frame, parts[1], " Providers ", "Preparing chart..."),
            }
            render_totals(frame, parts[2], panel);
            return;
        }

        let loading = self
            .selected_rank()
            .and_then(|rank| self.controller.view().row(rank))
            .is_some_and(|row| self.controller.panels().is_loading(&row.key));
        if loading {
            render_placeholder(frame, area, " Details ", "Loading details...");
            return;
        }

        match self.charts.chart(&LeaderboardView::summary_surface()) {
            Some(spec) => render_spec(frame, area, spec, " Average final round ", theme),
            None => render_placeholder(
                frame,
                area,
                " Details ",
                "Press Enter on a row to expand its per-run breakdown.",
            ),
        }
    }

    fn render_console_output(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Console Output ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        let inner_height = area.height.saturating_sub(2) as usize;
        let start = self.console_messages.len().saturating_sub(inner_height);
        let lines: Vec<Line> = self.console_messages[start..]
            .iter()
            .map(|(ts, msg, color)| {
                Line::from(vec![
                    Span::styled(
                        format!("  [{}] ", ts.format("%H:%M:%S")),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(msg.as_str(), Style::default().fg(*color)),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_hints(&self, frame: &mut Frame, area: Rect) {
        let hints = if self.controller.viewer().is_open() {
            "  ←/h →/l request  |  ↑/k ↓/j run  |  ? help  |  Esc close viewer"
        } else {
            "  j/k move  |  Enter expand/open run  |  v next version  |  q quit"
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));
        let paragraph = Paragraph::new(Line::from(Span::styled(
            hints,
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_viewer(&self, frame: &mut Frame, area: Rect) {
        let viewer = self.controller.viewer();
        let title = viewer.title().unwrap_or_default();
        let block = Block::default()
            .title(format!(" {title} "))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta));
        frame.render_widget(Clear, area);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let bundle = match viewer.content() {
            Some(RequestContent::Ready(bundle)) => bundle,
            Some(RequestContent::Unavailable { reason }) => {
                let lines = vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        "  Request unavailable",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(format!("  {reason}"), Style::default().fg(Color::DarkGray))),
                    Line::from(Span::styled(
                        "  Use ←/→ to keep navigating.",
                        Style::default().fg(Color::Gray),
                    )),
                ];
                frame.render_widget(Paragraph::new(lines), inner);
                return;
            }
            _ => {
                frame.render_widget(
                    Paragraph::new(Span::styled("  Loading request...", Style::default().fg(Color::DarkGray))),
                    inner,
                );
                return;
            }
        };

        let columns = Layout::default()
            .direction(LayoutDirection::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);
        let left = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([
                Constraint::Percentage(50),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ])
            .split(columns[0]);
        let right = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(4), Constraint::Length(3)])
            .split(columns[1]);

        text_section(frame, left[0], " Game state ", &bundle.gamestate);
        text_section(frame, left[1], " Strategy ", &bundle.strategy);
        text_section(frame, left[2], " Memory ", &bundle.memory);
        text_section(frame, right[0], " Tool call ", &bundle.tool_call);
        text_section(frame, right[1], " Reasoning ", &bundle.reasoning);
        let screenshot = bundle
            .screenshot
            .as_deref()
            .unwrap_or("Screenshot not available");
        text_section(frame, right[2], " Screenshot ", screenshot);
    }
}

fn hsla_color(color: Hsla) -> Color {
    let (r, g, b) = color.to_rgb();
    Color::Rgb(r, g, b)
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn text_section(frame: &mut Frame, area: Rect, title: &str, body: &str) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let paragraph = Paragraph::new(body.to_string())
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_placeholder(frame: &mut Frame, area: Rect, title: &str, text: &str) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));
    let paragraph = Paragraph::new(Line::from(Span::styled(
        format!("  {text}"),
        Style::default().fg(Color::DarkGray),
    )))
    .block(block)
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Keys ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let lines: Vec<Line> = [
        ("← / h", "previous request"),
        ("→ / l", "next request"),
        ("↑ / k", "previous run"),
        ("↓ / j", "next run"),
        ("?", "toggle this help"),
        ("Esc", "close viewer"),
    ]
    .iter()
    .map(|(key, what)| {
        Line::from(vec![
            Span::styled(format!("  {key:<8}"), Style::default().fg(Color::Cyan)),
            Span::styled(*what, Style::default().fg(Color::White)),
        ])
    })
    .collect();
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_totals(frame: &mut Frame, area: Rect, panel: &DetailPanel) {
    let block = Block::default()
        .title(" Totals ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));
    let t = &panel.totals;
    let label = Style::default().fg(Color::Gray);
    let value = Style::default().fg(Color::White);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Tokens in/out: ", label),
            Span::styled(format!("{}M / {}M", t.input_tokens_m, t.output_tokens_m), value),
            Span::styled("  |  Time: ", label),
            Span::styled(format!("{}s", t.time_s), value),
        ]),
        Line::from(vec![
            Span::styled("  Cost in/out/total: ", label),
            Span::styled(
                format!("${} / ${} / ${}", t.input_cost, t.output_cost, t.total_cost),
                value,
            ),
        ]),
    ];
    if let Some(err) = &panel.load_error {
        lines.push(Line::from(Span::styled(
            format!("  {err}"),
            Style::default().fg(Color::Red),
        )));
    }
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Draw a chart spec: bars for bar kinds, a share list for doughnuts.
fn render_spec(frame: &mut Frame, area: Rect, spec: &ChartSpec, title: &str, theme: Theme) {
    let palette = ThemePalette::for_theme(theme);
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(hsla_color(palette.border)));

    if spec.is_empty() {
        let paragraph = Paragraph::new(Span::styled("  No data", Style::default().fg(Color::DarkGray)))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    match spec.kind {
        ChartKind::Doughnut => {
            let values = spec.series.first().map(|s| s.values.as_slice()).unwrap_or(&[]);
            let total: f64 = values.iter().sum();
            let lines: Vec<Line> = spec
                .categories
                .iter()
                .zip(values)
                .enumerate()
                .map(|(i, (name, count))| {
                    let color = spec.series[0].color_at(i).map(hsla_color).unwrap_or(Color::White);
                    let share = if total > 0.0 { count / total * 100.0 } else { 0.0 };
                    Line::from(vec![
                        Span::styled("  ■ ", Style::default().fg(color)),
                        Span::styled(format!("{name:<18}"), Style::default().fg(Color::White)),
                        Span::styled(
                            format!("{count:>6} ({share:.0}%)"),
                            Style::default().fg(hsla_color(palette.axis)),
                        ),
                    ])
                })
                .collect();
            frame.render_widget(Paragraph::new(lines).block(block), area);
        }
        ChartKind::Bar | ChartKind::StackedBar => {
            // Means are scaled by 10 so one decimal survives the u64 bars.
            let scale = if spec.kind == ChartKind::Bar { 10.0 } else { 1.0 };
            let bars: Vec<Bar> = spec
                .categories
                .iter()
                .enumerate()
                .map(|(i, category)| {
                    let total: f64 = spec.series.iter().filter_map(|s| s.values.get(i)).sum();
                    let dominant = spec
                        .series
                        .iter()
                        .filter(|s| s.values.get(i).copied().unwrap_or(0.0) > 0.0)
                        .max_by(|a, b| a.values[i].total_cmp(&b.values[i]))
                        .or_else(|| spec.series.first());
                    let color = dominant
                        .and_then(|s| s.color_at(i))
                        .map(hsla_color)
                        .unwrap_or(Color::White);
                    let text = match spec.series.first().and_then(|s| s.error_bars.as_ref()) {
                        Some(errors) => format!("{total:.1}±{:.1}", errors.get(i).copied().unwrap_or(0.0)),
                        None => format!("{total}"),
                    };
                    Bar::default()
                        .value((total * scale).round().max(0.0) as u64)
                        .label(Line::from(truncate(category, 8)))
                        .text_value(text)
                        .style(Style::default().fg(color))
                })
                .collect();
            let mut chart = BarChart::default()
                .block(block)
                .data(BarGroup::default().bars(&bars))
                .bar_width(5)
                .bar_gap(1);
            if let Some(max) = spec.y_max {
                chart = chart.max((max * scale) as u64);
            }
            frame.render_widget(chart, area);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the console event loop over an already started controller.
///
/// Detail, request and request-count fetches run on spawned tasks; their
/// results come back over a channel and are applied between frames, so all
/// controller state is mutated from this loop only.
pub async fn run_console(controller: LeaderboardController) -> Result<(), anyhow::Error> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!(
            "The console requires a terminal (TTY); use `benchboard print` instead."
        ));
    }

    // Set up panic hook to restore terminal.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut terminal = setup_terminal()?;
    let mut console = BoardConsole::new(controller, tx);

    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(event) = rx.try_recv() {
            console.handle_event(event);
        }

        terminal.draw(|frame| console.render(frame))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press {
                    match console.handle_key(key_event.code, key_event.modifiers) {
                        KeyAction::Quit => break,
                        KeyAction::Activate => console.activate().await,
                        KeyAction::NextVersion => console.next_version().await,
                        KeyAction::Step(dir) => console.step(dir),
                        KeyAction::JumpRun(delta) => console.jump_run(delta),
                        KeyAction::None => {}
                    }
                }
            }
        }
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}
