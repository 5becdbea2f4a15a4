// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Terminal dashboard
//!
//! Sidebar of phases on the left; metric cards, the two ranked tables and the
//! phase narrative on the right; a one-line status bar at the bottom.

use crate::layout::LayoutConfig;
use crate::metrics::Ranked;
use crate::phases::PhaseDataset;
use crate::pipeline::{PhaseReport, Pipeline};
use crate::render;
use anyhow::{Context, Result};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{prelude::*, widgets::*, DefaultTerminal};
use std::path::PathBuf;
use tracing::{info, warn};

/// Dashboard settings that do not come from the pipeline
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Rows per ranked table
    pub top_n: usize,
    /// Layout used when writing the HTML dashboard
    pub layout: LayoutConfig,
    /// Where `o` writes the HTML dashboard
    pub output: PathBuf,
}

/// Application state
pub struct App {
    pipeline: Pipeline,
    phases: Vec<PhaseDataset>,
    list_state: ListState,
    current: Option<PhaseReport>,
    error: Option<String>,
    status: String,
    options: ViewOptions,
    should_quit: bool,
}

impl App {
    /// Create the app and load the first phase
    #[must_use]
    pub fn new(pipeline: Pipeline, phases: Vec<PhaseDataset>, options: ViewOptions) -> Self {
        let mut app = Self {
            pipeline,
            phases,
            list_state: ListState::default(),
            current: None,
            error: None,
            status: String::new(),
            options,
            should_quit: false,
        };
        if app.phases.is_empty() {
            app.status = "No phases configured".into();
        } else {
            app.select(0);
        }
        app
    }

    /// Index of the highlighted phase
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    /// The analysed phase on screen, if it loaded
    #[must_use]
    pub fn current(&self) -> Option<&PhaseReport> {
        self.current.as_ref()
    }

    /// Load failure shown instead of the metrics
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Status line text
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Whether the event loop should stop
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn select(&mut self, index: usize) {
        self.list_state.select(Some(index));
        self.load();
    }

    fn load(&mut self) {
        let Some(phase) = self.selected().and_then(|i| self.phases.get(i)).cloned() else {
            return;
        };

        match self.pipeline.run(&phase) {
            Ok(report) => {
                self.status = format!(
                    "{}: {} characters, {} relations, loaded {}",
                    phase.key,
                    report.metrics.node_count,
                    report.metrics.edge_count,
                    report.loaded_at.format("%H:%M:%S UTC")
                );
                if report.has_no_edges() {
                    self.status.push_str(" (no edges)");
                }
                self.current = Some(report);
                self.error = None;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", phase.key, e);
                self.current = None;
                self.error = Some(format!("Could not load {}: {}", phase.name, e));
                self.status = format!("{}: load failed, press r to retry", phase.key);
            }
        }
    }

    fn next(&mut self) {
        if self.phases.is_empty() {
            return;
        }
        let i = self.selected().map_or(0, |i| (i + 1) % self.phases.len());
        self.select(i);
    }

    fn previous(&mut self) {
        if self.phases.is_empty() {
            return;
        }
        let i = self
            .selected()
            .map_or(0, |i| (i + self.phases.len() - 1) % self.phases.len());
        self.select(i);
    }

    fn reload(&mut self) {
        if let Some(phase) = self.selected().and_then(|i| self.phases.get(i)) {
            self.pipeline.invalidate(phase);
            info!("Reloading {}", phase.key);
        }
        self.load();
    }

    fn write_html(&mut self) {
        let Some(report) = &self.current else {
            self.status = "Nothing to write: no phase loaded".into();
            return;
        };

        let layout = report.layout(&self.options.layout);
        let written = render::dashboard_html(report, &layout, self.options.top_n).and_then(|html| {
            std::fs::write(&self.options.output, html)
                .with_context(|| format!("Failed to write {}", self.options.output.display()))
        });

        self.status = match written {
            Ok(()) => format!("Wrote {}", self.options.output.display()),
            Err(e) => format!("{e:#}"),
        };
    }

    /// Apply one key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c'))
            | (_, KeyCode::Char('q') | KeyCode::Esc) => self.should_quit = true,
            (_, KeyCode::Down | KeyCode::Char('j')) => self.next(),
            (_, KeyCode::Up | KeyCode::Char('k')) => self.previous(),
            (_, KeyCode::Char('r')) => self.reload(),
            (_, KeyCode::Char('o')) => self.write_html(),
            _ => {}
        }
    }

    /// Event loop
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| self.render(frame))?;
            if let Event::Key(key) = event::read()? {
                self.handle_key(key);
            }
        }
        Ok(())
    }

    /// Draw the whole screen
    pub fn render(&mut self, frame: &mut Frame) {
        let [body, status] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());
        let [sidebar, main] =
            Layout::horizontal([Constraint::Length(34), Constraint::Min(0)]).areas(body);

        self.render_sidebar(frame, sidebar);

        if let Some(error) = &self.error {
            let message = Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title(" Load failed "));
            frame.render_widget(message, main);
        } else if let Some(report) = &self.current {
            render_report(frame, main, report, self.options.top_n);
        }

        let help = " ↑/↓ select  r reload  o write html  q quit ";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Black).bg(Color::Gray)),
            Span::raw(" "),
            Span::raw(self.status.as_str()),
        ]);
        frame.render_widget(Paragraph::new(line), status);
    }

    fn render_sidebar(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .phases
            .iter()
            .map(|p| ListItem::new(p.name.as_str()))
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(" Phases "))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, area, &mut self.list_state);
    }
}

fn render_report(frame: &mut Frame, area: Rect, report: &PhaseReport, top_n: usize) {
    let [cards, tables, narrative] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(6),
        Constraint::Length(9),
    ])
    .areas(area);

    let metrics = &report.metrics;
    let values = [
        ("Nodes", metrics.node_count.to_string()),
        ("Edges", metrics.edge_count.to_string()),
        ("Density", format!("{:.4}", metrics.density)),
        ("Modularity", format!("{:.4}", metrics.modularity)),
    ];
    let card_areas = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(cards);
    for ((name, value), card_area) in values.iter().zip(card_areas.iter()) {
        let card = Paragraph::new(value.as_str())
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL).title(format!(" {name} ")));
        frame.render_widget(card, *card_area);
    }

    let [left, right] =
        Layout::horizontal([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)]).areas(tables);
    frame.render_widget(
        ranked_table(" Top by Degree ", &metrics.top_by_degree(&report.graph, top_n)),
        left,
    );
    frame.render_widget(
        ranked_table(
            " Top by Betweenness ",
            &metrics.top_by_betweenness(&report.graph, top_n),
        ),
        right,
    );

    let mut lines = vec![Line::from(Span::styled(
        report.phase.description.as_str(),
        Style::default().add_modifier(Modifier::ITALIC),
    ))];
    if report.has_no_edges() {
        lines.push(Line::from(Span::styled(
            "This phase has no relationships; all metrics are zero.",
            Style::default().fg(Color::Yellow),
        )));
    }
    if !report.rejected.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("{} malformed row(s) skipped", report.rejected.len()),
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(reflection) = &report.phase.reflection {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            reflection.title.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(reflection.context.as_str()));
        lines.push(Line::from(reflection.analysis.as_str()));
        if let Some(summary) = &reflection.summary {
            lines.push(Line::from(Span::styled(
                summary.as_str(),
                Style::default().fg(Color::Cyan),
            )));
        }
    }
    let narrative_widget = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Reading "));
    frame.render_widget(narrative_widget, narrative);
}

fn ranked_table<'a>(title: &'a str, rows: &'a [Ranked]) -> Table<'a> {
    let body = rows.iter().enumerate().map(|(i, r)| {
        Row::new(vec![
            Cell::from((i + 1).to_string()),
            Cell::from(r.label.as_str()),
            Cell::from(format!("{:.4}", r.score)),
            Cell::from(r.community.map_or_else(|| "-".to_string(), |c| c.to_string())),
        ])
    });

    Table::new(
        body,
        [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(5),
        ],
    )
    .header(
        Row::new(vec!["#", "Character", "Score", "Group"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(title))
}

/// Run the dashboard on the real terminal
pub fn run(app: &mut App) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}
