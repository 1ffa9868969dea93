use super::model::{Row, TuiModel, ViewState};
use gitpulse_core::app::{RegistryEntry, RepoRegistry};
use gitpulse_core::domain::{display_name, FetchState, StatusClass};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::path::Path;

const PENDING_GLYPH: &str = "⋯";

/// The View component of MVU - renders the model and the registry. Never
/// mutates either.
pub struct TuiView;

impl TuiView {
    pub fn render(model: &TuiModel, registry: &RepoRegistry, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title bar
                Constraint::Min(0),    // Main content
                Constraint::Length(2), // Message + key hints
            ])
            .split(frame.area());

        Self::render_title_bar(model, registry, frame, chunks[0]);

        match &model.state {
            ViewState::Detail { path } => Self::render_detail(registry, frame, chunks[1], path),
            ViewState::List | ViewState::Quit => Self::render_list(model, registry, frame, chunks[1]),
        }

        Self::render_status_bar(model, registry, frame, chunks[2]);

        if model.show_help {
            let area = frame.area();
            Self::render_help(frame, area);
        }
    }

    fn render_title_bar(model: &TuiModel, registry: &RepoRegistry, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(" gitpulse ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("{}  ", model.root.display())),
            Span::raw(format!("{} repos", registry.tracked_count())),
        ];

        let summary = registry.summary();
        for class in StatusClass::ALL {
            if let Some(count) = summary.get(&class) {
                spans.push(Span::raw("  "));
                spans.push(Span::raw(format!("{} {} {}", glyph(class), count, class)));
            }
        }

        if model.busy > 0 {
            spans.push(Span::styled(
                format!("  [checking {}]", model.busy),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }

        let title = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White).bg(Color::Blue));
        frame.render_widget(title, area);
    }

    fn render_list(model: &TuiModel, registry: &RepoRegistry, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title(" Repositories ");
        let rows = model.rows(registry);

        if rows.is_empty() {
            let empty = Paragraph::new(format!(
                "No repositories found under {}. Press 's' to scan again.",
                model.root.display()
            ))
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let name_width = rows
            .iter()
            .map(|row| row_name(row).chars().count())
            .max()
            .unwrap_or(0);

        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| match row {
                Row::Probed(entry) => ListItem::new(entry_line(entry, name_width)),
                Row::Pending(path) => ListItem::new(Line::from(vec![
                    Span::styled(PENDING_GLYPH, Style::default().fg(Color::DarkGray)),
                    Span::raw(" "),
                    Span::raw(format!("{:<width$}", display_name(path), width = name_width)),
                    Span::styled("  checking…", Style::default().fg(Color::DarkGray)),
                ])),
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("▶ ");

        let mut state = ListState::default().with_selected(model.selected_index(registry));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_detail(registry: &RepoRegistry, frame: &mut Frame, area: Rect, path: &Path) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", display_name(path)));

        let Some(entry) = registry.get(path) else {
            let waiting = Paragraph::new(format!("Checking {}…", path.display())).block(block);
            frame.render_widget(waiting, area);
            return;
        };

        let paragraph = Paragraph::new(detail_lines(entry))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_status_bar(model: &TuiModel, registry: &RepoRegistry, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let message = match &model.flash {
            Some(flash) if flash.is_error => {
                Paragraph::new(flash.text.as_str()).style(Style::default().fg(Color::Red))
            }
            Some(flash) => Paragraph::new(flash.text.as_str()).style(Style::default().fg(Color::Yellow)),
            None => Paragraph::new(Self::build_status_text(model, registry))
                .style(Style::default().fg(Color::White).bg(Color::DarkGray)),
        };
        frame.render_widget(message, chunks[0]);

        let hints = Paragraph::new(Self::get_key_hints(model)).style(Style::default().fg(Color::Gray));
        frame.render_widget(hints, chunks[1]);
    }

    fn build_status_text(model: &TuiModel, registry: &RepoRegistry) -> String {
        let mut parts = vec![format!("{} repos", registry.tracked_count())];

        let pending = registry.pending().len();
        if pending > 0 {
            parts.push(format!("{} pending", pending));
        }

        let selected = model
            .selected
            .as_deref()
            .and_then(|path| registry.get(path))
            .map(|entry| entry.snapshot.name.as_str());
        if let Some(name) = selected {
            parts.push(format!("Selected: {}", name));
        }

        parts.join(" | ")
    }

    fn get_key_hints(model: &TuiModel) -> &'static str {
        if model.show_help {
            return "Any key to close";
        }
        match (&model.state, model.single_repo()) {
            (ViewState::Detail { .. }, true) => "r Refresh | f Fetch | o Open | s Rescan | ? Help | q Quit",
            (ViewState::Detail { .. }, false) => "r Refresh | f Fetch | o Open | b Back | ? Help | q Quit",
            _ => "j/k Move | Enter Details | r Refresh | f Fetch | o Open | s Rescan | ? Help | q Quit",
        }
    }

    fn render_help(frame: &mut Frame, area: Rect) {
        let section = Style::default().add_modifier(Modifier::UNDERLINED);
        let help_text = vec![
            Line::from(Span::styled("List", section)),
            Line::from("  ↑/k ↓/j     Move selection"),
            Line::from("  Home/End    First / last repository"),
            Line::from("  Enter/→/l   Show details"),
            Line::from("  Esc         Quit"),
            Line::from(""),
            Line::from(Span::styled("Details", section)),
            Line::from("  Esc/←/h/b   Back to list"),
            Line::from(""),
            Line::from(Span::styled("Everywhere", section)),
            Line::from("  r           Refresh status (local only)"),
            Line::from("  f           Fetch from remotes, then refresh"),
            Line::from("  o/g         Open in GUI client"),
            Line::from("  s           Scan the root again"),
            Line::from("  q/Ctrl+C    Quit"),
        ];

        let popup_area = Self::centered_rect(60, 70, area);
        frame.render_widget(Clear, popup_area);
        let help = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title(" Keys "))
            .wrap(Wrap { trim: false });
        frame.render_widget(help, popup_area);
    }

    /// Helper to create centered rectangle
    fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
        let popup_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ])
            .split(r);

        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ])
            .split(popup_layout[1])[1]
    }
}

pub fn glyph(class: StatusClass) -> &'static str {
    match class {
        StatusClass::Error => "✗",
        StatusClass::Dirty => "●",
        StatusClass::Diverged => "⇅",
        StatusClass::Ahead => "↑",
        StatusClass::Behind => "↓",
        StatusClass::NoUpstream => "○",
        StatusClass::Clean => "✓",
    }
}

pub fn class_color(class: StatusClass) -> Color {
    match class {
        StatusClass::Error | StatusClass::Dirty | StatusClass::Behind => Color::Red,
        StatusClass::Diverged => Color::Magenta,
        StatusClass::Ahead => Color::Yellow,
        StatusClass::NoUpstream => Color::Blue,
        StatusClass::Clean => Color::Green,
    }
}

fn row_name<'a>(row: &Row<'a>) -> String {
    match row {
        Row::Probed(entry) => entry.snapshot.name.clone(),
        Row::Pending(path) => display_name(path),
    }
}

fn entry_line(entry: &RegistryEntry, name_width: usize) -> Line<'static> {
    let snapshot = &entry.snapshot;
    let class = snapshot.status_class();
    let color = Style::default().fg(class_color(class));

    let mut spans = vec![
        Span::styled(glyph(class), color),
        Span::raw(" "),
        Span::raw(format!("{:<width$}", snapshot.name, width = name_width)),
        Span::raw("  "),
        Span::styled(format!("{:<11}", class.label()), color),
    ];

    if let Some(error) = &snapshot.error {
        spans.push(Span::styled(error.clone(), Style::default().fg(Color::Red)));
        return Line::from(spans);
    }

    spans.push(Span::styled(
        format!("{:<16}", snapshot.head.to_string()),
        Style::default().fg(Color::Cyan),
    ));

    if let Some(upstream) = &snapshot.upstream {
        let sync = upstream.sync;
        if sync.ahead > 0 {
            spans.push(Span::styled(format!(" ↑{}", sync.ahead), Style::default().fg(Color::Yellow)));
        }
        if sync.behind > 0 {
            spans.push(Span::styled(format!(" ↓{}", sync.behind), Style::default().fg(Color::Red)));
        }
    }

    let tree = snapshot.worktree;
    if tree.modified > 0 {
        spans.push(Span::styled(format!(" ~{}", tree.modified), Style::default().fg(Color::Red)));
    }
    if tree.untracked > 0 {
        spans.push(Span::styled(format!(" ?{}", tree.untracked), Style::default().fg(Color::Red)));
    }

    if entry.fetch.error().is_some() {
        spans.push(Span::styled(" ⚑", Style::default().fg(Color::Red)));
    }

    Line::from(spans)
}

fn detail_lines(entry: &RegistryEntry) -> Vec<Line<'static>> {
    let snapshot = &entry.snapshot;
    let class = snapshot.status_class();
    let ok = Style::default().fg(Color::Green);
    let warn = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let bad = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let mut lines = vec![
        Line::from(format!("Repo:         {}", snapshot.path.display())),
        Line::from(format!("Branch:       {}", snapshot.head)),
    ];

    if let Some(error) = &snapshot.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.clone(), bad)));
    } else {
        let upstream = snapshot.upstream.as_ref();
        lines.push(Line::from(format!(
            "Upstream:     {}",
            upstream.map(|u| u.name.as_str()).unwrap_or("(none set)")
        )));
        lines.push(Line::from(""));

        match upstream.map(|u| u.sync) {
            Some(sync) => {
                let (text, style) = if sync.ahead > 0 { ("YES", warn) } else { ("no ", ok) };
                lines.push(Line::from(Span::styled(
                    format!("Pending push: {}  (ahead {})", text, sync.ahead),
                    style,
                )));
                let (text, style) = if sync.behind > 0 { ("YES", bad) } else { ("no ", ok) };
                lines.push(Line::from(Span::styled(
                    format!("Pending pull: {}  (behind {})", text, sync.behind),
                    style,
                )));
            }
            None => {
                lines.push(Line::from(Span::styled("Pending push: unknown (no upstream)", dim)));
                lines.push(Line::from(Span::styled("Pending pull: unknown (no upstream)", dim)));
            }
        }

        let tree = snapshot.worktree;
        let tree_line = if tree.is_dirty() {
            Span::styled(
                format!(
                    "Working tree: DIRTY  ({} modified, {} untracked)",
                    tree.modified, tree.untracked
                ),
                bad,
            )
        } else {
            Span::styled("Working tree: clean", ok)
        };
        lines.push(Line::from(tree_line));
        lines.push(Line::from(format!("Stashes:      {}", snapshot.stash_count)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("Status:       "),
        Span::styled(
            format!("{} {}", glyph(class), class),
            Style::default().fg(class_color(class)).add_modifier(Modifier::BOLD),
        ),
    ]));

    let fetch = match &entry.fetch {
        FetchState::NotFetched => Span::styled("Fetch:        not fetched yet".to_string(), dim),
        FetchState::Succeeded { at } => Span::styled(format!("Fetch:        ok at {}", at.format("%H:%M:%S")), dim),
        FetchState::Failed { at, message } => Span::styled(
            format!("Fetch:        failed at {}: {}", at.format("%H:%M:%S"), message),
            Style::default().fg(Color::Red),
        ),
    };
    lines.push(Line::from(fetch));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Last update:  {}", snapshot.checked_at.format("%H:%M:%S")),
        dim,
    )));

    lines
}
