use crate::app::{Dashboard, InputMode};
use crate::theme::{self, icons};
use chrono::Utc;
use osiris_core::StatusLine;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame, dashboard: &mut Dashboard) {
    let area = f.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    render_title(f, rows[0]);
    render_status(f, dashboard, rows[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[2]);
    render_entities(f, dashboard, body[0]);
    render_details(f, dashboard, body[1]);
    render_footer(f, dashboard, rows[3]);
}

fn render_title(f: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled("New Relic Incident Console", theme::HEADER_STYLE)];
    for (key, action) in [
        ("↑↓", "navigate"),
        ("/", "search"),
        ("n", "next"),
        ("s", "ssh"),
        ("r", "rdp"),
        ("space", "refresh"),
        ("q", "quit"),
    ] {
        spans.push(Span::styled(" | ", theme::DIM_STYLE));
        spans.push(Span::styled(key, theme::KEY_STYLE));
        spans.push(Span::raw(format!(" {action}")));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status(f: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let status = &dashboard.status;
    let color = theme::status_color(
        matches!(status, StatusLine::Error(_)),
        matches!(status, StatusLine::Fetching | StatusLine::Loading),
    );
    let line = Line::from(Span::styled(
        status.text(Utc::now()),
        Style::default().fg(color),
    ));
    f.render_widget(Paragraph::new(line), area);
}

fn render_entities(f: &mut Frame, dashboard: &mut Dashboard, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Hosts ({})", dashboard.rows.len()));

    if dashboard.rows.is_empty() {
        let placeholder = Paragraph::new("No entities to show.")
            .style(theme::DIM_STYLE)
            .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let items: Vec<ListItem> = dashboard
        .rows
        .iter()
        .map(|row| {
            let icon = if row.has_alert { icons::ALERT } else { icons::OK };
            let color = theme::health_color(row.has_alert);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{icon} "), Style::default().fg(color)),
                Span::styled(row.label(), Style::default().fg(color)),
            ]))
            .style(theme::row_shade(row.index))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::SELECTED_STYLE);
    f.render_stateful_widget(list, area, &mut dashboard.list_state);
}

fn render_details(f: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Details");
    let Some(entity) = dashboard.selected_entity() else {
        f.render_widget(block, area);
        return;
    };

    let label = |text: &'static str| Span::styled(text, theme::DIM_STYLE);
    let mut lines = vec![
        Line::from(Span::styled(
            entity.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![label("Type: "), Span::raw(entity.kind.clone())]),
    ];
    if !entity.os.is_empty() {
        lines.push(Line::from(vec![label("OS: "), Span::raw(entity.os.clone())]));
    }
    if !entity.guid.is_empty() {
        lines.push(Line::from(vec![label("GUID: "), Span::raw(entity.guid.clone())]));
    }
    lines.push(Line::from(""));

    if entity.has_alert {
        let alert = Style::default()
            .fg(theme::health_color(true))
            .add_modifier(Modifier::BOLD);
        lines.push(Line::from(Span::styled(
            format!("ALERT: {}", entity.alert_title),
            alert,
        )));
        if !entity.alert_detail.is_empty() {
            lines.push(Line::from(entity.alert_detail.clone()));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("Press "),
            Span::styled("'s'", theme::KEY_STYLE),
            Span::raw(" for SSH or "),
            Span::styled("'r'", theme::KEY_STYLE),
            Span::raw(" for RDP"),
        ]));
    } else {
        lines.push(Line::from(Span::styled(
            "Status: OK",
            Style::default().fg(theme::health_color(false)),
        )));
    }

    let details = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(details, area);
}

fn render_footer(f: &mut Frame, dashboard: &Dashboard, area: Rect) {
    let line = match &dashboard.mode {
        InputMode::Search(buffer) => Line::from(vec![
            Span::styled(format!("{} Search for server: ", icons::SEARCH), theme::KEY_STYLE),
            Span::raw(buffer.clone()),
            Span::styled("_", theme::DIM_STYLE),
        ]),
        InputMode::Normal => match &dashboard.notice {
            Some(notice) => Line::from(Span::styled(notice.clone(), theme::DIM_STYLE)),
            None => {
                let query = dashboard.search_query();
                if query.is_empty() {
                    Line::from("")
                } else {
                    Line::from(vec![
                        Span::styled(format!("{} {query}", icons::SEARCH), theme::DIM_STYLE),
                        Span::styled("  n", theme::KEY_STYLE),
                        Span::raw(" next match"),
                    ])
                }
            }
        },
    };
    f.render_widget(Paragraph::new(line), area);
}
