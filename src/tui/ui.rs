use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use ratatui::Frame;

use super::app::{App, BeatmapStatus, ExportFormat, View};
use crate::format::ms_to_time_string;
use crate::models::BeatmapReport;

const ACCENT: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;
const COMPLETE_COLOR: Color = Color::Green;
const ERROR_COLOR: Color = Color::Red;
const PROGRESS_COLOR: Color = Color::Yellow;
const KIAI_COLOR: Color = Color::Magenta;

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Beatmaps + detail
            Constraint::Length(3), // Summary
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    render_header(frame, app, chunks[0]);
    render_beatmap_table(frame, app, body[0]);
    render_detail(frame, app, body[1]);
    render_summary(frame, app, chunks[2]);
    render_footer(frame, app, chunks[3]);

    // Overlays
    match app.view {
        View::About => render_about_overlay(frame),
        View::Export => render_export_overlay(frame, app),
        View::Main => {}
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let set_text = app.set_name.as_deref().unwrap_or("Unknown Set");
    let path_text = app.path.display().to_string();

    let text = vec![Line::from(vec![
        Span::styled("Set: ", Style::default().fg(DIM)),
        Span::styled(
            set_text,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("Path: ", Style::default().fg(DIM)),
        Span::styled(path_text, Style::default().fg(DIM)),
    ])];

    let title = Span::styled(" Kiai ", bold(ACCENT));
    frame.render_widget(Paragraph::new(text).block(panel(title)), area);
}

fn bpm_label(report: &BeatmapReport) -> String {
    match report.analysis.bpm_range() {
        Some((lo, hi)) if (hi - lo).abs() < 0.005 => format!("{:.0}", lo),
        Some((lo, hi)) => format!("{:.0}-{:.0}", lo, hi),
        None => "--".to_string(),
    }
}

fn render_beatmap_table(frame: &mut Frame, app: &mut App, area: Rect) {
    // 2 for borders, 1 for header
    let inner_height = area.height.saturating_sub(3) as usize;
    app.visible_rows = inner_height;

    let total = app.beatmaps.len();
    let scroll_info = if total > inner_height {
        format!(
            " [{}-{}/{}] ",
            app.scroll_offset + 1,
            (app.scroll_offset + inner_height).min(total),
            total
        )
    } else {
        String::new()
    };

    let header = Row::new(vec![
        Cell::from("#").style(Style::default().fg(DIM)),
        Cell::from("Beatmap").style(Style::default().fg(DIM)),
        Cell::from("BPM").style(Style::default().fg(DIM)),
        Cell::from("Kiai").style(Style::default().fg(DIM)),
        Cell::from("").style(Style::default().fg(DIM)),
    ])
    .height(1);

    // Only render the visible slice
    let end = (app.scroll_offset + inner_height).min(total);
    let start = app.scroll_offset.min(end);
    let visible_slice = &app.beatmaps[start..end];

    let rows: Vec<Row> = visible_slice
        .iter()
        .enumerate()
        .map(|(vi, (name, status))| {
            let actual_index = start + vi;
            let num = format!("{}", actual_index + 1);
            let style = if actual_index == app.selected {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };

            match status {
                BeatmapStatus::Pending => Row::new(vec![
                    Cell::from(num),
                    Cell::from(name.as_str()),
                    Cell::from("\u{00b7}").style(Style::default().fg(DIM)),
                    Cell::from(""),
                    Cell::from("\u{00b7}").style(Style::default().fg(DIM)),
                ])
                .style(style),
                BeatmapStatus::Analyzing => Row::new(vec![
                    Cell::from(num),
                    Cell::from(name.as_str()),
                    Cell::from("..").style(Style::default().fg(PROGRESS_COLOR)),
                    Cell::from(""),
                    Cell::from("\u{27f3}").style(Style::default().fg(PROGRESS_COLOR)),
                ])
                .style(style),
                BeatmapStatus::Complete(report) => Row::new(vec![
                    Cell::from(num),
                    Cell::from(report.title.as_str()),
                    Cell::from(bpm_label(report)),
                    Cell::from(format!("{}", report.analysis.kiai_intervals.len()))
                        .style(Style::default().fg(KIAI_COLOR)),
                    Cell::from("\u{2713}").style(Style::default().fg(COMPLETE_COLOR)),
                ])
                .style(style),
                BeatmapStatus::Error(msg) => Row::new(vec![
                    Cell::from(num),
                    Cell::from(name.as_str()),
                    Cell::from("ERR").style(Style::default().fg(ERROR_COLOR)),
                    Cell::from(msg.as_str()).style(Style::default().fg(ERROR_COLOR)),
                    Cell::from("\u{2717}").style(Style::default().fg(ERROR_COLOR)),
                ])
                .style(style),
            }
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(9),
        Constraint::Length(5),
        Constraint::Length(2),
    ];

    let title = Span::styled(scroll_info, Style::default().fg(DIM));
    let table = Table::new(rows, widths).header(header).block(panel(title));

    frame.render_widget(table, area);
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel(" Timeline ");

    let Some(report) = app.selected_report() else {
        let paragraph = Paragraph::new("No analysis yet")
            .style(Style::default().fg(DIM))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let end_text = |end: Option<i64>| {
        end.map(ms_to_time_string)
            .unwrap_or_else(|| "end".to_string())
    };
    let analysis = &report.analysis;

    let mut text = vec![Line::from(Span::styled("BPM sections", bold(ACCENT)))];
    for section in &analysis.bpm_sections {
        text.push(Line::from(format!(
            "{} \u{2192} {}  {:.2}",
            ms_to_time_string(section.start_ms),
            end_text(section.end_ms),
            section.bpm,
        )));
    }

    text.push(Line::from(""));
    text.push(Line::from(Span::styled("Kiai time", bold(KIAI_COLOR))));
    if analysis.kiai_intervals.is_empty() {
        text.push(Line::from(Span::styled("none", Style::default().fg(DIM))));
    }
    for interval in &analysis.kiai_intervals {
        text.push(Line::from(format!(
            "{} \u{2192} {}",
            ms_to_time_string(interval.start_ms),
            end_text(interval.end_ms),
        )));
    }

    text.push(Line::from(""));
    text.push(Line::from(vec![
        Span::styled("Last event: ", Style::default().fg(DIM)),
        Span::raw(
            analysis
                .last_event_ms
                .map(ms_to_time_string)
                .unwrap_or_else(|| "--".to_string()),
        ),
    ]));

    let paragraph = Paragraph::new(text).block(block);
    frame.render_widget(paragraph, area);
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let completed = app.completed_count();
    let total = app.beatmaps.len();

    let source = if app.loaded_from_cache {
        " (cached)"
    } else {
        ""
    };
    let text = format!(
        "{}/{} analyzed{}  |  merge threshold {} ms",
        completed, total, source, app.merge_threshold_ms
    );
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(panel(""));
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let keys = match app.view {
        View::Main => "[j/k] select  [e]xport  [a]bout  [q]uit",
        View::About | View::Export => "[Esc] close",
    };
    let footer = Paragraph::new(keys)
        .style(Style::default().fg(DIM))
        .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

fn render_about_overlay(frame: &mut Frame) {
    let area = centered_rect(44, 10, frame.area());

    let text = vec![
        Line::from(Span::styled("Kiai", bold(ACCENT))),
        Line::from(""),
        Line::from(format!("Version {}", env!("CARGO_PKG_VERSION"))),
        Line::from(""),
        Line::from("BPM sections and kiai time"),
        Line::from("for osu! beatmap sets."),
        Line::from(""),
        Line::from(Span::styled("[Esc] close", Style::default().fg(DIM))),
    ];

    render_overlay(frame, area, " About ", text);
}

fn render_export_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(50, 12, frame.area());

    let format_name = match app.export_format {
        ExportFormat::Text => "Text table",
        ExportFormat::Json => "JSON",
        ExportFormat::Csv => "CSV",
    };

    let mut text = vec![
        Line::from(Span::styled("Export Report", bold(ACCENT))),
        Line::from(""),
        Line::from(vec![
            Span::styled("Format: ", Style::default().fg(DIM)),
            Span::styled(format_name, Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Output: ", Style::default().fg(DIM)),
            Span::styled(
                app.export_path().display().to_string(),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "[Tab] cycle format  [Enter] save  [Esc] cancel",
            Style::default().fg(DIM),
        )),
    ];

    if let Some(ref msg) = app.export_message {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            msg.as_str(),
            Style::default().fg(COMPLETE_COLOR),
        )));
    }

    render_overlay(frame, area, " Export ", text);
}

fn bold(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Bordered block in the accent color.
fn panel<'a>(title: impl Into<Line<'a>>) -> Block<'a> {
    let title: Line<'a> = title.into();
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
}

fn render_overlay(frame: &mut Frame, area: Rect, title: &str, text: Vec<Line>) {
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(panel(title));
    frame.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
