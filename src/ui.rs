pub mod leaderboard;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, AppScreen};
use crate::session::{CharClass, TypingSession};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Top-level draw dispatch for the current screen.
pub fn draw(app: &mut App, f: &mut Frame) {
    match app.screen {
        AppScreen::Typing | AppScreen::Results => {
            f.render_widget(&*app, f.area());
        }
        AppScreen::Leaderboard => leaderboard::render(app, f),
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            AppScreen::Results => render_results(self, area, buf),
            _ => render_typing(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Map the session's per-character classes onto styled spans.
fn prompt_spans(session: &TypingSession) -> Vec<Span<'static>> {
    let green_bold_style = bold().fg(Color::Green);
    let red_bold_style = bold().fg(Color::Red);
    let dim_bold_style = bold().add_modifier(Modifier::DIM);
    let underlined_dim_bold_style = dim_bold_style.add_modifier(Modifier::UNDERLINED);

    let views = session.word_views();
    let mut spans = Vec::new();

    for (wi, view) in views.iter().enumerate() {
        for &(ch, class) in &view.chars {
            let style = match class {
                CharClass::Correct => green_bold_style,
                CharClass::Incorrect => red_bold_style,
                CharClass::Cursor => underlined_dim_bold_style,
                CharClass::Untouched => dim_bold_style,
            };
            spans.push(Span::styled(ch.to_string(), style));
        }

        // Extra typed characters render as markers, not letters.
        for _ in 0..view.overflow {
            spans.push(Span::styled("•".to_owned(), red_bold_style));
        }

        if wi + 1 < views.len() {
            spans.push(Span::styled(" ".to_owned(), dim_bold_style));
        }
    }

    spans
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let dim_bold_style = bold().add_modifier(Modifier::DIM);

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let mut prompt_occupied_lines =
        ((session.passage.text.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16;

    if session.passage.text.width() <= max_chars_per_line as usize {
        prompt_occupied_lines = 1;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints(
            [
                Constraint::Length(
                    ((area.height as f64 - prompt_occupied_lines as f64) / 2.0) as u16,
                ),
                Constraint::Length(2),
                Constraint::Length(prompt_occupied_lines),
                Constraint::Length(
                    ((area.height as f64 - prompt_occupied_lines as f64) / 2.0) as u16,
                ),
            ]
            .as_ref(),
        )
        .split(area);

    let countdown = Paragraph::new(Span::styled(
        format!("{}s   {} wpm", session.seconds_left(), session.wpm as i64),
        dim_bold_style,
    ))
    .alignment(Alignment::Center);
    countdown.render(chunks[1], buf);

    let prompt = Paragraph::new(Line::from(prompt_spans(session)))
        .alignment(if prompt_occupied_lines == 1 {
            // when the prompt is small enough to fit on one line
            // centering the text gives a nice zen feeling
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true });
    prompt.render(chunks[2], buf);

    if let Some(user) = &app.user {
        let who = Paragraph::new(Span::styled(
            format!("typing as {}", user.username),
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        who.render(chunks[3], buf);
    }
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let magenta_style = Style::default().fg(Color::Magenta);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let (overall_duration, highest_wpm) = chart_bounds(&session.wpm_coords, session.number_of_secs);

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&session.wpm_coords)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold()),
                    Span::styled(axis_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(axis_label(highest_wpm), bold()),
                ]),
        );
    chart.render(chunks[0], buf);

    let stats = Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc",
            session.wpm as i64, session.accuracy as i64
        ),
        bold(),
    ))
    .alignment(Alignment::Center);
    stats.render(chunks[1], buf);

    let legend = Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (l)eaderboard / (esc)ape",
        italic_style,
    ));
    legend.render(chunks[3], buf);
}

/// Compute X (seconds) and Y (WPM) bounds for the results chart.
fn chart_bounds(wpm_coords: &[(f64, f64)], number_of_secs: f64) -> (f64, f64) {
    let mut highest_wpm = 0.0;
    for &(_, wpm) in wpm_coords {
        if wpm > highest_wpm {
            highest_wpm = wpm;
        }
    }

    let overall_duration = match wpm_coords.last() {
        Some(&(t, _)) => t.max(1.0),
        None => number_of_secs.max(1.0),
    };

    (overall_duration, highest_wpm.round())
}

/// Format a simple numeric label consistently
fn axis_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
