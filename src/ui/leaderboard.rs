use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::leaderboard::RankedEntry;

/// Render the leaderboard screen: ranked table with movement and novelty
/// emphasis, plus loading/error states that never blank stale rows.
pub fn render(app: &App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Standings table
            Constraint::Length(4), // Instructions
        ])
        .split(area);

    let title = Paragraph::new("Global Leaderboard (auto-refreshes every 30s)")
        .block(Block::default().borders(Borders::ALL).title("typeboard"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let board = &app.leaderboard;

    if board.is_loading {
        let loading = Paragraph::new("Loading leaderboard...")
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(loading, chunks[1]);
    } else if board.entries().is_empty() {
        let text = match &board.error {
            Some(err) => format!("Failed to load leaderboard: {err}\nPress (r) to retry"),
            None => "No leaderboard data available".to_string(),
        };
        let empty = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(match board.error {
                Some(_) => Color::Red,
                None => Color::Gray,
            }))
            .alignment(Alignment::Center);
        f.render_widget(empty, chunks[1]);
    } else {
        render_table(app, f, chunks[1]);
    }

    let mut lines = Vec::new();
    if let Some(err) = &board.error {
        // Stale rows stay on screen; the failure is a banner, not a blank.
        lines.push(format!("Last refresh failed: {err}"));
    }
    lines.push(match &app.user {
        Some(user) => format!("logged in as {}", user.username),
        None => "(g) login with GitHub to put your score on the board".to_string(),
    });
    lines.push("(r)efresh / (b)ack / (esc)ape".to_string());

    let instructions = Paragraph::new(lines.join("\n"))
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}

fn rank_cell(entry: &RankedEntry) -> Cell<'static> {
    let style = match entry.position {
        1 => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        2 => Style::default().fg(Color::White),
        3 => Style::default().fg(Color::LightRed),
        _ => Style::default().fg(Color::Gray),
    };
    Cell::from(format!("{}", entry.position)).style(style)
}

fn movement_cell(entry: &RankedEntry) -> Cell<'static> {
    match entry.movement() {
        Some(delta) if delta < 0 => {
            Cell::from("↑").style(Style::default().fg(Color::Green))
        }
        Some(delta) if delta > 0 => Cell::from("↓").style(Style::default().fg(Color::Red)),
        Some(_) => Cell::from(""),
        None if entry.is_new => Cell::from("new").style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        ),
        None => Cell::from(""),
    }
}

fn render_table(app: &App, f: &mut Frame, area: ratatui::layout::Rect) {
    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("User"),
        Cell::from("WPM"),
        Cell::from("Accuracy"),
        Cell::from(""),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let me = app.user.as_ref().map(|u| u.username.as_str());

    let rows: Vec<Row> = app
        .leaderboard
        .entries()
        .iter()
        .map(|entry| {
            let is_me = Some(entry.login.as_str()) == me;
            let name = if is_me {
                format!("{} (you)", entry.login)
            } else {
                entry.login.clone()
            };

            let emphasis = entry.is_new || entry.has_changed;
            let name_style = match (is_me, emphasis) {
                (true, _) => Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
                (false, true) => Style::default().add_modifier(Modifier::BOLD),
                (false, false) => Style::default(),
            };
            let wpm_style = if emphasis {
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Green)
            };

            Row::new(vec![
                rank_cell(entry),
                Cell::from(name).style(name_style),
                Cell::from(format!("{}", entry.max_wpm)).style(wpm_style),
                Cell::from(format!("{}%", entry.accuracy)),
                movement_cell(entry),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        &[
            Constraint::Length(4),
            Constraint::Min(16),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(5),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Standings"));

    f.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ScoreboardApi, UserIdentity};
    use crate::app::RuntimeSettings;
    use crate::app::AppScreen;
    use crate::leaderboard::ScoreRow;
    use crate::runtime::AppEvent;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::{mpsc, Arc};

    struct NullApi;

    impl ScoreboardApi for NullApi {
        fn auth_status(&self) -> Result<UserIdentity, ApiError> {
            Err(ApiError::Status(401))
        }
        fn leaderboard(&self) -> Result<Vec<ScoreRow>, ApiError> {
            Ok(vec![])
        }
        fn submit(&self, _wpm: i64, _accuracy: i64) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn leaderboard_app() -> App {
        let (tx, _rx) = mpsc::channel();
        let settings = RuntimeSettings {
            server_url: "http://localhost:3000".into(),
            number_of_secs: 30.0,
            custom_prompt: Some("ab cd".into()),
        };
        let mut app = App::new(settings, Arc::new(NullApi), tx);
        app.screen = AppScreen::Leaderboard;
        app
    }

    fn rendered(app: &App) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| render(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn row(login: &str, wpm: i64, accuracy: i64) -> ScoreRow {
        ScoreRow {
            login: login.to_string(),
            max_wpm: wpm,
            accuracy,
        }
    }

    #[test]
    fn test_loading_state() {
        let mut app = leaderboard_app();
        let content = rendered(&mut app);

        assert!(content.contains("Loading leaderboard"));
    }

    #[test]
    fn test_rows_render_with_scores() {
        let mut app = leaderboard_app();
        app.on_event(AppEvent::Standings(Ok(vec![
            row("alice", 120, 98),
            row("bob", 90, 95),
        ])));

        let content = rendered(&mut app);
        assert!(content.contains("alice"));
        assert!(content.contains("120"));
        assert!(content.contains("bob"));
    }

    #[test]
    fn test_error_keeps_stale_rows_and_shows_banner() {
        let mut app = leaderboard_app();
        app.on_event(AppEvent::Standings(Ok(vec![row("alice", 120, 98)])));
        app.on_event(AppEvent::Standings(Err(ApiError::Status(500))));

        let content = rendered(&mut app);
        assert!(content.contains("alice"));
        assert!(content.contains("Last refresh failed"));
    }

    #[test]
    fn test_error_without_rows_offers_retry() {
        let mut app = leaderboard_app();
        app.on_event(AppEvent::Standings(Err(ApiError::Transport(
            "connection refused".into(),
        ))));

        let content = rendered(&mut app);
        assert!(content.contains("retry"));
    }

    #[test]
    fn test_current_user_is_tagged() {
        let mut app = leaderboard_app();
        app.on_event(AppEvent::Auth(Some(UserIdentity {
            username: "alice".into(),
            avatar_url: String::new(),
        })));
        app.on_event(AppEvent::Standings(Ok(vec![row("alice", 120, 98)])));

        let content = rendered(&mut app);
        assert!(content.contains("alice (you)"));
        assert!(content.contains("logged in as alice"));
    }
}
