use std::sync::mpsc::Sender;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;
use webbrowser::Browser;

use crate::api::{ScoreboardApi, UserIdentity};
use crate::config::Config;
use crate::leaderboard::Leaderboard;
use crate::passage::{Passage, PassagePool};
use crate::runtime::{spawn_submit, AppEvent, LeaderboardPoller};
use crate::session::TypingSession;

#[derive(Debug, Clone, PartialEq)]
pub enum AppScreen {
    Typing,
    Results,
    Leaderboard,
}

/// Effective settings after merging the config file and CLI overrides.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub server_url: String,
    pub number_of_secs: f64,
    pub custom_prompt: Option<String>,
}

impl From<&Config> for RuntimeSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            server_url: cfg.server_url.clone(),
            number_of_secs: cfg.number_of_secs as f64,
            custom_prompt: None,
        }
    }
}

/// Top-level application state: the current typing session, the leaderboard,
/// the (write-once) authenticated identity, and screen routing.
pub struct App {
    pub settings: RuntimeSettings,
    pub session: TypingSession,
    pub leaderboard: Leaderboard,
    pub user: Option<UserIdentity>,
    pub screen: AppScreen,
    pub should_quit: bool,
    pool: PassagePool,
    api: Arc<dyn ScoreboardApi>,
    events_tx: Sender<AppEvent>,
    poller: Option<LeaderboardPoller>,
    auth_resolved: bool,
}

impl App {
    pub fn new(
        settings: RuntimeSettings,
        api: Arc<dyn ScoreboardApi>,
        events_tx: Sender<AppEvent>,
    ) -> Self {
        let pool = PassagePool::load();
        let passage = match &settings.custom_prompt {
            Some(prompt) => Passage::from_text(prompt),
            None => pool.random_passage(),
        };

        Self {
            session: TypingSession::new(passage, settings.number_of_secs),
            leaderboard: Leaderboard::new(),
            user: None,
            screen: AppScreen::Typing,
            should_quit: false,
            pool,
            api,
            events_tx,
            poller: None,
            auth_resolved: false,
            settings,
        }
    }

    pub fn on_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => self.on_tick(),
            AppEvent::Resize => {}
            AppEvent::Key(key) => self.on_key(key),
            AppEvent::Standings(result) => self.leaderboard.apply(result),
            AppEvent::Auth(user) => {
                // Single write point for the shared identity.
                if !self.auth_resolved {
                    self.auth_resolved = true;
                    self.user = user;
                }
            }
        }
    }

    fn on_tick(&mut self) {
        if self.session.has_started() && !self.session.has_finished() {
            self.session.on_tick();
            if self.session.has_finished() {
                self.complete_session();
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        // ctrl+c to quit
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.screen {
            AppScreen::Typing => self.on_typing_key(key),
            AppScreen::Results => self.on_results_key(key),
            AppScreen::Leaderboard => self.on_leaderboard_key(key),
        }
    }

    fn on_typing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.open_leaderboard(),
            KeyCode::Backspace => {
                if !self.session.has_finished() {
                    self.session.backspace();
                }
            }
            KeyCode::Char(c) => {
                if !self.session.has_finished() {
                    self.session.write(c);
                    if self.session.has_finished() {
                        self.complete_session();
                    }
                }
            }
            // modifiers, arrows, etc. are defined no-ops
            _ => {}
        }
    }

    fn on_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.reset(true),
            KeyCode::Char('n') => self.reset(false),
            KeyCode::Char('l') | KeyCode::Tab => self.open_leaderboard(),
            _ => {}
        }
    }

    fn on_leaderboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => {
                if let Some(poller) = &self.poller {
                    poller.refresh();
                }
            }
            KeyCode::Char('g') => self.open_login(),
            KeyCode::Char('b') | KeyCode::Tab => self.close_leaderboard(),
            _ => {}
        }
    }

    /// Start a fresh session; a prior submission may still be in flight and
    /// needs no coordination.
    pub fn reset(&mut self, retry_same_passage: bool) {
        let passage = if retry_same_passage {
            self.session.passage.clone()
        } else {
            self.new_passage()
        };
        self.session = TypingSession::new(passage, self.settings.number_of_secs);
        self.screen = AppScreen::Typing;
    }

    fn new_passage(&self) -> Passage {
        match &self.settings.custom_prompt {
            Some(prompt) => Passage::from_text(prompt),
            None => self.pool.random_passage(),
        }
    }

    fn complete_session(&mut self) {
        self.screen = AppScreen::Results;

        spawn_submit(
            self.api.clone(),
            self.session.wpm as i64,
            self.session.accuracy as i64,
        );

        if let Err(err) = self.session.save_results() {
            warn!("could not append session history: {err}");
        }
    }

    /// First entry spawns the poller; it then runs until the app exits.
    fn open_leaderboard(&mut self) {
        if self.poller.is_none() {
            self.poller = Some(LeaderboardPoller::spawn(
                self.api.clone(),
                self.events_tx.clone(),
            ));
        }
        self.screen = AppScreen::Leaderboard;
    }

    fn close_leaderboard(&mut self) {
        self.screen = if self.session.has_finished() {
            AppScreen::Results
        } else {
            AppScreen::Typing
        };
    }

    pub fn polling(&self) -> bool {
        self.poller.is_some()
    }

    /// The login flow is an external browser redirect; the TUI only opens it.
    fn open_login(&mut self) {
        if Browser::is_available() {
            let url = format!(
                "{}/api/login",
                self.settings.server_url.trim_end_matches('/')
            );
            webbrowser::open(&url).unwrap_or_default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::leaderboard::ScoreRow;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingApi {
        submissions: Mutex<Vec<(i64, i64)>>,
    }

    impl RecordingApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                submissions: Mutex::new(vec![]),
            })
        }
    }

    impl ScoreboardApi for RecordingApi {
        fn auth_status(&self) -> Result<UserIdentity, ApiError> {
            Err(ApiError::Status(401))
        }

        fn leaderboard(&self) -> Result<Vec<ScoreRow>, ApiError> {
            Ok(vec![ScoreRow {
                login: "alice".into(),
                max_wpm: 100,
                accuracy: 97,
            }])
        }

        fn submit(&self, wpm: i64, accuracy: i64) -> Result<(), ApiError> {
            self.submissions.lock().unwrap().push((wpm, accuracy));
            Ok(())
        }
    }

    fn test_app(api: Arc<RecordingApi>) -> (App, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let settings = RuntimeSettings {
            server_url: "http://localhost:3000".into(),
            number_of_secs: 30.0,
            custom_prompt: Some("ab cd".into()),
        };
        (App::new(settings, api, tx), rx)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(app: &mut App, input: &str) {
        for c in input.chars() {
            app.on_event(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_to_completion_submits_once() {
        let api = RecordingApi::new();
        let (mut app, _rx) = test_app(api.clone());

        type_str(&mut app, "ab cd");

        assert_eq!(app.screen, AppScreen::Results);
        assert!(app.session.has_finished());

        // The submit thread is fire-and-forget; give it a moment.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            let submissions = api.submissions.lock().unwrap().clone();
            if !submissions.is_empty() {
                assert_eq!(submissions.len(), 1);
                assert_eq!(submissions[0].1, 100);
                break;
            }
            assert!(std::time::Instant::now() < deadline, "no submission seen");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_reset_starts_fresh_session() {
        let api = RecordingApi::new();
        let (mut app, _rx) = test_app(api);

        type_str(&mut app, "ab cd");
        assert_eq!(app.screen, AppScreen::Results);

        app.on_event(key(KeyCode::Char('r')));

        assert_eq!(app.screen, AppScreen::Typing);
        assert!(!app.session.has_started());
        assert_eq!(app.session.typed_text, "");
        assert_eq!(app.session.passage.text, "ab cd");
    }

    #[test]
    fn test_auth_event_writes_identity_once() {
        let api = RecordingApi::new();
        let (mut app, _rx) = test_app(api);

        app.on_event(AppEvent::Auth(Some(UserIdentity {
            username: "alice".into(),
            avatar_url: "https://example.com/a.png".into(),
        })));
        assert_eq!(app.user.as_ref().unwrap().username, "alice");

        // A later event must not overwrite the resolved identity.
        app.on_event(AppEvent::Auth(None));
        assert_eq!(app.user.as_ref().unwrap().username, "alice");
    }

    #[test]
    fn test_standings_event_feeds_reconciler() {
        let api = RecordingApi::new();
        let (mut app, _rx) = test_app(api);

        app.on_event(AppEvent::Standings(Ok(vec![ScoreRow {
            login: "bob".into(),
            max_wpm: 80,
            accuracy: 91,
        }])));

        assert_eq!(app.leaderboard.entries().len(), 1);
        assert_eq!(app.leaderboard.entries()[0].position, 1);
    }

    #[test]
    fn test_tab_opens_leaderboard_and_spawns_poller() {
        let api = RecordingApi::new();
        let (mut app, rx) = test_app(api);
        assert!(!app.polling());

        app.on_event(key(KeyCode::Tab));

        assert_eq!(app.screen, AppScreen::Leaderboard);
        assert!(app.polling());

        // The poller's immediate fetch lands on the app channel.
        match rx.recv_timeout(Duration::from_secs(2)) {
            Ok(AppEvent::Standings(Ok(rows))) => assert_eq!(rows[0].login, "alice"),
            other => panic!("expected standings, got {other:?}"),
        }

        // Leaving and re-entering must not spawn a second poller.
        app.on_event(key(KeyCode::Tab));
        assert_eq!(app.screen, AppScreen::Typing);
        app.on_event(key(KeyCode::Tab));
        assert!(app.polling());
    }

    #[test]
    fn test_letter_keys_stay_with_the_session_while_typing() {
        let api = RecordingApi::new();
        let (mut app, _rx) = test_app(api);

        // 'l' toggles the leaderboard from results, but while typing it is
        // input like any other letter.
        app.on_event(key(KeyCode::Char('l')));

        assert_eq!(app.screen, AppScreen::Typing);
        assert!(app.session.has_started());
    }

    #[test]
    fn test_timer_expiry_via_ticks_completes_session() {
        let api = RecordingApi::new();
        let (tx, _rx) = mpsc::channel();
        let settings = RuntimeSettings {
            server_url: "http://localhost:3000".into(),
            number_of_secs: 0.3,
            custom_prompt: Some("ab cd".into()),
        };
        let mut app = App::new(settings, api, tx);

        type_str(&mut app, "ab c");
        for _ in 0..5 {
            app.on_event(AppEvent::Tick);
        }

        assert!(app.session.has_finished());
        assert_eq!(app.screen, AppScreen::Results);
    }

    #[test]
    fn test_esc_quits() {
        let api = RecordingApi::new();
        let (mut app, _rx) = test_app(api);

        app.on_event(key(KeyCode::Esc));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_from_any_screen() {
        let api = RecordingApi::new();
        let (mut app, _rx) = test_app(api);
        app.on_event(key(KeyCode::Tab));

        app.on_event(AppEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert!(app.should_quit);
    }
}
