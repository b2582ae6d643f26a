use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, ScoreboardApi, UserIdentity};
use crate::leaderboard::ScoreRow;

/// Leaderboard poll cadence.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Unified event type consumed by the app runner. Terminal input and timer
/// ticks share the channel with results arriving from worker threads.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    Standings(Result<Vec<ScoreRow>, ApiError>),
    Auth(Option<UserIdentity>),
}

/// Source of events for the main loop (terminal input, worker results).
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source using crossterm; hands out the channel sender so
/// worker threads (poller, probe) can feed the same loop.
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> (Self, Sender<AppEvent>) {
        let (tx, rx) = mpsc::channel();

        let input_tx = tx.clone();
        thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if input_tx.send(AppEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if input_tx.send(AppEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        (Self { rx }, tx)
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

enum PollCommand {
    Refresh,
}

/// Handle to the background leaderboard poller. Fetches immediately, then
/// every `POLL_INTERVAL`; `refresh` wakes it early. Dropping the handle
/// disconnects the command channel and the thread exits after its current
/// cycle.
pub struct LeaderboardPoller {
    cmd_tx: Sender<PollCommand>,
}

impl LeaderboardPoller {
    pub fn spawn(api: Arc<dyn ScoreboardApi>, events: Sender<AppEvent>) -> Self {
        Self::spawn_with_interval(api, events, POLL_INTERVAL)
    }

    pub fn spawn_with_interval(
        api: Arc<dyn ScoreboardApi>,
        events: Sender<AppEvent>,
        interval: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();

        thread::spawn(move || {
            info!("leaderboard poller started");
            loop {
                let result = api.leaderboard();
                if let Err(ref err) = result {
                    warn!("leaderboard fetch failed: {err}");
                }
                if events.send(AppEvent::Standings(result)).is_err() {
                    break;
                }

                match cmd_rx.recv_timeout(interval) {
                    Ok(PollCommand::Refresh) => continue,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("leaderboard poller stopped");
        });

        Self { cmd_tx }
    }

    /// Request an immediate refetch (manual retry affordance).
    pub fn refresh(&self) {
        let _ = self.cmd_tx.send(PollCommand::Refresh);
    }
}

/// One-shot auth-status probe at startup. Any failure means logged-out;
/// nothing is surfaced to the user.
pub fn spawn_status_probe(api: Arc<dyn ScoreboardApi>, events: Sender<AppEvent>) {
    thread::spawn(move || {
        let user = match api.auth_status() {
            Ok(user) => Some(user),
            Err(err) => {
                info!("auth status check failed, treating as logged out: {err}");
                None
            }
        };
        let _ = events.send(AppEvent::Auth(user));
    });
}

/// Fire-and-forget score submission. Failures are logged and never surfaced;
/// the thread holds nothing the session needs back.
pub fn spawn_submit(api: Arc<dyn ScoreboardApi>, wpm: i64, accuracy: i64) {
    thread::spawn(move || match api.submit(wpm, accuracy) {
        Ok(()) => debug!("submitted result: {wpm} wpm, {accuracy}% acc"),
        Err(err) => error!("result submission failed: {err}"),
    });
}
