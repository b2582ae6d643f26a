use crate::api::ApiError;
use itertools::Itertools;
use serde::Deserialize;
use std::cmp::Reverse;
use std::collections::HashMap;

/// One row as served by `GET /api/leaderboard`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScoreRow {
    pub login: String,
    pub max_wpm: i64,
    pub accuracy: i64,
}

/// A score row after ranking and diffing against the previous poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub login: String,
    pub max_wpm: i64,
    pub accuracy: i64,
    pub position: usize,
    pub previous_position: Option<usize>,
    pub is_new: bool,
    pub has_changed: bool,
}

impl RankedEntry {
    /// Rank movement since the previous poll: negative is up the board.
    pub fn movement(&self) -> Option<i64> {
        self.previous_position
            .map(|prev| self.position as i64 - prev as i64)
    }
}

/// Reconciles successive leaderboard fetches into a ranked, diffed list.
///
/// Exactly one prior snapshot is retained, keyed by login, and it only
/// advances on a successful fetch: a failed cycle keeps both the visible
/// list and the comparison baseline intact.
#[derive(Debug)]
pub struct Leaderboard {
    entries: Vec<RankedEntry>,
    previous: HashMap<String, RankedEntry>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Leaderboard {
    pub fn new() -> Self {
        Self {
            entries: vec![],
            previous: HashMap::new(),
            is_loading: true,
            error: None,
        }
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    /// Fold one fetch cycle into the board.
    pub fn apply(&mut self, fetched: Result<Vec<ScoreRow>, ApiError>) {
        self.is_loading = false;

        let rows = match fetched {
            Ok(rows) => rows,
            Err(err) => {
                self.error = Some(err.to_string());
                return;
            }
        };

        let ranked = rows
            .into_iter()
            // Stable sort: ties keep the server's order.
            .sorted_by_key(|row| Reverse(row.max_wpm))
            .enumerate()
            .map(|(idx, row)| {
                let prev = self.previous.get(&row.login);
                RankedEntry {
                    position: idx + 1,
                    previous_position: prev.map(|p| p.position),
                    is_new: prev.is_none(),
                    has_changed: prev
                        .map(|p| p.max_wpm != row.max_wpm || p.accuracy != row.accuracy)
                        .unwrap_or(false),
                    login: row.login,
                    max_wpm: row.max_wpm,
                    accuracy: row.accuracy,
                }
            })
            .collect::<Vec<_>>();

        self.previous = ranked
            .iter()
            .map(|e| (e.login.clone(), e.clone()))
            .collect();
        self.entries = ranked;
        self.error = None;
    }
}
