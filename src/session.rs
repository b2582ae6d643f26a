use crate::app_dirs::AppDirs;
use crate::passage::Passage;
use crate::TICK_RATE_MS;
use chrono::prelude::*;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Active,
    Finished,
}

/// Visual class of one passage character, derived from session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharClass {
    Untouched,
    Correct,
    Incorrect,
    Cursor,
}

/// Per-word render data: one class per passage character plus the number of
/// typed characters that spill past the word's end (drawn as markers).
#[derive(Clone, Debug, PartialEq)]
pub struct WordView {
    pub chars: Vec<(char, CharClass)>,
    pub overflow: usize,
}

/// One typing attempt against a passage, from first keystroke to finalization.
///
/// Word-level bookkeeping: characters are compared positionally and the
/// correct/total counters only move when a word is committed with space.
/// The final word is never committed; finishing it ends the session instead.
#[derive(Debug, Clone)]
pub struct TypingSession {
    pub passage: Passage,
    pub typed_text: String,
    pub current_word_index: usize,
    pub current_char_index: usize,
    pub correct_chars: usize,
    pub total_chars: usize,
    pub started_at: Option<SystemTime>,
    pub number_of_secs: f64,
    pub seconds_remaining: f64,
    pub status: SessionStatus,
    pub wpm: f64,
    pub accuracy: f64,
    pub wpm_coords: Vec<(f64, f64)>,
}

impl TypingSession {
    pub fn new(passage: Passage, number_of_secs: f64) -> Self {
        Self {
            passage,
            typed_text: String::new(),
            current_word_index: 0,
            current_char_index: 0,
            correct_chars: 0,
            total_chars: 0,
            started_at: None,
            number_of_secs,
            seconds_remaining: number_of_secs,
            status: SessionStatus::Idle,
            wpm: 0.0,
            accuracy: 0.0,
            wpm_coords: vec![],
        }
    }

    pub fn has_started(&self) -> bool {
        self.status != SessionStatus::Idle
    }

    pub fn has_finished(&self) -> bool {
        self.status == SessionStatus::Finished
    }

    fn ensure_started(&mut self) {
        if self.status == SessionStatus::Idle {
            self.started_at = Some(SystemTime::now());
            self.status = SessionStatus::Active;
        }
    }

    fn current_word_len(&self) -> usize {
        self.passage.word(self.current_word_index).chars().count()
    }

    /// The typed substring belonging to one word index (split on separators).
    pub fn typed_word(&self, word_idx: usize) -> &str {
        self.typed_text.split(' ').nth(word_idx).unwrap_or("")
    }

    /// Handle a printable character. Space is the commit key and extra
    /// characters past the current word's end are rejected, not buffered.
    pub fn write(&mut self, c: char) {
        if self.has_finished() {
            return;
        }
        self.ensure_started();

        if c == ' ' {
            self.commit_word();
            return;
        }

        let word_len = self.current_word_len();
        if self.current_char_index >= word_len {
            return;
        }

        self.typed_text.push(c);
        self.current_char_index += 1;

        if self.passage.is_last_word(self.current_word_index) && self.current_char_index == word_len
        {
            // Completion is by position, not correctness.
            self.finalize();
        }
    }

    /// Commit the current word: score it positionally up to the shorter
    /// length, count the full target length, and advance. A space on the
    /// last word is ignored.
    fn commit_word(&mut self) {
        if self.passage.is_last_word(self.current_word_index) {
            return;
        }

        let target = self.passage.word(self.current_word_index);
        let typed = self.typed_text.split(' ').nth(self.current_word_index);
        let typed = typed.unwrap_or("");

        // Positional comparison only; a length mismatch is not penalized
        // beyond the positions it leaves unmatched.
        let correct_in_word = typed
            .chars()
            .zip(target.chars())
            .filter(|(t, e)| t == e)
            .count();

        self.correct_chars += correct_in_word;
        self.total_chars += target.chars().count();

        self.typed_text.push(' ');
        self.current_word_index += 1;
        self.current_char_index = 0;
        self.wpm = self.live_wpm();
    }

    /// Delete one character. At a word start this steps back over the
    /// separator onto the previous word; committed counters stay fixed.
    pub fn backspace(&mut self) {
        if self.has_finished() {
            return;
        }
        self.ensure_started();
        if self.typed_text.is_empty() {
            return;
        }

        if self.current_char_index == 0 {
            if self.current_word_index == 0 {
                return;
            }
            self.typed_text.pop();
            self.current_word_index -= 1;
            self.current_char_index = self.current_word_len();
        } else {
            self.typed_text.pop();
            self.current_char_index -= 1;
        }
    }

    /// Advance the countdown by one runner tick while active; reaching zero
    /// forces finalization even mid-word.
    pub fn on_tick(&mut self) {
        if self.status != SessionStatus::Active {
            return;
        }

        self.seconds_remaining -= TICK_RATE_MS as f64 / 1000_f64;
        self.record_live_wpm();

        if self.seconds_remaining <= 0.0 {
            self.seconds_remaining = 0.0;
            self.finalize();
        }
    }

    fn elapsed_minutes(&self) -> f64 {
        self.started_at
            .and_then(|s| s.elapsed().ok())
            .map(|d| d.as_secs_f64() / 60.0)
            .unwrap_or(0.0)
    }

    /// Live WPM over committed characters; zero before any elapsed time.
    pub fn live_wpm(&self) -> f64 {
        let elapsed = self.elapsed_minutes();
        if elapsed <= 0.0 {
            return 0.0;
        }
        (self.correct_chars as f64 / 5.0 / elapsed).round()
    }

    fn record_live_wpm(&mut self) {
        self.wpm = self.live_wpm();
        let elapsed_secs = self.elapsed_minutes() * 60.0;
        if elapsed_secs > 0.0 {
            self.wpm_coords.push((elapsed_secs, self.wpm));
        }
    }

    fn finalize(&mut self) {
        if self.has_finished() {
            return;
        }
        self.status = SessionStatus::Finished;

        // Guard against an instant finish; the denominator never drops
        // below 0.01 minutes.
        let elapsed = self.elapsed_minutes().max(0.01);
        self.wpm = (self.correct_chars as f64 / 5.0 / elapsed).round();
        self.accuracy = if self.total_chars > 0 {
            (self.correct_chars as f64 / self.total_chars as f64 * 100.0).round()
        } else {
            0.0
        };
    }

    /// Whole seconds left for display.
    pub fn seconds_left(&self) -> u64 {
        self.seconds_remaining.ceil().max(0.0) as u64
    }

    /// Classify every passage character for rendering. Committed words color
    /// per position (missing positions read as incorrect); the current word
    /// carries the cursor on its next expected character.
    pub fn word_views(&self) -> Vec<WordView> {
        let typed_words: Vec<&str> = self.typed_text.split(' ').collect();

        self.passage
            .words
            .iter()
            .enumerate()
            .map(|(wi, word)| {
                let typed: Vec<char> = typed_words
                    .get(wi)
                    .map(|w| w.chars().collect())
                    .unwrap_or_default();

                let chars = word
                    .chars()
                    .enumerate()
                    .map(|(ci, expected)| {
                        let class = if wi < self.current_word_index {
                            if typed.get(ci) == Some(&expected) {
                                CharClass::Correct
                            } else {
                                CharClass::Incorrect
                            }
                        } else if wi == self.current_word_index {
                            if ci < typed.len() {
                                if typed.get(ci) == Some(&expected) {
                                    CharClass::Correct
                                } else {
                                    CharClass::Incorrect
                                }
                            } else if ci == typed.len() {
                                CharClass::Cursor
                            } else {
                                CharClass::Untouched
                            }
                        } else {
                            CharClass::Untouched
                        };
                        (expected, class)
                    })
                    .collect::<Vec<_>>();

                let overflow = if wi == self.current_word_index {
                    typed.len().saturating_sub(word.chars().count())
                } else {
                    0
                };

                WordView { chars, overflow }
            })
            .collect()
    }

    /// Append one line to the local session history, created on first use.
    pub fn save_results(&self) -> io::Result<()> {
        if let Some(log_path) = AppDirs::history_path() {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            // If the history file doesn't exist, we need to emit a header
            let needs_header = !log_path.exists();

            let mut log_file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(log_path)?;

            if needs_header {
                writeln!(log_file, "date,num_words,num_secs,wpm,accuracy")?;
            }

            writeln!(
                log_file,
                "{},{},{:.0},{},{}",
                Local::now().format("%c"),
                self.passage.word_count(),
                self.number_of_secs,
                self.wpm,
                self.accuracy,
            )?;
        }

        Ok(())
    }
}
