use std::time::{Duration, SystemTime};

/// How long the error shake stays visible.
pub const SHAKE_MS: u64 = 200;

/// Per-keystroke feedback cue. Backspace is always neutral.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Cue {
    Click,
    Error,
}

/// Per-ghost-index classification consumed by the highlighting layer.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum CharState {
    Untyped,
    Correct,
    Incorrect,
}

/// Result of applying one input event.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub cue: Cue,
    pub completed: bool,
}

/// One typing attempt against a ghost snippet: the live input buffer and the
/// metrics derived from it. A fresh instance is created per attempt and never
/// reused across retries or level changes.
#[derive(Debug)]
pub struct Drill {
    pub ghost: String,
    ghost_chars: Vec<char>,
    pub typed: String,
    pub started_at: Option<SystemTime>,
    pub wpm: usize,
    pub accuracy: usize,
    pub progress: usize,
    shake_until: Option<SystemTime>,
}

impl Drill {
    pub fn new(ghost: impl Into<String>) -> Self {
        let ghost = ghost.into();
        let ghost_chars = ghost.chars().collect();
        Self {
            ghost,
            ghost_chars,
            typed: String::new(),
            started_at: None,
            wpm: 0,
            accuracy: 100,
            progress: 0,
            shake_until: None,
        }
    }

    /// Single entry point for input events: replaces the typed buffer with
    /// `new_text`, recomputes metrics, and reports the keystroke cue plus
    /// whether the ghost has just been matched exactly. The first call
    /// records the start timestamp regardless of content.
    pub fn apply_input(&mut self, new_text: &str) -> Feedback {
        if self.started_at.is_none() {
            self.started_at = Some(SystemTime::now());
        }

        let old_len = self.typed.chars().count();
        let new_len = new_text.chars().count();

        let cue = if new_len == old_len + 1 {
            let appended = new_text.chars().last().unwrap_or_default();
            match self.ghost_chars.get(new_len - 1) {
                Some(&expected) if expected == appended => Cue::Click,
                _ => {
                    self.shake_until =
                        Some(SystemTime::now() + Duration::from_millis(SHAKE_MS));
                    Cue::Error
                }
            }
        } else {
            // backspace or any non-append edit
            Cue::Click
        };

        self.typed = new_text.to_string();
        self.recompute_metrics();

        Feedback {
            cue,
            completed: self.typed == self.ghost,
        }
    }

    fn recompute_metrics(&mut self) {
        let typed_len = self.typed.chars().count();
        let correct_chars = self
            .typed
            .chars()
            .zip(self.ghost_chars.iter())
            .filter(|(t, g)| t == *g)
            .count();

        self.progress = if self.ghost_chars.is_empty() {
            100
        } else {
            100 * correct_chars / self.ghost_chars.len()
        };

        // Every typed position is either a positional match or a mismatch
        // (positions past the ghost's end always mismatch), so
        // typed_len - mismatches == correct_chars.
        self.accuracy = if typed_len == 0 {
            100
        } else {
            100 * correct_chars.min(typed_len) / typed_len
        };

        self.wpm = self.compute_wpm(typed_len);
    }

    fn compute_wpm(&self, typed_len: usize) -> usize {
        if typed_len == 0 {
            return 0;
        }
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let minutes = started_at
            .elapsed()
            .map(|e| e.as_secs_f64() / 60.0)
            .unwrap_or(0.0);
        if minutes <= 0.0 {
            return 0;
        }
        ((typed_len as f64 / 5.0) / minutes).floor() as usize
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// True while the error shake from a recent mistyped character is live.
    pub fn is_shaking(&self) -> bool {
        match self.shake_until {
            Some(until) => SystemTime::now() < until,
            None => false,
        }
    }

    /// Clears an expired shake flag; called from the tick handler.
    pub fn on_tick(&mut self) {
        if let Some(until) = self.shake_until {
            if SystemTime::now() >= until {
                self.shake_until = None;
            }
        }
    }

    /// Cursor sits exactly after the last typed character.
    pub fn cursor_pos(&self) -> usize {
        self.typed.chars().count()
    }

    /// Classification for each ghost index: untyped, correct, or incorrect.
    pub fn char_states(&self) -> Vec<CharState> {
        let typed: Vec<char> = self.typed.chars().collect();
        self.ghost_chars
            .iter()
            .enumerate()
            .map(|(i, g)| match typed.get(i) {
                None => CharState::Untyped,
                Some(t) if t == g => CharState::Correct,
                Some(_) => CharState::Incorrect,
            })
            .collect()
    }

    /// Typed characters past the ghost's end; always mismatched.
    pub fn overflow(&self) -> String {
        self.typed.chars().skip(self.ghost_chars.len()).collect()
    }
}
