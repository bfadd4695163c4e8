use crate::audio::AudioCueEmitter;
use crate::console::Console;
use crate::content::{self, Language, Level, Tier};
use crate::drill::{Cue, Drill};
use crate::store::{LeaderboardEntry, PersistenceStore};
use chrono::Local;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

/// Lifecycle of the current level attempt. `Typing` is the entry state; the
/// transition into `Running` fires exactly once, at the instant the typed
/// text equals the ghost. `Completed` marks the tier finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Typing,
    Running,
    Success,
    Completed,
}

/// What `advance()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextLevel,
    TierCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    NoLevels { language: Language, tier: Tier },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoLevels { language, tier } => {
                write!(f, "no levels defined for {} / {}", language, tier)
            }
        }
    }
}

impl Error for SessionError {}

/// Sequences the levels of one language/tier: feeds keystrokes to the active
/// [`Drill`], hands off to the [`Console`] on completion, and handles
/// retry/advance and tier unlock. Collaborators are injected at construction.
pub struct Session {
    pub language: Language,
    pub tier: Tier,
    levels: Vec<Level>,
    level_index: usize,
    pub state: GameState,
    pub drill: Drill,
    pub console: Option<Console>,
    username: String,
    audio: Rc<dyn AudioCueEmitter>,
    store: Rc<dyn PersistenceStore>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("language", &self.language)
            .field("tier", &self.tier)
            .field("level_index", &self.level_index)
            .field("state", &self.state)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        language: Language,
        tier: Tier,
        username: String,
        audio: Rc<dyn AudioCueEmitter>,
        store: Rc<dyn PersistenceStore>,
    ) -> Result<Self, SessionError> {
        Self::from_levels(
            content::levels(language, tier),
            language,
            tier,
            username,
            audio,
            store,
        )
    }

    /// Constructor over an explicit level list; used directly by tests.
    pub fn from_levels(
        levels: Vec<Level>,
        language: Language,
        tier: Tier,
        username: String,
        audio: Rc<dyn AudioCueEmitter>,
        store: Rc<dyn PersistenceStore>,
    ) -> Result<Self, SessionError> {
        if levels.is_empty() {
            return Err(SessionError::NoLevels { language, tier });
        }
        let drill = Drill::new(levels[0].ghost.clone());
        Ok(Self {
            language,
            tier,
            levels,
            level_index: 0,
            state: GameState::Typing,
            drill,
            console: None,
            username,
            audio,
            store,
        })
    }

    /// Index guard: the modulo keeps a stale index from ever reaching past
    /// the end of the level list.
    pub fn current_level(&self) -> &Level {
        &self.levels[self.level_index % self.levels.len()]
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Entry point for input events while typing. Ignored in any other state,
    /// which also makes the Typing -> Running transition (and its single
    /// leaderboard emission) unrepeatable for the attempt.
    pub fn on_input_changed(&mut self, new_text: &str) {
        if self.state != GameState::Typing {
            return;
        }

        let feedback = self.drill.apply_input(new_text);
        match feedback.cue {
            Cue::Click => self.audio.click(),
            Cue::Error => self.audio.error(),
        }

        if feedback.completed {
            self.audio.success();
            let _ = self.store.append_leaderboard_entry(LeaderboardEntry {
                username: self.username.clone(),
                wpm: self.drill.wpm,
                accuracy: self.drill.accuracy,
                language: self.language.to_string(),
                tier: self.tier,
                timestamp: Local::now(),
            });
            self.state = GameState::Running;
            self.console = Some(Console::new(self.current_level().clone()));
        }
    }

    /// Appends one character to the typed buffer.
    pub fn type_char(&mut self, c: char) {
        let mut text = self.drill.typed.clone();
        text.push(c);
        self.on_input_changed(&text);
    }

    /// Removes the last typed character, if any.
    pub fn backspace(&mut self) {
        let mut text = self.drill.typed.clone();
        text.pop();
        self.on_input_changed(&text);
    }

    /// Drives time forward: fires due console tasks and expires the shake
    /// flag. Promotes Running -> Success when the console finishes.
    pub fn on_tick(&mut self, dt_ms: u64) {
        self.drill.on_tick();
        if let Some(console) = &mut self.console {
            console.on_tick(dt_ms);
            if console.is_done() && self.state == GameState::Running {
                self.state = GameState::Success;
            }
        }
    }

    /// Submits an answer for the console's current prompt. No-op unless a
    /// prompt is awaiting input.
    pub fn submit_answer(&mut self, text: &str) {
        if let Some(console) = &mut self.console {
            console.submit_answer(text);
            if console.is_done() && self.state == GameState::Running {
                self.state = GameState::Success;
            }
        }
    }

    /// Abandons the current attempt: fresh drill, console torn down (pending
    /// console tasks die with it), level index unchanged.
    pub fn retry(&mut self) {
        let ghost = self.current_level().ghost.clone();
        self.drill = Drill::new(ghost);
        self.console = None;
        self.state = GameState::Typing;
    }

    /// Moves to the next level, or completes the tier after the final one.
    /// Tier completion unlocks the next tier in the fixed order; the unlock
    /// is an idempotent set union, so replaying a tier never duplicates it.
    pub fn advance(&mut self) -> Advance {
        if self.level_index + 1 < self.levels.len() {
            self.level_index += 1;
            self.retry();
            Advance::NextLevel
        } else {
            self.audio.level_up();
            self.unlock_next_tier();
            self.console = None;
            self.state = GameState::Completed;
            Advance::TierCompleted
        }
    }

    fn unlock_next_tier(&self) {
        if let Some(next) = self.tier.next() {
            let mut unlocked = self.store.unlocked_tiers();
            if unlocked.insert(next) {
                let _ = self.store.set_unlocked_tiers(&unlocked);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{CueKind, RecordingAudio};
    use crate::content::{InputHandler, InputSpec};
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    fn level(ghost: &str, output: &str) -> Level {
        Level {
            ghost: ghost.to_string(),
            output: output.to_string(),
            explanation: None,
            input: None,
        }
    }

    fn input_level(ghost: &str, prompts: &[&str], handler: InputHandler) -> Level {
        Level {
            input: Some(InputSpec {
                prompts: prompts.iter().map(|p| p.to_string()).collect(),
                handler,
            }),
            ..level(ghost, "")
        }
    }

    struct Harness {
        session: Session,
        audio: Rc<RecordingAudio>,
        store: Rc<MemoryStore>,
    }

    fn harness(levels: Vec<Level>) -> Harness {
        let audio = Rc::new(RecordingAudio::new());
        let store = Rc::new(MemoryStore::new());
        let session = Session::from_levels(
            levels,
            Language::Python,
            Tier::Beginner,
            "ghost".to_string(),
            audio.clone(),
            store.clone(),
        )
        .unwrap();
        Harness {
            session,
            audio,
            store,
        }
    }

    fn type_text(session: &mut Session, text: &str) {
        for c in text.chars() {
            session.type_char(c);
        }
    }

    #[test]
    fn test_empty_levels_is_configuration_error() {
        let audio = Rc::new(RecordingAudio::new());
        let store = Rc::new(MemoryStore::new());
        let err = Session::from_levels(
            vec![],
            Language::Rust,
            Tier::Shadow,
            "ghost".to_string(),
            audio,
            store,
        )
        .unwrap_err();

        assert_matches!(
            err,
            SessionError::NoLevels {
                language: Language::Rust,
                tier: Tier::Shadow
            }
        );
        assert!(err.to_string().contains("Rust"));
        assert!(err.to_string().contains("shadow"));
    }

    #[test]
    fn test_session_starts_typing_first_level() {
        let h = harness(vec![level("ab", "ok"), level("cd", "ok")]);
        assert_eq!(h.session.state, GameState::Typing);
        assert_eq!(h.session.level_index(), 0);
        assert_eq!(h.session.current_level().ghost, "ab");
    }

    #[test]
    fn test_completion_transitions_to_running_once() {
        let mut h = harness(vec![level("ab", "ok")]);
        type_text(&mut h.session, "ab");

        assert_eq!(h.session.state, GameState::Running);
        assert!(h.session.console.is_some());
        assert_eq!(h.audio.count(CueKind::Success), 1);
        assert_eq!(h.store.leaderboard().len(), 1);

        // Further input in Running is ignored: no second emission
        h.session.on_input_changed("ab");
        h.session.on_input_changed("ab");
        assert_eq!(h.audio.count(CueKind::Success), 1);
        assert_eq!(h.store.leaderboard().len(), 1);
    }

    #[test]
    fn test_leaderboard_entry_uses_final_snapshot() {
        let mut h = harness(vec![level("ab", "ok")]);
        type_text(&mut h.session, "ab");

        let board = h.store.leaderboard();
        assert_eq!(board[0].username, "ghost");
        assert_eq!(board[0].accuracy, 100);
        assert_eq!(board[0].language, "Python");
        assert_eq!(board[0].tier, Tier::Beginner);
    }

    #[test]
    fn test_cues_per_keystroke() {
        let mut h = harness(vec![level("ab", "ok")]);
        h.session.type_char('a'); // correct
        h.session.type_char('x'); // wrong
        h.session.backspace(); // neutral

        assert_eq!(h.audio.count(CueKind::Click), 2);
        assert_eq!(h.audio.count(CueKind::Error), 1);
    }

    #[test]
    fn test_running_reaches_success_after_schedule() {
        let mut h = harness(vec![level("ab", "ok")]);
        type_text(&mut h.session, "ab");

        h.session.on_tick(1000);
        assert_eq!(h.session.state, GameState::Running);

        h.session.on_tick(500);
        assert_eq!(h.session.state, GameState::Success);
        let console = h.session.console.as_ref().unwrap();
        assert_eq!(console.final_output.as_deref(), Some("ok"));
    }

    #[test]
    fn test_prompted_level_full_flow() {
        let mut h = harness(vec![input_level(
            "a+b",
            &["Enter a: ", "Enter b: "],
            InputHandler::Sum,
        )]);
        type_text(&mut h.session, "a+b");
        h.session.on_tick(1500);
        assert_eq!(h.session.state, GameState::Running);

        h.session.submit_answer("2");
        assert_eq!(h.session.state, GameState::Running);

        h.session.submit_answer("3");
        assert_eq!(h.session.state, GameState::Success);
        let console = h.session.console.as_ref().unwrap();
        assert_eq!(console.final_output.as_deref(), Some("5"));
        assert!(console.log.contains(&"Enter a: 2".to_string()));
        assert!(console.log.contains(&"Enter b: 3".to_string()));
    }

    #[test]
    fn test_retry_discards_console_and_pending_tasks() {
        let mut h = harness(vec![level("ab", "ok")]);
        type_text(&mut h.session, "ab");

        // Only the first log line has fired when the user bails
        h.session.on_tick(600);
        assert_eq!(h.session.console.as_ref().unwrap().log.len(), 1);

        h.session.retry();
        assert_eq!(h.session.state, GameState::Typing);
        assert!(h.session.console.is_none());
        assert_eq!(h.session.drill.typed, "");

        // Complete again: the new console starts from a fresh clock, so
        // nothing from the discarded schedule can leak into it.
        type_text(&mut h.session, "ab");
        h.session.on_tick(400);
        let console = h.session.console.as_ref().unwrap();
        assert!(console.log.is_empty());
    }

    #[test]
    fn test_retry_keeps_level_index() {
        let mut h = harness(vec![level("ab", "ok"), level("cd", "ok")]);
        type_text(&mut h.session, "ab");
        h.session.on_tick(1500);
        assert_eq!(h.session.advance(), Advance::NextLevel);
        assert_eq!(h.session.level_index(), 1);

        h.session.retry();
        assert_eq!(h.session.level_index(), 1);
        assert_eq!(h.session.current_level().ghost, "cd");
    }

    #[test]
    fn test_advance_resets_attempt_state() {
        let mut h = harness(vec![level("ab", "ok"), level("cd", "ok")]);
        type_text(&mut h.session, "ab");
        h.session.on_tick(1500);

        assert_eq!(h.session.advance(), Advance::NextLevel);
        assert_eq!(h.session.state, GameState::Typing);
        assert!(h.session.console.is_none());
        assert_eq!(h.session.drill.ghost, "cd");
        assert_eq!(h.session.drill.typed, "");
        assert_eq!(h.session.drill.progress, 0);
        assert_eq!(h.session.drill.accuracy, 100);
        assert_eq!(h.session.drill.wpm, 0);
    }

    #[test]
    fn test_tier_completion_on_final_level() {
        // Scenario D, scaled down: advancing past the last level completes
        // the tier and unlocks the next one.
        let mut h = harness(vec![level("ab", "ok")]);
        type_text(&mut h.session, "ab");
        h.session.on_tick(1500);

        assert_eq!(h.session.advance(), Advance::TierCompleted);
        assert_eq!(h.session.state, GameState::Completed);
        assert_eq!(h.audio.count(CueKind::LevelUp), 1);
        assert!(h.store.unlocked_tiers().contains(&Tier::Intermediate));
    }

    #[test]
    fn test_tier_unlock_is_idempotent() {
        let mut h = harness(vec![level("ab", "ok")]);

        for _ in 0..2 {
            h.session.retry();
            type_text(&mut h.session, "ab");
            h.session.on_tick(1500);
            assert_eq!(h.session.advance(), Advance::TierCompleted);
        }

        let unlocked = h.store.unlocked_tiers();
        assert_eq!(unlocked.len(), 2);
        assert!(unlocked.contains(&Tier::Beginner));
        assert!(unlocked.contains(&Tier::Intermediate));
    }

    #[test]
    fn test_shadow_tier_completion_unlocks_nothing() {
        let audio = Rc::new(RecordingAudio::new());
        let store = Rc::new(MemoryStore::new());
        let mut session = Session::from_levels(
            vec![level("ab", "ok")],
            Language::Python,
            Tier::Shadow,
            "ghost".to_string(),
            audio,
            store.clone(),
        )
        .unwrap();

        type_text(&mut session, "ab");
        session.on_tick(1500);
        assert_eq!(session.advance(), Advance::TierCompleted);

        let unlocked = store.unlocked_tiers();
        assert_eq!(unlocked.len(), 1);
        assert!(unlocked.contains(&Tier::Beginner));
    }

    #[test]
    fn test_submit_answer_without_console_is_noop() {
        let mut h = harness(vec![level("ab", "ok")]);
        h.session.submit_answer("nothing to answer");
        assert_eq!(h.session.state, GameState::Typing);
    }

    #[test]
    fn test_current_level_index_guard() {
        let h = harness(vec![level("ab", "ok"), level("cd", "ok")]);
        // level_index can never run past the list even if it were stale
        assert_eq!(h.session.current_level().ghost, "ab");
        assert_eq!(h.session.level_count(), 2);
    }
}
