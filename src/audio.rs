use std::cell::RefCell;
use std::io::Write;

/// Fire-and-forget feedback cues. The session never waits on these and must
/// behave identically when they are muted.
pub trait AudioCueEmitter {
    fn click(&self);
    fn error(&self);
    fn success(&self);
    fn level_up(&self);
}

/// Muted cues.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioCueEmitter for NullAudio {
    fn click(&self) {}
    fn error(&self) {}
    fn success(&self) {}
    fn level_up(&self) {}
}

/// Terminal BEL on the salient cues. Per-keystroke clicks stay silent: a BEL
/// on every keypress is unusable.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellAudio;

impl BellAudio {
    fn bell(&self) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
    }
}

impl AudioCueEmitter for BellAudio {
    fn click(&self) {}

    fn error(&self) {
        self.bell();
    }

    fn success(&self) {
        self.bell();
    }

    fn level_up(&self) {
        // Doubled success chime.
        self.bell();
        self.bell();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    Click,
    Error,
    Success,
    LevelUp,
}

/// Records every cue for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub cues: RefCell<Vec<CueKind>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: CueKind) -> usize {
        self.cues.borrow().iter().filter(|c| **c == kind).count()
    }
}

impl AudioCueEmitter for RecordingAudio {
    fn click(&self) {
        self.cues.borrow_mut().push(CueKind::Click);
    }

    fn error(&self) {
        self.cues.borrow_mut().push(CueKind::Error);
    }

    fn success(&self) {
        self.cues.borrow_mut().push(CueKind::Success);
    }

    fn level_up(&self) {
        self.cues.borrow_mut().push(CueKind::LevelUp);
    }
}
