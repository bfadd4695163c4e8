use crate::content::Tier;
use chrono::{DateTime, Local};
use directories::ProjectDirs;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The leaderboard keeps only the top entries by wpm.
pub const LEADERBOARD_CAP: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub wpm: usize,
    pub accuracy: usize,
    pub language: String,
    pub tier: Tier,
    pub timestamp: DateTime<Local>,
}

/// Progression and leaderboard persistence. Unlocked tiers only ever grow;
/// the leaderboard is sorted by wpm descending (insertion order as tiebreak)
/// and truncated to [`LEADERBOARD_CAP`].
pub trait PersistenceStore {
    fn unlocked_tiers(&self) -> BTreeSet<Tier>;
    fn set_unlocked_tiers(&self, tiers: &BTreeSet<Tier>) -> io::Result<()>;
    fn append_leaderboard_entry(&self, entry: LeaderboardEntry) -> io::Result<()>;
    fn leaderboard(&self) -> Vec<LeaderboardEntry>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoreDoc {
    unlocked_tiers: BTreeSet<Tier>,
    leaderboard: Vec<LeaderboardEntry>,
}

impl Default for StoreDoc {
    fn default() -> Self {
        let mut unlocked_tiers = BTreeSet::new();
        unlocked_tiers.insert(Tier::Beginner);
        Self {
            unlocked_tiers,
            leaderboard: Vec::new(),
        }
    }
}

fn insert_capped(leaderboard: &mut Vec<LeaderboardEntry>, entry: LeaderboardEntry) {
    leaderboard.push(entry);
    // sorted_by is stable, so equal-wpm entries keep insertion order
    *leaderboard = leaderboard
        .drain(..)
        .sorted_by(|a, b| b.wpm.cmp(&a.wpm))
        .take(LEADERBOARD_CAP)
        .collect();
}

/// JSON-file-backed store under the project data dir. A missing or corrupt
/// file degrades to defaults (beginner unlocked, empty leaderboard).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "codeghost") {
            pd.data_local_dir().join("progress.json")
        } else {
            PathBuf::from("codeghost_progress.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    fn read_doc(&self) -> StoreDoc {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(doc) = serde_json::from_slice::<StoreDoc>(&bytes) {
                return doc;
            }
        }
        StoreDoc::default()
    }

    fn write_doc(&self, doc: &StoreDoc) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(doc).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

impl PersistenceStore for FileStore {
    fn unlocked_tiers(&self) -> BTreeSet<Tier> {
        self.read_doc().unlocked_tiers
    }

    fn set_unlocked_tiers(&self, tiers: &BTreeSet<Tier>) -> io::Result<()> {
        let mut doc = self.read_doc();
        doc.unlocked_tiers = tiers.clone();
        self.write_doc(&doc)
    }

    fn append_leaderboard_entry(&self, entry: LeaderboardEntry) -> io::Result<()> {
        let mut doc = self.read_doc();
        insert_capped(&mut doc.leaderboard, entry);
        self.write_doc(&doc)
    }

    fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.read_doc().leaderboard
    }
}

/// In-memory store for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: RefCell<StoreDoc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            doc: RefCell::new(StoreDoc::default()),
        }
    }
}

impl PersistenceStore for MemoryStore {
    fn unlocked_tiers(&self) -> BTreeSet<Tier> {
        self.doc.borrow().unlocked_tiers.clone()
    }

    fn set_unlocked_tiers(&self, tiers: &BTreeSet<Tier>) -> io::Result<()> {
        self.doc.borrow_mut().unlocked_tiers = tiers.clone();
        Ok(())
    }

    fn append_leaderboard_entry(&self, entry: LeaderboardEntry) -> io::Result<()> {
        insert_capped(&mut self.doc.borrow_mut().leaderboard, entry);
        Ok(())
    }

    fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.doc.borrow().leaderboard.clone()
    }
}
