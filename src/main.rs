pub mod audio;
pub mod config;
pub mod console;
pub mod content;
pub mod drill;
pub mod runtime;
pub mod session;
pub mod store;
pub mod ui;

use std::{
    error::Error,
    io::{self, stdin},
    rc::Rc,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::audio::{AudioCueEmitter, BellAudio, NullAudio};
use crate::config::{ConfigStore, FileConfigStore};
use crate::content::{Language, Tier};
use crate::runtime::{AppEvent, CrosstermEventSource, EventSource, Runner, TICK_RATE_MS};
use crate::session::{Advance, GameState, Session};
use crate::store::{FileStore, PersistenceStore};

#[derive(Parser, Debug, Clone)]
#[clap(version, about = "retype ghost code against the clock")]
pub struct Cli {
    /// Language pack to practice.
    #[clap(short = 'l', long, value_enum)]
    language: Option<Language>,

    /// Tier to play; must already be unlocked.
    #[clap(short = 't', long, value_enum)]
    tier: Option<Tier>,

    /// Name recorded on the leaderboard.
    #[clap(short = 'u', long)]
    username: Option<String>,

    /// Disable the terminal bell cues.
    #[clap(long)]
    mute: bool,

    /// Print available languages and unlocked tiers, then exit.
    #[clap(long)]
    list: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    Play,
    Leaderboard,
    TierComplete,
}

pub struct App {
    pub session: Session,
    pub screen: AppScreen,
    pub store: Rc<dyn PersistenceStore>,
    pub audio: Rc<dyn AudioCueEmitter>,
    pub notice: Option<String>,
}

impl App {
    fn new(
        session: Session,
        store: Rc<dyn PersistenceStore>,
        audio: Rc<dyn AudioCueEmitter>,
    ) -> Self {
        Self {
            session,
            screen: AppScreen::Play,
            store,
            audio,
            notice: None,
        }
    }
}

enum ExitReason {
    Quit,
}

fn print_catalog(store: &dyn PersistenceStore) {
    let unlocked = store.unlocked_tiers();
    println!("languages:");
    for lang in Language::ALL {
        println!("  {}", lang);
    }
    println!("tiers:");
    for tier in Tier::ALL {
        let mark = if unlocked.contains(&tier) {
            "unlocked"
        } else {
            "locked"
        };
        println!("  {:<14} {}", tier.to_string(), mark);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let store: Rc<dyn PersistenceStore> = Rc::new(FileStore::new());

    if cli.list {
        print_catalog(store.as_ref());
        return Ok(());
    }

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    if let Some(language) = cli.language {
        config.language = language;
    }
    if let Some(tier) = cli.tier {
        config.tier = tier;
    }
    if let Some(username) = &cli.username {
        config.username = username.clone();
    }
    if cli.mute {
        config.sound = false;
    }

    let unlocked = store.unlocked_tiers();
    if !unlocked.contains(&config.tier) {
        let mut cmd = Cli::command();
        cmd.error(
            ErrorKind::InvalidValue,
            format!(
                "tier '{}' is locked; finish the previous tier to unlock it",
                config.tier
            ),
        )
        .exit();
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let audio: Rc<dyn AudioCueEmitter> = if config.sound {
        Rc::new(BellAudio)
    } else {
        Rc::new(NullAudio)
    };

    let session = match Session::new(
        config.language,
        config.tier,
        config.username.clone(),
        Rc::clone(&audio),
        Rc::clone(&store),
    ) {
        Ok(session) => session,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, err.to_string()).exit();
        }
    };

    enable_raw_mode()?;
    let mut out = io::stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session, Rc::clone(&store), audio);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // remember the last selection for next launch
    config.language = app.session.language;
    config.tier = app.session.tier;
    let _ = config_store.save(&config);

    result.map(|_| ())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<ExitReason, Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );
    run_loop(terminal, app, &runner)
}

/// Drives the app until the user quits. Generic over the event source so
/// headless tests can feed scripted keys and ticks.
fn run_loop<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<ExitReason, Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            AppEvent::Tick => {
                app.session.on_tick(TICK_RATE_MS);
                if app.session.state == GameState::Completed && app.screen == AppScreen::Play {
                    app.screen = AppScreen::TierComplete;
                }
            }
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if handle_key(app, key) {
                    return Ok(ExitReason::Quit);
                }
            }
        }
    }
}

/// Returns true when the app should exit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    if key.code == KeyCode::Char('l') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.screen = match app.screen {
            AppScreen::Leaderboard => AppScreen::Play,
            _ => AppScreen::Leaderboard,
        };
        return false;
    }

    match app.screen {
        AppScreen::Leaderboard => match key.code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                app.screen = AppScreen::Play;
                false
            }
            _ => false,
        },
        AppScreen::TierComplete => handle_tier_complete_key(app, key),
        AppScreen::Play => handle_play_key(app, key),
    }
}

fn handle_tier_complete_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => {
            let Some(next) = app.session.tier.next() else {
                app.notice = Some("all tiers cleared".to_string());
                return false;
            };
            match Session::new(
                app.session.language,
                next,
                app.session.username().to_string(),
                Rc::clone(&app.audio),
                Rc::clone(&app.store),
            ) {
                Ok(session) => {
                    app.session = session;
                    app.screen = AppScreen::Play;
                    app.notice = None;
                }
                Err(err) => {
                    app.notice = Some(err.to_string());
                }
            }
            false
        }
        _ => false,
    }
}

fn handle_play_key(app: &mut App, key: KeyEvent) -> bool {
    match app.session.state {
        GameState::Typing => match key.code {
            KeyCode::Esc => true,
            KeyCode::Left => {
                app.session.retry();
                false
            }
            KeyCode::Backspace => {
                app.session.backspace();
                false
            }
            KeyCode::Enter => {
                app.session.type_char('\n');
                false
            }
            KeyCode::Tab => {
                app.session.type_char('\t');
                false
            }
            KeyCode::Char(c) => {
                app.session.type_char(c);
                false
            }
            _ => false,
        },
        GameState::Running => {
            let awaiting = app
                .session
                .console
                .as_ref()
                .is_some_and(|c| c.current_prompt().is_some());
            if !awaiting {
                return key.code == KeyCode::Esc;
            }
            match key.code {
                KeyCode::Esc => true,
                KeyCode::Char(c) => {
                    if let Some(console) = app.session.console.as_mut() {
                        console.answer.push(c);
                    }
                    false
                }
                KeyCode::Backspace => {
                    if let Some(console) = app.session.console.as_mut() {
                        console.answer.pop();
                    }
                    false
                }
                KeyCode::Enter => {
                    let text = app
                        .session
                        .console
                        .as_ref()
                        .map(|c| c.answer.clone())
                        .unwrap_or_default();
                    app.session.submit_answer(&text);
                    false
                }
                _ => false,
            }
        }
        GameState::Success => match key.code {
            KeyCode::Esc => true,
            KeyCode::Char('n') => {
                if app.session.advance() == Advance::TierCompleted {
                    app.screen = AppScreen::TierComplete;
                }
                false
            }
            KeyCode::Char('r') => {
                app.session.retry();
                false
            }
            _ => false,
        },
        GameState::Completed => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => true,
            _ => false,
        },
    }
}
