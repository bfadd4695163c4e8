use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use serde_json::from_str;
use std::collections::BTreeMap;

static CONTENT_DIR: Dir = include_dir!("src/content");

/// Difficulty brackets, in unlock order. Completing a tier unlocks the next
/// one in this order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    Beginner,
    Intermediate,
    Master,
    Legend,
    Shadow,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Beginner,
        Tier::Intermediate,
        Tier::Master,
        Tier::Legend,
        Tier::Shadow,
    ];

    /// The tier unlocked by completing this one. `Shadow` is the end of the
    /// ladder.
    pub fn next(&self) -> Option<Tier> {
        match self {
            Tier::Beginner => Some(Tier::Intermediate),
            Tier::Intermediate => Some(Tier::Master),
            Tier::Master => Some(Tier::Legend),
            Tier::Legend => Some(Tier::Shadow),
            Tier::Shadow => None,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    #[strum(serialize = "JavaScript")]
    Javascript,
    Rust,
    Go,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::Javascript,
        Language::Rust,
        Language::Go,
    ];

    fn file_name(&self) -> &'static str {
        match self {
            Language::Python => "python.json",
            Language::Javascript => "javascript.json",
            Language::Rust => "rust.json",
            Language::Go => "go.json",
        }
    }

    pub fn pack(&self) -> LanguagePack {
        read_pack_from_file(self.file_name())
    }
}

/// Reduces the collected prompt answers to the program's final output.
/// Stands in for the arbitrary closures the lesson data could not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputHandler {
    Sum,
    Product,
    Concat,
    Echo,
}

impl InputHandler {
    pub fn apply(&self, args: &[String]) -> String {
        match self {
            InputHandler::Sum => fold_numeric(args, 0.0, |acc, x| acc + x),
            InputHandler::Product => fold_numeric(args, 1.0, |acc, x| acc * x),
            InputHandler::Concat => args.concat(),
            InputHandler::Echo => args.join("\n"),
        }
    }
}

fn fold_numeric(args: &[String], init: f64, f: impl Fn(f64, f64) -> f64) -> String {
    let mut acc = init;
    for arg in args {
        match arg.trim().parse::<f64>() {
            Ok(x) => acc = f(acc, x),
            Err(_) => return "NaN".to_string(),
        }
    }
    format_number(acc)
}

/// Integral results render without a fractional part ("5", not "5.0").
fn format_number(x: f64) -> String {
    if !x.is_finite() {
        "NaN".to_string()
    } else if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputSpec {
    pub prompts: Vec<String>,
    pub handler: InputHandler,
}

/// One typing challenge. `output` is opaque display content; when `input` is
/// present the final output comes from the handler instead.
#[derive(Debug, Clone, Deserialize)]
pub struct Level {
    pub ghost: String,
    pub output: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub input: Option<InputSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguagePack {
    pub name: String,
    pub tiers: BTreeMap<Tier, Vec<Level>>,
}

/// Levels for a language/tier pair, in play order. Empty when the pair has no
/// defined levels; callers surface that as a configuration error.
pub fn levels(language: Language, tier: Tier) -> Vec<Level> {
    language
        .pack()
        .tiers
        .get(&tier)
        .cloned()
        .unwrap_or_default()
}

fn read_pack_from_file(file_name: &str) -> LanguagePack {
    let file = CONTENT_DIR
        .get_file(file_name)
        .expect("Lesson file not found");

    let file_as_str = file
        .contents_utf8()
        .expect("Unable to interpret lesson file as a string");

    from_str(file_as_str).expect("Unable to deserialize lesson json")
}
