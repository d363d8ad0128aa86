use crate::interpreter::Config;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

const HISTORY_PATH: &str = "edlisp_history.txt";

/// Arguments of the `edlisp` batch runner.
#[derive(Debug, Parser)]
#[command(name = "edlisp", version, about = "Evaluate edlisp expressions and files")]
pub struct RunArgs {
    #[arg(long, default_value_t = Config::default().max_depth)]
    pub max_depth: usize,
    /// Expression to evaluate before any file; may be repeated.
    #[arg(short, long = "eval", value_name = "EXPR")]
    pub eval: Vec<String>,
    pub files: Vec<PathBuf>,
}

impl RunArgs {
    pub fn config(&self) -> Config {
        Config::default().with_max_depth(self.max_depth)
    }
}

/// Arguments of the interactive `repl` binary.
#[derive(Debug, Parser)]
#[command(name = "repl", version, about = "Interactive edlisp session")]
pub struct ReplArgs {
    #[arg(long, default_value_t = Config::default().max_depth)]
    pub max_depth: usize,
    #[arg(long, default_value_t = EditMode::Vi)]
    pub edit_mode: EditMode,
    #[arg(short = 'H', long = "history", default_value = HISTORY_PATH)]
    pub history_path: PathBuf,
}

impl ReplArgs {
    pub fn config(&self) -> Config {
        Config::default().with_max_depth(self.max_depth)
    }
}

#[derive(Debug, ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Vi,
    Emacs,
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vi => write!(f, "vi"),
            Self::Emacs => write!(f, "emacs"),
        }
    }
}

impl From<EditMode> for rustyline::config::EditMode {
    fn from(mode: EditMode) -> Self {
        match mode {
            EditMode::Vi => rustyline::config::EditMode::Vi,
            EditMode::Emacs => rustyline::config::EditMode::Emacs,
        }
    }
}
