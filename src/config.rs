//! Service configuration
//!
//! Every setting can come from the command line or the environment (a `.env`
//! file is loaded by the binary before parsing). The engine executable is
//! looked up by platform family unless an explicit path is given.

use crate::error::{EngineError, EngineResult};
use clap::Parser;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Default executable location for Windows-family hosts
pub const WINDOWS_ENGINE_PATH: &str = "Engine/stockfish windows.exe";
/// Default executable location for Unix-family hosts
pub const UNIX_ENGINE_PATH: &str = "Engine/stockfish linux";

/// Command line / environment configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "bestmove-api", version, about = "Stockfish best-move HTTP endpoint")]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "BESTMOVE_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Engine executable; overrides the per-platform lookup table
    #[arg(long, env = "STOCKFISH_PATH")]
    pub engine_path: Option<PathBuf>,

    /// Search depth passed to `go depth`
    #[arg(long, env = "STOCKFISH_DEPTH", default_value_t = 15)]
    pub depth: u32,

    /// Fixed thinking time; takes precedence over `--depth` when set
    #[arg(long, env = "STOCKFISH_MOVETIME_MS")]
    pub movetime_ms: Option<u64>,

    #[arg(long, env = "STOCKFISH_THREADS", default_value_t = 1)]
    pub threads: u32,

    #[arg(long, env = "STOCKFISH_HASH_MB", default_value_t = 16)]
    pub hash_mb: u32,

    /// Extra UCI option as NAME=VALUE (repeatable)
    #[arg(long = "engine-option", value_parser = parse_engine_option)]
    pub engine_options: Vec<(String, String)>,

    /// Maximum number of engine processes alive at once
    #[arg(long, env = "ENGINE_POOL_SIZE", default_value = "4")]
    pub pool_size: NonZeroUsize,

    /// Sessions spawned at startup
    #[arg(long, env = "ENGINE_WARM_SESSIONS", default_value_t = 1)]
    pub warm_sessions: usize,

    /// Upper bound on one engine call, including waiting for a free session
    #[arg(
        long,
        env = "ENGINE_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn search_limit(&self) -> SearchLimit {
        match self.movetime_ms {
            Some(ms) => SearchLimit::MoveTime(Duration::from_millis(ms)),
            None => SearchLimit::Depth(self.depth),
        }
    }

    /// Settings handed to the engine pool
    pub fn engine_settings(&self) -> EngineSettings {
        let mut options = vec![
            ("Threads".to_string(), self.threads.to_string()),
            ("Hash".to_string(), self.hash_mb.to_string()),
        ];
        options.extend(self.engine_options.iter().cloned());

        EngineSettings {
            locator: EngineLocator::with_override(self.engine_path.clone()),
            options,
            limit: self.search_limit(),
            pool_size: self.pool_size.get(),
        }
    }
}

fn parse_engine_option(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}

/// How long the engine should think
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    Depth(u32),
    MoveTime(Duration),
}

impl SearchLimit {
    /// The UCI `go` command for this limit
    pub fn go_command(&self) -> String {
        match self {
            SearchLimit::Depth(depth) => format!("go depth {depth}"),
            SearchLimit::MoveTime(time) => format!("go movetime {}", time.as_millis()),
        }
    }
}

impl Default for SearchLimit {
    fn default() -> Self {
        SearchLimit::Depth(15)
    }
}

/// Everything needed to spawn and drive engine sessions
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub locator: EngineLocator,
    /// `setoption` pairs applied after the handshake, in order
    pub options: Vec<(String, String)>,
    pub limit: SearchLimit,
    pub pool_size: usize,
}

impl EngineSettings {
    /// Settings for an explicit executable with default search options
    pub fn for_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            locator: EngineLocator::with_override(Some(path.into())),
            options: Vec::new(),
            limit: SearchLimit::default(),
            pool_size: 1,
        }
    }
}

/// Platform-family → executable lookup table with an optional override
#[derive(Debug, Clone)]
pub struct EngineLocator {
    table: HashMap<String, PathBuf>,
    override_path: Option<PathBuf>,
}

impl Default for EngineLocator {
    fn default() -> Self {
        let table = HashMap::from([
            ("windows".to_string(), PathBuf::from(WINDOWS_ENGINE_PATH)),
            ("unix".to_string(), PathBuf::from(UNIX_ENGINE_PATH)),
        ]);
        Self {
            table,
            override_path: None,
        }
    }
}

impl EngineLocator {
    pub fn with_override(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
            ..Self::default()
        }
    }

    /// Replace or add the entry for one platform family
    pub fn insert(&mut self, family: impl Into<String>, path: impl Into<PathBuf>) {
        self.table.insert(family.into(), path.into());
    }

    /// Executable for the platform family this binary was built for
    pub fn resolve(&self) -> EngineResult<PathBuf> {
        self.resolve_for(std::env::consts::FAMILY)
    }

    pub fn resolve_for(&self, family: &str) -> EngineResult<PathBuf> {
        if let Some(path) = &self.override_path {
            return Ok(path.clone());
        }
        self.table
            .get(family)
            .cloned()
            .ok_or_else(|| EngineError::NoExecutable {
                family: family.to_string(),
            })
    }
}
