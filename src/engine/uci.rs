//! One UCI conversation with an engine process

use crate::config::SearchLimit;
use crate::error::{EngineError, EngineResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// How long `quit` may take before the process is killed
const QUIT_GRACE: Duration = Duration::from_millis(500);

/// A running engine process that has completed the UCI handshake
///
/// The process is killed when the session is dropped.
pub struct UciSession {
    path: PathBuf,
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl std::fmt::Debug for UciSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UciSession")
            .field("path", &self.path)
            .field("pid", &self.child.id())
            .finish()
    }
}

impl UciSession {
    /// Start the executable, run the `uci` handshake and apply `options`
    pub async fn spawn(path: &Path, options: &[(String, String)]) -> EngineResult<Self> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Unavailable {
                path: path.to_path_buf(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("engine stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("engine stdout was not captured"))?;

        let mut session = Self {
            path: path.to_path_buf(),
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
        };

        session.send("uci").await?;
        session.wait_for("uciok").await?;
        for (name, value) in options {
            session
                .send(&format!("setoption name {name} value {value}"))
                .await?;
        }
        session.sync().await?;

        tracing::info!(
            "[ENGINE] Started {:?} (pid {:?})",
            session.path,
            session.child.id()
        );
        Ok(session)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the engine process is still running
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn send(&mut self, command: &str) -> EngineResult<()> {
        tracing::debug!("[UCI] > {}", command);
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self, expected: &'static str) -> EngineResult<String> {
        match self.lines.next_line().await? {
            Some(line) => {
                tracing::trace!("[UCI] < {}", line);
                Ok(line)
            }
            None => Err(EngineError::Disconnected { expected }),
        }
    }

    /// Skip output until a line starting with `token`
    async fn wait_for(&mut self, token: &'static str) -> EngineResult<()> {
        loop {
            let line = self.read_line(token).await?;
            if line.trim_start().starts_with(token) {
                return Ok(());
            }
        }
    }

    /// `isready` / `readyok` round trip
    pub async fn sync(&mut self) -> EngineResult<()> {
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    /// Search `fen` from a fresh game state and return the engine's move verbatim
    pub async fn best_move(&mut self, fen: &str, limit: SearchLimit) -> EngineResult<String> {
        let fen = single_line_fen(fen)?;

        self.send("ucinewgame").await?;
        self.sync().await?;
        self.send(&format!("position fen {fen}")).await?;
        self.send(&limit.go_command()).await?;

        loop {
            let line = self.read_line("bestmove").await?;
            if let Some(result) = parse_bestmove(&line) {
                let mv = result?;
                tracing::debug!("[ENGINE] {} -> {}", fen, mv);
                return Ok(mv);
            }
        }
    }

    /// Ask the engine to exit, killing it if it does not within a short grace period
    pub async fn quit(mut self) {
        if self.send("quit").await.is_err() {
            return;
        }
        match tokio::time::timeout(QUIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!("[ENGINE] {:?} exited with {}", self.path, status),
            Ok(Err(e)) => tracing::warn!("[ENGINE] Failed to reap {:?}: {}", self.path, e),
            Err(_) => tracing::warn!("[ENGINE] {:?} ignored quit, killing", self.path),
        }
    }
}

/// Trimmed FEN, or a protocol error if it would span more than one UCI command
pub(crate) fn single_line_fen(fen: &str) -> EngineResult<&str> {
    let fen = fen.trim();
    if fen.contains(['\n', '\r']) {
        return Err(EngineError::Protocol {
            line: format!("position fen {fen}"),
        });
    }
    Ok(fen)
}

/// Extract the move from a `bestmove <move> [ponder <move>]` line
///
/// Returns `None` for any other line. The move token is not interpreted, so
/// `(none)` and `0000` come back as-is for the move validator to reject.
pub fn parse_bestmove(line: &str) -> Option<EngineResult<String>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("bestmove") {
        return None;
    }
    Some(match tokens.next() {
        Some(mv) => Ok(mv.to_string()),
        None => Err(EngineError::Protocol {
            line: line.to_string(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_bestmove() {
        let mv = parse_bestmove("bestmove e2e4").unwrap().unwrap();
        assert_eq!(mv, "e2e4");
    }

    #[test]
    fn test_parse_bestmove_with_ponder() {
        let mv = parse_bestmove("bestmove e7e8q ponder a7a8").unwrap().unwrap();
        assert_eq!(mv, "e7e8q");
    }

    #[test]
    fn test_info_lines_are_skipped() {
        assert!(parse_bestmove("info depth 12 score cp 31 pv e2e4 e7e5").is_none());
        assert!(parse_bestmove("readyok").is_none());
        assert!(parse_bestmove("").is_none());
    }

    #[test]
    fn test_bestmove_without_move_is_protocol_error() {
        let err = parse_bestmove("bestmove").unwrap().unwrap_err();
        assert!(matches!(err, EngineError::Protocol { .. }));
    }

    #[test]
    fn test_none_move_is_passed_through() {
        let mv = parse_bestmove("bestmove (none)").unwrap().unwrap();
        assert_eq!(mv, "(none)");
    }

    #[test]
    fn test_single_line_fen() {
        assert_eq!(
            single_line_fen("  4k3/8/8/8/8/8/8/4K3 w - - 0 1\n").unwrap(),
            "4k3/8/8/8/8/8/8/4K3 w - - 0 1"
        );
        let err = single_line_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1\ngo infinite").unwrap_err();
        assert!(matches!(err, EngineError::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let err = UciSession::spawn(Path::new("./no/such/stockfish"), &[])
            .await
            .unwrap_err();
        assert!(err.is_unavailable(), "got {err:?}");
    }
}
