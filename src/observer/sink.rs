// ABOUTME: Status sinks - where the observer sends each rendered frame.
// ABOUTME: Provides a console status board and an in-memory sink for tests.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::RwLock;

use super::observer::{AgentRow, Frame};
use crate::agent::Phase;

/// Trait for rendering observer frames.
///
/// Implement this trait to send agent status somewhere other than the
/// console (a TUI, a socket, a metrics pipeline).
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Render one frame.
    async fn render(&self, frame: &Frame) -> Result<(), anyhow::Error>;
}

/// Console status board, one line per agent.
///
/// With `in_place`, each frame overwrites the previous one using ANSI cursor
/// movement instead of scrolling.
pub struct ConsoleSink<W> {
    out: Mutex<W>,
    in_place: bool,
    drawn: Mutex<usize>,
}

impl ConsoleSink<std::io::Stdout> {
    /// A status board on standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// A status board writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            in_place: false,
            drawn: Mutex::new(0),
        }
    }

    /// Redraw each frame over the previous one.
    pub fn in_place(mut self) -> Self {
        self.in_place = true;
        self
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    /// Format one agent's line.
    pub fn format_row(row: &AgentRow) -> String {
        let status = match row.phase {
            Phase::Dead => "dead X(".to_string(),
            _ if row.feasting => "feasting".to_string(),
            phase => phase.to_string(),
        };
        format!(
            "Agent {:>3}   Status: {:<10}   Hunger: {:>3.0}   Feasts: {}",
            row.agent, status, row.level, row.feasts
        )
    }
}

#[async_trait]
impl<W: Write + Send> StatusSink for ConsoleSink<W> {
    async fn render(&self, frame: &Frame) -> Result<(), anyhow::Error> {
        let mut out = self.out.lock();
        let mut drawn = self.drawn.lock();

        if self.in_place && *drawn > 0 {
            write!(out, "\x1b[{}A", *drawn)?;
        }
        for row in &frame.rows {
            // Clear to end of line so shorter lines leave no residue.
            writeln!(out, "{}\x1b[K", Self::format_row(row))?;
        }
        out.flush()?;

        *drawn = frame.rows.len();
        Ok(())
    }
}

/// In-memory sink that keeps every frame.
///
/// Useful for tests and for post-run analysis.
pub struct MemorySink {
    frames: RwLock<Vec<Frame>>,
}

impl MemorySink {
    /// Create a new empty sink.
    pub fn new() -> Self {
        Self {
            frames: RwLock::new(Vec::new()),
        }
    }

    /// Create a new sink wrapped in Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// All frames rendered so far.
    pub async fn frames(&self) -> Vec<Frame> {
        self.frames.read().await.clone()
    }

    /// The most recent frame.
    pub async fn last(&self) -> Option<Frame> {
        self.frames.read().await.last().cloned()
    }

    /// Number of frames rendered.
    pub async fn len(&self) -> usize {
        self.frames.read().await.len()
    }

    /// Check if nothing has been rendered.
    pub async fn is_empty(&self) -> bool {
        self.frames.read().await.is_empty()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusSink for MemorySink {
    async fn render(&self, frame: &Frame) -> Result<(), anyhow::Error> {
        self.frames.write().await.push(frame.clone());
        Ok(())
    }
}
