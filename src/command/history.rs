//! Per-diagram undo stack.
//!
//! DESIGN
//! ======
//! The stack lives behind a `tokio::sync::Mutex` that is held for the whole
//! execute or undo, so two imports into one diagram never interleave their
//! store calls. Only successfully executed commands are pushed. A failed undo
//! drops the command; its partial state is abandoned like a failed execute.
//!
//! The stack is bounded. Past `max_depth` the oldest command is discarded and
//! can no longer be undone.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Command, CommandError, Created};
use crate::config::DEFAULT_UNDO_DEPTH;
use crate::store::{DiagramId, DiagramStore};

pub struct CommandQueue {
    diagram_id: DiagramId,
    store: Arc<dyn DiagramStore>,
    max_depth: usize,
    done: Mutex<VecDeque<Box<dyn Command>>>,
}

impl CommandQueue {
    #[must_use]
    pub fn new(diagram_id: DiagramId, store: Arc<dyn DiagramStore>) -> Self {
        Self { diagram_id, store, max_depth: DEFAULT_UNDO_DEPTH, done: Mutex::new(VecDeque::new()) }
    }

    /// Cap the undo stack at `max_depth` commands (at least one).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Execute `cmd` and push it onto the undo stack.
    ///
    /// # Errors
    ///
    /// Returns the command's error; the command is not pushed.
    pub async fn run(&self, mut cmd: Box<dyn Command>) -> Result<Option<Created>, CommandError> {
        let mut done = self.done.lock().await;
        cmd.execute(self.store.as_ref()).await?;
        let created = cmd.created().cloned();
        let description = cmd.description();
        done.push_back(cmd);
        while done.len() > self.max_depth {
            if let Some(evicted) = done.pop_front() {
                debug!(diagram = %self.diagram_id, command = %evicted.description(), "queue: evicted oldest");
            }
        }
        info!(diagram = %self.diagram_id, command = %description, depth = done.len(), "queue: executed");
        Ok(created)
    }

    /// Undo the most recent command. Returns its description, `None` if empty.
    ///
    /// # Errors
    ///
    /// Returns the first store error hit while reverting.
    pub async fn undo_last(&self) -> Result<Option<String>, CommandError> {
        let mut done = self.done.lock().await;
        let Some(mut cmd) = done.pop_back() else {
            return Ok(None);
        };
        cmd.undo(self.store.as_ref()).await?;
        let description = cmd.description();
        info!(diagram = %self.diagram_id, command = %description, depth = done.len(), "queue: undone");
        Ok(Some(description))
    }

    pub async fn depth(&self) -> usize {
        self.done.lock().await.len()
    }
}
