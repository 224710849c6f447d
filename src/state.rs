//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the diagram store, the process-wide layout defaults, and one
//! [`CommandQueue`] per diagram, created lazily on first use. The queue map
//! lock is only held long enough to look up or insert a queue; the queue's
//! own lock serializes the commands of one diagram and bounds its depth.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::command::CommandQueue;
use crate::config::{DEFAULT_UNDO_DEPTH, LayoutConfig};
use crate::store::{DiagramId, DiagramStore};

/// Clone is required by Axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DiagramStore>,
    pub layout: LayoutConfig,
    undo_depth: usize,
    queues: Arc<RwLock<HashMap<DiagramId, Arc<CommandQueue>>>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn DiagramStore>, layout: LayoutConfig) -> Self {
        Self { store, layout, undo_depth: DEFAULT_UNDO_DEPTH, queues: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Cap every diagram's undo stack at `depth` commands.
    #[must_use]
    pub fn with_undo_depth(mut self, depth: usize) -> Self {
        self.undo_depth = depth.max(1);
        self
    }

    /// The command queue for `diagram`, created on first use.
    pub async fn queue(&self, diagram: DiagramId) -> Arc<CommandQueue> {
        if let Some(q) = self.queues.read().await.get(&diagram) {
            return q.clone();
        }
        let mut queues = self.queues.write().await;
        queues
            .entry(diagram)
            .or_insert_with(|| Arc::new(CommandQueue::new(diagram, self.store.clone()).with_max_depth(self.undo_depth)))
            .clone()
    }

    /// Queue for `diagram` only if one exists already.
    pub async fn existing_queue(&self, diagram: DiagramId) -> Option<Arc<CommandQueue>> {
        self.queues.read().await.get(&diagram).cloned()
    }
}
