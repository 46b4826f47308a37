//! Nestable undo-task brackets.
//!
//! Only the outermost `begin_task` opens a task; nested begins are absorbed
//! into it and only the matching outermost `end_task` closes it.
//! `break_task` abandons the whole bracket regardless of depth.

use std::sync::Mutex;

use tracing::debug;

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct TaskState {
    depth: usize,
    label: Option<String>,
    completed: Vec<String>,
}

/// Tracks the current task bracket of a store.
#[derive(Debug, Default)]
pub struct TaskTracker {
    state: Mutex<TaskState>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, label: &str) {
        let mut state = self.state.lock().expect("task lock poisoned");
        if state.depth == 0 {
            state.label = Some(label.to_string());
            debug!(label, "task opened");
        }
        state.depth += 1;
    }

    pub fn end(&self) -> StoreResult<()> {
        let mut state = self.state.lock().expect("task lock poisoned");
        if state.depth == 0 {
            return Err(StoreError::NoOpenTask);
        }
        state.depth -= 1;
        if state.depth == 0 {
            if let Some(label) = state.label.take() {
                debug!(label = %label, "task closed");
                state.completed.push(label);
            }
        }
        Ok(())
    }

    /// Relabel the open task so following changes join it.
    pub fn continue_with(&self, label: &str) -> StoreResult<()> {
        let mut state = self.state.lock().expect("task lock poisoned");
        if state.depth == 0 {
            return Err(StoreError::NoOpenTask);
        }
        state.label = Some(label.to_string());
        Ok(())
    }

    /// Abandon the open task without recording it.
    pub fn break_task(&self) {
        let mut state = self.state.lock().expect("task lock poisoned");
        if state.depth > 0 {
            debug!(depth = state.depth, "task broken");
        }
        state.depth = 0;
        state.label = None;
    }

    pub fn depth(&self) -> usize {
        self.state.lock().expect("task lock poisoned").depth
    }

    /// Labels of completed outermost tasks, oldest first.
    pub fn completed(&self) -> Vec<String> {
        self.state.lock().expect("task lock poisoned").completed.clone()
    }
}
