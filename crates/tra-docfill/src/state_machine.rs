//! Session State Machine — the phases of one mounted session.
//!
//! ```text
//! LoadingContext    → LoadingItem | LoadingCategories
//! LoadingItem       → LoadingCategories
//! LoadingCategories → Ready
//! Ready             → Filling | LoadingCategories
//! Filling           → Ready
//! Error             → Ready | Filling | LoadingCategories | LoadingContext
//! (any non-Error)   → Error
//! ```
//!
//! `Error` is not terminal: the user dismisses the message or retries.
//! Every transition is logged and kept for diagnostics.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for board/item identifiers from the platform.
    LoadingContext,
    /// Reading the current item's field values.
    LoadingItem,
    /// Locating the template board and loading order types.
    LoadingCategories,
    /// Browsing and selecting documents.
    Ready,
    /// A fill batch is running.
    Filling,
    /// The last action failed; its message is on display.
    Error,
}

impl SessionState {
    /// Whether the session is fetching before it can be used.
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            Self::LoadingContext | Self::LoadingItem | Self::LoadingCategories
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadingContext => write!(f, "LoadingContext"),
            Self::LoadingItem => write!(f, "LoadingItem"),
            Self::LoadingCategories => write!(f, "LoadingCategories"),
            Self::Ready => write!(f, "Ready"),
            Self::Filling => write!(f, "Filling"),
            Self::Error => write!(f, "Error"),
        }
    }
}

fn is_legal_transition(from: SessionState, to: SessionState) -> bool {
    use SessionState::*;

    if to == Error && from != Error {
        return true;
    }

    matches!(
        (from, to),
        (LoadingContext, LoadingItem)
            | (LoadingContext, LoadingCategories)
            | (LoadingItem, LoadingCategories)
            | (LoadingCategories, Ready)
            | (Ready, Filling)
            | (Ready, LoadingCategories)
            | (Filling, Ready)
            | (Error, Ready)
            | (Error, Filling)
            | (Error, LoadingCategories)
            | (Error, LoadingContext)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SessionState,
    pub to: SessionState,
    /// Milliseconds since the machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Returned when a transition is not in the table above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: SessionState,
    pub to: SessionState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal session transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Current session state plus its transition log.
pub struct SessionMachine {
    current: SessionState,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl SessionMachine {
    /// Start at `LoadingContext`.
    pub fn new() -> Self {
        Self {
            current: SessionState::LoadingContext,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> SessionState {
        self.current
    }

    /// Move to `to` if the table allows it.
    pub fn advance(&mut self, to: SessionState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, reason, "session transition");
        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    /// Enter `Error`. A no-op when already there, so a second failure only
    /// replaces the message held by the caller.
    pub fn fail(&mut self, reason: &str) {
        if self.current != SessionState::Error {
            // Always legal from any other state.
            let _ = self.advance(SessionState::Error, Some(reason));
        }
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// One-line history, e.g. `LoadingContext → Ready (12ms, 3 transitions)`.
    pub fn summary(&self) -> String {
        let path: Vec<String> = self.transitions.iter().map(|t| t.to.to_string()).collect();
        let mut out = format!(
            "{} → {} ({}ms, {} transitions)",
            SessionState::LoadingContext,
            self.current,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        );
        if !path.is_empty() {
            out.push_str(&format!(" [{}]", path.join(" → ")));
        }
        out
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}
