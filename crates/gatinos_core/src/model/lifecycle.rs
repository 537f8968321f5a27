//! Cat life-cycle state machine.
//!
//! ```text
//!            mark                capture
//!   Free ─────────▶ Marked ───────────────▶ Captured
//!    ▲  ◀─────────   │  capture (from Free) │
//!    │    unmark     └──────────────────────┤
//!    │◀──────────────── release ────────────┘
//!    │ disappear          forget
//!    ├──────────▶ Missing ───────▶ Forgotten
//!    │◀───────── reappear ◀───────────┘
//!    │
//!    │◀── resurrect ── Dead ◀── die (from any live state)
//! ```
//!
//! The table is pure: it knows nothing about permissions or persistence.
//! `LifecycleService` layers both on top of [`CatState::apply`].

use crate::model::permission::Permission;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Life-cycle state of one cat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatState {
    /// Living in the colony, nothing pending.
    #[default]
    Free,
    /// Flagged for the next capture campaign.
    Marked,
    /// Currently held; an open capture record exists.
    Captured,
    /// No activity for longer than the missing threshold.
    Missing,
    /// Missing for longer than the forgotten threshold.
    Forgotten,
    Dead,
}

impl CatState {
    pub const ALL: [CatState; 6] = [
        Self::Free,
        Self::Marked,
        Self::Captured,
        Self::Missing,
        Self::Forgotten,
        Self::Dead,
    ];

    /// Stable storage/CLI code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Marked => "marked",
            Self::Captured => "captured",
            Self::Missing => "missing",
            Self::Forgotten => "forgotten",
            Self::Dead => "dead",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == value)
    }

    /// Badge color used by list renderers.
    pub fn color(self) -> &'static str {
        match self {
            Self::Free => "yellow",
            Self::Marked => "green",
            Self::Captured => "orange",
            Self::Missing => "lightgray",
            Self::Forgotten => "gray",
            Self::Dead => "black",
        }
    }

    /// States the inactivity sweep inspects.
    pub fn is_swept(self) -> bool {
        matches!(self, Self::Free | Self::Missing | Self::Forgotten)
    }

    /// Returns the target state of `action`, or an error when `action` is
    /// not allowed from `self`.
    pub fn apply(self, action: CatAction) -> Result<CatState, TransitionError> {
        let target = match (action, self) {
            (CatAction::Mark, Self::Free) => Self::Marked,
            (CatAction::Unmark, Self::Marked) => Self::Free,
            (CatAction::Capture, Self::Free | Self::Marked) => Self::Captured,
            (CatAction::Release, Self::Captured) => Self::Free,
            (CatAction::Disappear, Self::Free) => Self::Missing,
            (CatAction::Forget, Self::Missing) => Self::Forgotten,
            (CatAction::Reappear, Self::Missing | Self::Forgotten) => Self::Free,
            (CatAction::Die, state) if state != Self::Dead => Self::Dead,
            (CatAction::Resurrect, Self::Dead) => Self::Free,
            (action, from) => return Err(TransitionError { from, action }),
        };
        Ok(target)
    }

    /// Actions that are legal from this state.
    pub fn available_actions(self) -> Vec<CatAction> {
        CatAction::ALL
            .into_iter()
            .filter(|action| self.apply(*action).is_ok())
            .collect()
    }
}

impl Display for CatState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User- or sweep-triggered life-cycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatAction {
    Mark,
    Unmark,
    Capture,
    Release,
    Disappear,
    Forget,
    Reappear,
    Die,
    Resurrect,
}

impl CatAction {
    pub const ALL: [CatAction; 9] = [
        Self::Mark,
        Self::Unmark,
        Self::Capture,
        Self::Release,
        Self::Disappear,
        Self::Forget,
        Self::Reappear,
        Self::Die,
        Self::Resurrect,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mark => "mark",
            Self::Unmark => "unmark",
            Self::Capture => "capture",
            Self::Release => "release",
            Self::Disappear => "disappear",
            Self::Forget => "forget",
            Self::Reappear => "reappear",
            Self::Die => "die",
            Self::Resurrect => "resurrect",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
    }

    /// Permission the acting user needs for this action.
    pub fn required_permission(self) -> Permission {
        match self {
            Self::Mark | Self::Unmark => Permission::MarkCat,
            Self::Capture => Permission::CaptureCat,
            Self::Release => Permission::ReleaseCat,
            Self::Disappear => Permission::DisappearCat,
            Self::Forget => Permission::ForgetCat,
            Self::Reappear => Permission::ReappearCat,
            Self::Die => Permission::KillCat,
            Self::Resurrect => Permission::ResurrectCat,
        }
    }
}

impl Display for CatAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action not allowed from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: CatState,
    pub action: CatAction,
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot {} a cat in state `{}`", self.action, self.from)
    }
}

impl Error for TransitionError {}
