//! Cat life-cycle use-cases.
//!
//! # Responsibility
//! - Run user-triggered transitions: legality, permission, side effects,
//!   persistence.
//! - Run the inactivity sweep that moves idle cats to missing/forgotten.
//!
//! # Invariants
//! - The transition table lives in [`CatState::apply`]; this service never
//!   decides legality itself.
//! - A transition and its capture side effect commit together or not at all.
//! - Sweeps act as the system and skip permission checks.

use crate::activity::{last_activity, DateRange};
use crate::clock::Clock;
use crate::config::LifecycleConfig;
use crate::model::cat::Cat;
use crate::model::lifecycle::{CatAction, CatState, TransitionError};
use crate::model::permission::{Permission, PermissionPolicy};
use crate::model::records::CaptureId;
use crate::model::user::{Author, User};
use crate::repo::activity_repo::ActivityRepository;
use crate::repo::capture_repo::CaptureRepository;
use crate::repo::cat_repo::{CatRepository, CaptureEffect, StateChange};
use crate::repo::user_repo::AccessRepository;
use crate::repo::RepoError;
use crate::service::is_allowed_on_cat;
use chrono::Duration;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug)]
pub enum LifecycleError {
    CatNotFound(String),
    InvalidTransition(TransitionError),
    PermissionDenied {
        username: String,
        permission: Permission,
        cat: String,
    },
    /// Release requested but the cat has no open capture.
    NoOpenCapture(String),
    /// Capture requested while an earlier capture is still open.
    CaptureAlreadyOpen(String),
    Repo(RepoError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CatNotFound(slug) => write!(f, "cat not found: {slug}"),
            Self::InvalidTransition(err) => write!(f, "{err}"),
            Self::PermissionDenied {
                username,
                permission,
                cat,
            } => write!(f, "user `{username}` lacks `{permission}` on cat `{cat}`"),
            Self::NoOpenCapture(slug) => write!(f, "cat `{slug}` has no open capture"),
            Self::CaptureAlreadyOpen(slug) => {
                write!(f, "cat `{slug}` already has an open capture")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTransition(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LifecycleError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<TransitionError> for LifecycleError {
    fn from(value: TransitionError) -> Self {
        Self::InvalidTransition(value)
    }
}

/// Outcome of one persisted transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub action: CatAction,
    pub from: CatState,
    pub to: CatState,
    /// Cat as persisted after the transition.
    pub cat: Cat,
    /// Capture opened by `capture` or closed by `release`.
    pub capture_id: Option<CaptureId>,
}

/// Slugs moved by one sweep, by target state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub missing: Vec<String>,
    pub forgotten: Vec<String>,
}

impl SweepReport {
    pub fn moved(&self) -> usize {
        self.missing.len() + self.forgotten.len()
    }
}

/// Life-cycle service over repository and policy implementations.
pub struct LifecycleService<S, K, P> {
    store: S,
    clock: K,
    policy: P,
    missing_after: Duration,
    forgotten_after: Duration,
}

impl<S, K, P> LifecycleService<S, K, P>
where
    S: CatRepository + CaptureRepository + ActivityRepository + AccessRepository,
    K: Clock,
    P: PermissionPolicy,
{
    pub fn new(store: S, clock: K, policy: P, config: &LifecycleConfig) -> Self {
        Self {
            store,
            clock,
            policy,
            missing_after: config.missing_after(),
            forgotten_after: config.forgotten_after(),
        }
    }

    /// Applies `action` to the cat identified by `cat_slug` on behalf of
    /// `user`.
    ///
    /// # Contract
    /// - Order: load, legality, permission, side effects, persist.
    /// - `capture` opens a capture dated today; `release` closes the most
    ///   recent open capture with today.
    /// - `die` stamps `died_on` with today; `resurrect` clears it.
    pub fn perform(
        &self,
        user: &User,
        cat_slug: &str,
        action: CatAction,
    ) -> LifecycleResult<Transition> {
        let result = self.perform_inner(user, cat_slug, action);
        match &result {
            Ok(transition) => info!(
                "event=cat_transition module=lifecycle status=ok cat={} action={} from={} to={} user_id={}",
                transition.cat.slug, action, transition.from, transition.to, user.id
            ),
            Err(err) => warn!(
                "event=cat_transition module=lifecycle status=error cat={cat_slug} action={action} user_id={} error_code={}",
                user.id,
                error_code(err)
            ),
        }
        result
    }

    /// Actions that are legal from the cat's state and permitted to `user`.
    pub fn available_actions(&self, user: &User, cat_slug: &str) -> LifecycleResult<Vec<CatAction>> {
        let cat = self.load_cat(cat_slug)?;
        let grants = self.store.user_grants(user.id)?;
        Ok(cat
            .state
            .available_actions()
            .into_iter()
            .filter(|action| {
                self.policy
                    .allows(user, &grants, action.required_permission(), &cat)
            })
            .collect())
    }

    /// Moves idle cats: free to missing after the missing threshold, then
    /// missing to forgotten after the forgotten threshold, in one pass.
    ///
    /// Idle time is measured from the cat's latest event of any kind; the
    /// intake date always counts.
    pub fn sweep(&self) -> LifecycleResult<SweepReport> {
        let today = self.clock.today();
        info!("event=lifecycle_sweep module=lifecycle status=start today={today}");

        let cats = self
            .store
            .list_cats_in_states(&[CatState::Free, CatState::Missing, CatState::Forgotten])?;
        let mut report = SweepReport {
            examined: cats.len(),
            ..SweepReport::default()
        };
        let mut changes = Vec::new();

        for cat in &cats {
            let events = self.store.cat_events(cat, DateRange::all())?;
            let last = last_activity(&events).unwrap_or(cat.registered_on);
            let target = self.swept_state(cat.state, today - last);
            if target == cat.state {
                continue;
            }
            changes.push(StateChange {
                cat_id: cat.id,
                from: cat.state,
                to: target,
            });
            match target {
                CatState::Missing => report.missing.push(cat.slug.clone()),
                CatState::Forgotten => report.forgotten.push(cat.slug.clone()),
                _ => {}
            }
        }

        if let Err(err) = self.store.apply_state_changes(&changes) {
            warn!(
                "event=lifecycle_sweep module=lifecycle status=error today={today} error={err}"
            );
            return Err(err.into());
        }

        info!(
            "event=lifecycle_sweep module=lifecycle status=ok today={today} examined={} missing={} forgotten={}",
            report.examined,
            report.missing.len(),
            report.forgotten.len()
        );
        Ok(report)
    }

    fn swept_state(&self, state: CatState, idle: Duration) -> CatState {
        let mut state = state;
        if state == CatState::Free && idle > self.missing_after {
            state = CatState::Missing;
        }
        if state == CatState::Missing && idle > self.forgotten_after {
            state = CatState::Forgotten;
        }
        state
    }

    fn perform_inner(
        &self,
        user: &User,
        cat_slug: &str,
        action: CatAction,
    ) -> LifecycleResult<Transition> {
        let cat = self.load_cat(cat_slug)?;
        let from = cat.state;
        let to = from.apply(action)?;

        let permission = action.required_permission();
        if !is_allowed_on_cat(&self.store, &self.policy, user, permission, &cat)? {
            return Err(LifecycleError::PermissionDenied {
                username: user.username.clone(),
                permission,
                cat: cat.slug,
            });
        }

        let today = self.clock.today();
        let mut updated = cat.clone();
        updated.state = to;
        let effect = match action {
            CatAction::Capture => {
                if self.store.last_open_capture(cat.id)?.is_some() {
                    return Err(LifecycleError::CaptureAlreadyOpen(cat.slug));
                }
                CaptureEffect::Open {
                    on: today,
                    author: Author::of(user),
                }
            }
            CatAction::Release => {
                if self.store.last_open_capture(cat.id)?.is_none() {
                    return Err(LifecycleError::NoOpenCapture(cat.slug));
                }
                CaptureEffect::Close { on: today }
            }
            CatAction::Die => {
                updated.is_dead = true;
                updated.died_on = Some(today);
                // A cat cannot stay caged after death.
                if self.store.last_open_capture(cat.id)?.is_some() {
                    CaptureEffect::Close { on: today }
                } else {
                    CaptureEffect::None
                }
            }
            CatAction::Resurrect => {
                updated.is_dead = false;
                updated.died_on = None;
                CaptureEffect::None
            }
            _ => CaptureEffect::None,
        };

        let capture_id = self
            .store
            .commit_transition(&updated, from, &effect)
            .map_err(|err| match err {
                RepoError::Conflict { entity: "open capture", .. } => {
                    LifecycleError::CaptureAlreadyOpen(cat.slug.clone())
                }
                RepoError::NotFound { entity: "open capture", .. } => {
                    LifecycleError::NoOpenCapture(cat.slug.clone())
                }
                other => LifecycleError::Repo(other),
            })?;

        Ok(Transition {
            action,
            from,
            to,
            cat: updated,
            capture_id,
        })
    }

    fn load_cat(&self, slug: &str) -> LifecycleResult<Cat> {
        self.store
            .get_cat_by_slug(slug)?
            .ok_or_else(|| LifecycleError::CatNotFound(slug.to_string()))
    }
}

fn error_code(err: &LifecycleError) -> &'static str {
    match err {
        LifecycleError::CatNotFound(_) => "cat_not_found",
        LifecycleError::InvalidTransition(_) => "invalid_transition",
        LifecycleError::PermissionDenied { .. } => "permission_denied",
        LifecycleError::NoOpenCapture(_) => "no_open_capture",
        LifecycleError::CaptureAlreadyOpen(_) => "capture_already_open",
        LifecycleError::Repo(_) => "repo_error",
    }
}
