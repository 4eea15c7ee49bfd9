//! Session lifecycle
//!
//! ```text
//! Initializing ──► Running ──► Faulted ──► Running   (one recovery)
//!       │             │           │
//!       └─────────────┴───────────┴──────► Disposed
//! ```
use crate::engine::ms_to_ticks;

/// Delay before the single reinitialization attempt
const RECOVERY_DELAY_MS: u32 = 1000;
const MAX_RECOVERIES: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// no rendering context, missing canvas, unsupported capability
    #[error("Failed to initialize game: {0}")]
    Initialization(String),

    #[error("Failed to load {path}: {reason}")]
    ResourceLoad { path: String, reason: String },

    #[error("Frame update failed: {0}")]
    Tick(String),
}

impl SessionError {
    pub fn resource(path: &str, err: &anyhow::Error) -> Self {
        SessionError::ResourceLoad {
            path: path.to_string(),
            reason: format!("{:#}", err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Running,
    Faulted,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    RetryAfter(u32),
    GiveUp,
}

#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
    recoveries_left: u32,
    recovery_countdown: u32,
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            phase: Phase::Initializing,
            recoveries_left: MAX_RECOVERIES,
            recovery_countdown: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn start_running(&mut self) {
        if self.phase == Phase::Initializing {
            self.phase = Phase::Running;
        }
    }

    /// Classify a failure and move to Faulted or Disposed
    /// - initialization failures are fatal straight away
    /// - anything else gets one delayed retry per session
    pub fn fault(&mut self, err: &anyhow::Error) -> FaultAction {
        let fatal = matches!(
            err.downcast_ref::<SessionError>(),
            Some(SessionError::Initialization(_))
        );
        if self.phase == Phase::Disposed || fatal || self.recoveries_left == 0 {
            self.phase = Phase::Disposed;
            return FaultAction::GiveUp;
        }
        self.recoveries_left -= 1;
        self.recovery_countdown = ms_to_ticks(RECOVERY_DELAY_MS);
        self.phase = Phase::Faulted;
        FaultAction::RetryAfter(self.recovery_countdown)
    }

    /// Count down while faulted, true once the retry is due
    pub fn tick_recovery(&mut self) -> bool {
        if self.phase != Phase::Faulted {
            return false;
        }
        self.recovery_countdown = self.recovery_countdown.saturating_sub(1);
        self.recovery_countdown == 0
    }

    pub fn recovered(&mut self) {
        if self.phase == Phase::Faulted {
            self.phase = Phase::Running;
        }
    }

    pub fn dispose(&mut self) {
        self.phase = Phase::Disposed;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
