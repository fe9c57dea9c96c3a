//! Think-time floor.
//!
//! A decision is never returned faster than its mode's floor. The wait is a
//! timer on the async runtime, so other decisions keep running meanwhile.

use std::{
    fmt::{self, Display},
    str::FromStr,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::ThinkTimeConfig;

/// Remaining clock below which a game is treated as fast.
pub const FAST_CLOCK_LIMIT: Duration = Duration::from_secs(3 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedMode {
    #[serde(alias = "bullet")]
    Fast,
    #[default]
    #[serde(alias = "rapid")]
    Normal,
}

impl SpeedMode {
    pub fn from_clock(remaining: Duration) -> Self {
        if remaining <= FAST_CLOCK_LIMIT {
            Self::Fast
        } else {
            Self::Normal
        }
    }
}

impl FromStr for SpeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" | "bullet" => Ok(Self::Fast),
            "normal" | "rapid" => Ok(Self::Normal),
            other => Err(format!(
                "unknown speed mode `{other}`, expected fast|bullet|normal|rapid"
            )),
        }
    }
}

impl Display for SpeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Normal => write!(f, "normal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkTime {
    fast: Duration,
    normal: Duration,
}

impl From<ThinkTimeConfig> for ThinkTime {
    fn from(config: ThinkTimeConfig) -> Self {
        Self {
            fast: config.fast(),
            normal: config.normal(),
        }
    }
}

impl ThinkTime {
    pub fn new(fast: Duration, normal: Duration) -> Self {
        Self { fast, normal }
    }

    pub fn floor(&self, mode: SpeedMode) -> Duration {
        match mode {
            SpeedMode::Fast => self.fast,
            SpeedMode::Normal => self.normal,
        }
    }

    /// Suspends until at least `floor(mode)` has passed since `started` and
    /// returns the total elapsed time.
    pub async fn hold(&self, mode: SpeedMode, started: Instant) -> Duration {
        let floor = self.floor(mode);
        let elapsed = started.elapsed();
        if let Some(rest) = floor.checked_sub(elapsed).filter(|d| !d.is_zero()) {
            trace!("Holding {rest:?} to reach the {mode} floor");
            tokio::time::sleep(rest).await;
        }
        started.elapsed()
    }
}
