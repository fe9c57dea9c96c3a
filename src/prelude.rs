pub use crate::book::{BookMove, OpeningBook};
pub use crate::config::{ArtifactPaths, EngineConfig, ScoringWeights, ThinkTimeConfig};
pub use crate::consts::*;
pub use crate::decision::{Decision, DecisionEngine, MoveSource, SpeedMode, ThinkTime};
pub use crate::encoding::{EncodedHistory, PAD_TOKEN, PositionEncoder, Vocabulary};
pub use crate::error::DecisionError;
pub use crate::model::{PolicyModel, TransitionModel};
pub use crate::rules::Game;
pub use crate::utils::{self, log::*};
pub use miette::{self, Context, IntoDiagnostic, Result};
pub use std::fmt::Display;
pub use std::str::FromStr;
pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
