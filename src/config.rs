use std::{fs, path::Path, path::PathBuf, time::Duration};

use miette::IntoDiagnostic;
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_WINDOW;

/// Fixed weights for candidate scoring and sampling. Read once, never changed
/// while serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    // Capture score: base + victim * value(victim) - attacker * value(attacker)
    pub capture_base: f32,
    pub capture_victim: f32,
    pub capture_attacker: f32,

    pub check_bonus: f32,

    // Moved piece left en prise, per pawn of its value
    pub hang_penalty: f32,
    pub defended_penalty: f32,

    pub net_loss_weight: f32,
    pub worst_reply_weight: f32,

    pub twofold_penalty: f32,
    pub threefold_penalty: f32,

    pub model_weight: f32,
    pub heuristic_weight: f32,
    pub temperature: f32,

    /// Model proposals considered per decision
    pub top_k: usize,
    /// Best blended candidates kept for the final draw
    pub style_sample_k: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            capture_base: 120.0,
            capture_victim: 14.0,
            capture_attacker: 2.0,
            check_bonus: 60.0,
            hang_penalty: 60.0,
            defended_penalty: 12.0,
            net_loss_weight: 45.0,
            worst_reply_weight: 25.0,
            twofold_penalty: 80.0,
            threefold_penalty: 600.0,
            model_weight: 1.0,
            heuristic_weight: 0.01,
            temperature: 0.35,
            top_k: 12,
            style_sample_k: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinkTimeConfig {
    pub fast_ms: u64,
    pub normal_ms: u64,
}

impl Default for ThinkTimeConfig {
    fn default() -> Self {
        Self {
            fast_ms: 400,
            normal_ms: 1200,
        }
    }
}

impl ThinkTimeConfig {
    pub fn fast(&self) -> Duration {
        Duration::from_millis(self.fast_ms)
    }

    pub fn normal(&self) -> Duration {
        Duration::from_millis(self.normal_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub vocab: PathBuf,
    pub model: PathBuf,
    pub book: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            vocab: PathBuf::from("data/vocab.json"),
            model: PathBuf::from("data/model.json"),
            book: PathBuf::from("data/book.tsv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: ScoringWeights,
    pub think_time: ThinkTimeConfig,
    pub artifacts: ArtifactPaths,
    /// Encoder window length, must match what the model was trained with
    pub window: usize,
    pub allow_empty_history: bool,
    /// Fixes the sampling RNG, for reproducible games
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            think_time: ThinkTimeConfig::default(),
            artifacts: ArtifactPaths::default(),
            window: DEFAULT_WINDOW,
            allow_empty_history: true,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Save to TOML File
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> miette::Result<()> {
        let toml_string = toml::to_string_pretty(self).into_diagnostic()?;
        fs::write(path, toml_string).into_diagnostic()?;
        Ok(())
    }

    /// Load from a TOML File
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> miette::Result<Self> {
        let file_content = fs::read_to_string(path).into_diagnostic()?;
        let config: Self = toml::from_str(&file_content).into_diagnostic()?;
        miette::ensure!(config.window > 0, "window must be at least 1");
        miette::ensure!(
            config.weights.style_sample_k > 0,
            "style_sample_k must be at least 1"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            seed = 42
            [weights]
            temperature = 0.5
            [think_time]
            fast_ms = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.weights.temperature, 0.5);
        assert_eq!(config.weights.threefold_penalty, 600.0);
        assert_eq!(config.think_time.fast(), Duration::from_millis(10));
        assert_eq!(config.think_time.normal_ms, 1200);
        assert_eq!(config.window, DEFAULT_WINDOW);
        assert!(config.allow_empty_history);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("teoriat_config_{}.toml", std::process::id()));
        let mut config = EngineConfig::default();
        config.seed = Some(3);
        config.weights.style_sample_k = 5;
        config.save_to_file(&path).unwrap();
        let loaded = EngineConfig::load_from_file(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_zero_window_rejected() {
        let path = std::env::temp_dir().join(format!("teoriat_window_{}.toml", std::process::id()));
        fs::write(&path, "window = 0\n").unwrap();
        let result = EngineConfig::load_from_file(&path);
        let _ = fs::remove_file(&path);
        assert!(result.is_err());
    }
}
