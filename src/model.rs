//! Policy model boundary.
//!
//! The decision engine only ever sees a model as a pure function from the
//! three encoded sequences to one logit per vocabulary token.

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    encoding::{EncodedHistory, PAD_TOKEN},
    error::DecisionError,
};

pub trait PolicyModel: Send + Sync + std::fmt::Debug {
    /// Length of the logit vector returned by [`PolicyModel::infer`].
    fn vocab_size(&self) -> usize;

    fn infer(&self, input: &EncodedHistory) -> Result<Vec<f32>, DecisionError>;

    fn name(&self) -> &str;
}

/// Logit adjustments that apply after a given token was played by a given side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRow {
    pub prev: u32,
    /// Side-to-move flag of the previous move, as written by the encoder.
    pub color: u32,
    pub next: Vec<(u32, f32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TransitionArtifact {
    prior: Vec<f32>,
    #[serde(default)]
    transitions: Vec<TransitionRow>,
}

/// A reply table distilled from game records: a prior over every token plus
/// sparse corrections keyed by the last move played.
#[derive(Debug, Clone)]
pub struct TransitionModel {
    name: String,
    prior: Vec<f32>,
    transitions: HashMap<(u32, u32), Vec<(u32, f32)>>,
}

impl TransitionModel {
    pub fn new(prior: Vec<f32>, rows: Vec<TransitionRow>) -> Result<Self, DecisionError> {
        let vocab_size = prior.len();
        let mut transitions = HashMap::with_capacity(rows.len());
        for row in rows {
            if let Some(&(bad, _)) = row.next.iter().find(|(id, _)| *id as usize >= vocab_size) {
                return Err(DecisionError::Model(format!(
                    "transition after token {} targets token {bad} outside a vocabulary of {vocab_size}",
                    row.prev
                )));
            }
            transitions
                .entry((row.prev, row.color))
                .or_insert_with(Vec::new)
                .extend(row.next);
        }
        Ok(Self {
            name: "Transition".to_string(),
            prior,
            transitions,
        })
    }

    /// Flat logits: every token is equally likely in every position.
    pub fn uniform(vocab_size: usize) -> Self {
        Self {
            name: "Uniform".to_string(),
            prior: vec![0.0; vocab_size],
            transitions: HashMap::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, DecisionError> {
        let artifact: TransitionArtifact =
            serde_json::from_str(json).map_err(|e| DecisionError::Model(e.to_string()))?;
        Self::new(artifact.prior, artifact.transitions)
    }

    /// Loads the artifact and checks it covers exactly `vocab_size` tokens.
    pub fn load<P: AsRef<Path>>(path: P, vocab_size: usize) -> Result<Self, DecisionError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| DecisionError::artifact(path, e))?;
        let model = Self::from_json_str(&json).map_err(|e| DecisionError::artifact(path, e))?;
        if model.vocab_size() != vocab_size {
            return Err(DecisionError::artifact(
                path,
                format!(
                    "model covers {} tokens but the vocabulary has {vocab_size}",
                    model.vocab_size()
                ),
            ));
        }
        debug!(
            "Loaded transition model with {} rows from {}",
            model.transitions.len(),
            path.display()
        );
        Ok(model)
    }
}

impl PolicyModel for TransitionModel {
    fn vocab_size(&self) -> usize {
        self.prior.len()
    }

    fn infer(&self, input: &EncodedHistory) -> Result<Vec<f32>, DecisionError> {
        let window = input.window();
        if input.colors.len() != window || input.theory.len() != window {
            return Err(DecisionError::Model(format!(
                "mismatched sequence lengths: colors={} tokens={window} theory={}",
                input.colors.len(),
                input.theory.len()
            )));
        }

        let mut logits = self.prior.clone();
        let Some(last) = input.last_move() else {
            return Ok(logits);
        };
        let key = (input.tokens[last], input.colors[last]);
        debug_assert_ne!(key.0, PAD_TOKEN);
        if let Some(next) = self.transitions.get(&key) {
            for &(id, boost) in next {
                logits[id as usize] += boost;
            }
        }
        Ok(logits)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
