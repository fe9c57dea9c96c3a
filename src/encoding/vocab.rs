use std::{collections::HashMap, fs, path::Path};

use shakmaty::Move;
use tracing::{debug, warn};

use crate::{error::DecisionError, rules::Game};

/// Token reserved for left padding and for moves the model has never seen.
pub const PAD_TOKEN: u32 = 0;

/// Token ids the policy model was trained on, keyed by move text.
///
/// A token names a move only relative to the position it is read in: `Nf3`
/// is a different move (or no move at all) in different positions. Callers
/// must re-parse [`Vocabulary::text`] against the current board every time.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    by_text: HashMap<String, u32>,
    by_id: Vec<Option<String>>,
}

impl Vocabulary {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut vocab = Self {
            by_text: HashMap::new(),
            by_id: vec![None],
        };
        for (text, id) in pairs {
            let text = text.into();
            if id == PAD_TOKEN {
                warn!("Ignoring vocabulary entry `{text}` mapped to the padding token");
                continue;
            }
            let idx = id as usize;
            if vocab.by_id.len() <= idx {
                vocab.by_id.resize(idx + 1, None);
            }
            vocab.by_id[idx] = Some(text.clone());
            vocab.by_text.insert(text, id);
        }
        vocab
    }

    /// Parses a JSON object of `{ "<san>": <id>, ... }`.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        let table: HashMap<String, u32> = serde_json::from_str(json)?;
        Ok(Self::from_pairs(table))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DecisionError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| DecisionError::artifact(path, e))?;
        let vocab = Self::from_json_str(&json).map_err(|e| DecisionError::artifact(path, e))?;
        debug!("Loaded {} vocabulary tokens from {}", vocab.len(), path.display());
        Ok(vocab)
    }

    /// Size of the id space, padding included.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_text.is_empty()
    }

    pub fn token(&self, text: &str) -> Option<u32> {
        self.by_text.get(text).copied()
    }

    pub fn text(&self, id: u32) -> Option<&str> {
        self.by_id.get(id as usize)?.as_deref()
    }

    /// Token for `mv` as played in `game`. Tries the suffixed SAN first, then the bare form.
    pub fn token_for_move(&self, game: &mut Game, mv: &Move) -> Option<u32> {
        self.token(&game.san_plus(mv))
            .or_else(|| self.token(&game.san(mv)))
    }
}
