//! Turns a move history into the fixed-window sequences the policy model reads.

pub mod vocab;

use shakmaty::{Color, Position};
use tracing::trace;

use crate::{error::DecisionError, rules::Game};

pub use vocab::{PAD_TOKEN, Vocabulary};

/// Flag recorded for every real move. Theory labels only exist in training data.
pub const THEORY_FLAG: u32 = 0;

/// Three parallel, left-padded sequences of equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedHistory {
    /// 1 when White made the move, 0 when Black did.
    pub colors: Vec<u32>,
    pub tokens: Vec<u32>,
    pub theory: Vec<u32>,
}

impl EncodedHistory {
    pub fn window(&self) -> usize {
        self.tokens.len()
    }

    /// Index of the most recent real move, if any.
    pub fn last_move(&self) -> Option<usize> {
        self.tokens.iter().rposition(|&t| t != PAD_TOKEN)
    }
}

pub struct PositionEncoder<'a> {
    vocab: &'a Vocabulary,
    window: usize,
}

impl<'a> PositionEncoder<'a> {
    pub fn new(vocab: &'a Vocabulary, window: usize) -> Self {
        Self { vocab, window }
    }

    /// Encodes a UCI history played from the initial position.
    pub fn encode<S: AsRef<str>>(&self, history: &[S]) -> Result<EncodedHistory, DecisionError> {
        let mut game = Game::new();
        let mut entries = Vec::with_capacity(history.len());
        for (ply, text) in history.iter().enumerate() {
            let text = text.as_ref();
            let mv = game
                .parse_uci(text)
                .ok_or_else(|| DecisionError::UnknownMove {
                    mv: text.to_string(),
                    ply,
                })?;
            entries.push(self.entry(&mut game, &mv));
            game.push(&mv);
        }
        Ok(self.pad(entries))
    }

    /// Encodes the moves already pushed on `game`.
    pub fn encode_game(&self, game: &Game) -> EncodedHistory {
        let entries = game
            .played()
            .map(|(before, mv)| {
                let mut scratch = Game::from_position(before.clone());
                self.entry(&mut scratch, mv)
            })
            .collect();
        self.pad(entries)
    }

    fn entry(&self, game: &mut Game, mv: &shakmaty::Move) -> (u32, u32) {
        let color = u32::from(game.position().turn() == Color::White);
        let token = self.vocab.token_for_move(game, mv).unwrap_or_else(|| {
            trace!("No token for {}, using padding", game.san(mv));
            PAD_TOKEN
        });
        (color, token)
    }

    fn pad(&self, entries: Vec<(u32, u32)>) -> EncodedHistory {
        let kept = &entries[entries.len().saturating_sub(self.window)..];
        let padding = self.window - kept.len();

        let mut encoded = EncodedHistory {
            colors: vec![0; padding],
            tokens: vec![PAD_TOKEN; padding],
            theory: vec![0; padding],
        };
        for &(color, token) in kept {
            encoded.colors.push(color);
            encoded.tokens.push(token);
            encoded.theory.push(THEORY_FLAG);
        }
        encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::from_pairs([("e4", 1), ("e5", 2), ("Nf3", 3), ("Nc6", 4), ("Nf6", 5)])
    }

    #[test]
    fn test_short_history_is_left_padded() {
        let vocab = vocab();
        let encoder = PositionEncoder::new(&vocab, 6);
        let enc = encoder.encode(&["e2e4", "e7e5", "g1f3"]).unwrap();
        assert_eq!(enc.tokens, vec![PAD_TOKEN, PAD_TOKEN, PAD_TOKEN, 1, 2, 3]);
        assert_eq!(enc.colors, vec![0, 0, 0, 1, 0, 1]);
        assert_eq!(enc.theory, vec![0; 6]);
        assert_eq!(enc.last_move(), Some(5));
    }

    #[test]
    fn test_long_history_keeps_last_window() {
        let vocab = vocab();
        let encoder = PositionEncoder::new(&vocab, 2);
        let enc = encoder.encode(&["e2e4", "e7e5", "g1f3", "b8c6"]).unwrap();
        assert_eq!(enc.tokens, vec![3, 4]);
        assert_eq!(enc.colors, vec![1, 0]);
        assert_eq!(enc.window(), 2);
    }

    #[test]
    fn test_empty_history_is_all_padding() {
        let vocab = vocab();
        let enc = PositionEncoder::new(&vocab, 4).encode::<&str>(&[]).unwrap();
        assert_eq!(enc.tokens, vec![PAD_TOKEN; 4]);
        assert_eq!(enc.last_move(), None);
    }

    #[test]
    fn test_unseen_move_falls_back_to_padding() {
        let vocab = vocab();
        let enc = PositionEncoder::new(&vocab, 3).encode(&["d2d4", "g8f6"]).unwrap();
        assert_eq!(enc.tokens, vec![PAD_TOKEN, PAD_TOKEN, 5]);
        assert_eq!(enc.colors, vec![0, 1, 0]);
    }

    #[test]
    fn test_illegal_move_is_unknown() {
        let vocab = vocab();
        let err = PositionEncoder::new(&vocab, 3)
            .encode(&["e2e4", "e2e4"])
            .unwrap_err();
        assert!(matches!(err, DecisionError::UnknownMove { ply: 1, .. }));
    }

    #[test]
    fn test_encoding_is_idempotent_and_matches_game() {
        let vocab = vocab();
        let encoder = PositionEncoder::new(&vocab, 8);
        let history = ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"];
        let first = encoder.encode(&history).unwrap();
        let second = encoder.encode(&history).unwrap();
        assert_eq!(first, second);

        let game = Game::replay(&history).unwrap();
        assert_eq!(encoder.encode_game(&game), first);
    }
}
