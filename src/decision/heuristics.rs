//! Safety and tactics adjustment for a single candidate.
//!
//! Every term is computed with the candidate pushed on the board and popped
//! again before returning, so sibling candidates never see each other.

use shakmaty::{Color, Move, Square};
use tracing::trace;

use crate::{
    config::ScoringWeights,
    rules::{Game, QUEEN_VALUE, captured_role, captured_square, landing_square, role_value},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assessment {
    /// The move mates. Nothing else about it matters.
    Checkmate,
    Score(f32),
}

/// Individual heuristic terms, all non-negative. Useful for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Breakdown {
    pub capture: f32,
    pub check: f32,
    pub hang: f32,
    pub net_loss: f32,
    pub worst_reply: f32,
    pub repetition: f32,
}

impl Breakdown {
    pub fn total(&self) -> f32 {
        self.capture + self.check - self.hang - self.net_loss - self.worst_reply - self.repetition
    }
}

#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    weights: ScoringWeights,
}

impl HeuristicScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn assess(&self, game: &mut Game, mv: &Move) -> Assessment {
        match self.breakdown(game, mv) {
            None => Assessment::Checkmate,
            Some(terms) => {
                trace!(?terms, "scored {}", game.uci(mv));
                Assessment::Score(terms.total())
            }
        }
    }

    /// All terms for `mv`, or `None` if it delivers mate.
    pub fn breakdown(&self, game: &mut Game, mv: &Move) -> Option<Breakdown> {
        let mover = game.turn();
        let capture = self.capture_score(mv);
        let landing = landing_square(mv);

        game.with_move(mv, |after| {
            if after.is_checkmate() {
                return None;
            }
            let moved_value = after.value_at(landing);
            Some(Breakdown {
                capture,
                check: if after.is_check() {
                    self.weights.check_bonus
                } else {
                    0.0
                },
                hang: self.hang_penalty(after, mover, landing, moved_value),
                net_loss: self.net_loss_penalty(after, landing, moved_value),
                worst_reply: self.worst_reply_penalty(after),
                repetition: self.repetition_penalty(after),
            })
        })
    }

    /// `base + victim * value(captured) - attacker * value(capturer)`, zero for quiet moves.
    pub fn capture_score(&self, mv: &Move) -> f32 {
        let Some(victim) = captured_role(mv) else {
            return 0.0;
        };
        let w = &self.weights;
        w.capture_base + w.capture_victim * role_value(victim) as f32
            - w.capture_attacker * role_value(mv.role()) as f32
    }

    fn hang_penalty(&self, after: &Game, mover: Color, landing: Square, moved_value: i32) -> f32 {
        if !after.is_attacked_by(!mover, landing) {
            return 0.0;
        }
        let per_pawn = if after.is_attacked_by(mover, landing) {
            self.weights.defended_penalty
        } else {
            self.weights.hang_penalty
        };
        per_pawn * moved_value as f32
    }

    /// Opponent takes the moved piece with its cheapest attacker, we take back
    /// once. Penalises whatever that exchange loses.
    fn net_loss_penalty(&self, after: &mut Game, landing: Square, moved_value: i32) -> f32 {
        if moved_value == 0 {
            return 0.0;
        }
        let takes_landing = |mv: &Move| captured_square(mv) == Some(landing);

        let Some(capture) = after
            .legal_moves()
            .into_iter()
            .filter(|mv| takes_landing(mv))
            .min_by_key(|mv| role_value(mv.role()))
        else {
            return 0.0;
        };

        let taker = capture.to();
        let recapture_value = after.with_move(&capture, |line| {
            let can_recapture = line
                .legal_moves()
                .iter()
                .any(|mv| captured_square(mv) == Some(taker));
            if can_recapture {
                line.value_at(taker)
            } else {
                0
            }
        });

        (moved_value - recapture_value).max(0) as f32 * self.weights.net_loss_weight
    }

    /// Largest capture the opponent has anywhere after the move.
    fn worst_reply_penalty(&self, after: &Game) -> f32 {
        let mut worst = 0;
        for mv in after.legal_moves() {
            if let Some(role) = captured_role(&mv) {
                worst = worst.max(role_value(role));
                if worst >= QUEEN_VALUE {
                    break;
                }
            }
        }
        worst as f32 * self.weights.worst_reply_weight
    }

    fn repetition_penalty(&self, after: &Game) -> f32 {
        let mut penalty = 0.0;
        if after.is_repetition(2) {
            penalty += self.weights.twofold_penalty;
        }
        if after.can_claim_threefold_repetition() {
            penalty += self.weights.threefold_penalty;
        }
        penalty
    }
}
