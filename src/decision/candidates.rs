use shakmaty::Move;
use tracing::trace;

use crate::{encoding::Vocabulary, rules::Game};

/// A legal move under consideration, with its score terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub mv: Move,
    /// Already multiplied by the model weight. Zero when the model never proposed it.
    pub model_term: f32,
    pub heuristic: f32,
    pub blended: f32,
}

impl Candidate {
    pub fn new(mv: Move, model_term: f32) -> Self {
        Self {
            mv,
            model_term,
            heuristic: 0.0,
            blended: 0.0,
        }
    }
}

/// Candidates unique by move, in first-proposed order.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    /// Adds `mv`, keeping the larger model term when it is already present.
    pub fn offer(&mut self, mv: Move, model_term: f32) {
        match self.candidates.iter_mut().find(|c| c.mv == mv) {
            Some(existing) => existing.model_term = existing.model_term.max(model_term),
            None => self.candidates.push(Candidate::new(mv, model_term)),
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, mv: &Move) -> Option<&Candidate> {
        self.candidates.iter().find(|c| &c.mv == mv)
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// Promotions, captures and checks. These always make the candidate list,
/// whatever the model thinks of them.
pub fn tactical_moves(game: &mut Game, legal: &[Move]) -> Vec<Move> {
    legal
        .iter()
        .filter(|mv| mv.is_promotion() || mv.is_capture() || game.gives_check(mv))
        .cloned()
        .collect()
}

pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![f32::NEG_INFINITY; logits.len()];
    }
    let sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
    let log_sum = max + sum.ln();
    logits.iter().map(|&x| x - log_sum).collect()
}

/// The model's `top_k` tokens by logit, re-read as moves in this position.
/// Tokens that do not parse or are not legal here are dropped.
pub fn policy_moves(
    game: &Game,
    vocab: &Vocabulary,
    logits: &[f32],
    top_k: usize,
    model_weight: f32,
) -> Vec<(Move, f32)> {
    let log_probs = log_softmax(logits);

    let mut ranked: Vec<usize> = (0..logits.len()).collect();
    ranked.sort_by(|&a, &b| logits[b].total_cmp(&logits[a]).then(a.cmp(&b)));

    ranked
        .into_iter()
        .take(top_k)
        .filter_map(|id| {
            let Some(text) = vocab.text(id as u32) else {
                trace!("Model proposed token {id} with no text");
                return None;
            };
            let Some(mv) = game.parse_san(text) else {
                trace!("Model proposed `{text}`, not legal here");
                return None;
            };
            Some((mv, log_probs[id] * model_weight))
        })
        .collect()
}

/// Tactical moves at a zero model term, merged with the model's proposals.
pub fn assemble(
    game: &mut Game,
    legal: &[Move],
    vocab: &Vocabulary,
    logits: &[f32],
    top_k: usize,
    model_weight: f32,
) -> CandidateSet {
    let mut set = CandidateSet::default();
    for mv in tactical_moves(game, legal) {
        set.offer(mv, 0.0);
    }
    for (mv, term) in policy_moves(game, vocab, logits, top_k, model_weight) {
        set.offer(mv, term);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_softmax_normalises() {
        let lp = log_softmax(&[1.0, 2.0, 3.0]);
        let total: f32 = lp.iter().map(|x| x.exp()).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(lp[2] > lp[1] && lp[1] > lp[0]);
        assert!(lp.iter().all(|&x| x <= 0.0));
    }

    #[test]
    fn test_offer_keeps_larger_model_term() {
        let game = Game::new();
        let e4 = game.parse_uci("e2e4").unwrap();
        let mut set = CandidateSet::default();
        set.offer(e4.clone(), 0.0);
        set.offer(e4.clone(), -2.5);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&e4).unwrap().model_term, 0.0);

        let d4 = game.parse_uci("d2d4").unwrap();
        set.offer(d4.clone(), -3.0);
        set.offer(d4.clone(), -1.0);
        assert_eq!(set.get(&d4).unwrap().model_term, -1.0);
    }

    #[test]
    fn test_tactical_moves_from_start_are_empty() {
        let mut game = Game::new();
        let legal = game.legal_moves();
        assert_eq!(legal.len(), 20);
        assert!(tactical_moves(&mut game, &legal).is_empty());
    }

    #[test]
    fn test_tactical_moves_include_captures_and_checks() {
        // 1.e4 d5: exd5 captures, Bb5+ checks.
        let mut game = Game::replay(&["e2e4", "d7d5"]).unwrap();
        let legal = game.legal_moves();
        let tactical: Vec<String> = tactical_moves(&mut game, &legal)
            .iter()
            .map(|mv| game.uci(mv))
            .collect();
        assert!(tactical.contains(&"e4d5".to_string()));
        assert!(tactical.contains(&"f1b5".to_string()));
        assert!(!tactical.contains(&"g1f3".to_string()));
    }

    #[test]
    fn test_policy_moves_drop_illegal_tokens() {
        let game = Game::new();
        let vocab = Vocabulary::from_pairs([("e4", 1), ("Nf6", 2), ("Nf3", 3), ("garbage", 4)]);
        // Nf6 and garbage rank high but cannot be played by White here.
        let logits = [0.0, 1.0, 4.0, 2.0, 3.0];
        let proposed = policy_moves(&game, &vocab, &logits, 4, 1.0);
        let ucis: Vec<String> = proposed.iter().map(|(mv, _)| game.uci(mv)).collect();
        assert_eq!(ucis, vec!["g1f3", "e2e4"]);
        let lp = log_softmax(&logits);
        assert_eq!(proposed[0].1, lp[3]);
    }

    #[test]
    fn test_policy_respects_top_k() {
        let game = Game::new();
        let vocab = Vocabulary::from_pairs([("e4", 1), ("d4", 2), ("c4", 3)]);
        let logits = [0.0, 3.0, 2.0, 1.0];
        let proposed = policy_moves(&game, &vocab, &logits, 2, 2.0);
        assert_eq!(proposed.len(), 2);
        let lp = log_softmax(&logits);
        assert_eq!(proposed[1].1, lp[2] * 2.0);
    }

    #[test]
    fn test_assemble_merges_sources() {
        let mut game = Game::replay(&["e2e4", "d7d5"]).unwrap();
        let legal = game.legal_moves();
        let vocab = Vocabulary::from_pairs([("exd5", 1), ("Nf3", 2)]);
        let logits = [0.0, 5.0, 1.0];
        let set = assemble(&mut game, &legal, &vocab, &logits, 3, 1.0);

        let exd5 = game.parse_uci("e4d5").unwrap();
        let nf3 = game.parse_uci("g1f3").unwrap();
        // Proposed by both sources; the tactical zero beats a negative log-probability.
        assert_eq!(set.get(&exd5).unwrap().model_term, 0.0);
        assert!(set.get(&nf3).unwrap().model_term < 0.0);
    }
}
