use rand::{
    Rng,
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
};
use shakmaty::Move;

use crate::{config::ScoringWeights, decision::candidates::Candidate};

/// `blended = model_term + heuristic_weight * heuristic` for every candidate.
pub fn blend(candidates: &mut [Candidate], weights: &ScoringWeights) {
    for c in candidates.iter_mut() {
        c.blended = c.model_term + weights.heuristic_weight * c.heuristic;
    }
}

/// Sorts best-first and keeps the `keep` highest blended scores.
pub fn shortlist(candidates: &mut Vec<Candidate>, keep: usize) {
    candidates.sort_by(|a, b| b.blended.total_cmp(&a.blended));
    candidates.truncate(keep.max(1));
}

/// Softmax of `scores / temperature`, shifted by the maximum for stability.
pub fn softmax(scores: &[f32], temperature: f32) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores
        .iter()
        .map(|&s| ((s - max) / temperature).exp())
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Draws one candidate from the shortlist. A non-positive temperature means
/// always take the best.
pub fn sample<'a, R: Rng + ?Sized>(
    shortlist: &'a [Candidate],
    temperature: f32,
    rng: &mut R,
) -> Option<&'a Candidate> {
    if shortlist.len() <= 1 || temperature <= 0.0 {
        return shortlist.first();
    }
    let scores: Vec<f32> = shortlist.iter().map(|c| c.blended).collect();
    let probs = softmax(&scores, temperature);
    match WeightedIndex::new(&probs) {
        Ok(dist) => shortlist.get(dist.sample(rng)),
        Err(_) => shortlist.first(),
    }
}

/// Uniform pick among all legal moves, used when no candidate survived.
pub fn fallback<R: Rng + ?Sized>(legal: &[Move], rng: &mut R) -> Option<Move> {
    legal.choose(rng).cloned()
}
