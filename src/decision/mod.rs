//! The move decision pipeline.
//!
//! Book first, then the candidate set (tactical moves plus the model's top
//! proposals), heuristic scoring with a mate short-circuit, blended sampling,
//! and finally a uniform pick among legal moves if nothing survived.

pub mod candidates;
pub mod governor;
pub mod heuristics;
pub mod select;


use std::{
    fmt::{self, Display},
    sync::Arc,
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use shakmaty::Move;
use tracing::{debug, info, instrument, trace};

use crate::{
    book::OpeningBook,
    config::{EngineConfig, ScoringWeights},
    encoding::{PositionEncoder, Vocabulary},
    error::DecisionError,
    model::{PolicyModel, TransitionModel},
    rules::Game,
};

use candidates::Candidate;
use heuristics::{Assessment, HeuristicScorer};

pub use governor::{SpeedMode, ThinkTime};

/// Which stage of the pipeline produced the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    Book,
    Mate,
    Sampled,
    Fallback,
}

impl Display for MoveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Book => "book",
            Self::Mate => "mate",
            Self::Sampled => "sampled",
            Self::Fallback => "fallback",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub uci: String,
    pub source: MoveSource,
    /// Wall-clock time including the think-time hold.
    pub elapsed: Duration,
}

/// Shared, read-only decision engine. Clones share the loaded artifacts.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    vocab: Arc<Vocabulary>,
    model: Arc<dyn PolicyModel>,
    book: Arc<OpeningBook>,
    scorer: HeuristicScorer,
    weights: ScoringWeights,
    think_time: ThinkTime,
    window: usize,
    allow_empty_history: bool,
    seed: Option<u64>,
}

impl DecisionEngine {
    pub fn new(
        vocab: Arc<Vocabulary>,
        model: Arc<dyn PolicyModel>,
        book: Arc<OpeningBook>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            vocab,
            model,
            book,
            scorer: HeuristicScorer::new(config.weights.clone()),
            weights: config.weights.clone(),
            think_time: config.think_time.into(),
            window: config.window.max(1),
            allow_empty_history: config.allow_empty_history,
            seed: config.seed,
        }
    }

    /// Loads vocabulary, model and book named by `config`. The book may be
    /// absent; the other two may not.
    pub fn from_config(config: &EngineConfig) -> Result<Self, DecisionError> {
        let paths = &config.artifacts;
        let vocab = Vocabulary::load(&paths.vocab)?;
        let model = TransitionModel::load(&paths.model, vocab.len())?;
        let book = OpeningBook::load(&paths.book)
            .map_err(|e| DecisionError::artifact(&paths.book, e))?;
        info!(
            "Engine ready: {} tokens, model `{}`, {} book positions",
            vocab.len(),
            model.name(),
            book.len()
        );
        Ok(Self::new(
            Arc::new(vocab),
            Arc::new(model),
            Arc::new(book),
            config,
        ))
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn model(&self) -> &dyn PolicyModel {
        self.model.as_ref()
    }

    pub fn book(&self) -> &OpeningBook {
        &self.book
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn think_time(&self) -> ThinkTime {
        self.think_time
    }

    pub fn encoder(&self) -> PositionEncoder<'_> {
        PositionEncoder::new(&self.vocab, self.window)
    }

    /// Picks a move for the side to play after `history`, returning no
    /// sooner than the floor for `mode`.
    #[instrument(level = "debug", skip_all, fields(plies = history.len(), mode = %mode))]
    pub async fn decide(
        &self,
        history: &[String],
        mode: SpeedMode,
    ) -> Result<Decision, DecisionError> {
        let started = Instant::now();
        let engine = self.clone();
        let owned = history.to_vec();
        let (uci, source) = tokio::task::spawn_blocking(move || engine.decide_blocking(&owned))
            .await
            .map_err(|_| DecisionError::Aborted)??;

        let elapsed = self.think_time.hold(mode, started).await;
        info!("Playing {uci} ({source}) after {elapsed:?}");
        Ok(Decision {
            uci,
            source,
            elapsed,
        })
    }

    /// Everything `decide` does except the think-time hold.
    pub fn decide_blocking<S: AsRef<str>>(
        &self,
        history: &[S],
    ) -> Result<(String, MoveSource), DecisionError> {
        if history.is_empty() && !self.allow_empty_history {
            return Err(DecisionError::EmptyHistoryNotAllowed);
        }
        let mut game = Game::replay(history)?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ game.ply() as u64),
            None => StdRng::from_entropy(),
        };
        let (mv, source) = self.choose(&mut game, &mut rng)?;
        Ok((game.uci(&mv), source))
    }

    /// The synchronous pipeline for the position on `game`. `game` is left
    /// as it was found.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        game: &mut Game,
        rng: &mut R,
    ) -> Result<(Move, MoveSource), DecisionError> {
        let legal = game.legal_moves();
        if legal.is_empty() {
            return Err(DecisionError::NoLegalMoves { fen: game.fen() });
        }

        if let Some(mv) = self.book.probe(game, rng) {
            debug!("Book move {}", game.uci(&mv));
            return Ok((mv, MoveSource::Book));
        }

        let encoded = self.encoder().encode_game(game);
        let logits = self.model.infer(&encoded)?;
        if logits.len() != self.vocab.len() {
            return Err(DecisionError::Model(format!(
                "`{}` returned {} logits for a vocabulary of {}",
                self.model.name(),
                logits.len(),
                self.vocab.len()
            )));
        }

        let set = candidates::assemble(
            game,
            &legal,
            &self.vocab,
            &logits,
            self.weights.top_k,
            self.weights.model_weight,
        );
        debug!("{} candidates for {}", set.len(), game.fen());

        let mut scored = set.into_vec();
        if let Some(mate) = self.score(game, &mut scored) {
            debug!("Mate in one: {}", game.uci(&mate));
            return Ok((mate, MoveSource::Mate));
        }

        select::blend(&mut scored, &self.weights);
        select::shortlist(&mut scored, self.weights.style_sample_k);
        for c in &scored {
            trace!(
                "{} model={:.3} heuristic={:.1} blended={:.3}",
                game.uci(&c.mv),
                c.model_term,
                c.heuristic,
                c.blended
            );
        }
        if let Some(pick) = select::sample(&scored, self.weights.temperature, rng) {
            return Ok((pick.mv.clone(), MoveSource::Sampled));
        }

        debug!("No candidates survived, picking uniformly");
        select::fallback(&legal, rng)
            .map(|mv| (mv, MoveSource::Fallback))
            .ok_or_else(|| DecisionError::NoLegalMoves { fen: game.fen() })
    }

    /// Fills in heuristic scores. Returns the first mating candidate, in
    /// candidate order, if there is one.
    #[cfg(feature = "parallel")]
    fn score(&self, game: &Game, candidates: &mut [Candidate]) -> Option<Move> {
        use rayon::prelude::*;

        let assessments: Vec<Assessment> = candidates
            .par_iter()
            .map(|c| self.scorer.assess(&mut game.clone(), &c.mv))
            .collect();
        Self::apply(candidates, assessments)
    }

    #[cfg(not(feature = "parallel"))]
    fn score(&self, game: &mut Game, candidates: &mut [Candidate]) -> Option<Move> {
        let assessments: Vec<Assessment> = candidates
            .iter()
            .map(|c| self.scorer.assess(game, &c.mv))
            .collect();
        Self::apply(candidates, assessments)
    }

    fn apply(candidates: &mut [Candidate], assessments: Vec<Assessment>) -> Option<Move> {
        for (c, assessment) in candidates.iter_mut().zip(assessments) {
            match assessment {
                Assessment::Checkmate => return Some(c.mv.clone()),
                Assessment::Score(score) => c.heuristic = score,
            }
        }
        None
    }
}
