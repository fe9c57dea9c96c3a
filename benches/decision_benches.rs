use std::{hint::black_box, sync::Arc};

use criterion::{Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng};
use teoriat::{
    decision::heuristics::HeuristicScorer,
    prelude::*,
};

// 1.e4 e5 2.Nf3 Nc6 3.Bb5 a6 4.Ba4 Nf6 5.O-O Be7
const RUY_LOPEZ: [&str; 10] = [
    "e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "a7a6", "b5a4", "g8f6", "e1g1", "f8e7",
];

fn bench_vocab() -> Vocabulary {
    Vocabulary::from_pairs([
        ("e4", 1),
        ("e5", 2),
        ("Nf3", 3),
        ("Nc6", 4),
        ("Bb5", 5),
        ("a6", 6),
        ("Ba4", 7),
        ("Nf6", 8),
        ("O-O", 9),
        ("Be7", 10),
        ("Re1", 11),
        ("d3", 12),
        ("c3", 13),
    ])
}

fn bench_engine() -> DecisionEngine {
    let vocab = bench_vocab();
    let model = TransitionModel::uniform(vocab.len());
    DecisionEngine::new(
        Arc::new(vocab),
        Arc::new(model),
        Arc::new(OpeningBook::default()),
        &EngineConfig::default(),
    )
}

/// Replaying and encoding a ten-move history into the model's window.
fn bench_encode(c: &mut Criterion) {
    let vocab = bench_vocab();
    let encoder = PositionEncoder::new(&vocab, DEFAULT_WINDOW);

    c.bench_function("encode_history", |b| {
        b.iter(|| {
            black_box(encoder.encode(black_box(&RUY_LOPEZ)).unwrap());
        })
    });
}

/// Heuristic terms for every legal move, the per-decision safety net.
fn bench_assess_all(c: &mut Criterion) {
    let mut game = Game::replay(&RUY_LOPEZ).unwrap();
    let legal = game.legal_moves();
    let scorer = HeuristicScorer::new(ScoringWeights::default());

    c.bench_function("assess_all_legal", |b| {
        b.iter(|| {
            for mv in &legal {
                black_box(scorer.assess(&mut game, mv));
            }
        })
    });
}

/// The whole synchronous pipeline, without the think-time hold.
fn bench_choose(c: &mut Criterion) {
    let engine = bench_engine();
    let mut game = Game::replay(&RUY_LOPEZ).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("choose_move", |b| {
        b.iter(|| {
            black_box(engine.choose(&mut game, &mut rng).unwrap());
        })
    });
}

criterion_group!(benches, bench_encode, bench_assess_all, bench_choose);
criterion_main!(benches);
