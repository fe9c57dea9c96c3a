//! Opening book loaded from a tab-separated opening list.
//!
//! Every prefix of every line is replayed from the initial position and the
//! following move is indexed by the prefix position's Zobrist key, so move
//! order transpositions share entries.

use std::{collections::HashMap, fs, path::Path};

use miette::{Context, IntoDiagnostic};
use rand::{
    Rng,
    distributions::{Distribution, WeightedIndex},
};
use shakmaty::{Move, zobrist::Zobrist64};
use tracing::{debug, info, warn};

use crate::rules::Game;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMove {
    pub uci: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    by_key: HashMap<Zobrist64, Vec<BookMove>>,
}

impl OpeningBook {
    /// Loads the book at `path`. A missing file is an empty book, not an error.
    pub fn load<P: AsRef<Path>>(path: P) -> miette::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("No opening book at {}, playing without one", path.display());
            return Ok(Self::default());
        }
        let tsv = fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("Reading opening book {}", path.display()))?;
        let book = Self::from_tsv_str(&tsv)
            .with_context(|| format!("Parsing opening book {}", path.display()))?;
        info!("Loaded {} book positions from {}", book.len(), path.display());
        Ok(book)
    }

    pub fn from_tsv_str(tsv: &str) -> miette::Result<Self> {
        let mut lines = tsv.lines().filter(|line| !line.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| miette::miette!("opening TSV is empty"))?;

        let mut uci_idx = None;
        let mut moves_idx = None;
        let mut weight_idx = None;
        for (i, name) in header.split('\t').enumerate() {
            match name.trim().to_ascii_lowercase().as_str() {
                "uci" => uci_idx = Some(i),
                "moves" => moves_idx = Some(i),
                "weight" | "count" | "plays" => weight_idx = Some(i),
                _ => {}
            }
        }
        let sequence_idx = uci_idx.or(moves_idx).ok_or_else(|| {
            miette::miette!("opening TSV needs a 'uci' or 'moves' column, found: {header}")
        })?;

        let mut weights: HashMap<Zobrist64, HashMap<String, u32>> = HashMap::new();
        for (row, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split('\t').collect();
            let Some(sequence) = fields.get(sequence_idx) else {
                warn!("Book row {row} has no move column, skipping");
                continue;
            };
            let weight = weight_idx
                .and_then(|i| fields.get(i))
                .and_then(|w| w.trim().parse::<u32>().ok())
                .unwrap_or(1)
                .max(1);

            let mut game = Game::new();
            for text in sequence.split_whitespace() {
                let Some(mv) = game.parse_uci(text) else {
                    warn!("Book row {row}: `{text}` is illegal, ignoring the rest of the line");
                    break;
                };
                let slot = weights
                    .entry(game.key())
                    .or_default()
                    .entry(game.uci(&mv))
                    .or_insert(0);
                *slot = slot.saturating_add(weight);
                game.push(&mv);
            }
        }

        let by_key = weights
            .into_iter()
            .map(|(key, moves)| {
                let mut moves: Vec<BookMove> = moves
                    .into_iter()
                    .map(|(uci, weight)| BookMove { uci, weight })
                    .collect();
                moves.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.uci.cmp(&b.uci)));
                (key, moves)
            })
            .collect();
        Ok(Self { by_key })
    }

    /// Number of indexed positions.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn moves_for(&self, game: &Game) -> Option<&[BookMove]> {
        self.by_key.get(&game.key()).map(Vec::as_slice)
    }

    /// Weighted pick among the book moves that are legal here.
    pub fn probe<R: Rng + ?Sized>(&self, game: &Game, rng: &mut R) -> Option<Move> {
        let entries = self.moves_for(game)?;
        let (moves, weights): (Vec<Move>, Vec<u32>) = entries
            .iter()
            .filter_map(|entry| game.parse_uci(&entry.uci).map(|mv| (mv, entry.weight)))
            .unzip();
        if moves.is_empty() {
            debug!("Book entries for this position are all illegal");
            return None;
        }
        let dist = WeightedIndex::new(&weights).ok()?;
        moves.into_iter().nth(dist.sample(rng))
    }
}
