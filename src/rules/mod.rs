//! Rules adapter.
//!
//! Legality, check detection and move notation come from `shakmaty`. This module
//! only adds what the decision pipeline needs on top: an undo stack so that a
//! candidate can be pushed, evaluated and popped, and a key stack so that
//! repetitions can be counted without replaying the game.

use shakmaty::{
    CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Role, Square,
    fen::Fen,
    san::{San, SanPlus},
    uci::UciMove,
    zobrist::{Zobrist64, ZobristHash},
};

use crate::error::DecisionError;


/// Piece values in pawn units, king excluded since it is never captured.
pub const fn role_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 1,
        Role::Knight => 3,
        Role::Bishop => 3,
        Role::Rook => 5,
        Role::Queen => 9,
        Role::King => 0,
    }
}

pub const QUEEN_VALUE: i32 = role_value(Role::Queen);

/// Role removed from the board by `mv`, if any. En passant always takes a pawn.
pub fn captured_role(mv: &Move) -> Option<Role> {
    match mv {
        Move::EnPassant { .. } => Some(Role::Pawn),
        _ => mv.capture(),
    }
}

/// Square the captured piece stood on, which differs from the target square
/// for en passant.
pub fn captured_square(mv: &Move) -> Option<Square> {
    match *mv {
        Move::EnPassant { from, to } => Some(Square::from_coords(to.file(), from.rank())),
        _ if mv.is_capture() => Some(mv.to()),
        _ => None,
    }
}

/// Square the moving piece ends up on. For castling this is the king's
/// destination, not the rook square `shakmaty` uses as the move target.
pub fn landing_square(mv: &Move) -> Square {
    match *mv {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() {
                File::G
            } else {
                File::C
            };
            Square::from_coords(file, king.rank())
        }
        _ => mv.to(),
    }
}

/// A game in progress: the current position plus enough history to undo moves
/// and to detect repetitions.
#[derive(Debug, Clone)]
pub struct Game {
    position: Chess,
    undo: Vec<(Chess, Move)>,
    keys: Vec<Zobrist64>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    pub fn from_position(position: Chess) -> Self {
        let key = position.zobrist_hash(EnPassantMode::Legal);
        Self {
            position,
            undo: Vec::new(),
            keys: vec![key],
        }
    }

    pub fn from_fen(fen: &str) -> miette::Result<Self> {
        let fen: Fen = fen
            .parse()
            .map_err(|e| miette::miette!("invalid fen `{fen}`: {e}"))?;
        let position: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| miette::miette!("illegal position: {e}"))?;
        Ok(Self::from_position(position))
    }

    /// Plays a UCI history from the initial position.
    pub fn replay<S: AsRef<str>>(history: &[S]) -> Result<Self, DecisionError> {
        let mut game = Self::new();
        for (ply, text) in history.iter().enumerate() {
            let text = text.as_ref();
            let mv = game
                .parse_uci(text)
                .ok_or_else(|| DecisionError::InvalidMove {
                    mv: text.to_string(),
                    ply,
                    fen: game.fen(),
                })?;
            game.push(&mv);
        }
        Ok(game)
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    /// Number of moves pushed since the root position.
    pub fn ply(&self) -> usize {
        self.undo.len()
    }

    pub fn key(&self) -> Zobrist64 {
        self.position.zobrist_hash(EnPassantMode::Legal)
    }

    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.position.legal_moves().into_iter().collect()
    }

    /// Moves played since the root, each paired with the position it was played in.
    pub fn played(&self) -> impl Iterator<Item = (&Chess, &Move)> {
        self.undo.iter().map(|(pos, mv)| (pos, mv))
    }

    /// Applies a move that must be legal in the current position.
    pub fn push(&mut self, mv: &Move) {
        let previous = self.position.clone();
        self.position.play_unchecked(mv);
        self.undo.push((previous, mv.clone()));
        self.keys.push(self.key());
    }

    /// Undoes the last pushed move. Returns it, or `None` at the root.
    pub fn pop(&mut self) -> Option<Move> {
        let (previous, mv) = self.undo.pop()?;
        self.position = previous;
        self.keys.pop();
        Some(mv)
    }

    /// Runs `f` with `mv` applied, restoring the position afterwards.
    pub fn with_move<T>(&mut self, mv: &Move, f: impl FnOnce(&mut Self) -> T) -> T {
        self.push(mv);
        let out = f(self);
        self.pop();
        out
    }

    pub fn is_check(&self) -> bool {
        self.position.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    pub fn gives_check(&mut self, mv: &Move) -> bool {
        self.with_move(mv, |after| after.is_check())
    }

    pub fn is_attacked_by(&self, attacker: Color, square: Square) -> bool {
        let board = self.position.board();
        board
            .attacks_to(square, attacker, board.occupied())
            .any()
    }

    pub fn role_at(&self, square: Square) -> Option<Role> {
        self.position.board().role_at(square)
    }

    pub fn value_at(&self, square: Square) -> i32 {
        self.role_at(square).map_or(0, role_value)
    }

    fn occurrences(&self, key: Zobrist64) -> usize {
        self.keys.iter().filter(|&&k| k == key).count()
    }

    /// True when the current position has occurred at least `count` times.
    pub fn is_repetition(&self, count: usize) -> bool {
        self.keys
            .last()
            .is_some_and(|&current| self.occurrences(current) >= count)
    }

    /// True when the side to move could claim a draw by threefold repetition,
    /// either right now or by playing into a position seen twice already.
    pub fn can_claim_threefold_repetition(&self) -> bool {
        if self.is_repetition(3) {
            return true;
        }
        self.position.legal_moves().iter().any(|mv| {
            let mut next = self.position.clone();
            next.play_unchecked(mv);
            self.occurrences(next.zobrist_hash(EnPassantMode::Legal)) >= 2
        })
    }

    /// Parses a UCI move and checks it is legal here.
    pub fn parse_uci(&self, text: &str) -> Option<Move> {
        let uci: UciMove = text.trim().parse().ok()?;
        uci.to_move(&self.position).ok()
    }

    /// Parses standard algebraic notation (check suffixes allowed) and checks
    /// it is legal here.
    pub fn parse_san(&self, text: &str) -> Option<Move> {
        let san: SanPlus = text.trim().parse().ok()?;
        san.san.to_move(&self.position).ok()
    }

    pub fn uci(&self, mv: &Move) -> String {
        mv.to_uci(CastlingMode::Standard).to_string()
    }

    pub fn san(&self, mv: &Move) -> String {
        San::from_move(&self.position, mv).to_string()
    }

    /// SAN with the `+` or `#` suffix.
    pub fn san_plus(&mut self, mv: &Move) -> String {
        let san = self.san(mv);
        let suffix = self.with_move(mv, |after| {
            if after.is_checkmate() {
                "#"
            } else if after.is_check() {
                "+"
            } else {
                ""
            }
        });
        format!("{san}{suffix}")
    }
}
