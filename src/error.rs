use miette::Diagnostic;
use thiserror::Error;

/// Everything a single decision request can fail with.
#[derive(Debug, Error, Diagnostic)]
pub enum DecisionError {
    #[error("move history must not be empty")]
    #[diagnostic(
        code(teoriat::empty_history),
        help("set `allow_empty_history = true` to play from the initial position")
    )]
    EmptyHistoryNotAllowed,

    #[error("illegal move `{mv}` at ply {ply} in position `{fen}`")]
    #[diagnostic(
        code(teoriat::invalid_move),
        help("history entries must be legal UCI moves played from the initial position")
    )]
    InvalidMove { mv: String, ply: usize, fen: String },

    #[error("move `{mv}` at ply {ply} cannot be encoded")]
    #[diagnostic(code(teoriat::unknown_move))]
    UnknownMove { mv: String, ply: usize },

    #[error("no legal moves in position `{fen}`")]
    #[diagnostic(code(teoriat::no_legal_moves))]
    NoLegalMoves { fen: String },

    #[error("cannot load `{path}`: {reason}")]
    #[diagnostic(code(teoriat::artifact_unavailable))]
    ArtifactUnavailable { path: String, reason: String },

    #[error("model inference failed: {0}")]
    #[diagnostic(code(teoriat::model))]
    Model(String),

    #[error("decision task was aborted")]
    #[diagnostic(code(teoriat::aborted))]
    Aborted,
}

impl DecisionError {
    /// Errors caused by the caller's input. These are reported verbatim and never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyHistoryNotAllowed | Self::InvalidMove { .. } | Self::UnknownMove { .. }
        )
    }

    pub(crate) fn artifact(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::ArtifactUnavailable {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_classified() {
        let invalid = DecisionError::InvalidMove {
            mv: "e2e5".to_string(),
            ply: 0,
            fen: "startpos".to_string(),
        };
        assert!(invalid.is_client_error());
        assert!(DecisionError::EmptyHistoryNotAllowed.is_client_error());
        assert!(
            !DecisionError::NoLegalMoves {
                fen: String::new()
            }
            .is_client_error()
        );
        assert!(!DecisionError::Model("boom".to_string()).is_client_error());
    }

    #[test]
    fn test_invalid_move_message_names_the_move() {
        let err = DecisionError::InvalidMove {
            mv: "e2e5".to_string(),
            ply: 3,
            fen: "8/8/8/8/8/8/8/8 w - - 0 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("e2e5"));
        assert!(msg.contains("ply 3"));
    }
}
