use thiserror::Error;

/// Errors surfaced by the rules core.
///
/// The trusted apply path (`GameState::make_move`) never fails; these come
/// from the hardened entry points and from parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChessError {
    #[error("illegal move: {notation}")]
    IllegalMove { notation: String },

    #[error("invalid promotion choice '{0}' (expected one of Q, R, B, N)")]
    InvalidPromotionChoice(char),

    #[error("move {notation} promotes a pawn but no promotion piece was given")]
    MissingPromotionChoice { notation: String },

    #[error("cannot read move '{0}' (expected something like e2e4 or e7e8q)")]
    UnreadableMove(String),

    #[error("invalid square notation: {0}")]
    InvalidSquare(String),

    #[error("invalid FEN: {0}")]
    InvalidFen(String),
}
