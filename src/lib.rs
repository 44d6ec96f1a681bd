pub mod board;
pub mod config;
pub mod error;
pub mod movegen;
pub mod perft;
pub mod play;
pub mod random_mover;

pub use board::{CastleRights, Color, GameState, Grid, Piece, PieceKind, Square};
pub use error::ChessError;
pub use movegen::{GameOutcome, Move};
