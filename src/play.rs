use std::io::{BufRead, Write};

use anyhow::Result;
use log::{debug, warn};

use crate::board::{Color, GameState, PieceKind, Square};
use crate::config::{PlayConfig, PlayerKind};
use crate::error::ChessError;
use crate::movegen::{GameOutcome, Move};
use crate::random_mover::RandomMover;

/// What the loop should do after one line of human input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Continue(String),
    Moved(String),
    Quit,
}

/// Text front end: draws the board, reads `e2e4`-style moves and lets the
/// random mover answer for any side configured as `random`.
pub struct GameDriver {
    state: GameState,
    config: PlayConfig,
    mover: RandomMover,
}

impl GameDriver {
    pub fn new(config: PlayConfig) -> Result<Self> {
        let state = match &config.fen {
            Some(fen) => GameState::from_fen(fen)?,
            None => GameState::new(),
        };
        let mover = RandomMover::new(config.seed);
        Ok(Self { state, config, mover })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> Result<GameOutcome> {
        let mut line = String::new();
        let mut show_board = true;

        loop {
            let moves = self.state.legal_moves();
            match self.state.outcome() {
                GameOutcome::Checkmate { winner } => {
                    writeln!(output, "{}\ncheckmate, {:?} wins", self.state, winner)?;
                    return Ok(self.state.outcome());
                }
                GameOutcome::Stalemate => {
                    writeln!(output, "{}\nstalemate", self.state)?;
                    return Ok(GameOutcome::Stalemate);
                }
                GameOutcome::Ongoing => {}
            }
            if let Some(limit) = self.config.max_plies {
                if self.state.move_log().len() as u32 >= limit {
                    writeln!(output, "stopping after {} plies", limit)?;
                    return Ok(GameOutcome::Ongoing);
                }
            }

            let side = self.state.side_to_move();
            match self.config.player(side) {
                PlayerKind::Random => {
                    let Some(mv) = self.mover.choose_move(&moves) else {
                        return Ok(GameOutcome::Ongoing);
                    };
                    let promotion = if mv.is_promotion {
                        Some(PieceKind::from_promotion_letter(self.mover.choose_promotion())?)
                    } else {
                        None
                    };
                    self.state.make_move(mv, promotion);
                    let played = self.state.move_log().last().copied().unwrap_or(mv);
                    writeln!(output, "{:?} plays {}", side, played)?;
                    show_board = true;
                }
                PlayerKind::Human => {
                    if show_board {
                        writeln!(output, "{}", self.state)?;
                        show_board = false;
                    }
                    write!(output, "{:?} to move> ", side)?;
                    output.flush()?;

                    line.clear();
                    if input.read_line(&mut line)? == 0 {
                        return Ok(GameOutcome::Ongoing);
                    }
                    match self.handle_command(line.trim(), &moves) {
                        Reply::Quit => return Ok(GameOutcome::Ongoing),
                        Reply::Continue(text) => writeln!(output, "{}", text)?,
                        Reply::Moved(text) => {
                            writeln!(output, "{}", text)?;
                            show_board = true;
                        }
                    }
                }
            }
        }
    }

    /// Interprets one line typed by a human player.
    pub fn handle_command(&mut self, command: &str, moves: &[Move]) -> Reply {
        let parts: Vec<&str> = command.split_whitespace().collect();
        if parts.is_empty() {
            return Reply::Continue(String::new());
        }

        match parts[0] {
            "quit" | "exit" => Reply::Quit,
            "help" => Reply::Continue(
                "commands: <from><to>[q|r|b|n], undo, moves, board, fen, quit".to_string(),
            ),
            "board" => Reply::Continue(self.state.to_string()),
            "fen" => Reply::Continue(self.state.to_fen()),
            "moves" => Reply::Continue(
                moves
                    .iter()
                    .map(|mv| mv.notation())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            "undo" => self.undo_to_human_turn(),
            text => match self.parse_and_play(text) {
                Ok(mv) => Reply::Moved(format!("played {}", mv)),
                Err(err) => {
                    warn!("rejected input '{}': {}", text, err);
                    Reply::Continue(err.to_string())
                }
            },
        }
    }

    /// Takes back one ply, and a second one if that leaves the random mover
    /// to play, so the human is back on move.
    fn undo_to_human_turn(&mut self) -> Reply {
        let Some(first) = self.state.undo_move() else {
            return Reply::Continue("nothing to undo".to_string());
        };
        let mut undone = vec![first.notation()];
        if self.config.player(self.state.side_to_move()) == PlayerKind::Random {
            if let Some(second) = self.state.undo_move() {
                undone.push(second.notation());
            }
        }
        debug!("undo: {:?}", undone);
        Reply::Moved(format!("took back {}", undone.join(" ")))
    }

    fn parse_and_play(&mut self, text: &str) -> Result<Move, ChessError> {
        let (from, to, promotion) = parse_move_text(text)?;
        self.state.try_make_move(from, to, promotion)
    }

    pub fn side_to_move(&self) -> Color {
        self.state.side_to_move()
    }
}

/// Splits `e7e8q` into its squares and optional promotion letter.
pub fn parse_move_text(text: &str) -> Result<(Square, Square, Option<char>), ChessError> {
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return Err(ChessError::UnreadableMove(text.to_string()));
    }
    let from = Square::from_notation(&text[0..2])?;
    let to = Square::from_notation(&text[2..4])?;
    let promotion = text[4..].chars().next();
    Ok((from, to, promotion))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(white: PlayerKind, black: PlayerKind, fen: Option<&str>) -> GameDriver {
        let config = PlayConfig {
            white,
            black,
            seed: Some(11),
            max_plies: Some(60),
            fen: fen.map(str::to_string),
            ..PlayConfig::default()
        };
        GameDriver::new(config).unwrap()
    }

    #[test]
    fn test_parse_move_text() {
        let (from, to, promotion) = parse_move_text("e7e8q").unwrap();
        assert_eq!(from.notation(), "e7");
        assert_eq!(to.notation(), "e8");
        assert_eq!(promotion, Some('q'));
        assert_eq!(parse_move_text("e2"), Err(ChessError::UnreadableMove("e2".to_string())));
        assert_eq!(
            parse_move_text("e2e4qq"),
            Err(ChessError::UnreadableMove("e2e4qq".to_string()))
        );
        assert_eq!(parse_move_text("é2e4"), Err(ChessError::UnreadableMove("é2e4".to_string())));
        assert_eq!(parse_move_text("z2e4"), Err(ChessError::InvalidSquare("z2".to_string())));
    }

    #[test]
    fn test_random_self_play_stays_legal() {
        let mut game = driver(PlayerKind::Random, PlayerKind::Random, None);
        let mut output = Vec::new();
        game.run(&b""[..], &mut output).unwrap();
        let log = game.state().move_log().len();
        assert!(log > 0 && log <= 60);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("White plays"));
    }

    #[test]
    fn test_human_session() {
        let mut game = driver(PlayerKind::Human, PlayerKind::Human, None);
        let input = b"hi\ne2e5\ne2e4\ne7e5\nundo\nfen\nquit\n";
        let mut output = Vec::new();
        game.run(&input[..], &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("cannot read move 'hi'"));
        assert!(text.contains("illegal move: e2e5"));
        assert!(text.contains("played e2e4"));
        assert!(text.contains("took back e7e5"));
        assert!(text.contains("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"));
        assert_eq!(game.state().move_log().len(), 1);
    }

    #[test]
    fn test_undo_skips_back_over_random_reply() {
        let mut game = driver(PlayerKind::Human, PlayerKind::Random, None);
        let input = b"d2d4\nundo\nquit\n";
        let mut output = Vec::new();
        game.run(&input[..], &mut output).unwrap();
        assert!(game.state().move_log().is_empty());
        assert_eq!(game.side_to_move(), Color::White);
    }

    #[test]
    fn test_promotion_needs_a_valid_letter() {
        let mut game = driver(PlayerKind::Human, PlayerKind::Human, Some("7k/P7/8/8/8/8/8/K7 w - - 0 1"));
        let moves = game.state.legal_moves();
        assert_eq!(
            game.handle_command("a7a8", &moves),
            Reply::Continue("move a7a8 promotes a pawn but no promotion piece was given".to_string())
        );
        assert_eq!(
            game.handle_command("a7a8k", &moves),
            Reply::Continue("invalid promotion choice 'k' (expected one of Q, R, B, N)".to_string())
        );
        assert_eq!(
            game.handle_command("a7a8n", &moves),
            Reply::Moved("played a7a8n".to_string())
        );
        assert_eq!(game.state().to_fen(), "N6k/8/8/8/8/8/8/K7 b - - 0 1");
    }

    #[test]
    fn test_reports_checkmate() {
        let mut game = driver(
            PlayerKind::Human,
            PlayerKind::Human,
            Some("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"),
        );
        let mut output = Vec::new();
        let outcome = game.run(&b""[..], &mut output).unwrap();
        assert_eq!(outcome, GameOutcome::Checkmate { winner: Color::Black });
        assert!(String::from_utf8(output).unwrap().contains("checkmate, Black wins"));
    }
}
