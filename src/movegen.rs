use std::fmt;

use log::{info, trace};

use crate::board::{Color, GameState, Grid, Piece, PieceKind, Square};
use crate::error::ChessError;

const ORTHOGONALS: [(i8, i8); 4] = [(-1, 0), (0, -1), (1, 0), (0, 1)];
const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];
const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1), (0, 1),
    (1, -1), (1, 0), (1, 1),
];

/// Direction recorded for a knight check; knights have no ray to block.
pub const KNIGHT_CHECK: (i8, i8) = (0, 0);

/// One ply. Equality only looks at the start and end squares.
#[derive(Debug, Clone, Copy)]
pub struct Move {
    pub start: Square,
    pub end: Square,
    pub piece_moved: Piece,
    pub piece_captured: Option<Piece>,
    pub is_en_passant: bool,
    pub is_promotion: bool,
    pub is_castle: bool,
    /// Filled in only for promotions taken from the move log.
    pub promotion: Option<PieceKind>,
}

impl Move {
    pub fn new(start: Square, end: Square, piece_moved: Piece, piece_captured: Option<Piece>) -> Self {
        Self {
            start,
            end,
            piece_moved,
            piece_captured,
            is_en_passant: false,
            is_promotion: piece_moved.kind == PieceKind::Pawn
                && end.row == piece_moved.color.promotion_row(),
            is_castle: false,
            promotion: None,
        }
    }

    pub fn new_en_passant(start: Square, end: Square, piece_moved: Piece) -> Self {
        Self {
            is_en_passant: true,
            ..Self::new(
                start,
                end,
                piece_moved,
                Some(Piece::new(piece_moved.color.opposite(), PieceKind::Pawn)),
            )
        }
    }

    pub fn new_castle(start: Square, end: Square, king: Piece) -> Self {
        Self {
            is_castle: true,
            ..Self::new(start, end, king, None)
        }
    }

    pub(crate) fn with_promotion(self, promotion: Option<PieceKind>) -> Self {
        Self { promotion, ..self }
    }

    /// Long algebraic form, e.g. `e2e4` or `e7e8q`.
    pub fn notation(&self) -> String {
        let mut result = self.start.notation();
        result.push_str(&self.end.notation());
        if let Some(kind) = self.promotion {
            result.push(kind.letter().to_ascii_lowercase());
        }
        result
    }
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl Eq for Move {}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.notation())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pin {
    pub square: Square,
    /// Step from the king towards the pinned piece.
    pub direction: (i8, i8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Check {
    pub square: Square,
    /// Step from the king towards the checker, `KNIGHT_CHECK` for knights.
    pub direction: (i8, i8),
}

/// Everything attacking, or pinned against, one king square.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckScan {
    pub in_check: bool,
    pub pins: Vec<Pin>,
    pub checks: Vec<Check>,
}

impl CheckScan {
    fn pin_on(&self, square: Square) -> Option<(i8, i8)> {
        self.pins
            .iter()
            .find(|pin| pin.square == square)
            .map(|pin| pin.direction)
    }
}

fn occupant(board: &Grid, square: Square) -> Option<Piece> {
    board[square.row as usize][square.col as usize]
}

/// Whether `attacker`, found `distance` steps from the scanned square along
/// `direction`, hits that square.
fn attacks_along(attacker: Piece, direction: (i8, i8), distance: u8) -> bool {
    let (d_row, d_col) = direction;
    let orthogonal = d_row == 0 || d_col == 0;
    match attacker.kind {
        PieceKind::Rook => orthogonal,
        PieceKind::Bishop => !orthogonal,
        PieceKind::Queen => true,
        PieceKind::King => distance == 1,
        // The pawn sits one step against its own direction of travel.
        PieceKind::Pawn => {
            distance == 1 && !orthogonal && d_row == -attacker.color.pawn_direction()
        }
        PieceKind::Knight => false,
    }
}

/// Walks the eight rays and the knight offsets out of `from`, as seen by a
/// king of `color` standing there. That colour's own king is treated as
/// transparent so a hypothetical king square is judged as if the king had
/// already left its current one.
pub fn scan_checks_and_pins(board: &Grid, from: Square, color: Color) -> CheckScan {
    let mut scan = CheckScan::default();

    for &direction in ORTHOGONALS.iter().chain(DIAGONALS.iter()) {
        let mut possible_pin: Option<Square> = None;
        let mut current = from;
        let mut distance = 0u8;
        while let Some(target) = current.offset(direction.0, direction.1) {
            current = target;
            distance += 1;
            let Some(piece) = occupant(board, target) else {
                continue;
            };
            if piece.color == color {
                if piece.kind == PieceKind::King {
                    continue;
                }
                if possible_pin.is_some() {
                    break;
                }
                possible_pin = Some(target);
                continue;
            }
            if attacks_along(piece, direction, distance) {
                match possible_pin {
                    None => {
                        scan.in_check = true;
                        scan.checks.push(Check { square: target, direction });
                    }
                    Some(pinned) => scan.pins.push(Pin { square: pinned, direction }),
                }
            }
            break;
        }
    }

    let enemy_knight = Piece::new(color.opposite(), PieceKind::Knight);
    for &(d_row, d_col) in KNIGHT_OFFSETS.iter() {
        if let Some(target) = from.offset(d_row, d_col) {
            if occupant(board, target) == Some(enemy_knight) {
                scan.in_check = true;
                scan.checks.push(Check { square: target, direction: KNIGHT_CHECK });
            }
        }
    }

    scan
}

/// Squares a non-king move may land on to answer a single check.
fn blocking_squares(king: Square, check: &Check) -> Vec<Square> {
    if check.direction == KNIGHT_CHECK {
        return vec![check.square];
    }
    let mut squares = Vec::new();
    let mut current = king;
    while let Some(next) = current.offset(check.direction.0, check.direction.1) {
        squares.push(next);
        if next == check.square {
            break;
        }
        current = next;
    }
    squares
}

fn on_pin_axis(mv: &Move, axis: (i8, i8)) -> bool {
    if mv.piece_moved.kind == PieceKind::Knight {
        return false;
    }
    let step = (
        (mv.end.row as i8 - mv.start.row as i8).signum(),
        (mv.end.col as i8 - mv.start.col as i8).signum(),
    );
    step == axis || step == (-axis.0, -axis.1)
}

impl GameState {
    /// Check and pin data for the side to move's king.
    pub fn check_scan(&self) -> CheckScan {
        let color = self.side_to_move;
        scan_checks_and_pins(&self.board, self.king_square(color), color)
    }

    pub fn in_check(&self) -> bool {
        self.check_scan().in_check
    }

    /// Whether the opponent of the side to move attacks `square`.
    pub fn square_under_attack(&self, square: Square) -> bool {
        self.is_attacked(square, self.side_to_move)
    }

    fn is_attacked(&self, square: Square, defender: Color) -> bool {
        scan_checks_and_pins(&self.board, square, defender).in_check
    }

    /// Moves obeying each piece's movement rules for the side to move,
    /// before pins and checks are considered. King steps are already
    /// filtered against attacked squares.
    pub fn pseudo_legal_moves(&self) -> Vec<Move> {
        let color = self.side_to_move;
        let mut moves = Vec::new();
        for row in 0..8u8 {
            for col in 0..8u8 {
                let square = Square::new(row, col);
                match self.piece_at(square) {
                    Some(piece) if piece.color == color => {
                        self.piece_moves(square, piece, &mut moves)
                    }
                    _ => {}
                }
            }
        }
        moves
    }

    fn piece_moves(&self, square: Square, piece: Piece, moves: &mut Vec<Move>) {
        match piece.kind {
            PieceKind::Pawn => self.pawn_moves(square, piece, moves),
            PieceKind::Knight => self.step_moves(square, piece, &KNIGHT_OFFSETS, moves),
            PieceKind::Bishop => self.ray_moves(square, piece, &DIAGONALS, moves),
            PieceKind::Rook => self.ray_moves(square, piece, &ORTHOGONALS, moves),
            PieceKind::Queen => {
                self.ray_moves(square, piece, &ORTHOGONALS, moves);
                self.ray_moves(square, piece, &DIAGONALS, moves);
            }
            PieceKind::King => self.king_moves(square, piece, moves),
        }
    }

    fn pawn_moves(&self, square: Square, pawn: Piece, moves: &mut Vec<Move>) {
        let forward = pawn.color.pawn_direction();

        if let Some(one) = square.offset(forward, 0) {
            if self.piece_at(one).is_none() {
                moves.push(Move::new(square, one, pawn, None));
                if square.row == pawn.color.pawn_home_row() {
                    if let Some(two) = square.offset(2 * forward, 0) {
                        if self.piece_at(two).is_none() {
                            moves.push(Move::new(square, two, pawn, None));
                        }
                    }
                }
            }
        }

        for d_col in [-1, 1] {
            let Some(target) = square.offset(forward, d_col) else {
                continue;
            };
            match self.piece_at(target) {
                Some(victim) if victim.color != pawn.color => {
                    moves.push(Move::new(square, target, pawn, Some(victim)));
                }
                None if self.en_passant == Some(target) => {
                    moves.push(Move::new_en_passant(square, target, pawn));
                }
                _ => {}
            }
        }
    }

    fn step_moves(&self, square: Square, piece: Piece, offsets: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(d_row, d_col) in offsets {
            if let Some(target) = square.offset(d_row, d_col) {
                match self.piece_at(target) {
                    Some(other) if other.color == piece.color => {}
                    captured => moves.push(Move::new(square, target, piece, captured)),
                }
            }
        }
    }

    fn ray_moves(&self, square: Square, piece: Piece, directions: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(d_row, d_col) in directions {
            let mut current = square;
            while let Some(target) = current.offset(d_row, d_col) {
                match self.piece_at(target) {
                    None => moves.push(Move::new(square, target, piece, None)),
                    Some(other) if other.color != piece.color => {
                        moves.push(Move::new(square, target, piece, Some(other)));
                        break;
                    }
                    Some(_) => break,
                }
                current = target;
            }
        }
    }

    fn king_moves(&self, square: Square, king: Piece, moves: &mut Vec<Move>) {
        for &(d_row, d_col) in KING_OFFSETS.iter() {
            let Some(target) = square.offset(d_row, d_col) else {
                continue;
            };
            let captured = match self.piece_at(target) {
                Some(other) if other.color == king.color => continue,
                captured => captured,
            };
            if !self.is_attacked(target, king.color) {
                moves.push(Move::new(square, target, king, captured));
            }
        }
    }

    fn castle_moves(&self, king_square: Square, color: Color, moves: &mut Vec<Move>) {
        let row = color.back_row();
        if king_square != Square::new(row, 4) {
            return;
        }
        let king = Piece::new(color, PieceKind::King);
        let rook = Some(Piece::new(color, PieceKind::Rook));
        let empty = |cols: &[u8]| cols.iter().all(|&col| self.piece_at(Square::new(row, col)).is_none());
        let safe = |cols: &[u8]| cols.iter().all(|&col| !self.is_attacked(Square::new(row, col), color));

        if self.castle_rights.king_side(color)
            && self.piece_at(Square::new(row, 7)) == rook
            && empty(&[5, 6])
            && safe(&[5, 6])
        {
            moves.push(Move::new_castle(king_square, Square::new(row, 6), king));
        }
        if self.castle_rights.queen_side(color)
            && self.piece_at(Square::new(row, 0)) == rook
            && empty(&[1, 2, 3])
            && safe(&[3, 2])
        {
            moves.push(Move::new_castle(king_square, Square::new(row, 2), king));
        }
    }

    /// En passant lifts two pawns off one rank at once, so it is checked on a
    /// scratch copy of the grid rather than through the pin data.
    fn en_passant_is_safe(&self, mv: &Move, king_square: Square) -> bool {
        let mut scratch = self.board;
        scratch[mv.start.row as usize][mv.start.col as usize] = None;
        scratch[mv.start.row as usize][mv.end.col as usize] = None;
        scratch[mv.end.row as usize][mv.end.col as usize] = Some(mv.piece_moved);
        !scan_checks_and_pins(&scratch, king_square, mv.piece_moved.color).in_check
    }

    /// Fully legal moves for the side to move, in board order with castling
    /// last. Recomputes the checkmate and stalemate flags.
    pub fn legal_moves(&mut self) -> Vec<Move> {
        let color = self.side_to_move;
        let king_square = self.king_square(color);
        let scan = scan_checks_and_pins(&self.board, king_square, color);

        let blocks = match scan.checks.as_slice() {
            [check] => Some(blocking_squares(king_square, check)),
            _ => None,
        };
        let double_check = scan.checks.len() > 1;

        let mut moves: Vec<Move> = self
            .pseudo_legal_moves()
            .into_iter()
            .filter(|mv| {
                if mv.piece_moved.kind == PieceKind::King {
                    return true;
                }
                if double_check {
                    return false;
                }
                if mv.is_en_passant {
                    return self.en_passant_is_safe(mv, king_square);
                }
                if let Some(axis) = scan.pin_on(mv.start) {
                    if !on_pin_axis(mv, axis) {
                        return false;
                    }
                }
                match &blocks {
                    Some(squares) => squares.contains(&mv.end),
                    None => true,
                }
            })
            .collect();

        if !scan.in_check {
            self.castle_moves(king_square, color, &mut moves);
        }

        self.checkmate = moves.is_empty() && scan.in_check;
        self.stalemate = moves.is_empty() && !scan.in_check;
        if self.checkmate {
            info!("checkmate: {:?} has no legal moves while in check", color);
        } else if self.stalemate {
            info!("stalemate: {:?} has no legal moves", color);
        }
        trace!(
            "{:?}: {} legal moves, {} checks, {} pins",
            color,
            moves.len(),
            scan.checks.len(),
            scan.pins.len()
        );
        moves
    }

    /// Validating counterpart to `make_move`: looks `(from, to)` up in the
    /// current legal set and applies it with the given promotion letter.
    pub fn try_make_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<char>,
    ) -> Result<Move, ChessError> {
        let notation = format!("{}{}", from, to);
        let mv = self
            .legal_moves()
            .into_iter()
            .find(|mv| mv.start == from && mv.end == to)
            .ok_or_else(|| ChessError::IllegalMove { notation: notation.clone() })?;

        let choice = match (mv.is_promotion, promotion) {
            (true, Some(letter)) => Some(PieceKind::from_promotion_letter(letter)?),
            (true, None) => return Err(ChessError::MissingPromotionChoice { notation }),
            (false, _) => None,
        };

        self.make_move(mv, choice);
        Ok(mv.with_promotion(choice))
    }

    /// Result as of the most recent `legal_moves` query.
    pub fn outcome(&self) -> GameOutcome {
        if self.checkmate {
            GameOutcome::Checkmate { winner: self.side_to_move.opposite() }
        } else if self.stalemate {
            GameOutcome::Stalemate
        } else {
            GameOutcome::Ongoing
        }
    }
}
