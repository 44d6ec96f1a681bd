use std::fmt;

use log::debug;

use crate::error::ChessError;
use crate::movegen::Move;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// Row 0 is rank 8 (black's back rank), row 7 is rank 1.
const ROWS_TO_RANKS: [char; 8] = ['8', '7', '6', '5', '4', '3', '2', '1'];
const COLS_TO_FILES: [char; 8] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// Row delta of a single pawn advance.
    pub fn pawn_direction(&self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    pub fn pawn_home_row(&self) -> u8 {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    pub fn back_row(&self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// The row on which this colour's pawns promote.
    pub fn promotion_row(&self) -> u8 {
        self.opposite().back_row()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub const PROMOTION_CHOICES: [PieceKind; 4] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
    ];

    pub fn letter(&self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    pub fn from_letter(letter: char) -> Option<PieceKind> {
        match letter.to_ascii_uppercase() {
            'P' => Some(PieceKind::Pawn),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'R' => Some(PieceKind::Rook),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Parses the piece letter a caller supplies when a pawn promotes.
    pub fn from_promotion_letter(letter: char) -> Result<PieceKind, ChessError> {
        match PieceKind::from_letter(letter) {
            Some(kind) if PieceKind::PROMOTION_CHOICES.contains(&kind) => Ok(kind),
            _ => Err(ChessError::InvalidPromotionChoice(letter)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// FEN-style letter: upper case for white, lower case for black.
    pub fn symbol(&self) -> char {
        match self.color {
            Color::White => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Piece> {
        let kind = PieceKind::from_letter(symbol)?;
        let color = if symbol.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(color, kind))
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// The square `(d_row, d_col)` away, if it is still on the board.
    pub fn offset(&self, d_row: i8, d_col: i8) -> Option<Square> {
        let row = self.row as i8 + d_row;
        let col = self.col as i8 + d_col;
        if (0..8).contains(&row) && (0..8).contains(&col) {
            Some(Square::new(row as u8, col as u8))
        } else {
            None
        }
    }

    pub fn notation(&self) -> String {
        let mut result = String::with_capacity(2);
        result.push(COLS_TO_FILES[self.col as usize]);
        result.push(ROWS_TO_RANKS[self.row as usize]);
        result
    }

    pub fn from_notation(text: &str) -> Result<Square, ChessError> {
        let mut chars = text.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(ChessError::InvalidSquare(text.to_string()));
        };
        let col = COLS_TO_FILES.iter().position(|&f| f == file);
        let row = ROWS_TO_RANKS.iter().position(|&r| r == rank);
        match (row, col) {
            (Some(row), Some(col)) => Ok(Square::new(row as u8, col as u8)),
            _ => Err(ChessError::InvalidSquare(text.to_string())),
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.notation())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CastleRights {
    pub white_king_side: bool,
    pub white_queen_side: bool,
    pub black_king_side: bool,
    pub black_queen_side: bool,
}

impl CastleRights {
    pub const fn all() -> Self {
        Self {
            white_king_side: true,
            white_queen_side: true,
            black_king_side: true,
            black_queen_side: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            white_king_side: false,
            white_queen_side: false,
            black_king_side: false,
            black_queen_side: false,
        }
    }

    pub fn king_side(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_king_side,
            Color::Black => self.black_king_side,
        }
    }

    pub fn queen_side(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_queen_side,
            Color::Black => self.black_queen_side,
        }
    }

    fn revoke_both(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_king_side = false;
                self.white_queen_side = false;
            }
            Color::Black => {
                self.black_king_side = false;
                self.black_queen_side = false;
            }
        }
    }

    /// Drops the right tied to the rook that starts on `square`, if any.
    /// a-file (col 0) is queen side, h-file (col 7) is king side.
    fn revoke_corner(&mut self, square: Square) {
        match (square.row, square.col) {
            (7, 0) => self.white_queen_side = false,
            (7, 7) => self.white_king_side = false,
            (0, 0) => self.black_queen_side = false,
            (0, 7) => self.black_king_side = false,
            _ => {}
        }
    }

    fn to_fen_field(self) -> String {
        let mut field = String::new();
        if self.white_king_side {
            field.push('K');
        }
        if self.white_queen_side {
            field.push('Q');
        }
        if self.black_king_side {
            field.push('k');
        }
        if self.black_queen_side {
            field.push('q');
        }
        if field.is_empty() {
            field.push('-');
        }
        field
    }
}

impl Default for CastleRights {
    fn default() -> Self {
        Self::all()
    }
}

/// Occupant grid, indexed `[row][col]`.
pub type Grid = [[Option<Piece>; 8]; 8];

#[derive(Debug, Clone)]
pub struct GameState {
    pub(crate) board: Grid,
    pub(crate) side_to_move: Color,
    /// Indexed by `Color::index`.
    pub(crate) king_squares: [Square; 2],
    pub(crate) move_log: Vec<Move>,
    pub(crate) castle_rights: CastleRights,
    /// One snapshot per ply plus the initial rights; the tail is always current.
    pub(crate) castle_rights_log: Vec<CastleRights>,
    pub(crate) en_passant: Option<Square>,
    pub(crate) en_passant_log: Vec<Option<Square>>,
    pub(crate) checkmate: bool,
    pub(crate) stalemate: bool,
    // Clocks the position was set up with; later values derive from the log.
    initial_halfmove_clock: u32,
    initial_fullmove_number: u32,
}

impl GameState {
    pub fn new() -> Self {
        let mut board: Grid = [[None; 8]; 8];
        let back_rank = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (col, &kind) in back_rank.iter().enumerate() {
            board[0][col] = Some(Piece::new(Color::Black, kind));
            board[1][col] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            board[6][col] = Some(Piece::new(Color::White, PieceKind::Pawn));
            board[7][col] = Some(Piece::new(Color::White, kind));
        }

        Self {
            board,
            side_to_move: Color::White,
            king_squares: [Square::new(7, 4), Square::new(0, 4)],
            move_log: Vec::new(),
            castle_rights: CastleRights::all(),
            castle_rights_log: vec![CastleRights::all()],
            en_passant: None,
            en_passant_log: vec![None],
            checkmate: false,
            stalemate: false,
            initial_halfmove_clock: 0,
            initial_fullmove_number: 1,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 || fields.len() > 6 {
            return Err(ChessError::InvalidFen(format!(
                "expected 4 to 6 fields, found {}",
                fields.len()
            )));
        }

        let rows: Vec<&str> = fields[0].split('/').collect();
        if rows.len() != 8 {
            return Err(ChessError::InvalidFen(format!(
                "expected 8 ranks, found {}",
                rows.len()
            )));
        }

        let mut board: Grid = [[None; 8]; 8];
        let mut kings: [Option<Square>; 2] = [None, None];
        for (row, text) in rows.iter().enumerate() {
            let mut col = 0usize;
            for symbol in text.chars() {
                if let Some(skip) = symbol.to_digit(10) {
                    if skip == 0 {
                        return Err(ChessError::InvalidFen(format!(
                            "rank '{}' contains an empty run of zero squares",
                            text
                        )));
                    }
                    col += skip as usize;
                } else {
                    let piece = Piece::from_symbol(symbol).ok_or_else(|| {
                        ChessError::InvalidFen(format!("unknown piece letter '{}'", symbol))
                    })?;
                    if col >= 8 {
                        return Err(ChessError::InvalidFen(format!(
                            "rank '{}' describes more than 8 squares",
                            text
                        )));
                    }
                    if piece.kind == PieceKind::King {
                        if kings[piece.color.index()].is_some() {
                            return Err(ChessError::InvalidFen(format!(
                                "more than one {:?} king",
                                piece.color
                            )));
                        }
                        kings[piece.color.index()] = Some(Square::new(row as u8, col as u8));
                    }
                    board[row][col] = Some(piece);
                    col += 1;
                }
            }
            if col != 8 {
                return Err(ChessError::InvalidFen(format!(
                    "rank '{}' does not describe 8 squares",
                    text
                )));
            }
        }
        let (Some(white_king), Some(black_king)) = (kings[0], kings[1]) else {
            return Err(ChessError::InvalidFen("both kings must be present".to_string()));
        };

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(ChessError::InvalidFen(format!("bad side to move '{}'", other)));
            }
        };

        let mut castle_rights = CastleRights::none();
        if fields[2] != "-" {
            for symbol in fields[2].chars() {
                match symbol {
                    'K' => castle_rights.white_king_side = true,
                    'Q' => castle_rights.white_queen_side = true,
                    'k' => castle_rights.black_king_side = true,
                    'q' => castle_rights.black_queen_side = true,
                    _ => {
                        return Err(ChessError::InvalidFen(format!(
                            "bad castling field '{}'",
                            fields[2]
                        )));
                    }
                }
            }
        }
        // A right without its king and rook at home can never be exercised.
        for color in [Color::White, Color::Black] {
            let row = color.back_row() as usize;
            let king_home = board[row][4] == Some(Piece::new(color, PieceKind::King));
            let rook = Some(Piece::new(color, PieceKind::Rook));
            if !king_home || board[row][7] != rook {
                castle_rights.revoke_corner(Square::new(row as u8, 7));
            }
            if !king_home || board[row][0] != rook {
                castle_rights.revoke_corner(Square::new(row as u8, 0));
            }
        }

        let en_passant = match fields[3] {
            "-" => None,
            text => {
                let bad = || ChessError::InvalidFen(format!("bad en passant square '{}'", text));
                let square = Square::from_notation(text).map_err(|_| bad())?;
                if !en_passant_target_is_consistent(&board, square, side_to_move) {
                    return Err(bad());
                }
                Some(square)
            }
        };

        let parse_clock = |index: usize, default: u32| -> Result<u32, ChessError> {
            match fields.get(index) {
                Some(text) => text
                    .parse::<u32>()
                    .map_err(|_| ChessError::InvalidFen(format!("bad move counter '{}'", text))),
                None => Ok(default),
            }
        };
        let initial_halfmove_clock = parse_clock(4, 0)?;
        let initial_fullmove_number = parse_clock(5, 1)?.max(1);

        Ok(Self {
            board,
            side_to_move,
            king_squares: [white_king, black_king],
            move_log: Vec::new(),
            castle_rights,
            castle_rights_log: vec![castle_rights],
            en_passant,
            en_passant_log: vec![en_passant],
            checkmate: false,
            stalemate: false,
            initial_halfmove_clock,
            initial_fullmove_number,
        })
    }

    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for (row, squares) in self.board.iter().enumerate() {
            let mut empty = 0;
            for occupant in squares.iter() {
                match occupant {
                    Some(piece) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.symbol());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if row < 7 {
                placement.push('/');
            }
        }

        let side = match self.side_to_move {
            Color::White => "w",
            Color::Black => "b",
        };
        let en_passant = self
            .en_passant
            .map(|square| square.notation())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} {} {} {} {} {}",
            placement,
            side,
            self.castle_rights.to_fen_field(),
            en_passant,
            self.halfmove_clock(),
            self.fullmove_number()
        )
    }

    pub fn board(&self) -> &Grid {
        &self.board
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board[square.row as usize][square.col as usize]
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn king_square(&self, color: Color) -> Square {
        self.king_squares[color.index()]
    }

    pub fn castle_rights(&self) -> CastleRights {
        self.castle_rights
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn move_log(&self) -> &[Move] {
        &self.move_log
    }

    /// Valid only after the most recent `legal_moves` query.
    pub fn is_checkmate(&self) -> bool {
        self.checkmate
    }

    /// Valid only after the most recent `legal_moves` query.
    pub fn is_stalemate(&self) -> bool {
        self.stalemate
    }

    /// Plies since the last pawn move or capture.
    pub fn halfmove_clock(&self) -> u32 {
        let mut clock = 0u32;
        for mv in self.move_log.iter().rev() {
            if mv.piece_moved.kind == PieceKind::Pawn || mv.piece_captured.is_some() {
                return clock;
            }
            clock = clock.saturating_add(1);
        }
        clock.saturating_add(self.initial_halfmove_clock)
    }

    pub fn fullmove_number(&self) -> u32 {
        let plies = u32::try_from(self.move_log.len()).unwrap_or(u32::MAX);
        // The side that moved first in this game determines where move boundaries fall.
        let black_started = if plies % 2 == 0 {
            self.side_to_move == Color::Black
        } else {
            self.side_to_move == Color::White
        };
        let moves_played = (u64::from(plies) + u64::from(black_started)) / 2;
        let moves_played = u32::try_from(moves_played).unwrap_or(u32::MAX);
        self.initial_fullmove_number.saturating_add(moves_played)
    }

    fn set(&mut self, square: Square, occupant: Option<Piece>) {
        self.board[square.row as usize][square.col as usize] = occupant;
    }

    /// Applies `mv`, which must come from the latest `legal_moves` query.
    ///
    /// `promotion` is only consulted for promotion moves; when it is missing
    /// the pawn becomes a queen.
    pub fn make_move(&mut self, mv: Move, promotion: Option<PieceKind>) {
        let color = mv.piece_moved.color;
        let promoted_to = if mv.is_promotion {
            Some(promotion.unwrap_or(PieceKind::Queen))
        } else {
            None
        };
        let logged = mv.with_promotion(promoted_to);

        self.set(mv.start, None);
        self.set(mv.end, Some(mv.piece_moved));
        self.move_log.push(logged);
        self.side_to_move = self.side_to_move.opposite();

        if mv.piece_moved.kind == PieceKind::King {
            self.king_squares[color.index()] = mv.end;
        }

        if let Some(kind) = promoted_to {
            self.set(mv.end, Some(Piece::new(color, kind)));
        }

        self.en_passant = if mv.piece_moved.kind == PieceKind::Pawn
            && (mv.end.row as i8 - mv.start.row as i8).abs() == 2
        {
            Some(Square::new((mv.start.row + mv.end.row) / 2, mv.start.col))
        } else {
            None
        };
        self.en_passant_log.push(self.en_passant);

        if mv.is_en_passant {
            self.set(Square::new(mv.start.row, mv.end.col), None);
        }

        if mv.is_castle {
            let (rook_from, rook_to) = castle_rook_squares(&mv);
            let rook = self.piece_at(rook_from);
            self.set(rook_from, None);
            self.set(rook_to, rook);
        }

        match mv.piece_moved.kind {
            PieceKind::King => self.castle_rights.revoke_both(color),
            PieceKind::Rook => self.castle_rights.revoke_corner(mv.start),
            _ => {}
        }
        if let Some(captured) = mv.piece_captured {
            if captured.kind == PieceKind::Rook && !mv.is_en_passant {
                self.castle_rights.revoke_corner(mv.end);
            }
        }
        self.castle_rights_log.push(self.castle_rights);

        self.checkmate = false;
        self.stalemate = false;
        debug!("applied {} ({:?} {:?})", logged, color, mv.piece_moved.kind);
    }

    /// Takes back the last ply. Returns the move undone, or `None` when the
    /// log is empty.
    pub fn undo_move(&mut self) -> Option<Move> {
        let mv = self.move_log.pop()?;
        let color = mv.piece_moved.color;

        self.set(mv.start, Some(mv.piece_moved));
        self.set(mv.end, mv.piece_captured);
        self.side_to_move = self.side_to_move.opposite();

        if mv.piece_moved.kind == PieceKind::King {
            self.king_squares[color.index()] = mv.start;
        }

        if mv.is_en_passant {
            self.set(mv.end, None);
            self.set(Square::new(mv.start.row, mv.end.col), mv.piece_captured);
        }

        self.en_passant_log.pop();
        self.en_passant = self.en_passant_log.last().copied().flatten();

        self.castle_rights_log.pop();
        if let Some(&rights) = self.castle_rights_log.last() {
            self.castle_rights = rights;
        }

        if mv.is_castle {
            let (rook_from, rook_to) = castle_rook_squares(&mv);
            let rook = self.piece_at(rook_to);
            self.set(rook_to, None);
            self.set(rook_from, rook);
        }

        self.checkmate = false;
        self.stalemate = false;
        debug!("undid {}", mv);
        Some(mv)
    }
}

/// An en-passant target must sit on the square a double push just crossed:
/// empty, with the pusher's pawn in front of it and its start square empty.
fn en_passant_target_is_consistent(board: &Grid, square: Square, side_to_move: Color) -> bool {
    let pusher = side_to_move.opposite();
    let forward = pusher.pawn_direction();
    let crossed_row = pusher.pawn_home_row() as i8 + forward;
    if square.row as i8 != crossed_row {
        return false;
    }
    let at = |target: Option<Square>| target.map(|sq| board[sq.row as usize][sq.col as usize]);
    at(Some(square)) == Some(None)
        && at(square.offset(forward, 0)) == Some(Some(Piece::new(pusher, PieceKind::Pawn)))
        && at(square.offset(-forward, 0)) == Some(None)
}

/// Rook origin and destination for a castling king move.
fn castle_rook_squares(mv: &Move) -> (Square, Square) {
    let row = mv.end.row;
    if mv.end.col > mv.start.col {
        (Square::new(row, 7), Square::new(row, mv.end.col - 1))
    } else {
        (Square::new(row, 0), Square::new(row, mv.end.col + 1))
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut result = String::new();
        for (row, squares) in self.board.iter().enumerate() {
            result.push(ROWS_TO_RANKS[row]);
            result.push(' ');
            for (col, occupant) in squares.iter().enumerate() {
                result.push(occupant.map(|piece| piece.symbol()).unwrap_or('.'));
                if col < 7 {
                    result.push(' ');
                }
            }
            result.push('\n');
        }
        result.push_str("  a b c d e f g h");
        write!(f, "{}", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(text: &str) -> Square {
        Square::from_notation(text).unwrap()
    }

    #[test]
    fn test_square_notation() {
        assert_eq!(Square::new(6, 4).notation(), "e2");
        assert_eq!(Square::new(0, 0).notation(), "a8");
        assert_eq!(Square::new(7, 7).notation(), "h1");
        assert_eq!(sq("e2"), Square::new(6, 4));
        assert!(Square::from_notation("i9").is_err());
        assert!(Square::from_notation("e").is_err());
        assert!(Square::from_notation("e22").is_err());
    }

    #[test]
    fn test_promotion_letters() {
        assert_eq!(PieceKind::from_promotion_letter('Q'), Ok(PieceKind::Queen));
        assert_eq!(PieceKind::from_promotion_letter('n'), Ok(PieceKind::Knight));
        assert_eq!(
            PieceKind::from_promotion_letter('K'),
            Err(ChessError::InvalidPromotionChoice('K'))
        );
        assert_eq!(
            PieceKind::from_promotion_letter('x'),
            Err(ChessError::InvalidPromotionChoice('x'))
        );
    }

    #[test]
    fn test_start_position_fen() {
        let state = GameState::new();
        assert_eq!(state.to_fen(), START_FEN);
        let parsed = GameState::from_fen(START_FEN).unwrap();
        assert_eq!(parsed.board, state.board);
        assert_eq!(parsed.king_square(Color::White), sq("e1"));
        assert_eq!(parsed.king_square(Color::Black), sq("e8"));
    }

    #[test]
    fn test_fen_rejects_garbage() {
        assert!(GameState::from_fen("").is_err());
        assert!(GameState::from_fen("8/8/8/8/8/8/8/8 w - -").is_err());
        assert!(GameState::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq -").is_err());
        assert!(GameState::from_fen("rnbqkbnr/ppppXppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -").is_err());
        assert!(GameState::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq -").is_err());
        assert!(GameState::from_fen("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -").is_err());
    }

    #[test]
    fn test_fen_rejects_zero_run() {
        assert_eq!(
            GameState::from_fen("4k3/8/8/08/8/8/8/4K3 w - - 0 1").map(|_| ()),
            Err(ChessError::InvalidFen(
                "rank '08' contains an empty run of zero squares".to_string()
            ))
        );
    }

    #[test]
    fn test_fen_en_passant_target_must_follow_a_double_push() {
        let bad_square = |text: &str| -> Result<(), ChessError> {
            Err(ChessError::InvalidFen(format!("bad en passant square '{}'", text)))
        };
        // Wrong rank for the side to move
        assert_eq!(GameState::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d5 0 1").map(|_| ()), bad_square("d5"));
        assert_eq!(GameState::from_fen("4k3/8/8/3pP3/8/8/8/4K3 b - d6 0 1").map(|_| ()), bad_square("d6"));
        // Target square occupied
        assert_eq!(GameState::from_fen("4k3/8/3n4/3pP3/8/8/8/4K3 w - d6 0 1").map(|_| ()), bad_square("d6"));
        // Something other than an enemy pawn behind the target
        assert_eq!(GameState::from_fen("4k3/8/8/3nP3/8/8/8/4K3 w - d6 0 1").map(|_| ()), bad_square("d6"));
        assert_eq!(GameState::from_fen("4k3/8/8/3PP3/8/8/8/4K3 w - d6 0 1").map(|_| ()), bad_square("d6"));
        // The pawn cannot have come from an occupied start square
        assert_eq!(GameState::from_fen("4k3/3b4/8/3pP3/8/8/8/4K3 w - d6 0 1").map(|_| ()), bad_square("d6"));

        let state = GameState::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        assert_eq!(state.en_passant(), Some(sq("d6")));
        let state = GameState::from_fen("4k3/8/8/8/3Pp3/8/8/4K3 b - d3 0 1").unwrap();
        assert_eq!(state.en_passant(), Some(sq("d3")));
    }

    #[test]
    fn test_capture_next_to_a_knight_is_not_en_passant() {
        let mut state = GameState::from_fen("4k3/8/8/8/3nP3/8/8/4K3 w - - 0 1").unwrap();
        let before = state.to_fen();
        assert!(state.try_make_move(sq("e4"), sq("d5"), None).is_err());
        state.try_make_move(sq("e4"), sq("e5"), None).unwrap();
        assert_eq!(state.piece_at(sq("d4")), Some(Piece::new(Color::Black, PieceKind::Knight)));
        state.undo_move();
        assert_eq!(state.to_fen(), before);
    }

    #[test]
    fn test_clocks_saturate_instead_of_overflowing() {
        let mut state = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 4294967295 4294967295").unwrap();
        state.try_make_move(sq("e1"), sq("d1"), None).unwrap();
        state.try_make_move(sq("e8"), sq("d8"), None).unwrap();
        assert_eq!(state.halfmove_clock(), u32::MAX);
        assert_eq!(state.fullmove_number(), u32::MAX);
        assert_eq!(state.to_fen(), "3k4/8/8/8/8/8/8/3K4 w - - 4294967295 4294967295");

        let state = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 65535 65535").unwrap();
        assert_eq!(state.halfmove_clock(), 65535);
        assert_eq!(state.fullmove_number(), 65535);
    }

    #[test]
    fn test_fullmove_number_in_a_very_long_game() {
        let mut state = GameState::new();
        let white_knight = Piece::new(Color::White, PieceKind::Knight);
        let black_knight = Piece::new(Color::Black, PieceKind::Knight);
        let shuffle = [
            Move::new(sq("g1"), sq("f3"), white_knight, None),
            Move::new(sq("g8"), sq("f6"), black_knight, None),
            Move::new(sq("f3"), sq("g1"), white_knight, None),
            Move::new(sq("f6"), sq("g8"), black_knight, None),
        ];
        let plies = 65_540u32;
        for ply in 0..plies {
            state.make_move(shuffle[ply as usize % shuffle.len()], None);
        }
        assert_eq!(state.move_log().len(), plies as usize);
        assert_eq!(state.fullmove_number(), 1 + plies / 2);
        assert_eq!(state.halfmove_clock(), plies);
    }

    #[test]
    fn test_fen_drops_unusable_castle_rights() {
        let state = GameState::from_fen("4k3/8/8/8/8/8/8/4K2R w KQkq - 0 1").unwrap();
        let rights = state.castle_rights();
        assert!(rights.white_king_side);
        assert!(!rights.white_queen_side);
        assert!(!rights.black_king_side);
        assert!(!rights.black_queen_side);
    }

    #[test]
    fn test_clocks_follow_the_log() {
        let mut state = GameState::new();
        let play = |state: &mut GameState, from: &str, to: &str| {
            state.try_make_move(sq(from), sq(to), None).unwrap();
        };
        play(&mut state, "g1", "f3");
        assert_eq!(state.halfmove_clock(), 1);
        assert_eq!(state.fullmove_number(), 1);
        play(&mut state, "g8", "f6");
        assert_eq!(state.halfmove_clock(), 2);
        assert_eq!(state.fullmove_number(), 2);
        play(&mut state, "e2", "e4");
        assert_eq!(state.halfmove_clock(), 0);
        assert_eq!(
            state.to_fen(),
            "rnbqkb1r/pppppppp/5n2/8/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq e3 0 2"
        );
    }

    #[test]
    fn test_fullmove_number_when_black_starts() {
        let mut state =
            GameState::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 7 30").unwrap();
        assert_eq!(state.fullmove_number(), 30);
        state.try_make_move(sq("e8"), sq("d8"), None).unwrap();
        assert_eq!(state.fullmove_number(), 31);
        assert_eq!(state.halfmove_clock(), 8);
        state.try_make_move(sq("e1"), sq("d1"), None).unwrap();
        assert_eq!(state.fullmove_number(), 31);
    }

    #[test]
    fn test_undo_on_empty_log_is_noop() {
        let mut state = GameState::new();
        assert!(state.undo_move().is_none());
        assert_eq!(state.to_fen(), START_FEN);
    }

    #[test]
    fn test_king_move_revokes_both_rights() {
        let mut state = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1").unwrap();
        state.try_make_move(sq("e8"), sq("d8"), None).unwrap();
        let rights = state.castle_rights();
        assert!(!rights.black_king_side);
        assert!(!rights.black_queen_side);
        assert!(rights.white_king_side);
        assert!(rights.white_queen_side);
        state.undo_move();
        assert_eq!(state.castle_rights(), CastleRights::all());
    }

    #[test]
    fn test_rook_move_revokes_its_own_side() {
        let cases = [
            (Color::White, "h1", "h2", "white_king_side"),
            (Color::White, "a1", "a2", "white_queen_side"),
            (Color::Black, "h8", "h7", "black_king_side"),
            (Color::Black, "a8", "a7", "black_queen_side"),
        ];
        for (color, from, to, lost) in cases {
            let side = if color == Color::White { "w" } else { "b" };
            let fen = format!("r3k2r/8/8/8/8/8/8/R3K2R {} KQkq - 0 1", side);
            let mut state = GameState::from_fen(&fen).unwrap();
            state.try_make_move(sq(from), sq(to), None).unwrap();
            let rights = state.castle_rights();
            let flags = [
                ("white_king_side", rights.white_king_side),
                ("white_queen_side", rights.white_queen_side),
                ("black_king_side", rights.black_king_side),
                ("black_queen_side", rights.black_queen_side),
            ];
            for (name, held) in flags {
                assert_eq!(held, name != lost, "{} after {}{}", name, from, to);
            }
        }
    }

    #[test]
    fn test_capturing_home_rook_revokes_right() {
        let mut state = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        state.try_make_move(sq("a1"), sq("a8"), None).unwrap();
        let rights = state.castle_rights();
        assert!(!rights.white_queen_side);
        assert!(!rights.black_queen_side);
        assert!(rights.black_king_side);
        assert!(rights.white_king_side);
    }
}
