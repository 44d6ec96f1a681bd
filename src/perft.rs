use crate::board::{GameState, PieceKind};
use crate::movegen::Move;

fn promotion_choices(mv: &Move) -> &'static [Option<PieceKind>] {
    const CHOICES: [Option<PieceKind>; 4] = [
        Some(PieceKind::Queen),
        Some(PieceKind::Rook),
        Some(PieceKind::Bishop),
        Some(PieceKind::Knight),
    ];
    if mv.is_promotion {
        &CHOICES
    } else {
        &[None]
    }
}

/// Counts the leaf positions `depth` plies below `state`. Each promotion
/// counts once per promotion piece. The state is left as it was found.
pub fn perft(state: &mut GameState, depth: u32) -> u64 {
    let flags = (state.checkmate, state.stalemate);
    let nodes = count(state, depth);
    (state.checkmate, state.stalemate) = flags;
    nodes
}

fn count(state: &mut GameState, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = state.legal_moves();
    if depth == 1 {
        return moves.iter().map(|mv| promotion_choices(mv).len() as u64).sum();
    }

    let mut nodes = 0;
    for mv in moves {
        for &promotion in promotion_choices(&mv) {
            state.make_move(mv, promotion);
            nodes += count(state, depth - 1);
            state.undo_move();
        }
    }
    nodes
}

/// Per-root-move breakdown of `perft`, keyed by long algebraic notation.
pub fn divide(state: &mut GameState, depth: u32) -> Vec<(String, u64)> {
    if depth == 0 {
        return Vec::new();
    }

    let flags = (state.checkmate, state.stalemate);
    let mut results = Vec::new();
    for mv in state.legal_moves() {
        for &promotion in promotion_choices(&mv) {
            state.make_move(mv, promotion);
            let nodes = count(state, depth - 1);
            state.undo_move();
            results.push((mv.with_promotion(promotion).notation(), nodes));
        }
    }
    (state.checkmate, state.stalemate) = flags;
    results
}
