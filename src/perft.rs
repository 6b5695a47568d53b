//! Perft: the move-generation correctness oracle.
//!
//! Counts leaf positions reachable by strictly legal move sequences, using
//! the same make/unmake and own-king legality filter as the search, so a
//! matching node count exercises every code path that matters.

use std::collections::BTreeMap;

use crate::board::Board;
use crate::movegen;
use crate::mv::MoveList;

/// Number of legal leaf positions exactly `depth` plies ahead.
pub fn perft(board: &mut Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut moves = MoveList::new();
    movegen::generate_pseudo_legal(board, &mut moves);

    let us = board.side;
    let undo = board.snapshot();
    let mut nodes = 0;

    for i in 0..moves.count {
        let m = moves.moves[i];
        board.make_move_fast(&m);
        if !board.is_square_attacked(board.king_square(us), us.opposite()) {
            nodes += perft(board, depth - 1);
        }
        board.unmake_move_fast(&m, &undo);
    }

    nodes
}

/// Per-root-move subtree counts, keyed by long algebraic notation.
pub fn perft_divide(board: &mut Board, depth: u32) -> BTreeMap<String, u64> {
    let mut result = BTreeMap::new();
    if depth == 0 {
        return result;
    }

    let mut moves = MoveList::new();
    movegen::generate_pseudo_legal(board, &mut moves);

    let us = board.side;
    let undo = board.snapshot();

    for i in 0..moves.count {
        let m = moves.moves[i];
        board.make_move_fast(&m);
        if !board.is_square_attacked(board.king_square(us), us.opposite()) {
            result.insert(m.notation(), perft(board, depth - 1));
        }
        board.unmake_move_fast(&m, &undo);
    }

    result
}
