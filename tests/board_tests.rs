//! Board state invariants: make/unmake bit-identity, incremental hash
//! consistency and piece-list bookkeeping across deep move sequences.

use vesper_engine::defs::{is_white, Color, Prng};
use vesper_engine::movegen::generate_pseudo_legal;
use vesper_engine::mv::MoveList;
use vesper_engine::Board;

const TEST_FENS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2",
];

/// Sorted occupied squares per side, straight from the square array; the
/// piece lists must always agree with this.
fn occupied_squares(board: &Board, color: Color) -> Vec<u8> {
    let mut squares: Vec<u8> = (0..64u8)
        .filter(|&sq| {
            let piece = board.squares[sq as usize];
            piece != 0 && is_white(piece) == (color == Color::White)
        })
        .collect();
    squares.sort_unstable();
    squares
}

fn assert_piece_lists_consistent(board: &Board) {
    for color in [Color::White, Color::Black] {
        let mut list: Vec<u8> = board.piece_list(color).to_vec();
        list.sort_unstable();
        assert_eq!(list, occupied_squares(board, color), "piece list out of sync");
    }
}

fn assert_boards_identical(a: &Board, b: &Board) {
    assert_eq!(a.squares, b.squares);
    assert_eq!(a.side, b.side);
    assert_eq!(a.castling, b.castling);
    assert_eq!(a.ep_target, b.ep_target);
    assert_eq!(a.halfmove_clock, b.halfmove_clock);
    assert_eq!(a.fullmove_number, b.fullmove_number);
    assert_eq!(a.hash, b.hash);
    for color in [Color::White, Color::Black] {
        assert_eq!(a.king_square(color), b.king_square(color));
        let mut list_a: Vec<u8> = a.piece_list(color).to_vec();
        let mut list_b: Vec<u8> = b.piece_list(color).to_vec();
        list_a.sort_unstable();
        list_b.sort_unstable();
        assert_eq!(list_a, list_b);
    }
}

#[test]
fn test_make_unmake_round_trip_every_move() {
    for fen in TEST_FENS {
        let mut board = Board::from_fen(fen).expect(fen);
        let reference = board.clone();

        let mut moves = MoveList::new();
        generate_pseudo_legal(&board, &mut moves);
        let undo = board.snapshot();

        for m in moves.as_slice().to_vec() {
            board.make_move_fast(&m);
            assert_eq!(
                board.hash,
                board.calculate_hash(),
                "incremental hash diverged after {} in {}",
                m.notation(),
                fen
            );
            assert_piece_lists_consistent(&board);
            board.unmake_move_fast(&m, &undo);
            assert_boards_identical(&board, &reference);
        }
    }
}

#[test]
fn test_legal_moves_never_leave_own_king_attacked() {
    for fen in TEST_FENS {
        let mut board = Board::from_fen(fen).expect(fen);
        let us = board.turn();
        let undo = board.snapshot();
        for m in board.legal_moves().as_slice().to_vec() {
            board.make_move_fast(&m);
            assert!(
                !board.is_square_attacked(board.king_square(us), us.opposite()),
                "legal move {} leaves king attacked in {}",
                m.notation(),
                fen
            );
            board.unmake_move_fast(&m, &undo);
        }
    }
}

#[test]
fn test_pinned_piece_cannot_move() {
    // The e4 knight is pinned to the king by the e8 rook.
    let mut board = Board::from_fen("4r2k/8/8/8/4N3/8/8/4K3 w - - 0 1").unwrap();
    let targets = board.legal_moves_from(28).unwrap();
    assert!(targets.is_empty(), "pinned knight moved: {:?}", targets);
}

#[test]
fn test_deep_walk_keeps_hash_and_lists_consistent() {
    // Play a long pseudo-random legal game, checking invariants each ply.
    let mut board = Board::new();
    let mut rng = Prng::new(0xC0FFEE);

    for ply in 0..120 {
        let moves = board.legal_moves();
        if moves.is_empty() || board.halfmove_clock >= 100 {
            break;
        }
        let m = moves.as_slice()[(rng.next_u64() % moves.len() as u64) as usize];
        let promo = m.promotion();

        match board.apply_move(m.from, m.to).unwrap() {
            vesper_engine::ApplyResult::NeedPromotion => {
                board.commit_promotion(promo).unwrap();
            }
            vesper_engine::ApplyResult::Ok => {}
            vesper_engine::ApplyResult::Illegal => {
                panic!("legal move {} rejected at ply {}", m.notation(), ply)
            }
        }

        assert_eq!(board.hash, board.calculate_hash(), "hash diverged at ply {}", ply);
        assert_piece_lists_consistent(&board);
    }
}

#[test]
fn test_undo_rewinds_a_full_game() {
    let mut board = Board::new();
    let start = board.clone();
    let mut rng = Prng::new(0xBADA55);
    let mut plies = 0;

    while plies < 60 {
        let moves = board.legal_moves();
        if moves.is_empty() {
            break;
        }
        let m = moves.as_slice()[(rng.next_u64() % moves.len() as u64) as usize];
        match board.apply_move(m.from, m.to).unwrap() {
            vesper_engine::ApplyResult::NeedPromotion => {
                board.commit_promotion(m.promotion()).unwrap()
            }
            _ => {}
        }
        plies += 1;
    }

    for _ in 0..plies {
        board.undo().unwrap();
    }
    assert_boards_identical(&board, &start);
}

#[test]
fn test_castling_rights_die_with_rook_and_king() {
    let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();

    // Moving the h1 rook kills white kingside only.
    board.apply_move(7, 15).unwrap();
    assert_eq!(board.castling, [false, true, true, true]);
    assert_eq!(board.hash, board.calculate_hash());

    // Moving the black king kills both black rights.
    board.apply_move(60, 59).unwrap();
    assert_eq!(board.castling, [false, true, false, false]);
    assert_eq!(board.hash, board.calculate_hash());

    board.undo().unwrap();
    board.undo().unwrap();
    assert_eq!(board.castling, [true; 4]);
}

#[test]
fn test_capturing_a_rook_revokes_its_right() {
    // White rook takes the a8 rook along the file.
    let mut board = Board::from_fen("r3k3/8/8/8/8/8/8/R3K3 w Qq - 0 1").unwrap();
    board.apply_move(0, 56).unwrap();
    assert_eq!(board.castling, [false; 4]);
    assert_eq!(board.hash, board.calculate_hash());
}

#[test]
fn test_en_passant_capture_removes_the_right_pawn() {
    let mut board = Board::new();
    for (from, to) in [(12u8, 28u8), (48, 40), (28, 36), (51, 35)] {
        board.apply_move(from, to).unwrap();
    }
    // After e4 a6 e5 d5 the ep square is d6 and e5xd6 is legal.
    assert_eq!(board.ep_target, 43);
    let targets = board.legal_moves_from(36).unwrap();
    assert!(targets.contains(&43));

    board.apply_move(36, 43).unwrap();
    assert_eq!(board.piece_at(35).unwrap(), 0, "captured pawn still on d5");
    assert!(is_white(board.piece_at(43).unwrap()));
    assert_eq!(board.hash, board.calculate_hash());
}

#[test]
fn test_en_passant_expires_after_one_ply() {
    let mut board = Board::new();
    for (from, to) in [(12u8, 28u8), (48, 40), (28, 36), (51, 35), (1, 18), (40, 32)] {
        board.apply_move(from, to).unwrap();
    }
    // Two plies later the d6 target is gone.
    let targets = board.legal_moves_from(36).unwrap();
    assert!(!targets.contains(&43));
}

#[test]
fn test_halfmove_clock_resets_on_pawn_moves_and_captures() {
    let mut board = Board::new();
    board.apply_move(6, 21).unwrap(); // Nf3
    assert_eq!(board.halfmove_clock, 1);
    board.apply_move(57, 42).unwrap(); // Nc6
    assert_eq!(board.halfmove_clock, 2);
    board.apply_move(12, 28).unwrap(); // e4, pawn move resets
    assert_eq!(board.halfmove_clock, 0);
    assert_eq!(board.fullmove_number, 2);
}
