//! Board state and reversible move application.
//!
//! The board owns the mailbox square array, per-side piece lists, the cached
//! king squares and the incrementally maintained Zobrist hash. Search and
//! perft drive it through `make_move_fast`/`unmake_move_fast`; hosts use the
//! `apply_move`/`commit_promotion`/`undo` protocol which keeps a history of
//! full move records.

use crate::defs::*;
use crate::error::{EngineError, EngineResult};
use crate::movegen;
use crate::mv::{FastMove, MoveList, FLAG_CAPTURE, FLAG_CASTLE, FLAG_EN_PASSANT, PROMO_SHIFT};

lazy_static::lazy_static! {
    pub static ref ZOBRIST: Zobrist = get_zobrist_keys();
    pub static ref ATTACKS: AttackTables = get_attack_tables();
}

/// Outcome of `apply_move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// The move was made.
    Ok,
    /// The move is a legal pawn push to the last rank; call
    /// `commit_promotion` to complete it.
    NeedPromotion,
    /// The move is not legal in this position.
    Illegal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Ongoing,
    WhiteWin,
    BlackWin,
    Draw,
}

/// State captured before `make_move_fast`, consumed by `unmake_move_fast`.
#[derive(Debug, Clone, Copy)]
pub struct Undo {
    pub ep_target: u8,
    pub castling: [bool; 4],
    pub halfmove_clock: u32,
    pub hash: u64,
}

/// Full record of a committed move, kept for `undo`.
#[derive(Debug, Clone, Copy)]
struct MoveRecord {
    mv: FastMove,
    undo: Undo,
}

#[derive(Clone, Debug)]
pub struct Board {
    /// Piece bytes, square index = rank * 8 + file; a1 = 0, h8 = 63.
    pub squares: [u8; 64],
    /// Dense lists of occupied squares per side, exactly mirroring
    /// `squares`. Sized for the full board: `set_piece` and lenient FENs can
    /// exceed the 16 pieces of legal play.
    piece_lists: [[u8; 64]; 2],
    piece_counts: [u8; 2],
    king_sq: [u8; 2],
    pub side: Color,
    /// Castling rights in the order WK, WQ, BK, BQ.
    pub castling: [bool; 4],
    /// En-passant target square, or `SQ_NONE`.
    pub ep_target: u8,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub hash: u64,
    promotion_pending: Option<(u8, u8)>,
    history: Vec<MoveRecord>,
}

impl Board {
    /// The standard starting position.
    pub fn new() -> Self {
        let mut board = Board::empty();

        board.squares[0] = make_piece(PIECE_ROOK, COLOR_WHITE);
        board.squares[1] = make_piece(PIECE_KNIGHT, COLOR_WHITE);
        board.squares[2] = make_piece(PIECE_BISHOP, COLOR_WHITE);
        board.squares[3] = make_piece(PIECE_QUEEN, COLOR_WHITE);
        board.squares[4] = make_piece(PIECE_KING, COLOR_WHITE);
        board.squares[5] = make_piece(PIECE_BISHOP, COLOR_WHITE);
        board.squares[6] = make_piece(PIECE_KNIGHT, COLOR_WHITE);
        board.squares[7] = make_piece(PIECE_ROOK, COLOR_WHITE);
        for sq in 8..16 {
            board.squares[sq] = make_piece(PIECE_PAWN, COLOR_WHITE);
        }
        for sq in 48..56 {
            board.squares[sq] = make_piece(PIECE_PAWN, COLOR_BLACK);
        }
        board.squares[56] = make_piece(PIECE_ROOK, COLOR_BLACK);
        board.squares[57] = make_piece(PIECE_KNIGHT, COLOR_BLACK);
        board.squares[58] = make_piece(PIECE_BISHOP, COLOR_BLACK);
        board.squares[59] = make_piece(PIECE_QUEEN, COLOR_BLACK);
        board.squares[60] = make_piece(PIECE_KING, COLOR_BLACK);
        board.squares[61] = make_piece(PIECE_BISHOP, COLOR_BLACK);
        board.squares[62] = make_piece(PIECE_KNIGHT, COLOR_BLACK);
        board.squares[63] = make_piece(PIECE_ROOK, COLOR_BLACK);

        board.castling = [true; 4];
        board.rebuild_derived_state();
        board
    }

    pub(crate) fn empty() -> Self {
        Board {
            squares: [0; 64],
            piece_lists: [[0; 64]; 2],
            piece_counts: [0; 2],
            king_sq: [SQ_NONE; 2],
            side: Color::White,
            castling: [false; 4],
            ep_target: SQ_NONE,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
            promotion_pending: None,
            history: Vec::new(),
        }
    }

    /// Recomputes piece lists, king cache and the full hash from `squares`.
    /// Called after any setup path (start position, FEN, `set_piece`).
    pub(crate) fn rebuild_derived_state(&mut self) {
        self.piece_counts = [0; 2];
        self.king_sq = [SQ_NONE; 2];
        for sq in 0..64u8 {
            let piece = self.squares[sq as usize];
            if is_empty(piece) {
                continue;
            }
            let c = if is_white(piece) { 0 } else { 1 };
            self.list_add(c, sq);
            if piece_type(piece) == PIECE_KING {
                self.king_sq[c] = sq;
            }
        }
        self.hash = self.calculate_hash();
    }

    /// Full Zobrist recomputation. The incremental hash must always agree
    /// with this.
    pub fn calculate_hash(&self) -> u64 {
        let mut h = 0u64;
        for sq in 0..64 {
            let piece = self.squares[sq];
            if !is_empty(piece) {
                h ^= ZOBRIST.pieces[zobrist_piece_index(piece)][sq];
            }
        }
        for right in 0..4 {
            if self.castling[right] {
                h ^= ZOBRIST.castling[right];
            }
        }
        if self.ep_target != SQ_NONE {
            h ^= ZOBRIST.ep_file[(self.ep_target % 8) as usize];
        }
        if self.side == Color::Black {
            h ^= ZOBRIST.side;
        }
        h
    }

    // ---- accessors ----

    #[inline]
    pub fn turn(&self) -> Color {
        self.side
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> u8 {
        self.king_sq[color.index()]
    }

    /// Occupied squares of one side. Ordering is unspecified.
    #[inline]
    pub fn piece_list(&self, color: Color) -> &[u8] {
        let c = color.index();
        &self.piece_lists[c][..self.piece_counts[c] as usize]
    }

    pub fn piece_at(&self, sq: u8) -> EngineResult<u8> {
        if sq >= 64 {
            return Err(EngineError::SquareOutOfRange { square: sq });
        }
        Ok(self.squares[sq as usize])
    }

    /// Places (or clears) a piece, keeping hash, piece lists and king cache
    /// consistent. Intended for position setup, not for play.
    pub fn set_piece(&mut self, sq: u8, piece: u8) -> EngineResult<()> {
        if sq >= 64 {
            return Err(EngineError::SquareOutOfRange { square: sq });
        }
        let old = self.squares[sq as usize];
        if !is_empty(old) {
            self.hash ^= ZOBRIST.pieces[zobrist_piece_index(old)][sq as usize];
            self.list_remove(if is_white(old) { 0 } else { 1 }, sq);
        }
        self.squares[sq as usize] = piece;
        if !is_empty(piece) {
            self.hash ^= ZOBRIST.pieces[zobrist_piece_index(piece)][sq as usize];
            self.list_add(if is_white(piece) { 0 } else { 1 }, sq);
            if piece_type(piece) == PIECE_KING {
                self.king_sq[if is_white(piece) { 0 } else { 1 }] = sq;
            }
        }
        Ok(())
    }

    // ---- piece list maintenance ----

    #[inline]
    fn list_add(&mut self, color: usize, sq: u8) {
        let count = self.piece_counts[color] as usize;
        debug_assert!(count < 64);
        self.piece_lists[color][count] = sq;
        self.piece_counts[color] += 1;
    }

    #[inline]
    fn list_remove(&mut self, color: usize, sq: u8) {
        let count = self.piece_counts[color] as usize;
        for i in 0..count {
            if self.piece_lists[color][i] == sq {
                self.piece_lists[color][i] = self.piece_lists[color][count - 1];
                self.piece_counts[color] -= 1;
                return;
            }
        }
        debug_assert!(false, "square {} not in piece list", sq);
    }

    #[inline]
    fn list_move(&mut self, color: usize, from: u8, to: u8) {
        let count = self.piece_counts[color] as usize;
        for i in 0..count {
            if self.piece_lists[color][i] == from {
                self.piece_lists[color][i] = to;
                return;
            }
        }
        debug_assert!(false, "square {} not in piece list", from);
    }

    // ---- attack detection ----

    /// True if any piece of `by` attacks `sq`. Side-effect free.
    pub fn is_square_attacked(&self, sq: u8, by: Color) -> bool {
        let attacker_mask = by.mask();
        let pos = sq as usize;

        for i in 0..ATTACKS.knight_count[pos] as usize {
            let from = ATTACKS.knight[pos][i] as usize;
            let piece = self.squares[from];
            if piece_type(piece) == PIECE_KNIGHT && piece_color(piece) == attacker_mask {
                return true;
            }
        }

        for i in 0..ATTACKS.king_count[pos] as usize {
            let from = ATTACKS.king[pos][i] as usize;
            let piece = self.squares[from];
            if piece_type(piece) == PIECE_KING && piece_color(piece) == attacker_mask {
                return true;
            }
        }

        // A pawn of `by` attacks sq from one rank towards its own side.
        let pawn_dir: i16 = if by == Color::White { -8 } else { 8 };
        let file = sq % 8;
        if file > 0 {
            let from = sq as i16 + pawn_dir - 1;
            if (0..64).contains(&from) {
                let piece = self.squares[from as usize];
                if piece_type(piece) == PIECE_PAWN && piece_color(piece) == attacker_mask {
                    return true;
                }
            }
        }
        if file < 7 {
            let from = sq as i16 + pawn_dir + 1;
            if (0..64).contains(&from) {
                let piece = self.squares[from as usize];
                if piece_type(piece) == PIECE_PAWN && piece_color(piece) == attacker_mask {
                    return true;
                }
            }
        }

        for dir in 0..8 {
            let offset = DIR_OFFSETS[dir] as i16;
            let dist = ATTACKS.squares_to_edge[pos][dir];
            let mut target = sq as i16;
            for _ in 0..dist {
                target += offset;
                let piece = self.squares[target as usize];
                if is_empty(piece) {
                    continue;
                }
                if piece_color(piece) == attacker_mask {
                    let pt = piece_type(piece);
                    if pt == PIECE_QUEEN
                        || (dir < 4 && pt == PIECE_ROOK)
                        || (dir >= 4 && pt == PIECE_BISHOP)
                    {
                        return true;
                    }
                }
                break;
            }
        }

        false
    }

    pub fn in_check(&self, color: Color) -> bool {
        let king = self.king_sq[color.index()];
        if king == SQ_NONE {
            return false;
        }
        self.is_square_attacked(king, color.opposite())
    }

    /// True if the side to move has at least one legal reply. Short-circuits
    /// on the first pseudo-legal move that survives the own-king check.
    pub fn has_legal_moves(&mut self) -> bool {
        let mut moves = MoveList::new();
        movegen::generate_pseudo_legal(self, &mut moves);

        let us = self.side;
        let undo = self.snapshot();
        for i in 0..moves.count {
            let m = moves.moves[i];
            self.make_move_fast(&m);
            let legal = !self.is_square_attacked(self.king_sq[us.index()], us.opposite());
            self.unmake_move_fast(&m, &undo);
            if legal {
                return true;
            }
        }
        false
    }

    // ---- make / unmake ----

    #[inline]
    pub fn snapshot(&self) -> Undo {
        Undo {
            ep_target: self.ep_target,
            castling: self.castling,
            halfmove_clock: self.halfmove_clock,
            hash: self.hash,
        }
    }

    #[inline]
    fn revoke_castling(&mut self, right: usize) {
        if self.castling[right] {
            self.hash ^= ZOBRIST.castling[right];
            self.castling[right] = false;
        }
    }

    /// Applies a pseudo-legal move, mutating every piece of board state and
    /// the hash in lockstep. The caller captures a snapshot first and is
    /// responsible for rejecting moves that leave its own king attacked.
    pub fn make_move_fast(&mut self, m: &FastMove) {
        let from = m.from as usize;
        let to = m.to as usize;
        let moving = self.squares[from];
        let ptype = piece_type(moving);
        let us = self.side;
        let us_idx = us.index();
        let them = us.opposite();
        let them_idx = them.index();

        if self.ep_target != SQ_NONE {
            self.hash ^= ZOBRIST.ep_file[(self.ep_target % 8) as usize];
        }

        if m.is_en_passant() {
            let capture_sq = if us == Color::White { to - 8 } else { to + 8 };
            let victim = self.squares[capture_sq];
            self.hash ^= ZOBRIST.pieces[zobrist_piece_index(victim)][capture_sq];
            self.squares[capture_sq] = 0;
            self.list_remove(them_idx, capture_sq as u8);
        } else if m.flags & FLAG_CAPTURE != 0 {
            let victim = self.squares[to];
            self.hash ^= ZOBRIST.pieces[zobrist_piece_index(victim)][to];
            self.list_remove(them_idx, m.to);
        }

        if m.is_castle() {
            // Kingside: rook from the h-corner to the king's near side.
            // Queenside: rook from the a-corner.
            let (rook_from, rook_to) = if to > from {
                (from + 3, from + 1)
            } else {
                (from - 4, from - 1)
            };
            let rook = self.squares[rook_from];
            self.hash ^= ZOBRIST.pieces[zobrist_piece_index(rook)][rook_from];
            self.hash ^= ZOBRIST.pieces[zobrist_piece_index(rook)][rook_to];
            self.squares[rook_to] = rook;
            self.squares[rook_from] = 0;
            self.list_move(us_idx, rook_from as u8, rook_to as u8);
        }

        self.hash ^= ZOBRIST.pieces[zobrist_piece_index(moving)][from];
        self.squares[from] = 0;
        let promo = m.promotion();
        let placed = if promo != 0 {
            make_piece(promo, piece_color(moving))
        } else {
            moving
        };
        self.squares[to] = placed;
        self.hash ^= ZOBRIST.pieces[zobrist_piece_index(placed)][to];
        self.list_move(us_idx, m.from, m.to);

        if ptype == PIECE_KING {
            self.king_sq[us_idx] = m.to;
        }

        self.ep_target = SQ_NONE;
        if ptype == PIECE_PAWN {
            let dist = to as i16 - from as i16;
            if dist == 16 || dist == -16 {
                self.ep_target = ((from + to) / 2) as u8;
                self.hash ^= ZOBRIST.ep_file[(self.ep_target % 8) as usize];
            }
        }

        if ptype == PIECE_KING {
            if us == Color::White {
                self.revoke_castling(0);
                self.revoke_castling(1);
            } else {
                self.revoke_castling(2);
                self.revoke_castling(3);
            }
        }
        // A rook leaving, or anything landing on, a corner square kills the
        // corresponding right.
        if from == 0 || to == 0 {
            self.revoke_castling(1);
        }
        if from == 7 || to == 7 {
            self.revoke_castling(0);
        }
        if from == 56 || to == 56 {
            self.revoke_castling(3);
        }
        if from == 63 || to == 63 {
            self.revoke_castling(2);
        }

        if ptype == PIECE_PAWN || m.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if us == Color::Black {
            self.fullmove_number += 1;
        }

        self.hash ^= ZOBRIST.side;
        self.side = them;
    }

    /// Reverts `make_move_fast`. The snapshot must be the one taken
    /// immediately before the corresponding make.
    pub fn unmake_move_fast(&mut self, m: &FastMove, undo: &Undo) {
        self.side = self.side.opposite();
        let us = self.side;
        let us_idx = us.index();
        let them_idx = us.opposite().index();
        let from = m.from as usize;
        let to = m.to as usize;

        let mut moving = self.squares[to];
        if m.promotion() != 0 {
            moving = make_piece(PIECE_PAWN, piece_color(moving));
        }
        self.squares[from] = moving;
        self.list_move(us_idx, m.to, m.from);

        if m.is_en_passant() {
            self.squares[to] = 0;
            let capture_sq = if us == Color::White { to - 8 } else { to + 8 };
            self.squares[capture_sq] = m.captured;
            self.list_add(them_idx, capture_sq as u8);
        } else {
            self.squares[to] = m.captured;
            if m.flags & FLAG_CAPTURE != 0 {
                self.list_add(them_idx, m.to);
            }
        }

        if m.is_castle() {
            let (rook_from, rook_to) = if to > from {
                (from + 3, from + 1)
            } else {
                (from - 4, from - 1)
            };
            self.squares[rook_from] = self.squares[rook_to];
            self.squares[rook_to] = 0;
            self.list_move(us_idx, rook_to as u8, rook_from as u8);
        }

        if piece_type(moving) == PIECE_KING {
            self.king_sq[us_idx] = m.from;
        }

        self.ep_target = undo.ep_target;
        self.castling = undo.castling;
        self.halfmove_clock = undo.halfmove_clock;
        self.hash = undo.hash;
        if us == Color::Black {
            self.fullmove_number -= 1;
        }
    }

    // ---- legal move queries ----

    /// All strictly legal moves for the side to move.
    pub fn legal_moves(&mut self) -> MoveList {
        let mut pseudo = MoveList::new();
        movegen::generate_pseudo_legal(self, &mut pseudo);

        let mut legal = MoveList::new();
        let us = self.side;
        let undo = self.snapshot();
        for i in 0..pseudo.count {
            let m = pseudo.moves[i];
            self.make_move_fast(&m);
            if !self.is_square_attacked(self.king_sq[us.index()], us.opposite()) {
                legal.moves[legal.count] = m;
                legal.count += 1;
            }
            self.unmake_move_fast(&m, &undo);
        }
        legal
    }

    /// Legal destination squares for the piece on `sq`. Empty when the
    /// square holds no piece of the side to move.
    pub fn legal_moves_from(&mut self, sq: u8) -> EngineResult<Vec<u8>> {
        if sq >= 64 {
            return Err(EngineError::SquareOutOfRange { square: sq });
        }
        let piece = self.squares[sq as usize];
        if is_empty(piece) || piece_color(piece) != self.side.mask() {
            return Ok(Vec::new());
        }

        let mut targets = Vec::new();
        let moves = self.legal_moves();
        for m in moves.as_slice() {
            if m.from == sq && !targets.contains(&m.to) {
                targets.push(m.to);
            }
        }
        Ok(targets)
    }

    /// Builds the `FastMove` for a from/to pair in the current position,
    /// inferring capture, en-passant and castling flags.
    fn build_move(&self, from: u8, to: u8, promo: u8) -> FastMove {
        let piece = self.squares[from as usize];
        let ptype = piece_type(piece);
        let mut flags = promo << PROMO_SHIFT;
        let mut captured = 0;

        if ptype == PIECE_PAWN && to == self.ep_target && from % 8 != to % 8 {
            flags |= FLAG_EN_PASSANT;
            let capture_sq = if self.side == Color::White { to - 8 } else { to + 8 };
            captured = self.squares[capture_sq as usize];
        } else if !is_empty(self.squares[to as usize]) {
            flags |= FLAG_CAPTURE;
            captured = self.squares[to as usize];
        }
        if ptype == PIECE_KING && (to as i16 - from as i16).abs() == 2 {
            flags |= FLAG_CASTLE;
        }

        FastMove::new(from, to, flags, captured)
    }

    fn commit(&mut self, mv: FastMove) {
        let undo = self.snapshot();
        self.make_move_fast(&mv);
        self.history.push(MoveRecord { mv, undo });
    }

    /// Attempts the move `from -> to` for the side to move. A legal pawn
    /// push to the last rank is held back as a pending promotion until
    /// `commit_promotion` supplies the piece choice.
    pub fn apply_move(&mut self, from: u8, to: u8) -> EngineResult<ApplyResult> {
        if self.promotion_pending.is_some() {
            return Err(EngineError::PromotionNotExpected);
        }
        if from >= 64 {
            return Err(EngineError::SquareOutOfRange { square: from });
        }
        if to >= 64 {
            return Err(EngineError::SquareOutOfRange { square: to });
        }

        let piece = self.squares[from as usize];
        if is_empty(piece) || piece_color(piece) != self.side.mask() {
            return Ok(ApplyResult::Illegal);
        }
        let targets = self.legal_moves_from(from)?;
        if !targets.contains(&to) {
            return Ok(ApplyResult::Illegal);
        }

        let to_rank = to / 8;
        if piece_type(piece) == PIECE_PAWN && (to_rank == 0 || to_rank == 7) {
            self.promotion_pending = Some((from, to));
            return Ok(ApplyResult::NeedPromotion);
        }

        let mv = self.build_move(from, to, 0);
        self.commit(mv);
        Ok(ApplyResult::Ok)
    }

    /// Completes a pending promotion. `choice` is a piece type byte; anything
    /// other than N, B or R promotes to a queen.
    pub fn commit_promotion(&mut self, choice: u8) -> EngineResult<()> {
        let (from, to) = self
            .promotion_pending
            .take()
            .ok_or(EngineError::NoPromotionPending)?;

        let promo = match piece_type(choice) {
            PIECE_KNIGHT => PIECE_KNIGHT,
            PIECE_BISHOP => PIECE_BISHOP,
            PIECE_ROOK => PIECE_ROOK,
            _ => PIECE_QUEEN,
        };
        let mv = self.build_move(from, to, promo);
        self.commit(mv);
        Ok(())
    }

    /// True while `apply_move` is waiting for a promotion choice.
    pub fn promotion_pending(&self) -> bool {
        self.promotion_pending.is_some()
    }

    /// Reverts the most recently committed move. A no-op on an empty
    /// history.
    pub fn undo(&mut self) -> EngineResult<()> {
        if self.promotion_pending.is_some() {
            return Err(EngineError::PromotionNotExpected);
        }
        if let Some(record) = self.history.pop() {
            self.unmake_move_fast(&record.mv, &record.undo);
        }
        Ok(())
    }

    /// Long algebraic notation of the committed move history.
    pub fn move_history(&self) -> Vec<String> {
        self.history.iter().map(|r| r.mv.notation()).collect()
    }

    // ---- game state ----

    pub fn is_checkmate(&mut self, color: Color) -> bool {
        self.side == color && self.in_check(color) && !self.has_legal_moves()
    }

    pub fn is_stalemate(&mut self, color: Color) -> bool {
        self.side == color && !self.in_check(color) && !self.has_legal_moves()
    }

    pub fn game_over(&mut self) -> bool {
        if self.halfmove_clock >= 100 {
            return true;
        }
        !self.has_legal_moves()
    }

    pub fn result(&mut self) -> GameResult {
        if !self.has_legal_moves() {
            if self.in_check(self.side) {
                return match self.side {
                    Color::White => GameResult::BlackWin,
                    Color::Black => GameResult::WhiteWin,
                };
            }
            return GameResult::Draw;
        }
        if self.halfmove_clock >= 100 {
            return GameResult::Draw;
        }
        GameResult::Ongoing
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}
