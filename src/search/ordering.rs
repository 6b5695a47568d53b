//! Move ordering: TT move first, then promotions and captures by MVV-LVA,
//! then killers and history-scored quiet moves.

use lazy_static::lazy_static;

use super::Searcher;
use crate::board::Board;
use crate::defs::*;
use crate::mv::{FastMove, MoveList};

pub const SCORE_TT_MOVE: i32 = 30_000;
pub const SCORE_QUEEN_PROMOTION: i32 = 20_000;
pub const SCORE_CAPTURE_BASE: i32 = 10_000;
pub const SCORE_OTHER_PROMOTION: i32 = 9_000;
pub const SCORE_KILLER_1: i32 = 8_000;
pub const SCORE_KILLER_2: i32 = 7_500;
pub const SCORE_HISTORY_MAX: i32 = 7_000;

/// Victim/attacker piece values for MVV-LVA. Indexed by piece type.
const MVV_LVA_VALUES: [i32; 7] = [0, 100, 300, 300, 500, 900, 10_000];

lazy_static! {
    /// `MVV_LVA[victim][attacker] = 10 * value(victim) - value(attacker)`.
    /// Held in i32: the king-victim row does not fit in i16.
    static ref MVV_LVA: [[i32; 7]; 7] = {
        let mut table = [[0; 7]; 7];
        for victim in 1..7 {
            for attacker in 1..7 {
                table[victim][attacker] = MVV_LVA_VALUES[victim] * 10 - MVV_LVA_VALUES[attacker];
            }
        }
        table
    };
}

impl Searcher {
    /// Ordering score for one move. Saturates into the i16 the move list
    /// sorts on.
    pub(crate) fn score_move(
        &self,
        board: &Board,
        m: &FastMove,
        tt_from: u8,
        tt_to: u8,
        ply: usize,
    ) -> i16 {
        if tt_from != SQ_NONE && m.from == tt_from && m.to == tt_to {
            return SCORE_TT_MOVE as i16;
        }

        let promo = m.promotion();
        let score = if promo != 0 {
            let mut score = if promo == PIECE_QUEEN {
                SCORE_QUEEN_PROMOTION
            } else {
                SCORE_OTHER_PROMOTION + promo as i32 * 10
            };
            if m.is_capture() {
                score += MVV_LVA[piece_type(m.captured) as usize][PIECE_PAWN as usize];
            }
            score
        } else if m.is_capture() {
            let attacker = piece_type(board.squares[m.from as usize]);
            SCORE_CAPTURE_BASE + MVV_LVA[piece_type(m.captured) as usize][attacker as usize]
        } else {
            match self.killer_slot(ply, m.from, m.to) {
                1 => SCORE_KILLER_1,
                2 => SCORE_KILLER_2,
                _ => {
                    let hist = self.history_score(m.from, m.to);
                    let mut score = if hist > 0 {
                        (hist / 10).min(SCORE_HISTORY_MAX)
                    } else {
                        0
                    };
                    if m.is_castle() {
                        score += 50;
                    }
                    score
                }
            }
        };

        score.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    pub(crate) fn score_moves(
        &self,
        board: &Board,
        moves: &mut MoveList,
        tt_from: u8,
        tt_to: u8,
        ply: usize,
    ) {
        for i in 0..moves.count {
            let m = moves.moves[i];
            moves.moves[i].score = self.score_move(board, &m, tt_from, tt_to, ply);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mv::{FLAG_CAPTURE, PROMO_SHIFT};

    #[test]
    fn test_mvv_lva_prefers_valuable_victims_and_cheap_attackers() {
        // Pawn takes queen beats queen takes pawn.
        assert!(MVV_LVA[PIECE_QUEEN as usize][PIECE_PAWN as usize]
            > MVV_LVA[PIECE_PAWN as usize][PIECE_QUEEN as usize]);
        // Same victim: cheaper attacker first.
        assert!(MVV_LVA[PIECE_ROOK as usize][PIECE_PAWN as usize]
            > MVV_LVA[PIECE_ROOK as usize][PIECE_QUEEN as usize]);
    }

    #[test]
    fn test_ordering_tiers() {
        let searcher = Searcher::new();
        let board = Board::from_fen("4k3/1P6/8/3q4/2P5/8/8/4K3 w - - 0 1").unwrap();

        let capture = FastMove::new(26, 35, FLAG_CAPTURE, board.squares[35]); // c4xd5
        let quiet = FastMove::new(26, 34, 0, 0); // c4c5
        let promo = FastMove::new(49, 57, PIECE_QUEEN << PROMO_SHIFT, 0); // b7b8q

        let capture_score = searcher.score_move(&board, &capture, SQ_NONE, SQ_NONE, 0);
        let quiet_score = searcher.score_move(&board, &quiet, SQ_NONE, SQ_NONE, 0);
        let promo_score = searcher.score_move(&board, &promo, SQ_NONE, SQ_NONE, 0);
        let tt_score = searcher.score_move(&board, &quiet, 26, 34, 0);

        assert!(tt_score as i32 == SCORE_TT_MOVE);
        assert!(promo_score > capture_score);
        assert!(capture_score > quiet_score);
        assert_eq!(quiet_score, 0);
    }

    #[test]
    fn test_killer_and_history_tiers() {
        let mut searcher = Searcher::new();
        let board = Board::new();

        searcher.store_killer(3, 12, 28);
        searcher.store_killer(3, 6, 21); // pushes the first into slot 2

        let killer1 = FastMove::new(6, 21, 0, 0);
        let killer2 = FastMove::new(12, 28, 0, 0);
        let plain = FastMove::new(1, 18, 0, 0);

        assert_eq!(
            searcher.score_move(&board, &killer1, SQ_NONE, SQ_NONE, 3) as i32,
            SCORE_KILLER_1
        );
        assert_eq!(
            searcher.score_move(&board, &killer2, SQ_NONE, SQ_NONE, 3) as i32,
            SCORE_KILLER_2
        );

        searcher.update_history(1, 18, 6);
        let hist_score = searcher.score_move(&board, &plain, SQ_NONE, SQ_NONE, 0) as i32;
        assert!(hist_score > 0 && hist_score <= SCORE_HISTORY_MAX);
    }

    #[test]
    fn test_king_victim_score_saturates() {
        let searcher = Searcher::new();
        // A pseudo-legal "capture the king" move must not overflow the i16
        // score; it only has to stay a big number.
        let board = Board::from_fen("4k3/8/8/8/8/8/3q4/4K3 b - - 0 1").unwrap();
        let capture_king = FastMove::new(11, 4, FLAG_CAPTURE, board.squares[4]);
        let score = searcher.score_move(&board, &capture_king, SQ_NONE, SQ_NONE, 0);
        assert_eq!(score, i16::MAX);
    }
}
