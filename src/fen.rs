//! FEN parsing and generation.
//!
//! Standard six-field format. Unspecified trailing fields take safe
//! defaults: no castling rights, no en-passant target, clocks 0/1.

use crate::board::Board;
use crate::defs::*;
use crate::error::{EngineError, EngineResult};
use crate::mv::{algebraic_to_square, square_to_algebraic};

impl Board {
    pub fn from_fen(fen: &str) -> EngineResult<Board> {
        let mut board = Board::empty();
        board.parse_fen(fen)?;
        Ok(board)
    }

    /// Replaces the current position with the one described by `fen`.
    /// On a parse error the board is reset to the starting position so the
    /// caller always observes a valid state.
    pub fn load_fen(&mut self, fen: &str) -> EngineResult<()> {
        let mut parsed = Board::empty();
        match parsed.parse_fen(fen) {
            Ok(()) => {
                *self = parsed;
                Ok(())
            }
            Err(e) => {
                *self = Board::new();
                Err(e)
            }
        }
    }

    fn parse_fen(&mut self, fen: &str) -> EngineResult<()> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.is_empty() {
            return Err(EngineError::InvalidFen);
        }

        // Field 1: piece placement, rank 8 first.
        let mut square: i32 = 56;
        for c in parts[0].chars() {
            match c {
                '/' => {
                    square -= 16;
                    continue;
                }
                '1'..='8' => {
                    square += c as i32 - '0' as i32;
                    continue;
                }
                _ => {}
            }

            let color = if c.is_ascii_uppercase() { COLOR_WHITE } else { COLOR_BLACK };
            let ptype = match c.to_ascii_lowercase() {
                'p' => PIECE_PAWN,
                'n' => PIECE_KNIGHT,
                'b' => PIECE_BISHOP,
                'r' => PIECE_ROOK,
                'q' => PIECE_QUEEN,
                'k' => PIECE_KING,
                _ => return Err(EngineError::InvalidFen),
            };
            if !(0..64).contains(&square) {
                return Err(EngineError::InvalidFen);
            }
            self.squares[square as usize] = make_piece(ptype, color);
            square += 1;
        }

        // Field 2: side to move.
        self.side = match parts.get(1) {
            Some(&"b") => Color::Black,
            Some(&"w") | None => Color::White,
            Some(_) => return Err(EngineError::InvalidFen),
        };

        // Field 3: castling rights.
        self.castling = [false; 4];
        if let Some(&castling) = parts.get(2) {
            if castling != "-" {
                for c in castling.chars() {
                    match c {
                        'K' => self.castling[0] = true,
                        'Q' => self.castling[1] = true,
                        'k' => self.castling[2] = true,
                        'q' => self.castling[3] = true,
                        _ => return Err(EngineError::InvalidFen),
                    }
                }
            }
        }

        // Field 4: en-passant target.
        self.ep_target = SQ_NONE;
        if let Some(&ep) = parts.get(3) {
            if ep != "-" {
                self.ep_target = algebraic_to_square(ep).ok_or(EngineError::InvalidFen)?;
            }
        }

        // Fields 5 and 6: clocks.
        self.halfmove_clock = match parts.get(4) {
            Some(s) => s.parse().map_err(|_| EngineError::InvalidFen)?,
            None => 0,
        };
        self.fullmove_number = match parts.get(5) {
            Some(s) => s.parse().map_err(|_| EngineError::InvalidFen)?,
            None => 1,
        };

        self.rebuild_derived_state();

        // Exactly one king per side is a hard requirement for the caches.
        if self.king_square(Color::White) == SQ_NONE
            || self.king_square(Color::Black) == SQ_NONE
        {
            return Err(EngineError::InvalidFen);
        }
        let kings = self
            .squares
            .iter()
            .filter(|&&p| piece_type(p) == PIECE_KING)
            .count();
        if kings != 2 {
            return Err(EngineError::InvalidFen);
        }

        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);

        for rank in (0..8).rev() {
            let mut empty_run = 0;
            for file in 0..8 {
                let piece = self.squares[rank * 8 + file];
                if is_empty(piece) {
                    empty_run += 1;
                    continue;
                }
                if empty_run > 0 {
                    fen.push((b'0' + empty_run) as char);
                    empty_run = 0;
                }
                let mut c = match piece_type(piece) {
                    PIECE_PAWN => 'p',
                    PIECE_KNIGHT => 'n',
                    PIECE_BISHOP => 'b',
                    PIECE_ROOK => 'r',
                    PIECE_QUEEN => 'q',
                    _ => 'k',
                };
                if is_white(piece) {
                    c = c.to_ascii_uppercase();
                }
                fen.push(c);
            }
            if empty_run > 0 {
                fen.push((b'0' + empty_run) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side == Color::White { 'w' } else { 'b' });
        fen.push(' ');

        if self.castling.iter().any(|&r| r) {
            for (right, c) in self.castling.iter().zip(['K', 'Q', 'k', 'q']) {
                if *right {
                    fen.push(c);
                }
            }
        } else {
            fen.push('-');
        }

        fen.push(' ');
        if self.ep_target == SQ_NONE {
            fen.push('-');
        } else {
            fen.push_str(&square_to_algebraic(self.ep_target));
        }

        fen.push(' ');
        fen.push_str(&self.halfmove_clock.to_string());
        fen.push(' ');
        fen.push_str(&self.fullmove_number.to_string());

        fen
    }
}
