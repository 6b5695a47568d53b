//! Position evaluation: material fallback and the network path.
//!
//! Scores are centipawns from the requested perspective. The search always
//! asks from White's point of view and handles the sign itself.

use crate::board::Board;
use crate::defs::*;
use crate::error::{EngineError, EngineResult};
use crate::nn::features::{self, TOTAL_INPUTS};
use crate::nn::{Activation, Network};

pub const PAWN_VALUE: i32 = 100;
pub const KNIGHT_VALUE: i32 = 320;
pub const BISHOP_VALUE: i32 = 330;
pub const ROOK_VALUE: i32 = 500;
pub const QUEEN_VALUE: i32 = 900;

/// Material value per piece type. The king is worth nothing here because
/// mate and stalemate are terminal scores in the search.
#[inline]
pub fn material_value(ptype: u8) -> i32 {
    match ptype {
        PIECE_PAWN => PAWN_VALUE,
        PIECE_KNIGHT => KNIGHT_VALUE,
        PIECE_BISHOP => BISHOP_VALUE,
        PIECE_ROOK => ROOK_VALUE,
        PIECE_QUEEN => QUEEN_VALUE,
        _ => 0,
    }
}

/// Maps the net's [0, 1] output onto a symmetric centipawn range. The raw
/// output would truncate to 0 or 1; this keeps the search contract of
/// scores symmetric around zero.
const NET_SCALE: f32 = 2000.0;

/// Sigmoid scale for training targets: a 600cp edge maps to ~0.73.
const TARGET_SCALE: f32 = 600.0;

pub struct Evaluator {
    pub net: Network,
    /// When false the material evaluation is used even if a net is loaded.
    pub use_net: bool,
    features: [f32; TOTAL_INPUTS],
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            net: Network::new(),
            use_net: false,
            features: [0.0; TOTAL_INPUTS],
        }
    }

    /// Initializes the network and switches evaluation over to it. The
    /// input layer is forced to the extractor width.
    pub fn initialize_net(&mut self, layer_sizes: &[usize], activation: Activation) -> EngineResult<()> {
        let mut sizes = layer_sizes.to_vec();
        if let Some(first) = sizes.first_mut() {
            if *first != TOTAL_INPUTS {
                log::warn!(
                    "input layer size {} adjusted to feature width {}",
                    first,
                    TOTAL_INPUTS
                );
                *first = TOTAL_INPUTS;
            }
        }
        self.net.initialize(&sizes, activation)?;
        self.use_net = true;
        Ok(())
    }

    /// Score from `perspective`. Uses the network when enabled and
    /// initialized, the material count otherwise.
    pub fn evaluate(&mut self, board: &Board, perspective: Color) -> i32 {
        if self.use_net && self.net.is_initialized() {
            features::extract_into(board, perspective, &mut self.features);
            let out = self.net.forward(&self.features);
            ((out - 0.5) * NET_SCALE).round() as i32
        } else {
            let material = self.evaluate_material(board);
            match perspective {
                Color::White => material,
                Color::Black => -material,
            }
        }
    }

    /// White material minus black material, in centipawns.
    pub fn evaluate_material(&self, board: &Board) -> i32 {
        let mut score = 0;
        for &sq in board.piece_list(Color::White) {
            score += material_value(piece_type(board.squares[sq as usize]));
        }
        for &sq in board.piece_list(Color::Black) {
            score -= material_value(piece_type(board.squares[sq as usize]));
        }
        score
    }

    /// Training target for a centipawn score from the training color's
    /// perspective: a clamped sigmoid so extremes never saturate the MSE
    /// gradient completely.
    pub fn score_to_target(&self, score: i32) -> f32 {
        let target = 1.0 / (1.0 + (-(score as f32) / TARGET_SCALE).exp());
        target.clamp(0.01, 0.99)
    }

    pub fn train_one(&mut self, input: &[f32], target: f32, learning_rate: f32) -> EngineResult<f32> {
        self.net.train_one(input, target, learning_rate)
    }

    /// Mean loss over a batch of feature vectors.
    pub fn train_batch(
        &mut self,
        positions: &[Vec<f32>],
        targets: &[f32],
        learning_rate: f32,
    ) -> EngineResult<f32> {
        if positions.len() != targets.len() {
            return Err(EngineError::FeatureSizeMismatch {
                expected: positions.len(),
                got: targets.len(),
            });
        }
        if positions.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for (input, &target) in positions.iter().zip(targets) {
            total += self.net.train_one(input, target, learning_rate)?;
        }
        Ok(total / positions.len() as f32)
    }

    /// One self-supervised step: train toward the material evaluation of
    /// the current position, seen from `color`.
    pub fn train_on_position(&mut self, board: &Board, color: Color, learning_rate: f32) -> EngineResult<f32> {
        if !self.net.is_initialized() {
            return Err(EngineError::NetNotInitialized);
        }
        features::extract_into(board, color, &mut self.features);
        let mut material = self.evaluate_material(board);
        if color == Color::Black {
            material = -material;
        }
        let target = self.score_to_target(material);
        self.net.train_one(&self.features, target, learning_rate)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}
