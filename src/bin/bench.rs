//! Perft and search smoke harness.
//!
//! Runs the canonical perft suite against known node counts, then a fixed
//! set of tactical positions through the iterative-deepening search and
//! verifies the chosen move is legal.

use std::time::Instant;

use anyhow::{anyhow, Result};
use vesper_engine::perft::perft;
use vesper_engine::{Board, Evaluator, Searcher};

const PERFT_SUITE: &[(&str, &str, u32, u64)] = &[
    ("STARTPOS d1", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 1, 20),
    ("STARTPOS d2", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 2, 400),
    ("STARTPOS d3", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 3, 8_902),
    ("STARTPOS d4", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 4, 197_281),
    ("STARTPOS d5", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 5, 4_865_609),
    ("KIWIPETE d3", "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", 3, 97_862),
];

const SEARCH_SUITE: &[(&str, &str, i32)] = &[
    ("BACK_RANK_MATE", "6k1/5ppp/8/8/8/8/8/R6K w - - 0 1", 3),
    ("TACTICAL_FORK", "r3k2r/ppp2ppp/2n5/3p4/2B1P3/2N5/PPP2PPP/R3K2R w KQkq - 0 1", 4),
    ("ENDGAME_PAWN", "8/8/8/8/8/3k4/7p/3K4 w - - 0 1", 4),
    ("UNDERPROMO", "k7/P7/8/8/8/8/8/K7 w - - 0 1", 4),
];

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Perft suite ===");
    for &(name, fen, depth, expected) in PERFT_SUITE {
        let mut board = Board::from_fen(fen).map_err(|e| anyhow!("{}: {}", name, e))?;
        let start = Instant::now();
        let nodes = perft(&mut board, depth);
        let elapsed = start.elapsed();
        let status = if nodes == expected { "ok" } else { "MISMATCH" };
        println!(
            "{:<14} depth {}  nodes {:>9}  expected {:>9}  {:>8.1?}  {}",
            name, depth, nodes, expected, elapsed, status
        );
        if nodes != expected {
            return Err(anyhow!("{}: perft mismatch {} != {}", name, nodes, expected));
        }
    }

    println!("\n=== Search suite ===");
    let mut searcher = Searcher::new();
    let mut eval = Evaluator::new();
    for &(name, fen, depth) in SEARCH_SUITE {
        let mut board = Board::from_fen(fen).map_err(|e| anyhow!("{}: {}", name, e))?;
        let start = Instant::now();
        let result = searcher
            .iterative_deepening(&mut board, &mut eval, depth)
            .ok_or_else(|| anyhow!("{}: no move found", name))?;
        let elapsed = start.elapsed();

        let legal = board.legal_moves();
        let is_legal = legal
            .as_slice()
            .iter()
            .any(|m| m.from == result.from && m.to == result.to);
        if !is_legal {
            return Err(anyhow!(
                "{}: engine produced illegal move {} -> {}",
                name,
                result.from,
                result.to
            ));
        }

        println!(
            "{:<16} depth {}  score {:>7}  nodes {:>8}  {:>8.1?}",
            name, result.depth, result.score, searcher.nodes, elapsed
        );
    }

    println!("\nAll checks passed.");
    Ok(())
}
