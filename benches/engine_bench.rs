//! Criterion benchmarks for the hot paths: move generation, make/unmake,
//! perft and a shallow search.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vesper_engine::movegen::generate_pseudo_legal;
use vesper_engine::mv::MoveList;
use vesper_engine::perft::perft;
use vesper_engine::{Board, Evaluator, Searcher};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_movegen(c: &mut Criterion) {
    let board = Board::from_fen(KIWIPETE).unwrap();
    c.bench_function("movegen_kiwipete", |b| {
        b.iter(|| {
            let mut moves = MoveList::new();
            generate_pseudo_legal(black_box(&board), &mut moves);
            black_box(moves.count)
        })
    });
}

fn bench_make_unmake(c: &mut Criterion) {
    let mut board = Board::from_fen(KIWIPETE).unwrap();
    let mut moves = MoveList::new();
    generate_pseudo_legal(&board, &mut moves);
    let undo = board.snapshot();

    c.bench_function("make_unmake_all_moves", |b| {
        b.iter(|| {
            for i in 0..moves.count {
                let m = moves.moves[i];
                board.make_move_fast(&m);
                board.unmake_move_fast(&m, &undo);
            }
            black_box(board.hash())
        })
    });
}

fn bench_perft_3(c: &mut Criterion) {
    c.bench_function("perft_3_startpos", |b| {
        b.iter(|| {
            let mut board = Board::new();
            black_box(perft(&mut board, 3))
        })
    });
}

fn bench_search_depth_3(c: &mut Criterion) {
    c.bench_function("search_depth_3_kiwipete", |b| {
        b.iter(|| {
            let mut board = Board::from_fen(KIWIPETE).unwrap();
            let mut searcher = Searcher::new();
            let mut eval = Evaluator::new();
            black_box(searcher.best_move(&mut board, &mut eval, 3))
        })
    });
}

fn bench_evaluate_material(c: &mut Criterion) {
    let board = Board::from_fen(KIWIPETE).unwrap();
    let eval = Evaluator::new();
    c.bench_function("evaluate_material_kiwipete", |b| {
        b.iter(|| black_box(eval.evaluate_material(black_box(&board))))
    });
}

criterion_group!(
    benches,
    bench_movegen,
    bench_make_unmake,
    bench_perft_3,
    bench_search_depth_3,
    bench_evaluate_material,
);
criterion_main!(benches);
