use std::sync::atomic::AtomicBool;

pub mod board;
pub mod chessmove;
pub mod fen;
pub mod magic;
pub mod piece;
pub mod piecelayout;
pub mod squareset;
pub mod types;

/// Whether castle moves are spoken in the Chess960 dialect (king-takes-rook
/// squares) on the UCI boundary. Board-internal encoding is always
/// king-takes-rook.
pub static CHESS960: AtomicBool = AtomicBool::new(false);
