//! The position core of a UCI chess engine: bitboard move machinery,
//! incremental Zobrist hashing, make/unmake with full snapshot restore, a
//! material classifier with a direct-mapped cache, an endgame function
//! registry keyed by material signature, and a racily-shared transposition
//! table.
//!
//! The search, the UCI protocol loop, and time management live elsewhere and
//! drive this crate through [`chess::board::Board`],
//! [`material::MaterialInfoTable`], and
//! [`transpositiontable::TranspositionTable`].

#![allow(clippy::inline_always, clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod bitbases;
pub mod chess;
pub mod endgame;
pub mod errors;
pub mod lookups;
pub mod material;
pub mod piecesquaretable;
pub mod rng;
pub mod transpositiontable;
