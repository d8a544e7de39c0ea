use thiserror::Error;

use crate::chess::piece::Colour;
use crate::chess::types::Rank;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenParseError {
    #[error("FEN string is missing board part")]
    MissingBoard,
    #[error("board part of FEN has {0} segments, expected 8")]
    BoardSegments(usize),
    #[error("wrong number of squares in board segment")]
    BadSquaresInSegment,
    #[error("adjacent digits in board segment are not allowed")]
    AdjacentDigits,
    #[error("unexpected character in piece placement: '{0}'")]
    UnexpectedCharacter(char),
    #[error("expected side to be 'w' or 'b', got \"{0}\"")]
    InvalidSide(String),
    #[error("expected side part")]
    MissingSide,
    #[error("expected castling part")]
    MissingCastling,
    #[error("invalid castling format: \"{0}\"")]
    InvalidCastling(String),
    #[error("{} king is missing", if *colour == Colour::White { "white" } else { "black" })]
    MissingKing { colour: Colour },
    #[error("more than one {} king", if *colour == Colour::White { "white" } else { "black" })]
    DuplicateKings { colour: Colour },
    #[error("pawns present on backranks")]
    PawnsOnBackranks,
    #[error("{colour} king is not on the back rank, but castling rights \"{castling}\" imply present castling rights")]
    KingNotOnBackRank {
        colour: &'static str,
        castling: String,
    },
    #[error("{colour} king is on file {file}, but got castling rights on that file: \"{castling}\"")]
    KingOnCastlingFile {
        colour: &'static str,
        file: String,
        castling: String,
    },
    #[error("expected en passant part")]
    MissingEnPassant,
    #[error("invalid en passant square: \"{0}\"")]
    InvalidEnPassant(String),
    #[error("invalid en passant rank for square \"{square}\": expected {expected:?}, got {got:?}")]
    InvalidEnPassantRank {
        square: String,
        expected: Rank,
        got: Rank,
    },
    #[error("expected halfmove clock part")]
    MissingHalfmoveClock,
    #[error("invalid halfmove clock: \"{0}\"")]
    InvalidHalfmoveClock(String),
    #[error("halfmove clock {0} exceeds maximum of 100")]
    HalfmoveClockTooLarge(u8),
    #[error("expected fullmove number part")]
    MissingFullmoveNumber,
    #[error("invalid fullmove number: \"{0}\"")]
    InvalidFullmoveNumber(String),
    #[error("fullmove number must be at least 1")]
    FullmoveNumberZero,
    #[error("unexpected extra tokens after fullmove number")]
    ExtraTokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("invalid move length {0}")]
    InvalidLength(usize),
    #[error("invalid from-square file {0}")]
    InvalidFromSquareFile(char),
    #[error("invalid from-square rank {0}")]
    InvalidFromSquareRank(char),
    #[error("invalid to-square file {0}")]
    InvalidToSquareFile(char),
    #[error("invalid to-square rank {0}")]
    InvalidToSquareRank(char),
    #[error("invalid promotion piece {0}")]
    InvalidPromotionPiece(char),
    #[error("illegal move {0}")]
    IllegalMove(String),
}

/// A failed position invariant, identified by the step at which the
/// consistency walk gave up, plus a human-readable account.
/// Produced by debug builds only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("position invariant {step} violated: {message}")]
pub struct PositionValidityError {
    pub step: u32,
    pub message: String,
}
