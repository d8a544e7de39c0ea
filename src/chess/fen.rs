use std::{num::NonZeroUsize, str::SplitWhitespace};

use arrayvec::ArrayVec;

use crate::{
    chess::{
        piece::{Colour, Piece, PieceType},
        piecelayout::PieceLayout,
        squareset::SquareSet,
        types::{CastlingRights, File, Rank, Square},
    },
    errors::FenParseError,
};

/// A parsed FEN representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    pub board: PieceLayout,
    pub turn: Colour,
    pub castling: CastlingRights,
    pub ep: Option<Square>,
    pub halfmove: u8,
    pub fullmove: NonZeroUsize,
}

impl Fen {
    const DEFAULT_FULL_MOVE: NonZeroUsize = NonZeroUsize::new(1).unwrap();

    /// Parse a FEN string in strict mode.
    /// All 6 fields must be present, and no extra tokens are allowed.
    pub fn parse(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();
        let result = Self::parse_inner(&mut tokens, true)?;
        // In strict mode, no extra tokens allowed.
        if tokens.next().is_some() {
            return Err(FenParseError::ExtraTokens);
        }
        Ok(result)
    }

    /// Parse a FEN string in relaxed mode.
    /// Missing fields after the board are defaulted to: w, -, -, 0, 1
    /// Extra tokens after the fullmove counter are permitted but ignored.
    pub fn parse_relaxed(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();
        Self::parse_inner(&mut tokens, false)
    }

    fn parse_inner(tokens: &mut SplitWhitespace<'_>, strict: bool) -> Result<Self, FenParseError> {
        // Field #1: Piece placement
        let board_str = tokens.next().ok_or(FenParseError::MissingBoard)?;
        let board = Self::parse_board(board_str)?;

        // Field #2: Active colour
        let turn = match tokens.next() {
            Some(s) if strict => Self::parse_turn(s)?,
            Some(s) => Self::parse_turn(s).unwrap_or(Colour::White),
            None if strict => return Err(FenParseError::MissingSide),
            None => Colour::White,
        };

        // Field #3: Castling availability
        let castling = match tokens.next() {
            Some(s) if strict => Self::parse_castling(s, &board)?,
            Some(s) => Self::parse_castling(s, &board).unwrap_or_default(),
            None if strict => return Err(FenParseError::MissingCastling),
            None => CastlingRights::default(),
        };

        // Field #4: En passant target square
        let ep = match tokens.next() {
            Some(s) if strict => Self::parse_ep(s, turn)?,
            Some(s) => Self::parse_ep(s, turn).unwrap_or(None),
            None if strict => return Err(FenParseError::MissingEnPassant),
            None => None,
        };

        // Field #5: Halfmove clock
        let halfmove = match tokens.next() {
            Some(s) if strict => Self::parse_halfmove(s)?,
            Some(s) => Self::parse_halfmove(s).unwrap_or(0),
            None if strict => return Err(FenParseError::MissingHalfmoveClock),
            None => 0,
        };

        // Field #6: Fullmove number
        let fullmove = match tokens.next() {
            Some(s) if strict => Self::parse_fullmove(s)?,
            Some(s) => Self::parse_fullmove(s).unwrap_or(Self::DEFAULT_FULL_MOVE),
            None if strict => return Err(FenParseError::MissingFullmoveNumber),
            None => Self::DEFAULT_FULL_MOVE,
        };

        Ok(Self {
            board,
            turn,
            castling,
            ep,
            halfmove,
            fullmove,
        })
    }

    fn parse_board(board_str: &str) -> Result<PieceLayout, FenParseError> {
        let mut layout = PieceLayout::default();
        let mut rank = Rank::Eight;

        let mut ranks = ArrayVec::<&str, 8>::new();

        let mut board_parts = board_str.split('/');

        while let Some(segment) = board_parts.next() {
            if ranks.try_push(segment).is_err() {
                // 8 successfully parsed, plus one now, plus the rest.
                return Err(FenParseError::BoardSegments(8 + 1 + board_parts.count()));
            }
        }

        if ranks.len() != 8 {
            return Err(FenParseError::BoardSegments(ranks.len()));
        }

        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let mut file = File::A;
            let mut squares_in_rank = 0u8;
            let mut prev_was_digit = false;

            for c in rank_str.chars() {
                match c {
                    '1'..='8' => {
                        if prev_was_digit {
                            return Err(FenParseError::AdjacentDigits);
                        }
                        prev_was_digit = true;
                        let count = c as u8 - b'0';
                        squares_in_rank += count;
                        if squares_in_rank > 8 {
                            return Err(FenParseError::BadSquaresInSegment);
                        }
                        file = File::from_index(file.index() as u8 + count).unwrap_or(File::A);
                    }
                    'P' | 'R' | 'N' | 'B' | 'Q' | 'K' | 'p' | 'r' | 'n' | 'b' | 'q' | 'k' => {
                        prev_was_digit = false;
                        squares_in_rank += 1;
                        if squares_in_rank > 8 {
                            return Err(FenParseError::BadSquaresInSegment);
                        }
                        let piece =
                            Piece::from_char(c).expect("the match arm guarantees a piece char");
                        let sq = Square::from_rank_file(rank, file);
                        layout.set_piece_at(sq, piece);
                        file = File::from_index(file.index() as u8 + 1).unwrap_or(File::A);
                    }
                    _ => return Err(FenParseError::UnexpectedCharacter(c)),
                }
            }

            if squares_in_rank != 8 {
                return Err(FenParseError::BadSquaresInSegment);
            }

            // Move to next rank (going from 8 down to 1)
            if rank_idx < 7 {
                rank = Rank::from_index(rank.index() as u8 - 1)
                    .ok_or(FenParseError::BadSquaresInSegment)?;
            }
        }

        // general correctness validation - misses a lot, but does some nice things.

        // pawns are on sensible squares
        if (layout.pieces[PieceType::Pawn] & SquareSet::BACK_RANKS).non_empty() {
            return Err(FenParseError::PawnsOnBackranks);
        }

        // check king counts
        for colour in Colour::all() {
            match (layout.pieces[PieceType::King] & layout.colours[colour]).count() {
                0 => return Err(FenParseError::MissingKing { colour }),
                2.. => return Err(FenParseError::DuplicateKings { colour }),
                1 => (),
            }
        }

        Ok(layout)
    }

    fn parse_turn(s: &str) -> Result<Colour, FenParseError> {
        match s {
            "w" => Ok(Colour::White),
            "b" => Ok(Colour::Black),
            _ => Err(FenParseError::InvalidSide(s.to_string())),
        }
    }

    fn parse_castling(s: &str, board: &PieceLayout) -> Result<CastlingRights, FenParseError> {
        if s == "-" {
            return Ok(CastlingRights::default());
        }

        let mut rights = CastlingRights::default();

        let kings = board.pieces[PieceType::King];
        let white_king_sq = (kings & board.colours[Colour::White]).first().unwrap();
        let black_king_sq = (kings & board.colours[Colour::Black]).first().unwrap();

        for c in s.chars() {
            match c {
                // Standard notation: the rights refer to the outermost rooks.
                'K' => {
                    let file = Self::outermost_rook(board, Colour::White, white_king_sq, true)
                        .ok_or_else(|| FenParseError::InvalidCastling(s.to_string()))?;
                    rights.set_kingside(Colour::White, file);
                }
                'Q' => {
                    let file = Self::outermost_rook(board, Colour::White, white_king_sq, false)
                        .ok_or_else(|| FenParseError::InvalidCastling(s.to_string()))?;
                    rights.set_queenside(Colour::White, file);
                }
                'k' => {
                    let file = Self::outermost_rook(board, Colour::Black, black_king_sq, true)
                        .ok_or_else(|| FenParseError::InvalidCastling(s.to_string()))?;
                    rights.set_kingside(Colour::Black, file);
                }
                'q' => {
                    let file = Self::outermost_rook(board, Colour::Black, black_king_sq, false)
                        .ok_or_else(|| FenParseError::InvalidCastling(s.to_string()))?;
                    rights.set_queenside(Colour::Black, file);
                }
                // X-FEN / Shredder-FEN: uppercase file letter for white
                'A'..='H' => {
                    let file = File::from_index(c as u8 - b'A')
                        .ok_or_else(|| FenParseError::InvalidCastling(s.to_string()))?;
                    Self::add_shredder_right(
                        &mut rights,
                        Colour::White,
                        white_king_sq,
                        file,
                        s,
                    )?;
                }
                // X-FEN / Shredder-FEN: lowercase file letter for black
                'a'..='h' => {
                    let file = File::from_index(c as u8 - b'a')
                        .ok_or_else(|| FenParseError::InvalidCastling(s.to_string()))?;
                    Self::add_shredder_right(
                        &mut rights,
                        Colour::Black,
                        black_king_sq,
                        file,
                        s,
                    )?;
                }
                _ => return Err(FenParseError::InvalidCastling(s.to_string())),
            }
        }

        Ok(rights)
    }

    /// The file of the rook that a conventional K/Q/k/q letter refers to:
    /// the rook furthest from the king on the given wing.
    fn outermost_rook(
        board: &PieceLayout,
        colour: Colour,
        king_sq: Square,
        kingside: bool,
    ) -> Option<File> {
        let (home_rank, home_rank_idx) = match colour {
            Colour::White => (SquareSet::RANK_1, Rank::One),
            Colour::Black => (SquareSet::RANK_8, Rank::Eight),
        };
        if king_sq.rank() != home_rank_idx {
            return None;
        }
        let rooks = board.pieces[PieceType::Rook] & board.colours[colour] & home_rank;
        let candidates = rooks
            .iter()
            .filter(|sq| (sq.file() > king_sq.file()) == kingside && sq.file() != king_sq.file());
        if kingside {
            candidates.last().map(|sq| sq.file())
        } else {
            let mut candidates = candidates;
            candidates.next().map(|sq| sq.file())
        }
    }

    fn add_shredder_right(
        rights: &mut CastlingRights,
        colour: Colour,
        king_sq: Square,
        file: File,
        castling: &str,
    ) -> Result<(), FenParseError> {
        let (colour_name, home_rank) = match colour {
            Colour::White => ("white", Rank::One),
            Colour::Black => ("black", Rank::Eight),
        };
        if king_sq.rank() != home_rank {
            return Err(FenParseError::KingNotOnBackRank {
                colour: colour_name,
                castling: castling.to_string(),
            });
        }
        let king_file = king_sq.file();
        if file == king_file {
            return Err(FenParseError::KingOnCastlingFile {
                colour: colour_name,
                file: format!("{king_file:?}"),
                castling: castling.to_string(),
            });
        }
        if file > king_file {
            rights.set_kingside(colour, file);
        } else {
            rights.set_queenside(colour, file);
        }
        Ok(())
    }

    fn parse_ep(s: &str, turn: Colour) -> Result<Option<Square>, FenParseError> {
        if s == "-" {
            return Ok(None);
        }

        if s.len() != 2 {
            return Err(FenParseError::InvalidEnPassant(s.to_string()));
        }

        let mut chars = s.chars();
        let file_char = chars.next().unwrap();
        let rank_char = chars.next().unwrap();

        // File must be lowercase a-h
        if !file_char.is_ascii_lowercase() {
            return Err(FenParseError::InvalidEnPassant(s.to_string()));
        }

        let file = File::from_index(file_char as u8 - b'a')
            .ok_or_else(|| FenParseError::InvalidEnPassant(s.to_string()))?;

        let rank = Rank::from_index(rank_char.to_digit(10).map_or(255, |d| d as u8).wrapping_sub(1))
            .ok_or_else(|| FenParseError::InvalidEnPassant(s.to_string()))?;

        // Validate rank based on side to move:
        // If white to move, ep square must be on rank 6 (black pawn just moved)
        // If black to move, ep square must be on rank 3 (white pawn just moved)
        let expected_rank = match turn {
            Colour::White => Rank::Six,
            Colour::Black => Rank::Three,
        };

        if rank != expected_rank {
            return Err(FenParseError::InvalidEnPassantRank {
                square: s.to_string(),
                expected: expected_rank,
                got: rank,
            });
        }

        Ok(Some(Square::from_rank_file(rank, file)))
    }

    fn parse_halfmove(s: &str) -> Result<u8, FenParseError> {
        let value: u8 = s
            .parse()
            .map_err(|_| FenParseError::InvalidHalfmoveClock(s.to_string()))?;

        if value > 100 {
            return Err(FenParseError::HalfmoveClockTooLarge(value));
        }

        Ok(value)
    }

    fn parse_fullmove(s: &str) -> Result<NonZeroUsize, FenParseError> {
        let value: usize = s
            .parse()
            .map_err(|_| FenParseError::InvalidFullmoveNumber(s.to_string()))?;

        NonZeroUsize::new(value).ok_or(FenParseError::FullmoveNumberZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn parse_startpos() {
        let fen = Fen::parse(STARTPOS).unwrap();
        assert_eq!(fen.turn, Colour::White);
        assert_eq!(fen.halfmove, 0);
        assert_eq!(fen.fullmove.get(), 1);
        assert!(fen.ep.is_none());
        assert_eq!(fen.castling.kingside(Colour::White), Some(File::H));
        assert_eq!(fen.castling.queenside(Colour::White), Some(File::A));
        assert_eq!(fen.castling.kingside(Colour::Black), Some(File::H));
        assert_eq!(fen.castling.queenside(Colour::Black), Some(File::A));
    }

    #[test]
    fn parse_relaxed_board_only() {
        let fen = Fen::parse_relaxed("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR").unwrap();
        assert_eq!(fen.turn, Colour::White);
        assert_eq!(fen.halfmove, 0);
        assert_eq!(fen.fullmove.get(), 1);
    }

    #[test]
    fn parse_bad_segments() {
        let err = Fen::parse_relaxed("rnbqkbnr/pppppppp/8/8/8/8").unwrap_err();
        assert_eq!(err, FenParseError::BoardSegments(6));
        let err =
            Fen::parse_relaxed("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR/PPPPPPPP/RNBQKBNR")
                .unwrap_err();
        assert_eq!(err, FenParseError::BoardSegments(10));
    }

    #[test]
    fn reject_adjacent_digits() {
        let result = Fen::parse("rnbqkbnr/pppppppp/44/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert!(matches!(result, Err(FenParseError::AdjacentDigits)));
    }

    #[test]
    fn reject_uppercase_side() {
        let result = Fen::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR W KQkq - 0 1");
        assert!(matches!(result, Err(FenParseError::InvalidSide(_))));
    }

    #[test]
    fn reject_missing_king() {
        let result = Fen::parse("rnbq1bnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1");
        assert!(matches!(
            result,
            Err(FenParseError::MissingKing { colour: Colour::Black })
        ));
    }

    #[test]
    fn reject_pawns_on_backrank() {
        let result = Fen::parse("rnbqkbnP/ppppppp1/8/8/8/8/PPPPPPP1/RNBQKBNR w - - 0 1");
        assert!(matches!(result, Err(FenParseError::PawnsOnBackranks)));
    }

    #[test]
    fn reject_invalid_ep_rank() {
        // e4 is not a valid ep square (should be e3 or e6)
        let result = Fen::parse("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e4 0 1");
        assert!(matches!(
            result,
            Err(FenParseError::InvalidEnPassantRank { .. })
        ));
    }

    #[test]
    fn accept_valid_ep_square() {
        let fen =
            Fen::parse("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
        assert_eq!(fen.ep, Some(Square::E3));
    }

    #[test]
    fn reject_halfmove_over_100() {
        let result = Fen::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 101 1");
        assert!(matches!(
            result,
            Err(FenParseError::HalfmoveClockTooLarge(101))
        ));
    }

    #[test]
    fn reject_fullmove_zero() {
        let result = Fen::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0");
        assert!(matches!(result, Err(FenParseError::FullmoveNumberZero)));
    }

    #[test]
    fn reject_extra_tokens_strict() {
        let result = Fen::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 extra");
        assert!(matches!(result, Err(FenParseError::ExtraTokens)));
    }

    #[test]
    fn parse_shredder_castling() {
        let fen = Fen::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w HAha - 0 1").unwrap();
        assert_eq!(fen.castling.kingside(Colour::White), Some(File::H));
        assert_eq!(fen.castling.queenside(Colour::White), Some(File::A));
        assert_eq!(fen.castling.kingside(Colour::Black), Some(File::H));
        assert_eq!(fen.castling.queenside(Colour::Black), Some(File::A));
    }
}
