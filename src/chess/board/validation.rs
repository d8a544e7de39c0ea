use crate::{
    chess::{
        board::Board,
        piece::{Colour, Piece, PieceType},
        squareset::SquareSet,
        types::{Rank, Square},
    },
    errors::PositionValidityError,
};

impl Board {
    /// Walks every redundant view of the position and reports the first
    /// disagreement, tagged with the step at which it was found. Debug
    /// builds call this before and after every `make_move`.
    #[allow(clippy::too_many_lines)]
    pub fn check_validity(&self) -> Result<(), PositionValidityError> {
        let fail = |step: u32, message: String| Err(PositionValidityError { step, message });

        let bbs = &self.state.bbs;

        // 1: per-type totals match the piece lists.
        for piece in Piece::all() {
            let bb_count = bbs.piece_bb(piece).count();
            let list_count = u32::from(self.state.lists.count(piece));
            if bb_count != list_count {
                return fail(
                    1,
                    format!("{piece:?}: squareset has {bb_count} pieces, list has {list_count}"),
                );
            }
        }

        // 2: the occupancy unions agree.
        let by_colour = bbs.colours[Colour::White] | bbs.colours[Colour::Black];
        let mut by_type = SquareSet::EMPTY;
        for pt in PieceType::all() {
            by_type |= bbs.pieces[pt];
        }
        if by_colour != by_type {
            return fail(
                2,
                format!("colour union {by_colour:?} != type union {by_type:?}"),
            );
        }

        // 3: the colours are disjoint.
        if (bbs.colours[Colour::White] & bbs.colours[Colour::Black]).non_empty() {
            return fail(3, "colour squaresets overlap".to_string());
        }

        // 4: mailbox, squaresets, and list back-pointers agree per square.
        for sq in Square::all() {
            let piece = self.state.mailbox[sq];
            if bbs.piece_at(sq) != piece {
                return fail(
                    4,
                    format!("square {sq}: mailbox has {piece:?}, squaresets disagree"),
                );
            }
            if let Some(piece) = piece {
                let slot = self.state.lists.slot_of(sq) as usize;
                let listed = self.state.lists.squares(piece).get(slot).copied();
                if listed != Some(sq) {
                    return fail(
                        4,
                        format!("square {sq}: list slot {slot} holds {listed:?}"),
                    );
                }
            }
        }

        // 5: exactly one king per side.
        for colour in Colour::all() {
            let kings = bbs.all_kings() & bbs.colours[colour];
            if !kings.one() {
                return fail(5, format!("{colour} has {} kings", kings.count()));
            }
        }

        // 6: no pawns on the back ranks.
        if (bbs.all_pawns() & SquareSet::BACK_RANKS).non_empty() {
            return fail(6, "pawns on a back rank".to_string());
        }

        // 7: the incremental keys equal a from-scratch recomputation.
        let fresh = self.generate_pos_keys();
        if fresh != self.state.keys {
            return fail(
                7,
                format!("keys drifted: incremental {:?}, fresh {fresh:?}", self.state.keys),
            );
        }

        // 8: checkers are exactly the attackers of the king to move.
        let king = bbs.king_sq(self.turn());
        let expected =
            bbs.all_attackers_to_sq(king, bbs.occupied()) & bbs.occupied_co(!self.turn());
        if expected != self.state.checkers {
            return fail(
                8,
                format!("checkers {:?} != attackers {expected:?}", self.state.checkers),
            );
        }

        // 9: castling rights only with king and rook on their home squares.
        for colour in Colour::all() {
            let home_rank = match colour {
                Colour::White => Rank::One,
                Colour::Black => Rank::Eight,
            };
            let rights = self.state.castle_perm;
            if (rights.kingside(colour).is_some() || rights.queenside(colour).is_some())
                && bbs.king_sq(colour).rank() != home_rank
            {
                return fail(9, format!("{colour} has castling rights with king off rank"));
            }
            for file in [rights.kingside(colour), rights.queenside(colour)]
                .into_iter()
                .flatten()
            {
                let rook_sq = Square::from_rank_file(home_rank, file);
                if self.state.mailbox[rook_sq] != Some(Piece::new(colour, PieceType::Rook)) {
                    return fail(
                        9,
                        format!("{colour} castling right without rook on {rook_sq}"),
                    );
                }
            }
        }

        // 10: the en passant square sits on the right rank.
        if let Some(ep_sq) = self.state.ep_square {
            let expected_rank = match self.turn() {
                Colour::White => Rank::Six,
                Colour::Black => Rank::Three,
            };
            if ep_sq.rank() != expected_rank {
                return fail(10, format!("en passant square {ep_sq} on the wrong rank"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_positions_pass() {
        for fen in [
            Board::STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ] {
            Board::from_fen(fen).unwrap().check_validity().unwrap();
        }
    }

    #[test]
    fn validity_holds_through_play() {
        let mut board = Board::from_fen(Board::STARTING_FEN).unwrap();
        for uci in ["d2d4", "d7d5", "c2c4", "d5c4", "e2e4", "b7b5", "a2a4", "c7c6"] {
            let m = board.parse_uci(uci).unwrap();
            board.make_move(m);
            board.check_validity().unwrap();
        }
        while !board.history().is_empty() {
            board.unmake_move();
            board.check_validity().unwrap();
        }
    }
}
