use std::sync::LazyLock;

use crate::chess::{
    board::movegen::{king_attacks, pawn_attacks_by},
    piece::Colour,
    squareset::SquareSet,
    types::{File, Rank, Square},
};

// There are 24 possible pawn squares: the first 4 files and ranks from 2 to 7.
const MAX_INDEX: usize = 2 * 24 * 64 * 64;

// A KPK bitbase index is an integer in [0, MAX_INDEX[:
//
// bit  0- 5: white king square (from A1 to H8)
// bit  6-11: black king square (from A1 to H8)
// bit    12: side to move (White or Black)
// bit 13-14: white pawn file (from FILE_A to FILE_D)
// bit 15-17: white pawn Rank::Seven - rank
fn index(us: Colour, bksq: Square, wksq: Square, psq: Square) -> usize {
    wksq.index()
        | bksq.index() << 6
        | us.index() << 12
        | psq.file().index() << 13
        | (Rank::Seven.index() - psq.rank().index()) << 15
}

const INVALID: u8 = 0;
const UNKNOWN: u8 = 1;
const DRAW: u8 = 2;
const WIN: u8 = 4;

struct KpkPosition {
    us: Colour,
    ksq: [Square; 2],
    psq: Square,
    result: u8,
}

impl KpkPosition {
    fn new(idx: usize) -> Self {
        #![allow(clippy::cast_possible_truncation)]
        let wksq = Square::new((idx & 0x3F) as u8).unwrap();
        let bksq = Square::new(((idx >> 6) & 0x3F) as u8).unwrap();
        let us = if (idx >> 12) & 1 == 0 {
            Colour::White
        } else {
            Colour::Black
        };
        let psq = Square::from_rank_file(
            Rank::from_index(Rank::Seven.index() as u8 - ((idx >> 15) & 0x7) as u8).unwrap(),
            File::from_index(((idx >> 13) & 0x3) as u8).unwrap(),
        );

        let pawn_attacks = pawn_attacks_by(psq.as_set(), Colour::White);
        let promo_sq = psq.add(8);

        let result = if Square::distance(wksq, bksq) <= 1
            || wksq == psq
            || bksq == psq
            || (us == Colour::White && pawn_attacks.contains_square(bksq))
        {
            INVALID
        } else if us == Colour::White
            && psq.rank() == Rank::Seven
            && promo_sq.is_some_and(|promo| {
                wksq != promo
                    && (Square::distance(bksq, promo) > 1
                        || king_attacks(wksq).contains_square(promo))
            })
        {
            // the pawn promotes without getting captured.
            WIN
        } else if us == Colour::Black
            && ((king_attacks(bksq) & !(king_attacks(wksq) | pawn_attacks)).is_empty()
                || (king_attacks(bksq) & psq.as_set() & !king_attacks(wksq)).non_empty())
        {
            // stalemate, or the black king captures an undefended pawn.
            DRAW
        } else {
            UNKNOWN
        };

        Self {
            us,
            ksq: [wksq, bksq],
            psq,
            result,
        }
    }

    // White to move: if one move leads to a position classified as WIN, the
    // result of the current position is WIN; if all moves lead to positions
    // classified as DRAW, the current position is classified as DRAW;
    // otherwise, the current position is classified as UNKNOWN.
    //
    // Black to move: the same, with the roles of WIN and DRAW reversed.
    fn classify(&self, db: &[KpkPosition]) -> u8 {
        let us = self.us;
        let them = !us;
        let (good, bad) = if us == Colour::White {
            (WIN, DRAW)
        } else {
            (DRAW, WIN)
        };

        let mut r = INVALID;

        for s in king_attacks(self.ksq[us]) {
            r |= if us == Colour::White {
                db[index(them, self.ksq[them], s, self.psq)].result
            } else {
                db[index(them, s, self.ksq[Colour::White], self.psq)].result
            };
        }

        if us == Colour::White {
            if self.psq.rank() < Rank::Seven {
                let push = self.psq.add(8).unwrap();
                r |= db[index(them, self.ksq[them], self.ksq[us], push)].result;
                if self.psq.rank() == Rank::Two
                    && push != self.ksq[us]
                    && push != self.ksq[them]
                {
                    let double_push = self.psq.add(16).unwrap();
                    r |= db[index(them, self.ksq[them], self.ksq[us], double_push)].result;
                }
            }
        }

        if r & good != 0 {
            good
        } else if r & UNKNOWN != 0 {
            UNKNOWN
        } else {
            bad
        }
    }
}

/// One bit per position: set means a win for the pawn's side. Built by
/// retrograde analysis on first probe.
static KPK_BITBASE: LazyLock<Box<[u32]>> = LazyLock::new(|| {
    let mut db: Vec<KpkPosition> = (0..MAX_INDEX).map(KpkPosition::new).collect();

    // iterate until no unknown position can be resolved further
    // (takes around 15 cycles).
    let mut repeat = true;
    while repeat {
        repeat = false;
        for idx in 0..MAX_INDEX {
            if db[idx].result == UNKNOWN {
                let result = db[idx].classify(&db);
                if result != UNKNOWN {
                    db[idx].result = result;
                    repeat = true;
                }
            }
        }
    }

    let mut storage = vec![0u32; MAX_INDEX / 32].into_boxed_slice();
    for (idx, pos) in db.iter().enumerate() {
        if pos.result == WIN {
            storage[idx / 32] |= 1 << (idx & 0x1F);
        }
    }
    storage
});

/// Probe the bitbase. Squares must already be normalised so that the pawn is
/// white and stands on files A-D.
pub fn probe(wksq: Square, wpsq: Square, bksq: Square, us: Colour) -> bool {
    debug_assert!(wpsq.file() <= File::D);
    debug_assert!(wpsq.rank() >= Rank::Two && wpsq.rank() <= Rank::Seven);
    let idx = index(us, bksq, wksq, wpsq);
    KPK_BITBASE[idx / 32] & (1 << (idx & 0x1F)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_wins() {
        // king in front of its pawn, opposition: always winning.
        assert!(probe(Square::B6, Square::B5, Square::B8, Colour::White));
        // a pawn on the seventh with the king guarding the queening square.
        assert!(probe(Square::B7, Square::A7, Square::D5, Colour::White));
    }

    #[test]
    fn known_draws() {
        // the defender holds the queening corner of a rook pawn.
        assert!(!probe(Square::A5, Square::A4, Square::A8, Colour::White));
        assert!(!probe(Square::A5, Square::A4, Square::A8, Colour::Black));
        // king one square ahead of its pawn, defender keeps the opposition.
        assert!(!probe(Square::C5, Square::C4, Square::C7, Colour::White));
        // the same position with the defender to move is lost.
        assert!(probe(Square::C5, Square::C4, Square::C7, Colour::Black));
    }
}
