use arrayvec::ArrayVec;

use std::{
    fmt::{Display, Formatter},
    ops::{Deref, DerefMut},
};

use crate::chess::{
    board::Board,
    chessmove::{Move, MoveFlags},
    magic::{
        bishop_attacks_on_the_fly, rook_attacks_on_the_fly, BISHOP_ATTACKS, BISHOP_REL_BITS,
        BISHOP_TABLE, ROOK_ATTACKS, ROOK_REL_BITS, ROOK_TABLE,
    },
    piece::{Black, Col, Colour, PieceType, White},
    squareset::SquareSet,
    types::{Rank, Square},
};
use crate::cfor;

pub const MAX_POSITION_MOVES: usize = 218;

#[derive(Clone, Debug, Default)]
pub struct MoveList {
    inner: ArrayVec<Move, MAX_POSITION_MOVES>,
}

impl MoveList {
    pub fn new() -> Self {
        Self { inner: ArrayVec::new() }
    }

    fn push(&mut self, m: Move) {
        self.inner.push(m);
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl Deref for MoveList {
    type Target = [Move];

    fn deref(&self) -> &[Move] {
        &self.inner
    }
}

impl DerefMut for MoveList {
    fn deref_mut(&mut self) -> &mut [Move] {
        &mut self.inner
    }
}

impl Display for MoveList {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        if self.inner.is_empty() {
            return write!(f, "MoveList: (0) []");
        }
        writeln!(f, "MoveList: ({}) [", self.inner.len())?;
        for m in &self.inner[..self.inner.len() - 1] {
            writeln!(f, "  {m},")?;
        }
        writeln!(f, "  {}", self.inner[self.inner.len() - 1])?;
        write!(f, "]")
    }
}

const fn in_between(sq1: Square, sq2: Square) -> SquareSet {
    const M1: u64 = 0xFFFF_FFFF_FFFF_FFFF;
    const A2A7: u64 = 0x0001_0101_0101_0100;
    const B2G7: u64 = 0x0040_2010_0804_0200;
    const H1B7: u64 = 0x0002_0408_1020_4080;
    let sq1 = sq1.index();
    let sq2 = sq2.index();
    let btwn = (M1 << sq1) ^ (M1 << sq2);
    let file = ((sq2 & 7).wrapping_add((sq1 & 7).wrapping_neg())) as u64;
    let rank = (((sq2 | 7).wrapping_sub(sq1)) >> 3) as u64;
    let mut line = ((file & 7).wrapping_sub(1)) & A2A7;
    line += 2 * ((rank & 7).wrapping_sub(1) >> 58);
    line += ((rank.wrapping_sub(file) & 15).wrapping_sub(1)) & B2G7;
    line += ((rank.wrapping_add(file) & 15).wrapping_sub(1)) & H1B7;
    line = line.wrapping_mul(btwn & btwn.wrapping_neg());
    SquareSet::from_inner(line & btwn)
}

/// Squares strictly between two squares, when they share a rank, file, or
/// diagonal; empty otherwise.
pub static RAY_BETWEEN: [[SquareSet; 64]; 64] = {
    let mut res = [[SquareSet::EMPTY; 64]; 64];
    cfor!(let mut from = 0u8; from < 64; from += 1; {
        cfor!(let mut to = 0u8; to < 64; to += 1; {
            // SAFETY: both loop bounds keep the squares below 64.
            let (f, t) = unsafe { (Square::new_unchecked(from), Square::new_unchecked(to)) };
            res[from as usize][to as usize] = in_between(f, t);
        });
    });
    res
};

/// The full line through two aligned squares, endpoints included; empty when
/// they do not share a rank, file, or diagonal.
pub static RAY_FULL: [[SquareSet; 64]; 64] = {
    // cache these to accelerate consteval
    let mut rook_table = [SquareSet::EMPTY; 64];
    let mut bishop_table = [SquareSet::EMPTY; 64];
    cfor!(let mut sq = 0u8; sq < 64; sq += 1; {
        // SAFETY: the loop bound keeps sq below 64.
        let s = unsafe { Square::new_unchecked(sq) };
        rook_table[sq as usize] = rook_attacks_on_the_fly(s, SquareSet::EMPTY);
        bishop_table[sq as usize] = bishop_attacks_on_the_fly(s, SquareSet::EMPTY);
    });

    let mut res = [[SquareSet::EMPTY; 64]; 64];
    cfor!(let mut from = 0; from < 64; from += 1; {
        let from_mask = SquareSet::from_inner(1 << from);
        let rook_attacks = rook_table[from];
        let bishop_attacks = bishop_table[from];

        cfor!(let mut to = 0; to < 64; to += 1; {
            let to_mask = SquareSet::from_inner(1 << to);
            if from == to {
                // do nothing
            } else if rook_attacks.inner() & to_mask.inner() != 0 {
                res[from][to] = SquareSet::intersection(
                    rook_table[from].union(from_mask),
                    rook_table[to].union(to_mask),
                );
            } else if bishop_attacks.inner() & to_mask.inner() != 0 {
                res[from][to] = SquareSet::intersection(
                    bishop_table[from].union(from_mask),
                    bishop_table[to].union(to_mask),
                );
            }
        });
    });
    res
};

const fn init_jumping_attacks<const IS_KNIGHT: bool>() -> [SquareSet; 64] {
    let mut attacks = [SquareSet::EMPTY; 64];
    let deltas: &[i32] = if IS_KNIGHT {
        &[17, 15, 10, 6, -17, -15, -10, -6]
    } else {
        &[9, 8, 7, 1, -9, -8, -7, -1]
    };

    cfor!(let mut sq = 0u8; sq < 64; sq += 1; {
        let mut attacks_bb = 0u64;
        cfor!(let mut idx = 0; idx < 8; idx += 1; {
            let delta = deltas[idx];
            let attacked_sq = sq as i32 + delta;
            #[allow(clippy::cast_sign_loss)]
            if 0 <= attacked_sq && attacked_sq < 64 {
                // SAFETY: both squares are within `0..64`.
                let (a, b) = unsafe {
                    (Square::new_unchecked(sq), Square::new_unchecked(attacked_sq as u8))
                };
                if Square::distance(a, b) <= 2 {
                    attacks_bb |= 1 << attacked_sq;
                }
            }
        });
        attacks[sq as usize] = SquareSet::from_inner(attacks_bb);
    });

    attacks
}

#[allow(clippy::cast_possible_truncation)]
pub fn bishop_attacks(sq: Square, blockers: SquareSet) -> SquareSet {
    let entry = &BISHOP_TABLE[sq.index()];
    let relevant_blockers = blockers & entry.mask;
    let data = relevant_blockers.inner().wrapping_mul(entry.magic);
    // BISHOP_REL_BITS is 9, so this shift is by 55, and the index is < 512.
    let idx = (data >> (64 - BISHOP_REL_BITS)) as usize;
    BISHOP_ATTACKS[sq.index()][idx]
}

#[allow(clippy::cast_possible_truncation)]
pub fn rook_attacks(sq: Square, blockers: SquareSet) -> SquareSet {
    let entry = &ROOK_TABLE[sq.index()];
    let relevant_blockers = blockers & entry.mask;
    let data = relevant_blockers.inner().wrapping_mul(entry.magic);
    // ROOK_REL_BITS is 12, so this shift is by 52, and the index is < 4096.
    let idx = (data >> (64 - ROOK_REL_BITS)) as usize;
    ROOK_ATTACKS[sq.index()][idx]
}

pub fn knight_attacks(sq: Square) -> SquareSet {
    static KNIGHT_ATTACKS: [SquareSet; 64] = init_jumping_attacks::<true>();
    KNIGHT_ATTACKS[sq.index()]
}

pub fn king_attacks(sq: Square) -> SquareSet {
    static KING_ATTACKS: [SquareSet; 64] = init_jumping_attacks::<false>();
    KING_ATTACKS[sq.index()]
}

pub fn pawn_attacks<C: Col>(bb: SquareSet) -> SquareSet {
    if C::WHITE {
        bb.north_east_one() | bb.north_west_one()
    } else {
        bb.south_east_one() | bb.south_west_one()
    }
}

pub fn pawn_attacks_by(bb: SquareSet, colour: Colour) -> SquareSet {
    if colour == Colour::White {
        bb.north_east_one() | bb.north_west_one()
    } else {
        bb.south_east_one() | bb.south_west_one()
    }
}

pub fn attacks_by_type(pt: PieceType, sq: Square, blockers: SquareSet) -> SquareSet {
    match pt {
        PieceType::Pawn => {
            debug_assert!(false, "Invalid piece type: {pt:?}");
            SquareSet::EMPTY
        }
        PieceType::Knight => knight_attacks(sq),
        PieceType::Bishop => bishop_attacks(sq, blockers),
        PieceType::Rook => rook_attacks(sq, blockers),
        PieceType::Queen => bishop_attacks(sq, blockers) | rook_attacks(sq, blockers),
        PieceType::King => king_attacks(sq),
    }
}

impl Board {
    fn generate_pawn_forward<C: Col>(&self, move_list: &mut MoveList) {
        use PieceType::{Bishop, Knight, Pawn, Queen, Rook};
        let bbs = &self.state.bbs;
        let promo_rank = [SquareSet::RANK_7, SquareSet::RANK_2][C::COLOUR];
        let start_rank = [SquareSet::RANK_2, SquareSet::RANK_7][C::COLOUR];
        let our_pawns = bbs.pieces[Pawn] & bbs.colours[C::COLOUR];
        let empty = bbs.empty();

        let shift_fwd = |mask: SquareSet| if C::WHITE { mask.north_one() } else { mask.south_one() };
        let shift_back = |mask: SquareSet| if C::WHITE { mask.south_one() } else { mask.north_one() };

        let pushable_pawns = our_pawns & shift_back(empty);
        let double_pushable_pawns = pushable_pawns & shift_back(shift_back(empty)) & start_rank;
        let promoting_pawns = pushable_pawns & promo_rank;

        for from in pushable_pawns & !promoting_pawns {
            // SAFETY: the pawn has an empty square ahead of it.
            let to = unsafe { from.offset_unchecked(C::PAWN_FWD_OFFSET) };
            move_list.push(Move::new(from, to));
        }
        for from in double_pushable_pawns {
            // SAFETY: the pawn has two empty squares ahead of it.
            let to = unsafe { from.offset_unchecked(2 * C::PAWN_FWD_OFFSET) };
            move_list.push(Move::new(from, to));
        }
        for from in promoting_pawns {
            // SAFETY: the pawn has an empty square ahead of it.
            let to = unsafe { from.offset_unchecked(C::PAWN_FWD_OFFSET) };
            for promo in [Queen, Knight, Rook, Bishop] {
                move_list.push(Move::new_with_promo(from, to, promo));
            }
        }
    }

    fn generate_pawn_caps<C: Col>(&self, move_list: &mut MoveList) {
        use PieceType::{Bishop, Knight, Pawn, Queen, Rook};

        let bbs = &self.state.bbs;
        let our_pawns = bbs.pieces[Pawn] & bbs.colours[C::COLOUR];
        let their_pieces = bbs.colours[C::Opposite::COLOUR];
        let promo_rank = [SquareSet::RANK_7, SquareSet::RANK_2][C::COLOUR];

        // to determine which pawns can capture,
        // we shift the opponent's pieces backwards and find the intersection.
        let attacking_west = if C::WHITE {
            their_pieces.south_east_one() & our_pawns
        } else {
            their_pieces.north_east_one() & our_pawns
        };
        let attacking_east = if C::WHITE {
            their_pieces.south_west_one() & our_pawns
        } else {
            their_pieces.north_west_one() & our_pawns
        };

        for from in attacking_west & !promo_rank {
            // SAFETY: masking guarantees a valid square
            let to = unsafe { from.offset_unchecked(C::PAWN_LEFT_OFFSET) };
            move_list.push(Move::new(from, to));
        }
        for from in attacking_east & !promo_rank {
            // SAFETY: masking guarantees a valid square
            let to = unsafe { from.offset_unchecked(C::PAWN_RIGHT_OFFSET) };
            move_list.push(Move::new(from, to));
        }
        for from in attacking_west & promo_rank {
            // SAFETY: masking guarantees a valid square
            let to = unsafe { from.offset_unchecked(C::PAWN_LEFT_OFFSET) };
            for promo in [Queen, Knight, Rook, Bishop] {
                move_list.push(Move::new_with_promo(from, to, promo));
            }
        }
        for from in attacking_east & promo_rank {
            // SAFETY: masking guarantees a valid square
            let to = unsafe { from.offset_unchecked(C::PAWN_RIGHT_OFFSET) };
            for promo in [Queen, Knight, Rook, Bishop] {
                move_list.push(Move::new_with_promo(from, to, promo));
            }
        }
    }

    fn generate_ep<C: Col>(&self, move_list: &mut MoveList) {
        let Some(ep_sq) = self.state.ep_square else {
            return;
        };

        let ep_bb = ep_sq.as_set();
        let our_pawns = self.state.bbs.pieces[PieceType::Pawn] & self.state.bbs.colours[C::COLOUR];
        let attackers = if C::WHITE {
            ep_bb.south_east_one() | ep_bb.south_west_one()
        } else {
            ep_bb.north_east_one() | ep_bb.north_west_one()
        } & our_pawns;

        for from_sq in attackers {
            move_list.push(Move::new_with_flags(from_sq, ep_sq, MoveFlags::EnPassant));
        }
    }

    fn generate_castling<C: Col>(&self, move_list: &mut MoveList) {
        let side = C::COLOUR;
        let king_sq = self.state.bbs.king_sq(side);
        for rook_file in [
            self.state.castle_perm.kingside(side),
            self.state.castle_perm.queenside(side),
        ]
        .into_iter()
        .flatten()
        {
            let home_rank = if C::WHITE { Rank::One } else { Rank::Eight };
            let rook_sq = Square::from_rank_file(home_rank, rook_file);
            if king_sq.rank() != home_rank {
                continue;
            }
            let m = Move::new_with_flags(king_sq, rook_sq, MoveFlags::Castle);
            if self.is_pseudo_legal_castling(m) {
                move_list.push(m);
            }
        }
    }

    fn generate_moves_for<C: Col>(&self, move_list: &mut MoveList) {
        let bbs = &self.state.bbs;
        let our_pieces = bbs.colours[C::COLOUR];
        let valid_targets = !our_pieces;
        let occupied = bbs.occupied();

        self.generate_pawn_forward::<C>(move_list);
        self.generate_pawn_caps::<C>(move_list);
        self.generate_ep::<C>(move_list);

        for from in bbs.all_knights() & our_pieces {
            for to in knight_attacks(from) & valid_targets {
                move_list.push(Move::new(from, to));
            }
        }
        for from in bbs.all_bishops() & our_pieces {
            for to in bishop_attacks(from, occupied) & valid_targets {
                move_list.push(Move::new(from, to));
            }
        }
        for from in bbs.all_rooks() & our_pieces {
            for to in rook_attacks(from, occupied) & valid_targets {
                move_list.push(Move::new(from, to));
            }
        }
        for from in bbs.all_queens() & our_pieces {
            for to in (bishop_attacks(from, occupied) | rook_attacks(from, occupied))
                & valid_targets
            {
                move_list.push(Move::new(from, to));
            }
        }
        let king = bbs.king_sq(C::COLOUR);
        for to in king_attacks(king) & valid_targets {
            move_list.push(Move::new(king, to));
        }

        self.generate_castling::<C>(move_list);
    }

    /// Generate all pseudo-legal moves: legal except that the mover's king
    /// may be left in check. Filter with `is_legal`.
    pub fn generate_moves(&self, move_list: &mut MoveList) {
        match self.turn() {
            Colour::White => self.generate_moves_for::<White>(move_list),
            Colour::Black => self.generate_moves_for::<Black>(move_list),
        }
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut move_list = MoveList::new();
        self.generate_moves(&mut move_list);
        move_list.iter().copied().filter(|&m| self.is_legal(m)).collect()
    }

    /// Determines if `sq` is attacked by `side`.
    pub fn sq_attacked(&self, sq: Square, side: Colour) -> bool {
        self.state.bbs.sq_attacked_by(sq, side)
    }

    pub fn any_attacked(&self, squares: SquareSet, by: Colour) -> bool {
        squares.iter().any(|sq| self.sq_attacked(sq, by))
    }

    /// Checks whether a move is pseudo-legal.
    /// This means that it is a legal move, except for the fact that it might
    /// leave the king in check.
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        if m.is_castle() {
            return self.is_pseudo_legal_castling(m);
        }

        let from = m.from();
        let to = m.to();

        let moved_piece = self.state.mailbox[from];
        let captured_piece = self.state.mailbox[to];

        let Some(moved_piece) = moved_piece else {
            return false;
        };

        if moved_piece.colour() != self.turn() {
            return false;
        }

        if captured_piece.is_some_and(|piece| piece.colour() == self.turn()) {
            return false;
        }

        if captured_piece.is_some()
            && moved_piece.piece_type() == PieceType::Pawn
            && from.file() == to.file()
        {
            return false;
        }

        if moved_piece.piece_type() == PieceType::Pawn {
            let should_be_promoting = to.rank() == Rank::Eight || to.rank() == Rank::One;
            if should_be_promoting != m.is_promo() {
                return false;
            }
            if m.is_ep() {
                return Some(to) == self.state.ep_square;
            } else if (SquareSet::RANK_4 | SquareSet::RANK_5).contains_square(to)
                && (SquareSet::RANK_2 | SquareSet::RANK_7).contains_square(from)
                && from.file() == to.file()
            {
                if from.rank().relative_to(self.turn()) != Rank::Two {
                    return false;
                }
                let Some(one_forward) = from.pawn_push(self.turn()) else {
                    return false;
                };
                if Some(to) == one_forward.pawn_push(self.turn()) {
                    return self.state.mailbox[one_forward].is_none()
                        && self.state.mailbox[to].is_none();
                }
                // fall through to the single-push / capture cases below.
            }
            if captured_piece.is_none() {
                return Some(to) == from.pawn_push(self.turn());
            }
            // pawn capture
            return pawn_attacks_by(from.as_set(), self.turn()).contains_square(to);
        }

        // not a pawn move, but is somehow ep/promo?
        if m.is_ep() || m.is_promo() {
            return false;
        }

        attacks_by_type(moved_piece.piece_type(), from, self.state.bbs.occupied())
            .contains_square(to)
    }

    pub fn is_pseudo_legal_castling(&self, m: Move) -> bool {
        // illegal if:
        // - we're not moving the king
        // - we're not doing everything on the home rank
        // - we don't have castling rights on the target square
        // - there are pieces between the king and the rook
        // - the king passes through a square that is attacked by the opponent
        // - the king ends up in check (not checked here)
        let Some(moved) = self.state.mailbox[m.from()] else {
            return false;
        };
        if moved.piece_type() != PieceType::King || moved.colour() != self.turn() {
            return false;
        }
        let side = self.turn();
        let home_rank = match side {
            Colour::White => SquareSet::RANK_1,
            Colour::Black => SquareSet::RANK_8,
        };
        if !home_rank.contains_square(m.to()) || !home_rank.contains_square(m.from()) {
            return false;
        }
        let (king_dst, rook_dst) = if m.to() > m.from() {
            // kingside castling.
            if self.state.castle_perm.kingside(side) != Some(m.to().file()) {
                return false;
            }
            (Square::G1.relative_to(side), Square::F1.relative_to(side))
        } else {
            // queenside castling.
            if self.state.castle_perm.queenside(side) != Some(m.to().file()) {
                return false;
            }
            (Square::C1.relative_to(side), Square::D1.relative_to(side))
        };

        // king_path is the path the king takes to get to its destination.
        let king_path = RAY_BETWEEN[m.from().index()][king_dst.index()];
        // rook_path is the path the rook takes to get to its destination.
        let rook_path = RAY_BETWEEN[m.from().index()][m.to().index()];
        // castle_occ is the occupancy that "counts" for castling.
        let castle_occ = self.state.bbs.occupied() ^ m.from().as_set() ^ m.to().as_set();

        (castle_occ & (king_path | rook_path | king_dst.as_set() | rook_dst.as_set())).is_empty()
            && !self.any_attacked(king_path | m.from().as_set(), side.flip())
    }

    /// Checks whether a given pseudo-legal move is legal in the current
    /// position, via pin analysis rather than actually making the move.
    pub fn is_legal(&self, m: Move) -> bool {
        let turn = self.turn();
        let bbs = &self.state.bbs;

        let from = m.from();
        let to = m.to();

        let us = bbs.colours[turn];
        let our_king_bb = bbs.all_kings() & us;
        let king = bbs.king_sq(turn);

        let them = bbs.colours[!turn];
        let their_queens = bbs.all_queens() & them;
        let their_bishops = bbs.all_bishops() & them;
        let their_rooks = bbs.all_rooks() & them;

        if m.is_castle() {
            let king_to = m.king_destination();
            return !(self.sq_attacked(king_to, !turn)
                || self.state.pinned[turn].contains_square(to));
        }

        if m.is_ep() {
            let cap_sq = Square::from_rank_file(from.rank(), to.file());
            let occ_after =
                bbs.occupied() ^ to.as_set() ^ from.as_set() ^ cap_sq.as_set();
            let their_pawns = bbs.all_pawns() & them & !cap_sq.as_set();

            return (bishop_attacks(king, occ_after) & (their_queens | their_bishops)).is_empty()
                && (rook_attacks(king, occ_after) & (their_queens | their_rooks)).is_empty()
                && (knight_attacks(king) & bbs.all_knights() & them).is_empty()
                && (pawn_attacks_by(king.as_set(), turn) & their_pawns).is_empty();
        }

        let moving = self.state.mailbox[from].expect("is_legal called on empty from-square");

        if moving.piece_type() == PieceType::King {
            let without_king = bbs.occupied() ^ our_king_bb;
            return (bbs.all_attackers_to_sq(to, without_king) & them).is_empty();
        }

        // moving anything other than the king
        // is illegal when in double-check.
        if self.state.checkers.many() {
            return false;
        }

        // if your piece is pinned, you can only
        // move it along the direction that it is
        // pinned in.
        if self.state.pinned[turn].contains_square(from)
            && !RAY_FULL[from.index()][to.index()].contains_square(king)
        {
            return false;
        }

        // not in check and not moving the king? a-ok.
        if self.state.checkers.is_empty() {
            return true;
        }

        // single checker, you have to be
        // capturing it or blocking the check.
        let checker = self.state.checkers.first().unwrap();
        (RAY_BETWEEN[king.index()][checker.index()] | self.state.checkers).contains_square(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jumping_attack_counts() {
        assert_eq!(knight_attacks(Square::A1).count(), 2);
        assert_eq!(knight_attacks(Square::E4).count(), 8);
        assert_eq!(king_attacks(Square::A1).count(), 3);
        assert_eq!(king_attacks(Square::E4).count(), 8);
    }

    #[test]
    fn jumping_attack_patterns() {
        // validated against the python-chess library, which is known to be correct.
        assert_eq!(knight_attacks(Square::A1).inner(), 132_096);
        assert_eq!(knight_attacks(Square::H8).inner(), 9_077_567_998_918_656);
        assert_eq!(king_attacks(Square::A1).inner(), 770);
        assert_eq!(king_attacks(Square::H8).inner(), 4_665_729_213_955_833_856);
    }

    #[test]
    fn rays() {
        let between = RAY_BETWEEN[Square::A1.index()][Square::A8.index()];
        assert_eq!(between.count(), 6);
        assert!(between.contains_square(Square::A4));
        assert!(!between.contains_square(Square::A1));

        assert_eq!(
            RAY_BETWEEN[Square::C2.index()][Square::E4.index()],
            Square::D3.as_set()
        );
        assert_eq!(RAY_BETWEEN[Square::A1.index()][Square::B3.index()], SquareSet::EMPTY);

        let full = RAY_FULL[Square::C3.index()][Square::E5.index()];
        assert!(full.contains_square(Square::A1));
        assert!(full.contains_square(Square::H8));
        assert!(full.contains_square(Square::C3));
        assert_eq!(full.count(), 8);
    }

    #[test]
    fn slider_attacks_with_blockers() {
        let blockers = Square::E4.as_set() | Square::B1.as_set();
        let rook = rook_attacks(Square::E1, blockers);
        assert!(rook.contains_square(Square::E4));
        assert!(!rook.contains_square(Square::E5));
        assert!(rook.contains_square(Square::B1));
        assert!(!rook.contains_square(Square::A1));

        let bishop = bishop_attacks(Square::C1, Square::E3.as_set());
        assert!(bishop.contains_square(Square::E3));
        assert!(!bishop.contains_square(Square::F4));
        assert!(bishop.contains_square(Square::A3));
    }
}
