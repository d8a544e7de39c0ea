use crate::{
    chess::{piece::Colour, squareset::SquareSet, types::Square},
    rng::XorShiftState,
};

/// Implements a C-style for loop, for use in const fn.
#[macro_export]
macro_rules! cfor {
    ($init: stmt; $cond: expr; $step: expr; $body: block) => {
        {
            $init
            #[allow(while_true)]
            while $cond {
                $body;

                $step;
            }
        }
    }
}

const fn init_hash_keys() -> ([[u64; 64]; 12], [u64; 16], [u64; 8], u64, [[u64; 16]; 12]) {
    let mut state = XorShiftState::new();
    let mut piece_keys = [[0; 64]; 12];
    cfor!(let mut piece = 0; piece < 12; piece += 1; {
        cfor!(let mut sq = 0; sq < 64; sq += 1; {
            let key;
            (key, state) = state.next_self();
            piece_keys[piece][sq] = key;
        });
    });
    let mut castle_keys = [0; 16];
    cfor!(let mut index = 0; index < 16; index += 1; {
        let key;
        (key, state) = state.next_self();
        castle_keys[index] = key;
    });
    let mut ep_keys = [0; 8];
    cfor!(let mut file = 0; file < 8; file += 1; {
        let key;
        (key, state) = state.next_self();
        ep_keys[file] = key;
    });
    let side_key;
    (side_key, state) = state.next_self();
    // The material table is indexed by the count-within-type of each piece:
    // a position's material key is the XOR over pieces of the keys for
    // counts 0..n. It depends only on the piece multiset.
    let mut material_keys = [[0; 16]; 12];
    cfor!(let mut piece = 0; piece < 12; piece += 1; {
        cfor!(let mut count = 0; count < 16; count += 1; {
            let key;
            (key, state) = state.next_self();
            material_keys[piece][count] = key;
        });
    });
    let _ = state;
    (piece_keys, castle_keys, ep_keys, side_key, material_keys)
}

pub static PIECE_KEYS: [[u64; 64]; 12] = init_hash_keys().0;
pub static CASTLE_KEYS: [u64; 16] = init_hash_keys().1;
/// Indexed by the file of the en passant square.
pub static EP_KEYS: [u64; 8] = init_hash_keys().2;
pub const SIDE_KEY: u64 = init_hash_keys().3;
/// Indexed `[piece][count-within-type]`.
pub static MATERIAL_KEYS: [[u64; 16]; 12] = init_hash_keys().4;

const fn init_passed_masks() -> [[u64; 64]; 2] {
    #![allow(clippy::cast_possible_wrap)]
    let mut white = [0u64; 64];
    let mut black = [0u64; 64];

    cfor!(let mut sq = 0i32; sq < 64; sq += 1; {
        let file = sq % 8;
        cfor!(let mut f = file - 1; f <= file + 1; f += 1; {
            if f >= 0 && f < 8 {
                cfor!(let mut t = sq + 8 - (file - f); t < 64; t += 8; {
                    white[sq as usize] |= 1 << (t / 8 * 8 + f);
                });
                cfor!(let mut t = sq - 8; t >= 0; t -= 8; {
                    black[sq as usize] |= 1 << (t / 8 * 8 + f);
                });
            }
        });
    });

    [white, black]
}

const fn init_neighbouring_files() -> [u64; 8] {
    let file_a = 0x0101_0101_0101_0101u64;
    let mut masks = [0u64; 8];
    cfor!(let mut f = 0; f < 8; f += 1; {
        if f > 0 {
            masks[f] |= file_a << (f - 1);
        }
        if f < 7 {
            masks[f] |= file_a << (f + 1);
        }
    });
    masks
}

static PASSED_PAWN_MASKS: [[u64; 64]; 2] = init_passed_masks();
static NEIGHBOURING_FILES: [u64; 8] = init_neighbouring_files();

/// All squares an enemy pawn would have to cross to stop the pawn on `sq`
/// from promoting: the three files around it, strictly ahead of it.
pub fn passed_pawn_mask(side: Colour, sq: Square) -> SquareSet {
    SquareSet::from_inner(PASSED_PAWN_MASKS[side.index()][sq.index()])
}

/// The two files either side of the square's file.
pub fn neighbouring_files(sq: Square) -> SquareSet {
    SquareSet::from_inner(NEIGHBOURING_FILES[sq.file().index()])
}

/// Squares from which a pawn of `side` could ever evict a piece sitting on
/// `sq`: the neighbouring files, strictly ahead from `side`'s point of view.
/// A square no enemy pawn can cover this way is an outpost.
pub fn outpost_mask(side: Colour, sq: Square) -> SquareSet {
    passed_pawn_mask(side, sq) & neighbouring_files(sq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::types::Square;

    #[test]
    fn all_hash_keys_different() {
        let mut keys: Vec<u64> = PIECE_KEYS.iter().flatten().copied().collect();
        keys.extend_from_slice(&CASTLE_KEYS);
        keys.extend_from_slice(&EP_KEYS);
        keys.push(SIDE_KEY);
        keys.extend(MATERIAL_KEYS.iter().flatten());
        let len_before = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(len_before, keys.len());
    }

    #[test]
    fn passed_pawn_masks() {
        let mask = passed_pawn_mask(Colour::White, Square::E4);
        assert!(mask.contains_square(Square::E5));
        assert!(mask.contains_square(Square::D7));
        assert!(mask.contains_square(Square::F5));
        assert!(!mask.contains_square(Square::E4));
        assert!(!mask.contains_square(Square::E3));
        assert!(!mask.contains_square(Square::C5));

        let mask = passed_pawn_mask(Colour::Black, Square::E4);
        assert!(mask.contains_square(Square::E3));
        assert!(mask.contains_square(Square::F2));
        assert!(!mask.contains_square(Square::E5));
    }

    #[test]
    fn neighbouring_file_masks() {
        let mask = neighbouring_files(Square::A4);
        assert_eq!(mask, SquareSet::FILE_B);
        let mask = neighbouring_files(Square::E1);
        assert_eq!(mask, SquareSet::FILE_D | SquareSet::FILE_F);
    }

    #[test]
    fn outpost_masks() {
        // a knight on e5 can only be evicted by black pawns landing on these.
        let mask = outpost_mask(Colour::White, Square::E5);
        assert!(mask.contains_square(Square::D6));
        assert!(mask.contains_square(Square::F7));
        assert!(!mask.contains_square(Square::E6));
        assert!(!mask.contains_square(Square::D5));
    }
}
