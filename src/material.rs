use crate::{
    chess::{
        board::Board,
        piece::{Colour, PieceType},
    },
    endgame::{
        evaluate_kmm_km, evaluate_kxk, scale_kbpsk, scale_kpkp, scale_kpsk, scale_kqkrps,
        EndgameFunctions, EvalFn, ScaleFn, SCALE_FACTOR_NORMAL,
    },
};

const BISHOP_PAIR_MIDGAME_BONUS: i32 = 109;
const BISHOP_PAIR_ENDGAME_BONUS: i32 = 97;

/// Everything the evaluator wants to know about a material configuration:
/// imbalance scores, a space weight, per-side scaling factors, and the
/// specialized functions recognised for this signature.
#[derive(Clone)]
pub struct MaterialInfo {
    key: u64,
    mg_value: i16,
    eg_value: i16,
    space_weight: i32,
    factor: [u8; 2],
    evaluation_function: Option<(Colour, EvalFn)>,
    scaling_function: [Option<ScaleFn>; 2],
}

impl Default for MaterialInfo {
    fn default() -> Self {
        Self::cleared(0)
    }
}

impl MaterialInfo {
    const fn cleared(key: u64) -> Self {
        Self {
            key,
            mg_value: 0,
            eg_value: 0,
            space_weight: 0,
            factor: [SCALE_FACTOR_NORMAL; 2],
            evaluation_function: None,
            scaling_function: [None; 2],
        }
    }

    pub const fn key(&self) -> u64 {
        self.key
    }

    /// The (midgame, endgame) imbalance correction, white-positive.
    pub const fn imbalance(&self) -> (i32, i32) {
        (self.mg_value as i32, self.eg_value as i32)
    }

    pub const fn space_weight(&self) -> i32 {
        self.space_weight
    }

    pub fn specialized_eval_exists(&self) -> bool {
        self.evaluation_function.is_some()
    }

    /// Short-circuit the whole evaluation with the recognised endgame's
    /// specialized function.
    pub fn evaluate(&self, pos: &Board) -> i32 {
        let (strong_side, f) = self.evaluation_function.expect("no specialized evaluator");
        f(pos, strong_side)
    }

    /// The scaling factor to apply to `side`'s endgame score: the recognised
    /// scaling function has first say, then the precomputed base factor.
    pub fn scale_factor(&self, pos: &Board, side: Colour) -> u8 {
        self.scaling_function[side]
            .and_then(|f| f(pos, side))
            .unwrap_or(self.factor[side])
    }

    pub const fn base_factor(&self, side: Colour) -> u8 {
        self.factor[side as usize]
    }
}

/// A direct-mapped cache of `MaterialInfo`, indexed by the low bits of the
/// material key. Collisions silently overwrite: material keys separate
/// material configurations, so a stale read costs tuning noise, not
/// correctness. One table per search task; never shared.
pub struct MaterialInfoTable {
    entries: Vec<MaterialInfo>,
    funcs: EndgameFunctions,
}

impl MaterialInfoTable {
    /// Build a table with `num_entries` slots (a power of two). Failure to
    /// allocate is fatal: the engine cannot run without a material table.
    pub fn new(num_entries: usize) -> Self {
        assert!(num_entries.is_power_of_two(), "table size must be a power of two");
        let mut entries = Vec::new();
        if entries.try_reserve_exact(num_entries).is_err() {
            eprintln!(
                "Failed to allocate {} bytes for material hash table.",
                num_entries * std::mem::size_of::<MaterialInfo>()
            );
            std::process::exit(1);
        }
        entries.resize(num_entries, MaterialInfo::default());
        Self {
            entries,
            funcs: EndgameFunctions::new(),
        }
    }

    /// Look up (or compute in place) the material information for the
    /// position. Successive calls with an unchanged position return
    /// identical entries.
    #[allow(clippy::too_many_lines, clippy::cast_possible_truncation)]
    pub fn get(&mut self, pos: &Board) -> &MaterialInfo {
        let key = pos.material_key();
        let index = (key as usize) & (self.entries.len() - 1);

        if self.entries[index].key == key {
            return &self.entries[index];
        }

        let entry = &mut self.entries[index];
        *entry = MaterialInfo::cleared(key);

        // KNN vs K is a draw, however the knights stand.
        if key == self.funcs.knnk_key() || key == self.funcs.kknn_key() {
            entry.factor = [0, 0];
            return entry;
        }

        // a specialized evaluation function for this exact configuration?
        if let Some((strong_side, f)) = self.funcs.get_evaluation(key) {
            entry.evaluation_function = Some((strong_side, f));
            return entry;
        }

        // a generic "win with superior material" ending?
        for side in Colour::all() {
            if is_kxk(pos, side) {
                entry.evaluation_function = Some((side, evaluate_kxk));
                return entry;
            }
        }

        // minor pieces only, at least one each, at most two each.
        let bbs = pos.piece_layout();
        if bbs.all_pawns().is_empty()
            && bbs.all_rooks().is_empty()
            && bbs.all_queens().is_empty()
        {
            let minors = |side: Colour| {
                pos.piece_count(side, PieceType::Bishop) + pos.piece_count(side, PieceType::Knight)
            };
            if (1..=2).contains(&minors(Colour::White)) && (1..=2).contains(&minors(Colour::Black))
            {
                entry.evaluation_function = Some((Colour::White, evaluate_kmm_km));
                return entry;
            }
        }

        // a specialized scaling function for this exact configuration?
        if let Some((strong_side, f)) = self.funcs.get_scaling(key) {
            entry.scaling_function[strong_side] = Some(f);
            return entry;
        }

        // generic scaling heuristics; these do not shortcut the rest.
        for side in Colour::all() {
            if is_kbpsk(pos, side) {
                entry.scaling_function[side] = Some(scale_kbpsk);
            } else if is_kqkrps(pos, side) {
                entry.scaling_function[side] = Some(scale_kqkrps);
            }
        }

        let npm_w = pos.non_pawn_material(Colour::White);
        let npm_b = pos.non_pawn_material(Colour::Black);

        if npm_w + npm_b == 0 && bbs.all_pawns().non_empty() {
            let white_pawns = pos.piece_count(Colour::White, PieceType::Pawn);
            let black_pawns = pos.piece_count(Colour::Black, PieceType::Pawn);
            if black_pawns == 0 && white_pawns >= 2 {
                entry.scaling_function[Colour::White] = Some(scale_kpsk);
            } else if white_pawns == 0 && black_pawns >= 2 {
                entry.scaling_function[Colour::Black] = Some(scale_kpsk);
            } else if white_pawns == 1 && black_pawns == 1 {
                entry.scaling_function[Colour::White] = Some(scale_kpkp);
                entry.scaling_function[Colour::Black] = Some(scale_kpkp);
            }
        }

        // space weight: squared minor count, only with most of the army on
        // the board.
        let space_threshold = 2 * PieceType::Queen.mg_value()
            + 4 * PieceType::Rook.mg_value()
            + 2 * PieceType::Knight.mg_value();
        if npm_w + npm_b >= space_threshold {
            let minor_count = i32::from(
                pos.piece_count(Colour::White, PieceType::Knight)
                    + pos.piece_count(Colour::Black, PieceType::Knight)
                    + pos.piece_count(Colour::White, PieceType::Bishop)
                    + pos.piece_count(Colour::Black, PieceType::Bishop),
            );
            entry.space_weight = minor_count * minor_count;
        }

        // material imbalance, white-positive.
        let mut mg_value = 0i32;
        let mut eg_value = 0i32;

        for (side, sign) in [(Colour::White, 1), (Colour::Black, -1)] {
            let us_npm = pos.non_pawn_material(side);
            let them_npm = pos.non_pawn_material(!side);
            let pawns = i32::from(pos.piece_count(side, PieceType::Pawn));
            let knights = i32::from(pos.piece_count(side, PieceType::Knight));
            let bishops = i32::from(pos.piece_count(side, PieceType::Bishop));
            let rooks = i32::from(pos.piece_count(side, PieceType::Rook));
            let queens = i32::from(pos.piece_count(side, PieceType::Queen));

            // no pawns makes it difficult to win, even with a material
            // advantage.
            if pawns == 0 && us_npm - them_npm <= PieceType::Bishop.mg_value() {
                entry.factor[side] = if us_npm == them_npm
                    || us_npm < PieceType::Rook.mg_value()
                {
                    0
                } else {
                    match bishops {
                        2.. => 32,
                        1 => 12,
                        _ => 6,
                    }
                };
            }

            if bishops >= 2 {
                mg_value += sign * BISHOP_PAIR_MIDGAME_BONUS;
                eg_value += sign * BISHOP_PAIR_ENDGAME_BONUS;
            }

            // knights are stronger when there are many pawns on the board,
            // after Kaufman's "The Evaluation of Material Imbalances".
            mg_value += sign * knights * (pawns - 5) * 16;
            eg_value += sign * knights * (pawns - 5) * 16;

            // redundancy of major pieces, from the same paper.
            if rooks >= 1 {
                let v = (rooks - 1) * 32 + queens * 16;
                mg_value -= sign * v;
                eg_value -= sign * v;
            }
        }

        entry.mg_value = mg_value as i16;
        entry.eg_value = eg_value as i16;

        entry
    }
}

/// Plenty of material against a bare king.
fn is_kxk(pos: &Board, strong_side: Colour) -> bool {
    let weak_side = !strong_side;
    pos.non_pawn_material(weak_side) == 0
        && pos.piece_count(weak_side, PieceType::Pawn) == 0
        && pos.non_pawn_material(strong_side) >= PieceType::Rook.mg_value()
}

/// A lone bishop with pawns: candidate for the wrong-rook-pawn fortress.
fn is_kbpsk(pos: &Board, side: Colour) -> bool {
    pos.non_pawn_material(side) == PieceType::Bishop.mg_value()
        && pos.piece_count(side, PieceType::Bishop) == 1
        && pos.piece_count(side, PieceType::Pawn) >= 1
}

/// Queen against rook-and-pawns: candidate for the third-rank fortress.
fn is_kqkrps(pos: &Board, side: Colour) -> bool {
    pos.piece_count(side, PieceType::Pawn) == 0
        && pos.non_pawn_material(side) == PieceType::Queen.mg_value()
        && pos.piece_count(side, PieceType::Queen) == 1
        && pos.piece_count(!side, PieceType::Rook) == 1
        && pos.piece_count(!side, PieceType::Pawn) >= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endgame::SCALE_FACTOR_DRAW;

    const TABLE_SIZE: usize = 1024;

    fn board(fen: &str) -> Board {
        Board::from_fen(fen).unwrap()
    }

    #[test]
    fn bare_kings_are_a_dead_draw() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        let pos = board("8/8/8/8/4k3/8/8/4K3 w - - 0 1");
        let info = table.get(&pos);
        assert_eq!(info.base_factor(Colour::White), SCALE_FACTOR_DRAW);
        assert_eq!(info.base_factor(Colour::Black), SCALE_FACTOR_DRAW);
        assert!(pos.is_insufficient_material());
    }

    #[test]
    fn knn_is_hard_coded_drawn() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        let pos = board("8/8/8/8/3nn3/8/8/4K2k w - - 0 1");
        let info = table.get(&pos);
        assert_eq!(info.base_factor(Colour::White), SCALE_FACTOR_DRAW);
        assert_eq!(info.base_factor(Colour::Black), SCALE_FACTOR_DRAW);
        assert!(!info.specialized_eval_exists());
    }

    #[test]
    fn kxk_gets_the_generic_evaluator() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        let pos = board("4k3/8/8/8/8/8/8/2RQK3 w - - 0 1");
        let info = table.get(&pos);
        assert!(info.specialized_eval_exists());
        assert!(info.evaluate(&pos) > 0);
    }

    #[test]
    fn registered_endgames_are_recognised() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        // KBN vs K
        let pos = board("k7/8/8/8/8/8/8/2BNK3 w - - 0 1");
        assert!(table.get(&pos).specialized_eval_exists());
        // KRP vs KR gets a scaler, not an evaluator
        let pos = board("4k3/7r/8/8/8/8/3P4/3RK3 w - - 0 1");
        let info = table.get(&pos);
        assert!(!info.specialized_eval_exists());
        // the scaler is installed for the strong side only.
        assert_ne!(
            info.scaling_function[Colour::White].is_some(),
            info.scaling_function[Colour::Black].is_some(),
        );
    }

    #[test]
    fn lookups_are_idempotent() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        let pos = board("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let (first_mg, first_eg) = table.get(&pos).imbalance();
        let first_space = table.get(&pos).space_weight();
        let (second_mg, second_eg) = table.get(&pos).imbalance();
        assert_eq!((first_mg, first_eg), (second_mg, second_eg));
        assert_eq!(first_space, table.get(&pos).space_weight());
    }

    #[test]
    fn startpos_imbalance_is_symmetric() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        let pos = board("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let info = table.get(&pos);
        let (mg, eg) = info.imbalance();
        assert_eq!(mg, 0);
        assert_eq!(eg, 0);
        // full armies: 4 minors per side, space weight = 8^2.
        assert_eq!(info.space_weight(), 64);
        assert_eq!(info.base_factor(Colour::White), SCALE_FACTOR_NORMAL);
    }

    #[test]
    fn bishop_pair_and_knight_pawn_terms() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        // white has the bishop pair, black a knight; no pawns at all, queens
        // added to dodge the no-pawn drawish factors.
        let pos = board("3qk3/8/8/8/8/8/8/1BBQK3 w - - 0 1");
        let info = table.get(&pos);
        let (mg, eg) = info.imbalance();
        // bishop pair for white, minus black's knight term (0 knights):
        assert_eq!(mg, BISHOP_PAIR_MIDGAME_BONUS);
        assert_eq!(eg, BISHOP_PAIR_ENDGAME_BONUS);

        // knights lose value as pawns vanish: a knight with no pawns reads
        // -80 for its owner.
        let pos = board("3nk3/8/8/8/8/8/8/2NQK3 w - - 0 1");
        let (mg, _) = table.get(&pos).imbalance();
        assert_eq!(mg, 0); // symmetric: both sides have one knight, no pawns.

        let pos = board("3qk3/8/8/8/8/8/8/2NQK3 w - - 0 1");
        let (mg, eg) = table.get(&pos).imbalance();
        assert_eq!(mg, -80);
        assert_eq!(eg, -80);
    }

    #[test]
    fn rook_redundancy_penalty() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        // two white rooks + queen vs the same for black, minus a rook:
        let pos = board("3rk3/pppp4/8/8/8/8/PPPP4/R2RK3 w - - 0 1");
        let info = table.get(&pos);
        let (mg, _) = info.imbalance();
        // white: (2-1)*32 penalty; black: (1-1)*32 = 0.
        assert_eq!(mg, -32);
    }

    #[test]
    fn no_pawn_conversion_factors() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        // white is a whole rook up but has no pawns: still scaled, and the
        // imbalance machinery leaves factors untouched for black.
        let pos = board("3rk3/8/8/8/8/8/8/R2RK3 w - - 0 1");
        let info = table.get(&pos);
        // white leads by a rook > bishop: factor untouched.
        assert_eq!(info.base_factor(Colour::White), SCALE_FACTOR_NORMAL);

        // equal material, no pawns: dead-ish.
        let pos = board("3rk3/8/8/8/8/8/8/3RK3 w - - 0 1");
        let info = table.get(&pos);
        assert_eq!(info.base_factor(Colour::White), 0);
        assert_eq!(info.base_factor(Colour::Black), 0);
    }

    #[test]
    fn hard_to_convert_factor_scale() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        // white: two bishops + knight vs black rook + bishop: white lead is
        // (836*2 + 817) - (1301 + 836) = 352 <= bishop, white npm >= rook,
        // unequal: factor from the bishop count.
        let pos = board("1rb1k3/8/8/8/8/8/8/1BBNK3 w - - 0 1");
        let info = table.get(&pos);
        assert_eq!(info.base_factor(Colour::White), 32);
    }

    #[test]
    fn scaling_functions_compose_through_the_entry() {
        let mut table = MaterialInfoTable::new(TABLE_SIZE);

        // KRP vs KR, third-rank defence: pawn on b5, defending king on the
        // queening square, defending rook waiting on the sixth rank.
        let pos = board("1k6/8/7r/1P6/1K6/8/8/R7 w - - 0 1");
        let info = table.get(&pos);
        assert!(!info.specialized_eval_exists());
        assert_eq!(info.scale_factor(&pos, Colour::White), SCALE_FACTOR_DRAW);

        // king and rook-file pawns against the cornered defender.
        let pos = board("k7/8/8/8/8/P7/P7/K7 w - - 0 1");
        let info = table.get(&pos);
        assert_eq!(info.scale_factor(&pos, Colour::White), SCALE_FACTOR_DRAW);

        // the same pawns on separate files: no fortress, normal factor.
        let pos = board("k7/8/8/8/8/8/PP6/K7 w - - 0 1");
        let info = table.get(&pos);
        assert_eq!(info.scale_factor(&pos, Colour::White), SCALE_FACTOR_NORMAL);
    }

    #[test]
    fn synthetic_and_live_keys_agree_through_the_cache() {
        use crate::endgame::key_for_code;
        let mut table = MaterialInfoTable::new(TABLE_SIZE);
        let pos = board("4k3/8/8/8/8/8/1P6/1B2K3 w - - 0 1");
        assert_eq!(pos.material_key(), key_for_code("KBPK"));
        let info = table.get(&pos);
        assert_eq!(info.key(), key_for_code("KBPK"));
    }
}
