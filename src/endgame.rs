use std::collections::HashMap;

use crate::{
    bitbases,
    chess::{
        board::{material_key, movegen::king_attacks, movegen::pawn_attacks_by, Board},
        piece::{Colour, Piece, PieceType},
        piecelayout::PieceLayout,
        squareset::SquareSet,
        types::{File, Rank, Square},
    },
};

pub const SCALE_FACTOR_DRAW: u8 = 0;
pub const SCALE_FACTOR_NORMAL: u8 = 64;
pub const SCALE_FACTOR_MAX: u8 = 128;

pub const VALUE_DRAW: i32 = 0;
pub const VALUE_KNOWN_WIN: i32 = 10000;

/// A specialized evaluator for a recognised material signature. Scores are
/// returned from the side-to-move's point of view.
pub type EvalFn = fn(&Board, Colour) -> i32;

/// A scaling function: `None` means no opinion, and the caller falls back to
/// the material entry's base factor.
pub type ScaleFn = fn(&Board, Colour) -> Option<u8>;

// Tables for driving a lone king where we want it: to any edge, to a corner
// of the bishop's colour, close to or away from another piece.
#[rustfmt::skip]
static PUSH_TO_EDGES: [i32; 64] = [
    100, 90, 80, 70, 70, 80, 90, 100,
     90, 70, 60, 50, 50, 60, 70,  90,
     80, 60, 40, 30, 30, 40, 60,  80,
     70, 50, 30, 20, 20, 30, 50,  70,
     70, 50, 30, 20, 20, 30, 50,  70,
     80, 60, 40, 30, 30, 40, 60,  80,
     90, 70, 60, 50, 50, 60, 70,  90,
    100, 90, 80, 70, 70, 80, 90, 100,
];

#[rustfmt::skip]
static PUSH_TO_CORNERS: [i32; 64] = [
    200, 190, 180, 170, 160, 150, 140, 130,
    190, 180, 170, 160, 150, 140, 130, 140,
    180, 170, 155, 140, 140, 125, 140, 150,
    170, 160, 140, 120, 110, 140, 150, 160,
    160, 150, 140, 110, 120, 140, 160, 170,
    150, 140, 125, 140, 140, 155, 170, 180,
    140, 130, 140, 150, 160, 170, 180, 190,
    130, 140, 150, 160, 170, 180, 190, 200,
];

static PUSH_CLOSE: [i32; 8] = [0, 0, 100, 80, 60, 40, 20, 10];
static PUSH_AWAY: [i32; 8] = [0, 5, 20, 40, 60, 80, 90, 100];

/// The keyed maps from material signature to specialized function. Built at
/// construction; per-task, so no locking is ever needed.
pub struct EndgameFunctions {
    evaluations: HashMap<u64, (Colour, EvalFn)>,
    scalings: HashMap<u64, (Colour, ScaleFn)>,
    knnk_key: u64,
    kknn_key: u64,
}

impl Default for EndgameFunctions {
    fn default() -> Self {
        Self::new()
    }
}

impl EndgameFunctions {
    pub fn new() -> Self {
        let mut out = Self {
            evaluations: HashMap::new(),
            scalings: HashMap::new(),
            knnk_key: key_for_code("KNNK"),
            kknn_key: key_for_code("KKNN"),
        };

        out.add_eval("KPK", Colour::White, evaluate_kpk);
        out.add_eval("KKP", Colour::Black, evaluate_kpk);
        out.add_eval("KBNK", Colour::White, evaluate_kbnk);
        out.add_eval("KKBN", Colour::Black, evaluate_kbnk);
        out.add_eval("KRKP", Colour::White, evaluate_krkp);
        out.add_eval("KPKR", Colour::Black, evaluate_krkp);
        out.add_eval("KRKB", Colour::White, evaluate_krkb);
        out.add_eval("KBKR", Colour::Black, evaluate_krkb);
        out.add_eval("KRKN", Colour::White, evaluate_krkn);
        out.add_eval("KNKR", Colour::Black, evaluate_krkn);
        out.add_eval("KQKR", Colour::White, evaluate_kqkr);
        out.add_eval("KRKQ", Colour::Black, evaluate_kqkr);
        out.add_eval("KBBKN", Colour::White, evaluate_kbbkn);
        out.add_eval("KNKBB", Colour::Black, evaluate_kbbkn);

        out.add_scale("KNPK", Colour::White, scale_knpk);
        out.add_scale("KKNP", Colour::Black, scale_knpk);
        out.add_scale("KRPKR", Colour::White, scale_krpkr);
        out.add_scale("KRKRP", Colour::Black, scale_krpkr);
        out.add_scale("KBPKB", Colour::White, scale_kbpkb);
        out.add_scale("KBKBP", Colour::Black, scale_kbpkb);
        out.add_scale("KBPPKB", Colour::White, scale_kbppkb);
        out.add_scale("KBKBPP", Colour::Black, scale_kbppkb);
        out.add_scale("KBPKN", Colour::White, scale_kbpkn);
        out.add_scale("KNKBP", Colour::Black, scale_kbpkn);
        out.add_scale("KRPPKRP", Colour::White, scale_krppkrp);
        out.add_scale("KRPKRPP", Colour::Black, scale_krppkrp);

        out
    }

    fn add_eval(&mut self, code: &str, strong_side: Colour, f: EvalFn) {
        // an insert for an already-registered key is a no-op.
        self.evaluations
            .entry(key_for_code(code))
            .or_insert((strong_side, f));
    }

    fn add_scale(&mut self, code: &str, strong_side: Colour, f: ScaleFn) {
        self.scalings
            .entry(key_for_code(code))
            .or_insert((strong_side, f));
    }

    pub fn get_evaluation(&self, key: u64) -> Option<(Colour, EvalFn)> {
        self.evaluations.get(&key).copied()
    }

    pub fn get_scaling(&self, key: u64) -> Option<(Colour, ScaleFn)> {
        self.scalings.get(&key).copied()
    }

    pub const fn knnk_key(&self) -> u64 {
        self.knnk_key
    }

    pub const fn kknn_key(&self) -> u64 {
        self.kknn_key
    }
}

/// Turns a material code string like "KBPK" into a material key, by placing
/// the pieces of a minimal synthetic position and hashing them through the
/// same pipeline as live boards. The first 'K' opens the white pieces, the
/// second switches to black. Placement is irrelevant to the key, so pieces
/// go on successive squares.
pub fn key_for_code(code: &str) -> u64 {
    assert!(code.starts_with('K') && code.len() < 8, "bad material code {code}");

    let mut layout = PieceLayout::default();
    let mut white = false;
    let mut squares = Square::all();
    for c in code.chars() {
        if c == 'K' {
            white = !white;
        }
        let colour = if white { Colour::White } else { Colour::Black };
        let pt = match c {
            'K' => PieceType::King,
            'Q' => PieceType::Queen,
            'R' => PieceType::Rook,
            'B' => PieceType::Bishop,
            'N' => PieceType::Knight,
            'P' => PieceType::Pawn,
            _ => panic!("bad piece letter '{c}' in material code {code}"),
        };
        let sq = squares.next().expect("more pieces than squares");
        layout.set_piece_at(sq, Piece::new(colour, pt));
    }

    material_key(&layout)
}

fn verify_material(pos: &Board, side: Colour, npm: i32, pawn_count: u8) -> bool {
    pos.non_pawn_material(side) == npm && pos.piece_count(side, PieceType::Pawn) == pawn_count
}

/// Map the square as if the strong side were white and its only pawn were on
/// the left half of the board.
fn normalize(pos: &Board, strong_side: Colour, sq: Square) -> Square {
    debug_assert_eq!(pos.piece_count(strong_side, PieceType::Pawn), 1);

    let sq = if pos.piece_square(strong_side, PieceType::Pawn).file() >= File::E {
        sq.flip_file()
    } else {
        sq
    };

    sq.relative_to(strong_side)
}

fn signed(result: i32, pos: &Board, strong_side: Colour) -> i32 {
    if strong_side == pos.turn() {
        result
    } else {
        -result
    }
}

fn dist(a: Square, b: Square) -> usize {
    Square::distance(a, b) as usize
}

/// Mate with KX vs K. Used for positions with king and plenty of material
/// against a lone king: bonus for driving the defending king towards the
/// edge and keeping the kings close.
pub fn evaluate_kxk(pos: &Board, strong_side: Colour) -> i32 {
    let weak_side = !strong_side;

    debug_assert!(verify_material(pos, weak_side, 0, 0));
    debug_assert!(pos.checkers().is_empty());

    // stalemate detection with the lone king.
    if pos.turn() == weak_side && pos.legal_moves().is_empty() {
        return VALUE_DRAW;
    }

    let winner_ksq = pos.king_sq(strong_side);
    let loser_ksq = pos.king_sq(weak_side);

    let mut result = pos.non_pawn_material(strong_side)
        + i32::from(pos.piece_count(strong_side, PieceType::Pawn)) * PieceType::Pawn.eg_value()
        + PUSH_TO_EDGES[loser_ksq.index()]
        + PUSH_CLOSE[dist(winner_ksq, loser_ksq)];

    let bbs = pos.piece_layout();
    let bishops = bbs.all_bishops();
    let can_force_mate = (bbs.all_queens() | bbs.all_rooks()).non_empty()
        || (bishops.non_empty() && bbs.all_knights().non_empty())
        || ((bishops & SquareSet::LIGHT_SQUARES).non_empty()
            && (bishops & SquareSet::DARK_SQUARES).non_empty());
    if can_force_mate {
        result += VALUE_KNOWN_WIN;
    }

    signed(result, pos, strong_side)
}

/// Minor piece against minor piece with no pawns: nobody can force anything.
pub fn evaluate_kmm_km(_pos: &Board, _strong_side: Colour) -> i32 {
    VALUE_DRAW
}

/// KP vs K, decided exactly by the bitbase.
fn evaluate_kpk(pos: &Board, strong_side: Colour) -> i32 {
    let weak_side = !strong_side;

    debug_assert!(verify_material(pos, strong_side, 0, 1));
    debug_assert!(verify_material(pos, weak_side, 0, 0));

    // probe with the strong side mapped to white.
    let us = if strong_side == pos.turn() {
        Colour::White
    } else {
        Colour::Black
    };
    let wksq = normalize(pos, strong_side, pos.king_sq(strong_side));
    let bksq = normalize(pos, strong_side, pos.king_sq(weak_side));
    let psq = normalize(pos, strong_side, pos.piece_square(strong_side, PieceType::Pawn));

    if !bitbases::probe(wksq, psq, bksq, us) {
        return VALUE_DRAW;
    }

    let result = VALUE_KNOWN_WIN + PieceType::Pawn.eg_value() + psq.rank().index() as i32;
    signed(result, pos, strong_side)
}

/// Mate with KBN vs K: drive the defending king to a corner of the bishop's
/// colour.
fn evaluate_kbnk(pos: &Board, strong_side: Colour) -> i32 {
    let weak_side = !strong_side;

    debug_assert!(verify_material(
        pos,
        strong_side,
        PieceType::Knight.mg_value() + PieceType::Bishop.mg_value(),
        0
    ));
    debug_assert!(verify_material(pos, weak_side, 0, 0));

    let mut winner_ksq = pos.king_sq(strong_side);
    let mut loser_ksq = pos.king_sq(weak_side);
    let bishop_sq = pos.piece_square(strong_side, PieceType::Bishop);

    // PUSH_TO_CORNERS drives towards A1 or H8; with a bishop that cannot
    // reach those corners, mirror the kings so we drive towards A8/H1.
    if !Square::same_colour(bishop_sq, Square::A1) {
        winner_ksq = winner_ksq.flip_file();
        loser_ksq = loser_ksq.flip_file();
    }

    let result = VALUE_KNOWN_WIN
        + PUSH_CLOSE[dist(winner_ksq, loser_ksq)]
        + PUSH_TO_CORNERS[loser_ksq.index()];

    signed(result, pos, strong_side)
}

/// KR vs KP: drawish when the pawn is far advanced with king support and the
/// attacking king is far away.
fn evaluate_krkp(pos: &Board, strong_side: Colour) -> i32 {
    let weak_side = !strong_side;

    debug_assert!(verify_material(pos, strong_side, PieceType::Rook.mg_value(), 0));
    debug_assert!(verify_material(pos, weak_side, 0, 1));

    let wksq = pos.king_sq(strong_side).relative_to(strong_side);
    let bksq = pos.king_sq(weak_side).relative_to(strong_side);
    let rsq = pos.piece_square(strong_side, PieceType::Rook).relative_to(strong_side);
    let psq = pos.piece_square(weak_side, PieceType::Pawn).relative_to(strong_side);

    let queening_sq = Square::from_rank_file(Rank::One, psq.file());
    // the pawn runs towards rank one in the relative frame.
    let stop_sq = psq.sub(8).unwrap_or(queening_sq);

    let result;
    if wksq < psq && wksq.file() == psq.file() {
        // the strong king is in front of the pawn: a win.
        result = PieceType::Rook.eg_value() - dist(wksq, psq) as i32;
    } else if bksq.rank() <= Rank::Three
        && dist(bksq, psq) == 1
        && wksq.rank() >= Rank::Four
        && dist(wksq, psq) > 2 + usize::from(pos.turn() == strong_side)
    {
        // the pawn is far advanced and supported by the defending king:
        // drawish.
        result = 80 - 8 * dist(wksq, psq) as i32;
    } else {
        result = 200
            - 8 * (dist(wksq, stop_sq) as i32
                - dist(bksq, stop_sq) as i32
                - dist(psq, queening_sq) as i32);
    }

    signed(result, pos, strong_side)
}

/// KR vs KB: always drawish, slightly better when the defending king is near
/// an edge.
fn evaluate_krkb(pos: &Board, strong_side: Colour) -> i32 {
    debug_assert!(verify_material(pos, strong_side, PieceType::Rook.mg_value(), 0));
    debug_assert!(verify_material(pos, !strong_side, PieceType::Bishop.mg_value(), 0));

    let result = PUSH_TO_EDGES[pos.king_sq(!strong_side).index()];
    signed(result, pos, strong_side)
}

/// KR vs KN: slightly better winning chances than against a bishop,
/// especially when king and knight are far apart.
fn evaluate_krkn(pos: &Board, strong_side: Colour) -> i32 {
    let weak_side = !strong_side;

    debug_assert!(verify_material(pos, strong_side, PieceType::Rook.mg_value(), 0));
    debug_assert!(verify_material(pos, weak_side, PieceType::Knight.mg_value(), 0));

    let bksq = pos.king_sq(weak_side);
    let bnsq = pos.piece_square(weak_side, PieceType::Knight);
    let result = PUSH_TO_EDGES[bksq.index()] + PUSH_AWAY[dist(bksq, bnsq)];

    signed(result, pos, strong_side)
}

/// KQ vs KR: force the kings together and the defender to the edge.
fn evaluate_kqkr(pos: &Board, strong_side: Colour) -> i32 {
    let weak_side = !strong_side;

    debug_assert!(verify_material(pos, strong_side, PieceType::Queen.mg_value(), 0));
    debug_assert!(verify_material(pos, weak_side, PieceType::Rook.mg_value(), 0));

    let winner_ksq = pos.king_sq(strong_side);
    let loser_ksq = pos.king_sq(weak_side);

    let result = PieceType::Queen.eg_value() - PieceType::Rook.eg_value()
        + PUSH_TO_EDGES[loser_ksq.index()]
        + PUSH_CLOSE[dist(winner_ksq, loser_ksq)];

    signed(result, pos, strong_side)
}

/// KBB vs KN: a theoretical win, but a long grind; steer rather than claim.
fn evaluate_kbbkn(pos: &Board, strong_side: Colour) -> i32 {
    let weak_side = !strong_side;

    debug_assert_eq!(pos.piece_count(strong_side, PieceType::Bishop), 2);
    debug_assert!(verify_material(pos, weak_side, PieceType::Knight.mg_value(), 0));

    let winner_ksq = pos.king_sq(strong_side);
    let loser_ksq = pos.king_sq(weak_side);
    let nsq = pos.piece_square(weak_side, PieceType::Knight);

    let result = 2 * PieceType::Bishop.eg_value() - PieceType::Knight.eg_value()
        + PUSH_TO_EDGES[loser_ksq.index()]
        + PUSH_CLOSE[dist(winner_ksq, loser_ksq)]
        + PUSH_AWAY[dist(loser_ksq, nsq)];

    signed(result, pos, strong_side)
}

// ----------------------------------------------------------------------
// scaling functions

/// KNP vs K: a rook pawn on the seventh with the defender in the corner
/// cannot be converted.
fn scale_knpk(pos: &Board, strong_side: Colour) -> Option<u8> {
    debug_assert!(verify_material(pos, strong_side, PieceType::Knight.mg_value(), 1));

    let psq = normalize(pos, strong_side, pos.piece_square(strong_side, PieceType::Pawn));
    let weak_ksq = normalize(pos, strong_side, pos.king_sq(!strong_side));

    if psq == Square::A7 && dist(Square::A8, weak_ksq) <= 1 {
        return Some(SCALE_FACTOR_DRAW);
    }
    None
}

/// KRP vs KR: the classic third-rank defence, with the defending king on the
/// queening square.
fn scale_krpkr(pos: &Board, strong_side: Colour) -> Option<u8> {
    debug_assert!(verify_material(pos, strong_side, PieceType::Rook.mg_value(), 1));
    debug_assert!(verify_material(pos, !strong_side, PieceType::Rook.mg_value(), 0));

    let wksq = normalize(pos, strong_side, pos.king_sq(strong_side));
    let bksq = normalize(pos, strong_side, pos.king_sq(!strong_side));
    let wrsq = normalize(pos, strong_side, pos.piece_square(strong_side, PieceType::Rook));
    let psq = normalize(pos, strong_side, pos.piece_square(strong_side, PieceType::Pawn));
    let brsq = normalize(pos, strong_side, pos.piece_square(!strong_side, PieceType::Rook));

    let r = psq.rank();
    let queening_sq = Square::from_rank_file(Rank::Eight, psq.file());

    // if the pawn is not too far advanced and the defending king defends the
    // queening square, the third-rank defence holds.
    if r <= Rank::Five
        && dist(bksq, queening_sq) <= 1
        && wksq.rank() <= Rank::Five
        && (brsq.rank() == Rank::Six || (r <= Rank::Three && wrsq.rank() != Rank::Six))
    {
        return Some(SCALE_FACTOR_DRAW);
    }
    None
}

/// KBP vs KB: wrong-coloured blockades.
fn scale_kbpkb(pos: &Board, strong_side: Colour) -> Option<u8> {
    debug_assert!(verify_material(pos, strong_side, PieceType::Bishop.mg_value(), 1));
    debug_assert!(verify_material(pos, !strong_side, PieceType::Bishop.mg_value(), 0));

    let psq = pos.piece_square(strong_side, PieceType::Pawn);
    let strong_bsq = pos.piece_square(strong_side, PieceType::Bishop);
    let weak_bsq = pos.piece_square(!strong_side, PieceType::Bishop);
    let weak_ksq = pos.king_sq(!strong_side);

    // the defending king blocks the pawn on a square its bishop cannot be
    // driven from.
    if weak_ksq.file() == psq.file()
        && psq.rank().relative_to(strong_side) < weak_ksq.rank().relative_to(strong_side)
        && !Square::same_colour(weak_ksq, strong_bsq)
    {
        return Some(SCALE_FACTOR_DRAW);
    }

    // opposite-coloured bishops: dead drawn unless the pawn is about to
    // touch down.
    if !Square::same_colour(strong_bsq, weak_bsq)
        && psq.rank().relative_to(strong_side) < Rank::Seven
    {
        return Some(SCALE_FACTOR_DRAW);
    }
    None
}

/// KBPP vs KB with opposite-coloured bishops: the defender holds if his king
/// stands in front of the pawns.
fn scale_kbppkb(pos: &Board, strong_side: Colour) -> Option<u8> {
    debug_assert!(verify_material(pos, strong_side, PieceType::Bishop.mg_value(), 2));
    debug_assert!(verify_material(pos, !strong_side, PieceType::Bishop.mg_value(), 0));

    let strong_bsq = pos.piece_square(strong_side, PieceType::Bishop);
    let weak_bsq = pos.piece_square(!strong_side, PieceType::Bishop);
    if Square::same_colour(strong_bsq, weak_bsq) {
        return None;
    }

    let weak_ksq = pos.king_sq(!strong_side);
    let pawns = pos.piece_squares(strong_side, PieceType::Pawn);
    let blocking = pawns.iter().all(|&psq| {
        weak_ksq.file().abs_diff(psq.file()) <= 1
            && psq.rank().relative_to(strong_side) < weak_ksq.rank().relative_to(strong_side)
    });
    if blocking {
        return Some(SCALE_FACTOR_DRAW);
    }
    None
}

/// KBP vs KN: a wrong-coloured rook pawn held by the defending king.
fn scale_kbpkn(pos: &Board, strong_side: Colour) -> Option<u8> {
    debug_assert!(verify_material(pos, strong_side, PieceType::Bishop.mg_value(), 1));
    debug_assert!(verify_material(pos, !strong_side, PieceType::Knight.mg_value(), 0));

    let psq = pos.piece_square(strong_side, PieceType::Pawn);
    if psq.file() != File::A && psq.file() != File::H {
        return None;
    }
    let queening_sq =
        Square::from_rank_file(Rank::Eight.relative_to(strong_side), psq.file());
    let bishop_sq = pos.piece_square(strong_side, PieceType::Bishop);
    let weak_ksq = pos.king_sq(!strong_side);

    if !Square::same_colour(queening_sq, bishop_sq) && dist(queening_sq, weak_ksq) <= 1 {
        return Some(SCALE_FACTOR_DRAW);
    }
    None
}

/// KRPP vs KRP: with no passed pawn and the defending king in front, the
/// extra pawn rarely converts.
fn scale_krppkrp(pos: &Board, strong_side: Colour) -> Option<u8> {
    debug_assert!(verify_material(pos, strong_side, PieceType::Rook.mg_value(), 2));
    debug_assert!(verify_material(pos, !strong_side, PieceType::Rook.mg_value(), 1));

    let weak_ksq = pos.king_sq(!strong_side);
    let pawns = pos.piece_squares(strong_side, PieceType::Pawn).to_vec();

    let any_passed = pawns.iter().any(|&psq| pos.pawn_is_passed(strong_side, psq));
    if any_passed {
        return None;
    }

    let king_in_front = pawns.iter().all(|&psq| {
        weak_ksq.file().abs_diff(psq.file()) <= 1
            && psq.rank().relative_to(strong_side) < weak_ksq.rank().relative_to(strong_side)
    });
    if king_in_front {
        return Some(32);
    }
    None
}

/// KB and pawns vs K: all pawns on a rook file with the wrong bishop is the
/// oldest fortress in the book.
pub fn scale_kbpsk(pos: &Board, strong_side: Colour) -> Option<u8> {
    debug_assert_eq!(pos.non_pawn_material(strong_side), PieceType::Bishop.mg_value());
    debug_assert!(pos.piece_count(strong_side, PieceType::Pawn) >= 1);

    let bbs = pos.piece_layout();
    let pawns = bbs.all_pawns() & bbs.occupied_co(strong_side);
    let pawns_file = pawns.first().unwrap().file();

    // all pawns on a single rook file?
    if (pawns_file == File::A || pawns_file == File::H)
        && (pawns & !SquareSet::FILES[pawns_file]).is_empty()
    {
        let bishop_sq = pos.piece_square(strong_side, PieceType::Bishop);
        let queening_sq =
            Square::from_rank_file(Rank::Eight.relative_to(strong_side), pawns_file);
        let king_sq = pos.king_sq(!strong_side);

        if !Square::same_colour(queening_sq, bishop_sq) && dist(queening_sq, king_sq) <= 1 {
            return Some(SCALE_FACTOR_DRAW);
        }
    }
    None
}

/// KQ vs KR with pawns: a fortress with the rook on the third rank defended
/// by a pawn.
pub fn scale_kqkrps(pos: &Board, strong_side: Colour) -> Option<u8> {
    let weak_side = !strong_side;

    debug_assert!(verify_material(pos, strong_side, PieceType::Queen.mg_value(), 0));
    debug_assert_eq!(pos.piece_count(weak_side, PieceType::Rook), 1);
    debug_assert!(pos.piece_count(weak_side, PieceType::Pawn) >= 1);

    let king_sq = pos.king_sq(weak_side);
    let rsq = pos.piece_square(weak_side, PieceType::Rook);
    let bbs = pos.piece_layout();

    if king_sq.rank().relative_to(weak_side) <= Rank::Two
        && pos.king_sq(strong_side).rank().relative_to(weak_side) >= Rank::Four
        && rsq.rank().relative_to(weak_side) == Rank::Three
        && (bbs.all_pawns()
            & bbs.occupied_co(weak_side)
            & king_attacks(king_sq)
            & pawn_attacks_by(rsq.as_set(), strong_side))
        .non_empty()
    {
        return Some(SCALE_FACTOR_DRAW);
    }
    None
}

/// King and pawns vs lone king: only the rook-file corner fortress draws.
pub fn scale_kpsk(pos: &Board, strong_side: Colour) -> Option<u8> {
    debug_assert_eq!(pos.non_pawn_material(strong_side), 0);
    debug_assert!(pos.piece_count(strong_side, PieceType::Pawn) >= 2);
    debug_assert!(verify_material(pos, !strong_side, 0, 0));

    let bbs = pos.piece_layout();
    let pawns = bbs.all_pawns() & bbs.occupied_co(strong_side);
    let king_sq = pos.king_sq(!strong_side);

    // all pawns on a single rook file, defender in the corner.
    for file in [File::A, File::H] {
        if (pawns & !SquareSet::FILES[file]).is_empty() {
            let queening_sq = Square::from_rank_file(Rank::Eight.relative_to(strong_side), file);
            if dist(queening_sq, king_sq) <= 1 {
                return Some(SCALE_FACTOR_DRAW);
            }
        }
    }
    None
}

/// KP vs KP: if our king-and-pawn against a bare king would not win, the
/// extra enemy pawn certainly does not help.
pub fn scale_kpkp(pos: &Board, strong_side: Colour) -> Option<u8> {
    debug_assert!(verify_material(pos, strong_side, 0, 1));
    debug_assert!(verify_material(pos, !strong_side, 0, 1));

    let wksq = normalize(pos, strong_side, pos.king_sq(strong_side));
    let bksq = normalize(pos, strong_side, pos.king_sq(!strong_side));
    let psq = normalize(pos, strong_side, pos.piece_square(strong_side, PieceType::Pawn));

    let us = if strong_side == pos.turn() {
        Colour::White
    } else {
        Colour::Black
    };

    if bitbases::probe(wksq, psq, bksq, us) {
        None
    } else {
        Some(SCALE_FACTOR_DRAW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_keys_match_live_positions() {
        let live = Board::from_fen("4k3/8/8/8/8/8/1P6/2B1K3 w - - 0 1").unwrap();
        assert_eq!(key_for_code("KBPK"), live.material_key());

        let live = Board::from_fen("4k3/1p6/5n2/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(key_for_code("KKNP"), live.material_key());

        // placement never matters.
        let a = Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let b = Board::from_fen("k7/8/8/8/7R/8/8/7K w - - 0 1").unwrap();
        assert_eq!(a.material_key(), b.material_key());
        assert_eq!(key_for_code("KRK"), a.material_key());
    }

    #[test]
    fn registry_lookups() {
        let funcs = EndgameFunctions::new();
        let (side, _) = funcs.get_evaluation(key_for_code("KBNK")).unwrap();
        assert_eq!(side, Colour::White);
        let (side, _) = funcs.get_evaluation(key_for_code("KKBN")).unwrap();
        assert_eq!(side, Colour::Black);
        let (side, _) = funcs.get_scaling(key_for_code("KRPKR")).unwrap();
        assert_eq!(side, Colour::White);
        assert!(funcs.get_evaluation(key_for_code("KRKR")).is_none());

        let knn = Board::from_fen("4k3/8/8/8/8/8/8/1NN1K3 w - - 0 1").unwrap();
        assert_eq!(funcs.knnk_key(), knn.material_key());
    }

    #[test]
    fn kxk_prefers_cornered_kings() {
        let central =
            Board::from_fen("8/8/8/4k3/8/8/3Q4/4K3 w - - 0 1").unwrap();
        let cornered = Board::from_fen("7k/8/8/8/8/8/4Q3/4K3 w - - 0 1").unwrap();
        let central_score = evaluate_kxk(&central, Colour::White);
        let cornered_score = evaluate_kxk(&cornered, Colour::White);
        assert!(cornered_score > central_score);
        assert!(central_score > VALUE_KNOWN_WIN);
    }

    #[test]
    fn kxk_stalemate_is_draw() {
        // black to move, no legal moves, not in check.
        let pos = Board::from_fen("k7/2Q5/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert!(pos.is_stalemate());
        assert_eq!(evaluate_kxk(&pos, Colour::White), VALUE_DRAW);
    }

    #[test]
    fn kpk_decides_by_bitbase() {
        // defended queening corner of a rook pawn: drawn.
        let drawn = Board::from_fen("k7/8/8/8/P7/8/8/K7 w - - 0 1").unwrap();
        assert_eq!(evaluate_kpk(&drawn, Colour::White), VALUE_DRAW);

        // king ahead of the pawn on the sixth: winning.
        let won = Board::from_fen("8/8/1K6/1P6/8/8/8/1k6 w - - 0 1").unwrap();
        assert!(evaluate_kpk(&won, Colour::White) > VALUE_KNOWN_WIN);
    }

    #[test]
    fn kpkp_scaler_flags_dead_draws() {
        // both sides have a blocked rook pawn, defenders in the corners.
        let pos = Board::from_fen("k7/p7/P7/8/8/8/8/K7 w - - 0 1").unwrap();
        assert_eq!(scale_kpkp(&pos, Colour::White), Some(SCALE_FACTOR_DRAW));
    }

    #[test]
    fn wrong_bishop_fortress() {
        // all white pawns on the a-file, dark-squared bishop, black king on a8:
        // the bishop can never evict the king from the light corner.
        let pos = Board::from_fen("k7/8/8/8/P7/P7/1B6/4K3 w - - 0 1").unwrap();
        assert_eq!(scale_kbpsk(&pos, Colour::White), Some(SCALE_FACTOR_DRAW));

        // light-squared bishop controls a8: no fortress.
        let pos = Board::from_fen("k7/8/8/8/P7/P2B4/8/4K3 w - - 0 1").unwrap();
        assert_eq!(scale_kbpsk(&pos, Colour::White), None);
    }
}
