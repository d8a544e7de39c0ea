pub mod movegen;
pub mod validation;

use std::{
    fmt::{self, Debug, Display, Formatter, Write as _},
    sync::atomic::Ordering,
};

use crate::{
    chess::{
        board::movegen::{pawn_attacks_by, MoveList},
        chessmove::Move,
        fen::Fen,
        piece::{Colour, Piece, PieceType},
        squareset::SquareSet,
        types::{File, Keys, Rank, Square, State},
        CHESS960,
    },
    errors::{FenParseError, MoveParseError},
    lookups::{outpost_mask, passed_pawn_mask, CASTLE_KEYS, EP_KEYS, MATERIAL_KEYS, PIECE_KEYS, SIDE_KEY},
    piecesquaretable::{pst_delta, pst_value},
};

/// Game phase bounds: total non-pawn material is interpolated between these
/// into [0, 128].
pub const MIDGAME_LIMIT: i32 = 15713;
pub const ENDGAME_LIMIT: i32 = 4428;
pub const PHASE_MIDGAME: i32 = 128;
pub const PHASE_ENDGAME: i32 = 0;

#[derive(PartialEq, Eq, Clone)]
pub struct Board {
    /// Copyable state for the board.
    pub(crate) state: State,
    /// The side to move.
    side: Colour,
    /// The number of half moves made since the start of the game.
    ply: usize,
    /// Distance from the root of the current search.
    height: usize,
    history: Vec<State>,
}

impl Debug for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("side", &self.side)
            .field("ep_sq", &self.state.ep_square)
            .field("fifty_move_counter", &self.state.fifty_move_counter)
            .field("height", &self.height)
            .field("ply", &self.ply)
            .field("key", &self.state.keys.zobrist)
            .field("checkers", &self.state.checkers)
            .field("castle_perm", &self.state.castle_perm)
            .finish_non_exhaustive()
    }
}

impl Board {
    pub const STARTING_FEN: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    pub const STARTING_FEN_960: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w AHah - 0 1";

    pub fn empty() -> Self {
        Self {
            state: State::default(),
            side: Colour::White,
            ply: 0,
            height: 0,
            history: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.state = State::default();
        self.side = Colour::White;
        self.ply = 0;
        self.height = 0;
        self.history.clear();
    }

    // ------------------------------------------------------------------
    // accessors

    pub const fn turn(&self) -> Colour {
        self.side
    }

    pub const fn ep_sq(&self) -> Option<Square> {
        self.state.ep_square
    }

    pub const fn ply(&self) -> usize {
        self.ply
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn rule50(&self) -> u8 {
        self.state.fifty_move_counter
    }

    pub const fn castling_rights(&self) -> crate::chess::types::CastlingRights {
        self.state.castle_perm
    }

    pub const fn checkers(&self) -> SquareSet {
        self.state.checkers
    }

    pub fn in_check(&self) -> bool {
        self.state.checkers.non_empty()
    }

    pub const fn key(&self) -> u64 {
        self.state.keys.zobrist
    }

    pub const fn pawn_key(&self) -> u64 {
        self.state.keys.pawn
    }

    pub const fn material_key(&self) -> u64 {
        self.state.keys.material
    }

    pub const fn mg_value(&self) -> i32 {
        self.state.mg_value
    }

    pub const fn eg_value(&self) -> i32 {
        self.state.eg_value
    }

    pub fn non_pawn_material(&self, side: Colour) -> i32 {
        self.state.np_material[side]
    }

    pub const fn captured_piece_type(&self) -> Option<PieceType> {
        self.state.capture
    }

    pub const fn piece_layout(&self) -> &crate::chess::piecelayout::PieceLayout {
        &self.state.bbs
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.state.mailbox[sq]
    }

    pub fn king_sq(&self, side: Colour) -> Square {
        self.state.bbs.king_sq(side)
    }

    pub fn piece_count(&self, side: Colour, piece_type: PieceType) -> u8 {
        self.state.lists.count_of(side, piece_type)
    }

    /// The squares occupied by pieces of a kind, densest-access form.
    pub fn piece_squares(&self, side: Colour, piece_type: PieceType) -> &[Square] {
        self.state.lists.squares(Piece::new(side, piece_type))
    }

    /// The single square of a piece the caller knows to be unique.
    pub fn piece_square(&self, side: Colour, piece_type: PieceType) -> Square {
        self.piece_squares(side, piece_type)[0]
    }

    pub fn history(&self) -> &[State] {
        &self.history
    }

    // ------------------------------------------------------------------
    // construction

    pub fn from_fen(fen: &str) -> Result<Self, FenParseError> {
        let parsed = Fen::parse(fen)?;
        let mut out = Self::empty();
        out.set_from_fen(&parsed);
        Ok(out)
    }

    pub fn set_startpos(&mut self) {
        let starting_fen = if CHESS960.load(Ordering::SeqCst) {
            Self::STARTING_FEN_960
        } else {
            Self::STARTING_FEN
        };
        let fen = Fen::parse(starting_fen).expect("STARTING_FEN is broken");
        self.set_from_fen(&fen);
    }

    pub fn set_from_fen(&mut self, fen: &Fen) {
        self.reset();

        self.state.bbs = fen.board;
        let bbs = self.state.bbs;
        bbs.visit_pieces(|sq, piece| {
            self.state.mailbox[sq] = Some(piece);
            self.state.lists.insert(piece, sq);
            let (mg, eg) = pst_value(piece, sq);
            self.state.mg_value += mg;
            self.state.eg_value += eg;
            let pt = piece.piece_type();
            if pt != PieceType::Pawn && pt != PieceType::King {
                self.state.np_material[piece.colour()] += pt.mg_value();
            }
        });

        self.side = fen.turn;
        self.state.castle_perm = fen.castling;
        self.state.ep_square = fen.ep;
        self.state.fifty_move_counter = fen.halfmove;
        self.ply = (fen.fullmove.get() - 1) * 2;
        if self.side == Colour::Black {
            self.ply += 1;
        }

        // clear en passant squares no pawn stands ready to capture on:
        if let Some(ep_sq) = self.state.ep_square {
            let sources = pawn_attacks_by(ep_sq.as_set(), !self.side);
            let our_pawns =
                self.state.bbs.all_pawns() & self.state.bbs.occupied_co(self.side);
            if (sources & our_pawns).is_empty() {
                self.state.ep_square = None;
            }
        }

        // generate derived state
        self.state.keys = self.generate_pos_keys();
        self.regenerate_check_info();
    }

    /// Computes all three hash keys from scratch. The incremental copies in
    /// the live state must always agree with this.
    pub fn generate_pos_keys(&self) -> Keys {
        let mut keys = Keys::default();
        self.state.bbs.visit_pieces(|sq, piece| {
            let key = PIECE_KEYS[piece][sq.index()];
            keys.zobrist ^= key;
            if piece.piece_type() == PieceType::Pawn {
                keys.pawn ^= key;
            }
        });

        if self.side == Colour::Black {
            keys.zobrist ^= SIDE_KEY;
        }
        if let Some(ep_sq) = self.state.ep_square {
            keys.zobrist ^= EP_KEYS[ep_sq.file()];
        }
        keys.zobrist ^= CASTLE_KEYS[self.state.castle_perm.hashkey_index()];

        keys.material = material_key(&self.state.bbs);

        keys
    }

    fn regenerate_check_info(&mut self) {
        let king = self.state.bbs.king_sq(self.side);
        let them = self.state.bbs.occupied_co(!self.side);
        self.state.checkers =
            self.state.bbs.all_attackers_to_sq(king, self.state.bbs.occupied()) & them;
        self.state.pinned = [
            self.state.bbs.generate_pinned(Colour::White),
            self.state.bbs.generate_pinned(Colour::Black),
        ];
    }

    // ------------------------------------------------------------------
    // mutation helpers: every add/remove/shift goes through these, so the
    // squaresets, mailbox, piece lists, hash keys, and piece-square sums
    // cannot drift apart.

    fn lift_piece(state: &mut State, sq: Square, piece: Piece) {
        state.bbs.clear_piece_at(sq, piece);
        state.mailbox[sq] = None;
        state.lists.remove(piece, sq);
        let key = PIECE_KEYS[piece][sq.index()];
        state.keys.zobrist ^= key;
        if piece.piece_type() == PieceType::Pawn {
            state.keys.pawn ^= key;
        }
        let (mg, eg) = pst_value(piece, sq);
        state.mg_value -= mg;
        state.eg_value -= eg;
    }

    fn drop_piece(state: &mut State, sq: Square, piece: Piece) {
        state.bbs.set_piece_at(sq, piece);
        state.mailbox[sq] = Some(piece);
        state.lists.insert(piece, sq);
        let key = PIECE_KEYS[piece][sq.index()];
        state.keys.zobrist ^= key;
        if piece.piece_type() == PieceType::Pawn {
            state.keys.pawn ^= key;
        }
        let (mg, eg) = pst_value(piece, sq);
        state.mg_value += mg;
        state.eg_value += eg;
    }

    fn shift_piece(state: &mut State, from: Square, to: Square, piece: Piece) {
        state.bbs.move_piece(from, to, piece);
        state.mailbox[from] = None;
        state.mailbox[to] = Some(piece);
        state.lists.move_piece(piece, from, to);
        let key = PIECE_KEYS[piece][from.index()] ^ PIECE_KEYS[piece][to.index()];
        state.keys.zobrist ^= key;
        if piece.piece_type() == PieceType::Pawn {
            state.keys.pawn ^= key;
        }
        let (mg, eg) = pst_delta(piece, from, to);
        state.mg_value += mg;
        state.eg_value += eg;
    }

    /// Removes a piece from the board *and* from the material accounting:
    /// the count-indexed material key, and non-pawn material.
    fn remove_from_material(state: &mut State, sq: Square, piece: Piece) {
        let count = state.lists.count(piece);
        debug_assert!(count > 0);
        state.keys.material ^= MATERIAL_KEYS[piece][usize::from(count) - 1];
        let pt = piece.piece_type();
        if pt != PieceType::Pawn && pt != PieceType::King {
            state.np_material[piece.colour()] -= pt.mg_value();
        }
        Self::lift_piece(state, sq, piece);
    }

    /// Inverse of `remove_from_material`.
    fn add_to_material(state: &mut State, sq: Square, piece: Piece) {
        let count = state.lists.count(piece);
        state.keys.material ^= MATERIAL_KEYS[piece][usize::from(count)];
        let pt = piece.piece_type();
        if pt != PieceType::Pawn && pt != PieceType::King {
            state.np_material[piece.colour()] += pt.mg_value();
        }
        Self::drop_piece(state, sq, piece);
    }

    // ------------------------------------------------------------------
    // make / unmake

    /// Play a pseudo-legal, legal move. The previous state is pushed onto
    /// the internal stack; `unmake_move` pops it. Playing a move that is not
    /// pseudo-legal leaves the board in an unspecified state.
    #[allow(clippy::too_many_lines)]
    pub fn make_move(&mut self, m: Move) {
        debug_assert!(self.is_pseudo_legal(m), "{m} is not pseudo-legal here");
        debug_assert!(self.is_legal(m), "{m} is not legal here");
        #[cfg(debug_assertions)]
        self.check_validity().unwrap();

        self.history.push(self.state.clone());

        let from = m.from();
        let to = m.to();
        let side = self.side;
        let piece = self.state.mailbox[from].expect("moving from an empty square");
        let castle = m.is_castle();
        let captured = if castle { None } else { self.state.mailbox[to] };

        let state = &mut self.state;
        state.capture = None;
        state.fifty_move_counter += 1;

        if let Some(ep_sq) = state.ep_square.take() {
            state.keys.zobrist ^= EP_KEYS[ep_sq.file()];
        }

        // hash out the castling state, to reinsert after updating rights.
        state.keys.zobrist ^= CASTLE_KEYS[state.castle_perm.hashkey_index()];

        if castle {
            // castling is encoded as king-takes-rook. lift both pieces
            // before dropping either, as their source and target squares
            // may coincide.
            let rook_from = to;
            let (king_to, rook_to) =
                if Some(to.file()) == state.castle_perm.kingside(side) {
                    (Square::G1.relative_to(side), Square::F1.relative_to(side))
                } else {
                    (Square::C1.relative_to(side), Square::D1.relative_to(side))
                };
            let rook = Piece::new(side, PieceType::Rook);
            Self::lift_piece(state, from, piece);
            Self::lift_piece(state, rook_from, rook);
            Self::drop_piece(state, king_to, piece);
            Self::drop_piece(state, rook_to, rook);
            state.castle_perm.clear(side);
        } else {
            if m.is_ep() {
                let cap_sq = Square::from_rank_file(from.rank(), to.file());
                let cap_piece = Piece::new(side.flip(), PieceType::Pawn);
                Self::remove_from_material(state, cap_sq, cap_piece);
                state.capture = Some(PieceType::Pawn);
                state.fifty_move_counter = 0;
            } else if let Some(cap_piece) = captured {
                Self::remove_from_material(state, to, cap_piece);
                state.capture = Some(cap_piece.piece_type());
                state.fifty_move_counter = 0;
            }

            if let Some(promo) = m.promotion_type() {
                debug_assert!(promo.legal_promo());
                Self::remove_from_material(state, from, piece);
                Self::add_to_material(state, to, Piece::new(side, promo));
            } else {
                Self::shift_piece(state, from, to, piece);
            }

            if piece.piece_type() == PieceType::Pawn {
                state.fifty_move_counter = 0;
                let is_double_push = from.rank().abs_diff(to.rank()) == 2;
                if is_double_push {
                    // only record the en passant square if a capture on it
                    // is at least geometrically possible.
                    let adjacent_enemy_pawns = (to.as_set().west_one() | to.as_set().east_one())
                        & state.bbs.all_pawns()
                        & state.bbs.occupied_co(side.flip());
                    if adjacent_enemy_pawns.non_empty() {
                        let ep_sq = from.pawn_push(side).expect("double push from home rank");
                        state.ep_square = Some(ep_sq);
                        state.keys.zobrist ^= EP_KEYS[ep_sq.file()];
                    }
                }
            }

            // castling rights drop when the king moves, a rook leaves its
            // initial square, or something lands on a rook's initial square.
            match piece.piece_type() {
                PieceType::King => state.castle_perm.clear(side),
                PieceType::Rook
                    if from.rank() == Rank::One.relative_to(side) =>
                {
                    state.castle_perm.remove(side, from.file());
                }
                _ => {}
            }
            if to.rank() == Rank::One {
                state.castle_perm.remove(Colour::White, to.file());
            } else if to.rank() == Rank::Eight {
                state.castle_perm.remove(Colour::Black, to.file());
            }
        }

        state.keys.zobrist ^= CASTLE_KEYS[state.castle_perm.hashkey_index()];
        state.keys.zobrist ^= SIDE_KEY;

        self.side = side.flip();
        self.ply += 1;
        self.height += 1;

        self.regenerate_check_info_after_move(side);

        #[cfg(debug_assertions)]
        self.check_validity().unwrap();
    }

    fn regenerate_check_info_after_move(&mut self, mover: Colour) {
        let state = &mut self.state;
        let king = state.bbs.king_sq(self.side);
        state.checkers =
            state.bbs.all_attackers_to_sq(king, state.bbs.occupied()) & state.bbs.occupied_co(mover);
        state.pinned = [
            state.bbs.generate_pinned(Colour::White),
            state.bbs.generate_pinned(Colour::Black),
        ];
    }

    /// Retract the last move made. The popped snapshot restores every field
    /// bit-for-bit, hash keys included.
    pub fn unmake_move(&mut self) {
        self.height -= 1;
        self.ply -= 1;
        self.side = self.side.flip();
        self.state = self.history.pop().expect("no move to unmake");
    }

    /// Pass the turn: flip the side to move and clear the en passant square.
    /// Calling this while in check is forbidden.
    pub fn make_nullmove(&mut self) {
        debug_assert!(!self.in_check());
        self.history.push(self.state.clone());

        if let Some(ep_sq) = self.state.ep_square.take() {
            self.state.keys.zobrist ^= EP_KEYS[ep_sq.file()];
        }
        self.state.keys.zobrist ^= SIDE_KEY;
        self.state.fifty_move_counter += 1;
        self.state.capture = None;
        // occupancy is untouched, so pins stand; the new side to move cannot
        // be in check, or the position would already have been illegal.
        self.state.checkers = SquareSet::EMPTY;

        self.side = self.side.flip();
        self.ply += 1;
        self.height += 1;
    }

    pub fn unmake_nullmove(&mut self) {
        self.height -= 1;
        self.ply -= 1;
        self.side = self.side.flip();
        self.state = self.history.pop().expect("no null move to unmake");
    }

    /// Flatten the current snapshot into a durable root: the history tail is
    /// dropped, so earlier frames can die without invalidating this board.
    pub fn rebase_root(&mut self) {
        self.history.clear();
        self.height = 0;
    }

    // ------------------------------------------------------------------
    // queries

    /// Midgame/endgame interpolation weight in `[0, 128]`, from the total
    /// non-pawn material of both sides.
    pub fn game_phase(&self) -> i32 {
        let npm = self.state.np_material[0] + self.state.np_material[1];
        if npm >= MIDGAME_LIMIT {
            PHASE_MIDGAME
        } else if npm <= ENDGAME_LIMIT {
            PHASE_ENDGAME
        } else {
            (npm - ENDGAME_LIMIT) * PHASE_MIDGAME / (MIDGAME_LIMIT - ENDGAME_LIMIT)
        }
    }

    pub fn is_checkmate(&self) -> bool {
        self.in_check() && self.legal_moves().is_empty()
    }

    pub fn is_stalemate(&self) -> bool {
        !self.in_check() && self.legal_moves().is_empty()
    }

    /// Draw by the fifty-move rule, repetition, or insufficient material.
    pub fn is_draw(&self) -> bool {
        self.is_fifty_move_draw() || self.is_repetition_draw() || self.is_insufficient_material()
    }

    pub fn is_fifty_move_draw(&self) -> bool {
        self.state.fifty_move_counter >= 100 && !self.is_checkmate()
    }

    /// The current position has already occurred at least twice: scanning
    /// backwards is bounded by the reversible-ply counter, as no position
    /// can recur across a capture or pawn move.
    pub fn is_repetition_draw(&self) -> bool {
        let key = self.state.keys.zobrist;
        let window = self.state.fifty_move_counter as usize;
        self.history
            .iter()
            .rev()
            .take(window)
            .filter(|state| state.keys.zobrist == key)
            .count()
            >= 2
    }

    /// Material combinations that cannot deliver mate: bare kings, a single
    /// minor piece, or same-coloured lone bishops.
    pub fn is_insufficient_material(&self) -> bool {
        let bbs = &self.state.bbs;
        let occupied = bbs.occupied();
        match occupied.count() {
            2 => true,
            3 => (bbs.all_bishops() | bbs.all_knights()).non_empty(),
            4 => {
                let white_bishops = bbs.all_bishops() & bbs.occupied_co(Colour::White);
                let black_bishops = bbs.all_bishops() & bbs.occupied_co(Colour::Black);
                if !(white_bishops.one() && black_bishops.one()) {
                    return false;
                }
                let wb = white_bishops.first().unwrap();
                let bb = black_bishops.first().unwrap();
                Square::same_colour(wb, bb)
            }
            _ => false,
        }
    }

    pub fn opposite_colored_bishops(&self) -> bool {
        let white_bishops = self.state.bbs.all_bishops() & self.state.bbs.occupied_co(Colour::White);
        let black_bishops = self.state.bbs.all_bishops() & self.state.bbs.occupied_co(Colour::Black);
        white_bishops.one()
            && black_bishops.one()
            && !Square::same_colour(
                white_bishops.first().unwrap(),
                black_bishops.first().unwrap(),
            )
    }

    pub fn has_pawn_on_7th(&self, side: Colour) -> bool {
        let seventh = match side {
            Colour::White => SquareSet::RANK_7,
            Colour::Black => SquareSet::RANK_2,
        };
        (self.state.bbs.all_pawns() & self.state.bbs.occupied_co(side) & seventh).non_empty()
    }

    /// No pawn of `side` can ever stop a pawn of the other colour reaching
    /// this square: nothing ahead of it on its own or the adjacent files.
    pub fn pawn_is_passed(&self, side: Colour, sq: Square) -> bool {
        let their_pawns = self.state.bbs.all_pawns() & self.state.bbs.occupied_co(!side);
        (their_pawns & passed_pawn_mask(side, sq)).is_empty()
    }

    /// No pawn of either colour stands on the file.
    pub fn file_is_open(&self, file: File) -> bool {
        (self.state.bbs.all_pawns() & SquareSet::FILES[file]).is_empty()
    }

    /// `side` has no pawn on the file.
    pub fn file_is_half_open(&self, side: Colour, file: File) -> bool {
        (self.state.bbs.all_pawns() & self.state.bbs.occupied_co(side) & SquareSet::FILES[file])
            .is_empty()
    }

    /// A square is weak for `side` if none of its pawns can ever drive an
    /// enemy piece off it.
    pub fn square_is_weak(&self, sq: Square, side: Colour) -> bool {
        let our_pawns = self.state.bbs.all_pawns() & self.state.bbs.occupied_co(side);
        (our_pawns & outpost_mask(!side, sq)).is_empty()
    }

    // ------------------------------------------------------------------
    // move parsing and perft

    /// Parses a move in the UCI format and returns a move or a reason why it
    /// couldn't be parsed.
    pub fn parse_uci(&self, uci: &str) -> Result<Move, MoveParseError> {
        use MoveParseError::{
            IllegalMove, InvalidFromSquareFile, InvalidFromSquareRank, InvalidLength,
            InvalidPromotionPiece, InvalidToSquareFile, InvalidToSquareRank,
        };
        let bytes = uci.as_bytes();
        if !(4..=5).contains(&bytes.len()) {
            return Err(InvalidLength(bytes.len()));
        }
        if !(b'a'..=b'h').contains(&bytes[0]) {
            return Err(InvalidFromSquareFile(bytes[0] as char));
        }
        if !(b'1'..=b'8').contains(&bytes[1]) {
            return Err(InvalidFromSquareRank(bytes[1] as char));
        }
        if !(b'a'..=b'h').contains(&bytes[2]) {
            return Err(InvalidToSquareFile(bytes[2] as char));
        }
        if !(b'1'..=b'8').contains(&bytes[3]) {
            return Err(InvalidToSquareRank(bytes[3] as char));
        }
        if bytes.len() == 5 && ![b'n', b'b', b'r', b'q'].contains(&bytes[4]) {
            return Err(InvalidPromotionPiece(bytes[4] as char));
        }

        let from = Square::from_rank_file(
            Rank::from_index(bytes[1] - b'1').unwrap(),
            File::from_index(bytes[0] - b'a').unwrap(),
        );
        let to = Square::from_rank_file(
            Rank::from_index(bytes[3] - b'1').unwrap(),
            File::from_index(bytes[2] - b'a').unwrap(),
        );
        let promo = if bytes.len() == 5 {
            Some(match bytes[4] {
                b'n' => PieceType::Knight,
                b'b' => PieceType::Bishop,
                b'r' => PieceType::Rook,
                _ => PieceType::Queen,
            })
        } else {
            None
        };

        let frc_cleanup = !CHESS960.load(Ordering::Relaxed);

        self.legal_moves()
            .into_iter()
            .find(|&m| {
                let m_to = if frc_cleanup && m.is_castle() {
                    // in normal UCI mode, castles are spoken as the king's
                    // destination square.
                    m.king_destination()
                } else {
                    m.to()
                };
                m.from() == from && m_to == to && m.promotion_type() == promo
            })
            .ok_or_else(|| IllegalMove(uci.to_string()))
    }

    /// Node count to the given depth; the standard move machinery shakedown.
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }
        let mut move_list = MoveList::new();
        self.generate_moves(&mut move_list);
        let mut count = 0;
        let moves: Vec<Move> = move_list.iter().copied().collect();
        for m in moves {
            if !self.is_legal(m) {
                continue;
            }
            self.make_move(m);
            count += self.perft(depth - 1);
            self.unmake_move();
        }
        count
    }

    // ------------------------------------------------------------------
    // FEN output

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in Rank::all().rev() {
            let mut empty = 0;
            for file in File::all() {
                let sq = Square::from_rank_file(rank, file);
                if let Some(piece) = self.state.mailbox[sq] {
                    if empty > 0 {
                        write!(fen, "{empty}").unwrap();
                        empty = 0;
                    }
                    fen.push(piece.char());
                } else {
                    empty += 1;
                }
            }
            if empty > 0 {
                write!(fen, "{empty}").unwrap();
            }
            if rank != Rank::One {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side == Colour::White { 'w' } else { 'b' });

        fen.push(' ');
        let rights = self.state.castle_perm;
        if rights.any() {
            let shredder = CHESS960.load(Ordering::Relaxed);
            for (side, kingside) in [
                (Colour::White, true),
                (Colour::White, false),
                (Colour::Black, true),
                (Colour::Black, false),
            ] {
                let file = if kingside {
                    rights.kingside(side)
                } else {
                    rights.queenside(side)
                };
                if let Some(file) = file {
                    let c = if shredder {
                        file.char()
                    } else if kingside {
                        'k'
                    } else {
                        'q'
                    };
                    fen.push(if side == Colour::White {
                        c.to_ascii_uppercase()
                    } else {
                        c.to_ascii_lowercase()
                    });
                }
            }
        } else {
            fen.push('-');
        }

        fen.push(' ');
        match self.state.ep_square {
            Some(sq) => write!(fen, "{sq}").unwrap(),
            None => fen.push('-'),
        }

        write!(
            fen,
            " {} {}",
            self.state.fifty_move_counter,
            self.ply / 2 + 1
        )
        .unwrap();

        fen
    }
}

/// The placement-independent hash of the piece multiset: XOR, for every
/// piece kind, of the count-indexed keys `0..n`. The endgame registry builds
/// keys for synthetic layouts through this same function, which is what
/// keeps them bit-compatible with live positions.
pub fn material_key(bbs: &crate::chess::piecelayout::PieceLayout) -> u64 {
    let mut key = 0;
    for piece in Piece::all() {
        let n = bbs.piece_bb(piece).count() as usize;
        for i in 0..n {
            key ^= MATERIAL_KEYS[piece][i];
        }
    }
    key
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.state.bbs)?;
        writeln!(f, "fen: {}", self.to_fen())?;
        writeln!(f, "key: {:016X}", self.state.keys.zobrist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(fen: &str) -> Board {
        Board::from_fen(fen).unwrap()
    }

    #[test]
    fn startpos_counts() {
        let board = board(Board::STARTING_FEN);
        assert_eq!(board.piece_count(Colour::White, PieceType::Pawn), 8);
        assert_eq!(board.piece_count(Colour::Black, PieceType::Knight), 2);
        assert_eq!(board.king_sq(Colour::White), Square::E1);
        assert_eq!(board.king_sq(Colour::Black), Square::E8);
        assert_eq!(board.game_phase(), PHASE_MIDGAME);
        assert!(!board.in_check());
        assert_eq!(board.mg_value(), 0);
        assert_eq!(board.eg_value(), 0);
    }

    #[test]
    fn fen_round_trip() {
        for fen in [
            Board::STARTING_FEN,
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
            "8/8/8/8/4k3/8/8/4K3 w - - 0 1",
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2",
            "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
        ] {
            assert_eq!(board(fen).to_fen(), fen, "round-trip failed for {fen}");
        }
    }

    #[test]
    fn fen_ep_square_cleared_when_no_capturer() {
        // e3 is formally valid but no black pawn can land on it.
        let board = board("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
        assert_eq!(board.ep_sq(), None);
    }

    #[test]
    fn incremental_keys_match_recomputation_along_a_game() {
        let mut board = board(Board::STARTING_FEN);
        for uci in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "g8f6", "e1g1", "f6e4"] {
            let m = board.parse_uci(uci).unwrap();
            board.make_move(m);
            let fresh = board.generate_pos_keys();
            assert_eq!(board.key(), fresh.zobrist, "zobrist drift after {uci}");
            assert_eq!(board.pawn_key(), fresh.pawn, "pawn key drift after {uci}");
            assert_eq!(board.material_key(), fresh.material, "material key drift after {uci}");
        }
    }

    #[test]
    fn make_unmake_restores_bit_identical_state() {
        let mut board = board("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        let reference = board.clone();
        let moves = board.legal_moves();
        assert!(!moves.is_empty());
        for m in moves {
            board.make_move(m);
            board.unmake_move();
            assert!(board == reference, "state diverged after {m}");
        }
    }

    #[test]
    fn nullmove_roundtrip() {
        let mut board = board("rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2");
        let reference = board.clone();
        board.make_nullmove();
        assert_ne!(board.key(), reference.key());
        assert_eq!(board.turn(), Colour::White);
        board.unmake_nullmove();
        assert!(board == reference);
    }

    #[test]
    fn move_sequence_end_to_end() {
        let mut board = board(Board::STARTING_FEN);
        for uci in ["e2e4", "e7e5", "g1f3"] {
            let m = board.parse_uci(uci).unwrap();
            board.make_move(m);
        }
        assert_eq!(
            board.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
    }

    #[test]
    fn castling_updates_everything() {
        let mut board = board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let key_before = board.key();
        let m = board.parse_uci("e1g1").unwrap();
        board.make_move(m);
        assert_eq!(board.piece_at(Square::G1), Some(Piece::WK));
        assert_eq!(board.piece_at(Square::F1), Some(Piece::WR));
        assert_eq!(board.piece_at(Square::E1), None);
        assert_eq!(board.piece_at(Square::H1), None);
        assert_eq!(board.castling_rights().kingside(Colour::White), None);
        assert_eq!(board.castling_rights().queenside(Colour::White), None);
        assert!(board.castling_rights().kingside(Colour::Black).is_some());
        assert_ne!(board.key(), key_before);
        assert_eq!(board.key(), board.generate_pos_keys().zobrist);
    }

    #[test]
    fn castling_rights_drop_on_rook_move_and_capture() {
        let mut board = board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let m = board.parse_uci("a1a8").unwrap();
        board.make_move(m);
        // white queenside right is gone (rook moved), and so is black's
        // (rook captured on its initial square).
        assert_eq!(board.castling_rights().queenside(Colour::White), None);
        assert_eq!(board.castling_rights().queenside(Colour::Black), None);
        assert!(board.castling_rights().kingside(Colour::White).is_some());
        assert!(board.castling_rights().kingside(Colour::Black).is_some());
        assert_eq!(board.key(), board.generate_pos_keys().zobrist);
    }

    #[test]
    fn en_passant_capture() {
        let mut board = board("4k3/8/8/8/pP6/8/8/4K3 b - b3 0 1");
        assert_eq!(board.ep_sq(), Some(Square::B3));
        let m = board.parse_uci("a4b3").unwrap();
        assert!(m.is_ep());
        board.make_move(m);
        assert_eq!(board.piece_at(Square::B4), None);
        assert_eq!(board.piece_at(Square::B3), Some(Piece::BP));
        assert_eq!(board.piece_at(Square::A4), None);
        assert_eq!(board.rule50(), 0);
        assert_eq!(board.ep_sq(), None);
        assert_eq!(board.captured_piece_type(), Some(PieceType::Pawn));
        assert_eq!(board.key(), board.generate_pos_keys().zobrist);
    }

    #[test]
    fn ep_square_only_set_when_capturable() {
        let mut board1 = board(Board::STARTING_FEN);
        let m = board1.parse_uci("e2e4").unwrap();
        board1.make_move(m);
        // no black pawn on d4/f4, so no en passant square.
        assert_eq!(board1.ep_sq(), None);

        let mut board2 = board("4k3/8/8/8/p7/8/1P6/4K3 w - - 0 1");
        let m = board2.parse_uci("b2b4").unwrap();
        board2.make_move(m);
        assert_eq!(board2.ep_sq(), Some(Square::B3));
    }

    #[test]
    fn promotion_updates_material() {
        let mut board = board("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let pawns_before = board.piece_count(Colour::White, PieceType::Pawn);
        let m = board.parse_uci("a7a8q").unwrap();
        board.make_move(m);
        assert_eq!(board.piece_at(Square::A8), Some(Piece::WQ));
        assert_eq!(board.piece_count(Colour::White, PieceType::Pawn), pawns_before - 1);
        assert_eq!(board.piece_count(Colour::White, PieceType::Queen), 1);
        assert_eq!(board.non_pawn_material(Colour::White), PieceType::Queen.mg_value());
        assert_eq!(board.key(), board.generate_pos_keys().zobrist);
        assert_eq!(board.material_key(), board.generate_pos_keys().material);
    }

    #[test]
    fn rule50_bookkeeping() {
        let mut board = board(Board::STARTING_FEN);
        board.make_move(board.parse_uci("g1f3").unwrap());
        assert_eq!(board.rule50(), 1);
        board.make_move(board.parse_uci("g8f6").unwrap());
        assert_eq!(board.rule50(), 2);
        board.make_move(board.parse_uci("e2e4").unwrap());
        assert_eq!(board.rule50(), 0);
    }

    #[test]
    fn checkers_are_exactly_the_attackers_of_the_king() {
        let board = board("4k3/8/8/8/8/5n2/6P1/4K2R b - - 0 1");
        assert!(!board.in_check());
        let mut board = Board::from_fen("rnbqkbnr/ppppp1pp/8/5p2/8/4P3/PPPP1PPP/RNBQKBNR w KQkq - 0 1").unwrap();
        board.make_move(board.parse_uci("d1h5").unwrap());
        assert!(board.in_check());
        assert_eq!(board.checkers(), Square::H5.as_set());
    }

    #[test]
    fn repetition_detection() {
        let mut board = board(Board::STARTING_FEN);
        for _ in 0..4 {
            for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                let m = board.parse_uci(uci).unwrap();
                board.make_move(m);
            }
        }
        let key = board.key();
        let occurrences = board
            .history()
            .iter()
            .filter(|s| s.keys.zobrist == key)
            .count();
        assert!(occurrences >= 3);
        assert!(board.is_repetition_draw());
        assert!(board.is_draw());
    }

    #[test]
    fn insufficient_material_classes() {
        assert!(board("8/8/8/8/4k3/8/8/4K3 w - - 0 1").is_insufficient_material());
        assert!(board("8/8/8/8/4k3/8/2B5/4K3 w - - 0 1").is_insufficient_material());
        assert!(board("8/8/8/8/4k3/8/2n5/4K3 w - - 0 1").is_insufficient_material());
        // same-coloured bishops
        assert!(board("8/8/8/3b4/4k3/8/2B5/4K3 w - - 0 1").is_insufficient_material());
        // opposite-coloured bishops can still mate
        assert!(!board("8/8/8/4b3/4k3/8/2B5/4K3 w - - 0 1").is_insufficient_material());
        assert!(!board("8/8/8/8/4k3/8/2R5/4K3 w - - 0 1").is_insufficient_material());
    }

    #[test]
    fn mate_and_stalemate() {
        assert!(board("R3k3/7R/8/8/8/8/8/4K3 b - - 0 1").is_checkmate());
        assert!(board("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").is_stalemate());
        assert!(!board(Board::STARTING_FEN).is_checkmate());
        assert!(!board(Board::STARTING_FEN).is_stalemate());
    }

    #[test]
    fn open_and_half_open_files() {
        let board = board("4k3/2p5/8/8/8/8/2P5/4K3 w - - 0 1");
        assert!(board.file_is_open(File::A));
        assert!(!board.file_is_open(File::C));
        assert!(!board.file_is_half_open(Colour::White, File::C));
        assert!(board.file_is_half_open(Colour::White, File::D));
        assert!(board.file_is_half_open(Colour::Black, File::D));
    }

    #[test]
    fn passed_pawns_and_weak_squares() {
        let board1 = board("4k3/8/8/2p5/8/4P3/8/4K3 w - - 0 1");
        // c5 pawn: no white pawn stands on the b/c/d files ahead of it.
        assert!(board1.pawn_is_passed(Colour::Black, Square::C5));
        // no black pawn on d/e/f ahead of e3 either.
        assert!(board1.pawn_is_passed(Colour::White, Square::E3));

        let board2 = board("4k3/8/8/2p5/2P5/8/8/4K3 w - - 0 1");
        // the black c5 pawn can still come to cover d4.
        assert!(!board2.square_is_weak(Square::D4, Colour::Black));
        // nothing black can ever contest e3.
        assert!(board2.square_is_weak(Square::E3, Colour::Black));
    }

    #[test]
    fn bishop_and_seventh_rank_queries() {
        let board1 = board("4k3/P7/8/8/8/2b5/2B4p/4K3 w - - 0 1");
        // c2 is light, c3 is dark.
        assert!(board1.opposite_colored_bishops());
        assert!(board1.has_pawn_on_7th(Colour::White));
        assert!(board1.has_pawn_on_7th(Colour::Black));

        let board2 = board("4k3/8/8/2b5/8/8/1B6/4K3 w - - 0 1");
        // b2 and c5 are both dark.
        assert!(!board2.opposite_colored_bishops());
        assert!(!board2.has_pawn_on_7th(Colour::White));
    }

    #[test]
    fn rebase_root_flattens_history() {
        let mut board = board(Board::STARTING_FEN);
        board.make_move(board.parse_uci("e2e4").unwrap());
        board.make_move(board.parse_uci("e7e5").unwrap());
        let fen = board.to_fen();
        board.rebase_root();
        assert!(board.history().is_empty());
        assert_eq!(board.height(), 0);
        assert_eq!(board.to_fen(), fen);
        // the board remains fully usable.
        board.make_move(board.parse_uci("g1f3").unwrap());
        assert_eq!(board.key(), board.generate_pos_keys().zobrist);
    }

    #[test]
    fn keys_agree_for_transposed_move_orders() {
        let mut a = board(Board::STARTING_FEN);
        for uci in ["g1f3", "g8f6", "e2e3", "e7e6"] {
            a.make_move(a.parse_uci(uci).unwrap());
        }
        let mut b = board(Board::STARTING_FEN);
        for uci in ["e2e3", "g8f6", "g1f3", "e7e6"] {
            b.make_move(b.parse_uci(uci).unwrap());
        }
        assert_eq!(a.key(), b.key());
        assert_eq!(a.pawn_key(), b.pawn_key());
        assert_eq!(a.material_key(), b.material_key());
    }

    // perft depths are kept modest: debug builds revalidate the full
    // position around every make_move, which dominates the node cost.

    #[test]
    fn perft_startpos() {
        let mut board = board(Board::STARTING_FEN);
        assert_eq!(board.perft(1), 20);
        assert_eq!(board.perft(2), 400);
        assert_eq!(board.perft(3), 8_902);
    }

    #[test]
    fn perft_kiwipete() {
        let mut board =
            board("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        assert_eq!(board.perft(1), 48);
        assert_eq!(board.perft(2), 2_039);
    }

    #[test]
    fn perft_en_passant_pins() {
        // position 3 from the standard perft suite; heavy on ep edge cases.
        let mut board = board("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1");
        assert_eq!(board.perft(1), 14);
        assert_eq!(board.perft(2), 191);
        assert_eq!(board.perft(3), 2_812);
        assert_eq!(board.perft(4), 43_238);
    }

    #[test]
    fn perft_promotions() {
        // position 4: promotion-rich.
        let mut board = board("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1");
        assert_eq!(board.perft(1), 6);
        assert_eq!(board.perft(2), 264);
    }
}
