//! The transposition table: a direct-mapped array of 128-bit entries shared
//! by every searcher thread.
//!
//! Memory model: entries are two relaxed-atomic words with no lock and no
//! ordering between them, so a reader may observe a torn entry (key from one
//! write, data from another). The key tag filters almost all of these, and a
//! consumer must treat whatever survives as a hint: moves coming out of the
//! table are validated against a real position before they are played.

use std::{
    mem::size_of,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::chess::{board::Board, chessmove::Move};

/// Entries per cluster: a position's key selects a cluster, and any of its
/// slots may hold the entry.
pub const CLUSTER_SIZE: usize = 4;

const GENERATION_CYCLE: u16 = 1 << 9;
const GENERATION_MASK: u16 = GENERATION_CYCLE - 1;

/// Entry layout, 128 bits:
///
/// ```text
/// word 0, bit  0-63: key
/// word 1, bit  0-16: move
/// word 1, bit 20-22: bound (value type)
/// word 1, bit 23-31: generation
/// word 1, bit 32-47: value
/// word 1, bit 48-63: depth
/// ```
const MOVE_MASK: u64 = 0x1_FFFF;
const BOUND_SHIFT: u64 = 20;
const GENERATION_SHIFT: u64 = 23;
const VALUE_SHIFT: u64 = 32;
const DEPTH_SHIFT: u64 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    None = 0,
    Upper = 1,
    Lower = 2,
    Exact = 3,
}

impl Bound {
    const fn from_bits(bits: u64) -> Self {
        match bits & 0b111 {
            1 => Self::Upper,
            2 => Self::Lower,
            3 => Self::Exact,
            _ => Self::None,
        }
    }
}

/// A decoded entry, as handed to the searcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTData {
    pub m: Option<Move>,
    pub value: i16,
    pub depth: i16,
    pub bound: Bound,
    pub generation: u16,
}

impl TTData {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn encode(&self) -> u64 {
        let m = self.m.map_or(0, |m| u64::from(m.inner())) & MOVE_MASK;
        m | u64::from(self.bound as u8) << BOUND_SHIFT
            | u64::from(self.generation & GENERATION_MASK) << GENERATION_SHIFT
            | u64::from(self.value as u16) << VALUE_SHIFT
            | u64::from(self.depth as u16) << DEPTH_SHIFT
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn decode(data: u64) -> Self {
        Self {
            m: Move::from_raw((data & MOVE_MASK) as u16),
            bound: Bound::from_bits(data >> BOUND_SHIFT),
            generation: ((data >> GENERATION_SHIFT) as u16) & GENERATION_MASK,
            value: (data >> VALUE_SHIFT) as u16 as i16,
            depth: (data >> DEPTH_SHIFT) as u16 as i16,
        }
    }
}

#[derive(Default)]
struct EntryMemory {
    key: AtomicU64,
    data: AtomicU64,
}

const _ENTRY_SIZE: () = assert!(size_of::<EntryMemory>() == 16);

/// The write counter sits alone on its cache line: it is the only hot
/// mutable word, and sharing a line with read-mostly fields would drag every
/// reader into its coherence traffic.
#[repr(align(64))]
#[derive(Default)]
struct PaddedCounter(AtomicU64);

pub struct TranspositionTable {
    entries: Vec<EntryMemory>,
    cluster_count: usize,
    generation: AtomicU64,
    writes: PaddedCounter,
}

impl TranspositionTable {
    /// Build a table of at most `megabytes` MB; the cluster count is rounded
    /// down to a power of two so the key can be masked rather than divided.
    pub fn new(megabytes: usize) -> Self {
        let bytes = megabytes * 1024 * 1024;
        let cluster_bytes = CLUSTER_SIZE * size_of::<EntryMemory>();
        // round down to a power of two.
        let max_clusters = (bytes / cluster_bytes).max(1);
        let cluster_count = 1 << (usize::BITS - 1 - max_clusters.leading_zeros());
        let mut entries = Vec::new();
        entries.resize_with(cluster_count * CLUSTER_SIZE, EntryMemory::default);
        Self {
            entries,
            cluster_count,
            generation: AtomicU64::new(0),
            writes: PaddedCounter::default(),
        }
    }

    pub fn clear(&self) {
        for entry in &self.entries {
            entry.key.store(0, Ordering::Relaxed);
            entry.data.store(0, Ordering::Relaxed);
        }
        self.writes.0.store(0, Ordering::Relaxed);
    }

    pub fn size_bytes(&self) -> usize {
        self.entries.len() * size_of::<EntryMemory>()
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn generation(&self) -> u16 {
        self.generation.load(Ordering::Relaxed) as u16 & GENERATION_MASK
    }

    /// Bump the generation; called once at the start of each new search so
    /// replacement can prefer entries from old searches.
    pub fn new_search(&self) {
        let next = (self.generation() + 1) & GENERATION_MASK;
        self.generation.store(u64::from(next), Ordering::Relaxed);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cluster_base(&self, key: u64) -> usize {
        (key as usize & (self.cluster_count - 1)) * CLUSTER_SIZE
    }

    /// Store an entry. Within the cluster: an empty or same-key slot is
    /// always taken (keeping the old move when no new one is given);
    /// otherwise the victim is the slot whose generation differs from the
    /// current search, shallowest first.
    pub fn store(&self, key: u64, value: i16, bound: Bound, depth: i16, m: Option<Move>) {
        let base = self.cluster_base(key);
        let generation = self.generation();

        let mut victim = base;
        let mut victim_stale = false;
        let mut victim_depth = i16::MAX;

        for idx in base..base + CLUSTER_SIZE {
            let slot_key = self.entries[idx].key.load(Ordering::Relaxed);
            let slot_data = TTData::decode(self.entries[idx].data.load(Ordering::Relaxed));

            if slot_key == 0 || slot_key == key {
                let m = if m.is_none() && slot_key == key {
                    slot_data.m
                } else {
                    m
                };
                self.write_entry(idx, key, TTData { m, value, depth, bound, generation });
                return;
            }

            let stale = slot_data.generation != generation;
            let better_victim = if stale == victim_stale {
                slot_data.depth < victim_depth
            } else {
                stale
            };
            if idx == base || better_victim {
                victim = idx;
                victim_stale = stale;
                victim_depth = slot_data.depth;
            }
        }

        self.write_entry(victim, key, TTData { m, value, depth, bound, generation });
    }

    fn write_entry(&self, idx: usize, key: u64, data: TTData) {
        self.entries[idx].key.store(key, Ordering::Relaxed);
        self.entries[idx].data.store(data.encode(), Ordering::Relaxed);
        self.writes.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Look the position up. A miss is normal, not an error.
    pub fn retrieve(&self, key: u64) -> Option<TTData> {
        let base = self.cluster_base(key);
        for idx in base..base + CLUSTER_SIZE {
            if self.entries[idx].key.load(Ordering::Relaxed) == key {
                return Some(TTData::decode(self.entries[idx].data.load(Ordering::Relaxed)));
            }
        }
        None
    }

    /// Seed the table with a principal variation, so its moves are tried
    /// first by the next search. Entries carry a throwaway depth: any real
    /// search result will replace them.
    pub fn insert_pv(&self, pos: &Board, pv: &[Move]) {
        let mut scratch = pos.clone();
        for &m in pv {
            if !scratch.is_pseudo_legal(m) || !scratch.is_legal(m) {
                break;
            }
            self.store(scratch.key(), 0, Bound::None, -128, Some(m));
            scratch.make_move(m);
        }
    }

    /// Occupancy estimate in per mille, by sampling a fixed prefix of
    /// entries for the current generation.
    pub fn full(&self) -> usize {
        let sample = self.entries.len().min(1000);
        let generation = self.generation();
        let hits = self.entries[..sample]
            .iter()
            .filter(|entry| {
                entry.key.load(Ordering::Relaxed) != 0
                    && TTData::decode(entry.data.load(Ordering::Relaxed)).generation == generation
            })
            .count();
        hits * 1000 / sample
    }

    pub fn writes(&self) -> u64 {
        self.writes.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::types::Square;

    #[test]
    fn entry_encoding_round_trips() {
        for (value, depth, bound, generation) in [
            (0i16, 0i16, Bound::None, 0u16),
            (1234, 56, Bound::Exact, 511),
            (-32768, -128, Bound::Upper, 300),
            (32767, 32767, Bound::Lower, 1),
        ] {
            let data = TTData {
                m: Some(Move::new(Square::E2, Square::E4)),
                value,
                depth,
                bound,
                generation,
            };
            assert_eq!(TTData::decode(data.encode()), data);
        }
        let none = TTData { m: None, value: 7, depth: 3, bound: Bound::Exact, generation: 2 };
        assert_eq!(TTData::decode(none.encode()), none);
    }

    #[test]
    fn store_and_retrieve() {
        let tt = TranspositionTable::new(1);
        let m = Move::new(Square::G1, Square::F3);
        tt.store(0xDEAD_BEEF, 42, Bound::Exact, 7, Some(m));
        let hit = tt.retrieve(0xDEAD_BEEF).unwrap();
        assert_eq!(hit.value, 42);
        assert_eq!(hit.depth, 7);
        assert_eq!(hit.bound, Bound::Exact);
        assert_eq!(hit.m, Some(m));
        assert!(tt.retrieve(0xBAD_C0DE).is_none());
        assert_eq!(tt.writes(), 1);
    }

    #[test]
    fn same_key_overwrite_keeps_move_when_none_given(){
        let tt = TranspositionTable::new(1);
        let m = Move::new(Square::E2, Square::E4);
        tt.store(99, 10, Bound::Lower, 4, Some(m));
        tt.store(99, 11, Bound::Upper, 5, None);
        let hit = tt.retrieve(99).unwrap();
        assert_eq!(hit.value, 11);
        assert_eq!(hit.m, Some(m));
    }

    #[test]
    fn replacement_prefers_stale_then_shallow() {
        let tt = TranspositionTable::new(1);
        let clusters = tt.cluster_count as u64;
        // five keys landing in the same cluster.
        let keys: Vec<u64> = (1..=5).map(|i| i * clusters).collect();
        for (i, &key) in keys.iter().take(4).enumerate() {
            tt.store(key, i as i16, Bound::Exact, 10 + i as i16, None);
        }
        // cluster now full; a new search makes everything stale.
        tt.new_search();
        tt.store(keys[4], 99, Bound::Exact, 1, None);
        // the shallowest stale entry (depth 10, keys[0]) was evicted.
        assert!(tt.retrieve(keys[0]).is_none());
        for &key in &keys[1..] {
            assert!(tt.retrieve(key).is_some(), "key {key} should have survived");
        }
    }

    #[test]
    fn generation_wraps_at_nine_bits() {
        let tt = TranspositionTable::new(1);
        for _ in 0..GENERATION_CYCLE {
            tt.new_search();
        }
        assert_eq!(tt.generation(), 0);
    }

    #[test]
    fn insert_pv_stores_all_pv_positions() {
        let tt = TranspositionTable::new(1);
        let mut pos = Board::from_fen(Board::STARTING_FEN).unwrap();
        let pv: Vec<Move> = ["e2e4", "e7e5", "g1f3"]
            .iter()
            .map(|uci| {
                let m = pos.parse_uci(uci).unwrap();
                pos.make_move(m);
                m
            })
            .collect();
        for _ in 0..pv.len() {
            pos.unmake_move();
        }

        tt.insert_pv(&pos, &pv);

        let mut walker = pos.clone();
        for &m in &pv {
            let hit = tt.retrieve(walker.key()).expect("pv position missing from table");
            assert_eq!(hit.m, Some(m));
            walker.make_move(m);
        }
    }

    #[test]
    fn full_reports_occupancy() {
        let tt = TranspositionTable::new(1);
        assert_eq!(tt.full(), 0);
        for key in 0..2000u64 {
            tt.store(key.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1, 0, Bound::Exact, 1, None);
        }
        assert!(tt.full() > 0);
    }
}
