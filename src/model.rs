use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use itertools::Itertools;
use thiserror::Error;

use crate::history::Snapshot;

/// One unit of fluid occupying one slot in a container. Equality is the
/// only meaningful relation between colors; `Ord` is derived so that
/// canonicalization can sort container contents.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum FluidPacket {
    Empty,
    Fluid { color_id: usize },
}

impl FluidPacket {
    pub fn new(color_id: usize) -> Self {
        FluidPacket::Fluid { color_id }
    }

    pub fn from_repr(repr: &str) -> Result<Self, ParseStateError> {
        let s = repr.trim();
        if s.is_empty() || s == "." {
            return Ok(FluidPacket::Empty);
        }
        match Self::letters_to_color_id(s) {
            Some(id) => Ok(FluidPacket::Fluid { color_id: id }),
            None => Err(ParseStateError::InvalidToken(s.to_string())),
        }
    }

    /// Convert a single letter (A-Z) into a 0-based id.
    fn letter_to_color_id(ch: char) -> Option<usize> {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let up = ch.to_ascii_uppercase();
        Some((up as u8 - b'A') as usize)
    }

    /// Convert a letter sequence like "A", "Z", "AA" into a 0-based id.
    /// Uses Excel-style base-26 numbering: A=0, ..., Z=25, AA=26, AB=27, ...
    fn letters_to_color_id(s: &str) -> Option<usize> {
        let mut acc: usize = 0;
        let mut saw_any = false;
        for ch in s.chars() {
            let digit = Self::letter_to_color_id(ch)?; // 0..25
            // 1..26 for Excel-style accumulation.
            acc = acc.checked_mul(26)?.checked_add(digit + 1)?;
            saw_any = true;
        }
        if !saw_any {
            return None;
        }
        acc.checked_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FluidPacket::Empty)
    }

    pub fn color_id(&self) -> Option<usize> {
        match self {
            FluidPacket::Fluid { color_id } => Some(*color_id),
            FluidPacket::Empty => None,
        }
    }

    pub fn letter_repr(&self) -> String {
        const ALPHABET_LEN: usize = 26;
        let mut id = match self.color_id() {
            None => return ".".to_string(),
            Some(id) => id + 1, // 1-based for easier calculation
        };
        let mut chars = Vec::new();
        while id > 0 {
            let rem = (id - 1) % ALPHABET_LEN;
            chars.push((b'A' + rem as u8) as char);
            id = (id - 1) / ALPHABET_LEN;
        }
        chars.iter().rev().collect()
    }
}

/// A bounded stack of fluid packets. The backing vector always has
/// exactly `capacity` slots; filled slots form a prefix and empties pad
/// the rest, so the topmost fluid is the last non-empty slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FluidContainer {
    packets: Vec<FluidPacket>,
    capacity: usize,
}

impl FluidContainer {
    pub fn new(capacity: usize) -> Self {
        Self {
            packets: vec![FluidPacket::Empty; capacity],
            capacity,
        }
    }

    /// A container filled to capacity with a single color.
    pub fn filled(color_id: usize, capacity: usize) -> Self {
        Self {
            packets: vec![FluidPacket::new(color_id); capacity],
            capacity,
        }
    }

    pub fn from_repr(repr: &str) -> Result<Self, ParseStateError> {
        let mut packets = Vec::new();
        if repr.contains(',') {
            for token in repr.split(',') {
                packets.push(FluidPacket::from_repr(token)?);
            }
        } else {
            for ch in repr.chars() {
                packets.push(FluidPacket::from_repr(&ch.to_string())?);
            }
        }
        // Filled slots must form a prefix.
        let mut seen_empty = false;
        for packet in &packets {
            if packet.is_empty() {
                seen_empty = true;
            } else if seen_empty {
                return Err(ParseStateError::FloatingFluid(repr.to_string()));
            }
        }
        let capacity = packets.len();
        Ok(Self { packets, capacity })
    }

    pub fn add_fluid(&mut self, packet: FluidPacket) -> bool {
        for slot in &mut self.packets {
            if slot.is_empty() {
                *slot = packet;
                return true;
            }
        }
        false
    }

    pub fn pop_fluid(&mut self) -> Option<FluidPacket> {
        for slot in self.packets.iter_mut().rev() {
            if !slot.is_empty() {
                return Some(std::mem::replace(slot, FluidPacket::Empty));
            }
        }
        None
    }

    pub fn is_full(&self) -> bool {
        self.packets.iter().all(|p| !p.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.packets.iter().all(|p| p.is_empty())
    }

    pub fn empty_space(&self) -> usize {
        self.packets.iter().filter(|p| p.is_empty()).count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn fill_level(&self) -> usize {
        self.capacity - self.empty_space()
    }

    pub fn top_fluid(&self) -> Option<FluidPacket> {
        self.packets.iter().rev().find(|p| !p.is_empty()).copied()
    }

    /// Length of the contiguous same-colored run at the top.
    pub fn top_run_depth(&self) -> usize {
        let mut slots = self.packets.iter().rev().skip_while(|p| p.is_empty());
        let top = match slots.next() {
            Some(packet) => packet,
            None => return 0,
        };
        1 + slots.take_while(|p| *p == top).count()
    }

    /// True iff two adjacent filled slots hold different colors.
    pub fn has_mixed_fluids(&self) -> bool {
        self.packets
            .iter()
            .take_while(|p| !p.is_empty())
            .tuple_windows()
            .any(|(a, b)| a != b)
    }

    pub fn packets(&self) -> &[FluidPacket] {
        &self.packets
    }

    /// How many packets a regular pour would transfer: zero unless the
    /// destination is empty or its top matches ours, otherwise the top
    /// run bounded by the destination's free space.
    pub fn pourable_amount(&self, other: &FluidContainer) -> usize {
        if self.top_fluid() != other.top_fluid() && !other.is_empty() {
            return 0;
        }
        self.top_run_depth().min(other.empty_space())
    }

    pub fn can_pour_into(&self, other: &FluidContainer) -> bool {
        self.pourable_amount(other) > 0
    }

    /// Cascading pour: transfers the whole top run, bounded by the
    /// destination's free space. No effect and `false` when the pour is
    /// not legal.
    pub fn pour_into(&mut self, other: &mut FluidContainer) -> bool {
        let transfer_amount = self.pourable_amount(other);
        if transfer_amount == 0 {
            return false;
        }
        for _ in 0..transfer_amount {
            if let Some(packet) = self.pop_fluid() {
                other.add_fluid(packet);
            }
        }
        true
    }

    /// Moves exactly one packet ignoring the color-match rule. Only the
    /// generator uses this; it is never reachable from normal play.
    pub fn force_pour_into(&mut self, other: &mut FluidContainer) -> bool {
        if self.is_empty() || other.is_full() {
            return false;
        }
        if let Some(packet) = self.pop_fluid() {
            other.add_fluid(packet);
        }
        true
    }

    /// Pours and hands back both containers' prior contents so the
    /// caller can restore them exactly, whether or not the pour did
    /// anything.
    pub fn reversible_pour_into(
        &mut self,
        other: &mut FluidContainer,
    ) -> (Vec<FluidPacket>, Vec<FluidPacket>) {
        let before_self = self.packets.clone();
        let before_other = other.packets.clone();
        self.pour_into(other);
        (before_self, before_other)
    }

    pub fn restore_packets(&mut self, packets: Vec<FluidPacket>) {
        debug_assert_eq!(packets.len(), self.capacity);
        self.packets = packets;
    }

    pub fn repr(&self) -> String {
        let slots: Vec<String> = self.packets.iter().map(|p| p.letter_repr()).collect();
        let has_multi_char = slots.iter().any(|s| s.len() > 1);
        let separator = if has_multi_char { "," } else { "" };
        slots.join(separator)
    }
}

/// A pour intent between two container positions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MoveAction {
    pub from_container: usize,
    pub to_container: usize,
}

/// Canonical hash of a state with container positions collapsed: two
/// states whose containers are a permutation of each other fingerprint
/// identically. Used only for search-time deduplication.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Fingerprint(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleState {
    containers: Vec<FluidContainer>,
}

impl PuzzleState {
    pub fn new(containers: Vec<FluidContainer>) -> Self {
        Self { containers }
    }

    /// Parses a `/`-separated list of container representations. All
    /// containers must share one capacity.
    pub fn from_repr(repr: &str) -> Result<Self, ParseStateError> {
        if repr.trim().is_empty() {
            return Err(ParseStateError::EmptyRepr);
        }
        let mut containers = Vec::new();
        for part in repr.split('/') {
            containers.push(FluidContainer::from_repr(part)?);
        }
        let capacity = containers[0].capacity();
        for container in &containers {
            if container.capacity() != capacity {
                return Err(ParseStateError::UnevenCapacity(
                    capacity,
                    container.capacity(),
                ));
            }
        }
        Ok(Self { containers })
    }

    pub fn repr(&self) -> String {
        self.containers.iter().map(|c| c.repr()).join("/")
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn containers(&self) -> &[FluidContainer] {
        &self.containers
    }

    pub fn container(&self, index: usize) -> Option<&FluidContainer> {
        self.containers.get(index)
    }

    /// Solved iff every container is empty, or full of one color.
    pub fn is_solved(&self) -> bool {
        self.containers
            .iter()
            .all(|c| c.is_empty() || (c.is_full() && c.packets().iter().all_equal()))
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut contents: Vec<&[FluidPacket]> =
            self.containers.iter().map(|c| c.packets()).collect();
        contents.sort();
        let mut hasher = DefaultHasher::new();
        contents.hash(&mut hasher);
        Fingerprint(hasher.finish())
    }

    /// Every ordered pair of positions where a regular pour would move
    /// fluid. Enumeration order is not significant; the solver shuffles
    /// before exploring.
    pub fn legal_moves(&self) -> Vec<MoveAction> {
        let mut moves = Vec::new();
        for (i, from) in self.containers.iter().enumerate() {
            if from.is_empty() {
                continue;
            }
            for (j, to) in self.containers.iter().enumerate() {
                if i != j && from.can_pour_into(to) {
                    moves.push(MoveAction {
                        from_container: i,
                        to_container: j,
                    });
                }
            }
        }
        moves
    }

    /// Applies a regular pour. `false` (and no effect) for illegal
    /// pours, equal positions, or out-of-range positions.
    pub fn apply(&mut self, action: &MoveAction) -> bool {
        match self.pair_mut(action.from_container, action.to_container) {
            Some((from, to)) => from.pour_into(to),
            None => false,
        }
    }

    /// Single-packet pour ignoring color match, for scrambling.
    pub fn force_apply(&mut self, from: usize, to: usize) -> bool {
        match self.pair_mut(from, to) {
            Some((from, to)) => from.force_pour_into(to),
            None => false,
        }
    }

    pub(crate) fn reversible_apply(
        &mut self,
        action: &MoveAction,
    ) -> Option<(Vec<FluidPacket>, Vec<FluidPacket>)> {
        let (from, to) = self.pair_mut(action.from_container, action.to_container)?;
        Some(from.reversible_pour_into(to))
    }

    pub(crate) fn restore_pair(
        &mut self,
        action: &MoveAction,
        from_packets: Vec<FluidPacket>,
        to_packets: Vec<FluidPacket>,
    ) {
        if let Some((from, to)) = self.pair_mut(action.from_container, action.to_container) {
            from.restore_packets(from_packets);
            to.restore_packets(to_packets);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.containers.iter().map(|c| c.packets().to_vec()).collect())
    }

    pub fn restore(&mut self, snapshot: &Snapshot) {
        debug_assert_eq!(snapshot.contents().len(), self.containers.len());
        for (container, contents) in self.containers.iter_mut().zip(snapshot.contents()) {
            container.restore_packets(contents.clone());
        }
    }

    /// Packet count per color, for conservation checks.
    pub fn fluid_census(&self) -> HashMap<usize, usize> {
        let mut census = HashMap::new();
        for container in &self.containers {
            for packet in container.packets() {
                if let Some(color_id) = packet.color_id() {
                    *census.entry(color_id).or_insert(0) += 1;
                }
            }
        }
        census
    }

    fn pair_mut(
        &mut self,
        a: usize,
        b: usize,
    ) -> Option<(&mut FluidContainer, &mut FluidContainer)> {
        if a == b || a >= self.containers.len() || b >= self.containers.len() {
            return None;
        }
        if a < b {
            let (left, right) = self.containers.split_at_mut(b);
            Some((&mut left[a], &mut right[0]))
        } else {
            let (left, right) = self.containers.split_at_mut(a);
            Some((&mut right[0], &mut left[b]))
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseStateError {
    #[error("invalid token {0:?} in container representation")]
    InvalidToken(String),
    #[error("fluid above an empty slot in {0:?}")]
    FloatingFluid(String),
    #[error("containers have differing capacities ({0} vs {1})")]
    UnevenCapacity(usize, usize),
    #[error("empty puzzle representation")]
    EmptyRepr,
}
