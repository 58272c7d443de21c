use crate::model::FluidPacket;

/// Deep copy of every container's packets, taken immediately before a
/// state-changing action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    contents: Vec<Vec<FluidPacket>>,
}

impl Snapshot {
    pub(crate) fn new(contents: Vec<Vec<FluidPacket>>) -> Self {
        Self { contents }
    }

    pub(crate) fn contents(&self) -> &[Vec<FluidPacket>] {
        &self.contents
    }
}

/// Unbounded undo stack of snapshots.
#[derive(Default, Debug)]
pub struct HistoryManager {
    stack: Vec<Snapshot>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.stack.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.stack.pop()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }
}
