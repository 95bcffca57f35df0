use crate::{HEIGHT, WIDTH};

const KILLERS_PER_DEPTH: usize = 2;
const MAX_DEPTH: usize = WIDTH * HEIGHT + 1;

/// Per-depth record of the moves that most recently caused a cutoff
#[derive(Clone, Debug)]
pub struct KillerTable {
    moves: [[Option<u8>; KILLERS_PER_DEPTH]; MAX_DEPTH],
}

impl KillerTable {
    pub fn new() -> Self {
        Self {
            moves: [[None; KILLERS_PER_DEPTH]; MAX_DEPTH],
        }
    }

    pub fn record(&mut self, depth: u32, column: usize) {
        let slots = match self.moves.get_mut(depth as usize) {
            Some(slots) => slots,
            None => return,
        };
        let column = Some(column as u8);
        if slots[0] == column {
            return;
        }
        // most recent first, the older killer is pushed out
        slots[1] = slots[0];
        slots[0] = column;
    }

    /// Killer moves for `depth`, most recent first
    pub fn get(&self, depth: u32) -> impl Iterator<Item = usize> + '_ {
        self.moves
            .get(depth as usize)
            .into_iter()
            .flatten()
            .flatten()
            .map(|&column| column as usize)
    }

    pub fn clear(&mut self) {
        self.moves = [[None; KILLERS_PER_DEPTH]; MAX_DEPTH];
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}
