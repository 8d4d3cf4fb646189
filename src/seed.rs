//! # seed
//!
//! Fills memory with something worth watching before the cores start. The
//! patterns only decide which operand bytes are allowed to be non-zero; the
//! opcode byte is either fully random or, with `drain_fill`, a coin toss
//! between DRAIN and FILL.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::instruction::Opcode;
use crate::memory::Memory;

const RED: usize = 0;
const GREEN: usize = 1;
const BLUE: usize = 2;
const CONTROL: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    /// independent random r, g, b
    Random,
    /// r = g = b
    Greyscale,
    /// r = b, no green
    Purple,
    /// blue only
    BlueOnly,
    /// either red or green per cell, never both, never blue
    Xmas,
}

pub struct Seeder {
    pattern: Pattern,
    drain_fill: bool,
    rng: StdRng,
}

impl Seeder {
    pub fn new(pattern: Pattern, drain_fill: bool, seed: u64) -> Self {
        Seeder {
            pattern,
            drain_fill,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// overwrite every cell in memory
    pub fn fill(&mut self, memory: &mut Memory) {
        debug!(pattern = ?self.pattern, drain_fill = self.drain_fill, "randomizing memory");
        for cell in memory.cells_mut() {
            self.seed_cell(cell);
        }
        debug!("done randomizing memory");
    }

    fn seed_cell(&mut self, cell: &mut [u8]) {
        cell[RED] = 0;
        cell[GREEN] = 0;
        cell[BLUE] = 0;
        match self.pattern {
            Pattern::Random => {
                cell[RED] = self.rng.gen();
                cell[GREEN] = self.rng.gen();
                cell[BLUE] = self.rng.gen();
            }
            Pattern::Greyscale => {
                let intensity = self.rng.gen();
                cell[RED] = intensity;
                cell[GREEN] = intensity;
                cell[BLUE] = intensity;
            }
            Pattern::Purple => {
                let intensity = self.rng.gen();
                cell[RED] = intensity;
                cell[BLUE] = intensity;
            }
            Pattern::BlueOnly => cell[BLUE] = self.rng.gen(),
            Pattern::Xmas => {
                let offset = if self.rng.gen_bool(0.5) { RED } else { GREEN };
                cell[offset] = self.rng.gen();
            }
        }
        cell[CONTROL] = if self.drain_fill {
            if self.rng.gen_bool(0.5) {
                Opcode::Fill.into()
            } else {
                Opcode::Drain.into()
            }
        } else {
            self.rng.gen()
        };
    }
}
