//! # instruction
//!
//! Memory is a flat run of 4-byte cells:
//!
//!   byte 0  red operand
//!   byte 1  green operand
//!   byte 2  blue operand
//!   byte 3  opcode
//!
//! Every byte value is a legal opcode; anything not listed in `Opcode` is a
//! no-op. There is nothing to validate, so decoding can't fail.

use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;
use strum::IntoStaticStr;

pub const CELL_SIZE: usize = 4;

const RED: usize = 0;
const GREEN: usize = 1;
const BLUE: usize = 2;
const CONTROL: usize = 3;

/// Opcodes of the micro-cores. The discriminant is the control byte; any
/// byte without a named opcode lands in `Unknown` and keeps its value, so
/// decoding is total and re-encoding gives back the original byte.
#[derive(
    FromPrimitive, IntoPrimitive, IntoStaticStr, Clone, Copy, Debug, PartialEq, Eq, Hash,
)]
#[repr(u8)]
pub enum Opcode {
    Delay = 0,
    Add = 1,
    Sub = 2,
    Mul = 3,
    Div = 4,
    Set = 5,
    Rotate = 6,
    Drain = 7,
    Fill = 8,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Unknown(byte) => write!(f, "NOP(0x{:02x})", byte),
            op => f.write_str(op.into()),
        }
    }
}

/// one decoded cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub opcode: Opcode,
}

impl Cell {
    pub fn new(r: u8, g: u8, b: u8, opcode: Opcode) -> Self {
        Cell { r, g, b, opcode }
    }

    /// back to the 4 bytes it came from
    pub fn encode(&self) -> [u8; CELL_SIZE] {
        [self.r, self.g, self.b, self.opcode.into()]
    }
}

/// decode exactly one cell; operands come back unchanged
pub fn decode(bytes: &[u8; CELL_SIZE]) -> Cell {
    Cell {
        r: bytes[RED],
        g: bytes[GREEN],
        b: bytes[BLUE],
        opcode: Opcode::from(bytes[CONTROL]),
    }
}

/// walk a region cell by cell, in address order. any trailing partial cell
/// is ignored; regions are always whole cells anyway
pub fn cells(bytes: &[u8]) -> impl Iterator<Item = Cell> + '_ {
    bytes.chunks_exact(CELL_SIZE).map(|chunk| {
        let mut cell = [0u8; CELL_SIZE];
        cell.copy_from_slice(chunk);
        decode(&cell)
    })
}
