use std::io;
use std::ops::Range;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::instruction::CELL_SIZE;

// NB. addresses and lengths are both usize; the memory is a flat byte array
//     with no map of its own, the cores impose all the structure

/// The whole memory buffer, before it's handed out to the cores. It is
/// writable up until it gets split into regions; after that it's frozen.
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    /// zeroed memory of `len` bytes
    pub fn new(len: usize) -> Self {
        Memory {
            bytes: vec![0u8; len].into_boxed_slice(),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Memory {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// read a memory image of unknown length, e.g. a file saved from a
    /// previous seeding
    pub fn load(reader: &mut impl io::Read) -> Result<Self, io::Error> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Memory::from_bytes(buf))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// get a r/o slice of the underlying memory
    pub fn get_ro_slice(&self, addr: usize, len: usize) -> &[u8] {
        &self.bytes[addr..(addr + len)]
    }

    /// every cell as a mutable 4-byte chunk, in address order
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.bytes.chunks_exact_mut(CELL_SIZE)
    }

    /// Freeze the memory and cut it into `count` equal, contiguous regions.
    /// The length has to be a whole number of cells per region, otherwise
    /// nothing gets handed out at all.
    pub fn into_regions(self, count: usize) -> Result<Vec<Region>, ConfigError> {
        if count == 0 {
            return Err(ConfigError::NoCores);
        }
        let len = self.bytes.len();
        if len % (CELL_SIZE * count) != 0 {
            return Err(ConfigError::MisalignedMemory { len, cores: count });
        }
        let size = len / count;
        let shared: Arc<[u8]> = Arc::from(self.bytes);
        Ok((0..count)
            .map(|i| Region {
                memory: Arc::clone(&shared),
                range: (i * size)..((i + 1) * size),
            })
            .collect())
    }
}

/// A core's private, read-only window onto the frozen memory. Regions never
/// overlap, so sharing the backing buffer is safe without any locking.
#[derive(Clone)]
pub struct Region {
    memory: Arc<[u8]>,
    range: Range<usize>,
}

impl Region {
    pub fn bytes(&self) -> &[u8] {
        &self.memory[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}
