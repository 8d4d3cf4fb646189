use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::seed::Pattern;
use crate::ucore::{AccumulatorInit, EngineConfig, TargetMode};

pub const DEFAULT_CORES: usize = 64;
pub const DEFAULT_MEMORY_KIB: usize = 64 * 1024;

/// Animate an LED grid with a swarm of tiny colour-mixing cores.
#[derive(Parser, Debug)]
#[command(name = "microcore", version)]
pub struct Args {
    /// Number of cores, one per display position
    #[arg(long, default_value_t = DEFAULT_CORES)]
    pub cores: usize,

    /// Total memory in KiB, split evenly between the cores
    #[arg(long, default_value_t = DEFAULT_MEMORY_KIB)]
    pub memory_kib: usize,

    /// Load memory from this file instead of seeding it
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Millisecond delay between display updates
    #[arg(long, default_value_t = 33)]
    pub msecdelay: u64,

    /// Length of one DELAY tick in microseconds
    #[arg(long, default_value_t = 1000)]
    pub delay_unit_us: u64,

    /// Display brightness, 0-255
    #[arg(long, default_value_t = 128)]
    pub brightness: u8,

    /// Display width in pixels
    #[arg(long, default_value_t = 8)]
    pub width: usize,

    /// Display height in pixels
    #[arg(long, default_value_t = 8)]
    pub height: usize,

    /// Run without drawing anything
    #[arg(long)]
    pub headless: bool,

    /// Red and green only
    #[arg(long)]
    pub xmas: bool,

    /// Grey tones only
    #[arg(long)]
    pub greyscale: bool,

    /// Purple tones only
    #[arg(long)]
    pub purple: bool,

    /// Blue tones only
    #[arg(long)]
    pub blue_only: bool,

    /// Only use drain and fill operations
    #[arg(long)]
    pub drainfill: bool,

    /// Where DRAIN and FILL stop
    #[arg(long, value_enum, default_value_t = Target::Extreme)]
    pub target: Target,

    /// Start each core with its first cell's colour instead of black
    #[arg(long)]
    pub preload: bool,

    /// Seed for memory randomization
    #[arg(long)]
    pub seed: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// drain to black, fill to white
    Extreme,
    /// drain and fill to the cell's own colour
    Operand,
}

/// where memory comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemorySource {
    Image(PathBuf),
    Seeded {
        len: usize,
        pattern: Pattern,
        drain_fill: bool,
        seed: u64,
    },
}

/// everything the program needs, read once and never changed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub cores: usize,
    pub memory: MemorySource,
    pub frame_delay: Duration,
    pub brightness: u8,
    pub width: usize,
    pub height: usize,
    pub headless: bool,
    pub engine: EngineConfig,
}

impl Args {
    /// Check the arguments against each other and settle the defaults. The
    /// memory split itself is checked again when the pool launches, since an
    /// image file's length isn't known yet.
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        if self.cores == 0 {
            return Err(ConfigError::NoCores);
        }
        let pixels = self
            .width
            .checked_mul(self.height)
            .ok_or(ConfigError::TooLarge("display"))?;
        if pixels < self.cores {
            return Err(ConfigError::DisplayTooSmall {
                pixels,
                cores: self.cores,
            });
        }
        let pattern = self.pattern()?;
        let memory = match self.image {
            Some(path) => MemorySource::Image(path),
            None => {
                let len = self
                    .memory_kib
                    .checked_mul(1024)
                    .ok_or(ConfigError::TooLarge("memory"))?;
                let split = self
                    .cores
                    .checked_mul(4)
                    .ok_or(ConfigError::TooLarge("core count"))?;
                if len % split != 0 {
                    return Err(ConfigError::MisalignedMemory {
                        len,
                        cores: self.cores,
                    });
                }
                MemorySource::Seeded {
                    len,
                    pattern,
                    drain_fill: self.drainfill,
                    seed: self.seed.unwrap_or_else(rand::random),
                }
            }
        };
        Ok(RunConfig {
            cores: self.cores,
            memory,
            frame_delay: Duration::from_millis(self.msecdelay),
            brightness: self.brightness,
            width: self.width,
            height: self.height,
            headless: self.headless,
            engine: EngineConfig {
                target_mode: match self.target {
                    Target::Extreme => TargetMode::Extreme,
                    Target::Operand => TargetMode::Operand,
                },
                palette_restricted: self.xmas,
                accumulator_init: if self.preload {
                    AccumulatorInit::FirstCell
                } else {
                    AccumulatorInit::Zero
                },
                delay_unit: Duration::from_micros(self.delay_unit_us),
            },
        })
    }

    fn pattern(&self) -> Result<Pattern, ConfigError> {
        let chosen = [
            (self.xmas, Pattern::Xmas),
            (self.greyscale, Pattern::Greyscale),
            (self.purple, Pattern::Purple),
            (self.blue_only, Pattern::BlueOnly),
        ];
        let mut picked = chosen.iter().filter(|(on, _)| *on).map(|(_, p)| *p);
        match (picked.next(), picked.next()) {
            (None, _) => Ok(Pattern::Random),
            (Some(p), None) => Ok(p),
            (Some(_), Some(_)) => Err(ConfigError::ConflictingPatterns),
        }
    }
}
