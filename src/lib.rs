//!
//! ## Design
//!
//! * a swarm of micro-cores, each chewing through its own slice of memory
//!   and turning it into a stream of colours for one LED
//! * cores share nothing; the only thing they talk to is the aggregator
//! * the aggregator never waits on a core, so the display refreshes at a
//!   steady rate however slow or bursty any single core is
//! * abstract display so can plug alternatives; starting with TUI in-console
//! * modes (target of DRAIN/FILL, restricted palette) are plain config
//!   handed to each core at construction, not global state
//!
//! Model
//!
//! Environment
//!  |-- config(args), display, memory(config)
//!  |-- pool(memory, config)
//!  |    |-- split memory into regions, one per core
//!  |    `-- core(region, index, config) on its own thread
//!  |         `-- for each cell: decode, execute, emit 0..n colours; then done
//!  `-- aggregator(pool, display)
//!       |   // one non-blocking look per core per pass; a pass never waits
//!       |-- while any core is active {
//!       |     for each active core: take a colour, or notice done, or skip
//!       |     flush frame to display; sleep(frame delay)
//!       |   }
//!       `-- join cores; shut the display down

pub mod aggregator;
pub mod color;
pub mod config;
pub mod display;
pub mod error;
pub mod instruction;
pub mod memory;
pub mod pool;
pub mod seed;
pub mod ucore;

use tracing::info;

use crate::aggregator::Aggregator;
use crate::config::RunConfig;
use crate::display::Display;
use crate::error::Error;
use crate::memory::Memory;
use crate::pool::CorePool;

/// Light the display, run every core in `memory` to completion and shut the
/// display down again. The display is released even when the aggregator
/// gives up part way through.
pub fn run(config: &RunConfig, memory: Memory, display: &mut impl Display) -> Result<(), Error> {
    display.set_brightness(config.brightness);
    display.clear();
    display.show().map_err(Error::Display)?;

    let pool = CorePool::launch(memory, config.cores, config.engine)?;
    info!(cores = pool.len(), "cores running");
    let outcome = Aggregator::new(config.frame_delay).run(&pool, display);
    pool.join();
    display.shutdown().map_err(Error::Display)?;
    outcome.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::config::MemorySource;
    use crate::display::DummyDisplay;
    use crate::instruction::{Cell, Opcode};
    use crate::ucore::EngineConfig;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config(cores: usize) -> RunConfig {
        RunConfig {
            cores,
            memory: MemorySource::Image(PathBuf::from("unused")),
            frame_delay: Duration::ZERO,
            brightness: 255,
            width: cores,
            height: 1,
            headless: true,
            engine: EngineConfig {
                delay_unit: Duration::ZERO,
                ..EngineConfig::default()
            },
        }
    }

    #[test]
    fn test_run_shows_final_frame_and_shuts_down() -> Result<(), Error> {
        let cells = [
            Cell::new(10, 20, 30, Opcode::Set),
            Cell::new(40, 50, 60, Opcode::Set),
        ];
        let bytes: Vec<u8> = cells.iter().flat_map(|c| c.encode()).collect();
        let mut display = DummyDisplay::new(2);
        run(&config(2), Memory::from_bytes(bytes), &mut display)?;
        assert!(display.is_shut_down());
        // the cleared frame goes out before any core starts
        assert_eq!(display.frames()[0], vec![Rgb::BLACK; 2]);
        assert_eq!(
            display.last_frame(),
            Some(&[Rgb::new(10, 20, 30), Rgb::new(40, 50, 60)][..])
        );
        Ok(())
    }

    #[test]
    fn test_run_rejects_bad_split_before_starting() {
        let mut display = DummyDisplay::new(4);
        let outcome = run(&config(4), Memory::new(20), &mut display);
        assert!(matches!(outcome, Err(Error::Config(_))));
        assert_eq!(display.frames().len(), 1);
        assert!(!display.is_shut_down());
    }
}
