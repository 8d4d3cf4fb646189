use clap::Parser;
use std::error::Error;
use std::fs::File;
use tracing::{info, Level};

use microcore::config::{Args, MemorySource, RunConfig};
use microcore::display::{HeadlessDisplay, TermDisplay};
use microcore::error;
use microcore::memory::Memory;
use microcore::seed::Seeder;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let config = args.into_config()?;
    let memory = load_memory(&config)?;

    // bring the display up before any core exists, so a dead driver means
    // nothing was started
    if config.headless {
        let mut headless = HeadlessDisplay::new(config.width, config.height);
        microcore::run(&config, memory, &mut headless)?;
        info!(frames = headless.frames(), "finished");
    } else {
        let mut term =
            TermDisplay::new(config.width, config.height).map_err(error::Error::Display)?;
        microcore::run(&config, memory, &mut term)?;
    }
    Ok(())
}

fn load_memory(config: &RunConfig) -> Result<Memory, error::Error> {
    match &config.memory {
        MemorySource::Image(path) => {
            info!(path = %path.display(), "loading memory image");
            let mut f = File::open(path).map_err(error::Error::Image)?;
            Memory::load(&mut f).map_err(error::Error::Image)
        }
        MemorySource::Seeded {
            len,
            pattern,
            drain_fill,
            seed,
        } => {
            info!(bytes = len, seed, "seeding memory");
            let mut memory = Memory::new(*len);
            Seeder::new(*pattern, *drain_fill, *seed).fill(&mut memory);
            Ok(memory)
        }
    }
}
