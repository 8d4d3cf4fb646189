//! # pool
//!
//! Cuts memory into one region per core, gives each core a display position
//! equal to its index, and starts them all on their own threads. After
//! `launch` returns the pool only holds the receiving ends; the cores are on
//! their own until they finish.

use crossbeam::channel::{self, Receiver};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::color::Rgb;
use crate::error::Error;
use crate::memory::Memory;
use crate::ucore::{CoreReport, EngineConfig, MicroCore};

/// the aggregator's view of one running core
pub struct CoreHandle {
    pub index: usize,
    /// colours, in the order the core produced them. zero capacity: a send
    /// only completes once the colour has been taken
    pub results: Receiver<Rgb>,
    /// fires exactly once, after the last colour has been taken
    pub done: Receiver<()>,
    thread: JoinHandle<CoreReport>,
}

impl CoreHandle {
    /// Wait for the thread to exit. `None` if it panicked. The receivers
    /// are dropped first, so a core still blocked on a send gets an error
    /// and winds down instead of waiting forever.
    pub fn join(self) -> Option<CoreReport> {
        let CoreHandle {
            results,
            done,
            thread,
            ..
        } = self;
        drop(results);
        drop(done);
        thread.join().ok()
    }
}

pub struct CorePool {
    handles: Vec<CoreHandle>,
}

impl CorePool {
    /// Split `memory` into `cores` regions and start one core on each. The
    /// split is checked before anything is spawned, so a bad configuration
    /// never leaves half a pool running.
    pub fn launch(memory: Memory, cores: usize, config: EngineConfig) -> Result<CorePool, Error> {
        let regions = memory.into_regions(cores)?;
        debug!(cores, region_bytes = regions[0].len(), "launching cores");
        let mut handles = Vec::with_capacity(cores);
        for (index, region) in regions.into_iter().enumerate() {
            let (result_tx, result_rx) = channel::bounded(0);
            let (done_tx, done_rx) = channel::bounded(1);
            let core = MicroCore::new(index, region, config, result_tx, done_tx);
            let thread = thread::Builder::new()
                .name(format!("core-{}", index))
                .spawn(move || core.execute())
                .map_err(|source| Error::Spawn { index, source })?;
            handles.push(CoreHandle {
                index,
                results: result_rx,
                done: done_rx,
                thread,
            });
        }
        Ok(CorePool { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[CoreHandle] {
        &self.handles
    }

    /// wait for every core thread and collect what they did
    pub fn join(self) -> Vec<CoreReport> {
        let mut reports = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let index = handle.index;
            match handle.join() {
                Some(report) => reports.push(report),
                None => warn!(core = index, "core thread panicked"),
            }
        }
        let colors: usize = reports.iter().map(|r| r.colors).sum();
        let cells: usize = reports.iter().map(|r| r.cells).sum();
        info!(cores = reports.len(), cells, colors, "all cores joined");
        reports
    }
}
