//! # aggregator
//!
//! The only consumer of every core. Each pass it looks at each core still
//! running exactly once and takes whatever that core has ready, without ever
//! waiting on it:
//!
//!  * a colour is waiting => it goes into the frame at the core's position
//!  * the core has signalled completion => it leaves the active set
//!  * neither => skip it, it'll be looked at again next pass
//!
//! After every pass the frame is flushed to the display and the aggregator
//! sleeps for the frame delay, so the refresh rate stays fixed however
//! bursty the cores are. A core blocked in DELAY, or halfway through a long
//! DRAIN, holds up nobody but itself.

use crossbeam::select;
use std::io;
use std::time::Duration;
use tracing::debug;

use crate::color::Rgb;
use crate::display::Display;
use crate::error::{ConfigError, Error};
use crate::pool::{CoreHandle, CorePool};

/// latest colour seen for every display position. positions whose core
/// hasn't produced anything yet are `None` and left alone on the display
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pixels: Vec<Option<Rgb>>,
}

impl Frame {
    pub fn new(positions: usize) -> Self {
        Frame {
            pixels: vec![None; positions],
        }
    }

    pub fn set(&mut self, position: usize, color: Rgb) {
        self.pixels[position] = Some(color);
    }

    pub fn get(&self, position: usize) -> Option<Rgb> {
        self.pixels.get(position).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// push every produced position to the display, then show it
    pub fn flush(&self, display: &mut impl Display) -> Result<(), io::Error> {
        for (position, color) in self.pixels.iter().enumerate() {
            if let Some(color) = color {
                display.set_pixel(position, *color);
            }
        }
        display.show()
    }
}

pub struct Aggregator {
    frame_delay: Duration,
}

impl Aggregator {
    pub fn new(frame_delay: Duration) -> Self {
        Aggregator { frame_delay }
    }

    /// Drive the display until every core in the pool has completed, and
    /// hand back the final frame. Output still sitting in a finished core's
    /// stream doesn't exist: a core only signals completion once its last
    /// colour has been taken.
    pub fn run(&self, pool: &CorePool, display: &mut impl Display) -> Result<Frame, Error> {
        if display.pixel_count() < pool.len() {
            return Err(ConfigError::DisplayTooSmall {
                pixels: display.pixel_count(),
                cores: pool.len(),
            }
            .into());
        }

        let mut frame = Frame::new(pool.len());
        let mut active: Vec<&CoreHandle> = pool.handles().iter().collect();
        let mut passes: u64 = 0;
        while !active.is_empty() {
            active.retain(|core| Self::poll(core, &mut frame));
            frame.flush(display).map_err(Error::Display)?;
            passes += 1;
            if !active.is_empty() && !self.frame_delay.is_zero() {
                spin_sleep::sleep(self.frame_delay);
            }
        }
        debug!(passes, "all cores signalled completion");
        Ok(frame)
    }

    // one non-blocking look at a core; false once it has finished
    fn poll(core: &CoreHandle, frame: &mut Frame) -> bool {
        select! {
            recv(core.results) -> msg => match msg {
                Ok(color) => {
                    frame.set(core.index, color);
                    true
                }
                // the sender is gone without a completion signal: the core
                // thread died, so there's nothing more to wait for
                Err(_) => false,
            },
            recv(core.done) -> _ => false,
            default => true,
        }
    }
}
