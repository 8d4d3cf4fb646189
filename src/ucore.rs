//! # ucore
//!
//! A micro-core walks its own region one cell at a time, folding each cell
//! into a running RGB accumulator and pushing the colours that result down
//! its output stream. It owns nothing that any other core can see.
//!
//!  * arithmetic is total: ADD/SUB saturate, MUL wraps, DIV by zero is skipped
//!    per channel
//!  * DELAY only passes time; it emits nothing
//!  * DRAIN/FILL are whole animations in one cell: one colour per step,
//!    two "settled" colours, then a reset to the cell operands and one more
//!  * everything else emits exactly one colour after it executes
//!
//! Every emission is a blocking handoff to the aggregator, so a core can never
//! run further ahead than the display is consuming.

use crossbeam::channel::{SendError, Sender};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::color::{PaletteFilter, Rgb};
use crate::instruction::{self, Cell, Opcode};
use crate::memory::Region;

/// where DRAIN and FILL stop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetMode {
    /// DRAIN runs to 0, FILL runs to 255
    Extreme,
    /// both run to the cell operands (DRAIN-TO / FILL-TO)
    Operand,
}

/// what the accumulator holds before the first cell executes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumulatorInit {
    Zero,
    /// preload with the operands of the region's first cell
    FirstCell,
}

/// fixed for the lifetime of a core; there's no global mode state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub target_mode: TargetMode,
    pub palette_restricted: bool,
    pub accumulator_init: AccumulatorInit,
    /// one DELAY tick
    pub delay_unit: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            target_mode: TargetMode::Extreme,
            palette_restricted: false,
            accumulator_init: AccumulatorInit::Zero,
            delay_unit: Duration::from_millis(1),
        }
    }
}

/// the opcode engine: one accumulator plus the config that shapes it
pub struct Engine {
    config: EngineConfig,
    acc: Rgb,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            config,
            acc: Rgb::BLACK,
        }
    }

    pub fn accumulator(&self) -> Rgb {
        self.acc
    }

    pub fn preload(&mut self, cell: &Cell) {
        self.acc = Rgb::new(cell.r, cell.g, cell.b);
    }

    /// execute one cell, handing every colour it produces to `emit` in order
    pub fn step<E>(
        &mut self,
        cell: &Cell,
        mut emit: impl FnMut(Rgb) -> Result<(), E>,
    ) -> Result<(), E> {
        let filter = PaletteFilter::for_operands(self.config.palette_restricted, cell.r, cell.g);
        let keep_blue = !self.config.palette_restricted;
        let acc = &mut self.acc;
        match cell.opcode {
            Opcode::Delay => {
                let ticks = (cell.r as u32 + cell.g as u32 + cell.b as u32) % 128;
                let pause = self.config.delay_unit * ticks;
                if !pause.is_zero() {
                    spin_sleep::sleep(pause);
                }
                return Ok(());
            }
            Opcode::Add => {
                acc.r = acc.r.saturating_add(cell.r);
                acc.g = acc.g.saturating_add(cell.g);
                if keep_blue {
                    acc.b = acc.b.saturating_add(cell.b);
                }
            }
            Opcode::Sub => {
                acc.r = acc.r.saturating_sub(cell.r);
                acc.g = acc.g.saturating_sub(cell.g);
                if keep_blue {
                    acc.b = acc.b.saturating_sub(cell.b);
                }
            }
            Opcode::Mul => {
                acc.r = acc.r.wrapping_mul(cell.r);
                acc.g = acc.g.wrapping_mul(cell.g);
                if keep_blue {
                    acc.b = acc.b.wrapping_mul(cell.b);
                }
            }
            Opcode::Div => {
                acc.r = acc.r.checked_div(cell.r).unwrap_or(acc.r);
                acc.g = acc.g.checked_div(cell.g).unwrap_or(acc.g);
                if keep_blue {
                    acc.b = acc.b.checked_div(cell.b).unwrap_or(acc.b);
                }
            }
            Opcode::Set => {
                acc.r = cell.r;
                acc.g = cell.g;
                if keep_blue {
                    acc.b = cell.b;
                }
            }
            Opcode::Rotate => {
                *acc = if keep_blue {
                    Rgb::new(acc.b, acc.r, acc.g)
                } else {
                    Rgb::new(acc.g, acc.r, acc.b)
                };
            }
            Opcode::Drain => {
                let target = match self.config.target_mode {
                    TargetMode::Extreme => Rgb::BLACK,
                    TargetMode::Operand => Rgb::new(cell.r, cell.g, cell.b),
                };
                while acc.r > target.r || acc.g > target.g || acc.b > target.b {
                    if acc.r > target.r {
                        acc.r = acc.r.saturating_sub(1);
                    }
                    if acc.g > target.g {
                        acc.g = acc.g.saturating_sub(1);
                    }
                    if acc.b > target.b {
                        acc.b = acc.b.saturating_sub(1);
                    }
                    emit(filter.apply(*acc))?;
                }
                return Self::settle(acc, cell, filter, emit);
            }
            Opcode::Fill => {
                let target = match self.config.target_mode {
                    TargetMode::Extreme => Rgb::new(255, 255, 255),
                    TargetMode::Operand => Rgb::new(cell.r, cell.g, cell.b),
                };
                while acc.r < target.r || acc.g < target.g || acc.b < target.b {
                    if acc.r < target.r {
                        acc.r = acc.r.saturating_add(1);
                    }
                    if acc.g < target.g {
                        acc.g = acc.g.saturating_add(1);
                    }
                    if acc.b < target.b {
                        acc.b = acc.b.saturating_add(1);
                    }
                    emit(filter.apply(*acc))?;
                }
                return Self::settle(acc, cell, filter, emit);
            }
            Opcode::Unknown(_) => {}
        }
        emit(filter.apply(*acc))
    }

    // tail shared by DRAIN and FILL: hold the settled colour for two frames,
    // then jump to the cell operands
    fn settle<E>(
        acc: &mut Rgb,
        cell: &Cell,
        filter: PaletteFilter,
        mut emit: impl FnMut(Rgb) -> Result<(), E>,
    ) -> Result<(), E> {
        let settled = filter.apply(*acc);
        emit(settled)?;
        emit(settled)?;
        *acc = Rgb::new(cell.r, cell.g, cell.b);
        emit(filter.apply(*acc))
    }
}

/// what a core did, returned through its join handle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreReport {
    pub index: usize,
    pub cells: usize,
    pub colors: usize,
}

pub struct MicroCore {
    index: usize,
    region: Region,
    engine: Engine,
    results: Sender<Rgb>,
    done: Sender<()>,
}

impl MicroCore {
    pub fn new(
        index: usize,
        region: Region,
        config: EngineConfig,
        results: Sender<Rgb>,
        done: Sender<()>,
    ) -> Self {
        MicroCore {
            index,
            region,
            engine: Engine::new(config),
            results,
            done,
        }
    }

    /// Run the region to the end. The completion signal goes out only after
    /// the last colour has been taken by the receiver, so whoever sees
    /// completion has already seen everything this core produced.
    pub fn execute(mut self) -> CoreReport {
        debug!(core = self.index, bytes = self.region.len(), "walking through memory");
        let mut report = CoreReport {
            index: self.index,
            ..CoreReport::default()
        };

        if self.engine.config.accumulator_init == AccumulatorInit::FirstCell {
            if let Some(first) = instruction::cells(self.region.bytes()).next() {
                self.engine.preload(&first);
            }
        }

        let results = &self.results;
        for cell in instruction::cells(self.region.bytes()) {
            trace!(core = self.index, op = %cell.opcode, "step");
            let stepped = self.engine.step(&cell, |c| {
                results.send(c)?;
                report.colors += 1;
                Ok::<(), SendError<Rgb>>(())
            });
            report.cells += 1;
            if stepped.is_err() {
                warn!(core = self.index, "result stream closed; stopping early");
                break;
            }
        }

        debug!(core = self.index, cells = report.cells, colors = report.colors, "done walking");
        // the aggregator may already be gone; there's nobody left to tell
        let _ = self.done.send(());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use crossbeam::channel;
    use std::convert::Infallible;

    fn fast(target_mode: TargetMode, palette_restricted: bool) -> EngineConfig {
        EngineConfig {
            target_mode,
            palette_restricted,
            accumulator_init: AccumulatorInit::Zero,
            delay_unit: Duration::ZERO,
        }
    }

    fn engine_at(config: EngineConfig, start: Rgb) -> Engine {
        let mut e = Engine::new(config);
        e.acc = start;
        e
    }

    fn run(e: &mut Engine, cell: Cell) -> Vec<Rgb> {
        let mut out = Vec::new();
        e.step(&cell, |c| {
            out.push(c);
            Ok::<(), Infallible>(())
        })
        .unwrap();
        out
    }

    #[test]
    fn test_add_sub_never_wrap() {
        let config = fast(TargetMode::Extreme, false);
        for start in [0u8, 1, 100, 200, 254, 255] {
            for operand in [0u8, 1, 56, 128, 255] {
                let mut e = engine_at(config, Rgb::new(start, start, start));
                run(&mut e, Cell::new(operand, operand, operand, Opcode::Add));
                let added = e.accumulator();
                assert_eq!(added.r, start.saturating_add(operand));
                assert!(added.r >= start);

                let mut e = engine_at(config, Rgb::new(start, start, start));
                run(&mut e, Cell::new(operand, operand, operand, Opcode::Sub));
                let subbed = e.accumulator();
                assert_eq!(subbed.g, start.saturating_sub(operand));
                assert!(subbed.g <= start);
            }
        }
    }

    #[test]
    fn test_add_clamps_per_channel() {
        let mut e = engine_at(fast(TargetMode::Extreme, false), Rgb::new(250, 10, 0));
        let out = run(&mut e, Cell::new(10, 10, 10, Opcode::Add));
        assert_eq!(out, vec![Rgb::new(255, 20, 10)]);
    }

    #[test]
    fn test_mul_wraps() {
        let mut e = engine_at(fast(TargetMode::Extreme, false), Rgb::new(16, 3, 200));
        run(&mut e, Cell::new(16, 3, 2, Opcode::Mul));
        assert_eq!(e.accumulator(), Rgb::new(0, 9, 144));
    }

    #[test]
    fn test_div_by_zero_leaves_channel() {
        let mut e = engine_at(fast(TargetMode::Extreme, false), Rgb::new(100, 90, 80));
        let out = run(&mut e, Cell::new(0, 3, 0, Opcode::Div));
        assert_eq!(out, vec![Rgb::new(100, 30, 80)]);
    }

    #[test]
    fn test_rotate_three_times_is_identity() {
        let start = Rgb::new(1, 2, 3);
        let mut e = engine_at(fast(TargetMode::Extreme, false), start);
        let first = run(&mut e, Cell::new(0, 0, 0, Opcode::Rotate));
        assert_eq!(first, vec![Rgb::new(3, 1, 2)]);
        run(&mut e, Cell::new(0, 0, 0, Opcode::Rotate));
        run(&mut e, Cell::new(0, 0, 0, Opcode::Rotate));
        assert_eq!(e.accumulator(), start);
    }

    #[test]
    fn test_delay_emits_nothing() {
        let mut e = engine_at(fast(TargetMode::Extreme, false), Rgb::new(4, 5, 6));
        let out = run(&mut e, Cell::new(100, 100, 100, Opcode::Delay));
        assert!(out.is_empty());
        assert_eq!(e.accumulator(), Rgb::new(4, 5, 6));
    }

    #[test]
    fn test_unknown_opcode_is_noop_with_one_emit() {
        let mut e = engine_at(fast(TargetMode::Extreme, false), Rgb::new(4, 5, 6));
        let out = run(&mut e, Cell::new(1, 1, 1, Opcode::Unknown(77)));
        assert_eq!(out, vec![Rgb::new(4, 5, 6)]);
    }

    #[test]
    fn test_drain_to_zero_sequence() {
        let mut e = engine_at(fast(TargetMode::Extreme, false), Rgb::new(3, 1, 2));
        let out = run(&mut e, Cell::new(9, 8, 7, Opcode::Drain));
        assert_eq!(
            out,
            vec![
                Rgb::new(2, 0, 1),
                Rgb::new(1, 0, 0),
                Rgb::new(0, 0, 0),
                Rgb::new(0, 0, 0),
                Rgb::new(0, 0, 0),
                Rgb::new(9, 8, 7),
            ]
        );
        assert_eq!(e.accumulator(), Rgb::new(9, 8, 7));
    }

    #[test]
    fn test_drain_step_count_is_max_channel() {
        for start in [Rgb::new(0, 0, 0), Rgb::new(255, 3, 40), Rgb::new(12, 80, 79)] {
            let mut e = engine_at(fast(TargetMode::Extreme, false), start);
            let out = run(&mut e, Cell::new(1, 2, 3, Opcode::Drain));
            let max = start.r.max(start.g).max(start.b) as usize;
            assert_eq!(out.len(), max + 3);
            assert_eq!(out[max], Rgb::BLACK);
            assert_eq!(out[max + 1], Rgb::BLACK);
            assert_eq!(out[max + 2], Rgb::new(1, 2, 3));
        }
    }

    #[test]
    fn test_fill_to_extreme() {
        let mut e = engine_at(fast(TargetMode::Extreme, false), Rgb::new(254, 255, 253));
        let out = run(&mut e, Cell::new(0, 0, 0, Opcode::Fill));
        assert_eq!(
            out,
            vec![
                Rgb::new(255, 255, 254),
                Rgb::new(255, 255, 255),
                Rgb::new(255, 255, 255),
                Rgb::new(255, 255, 255),
                Rgb::new(0, 0, 0),
            ]
        );
    }

    #[test]
    fn test_fill_to_operand_only_raises_low_channels() {
        let mut e = engine_at(fast(TargetMode::Operand, false), Rgb::new(10, 50, 3));
        let out = run(&mut e, Cell::new(12, 20, 4, Opcode::Fill));
        // g is already above its target and must never move
        assert_eq!(
            out,
            vec![
                Rgb::new(11, 50, 4),
                Rgb::new(12, 50, 4),
                Rgb::new(12, 50, 4),
                Rgb::new(12, 50, 4),
                Rgb::new(12, 20, 4),
            ]
        );
        assert_eq!(e.accumulator(), Rgb::new(12, 20, 4));
    }

    #[test]
    fn test_drain_to_operand_only_lowers_high_channels() {
        let mut e = engine_at(fast(TargetMode::Operand, false), Rgb::new(5, 0, 9));
        let out = run(&mut e, Cell::new(3, 7, 9, Opcode::Drain));
        assert_eq!(
            out,
            vec![
                Rgb::new(4, 0, 9),
                Rgb::new(3, 0, 9),
                Rgb::new(3, 0, 9),
                Rgb::new(3, 0, 9),
                Rgb::new(3, 7, 9),
            ]
        );
    }

    #[test]
    fn test_restricted_palette_skips_blue() {
        let mut e = engine_at(fast(TargetMode::Extreme, true), Rgb::new(10, 10, 10));
        let out = run(&mut e, Cell::new(5, 1, 50, Opcode::Add));
        assert_eq!(e.accumulator(), Rgb::new(15, 11, 10));
        // r > g on the operands, so only red survives
        assert_eq!(out, vec![Rgb::new(15, 0, 0)]);
    }

    #[test]
    fn test_restricted_palette_filters_drain() {
        let mut e = engine_at(fast(TargetMode::Extreme, true), Rgb::new(2, 2, 2));
        let out = run(&mut e, Cell::new(0, 9, 0, Opcode::Drain));
        assert_eq!(
            out,
            vec![
                Rgb::new(0, 1, 0),
                Rgb::new(0, 0, 0),
                Rgb::new(0, 0, 0),
                Rgb::new(0, 0, 0),
                Rgb::new(0, 9, 0),
            ]
        );
    }

    #[test]
    fn test_restricted_rotate_swaps_red_green() {
        let mut e = engine_at(fast(TargetMode::Extreme, true), Rgb::new(1, 2, 3));
        run(&mut e, Cell::new(0, 0, 0, Opcode::Rotate));
        assert_eq!(e.accumulator(), Rgb::new(2, 1, 3));
    }

    #[test]
    fn test_stops_on_first_failed_emit() {
        let mut e = engine_at(fast(TargetMode::Extreme, false), Rgb::new(10, 10, 10));
        let mut sent = 0;
        let r = e.step(&Cell::new(0, 0, 0, Opcode::Drain), |_| {
            sent += 1;
            if sent == 3 {
                Err("closed")
            } else {
                Ok(())
            }
        });
        assert_eq!(r, Err("closed"));
        assert_eq!(sent, 3);
    }

    fn core_over(bytes: &[u8], config: EngineConfig) -> (Vec<Rgb>, CoreReport, bool) {
        let region = Memory::from_bytes(bytes.to_vec())
            .into_regions(1)
            .unwrap()
            .remove(0);
        let (tx, rx) = channel::unbounded();
        let (done_tx, done_rx) = channel::bounded(1);
        let report = MicroCore::new(0, region, config, tx, done_tx).execute();
        (rx.try_iter().collect(), report, done_rx.try_recv().is_ok())
    }

    #[test]
    fn test_delay_then_set_emits_once() {
        let (colors, report, done) = core_over(
            &[10, 10, 10, 0, 1, 2, 3, 5],
            fast(TargetMode::Extreme, false),
        );
        assert_eq!(colors, vec![Rgb::new(1, 2, 3)]);
        assert_eq!(report.cells, 2);
        assert_eq!(report.colors, 1);
        assert!(done);
    }

    #[test]
    fn test_preload_first_cell() {
        let mut config = fast(TargetMode::Extreme, false);
        config.accumulator_init = AccumulatorInit::FirstCell;
        // NOP keeps the preloaded value, then ADD builds on it
        let (colors, _, _) = core_over(&[7, 8, 9, 99, 1, 1, 1, 1], config);
        assert_eq!(colors, vec![Rgb::new(7, 8, 9), Rgb::new(8, 9, 10)]);
    }

    #[test]
    fn test_empty_region_signals_done() {
        let (colors, report, done) = core_over(&[], fast(TargetMode::Extreme, false));
        assert!(colors.is_empty());
        assert_eq!(report.cells, 0);
        assert!(done);
    }

    #[test]
    fn test_closed_stream_ends_core() {
        let region = Memory::from_bytes(vec![1, 1, 1, 1, 2, 2, 2, 1])
            .into_regions(1)
            .unwrap()
            .remove(0);
        let (tx, rx) = channel::bounded(0);
        drop(rx);
        let (done_tx, done_rx) = channel::bounded(1);
        let report = MicroCore::new(3, region, fast(TargetMode::Extreme, false), tx, done_tx)
            .execute();
        assert_eq!(report.index, 3);
        assert_eq!(report.cells, 1);
        assert_eq!(report.colors, 0);
        assert!(done_rx.try_recv().is_ok());
    }
}
