use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use std::io;
use tracing::trace;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Paragraph};
use tui::Terminal;

use crate::color::Rgb;

/// Display is driven by the aggregator only; cores never see it. It should
/// abstract the implementation details, so an LED matrix, a terminal or
/// nothing at all would work the same way.
pub trait Display {
    /// 0 is off, 255 is full
    fn set_brightness(&mut self, brightness: u8);

    /// blank the pixel buffer; nothing is visible until the next `show`
    fn clear(&mut self);

    /// update one pixel in the buffer
    fn set_pixel(&mut self, position: usize, color: Rgb);

    /// push the buffer out to whatever is looking at it
    fn show(&mut self) -> Result<(), io::Error>;

    /// how many addressable positions there are
    fn pixel_count(&self) -> usize;

    /// release the device. safe to call more than once
    fn shutdown(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}

/// layout of display positions: row-major, position 0 top left
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid(pub usize, pub usize);

impl Grid {
    pub fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    /// (x, y) of a display position
    pub fn coords(&self, position: usize) -> (usize, usize) {
        (position % self.0, position / self.0)
    }

    /// arrange pixels by row, placing each one at its own coords
    pub fn layout(&self, pixels: &[Rgb]) -> Vec<Vec<Rgb>> {
        let mut rows = vec![vec![Rgb::BLACK; self.0]; self.1];
        for (position, color) in pixels.iter().enumerate().take(self.pixel_count()) {
            let (x, y) = self.coords(position);
            rows[y][x] = *color;
        }
        rows
    }

    /// the part of the grid's frame that fits on a terminal of `screen` size
    fn fit(&self, screen: Rect) -> Rect {
        self.frame_size().intersection(screen)
    }

    // terminal cells needed, including the border; each pixel is 2 columns
    // so it comes out roughly square
    fn frame_size(&self) -> Rect {
        Rect::new(0, 0, 2 + 2 * self.0 as u16, 2 + self.1 as u16)
    }
}

/// pixel buffer shared by the in-memory displays
struct PixelBuffer {
    pixels: Vec<Rgb>,
    brightness: u8,
}

impl PixelBuffer {
    fn new(len: usize) -> Self {
        PixelBuffer {
            pixels: vec![Rgb::BLACK; len],
            brightness: u8::MAX,
        }
    }

    fn set(&mut self, position: usize, color: Rgb) {
        assert!(
            position < self.pixels.len(),
            "display position {} out of range",
            position
        );
        self.pixels[position] = color;
    }

    fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = Rgb::BLACK);
    }

    fn visible(&self) -> Vec<Rgb> {
        self.pixels.iter().map(|p| p.dimmed(self.brightness)).collect()
    }
}

/// true-colour pixel grid in a terminal, rendered using TUI and Crossterm
pub struct TermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    grid: Grid,
    buffer: PixelBuffer,
    active: bool,
}

impl TermDisplay {
    pub fn new(width: usize, height: usize) -> Result<TermDisplay, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        let grid = Grid(width, height);
        Ok(TermDisplay {
            terminal,
            grid,
            buffer: PixelBuffer::new(grid.pixel_count()),
            active: true,
        })
    }

    fn rows(&self) -> Vec<Spans<'static>> {
        self.grid
            .layout(&self.buffer.visible())
            .into_iter()
            .map(|row| {
                Spans::from(
                    row.into_iter()
                        .map(|c| Span::styled("  ", Style::default().bg(Color::Rgb(c.r, c.g, c.b))))
                        .collect::<Vec<_>>(),
                )
            })
            .collect()
    }
}

impl Display for TermDisplay {
    fn set_brightness(&mut self, brightness: u8) {
        self.buffer.brightness = brightness;
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }

    fn set_pixel(&mut self, position: usize, color: Rgb) {
        self.buffer.set(position, color);
    }

    fn show(&mut self) -> Result<(), io::Error> {
        let rows = self.rows();
        let grid = self.grid;
        self.terminal.draw(|f| {
            let widget = Paragraph::new(rows.clone()).block(
                Block::default()
                    .title("µcores")
                    .borders(Borders::ALL)
                    .style(Style::default().bg(Color::Black)),
            );
            f.render_widget(widget, grid.fit(f.size()));
        })?;
        Ok(())
    }

    fn pixel_count(&self) -> usize {
        self.grid.pixel_count()
    }

    fn shutdown(&mut self) -> Result<(), io::Error> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.buffer.clear();
        self.terminal.clear()?;
        execute!(io::stdout(), Show, LeaveAlternateScreen)?;
        Ok(())
    }
}

impl Drop for TermDisplay {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// draws nothing; lets the cores run without a terminal attached
pub struct HeadlessDisplay {
    grid: Grid,
    frames: u64,
}

impl HeadlessDisplay {
    pub fn new(width: usize, height: usize) -> Self {
        HeadlessDisplay {
            grid: Grid(width, height),
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Display for HeadlessDisplay {
    fn set_brightness(&mut self, _brightness: u8) {}

    fn clear(&mut self) {}

    fn set_pixel(&mut self, position: usize, _color: Rgb) {
        assert!(
            position < self.grid.pixel_count(),
            "display position {} out of range",
            position
        );
    }

    fn show(&mut self) -> Result<(), io::Error> {
        self.frames += 1;
        trace!(frame = self.frames, "show");
        Ok(())
    }

    fn pixel_count(&self) -> usize {
        self.grid.pixel_count()
    }
}

/// useful for testing non-display routines; remembers every frame shown
pub struct DummyDisplay {
    buffer: PixelBuffer,
    frames: Vec<Vec<Rgb>>,
    shut_down: bool,
}

impl DummyDisplay {
    pub fn new(pixels: usize) -> Self {
        DummyDisplay {
            buffer: PixelBuffer::new(pixels),
            frames: Vec::new(),
            shut_down: false,
        }
    }

    /// every frame passed to `show`, brightness applied
    pub fn frames(&self) -> &[Vec<Rgb>] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&[Rgb]> {
        self.frames.last().map(Vec::as_slice)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Display for DummyDisplay {
    fn set_brightness(&mut self, brightness: u8) {
        self.buffer.brightness = brightness;
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }

    fn set_pixel(&mut self, position: usize, color: Rgb) {
        self.buffer.set(position, color);
    }

    fn show(&mut self) -> Result<(), io::Error> {
        self.frames.push(self.buffer.visible());
        Ok(())
    }

    fn pixel_count(&self) -> usize {
        self.buffer.pixels.len()
    }

    fn shutdown(&mut self) -> Result<(), io::Error> {
        self.shut_down = true;
        Ok(())
    }
}
