/// one colour as produced by a core, or as held by a display position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// scale every channel by brightness/255
    pub fn dimmed(self, brightness: u8) -> Self {
        let scale = |c: u8| ((c as u16 * brightness as u16) / 255) as u8;
        Rgb::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

/// Restricted ("xmas") palette: every colour leaving a core is reduced to a
/// pure red or a pure green. Which one survives is decided by the operands of
/// the cell being executed, not by the accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteFilter {
    /// colours pass through untouched
    Full,
    /// keep red only
    RedOnly,
    /// keep green only
    GreenOnly,
}

impl PaletteFilter {
    /// pick the filter for a cell with operands (r, g, _)
    pub fn for_operands(restricted: bool, r: u8, g: u8) -> Self {
        match (restricted, r > g) {
            (false, _) => PaletteFilter::Full,
            (true, true) => PaletteFilter::RedOnly,
            (true, false) => PaletteFilter::GreenOnly,
        }
    }

    pub fn apply(self, c: Rgb) -> Rgb {
        match self {
            PaletteFilter::Full => c,
            PaletteFilter::RedOnly => Rgb::new(c.r, 0, 0),
            PaletteFilter::GreenOnly => Rgb::new(0, c.g, 0),
        }
    }
}
