use core::fmt::Display;

/// Default I2C address of the PCF8574A/PCF8547 backpacks this driver targets.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x3F;

/// Largest number of lines the DDRAM addressing model knows offsets for.
pub const MAX_LINES: u8 = 4;

/// Largest number of columns a single HD44780 controller can drive.
pub const MAX_COLUMNS: u8 = 40;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
/// How each nibble is framed into expander writes.
pub enum Framing {
    /// The nibble is written together with EN high, then again with EN low. Four expander
    /// writes per controller word.
    #[default]
    Compact,
    /// The nibble is written with EN low, EN is raised and lowered in two more writes, and after
    /// the low nibble the expander is left holding only the backlight bit. Seven expander
    /// writes per controller word.
    Strobed,
}

impl From<&Framing> for &'static str {
    fn from(framing: &Framing) -> Self {
        match framing {
            Framing::Compact => "compact",
            Framing::Strobed => "strobed",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Framing {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

impl Display for Framing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
/// Character font height.
pub enum Font {
    /// 5x8 dots
    #[default]
    Dots5x8,
    /// 5x10 dots. The controller only supports this font in 1-line mode.
    Dots5x10,
}

/// DDRAM start address of each display line, indexed by 0-based line number.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RowOffsets(pub [u8; 4]);

impl RowOffsets {
    /// The table of a 20 column, 4 line display. Used for every geometry unless the caller
    /// configures another table.
    pub const FOUR_LINE: RowOffsets = RowOffsets([0x00, 0x40, 0x14, 0x54]);

    /// The controller-accurate table for common geometries. For displays with less than 4 lines,
    /// the unused lines repeat offsets of the lines that exist.
    pub const fn for_geometry(cols: u8, lines: u8) -> Self {
        match (cols, lines) {
            (16, 4) => RowOffsets([0x00, 0x40, 0x10, 0x50]),
            (_, 4) => RowOffsets::FOUR_LINE,
            (_, 1) => RowOffsets([0x00, 0x00, 0x00, 0x00]),
            _ => RowOffsets([0x00, 0x40, 0x00, 0x40]),
        }
    }

    /// Offset of a 1-based line, or `None` if the line is not in 1..=4.
    pub fn line(&self, line: u8) -> Option<u8> {
        match line {
            1..=MAX_LINES => Some(self.0[usize::from(line - 1)]),
            _ => None,
        }
    }
}

impl Default for RowOffsets {
    fn default() -> Self {
        RowOffsets::FOUR_LINE
    }
}

/// Display dimensions, as given to `begin`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Geometry {
    cols: u8,
    lines: u8,
}

impl Geometry {
    /// Validates the dimensions. Returns `None` for zero lines or columns, more than 4 lines, or
    /// more columns than one controller can address.
    pub const fn new(cols: u8, lines: u8) -> Option<Self> {
        if cols == 0 || lines == 0 || lines > MAX_LINES || cols > MAX_COLUMNS {
            return None;
        }
        Some(Self { cols, lines })
    }

    pub const fn cols(&self) -> u8 {
        self.cols
    }

    pub const fn lines(&self) -> u8 {
        self.lines
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Geometry {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}x{}", self.cols, self.lines);
    }
}

impl Display for Geometry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}", self.cols, self.lines)
    }
}

/// Construction-time options for a display.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct LcdConfig {
    pub(crate) address: u8,
    pub(crate) backlight: bool,
    pub(crate) power_up_init: bool,
    pub(crate) framing: Framing,
    pub(crate) verify_writes: bool,
    pub(crate) font: Font,
    pub(crate) row_offsets: RowOffsets,
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_I2C_ADDRESS,
            backlight: true,
            power_up_init: false,
            framing: Framing::default(),
            verify_writes: false,
            font: Font::default(),
            row_offsets: RowOffsets::default(),
        }
    }
}

impl LcdConfig {
    /// 7-bit I2C address of the expander.
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Initial backlight state.
    pub fn with_backlight(mut self, on: bool) -> Self {
        self.backlight = on;
        self
    }

    /// Set when the controller has not been initialized since it was powered on. The first
    /// initialization then starts with a raw function-set nibble and a 10 ms wait. Only use this
    /// right after power-up; on an already running controller the raw nibble desynchronizes the
    /// 4-bit framing.
    pub fn with_power_up_init(mut self, power_up_init: bool) -> Self {
        self.power_up_init = power_up_init;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Read every expander write back and fail with `ReadbackMismatch` if the expander holds a
    /// different byte. Doubles the bus traffic.
    pub fn with_write_verification(mut self, verify: bool) -> Self {
        self.verify_writes = verify;
        self
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = font;
        self
    }

    /// DDRAM row offsets used by cursor positioning and `message`.
    pub fn with_row_offsets(mut self, row_offsets: RowOffsets) -> Self {
        self.row_offsets = row_offsets;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    pub fn power_up_init(&self) -> bool {
        self.power_up_init
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn verify_writes(&self) -> bool {
        self.verify_writes
    }

    pub fn font(&self) -> Font {
        self.font
    }

    pub fn row_offsets(&self) -> RowOffsets {
        self.row_offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LcdConfig::default();
        assert_eq!(config.address(), 0x3F);
        assert!(config.backlight());
        assert!(!config.power_up_init());
        assert_eq!(config.framing(), Framing::Compact);
        assert!(!config.verify_writes());
        assert_eq!(config.font(), Font::Dots5x8);
        assert_eq!(config.row_offsets(), RowOffsets([0x00, 0x40, 0x14, 0x54]));
    }

    #[test]
    fn test_config_builder() {
        let config = LcdConfig::default()
            .with_address(0x27)
            .with_backlight(false)
            .with_power_up_init(true)
            .with_framing(Framing::Strobed)
            .with_write_verification(true)
            .with_font(Font::Dots5x10)
            .with_row_offsets(RowOffsets::for_geometry(16, 2));
        assert_eq!(config.address(), 0x27);
        assert!(!config.backlight());
        assert!(config.power_up_init());
        assert_eq!(config.framing(), Framing::Strobed);
        assert!(config.verify_writes());
        assert_eq!(config.font(), Font::Dots5x10);
        assert_eq!(config.row_offsets(), RowOffsets([0x00, 0x40, 0x00, 0x40]));
    }

    #[test]
    fn test_geometry_validation() {
        assert!(Geometry::new(20, 4).is_some());
        assert!(Geometry::new(16, 2).is_some());
        assert!(Geometry::new(40, 1).is_some());
        assert!(Geometry::new(0, 2).is_none());
        assert!(Geometry::new(16, 0).is_none());
        assert!(Geometry::new(20, 5).is_none());
        assert!(Geometry::new(41, 2).is_none());

        let geometry = Geometry::new(20, 4).unwrap();
        assert_eq!(geometry.cols(), 20);
        assert_eq!(geometry.lines(), 4);
    }

    #[test]
    fn test_row_offsets() {
        let offsets = RowOffsets::default();
        assert_eq!(offsets.line(1), Some(0x00));
        assert_eq!(offsets.line(2), Some(0x40));
        assert_eq!(offsets.line(3), Some(0x14));
        assert_eq!(offsets.line(4), Some(0x54));
        assert_eq!(offsets.line(0), None);
        assert_eq!(offsets.line(5), None);

        assert_eq!(RowOffsets::for_geometry(20, 4), RowOffsets::FOUR_LINE);
        assert_eq!(
            RowOffsets::for_geometry(16, 4),
            RowOffsets([0x00, 0x40, 0x10, 0x50])
        );
    }
}
