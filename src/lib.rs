//! This Rust `embedded-hal`-based library drives a [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! compatible character display through a PCF8574 (or PCF8547) I2C GPIO expander in an embedded, `no_std` environment.
//! These expanders are sold as "I2C backpacks" soldered to the back of 16x2 and 20x4 character displays. The expander
//! has a single 8-bit output register: the display's 4 data pins D4-D7 are wired to P4-P7, and the RS, RW, EN and
//! backlight lines to P0-P3. Every byte sent to the controller is split into two nibbles, high nibble first, each
//! latched with a pulse on the EN line.
//!
//! Key features include:
//! - Line-oriented text output with `message`, raw output at the cursor with `put_string` and `put_char`
//! - 1-based cursor positioning
//! - Display, cursor, blink, text direction, autoscroll and scrolling control
//! - Backlight control
//! - Byte pass-through upload of custom characters
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Compatible with the `embedded-hal` traits v1.0 and later
//! - Optional support for the `defmt` and `ufmt` logging frameworks
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! pcf8574-character-lcd = { version = "0.1", features = ["defmt"] }
//! ```
//! The `features = ["defmt"]` line is optional and enables the `defmt` feature, which logs the initialization and
//! bus traffic and allows the library's errors to be used with the `defmt` logging framework. Another optional
//! feature is `features = ["ufmt"]`, which allows the `uwriteln!` and `uwrite!` macros to be used.
//!
//! Create the display and configure its geometry. `begin` also runs the controller initialization sequence:
//! ```rust
//! use pcf8574_character_lcd::{CharacterDisplay, LcdConfig};
//!
//! // board setup
//! let i2c = ...; // I2C peripheral
//! let delay = ...; // DelayNs implementation
//!
//! // default I2C address 0x3F, backlight on
//! let mut lcd = CharacterDisplay::new(i2c, delay);
//! // or with options
//! let mut lcd = CharacterDisplay::new_with_config(
//!     i2c,
//!     LcdConfig::default().with_address(0x27).with_power_up_init(true),
//!     delay,
//! );
//!
//! if let Err(e) = lcd.begin(20, 4) {
//!    panic!("Error initializing LCD: {}", e);
//! }
//! ```
//! Use the display:
//! ```rust
//! lcd.message("Hello,\nworld!", 1)?;
//! lcd.set_cursor(2, 4)?.put_string(". <- (2,4)")?;
//! // can also use the `core::fmt::write!` macro
//! use core::fmt::Write;
//!
//! write!(lcd, "{} C", 21)?;
//! ```
//!
//! ### Timing
//! `clear` and `home` block for 3 ms after their command. The one-time power-up initialization blocks for 10 ms.
//! All waits go through the `DelayNs` implementation passed in at construction.
//!
//! ### Sharing
//! The display owns its I2C bus handle and needs `&mut self` for every command, so calls from several contexts must
//! be serialized by the caller. It is recommended that the `i2c` object be wrapped in an
//! `embedded_hal_bus::i2c::CriticalSectionDevice` when the bus is shared with other peripherals.
//!
#![no_std]
use core::fmt::Display;

use embedded_hal::{delay::DelayNs, i2c};

mod adapter;
mod addressing;
mod config;
mod registers;

pub use adapter::{ExpanderByte, Pcf8574Adapter, RegisterSelect, TransferWord};
pub use addressing::{cursor_address, ddram_address};
pub use config::{
    Font, Framing, Geometry, LcdConfig, RowOffsets, DEFAULT_I2C_ADDRESS, MAX_COLUMNS, MAX_LINES,
};
pub use registers::{ControlRegisters, CursorShift, DisplayControl, EntryMode, FunctionSet};

// commands
const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
const LCD_CMD_RETURNHOME: u8 = 0x02; //  Set cursor position to zero
const LCD_CMD_ENTRYMODESET: u8 = 0x04; //  Sets the entry mode
const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor
const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display
const LCD_CMD_SETCGRAMADDR: u8 = 0x40; //  Used to set the CGRAM (character generator RAM) with characters
const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

// function set with an 8-bit interface, as a lone nibble
const LCD_POWER_UP_NIBBLE: u8 = 0x03;

const CLEAR_HOME_DELAY_US: u32 = 3_000;
const POWER_UP_DELAY_MS: u32 = 10;

// written in place of characters outside the controller's 8-bit character set
const UNPRINTABLE_CHAR: u8 = b'?';

#[derive(Debug, PartialEq, Copy, Clone)]
/// Errors that can occur when using the display
pub enum LcdError<I2C>
where
    I2C: i2c::I2c,
{
    /// I2C error returned from the underlying I2C implementation
    I2cError(I2C::Error),
    /// Zero lines or columns, more than 4 lines, or more than 40 columns
    InvalidGeometry,
    /// `begin` was already called on this display
    AlreadyConfigured,
    /// The operation needs the geometry given to `begin`
    NotConfigured,
    /// Line number outside of 1..=4
    LineOutOfRange,
    /// The expander did not hold the byte just written to it
    ReadbackMismatch { expected: u8, actual: u8 },
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl<I2C> From<core::fmt::Error> for LcdError<I2C>
where
    I2C: i2c::I2c,
{
    fn from(err: core::fmt::Error) -> Self {
        LcdError::FormattingError(err)
    }
}

impl<I2C> From<&LcdError<I2C>> for &'static str
where
    I2C: i2c::I2c,
{
    fn from(err: &LcdError<I2C>) -> Self {
        match err {
            LcdError::I2cError(_) => "I2C error",
            LcdError::InvalidGeometry => "Invalid display geometry",
            LcdError::AlreadyConfigured => "Display already configured",
            LcdError::NotConfigured => "Display not configured",
            LcdError::LineOutOfRange => "Line out of range",
            LcdError::ReadbackMismatch { .. } => "Expander read back mismatch",
            LcdError::FormattingError(_) => "Formatting error",
        }
    }
}

#[cfg(feature = "defmt")]
impl<I2C> defmt::Format for LcdError<I2C>
where
    I2C: i2c::I2c,
{
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<I2C> ufmt::uDisplay for LcdError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<I2C> Display for LcdError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

/// HD44780 based character display connected through a PCF8574 I2C expander.
pub struct CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    adapter: Pcf8574Adapter<I2C>,
    delay: DELAY,
    config: LcdConfig,
    registers: ControlRegisters,
    geometry: Option<Geometry>,
    power_up_pending: bool,
}

impl<I2C, DELAY> CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    /// Create a new character display object with the default configuration. No bus traffic happens until `begin`.
    pub fn new(i2c: I2C, delay: DELAY) -> Self {
        Self::new_with_config(i2c, LcdConfig::default(), delay)
    }

    /// Create a new character display object with a specific I2C address for the expander.
    pub fn new_with_address(i2c: I2C, address: u8, delay: DELAY) -> Self {
        Self::new_with_config(i2c, LcdConfig::default().with_address(address), delay)
    }

    pub fn new_with_config(i2c: I2C, config: LcdConfig, delay: DELAY) -> Self {
        Self {
            adapter: Pcf8574Adapter::new(i2c, config.address, config.framing, config.verify_writes),
            delay,
            config,
            registers: ControlRegisters::new(config.backlight),
            geometry: None,
            power_up_pending: config.power_up_init,
        }
    }

    /// Set the display geometry and initialize the controller. Can only be called once; use `init` to
    /// re-initialize the controller afterwards.
    pub fn begin(&mut self, cols: u8, lines: u8) -> Result<&mut Self, LcdError<I2C>> {
        if self.geometry.is_some() {
            return Err(LcdError::AlreadyConfigured);
        }
        let geometry = Geometry::new(cols, lines).ok_or(LcdError::InvalidGeometry)?;
        #[cfg(feature = "defmt")]
        defmt::debug!("configuring {} display", geometry);
        self.geometry = Some(geometry);

        let function = self.registers.function_mut();
        function.set_two_line(lines > 1);
        function.set_five_by_ten_font(lines == 1 && self.config.font == Font::Dots5x10);

        self.init()
    }

    /// Run the controller initialization sequence with the current register state. Needed again after a
    /// transport failure, which leaves the controller in an unknown state.
    pub fn init(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        if self.geometry.is_none() {
            return Err(LcdError::NotConfigured);
        }
        if self.power_up_pending {
            #[cfg(feature = "defmt")]
            defmt::debug!("power-up initialization");
            self.adapter
                .write_power_up_nibble(LCD_POWER_UP_NIBBLE, self.registers.backlight())?;
            self.delay.delay_ms(POWER_UP_DELAY_MS);
            self.power_up_pending = false;
        }
        // function set must come first, it fixes the line count the other commands work with
        self.send_command(self.registers.function().command())?;
        self.send_command(self.registers.display_control().command())?;
        self.send_command(self.registers.entry_mode().command())?;
        self.clear()?;
        self.home()
    }

    /// returns a reference to the I2C peripheral. mostly needed for testing
    fn i2c(&mut self) -> &mut I2C {
        self.adapter.i2c()
    }

    /// Consumes the display, returning the I2C peripheral and the delay.
    pub fn release(self) -> (I2C, DELAY) {
        (self.adapter.release(), self.delay)
    }

    pub fn config(&self) -> &LcdConfig {
        &self.config
    }

    /// The geometry given to `begin`, if it has been called.
    pub fn geometry(&self) -> Option<Geometry> {
        self.geometry
    }

    /// The current shadow copy of the controller registers.
    pub fn registers(&self) -> &ControlRegisters {
        &self.registers
    }

    fn send_command(&mut self, command: u8) -> Result<(), LcdError<I2C>> {
        self.adapter
            .write_word(TransferWord::instruction(command, self.registers.backlight()))
    }

    fn write_data(&mut self, value: u8) -> Result<(), LcdError<I2C>> {
        self.adapter
            .write_word(TransferWord::data(value, self.registers.backlight()))
    }

    fn set_ddram_address(&mut self, address: u8) -> Result<(), LcdError<I2C>> {
        self.send_command(LCD_CMD_SETDDRAMADDR | address)
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Clear the display. Blocks for 3 ms.
    pub fn clear(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.send_command(LCD_CMD_CLEARDISPLAY)?;
        self.delay.delay_us(CLEAR_HOME_DELAY_US);
        Ok(self)
    }

    /// Set the cursor to the home position. Blocks for 3 ms.
    pub fn home(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.send_command(LCD_CMD_RETURNHOME)?;
        self.delay.delay_us(CLEAR_HOME_DELAY_US);
        Ok(self)
    }

    /// Set the cursor position at specified column and row. Columns and rows are one-indexed. A row past the
    /// last line of the display is clamped to the last line.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<&mut Self, LcdError<I2C>> {
        let geometry = self.geometry.ok_or(LcdError::NotConfigured)?;
        let address = cursor_address(&self.config.row_offsets, &geometry, col, row);
        self.set_ddram_address(address)?;
        Ok(self)
    }

    /// Turn the display on.
    pub fn display(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.display_control_mut().set_display(true);
        self.send_command(self.registers.display_control().command())?;
        Ok(self)
    }

    /// Turn the display off. The DDRAM content is kept.
    pub fn no_display(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.display_control_mut().set_display(false);
        self.send_command(self.registers.display_control().command())?;
        Ok(self)
    }

    /// Show the underline cursor.
    pub fn cursor(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.display_control_mut().set_cursor(true);
        self.send_command(self.registers.display_control().command())?;
        Ok(self)
    }

    pub fn no_cursor(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.display_control_mut().set_cursor(false);
        self.send_command(self.registers.display_control().command())?;
        Ok(self)
    }

    /// Blink the cursor block.
    pub fn blink(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.display_control_mut().set_blink(true);
        self.send_command(self.registers.display_control().command())?;
        Ok(self)
    }

    pub fn no_blink(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.display_control_mut().set_blink(false);
        self.send_command(self.registers.display_control().command())?;
        Ok(self)
    }

    /// Scroll the display to the left without changing the DDRAM content.
    pub fn scroll_display_left(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.send_command(CursorShift::scroll(false).command())?;
        Ok(self)
    }

    /// Scroll the display to the right without changing the DDRAM content.
    pub fn scroll_display_right(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.send_command(CursorShift::scroll(true).command())?;
        Ok(self)
    }

    /// Set the text flow direction to left to right.
    pub fn left_to_right(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.entry_mode_mut().set_entry_left(true);
        self.send_command(self.registers.entry_mode().command())?;
        Ok(self)
    }

    /// Set the text flow direction to right to left.
    pub fn right_to_left(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.entry_mode_mut().set_entry_left(false);
        self.send_command(self.registers.entry_mode().command())?;
        Ok(self)
    }

    /// Shift the display with every character written, "right justifying" text from the cursor.
    pub fn autoscroll(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.entry_mode_mut().set_shift_increment(true);
        self.send_command(self.registers.entry_mode().command())?;
        Ok(self)
    }

    pub fn no_autoscroll(&mut self) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.entry_mode_mut().set_shift_increment(false);
        self.send_command(self.registers.entry_mode().command())?;
        Ok(self)
    }

    /// Turn the backlight on or off
    pub fn backlight(&mut self, on: bool) -> Result<&mut Self, LcdError<I2C>> {
        self.registers.set_backlight(on);
        self.adapter.set_backlight(on)?;
        Ok(self)
    }

    /// Upload a custom character into one of the 8 CGRAM slots. The rows are passed through unchanged. The
    /// cursor is returned home afterwards so that following text goes to the DDRAM again.
    pub fn create_char(&mut self, location: u8, charmap: [u8; 8]) -> Result<&mut Self, LcdError<I2C>> {
        self.send_command(LCD_CMD_SETCGRAMADDR | ((location & 0x7) << 3))?;
        for &row in charmap.iter() {
            self.write_data(row)?;
        }
        self.home()
    }

    /// Write one character code at the current cursor position.
    pub fn put_char(&mut self, ch: u8) -> Result<&mut Self, LcdError<I2C>> {
        self.write_data(ch)?;
        Ok(self)
    }

    /// Write `text` starting at column 0 of `line` (1 to 4). A newline moves to the start of the next line,
    /// wrapping from line 4 back to line 1.
    pub fn message(&mut self, text: &str, line: u8) -> Result<&mut Self, LcdError<I2C>> {
        let mut line = line;
        let offsets = self.config.row_offsets;
        let address = ddram_address(&offsets, line, 0).ok_or(LcdError::LineOutOfRange)?;
        self.set_ddram_address(address)?;
        for c in text.chars() {
            if c == '\n' {
                line = if line >= MAX_LINES { 1 } else { line + 1 };
                let address = ddram_address(&offsets, line, 0).ok_or(LcdError::LineOutOfRange)?;
                self.set_ddram_address(address)?;
            } else {
                self.write_data(char_code(c))?;
            }
        }
        Ok(self)
    }

    /// Write `text` verbatim at the current cursor position. Newlines are not interpreted.
    pub fn put_string(&mut self, text: &str) -> Result<&mut Self, LcdError<I2C>> {
        for c in text.chars() {
            self.write_data(char_code(c))?;
        }
        Ok(self)
    }
}

fn char_code(c: char) -> u8 {
    u8::try_from(u32::from(c)).unwrap_or(UNPRINTABLE_CHAR)
}

/// Implement the `core::fmt::Write` trait for the display, allowing it to be used with the `write!` macro.
/// Text is written with `put_string`, so newlines are not interpreted.
impl<I2C, DELAY> core::fmt::Write for CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.put_string(s) {
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the display, allowing it to be used with the `uwriteln!` and `uwrite!` macros.
/// Text is written with `put_string`, so newlines are not interpreted.
impl<I2C, DELAY> ufmt::uWrite for CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), LcdError<I2C>> {
        self.put_string(s)?;
        Ok(())
    }

    type Error = LcdError<I2C>;
}
