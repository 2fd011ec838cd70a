//! Shadow copies of the HD44780 control registers.
//!
//! The controller's instruction registers are never read back by this driver. The current value of
//! each one lives here and is folded into every instruction that re-emits it. Each register is a
//! `bitfield` over the bit positions the HD44780 datasheet defines for that instruction, so a
//! mutator can only ever touch its own documented bits.

use bitfield::bitfield;

use crate::{
    LCD_CMD_CURSORSHIFT, LCD_CMD_DISPLAYCONTROL, LCD_CMD_ENTRYMODESET, LCD_CMD_FUNCTIONSET,
};

bitfield! {
    /// The function set register: bus width, line count and font height.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct FunctionSet(u8);
    impl Debug;
    // 5x10 dot font, only honored by the controller in 1-line mode
    pub five_by_ten_font, set_five_by_ten_font: 2;
    // 2-line mode
    pub two_line, set_two_line: 3;
    // 8-bit bus. The driver always runs the controller in 4-bit mode, so there is no setter.
    pub eight_bit_bus, _: 4;
}

impl Default for FunctionSet {
    /// 4-bit bus, 2 lines, 5x8 font.
    fn default() -> Self {
        let mut reg = FunctionSet(0);
        reg.set_two_line(true);
        reg
    }
}

impl FunctionSet {
    /// The `FUNCTIONSET` instruction carrying this register.
    pub fn command(&self) -> u8 {
        LCD_CMD_FUNCTIONSET | self.0
    }

    /// Raw register bits, without the instruction opcode.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

bitfield! {
    /// The display on/off control register.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct DisplayControl(u8);
    impl Debug;
    pub blink, set_blink: 0;
    pub cursor, set_cursor: 1;
    pub display, set_display: 2;
}

impl Default for DisplayControl {
    /// Display on, cursor off, blink off.
    fn default() -> Self {
        let mut reg = DisplayControl(0);
        reg.set_display(true);
        reg
    }
}

impl DisplayControl {
    /// The `DISPLAYCONTROL` instruction carrying this register.
    pub fn command(&self) -> u8 {
        LCD_CMD_DISPLAYCONTROL | self.0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

bitfield! {
    /// The entry mode register: text direction and autoscroll.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct EntryMode(u8);
    impl Debug;
    // shift the display on every write ("right justify" text from the cursor)
    pub shift_increment, set_shift_increment: 0;
    // text flows left to right
    pub entry_left, set_entry_left: 1;
}

impl Default for EntryMode {
    /// Left to right, no display shift.
    fn default() -> Self {
        let mut reg = EntryMode(0);
        reg.set_entry_left(true);
        reg
    }
}

impl EntryMode {
    /// The `ENTRYMODESET` instruction carrying this register.
    pub fn command(&self) -> u8 {
        LCD_CMD_ENTRYMODESET | self.0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

bitfield! {
    /// The cursor/display shift register.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct CursorShift(u8);
    impl Debug;
    pub move_right, set_move_right: 2;
    // move the whole display rather than just the cursor
    pub display_move, set_display_move: 3;
}

impl Default for CursorShift {
    /// Cursor move, to the right.
    fn default() -> Self {
        let mut reg = CursorShift(0);
        reg.set_move_right(true);
        reg
    }
}

impl CursorShift {
    /// A display scroll in the given direction. Used for the stateless scroll commands, which
    /// never touch the stored shift register.
    pub fn scroll(right: bool) -> Self {
        let mut reg = CursorShift(0);
        reg.set_display_move(true);
        reg.set_move_right(right);
        reg
    }

    /// The `CURSORSHIFT` instruction carrying this register.
    pub fn command(&self) -> u8 {
        LCD_CMD_CURSORSHIFT | self.0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// All persistent controller state owned by one display. Every instruction write that re-emits a
/// register reads it from here, and the backlight flag is threaded into every expander byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRegisters {
    function: FunctionSet,
    display_control: DisplayControl,
    entry_mode: EntryMode,
    display_shift: CursorShift,
    backlight: bool,
}

impl ControlRegisters {
    pub fn new(backlight: bool) -> Self {
        Self {
            function: FunctionSet::default(),
            display_control: DisplayControl::default(),
            entry_mode: EntryMode::default(),
            display_shift: CursorShift::default(),
            backlight,
        }
    }

    pub fn function(&self) -> FunctionSet {
        self.function
    }

    pub fn function_mut(&mut self) -> &mut FunctionSet {
        &mut self.function
    }

    pub fn display_control(&self) -> DisplayControl {
        self.display_control
    }

    pub fn display_control_mut(&mut self) -> &mut DisplayControl {
        &mut self.display_control
    }

    pub fn entry_mode(&self) -> EntryMode {
        self.entry_mode
    }

    pub fn entry_mode_mut(&mut self) -> &mut EntryMode {
        &mut self.entry_mode
    }

    pub fn display_shift(&self) -> CursorShift {
        self.display_shift
    }

    pub fn display_shift_mut(&mut self) -> &mut CursorShift {
        &mut self.display_shift
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    pub fn set_backlight(&mut self, on: bool) {
        self.backlight = on;
    }
}

impl Default for ControlRegisters {
    fn default() -> Self {
        Self::new(true)
    }
}
