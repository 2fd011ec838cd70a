//! Mapping of cursor positions to DDRAM addresses.

use crate::config::{Geometry, RowOffsets};

/// Mask of the 7-bit address field of the `SETDDRAMADDR` instruction.
const DDRAM_ADDRESS_MASK: u8 = 0x7F;

/// DDRAM address of a 0-based `column` on a 1-based `line`. Returns `None` when the line is not
/// in 1..=4.
pub fn ddram_address(offsets: &RowOffsets, line: u8, column: u8) -> Option<u8> {
    offsets
        .line(line)
        .map(|offset| offset.wrapping_add(column) & DDRAM_ADDRESS_MASK)
}

/// DDRAM address of a 1-based `(col, row)` cursor position. A row past the configured line count
/// is clamped to the last line, and a row or column of 0 is treated as 1.
pub fn cursor_address(offsets: &RowOffsets, geometry: &Geometry, col: u8, row: u8) -> u8 {
    let row = if row > geometry.lines() {
        #[cfg(feature = "defmt")]
        defmt::debug!("row {} clamped to {}", row, geometry.lines());
        geometry.lines()
    } else {
        row.max(1)
    };
    let offset = offsets.0[usize::from(row - 1)];
    offset.wrapping_add(col.saturating_sub(1)) & DDRAM_ADDRESS_MASK
}
