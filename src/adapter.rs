// PCF8574 bus encoder
// The HD44780 is wired to the expander in 4-bit mode: the upper four expander pins carry D4-D7 and
// the lower four carry RS, RW, EN and the backlight transistor. Every controller word is therefore
// sent as two nibbles, high nibble first, each latched into the controller by a pulse on EN.
//
//      P7  P6  P5  P4  P3  P2  P1  P0
//      D7  D6  D5  D4  BL  EN  RW  RS
//

use bitfield::bitfield;
use embedded_hal::i2c;

use crate::{config::Framing, LcdError};

bitfield! {
    /// One value of the expander's output register.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct ExpanderByte(u8);
    impl Debug;
    pub rs, set_rs: 0;
    pub rw, set_rw: 1;
    pub enable, set_enable: 2;
    pub backlight, set_backlight: 3;
    pub data, set_data: 7, 4;
}

impl ExpanderByte {
    /// All data and control lines low, backlight as given.
    pub fn idle(backlight: bool) -> Self {
        let mut bits = ExpanderByte(0);
        bits.set_backlight(backlight);
        bits
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// The controller register a transfer targets.
pub enum RegisterSelect {
    /// Instruction register (commands), RS low.
    Instruction,
    /// Data register (characters and CGRAM rows), RS high.
    Data,
}

/// The logical payload of one controller write.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TransferWord {
    pub value: u8,
    pub register: RegisterSelect,
    pub backlight: bool,
}

impl TransferWord {
    pub fn instruction(value: u8, backlight: bool) -> Self {
        Self {
            value,
            register: RegisterSelect::Instruction,
            backlight,
        }
    }

    pub fn data(value: u8, backlight: bool) -> Self {
        Self {
            value,
            register: RegisterSelect::Data,
            backlight,
        }
    }
}

/// Drives an HD44780 through a PCF8574/PCF8547 I2C expander. Keeps a shadow copy of the byte the
/// expander currently holds; the expander is only read back for the power-up pulse and, when
/// enabled, to verify writes.
pub struct Pcf8574Adapter<I2C>
where
    I2C: i2c::I2c,
{
    i2c: I2C,
    address: u8,
    bits: ExpanderByte,
    framing: Framing,
    verify_writes: bool,
}

impl<I2C> Pcf8574Adapter<I2C>
where
    I2C: i2c::I2c,
{
    pub fn new(i2c: I2C, address: u8, framing: Framing, verify_writes: bool) -> Self {
        Self {
            i2c,
            address,
            bits: ExpanderByte(0),
            framing,
            verify_writes,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// The byte last written to the expander.
    pub fn bits(&self) -> u8 {
        self.bits.0
    }

    /// returns the i2c object. mostly used for testing
    pub fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Writes one raw byte to the expander.
    pub fn write_byte(&mut self, value: u8) -> Result<(), LcdError<I2C>> {
        #[cfg(feature = "defmt")]
        defmt::trace!("expander write {=u8:#x}", value);
        self.i2c
            .write(self.address, &[value])
            .map_err(LcdError::I2cError)
    }

    /// Reads back the byte currently held by the expander.
    pub fn read_byte(&mut self) -> Result<u8, LcdError<I2C>> {
        let mut data = [0];
        self.i2c
            .read(self.address, &mut data)
            .map_err(LcdError::I2cError)?;
        Ok(data[0])
    }

    fn write_bits_to_gpio(&mut self) -> Result<(), LcdError<I2C>> {
        let expected = self.bits.0;
        self.write_byte(expected)?;
        if self.verify_writes {
            let actual = self.read_byte()?;
            if actual != expected {
                #[cfg(feature = "defmt")]
                defmt::warn!("expander holds {=u8:#x}, expected {=u8:#x}", actual, expected);
                return Err(LcdError::ReadbackMismatch { expected, actual });
            }
        }
        Ok(())
    }

    /// Sends one word to the controller: high nibble, then low nibble, each latched with an
    /// enable pulse. RW stays low; this driver only writes.
    pub fn write_word(&mut self, word: TransferWord) -> Result<(), LcdError<I2C>> {
        self.bits.set_rs(word.register == RegisterSelect::Data);
        self.bits.set_rw(false);
        self.bits.set_backlight(word.backlight);

        self.write_nibble(word.value >> 4)?;
        self.write_nibble(word.value & 0x0F)?;

        if self.framing == Framing::Strobed {
            self.release_lines(word.backlight)?;
        }
        Ok(())
    }

    fn write_nibble(&mut self, nibble: u8) -> Result<(), LcdError<I2C>> {
        self.bits.set_data(nibble & 0x0F);
        match self.framing {
            Framing::Compact => {
                self.bits.set_enable(true);
                self.write_bits_to_gpio()?;
                self.bits.set_enable(false);
                self.write_bits_to_gpio()
            }
            Framing::Strobed => {
                self.bits.set_enable(false);
                self.write_bits_to_gpio()?;
                self.pulse_enable()
            }
        }
    }

    fn pulse_enable(&mut self) -> Result<(), LcdError<I2C>> {
        self.bits.set_enable(true);
        self.write_bits_to_gpio()?;
        self.bits.set_enable(false);
        self.write_bits_to_gpio()
    }

    /// Drops every data and control line, leaving only the backlight bit.
    fn release_lines(&mut self, backlight: bool) -> Result<(), LcdError<I2C>> {
        self.bits = ExpanderByte::idle(backlight);
        self.write_bits_to_gpio()
    }

    /// Switches the backlight line. The other lines are released.
    pub fn set_backlight(&mut self, on: bool) -> Result<(), LcdError<I2C>> {
        self.release_lines(on)
    }

    /// Forces a single instruction nibble onto the bus, for a controller that may still be in its
    /// power-on 8-bit mode. The enable pulse is built from what the expander reports it holds.
    pub fn write_power_up_nibble(&mut self, nibble: u8, backlight: bool) -> Result<(), LcdError<I2C>> {
        let mut raw = ExpanderByte::idle(backlight);
        raw.set_data(nibble & 0x0F);
        self.write_byte(raw.0)?;

        let mut latched = ExpanderByte(self.read_byte()?);
        latched.set_backlight(backlight);
        latched.set_enable(true);
        self.write_byte(latched.0)?;

        let mut latched = ExpanderByte(self.read_byte()?);
        latched.set_backlight(backlight);
        latched.set_enable(false);
        self.write_byte(latched.0)?;

        self.bits = latched;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn test_expander_byte_layout() {
        let mut bits = ExpanderByte(0);
        bits.set_rs(true);
        bits.set_rw(false);
        bits.set_enable(true);
        bits.set_backlight(true);
        bits.set_data(0b1010);
        assert_eq!(bits.bits(), 0b1010_1101);

        bits.set_rs(false);
        bits.set_rw(true);
        bits.set_enable(false);
        bits.set_backlight(false);
        bits.set_data(0b0101);
        assert_eq!(bits.bits(), 0b0101_0010);

        assert_eq!(ExpanderByte::idle(true).bits(), 0b0000_1000);
        assert_eq!(ExpanderByte::idle(false).bits(), 0);
    }

    #[test]
    fn test_compact_write_word() {
        let expected_transactions = [
            // write byte 0xDE to the data register, backlight on
            I2cTransaction::write(0x3F, std::vec![0b1101_1101]), // high nibble, enable = 1, rs = 1
            I2cTransaction::write(0x3F, std::vec![0b1101_1001]), // high nibble, enable = 0, rs = 1
            I2cTransaction::write(0x3F, std::vec![0b1110_1101]), // low nibble, enable = 1, rs = 1
            I2cTransaction::write(0x3F, std::vec![0b1110_1001]), // low nibble, enable = 0, rs = 1
            // write byte 0xAD to the instruction register, backlight off
            I2cTransaction::write(0x3F, std::vec![0b1010_0100]), // high nibble, enable = 1, rs = 0
            I2cTransaction::write(0x3F, std::vec![0b1010_0000]), // high nibble, enable = 0, rs = 0
            I2cTransaction::write(0x3F, std::vec![0b1101_0100]), // low nibble, enable = 1, rs = 0
            I2cTransaction::write(0x3F, std::vec![0b1101_0000]), // low nibble, enable = 0, rs = 0
        ];
        let mut adapter =
            Pcf8574Adapter::new(I2cMock::new(&expected_transactions), 0x3F, Framing::Compact, false);

        assert!(adapter.write_word(TransferWord::data(0xDE, true)).is_ok());
        assert!(adapter.write_word(TransferWord::instruction(0xAD, false)).is_ok());
        assert_eq!(adapter.bits(), 0b1101_0000);
        adapter.i2c().done();
    }

    #[test]
    fn test_strobed_write_word() {
        let expected_transactions = [
            // LCD_CMD_FUNCTIONSET | LCD_FLAG_2LINE = 0x28, backlight on
            I2cTransaction::write(0x3F, std::vec![0b0010_1000]), // high nibble, enable = 0
            I2cTransaction::write(0x3F, std::vec![0b0010_1100]), // high nibble, enable = 1
            I2cTransaction::write(0x3F, std::vec![0b0010_1000]), // high nibble, enable = 0
            I2cTransaction::write(0x3F, std::vec![0b1000_1000]), // low nibble, enable = 0
            I2cTransaction::write(0x3F, std::vec![0b1000_1100]), // low nibble, enable = 1
            I2cTransaction::write(0x3F, std::vec![0b1000_1000]), // low nibble, enable = 0
            I2cTransaction::write(0x3F, std::vec![0b0000_1000]), // idle, backlight only
        ];
        let mut adapter =
            Pcf8574Adapter::new(I2cMock::new(&expected_transactions), 0x3F, Framing::Strobed, false);

        assert!(adapter.write_word(TransferWord::instruction(0x28, true)).is_ok());
        assert_eq!(adapter.bits(), 0b0000_1000);
        adapter.i2c().done();
    }

    #[test]
    fn test_strobed_data_word_keeps_rs_until_release() {
        let expected_transactions = [
            // 'A' = 0x41 to the data register, backlight off
            I2cTransaction::write(0x27, std::vec![0b0100_0001]),
            I2cTransaction::write(0x27, std::vec![0b0100_0101]),
            I2cTransaction::write(0x27, std::vec![0b0100_0001]),
            I2cTransaction::write(0x27, std::vec![0b0001_0001]),
            I2cTransaction::write(0x27, std::vec![0b0001_0101]),
            I2cTransaction::write(0x27, std::vec![0b0001_0001]),
            I2cTransaction::write(0x27, std::vec![0b0000_0000]),
        ];
        let mut adapter =
            Pcf8574Adapter::new(I2cMock::new(&expected_transactions), 0x27, Framing::Strobed, false);

        assert!(adapter.write_word(TransferWord::data(b'A', false)).is_ok());
        adapter.i2c().done();
    }

    #[test]
    fn test_set_backlight_releases_lines() {
        let expected_transactions = [
            I2cTransaction::write(0x3F, std::vec![0b0000_1000]), // backlight on
            I2cTransaction::write(0x3F, std::vec![0b0000_0000]), // backlight off
        ];
        let mut adapter =
            Pcf8574Adapter::new(I2cMock::new(&expected_transactions), 0x3F, Framing::Compact, false);

        assert!(adapter.set_backlight(true).is_ok());
        assert!(adapter.set_backlight(false).is_ok());
        adapter.i2c().done();
    }

    #[test]
    fn test_verified_write_word() {
        let expected_transactions = [
            // LCD_CMD_CLEARDISPLAY = 0x01, backlight on, each write read back
            I2cTransaction::write(0x3F, std::vec![0b0000_1100]),
            I2cTransaction::read(0x3F, std::vec![0b0000_1100]),
            I2cTransaction::write(0x3F, std::vec![0b0000_1000]),
            I2cTransaction::read(0x3F, std::vec![0b0000_1000]),
            I2cTransaction::write(0x3F, std::vec![0b0001_1100]),
            I2cTransaction::read(0x3F, std::vec![0b0001_1100]),
            I2cTransaction::write(0x3F, std::vec![0b0001_1000]),
            I2cTransaction::read(0x3F, std::vec![0b0001_1000]),
        ];
        let mut adapter =
            Pcf8574Adapter::new(I2cMock::new(&expected_transactions), 0x3F, Framing::Compact, true);

        assert!(adapter.write_word(TransferWord::instruction(0x01, true)).is_ok());
        adapter.i2c().done();
    }

    #[test]
    fn test_verified_write_mismatch() {
        let expected_transactions = [
            I2cTransaction::write(0x3F, std::vec![0b0000_1100]),
            I2cTransaction::read(0x3F, std::vec![0b0000_0100]),
        ];
        let mut adapter =
            Pcf8574Adapter::new(I2cMock::new(&expected_transactions), 0x3F, Framing::Compact, true);

        let result = adapter.write_word(TransferWord::instruction(0x01, true));
        assert!(matches!(
            result,
            Err(LcdError::ReadbackMismatch {
                expected: 0b0000_1100,
                actual: 0b0000_0100
            })
        ));
        adapter.i2c().done();
    }

    #[test]
    fn test_power_up_nibble_pulses_from_read_back() {
        let expected_transactions = [
            I2cTransaction::write(0x3F, std::vec![0b0011_1000]), // nibble 0x3, backlight on
            I2cTransaction::read(0x3F, std::vec![0b0011_1000]),
            I2cTransaction::write(0x3F, std::vec![0b0011_1100]), // enable = 1
            I2cTransaction::read(0x3F, std::vec![0b0011_1100]),
            I2cTransaction::write(0x3F, std::vec![0b0011_1000]), // enable = 0
        ];
        let mut adapter =
            Pcf8574Adapter::new(I2cMock::new(&expected_transactions), 0x3F, Framing::Compact, false);

        assert!(adapter.write_power_up_nibble(0x03, true).is_ok());
        assert_eq!(adapter.bits(), 0b0011_1000);
        adapter.i2c().done();
    }

    #[test]
    fn test_transport_error_is_propagated() {
        let expected_transactions = [
            I2cTransaction::write(0x3F, std::vec![0b0000_1100]),
            I2cTransaction::write(0x3F, std::vec![0b0000_1000]).with_error(ErrorKind::Other),
        ];
        let mut adapter =
            Pcf8574Adapter::new(I2cMock::new(&expected_transactions), 0x3F, Framing::Compact, false);

        let result = adapter.write_word(TransferWord::instruction(0x02, true));
        assert!(matches!(result, Err(LcdError::I2cError(ErrorKind::Other))));
        adapter.i2c().done();
    }
}
