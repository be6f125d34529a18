//! Register-level transport for a chain of MAX7219 chips.
//!
//! [`Max7219Chain`] is the only path to the hardware: every register write,
//! whether init, intensity, or row data, goes through
//! [`Max7219Chain::write_register`] as one chip-select-framed burst of
//! alternating (address, value) bytes, one pair per module.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::Error;
use crate::MAX_MODULES;

/// MAX7219 register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Row 0 data.
    Digit0 = 0x01,
    /// Row 1 data.
    Digit1 = 0x02,
    /// Row 2 data.
    Digit2 = 0x03,
    /// Row 3 data.
    Digit3 = 0x04,
    /// Row 4 data.
    Digit4 = 0x05,
    /// Row 5 data.
    Digit5 = 0x06,
    /// Row 6 data.
    Digit6 = 0x07,
    /// Row 7 data.
    Digit7 = 0x08,
    /// BCD decode configuration; always no-decode for a matrix.
    DecodeMode = 0x09,
    /// Brightness, low nibble only.
    Intensity = 0x0A,
    /// Number of scanned rows minus one.
    ScanLimit = 0x0B,
    /// 0 = shutdown, 1 = normal operation.
    Shutdown = 0x0C,
    /// 1 lights every LED regardless of register contents.
    DisplayTest = 0x0F,
}

impl Register {
    /// The wire address of this register.
    #[must_use]
    pub fn addr(self) -> u8 {
        self as u8
    }

    /// The row-data register for `row` (0..8).
    #[must_use]
    pub fn digit(row: usize) -> Self {
        match row {
            0 => Self::Digit0,
            1 => Self::Digit1,
            2 => Self::Digit2,
            3 => Self::Digit3,
            4 => Self::Digit4,
            5 => Self::Digit5,
            6 => Self::Digit6,
            7 => Self::Digit7,
            _ => unreachable!(),
        }
    }
}

/// Register values bringing a chip out of shutdown into matrix mode:
/// no display test, all 8 rows scanned, raw (non-BCD) row data.
const INIT_SEQUENCE: [(Register, u8); 5] = [
    (Register::Shutdown, 0),
    (Register::DisplayTest, 0),
    (Register::ScanLimit, 7),
    (Register::DecodeMode, 0),
    (Register::Shutdown, 1),
];

/// A fixed-length chain of MAX7219 chips behind one SPI bus and one
/// chip-select line.
pub struct Max7219Chain<SPI, CS> {
    spi: SPI,
    cs: CS,
    modules: usize,
    buffer: [u8; MAX_MODULES * 2],
}

impl<SPI, CS> Max7219Chain<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    /// Creates a transport for `modules` chained chips. No bus traffic
    /// happens until the first register write.
    ///
    /// # Panics
    ///
    /// Panics if `modules` is zero.
    pub fn new(spi: SPI, cs: CS, modules: usize) -> Result<Self, Error<SPI::Error, CS::Error>> {
        assert!(modules >= 1);
        if modules > MAX_MODULES {
            return Err(Error::ChainTooLong);
        }
        Ok(Self {
            spi,
            cs,
            modules,
            buffer: [0; MAX_MODULES * 2],
        })
    }

    /// Number of chips in the chain.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules
    }

    /// Writes one value per module to `register`, in the order given.
    ///
    /// `values` must hold exactly one byte per module, already in chain
    /// order: the first byte is re-shifted furthest down the chain and
    /// lands in the module electrically furthest from the controller.
    /// Chip select frames the whole burst and is released even when the
    /// bus write fails.
    pub fn write_register(
        &mut self,
        register: Register,
        values: &[u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        debug_assert_eq!(values.len(), self.modules);
        for (i, &value) in values.iter().enumerate() {
            self.buffer[i * 2] = register.addr();
            self.buffer[i * 2 + 1] = value;
        }

        self.cs.set_low().map_err(Error::Pin)?;
        let written = self
            .spi
            .write(&self.buffer[..self.modules * 2])
            .and_then(|()| self.spi.flush());
        let released = self.cs.set_high();
        written.map_err(Error::Spi)?;
        released.map_err(Error::Pin)?;
        Ok(())
    }

    /// Writes the same value to `register` on every module.
    pub fn write_all(
        &mut self,
        register: Register,
        value: u8,
    ) -> Result<(), Error<SPI::Error, CS::Error>> {
        let values = [value; MAX_MODULES];
        let modules = self.modules;
        self.write_register(register, &values[..modules])
    }

    /// Runs the fixed power-up sequence on every chip in the chain.
    pub fn init(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        for (register, value) in INIT_SEQUENCE {
            self.write_all(register, value)?;
        }
        Ok(())
    }

    /// Sets the brightness of every module. Only the low nibble of
    /// `level` is honored by the chip.
    pub fn set_intensity(&mut self, level: u8) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.write_all(Register::Intensity, level & 0x0F)
    }

    /// Brings every chip out of shutdown.
    pub fn power_on(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.write_all(Register::Shutdown, 1)
    }

    /// Puts every chip into shutdown; register contents are retained.
    pub fn power_off(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.write_all(Register::Shutdown, 0)
    }

    /// Turns the all-LEDs-on test mode on or off for every chip.
    pub fn set_display_test(&mut self, enabled: bool) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.write_all(Register::DisplayTest, u8::from(enabled))
    }
}
