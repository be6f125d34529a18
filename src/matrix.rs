//! Orientation-aware driver for a grid of chained MAX7219 modules.

use core::convert::Infallible;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::OriginDimensions;
use embedded_graphics::prelude::Size;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::chain::Max7219Chain;
use crate::chain::Register;
use crate::compute_modules;
use crate::framebuffer::FrameBuffer;
use crate::Color;
use crate::Error;
use crate::Orientation;
use crate::MAX_MODULES;

/// Extracts row `row` of the transposed 8x8 bit block.
///
/// Output bit `x` of the returned byte is bit `7 - row` of `block[x]`, so
/// the module-local pixel at (row r, column c) is displayed at
/// (row c, column 7-r): a quarter-turn rotation of the block. Worked
/// example: a block with only row 3, column 2 set (`block[3] == 0x20`)
/// yields `0b0000_1000` for output row 2 and zero for every other row.
fn transposed_row(block: &[u8], row: usize) -> u8 {
    let mut out = 0;
    for &bits in block {
        out = (out >> 1) | ((bits << row) & 0x80);
    }
    out
}

/// Driver for one or more daisy-chained MAX7219 8x8 LED matrix modules
/// presented as a single pixel grid.
///
/// Composed of a [`FrameBuffer`] (all drawing) and a [`Max7219Chain`]
/// (all bus traffic). Drawing never touches the bus; [`Max7219Matrix::flush`]
/// transfers the framebuffer to the chain in exactly 8 register writes.
pub struct Max7219Matrix<SPI, CS> {
    chain: Max7219Chain<SPI, CS>,
    framebuffer: FrameBuffer,
    orientation: Orientation,
}

impl<SPI, CS> Max7219Matrix<SPI, CS>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
{
    /// Creates a driver for a `width` x `height` pixel grid.
    ///
    /// Dimensions round up to whole 8x8 modules; the chain length is
    /// fixed here for the driver's lifetime. Construction performs no bus
    /// I/O; call [`Max7219Matrix::init`] before the first flush.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] if either dimension is zero,
    /// [`Error::ChainTooLong`] if the grid needs more than
    /// [`MAX_MODULES`] modules.
    pub fn new(
        spi: SPI,
        cs: CS,
        width: usize,
        height: usize,
        orientation: Orientation,
    ) -> Result<Self, Error<SPI::Error, CS::Error>> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions);
        }
        let modules = compute_modules(width, height);
        if modules > MAX_MODULES {
            return Err(Error::ChainTooLong);
        }

        #[cfg(feature = "log")]
        log::debug!("max7219 grid {width}x{height}: {modules} modules, {orientation:?}");
        #[cfg(feature = "defmt")]
        defmt::debug!("max7219 grid {}x{}: {} modules", width, height, modules);

        let chain = Max7219Chain::new(spi, cs, modules)?;
        Ok(Self {
            chain,
            framebuffer: FrameBuffer::new(width, height),
            orientation,
        })
    }

    /// Number of modules in the chain.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.chain.module_count()
    }

    /// The configured mounting orientation.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The drawing surface.
    #[must_use]
    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    /// The drawing surface, mutably.
    pub fn framebuffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.framebuffer
    }

    /// Runs the fixed chip initialization sequence on the whole chain.
    pub fn init(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.chain.init()
    }

    /// Sets the brightness of every module (low nibble of `level`).
    pub fn brightness(&mut self, level: u8) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.chain.set_intensity(level)
    }

    /// Brings every module out of shutdown.
    pub fn power_on(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.chain.power_on()
    }

    /// Puts every module into shutdown; the framebuffer is untouched.
    pub fn power_off(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.chain.power_off()
    }

    /// Turns the all-LEDs-on hardware test mode on or off.
    pub fn display_test(&mut self, enabled: bool) -> Result<(), Error<SPI::Error, CS::Error>> {
        self.chain.set_display_test(enabled)
    }

    /// Sets every pixel on (odd `color`) or off (even `color`).
    ///
    /// Framebuffer only; call [`Max7219Matrix::flush`] to make it visible.
    pub fn clear_all(&mut self, color: u8) {
        self.framebuffer.fill(Color::from((color & 0x01) == 1));
    }

    /// Transfers the framebuffer to the chain.
    ///
    /// Emits one write per row register, each carrying one byte per module
    /// in chain order (module N-1 first). In `Rotated90` orientation each
    /// module's block is read through the 8x8 bit transpose; the
    /// framebuffer itself is never altered, so flushing is idempotent.
    ///
    /// # Errors
    ///
    /// A failed row write is propagated immediately and leaves the panel
    /// partially updated; re-running `flush` is always safe.
    pub fn flush(&mut self) -> Result<(), Error<SPI::Error, CS::Error>> {
        let modules = self.chain.module_count();
        let mut values = [0u8; MAX_MODULES];
        for row in 0..8 {
            for (slot, module) in (0..modules).rev().enumerate() {
                values[slot] = match self.orientation {
                    Orientation::Normal => self.framebuffer.module_row(module, row),
                    Orientation::Rotated90 => {
                        transposed_row(self.framebuffer.module_block(module), row)
                    }
                };
            }
            self.chain.write_register(Register::digit(row), &values[..modules])?;
        }
        Ok(())
    }

    /// Sets one pixel. See [`FrameBuffer::set_pixel`].
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        self.framebuffer.set_pixel(x, y, color);
    }

    /// Reads one pixel. See [`FrameBuffer::get_pixel`].
    #[must_use]
    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        self.framebuffer.get_pixel(x, y)
    }

    /// Fills the whole grid. See [`FrameBuffer::fill`].
    pub fn fill(&mut self, color: Color) {
        self.framebuffer.fill(color);
    }

    /// Shifts the grid contents. See [`FrameBuffer::scroll`].
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        self.framebuffer.scroll(dx, dy);
    }

    /// Renders text into the grid. See [`FrameBuffer::draw_text`].
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, color: Color) {
        self.framebuffer.draw_text(text, x, y, color);
    }
}

impl<SPI, CS> OriginDimensions for Max7219Matrix<SPI, CS> {
    fn size(&self) -> Size {
        self.framebuffer.size()
    }
}

impl<SPI, CS> DrawTarget for Max7219Matrix<SPI, CS> {
    type Color = BinaryColor;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        self.framebuffer.draw_iter(pixels)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec;
    use std::vec::Vec;

    use embedded_hal_mock::eh1::digital::Mock as PinMock;
    use embedded_hal_mock::eh1::digital::State as PinState;
    use embedded_hal_mock::eh1::digital::Transaction as PinTransaction;
    use embedded_hal_mock::eh1::spi::Mock as SpiMock;
    use embedded_hal_mock::eh1::spi::Transaction as SpiTransaction;

    use super::*;

    /// SPI expectations for one full flush, `rows[y]` in chain order.
    fn flush_expectations(rows: &[Vec<u8>; 8]) -> Vec<SpiTransaction<u8>> {
        let mut transactions = Vec::new();
        for (row, values) in rows.iter().enumerate() {
            let mut bytes = Vec::new();
            for &value in values {
                bytes.push(row as u8 + 1);
                bytes.push(value);
            }
            transactions.push(SpiTransaction::write_vec(bytes));
            transactions.push(SpiTransaction::flush());
        }
        transactions
    }

    fn cs_frames(count: usize) -> Vec<PinTransaction> {
        let mut transactions = Vec::new();
        for _ in 0..count {
            transactions.push(PinTransaction::set(PinState::Low));
            transactions.push(PinTransaction::set(PinState::High));
        }
        transactions
    }

    #[test]
    fn test_transposed_row_single_bit() {
        // Row 3, column 2 (bit index 5): rotates to row 2, bit index 3.
        let block = [0, 0, 0, 0b0010_0000, 0, 0, 0, 0];
        for row in 0..8 {
            let expected = if row == 2 { 0b0000_1000 } else { 0 };
            assert_eq!(transposed_row(&block, row), expected);
        }
    }

    #[test]
    fn test_transposed_row_full_block() {
        // A fully lit block looks identical under any orientation.
        let block = [0xFF; 8];
        for row in 0..8 {
            assert_eq!(transposed_row(&block, row), 0xFF);
        }
    }

    #[test]
    fn test_transposed_row_single_row_becomes_column() {
        // Top row lit: rotates to a lit rightmost column.
        let block = [0xFF, 0, 0, 0, 0, 0, 0, 0];
        for row in 0..8 {
            assert_eq!(transposed_row(&block, row), 0x01);
        }
    }

    #[test]
    fn test_module_count_derivation() {
        let mut spi = SpiMock::new(&[]);
        let mut cs = PinMock::new(&[]);

        let display = Max7219Matrix::new(&mut spi, &mut cs, 20, 9, Orientation::Normal)
            .expect("valid dimensions");
        assert_eq!(display.module_count(), 6);

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let mut spi = SpiMock::new(&[]);
        let mut cs = PinMock::new(&[]);

        let result = Max7219Matrix::new(&mut spi, &mut cs, 0, 8, Orientation::Normal);
        assert!(matches!(result, Err(Error::InvalidDimensions)));
        let result = Max7219Matrix::new(&mut spi, &mut cs, 8, 0, Orientation::Normal);
        assert!(matches!(result, Err(Error::InvalidDimensions)));

        spi.done();
        cs.done();
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let mut spi = SpiMock::new(&[]);
        let mut cs = PinMock::new(&[]);

        // 256x16 would need 64 modules.
        let result = Max7219Matrix::new(&mut spi, &mut cs, 256, 16, Orientation::Normal);
        assert!(matches!(result, Err(Error::ChainTooLong)));

        spi.done();
        cs.done();
    }

    #[test]
    fn test_flush_single_pixel_normal() {
        let mut rows: [Vec<u8>; 8] = Default::default();
        for (row, values) in rows.iter_mut().enumerate() {
            *values = vec![if row == 0 { 0x80 } else { 0x00 }];
        }
        let mut spi = SpiMock::new(&flush_expectations(&rows));
        let mut cs = PinMock::new(&cs_frames(8));

        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 8, 8, Orientation::Normal)
            .expect("valid dimensions");
        display.set_pixel(0, 0, Color::On);
        display.flush().expect("flush should succeed");

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_flush_emits_chain_order() {
        // 24x8: modules 0..3 left to right. Pixel (0,0) is module 0 bit 7,
        // pixel (17,0) is module 2 bit 6. The burst must lead with the
        // module furthest down the chain: [module 2, module 1, module 0].
        let mut rows: [Vec<u8>; 8] = Default::default();
        rows[0] = vec![0x40, 0x00, 0x80];
        for values in rows.iter_mut().skip(1) {
            *values = vec![0x00, 0x00, 0x00];
        }
        let mut spi = SpiMock::new(&flush_expectations(&rows));
        let mut cs = PinMock::new(&cs_frames(8));

        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 24, 8, Orientation::Normal)
            .expect("valid dimensions");
        display.set_pixel(0, 0, Color::On);
        display.set_pixel(17, 0, Color::On);
        display.flush().expect("flush should succeed");

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_flush_values_match_raw_framebuffer_bytes() {
        // Two stacked modules (8x16): module 1 starts at byte 8.
        let mut rows: [Vec<u8>; 8] = Default::default();
        rows[2] = vec![0x00, 0x20];
        rows[5] = vec![0x02, 0x00];
        for (row, values) in rows.iter_mut().enumerate() {
            if row != 2 && row != 5 {
                *values = vec![0x00, 0x00];
            }
        }
        let mut spi = SpiMock::new(&flush_expectations(&rows));
        let mut cs = PinMock::new(&cs_frames(8));

        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 8, 16, Orientation::Normal)
            .expect("valid dimensions");
        display.set_pixel(2, 2, Color::On); // module 0, row 2, bit 5
        display.set_pixel(6, 13, Color::On); // module 1, row 5, bit 1
        assert_eq!(display.framebuffer().as_bytes()[2], 0x20);
        assert_eq!(display.framebuffer().as_bytes()[13], 0x02);
        display.flush().expect("flush should succeed");

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_flush_rotated_single_bit() {
        // The literal transpose example, end to end: pixel (2, 3) sets
        // module row 3 bit 5; rotated output row 2 must read 0b0000_1000.
        let mut rows: [Vec<u8>; 8] = Default::default();
        for (row, values) in rows.iter_mut().enumerate() {
            *values = vec![if row == 2 { 0b0000_1000 } else { 0x00 }];
        }
        let mut spi = SpiMock::new(&flush_expectations(&rows));
        let mut cs = PinMock::new(&cs_frames(8));

        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 8, 8, Orientation::Rotated90)
            .expect("valid dimensions");
        display.set_pixel(2, 3, Color::On);
        display.flush().expect("flush should succeed");

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_flush_rotated_full_grid_round_trip() {
        // Fully lit grid is orientation-invariant.
        let mut rows: [Vec<u8>; 8] = Default::default();
        for values in rows.iter_mut() {
            *values = vec![0xFF, 0xFF];
        }
        let mut spi = SpiMock::new(&flush_expectations(&rows));
        let mut cs = PinMock::new(&cs_frames(8));

        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 16, 8, Orientation::Rotated90)
            .expect("valid dimensions");
        display.clear_all(1);
        display.flush().expect("flush should succeed");

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_flush_idempotent() {
        let mut rows: [Vec<u8>; 8] = Default::default();
        for (row, values) in rows.iter_mut().enumerate() {
            *values = vec![if row == 4 { 0x08 } else { 0x00 }];
        }
        let mut expectations = flush_expectations(&rows);
        expectations.extend(flush_expectations(&rows));
        let mut spi = SpiMock::new(&expectations);
        let mut cs = PinMock::new(&cs_frames(16));

        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 8, 8, Orientation::Normal)
            .expect("valid dimensions");
        display.set_pixel(4, 4, Color::On);
        display.flush().expect("first flush should succeed");
        display.flush().expect("second flush should succeed");

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_clear_all_then_flush() {
        let mut lit: [Vec<u8>; 8] = Default::default();
        let mut dark: [Vec<u8>; 8] = Default::default();
        for values in lit.iter_mut() {
            *values = vec![0xFF, 0xFF];
        }
        for values in dark.iter_mut() {
            *values = vec![0x00, 0x00];
        }
        let mut expectations = flush_expectations(&lit);
        expectations.extend(flush_expectations(&dark));
        let mut spi = SpiMock::new(&expectations);
        let mut cs = PinMock::new(&cs_frames(16));

        // 13x8 rounds up to 2 modules; clear_all covers the padding too.
        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 13, 8, Orientation::Normal)
            .expect("valid dimensions");
        display.clear_all(1);
        display.flush().expect("lit flush should succeed");
        display.clear_all(0);
        display.flush().expect("dark flush should succeed");

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_clear_all_masks_color_argument() {
        let mut spi = SpiMock::new(&[]);
        let mut cs = PinMock::new(&[]);

        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 8, 8, Orientation::Normal)
            .expect("valid dimensions");
        display.clear_all(3);
        assert_eq!(display.get_pixel(0, 0), Color::On);
        display.clear_all(2);
        assert_eq!(display.get_pixel(0, 0), Color::Off);

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_brightness_masks_level() {
        let mut spi = SpiMock::new(&[
            SpiTransaction::write_vec(vec![0x0A, 0x0F]),
            SpiTransaction::flush(),
        ]);
        let mut cs = PinMock::new(&cs_frames(1));

        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 8, 8, Orientation::Normal)
            .expect("valid dimensions");
        display.brightness(0x1F).expect("brightness should succeed");

        drop(display);
        spi.done();
        cs.done();
    }

    #[test]
    fn test_draw_target_passthrough() {
        use embedded_graphics::prelude::*;
        use embedded_graphics::primitives::PrimitiveStyle;
        use embedded_graphics::primitives::Rectangle;

        let mut spi = SpiMock::new(&[]);
        let mut cs = PinMock::new(&[]);

        let mut display = Max7219Matrix::new(&mut spi, &mut cs, 16, 8, Orientation::Normal)
            .expect("valid dimensions");
        Rectangle::new(Point::new(1, 0), Size::new(1, 1))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut display)
            .unwrap();
        assert_eq!(display.get_pixel(1, 0), Color::On);

        drop(display);
        spi.done();
        cs.done();
    }
}
