//! Monochrome framebuffer matching the MAX7219 chain's byte layout.
//!
//! The buffer stores pixels the way the row registers consume them, so a
//! flush in the normal orientation is a straight byte copy:
//!
//! - one byte holds 8 horizontal pixels, bit 7 = leftmost
//! - byte `row + module * 8` is row `row` (0..8) of module `module`
//! - modules are numbered left-to-right, top-to-bottom across the grid
//!
//! A 20x9 grid therefore rounds up to 3x2 modules and 48 bytes of storage:
//!
//! ```text
//!   +--------+--------+--------+
//!   | mod 0  | mod 1  | mod 2  |   bytes  0..8, 8..16, 16..24
//!   +--------+--------+--------+
//!   | mod 3  | mod 4  | mod 5  |   bytes 24..32, 32..40, 40..48
//!   +--------+--------+--------+
//! ```
//!
//! Pixels outside the requested width/height but inside the rounded-up
//! module grid are padding: they exist in storage (and on the physical
//! panel), [`FrameBuffer::fill`] covers them, but per-pixel operations
//! never touch them.
//!
//! Drawing goes through [`embedded-graphics`]: the buffer implements
//! [`DrawTarget`] over [`BinaryColor`], so any primitive, image, or text
//! style can render into it.
//!
//! [`embedded-graphics`]: https://docs.rs/embedded-graphics

use core::convert::Infallible;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::mono_font::ascii::FONT_5X8;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::OriginDimensions;
use embedded_graphics::prelude::Point;
use embedded_graphics::prelude::Size;
use embedded_graphics::text::Baseline;
use embedded_graphics::text::Text;
use embedded_graphics::Drawable;

use crate::compute_modules;
use crate::Color;
use crate::MAX_MODULES;

/// Pixel storage for a chain of 8x8 modules.
///
/// Owned by [`crate::Max7219Matrix`]; mutating it has no hardware effect
/// until the driver flushes.
pub struct FrameBuffer {
    width: usize,
    height: usize,
    modules_x: usize,
    modules: usize,
    data: [u8; MAX_MODULES * 8],
}

impl FrameBuffer {
    /// Creates a cleared framebuffer for a `width` x `height` pixel grid.
    ///
    /// Dimensions round up to whole 8x8 modules.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero or the grid needs more than
    /// [`MAX_MODULES`] modules. [`crate::Max7219Matrix::new`] validates
    /// both before constructing the buffer.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width >= 1 && height >= 1);
        let modules = compute_modules(width, height);
        assert!(modules <= MAX_MODULES);
        Self {
            width,
            height,
            modules_x: width.div_ceil(8),
            modules,
            data: [0; MAX_MODULES * 8],
        }
    }

    /// Requested grid width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Requested grid height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of 8x8 modules backing the grid.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules
    }

    /// The active storage bytes, `module_count() * 8` long.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.modules * 8]
    }

    fn byte_offset(&self, x: usize, y: usize) -> (usize, u8) {
        let module = (y / 8) * self.modules_x + x / 8;
        (y % 8 + module * 8, 0x80 >> (x % 8))
    }

    /// Sets one pixel. Coordinates outside the grid are ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let (offset, mask) = self.byte_offset(x, y);
        if color.is_on() {
            self.data[offset] |= mask;
        } else {
            self.data[offset] &= !mask;
        }
    }

    /// Reads one pixel. Coordinates outside the grid read as off.
    #[must_use]
    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x >= self.width || y >= self.height {
            return Color::Off;
        }
        let (offset, mask) = self.byte_offset(x, y);
        Color::from(self.data[offset] & mask != 0)
    }

    /// Sets every pixel, padding included, in one pass.
    pub fn fill(&mut self, color: Color) {
        let value = if color.is_on() { 0xFF } else { 0x00 };
        for byte in &mut self.data[..self.modules * 8] {
            *byte = value;
        }
    }

    /// Shifts the grid contents by `dx` pixels right and `dy` pixels down.
    ///
    /// Negative deltas shift left/up. Vacated pixels are cleared.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        let snapshot = self.data;
        for y in 0..self.height {
            for x in 0..self.width {
                let src_x = x as i32 - dx;
                let src_y = y as i32 - dy;
                let on = src_x >= 0
                    && src_y >= 0
                    && (src_x as usize) < self.width
                    && (src_y as usize) < self.height
                    && {
                        let (offset, mask) = self.byte_offset(src_x as usize, src_y as usize);
                        snapshot[offset] & mask != 0
                    };
                self.set_pixel(x, y, Color::from(on));
            }
        }
    }

    /// Renders `text` in a 5x8 font with its top-left corner at (`x`, `y`).
    ///
    /// Glyphs extending past the grid are clipped pixel by pixel.
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32, color: Color) {
        let style = MonoTextStyle::new(&FONT_5X8, color);
        // Drawing into the buffer is infallible.
        let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(self);
    }

    /// Raw row byte of one module, as the row register consumes it.
    pub(crate) fn module_row(&self, module: usize, row: usize) -> u8 {
        self.data[row + module * 8]
    }

    /// The 8-byte pixel block of one module.
    pub(crate) fn module_block(&self, module: usize) -> &[u8] {
        &self.data[module * 8..module * 8 + 8]
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        for pixel in pixels {
            if pixel.0.x >= 0 && pixel.0.y >= 0 {
                self.set_pixel(pixel.0.x as usize, pixel.0.y as usize, pixel.1);
            }
        }
        Ok(())
    }
}
