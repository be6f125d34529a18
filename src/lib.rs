//! Driver for daisy-chained MAX7219 8x8 LED matrix modules.
//!
//! ## How MAX7219 chains work
//!
//! Each module is an 8x8 LED matrix behind a MAX7219 row driver. The chip
//! speaks a 16-bit register protocol: one address byte (digit/row registers
//! 1..=8 plus a handful of control registers) followed by one data byte.
//! Modules are daisy-chained through their DOUT pins, so the whole chain
//! behaves like one long shift register: every 16-bit word clocked in pushes
//! the previous word one module further down the chain, and all modules
//! latch simultaneously when chip select rises.
//!
//! Two consequences shape this driver:
//!
//! - **Chain order**: to update one register across N modules, N
//!   (address, value) words are sent in a single chip-select frame, and the
//!   *first* word sent ends up in the module *furthest* from the
//!   controller. Per-module values are therefore always emitted for module
//!   N-1 down to module 0.
//! - **Row registers**: there is no pixel addressing; the unit of transfer
//!   is one 8-bit row per module. A full refresh is exactly 8 register
//!   writes, each carrying one byte per module.
//!
//! ## Grid layout
//!
//! [`FrameBuffer`] presents the chain as a single monochrome pixel grid.
//! Requested dimensions round up to whole modules; modules are laid out
//! left-to-right, top-to-bottom, with module 0 electrically closest to the
//! controller. [`Orientation::Rotated90`] projects each module's pixel
//! block through an 8x8 bit transpose at flush time, for boards where the
//! modules are mounted rotated a quarter turn.
//!
//! ## Example
//!
//! ```rust,ignore
//! use max7219_matrix::Color;
//! use max7219_matrix::Max7219Matrix;
//! use max7219_matrix::Orientation;
//!
//! // Four modules chained side by side: a 32x8 pixel grid.
//! let mut display = Max7219Matrix::new(spi, cs, 32, 8, Orientation::Normal)?;
//! display.init()?;
//! display.brightness(7)?;
//! display.draw_text("8:15", 0, 0, Color::On);
//! display.flush()?;
//! ```
//!
//! Drawing only mutates the framebuffer; nothing reaches the bus until
//! [`Max7219Matrix::flush`] is called.
#![no_std]

use embedded_graphics::pixelcolor::BinaryColor;

pub mod chain;
pub mod framebuffer;
pub mod matrix;

pub use chain::Max7219Chain;
pub use framebuffer::FrameBuffer;
pub use matrix::Max7219Matrix;

/// Pixel color type of the framebuffer (1 bit per pixel).
pub type Color = BinaryColor;

/// Longest chain supported by the fixed-capacity buffers.
pub const MAX_MODULES: usize = 32;

/// Physical mounting orientation of the module grid.
///
/// Fixed at construction. `Rotated90` reads each module's pixel block
/// transposed at flush time; the framebuffer layout itself is identical in
/// both orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Orientation {
    /// Module rows align with grid rows.
    #[default]
    Normal,
    /// Modules are mounted rotated a quarter turn.
    Rotated90,
}

/// Errors raised by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<SpiE, PinE> {
    /// The SPI bus rejected a write.
    Spi(SpiE),
    /// The chip-select pin could not be driven.
    Pin(PinE),
    /// Width or height of zero was requested.
    InvalidDimensions,
    /// The requested grid needs more than [`MAX_MODULES`] modules.
    ChainTooLong,
}

/// Computes the number of 8x8 modules needed for a pixel grid.
///
/// Both dimensions round up to the next whole module, so a 20x9 grid
/// occupies 3x2 = 6 modules with unused padding pixels in the last module
/// column and row.
#[must_use]
pub const fn compute_modules(width: usize, height: usize) -> usize {
    width.div_ceil(8) * height.div_ceil(8)
}
