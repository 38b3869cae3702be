//! Pixel sink interface
//!
//! The rasterization core never talks to a bus or panel controller directly.
//! It emits an ordered stream of window declarations and pixel writes through
//! this trait; the transport (SPI, parallel bus, an in-memory framebuffer)
//! lives on the other side.

use crate::color::Rgb;

/// Destination for rasterized pixels.
///
/// A sink exposes a rectangular pixel grid. `set_window` declares a device
/// rectangle; subsequent writes fill it row-major until it is exhausted or
/// redeclared. Colors cross this boundary in the packed 5-6-5 form.
///
/// Transactions bracket bus ownership: the core guarantees that every
/// composite drawing operation claims the bus exactly once, however many
/// primitives it is built from, so `begin_transaction`/`end_transaction` are
/// never nested by the core.
pub trait PixelSink {
    /// Device width in pixels
    fn width(&self) -> i32;

    /// Device height in pixels
    fn height(&self) -> i32;

    /// Claim the bus / chip select for a burst of writes
    fn begin_transaction(&mut self);

    /// Release the bus claimed by `begin_transaction`
    fn end_transaction(&mut self);

    /// Declare the device rectangle (inclusive corners) that subsequent
    /// writes will fill row-major
    fn set_window(&mut self, x0: i32, y0: i32, x1: i32, y1: i32);

    /// Write `count` repetitions of one packed color into the current window
    fn write_run(&mut self, color: u16, count: u32);

    /// Write a sequence of distinct packed colors into the current window
    fn write_pixels(&mut self, colors: &[u16]);

    /// Read back the current packed color at a device coordinate.
    /// Only used by the read-back-background alpha blend mode.
    fn read_pixel(&mut self, x: i32, y: i32) -> u16;
}

/// What anti-aliased edges blend against.
///
/// `ReadBack` fetches the live pixel under each blended edge pixel from the
/// sink, so smooth shapes can be drawn over arbitrary content at the cost of
/// a read per edge pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    /// Blend against a constant color
    Solid(Rgb),
    /// Blend against the pixel currently on the device
    ReadBack,
}
