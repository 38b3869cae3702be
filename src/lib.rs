//! glaze — display rasterization and pixel compositing for small embedded
//! color displays.
//!
//! Geometric drawing requests (lines, circles, ellipses, triangles, rounded
//! rectangles, arcs) and packed images/sprites (1/4/8/16 bpp, optionally
//! color-mapped or transparency-keyed) are clipped against a viewport,
//! rasterized into minimal pixel runs, and streamed through a [`PixelSink`]
//! in ordered, transaction-bracketed writes.
//!
//! The sink is the only device dependency: anything that can accept "set a
//! rectangular window, then take pixels row-major" can be drawn to. An
//! in-memory [`FramebufferSink`] ships for offscreen rendering and tests.
//!
//! ```
//! use glaze::{FramebufferSink, Rgb, Surface};
//!
//! let mut surface = Surface::new(FramebufferSink::new(160, 128));
//! surface.start_write();
//! surface.fill_screen(Rgb::BLACK);
//! surface.draw_line(0, 0, 159, 127, Rgb::CYAN);
//! surface.fill_smooth_circle(80, 64, 30, Rgb::ORANGE, glaze::Background::Solid(Rgb::BLACK));
//! surface.end_write();
//! assert_eq!(surface.sink().pixel(80, 64), Some(Rgb::ORANGE.to_565()));
//! ```

mod blit;
mod color;
mod config;
mod framebuffer;
mod math;
mod shapes;
mod sink;
mod smooth;
mod surface;
mod util;
mod viewport;

pub use blit::{Image, ImageData};
pub use color::{alpha_blend, alpha_blend_dither, expand_332, Rgb};
pub use config::SurfaceConfig;
pub use framebuffer::{FramebufferSink, SinkStats};
pub use math::sqrt_fraction;
pub use shapes::corner;
pub use sink::{Background, PixelSink};
pub use surface::Surface;
pub use util::Rng;
pub use viewport::{ClippedRect, Viewport};
