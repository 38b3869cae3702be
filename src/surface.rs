//! Drawing surface
//!
//! `Surface` binds a pixel sink to a viewport and carries the drawing state:
//! the transaction bracket that claims the bus exactly once per composite
//! operation, the byte-swap mode for raw 16-bit image data, and the
//! foreground/background pair used by monochrome bitmap sources.
//!
//! The leaf primitives here (pixel, fast horizontal/vertical runs, rectangle
//! fills) are the batching contract everything else is built on: shape and
//! image rasterizers reduce their output to these runs wherever possible.

use crate::color::{alpha_blend, Rgb};
use crate::config::SurfaceConfig;
use crate::sink::PixelSink;
use crate::viewport::Viewport;

pub struct Surface<S: PixelSink> {
    pub(crate) sink: S,
    pub(crate) vp: Viewport,
    /// True while the bus is released; cleared by the first claim
    pub(crate) locked: bool,
    /// True while a composite operation suppresses intermediate bus releases
    pub(crate) in_transaction: bool,
    /// True while the caller holds an explicit write bracket
    pub(crate) lock_transaction: bool,
    /// Raw 16-bit image sources carry byte-swapped colors
    pub(crate) swap_bytes: bool,
    pub(crate) mono_fg: Rgb,
    pub(crate) mono_bg: Rgb,
}

impl<S: PixelSink> Surface<S> {
    /// Wrap a sink with a full-device viewport and default drawing state
    pub fn new(sink: S) -> Self {
        let vp = Viewport::full(sink.width(), sink.height());
        Self {
            sink,
            vp,
            locked: true,
            in_transaction: false,
            lock_transaction: false,
            swap_bytes: false,
            mono_fg: Rgb::WHITE,
            mono_bg: Rgb::BLACK,
        }
    }

    /// Wrap a sink applying a stored configuration
    pub fn with_config(sink: S, config: &SurfaceConfig) -> Self {
        let mut surface = Self::new(sink);
        surface.swap_bytes = config.swap_bytes;
        surface.set_mono_colors(config.mono_fg, config.mono_bg);
        surface
    }

    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Release the surface, returning the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    // ========================================================================
    // Transaction bracket
    // ========================================================================

    /// Claim the bus if it is not already claimed
    #[inline]
    pub(crate) fn claim_bus(&mut self) {
        if self.locked {
            self.locked = false;
            self.sink.begin_transaction();
        }
    }

    /// Release the bus unless a composite operation or caller bracket holds it
    #[inline]
    pub(crate) fn release_bus(&mut self) {
        if !self.in_transaction && !self.locked {
            self.locked = true;
            self.sink.end_transaction();
        }
    }

    /// Open a caller-held write bracket.
    ///
    /// Keeps the bus claimed across any number of drawing calls until the
    /// matching `end_write`, avoiding per-primitive bus setup/teardown.
    /// Nested brackets are tolerated: the bus is claimed once.
    pub fn start_write(&mut self) {
        self.claim_bus();
        self.lock_transaction = true;
        self.in_transaction = true;
    }

    /// Close the bracket opened by `start_write` and release the bus
    pub fn end_write(&mut self) {
        self.lock_transaction = false;
        self.in_transaction = false;
        self.release_bus();
    }

    /// Open a composite-operation bracket: until the matching
    /// `end_composite`, nested primitives (including other composites) keep
    /// the bus claimed instead of releasing it between runs. Returns the
    /// outer bracket state to restore.
    pub(crate) fn begin_composite(&mut self) -> bool {
        let outer = self.lock_transaction;
        self.in_transaction = true;
        self.lock_transaction = true;
        outer
    }

    /// Close a composite bracket; the bus is released only at the outermost
    /// level (and never inside a caller-held `start_write` bracket)
    pub(crate) fn end_composite(&mut self, outer: bool) {
        self.lock_transaction = outer;
        self.in_transaction = outer;
        self.release_bus();
    }

    // ========================================================================
    // Viewport management
    // ========================================================================

    /// Set the clip rectangle and coordinate datum. See [`Viewport::set`].
    pub fn set_viewport(&mut self, x: i32, y: i32, w: i32, h: i32, datum_relative: bool) {
        let (dw, dh) = (self.sink.width(), self.sink.height());
        self.vp.set(x, y, w, h, datum_relative, dw, dh);
    }

    /// Reset the viewport to the whole device, datum at 0,0
    pub fn reset_viewport(&mut self) {
        let (dw, dh) = (self.sink.width(), self.sink.height());
        self.vp.reset(dw, dh);
    }

    /// Check if any part of the rectangle is visible in the viewport
    pub fn check_viewport(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        self.vp.check(x, y, w, h)
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.vp
    }

    /// Drawable width as seen by callers (viewport width)
    #[inline]
    pub fn width(&self) -> i32 {
        self.vp.width()
    }

    /// Drawable height as seen by callers (viewport height)
    #[inline]
    pub fn height(&self) -> i32 {
        self.vp.height()
    }

    /// Draw a frame of width `w` just inside (`w > 0`) or just outside
    /// (`w < 0`) the viewport. A large magnitude clears the corresponding
    /// side of the boundary entirely.
    pub fn frame_viewport(&mut self, color: Rgb, w: i32) {
        if self.vp.is_out_of_bounds() || w == 0 {
            return;
        }
        // Viewport rectangle in caller coordinates
        let left = self.vp.left - self.vp.x_datum;
        let top = self.vp.top - self.vp.y_datum;
        let vw = self.vp.right - self.vp.left;
        let vh = self.vp.bottom - self.vp.top;

        let bracket = self.begin_composite();
        if w > 0 {
            // Inside: four bars along the inner edges
            let w = w.min(vw).min(vh);
            self.fill_rect(left, top, vw, w, color);
            self.fill_rect(left, top + vh - w, vw, w, color);
            self.fill_rect(left, top + w, w, vh - 2 * w, color);
            self.fill_rect(left + vw - w, top + w, w, vh - 2 * w, color);
        } else {
            // Outside: widen the clip to the device for the duration
            let w = -w;
            let saved = self.vp.clone();
            self.vp.left = 0;
            self.vp.top = 0;
            self.vp.right = self.sink.width();
            self.vp.bottom = self.sink.height();
            self.fill_rect(left - w, top - w, vw + 2 * w, w, color);
            self.fill_rect(left - w, top + vh, vw + 2 * w, w, color);
            self.fill_rect(left - w, top, w, vh, color);
            self.fill_rect(left + vw, top, w, vh, color);
            self.vp = saved;
        }
        self.end_composite(bracket);
    }

    // ========================================================================
    // Mode flags
    // ========================================================================

    /// Declare that raw 16-bit image sources carry byte-swapped colors
    pub fn set_swap_bytes(&mut self, swap: bool) {
        self.swap_bytes = swap;
    }

    #[inline]
    pub fn swap_bytes(&self) -> bool {
        self.swap_bytes
    }

    /// Set the colors used by monochrome bitmap sources.
    /// Equal colors would make the bitmap invisible, so the background is
    /// inverted in that case.
    pub fn set_mono_colors(&mut self, fg: Rgb, bg: Rgb) {
        let bg = if fg == bg {
            Rgb::new(!bg.r, !bg.g, !bg.b)
        } else {
            bg
        };
        self.mono_fg = fg;
        self.mono_bg = bg;
    }

    #[inline]
    pub fn mono_colors(&self) -> (Rgb, Rgb) {
        (self.mono_fg, self.mono_bg)
    }

    // ========================================================================
    // Raw window streaming
    // ========================================================================

    /// Push packed pixels into the current window, honoring byte-swap mode
    pub(crate) fn push_pixels(&mut self, data: &[u16]) {
        if self.swap_bytes {
            let swapped: Vec<u16> = data.iter().map(|c| c.swap_bytes()).collect();
            self.sink.write_pixels(&swapped);
        } else {
            self.sink.write_pixels(data);
        }
    }

    /// Declare a device rectangle for a following stream of
    /// `push_color`/`push_color_run` calls. Coordinates are raw device
    /// coordinates; the caller owns clipping for raw streaming.
    pub fn set_addr_window(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.claim_bus();
        self.sink.set_window(x, y, x + w - 1, y + h - 1);
        self.release_bus();
    }

    /// Push one color into the current window
    pub fn push_color(&mut self, color: Rgb) {
        self.claim_bus();
        self.sink.write_run(color.to_565(), 1);
        self.release_bus();
    }

    /// Push `len` repetitions of one color into the current window
    pub fn push_color_run(&mut self, color: Rgb, len: u32) {
        self.claim_bus();
        self.sink.write_run(color.to_565(), len);
        self.release_bus();
    }

    // ========================================================================
    // Leaf primitives
    // ========================================================================

    /// Draw a single clipped pixel
    pub fn draw_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        let Some((px, py)) = self.vp.clip_pixel(x, y) else {
            return;
        };
        self.claim_bus();
        self.sink.set_window(px, py, px, py);
        self.sink.write_run(color.to_565(), 1);
        self.release_bus();
    }

    /// Read back the color at a coordinate; black outside the viewport
    pub fn read_pixel(&mut self, x: i32, y: i32) -> Rgb {
        match self.vp.clip_pixel(x, y) {
            Some((px, py)) => Rgb::from_565(self.sink.read_pixel(px, py)),
            None => Rgb::BLACK,
        }
    }

    /// Draw a horizontal run of `w` pixels starting at (x, y)
    pub fn draw_fast_hline(&mut self, x: i32, y: i32, w: i32, color: Rgb) {
        let Some((x, y, w)) = self.vp.clip_hspan(x, y, w) else {
            return;
        };
        self.claim_bus();
        self.sink.set_window(x, y, x + w - 1, y);
        self.sink.write_run(color.to_565(), w as u32);
        self.release_bus();
    }

    /// Draw a vertical run of `h` pixels starting at (x, y)
    pub fn draw_fast_vline(&mut self, x: i32, y: i32, h: i32, color: Rgb) {
        let Some((x, y, h)) = self.vp.clip_vspan(x, y, h) else {
            return;
        };
        self.claim_bus();
        self.sink.set_window(x, y, x, y + h - 1);
        self.sink.write_run(color.to_565(), h as u32);
        self.release_bus();
    }

    /// Fill a rectangle
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        self.sink.set_window(c.x, c.y, c.x + c.w - 1, c.y + c.h - 1);
        self.sink.write_run(color.to_565(), (c.w * c.h) as u32);
        self.release_bus();
    }

    /// Draw a rectangle outline
    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        let bracket = self.begin_composite();
        self.draw_fast_hline(x, y, w, color);
        self.draw_fast_hline(x, y + h - 1, w, color);
        // Avoid drawing corner pixels twice
        self.draw_fast_vline(x, y + 1, h - 2, color);
        self.draw_fast_vline(x + w - 1, y + 1, h - 2, color);
        self.end_composite(bracket);
    }

    /// Fill the whole drawable area
    pub fn fill_screen(&mut self, color: Rgb) {
        self.fill_rect(0, 0, self.vp.width(), self.vp.height(), color);
    }

    // ========================================================================
    // Gradient fills
    // ========================================================================

    /// Fill a rectangle with a top-to-bottom color gradient
    pub fn fill_rect_v_gradient(&mut self, x: i32, y: i32, w: i32, h: i32, top: Rgb, bottom: Rgb) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();

        let delta = -255.0 / c.h as f32;
        let mut alpha = 255.0_f32;
        let mut color = top;
        for row in 0..c.h {
            self.sink.set_window(c.x, c.y + row, c.x + c.w - 1, c.y + row);
            self.sink.write_run(color.to_565(), c.w as u32);
            alpha += delta;
            color = alpha_blend(alpha as u8, top, bottom);
        }

        self.end_composite(bracket);
    }

    /// Fill a rectangle with a left-to-right color gradient
    pub fn fill_rect_h_gradient(&mut self, x: i32, y: i32, w: i32, h: i32, left: Rgb, right: Rgb) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();

        let delta = -255.0 / c.w as f32;
        let mut alpha = 255.0_f32;
        let mut color = left;
        for col in 0..c.w {
            self.sink.set_window(c.x + col, c.y, c.x + col, c.y + c.h - 1);
            self.sink.write_run(color.to_565(), c.h as u32);
            alpha += delta;
            color = alpha_blend(alpha as u8, left, right);
        }

        self.end_composite(bracket);
    }
}
