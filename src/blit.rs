//! Image and sprite blitting
//!
//! Decodes packed source buffers (16, 8, 4 and 1 bits per pixel, optionally
//! color-mapped or transparency-keyed) into pixel runs streamed through the
//! sink. Transparency is detected per row and flushed as minimal sub-span
//! windows: repositioning the device window is the expensive operation, not
//! the pixel write, so runs are kept as long as possible.
//!
//! Every path clips through the viewport first, claims the bus exactly once,
//! and restores any surface mode flag it overrides before returning.

use crate::color::expand_332;
use crate::sink::PixelSink;
use crate::surface::Surface;

// ============================================================================
// Image descriptor
// ============================================================================

/// Pixel data of an [`Image`], at its source bit depth.
///
/// Transparency sentinels are compared at the source depth, before any
/// color-map or palette expansion.
#[derive(Clone, Copy)]
pub enum ImageData<'a> {
    /// 16-bit 5-6-5 pixels, row-major
    Rgb565 {
        data: &'a [u16],
        transparent: Option<u16>,
    },
    /// 8-bit 3-3-2 packed pixels
    Packed332 {
        data: &'a [u8],
        transparent: Option<u8>,
    },
    /// two 4-bit color-map indices per byte, rows padded to whole bytes
    Indexed4 {
        data: &'a [u8],
        colormap: &'a [u16; 16],
        transparent: Option<u8>,
    },
    /// 1 bit per pixel, MSB first, rows padded to whole bytes; colors come
    /// from the surface's mono pair. With `keyed`, clear bits are transparent.
    Mono { data: &'a [u8], keyed: bool },
}

/// A packed source image or sprite
pub struct Image<'a> {
    pub width: i32,
    pub height: i32,
    pub data: ImageData<'a>,
}

impl<S: PixelSink> Surface<S> {
    /// Draw an [`Image`] with its top-left corner at (x, y)
    pub fn draw_image(&mut self, x: i32, y: i32, image: &Image) {
        let (w, h) = (image.width, image.height);
        match image.data {
            ImageData::Rgb565 {
                data,
                transparent: None,
            } => self.push_image(x, y, w, h, data),
            ImageData::Rgb565 {
                data,
                transparent: Some(t),
            } => self.push_image_keyed(x, y, w, h, data, t),
            ImageData::Packed332 {
                data,
                transparent: None,
            } => self.push_image_8bpp(x, y, w, h, data),
            ImageData::Packed332 {
                data,
                transparent: Some(t),
            } => self.push_image_8bpp_keyed(x, y, w, h, data, t),
            ImageData::Indexed4 {
                data,
                colormap,
                transparent: None,
            } => self.push_image_4bpp(x, y, w, h, data, colormap),
            ImageData::Indexed4 {
                data,
                colormap,
                transparent: Some(t),
            } => self.push_image_4bpp_keyed(x, y, w, h, data, colormap, t),
            ImageData::Mono { data, keyed: false } => self.push_image_1bpp(x, y, w, h, data),
            ImageData::Mono { data, keyed: true } => self.push_image_1bpp_keyed(x, y, w, h, data),
        }
    }

    // ========================================================================
    // 16 bpp
    // ========================================================================

    /// Push a 16-bit pixel block ignoring the byte-swap mode (the flag is
    /// saved and restored around the blit)
    pub fn push_rect(&mut self, x: i32, y: i32, w: i32, h: i32, data: &[u16]) {
        let swap = self.swap_bytes;
        self.swap_bytes = false;
        self.push_image(x, y, w, h, data);
        self.swap_bytes = swap;
    }

    /// Plot a 16-bit image or sprite
    pub fn push_image(&mut self, x: i32, y: i32, w: i32, h: i32, data: &[u16]) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();

        self.sink.set_window(c.x, c.y, c.x + c.w - 1, c.y + c.h - 1);

        let mut offset = (c.src_x + c.src_y * w) as usize;

        if c.w == w {
            // Whole cropped block is one contiguous run
            self.push_pixels(&data[offset..offset + (c.w * c.h) as usize]);
        } else {
            // Push line segments to crop the image
            for _ in 0..c.h {
                self.push_pixels(&data[offset..offset + c.w as usize]);
                offset += w as usize;
            }
        }

        self.end_composite(bracket);
    }

    /// Plot a 16-bit image treating one color value as transparent.
    ///
    /// Each row is scanned for opaque runs; every run gets its own sub-span
    /// window. The sentinel is compared in the source's byte order: when the
    /// surface is configured for swapped byte order it is swapped once up
    /// front, not per pixel.
    pub fn push_image_keyed(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u16],
        transparent: u16,
    ) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();

        let transparent = if self.swap_bytes {
            transparent.swap_bytes()
        } else {
            transparent
        };

        let mut row = (c.src_x + c.src_y * w) as usize;
        let mut line_buf: Vec<u16> = Vec::with_capacity(c.w as usize);

        for dy in 0..c.h {
            let yd = c.y + dy;
            let mut px = c.x;
            let mut sx = c.x;
            let mut in_run = false;

            line_buf.clear();
            for &p in &data[row..row + c.w as usize] {
                if p != transparent {
                    if !in_run {
                        in_run = true;
                        sx = px;
                    }
                    line_buf.push(p);
                } else {
                    in_run = false;
                    if !line_buf.is_empty() {
                        self.sink
                            .set_window(sx, yd, sx + line_buf.len() as i32 - 1, yd);
                        self.push_pixels(&line_buf);
                        line_buf.clear();
                    }
                }
                px += 1;
            }
            if !line_buf.is_empty() {
                self.sink
                    .set_window(sx, yd, sx + line_buf.len() as i32 - 1, yd);
                self.push_pixels(&line_buf);
                line_buf.clear();
            }

            row += w as usize;
        }

        self.end_composite(bracket);
    }

    // ========================================================================
    // 8 bpp (3-3-2)
    // ========================================================================

    /// Plot an 8-bit 3-3-2 image
    pub fn push_image_8bpp(&mut self, x: i32, y: i32, w: i32, h: i32, data: &[u8]) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();
        let swap = self.swap_bytes;
        self.swap_bytes = false; // Decoded pixels are already native order

        self.sink.set_window(c.x, c.y, c.x + c.w - 1, c.y + c.h - 1);

        let mut line_buf = vec![0u16; c.w as usize];
        let mut row = (c.src_x + c.src_y * w) as usize;

        // The expansion shifts are slow, so consecutive repeats of one source
        // value reuse the last expanded color
        let mut last_color: u32 = u32::MAX;
        let mut last_565: u16 = 0;

        for _ in 0..c.h {
            for (slot, &p) in line_buf.iter_mut().zip(&data[row..row + c.w as usize]) {
                if p as u32 != last_color {
                    last_565 = expand_332(p);
                    last_color = p as u32;
                }
                *slot = last_565;
            }
            self.push_pixels(&line_buf);
            row += w as usize;
        }

        self.swap_bytes = swap;
        self.end_composite(bracket);
    }

    /// Plot an 8-bit 3-3-2 image treating one source byte as transparent
    pub fn push_image_8bpp_keyed(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u8],
        transparent: u8,
    ) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();
        let swap = self.swap_bytes;
        self.swap_bytes = false;

        let mut row = (c.src_x + c.src_y * w) as usize;
        let mut line_buf: Vec<u16> = Vec::with_capacity(c.w as usize);

        let mut last_color: u32 = u32::MAX;
        let mut last_565: u16 = 0;

        for dy in 0..c.h {
            let yd = c.y + dy;
            let mut px = c.x;
            let mut sx = c.x;
            let mut in_run = false;

            line_buf.clear();
            for &p in &data[row..row + c.w as usize] {
                if p != transparent {
                    if !in_run {
                        in_run = true;
                        sx = px;
                    }
                    if p as u32 != last_color {
                        last_565 = expand_332(p);
                        last_color = p as u32;
                    }
                    line_buf.push(last_565);
                } else {
                    in_run = false;
                    if !line_buf.is_empty() {
                        self.sink
                            .set_window(sx, yd, sx + line_buf.len() as i32 - 1, yd);
                        self.push_pixels(&line_buf);
                        line_buf.clear();
                    }
                }
                px += 1;
            }
            if !line_buf.is_empty() {
                self.sink
                    .set_window(sx, yd, sx + line_buf.len() as i32 - 1, yd);
                self.push_pixels(&line_buf);
                line_buf.clear();
            }

            row += w as usize;
        }

        self.swap_bytes = swap;
        self.end_composite(bracket);
    }

    // ========================================================================
    // 4 bpp (16-entry colormap)
    // ========================================================================

    /// Plot a 4-bit color-mapped image. Source rows hold two pixels per byte
    /// and are padded to a whole byte (stride is width rounded up to even).
    pub fn push_image_4bpp(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u8],
        colormap: &[u16; 16],
    ) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();
        let swap = self.swap_bytes;
        self.swap_bytes = false;

        self.sink.set_window(c.x, c.y, c.x + c.w - 1, c.y + c.h - 1);

        // Row stride in nibbles, rounded up to a byte boundary
        let w_even = (w + 1) & !1;
        // An odd clipped start column begins mid-byte: consume the low nibble
        // of the preceding byte first so pair boundaries stay aligned
        let split_first = c.src_x & 0x01 != 0;
        let mut row = if split_first {
            ((c.src_x - 1 + c.src_y * w_even) >> 1) as usize
        } else {
            ((c.src_x + c.src_y * w_even) >> 1) as usize
        };

        let mut line_buf: Vec<u16> = Vec::with_capacity(c.w as usize);

        for _ in 0..c.h {
            let mut ptr = row;
            let mut len = c.w;
            line_buf.clear();

            if split_first {
                line_buf.push(colormap[(data[ptr] & 0x0F) as usize]);
                len -= 1;
                ptr += 1;
            }

            while len > 0 {
                let colors = data[ptr]; // Two pixels in one byte
                line_buf.push(colormap[((colors & 0xF0) >> 4) as usize]);
                len -= 1;
                if len > 0 {
                    line_buf.push(colormap[(colors & 0x0F) as usize]);
                    len -= 1;
                } else {
                    break;
                }
                ptr += 1;
            }

            self.push_pixels(&line_buf);
            row += (w_even >> 1) as usize;
        }

        self.swap_bytes = swap;
        self.end_composite(bracket);
    }

    /// Plot a 4-bit color-mapped image treating one nibble value as
    /// transparent. The comparison happens on the index, before color-map
    /// expansion.
    pub fn push_image_4bpp_keyed(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        data: &[u8],
        colormap: &[u16; 16],
        transparent: u8,
    ) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();
        let swap = self.swap_bytes;
        self.swap_bytes = false;

        let w_even = (w + 1) & !1;
        let split_first = c.src_x & 0x01 != 0;
        let mut row = if split_first {
            ((c.src_x - 1 + c.src_y * w_even) >> 1) as usize
        } else {
            ((c.src_x + c.src_y * w_even) >> 1) as usize
        };

        let mut line_buf: Vec<u16> = Vec::with_capacity(c.w as usize);

        for dy in 0..c.h {
            let yd = c.y + dy;
            let mut ptr = row;
            let mut len = c.w;
            let mut px = c.x;
            let mut sx = c.x;
            let mut in_run = false;
            line_buf.clear();

            if split_first {
                let index = data[ptr] & 0x0F; // Odd column: low nibble first
                if index != transparent {
                    in_run = true;
                    sx = px;
                    line_buf.push(colormap[index as usize]);
                }
                px += 1;
                ptr += 1;
                len -= 1;
            }

            while len > 0 {
                let colors = data[ptr];

                let index = (colors & 0xF0) >> 4; // Even column: high nibble
                if index != transparent {
                    if !in_run {
                        in_run = true;
                        sx = px;
                    }
                    line_buf.push(colormap[index as usize]);
                } else {
                    in_run = false;
                    if !line_buf.is_empty() {
                        self.sink
                            .set_window(sx, yd, sx + line_buf.len() as i32 - 1, yd);
                        self.push_pixels(&line_buf);
                        line_buf.clear();
                    }
                }
                px += 1;
                len -= 1;

                if len > 0 {
                    let index = colors & 0x0F;
                    if index != transparent {
                        if !in_run {
                            in_run = true;
                            sx = px;
                        }
                        line_buf.push(colormap[index as usize]);
                    } else {
                        in_run = false;
                        if !line_buf.is_empty() {
                            self.sink
                                .set_window(sx, yd, sx + line_buf.len() as i32 - 1, yd);
                            self.push_pixels(&line_buf);
                            line_buf.clear();
                        }
                    }
                    px += 1;
                    len -= 1;
                } else {
                    break;
                }
                ptr += 1;
            }

            if !line_buf.is_empty() {
                self.sink
                    .set_window(sx, yd, sx + line_buf.len() as i32 - 1, yd);
                self.push_pixels(&line_buf);
                line_buf.clear();
            }

            row += (w_even >> 1) as usize;
        }

        self.swap_bytes = swap;
        self.end_composite(bracket);
    }

    // ========================================================================
    // 1 bpp
    // ========================================================================

    /// Plot a 1-bit image using the surface's mono colors. Source rows are
    /// MSB-first and padded to whole bytes.
    pub fn push_image_1bpp(&mut self, x: i32, y: i32, w: i32, h: i32, data: &[u8]) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();
        let swap = self.swap_bytes;
        self.swap_bytes = false;

        self.sink.set_window(c.x, c.y, c.x + c.w - 1, c.y + c.h - 1);

        let fg = self.mono_fg.to_565();
        let bg = self.mono_bg.to_565();
        let ww = ((w + 7) >> 3) as usize; // Source row width in bytes

        let mut line_buf: Vec<u16> = Vec::with_capacity(c.w as usize);

        for yp in c.src_y..c.src_y + c.h {
            let row = &data[yp as usize * ww..(yp + 1) as usize * ww];
            line_buf.clear();
            for xp in c.src_x..c.src_x + c.w {
                let set = row[(xp >> 3) as usize] & (0x80 >> (xp & 0x7)) != 0;
                line_buf.push(if set { fg } else { bg });
            }
            self.push_pixels(&line_buf);
        }

        self.swap_bytes = swap;
        self.end_composite(bracket);
    }

    /// Plot a 1-bit image drawing only the set bits, as solid-color runs of
    /// the surface's mono foreground; clear bits are transparent
    pub fn push_image_1bpp_keyed(&mut self, x: i32, y: i32, w: i32, h: i32, data: &[u8]) {
        let Some(c) = self.vp.clip_rect(x, y, w, h) else {
            return;
        };
        self.claim_bus();
        let bracket = self.begin_composite();
        let swap = self.swap_bytes;
        self.swap_bytes = false;

        let fg = self.mono_fg.to_565();
        let ww = ((w + 7) >> 3) as usize;

        for dy in 0..c.h {
            let yd = c.y + dy;
            let row = &data[(c.src_y + dy) as usize * ww..(c.src_y + dy + 1) as usize * ww];
            let mut px = c.x;
            let mut sx = c.x;
            let mut in_run = false;
            let mut np: i32 = 0;

            for xp in c.src_x..c.src_x + c.w {
                if row[(xp >> 3) as usize] & (0x80 >> (xp & 0x7)) != 0 {
                    if !in_run {
                        in_run = true;
                        sx = px;
                    }
                    np += 1;
                } else {
                    in_run = false;
                    if np > 0 {
                        self.sink.set_window(sx, yd, sx + np - 1, yd);
                        self.sink.write_run(fg, np as u32);
                        np = 0;
                    }
                }
                px += 1;
            }
            if np > 0 {
                self.sink.set_window(sx, yd, sx + np - 1, yd);
                self.sink.write_run(fg, np as u32);
            }
        }

        self.swap_bytes = swap;
        self.end_composite(bracket);
    }

    // ========================================================================
    // Masked compositing
    // ========================================================================

    /// Render a 16-bit image through a separate 1-bit mask.
    ///
    /// The mask is run-length decoded (byte-at-a-time with all-zero/all-one
    /// fast paths) and each set-run delegates to the 16-bit blit for exactly
    /// that sub-span, so mask decoding never inspects pixel values. Mask rows
    /// are padded to whole bytes; padding bits must be 0.
    pub fn push_masked_image(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        img: &[u16],
        mask: &[u8],
    ) {
        if self.vp.is_out_of_bounds() || w < 1 || h < 1 {
            return;
        }
        // Window clipping is delegated to push_image per set-run
        self.claim_bus();
        let bracket = self.begin_composite();

        let row_bytes = ((w + 7) >> 3) as usize;

        for row in 0..h as usize {
            let yd = y + row as i32;
            let mrow = &mask[row * row_bytes..(row + 1) * row_bytes];
            let irow = &img[row * w as usize..(row + 1) * w as usize];

            let mut xp: i32 = 0;
            let mut mi = 1usize;
            let mut mbyte = mrow[0];
            let mut bits: u32 = 8;

            loop {
                // Clear-bit run gives the x offset
                let mut clear_count: i32 = 0;
                while mbyte & 0x80 == 0 {
                    if mbyte == 0 {
                        // Remaining bits in the byte are all clear
                        clear_count += bits as i32;
                        if mi >= row_bytes {
                            break;
                        }
                        mbyte = mrow[mi];
                        mi += 1;
                        bits = 8;
                        continue;
                    }
                    mbyte <<= 1;
                    clear_count += 1;
                    bits -= 1;
                    if bits > 0 {
                        continue;
                    }
                    if mi >= row_bytes {
                        break;
                    }
                    mbyte = mrow[mi];
                    mi += 1;
                    bits = 8;
                }

                // Set-bit run gives the render width
                let mut set_count: i32 = 0;
                while mbyte & 0x80 == 0x80 {
                    if mbyte == 0xFF {
                        set_count += bits as i32;
                        if mi >= row_bytes {
                            break;
                        }
                        mbyte = mrow[mi];
                        mi += 1;
                        continue;
                    }
                    mbyte <<= 1;
                    set_count += 1;
                    bits -= 1;
                    if bits > 0 {
                        continue;
                    }
                    if mi >= row_bytes {
                        break;
                    }
                    mbyte = mrow[mi];
                    mi += 1;
                    bits = 8;
                }

                if set_count > 0 {
                    xp += clear_count;
                    // Padding bits are defined to be 0; clamp guards a
                    // malformed mask from overrunning the image row
                    let set_count = set_count.min(w - xp);
                    if set_count > 0 {
                        self.push_image(x + xp, yd, set_count, 1, &irow[xp as usize..]);
                    }
                    xp += set_count;
                } else if mi >= row_bytes {
                    break; // Row exhausted
                }
            }
        }

        self.end_composite(bracket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::framebuffer::FramebufferSink;

    fn surface() -> Surface<FramebufferSink> {
        Surface::new(FramebufferSink::new(40, 30))
    }

    fn px(s: &Surface<FramebufferSink>, x: i32, y: i32) -> u16 {
        s.sink().pixel(x, y).unwrap_or(0xDEAD)
    }

    /// 4x3 test card with distinct values
    fn card() -> Vec<u16> {
        (1..=12u16).collect()
    }

    #[test]
    fn test_push_image_basic() {
        let mut s = surface();
        s.push_image(2, 3, 4, 3, &card());
        for row in 0..3 {
            for col in 0..4 {
                assert_eq!(px(&s, 2 + col, 3 + row), (row * 4 + col + 1) as u16);
            }
        }
        // Whole unclipped image is a single window
        assert_eq!(s.sink().stats.windows, 1);
    }

    #[test]
    fn test_push_image_clipped_left_keeps_alignment() {
        let mut s = surface();
        s.push_image(-2, 0, 4, 3, &card());
        // Columns 0..1 show source columns 2..3
        assert_eq!(px(&s, 0, 0), 3);
        assert_eq!(px(&s, 1, 0), 4);
        assert_eq!(px(&s, 0, 2), 11);
    }

    #[test]
    fn test_push_image_fully_clipped_no_sink_calls() {
        let mut s = surface();
        s.push_image(40, 0, 4, 3, &card());
        s.push_image(0, -3, 4, 3, &card());
        assert_eq!(s.sink().stats.windows, 0);
        assert_eq!(s.sink().stats.transactions, 0);
    }

    #[test]
    fn test_push_image_swap_bytes() {
        let mut s = surface();
        s.set_swap_bytes(true);
        let data = [0x1234u16];
        s.push_image(0, 0, 1, 1, &data);
        assert_eq!(px(&s, 0, 0), 0x3412);
        assert!(s.swap_bytes(), "flag must survive the blit");
    }

    #[test]
    fn test_push_rect_ignores_and_restores_swap() {
        let mut s = surface();
        s.set_swap_bytes(true);
        let data = [0x1234u16];
        s.push_rect(0, 0, 1, 1, &data);
        assert_eq!(px(&s, 0, 0), 0x1234);
        assert!(s.swap_bytes());
    }

    #[test]
    fn test_keyed_all_transparent_writes_nothing() {
        let mut s = surface();
        let data = vec![0xF81Fu16; 12];
        s.push_image_keyed(2, 2, 4, 3, &data, 0xF81F);
        let st = &s.sink().stats;
        assert_eq!(st.windows, 0);
        assert_eq!(st.pixels_pushed, 0);
    }

    #[test]
    fn test_keyed_no_transparent_matches_plain_blit() {
        let mut a = surface();
        a.push_image(2, 3, 4, 3, &card());
        let mut b = surface();
        b.push_image_keyed(2, 3, 4, 3, &card(), 0xF81F);
        for y in 0..30 {
            for x in 0..40 {
                assert_eq!(px(&a, x, y), px(&b, x, y));
            }
        }
    }

    #[test]
    fn test_keyed_runs_reposition_windows() {
        let mut s = surface();
        const T: u16 = 0xF81F;
        // One row: run of 2, gap, run of 1
        let data = [7u16, 7, T, T, 9];
        s.push_image_keyed(0, 0, 5, 1, &data, T);
        assert_eq!(px(&s, 0, 0), 7);
        assert_eq!(px(&s, 1, 0), 7);
        assert_eq!(px(&s, 2, 0), 0);
        assert_eq!(px(&s, 3, 0), 0);
        assert_eq!(px(&s, 4, 0), 9);
        assert_eq!(s.sink().stats.windows, 2);
    }

    #[test]
    fn test_keyed_sentinel_compared_in_source_order() {
        let mut s = surface();
        s.set_swap_bytes(true);
        // Source is byte-swapped: an opaque 0x1234 is stored 0x3412, and the
        // transparent sentinel 0xAABB is stored 0xBBAA
        let data = [0x3412u16, 0xBBAA];
        s.push_image_keyed(0, 0, 2, 1, &data, 0xAABB);
        assert_eq!(px(&s, 0, 0), 0x1234);
        assert_eq!(px(&s, 1, 0), 0);
    }

    #[test]
    fn test_8bpp_expansion_and_cache() {
        let mut s = surface();
        // Repeated values exercise the last-color cache
        let data = [0b1110_0000u8, 0b1110_0000, 0b0000_0011, 0b0001_1100];
        s.push_image_8bpp(0, 0, 4, 1, &data);
        assert_eq!(px(&s, 0, 0), expand_332(0b1110_0000));
        assert_eq!(px(&s, 1, 0), expand_332(0b1110_0000));
        assert_eq!(px(&s, 2, 0), expand_332(0b0000_0011));
        assert_eq!(px(&s, 3, 0), expand_332(0b0001_1100));
    }

    #[test]
    fn test_8bpp_keyed_skips_sentinel() {
        let mut s = surface();
        let data = [0xE0u8, 0x00, 0xE0];
        s.push_image_8bpp_keyed(0, 0, 3, 1, &data, 0x00);
        assert_eq!(px(&s, 0, 0), expand_332(0xE0));
        assert_eq!(px(&s, 1, 0), 0);
        assert_eq!(px(&s, 2, 0), expand_332(0xE0));
        assert_eq!(s.sink().stats.windows, 2);
    }

    fn cmap() -> [u16; 16] {
        let mut m = [0u16; 16];
        for (i, e) in m.iter_mut().enumerate() {
            *e = 0x1000 + i as u16;
        }
        m
    }

    #[test]
    fn test_4bpp_even_width() {
        let mut s = surface();
        // 4x2: nibbles 1,2,3,4 / 5,6,7,8
        let data = [0x12u8, 0x34, 0x56, 0x78];
        s.push_image_4bpp(0, 0, 4, 2, &data, &cmap());
        for col in 0..4 {
            assert_eq!(px(&s, col, 0), 0x1001 + col as u16);
            assert_eq!(px(&s, col, 1), 0x1005 + col as u16);
        }
    }

    #[test]
    fn test_4bpp_odd_width_row_stride_rounds_up() {
        let mut s = surface();
        // Width 3: each row padded to 2 bytes; pad nibble is junk 0xF
        let data = [0x12u8, 0x3F, 0x45, 0x6F];
        s.push_image_4bpp(0, 0, 3, 2, &data, &cmap());
        assert_eq!(px(&s, 0, 0), 0x1001);
        assert_eq!(px(&s, 1, 0), 0x1002);
        assert_eq!(px(&s, 2, 0), 0x1003);
        assert_eq!(px(&s, 3, 0), 0); // pad nibble never drawn
        assert_eq!(px(&s, 0, 1), 0x1004);
        assert_eq!(px(&s, 1, 1), 0x1005);
        assert_eq!(px(&s, 2, 1), 0x1006);
    }

    #[test]
    fn test_4bpp_odd_clip_start_consumes_split_nibble() {
        let mut s = surface();
        // Drawing at x = -1 clips one column: the first visible source
        // column is odd, so the row starts with a split half-byte
        let data = [0x12u8, 0x34];
        s.push_image_4bpp(-1, 0, 4, 1, &data, &cmap());
        assert_eq!(px(&s, 0, 0), 0x1002);
        assert_eq!(px(&s, 1, 0), 0x1003);
        assert_eq!(px(&s, 2, 0), 0x1004);
    }

    #[test]
    fn test_4bpp_keyed_transparency_on_index_not_color() {
        let mut s = surface();
        // Index 2 is transparent even though cmap[2] is a visible color
        let data = [0x12u8, 0x32];
        s.push_image_4bpp_keyed(0, 0, 4, 1, &data, &cmap(), 2);
        assert_eq!(px(&s, 0, 0), 0x1001);
        assert_eq!(px(&s, 1, 0), 0);
        assert_eq!(px(&s, 2, 0), 0x1003);
        assert_eq!(px(&s, 3, 0), 0);
    }

    #[test]
    fn test_4bpp_keyed_split_first_transparent() {
        let mut s = surface();
        let data = [0x12u8, 0x34];
        // Split nibble (source column 1, value 2) is the transparent index
        s.push_image_4bpp_keyed(-1, 0, 4, 1, &data, &cmap(), 2);
        assert_eq!(px(&s, 0, 0), 0);
        assert_eq!(px(&s, 1, 0), 0x1003);
        assert_eq!(px(&s, 2, 0), 0x1004);
    }

    #[test]
    fn test_1bpp_uses_mono_colors() {
        let mut s = surface();
        s.set_mono_colors(Rgb::RED, Rgb::NAVY);
        let data = [0b1010_0000u8];
        s.push_image_1bpp(0, 0, 4, 1, &data);
        assert_eq!(px(&s, 0, 0), Rgb::RED.to_565());
        assert_eq!(px(&s, 1, 0), Rgb::NAVY.to_565());
        assert_eq!(px(&s, 2, 0), Rgb::RED.to_565());
        assert_eq!(px(&s, 3, 0), Rgb::NAVY.to_565());
    }

    #[test]
    fn test_1bpp_keyed_pushes_solid_runs_only() {
        let mut s = surface();
        s.set_mono_colors(Rgb::WHITE, Rgb::NAVY);
        let data = [0b1101_0000u8];
        s.push_image_1bpp_keyed(0, 0, 4, 1, &data);
        assert_eq!(px(&s, 0, 0), Rgb::WHITE.to_565());
        assert_eq!(px(&s, 1, 0), Rgb::WHITE.to_565());
        assert_eq!(px(&s, 2, 0), 0); // transparent, not background
        assert_eq!(px(&s, 3, 0), Rgb::WHITE.to_565());
        assert_eq!(s.sink().stats.runs, 2);
    }

    #[test]
    fn test_1bpp_multirow_stride() {
        let mut s = surface();
        s.set_mono_colors(Rgb::WHITE, Rgb::BLACK);
        // 9 px wide: two bytes per row
        let data = [0b1000_0000u8, 0b1000_0000, 0b0000_0001, 0b0000_0000];
        s.push_image_1bpp_keyed(0, 0, 9, 2, &data);
        assert_eq!(px(&s, 0, 0), Rgb::WHITE.to_565());
        assert_eq!(px(&s, 8, 0), Rgb::WHITE.to_565());
        assert_eq!(px(&s, 7, 1), Rgb::WHITE.to_565());
        assert_eq!(px(&s, 0, 1), 0);
    }

    #[test]
    fn test_masked_all_ones_equals_unmasked() {
        let img: Vec<u16> = (100..100 + 12u16).collect();
        let mask = [0xF0u8, 0xF0, 0xF0]; // 4 wide -> 1 byte/row, all set
        let mut a = surface();
        a.push_masked_image(3, 4, 4, 3, &img, &mask);
        let mut b = surface();
        b.push_image(3, 4, 4, 3, &img);
        for y in 0..30 {
            for x in 0..40 {
                assert_eq!(px(&a, x, y), px(&b, x, y));
            }
        }
    }

    #[test]
    fn test_masked_blit_draws_only_set_runs() {
        let img: Vec<u16> = (1..=8u16).collect();
        // 8 wide, 1 row: mask 11000110 -> runs [0..2) and [5..7)
        let mask = [0b1100_0110u8];
        let mut s = surface();
        s.push_masked_image(0, 0, 8, 1, &img, &mask);
        assert_eq!(px(&s, 0, 0), 1);
        assert_eq!(px(&s, 1, 0), 2);
        assert_eq!(px(&s, 2, 0), 0);
        assert_eq!(px(&s, 4, 0), 0);
        assert_eq!(px(&s, 5, 0), 6);
        assert_eq!(px(&s, 6, 0), 7);
        assert_eq!(px(&s, 7, 0), 0);
    }

    #[test]
    fn test_masked_blit_spans_byte_boundaries() {
        let img: Vec<u16> = (1..=16u16).collect();
        // 16 wide: a run crossing the byte boundary (bits 6..10)
        let mask = [0b0000_0011u8, 0b1100_0000];
        let mut s = surface();
        s.push_masked_image(0, 0, 16, 1, &img, &mask);
        for x in 0..16 {
            let expect = if (6..10).contains(&x) { (x + 1) as u16 } else { 0 };
            assert_eq!(px(&s, x, 0), expect, "column {}", x);
        }
    }

    #[test]
    fn test_masked_blit_single_transaction() {
        let img: Vec<u16> = (1..=8u16).collect();
        let mask = [0b1010_1010u8];
        let mut s = surface();
        s.push_masked_image(0, 0, 8, 1, &img, &mask);
        assert_eq!(s.sink().stats.transactions, 1);
    }

    #[test]
    fn test_draw_image_dispatch() {
        let mut s = surface();
        let img = Image {
            width: 4,
            height: 3,
            data: ImageData::Rgb565 {
                data: &card(),
                transparent: None,
            },
        };
        s.draw_image(2, 3, &img);
        assert_eq!(px(&s, 2, 3), 1);

        let mut s = surface();
        s.set_mono_colors(Rgb::GREEN, Rgb::BLACK);
        let bits = [0b1000_0000u8];
        let img = Image {
            width: 8,
            height: 1,
            data: ImageData::Mono {
                data: &bits,
                keyed: true,
            },
        };
        s.draw_image(0, 0, &img);
        assert_eq!(px(&s, 0, 0), Rgb::GREEN.to_565());
    }
}
