//! Anti-aliased rasterization
//!
//! Two coverage strategies, chosen per primitive:
//!
//! * distance-to-capsule coverage for arbitrary-width lines, spots and arc
//!   end caps: each candidate pixel's perpendicular distance to the finite
//!   two-radius capsule maps to an alpha value, with a moving left-edge
//!   cursor so cost stays proportional to the bounding box area;
//! * radius-band coverage for circles, rounded corners and arcs: squared
//!   distance from the center falls in one of three bands (inner AA zone,
//!   solid run, outer AA zone) and the fractional square root of the
//!   boundary excess supplies the alpha.
//!
//! Edge alphas below 16/255 are skipped outright and above ~246/255 written
//! solid, so near-invisible and near-solid blends never pay for a blend.

use crate::color::{alpha_blend, Rgb};
use crate::math::sqrt_fraction;
use crate::sink::{Background, PixelSink};
use crate::surface::Surface;

/// Coverage-to-alpha scale for the wedge-line scan
const ALPHA_GAIN: f32 = 255.0;
/// Below this coverage a pixel is fully outside
const LO_ALPHA: f32 = 1.0 / 32.0;
/// Above this coverage a pixel is fully inside
const HI_ALPHA: f32 = 1.0 - LO_ALPHA;

/// Distance from point (px, py) (given relative to capsule start a) to the
/// closest part of the capsule from a to a+b whose radius shrinks by `dr`
/// along its length. The projection parameter clamps to [0, 1] so the caps
/// are honored.
#[inline]
fn wedge_line_distance(xpax: f32, ypay: f32, bax: f32, bay: f32, dr: f32) -> f32 {
    let h = ((xpax * bax + ypay * bay) / (bax * bax + bay * bay)).clamp(0.0, 1.0);
    let dx = xpax - bax * h;
    let dy = ypay - bay * h;
    (dx * dx + dy * dy).sqrt() + h * dr
}

impl<S: PixelSink> Surface<S> {
    /// Draw one pixel alpha-blended against a constant color or the live
    /// framebuffer content. Returns the blended color so symmetric callers
    /// can reuse it.
    pub fn draw_alpha_pixel(
        &mut self,
        x: i32,
        y: i32,
        color: Rgb,
        alpha: u8,
        background: Background,
    ) -> Rgb {
        let bg = match background {
            Background::Solid(c) => c,
            Background::ReadBack => self.read_pixel(x, y),
        };
        let blended = alpha_blend(alpha, color, bg);
        self.draw_pixel(x, y, blended);
        blended
    }

    // ========================================================================
    // Wedge lines (distance-to-capsule coverage)
    // ========================================================================

    /// Draw an anti-aliased filled circle with sub-pixel position and radius.
    /// Maths intensive; intended for small spots.
    pub fn draw_spot(&mut self, ax: f32, ay: f32, r: f32, fg: Rgb, bg: Background) {
        // A spot is a zero-length wedge
        self.draw_wedge_line(ax, ay, ax, ay, r, r, fg, bg);
    }

    /// Draw an anti-aliased line of width `wd` with rounded ends
    pub fn draw_wide_line(&mut self, ax: f32, ay: f32, bx: f32, by: f32, wd: f32, fg: Rgb, bg: Background) {
        self.draw_wedge_line(ax, ay, bx, by, wd / 2.0, wd / 2.0, fg, bg);
    }

    /// Draw an anti-aliased line with independently radiused ends (a capsule
    /// whose half-width interpolates from `ar` at the start to `br` at the
    /// end).
    ///
    /// The bounding box is scanned in two sweeps, downward from the widest
    /// end's start row and upward from just above it. Each sweep keeps a
    /// moving left-edge cursor and bails out of a row once coverage trends
    /// below the low threshold, so cost is proportional to the box area.
    pub fn draw_wedge_line(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        ar: f32,
        br: f32,
        fg: Rgb,
        bg: Background,
    ) {
        if ar < 0.0 || br < 0.0 {
            return;
        }
        // Work in device coordinates from the start
        let ax = ax + self.vp.datum_x() as f32;
        let ay = ay + self.vp.datum_y() as f32;
        let mut bx = bx + self.vp.datum_x() as f32;
        let by = by + self.vp.datum_y() as f32;
        if (ax - bx).abs() < 0.01 && (ay - by).abs() < 0.01 {
            bx += 0.01; // Avoid divide by zero
        }

        // Line bounding box
        let bx0 = (ax - ar).min(bx - br).floor() as i32;
        let bx1 = (ax + ar).max(bx + br).ceil() as i32;
        let by0 = (ay - ar).min(by - br).floor() as i32;
        let by1 = (ay + ar).max(by + br).ceil() as i32;

        let Some((x0, y0, x1, y1)) = self.vp.clip_corners_device(bx0, by0, bx1, by1) else {
            return;
        };

        // Start scanning at the row of the wider end
        let mut ys = ay as i32;
        if (ax - ar) > (bx - br) {
            ys = by as i32;
        }
        let ys = ys.clamp(y0, y1);

        let rdt = ar - br; // Radius delta along the capsule
        let mut alpha = 1.0_f32;
        let ar = ar + 0.5;

        let bax = bx - ax;
        let bay = by - ay;
        let mut bg_pixel = match bg {
            Background::Solid(c) => c,
            Background::ReadBack => Rgb::BLACK,
        };

        self.claim_bus();
        let bracket = self.begin_composite();

        // Downward sweep, then upward from just above the start row; both
        // share the edge-tracking scheme.
        let mut xs = x0;
        for yp in ys..=y1 {
            let mut swin = true; // Need a fresh window for this row
            let mut end_x = false; // Inside the drawn part of the row
            let ypay = yp as f32 - ay;
            for xp in xs..=x1 {
                if end_x && alpha <= LO_ALPHA {
                    break; // Past the right edge
                }
                let xpax = xp as f32 - ax;
                alpha = ar - wedge_line_distance(xpax, ypay, bax, bay, rdt);
                if alpha <= LO_ALPHA {
                    continue;
                }
                // Track the left edge to skip known-outside pixels next row
                if !end_x {
                    end_x = true;
                    xs = xp;
                }
                if alpha > HI_ALPHA {
                    if swin {
                        self.sink.set_window(xp, yp, x1, yp);
                        swin = false;
                    }
                    self.sink.write_run(fg.to_565(), 1);
                    continue;
                }
                if bg == Background::ReadBack {
                    bg_pixel = Rgb::from_565(self.sink.read_pixel(xp, yp));
                    swin = true; // Reading repositions the device window
                }
                if swin {
                    self.sink.set_window(xp, yp, x1, yp);
                    swin = false;
                }
                let blended = alpha_blend((alpha * ALPHA_GAIN) as u8, fg, bg_pixel);
                self.sink.write_run(blended.to_565(), 1);
            }
        }

        let mut xs = x0;
        for yp in (y0..ys).rev() {
            let mut swin = true;
            let mut end_x = false;
            let ypay = yp as f32 - ay;
            for xp in xs..=x1 {
                if end_x && alpha <= LO_ALPHA {
                    break;
                }
                let xpax = xp as f32 - ax;
                alpha = ar - wedge_line_distance(xpax, ypay, bax, bay, rdt);
                if alpha <= LO_ALPHA {
                    continue;
                }
                if !end_x {
                    end_x = true;
                    xs = xp;
                }
                if alpha > HI_ALPHA {
                    if swin {
                        self.sink.set_window(xp, yp, x1, yp);
                        swin = false;
                    }
                    self.sink.write_run(fg.to_565(), 1);
                    continue;
                }
                if bg == Background::ReadBack {
                    bg_pixel = Rgb::from_565(self.sink.read_pixel(xp, yp));
                    swin = true;
                }
                if swin {
                    self.sink.set_window(xp, yp, x1, yp);
                    swin = false;
                }
                let blended = alpha_blend((alpha * ALPHA_GAIN) as u8, fg, bg_pixel);
                self.sink.write_run(blended.to_565(), 1);
            }
        }

        self.end_composite(bracket);
    }

    // ========================================================================
    // Smooth circles (radius-band coverage)
    // ========================================================================

    /// Draw an anti-aliased filled circle
    pub fn fill_smooth_circle(&mut self, x: i32, y: i32, r: i32, color: Rgb, bg: Background) {
        if r <= 0 {
            return;
        }
        let bracket = self.begin_composite();

        self.draw_fast_hline(x - r, y, 2 * r + 1, color);
        let mut xs = 1;

        let r1 = r * r;
        let r = r + 1;
        let r2 = r * r;

        for cy in (1..r).rev() {
            let dy2 = (r - cy) * (r - cy);
            let mut cx = xs;
            while cx < r {
                let hyp2 = (r - cx) * (r - cx) + dy2;
                if hyp2 <= r1 {
                    break;
                }
                if hyp2 >= r2 {
                    cx += 1;
                    continue;
                }

                let alpha = !sqrt_fraction(hyp2 as u32);
                if alpha > 246 {
                    break;
                }
                xs = cx;
                if alpha < 9 {
                    cx += 1;
                    continue;
                }

                match bg {
                    Background::ReadBack => {
                        // Each quadrant has its own background underneath
                        self.draw_alpha_pixel(x + cx - r, y + cy - r, color, alpha, bg);
                        self.draw_alpha_pixel(x - cx + r, y + cy - r, color, alpha, bg);
                        self.draw_alpha_pixel(x - cx + r, y - cy + r, color, alpha, bg);
                        self.draw_alpha_pixel(x + cx - r, y - cy + r, color, alpha, bg);
                    }
                    Background::Solid(_) => {
                        let pcol = self.draw_alpha_pixel(x + cx - r, y + cy - r, color, alpha, bg);
                        self.draw_pixel(x - cx + r, y + cy - r, pcol);
                        self.draw_pixel(x - cx + r, y - cy + r, pcol);
                        self.draw_pixel(x + cx - r, y - cy + r, pcol);
                    }
                }
                cx += 1;
            }
            self.draw_fast_hline(x + cx - r, y + cy - r, 2 * (r - cx) + 1, color);
            self.draw_fast_hline(x + cx - r, y - cy + r, 2 * (r - cx) + 1, color);
        }

        self.end_composite(bracket);
    }

    /// Draw an anti-aliased circle outline. The ring is drawn 3 pixels thick
    /// so both edges carry an AA band.
    pub fn draw_smooth_circle(&mut self, x: i32, y: i32, r: i32, fg: Rgb, bg: Background) {
        self.draw_smooth_round_rect(x - r, y - r, r, r - 1, 0, 0, fg, bg, crate::shapes::corner::ALL);
    }

    // ========================================================================
    // Smooth rounded rectangles
    // ========================================================================

    /// Draw an anti-aliased rounded-rectangle ring.
    ///
    /// (x, y) is the top-left of the bounding box; `r`/`ir` are the outer and
    /// inner corner radii (swapped if reversed, so thickness is r - ir + 1);
    /// `w`/`h` the bounding box size. When w and h don't exceed the corner
    /// diameter the result degenerates to a circle ring centered at
    /// (x + r, y + r). `quadrants` selects which corners are drawn using the
    /// [`crate::shapes::corner`] bits.
    pub fn draw_smooth_round_rect(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ir: i32,
        w: i32,
        h: i32,
        fg: Rgb,
        bg: Background,
        quadrants: u8,
    ) {
        if self.vp.is_out_of_bounds() {
            return;
        }
        let (mut r, mut ir) = if r < ir { (ir, r) } else { (r, ir) };
        if r <= 0 || ir < 0 {
            return;
        }

        let w = (w - 2 * r).max(0);
        let h = (h - 2 * r).max(0);

        let bracket = self.begin_composite();

        let x = x + r;
        let y = y + r;

        let t = r - ir + 1;
        let mut xs = 0;

        let r2 = r * r; // Outer arc radius^2
        r += 1;
        let r1 = r * r; // Outer AA zone radius^2

        let r3 = ir * ir; // Inner arc radius^2
        ir -= 1;
        let r4 = ir * ir; // Inner AA zone radius^2

        for cy in (1..r).rev() {
            let mut len = 0; // Solid run length
            let mut rxst = 0; // Right-side run x start
            let dy2 = (r - cy) * (r - cy);

            // Track the arc-zone start point
            while (r - xs) * (r - xs) + dy2 >= r1 {
                xs += 1;
            }

            let mut cx = xs;
            while cx < r {
                let hyp = (r - cx) * (r - cx) + dy2;

                let alpha;
                if hyp > r2 {
                    alpha = !sqrt_fraction(hyp as u32); // Outer AA zone
                } else if hyp >= r3 {
                    rxst = cx; // Solid zone
                    len += 1;
                    cx += 1;
                    continue;
                } else {
                    if hyp <= r4 {
                        break; // Inside the ring: skip the rest of the row
                    }
                    alpha = sqrt_fraction(hyp as u32); // Inner AA zone
                }

                if alpha < 16 {
                    cx += 1;
                    continue; // Skip low alpha pixels
                }

                match bg {
                    Background::Solid(b) => {
                        let pcol = alpha_blend(alpha, fg, b);
                        if quadrants & 0x8 != 0 {
                            self.draw_pixel(x + cx - r, y - cy + r + h, pcol); // BL
                        }
                        if quadrants & 0x1 != 0 {
                            self.draw_pixel(x + cx - r, y + cy - r, pcol); // TL
                        }
                        if quadrants & 0x2 != 0 {
                            self.draw_pixel(x - cx + r + w, y + cy - r, pcol); // TR
                        }
                        if quadrants & 0x4 != 0 {
                            self.draw_pixel(x - cx + r + w, y - cy + r + h, pcol); // BR
                        }
                    }
                    Background::ReadBack => {
                        if quadrants & 0x8 != 0 {
                            self.draw_alpha_pixel(x + cx - r, y - cy + r + h, fg, alpha, bg);
                        }
                        if quadrants & 0x1 != 0 {
                            self.draw_alpha_pixel(x + cx - r, y + cy - r, fg, alpha, bg);
                        }
                        if quadrants & 0x2 != 0 {
                            self.draw_alpha_pixel(x - cx + r + w, y + cy - r, fg, alpha, bg);
                        }
                        if quadrants & 0x4 != 0 {
                            self.draw_alpha_pixel(x - cx + r + w, y - cy + r + h, fg, alpha, bg);
                        }
                    }
                }
                cx += 1;
            }

            // Fill the ring's solid zone in each selected quadrant
            let lxst = rxst - len + 1;
            if len > 0 {
                if quadrants & 0x8 != 0 {
                    self.draw_fast_hline(x + lxst - r, y - cy + r + h, len, fg); // BL
                }
                if quadrants & 0x1 != 0 {
                    self.draw_fast_hline(x + lxst - r, y + cy - r, len, fg); // TL
                }
                if quadrants & 0x2 != 0 {
                    self.draw_fast_hline(x - rxst + r + w, y + cy - r, len, fg); // TR
                }
                if quadrants & 0x4 != 0 {
                    self.draw_fast_hline(x - rxst + r + w, y - cy + r + h, len, fg); // BR
                }
            }
        }

        // Straight sides between the drawn corner pairs
        if quadrants & 0xC == 0xC {
            self.fill_rect(x, y + r - t + h, w + 1, t, fg); // Bottom
        }
        if quadrants & 0x9 == 0x9 {
            self.fill_rect(x - r + 1, y, t, h + 1, fg); // Left
        }
        if quadrants & 0x3 == 0x3 {
            self.fill_rect(x, y - r + 1, w + 1, t, fg); // Top
        }
        if quadrants & 0x6 == 0x6 {
            self.fill_rect(x + r - t + w, y, t, h + 1, fg); // Right
        }

        self.end_composite(bracket);
    }

    /// Draw an anti-aliased filled rounded rectangle
    pub fn fill_smooth_round_rect(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        r: i32,
        color: Rgb,
        bg: Background,
    ) {
        let bracket = self.begin_composite();

        let mut xs = 0;

        // Limit radius to half width or height
        let r = r.max(0).min(w / 2).min(h / 2);

        let y = y + r;
        let h = h - 2 * r;
        self.fill_rect(x, y, w, h, color);

        let h = h - 1;
        let x = x + r;
        let w = w - 2 * r - 1;

        let r1 = r * r;
        let r = r + 1;
        let r2 = r * r;

        for cy in (1..r).rev() {
            let dy2 = (r - cy) * (r - cy);
            let mut cx = xs;
            while cx < r {
                let hyp2 = (r - cx) * (r - cx) + dy2;
                if hyp2 <= r1 {
                    break;
                }
                if hyp2 >= r2 {
                    cx += 1;
                    continue;
                }

                let alpha = !sqrt_fraction(hyp2 as u32);
                if alpha > 246 {
                    break;
                }
                xs = cx;
                if alpha < 9 {
                    cx += 1;
                    continue;
                }

                self.draw_alpha_pixel(x + cx - r, y + cy - r, color, alpha, bg);
                self.draw_alpha_pixel(x - cx + r + w, y + cy - r, color, alpha, bg);
                self.draw_alpha_pixel(x - cx + r + w, y - cy + r + h, color, alpha, bg);
                self.draw_alpha_pixel(x + cx - r, y - cy + r + h, color, alpha, bg);
                cx += 1;
            }
            self.draw_fast_hline(x + cx - r, y + cy - r, 2 * (r - cx) + 1 + w, color);
            self.draw_fast_hline(x + cx - r, y - cy + r + h, 2 * (r - cx) + 1 + w, color);
        }

        self.end_composite(bracket);
    }

    // ========================================================================
    // Arcs
    // ========================================================================

    /// Draw an arc between two angles, clockwise from the 6 o'clock
    /// position, with outer radius `r` and inner radius `ir` (inclusive, so
    /// thickness is r - ir + 1). Angles are degrees in 0-360; a sweep
    /// crossing 0/360 is split into two passes. With `smooth` the radial
    /// edges are anti-aliased against `bg` (the angular ends are not; see
    /// [`Surface::draw_smooth_arc`]).
    pub fn draw_arc(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ir: i32,
        start_angle: i32,
        end_angle: i32,
        fg: Rgb,
        bg: Rgb,
        smooth: bool,
    ) {
        let mut start_angle = start_angle.min(360);
        let end_angle = end_angle.min(360);
        if self.vp.is_out_of_bounds() || start_angle == end_angle {
            return;
        }
        let (mut r, mut ir) = if r < ir { (ir, r) } else { (r, ir) }; // Required that r > ir
        if r <= 0 || ir < 0 {
            return; // Invalid r; ir can be zero (circle sector)
        }

        if end_angle < start_angle {
            // Arc sweeps through 6 o'clock so draw in two parts
            if start_angle < 360 {
                self.draw_arc(x, y, r, ir, start_angle, 360, fg, bg, smooth);
            }
            if end_angle == 0 {
                return;
            }
            start_angle = 0;
        }
        let bracket = self.begin_composite();

        let r2 = r * r; // Outer arc radius^2
        if smooth {
            r += 1; // Outer AA zone radius
        }
        let r1 = r * r; // Outer AA radius^2
        let band = r - ir; // Width of arc
        let r3 = ir * ir; // Inner arc radius^2
        if smooth {
            ir -= 1; // Inner AA zone radius
        }
        let r4 = ir * ir; // Inner AA radius^2

        //     1 | 2
        //    ---+---    Arc quadrant index
        //     0 | 3
        // Fixed point U16.16 slope table for arc start/end in each quadrant
        let mut start_slope: [u32; 4] = [0, 0, 0xFFFF_FFFF, 0];
        let mut end_slope: [u32; 4] = [0, 0xFFFF_FFFF, 0, 0];

        // Keep the maximum U16.16 slope of the arc ends at ~ 0x8000_0000
        const MIN_DIVISOR: f32 = 1.0 / 0x8000 as f32;

        let rad = (start_angle as f32).to_radians();
        let slope = ((rad.cos().abs() / (rad.sin().abs() + MIN_DIVISOR)) * 65536.0) as u32;
        if start_angle <= 90 {
            start_slope[0] = slope;
        } else if start_angle <= 180 {
            start_slope[1] = slope;
        } else if start_angle <= 270 {
            start_slope[1] = 0xFFFF_FFFF;
            start_slope[2] = slope;
        } else {
            start_slope[1] = 0xFFFF_FFFF;
            start_slope[2] = 0;
            start_slope[3] = slope;
        }

        let rad = (end_angle as f32).to_radians();
        let slope = ((rad.cos().abs() / (rad.sin().abs() + MIN_DIVISOR)) * 65536.0) as u32;
        if end_angle <= 90 {
            end_slope[0] = slope;
            end_slope[1] = 0;
            start_slope[2] = 0;
        } else if end_angle <= 180 {
            end_slope[1] = slope;
            start_slope[2] = 0;
        } else if end_angle <= 270 {
            end_slope[2] = slope;
        } else {
            end_slope[3] = slope;
        }

        let mut xs = 0;

        // Scan one quadrant-sized grid, mirroring into all four quadrants
        for cy in (1..r).rev() {
            let mut len = [0_i32; 4]; // Pixel run length per quadrant
            let mut xst = [-1_i32; 4]; // Pixel run x start per quadrant
            let dy2 = (r - cy) * (r - cy);

            // Track the arc zone start point
            while (r - xs) * (r - xs) + dy2 >= r1 {
                xs += 1;
            }

            for cx in xs..r {
                let hyp = (r - cx) * (r - cx) + dy2;

                let alpha;
                if hyp > r2 {
                    alpha = !sqrt_fraction(hyp as u32); // Outer AA zone
                } else if hyp >= r3 {
                    // Solid zone: collect run start and length per quadrant
                    let slope = (((r - cy) as u32) << 16) / (r - cx) as u32;
                    if slope <= start_slope[0] && slope >= end_slope[0] {
                        xst[0] = cx; // Bottom left run end
                        len[0] += 1;
                    }
                    if slope >= start_slope[1] && slope <= end_slope[1] {
                        xst[1] = cx; // Top left run end
                        len[1] += 1;
                    }
                    if slope <= start_slope[2] && slope >= end_slope[2] {
                        xst[2] = cx; // Top right run start
                        len[2] += 1;
                    }
                    if slope <= end_slope[3] && slope >= start_slope[3] {
                        xst[3] = cx; // Bottom right run start
                        len[3] += 1;
                    }
                    continue;
                } else {
                    if hyp <= r4 {
                        break; // Skip inner pixels
                    }
                    alpha = sqrt_fraction(hyp as u32); // Inner AA zone
                }

                if alpha < 16 {
                    continue; // Skip low alpha pixels
                }

                let pcol = alpha_blend(alpha, fg, bg);
                let slope = (((r - cy) as u32) << 16) / (r - cx) as u32;
                if slope <= start_slope[0] && slope >= end_slope[0] {
                    self.draw_pixel(x + cx - r, y - cy + r, pcol); // BL
                }
                if slope >= start_slope[1] && slope <= end_slope[1] {
                    self.draw_pixel(x + cx - r, y + cy - r, pcol); // TL
                }
                if slope <= start_slope[2] && slope >= end_slope[2] {
                    self.draw_pixel(x - cx + r, y + cy - r, pcol); // TR
                }
                if slope <= end_slope[3] && slope >= start_slope[3] {
                    self.draw_pixel(x - cx + r, y - cy + r, pcol); // BR
                }
            }

            // Add the solid runs
            if len[0] > 0 {
                self.draw_fast_hline(x + xst[0] - len[0] + 1 - r, y - cy + r, len[0], fg); // BL
            }
            if len[1] > 0 {
                self.draw_fast_hline(x + xst[1] - len[1] + 1 - r, y + cy - r, len[1], fg); // TL
            }
            if len[2] > 0 {
                self.draw_fast_hline(x - xst[2] + r, y + cy - r, len[2], fg); // TR
            }
            if len[3] > 0 {
                self.draw_fast_hline(x - xst[3] + r, y - cy + r, len[3], fg); // BR
            }
        }

        // Fill in the centre lines where the sweep crosses an axis
        if start_angle == 0 || end_angle == 360 {
            self.draw_fast_vline(x, y + r - band, band, fg); // Bottom
        }
        if start_angle <= 90 && end_angle >= 90 {
            self.draw_fast_hline(x - r + 1, y, band, fg); // Left
        }
        if start_angle <= 180 && end_angle >= 180 {
            self.draw_fast_vline(x, y - r + 1, band, fg); // Top
        }
        if start_angle <= 270 && end_angle >= 270 {
            self.draw_fast_hline(x + r - band, y, band, fg); // Right
        }

        self.end_composite(bracket);
    }

    /// Draw a fully anti-aliased arc: radial edges from [`Surface::draw_arc`]
    /// plus anti-aliased end caps, rounded (spots) or square (thin wedges).
    /// Rounded ends extend slightly beyond the arc angles.
    pub fn draw_smooth_arc(
        &mut self,
        x: i32,
        y: i32,
        r: i32,
        ir: i32,
        start_angle: i32,
        end_angle: i32,
        fg: Rgb,
        bg: Rgb,
        round_ends: bool,
    ) {
        let bracket = self.begin_composite();

        if end_angle != start_angle && (start_angle != 0 || end_angle != 360) {
            let rad = (start_angle as f32).to_radians();
            let (sx, sy) = (-rad.sin(), rad.cos());
            let rad = (end_angle as f32).to_radians();
            let (ex, ey) = (-rad.sin(), rad.cos());

            if round_ends {
                // Round ends: a spot at the middle of each arc end
                let mid = (r + ir) as f32 / 2.0;
                let cap = (r - ir) as f32 / 2.0;
                self.draw_spot(sx * mid + x as f32, sy * mid + y as f32, cap, fg, Background::Solid(bg));
                self.draw_spot(ex * mid + x as f32, ey * mid + y as f32, cap, fg, Background::Solid(bg));
            } else {
                // Square ends: a thin wedge across each arc end
                let (ir_f, r_f) = (ir as f32, r as f32);
                let (xf, yf) = (x as f32, y as f32);
                self.draw_wedge_line(
                    sx * ir_f + xf,
                    sy * ir_f + yf,
                    sx * r_f + xf,
                    sy * r_f + yf,
                    0.3,
                    0.3,
                    fg,
                    Background::Solid(bg),
                );
                self.draw_wedge_line(
                    ex * ir_f + xf,
                    ey * ir_f + yf,
                    ex * r_f + xf,
                    ey * r_f + yf,
                    0.3,
                    0.3,
                    fg,
                    Background::Solid(bg),
                );
            }

            self.draw_arc(x, y, r, ir, start_angle, end_angle, fg, bg, true);
        } else {
            self.draw_arc(x, y, r, ir, 0, 360, fg, bg, true);
        }

        self.end_composite(bracket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::FramebufferSink;

    fn surface() -> Surface<FramebufferSink> {
        Surface::new(FramebufferSink::new(80, 80))
    }

    fn px(s: &Surface<FramebufferSink>, x: i32, y: i32) -> u16 {
        s.sink().pixel(x, y).unwrap_or(0)
    }

    #[test]
    fn test_alpha_pixel_solid_background() {
        let mut s = surface();
        let c = s.draw_alpha_pixel(5, 5, Rgb::WHITE, 128, Background::Solid(Rgb::BLACK));
        assert_eq!(px(&s, 5, 5), c.to_565());
        assert!(c.r > 100 && c.r < 156);
    }

    #[test]
    fn test_alpha_pixel_readback_blends_with_content() {
        let mut s = surface();
        s.fill_rect(0, 0, 10, 10, Rgb::BLUE);
        let c = s.draw_alpha_pixel(5, 5, Rgb::WHITE, 128, Background::ReadBack);
        // Halfway between white and (quantized) blue
        assert!(c.b > 200);
        assert!(c.r > 100 && c.r < 156);
    }

    #[test]
    fn test_fill_smooth_circle_core_and_outside() {
        let mut s = surface();
        let (cx, cy, r) = (40, 40, 10);
        s.fill_smooth_circle(cx, cy, r, Rgb::RED, Background::Solid(Rgb::BLACK));
        let fg = Rgb::RED.to_565();
        for y in 0..80 {
            for x in 0..80 {
                let d2 = (x - cx) * (x - cx) + (y - cy) * (y - cy);
                if d2 < (r - 1) * (r - 1) {
                    assert_eq!(px(&s, x, y), fg, "core pixel ({}, {})", x, y);
                }
                if d2 > (r + 2) * (r + 2) {
                    assert_eq!(px(&s, x, y), 0, "outside pixel ({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_fill_smooth_circle_has_edge_blends() {
        let mut s = surface();
        s.fill_smooth_circle(40, 40, 10, Rgb::WHITE, Background::Solid(Rgb::BLACK));
        let mut partial = 0;
        for y in 0..80 {
            for x in 0..80 {
                let c = px(&s, x, y);
                if c != 0 && c != Rgb::WHITE.to_565() {
                    partial += 1;
                }
            }
        }
        assert!(partial > 8, "only {} blended edge pixels", partial);
    }

    #[test]
    fn test_wedge_line_horizontal_band() {
        let mut s = surface();
        s.draw_wedge_line(10.0, 20.0, 40.0, 20.0, 3.0, 3.0, Rgb::GREEN, Background::Solid(Rgb::BLACK));
        let fg = Rgb::GREEN.to_565();
        // On-axis pixels along the body are solid
        for x in 12..=38 {
            assert_eq!(px(&s, x, 20), fg, "axis pixel {}", x);
        }
        // Rows beyond the radius stay untouched
        for x in 0..80 {
            assert_eq!(px(&s, x, 26), 0);
            assert_eq!(px(&s, x, 14), 0);
        }
        // The edge rows blend
        let edge = px(&s, 25, 23);
        assert!(edge != 0 && edge != fg);
    }

    #[test]
    fn test_wedge_line_tapered_widths() {
        let mut s = surface();
        s.draw_wedge_line(10.0, 40.0, 60.0, 40.0, 8.0, 1.0, Rgb::WHITE, Background::Solid(Rgb::BLACK));
        let wide = (0..80).filter(|&y| px(&s, 12, y) != 0).count();
        let narrow = (0..80).filter(|&y| px(&s, 58, y) != 0).count();
        assert!(wide > narrow + 4, "wide {} narrow {}", wide, narrow);
    }

    #[test]
    fn test_spot_draws_centered_disc() {
        let mut s = surface();
        s.draw_spot(30.0, 30.0, 4.0, Rgb::CYAN, Background::Solid(Rgb::BLACK));
        assert_eq!(px(&s, 30, 30), Rgb::CYAN.to_565());
        assert_eq!(px(&s, 30, 40), 0);
        // Roughly symmetric set
        let left = (0..30).filter(|&x| px(&s, x, 30) != 0).count();
        let right = (31..80).filter(|&x| px(&s, x, 30) != 0).count();
        assert!((left as i32 - right as i32).abs() <= 1);
    }

    #[test]
    fn test_negative_radius_wedge_is_noop() {
        let mut s = surface();
        s.draw_wedge_line(10.0, 10.0, 20.0, 20.0, -1.0, 2.0, Rgb::WHITE, Background::Solid(Rgb::BLACK));
        assert_eq!(s.sink().stats.windows, 0);
    }

    #[test]
    fn test_full_arc_ring_coverage() {
        let mut s = surface();
        let (cx, cy, r, ir) = (40, 40, 16, 10);
        s.draw_arc(cx, cy, r, ir, 0, 360, Rgb::YELLOW, Rgb::BLACK, true);
        let fg = Rgb::YELLOW.to_565();
        // Mid-band pixels on the axes are solid
        let mid = (r + ir) / 2;
        assert_eq!(px(&s, cx + mid, cy), fg);
        assert_eq!(px(&s, cx - mid, cy), fg);
        assert_eq!(px(&s, cx, cy + mid), fg);
        assert_eq!(px(&s, cx, cy - mid), fg);
        // Well inside and well outside stay clear
        assert_eq!(px(&s, cx, cy), 0);
        assert_eq!(px(&s, cx + r + 4, cy), 0);
    }

    #[test]
    fn test_arc_quadrant_gating() {
        let mut s = surface();
        let (cx, cy) = (40, 40);
        // 0 to 90 degrees: clockwise from 6 o'clock = lower-left quadrant
        s.draw_arc(cx, cy, 16, 10, 0, 90, Rgb::WHITE, Rgb::BLACK, true);
        for y in 0..80 {
            for x in 0..80 {
                if px(&s, x, y) != 0 {
                    assert!(
                        x <= cx + 1 && y >= cy - 1,
                        "pixel ({}, {}) outside lower-left sweep",
                        x,
                        y
                    );
                }
            }
        }
        // The sweep actually drew its quadrant
        assert_ne!(px(&s, cx - 13, cy + 1), 0);
    }

    #[test]
    fn test_arc_swapped_radii_are_reordered() {
        let mut a = surface();
        a.draw_arc(40, 40, 10, 16, 0, 360, Rgb::WHITE, Rgb::BLACK, true);
        let mut b = surface();
        b.draw_arc(40, 40, 16, 10, 0, 360, Rgb::WHITE, Rgb::BLACK, true);
        for y in 0..80 {
            for x in 0..80 {
                assert_eq!(px(&a, x, y), px(&b, x, y));
            }
        }
    }

    #[test]
    fn test_arc_wrap_splits_into_two_sweeps() {
        // 270 -> 90 wraps through 0; the union must cover both halves
        let mut s = surface();
        s.draw_arc(40, 40, 16, 10, 270, 90, Rgb::WHITE, Rgb::BLACK, true);
        let mid = 13;
        assert_ne!(px(&s, 40, 40 + mid), 0, "6 o'clock missing");
        assert_eq!(px(&s, 40, 40 - mid), 0, "12 o'clock should stay clear");
    }

    #[test]
    fn test_zero_sweep_is_noop() {
        let mut s = surface();
        s.draw_arc(40, 40, 16, 10, 45, 45, Rgb::WHITE, Rgb::BLACK, true);
        assert_eq!(s.sink().stats.windows, 0);
    }

    #[test]
    fn test_smooth_circle_ring() {
        let mut s = surface();
        s.draw_smooth_circle(40, 40, 12, Rgb::WHITE, Background::Solid(Rgb::BLACK));
        // Ring at the radius, hollow center
        assert_ne!(px(&s, 40 + 11, 40), 0);
        assert_eq!(px(&s, 40, 40), 0);
    }

    #[test]
    fn test_fill_smooth_round_rect_center_solid() {
        let mut s = surface();
        s.fill_smooth_round_rect(10, 10, 40, 24, 6, Rgb::ORANGE, Background::Solid(Rgb::BLACK));
        let fg = Rgb::ORANGE.to_565();
        assert_eq!(px(&s, 30, 22), fg);
        assert_eq!(px(&s, 10, 22), fg); // left edge midheight
        assert_eq!(px(&s, 49, 22), fg); // right edge midheight
        assert_eq!(px(&s, 10, 10), 0); // corner cut
        assert_eq!(px(&s, 49, 33), 0);
    }

    #[test]
    fn test_smooth_ops_bracket_once() {
        let mut s = surface();
        s.fill_smooth_circle(40, 40, 8, Rgb::RED, Background::Solid(Rgb::BLACK));
        assert_eq!(s.sink().stats.transactions, 1);
        let mut s = surface();
        s.draw_smooth_arc(40, 40, 16, 10, 30, 200, Rgb::RED, Rgb::BLACK, true);
        assert_eq!(s.sink().stats.transactions, 1);
        let mut s = surface();
        s.draw_wide_line(5.0, 5.0, 30.0, 20.0, 3.0, Rgb::RED, Background::Solid(Rgb::BLACK));
        assert_eq!(s.sink().stats.transactions, 1);
    }
}
