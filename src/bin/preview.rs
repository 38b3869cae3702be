//! SDL2 preview window
//!
//! Renders an animated demo scene through the full rasterization pipeline
//! into a framebuffer sink, then streams the framebuffer to an SDL texture.
//! A quick way to eyeball clipping, anti-aliasing, and blit behavior without
//! a physical panel.

use glaze::{corner, Background, FramebufferSink, Image, ImageData, Rgb, Surface};

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use std::time::Instant;

const DEFAULT_WIDTH: u32 = 320;
const DEFAULT_HEIGHT: u32 = 240;
const SCALE: u32 = 3;

/// 8x4 mono arrow, MSB first
const ARROW: [u8; 4] = [0b0001_1000, 0b0011_1100, 0b0111_1110, 0b0001_1000];

/// Parse command line arguments and return (width, height, vsync)
fn parse_args() -> (u32, u32, bool) {
    let args: Vec<String> = std::env::args().collect();
    let mut width = DEFAULT_WIDTH;
    let mut height = DEFAULT_HEIGHT;
    let mut vsync = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--no-vsync" => vsync = false,
            "--resolution" | "-r" => {
                if i + 1 < args.len() {
                    // Parse WxH format (e.g., 480x320)
                    let parts: Vec<&str> = args[i + 1].split('x').collect();
                    if parts.len() == 2 {
                        if let (Ok(w), Ok(h)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>()) {
                            width = w;
                            height = h;
                        }
                    }
                    i += 1;
                }
            }
            "--help" => {
                println!("Usage: glaze-preview [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  --resolution WxH, -r WxH  Panel resolution (default: {}x{})",
                    DEFAULT_WIDTH, DEFAULT_HEIGHT
                );
                println!("  --no-vsync            Disable VSync for uncapped framerate");
                println!("  --help                Show this help message");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    (width, height, vsync)
}

/// Procedural 16bpp sprite with a transparent keyhole
fn make_sprite(size: i32, key: u16) -> Vec<u16> {
    let mut data = vec![key; (size * size) as usize];
    let c = size / 2;
    for y in 0..size {
        for x in 0..size {
            let d2 = (x - c) * (x - c) + (y - c) * (y - c);
            if d2 <= c * c {
                let shade = (255 - d2 * 200 / (c * c).max(1)) as u8;
                data[(y * size + x) as usize] = Rgb::new(shade, shade / 2, 40).to_565();
            }
        }
    }
    data
}

fn render(surface: &mut Surface<FramebufferSink>, t: f32, sprite: &[u16], sprite_size: i32) {
    let w = surface.width();
    let h = surface.height();

    surface.start_write();
    surface.fill_rect_v_gradient(0, 0, w, h, Rgb::new(8, 12, 40), Rgb::BLACK);

    // Gauge: arc sweep plus a wedge-line needle
    let (cx, cy) = (w / 3, h / 2);
    let sweep = 30 + ((t * 40.0) as i32 % 300);
    surface.draw_smooth_arc(cx, cy, 52, 44, 30, 330, Rgb::DARK_GREY, Rgb::BLACK, true);
    surface.draw_smooth_arc(cx, cy, 52, 44, 30, 30 + sweep, Rgb::ORANGE, Rgb::BLACK, true);
    let angle = (30.0 + sweep as f32).to_radians();
    let (nx, ny) = (-angle.sin(), angle.cos());
    surface.draw_wedge_line(
        cx as f32,
        cy as f32,
        cx as f32 + nx * 40.0,
        cy as f32 + ny * 40.0,
        4.0,
        1.0,
        Rgb::WHITE,
        Background::ReadBack,
    );
    surface.fill_smooth_circle(cx, cy, 6, Rgb::LIGHT_GREY, Background::ReadBack);

    // Shape column
    let px = 2 * w / 3;
    surface.fill_smooth_round_rect(px - 40, 20, 80, 40, 10, Rgb::NAVY, Background::ReadBack);
    surface.draw_smooth_round_rect(
        px - 40,
        20,
        12,
        9,
        80,
        40,
        Rgb::CYAN,
        Background::ReadBack,
        corner::ALL,
    );
    surface.fill_triangle(px - 30, 100, px + 30, 85, px, 130, Rgb::DARK_GREEN);
    surface.draw_triangle(px - 30, 100, px + 30, 85, px, 130, Rgb::GREEN);
    surface.draw_ellipse(px, 160, 34, 14, Rgb::MAGENTA);

    // Orbiting keyed sprite
    let orbit = t * 1.3;
    let sx = px + (orbit.cos() * 36.0) as i32 - sprite_size / 2;
    let sy = 160 + (orbit.sin() * 16.0) as i32 - sprite_size / 2;
    surface.push_image_keyed(sx, sy, sprite_size, sprite_size, sprite, 0x0000);

    // Clipped scribble in a framed viewport
    surface.set_viewport(10, h - 50, w / 2 - 20, 40, true);
    surface.frame_viewport(Rgb::DARK_GREY, 1);
    let vw = surface.width();
    let vh = surface.height();
    for i in 0..6u8 {
        let phase = t * 2.0 + f32::from(i) * 0.9;
        surface.draw_line(
            (phase.cos() * vw as f32) as i32,
            0,
            vw - (phase.sin() * vw as f32) as i32,
            vh,
            Rgb::new(60 + i * 30, 255 - i * 35, 120),
        );
    }
    surface.reset_viewport();

    // Descriptor-path blit: keyed mono stamp in the corner
    surface.set_mono_colors(Rgb::YELLOW, Rgb::BLACK);
    surface.draw_image(
        4,
        4,
        &Image {
            width: 8,
            height: 4,
            data: ImageData::Mono {
                data: &ARROW,
                keyed: true,
            },
        },
    );
    surface.end_write();
}

fn main() -> Result<(), String> {
    let (width, height, vsync) = parse_args();

    println!("=== glaze preview ===");
    println!("Panel: {}x{} (window scaled {}x)", width, height, SCALE);
    if vsync {
        println!("VSync: ON. Use --no-vsync for uncapped.");
    } else {
        println!("VSync: OFF (uncapped framerate)");
    }
    println!("Escape to quit.");

    let sdl_context = sdl2::init()?;
    let video_subsystem = sdl_context.video()?;

    let window = video_subsystem
        .window("glaze preview", width * SCALE, height * SCALE)
        .position_centered()
        .build()
        .map_err(|e| e.to_string())?;

    let mut canvas_builder = window.into_canvas().accelerated();
    if vsync {
        canvas_builder = canvas_builder.present_vsync();
    }
    let mut canvas = canvas_builder.build().map_err(|e| e.to_string())?;
    let texture_creator = canvas.texture_creator();
    let mut texture = texture_creator
        .create_texture_streaming(PixelFormatEnum::RGBA8888, width, height)
        .map_err(|e| e.to_string())?;
    let mut event_pump = sdl_context.event_pump()?;

    let mut surface = Surface::new(FramebufferSink::new(width as i32, height as i32));
    let sprite_size = 24;
    let sprite = make_sprite(sprite_size, 0x0000);

    let start = Instant::now();
    'main: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'main,
                _ => {}
            }
        }

        let t = start.elapsed().as_secs_f32();
        render(&mut surface, t, &sprite, sprite_size);

        let bytes = surface.sink().to_rgba_bytes();
        texture
            .update(None, &bytes, (width * 4) as usize)
            .map_err(|e| e.to_string())?;
        canvas.copy(&texture, None, None)?;
        canvas.present();
    }

    Ok(())
}
