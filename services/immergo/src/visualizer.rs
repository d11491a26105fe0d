//! Ambient orb visualization.
//!
//! Frame geometry is a pure function of (dimensions, time, energy); the
//! `Surface` trait separates that math from the terminal backend so frames
//! can be asserted on directly.

use std::io::Write;

use anyhow::Result;
use crossterm::{QueueableCommand, cursor, style, terminal};

/// Per-orb idle parameters: color, radius scale, phase offset.
const IDLE_ORBS: [((u8, u8, u8), f32, f32); 3] = [
    ((0x5c, 0x6b, 0x48), 1.0, 0.0),
    ((0xcb, 0xa3, 0x6b), 0.9, 2.0),
    ((0xd9, 0x6c, 0x6c), 0.8, 4.0),
];

/// Per-orb active parameters: color, radius scale, breathing speed.
const ACTIVE_ORBS: [((u8, u8, u8), f32, f32); 3] = [
    ((0x5c, 0x6b, 0x48), 1.2, 0.5),
    ((0xcb, 0xa3, 0x6b), 1.0, 0.7),
    ((0xd9, 0x6c, 0x6c), 0.8, 0.3),
];

const IDLE_ALPHA: f32 = 0.3;
const ACTIVE_ALPHA: f32 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct Orb {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: (u8, u8, u8),
    pub alpha: f32,
}

/// Three concentric breathing orbs at 20% of the smallest dimension.
pub fn idle_frame(width: f32, height: f32, t_ms: f64) -> Vec<Orb> {
    let base_radius = width.min(height) * 0.2;
    let time = t_ms / 2000.0;

    IDLE_ORBS
        .iter()
        .map(|&(color, scale, offset)| {
            let breathing = ((time + offset as f64).sin() * 5.0) as f32;
            Orb {
                x: width / 2.0,
                y: height / 2.0,
                radius: (base_radius * scale + breathing).max(0.0),
                color,
                alpha: IDLE_ALPHA,
            }
        })
        .collect()
}

/// Energy-reactive frame: 15% base, up to another 25% of growth from the
/// smoothed energy, plus a 2% breathing wobble per orb.
pub fn active_frame(width: f32, height: f32, t_ms: f64, energy: f32) -> Vec<Orb> {
    let min_dim = width.min(height);
    let base_radius = min_dim * 0.15;
    let max_reaction = min_dim * 0.25;

    ACTIVE_ORBS
        .iter()
        .enumerate()
        .map(|(i, &(color, scale, speed))| {
            let reaction = energy * max_reaction * scale;
            let breathing =
                ((t_ms / 1000.0 * speed as f64 + i as f64).sin() * (min_dim * 0.02) as f64) as f32;
            Orb {
                x: width / 2.0,
                y: height / 2.0,
                radius: (base_radius * scale + reaction + breathing).max(0.0),
                color,
                alpha: ACTIVE_ALPHA,
            }
        })
        .collect()
}

/// Resizable drawing surface the frames are composited onto.
pub trait Surface {
    fn dimensions(&self) -> (f32, f32);
    fn clear(&mut self);
    fn fill_circle(&mut self, orb: &Orb);
    fn present(&mut self, status: &str) -> Result<()>;
    /// Re-reads the backing dimensions after a resize event.
    fn resize(&mut self) -> Result<()>;
}

/// Drives the frame loop over a surface.
pub struct Visualizer<S: Surface> {
    surface: S,
    active: bool,
}

impl<S: Surface> Visualizer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            active: false,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn draw(&mut self, t_ms: f64, energy: f32, status: &str) -> Result<()> {
        let (width, height) = self.surface.dimensions();
        let frame = if self.active {
            active_frame(width, height, t_ms, energy)
        } else {
            idle_frame(width, height, t_ms)
        };
        self.surface.clear();
        for orb in &frame {
            self.surface.fill_circle(orb);
        }
        self.surface.present(status)
    }

    /// The ambient animation must never clip: if we are idle (so no render
    /// tick is imminent from voice activity) redraw immediately.
    pub fn on_resize(&mut self, t_ms: f64, status: &str) -> Result<()> {
        self.surface.resize()?;
        if !self.active {
            self.draw(t_ms, 0.0, status)?;
        }
        Ok(())
    }
}

/// Terminal backend. Each character cell holds two vertical "pixels"
/// rendered with upper-half blocks, which keeps the orbs roughly round.
pub struct TerminalSurface {
    cols: u16,
    rows: u16,
    /// Linear RGB accumulation buffer, `cols * rows * 2` pixels.
    pixels: Vec<(f32, f32, f32)>,
}

impl TerminalSurface {
    pub fn new() -> Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self {
            cols,
            rows,
            pixels: vec![(0.0, 0.0, 0.0); cols as usize * rows as usize * 2],
        })
    }

    fn blend(&mut self, x: usize, y: usize, color: (u8, u8, u8), alpha: f32) {
        let index = y * self.cols as usize + x;
        let Some(pixel) = self.pixels.get_mut(index) else {
            return;
        };
        pixel.0 = pixel.0 * (1.0 - alpha) + color.0 as f32 * alpha;
        pixel.1 = pixel.1 * (1.0 - alpha) + color.1 as f32 * alpha;
        pixel.2 = pixel.2 * (1.0 - alpha) + color.2 as f32 * alpha;
    }

    fn pixel_color(&self, x: usize, y: usize) -> style::Color {
        let (r, g, b) = self.pixels[y * self.cols as usize + x];
        style::Color::Rgb {
            r: r as u8,
            g: g as u8,
            b: b as u8,
        }
    }
}

impl Surface for TerminalSurface {
    fn dimensions(&self) -> (f32, f32) {
        (self.cols as f32, self.rows as f32 * 2.0)
    }

    fn clear(&mut self) {
        self.pixels.fill((0.0, 0.0, 0.0));
    }

    fn fill_circle(&mut self, orb: &Orb) {
        let (width, height) = self.dimensions();
        let r = orb.radius;
        let min_x = (orb.x - r).floor().max(0.0) as usize;
        let max_x = (orb.x + r).ceil().min(width - 1.0).max(0.0) as usize;
        let min_y = (orb.y - r).floor().max(0.0) as usize;
        let max_y = (orb.y + r).ceil().min(height - 1.0).max(0.0) as usize;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - orb.x;
                let dy = y as f32 + 0.5 - orb.y;
                if dx * dx + dy * dy <= r * r {
                    self.blend(x, y, orb.color, orb.alpha);
                }
            }
        }
    }

    fn present(&mut self, status: &str) -> Result<()> {
        let mut out = std::io::stdout();
        out.queue(cursor::MoveTo(0, 0))?;
        for row in 0..self.rows as usize {
            out.queue(cursor::MoveTo(0, row as u16))?;
            for col in 0..self.cols as usize {
                let upper = self.pixel_color(col, row * 2);
                let lower = self.pixel_color(col, row * 2 + 1);
                out.queue(style::SetForegroundColor(upper))?;
                out.queue(style::SetBackgroundColor(lower))?;
                out.queue(style::Print('\u{2580}'))?;
            }
        }
        out.queue(style::ResetColor)?;
        if self.rows > 0 {
            out.queue(cursor::MoveTo(0, self.rows - 1))?;
            out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
            out.queue(style::Print(status))?;
        }
        out.flush()?;
        Ok(())
    }

    fn resize(&mut self) -> Result<()> {
        let (cols, rows) = terminal::size()?;
        self.cols = cols;
        self.rows = rows;
        self.pixels = vec![(0.0, 0.0, 0.0); cols as usize * rows as usize * 2];
        Ok(())
    }
}
