//! Pixel buffer presentation on the terminal.
//!
//! Every terminal cell shows two vertically stacked pixels through the upper
//! half block glyph: the foreground colour paints the top pixel and the
//! background colour the bottom one. A backing buffer denser than that is
//! box-filtered down.

use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};
use std::cell::Cell;
use tiny_skia::Pixmap;

use crate::visualizer::{SurfaceGeometry, SurfaceHost};

/// Logical pixels per terminal column.
pub const CELL_WIDTH: f32 = 8.0;
/// Logical pixels per terminal row.
pub const CELL_HEIGHT: f32 = 16.0;

const UPPER_HALF_BLOCK: &str = "▀";

/// Surface host backed by a terminal area.
///
/// The area is updated on every draw; the next frame sizes the surface from
/// it. Each cell is `CELL_WIDTH × CELL_HEIGHT` logical pixels and carries
/// 1×2 device pixels, so the native ratio is `1 / CELL_WIDTH`.
#[derive(Debug)]
pub struct TerminalHost {
    area: Cell<Rect>,
    supersample: u32,
}

impl TerminalHost {
    pub fn new(supersample: u32) -> Self {
        Self {
            area: Cell::new(Rect::default()),
            supersample: supersample.max(1),
        }
    }

    pub fn set_area(&self, area: Rect) {
        self.area.set(area);
    }
}

impl SurfaceHost for TerminalHost {
    fn geometry(&self) -> SurfaceGeometry {
        let area = self.area.get();
        SurfaceGeometry::new(
            f32::from(area.width) * CELL_WIDTH,
            f32::from(area.height) * CELL_HEIGHT,
            self.supersample as f32 / CELL_WIDTH,
        )
    }
}

/// Widget drawing a pixmap with half blocks, composited over `background`.
pub struct HalfBlock<'a> {
    pixmap: Option<&'a Pixmap>,
    background: (u8, u8, u8),
}

impl<'a> HalfBlock<'a> {
    pub fn new(pixmap: Option<&'a Pixmap>) -> Self {
        Self {
            pixmap,
            background: (0, 0, 0),
        }
    }

    pub fn background(mut self, r: u8, g: u8, b: u8) -> Self {
        self.background = (r, g, b);
        self
    }

    /// Average colour of the source box behind terminal pixel (`col`, `row`).
    fn sample(&self, pixmap: &Pixmap, area: Rect, col: u32, row: u32) -> Color {
        let (w, h) = (pixmap.width(), pixmap.height());
        let cols = u32::from(area.width);
        let rows = u32::from(area.height) * 2;

        let x0 = col * w / cols;
        let x1 = ((col + 1) * w / cols).max(x0 + 1).min(w);
        let y0 = row * h / rows;
        let y1 = ((row + 1) * h / rows).max(y0 + 1).min(h);

        let pixels = pixmap.pixels();
        let mut sum = [0u32; 4];
        let mut count = 0u32;
        for y in y0..y1 {
            for x in x0..x1 {
                let p = pixels[(y * w + x) as usize];
                sum[0] += u32::from(p.red());
                sum[1] += u32::from(p.green());
                sum[2] += u32::from(p.blue());
                sum[3] += u32::from(p.alpha());
                count += 1;
            }
        }

        if count == 0 {
            let (r, g, b) = self.background;
            return Color::Rgb(r, g, b);
        }

        let avg = |v: u32| (v + count / 2) / count;
        let alpha = avg(sum[3]);
        let over = |premultiplied: u32, bg: u8| {
            (premultiplied + (u32::from(bg) * (255 - alpha) + 127) / 255).min(255) as u8
        };

        let (r, g, b) = self.background;
        Color::Rgb(
            over(avg(sum[0]), r),
            over(avg(sum[1]), g),
            over(avg(sum[2]), b),
        )
    }
}

impl Widget for HalfBlock<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }

        let (r, g, b) = self.background;
        let Some(pixmap) = self.pixmap else {
            for y in area.top()..area.bottom() {
                for x in area.left()..area.right() {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_symbol(" ").set_bg(Color::Rgb(r, g, b));
                    }
                }
            }
            return;
        };

        for row in 0..area.height {
            for col in 0..area.width {
                let top = self.sample(pixmap, area, u32::from(col), u32::from(row) * 2);
                let bottom = self.sample(pixmap, area, u32::from(col), u32::from(row) * 2 + 1);
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_symbol(UPPER_HALF_BLOCK).set_fg(top).set_bg(bottom);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::{Paint, Rect as SkRect, Transform};

    fn fill(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, rgba: [u8; 4]) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
        let rect = SkRect::from_xywh(x, y, w, h).unwrap();
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn colors(buf: &Buffer, x: u16, y: u16) -> (Color, Color) {
        let cell = buf.cell((x, y)).unwrap();
        (cell.fg, cell.bg)
    }

    #[test]
    fn test_host_geometry_matches_half_block_grid() {
        let host = TerminalHost::new(2);
        host.set_area(Rect::new(0, 0, 30, 10));

        let geometry = host.geometry();
        assert_eq!(geometry.logical_width, 240.0);
        assert_eq!(geometry.logical_height, 160.0);
        // 2x the terminal's 30x20 pixel grid
        assert_eq!(geometry.backing_size(), (60, 40));
    }

    #[test]
    fn test_host_without_area_is_empty() {
        let host = TerminalHost::new(1);
        assert!(host.geometry().is_empty());
    }

    #[test]
    fn test_top_and_bottom_pixels() {
        let mut pixmap = Pixmap::new(2, 4).unwrap();
        fill(&mut pixmap, 0.0, 0.0, 2.0, 1.0, [255, 0, 0, 255]);
        fill(&mut pixmap, 0.0, 1.0, 2.0, 1.0, [0, 0, 255, 255]);

        let area = Rect::new(0, 0, 2, 2);
        let mut buf = Buffer::empty(area);
        HalfBlock::new(Some(&pixmap)).render(area, &mut buf);

        assert_eq!(buf.cell((0, 0)).unwrap().symbol(), "▀");
        assert_eq!(colors(&buf, 0, 0), (Color::Rgb(255, 0, 0), Color::Rgb(0, 0, 255)));
        // Untouched pixels show the background
        assert_eq!(colors(&buf, 1, 1), (Color::Rgb(0, 0, 0), Color::Rgb(0, 0, 0)));
    }

    #[test]
    fn test_supersampled_buffer_is_averaged() {
        // 2x supersampled: 2 source pixels per terminal pixel in each direction
        let mut pixmap = Pixmap::new(2, 4).unwrap();
        fill(&mut pixmap, 0.0, 0.0, 1.0, 4.0, [255, 255, 255, 255]);

        let area = Rect::new(0, 0, 1, 1);
        let mut buf = Buffer::empty(area);
        HalfBlock::new(Some(&pixmap)).render(area, &mut buf);

        assert_eq!(
            colors(&buf, 0, 0),
            (Color::Rgb(128, 128, 128), Color::Rgb(128, 128, 128))
        );
    }

    #[test]
    fn test_transparent_pixels_show_background() {
        let pixmap = Pixmap::new(4, 4).unwrap();
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        HalfBlock::new(Some(&pixmap))
            .background(10, 20, 30)
            .render(area, &mut buf);

        assert_eq!(
            colors(&buf, 1, 0),
            (Color::Rgb(10, 20, 30), Color::Rgb(10, 20, 30))
        );
    }

    #[test]
    fn test_missing_pixmap_clears_area() {
        let area = Rect::new(0, 0, 3, 2);
        let mut buf = Buffer::empty(area);
        HalfBlock::new(None).background(1, 2, 3).render(area, &mut buf);

        let cell = buf.cell((2, 1)).unwrap();
        assert_eq!(cell.symbol(), " ");
        assert_eq!(cell.bg, Color::Rgb(1, 2, 3));
    }
}
