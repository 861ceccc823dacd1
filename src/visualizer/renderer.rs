//! Waveform and glow rendering.
//!
//! Every call repaints the whole surface from its inputs. The only state kept
//! between frames is the fixed `RenderStyle`.

use tiny_skia::{
    Color, GradientStop, LineCap, LineJoin, LinearGradient, Paint, Path, PathBuilder, Point,
    RadialGradient, Rect, Shader, SpreadMode, Stroke, Transform,
};

use super::analyzer::SILENCE_MIDPOINT;
use super::surface::{Canvas, Surface};

/// Number of translucent strokes used to approximate the stroke's soft glow.
const GLOW_LAYERS: usize = 4;

/// Fixed style constants for the visualization.
#[derive(Debug, Clone, Copy)]
pub struct RenderStyle {
    /// Centre colour of the background glow (fades to transparent at the rim).
    pub ambient_color: Color,
    /// Glow radius at silence, as a fraction of the surface width.
    pub base_radius_fraction: f32,
    /// Extra glow radius per unit of intensity.
    pub glow_gain: f32,
    pub line_width: f32,
    /// Vertical stroke gradient stops as (offset, colour).
    pub stroke_stops: [(f32, Color); 3],
    /// Start and end of the stroke gradient as fractions of the height.
    pub gradient_span: (f32, f32),
    pub shadow_color: Color,
    /// Reach of the stroke's soft glow in logical pixels.
    pub shadow_blur: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            ambient_color: Color::from_rgba8(236, 72, 153, 38),
            base_radius_fraction: 0.25,
            glow_gain: 2.5,
            line_width: 6.0,
            stroke_stops: [
                (0.0, Color::from_rgba8(249, 168, 212, 255)),
                (0.5, Color::from_rgba8(192, 132, 252, 255)),
                (1.0, Color::from_rgba8(147, 197, 253, 255)),
            ],
            gradient_span: (0.2, 0.8),
            shadow_color: Color::from_rgba8(192, 132, 252, 128),
            shadow_blur: 20.0,
        }
    }
}

impl RenderStyle {
    /// Outer radius of the background glow for a surface `width` wide.
    pub fn glow_radius(&self, width: f32, intensity: f32) -> f32 {
        width * self.base_radius_fraction + intensity.max(0.0) * self.glow_gain
    }
}

/// Paints reduced waveforms onto a surface.
#[derive(Debug, Clone, Default)]
pub struct CurveRenderer {
    style: RenderStyle,
}

impl CurveRenderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    /// Draws the glow and the smoothed waveform through `points`.
    ///
    /// `points` are in raw sample units (128 = silence). Returns false if the
    /// surface has no backing buffer yet.
    pub fn render(&self, surface: &mut Surface, points: &[f32], intensity: f32) -> bool {
        let Some(mut canvas) = surface.canvas() else {
            return false;
        };

        canvas.pixmap.fill(Color::TRANSPARENT);
        self.draw_glow(&mut canvas, intensity);

        let path = if points.len() < 3 {
            flat_line(canvas.width, canvas.height)
        } else {
            smooth_curve(points, canvas.width, canvas.height)
        };

        if let Some(path) = path {
            self.stroke_waveform(&mut canvas, &path);
        }
        true
    }

    /// Draws the glow and one vertical bar per value (0-255 scale).
    pub fn render_spectrum(&self, surface: &mut Surface, bars: &[f32], intensity: f32) -> bool {
        let Some(mut canvas) = surface.canvas() else {
            return false;
        };

        canvas.pixmap.fill(Color::TRANSPARENT);
        self.draw_glow(&mut canvas, intensity);

        if bars.is_empty() {
            return true;
        }

        let paint = Paint {
            shader: self.stroke_shader(canvas.height),
            anti_alias: true,
            ..Default::default()
        };

        let slot = canvas.width / bars.len() as f32;
        let bar_width = (slot * 0.75).max(1.0);
        for (i, &value) in bars.iter().enumerate() {
            let height = (value / 255.0).clamp(0.0, 1.0) * canvas.height;
            if height <= 0.0 {
                continue;
            }
            let x = i as f32 * slot + (slot - bar_width) / 2.0;
            if let Some(rect) = Rect::from_xywh(x, canvas.height - height, bar_width, height) {
                canvas.pixmap.fill_rect(rect, &paint, canvas.transform, None);
            }
        }
        true
    }

    fn draw_glow(&self, canvas: &mut Canvas<'_>, intensity: f32) {
        let radius = self.style.glow_radius(canvas.width, intensity);
        let centre = Point::from_xy(canvas.width / 2.0, canvas.height / 2.0);

        let mut transparent = self.style.ambient_color;
        transparent.set_alpha(0.0);

        let Some(shader) = RadialGradient::new(
            centre,
            centre,
            radius,
            vec![
                GradientStop::new(0.0, self.style.ambient_color),
                GradientStop::new(1.0, transparent),
            ],
            SpreadMode::Pad,
            Transform::identity(),
        ) else {
            return;
        };

        let paint = Paint {
            shader,
            anti_alias: true,
            ..Default::default()
        };
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, canvas.width, canvas.height) {
            canvas.pixmap.fill_rect(rect, &paint, canvas.transform, None);
        }
    }

    fn stroke_shader(&self, height: f32) -> Shader<'static> {
        let (start, end) = self.style.gradient_span;
        let stops = self
            .style
            .stroke_stops
            .iter()
            .map(|&(offset, color)| GradientStop::new(offset, color))
            .collect();

        LinearGradient::new(
            Point::from_xy(0.0, height * start),
            Point::from_xy(0.0, height * end),
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        )
        .unwrap_or(Shader::SolidColor(self.style.stroke_stops[1].1))
    }

    /// Strokes `path` with the soft glow underneath, then the gradient line.
    ///
    /// The glow only exists inside this call.
    fn stroke_waveform(&self, canvas: &mut Canvas<'_>, path: &Path) {
        let mut glow = Paint {
            anti_alias: true,
            ..Default::default()
        };
        let mut shadow = self.style.shadow_color;
        shadow.set_alpha(shadow.alpha() / GLOW_LAYERS as f32);
        glow.set_color(shadow);

        for layer in (1..=GLOW_LAYERS).rev() {
            let spread = self.style.shadow_blur * layer as f32 / GLOW_LAYERS as f32;
            let stroke = round_stroke(self.style.line_width + spread);
            canvas
                .pixmap
                .stroke_path(path, &glow, &stroke, canvas.transform, None);
        }

        let paint = Paint {
            shader: self.stroke_shader(canvas.height),
            anti_alias: true,
            ..Default::default()
        };
        let stroke = round_stroke(self.style.line_width);
        canvas
            .pixmap
            .stroke_path(path, &paint, &stroke, canvas.transform, None);
    }
}

fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

/// Vertical position of a raw sample value; silence lands on the centre line.
fn normalize(point: f32, height: f32) -> f32 {
    point / f32::from(SILENCE_MIDPOINT) * height / 2.0
}

fn flat_line(width: f32, height: f32) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(0.0, height / 2.0);
    pb.line_to(width, height / 2.0);
    pb.finish()
}

/// Quadratic blend through the midpoints of consecutive points.
///
/// Requires at least three points.
fn smooth_curve(points: &[f32], width: f32, height: f32) -> Option<Path> {
    let n = points.len();
    let slice = width / (n - 1) as f32;

    let mut pb = PathBuilder::new();
    let mut x = 0.0;
    let mut y = normalize(points[0], height);
    pb.move_to(x, y);

    for &point in &points[1..n - 2] {
        let next_y = normalize(point, height);
        let xc = x + slice / 2.0;
        let yc = (y + next_y) / 2.0;
        pb.quad_to(x, y, xc, yc);
        x += slice;
        y = next_y;
    }

    pb.quad_to(x, y, width, normalize(points[n - 1], height));
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::surface::SurfaceGeometry;

    fn sized_surface(width: f32, height: f32) -> Surface {
        let mut surface = Surface::new();
        surface.ensure_resolution(SurfaceGeometry::new(width, height, 1.0));
        surface
    }

    fn alpha_at(surface: &Surface, x: u32, y: u32) -> u8 {
        surface.pixmap().unwrap().pixel(x, y).unwrap().alpha()
    }

    #[test]
    fn test_render_requires_sized_surface() {
        let mut surface = Surface::new();
        assert!(!CurveRenderer::default().render(&mut surface, &[128.0; 80], 0.0));
    }

    #[test]
    fn test_silence_draws_centre_line() {
        let mut surface = sized_surface(100.0, 50.0);
        assert!(CurveRenderer::default().render(&mut surface, &[128.0; 80], 0.0));

        assert_eq!(alpha_at(&surface, 50, 25), 255);
        // Glow radius at silence is width / 4, so the corners stay clear
        assert_eq!(alpha_at(&surface, 1, 1), 0);
    }

    #[test]
    fn test_degenerate_points_draw_flat_line() {
        for points in [&[][..], &[10.0][..], &[10.0, 250.0][..]] {
            let mut surface = sized_surface(100.0, 50.0);
            assert!(CurveRenderer::default().render(&mut surface, points, 0.0));
            assert_eq!(alpha_at(&surface, 50, 25), 255, "points = {points:?}");
            assert_eq!(alpha_at(&surface, 1, 1), 0);
        }
    }

    #[test]
    fn test_three_points_are_interpolated() {
        let mut surface = sized_surface(100.0, 50.0);
        assert!(CurveRenderer::default().render(&mut surface, &[128.0, 128.0, 128.0], 0.0));
        assert_eq!(alpha_at(&surface, 50, 25), 255);
    }

    #[test]
    fn test_glow_grows_with_intensity() {
        let style = RenderStyle::default();
        assert!(style.glow_radius(100.0, 10.0) > style.glow_radius(100.0, 0.0));
        assert_eq!(style.glow_radius(100.0, 0.0), 25.0);
        assert_eq!(style.glow_radius(100.0, 10.0), 50.0);

        let renderer = CurveRenderer::new(style);
        let mut quiet = sized_surface(100.0, 50.0);
        let mut loud = sized_surface(100.0, 50.0);
        renderer.render(&mut quiet, &[128.0; 80], 0.0);
        renderer.render(&mut loud, &[128.0; 80], 40.0);

        assert_eq!(alpha_at(&quiet, 1, 1), 0);
        assert!(alpha_at(&loud, 1, 1) > 0);
    }

    #[test]
    fn test_render_is_full_redraw() {
        let renderer = CurveRenderer::default();
        let wave_a: Vec<f32> = (0..80).map(|i| 128.0 + (i as f32 * 0.3).sin() * 60.0).collect();
        let wave_b: Vec<f32> = (0..80).map(|i| if i % 2 == 0 { 20.0 } else { 230.0 }).collect();

        let mut reused = sized_surface(120.0, 60.0);
        renderer.render(&mut reused, &wave_a, 12.0);
        renderer.render(&mut reused, &wave_b, 80.0);
        renderer.render(&mut reused, &wave_a, 12.0);

        let mut fresh = sized_surface(120.0, 60.0);
        renderer.render(&mut fresh, &wave_a, 12.0);

        assert_eq!(reused.pixmap().unwrap().data(), fresh.pixmap().unwrap().data());
    }

    #[test]
    fn test_drawing_uses_logical_coordinates() {
        let mut surface = Surface::new();
        surface.ensure_resolution(SurfaceGeometry::new(100.0, 50.0, 2.0));
        CurveRenderer::default().render(&mut surface, &[128.0; 80], 0.0);

        // Logical centre (50, 25) lands on device pixel (100, 50)
        assert_eq!(alpha_at(&surface, 100, 50), 255);
        assert_eq!(alpha_at(&surface, 2, 2), 0);
    }

    #[test]
    fn test_spectrum_bars_rise_from_bottom() {
        let mut surface = sized_surface(80.0, 40.0);
        let mut bars = vec![0.0; 8];
        bars[0] = 255.0;

        assert!(CurveRenderer::default().render_spectrum(&mut surface, &bars, 0.0));
        assert_eq!(alpha_at(&surface, 5, 38), 255);
        assert_eq!(alpha_at(&surface, 5, 1), 255);
        assert_eq!(alpha_at(&surface, 75, 38), 0);
    }
}
