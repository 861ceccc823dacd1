//! Density-aware drawing surface.
//!
//! The surface keeps a backing pixel buffer sized `logical size × pixel ratio`
//! and a matching scale transform, so every drawing command is issued in
//! logical coordinates. The buffer is only reallocated when the geometry
//! actually changes.

use tiny_skia::{Pixmap, Transform};

/// Logical size of the drawing box and the density it is displayed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    pub logical_width: f32,
    pub logical_height: f32,
    pub pixel_ratio: f32,
}

impl SurfaceGeometry {
    pub fn new(logical_width: f32, logical_height: f32, pixel_ratio: f32) -> Self {
        Self {
            logical_width,
            logical_height,
            pixel_ratio,
        }
    }

    /// Whether there is anything to draw into.
    pub fn is_empty(&self) -> bool {
        !(self.logical_width > 0.0 && self.logical_height > 0.0 && self.pixel_ratio > 0.0)
    }

    /// Backing buffer size in device pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        (
            (self.logical_width * self.pixel_ratio).round() as u32,
            (self.logical_height * self.pixel_ratio).round() as u32,
        )
    }
}

/// Provider of the surface's current layout box and display density.
///
/// Queried synchronously at the start of every frame.
pub trait SurfaceHost {
    fn geometry(&self) -> SurfaceGeometry;
}

/// Result of `Surface::ensure_resolution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Backing buffer already matched; nothing was touched.
    Unchanged,
    /// Backing buffer was reallocated to the given device-pixel size.
    Resized { width: u32, height: u32 },
    /// Zero logical area; nothing may be drawn this frame.
    Empty,
}

/// Drawing surface: backing buffer, scale transform and the geometry they were derived from.
#[derive(Default)]
pub struct Surface {
    pixmap: Option<Pixmap>,
    transform: Transform,
    geometry: Option<SurfaceGeometry>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the backing buffer in line with `geometry`.
    ///
    /// Reallocation and the transform reset only happen when the derived
    /// backing size or the ratio differs from the current one; an empty
    /// geometry leaves the existing buffer alone.
    pub fn ensure_resolution(&mut self, geometry: SurfaceGeometry) -> Resolution {
        if geometry.is_empty() {
            return Resolution::Empty;
        }

        let (width, height) = geometry.backing_size();
        if width == 0 || height == 0 {
            return Resolution::Empty;
        }

        let unchanged = self.pixmap.as_ref().is_some_and(|p| {
            p.width() == width && p.height() == height
        }) && self
            .geometry
            .is_some_and(|g| g.pixel_ratio == geometry.pixel_ratio);

        if unchanged {
            // Logical size may drift by less than a device pixel
            self.geometry = Some(geometry);
            return Resolution::Unchanged;
        }

        let Some(pixmap) = Pixmap::new(width, height) else {
            tracing::warn!("Could not allocate {}x{} backing buffer", width, height);
            return Resolution::Empty;
        };

        tracing::debug!(
            "Surface resized to {}x{} (logical {}x{} @ {})",
            width,
            height,
            geometry.logical_width,
            geometry.logical_height,
            geometry.pixel_ratio
        );

        self.pixmap = Some(pixmap);
        self.transform = Transform::from_scale(geometry.pixel_ratio, geometry.pixel_ratio);
        self.geometry = Some(geometry);
        Resolution::Resized { width, height }
    }

    /// Backing buffer size in device pixels, if one has been allocated.
    pub fn backing_size(&self) -> Option<(u32, u32)> {
        self.pixmap.as_ref().map(|p| (p.width(), p.height()))
    }

    /// Logical-to-device transform to apply to every drawing command.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Drawing access: the buffer, its transform and the logical size.
    pub fn canvas(&mut self) -> Option<Canvas<'_>> {
        let geometry = self.geometry?;
        let transform = self.transform;
        self.pixmap.as_mut().map(|pixmap| Canvas {
            pixmap,
            transform,
            width: geometry.logical_width,
            height: geometry.logical_height,
        })
    }
}

/// Mutable view of a sized surface for one render pass.
pub struct Canvas<'a> {
    pub pixmap: &'a mut Pixmap,
    pub transform: Transform,
    pub width: f32,
    pub height: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_scales_by_pixel_ratio() {
        let mut surface = Surface::new();
        let resolution = surface.ensure_resolution(SurfaceGeometry::new(300.0, 200.0, 2.0));

        assert_eq!(
            resolution,
            Resolution::Resized {
                width: 600,
                height: 400
            }
        );
        assert_eq!(surface.backing_size(), Some((600, 400)));
        assert_eq!(surface.transform(), Transform::from_scale(2.0, 2.0));
    }

    #[test]
    fn test_unchanged_geometry_is_noop() {
        let mut surface = Surface::new();
        let geometry = SurfaceGeometry::new(300.0, 200.0, 2.0);

        assert!(matches!(
            surface.ensure_resolution(geometry),
            Resolution::Resized { .. }
        ));
        assert_eq!(surface.ensure_resolution(geometry), Resolution::Unchanged);
        assert_eq!(surface.ensure_resolution(geometry), Resolution::Unchanged);
    }

    #[test]
    fn test_unchanged_geometry_keeps_buffer_contents() {
        let mut surface = Surface::new();
        let geometry = SurfaceGeometry::new(10.0, 10.0, 1.0);
        surface.ensure_resolution(geometry);

        if let Some(canvas) = surface.canvas() {
            canvas.pixmap.fill(tiny_skia::Color::WHITE);
        }
        surface.ensure_resolution(geometry);

        let pixmap = surface.pixmap().unwrap();
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 255));
    }

    #[test]
    fn test_ratio_change_triggers_resize() {
        let mut surface = Surface::new();
        surface.ensure_resolution(SurfaceGeometry::new(300.0, 200.0, 1.0));
        let resolution = surface.ensure_resolution(SurfaceGeometry::new(300.0, 200.0, 3.0));

        assert_eq!(
            resolution,
            Resolution::Resized {
                width: 900,
                height: 600
            }
        );
        assert_eq!(surface.transform(), Transform::from_scale(3.0, 3.0));
    }

    #[test]
    fn test_zero_area_is_skipped() {
        let mut surface = Surface::new();
        surface.ensure_resolution(SurfaceGeometry::new(300.0, 200.0, 2.0));

        assert_eq!(
            surface.ensure_resolution(SurfaceGeometry::new(0.0, 200.0, 2.0)),
            Resolution::Empty
        );
        assert_eq!(
            surface.ensure_resolution(SurfaceGeometry::new(300.0, 200.0, 0.0)),
            Resolution::Empty
        );
        // The previous buffer is left untouched
        assert_eq!(surface.backing_size(), Some((600, 400)));
    }

    #[test]
    fn test_fresh_surface_has_no_canvas() {
        let mut surface = Surface::new();
        assert!(surface.canvas().is_none());
        assert_eq!(surface.ensure_resolution(SurfaceGeometry::new(0.0, 0.0, 1.0)), Resolution::Empty);
        assert!(surface.canvas().is_none());
    }
}
