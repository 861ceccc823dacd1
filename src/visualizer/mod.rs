//! Real-time audio visualization engine.
//!
//! Samples flow from a capture tap through the analyzer into the reducer,
//! and the renderer paints the result onto a density-aware surface once per
//! animation frame.

pub mod analyzer;
pub mod capture;
pub mod driver;
pub mod reducer;
pub mod renderer;
pub mod surface;
pub mod view;

pub use analyzer::SignalSource;
pub use capture::CaptureTap;
pub use driver::{frame_interval, AnimationDriver, DriverHandle};
pub use surface::{SurfaceGeometry, SurfaceHost};
pub use view::{SkipReason, TickOutcome, Visualizer};
