//! Terminal surface abstraction
//!
//! The controller and chat session only ever write raw text (with control
//! sequences) and ask for the geometry. Key events arrive separately as a
//! stream of [`SurfaceEvent`](crate::keys::SurfaceEvent)s.

use std::sync::Arc;

/// Output side of a terminal
pub trait Surface: Send + Sync {
    /// Write raw text; control sequences pass through untouched
    fn write(&self, text: &str);

    /// Current geometry as (columns, rows)
    fn size(&self) -> (u16, u16);

    /// Ask the host to end the terminal session
    fn close(&self) {}
}

/// Shared handle to a surface
pub type SharedSurface = Arc<dyn Surface>;
