/// Swapchain value types shared by backends and the frame orchestrator

use glam::Vec4;

/// Snapshot of the current swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainInfo {
    pub width: u32,
    pub height: u32,
    pub image_count: u32,
    /// Always `image_count - 1`, and at least 1
    pub max_frames_in_flight: u32,
}

impl SwapchainInfo {
    pub fn new(width: u32, height: u32, image_count: u32) -> Self {
        Self {
            width,
            height,
            image_count,
            max_frames_in_flight: image_count.saturating_sub(1).max(1),
        }
    }
}

/// Outcome of an image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { image_index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface and must be recreated
    OutOfDate,
}

/// Outcome of a presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

impl PresentOutcome {
    pub fn needs_recreation(self) -> bool {
        !matches!(self, PresentOutcome::Presented)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with Y pointing up (origin at the bottom edge,
    /// negative height)
    pub fn flipped(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: height as f32,
            width: width as f32,
            height: -(height as f32),
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Clear values for the color and depth/stencil attachments of the main pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    pub color: Vec4,
    pub depth: f32,
    pub stencil: u32,
}
