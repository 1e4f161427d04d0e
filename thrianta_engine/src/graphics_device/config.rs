/// Renderer configuration

use glam::Vec4;

use crate::graphics_device::{ClearValues, DeviceRequirements};

/// Which validation messages the backend forwards to the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    /// Errors, warnings, info and verbose
    All,
}

/// Counters of validation messages received so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable validation layers and the debug messenger
    pub enable_validation: bool,
    pub debug_severity: DebugSeverity,
    pub device_requirements: DeviceRequirements,
    pub clear_color: Vec4,
    pub clear_depth: f32,
    pub clear_stencil: u32,
    /// Timeout for fence waits and image acquisition, in nanoseconds
    pub fence_timeout_ns: u64,
}

impl RendererConfig {
    pub fn clear_values(&self) -> ClearValues {
        ClearValues {
            color: self.clear_color,
            depth: self.clear_depth,
            stencil: self.clear_stencil,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "Thrianta Application".to_string(),
            app_version: (1, 0, 0),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            device_requirements: DeviceRequirements::default(),
            clear_color: Vec4::new(0.0, 0.0, 0.2, 1.0),
            clear_depth: 1.0,
            clear_stencil: 0,
            fence_timeout_ns: u64::MAX,
        }
    }
}
