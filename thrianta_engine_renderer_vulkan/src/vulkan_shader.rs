/// Shader module loading
///
/// Bytecode lives at `assets/shaders/<name>.<stage>.spv`. Pipeline
/// construction is left to the caller; this only produces the module and
/// the stage descriptor that points at its `main` entry.

use ash::vk;
use std::ffi::CStr;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use thrianta_engine::thrianta::{Error, Result};
use thrianta_engine::{engine_debug, engine_err, engine_error};

const SOURCE: &str = "thrianta::vulkan";

pub const SHADER_DIRECTORY: &str = "assets/shaders";
pub const ENTRY_POINT: &CStr = c"main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// File-name tag of the stage
    pub fn tag(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
            ShaderStage::Compute => "comp",
        }
    }

    pub fn to_vk(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
        }
    }
}

/// `<root>/<name>.<stage>.spv`
pub fn shader_path(root: &Path, name: &str, stage: ShaderStage) -> PathBuf {
    root.join(format!("{}.{}.spv", name, stage.tag()))
}

/// Turn raw bytecode into aligned SPIR-V words
pub fn parse_spirv(name: &str, bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() {
        return Err(Error::InvalidResource(format!("Shader '{}' is empty", name)));
    }
    ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| {
        engine_error!(SOURCE, "Invalid SPIR-V in shader '{}': {}", name, e);
        Error::InvalidResource(format!("Invalid SPIR-V in shader '{}': {}", name, e))
    })
}

pub struct ShaderModule {
    pub(crate) module: vk::ShaderModule,
    stage: ShaderStage,
    device: ash::Device,
}

impl ShaderModule {
    pub fn from_spirv(device: &ash::Device, name: &str, code: &[u32], stage: ShaderStage) -> Result<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        let module = unsafe { device.create_shader_module(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create shader module '{}': {:?}", name, e))?;

        Ok(Self { module, stage, device: device.clone() })
    }

    /// Read `<root>/<name>.<stage>.spv` and build a module from it
    pub fn load(device: &ash::Device, root: &Path, name: &str, stage: ShaderStage) -> Result<Self> {
        let path = shader_path(root, name, stage);
        let bytes = std::fs::read(&path).map_err(|e| {
            engine_error!(SOURCE, "Unable to read shader module '{}': {}", path.display(), e);
            Error::Io(format!("{}: {}", path.display(), e))
        })?;

        let code = parse_spirv(name, &bytes)?;
        let module = Self::from_spirv(device, name, &code, stage)?;
        engine_debug!(SOURCE, "Loaded shader module '{}' ({} bytes)", path.display(), bytes.len());
        Ok(module)
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn stage_info(&self) -> vk::PipelineShaderStageCreateInfo<'static> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk())
            .module(self.module)
            .name(ENTRY_POINT)
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
