/// Memory-type selection
///
/// Property bits use the same values as Vulkan's `VkMemoryPropertyFlagBits`
/// so a backend can convert with `from_bits_truncate`.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryPropertyFlags: u32 {
        const DEVICE_LOCAL = 0x0000_0001;
        const HOST_VISIBLE = 0x0000_0002;
        const HOST_COHERENT = 0x0000_0004;
        const HOST_CACHED = 0x0000_0008;
        const LAZILY_ALLOCATED = 0x0000_0010;
    }
}

impl MemoryPropertyFlags {
    /// Host-visible and coherent, the staging and upload combination
    pub const HOST_VISIBLE_COHERENT: Self =
        Self::HOST_VISIBLE.union(Self::HOST_COHERENT);
}

/// Pick the first memory type allowed by `type_filter` whose properties
/// contain every bit of `required`
///
/// `type_filter` is the driver-reported `memoryTypeBits` mask and
/// `memory_types` lists the property flags of each type in index order.
pub fn find_memory_index(
    type_filter: u32,
    memory_types: &[MemoryPropertyFlags],
    required: MemoryPropertyFlags,
) -> Option<u32> {
    let found = memory_types
        .iter()
        .enumerate()
        .take(32)
        .find(|(index, flags)| type_filter & (1 << index) != 0 && flags.contains(required))
        .map(|(index, _)| index as u32);

    if found.is_none() {
        crate::engine_warn!(
            "thrianta::Memory",
            "Unable to find suitable memory type (filter {:#x}, required {:?})",
            type_filter, required
        );
    }
    found
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
