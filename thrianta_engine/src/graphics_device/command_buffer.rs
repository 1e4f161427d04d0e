/// Command buffer lifecycle shared by every backend

use crate::error::{Error, Result};

/// Lifecycle state of a per-image command buffer
///
/// `NotAllocated -> Ready -> Recording -> (InRenderPass -> Recording)
/// -> RecordingEnded -> Submitted -> Ready`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandBufferState {
    #[default]
    NotAllocated,
    Ready,
    Recording,
    InRenderPass,
    RecordingEnded,
    Submitted,
}

impl CommandBufferState {
    pub fn can_transition_to(self, next: CommandBufferState) -> bool {
        use CommandBufferState::*;
        match (self, next) {
            // Free is always allowed
            (_, NotAllocated) => true,
            (NotAllocated, Ready) => true,
            // Reset
            (Ready | RecordingEnded | Submitted, Ready) => true,
            (Ready, Recording) => true,
            (Recording, InRenderPass) => true,
            (InRenderPass, Recording) => true,
            (Recording, RecordingEnded) => true,
            (RecordingEnded, Submitted) => true,
            _ => false,
        }
    }

    /// Checked transition
    pub fn transition(self, next: CommandBufferState) -> Result<CommandBufferState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidState(format!(
                "Invalid command buffer transition {:?} -> {:?}",
                self, next
            )))
        }
    }
}

#[cfg(test)]
#[path = "command_buffer_tests.rs"]
mod tests;
