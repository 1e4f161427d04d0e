/// Mock graphics device for unit tests (no GPU required)
///
/// Simulates the parts of a GPU the frame orchestrator can get wrong:
/// - a submitted fence stays pending until someone waits on it (or the
///   device is waited idle), so every completion is observable
/// - acquisition order and results can be scripted
/// - presentation outcomes can be scripted
/// - every call is recorded, and ordering mistakes are collected in
///   `violations` instead of panicking inside the device
///
/// The state lives behind `Arc<Mutex<..>>` so a test keeps a handle after
/// the device is boxed into a `Renderer`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireOutcome, Buffer, BufferDesc, ClearValues, CommandBufferState, FenceKey, FenceStatus,
    GraphicsDevice, PresentOutcome, Rect2D, SemaphoreKey, SwapchainInfo, Viewport,
};

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    CreateFence { signaled: bool },
    DestroyFence,
    /// `blocked` is true when the fence was pending and the wait completed it
    WaitFence { fence: FenceKey, blocked: bool },
    ResetFence { fence: FenceKey },
    CreateSemaphore,
    DestroySemaphore,
    Acquire { outcome: AcquireOutcome },
    BeginCommands { image_index: u32 },
    SetViewport { viewport: Viewport },
    SetScissor { scissor: Rect2D },
    BeginRenderPass { image_index: u32, area: Rect2D },
    EndRenderPass,
    EndCommands,
    Submit { image_index: u32, fence: FenceKey },
    Present { image_index: u32, outcome: PresentOutcome },
    RecreateSwapchain { width: u32, height: u32 },
    WaitIdle,
    CreateBuffer { size: u64 },
}

#[derive(Debug, Clone, Copy)]
struct MockFence {
    signaled: bool,
    submitted: u64,
    completed: u64,
}

impl MockFence {
    fn pending(&self) -> bool {
        self.submitted > self.completed
    }
}

pub struct MockState {
    pub calls: Vec<MockCall>,
    pub violations: Vec<String>,
    pub info: SwapchainInfo,
    pub command_buffers: Vec<CommandBufferState>,

    /// Outcomes returned by the next acquisitions, before round-robin resumes
    pub acquire_script: VecDeque<AcquireOutcome>,
    /// Outcomes returned by the next presentations, `Presented` afterward
    pub present_script: VecDeque<PresentOutcome>,
    /// Error returned by the next fence wait
    pub fail_next_wait: Option<Error>,
    /// The next fence wait reports a timeout without completing the fence
    pub timeout_next_wait: bool,
    pub fail_next_recreate: Option<Error>,
    pub fail_next_submit: Option<Error>,
    /// Image count used by the next recreation (same count if `None`)
    pub recreate_image_count: Option<u32>,
    /// Surface extent limits applied on recreation
    pub min_extent: (u32, u32),
    pub max_extent: (u32, u32),

    pub views_created: u32,
    pub views_destroyed: u32,
    pub framebuffer_count: u32,

    fences: SlotMap<FenceKey, MockFence>,
    semaphores: SlotMap<SemaphoreKey, ()>,
    image_submissions: Vec<Option<(FenceKey, u64)>>,
    next_image: u32,
}

impl MockState {
    fn new(width: u32, height: u32, image_count: u32) -> Self {
        Self {
            calls: Vec::new(),
            violations: Vec::new(),
            info: SwapchainInfo::new(width, height, image_count),
            command_buffers: vec![CommandBufferState::Ready; image_count as usize],
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            fail_next_wait: None,
            timeout_next_wait: false,
            fail_next_recreate: None,
            fail_next_submit: None,
            recreate_image_count: None,
            min_extent: (1, 1),
            max_extent: (16384, 16384),
            views_created: image_count,
            views_destroyed: 0,
            framebuffer_count: image_count,
            fences: SlotMap::with_key(),
            semaphores: SlotMap::with_key(),
            image_submissions: vec![None; image_count as usize],
            next_image: 0,
        }
    }

    pub fn live_fences(&self) -> usize {
        self.fences.len()
    }

    pub fn live_semaphores(&self) -> usize {
        self.semaphores.len()
    }

    pub fn live_views(&self) -> u32 {
        self.views_created - self.views_destroyed
    }

    pub fn pending_fences(&self) -> usize {
        self.fences.values().filter(|f| f.pending()).count()
    }

    pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    /// Fences in the order they were passed to `submit`
    pub fn submitted_fences(&self) -> Vec<FenceKey> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Submit { fence, .. } => Some(*fence),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn violation(&mut self, message: String) {
        self.violations.push(message);
    }

    fn transition(&mut self, image_index: u32, next: CommandBufferState) {
        let Some(current) = self.command_buffers.get(image_index as usize).copied() else {
            self.violation(format!("command buffer {} does not exist", image_index));
            return;
        };
        match current.transition(next) {
            Ok(state) => self.command_buffers[image_index as usize] = state,
            Err(e) => self.violation(format!("command buffer {}: {}", image_index, e)),
        }
    }

    fn complete_all(&mut self) {
        for fence in self.fences.values_mut() {
            if fence.pending() {
                fence.completed = fence.submitted;
                fence.signaled = true;
            }
        }
    }
}

pub struct MockGraphicsDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockGraphicsDevice {
    /// Create a device and the handle a test keeps to inspect it
    pub fn new(width: u32, height: u32, image_count: u32) -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState::new(width, height, image_count)));
        (Self { state: state.clone() }, state)
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn swapchain_info(&self) -> SwapchainInfo {
        self.state().info
    }

    fn create_fence(&mut self, signaled: bool) -> Result<FenceKey> {
        let mut state = self.state();
        state.calls.push(MockCall::CreateFence { signaled });
        Ok(state.fences.insert(MockFence { signaled, submitted: 0, completed: 0 }))
    }

    fn destroy_fence(&mut self, fence: FenceKey) {
        let mut state = self.state();
        state.calls.push(MockCall::DestroyFence);
        match state.fences.remove(fence) {
            Some(f) if f.pending() => state.violation("destroyed a pending fence".to_string()),
            Some(_) => {}
            None => state.violation("destroyed an unknown fence".to_string()),
        }
    }

    fn wait_for_fence(&mut self, fence: FenceKey, _timeout_ns: u64) -> Result<FenceStatus> {
        let mut state = self.state();
        if let Some(error) = state.fail_next_wait.take() {
            return Err(error);
        }
        if state.timeout_next_wait {
            state.timeout_next_wait = false;
            return Ok(FenceStatus::Timeout);
        }

        let Some(current) = state.fences.get(fence).copied() else {
            state.violation("waited on an unknown fence".to_string());
            return Err(Error::InvalidResource("unknown fence".to_string()));
        };

        if current.signaled {
            state.calls.push(MockCall::WaitFence { fence, blocked: false });
            return Ok(FenceStatus::Signaled);
        }
        if current.pending() {
            if let Some(f) = state.fences.get_mut(fence) {
                f.completed = f.submitted;
                f.signaled = true;
            }
            state.calls.push(MockCall::WaitFence { fence, blocked: true });
            return Ok(FenceStatus::Signaled);
        }

        state.violation("waited on an unsignaled fence with no work submitted".to_string());
        Ok(FenceStatus::Timeout)
    }

    fn reset_fence(&mut self, fence: FenceKey) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::ResetFence { fence });
        let Some(current) = state.fences.get(fence).copied() else {
            state.violation("reset an unknown fence".to_string());
            return Err(Error::InvalidResource("unknown fence".to_string()));
        };
        if current.pending() {
            state.violation("reset a fence whose submission is still in flight".to_string());
        }
        if let Some(f) = state.fences.get_mut(fence) {
            f.signaled = false;
        }
        Ok(())
    }

    fn create_semaphore(&mut self) -> Result<SemaphoreKey> {
        let mut state = self.state();
        state.calls.push(MockCall::CreateSemaphore);
        Ok(state.semaphores.insert(()))
    }

    fn destroy_semaphore(&mut self, semaphore: SemaphoreKey) {
        let mut state = self.state();
        state.calls.push(MockCall::DestroySemaphore);
        if state.semaphores.remove(semaphore).is_none() {
            state.violation("destroyed an unknown semaphore".to_string());
        }
    }

    fn acquire_next_image(&mut self, _timeout_ns: u64, signal: SemaphoreKey) -> Result<AcquireOutcome> {
        let mut state = self.state();
        if !state.semaphores.contains_key(signal) {
            state.violation("acquire with an unknown semaphore".to_string());
        }

        let outcome = match state.acquire_script.pop_front() {
            Some(outcome) => outcome,
            None => {
                let image_index = state.next_image;
                state.next_image = (image_index + 1) % state.info.image_count;
                AcquireOutcome::Acquired { image_index, suboptimal: false }
            }
        };

        if let AcquireOutcome::Acquired { image_index, .. } = outcome {
            if image_index >= state.info.image_count {
                state.violation(format!("acquired image {} out of range", image_index));
            }
        }
        state.calls.push(MockCall::Acquire { outcome });
        Ok(outcome)
    }

    fn present(&mut self, wait: SemaphoreKey, image_index: u32) -> Result<PresentOutcome> {
        let mut state = self.state();
        if !state.semaphores.contains_key(wait) {
            state.violation("present with an unknown semaphore".to_string());
        }
        let outcome = state.present_script.pop_front().unwrap_or(PresentOutcome::Presented);
        state.calls.push(MockCall::Present { image_index, outcome });
        Ok(outcome)
    }

    fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<SwapchainInfo> {
        let mut state = self.state();
        if let Some(error) = state.fail_next_recreate.take() {
            return Err(error);
        }
        if state.pending_fences() > 0 {
            state.violation("swapchain recreated while the GPU was busy".to_string());
        }

        let width = width.clamp(state.min_extent.0, state.max_extent.0);
        let height = height.clamp(state.min_extent.1, state.max_extent.1);
        let old_count = state.info.image_count;
        let image_count = state.recreate_image_count.take().unwrap_or(old_count);

        state.views_destroyed += old_count;
        state.views_created += image_count;
        state.framebuffer_count = image_count;
        state.command_buffers = vec![CommandBufferState::Ready; image_count as usize];
        state.image_submissions = vec![None; image_count as usize];
        state.next_image = 0;
        state.info = SwapchainInfo::new(width, height, image_count);
        state.calls.push(MockCall::RecreateSwapchain { width, height });
        Ok(state.info)
    }

    fn begin_commands(&mut self, image_index: u32) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::BeginCommands { image_index });

        if let Some(Some((fence, serial))) = state.image_submissions.get(image_index as usize).copied() {
            let in_flight = state.fences.get(fence).map_or(false, |f| f.completed < serial);
            if in_flight {
                state.violation(format!(
                    "command buffer {} begun while its last submission is in flight",
                    image_index
                ));
            }
        }

        let current = state.command_buffers.get(image_index as usize).copied();
        if current != Some(CommandBufferState::Ready) {
            state.transition(image_index, CommandBufferState::Ready);
        }
        state.transition(image_index, CommandBufferState::Recording);
        Ok(())
    }

    fn set_viewport(&mut self, image_index: u32, viewport: Viewport) -> Result<()> {
        let mut state = self.state();
        if state.command_buffers.get(image_index as usize) != Some(&CommandBufferState::Recording) {
            state.violation("viewport set outside recording".to_string());
        }
        state.calls.push(MockCall::SetViewport { viewport });
        Ok(())
    }

    fn set_scissor(&mut self, image_index: u32, scissor: Rect2D) -> Result<()> {
        let mut state = self.state();
        if state.command_buffers.get(image_index as usize) != Some(&CommandBufferState::Recording) {
            state.violation("scissor set outside recording".to_string());
        }
        state.calls.push(MockCall::SetScissor { scissor });
        Ok(())
    }

    fn begin_render_pass(&mut self, image_index: u32, area: Rect2D, _clear: &ClearValues) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::BeginRenderPass { image_index, area });
        state.transition(image_index, CommandBufferState::InRenderPass);
        Ok(())
    }

    fn end_render_pass(&mut self, image_index: u32) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::EndRenderPass);
        if state.command_buffers.get(image_index as usize) != Some(&CommandBufferState::InRenderPass) {
            state.violation(format!("render pass ended on command buffer {} outside a pass", image_index));
            return Ok(());
        }
        state.transition(image_index, CommandBufferState::Recording);
        Ok(())
    }

    fn end_commands(&mut self, image_index: u32) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::EndCommands);
        state.transition(image_index, CommandBufferState::RecordingEnded);
        Ok(())
    }

    fn command_buffer_state(&self, image_index: u32) -> CommandBufferState {
        self.state()
            .command_buffers
            .get(image_index as usize)
            .copied()
            .unwrap_or_default()
    }

    fn submit(
        &mut self,
        image_index: u32,
        wait: SemaphoreKey,
        signal: SemaphoreKey,
        fence: FenceKey,
    ) -> Result<()> {
        let mut state = self.state();
        if let Some(error) = state.fail_next_submit.take() {
            return Err(error);
        }
        state.calls.push(MockCall::Submit { image_index, fence });

        if !state.semaphores.contains_key(wait) || !state.semaphores.contains_key(signal) {
            state.violation("submit with an unknown semaphore".to_string());
        }

        let Some(current) = state.fences.get(fence).copied() else {
            state.violation("submit with an unknown fence".to_string());
            return Err(Error::InvalidResource("unknown fence".to_string()));
        };
        if current.signaled || current.pending() {
            state.violation("submit with a fence that was not reset".to_string());
        }

        state.transition(image_index, CommandBufferState::Submitted);

        let serial = current.submitted + 1;
        if let Some(f) = state.fences.get_mut(fence) {
            f.submitted = serial;
        }
        if let Some(slot) = state.image_submissions.get_mut(image_index as usize) {
            *slot = Some((fence, serial));
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::WaitIdle);
        state.complete_all();
        Ok(())
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        self.state().calls.push(MockCall::CreateBuffer { size: desc.size });
        Ok(Arc::new(MockBuffer {
            data: Mutex::new(vec![0; desc.size as usize]),
        }))
    }
}

/// Host-memory buffer
pub struct MockBuffer {
    pub data: Mutex<Vec<u8>>,
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.data.lock().unwrap().len() as u64
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut bytes = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start + data.len();
        if end > bytes.len() {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at offset {} exceeds buffer size {}",
                data.len(), offset, bytes.len()
            )));
        }
        bytes[start..end].copy_from_slice(data);
        Ok(())
    }
}
