use crate::error::EngineResult;
use crate::render::FramePlan;

/// Outcome of an image acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAcquire {
    Acquired(u32),
    /// Swapchain is stale; derived resources must be rebuilt before use.
    OutOfDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Presented,
    OutOfDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The frame was dropped whole; nothing was partially presented.
    Skipped,
}

/// GPU-facing operations of one frame slot, plus surface lifecycle.
///
/// Implemented by the Vulkan backend; tests instrument the protocol through
/// a mock. Contract notes:
///
/// - `wait_fence` blocks until the slot's prior GPU work completed; waiting
///   on an already-signaled fence returns immediately and is side-effect
///   free (idempotent).
/// - `submit` signals the slot's fence and work-finished semaphore and waits
///   on its image-acquired semaphore.
/// - `restore_fence` returns a reset fence to the signaled state; the
///   protocol calls it when a frame fails between `reset_fence` and a
///   successful `submit`, so the slot's next wait still terminates.
/// - `rebuild_surface` may destroy swapchain-derived resources, so the
///   protocol always calls `wait_all_fences` first.
pub trait FrameDevice {
    fn slot_count(&self) -> usize;

    fn wait_fence(&mut self, slot: usize) -> EngineResult<()>;
    fn reset_fence(&mut self, slot: usize) -> EngineResult<()>;
    fn restore_fence(&mut self, slot: usize) -> EngineResult<()>;

    fn acquire_image(&mut self, slot: usize) -> EngineResult<ImageAcquire>;

    /// Re-records the slot's command buffer (begin/end bracketed) with this
    /// frame's draw work.
    fn record(&mut self, slot: usize, image: u32, plan: &FramePlan) -> EngineResult<()>;

    fn submit(&mut self, slot: usize) -> EngineResult<()>;
    fn present(&mut self, slot: usize, image: u32) -> EngineResult<PresentStatus>;

    fn rebuild_surface(&mut self, width: u32, height: u32) -> EngineResult<()>;
    fn wait_all_fences(&mut self) -> EngineResult<()>;
}

/// Drives the per-frame synchronization protocol over N frame slots.
///
/// Slots rotate round-robin; the blocking fence wait at the top of each frame
/// is the only CPU throttle point and bounds the CPU's lead over the GPU to
/// N-1 frames. An acquired image index is used only within the frame that
/// acquired it.
pub struct FrameSync<D: FrameDevice> {
    device: D,
    current: usize,
    /// Extent to rebuild against before the next acquire, set by a resize
    /// request or a stale present.
    pending_rebuild: Option<(u32, u32)>,
    extent: (u32, u32),
}

impl<D: FrameDevice> FrameSync<D> {
    pub fn new(device: D, width: u32, height: u32) -> Self {
        debug_assert!(device.slot_count() > 0);
        Self {
            device,
            current: 0,
            pending_rebuild: None,
            extent: (width, height),
        }
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    #[inline]
    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// Schedules a swapchain rebuild before the next acquire. Cheap; the
    /// actual rebuild happens on the frame path behind a full fence wait.
    pub fn request_rebuild(&mut self, width: u32, height: u32) {
        self.extent = (width, height);
        self.pending_rebuild = Some((width, height));
    }

    /// Waits for all in-flight work. Must precede any teardown.
    pub fn wait_idle(&mut self) -> EngineResult<()> {
        self.device.wait_all_fences()
    }

    /// Runs one frame: fence wait, acquire (with one rebuild-and-retry on a
    /// stale surface), record, submit, present. The slot index advances only
    /// after a successful submit, so a skipped frame leaves its slot's fence
    /// signaled and reusable.
    pub fn render_frame(&mut self, plan: &FramePlan) -> EngineResult<FrameOutcome> {
        if let Some((w, h)) = self.pending_rebuild.take() {
            self.rebuild(w, h)?;
        }

        let slot = self.current;
        debug_assert!(slot < self.device.slot_count());

        // Throttle point: block until the GPU released this slot.
        self.device.wait_fence(slot)?;

        let image = match self.device.acquire_image(slot)? {
            ImageAcquire::Acquired(i) => i,
            ImageAcquire::OutOfDate => {
                let (w, h) = self.extent;
                self.rebuild(w, h)?;
                match self.device.acquire_image(slot)? {
                    ImageAcquire::Acquired(i) => i,
                    ImageAcquire::OutOfDate => {
                        log::warn!("surface still out of date after rebuild; skipping frame");
                        return Ok(FrameOutcome::Skipped);
                    }
                }
            }
        };

        // Only reset once we know the slot will be resubmitted; resetting
        // before a skipped frame would deadlock the next wait.
        self.device.reset_fence(slot)?;

        // Between reset and a successful submit the fence has no signaler;
        // a failure in this window must re-signal it before surfacing, or
        // the slot's next wait never returns.
        if let Err(e) = self.device.record(slot, image, plan) {
            self.restore_slot(slot);
            return Err(e);
        }
        if let Err(e) = self.device.submit(slot) {
            self.restore_slot(slot);
            return Err(e);
        }

        self.current = (slot + 1) % self.device.slot_count();

        match self.device.present(slot, image)? {
            PresentStatus::Presented => {}
            PresentStatus::OutOfDate => {
                let (w, h) = self.extent;
                self.pending_rebuild = Some((w, h));
            }
        }

        Ok(FrameOutcome::Presented)
    }

    fn restore_slot(&mut self, slot: usize) {
        if let Err(e) = self.device.restore_fence(slot) {
            log::error!("slot {slot} fence not restored after dropped frame: {e}");
        }
    }

    /// Swapchain-derived resources are shared by every slot; never rebuild
    /// while any fence is pending.
    fn rebuild(&mut self, width: u32, height: u32) -> EngineResult<()> {
        self.device.wait_all_fences()?;
        self.device.rebuild_surface(width, height)?;
        self.extent = (width, height);
        Ok(())
    }
}
