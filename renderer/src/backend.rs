use crate::{
    BufferDescriptor, BufferId, Command, FrameStats, RenderTargetDescriptor, RenderTargetId,
};

/// The device that actually executes recorded work.
pub trait Backend {
    fn create_buffer(&mut self, id: BufferId, descriptor: &BufferDescriptor, contents: &[u8]);

    fn destroy_buffer(&mut self, id: BufferId);

    fn create_render_target(&mut self, id: RenderTargetId, descriptor: &RenderTargetDescriptor);

    /// Execute the commands of a single frame.
    fn execute(&mut self, commands: &[Command]) -> FrameStats;

    fn log_summary(&self) {}
}

/// A headless backend that only keeps statistics.
#[derive(Debug, Default)]
pub struct StatsBackend {
    /// Bytes uploaded over the lifetime of the backend.
    pub uploaded_bytes: u64,
    pub live_buffers: usize,
    pub render_targets: usize,
    /// Render targets with a depth format, included in `render_targets`.
    pub depth_targets: usize,
    pub frames: u64,
    pub totals: FrameStats,
}

impl Backend for StatsBackend {
    fn create_buffer(&mut self, _id: BufferId, descriptor: &BufferDescriptor, contents: &[u8]) {
        debug_assert_eq!(descriptor.size, contents.len() as u64);
        self.uploaded_bytes += contents.len() as u64;
        self.live_buffers += 1;
    }

    fn destroy_buffer(&mut self, _id: BufferId) {
        self.live_buffers = self.live_buffers.saturating_sub(1);
    }

    fn create_render_target(&mut self, _id: RenderTargetId, descriptor: &RenderTargetDescriptor) {
        self.render_targets += 1;
        if descriptor.format.is_depth() {
            self.depth_targets += 1;
        }
    }

    fn execute(&mut self, commands: &[Command]) -> FrameStats {
        let stats = FrameStats::from_commands(commands);
        self.frames += 1;
        self.totals += stats;
        stats
    }

    fn log_summary(&self) {
        tracing::info!(
            "Backend executed {} frames: {} passes, {} draws, {} primitives.",
            self.frames,
            self.totals.passes,
            self.totals.draw_calls,
            self.totals.primitives
        );
        tracing::info!(
            "Uploaded {} bytes, {} buffers still alive, {} render targets ({} depth).",
            self.uploaded_bytes,
            self.live_buffers,
            self.render_targets,
            self.depth_targets
        );
    }
}
