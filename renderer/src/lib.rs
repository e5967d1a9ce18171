//! A registry of GPU resources and a recorder for the draw commands issued against them.
//!
//! Resources live in generational arenas so stale handles are detected instead of aliasing a
//! newer resource. The actual device sits behind [Backend].

mod backend;
mod buffers;
mod commands;
mod targets;
mod vertex_layouts;

pub use backend::*;
pub use buffers::*;
pub use commands::*;
pub use targets::*;
pub use vertex_layouts::*;

use generational_arena::Arena;

pub struct Renderer {
    backend: Box<dyn Backend>,

    buffers: Arena<BufferEntry>,
    render_targets: Arena<RenderTargetEntry>,

    /// Index of the next frame handed out by [Renderer::begin_frame].
    next_frame: u64,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Box::new(StatsBackend::default()))
    }
}

impl Renderer {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            buffers: Arena::default(),
            render_targets: Arena::default(),
            next_frame: 0,
        }
    }

    /// Creates a vertex buffer from a slice of vertices and returns its handle.
    pub fn create_vertex_buffer<V>(&mut self, label: &str, vertices: &[V]) -> BufferId
    where
        V: AsVertexLayout + bytemuck::Pod,
    {
        let contents: &[u8] = bytemuck::cast_slice(vertices);
        self.create_buffer(
            BufferDescriptor {
                label: label.to_string(),
                size: contents.len() as u64,
                usage: BufferUsage::Vertex,
                element_count: vertices.len() as u32,
                layout: Some(V::vertex_buffer_layout()),
            },
            contents,
        )
    }

    /// Creates a 32-bit index buffer and returns its handle.
    pub fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> BufferId {
        let contents: &[u8] = bytemuck::cast_slice(indices);
        self.create_buffer(
            BufferDescriptor {
                label: label.to_string(),
                size: contents.len() as u64,
                usage: BufferUsage::Index,
                element_count: indices.len() as u32,
                layout: None,
            },
            contents,
        )
    }

    fn create_buffer(&mut self, descriptor: BufferDescriptor, contents: &[u8]) -> BufferId {
        let id = BufferId(self.buffers.insert(BufferEntry {
            descriptor: descriptor.clone(),
        }));
        self.backend.create_buffer(id, &descriptor, contents);

        tracing::debug!(
            "Created {:?} buffer \"{}\" ({} bytes).",
            descriptor.usage,
            descriptor.label,
            descriptor.size
        );

        id
    }

    /// Destroys a buffer. Returns false if the handle was already stale.
    pub fn destroy_buffer(&mut self, id: BufferId) -> bool {
        if self.buffers.remove(id.0).is_none() {
            return false;
        }
        self.backend.destroy_buffer(id);
        true
    }

    pub fn buffer(&self, id: BufferId) -> Option<&BufferDescriptor> {
        self.buffers.get(id.0).map(|entry| &entry.descriptor)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn create_render_target(&mut self, descriptor: RenderTargetDescriptor) -> RenderTargetId {
        debug_assert!(descriptor.width > 0 && descriptor.height > 0);

        let id = RenderTargetId(self.render_targets.insert(RenderTargetEntry {
            descriptor: descriptor.clone(),
        }));
        self.backend.create_render_target(id, &descriptor);

        tracing::info!(
            "Created render target \"{}\" at {}x{} ({:?}).",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.format
        );

        id
    }

    pub fn render_target(&self, id: RenderTargetId) -> Option<&RenderTargetDescriptor> {
        self.render_targets.get(id.0).map(|entry| &entry.descriptor)
    }

    /// Log whatever the backend tracked over its lifetime.
    pub fn log_summary(&self) {
        self.backend.log_summary();
    }

    pub fn begin_frame(&mut self) -> Frame {
        let frame = Frame {
            index: self.next_frame,
            commands: Vec::default(),
        };
        self.next_frame += 1;
        frame
    }

    /// Hand the frame to the backend. Draws that reference destroyed buffers are dropped.
    pub fn submit(&mut self, mut frame: Frame) -> FrameStats {
        let before = frame.commands.len();
        frame.commands.retain(|command| {
            command
                .referenced_buffers()
                .all(|buffer| self.buffers.contains(buffer.0))
        });

        let dropped = before - frame.commands.len();
        if dropped > 0 {
            tracing::warn!(
                "Dropped {dropped} draw(s) referencing stale buffers in frame {}.",
                frame.index
            );
        }

        self.backend.execute(&frame.commands)
    }
}

struct BufferEntry {
    descriptor: BufferDescriptor,
}

struct RenderTargetEntry {
    descriptor: RenderTargetDescriptor,
}
