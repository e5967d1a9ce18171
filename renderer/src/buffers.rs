use crate::VertexBufferLayout;

/// Handle to a buffer tracked by the renderer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct BufferId(pub generational_arena::Index);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

#[derive(Clone, Debug)]
pub struct BufferDescriptor {
    pub label: String,
    /// Size of the buffer in bytes.
    pub size: u64,
    pub usage: BufferUsage,
    /// Number of vertices or indices stored in the buffer.
    pub element_count: u32,
    /// Only set for vertex buffers.
    pub layout: Option<VertexBufferLayout>,
}
