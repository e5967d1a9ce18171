/// Describes a vertex buffer layout using renderer-owned types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attributes: &'static [VertexAttribute],
}

impl VertexBufferLayout {
    /// Find the attribute bound to the given shader location.
    pub fn attribute_at(&self, shader_location: u32) -> Option<&VertexAttribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.shader_location == shader_location)
    }

    /// Returns true if every attribute fits inside the stride and no two attributes overlap.
    pub fn is_packed(&self) -> bool {
        let mut ranges: Vec<(u64, u64)> = self
            .attributes
            .iter()
            .map(|a| (a.offset, a.offset + a.format.size()))
            .collect();
        ranges.sort_by_key(|r| r.0);

        ranges.iter().all(|r| r.1 <= self.array_stride)
            && ranges.windows(2).all(|w| w[0].1 <= w[1].0)
    }
}

/// Trait implemented by types that can provide a vertex buffer layout.
pub trait AsVertexLayout {
    /// Returns the vertex buffer layout for this type.
    fn vertex_buffer_layout() -> VertexBufferLayout;
}

/// Describes one vertex attribute using renderer-owned types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VertexAttribute {
    pub format: VertexFormat,
    pub offset: u64,
    pub shader_location: u32,
}

/// Vertex input stepping mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VertexStepMode {
    Vertex,
    Instance,
}

/// Vertex attribute format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Uint32x2,
    Uint32x3,
    Uint32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
}

impl VertexFormat {
    /// Size of the attribute in bytes.
    pub const fn size(self) -> u64 {
        match self {
            Self::Float32 | Self::Uint32 | Self::Sint32 => 4,
            Self::Float32x2 | Self::Uint32x2 | Self::Sint32x2 => 8,
            Self::Float32x3 | Self::Uint32x3 | Self::Sint32x3 => 12,
            Self::Float32x4 | Self::Uint32x4 | Self::Sint32x4 => 16,
        }
    }
}
