/// Handle to an offscreen render target tracked by the renderer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RenderTargetId(pub generational_arena::Index);

/// Renderer-owned texture format for render targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextureFormat {
    Rgba8UnormSrgb,
    Rgba16Float,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float)
    }
}

#[derive(Clone, Debug)]
pub struct RenderTargetDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Where a pass writes its output.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RenderTarget {
    /// The presentable surface.
    Surface,
    Offscreen(RenderTargetId),
}
