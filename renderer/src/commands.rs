use glam::{Mat4, Vec4};

use crate::{BufferId, RenderTarget, RenderTargetId};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    LineList,
}

impl PrimitiveTopology {
    /// Amount of indices (or vertices) consumed by a single primitive.
    pub const fn vertices_per_primitive(self) -> u32 {
        match self {
            Self::TriangleList => 3,
            Self::LineList => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    ColorDepth { color: Vec4, depth: f32 },
    Depth(f32),
}

/// A single draw issued inside a pass.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub vertex_buffer: BufferId,
    pub index_buffer: Option<BufferId>,
    /// Added to every index before fetching a vertex.
    pub base_vertex: u32,
    pub vertex_count: u32,
    pub start_index: u32,
    pub primitive_count: u32,
    pub topology: PrimitiveTopology,
    pub instance_count: u32,
    pub world: Mat4,
    pub technique: String,
    /// Textures bound for this draw, in slot order.
    pub textures: Vec<RenderTargetId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BeginPass {
        label: String,
        target: RenderTarget,
        clear: Option<ClearValue>,
    },
    /// World space clip plane as `(normal, distance)`, or `None` to disable clipping.
    SetClipPlane(Option<Vec4>),
    Draw(DrawCall),
    EndPass,
}

impl Command {
    pub(crate) fn referenced_buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        let (vertex, index) = match self {
            Command::Draw(draw) => (Some(draw.vertex_buffer), draw.index_buffer),
            _ => (None, None),
        };
        vertex.into_iter().chain(index)
    }
}

/// Commands recorded for a single frame.
#[derive(Debug, Default)]
pub struct Frame {
    pub(crate) index: u64,
    pub(crate) commands: Vec<Command>,
}

impl Frame {
    /// Sequence number of the frame, starting at 0.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Start a new pass. The pass is closed when the returned encoder is dropped.
    pub fn begin_pass(
        &mut self,
        label: impl Into<String>,
        target: RenderTarget,
        clear: Option<ClearValue>,
    ) -> PassEncoder<'_> {
        self.commands.push(Command::BeginPass {
            label: label.into(),
            target,
            clear,
        });
        PassEncoder { frame: self }
    }
}

pub struct PassEncoder<'f> {
    frame: &'f mut Frame,
}

impl PassEncoder<'_> {
    pub fn set_clip_plane(&mut self, plane: Option<Vec4>) {
        self.frame.commands.push(Command::SetClipPlane(plane));
    }

    pub fn draw(&mut self, draw: DrawCall) {
        self.frame.commands.push(Command::Draw(draw));
    }
}

impl Drop for PassEncoder<'_> {
    fn drop(&mut self) {
        self.frame.commands.push(Command::EndPass);
    }
}

/// Totals for a submitted frame.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub passes: u32,
    pub draw_calls: u32,
    pub primitives: u64,
}

impl FrameStats {
    pub fn from_commands(commands: &[Command]) -> Self {
        commands
            .iter()
            .fold(Self::default(), |mut stats, command| {
                match command {
                    Command::BeginPass { .. } => stats.passes += 1,
                    Command::Draw(draw) => {
                        stats.draw_calls += 1;
                        stats.primitives +=
                            draw.primitive_count as u64 * draw.instance_count.max(1) as u64;
                    }
                    Command::SetClipPlane(_) | Command::EndPass => {}
                }
                stats
            })
    }
}

impl std::ops::AddAssign for FrameStats {
    fn add_assign(&mut self, rhs: Self) {
        self.passes += rhs.passes;
        self.draw_calls += rhs.draw_calls;
        self.primitives += rhs.primitives;
    }
}
