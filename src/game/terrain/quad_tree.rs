use glam::{Mat4, UVec2, Vec3};
use renderer::{BufferId, PrimitiveTopology};

use crate::game::{
    height_field::HeightField,
    math::{BoundingBox, Frustum, Plane, PlaneSide},
    render::{chunks::RenderOrder, materials::MaterialId, mesh::Mesh, provider::ChunkCollector},
};

use super::{
    Lod,
    patch::{PatchLod, TerrainPatch},
    vertex::TerrainVertex,
};

pub type NodeId = usize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuadTreeError {
    #[error("Minimum leaf size must be a power of two, got {0}")]
    LeafSizeNotPowerOfTwo(u32),

    #[error("Quad trees need a square height field, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },

    #[error("Height field with {0} samples is too small for a quad tree")]
    TooSmall(u64),
}

#[derive(Debug)]
pub enum NodeKind {
    /// Top-left, top-right, bottom-left, bottom-right.
    Branch([NodeId; 4]),
    Leaf(TerrainPatch),
}

#[derive(Debug)]
pub struct Node {
    /// First sample covered by this node.
    pub offset: UVec2,
    /// Samples along each side. Neighbouring nodes share their edge samples.
    pub width: u32,
    pub bounding_box: BoundingBox,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn patch(&self) -> Option<&TerrainPatch> {
        match &self.kind {
            NodeKind::Leaf(patch) => Some(patch),
            NodeKind::Branch(_) => None,
        }
    }
}

/// Values shared by every chunk emitted during a query.
pub struct LeafDrawParams<'a> {
    pub vertex_buffer: BufferId,
    pub material: MaterialId,
    pub technique: &'a str,
    /// Technique used for leaves closer than the given distance to the camera.
    pub detailed: Option<(f32, &'a str)>,
    /// Wireframe mesh and material to outline visible leaves with.
    pub bounding_boxes: Option<(&'a Mesh, MaterialId)>,
}

/// Hierarchy of square regions over a height field.
#[derive(Debug)]
pub struct QuadTree {
    nodes: Vec<Node>,
    root: NodeId,
    /// Width of every leaf in samples.
    leaf_width: u32,
}

impl QuadTree {
    /// Build the shape of the tree and the bounds of every node. Vertex data is created separately
    /// by [QuadTree::bake_vertices].
    pub fn build(height_field: &HeightField, min_leaf_size: u32) -> Result<Self, QuadTreeError> {
        if !min_leaf_size.is_power_of_two() {
            return Err(QuadTreeError::LeafSizeNotPowerOfTwo(min_leaf_size));
        }

        let size = height_field.size();
        if size.x != size.y {
            return Err(QuadTreeError::NotSquare {
                width: size.x,
                height: size.y,
            });
        }

        let width = side_length(size)?;

        let mut tree = Self {
            nodes: Vec::default(),
            root: 0,
            leaf_width: 0,
        };
        tree.root = tree.build_node(height_field, min_leaf_size, UVec2::ZERO, width);

        tracing::info!(
            "Built terrain quad tree with {} nodes ({} leaves of {}x{} samples).",
            tree.node_count(),
            tree.leaves().count(),
            tree.leaf_width,
            tree.leaf_width,
        );

        Ok(tree)
    }

    fn build_node(
        &mut self,
        height_field: &HeightField,
        min_leaf_size: u32,
        offset: UVec2,
        width: u32,
    ) -> NodeId {
        let cells = (width - 1) as u64;
        let is_leaf = cells * cells <= min_leaf_size as u64;

        let (kind, bounding_box) = if is_leaf {
            self.leaf_width = width;

            let scale = height_field.scale();
            let (min_height, max_height) = height_field.min_max(offset, width);
            let far = offset + UVec2::splat(width - 1);
            let bounding_box = BoundingBox::new(
                Vec3::new(offset.x as f32 * scale, min_height, offset.y as f32 * scale),
                Vec3::new(far.x as f32 * scale, max_height, far.y as f32 * scale),
            );

            (NodeKind::Leaf(TerrainPatch::default()), bounding_box)
        } else {
            let half = width / 2;
            let child_width = half + 1;

            let children = [
                UVec2::new(0, 0),
                UVec2::new(half, 0),
                UVec2::new(0, half),
                UVec2::new(half, half),
            ]
            .map(|child_offset| {
                self.build_node(height_field, min_leaf_size, offset + child_offset, child_width)
            });

            // Children along the far edges reach one sample past the parent.
            let bounding_box = children[1..]
                .iter()
                .fold(self.nodes[children[0]].bounding_box, |b, &child| {
                    b.union(&self.nodes[child].bounding_box)
                });

            (NodeKind::Branch(children), bounding_box)
        };

        let id = self.nodes.len();
        self.nodes.push(Node {
            offset,
            width,
            bounding_box,
            kind,
        });
        id
    }

    pub fn root(&self) -> &Node {
        &self.nodes[self.root]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_width(&self) -> u32 {
        self.leaf_width
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    /// Create the vertices for every leaf and record where each leaf's vertices start in the
    /// returned list.
    pub fn bake_vertices(&mut self, height_field: &HeightField) -> Vec<TerrainVertex> {
        let per_leaf = (self.leaf_width * self.leaf_width) as usize;
        let mut vertices = Vec::with_capacity(per_leaf * self.leaves().count());

        for node in self.nodes.iter_mut() {
            let NodeKind::Leaf(patch) = &mut node.kind else {
                continue;
            };

            let start = vertices.len() as u32;
            for z in 0..node.width {
                for x in 0..node.width {
                    let coord = (node.offset + UVec2::new(x, z)).as_ivec2();
                    vertices.push(TerrainVertex {
                        position: height_field.world_position(coord),
                        normal: height_field.normal(coord),
                    });
                }
            }
            patch.vertex_range = start..vertices.len() as u32;
        }

        vertices
    }

    /// Add an index buffer for `lod` to every leaf and resolve the fallbacks again.
    pub fn add_patch_lod(&mut self, lod: Lod, patch_lod: PatchLod) {
        for node in self.nodes.iter_mut() {
            if let NodeKind::Leaf(patch) = &mut node.kind {
                patch.add_lod(lod, patch_lod);
            }
        }
        self.setup_lods();
    }

    pub fn has_explicit_lod(&self, lod: Lod) -> bool {
        self.leaves()
            .filter_map(Node::patch)
            .all(|patch| patch.has_explicit_lod(lod))
    }

    /// Resolve the LOD slots of every leaf.
    pub fn setup_lods(&mut self) {
        self.setup_lods_at(self.root);
    }

    fn setup_lods_at(&mut self, node_id: NodeId) {
        let children = match &mut self.nodes[node_id].kind {
            NodeKind::Leaf(patch) => {
                patch.setup_lods();
                return;
            }
            NodeKind::Branch(children) => *children,
        };

        for child in children {
            self.setup_lods_at(child);
        }
    }

    /// Call `f` for every leaf not excluded by the clip plane and inside the frustum. Subtrees that
    /// fail either test are skipped entirely.
    pub fn visit_visible_leaves<F>(&self, frustum: &Frustum, clip_plane: Option<&Plane>, mut f: F)
    where
        F: FnMut(&Node),
    {
        self.visit_node(self.root, frustum, clip_plane, &mut f);
    }

    fn visit_node<F>(
        &self,
        node_id: NodeId,
        frustum: &Frustum,
        clip_plane: Option<&Plane>,
        f: &mut F,
    )
    where
        F: FnMut(&Node),
    {
        let node = &self.nodes[node_id];

        if let Some(plane) = clip_plane {
            if plane.classify_box(&node.bounding_box) == PlaneSide::Back {
                return;
            }
        }

        if !frustum.intersects_bounding_box(&node.bounding_box) {
            return;
        }

        match &node.kind {
            NodeKind::Leaf(_) => f(node),
            NodeKind::Branch(children) => {
                for &child in children {
                    self.visit_node(child, frustum, clip_plane, f);
                }
            }
        }
    }

    /// Emit a geometry chunk for every visible leaf at the requested LOD.
    pub fn query_render_chunks(
        &self,
        frustum: &Frustum,
        clip_plane: Option<&Plane>,
        lod: Lod,
        params: &LeafDrawParams,
        chunks: &mut ChunkCollector,
    ) {
        let reference = frustum.near_corner();

        self.visit_visible_leaves(frustum, clip_plane, |node| {
            let Some(patch) = node.patch() else {
                return;
            };
            let Some(patch_lod) = patch.lod(lod) else {
                return;
            };

            let technique = match params.detailed {
                Some((distance, detailed))
                    if node.bounding_box.distance_to_point(reference) < distance =>
                {
                    detailed
                }
                _ => params.technique,
            };

            let chunk = chunks.geometry();
            chunk.vertex_buffer = Some(params.vertex_buffer);
            chunk.index_buffer = Some(patch_lod.index_buffer);
            chunk.base_vertex = patch.vertex_range.start;
            chunk.vertex_count = patch.vertex_range.end - patch.vertex_range.start;
            chunk.primitive_count = patch_lod.primitive_count;
            chunk.topology = PrimitiveTopology::TriangleList;
            chunk.world = Mat4::IDENTITY;
            chunk.material = Some(params.material);
            chunk.technique.push_str(technique);
            chunk.receives_shadows = true;

            if let Some((mesh, material)) = params.bounding_boxes {
                let chunk = chunks.geometry();
                chunk.vertex_buffer = Some(mesh.vertex_buffer);
                chunk.index_buffer = Some(mesh.index_buffer);
                chunk.vertex_count = mesh.vertex_count;
                chunk.primitive_count = mesh.primitive_count;
                chunk.topology = mesh.topology;
                chunk.world = node.bounding_box.unit_cube_transform();
                chunk.material = Some(material);
                chunk.technique.push_str("BoundingBox");
                chunk.render_order = RenderOrder::RenderLast;
            }
        });
    }
}

/// Side length of the square covered by `size` samples. Counted in 64 bits so the largest
/// height fields don't wrap.
fn side_length(size: UVec2) -> Result<u32, QuadTreeError> {
    let sample_count = size.x as u64 * size.y as u64;
    let width = sample_count.isqrt();
    if width < 2 {
        return Err(QuadTreeError::TooSmall(sample_count));
    }
    Ok(width as u32)
}
