use std::ops::Range;

use renderer::BufferId;

use super::Lod;

/// A shared index buffer for one level of detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchLod {
    pub index_buffer: BufferId,
    pub primitive_count: u32,
}

/// Payload of a quad tree leaf.
#[derive(Debug, Default)]
pub struct TerrainPatch {
    /// Range of this patch's vertices in the terrain wide vertex buffer.
    pub vertex_range: Range<u32>,
    /// LODs that were added explicitly.
    explicit: [Option<PatchLod>; Lod::NUM_LODS],
    /// Every slot after [TerrainPatch::setup_lods], including fallbacks.
    resolved: [Option<PatchLod>; Lod::NUM_LODS],
}

impl TerrainPatch {
    pub fn add_lod(&mut self, lod: Lod, patch_lod: PatchLod) {
        self.explicit[lod.index()] = Some(patch_lod);
    }

    pub fn has_explicit_lod(&self, lod: Lod) -> bool {
        self.explicit[lod.index()].is_some()
    }

    /// Fill every slot. Slots coarser than the finest added LOD take the nearest finer one, slots
    /// finer than it take the finest added LOD. Safe to call repeatedly.
    pub fn setup_lods(&mut self) {
        let Some(finest) = (1..Lod::NUM_LODS).find_map(|index| self.explicit[index]) else {
            self.resolved = [None; Lod::NUM_LODS];
            return;
        };

        let mut carry = finest;
        for index in 1..Lod::NUM_LODS {
            if let Some(explicit) = self.explicit[index] {
                carry = explicit;
            }
            self.resolved[index] = Some(carry);
        }
    }

    /// The index buffer used to render the patch at `lod`.
    pub fn lod(&self, lod: Lod) -> Option<PatchLod> {
        self.resolved[lod.index()]
    }
}

/// Triangle list indices for a square patch of `width` x `width` vertices at the given LOD.
///
/// Every cell is split along the same diagonal the height queries use. When the step does not
/// divide the patch, the last row and column of quads are clamped to the edge.
pub fn generate_indices(width: u32, lod: Lod) -> Vec<u32> {
    let cells = width.saturating_sub(1);
    if cells == 0 {
        return Vec::default();
    }

    let step = lod.step().min(cells);
    let quads_per_side = cells.div_ceil(step) as usize;
    let mut indices = Vec::with_capacity(quads_per_side * quads_per_side * 6);

    for z in (0..cells).step_by(step as usize) {
        let z1 = (z + step).min(cells);
        for x in (0..cells).step_by(step as usize) {
            let x1 = (x + step).min(cells);

            let i00 = z * width + x;
            let i10 = z * width + x1;
            let i01 = z1 * width + x;
            let i11 = z1 * width + x1;

            indices.extend([i00, i01, i10, i10, i01, i11]);
        }
    }

    indices
}

#[cfg(test)]
mod tests {
    use renderer::Renderer;
    use strum::IntoEnumIterator;

    use super::*;

    fn patch_lods(count: usize) -> Vec<PatchLod> {
        let mut renderer = Renderer::default();
        (0..count)
            .map(|i| PatchLod {
                index_buffer: renderer.create_index_buffer("lod", &[0, 1, 2]),
                primitive_count: i as u32,
            })
            .collect()
    }

    #[test]
    fn unset_patch_resolves_nothing() {
        let mut patch = TerrainPatch::default();
        patch.setup_lods();
        for lod in Lod::iter() {
            assert!(patch.lod(lod).is_none());
        }
    }

    #[test]
    fn coarser_levels_fall_back_to_finer() {
        let high = patch_lods(1)[0];
        let mut patch = TerrainPatch::default();
        patch.add_lod(Lod::High, high);
        patch.setup_lods();

        assert_eq!(patch.lod(Lod::Low), Some(high));
        for lod in Lod::iter() {
            assert_eq!(patch.lod(lod), Some(high));
        }
    }

    #[test]
    fn finer_levels_take_nearest_coarser() {
        let lods = patch_lods(2);
        let mut patch = TerrainPatch::default();
        patch.add_lod(Lod::Low, lods[0]);
        patch.add_lod(Lod::Minimum, lods[1]);
        patch.setup_lods();

        assert_eq!(patch.lod(Lod::High), Some(lods[0]));
        assert_eq!(patch.lod(Lod::Med), Some(lods[0]));
        assert_eq!(patch.lod(Lod::Low), Some(lods[0]));
        assert_eq!(patch.lod(Lod::Minimum), Some(lods[1]));
    }

    #[test]
    fn gaps_take_the_finer_neighbour() {
        let lods = patch_lods(2);
        let mut patch = TerrainPatch::default();
        patch.add_lod(Lod::High, lods[0]);
        patch.add_lod(Lod::Minimum, lods[1]);
        patch.setup_lods();

        assert_eq!(patch.lod(Lod::Med), Some(lods[0]));
        assert_eq!(patch.lod(Lod::Low), Some(lods[0]));
        assert_eq!(patch.lod(Lod::Minimum), Some(lods[1]));
    }

    #[test]
    fn later_additions_override_fallbacks() {
        let lods = patch_lods(2);
        let mut patch = TerrainPatch::default();
        patch.add_lod(Lod::High, lods[0]);
        patch.setup_lods();
        patch.setup_lods();
        assert_eq!(patch.lod(Lod::Low), Some(lods[0]));

        patch.add_lod(Lod::Low, lods[1]);
        patch.setup_lods();
        assert_eq!(patch.lod(Lod::Med), Some(lods[0]));
        assert_eq!(patch.lod(Lod::Low), Some(lods[1]));
        assert_eq!(patch.lod(Lod::Minimum), Some(lods[1]));
        assert!(!patch.has_explicit_lod(Lod::Minimum));
    }

    #[test]
    fn index_counts() {
        // 4 x 4 cells.
        assert_eq!(generate_indices(5, Lod::High).len(), 4 * 4 * 6);
        assert_eq!(generate_indices(5, Lod::Med).len(), 2 * 2 * 6);
        assert_eq!(generate_indices(5, Lod::Low).len(), 6);
        // The step is clamped to the size of the patch.
        assert_eq!(generate_indices(5, Lod::Minimum).len(), 6);
        assert!(generate_indices(1, Lod::High).is_empty());
    }

    #[test]
    fn indices_stay_inside_the_patch() {
        for lod in Lod::iter() {
            let indices = generate_indices(9, lod);
            assert!(indices.iter().all(|&i| i < 81));
        }
        assert_eq!(&generate_indices(3, Lod::Med), &[0, 6, 2, 2, 6, 8]);
    }

    #[test]
    fn uneven_patches_are_clamped() {
        // 3 x 3 cells at a step of 2 leaves a thinner last row and column.
        let indices = generate_indices(4, Lod::Med);
        assert_eq!(indices.len(), 2 * 2 * 6);
        assert!(indices.iter().all(|&i| i < 16));
        assert_eq!(indices.iter().max(), Some(&15));
    }
}
