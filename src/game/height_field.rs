use std::path::Path;

use glam::{IVec2, UVec2, Vec3};

#[derive(Debug, thiserror::Error)]
pub enum HeightFieldError {
    #[error("Height field dimensions must be powers of two, got {width}x{height}")]
    NotPowerOfTwo { width: u32, height: u32 },

    #[error("Expected {expected} height samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },

    #[error("PCX height maps must be paletted")]
    NotPaletted,

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image load error: {0}")]
    Image(#[from] image::ImageError),
}

/// A grid of height samples with derived normals.
///
/// Samples are spaced `scale` world units apart on the X and Z axes. Heights are stored in world
/// units along Y.
pub struct HeightField {
    /// Samples along X and Z.
    size: UVec2,
    scale: f32,
    heights: Vec<f32>,
    normals: Vec<Vec3>,
}

impl HeightField {
    /// Create a height field from samples in world units, stored row by row (X fastest).
    pub fn from_samples(
        size: UVec2,
        scale: f32,
        heights: Vec<f32>,
    ) -> Result<Self, HeightFieldError> {
        if !size.x.is_power_of_two() || !size.y.is_power_of_two() {
            return Err(HeightFieldError::NotPowerOfTwo {
                width: size.x,
                height: size.y,
            });
        }

        let expected = size.x as usize * size.y as usize;
        if heights.len() != expected {
            return Err(HeightFieldError::SampleCount {
                expected,
                actual: heights.len(),
            });
        }

        let mut height_field = Self {
            size,
            scale,
            heights,
            normals: Vec::default(),
        };
        height_field.compute_normals();

        Ok(height_field)
    }

    /// Load a height map image. Values are normalized to 0..1 and multiplied by
    /// `elevation_strength`.
    pub fn from_image(
        path: impl AsRef<Path>,
        scale: f32,
        elevation_strength: f32,
    ) -> Result<Self, HeightFieldError> {
        let path = path.as_ref();

        let is_pcx = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pcx"));

        let (size, normalized) = if is_pcx {
            let data = std::fs::read(path)?;
            read_pcx(&data)?
        } else {
            let image = image::open(path)?.to_luma16();
            let size = UVec2::new(image.width(), image.height());
            let normalized = image
                .as_raw()
                .iter()
                .map(|&v| v as f32 / u16::MAX as f32)
                .collect();
            (size, normalized)
        };

        tracing::info!(
            "Loaded height map {} ({}x{}).",
            path.display(),
            size.x,
            size.y
        );

        Self::from_samples(
            size,
            scale,
            normalized
                .into_iter()
                .map(|v: f32| v * elevation_strength)
                .collect(),
        )
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Height of a sample. Coordinates outside the grid are clamped to the nearest edge.
    pub fn sample(&self, coord: IVec2) -> f32 {
        self.heights[self.index(coord)]
    }

    /// Normal of a sample. Coordinates outside the grid are clamped to the nearest edge.
    pub fn normal(&self, coord: IVec2) -> Vec3 {
        self.normals[self.index(coord)]
    }

    fn index(&self, coord: IVec2) -> usize {
        let x = coord.x.clamp(0, self.size.x as i32 - 1);
        let y = coord.y.clamp(0, self.size.y as i32 - 1);
        y as usize * self.size.x as usize + x as usize
    }

    /// World position of a sample.
    pub fn world_position(&self, coord: IVec2) -> Vec3 {
        Vec3::new(
            coord.x as f32 * self.scale,
            self.sample(coord),
            coord.y as f32 * self.scale,
        )
    }

    /// Lowest and highest sample in the square region starting at `offset` with `width` samples
    /// along each side.
    pub fn min_max(&self, offset: UVec2, width: u32) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;

        for z in offset.y..offset.y + width {
            for x in offset.x..offset.x + width {
                let h = self.sample(IVec2::new(x as i32, z as i32));
                min = min.min(h);
                max = max.max(h);
            }
        }

        (min, max)
    }

    /// Average every sample with its neighbours, `passes` times, then rebuild the normals.
    pub fn smooth(&mut self, passes: u32) {
        if passes == 0 {
            return;
        }

        let mut scratch = vec![0.0; self.heights.len()];

        for _ in 0..passes {
            for z in 0..self.size.y as i32 {
                for x in 0..self.size.x as i32 {
                    let mut sum = 0.0;
                    for dz in -1..=1 {
                        for dx in -1..=1 {
                            sum += self.sample(IVec2::new(x + dx, z + dz));
                        }
                    }
                    scratch[self.index(IVec2::new(x, z))] = sum / 9.0;
                }
            }
            std::mem::swap(&mut self.heights, &mut scratch);
        }

        self.compute_normals();
    }

    fn compute_normals(&mut self) {
        let mut normals = Vec::with_capacity(self.heights.len());

        for z in 0..self.size.y as i32 {
            for x in 0..self.size.x as i32 {
                let left = self.sample(IVec2::new(x - 1, z));
                let right = self.sample(IVec2::new(x + 1, z));
                let back = self.sample(IVec2::new(x, z - 1));
                let front = self.sample(IVec2::new(x, z + 1));

                normals.push(Vec3::new(left - right, 2.0 * self.scale, back - front).normalize());
            }
        }

        self.normals = normals;
    }

    /// Split a world position into the grid cell and the fractional position inside it. Returns
    /// `None` outside the height field.
    fn cell_at(&self, x: f32, z: f32) -> Option<(IVec2, f32, f32)> {
        let gx = x / self.scale;
        let gz = z / self.scale;

        // Written so NaN fails the check.
        let inside = gx >= 0.0
            && gz >= 0.0
            && gx < (self.size.x - 1) as f32
            && gz < (self.size.y - 1) as f32;
        if !inside {
            return None;
        }

        let cell = IVec2::new(gx.floor() as i32, gz.floor() as i32);
        Some((cell, gx.fract(), gz.fract()))
    }

    /// Interpolated terrain height at a world position.
    ///
    /// Each cell is split into two triangles. The upper left triangle is used when
    /// `fx + fz < 1`, the lower right one otherwise.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let (cell, fx, fz) = self.cell_at(x, z)?;

        let h00 = self.sample(cell);
        let h10 = self.sample(cell + IVec2::X);
        let h01 = self.sample(cell + IVec2::Y);
        let h11 = self.sample(cell + IVec2::ONE);

        Some(if fx + fz < 1.0 {
            h00 + fx * (h10 - h00) + fz * (h01 - h00)
        } else {
            h11 + (1.0 - fx) * (h01 - h11) + (1.0 - fz) * (h10 - h11)
        })
    }

    /// Interpolated terrain normal at a world position.
    pub fn normal_at(&self, x: f32, z: f32) -> Option<Vec3> {
        let (cell, fx, fz) = self.cell_at(x, z)?;

        let n00 = self.normal(cell);
        let n10 = self.normal(cell + IVec2::X);
        let n01 = self.normal(cell + IVec2::Y);
        let n11 = self.normal(cell + IVec2::ONE);

        let top = n00.lerp(n10, fx);
        let bottom = n01.lerp(n11, fx);
        Some(top.lerp(bottom, fz).normalize())
    }
}

/// Read a paletted PCX image. Elevations are stored inverted (0 is the highest point).
fn read_pcx(data: &[u8]) -> Result<(UVec2, Vec<f32>), HeightFieldError> {
    let mut reader = pcx::Reader::from_mem(data)?;

    let size = UVec2::new(reader.width() as u32, reader.height() as u32);
    if !reader.is_paletted() {
        return Err(HeightFieldError::NotPaletted);
    }

    let mut row = vec![0_u8; size.x as usize];
    let mut normalized = Vec::with_capacity(size.x as usize * size.y as usize);
    for _ in 0..size.y {
        reader.next_row_paletted(&mut row)?;
        normalized.extend(row.iter().map(|&i| (u8::MAX - i) as f32 / u8::MAX as f32));
    }

    Ok((size, normalized))
}
