use glam::{Mat4, Vec4};
use renderer::RenderTargetId;
use strum::EnumCount;

#[derive(Clone, Copy, Debug, EnumCount, strum::EnumIter)]
pub enum MatrixVariable {
    View,
    Projection,
    ViewProjection,
    LightViewProjection,
    ReflectionViewProjection,
}

#[derive(Clone, Copy, Debug, EnumCount, strum::EnumIter)]
pub enum VectorVariable {
    CameraPosition,
    SunDirection,
    SunColor,
    AmbientColor,
    FogColor,
    /// Clip plane of the current pass as `(normal, distance)`.
    ClipPlane,
}

#[derive(Clone, Copy, Debug, EnumCount, strum::EnumIter)]
pub enum FloatVariable {
    FogStart,
    FogEnd,
    WaterElevation,
    PointLightCount,
}

#[derive(Clone, Copy, Debug, EnumCount, strum::EnumIter)]
pub enum TextureVariable {
    ShadowMap,
    WaterReflection,
    WaterRefraction,
}

/// Values shared by every draw in a frame. Overwritten at the start of each frame.
pub struct ShaderVariables {
    matrices: [Mat4; MatrixVariable::COUNT],
    vectors: [Vec4; VectorVariable::COUNT],
    floats: [f32; FloatVariable::COUNT],
    textures: [Option<RenderTargetId>; TextureVariable::COUNT],
}

impl Default for ShaderVariables {
    fn default() -> Self {
        Self {
            matrices: [Mat4::IDENTITY; MatrixVariable::COUNT],
            vectors: [Vec4::ZERO; VectorVariable::COUNT],
            floats: [0.0; FloatVariable::COUNT],
            textures: [None; TextureVariable::COUNT],
        }
    }
}

impl ShaderVariables {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_matrix(&mut self, variable: MatrixVariable, value: Mat4) {
        self.matrices[variable as usize] = value;
    }

    pub fn matrix(&self, variable: MatrixVariable) -> Mat4 {
        self.matrices[variable as usize]
    }

    pub fn set_vector(&mut self, variable: VectorVariable, value: Vec4) {
        self.vectors[variable as usize] = value;
    }

    pub fn vector(&self, variable: VectorVariable) -> Vec4 {
        self.vectors[variable as usize]
    }

    pub fn set_float(&mut self, variable: FloatVariable, value: f32) {
        self.floats[variable as usize] = value;
    }

    pub fn float(&self, variable: FloatVariable) -> f32 {
        self.floats[variable as usize]
    }

    pub fn set_texture(&mut self, variable: TextureVariable, value: Option<RenderTargetId>) {
        self.textures[variable as usize] = value;
    }

    pub fn texture(&self, variable: TextureVariable) -> Option<RenderTargetId> {
        self.textures[variable as usize]
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn set_and_reset() {
        let mut variables = ShaderVariables::default();
        variables.set_matrix(
            MatrixVariable::View,
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
        );
        variables.set_float(FloatVariable::FogEnd, 500.0);
        variables.set_vector(VectorVariable::SunColor, Vec4::ONE);

        assert_eq!(variables.float(FloatVariable::FogEnd), 500.0);
        assert_eq!(variables.vector(VectorVariable::SunColor), Vec4::ONE);
        assert_eq!(variables.matrix(MatrixVariable::Projection), Mat4::IDENTITY);

        variables.reset();
        assert_eq!(variables.matrix(MatrixVariable::View), Mat4::IDENTITY);
        assert_eq!(variables.float(FloatVariable::FogEnd), 0.0);
        assert!(variables.texture(TextureVariable::ShadowMap).is_none());
    }
}
