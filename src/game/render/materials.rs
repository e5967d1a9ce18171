use ahash::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(u32);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Missing material \"{0}\"")]
pub struct MissingMaterial(pub String);

/// A named set of shader techniques.
#[derive(Debug)]
pub struct Material {
    pub name: String,
    techniques: HashSet<String>,
}

impl Material {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        techniques: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            techniques: techniques.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_technique(&self, technique: &str) -> bool {
        self.techniques.contains(technique)
    }
}

#[derive(Default)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    lookup: HashMap<String, MaterialId>,
}

impl MaterialLibrary {
    /// Materials every scene relies on.
    pub fn with_builtin() -> Self {
        let mut library = Self::default();

        library.insert(Material::new(
            "terrain",
            ["Terrain", "TerrainDetailed", "TerrainCameraUnderwater"],
        ));
        library.insert(Material::new("water", ["Water", "WaterCameraUnderwater"]));
        library.insert(Material::new("sky", ["Sky"]));
        library.insert(Material::new("prop", ["Prop", "PropCameraUnderwater", "ShadowMapCreate"]));
        library.insert(Material::new("particles", ["Particles"]));
        library.insert(Material::new(
            "debug",
            ["BoundingBox", "DebugLines", "ShadowMapDebug"],
        ));

        library
    }

    /// Add a material, replacing any material with the same name.
    pub fn insert(&mut self, material: Material) -> MaterialId {
        if let Some(&id) = self.lookup.get(&material.name) {
            self.materials[id.0 as usize] = material;
            return id;
        }

        let id = MaterialId(self.materials.len() as u32);
        self.lookup.insert(material.name.clone(), id);
        self.materials.push(material);
        id
    }

    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.lookup.get(name).copied()
    }

    /// Like [MaterialLibrary::find], but a missing material is an error.
    pub fn require(&self, name: &str) -> Result<MaterialId, MissingMaterial> {
        self.find(name)
            .ok_or_else(|| MissingMaterial(name.to_string()))
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    /// Name of the technique to draw with. Uses `base` followed by `variant` if the material has
    /// it, otherwise falls back to `base`.
    pub fn resolve_technique(&self, id: MaterialId, base: &str, variant: Option<&str>) -> String {
        let Some(variant) = variant else {
            return base.to_string();
        };

        let combined = format!("{base}{variant}");
        match self.get(id) {
            Some(material) if material.has_technique(&combined) => combined,
            Some(material) => {
                tracing::debug!(
                    "Material \"{}\" has no technique \"{combined}\", using \"{base}\".",
                    material.name
                );
                base.to_string()
            }
            None => base.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        let library = MaterialLibrary::with_builtin();
        let terrain = library.find("terrain").unwrap();
        assert_eq!(library.get(terrain).unwrap().name, "terrain");
        assert!(library.find("marble").is_none());
        assert_eq!(
            library.require("marble"),
            Err(MissingMaterial("marble".to_string()))
        );
    }

    #[test]
    fn insert_replaces_by_name() {
        let mut library = MaterialLibrary::default();
        let a = library.insert(Material::new("rock", ["Rock"]));
        let b = library.insert(Material::new("rock", ["Rock", "RockCameraUnderwater"]));
        assert_eq!(a, b);
        assert!(library.get(a).unwrap().has_technique("RockCameraUnderwater"));
    }

    #[test]
    fn technique_variants_fall_back() {
        let library = MaterialLibrary::with_builtin();
        let water = library.find("water").unwrap();
        let sky = library.find("sky").unwrap();

        assert_eq!(
            library.resolve_technique(water, "Water", Some("CameraUnderwater")),
            "WaterCameraUnderwater"
        );
        assert_eq!(library.resolve_technique(sky, "Sky", Some("CameraUnderwater")), "Sky");
        assert_eq!(library.resolve_technique(water, "Water", None), "Water");
    }
}
