//! Materials and per-LOD model descriptions
//!
//! A material either carries a time uniform or it does not. Shader time
//! propagation is an optional-capability check: `set_time` on a material
//! without the uniform is a no-op, so the view system can sweep every
//! auxiliary material slot without caring which shaders are animated.

/// Opaque handle to geometry owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

/// A shader material, possibly carrying a `time_elapsed` uniform.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    name: String,
    /// Present only when the shader declares the uniform.
    time_elapsed: Option<f32>,
}

impl Material {
    /// Create a material without a time uniform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_elapsed: None,
        }
    }

    /// Declare the time uniform, initialized to 0.
    pub fn with_time_uniform(mut self) -> Self {
        self.time_elapsed = Some(0.0);
        self
    }

    /// Material name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this material carries a time uniform.
    pub fn has_time_uniform(&self) -> bool {
        self.time_elapsed.is_some()
    }

    /// Set the time uniform. No-op for materials without one.
    pub fn set_time(&mut self, time_elapsed: f32) {
        if let Some(t) = self.time_elapsed.as_mut() {
            *t = time_elapsed;
        }
    }

    /// Current time uniform value, if the material has one.
    pub fn time(&self) -> Option<f32> {
        self.time_elapsed
    }
}

/// Geometry and materials for one LOD level of a view.
///
/// The base material draws the instances; the auxiliary slots cover the
/// shadow and depth-prepass passes and may be absent.
#[derive(Clone, Debug)]
pub struct LodModel {
    pub geometry: GeometryHandle,
    pub material: Material,
    /// Shadow-map depth pass material.
    pub custom_depth_material: Option<Material>,
    /// Point-light shadow distance pass material.
    pub custom_distance_material: Option<Material>,
    /// Depth-prepass material.
    pub depth_prepass_material: Option<Material>,
}

impl LodModel {
    /// Create a model with just a base material.
    pub fn new(geometry: GeometryHandle, material: Material) -> Self {
        Self {
            geometry,
            material,
            custom_depth_material: None,
            custom_distance_material: None,
            depth_prepass_material: None,
        }
    }

    /// Set the shadow-depth material.
    pub fn with_custom_depth_material(mut self, material: Material) -> Self {
        self.custom_depth_material = Some(material);
        self
    }

    /// Set the shadow-distance material.
    pub fn with_custom_distance_material(mut self, material: Material) -> Self {
        self.custom_distance_material = Some(material);
        self
    }

    /// Set the depth-prepass material.
    pub fn with_depth_prepass_material(mut self, material: Material) -> Self {
        self.depth_prepass_material = Some(material);
        self
    }
}
