mod params;

use serde::{Deserialize, Serialize};

pub use params::{ParamList, ParamValue};

/// A shader-style call: shader name, instance handle and parameters.
/// Shared by integrators, lights, patterns, bxdfs and displacements.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderCall {
    pub shader: String,
    pub handle: String,
    pub params: ParamList,
}

impl ShaderCall {
    pub fn new(shader: impl Into<String>, handle: impl Into<String>, params: ParamList) -> Self {
        Self {
            shader: shader.into(),
            handle: handle.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Torus {
    pub major_radius: f32,
    pub minor_radius: f32,
    pub phi_min: f32,
    pub phi_max: f32,
    pub theta_max: f32,
}

impl Torus {
    pub fn full(major_radius: f32, minor_radius: f32) -> Self {
        Self {
            major_radius,
            minor_radius,
            phi_min: 0.0,
            phi_max: 360.0,
            theta_max: 360.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub radius: f32,
    pub z_min: f32,
    pub z_max: f32,
    pub theta_max: f32,
}

impl Sphere {
    pub fn full(radius: f32) -> Self {
        Self {
            radius,
            z_min: -radius,
            z_max: radius,
            theta_max: 360.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveBasis {
    Linear,
    #[default]
    Cubic,
}

impl CurveBasis {
    pub fn token(self) -> &'static str {
        match self {
            CurveBasis::Linear => "linear",
            CurveBasis::Cubic => "cubic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurveWrap {
    Periodic,
    #[default]
    Nonperiodic,
}

impl CurveWrap {
    pub fn token(self) -> &'static str {
        match self {
            CurveWrap::Periodic => "periodic",
            CurveWrap::Nonperiodic => "nonperiodic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CurveWidths {
    Constant(f32),
    /// One width per curve.
    Uniform(Vec<f32>),
}

/// A batch of curves ready for submission. `points` is flat xyz.
#[derive(Debug, Clone, PartialEq)]
pub struct Curves {
    pub basis: CurveBasis,
    pub nvertices: Vec<u32>,
    pub wrap: CurveWrap,
    pub points: Vec<f32>,
    pub widths: CurveWidths,
}

impl Curves {
    pub fn curve_count(&self) -> usize {
        self.nvertices.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointsPolygons {
    pub nverts: Vec<u32>,
    pub verts: Vec<u32>,
    pub points: Vec<f32>,
    pub st: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Frame,
    World,
    Transform,
    Attribute,
}

impl ScopeKind {
    pub fn label(self) -> &'static str {
        match self {
            ScopeKind::Frame => "Begin",
            ScopeKind::World => "World",
            ScopeKind::Transform => "Transform",
            ScopeKind::Attribute => "Attribute",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEffect {
    Open(ScopeKind),
    Close(ScopeKind),
}

/// One call into the renderer's scene-description interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Begin { name: String },
    End,
    Option { category: String, params: ParamList },
    Display { name: String, driver: String, mode: String },
    Format { width: u32, height: u32, pixel_aspect: f32 },
    Hider { kind: String, params: ParamList },
    ShadingRate(f32),
    PixelVariance(f32),
    Integrator(ShaderCall),
    Projection { kind: String, params: ParamList },
    WorldBegin,
    WorldEnd,
    TransformBegin,
    TransformEnd,
    AttributeBegin,
    AttributeEnd,
    Translate([f32; 3]),
    Rotate { angle: f32, axis: [f32; 3] },
    Scale([f32; 3]),
    Declare { name: String, declaration: String },
    Attribute { category: String, params: ParamList },
    Light(ShaderCall),
    Pattern(ShaderCall),
    Bxdf(ShaderCall),
    Displace(ShaderCall),
    Torus(Torus),
    Sphere(Sphere),
    Curves(Curves),
    Polygon { params: ParamList },
    PointsPolygons(PointsPolygons),
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Begin { .. } => "Begin",
            Request::End => "End",
            Request::Option { .. } => "Option",
            Request::Display { .. } => "Display",
            Request::Format { .. } => "Format",
            Request::Hider { .. } => "Hider",
            Request::ShadingRate(_) => "ShadingRate",
            Request::PixelVariance(_) => "PixelVariance",
            Request::Integrator(_) => "Integrator",
            Request::Projection { .. } => "Projection",
            Request::WorldBegin => "WorldBegin",
            Request::WorldEnd => "WorldEnd",
            Request::TransformBegin => "TransformBegin",
            Request::TransformEnd => "TransformEnd",
            Request::AttributeBegin => "AttributeBegin",
            Request::AttributeEnd => "AttributeEnd",
            Request::Translate(_) => "Translate",
            Request::Rotate { .. } => "Rotate",
            Request::Scale(_) => "Scale",
            Request::Declare { .. } => "Declare",
            Request::Attribute { .. } => "Attribute",
            Request::Light(_) => "Light",
            Request::Pattern(_) => "Pattern",
            Request::Bxdf(_) => "Bxdf",
            Request::Displace(_) => "Displace",
            Request::Torus(_) => "Torus",
            Request::Sphere(_) => "Sphere",
            Request::Curves(_) => "Curves",
            Request::Polygon { .. } => "Polygon",
            Request::PointsPolygons(_) => "PointsPolygons",
        }
    }

    pub fn scope_effect(&self) -> Option<ScopeEffect> {
        match self {
            Request::Begin { .. } => Some(ScopeEffect::Open(ScopeKind::Frame)),
            Request::End => Some(ScopeEffect::Close(ScopeKind::Frame)),
            Request::WorldBegin => Some(ScopeEffect::Open(ScopeKind::World)),
            Request::WorldEnd => Some(ScopeEffect::Close(ScopeKind::World)),
            Request::TransformBegin => Some(ScopeEffect::Open(ScopeKind::Transform)),
            Request::TransformEnd => Some(ScopeEffect::Close(ScopeKind::Transform)),
            Request::AttributeBegin => Some(ScopeEffect::Open(ScopeKind::Attribute)),
            Request::AttributeEnd => Some(ScopeEffect::Close(ScopeKind::Attribute)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_requests_pair_up() {
        let pairs = [
            (Request::Begin { name: "x".to_string() }, Request::End),
            (Request::WorldBegin, Request::WorldEnd),
            (Request::TransformBegin, Request::TransformEnd),
            (Request::AttributeBegin, Request::AttributeEnd),
        ];
        for (open, close) in pairs {
            let Some(ScopeEffect::Open(kind)) = open.scope_effect() else {
                panic!("{} should open a scope", open.name());
            };
            assert_eq!(close.scope_effect(), Some(ScopeEffect::Close(kind)));
        }
        assert_eq!(Request::Scale([1.0, 1.0, 1.0]).scope_effect(), None);
    }

    #[test]
    fn full_quadrics_cover_whole_surface() {
        let torus = Torus::full(1.0, 0.3);
        assert_eq!((torus.phi_min, torus.phi_max, torus.theta_max), (0.0, 360.0, 360.0));
        let sphere = Sphere::full(0.5);
        assert_eq!((sphere.z_min, sphere.z_max), (-0.5, 0.5));
    }
}
