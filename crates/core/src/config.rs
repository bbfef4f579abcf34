use std::path::Path;

use serde::{Deserialize, Serialize};
use yarn_scene::{CurveBasis, ParamList, ParamValue, ShaderCall};

use crate::error::ConfigError;
use crate::mesh_primitives::WobbleSettings;
use crate::strands::{CurlSettings, StrandSettings};

pub const CONFIG_VERSION: u32 = 1;

/// Every tunable knob of the yarn-ball scene. Missing fields fall back to
/// the defaults below, so a config file only needs the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub version: u32,
    pub output: OutputSettings,
    pub render: RenderSettings,
    pub camera: CameraSettings,
    pub dome_light: Option<DomeLightSettings>,
    pub floor: Option<FloorSettings>,
    pub yarn_ball: YarnBallSettings,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            output: OutputSettings::default(),
            render: RenderSettings::default(),
            camera: CameraSettings::default(),
            dome_light: Some(DomeLightSettings::default()),
            floor: Some(FloorSettings::default()),
            yarn_ball: YarnBallSettings::default(),
        }
    }
}

impl SceneConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub display_name: String,
    pub display_driver: String,
    pub display_mode: String,
    pub archive_search_path: String,
    pub texture_search_path: String,
    pub statistics_file: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            display_name: "scene.exr".to_string(),
            display_driver: "it".to_string(),
            display_mode: "rgba".to_string(),
            archive_search_path: "./assets/:@".to_string(),
            texture_search_path: "./textures/:@".to_string(),
            statistics_file: Some("stats.txt".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    #[default]
    PathTracer,
    Default,
    Vcm,
    DirectLighting,
    Wireframe,
    Normals,
    St,
}

impl Integrator {
    pub fn shader(self) -> &'static str {
        match self {
            Integrator::PathTracer => "PxrPathTracer",
            Integrator::Default => "PxrDefault",
            Integrator::Vcm => "PxrVCM",
            Integrator::DirectLighting => "PxrDirectLighting",
            Integrator::Wireframe | Integrator::Normals | Integrator::St => "PxrVisualizer",
        }
    }

    pub fn params(self) -> ParamList {
        let style = match self {
            Integrator::Wireframe => "shaded",
            Integrator::Normals => "normals",
            Integrator::St => "st",
            _ => return ParamList::new(),
        };
        ParamList::new()
            .with_int("int wireframe", 1)
            .with_string("string style", style)
    }

    pub fn call(self) -> ShaderCall {
        ShaderCall::new(self.shader(), "integrator", self.params())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub shading_rate: f32,
    pub pixel_variance: f32,
    pub width: u32,
    pub height: u32,
    pub integrator: Integrator,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shading_rate: 10.0,
            pixel_variance: 0.1,
            width: 1024,
            height: 720,
            integrator: Integrator::PathTracer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov: f32,
    pub fstop: f32,
    pub focal_length: f32,
    pub focus_distance: f32,
    /// `[angle, x, y, z]`, applied in order.
    pub rotations: Vec<[f32; 4]>,
    pub translate: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 48.0,
            fstop: 2.0,
            focal_length: 50.0,
            focus_distance: 2.5,
            rotations: vec![[-5.0, 1.0, 0.0, 0.0]],
            translate: [0.0, 0.5, 2.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomeLightSettings {
    pub color_map: String,
    pub intensity: f32,
    pub exposure: f32,
    pub rotations: Vec<[f32; 4]>,
    pub camera_visible: bool,
}

impl Default for DomeLightSettings {
    fn default() -> Self {
        Self {
            color_map: "photo_studio_loft_hall_1k.tex".to_string(),
            intensity: 0.8,
            exposure: -1.0,
            rotations: vec![
                [225.0, 0.0, 1.0, 0.0],
                [-85.0, 1.0, 0.0, 0.0],
                [10.0, 0.0, 0.0, 1.0],
            ],
            camera_visible: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorSettings {
    pub diffuse_texture: String,
    pub roughness_texture: String,
    pub translate: [f32; 3],
    pub rotate: [f32; 4],
    pub scale: [f32; 3],
    pub offset: [f32; 3],
    /// Quad corners, counter-clockwise seen from above.
    pub corners: [[f32; 3]; 4],
}

impl Default for FloorSettings {
    fn default() -> Self {
        Self {
            diffuse_texture: "wood_table_001_diff_1k.tex".to_string(),
            roughness_texture: "wood_table_001_rough_1k.tex".to_string(),
            translate: [0.0, -0.15, 0.0],
            rotate: [90.0, 0.0, 1.0, 0.0],
            scale: [1.0, 1.0, 1.5],
            offset: [0.0, 0.0, 0.315],
            corners: [
                [-1.0, -1.0, 1.0],
                [1.0, -1.0, 1.0],
                [1.0, -1.0, -2.0],
                [-1.0, -1.0, -2.0],
            ],
        }
    }
}

/// A shader call as it appears in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderSettings {
    pub shader: String,
    pub handle: String,
    #[serde(default)]
    pub params: ParamList,
}

impl ShaderSettings {
    pub fn new(shader: &str, handle: &str, params: ParamList) -> Self {
        Self {
            shader: shader.to_string(),
            handle: handle.to_string(),
            params,
        }
    }

    pub fn call(&self) -> ShaderCall {
        ShaderCall::new(self.shader.clone(), self.handle.clone(), self.params.clone())
    }

    pub fn call_with_handle(&self, handle: String) -> ShaderCall {
        ShaderCall::new(self.shader.clone(), handle, self.params.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YarnBallSettings {
    pub scale: [f32; 3],
    pub translations: Vec<[f32; 3]>,
    pub core: Option<CoreSphereSettings>,
    /// Torus layers, emitted in order. Each layer has its own placement seed.
    pub tori: Vec<ToriSettings>,
}

impl Default for YarnBallSettings {
    fn default() -> Self {
        Self {
            scale: [0.7, 0.7, 0.7],
            translations: vec![[-0.13, -0.87, -1.318], [0.1, 0.65, -1.35]],
            core: None,
            tori: vec![ToriSettings::default()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreSphereSettings {
    pub radius: f32,
    pub shader: ShaderSettings,
    pub hair: Option<HairSettings>,
}

impl Default for CoreSphereSettings {
    fn default() -> Self {
        Self {
            radius: 0.515,
            shader: ShaderSettings::new(
                "PxrSurface",
                "yarnBallShader",
                ParamList::new()
                    .with_float("float diffuseGain", 0.9)
                    .with_color("color diffuseColor", [1.0, 0.95, 0.9])
                    .with_float("float diffuseRoughness", 0.5),
            ),
            hair: Some(HairSettings {
                count: 40_000,
                strands: StrandSettings {
                    hair_length: 0.02,
                    hair_width: 0.0004,
                    length_variation: [0.5, 1.5],
                    ..StrandSettings::default()
                },
                ..HairSettings::default()
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TorusShape {
    Quadric,
    Wobbly(WobbleSettings),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToriSettings {
    pub count: usize,
    /// Each instance draws its major radius uniformly from `[min, max]`.
    pub major_radius: [f32; 2],
    pub minor_radius: f32,
    /// Uniform scale applied to each torus inside its attribute block.
    pub instance_scale: f32,
    /// Seeds the generator for rotation/offset jitter and radius draws.
    pub placement_seed: u64,
    pub rotation_amplitude: f32,
    pub rotation_frequency: [f32; 3],
    /// Degrees of uniform noise added to each rotation angle.
    pub rotation_jitter: f32,
    pub offset_amplitude: f32,
    pub offset_frequency: [f32; 3],
    pub offset_jitter: f32,
    pub shape: TorusShape,
    pub shader: ShaderSettings,
    pub displacement: Option<DisplacementSettings>,
    pub color_spiral: Option<ShaderSettings>,
    pub hair: Option<HairSettings>,
}

impl Default for ToriSettings {
    fn default() -> Self {
        Self {
            count: 150,
            major_radius: [13.251, 15.933],
            minor_radius: 0.341_812_5,
            instance_scale: 0.040_51,
            placement_seed: 3,
            rotation_amplitude: 180.0,
            rotation_frequency: [1.1, 0.7, 0.3],
            rotation_jitter: 10.0,
            offset_amplitude: 0.015,
            offset_frequency: [0.69, 0.6, 0.64],
            offset_jitter: 0.000_05,
            shape: TorusShape::Quadric,
            shader: ShaderSettings::new(
                "PxrSurface",
                "yarnShader",
                ParamList::new()
                    .with_float("float diffuseGain", 0.9)
                    .with_color("color diffuseColor", [1.0, 0.95, 0.9])
                    .with_float("float diffuseRoughness", 0.6)
                    .with_float("float fuzzGain", 0.8)
                    .with_color("color fuzzColor", [1.0, 0.95, 0.85])
                    .with_float("float specularRoughness", 0.65)
                    .with_color("color specularFaceColor", [0.3, 0.28, 0.25])
                    .with_color("color specularEdgeColor", [0.5, 0.45, 0.4]),
            ),
            displacement: Some(DisplacementSettings::default()),
            color_spiral: None,
            hair: Some(HairSettings::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementSettings {
    pub bound: f32,
    pub micropolygon_length: f32,
    pub pattern: ShaderSettings,
    pub displace: ShaderSettings,
}

impl Default for DisplacementSettings {
    fn default() -> Self {
        Self {
            bound: 0.4,
            micropolygon_length: 0.1,
            pattern: ShaderSettings::new(
                "disp",
                "disp",
                ParamList::new()
                    .with_float("float scale1", 0.06)
                    .with_float("float repeatU1", 230.0)
                    .with_float("float repeatV1", 10.0)
                    .with_float("float scale2", 0.0)
                    .with_float("float repeatU2", 150.0)
                    .with_float("float repeatV2", -37.0)
                    .with_float("float noiseAmount1", 0.0)
                    .with_float("float noiseFreq1", 0.03)
                    .with_float("float noiseAmount2", 0.0)
                    .with_float("float noiseFreq2", 2.0)
                    .with_float("float noiseAmount3", 0.0)
                    .with_float("float noiseFreq3", 80.0),
            ),
            displace: ShaderSettings::new(
                "PxrDisplace",
                "pxrdisp",
                ParamList::new().with(
                    "reference float dispScalar",
                    ParamValue::String(vec!["disp:resultF".to_string()]),
                ),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HairSettings {
    /// Base seed; torus `i` of a layer uses `seed + i`. Each layer and the
    /// core sphere draw from separate generator streams.
    pub seed: u64,
    /// Strands per batch.
    pub count: usize,
    pub strands: StrandSettings,
    /// Cubic curves use the renderer's default bezier basis and need
    /// `4 + 3k` control points.
    pub basis: CurveBasis,
    pub shader: ShaderSettings,
    pub pattern: Option<ShaderSettings>,
}

impl Default for HairSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            count: 200,
            strands: StrandSettings {
                hair_length: 0.015,
                hair_width: 0.000_15,
                control_points: 10,
                length_variation: [0.5, 2.5],
                jitter: 1.5,
                curl: Some(CurlSettings::default()),
            },
            basis: CurveBasis::Cubic,
            shader: ShaderSettings::new(
                "PxrMarschnerHair",
                "yarnHairShader",
                ParamList::new()
                    .with_float("float diffuseGain", 0.5)
                    .with_color("color diffuseColor", [1.0, 0.9, 0.8])
                    .with(
                        "reference color specularColorR",
                        ParamValue::String(vec!["hairColorNoise:resultRGB".to_string()]),
                    )
                    .with_color("color specularColorTRT", [1.0, 0.9, 0.75])
                    .with_color("color specularColorTT", [1.0, 0.85, 0.7])
                    .with_float("float specularGainR", 0.1)
                    .with_float("float specularGainTRT", 0.4)
                    .with_float("float specularGainTT", 0.5),
            ),
            pattern: Some(ShaderSettings::new(
                "PxrFractal",
                "hairColorNoise",
                ParamList::new()
                    .with_int("int layers", 3)
                    .with_float("float frequency", 100.0)
                    .with_float("float gain", 0.5)
                    .with_float("float lacunarity", 2.0)
                    .with_int("int octaveCount", 4)
                    .with_color("color colorScale", [0.06, 0.04, 0.03])
                    .with_color("color colorOffset", [1.0, 0.9, 0.8]),
            )),
        }
    }
}
