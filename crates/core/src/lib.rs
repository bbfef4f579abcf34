mod assemble;
mod config;
mod error;
mod mesh_primitives;
mod recorder;
mod rib;
mod sampling;
mod session;
mod strands;

pub use assemble::{
    assemble_scene, hair_surface, torus_placement, validate_config, Placement, SceneStats,
};
pub use config::{
    CameraSettings, CoreSphereSettings, DisplacementSettings, DomeLightSettings, FloorSettings,
    HairSettings, Integrator, OutputSettings, RenderSettings, SceneConfig, ShaderSettings,
    ToriSettings, TorusShape, YarnBallSettings, CONFIG_VERSION,
};
pub use error::{AssembleError, BufferError, ConfigError, SampleError, SinkError, StrandError};
pub use mesh_primitives::{make_wobbly_torus, WobbleSettings};
pub use recorder::RecordingSink;
pub use rib::{format_request, RibWriter};
pub use sampling::{
    batch_rng, sample_sphere, sample_torus, sample_wobbly_torus, seeded_rng, SceneRng, Surface,
    SurfacePoint,
};
pub use session::{check_scope_balance, SceneSink, Session};
pub use strands::{
    generate_hair, generate_strands, synthesize_strand, CurlSettings, Strand, StrandBuffer,
    StrandSettings, MAX_DIRECTION_RETRIES, MIN_DIRECTION_LENGTH,
};

pub use yarn_scene as scene;
