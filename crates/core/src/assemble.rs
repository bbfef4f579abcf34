use rand::Rng;
use yarn_scene::{CurveBasis, ParamList, ParamValue, ShaderCall, Sphere, Torus};

use crate::config::{
    CameraSettings, CoreSphereSettings, DomeLightSettings, FloorSettings, HairSettings,
    SceneConfig, ShaderSettings, ToriSettings, TorusShape, YarnBallSettings,
};
use crate::error::{AssembleError, SinkError};
use crate::mesh_primitives::make_wobbly_torus;
use crate::sampling::{batch_rng, seeded_rng, SceneRng, Surface};
use crate::session::{SceneSink, Session};
use crate::strands::generate_hair;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub tori: usize,
    pub hair_batches: usize,
    pub strands: usize,
    pub control_points: usize,
}

/// Generator stream of the core sphere's hair; torus layer `l` uses `l + 1`.
const CORE_HAIR_STREAM: u64 = 0;

/// Offset, xyz rotation (degrees) and drawn major radius of one torus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translate: [f32; 3],
    pub rotate: [f32; 3],
    pub major_radius: f32,
}

/// Places instance `i` of a layer: rotation `sin/cos/sin(i * rotation_frequency)
/// * rotation_amplitude`, offset `sin/cos/sin(i * offset_frequency) *
/// offset_amplitude`, each component plus uniform jitter, and a major
/// radius drawn from `major_radius`.
///
/// `rng` is the layer's placement generator; call once per instance, in
/// index order.
pub fn torus_placement<R: Rng + ?Sized>(
    index: usize,
    tori: &ToriSettings,
    rng: &mut R,
) -> Placement {
    let i = index as f32;
    let [rx, ry, rz] = tori.rotation_frequency;
    let [ox, oy, oz] = tori.offset_frequency;
    let angle = tori.rotation_amplitude;
    let offset = tori.offset_amplitude;
    let mut jitter = |amount: f32| rng.random_range(-amount..=amount);

    let rotate = [
        (i * rx).sin() * angle + jitter(tori.rotation_jitter),
        (i * ry).cos() * angle + jitter(tori.rotation_jitter),
        (i * rz).sin() * angle + jitter(tori.rotation_jitter),
    ];
    let translate = [
        (i * ox).sin() * offset + jitter(tori.offset_jitter),
        (i * oy).cos() * offset + jitter(tori.offset_jitter),
        (i * oz).sin() * offset + jitter(tori.offset_jitter),
    ];
    let [min, max] = tori.major_radius;
    Placement {
        translate,
        rotate,
        major_radius: rng.random_range(min..=max),
    }
}

/// Surface the hair of one instance grows on: the drawn torus at its
/// effective (instance-scaled) size, wobbled like the mesh when the shape is.
pub fn hair_surface(tori: &ToriSettings, major_radius: f32) -> Surface {
    let k = tori.instance_scale;
    match &tori.shape {
        TorusShape::Quadric => Surface::Torus {
            major_radius: major_radius * k,
            minor_radius: tori.minor_radius * k,
        },
        TorusShape::Wobbly(wobble) => Surface::WobblyTorus {
            major_radius: major_radius * k,
            minor_radius: tori.minor_radius * k,
            frequency: wobble.frequency,
            amplitude: wobble.amplitude * k,
        },
    }
}

/// Checks the settings that would otherwise only fail halfway through a
/// scene, before anything is submitted.
pub fn validate_config(config: &SceneConfig) -> Result<(), AssembleError> {
    let render = &config.render;
    if render.width == 0 || render.height == 0 {
        return Err(AssembleError::Setting(format!(
            "image size must be non-zero, got {}x{}",
            render.width, render.height
        )));
    }
    if !(render.shading_rate > 0.0) || !(render.pixel_variance > 0.0) {
        return Err(AssembleError::Setting(
            "shading rate and pixel variance must be positive".to_string(),
        ));
    }

    check_finite("camera", &camera_values(&config.camera))?;
    if let Some(light) = &config.dome_light {
        let mut values = vec![light.intensity, light.exposure];
        values.extend(light.rotations.iter().flatten());
        check_finite("dome_light", &values)?;
    }
    if let Some(floor) = &config.floor {
        let mut values: Vec<f32> = floor.corners.iter().flatten().copied().collect();
        values.extend(floor.translate.iter().chain(&floor.rotate).chain(&floor.scale));
        values.extend(&floor.offset);
        check_finite("floor", &values)?;
    }
    let ball = &config.yarn_ball;
    let mut values = ball.scale.to_vec();
    values.extend(ball.translations.iter().flatten());
    check_finite("yarn_ball", &values)?;

    for (layer, tori) in ball.tori.iter().enumerate() {
        validate_tori(layer, tori)?;
    }
    if let Some(core) = &ball.core {
        if !core.radius.is_finite() || core.radius <= 0.0 {
            return Err(AssembleError::Setting(format!(
                "core.radius must be positive, got {}",
                core.radius
            )));
        }
        check_block("core", &[&core.shader], &[])?;
        if let Some(hair) = &core.hair {
            validate_hair("core.hair", hair)?;
        }
    }
    Ok(())
}

fn camera_values(camera: &CameraSettings) -> Vec<f32> {
    let mut values = vec![
        camera.fov,
        camera.fstop,
        camera.focal_length,
        camera.focus_distance,
    ];
    values.extend(camera.rotations.iter().flatten());
    values.extend(&camera.translate);
    values
}

fn check_finite(context: &str, values: &[f32]) -> Result<(), AssembleError> {
    match values.iter().find(|value| !value.is_finite()) {
        Some(value) => Err(AssembleError::Setting(format!(
            "{context} contains a non-finite value ({value})"
        ))),
        None => Ok(()),
    }
}

fn check_jitter(name: String, amount: f32) -> Result<(), AssembleError> {
    if amount >= 0.0 && (amount * 2.0).is_finite() {
        Ok(())
    } else {
        Err(AssembleError::Setting(format!(
            "{name} must be non-negative and finite, got {amount}"
        )))
    }
}

fn validate_tori(layer: usize, tori: &ToriSettings) -> Result<(), AssembleError> {
    let name = |field: &str| format!("tori[{layer}].{field}");
    for (field, value) in [
        ("minor_radius", tori.minor_radius),
        ("instance_scale", tori.instance_scale),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(AssembleError::Setting(format!(
                "{} must be positive, got {value}",
                name(field)
            )));
        }
    }
    let [min, max] = tori.major_radius;
    if !(min > 0.0 && min <= max && (max - min).is_finite()) {
        return Err(AssembleError::Setting(format!(
            "{} must be a positive, ordered range, got [{min}, {max}]",
            name("major_radius")
        )));
    }
    check_jitter(name("rotation_jitter"), tori.rotation_jitter)?;
    check_jitter(name("offset_jitter"), tori.offset_jitter)?;
    let mut values = vec![tori.rotation_amplitude, tori.offset_amplitude];
    values.extend(tori.rotation_frequency.iter().chain(&tori.offset_frequency));
    check_finite(&name("placement"), &values)?;

    if let TorusShape::Wobbly(wobble) = &tori.shape {
        if !wobble.frequency.is_finite()
            || !wobble.amplitude.is_finite()
            || wobble.amplitude.abs() >= min
        {
            return Err(AssembleError::Setting(format!(
                "{} amplitude must be finite and below the smallest major radius {min}, got {}",
                name("shape"),
                wobble.amplitude
            )));
        }
    }

    let mut patterns = Vec::new();
    let mut consumers = vec![&tori.shader];
    if let Some(displacement) = &tori.displacement {
        check_finite(
            &name("displacement"),
            &[displacement.bound, displacement.micropolygon_length],
        )?;
        patterns.push(&displacement.pattern);
        consumers.push(&displacement.displace);
    }
    patterns.extend(&tori.color_spiral);
    check_block(&name("attributes"), &consumers, &patterns)?;

    if let Some(hair) = &tori.hair {
        validate_hair(&name("hair"), hair)?;
    }
    Ok(())
}

/// Checks the shaders emitted into one attribute block: every float
/// parameter is finite and every `reference` parameter names a pattern of
/// the same block.
fn check_block(
    context: &str,
    consumers: &[&ShaderSettings],
    patterns: &[&ShaderSettings],
) -> Result<(), AssembleError> {
    for shader in patterns.iter().chain(consumers) {
        if let Some(decl) = shader.params.first_non_finite() {
            return Err(AssembleError::Setting(format!(
                "{context}: {} parameter {decl:?} is not finite",
                shader.handle
            )));
        }
        for handle in shader.params.referenced_handles() {
            if !patterns.iter().any(|pattern| pattern.handle == handle) {
                return Err(AssembleError::Setting(format!(
                    "{context}: {} references {handle:?}, which no pattern in the block defines",
                    shader.handle
                )));
            }
        }
    }
    Ok(())
}

fn validate_hair(context: &str, hair: &HairSettings) -> Result<(), AssembleError> {
    hair.strands.validate()?;
    let points = hair.strands.control_points;
    if hair.basis == CurveBasis::Cubic && (points < 4 || (points - 4) % 3 != 0) {
        return Err(AssembleError::Setting(format!(
            "{context}: cubic hair needs 4 + 3k control points, got {points}"
        )));
    }
    let patterns: Vec<&ShaderSettings> = hair.pattern.iter().collect();
    check_block(context, &[&hair.shader], &patterns)
}

/// Emits the whole yarn-ball scene into `session`.
///
/// `target` names the frame: an archive path or a render target.
pub fn assemble_scene<S: SceneSink>(
    session: &mut Session<S>,
    config: &SceneConfig,
    target: &str,
) -> Result<SceneStats, AssembleError> {
    validate_config(config)?;
    let mut stats = SceneStats::default();

    session.frame(target, |s| -> Result<(), AssembleError> {
        write_options(s, config)?;
        write_camera(s, &config.camera)?;
        s.world(|s| -> Result<(), AssembleError> {
            if let Some(light) = &config.dome_light {
                write_dome_light(s, light)?;
            }
            if let Some(floor) = &config.floor {
                write_floor(s, floor)?;
            }
            write_yarn_ball(s, &config.yarn_ball, &mut stats)
        })
    })?;

    tracing::info!(
        tori = stats.tori,
        hair_batches = stats.hair_batches,
        strands = stats.strands,
        requests = session.submitted(),
        "assembled yarn ball scene"
    );
    Ok(stats)
}

fn write_options<S: SceneSink>(
    s: &mut Session<S>,
    config: &SceneConfig,
) -> Result<(), SinkError> {
    let output = &config.output;
    let render = &config.render;
    s.option(
        "searchpath",
        ParamList::new().with_string("string archive", &output.archive_search_path),
    )?;
    s.option(
        "searchpath",
        ParamList::new().with_string("string texture", &output.texture_search_path),
    )?;
    s.display(
        &output.display_name,
        &output.display_driver,
        &output.display_mode,
    )?;
    s.format(render.width, render.height, 1.0)?;
    s.hider("raytrace", ParamList::new().with_int("int incremental", 1))?;
    s.shading_rate(render.shading_rate)?;
    s.pixel_variance(render.pixel_variance)?;
    s.integrator(render.integrator.call())?;
    if let Some(file) = &output.statistics_file {
        s.option(
            "statistics",
            ParamList::new().with_string("string filename", file),
        )?;
        s.option("statistics", ParamList::new().with_int("int endofframe", 1))?;
    }
    Ok(())
}

fn write_camera<S: SceneSink>(
    s: &mut Session<S>,
    camera: &CameraSettings,
) -> Result<(), SinkError> {
    s.projection(
        "perspective",
        ParamList::new()
            .with_float("float fov", camera.fov)
            .with_float("float fstop", camera.fstop)
            .with_float("float focalLength", camera.focal_length)
            .with_float("float focusDistance", camera.focus_distance),
    )?;
    for &[angle, x, y, z] in &camera.rotations {
        s.rotate(angle, [x, y, z])?;
    }
    s.translate(camera.translate)
}

fn write_dome_light<S: SceneSink>(
    s: &mut Session<S>,
    light: &DomeLightSettings,
) -> Result<(), SinkError> {
    s.transform(|s| {
        s.attributes(|s| {
            s.declare("domeLight", "string")?;
            s.declare("lightColorMap", "uniform string")?;
            for &[angle, x, y, z] in &light.rotations {
                s.rotate(angle, [x, y, z])?;
            }
            if light.camera_visible {
                s.attribute("visibility", ParamList::new().with_int("int camera", 1))?;
            }
            s.light(ShaderCall::new(
                "PxrDomeLight",
                "domeLight",
                ParamList::new()
                    .with_string("string lightColorMap", &light.color_map)
                    .with_float("float intensity", light.intensity)
                    .with_float("float exposure", light.exposure),
            ))
        })
    })
}

fn write_floor<S: SceneSink>(s: &mut Session<S>, floor: &FloorSettings) -> Result<(), SinkError> {
    s.transform(|s| {
        s.translate(floor.translate)?;
        let [angle, x, y, z] = floor.rotate;
        s.rotate(angle, [x, y, z])?;
        s.scale(floor.scale)?;
        s.translate(floor.offset)?;
        s.attributes(|s| {
            s.attribute(
                "identifier",
                ParamList::new().with_string("string name", "floor"),
            )?;
            s.pattern(ShaderCall::new(
                "PxrTexture",
                "floorTexture",
                ParamList::new().with_string("string filename", &floor.diffuse_texture),
            ))?;
            s.pattern(ShaderCall::new(
                "PxrTexture",
                "floorRoughness",
                ParamList::new().with_string("string filename", &floor.roughness_texture),
            ))?;
            s.bxdf(ShaderCall::new(
                "PxrSurface",
                "smooth",
                ParamList::new()
                    .with(
                        "reference color diffuseColor",
                        ParamValue::String(vec!["floorTexture:resultRGB".to_string()]),
                    )
                    .with(
                        "reference float specularRoughness",
                        ParamValue::String(vec!["floorRoughness:resultR".to_string()]),
                    ),
            ))?;
            let corners: Vec<f32> = floor.corners.iter().flatten().copied().collect();
            s.polygon(
                ParamList::new()
                    .with_floats("P", &corners)
                    .with_floats("st", &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]),
            )
        })
    })
}

fn write_yarn_ball<S: SceneSink>(
    s: &mut Session<S>,
    ball: &YarnBallSettings,
    stats: &mut SceneStats,
) -> Result<(), AssembleError> {
    s.transform(|s| -> Result<(), AssembleError> {
        s.scale(ball.scale)?;
        for &offset in &ball.translations {
            s.translate(offset)?;
        }
        if let Some(core) = &ball.core {
            write_core(s, core, stats)?;
        }
        for (layer, tori) in ball.tori.iter().enumerate() {
            write_torus_layer(s, tori, layer as u64 + 1, stats)?;
        }
        Ok(())
    })
}

fn write_core<S: SceneSink>(
    s: &mut Session<S>,
    core: &CoreSphereSettings,
    stats: &mut SceneStats,
) -> Result<(), AssembleError> {
    s.attributes(|s| {
        s.bxdf(core.shader.call())?;
        s.sphere(Sphere::full(core.radius))
    })?;
    if let Some(hair) = &core.hair {
        let surface = Surface::Sphere {
            radius: core.radius,
        };
        let mut rng = batch_rng(hair.seed, CORE_HAIR_STREAM);
        write_hair_batch(s, hair, &surface, &mut rng, stats)?;
    }
    Ok(())
}

fn write_torus_layer<S: SceneSink>(
    s: &mut Session<S>,
    tori: &ToriSettings,
    stream: u64,
    stats: &mut SceneStats,
) -> Result<(), AssembleError> {
    let mut placements = seeded_rng(tori.placement_seed);
    for index in 0..tori.count {
        let placement = torus_placement(index, tori, &mut placements);
        write_torus_instance(s, tori, index, &placement, stream, stats)?;
    }
    Ok(())
}

fn write_torus_instance<S: SceneSink>(
    s: &mut Session<S>,
    tori: &ToriSettings,
    index: usize,
    placement: &Placement,
    stream: u64,
    stats: &mut SceneStats,
) -> Result<(), AssembleError> {
    s.transform(|s| -> Result<(), AssembleError> {
        s.translate(placement.translate)?;
        let [rx, ry, rz] = placement.rotate;
        s.rotate(rx, [1.0, 0.0, 0.0])?;
        s.rotate(ry, [0.0, 1.0, 0.0])?;
        s.rotate(rz, [0.0, 0.0, 1.0])?;

        s.attributes(|s| {
            if let Some(displacement) = &tori.displacement {
                s.attribute(
                    "displacementbound",
                    ParamList::new().with_float("float sphere", displacement.bound),
                )?;
                s.attribute(
                    "dice",
                    ParamList::new()
                        .with_float("float micropolygonlength", displacement.micropolygon_length),
                )?;
                s.pattern(displacement.pattern.call())?;
                s.displace(displacement.displace.call())?;
            }
            if let Some(spiral) = &tori.color_spiral {
                s.pattern(spiral.call())?;
            }
            s.bxdf(
                tori.shader
                    .call_with_handle(format!("{}_{index}", tori.shader.handle)),
            )?;
            let k = tori.instance_scale;
            s.scale([k, k, k])?;
            match &tori.shape {
                TorusShape::Quadric => {
                    s.torus(Torus::full(placement.major_radius, tori.minor_radius))
                }
                TorusShape::Wobbly(wobble) => s.points_polygons(make_wobbly_torus(
                    placement.major_radius,
                    tori.minor_radius,
                    wobble,
                )),
            }
        })?;
        stats.tori += 1;

        // The instance scale was popped with the attribute block, so the
        // hair is grown on the torus at its effective size.
        if let Some(hair) = &tori.hair {
            let surface = hair_surface(tori, placement.major_radius);
            let mut rng = batch_rng(hair.seed.wrapping_add(index as u64), stream);
            write_hair_batch(s, hair, &surface, &mut rng, stats)?;
        }
        Ok(())
    })
}

fn write_hair_batch<S: SceneSink>(
    s: &mut Session<S>,
    hair: &HairSettings,
    surface: &Surface,
    rng: &mut SceneRng,
    stats: &mut SceneStats,
) -> Result<(), AssembleError> {
    let buffer = generate_hair(rng, surface, hair.count, &hair.strands)?;
    if buffer.is_empty() {
        return Ok(());
    }
    let curves = buffer.to_curves(hair.basis)?;

    s.attributes(|s| {
        if let Some(pattern) = &hair.pattern {
            s.pattern(pattern.call())?;
        }
        s.bxdf(hair.shader.call())?;
        s.curves(curves)
    })?;

    stats.hair_batches += 1;
    stats.strands += buffer.strand_count();
    stats.control_points += buffer.point_count();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_primitives::WobbleSettings;
    use crate::recorder::RecordingSink;
    use crate::rib::RibWriter;
    use crate::session::check_scope_balance;
    use crate::strands::StrandSettings;
    use yarn_scene::{CurveWidths, Request};

    fn small_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        let tori = &mut config.yarn_ball.tori[0];
        tori.count = 3;
        if let Some(hair) = tori.hair.as_mut() {
            hair.count = 20;
        }
        config.yarn_ball.core = Some(CoreSphereSettings::default());
        if let Some(hair) = config
            .yarn_ball
            .core
            .as_mut()
            .and_then(|core| core.hair.as_mut())
        {
            hair.count = 15;
        }
        config
    }

    fn record(config: &SceneConfig) -> (RecordingSink, SceneStats) {
        let mut session = Session::new(RecordingSink::new());
        let stats = assemble_scene(&mut session, config, "test.rib").unwrap();
        (session.into_inner(), stats)
    }

    fn placements(tori: &ToriSettings) -> Vec<Placement> {
        let mut rng = seeded_rng(tori.placement_seed);
        (0..tori.count)
            .map(|index| torus_placement(index, tori, &mut rng))
            .collect()
    }

    fn rejected(config: &SceneConfig) -> String {
        match validate_config(config) {
            Err(AssembleError::Setting(message)) => message,
            other => panic!("expected a setting error, got {other:?}"),
        }
    }

    #[test]
    fn assembled_scene_has_balanced_scopes() {
        let (sink, _) = record(&small_config());
        let requests = sink.requests();
        assert!(check_scope_balance(requests).is_ok());

        let begins = requests
            .iter()
            .filter(|r| r.name().ends_with("Begin") || matches!(r, Request::Begin { .. }))
            .count();
        let ends = requests
            .iter()
            .filter(|r| r.name().ends_with("End"))
            .count();
        assert_eq!(begins, ends);
        assert!(matches!(requests.first(), Some(Request::Begin { .. })));
        assert!(matches!(requests.last(), Some(Request::End)));
    }

    #[test]
    fn emits_one_torus_and_hair_batch_per_instance() {
        let (sink, stats) = record(&small_config());
        assert_eq!(sink.count("Torus"), 3);
        assert_eq!(sink.count("Sphere"), 1);
        assert_eq!(sink.count("Light"), 1);
        assert_eq!(sink.count("Polygon"), 1);
        assert_eq!(sink.count("Curves"), 4);
        assert_eq!(
            stats,
            SceneStats {
                tori: 3,
                hair_batches: 4,
                strands: 3 * 20 + 15,
                control_points: (3 * 20 + 15) * 10,
            }
        );

        for curves in sink.curves() {
            let total: u32 = curves.nvertices.iter().sum();
            assert_eq!(curves.points.len(), 3 * total as usize);
            match &curves.widths {
                CurveWidths::Uniform(widths) => assert_eq!(widths.len(), curves.nvertices.len()),
                CurveWidths::Constant(_) => panic!("expected per-strand widths"),
            }
        }
    }

    #[test]
    fn every_layer_is_emitted() {
        let mut config = small_config();
        config.yarn_ball.core = None;
        let mut outer = config.yarn_ball.tori[0].clone();
        outer.count = 2;
        outer.major_radius = [14.0, 15.0];
        outer.hair = None;
        config.yarn_ball.tori.push(outer);

        let (sink, stats) = record(&config);
        assert_eq!(sink.count("Torus"), 5);
        assert_eq!(stats.tori, 5);
        assert_eq!(stats.hair_batches, 3);
    }

    #[test]
    fn hair_grows_on_each_drawn_torus() {
        let mut config = small_config();
        config.yarn_ball.core = None;
        let (sink, _) = record(&config);
        let tori = &config.yarn_ball.tori[0];
        let hair = tori.hair.as_ref().unwrap();
        let minor = tori.minor_radius * tori.instance_scale;
        let reach = hair.strands.max_reach();

        let drawn = placements(tori);
        let batches: Vec<_> = sink.curves().collect();
        assert_eq!(batches.len(), drawn.len());
        for (curves, placement) in batches.iter().zip(&drawn) {
            let major = placement.major_radius * tori.instance_scale;
            for p in curves.points.chunks_exact(3) {
                let ring = (p[0] * p[0] + p[1] * p[1]).sqrt() - major;
                let from_tube = (ring * ring + p[2] * p[2]).sqrt() - minor;
                assert!(from_tube.abs() <= reach + 1e-4);
            }
        }
    }

    #[test]
    fn same_config_same_requests() {
        let config = small_config();
        let (a, _) = record(&config);
        let (b, _) = record(&config);
        assert_eq!(a.requests(), b.requests());

        let mut reseeded = config.clone();
        if let Some(hair) = reseeded.yarn_ball.tori[0].hair.as_mut() {
            hair.seed = 1000;
        }
        let (c, _) = record(&reseeded);
        // The core batch keeps its own seed; the torus batches move.
        assert_eq!(a.curves().next(), c.curves().next());
        assert_ne!(a.curves().last(), c.curves().last());
    }

    #[test]
    fn placement_seed_reproduces_layout() {
        let tori = ToriSettings {
            count: 40,
            major_radius: [0.998, 1.2],
            ..ToriSettings::default()
        };
        let first = placements(&tori);
        assert_eq!(first, placements(&tori));
        assert!(first.iter().all(|p| (0.998..=1.2).contains(&p.major_radius)));
        assert!(first
            .windows(2)
            .any(|pair| pair[0].major_radius != pair[1].major_radius));

        let reseeded = ToriSettings {
            placement_seed: tori.placement_seed + 1,
            ..tori.clone()
        };
        assert_ne!(first, placements(&reseeded));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let tori = ToriSettings {
            count: 60,
            ..ToriSettings::default()
        };
        let angle = tori.rotation_amplitude;
        let offset = tori.offset_amplitude;
        for (index, placement) in placements(&tori).iter().enumerate() {
            let i = index as f32;
            let [rx, ry, rz] = tori.rotation_frequency;
            let base = [(i * rx).sin(), (i * ry).cos(), (i * rz).sin()].map(|w| w * angle);
            for (drawn, base) in placement.rotate.iter().zip(base) {
                assert!((drawn - base).abs() <= tori.rotation_jitter + 1e-3);
            }
            let [ox, oy, oz] = tori.offset_frequency;
            let base = [(i * ox).sin(), (i * oy).cos(), (i * oz).sin()].map(|w| w * offset);
            for (drawn, base) in placement.translate.iter().zip(base) {
                assert!((drawn - base).abs() <= tori.offset_jitter + 1e-6);
            }
        }
    }

    #[test]
    fn unjittered_first_instance_sits_on_the_sinusoids() {
        let tori = ToriSettings {
            rotation_jitter: 0.0,
            offset_jitter: 0.0,
            major_radius: [2.0, 2.0],
            ..ToriSettings::default()
        };
        let placement = torus_placement(0, &tori, &mut seeded_rng(7));
        assert_eq!(placement.translate, [0.0, tori.offset_amplitude, 0.0]);
        assert_eq!(placement.rotate, [0.0, tori.rotation_amplitude, 0.0]);
        assert_eq!(placement.major_radius, 2.0);
    }

    #[test]
    fn wobbly_shape_replaces_quadric() {
        let mut config = small_config();
        let tori = &mut config.yarn_ball.tori[0];
        tori.shape = TorusShape::Wobbly(WobbleSettings::default());
        tori.hair = None;
        config.yarn_ball.core = None;
        let (sink, stats) = record(&config);
        assert_eq!(sink.count("Torus"), 0);
        assert_eq!(sink.count("PointsPolygons"), 3);
        assert_eq!(sink.count("Curves"), 0);
        assert_eq!(stats.strands, 0);
    }

    #[test]
    fn wobbly_hair_roots_lie_on_the_mesh_surface() {
        let mut config = small_config();
        config.yarn_ball.core = None;
        let wobble = WobbleSettings {
            frequency: 5.0,
            amplitude: 2.0,
            ..WobbleSettings::default()
        };
        let tori = &mut config.yarn_ball.tori[0];
        tori.shape = TorusShape::Wobbly(wobble);
        let tori = tori.clone();
        let (sink, _) = record(&config);

        let k = tori.instance_scale;
        let minor = tori.minor_radius * k;
        let points_per_strand = tori.hair.as_ref().unwrap().strands.control_points;
        for (curves, placement) in sink.curves().zip(placements(&tori)) {
            for root in curves.points.chunks_exact(3 * points_per_strand) {
                let u = root[1].atan2(root[0]);
                let center =
                    (placement.major_radius + (u * wobble.frequency).sin() * wobble.amplitude) * k;
                let ring = (root[0] * root[0] + root[1] * root[1]).sqrt() - center;
                let from_tube = (ring * ring + root[2] * root[2]).sqrt() - minor;
                assert!(from_tube.abs() < 1e-4, "root {from_tube} off the surface");
            }
        }
    }

    #[test]
    fn invalid_hair_is_rejected_before_submission() {
        let mut config = small_config();
        if let Some(hair) = config.yarn_ball.tori[0].hair.as_mut() {
            hair.strands = StrandSettings {
                control_points: 5,
                ..hair.strands
            };
        }
        let mut session = Session::new(RecordingSink::new());
        let err = assemble_scene(&mut session, &config, "x").unwrap_err();
        assert!(matches!(err, AssembleError::Setting(_)));
        assert!(session.sink().requests().is_empty());

        if let Some(hair) = config.yarn_ball.tori[0].hair.as_mut() {
            hair.strands.control_points = 1;
        }
        let err = assemble_scene(&mut session, &config, "x").unwrap_err();
        assert!(matches!(err, AssembleError::Strand(_)));
    }

    #[test]
    fn rejects_bad_placement_ranges() {
        let mut config = small_config();
        config.yarn_ball.tori[0].major_radius = [1.3, 1.2];
        assert!(rejected(&config).contains("tori[0].major_radius"));

        let mut config = small_config();
        config.yarn_ball.tori[0].rotation_jitter = f32::MAX;
        assert!(rejected(&config).contains("rotation_jitter"));

        let mut config = small_config();
        config.yarn_ball.tori[0].shape = TorusShape::Wobbly(WobbleSettings {
            amplitude: 20.0,
            ..WobbleSettings::default()
        });
        assert!(rejected(&config).contains("tori[0].shape"));
    }

    #[test]
    fn reference_without_its_pattern_is_rejected() {
        let mut config = small_config();
        if let Some(hair) = config.yarn_ball.tori[0].hair.as_mut() {
            hair.pattern = None;
        }
        let message = rejected(&config);
        assert!(message.contains("hairColorNoise"), "{message}");

        let mut config = small_config();
        config.yarn_ball.tori[0].displacement = None;
        assert!(validate_config(&config).is_ok());
        config.yarn_ball.tori[0].shader.params.set(
            "reference float presence",
            ParamValue::String(vec!["disp:resultF".to_string()]),
        );
        assert!(rejected(&config).contains("\"disp\""));
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        let mut config = small_config();
        if let Some(hair) = config.yarn_ball.tori[0].hair.as_mut() {
            hair.shader.params.set("float diffuseGain", ParamValue::Float(vec![f32::INFINITY]));
        }
        assert!(rejected(&config).contains("diffuseGain"));

        let mut config = small_config();
        config.camera.fov = f32::NAN;
        assert!(rejected(&config).contains("camera"));

        let mut config = small_config();
        if let Some(core) = config.yarn_ball.core.as_mut() {
            core.shader.params.set("float presence", ParamValue::Float(vec![f32::NAN]));
        }
        assert!(rejected(&config).contains("core"));
    }

    #[test]
    fn writes_complete_rib_archive() {
        let mut config = small_config();
        config.yarn_ball.tori[0].count = 1;
        config.yarn_ball.tori[0].major_radius = [13.251, 13.251];
        let mut session = Session::new(RibWriter::new(Vec::new()));
        assemble_scene(&mut session, &config, "yarn.rib").unwrap();
        let bytes = session.into_inner().finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("##RenderMan RIB"));
        assert!(text.contains("Integrator \"PxrPathTracer\" \"integrator\""));
        assert!(text.contains("Torus 13.251 0.3418125 0 360 360"));
        assert!(text.contains("Curves \"cubic\" [10 10"));
        assert!(text.contains("\"uniform float width\""));
        assert!(text.trim_end().ends_with("# end of frame"));
    }
}
