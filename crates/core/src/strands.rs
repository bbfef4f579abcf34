use std::f32::consts::PI;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use yarn_scene::{CurveBasis, CurveWidths, CurveWrap, Curves};

use crate::error::{BufferError, StrandError};
use crate::sampling::{Surface, SurfacePoint};

/// Directions shorter than this are treated as degenerate.
pub const MIN_DIRECTION_LENGTH: f32 = 1e-6;
/// Jitter redraws before a degenerate step keeps the previous direction.
pub const MAX_DIRECTION_RETRIES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurlSettings {
    /// Range the per-strand curl frequency is drawn from.
    pub frequency: [f32; 2],
    /// Range the per-strand phase offset is drawn from.
    pub phase: [f32; 2],
    pub amplitude: [f32; 3],
    /// Strength of the double-frequency coil added to x and y.
    pub coil: f32,
}

impl Default for CurlSettings {
    fn default() -> Self {
        Self {
            frequency: [15.0, 30.0],
            phase: [0.0, PI],
            amplitude: [0.6, 0.6, 0.2],
            coil: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrandSettings {
    pub hair_length: f32,
    pub hair_width: f32,
    pub control_points: usize,
    /// Multiplier range applied to `hair_length` per strand.
    pub length_variation: [f32; 2],
    /// Per-axis bound of the uniform direction jitter.
    pub jitter: f32,
    pub curl: Option<CurlSettings>,
}

impl Default for StrandSettings {
    fn default() -> Self {
        Self {
            hair_length: 0.02,
            hair_width: 0.001,
            control_points: 10,
            length_variation: [0.5, 2.5],
            jitter: 1.5,
            curl: Some(CurlSettings::default()),
        }
    }
}

impl StrandSettings {
    pub fn validate(&self) -> Result<(), StrandError> {
        if self.control_points < 2 {
            return Err(StrandError::TooFewControlPoints(self.control_points));
        }
        check_positive("hair_length", self.hair_length)?;
        check_positive("hair_width", self.hair_width)?;
        check_range("length_variation", self.length_variation)?;
        if self.length_variation[0] <= 0.0 || !self.max_reach().is_finite() {
            return Err(StrandError::InvalidRange {
                name: "length_variation",
                min: self.length_variation[0],
                max: self.length_variation[1],
            });
        }
        // The jitter range is [-jitter, jitter]; its width must stay finite.
        if !(self.jitter * 2.0).is_finite() || self.jitter < 0.0 {
            return Err(StrandError::InvalidDimension {
                name: "jitter",
                value: self.jitter,
            });
        }
        if let Some(curl) = &self.curl {
            check_range("curl.frequency", curl.frequency)?;
            check_range("curl.phase", curl.phase)?;
            if !curl.coil.is_finite() {
                return Err(StrandError::InvalidDimension {
                    name: "curl.coil",
                    value: curl.coil,
                });
            }
            if let Some(&value) = curl.amplitude.iter().find(|a| !a.is_finite()) {
                return Err(StrandError::InvalidDimension {
                    name: "curl.amplitude",
                    value,
                });
            }
        }
        Ok(())
    }

    /// Upper bound on the distance from the root to any control point.
    pub fn max_reach(&self) -> f32 {
        self.hair_length * self.length_variation[1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strand {
    pub points: Vec<Vec3>,
    pub width: f32,
}

impl Strand {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

/// Flat strand storage for one curve submission.
///
/// Holds `sum(npts) * 3 == points.len()` and `npts.len() == widths.len()`
/// whenever it is built through [`StrandBuffer::push`]; [`StrandBuffer::validate`]
/// checks it again before anything leaves the crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrandBuffer {
    pub points: Vec<f32>,
    pub widths: Vec<f32>,
    pub npts: Vec<u32>,
}

impl StrandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(strands: usize, points_per_strand: usize) -> Self {
        Self {
            points: Vec::with_capacity(strands * points_per_strand * 3),
            widths: Vec::with_capacity(strands),
            npts: Vec::with_capacity(strands),
        }
    }

    pub fn push(&mut self, strand: &Strand) {
        for point in &strand.points {
            self.points.extend_from_slice(&point.to_array());
        }
        self.npts.push(strand.points.len() as u32);
        self.widths.push(strand.width);
    }

    pub fn strand_count(&self) -> usize {
        self.npts.len()
    }

    pub fn point_count(&self) -> usize {
        self.npts.iter().map(|&n| n as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.npts.is_empty()
    }

    pub fn strand_points(&self, index: usize) -> Option<&[f32]> {
        let count = *self.npts.get(index)? as usize;
        let start: usize = self.npts[..index].iter().map(|&n| n as usize).sum();
        self.points.get(start * 3..(start + count) * 3)
    }

    pub fn validate(&self) -> Result<(), BufferError> {
        if let Some(index) = self.npts.iter().position(|&n| n == 0) {
            return Err(BufferError::EmptyStrand { index });
        }
        let expected = self.point_count() * 3;
        if expected != self.points.len() {
            return Err(BufferError::PointCount {
                expected,
                actual: self.points.len(),
            });
        }
        if self.widths.len() != self.npts.len() {
            return Err(BufferError::WidthCount {
                strands: self.npts.len(),
                widths: self.widths.len(),
            });
        }
        if self
            .points
            .iter()
            .chain(self.widths.iter())
            .any(|value| !value.is_finite())
        {
            return Err(BufferError::NonFinite);
        }
        Ok(())
    }

    /// Validates, then copies the buffer into a nonperiodic curve primitive.
    pub fn to_curves(&self, basis: CurveBasis) -> Result<Curves, BufferError> {
        self.validate()?;
        Ok(Curves {
            basis,
            nvertices: self.npts.clone(),
            wrap: CurveWrap::Nonperiodic,
            points: self.points.clone(),
            widths: CurveWidths::Uniform(self.widths.clone()),
        })
    }
}

struct Curl {
    frequency: f32,
    phase: f32,
    amplitude: Vec3,
    coil: f32,
}

impl Curl {
    fn draw<R: Rng + ?Sized>(rng: &mut R, settings: &CurlSettings) -> Self {
        Self {
            frequency: rng.random_range(settings.frequency[0]..=settings.frequency[1]),
            phase: rng.random_range(settings.phase[0]..=settings.phase[1]),
            amplitude: Vec3::from(settings.amplitude),
            coil: settings.coil,
        }
    }

    fn offset(&self, t: f32) -> Vec3 {
        let angle = self.frequency * t + self.phase;
        let coil = (self.frequency * t * 2.0).cos() * self.coil;
        Vec3::new(
            angle.sin() * self.amplitude.x + coil,
            angle.cos() * self.amplitude.y + coil,
            angle.sin() * self.amplitude.z,
        )
    }
}

/// Grows one strand from `seed`.
///
/// The growth direction starts at the seed normal and each control point
/// perturbs the previous direction, so jitter and curl accumulate along the
/// strand. Point `i` sits at `t = i / (n - 1)` of the strand length along the
/// current direction.
pub fn synthesize_strand<R: Rng + ?Sized>(
    rng: &mut R,
    seed: &SurfacePoint,
    settings: &StrandSettings,
) -> Result<Strand, StrandError> {
    settings.validate()?;
    let mut direction = seed
        .normal
        .try_normalize()
        .ok_or(StrandError::DegenerateNormal)?;

    let variation =
        rng.random_range(settings.length_variation[0]..=settings.length_variation[1]);
    let strand_length = settings.hair_length * variation;
    let curl = settings.curl.as_ref().map(|curl| Curl::draw(rng, curl));

    let last = (settings.control_points - 1) as f32;
    let mut points = Vec::with_capacity(settings.control_points);
    for i in 0..settings.control_points {
        let t = i as f32 / last;
        let bend = curl.as_ref().map_or(Vec3::ZERO, |curl| curl.offset(t));
        direction = perturb(rng, direction, bend, settings.jitter);
        points.push(seed.position + direction * strand_length * t);
    }

    Ok(Strand {
        points,
        width: settings.hair_width,
    })
}

fn perturb<R: Rng + ?Sized>(rng: &mut R, direction: Vec3, bend: Vec3, jitter: f32) -> Vec3 {
    for _ in 0..MAX_DIRECTION_RETRIES {
        let noise = Vec3::new(
            rng.random_range(-jitter..=jitter),
            rng.random_range(-jitter..=jitter),
            rng.random_range(-jitter..=jitter),
        );
        let candidate = direction + noise + bend;
        let length = candidate.length();
        if length >= MIN_DIRECTION_LENGTH {
            return candidate / length;
        }
    }
    tracing::warn!("strand direction collapsed; keeping previous direction");
    direction
}

/// Appends one strand per seed, in seed order.
pub fn generate_strands<R: Rng + ?Sized>(
    rng: &mut R,
    seeds: &[SurfacePoint],
    settings: &StrandSettings,
    buffer: &mut StrandBuffer,
) -> Result<(), StrandError> {
    settings.validate()?;
    for seed in seeds {
        let strand = synthesize_strand(rng, seed, settings)?;
        buffer.push(&strand);
    }
    Ok(())
}

/// Samples `count` roots on `surface` and grows a strand from each.
pub fn generate_hair<R: Rng + ?Sized>(
    rng: &mut R,
    surface: &Surface,
    count: usize,
    settings: &StrandSettings,
) -> Result<StrandBuffer, StrandError> {
    settings.validate()?;
    let seeds = surface.sample(rng, count)?;
    let mut buffer = StrandBuffer::with_capacity(count, settings.control_points);
    generate_strands(rng, &seeds, settings, &mut buffer)?;
    tracing::debug!(
        strands = buffer.strand_count(),
        points = buffer.point_count(),
        "generated hair batch"
    );
    Ok(buffer)
}

fn check_positive(name: &'static str, value: f32) -> Result<(), StrandError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(StrandError::InvalidDimension { name, value })
    }
}

fn check_range(name: &'static str, range: [f32; 2]) -> Result<(), StrandError> {
    let [min, max] = range;
    if min <= max && (max - min).is_finite() {
        Ok(())
    } else {
        Err(StrandError::InvalidRange { name, min, max })
    }
}
