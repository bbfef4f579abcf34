use std::f32::consts::TAU;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::SampleError;

/// Generator threaded through sampling and strand synthesis.
pub type SceneRng = ChaCha8Rng;

pub fn seeded_rng(seed: u64) -> SceneRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Like [`seeded_rng`], but on its own ChaCha stream, so two batch sources
/// sharing a seed still draw unrelated numbers.
pub fn batch_rng(seed: u64, stream: u64) -> SceneRng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    pub position: Vec3,
    pub normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Surface {
    Torus { major_radius: f32, minor_radius: f32 },
    /// Torus whose major radius is `major_radius + sin(u * frequency) * amplitude`.
    WobblyTorus {
        major_radius: f32,
        minor_radius: f32,
        frequency: f32,
        amplitude: f32,
    },
    Sphere { radius: f32 },
}

impl Surface {
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
    ) -> Result<Vec<SurfacePoint>, SampleError> {
        match *self {
            Surface::Torus {
                major_radius,
                minor_radius,
            } => sample_torus(rng, major_radius, minor_radius, count),
            Surface::WobblyTorus {
                major_radius,
                minor_radius,
                frequency,
                amplitude,
            } => sample_wobbly_torus(rng, major_radius, minor_radius, frequency, amplitude, count),
            Surface::Sphere { radius } => sample_sphere(rng, radius, count),
        }
    }
}

pub fn sample_torus<R: Rng + ?Sized>(
    rng: &mut R,
    major_radius: f32,
    minor_radius: f32,
    count: usize,
) -> Result<Vec<SurfacePoint>, SampleError> {
    check_radius("major_radius", major_radius)?;
    check_radius("minor_radius", minor_radius)?;

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let u = rng.random_range(0.0..TAU);
        let v = rng.random_range(0.0..TAU);
        let (sin_u, cos_u) = u.sin_cos();
        let (sin_v, cos_v) = v.sin_cos();

        let ring = major_radius + minor_radius * cos_v;
        let position = Vec3::new(ring * cos_u, ring * sin_u, minor_radius * sin_v);
        // Unit length by construction; renormalise to absorb rounding.
        let normal = Vec3::new(cos_u * cos_v, sin_u * cos_v, sin_v)
            .try_normalize()
            .unwrap_or(Vec3::Z);
        points.push(SurfacePoint { position, normal });
    }
    Ok(points)
}

/// Samples the same surface `make_wobbly_torus` meshes. Normals come from
/// the cross product of the surface tangents, flipped to face away from
/// the tube centre.
pub fn sample_wobbly_torus<R: Rng + ?Sized>(
    rng: &mut R,
    major_radius: f32,
    minor_radius: f32,
    frequency: f32,
    amplitude: f32,
    count: usize,
) -> Result<Vec<SurfacePoint>, SampleError> {
    check_radius("major_radius", major_radius)?;
    check_radius("minor_radius", minor_radius)?;
    if !frequency.is_finite() || !amplitude.is_finite() || amplitude.abs() >= major_radius {
        return Err(SampleError::InvalidWobble {
            frequency,
            amplitude,
        });
    }

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let u = rng.random_range(0.0..TAU);
        let v = rng.random_range(0.0..TAU);
        let (sin_u, cos_u) = u.sin_cos();
        let (sin_v, cos_v) = v.sin_cos();

        let (sin_fu, cos_fu) = (u * frequency).sin_cos();
        let center = major_radius + sin_fu * amplitude;
        let ring = center + minor_radius * cos_v;
        let position = Vec3::new(ring * cos_u, ring * sin_u, minor_radius * sin_v);

        let radial = Vec3::new(cos_u, sin_u, 0.0);
        let d_u = radial * (cos_fu * frequency * amplitude) + Vec3::new(-sin_u, cos_u, 0.0) * ring;
        let d_v = Vec3::new(-sin_v * cos_u, -sin_v * sin_u, cos_v) * minor_radius;
        let tube = Vec3::new(cos_u * cos_v, sin_u * cos_v, sin_v);
        let normal = match d_u.cross(d_v).try_normalize() {
            Some(n) if n.dot(tube) < 0.0 => -n,
            Some(n) => n,
            None => tube,
        };
        points.push(SurfacePoint { position, normal });
    }
    Ok(points)
}

/// Area-uniform samples: the polar angle comes from `acos` of a uniform
/// height so points do not bunch up at the poles.
pub fn sample_sphere<R: Rng + ?Sized>(
    rng: &mut R,
    radius: f32,
    count: usize,
) -> Result<Vec<SurfacePoint>, SampleError> {
    check_radius("radius", radius)?;

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let theta = rng.random_range(0.0..TAU);
        let phi = rng.random_range(-1.0f32..=1.0).acos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();

        let position = Vec3::new(sin_phi * cos_theta, sin_phi * sin_theta, cos_phi) * radius;
        let normal = (position / radius).try_normalize().unwrap_or(Vec3::Z);
        points.push(SurfacePoint { position, normal });
    }
    Ok(points)
}

fn check_radius(name: &'static str, value: f32) -> Result<(), SampleError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SampleError::InvalidRadius { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torus_samples_lie_on_surface() {
        let mut rng = seeded_rng(7);
        let points = sample_torus(&mut rng, 1.0, 0.3, 500).unwrap();
        assert_eq!(points.len(), 500);
        for point in &points {
            let p = point.position;
            let ring = (p.x * p.x + p.y * p.y).sqrt() - 1.0;
            let residual = ring * ring + p.z * p.z - 0.3 * 0.3;
            assert!(residual.abs() < 1e-4, "off surface by {residual}");
            assert!((point.normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn torus_normals_point_away_from_tube_center() {
        let mut rng = seeded_rng(11);
        for point in sample_torus(&mut rng, 2.0, 0.5, 64).unwrap() {
            let p = point.position;
            let tube_center = Vec3::new(p.x, p.y, 0.0).normalize() * 2.0;
            let outward = (p - tube_center).normalize();
            assert!(outward.dot(point.normal) > 0.999);
        }
    }

    #[test]
    fn sphere_samples_lie_on_surface() {
        let mut rng = seeded_rng(3);
        let points = sample_sphere(&mut rng, 0.515, 300).unwrap();
        assert_eq!(points.len(), 300);
        for point in &points {
            assert!((point.position.length() - 0.515).abs() < 1e-5);
            assert!((point.normal.length() - 1.0).abs() < 1e-5);
            assert!(point.normal.dot(point.position.normalize()) > 0.9999);
        }
    }

    #[test]
    fn zero_count_is_empty() {
        let mut rng = seeded_rng(0);
        assert!(sample_torus(&mut rng, 1.0, 0.3, 0).unwrap().is_empty());
        assert!(Surface::Sphere { radius: 1.0 }
            .sample(&mut rng, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rejects_non_positive_radii() {
        let mut rng = seeded_rng(0);
        assert!(matches!(
            sample_torus(&mut rng, 1.0, 0.0, 4),
            Err(SampleError::InvalidRadius {
                name: "minor_radius",
                ..
            })
        ));
        assert!(sample_sphere(&mut rng, f32::NAN, 4).is_err());
    }

    #[test]
    fn wobbly_samples_lie_on_wobbled_tube() {
        let mut rng = seeded_rng(5);
        let (major, minor, frequency, amplitude) = (1.0, 0.2, 3.0, 0.4);
        let points = sample_wobbly_torus(&mut rng, major, minor, frequency, amplitude, 400).unwrap();
        for point in &points {
            let p = point.position;
            let u = p.y.atan2(p.x);
            let center = major + (u * frequency).sin() * amplitude;
            let ring = (p.x * p.x + p.y * p.y).sqrt() - center;
            let from_tube = (ring * ring + p.z * p.z).sqrt() - minor;
            assert!(from_tube.abs() < 1e-4, "off surface by {from_tube}");

            let tube_center = Vec3::new(p.x, p.y, 0.0).normalize() * center;
            assert!((point.normal.length() - 1.0).abs() < 1e-5);
            assert!(point.normal.dot((p - tube_center).normalize()) > 0.0);
        }
    }

    #[test]
    fn flat_wobble_matches_plain_torus() {
        let plain = sample_torus(&mut seeded_rng(9), 1.0, 0.3, 50).unwrap();
        let flat = sample_wobbly_torus(&mut seeded_rng(9), 1.0, 0.3, 3.0, 0.0, 50).unwrap();
        for (a, b) in plain.iter().zip(&flat) {
            assert!((a.position - b.position).length() < 1e-5);
            assert!(a.normal.dot(b.normal) > 0.9999);
        }
    }

    #[test]
    fn rejects_wobble_past_the_centre() {
        let mut rng = seeded_rng(0);
        assert!(matches!(
            sample_wobbly_torus(&mut rng, 1.0, 0.2, 3.0, 1.5, 4),
            Err(SampleError::InvalidWobble { .. })
        ));
    }

    #[test]
    fn streams_separate_equal_seeds() {
        let a: u64 = batch_rng(0, 0).random();
        let b: u64 = batch_rng(0, 1).random();
        let c: u64 = batch_rng(0, 1).random();
        assert_ne!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn same_seed_same_samples() {
        let surface = Surface::Torus {
            major_radius: 0.5,
            minor_radius: 0.01,
        };
        let a = surface.sample(&mut seeded_rng(42), 100).unwrap();
        let b = surface.sample(&mut seeded_rng(42), 100).unwrap();
        assert_eq!(a, b);
        let c = surface.sample(&mut seeded_rng(43), 100).unwrap();
        assert_ne!(a, c);
    }
}
