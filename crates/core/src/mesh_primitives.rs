use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use yarn_scene::PointsPolygons;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WobbleSettings {
    pub u_steps: u32,
    pub v_steps: u32,
    /// Wobbles per revolution around the major circle.
    pub frequency: f32,
    pub amplitude: f32,
}

impl Default for WobbleSettings {
    fn default() -> Self {
        Self {
            u_steps: 64,
            v_steps: 32,
            frequency: 3.0,
            amplitude: 0.5,
        }
    }
}

/// Quad-mesh torus whose major radius is modulated by
/// `sin(u * frequency) * amplitude`.
///
/// The grid is closed in both directions by repeating the seam row and
/// column, so `st` runs cleanly from 0 to 1 without wrapping indices.
pub fn make_wobbly_torus(
    major_radius: f32,
    minor_radius: f32,
    settings: &WobbleSettings,
) -> PointsPolygons {
    let u_steps = settings.u_steps.max(3);
    let v_steps = settings.v_steps.max(3);
    let stride = v_steps + 1;
    let vertex_count = ((u_steps + 1) * stride) as usize;

    let mut points = Vec::with_capacity(vertex_count * 3);
    let mut st = Vec::with_capacity(vertex_count * 2);
    for i in 0..=u_steps {
        let s = i as f32 / u_steps as f32;
        let u = s * TAU;
        let (sin_u, cos_u) = u.sin_cos();
        let wobbled = major_radius + (u * settings.frequency).sin() * settings.amplitude;

        for j in 0..=v_steps {
            let t = j as f32 / v_steps as f32;
            let v = t * TAU;
            let (sin_v, cos_v) = v.sin_cos();
            let ring = wobbled + minor_radius * cos_v;
            points.extend_from_slice(&[ring * cos_u, ring * sin_u, minor_radius * sin_v]);
            st.extend_from_slice(&[s, t]);
        }
    }

    let face_count = (u_steps * v_steps) as usize;
    let mut verts = Vec::with_capacity(face_count * 4);
    for i in 0..u_steps {
        for j in 0..v_steps {
            let i0 = i * stride + j;
            let i1 = (i + 1) * stride + j;
            let i2 = i1 + 1;
            let i3 = i0 + 1;
            verts.extend_from_slice(&[i0, i1, i2, i3]);
        }
    }

    PointsPolygons {
        nverts: vec![4; face_count],
        verts,
        points,
        st: Some(st),
    }
}
