//! PLY file loading functions

use crate::error::DataError;
use crate::types::{Gaussian, GaussianCloud};
use glam::Vec3;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

// serde_ply needs map rows for PLY files with arbitrary property sets
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
}

const DEFAULT_SCALE: f32 = 0.01;

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

fn get_u8(prop: Option<&JsonValue>) -> Option<u8> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n
            .as_u64()
            .map(|u| u as u8)
            .or_else(|| n.as_i64().map(|i| i as u8)),
        _ => None,
    })
}

/// Load a Gaussian snapshot from a PLY file.
///
/// Positions (`x`, `y`, `z`) are required. Everything else is optional:
/// - rotation from `rot_0..rot_3` (stored w-first, as splatting trainers write it),
///   `rot_x/y/z/w` or `qx/qy/qz/qw`, identity otherwise
/// - scale from log-space `scale_0..scale_2` or linear `scale_x/y/z`
/// - color from `red/green/blue` or `r/g/b` (uchar)
/// - opacity from `opacity` or `alpha`; values outside `[0, 1]` are treated as logits
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_gaussians_from_ply(path: impl AsRef<Path>) -> Result<GaussianCloud, DataError> {
    debug!("Loading PLY snapshot");
    let file = File::open(path.as_ref())?;
    read_gaussians(BufReader::new(file))
}

pub(crate) fn read_gaussians(reader: impl BufRead) -> Result<GaussianCloud, DataError> {
    let ply_data: PlyFile = serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        DataError::Ply(e.to_string())
    })?;

    info!("PLY file parsed: {} vertices", ply_data.vertex.len());

    let mut gaussians = Vec::with_capacity(ply_data.vertex.len());

    for (index, vertex) in ply_data.vertex.iter().enumerate() {
        let coord = |field: &'static str| {
            get_f32(vertex.get(field)).ok_or(DataError::MissingField { field, index })
        };
        let position = Vec3::new(coord("x")?, coord("y")?, coord("z")?);

        let rotation = if let (Some(w), Some(x), Some(y), Some(z)) = (
            get_f32(vertex.get("rot_0")),
            get_f32(vertex.get("rot_1")),
            get_f32(vertex.get("rot_2")),
            get_f32(vertex.get("rot_3")),
        ) {
            [x, y, z, w]
        } else if let (Some(x), Some(y), Some(z), Some(w)) = (
            get_f32(vertex.get("rot_x")),
            get_f32(vertex.get("rot_y")),
            get_f32(vertex.get("rot_z")),
            get_f32(vertex.get("rot_w")),
        ) {
            [x, y, z, w]
        } else if let (Some(x), Some(y), Some(z), Some(w)) = (
            get_f32(vertex.get("qx")),
            get_f32(vertex.get("qy")),
            get_f32(vertex.get("qz")),
            get_f32(vertex.get("qw")),
        ) {
            [x, y, z, w]
        } else {
            [0.0, 0.0, 0.0, 1.0]
        };

        let scale = if let (Some(s0), Some(s1), Some(s2)) = (
            get_f32(vertex.get("scale_0")),
            get_f32(vertex.get("scale_1")),
            get_f32(vertex.get("scale_2")),
        ) {
            Vec3::new(s0.exp(), s1.exp(), s2.exp())
        } else if let (Some(sx), Some(sy), Some(sz)) = (
            get_f32(vertex.get("scale_x")),
            get_f32(vertex.get("scale_y")),
            get_f32(vertex.get("scale_z")),
        ) {
            Vec3::new(sx, sy, sz)
        } else {
            Vec3::splat(DEFAULT_SCALE)
        };

        let color = if let (Some(r), Some(g), Some(b)) = (
            get_u8(vertex.get("red")),
            get_u8(vertex.get("green")),
            get_u8(vertex.get("blue")),
        ) {
            Vec3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
        } else if let (Some(r), Some(g), Some(b)) = (
            get_u8(vertex.get("r")),
            get_u8(vertex.get("g")),
            get_u8(vertex.get("b")),
        ) {
            Vec3::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
        } else {
            Vec3::splat(0.8)
        };

        let raw_opacity = get_f32(vertex.get("opacity"))
            .or_else(|| get_f32(vertex.get("alpha")))
            .unwrap_or(1.0);
        let opacity = if (0.0..=1.0).contains(&raw_opacity) {
            raw_opacity
        } else {
            (1.0 / (1.0 + (-raw_opacity).exp())).clamp(0.0, 1.0)
        };

        gaussians.push(Gaussian::new(position, rotation, scale, color, opacity));
    }

    debug!("Loaded {} Gaussians from PLY file", gaussians.len());
    Ok(GaussianCloud::new(gaussians))
}
