use std::io;
use std::path::PathBuf;

use thiserror::Error;
use yarn_scene::ScopeKind;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("{name} must be positive and finite, got {value}")]
    InvalidRadius { name: &'static str, value: f32 },
    #[error("wobble must be finite and smaller than the major radius (frequency {frequency}, amplitude {amplitude})")]
    InvalidWobble { frequency: f32, amplitude: f32 },
}

#[derive(Debug, Error)]
pub enum StrandError {
    #[error("strands need at least 2 control points, got {0}")]
    TooFewControlPoints(usize),
    #[error("{name} must be positive and finite, got {value}")]
    InvalidDimension { name: &'static str, value: f32 },
    #[error("invalid range for {name}: [{min}, {max}]")]
    InvalidRange {
        name: &'static str,
        min: f32,
        max: f32,
    },
    #[error("seed normal has zero length")]
    DegenerateNormal,
    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// The three parallel strand collections disagree with each other.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("point buffer holds {actual} coordinates, counts require {expected}")]
    PointCount { expected: usize, actual: usize },
    #[error("{widths} widths for {strands} strands")]
    WidthCount { strands: usize, widths: usize },
    #[error("strand {index} has no control points")]
    EmptyStrand { index: usize },
    #[error("strand buffer contains non-finite values")]
    NonFinite,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("scene output failed: {0}")]
    Io(#[from] io::Error),
    #[error("{} end closes a {} scope", .found.label(), .expected.label())]
    MismatchedScope { expected: ScopeKind, found: ScopeKind },
    #[error("{} end without a matching begin", .kind.label())]
    UnopenedScope { kind: ScopeKind },
    #[error("{open} scope(s) still open when the scene finished")]
    UnclosedScopes { open: usize },
    #[error("renderer rejected {request}: {reason}")]
    Rejected {
        request: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("hair generation failed: {0}")]
    Strand(#[from] StrandError),
    #[error("malformed strand buffer: {0}")]
    Buffer(#[from] BufferError),
    #[error("invalid scene setting: {0}")]
    Setting(String),
}
