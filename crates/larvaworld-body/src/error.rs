use thiserror::Error;

/// Errors raised while building, driving or tearing down a body
#[derive(Debug, Error, PartialEq)]
pub enum BodyError {
    #[error("Segment count must be at least 1, got {0}")]
    InvalidSegmentCount(usize),

    #[error("Segment ratio must have {expected} entries summing to 1, got {len} entries summing to {sum}")]
    InvalidSegmentRatio { expected: usize, len: usize, sum: f32 },

    #[error("Interval {interval} leaves no body for {segments} segments")]
    InvalidInterval { segments: usize, interval: f32 },

    #[error("Segment {segment} spans [{s2}, {s0}], which no outline case covers")]
    UnsupportedSegmentSpan { segment: usize, s0: f32, s2: f32 },

    #[error("Segment outline is empty")]
    EmptyOutline,

    #[error("Segment outline is degenerate (area {area})")]
    DegenerateOutline { area: f32 },

    #[error("Segment outline has no convex hull")]
    InvalidConvexHull,

    #[error("Body length must be positive, got {0}")]
    InvalidLength(f32),

    #[error("Joint endpoint segment {0} is not in the physics world")]
    MissingSegment(usize),

    #[error("Rigid body is not in the physics world")]
    UnknownBody,

    #[error("Rigid bodies need a physics world")]
    MissingWorld,

    #[error("Expected {expected} replay poses, got {got}")]
    ReplayMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, BodyError>;
