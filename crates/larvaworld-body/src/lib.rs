//! Segmented larva bodies
//!
//! This crate implements:
//! - Partitioning of a parametric larva outline into N polygon segments
//! - Kinematic and rapier2d-backed segment implementations behind one trait
//! - Distance and revolute joints between consecutive segments
//! - Contour stitching and area-weighted centroids
//! - Segment poses reconstructed from recorded tracks

pub mod body;
pub mod contour;
pub mod error;
pub mod joints;
pub mod kinematic;
pub mod physics;
pub mod replay;
pub mod rigid;
pub mod segment;
pub mod shape;

// Re-export main types for convenience
pub use body::{BodyBackend, BodyConfig, LarvaBody};
pub use error::BodyError;
pub use joints::{JointTypes, Sides};
pub use kinematic::KinematicSegment;
pub use physics::{BodyState, Damping, RapierWorld};
pub use rigid::RigidSegment;
pub use segment::{Color, Material, Pose, Segment};
