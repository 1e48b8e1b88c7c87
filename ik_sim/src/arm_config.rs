//! Arm presets for the IK simulator.
//!
//! Each preset is a serial chain of segments. A segment is placed at a fixed
//! offset from its parent, rests at a fixed rotation, and exposes the local
//! axes the solver may rotate. Lengths are in meters, angles in radians.

use std::fmt;

use jacobian_ik::transforms::pose_matrix;
use jacobian_ik::{AxisMask, BoneId, BoneTree, IkError, Result};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArmModel {
    /// Three z joints in the xy plane, 0.3 m links.
    #[default]
    PlanarThreeLink,
    /// Ball shoulder, hinge elbow and two-axis wrist.
    HumanoidArm,
}

impl ArmModel {
    pub fn all() -> Vec<ArmModel> {
        vec![ArmModel::PlanarThreeLink, ArmModel::HumanoidArm]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ArmModel::PlanarThreeLink => "Planar 3-link (3 DOF, 0.9 m)",
            ArmModel::HumanoidArm => "Humanoid arm (6 DOF, 0.65 m)",
        }
    }
}

impl fmt::Display for ArmModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub name: String,
    /// Translation from the parent segment.
    pub offset: [f64; 3],
    /// Rest rotation as roll, pitch, yaw.
    #[serde(default)]
    pub rest_rotation: [f64; 3],
    #[serde(default)]
    pub axes: AxisMask,
}

impl SegmentConfig {
    fn new(name: &str, offset: [f64; 3], rest_rotation: [f64; 3], axes: AxisMask) -> Self {
        Self {
            name: name.to_string(),
            offset,
            rest_rotation,
            axes,
        }
    }
}

/// Serial arm description. The first segment is the root, the last one
/// is the end effector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmConfig {
    pub model: ArmModel,

    /// Sum of the link lengths in meters.
    pub reach: f64,

    pub segments: Vec<SegmentConfig>,
}

impl ArmConfig {
    /// Planar arm, bent so it does not start at the stretched singularity.
    pub fn planar_three_link() -> Self {
        Self {
            model: ArmModel::PlanarThreeLink,
            reach: 0.9,
            segments: vec![
                SegmentConfig::new("base", [0.0, 0.0, 0.0], [0.0, 0.0, 0.2], AxisMask::z()),
                SegmentConfig::new("link1", [0.3, 0.0, 0.0], [0.0, 0.0, 0.5], AxisMask::z()),
                SegmentConfig::new("link2", [0.3, 0.0, 0.0], [0.0, 0.0, 0.5], AxisMask::z()),
                SegmentConfig::new("tip", [0.3, 0.0, 0.0], [0.0, 0.0, 0.0], AxisMask::none()),
            ],
        }
    }

    /// Right arm hanging off a fixed torso, elbow bent by 0.8 rad.
    pub fn humanoid_arm() -> Self {
        Self {
            model: ArmModel::HumanoidArm,
            reach: 0.65,
            segments: vec![
                SegmentConfig::new("torso", [0.0, 0.0, 0.0], [0.0, 0.0, 0.0], AxisMask::none()),
                SegmentConfig::new("shoulder", [0.0, 0.2, 1.4], [0.0, 0.0, 0.0], AxisMask::all()),
                SegmentConfig::new("elbow", [0.3, 0.0, 0.0], [0.0, 0.0, -0.8], AxisMask::z()),
                SegmentConfig::new(
                    "wrist",
                    [0.25, 0.0, 0.0],
                    [0.0, 0.0, 0.0],
                    AxisMask::new(false, true, true),
                ),
                SegmentConfig::new("hand", [0.1, 0.0, 0.0], [0.0, 0.0, 0.0], AxisMask::none()),
            ],
        }
    }

    pub fn from_model(model: ArmModel) -> Self {
        match model {
            ArmModel::PlanarThreeLink => Self::planar_three_link(),
            ArmModel::HumanoidArm => Self::humanoid_arm(),
        }
    }

    /// Total number of free joint axes.
    pub fn joint_dofs(&self) -> usize {
        self.segments.iter().map(|s| s.axes.count()).sum()
    }

    /// Builds the bone tree at its rest pose and returns it with the end
    /// effector.
    pub fn build(&self) -> Result<(BoneTree, BoneId)> {
        let (root, rest) = self
            .segments
            .split_first()
            .ok_or_else(|| IkError::invalid_config("arm has no segments"))?;

        let mut tree = BoneTree::new();
        let mut last = tree.add_root(root.name.clone(), local_transform(root), root.axes);
        tree.set_rotation(last, rest_rotation(root))?;

        for segment in rest {
            let local = local_transform(segment);
            last = tree.add_bone(segment.name.clone(), last, local, segment.axes)?;
            tree.set_rotation(last, rest_rotation(segment))?;
        }

        tree.update_combined();
        Ok((tree, last))
    }
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self::planar_three_link()
    }
}

fn local_transform(segment: &SegmentConfig) -> nalgebra::Matrix4<f64> {
    pose_matrix(&Vector3::from(segment.offset), &UnitQuaternion::identity())
}

fn rest_rotation(segment: &SegmentConfig) -> UnitQuaternion<f64> {
    let [roll, pitch, yaw] = segment.rest_rotation;
    UnitQuaternion::from_euler_angles(roll, pitch, yaw)
}
