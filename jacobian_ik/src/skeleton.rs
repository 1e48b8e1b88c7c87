//! Bone hierarchy seen by the solver.
//!
//! The solver only needs four things from a bone: its combined (world)
//! transform, its parent, whether it is initialized, and which of its local
//! rotation axes are free. [`Skeleton`] captures that contract; [`BoneTree`]
//! is an arena implementation used by the driver, the simulator and tests.

use nalgebra::{Matrix4, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{IkError, Result};

/// Upper bound on bones visited per traversal. Only reached if a hierarchy
/// has a cycle of bones without free axes.
pub const MAX_CHAIN_DEPTH: usize = 1024;

/// Enabled local rotation axes of a bone.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisMask {
    #[serde(default)]
    pub x: bool,
    #[serde(default)]
    pub y: bool,
    #[serde(default)]
    pub z: bool,
}

impl AxisMask {
    pub const fn new(x: bool, y: bool, z: bool) -> Self {
        Self { x, y, z }
    }

    pub const fn all() -> Self {
        Self::new(true, true, true)
    }

    pub const fn none() -> Self {
        Self::new(false, false, false)
    }

    pub const fn x() -> Self {
        Self::new(true, false, false)
    }

    pub const fn y() -> Self {
        Self::new(false, true, false)
    }

    pub const fn z() -> Self {
        Self::new(false, false, true)
    }

    pub fn count(&self) -> usize {
        usize::from(self.x) + usize::from(self.y) + usize::from(self.z)
    }

    /// Unit vectors of the enabled axes, in x, y, z order.
    pub fn enabled(&self) -> impl Iterator<Item = Vector3<f64>> {
        [
            (self.x, Vector3::x()),
            (self.y, Vector3::y()),
            (self.z, Vector3::z()),
        ]
        .into_iter()
        .filter_map(|(on, axis)| on.then_some(axis))
    }
}

/// Read access to a bone hierarchy.
pub trait Skeleton {
    type BoneId: Copy + std::fmt::Debug;

    /// Combined (world) transform of the bone.
    fn combined(&self, bone: Self::BoneId) -> Matrix4<f64>;

    /// Parent bone, `None` at the root.
    fn parent(&self, bone: Self::BoneId) -> Option<Self::BoneId>;

    /// Whether the bone's combined transform is valid. Traversal stops at
    /// the first uninitialized bone.
    fn is_initialized(&self, bone: Self::BoneId) -> bool;

    fn axes(&self, bone: Self::BoneId) -> AxisMask;
}

/// One free rotation axis of the chain, in Jacobian column order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainAxis<B> {
    pub bone: B,
    /// Local axis (unit x, y or z).
    pub axis: Vector3<f64>,
}

/// Free axes from the end effector toward the root.
///
/// Each bone contributes its enabled axes in x, y, z order, then the walk
/// moves to its parent. The walk stops after `max_columns` axes, at an
/// uninitialized bone, or past the root.
pub fn chain_axes<S: Skeleton>(
    skeleton: &S,
    end_effector: S::BoneId,
    max_columns: usize,
) -> Vec<ChainAxis<S::BoneId>> {
    let mut chain = Vec::with_capacity(max_columns);
    let mut current = Some(end_effector);
    let mut depth = 0;

    while let Some(bone) = current {
        if chain.len() >= max_columns || !skeleton.is_initialized(bone) {
            break;
        }
        if depth == MAX_CHAIN_DEPTH {
            warn!(
                "Bone chain deeper than {} bones, stopping traversal at {:?}",
                MAX_CHAIN_DEPTH, bone
            );
            break;
        }
        depth += 1;

        for axis in skeleton.axes(bone).enabled() {
            if chain.len() == max_columns {
                break;
            }
            chain.push(ChainAxis { bone, axis });
        }
        current = skeleton.parent(bone);
    }

    chain
}

/// Index of a bone in a [`BoneTree`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneId(pub usize);

impl BoneId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<BoneId>,
    /// Rest transform relative to the parent.
    pub local: Matrix4<f64>,
    /// Joint rotation applied after the rest transform.
    pub rotation: UnitQuaternion<f64>,
    pub axes: AxisMask,
    combined: Matrix4<f64>,
    initialized: bool,
}

impl Bone {
    pub fn combined(&self) -> &Matrix4<f64> {
        &self.combined
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Arena of bones. Parents are always added before their children, so
/// the hierarchy is acyclic and index order is a valid update order.
///
/// Bones start uninitialized; [`BoneTree::update_combined`] composes the
/// combined transforms and marks every bone initialized.
#[derive(Debug, Clone, Default)]
pub struct BoneTree {
    bones: Vec<Bone>,
}

impl BoneTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn add_root(
        &mut self,
        name: impl Into<String>,
        local: Matrix4<f64>,
        axes: AxisMask,
    ) -> BoneId {
        self.push(name.into(), None, local, axes)
    }

    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent: BoneId,
        local: Matrix4<f64>,
        axes: AxisMask,
    ) -> Result<BoneId> {
        if parent.0 >= self.bones.len() {
            return Err(IkError::UnknownBone(parent.0));
        }
        Ok(self.push(name.into(), Some(parent), local, axes))
    }

    fn push(
        &mut self,
        name: String,
        parent: Option<BoneId>,
        local: Matrix4<f64>,
        axes: AxisMask,
    ) -> BoneId {
        let id = BoneId(self.bones.len());
        self.bones.push(Bone {
            name,
            parent,
            local,
            rotation: UnitQuaternion::identity(),
            axes,
            combined: Matrix4::identity(),
            initialized: false,
        });
        id
    }

    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.bones.iter().position(|b| b.name == name).map(BoneId)
    }

    /// Sets a joint rotation. Call [`BoneTree::update_combined`] afterwards.
    pub fn set_rotation(&mut self, id: BoneId, rotation: UnitQuaternion<f64>) -> Result<()> {
        let bone = self.bones.get_mut(id.0).ok_or(IkError::UnknownBone(id.0))?;
        bone.rotation = rotation;
        Ok(())
    }

    /// Recomputes `combined = parent.combined * local * rotation` for every bone.
    pub fn update_combined(&mut self) {
        for i in 0..self.bones.len() {
            let parent = match self.bones[i].parent {
                Some(p) => self.bones[p.0].combined,
                None => Matrix4::identity(),
            };
            let bone = &mut self.bones[i];
            bone.combined = parent * bone.local * bone.rotation.to_homogeneous();
            bone.initialized = true;
        }
    }

    /// Applies joint deltas in Jacobian column order and refreshes the
    /// combined transforms. Returns the number of deltas applied, which is
    /// less than `delta_theta.len()` when the chain has fewer free axes.
    pub fn apply_delta_theta(
        &mut self,
        end_effector: BoneId,
        delta_theta: &[f64],
    ) -> Result<usize> {
        if end_effector.0 >= self.bones.len() {
            return Err(IkError::UnknownBone(end_effector.0));
        }

        let chain = chain_axes(&*self, end_effector, delta_theta.len());
        for (joint, delta) in chain.iter().zip(delta_theta) {
            let step = UnitQuaternion::from_axis_angle(&Unit::new_unchecked(joint.axis), *delta);
            let bone = &mut self.bones[joint.bone.0];
            bone.rotation *= step;
        }
        self.update_combined();

        Ok(chain.len())
    }
}

impl Skeleton for BoneTree {
    type BoneId = BoneId;

    fn combined(&self, bone: BoneId) -> Matrix4<f64> {
        self.bones.get(bone.0).map_or_else(Matrix4::identity, |b| b.combined)
    }

    fn parent(&self, bone: BoneId) -> Option<BoneId> {
        self.bones.get(bone.0).and_then(|b| b.parent)
    }

    fn is_initialized(&self, bone: BoneId) -> bool {
        self.bones.get(bone.0).is_some_and(|b| b.initialized)
    }

    fn axes(&self, bone: BoneId) -> AxisMask {
        self.bones.get(bone.0).map_or_else(AxisMask::none, |b| b.axes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::{pose_matrix, position_of};
    use std::cell::Cell;
    use std::f64::consts::FRAC_PI_2;

    fn offset(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        pose_matrix(&Vector3::new(x, y, z), &UnitQuaternion::identity())
    }

    /// shoulder (xyz) -> elbow (z) -> hand (none)
    fn arm() -> (BoneTree, BoneId) {
        let mut tree = BoneTree::new();
        let shoulder = tree.add_root("shoulder", offset(0.0, 0.0, 1.0), AxisMask::all());
        let elbow = tree.add_bone("elbow", shoulder, offset(0.5, 0.0, 0.0), AxisMask::z()).unwrap();
        let hand = tree.add_bone("hand", elbow, offset(0.5, 0.0, 0.0), AxisMask::none()).unwrap();
        tree.update_combined();
        (tree, hand)
    }

    #[test]
    fn axis_mask_order_and_count() {
        let mask = AxisMask::new(true, false, true);
        assert_eq!(mask.count(), 2);
        let axes: Vec<_> = mask.enabled().collect();
        assert_eq!(axes, vec![Vector3::x(), Vector3::z()]);
        assert_eq!(AxisMask::none().enabled().count(), 0);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut tree = BoneTree::new();
        let err = tree.add_bone("orphan", BoneId(3), Matrix4::identity(), AxisMask::z());
        assert!(matches!(err, Err(IkError::UnknownBone(3))));
    }

    #[test]
    fn combined_transforms_compose_from_root() {
        let (tree, hand) = arm();
        let p = position_of(tree.bone(hand).unwrap().combined());
        assert!((p - Vector3::new(1.0, 0.0, 1.0)).norm() < 1e-12);
        assert_eq!(tree.find("elbow"), Some(BoneId(1)));
        assert_eq!(tree.find("knee"), None);
    }

    #[test]
    fn chain_walks_effector_to_root() {
        let (tree, hand) = arm();
        let chain = chain_axes(&tree, hand, 8);

        let bones: Vec<usize> = chain.iter().map(|c| c.bone.index()).collect();
        assert_eq!(bones, vec![1, 0, 0, 0]);
        assert_eq!(chain[0].axis, Vector3::z());
        assert_eq!(chain[1].axis, Vector3::x());
        assert_eq!(chain[3].axis, Vector3::z());
    }

    #[test]
    fn chain_is_bounded_by_column_count() {
        let (tree, hand) = arm();
        let chain = chain_axes(&tree, hand, 2);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].bone, BoneId(0));
        assert_eq!(chain[1].axis, Vector3::x());
    }

    #[test]
    fn uninitialized_bones_stop_traversal() {
        let mut tree = BoneTree::new();
        let root = tree.add_root("root", Matrix4::identity(), AxisMask::z());
        let tip = tree.add_bone("tip", root, offset(1.0, 0.0, 0.0), AxisMask::z()).unwrap();
        assert!(chain_axes(&tree, tip, 4).is_empty());

        tree.update_combined();
        assert_eq!(chain_axes(&tree, tip, 4).len(), 2);
    }

    #[test]
    fn apply_delta_rotates_about_local_axis() {
        let mut tree = BoneTree::new();
        let root = tree.add_root("root", Matrix4::identity(), AxisMask::z());
        let tip = tree.add_bone("tip", root, offset(1.0, 0.0, 0.0), AxisMask::none()).unwrap();
        tree.update_combined();

        let applied = tree.apply_delta_theta(tip, &[FRAC_PI_2, 0.3]).unwrap();
        assert_eq!(applied, 1);

        let p = position_of(tree.bone(tip).unwrap().combined());
        assert!((p - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn apply_delta_rejects_unknown_effector() {
        let (mut tree, _) = arm();
        assert!(tree.apply_delta_theta(BoneId(42), &[0.1]).is_err());
    }

    /// Two bones that name each other as parent and have no free axes.
    #[derive(Default)]
    struct CyclicPair {
        visits: Cell<usize>,
    }

    impl Skeleton for CyclicPair {
        type BoneId = usize;

        fn combined(&self, _bone: usize) -> Matrix4<f64> {
            Matrix4::identity()
        }

        fn parent(&self, bone: usize) -> Option<usize> {
            Some(1 - bone)
        }

        fn is_initialized(&self, _bone: usize) -> bool {
            true
        }

        fn axes(&self, _bone: usize) -> AxisMask {
            self.visits.set(self.visits.get() + 1);
            AxisMask::none()
        }
    }

    #[test]
    fn chain_walk_stops_on_parent_cycle() {
        let cycle = CyclicPair::default();
        assert!(chain_axes(&cycle, 0, 4).is_empty());
        assert_eq!(cycle.visits.get(), MAX_CHAIN_DEPTH);

        let jacobian: nalgebra::SMatrix<f64, 3, 4> = crate::jacobian::build_jacobian(&cycle, 1);
        assert_eq!(jacobian, nalgebra::SMatrix::<f64, 3, 4>::zeros());
    }
}
