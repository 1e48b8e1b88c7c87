/// Iterative solves on small arms with reachable targets.
use jacobian_ik::transforms::{orientation_of, pose_matrix, position_of};
use jacobian_ik::{
    AxisMask, BoneId, BoneTree, IkConfig, IkDriver, IkMode, PoseSolver, TargetPose,
};
use nalgebra::{Matrix4, UnitQuaternion, Vector3};

fn offset(x: f64, y: f64, z: f64) -> Matrix4<f64> {
    pose_matrix(&Vector3::new(x, y, z), &UnitQuaternion::identity())
}

fn planar_arm(angles: [f64; 3]) -> (BoneTree, BoneId) {
    let mut tree = BoneTree::new();
    let base = tree.add_root("base", Matrix4::identity(), AxisMask::z());
    let link1 = tree.add_bone("link1", base, offset(0.3, 0.0, 0.0), AxisMask::z()).unwrap();
    let link2 = tree.add_bone("link2", link1, offset(0.3, 0.0, 0.0), AxisMask::z()).unwrap();
    let tip = tree.add_bone("tip", link2, offset(0.3, 0.0, 0.0), AxisMask::none()).unwrap();
    for (bone, angle) in [base, link1, link2].into_iter().zip(angles) {
        tree.set_rotation(bone, UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle))
            .unwrap();
    }
    tree.update_combined();
    (tree, tip)
}

fn humanoid_arm() -> (BoneTree, BoneId) {
    let mut tree = BoneTree::new();
    let torso = tree.add_root("torso", Matrix4::identity(), AxisMask::none());
    let shoulder = tree
        .add_bone("shoulder", torso, offset(0.0, 0.2, 1.4), AxisMask::all())
        .unwrap();
    let elbow = tree.add_bone("elbow", shoulder, offset(0.3, 0.0, 0.0), AxisMask::z()).unwrap();
    let wrist = tree
        .add_bone("wrist", elbow, offset(0.25, 0.0, 0.0), AxisMask::new(false, true, true))
        .unwrap();
    let hand = tree.add_bone("hand", wrist, offset(0.1, 0.0, 0.0), AxisMask::none()).unwrap();
    tree.set_rotation(elbow, UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -0.8)).unwrap();
    tree.update_combined();
    (tree, hand)
}

fn pose_of(tree: &BoneTree, bone: BoneId) -> TargetPose {
    let combined = tree.bone(bone).unwrap().combined();
    TargetPose::new(position_of(combined), orientation_of(combined).into_inner())
}

fn position_config() -> IkConfig {
    IkConfig::default().with_iterations(300, 1e-3)
}

#[test]
fn damped_modes_reach_planar_target() {
    let (reference, reference_tip) = planar_arm([0.6, 1.0, 0.9]);
    let reference_pose = reference.bone(reference_tip).unwrap().combined();
    let target = TargetPose::position(position_of(reference_pose));

    for mode in [IkMode::Dls, IkMode::DlsWithSvd, IkMode::Sdls] {
        let (mut tree, tip) = planar_arm([0.2, 0.5, 0.5]);
        let mut driver = IkDriver::<3, 3>::new(position_config()).unwrap();

        let outcome = driver.run(&mut tree, tip, &target, mode).unwrap();
        assert!(outcome.converged, "{} stopped at error {}", mode, outcome.error);
        assert!(outcome.steps < 300);
        assert!(outcome.error <= 1e-3);

        let reached = position_of(tree.bone(tip).unwrap().combined());
        assert!((reached - target.position).norm() <= 1e-3);
        assert_eq!(driver.solver().error(), outcome.error);
    }
}

#[test]
fn transpose_reduces_planar_error() {
    let (reference, reference_tip) = planar_arm([0.6, 1.0, 0.9]);
    let reference_pose = reference.bone(reference_tip).unwrap().combined();
    let target = TargetPose::position(position_of(reference_pose));

    let (mut tree, tip) = planar_arm([0.2, 0.5, 0.5]);
    let initial = (position_of(tree.bone(tip).unwrap().combined()) - target.position).norm();

    let mut driver = IkDriver::<3, 3>::new(position_config()).unwrap();
    let outcome = driver.run(&mut tree, tip, &target, IkMode::Transpose).unwrap();
    assert!(outcome.error.is_finite());
    assert!(outcome.error < initial);
}

#[test]
fn dls_tracks_full_pose() {
    let (mut reference, hand) = humanoid_arm();
    reference.apply_delta_theta(hand, &[0.2, -0.3, 0.25, 0.15, -0.2, 0.1]).unwrap();
    let target = pose_of(&reference, hand);

    let (mut tree, hand) = humanoid_arm();
    let mut solver = PoseSolver::<6>::default();
    solver.compute_delta_theta(&tree, hand, &target, IkMode::Dls);
    let initial = solver.error();
    assert!(initial > 0.1);

    let mut driver = IkDriver::<6, 6>::new(IkConfig::default().with_iterations(300, 1e-4)).unwrap();
    let outcome = driver.run(&mut tree, hand, &target, IkMode::Dls).unwrap();
    assert!(outcome.error.is_finite());
    assert!(outcome.error < 0.1 * initial, "error {} from {}", outcome.error, initial);
}

#[test]
fn run_reports_unreachable_target_without_converging() {
    let (mut tree, tip) = planar_arm([0.2, 0.5, 0.5]);
    let target = TargetPose::position(Vector3::new(5.0, 0.0, 0.0));

    let mut driver = IkDriver::<3, 3>::new(IkConfig::default().with_iterations(50, 1e-3)).unwrap();
    let outcome = driver.run(&mut tree, tip, &target, IkMode::Dls).unwrap();
    assert!(!outcome.converged);
    assert_eq!(outcome.steps, 50);
    // The arm is 0.9 long, so the residual is at least 4.1.
    assert!(outcome.error >= 4.1 - 1e-9);
}
