//! Skeleton Tests
//!
//! Tests for:
//! - Hierarchy validation and root lookup
//! - Bind-pose composition along the parent chain
//! - Skeleton masks and the name-based mask builder
//! - Layered pose evaluation (normalized, additive, masked bones)
//! - Skinning matrices

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use myth_anim::animation::clip::{AnimationClip, TransformCurves};
use myth_anim::animation::state::{AnimationStateLayer, LayerBlendMode, ProxyState};
use myth_anim::animation::tracks::{InterpolationMode, KeyframeTrack};
use myth_anim::errors::AnimationError;
use myth_anim::skeleton::{Bone, BoneTransform, Skeleton, SkeletonMask, SkeletonMaskBuilder};

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

/// root -> child -> grandchild, each offset by one unit on X, Y and Z.
fn chain_skeleton() -> Skeleton {
    Skeleton::from_bind_pose(
        "chain",
        [
            ("root".to_string(), None, BoneTransform::from_translation(Vec3::X)),
            ("child".to_string(), Some(0), BoneTransform::from_translation(Vec3::Y)),
            ("grandchild".to_string(), Some(1), BoneTransform::from_translation(Vec3::Z)),
        ],
    )
    .expect("chain is parent-before-child")
}

fn translation_of(m: &Mat4) -> Vec3 {
    m.w_axis.truncate()
}

fn clip_moving(target: &str, from: Vec3, to: Vec3) -> Arc<AnimationClip> {
    let curves = TransformCurves::new(target).with_position(KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![from, to],
        InterpolationMode::Linear,
    ));
    Arc::new(AnimationClip::new(format!("{target}_move"), vec![curves], vec![]))
}

fn layer_with(
    skeleton: &Skeleton,
    blend_mode: LayerBlendMode,
    states: &[(&Arc<AnimationClip>, f32, f32)],
) -> AnimationStateLayer {
    let states = states
        .iter()
        .enumerate()
        .map(|(source, (clip, time, weight))| {
            let mut state = ProxyState::new(Arc::clone(clip), source);
            state.time = *time;
            state.weight = *weight;
            state.looped = false;
            state.bone_curves = skeleton
                .bones()
                .iter()
                .map(|b| clip.find_transform_curves(&b.name))
                .collect();
            state
        })
        .collect();
    AnimationStateLayer {
        id: 0,
        blend_mode,
        states,
    }
}

fn evaluate(
    skeleton: &Skeleton,
    mask: Option<&SkeletonMask>,
    layers: &[AnimationStateLayer],
) -> (Vec<Mat4>, Vec<BoneTransform>) {
    let mut world = vec![Mat4::IDENTITY; skeleton.bone_count()];
    let mut local = vec![BoneTransform::IDENTITY; skeleton.bone_count()];
    skeleton
        .get_pose(&mut world, &mut local, mask, layers)
        .expect("buffers sized to the skeleton");
    (world, local)
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn root_bone_has_no_parent() {
    let skeleton = chain_skeleton();
    let root = skeleton.root_bone_index().expect("chain has a root");
    assert_eq!(root, 0);
    assert!(skeleton.bones()[root].parent.is_none());
}

#[test]
fn empty_skeleton_has_no_root() {
    let skeleton = Skeleton::new("empty", Vec::new()).expect("empty skeleton is valid");
    assert_eq!(skeleton.root_bone_index(), None);
    assert_eq!(skeleton.bone_count(), 0);
}

#[test]
fn bones_must_follow_their_parent() {
    let bones = vec![
        Bone::new("a", Some(1), BoneTransform::IDENTITY, Mat4::IDENTITY),
        Bone::new("b", None, BoneTransform::IDENTITY, Mat4::IDENTITY),
    ];
    let err = Skeleton::new("bad", bones).expect_err("child stored before parent");
    assert_eq!(
        err,
        AnimationError::BoneOrder {
            name: "a".to_string(),
            index: 0,
            parent: 1,
        }
    );
}

#[test]
fn self_parented_bone_is_rejected() {
    let bones = vec![Bone::new("loop", Some(0), BoneTransform::IDENTITY, Mat4::IDENTITY)];
    assert!(matches!(
        Skeleton::new("bad", bones),
        Err(AnimationError::BoneOrder { index: 0, parent: 0, .. })
    ));
}

#[test]
fn find_bone_returns_first_match() {
    let skeleton = Skeleton::from_bind_pose(
        "dupes",
        [
            ("hip".to_string(), None, BoneTransform::IDENTITY),
            ("hand".to_string(), Some(0), BoneTransform::IDENTITY),
            ("hand".to_string(), Some(0), BoneTransform::IDENTITY),
        ],
    )
    .expect("valid hierarchy");
    assert_eq!(skeleton.find_bone("hand"), Some(1));
    assert_eq!(skeleton.find_bone("foot"), None);
}

// ============================================================================
// Bind Pose
// ============================================================================

#[test]
fn compute_bone_transform_composes_chain() {
    let skeleton = chain_skeleton();
    let expected = [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
    ];
    for (index, want) in expected.iter().enumerate() {
        let m = skeleton
            .compute_bone_transform(index)
            .expect("index in range");
        assert!(
            approx_vec3(translation_of(&m), *want),
            "Bone {index}: expected {want}, got {}",
            translation_of(&m)
        );
    }
}

#[test]
fn compute_bone_transform_out_of_range() {
    let skeleton = chain_skeleton();
    assert!(skeleton.compute_bone_transform(3).is_none());
}

#[test]
fn compute_bone_transform_applies_parent_rotation() {
    // Root rotated 90 degrees about Z turns the child's +X offset into +Y
    let skeleton = Skeleton::from_bind_pose(
        "rotated",
        [
            (
                "root".to_string(),
                None,
                BoneTransform::from_rotation(Quat::from_rotation_z(FRAC_PI_2)),
            ),
            ("tip".to_string(), Some(0), BoneTransform::from_translation(Vec3::X)),
        ],
    )
    .expect("valid hierarchy");

    let m = skeleton.compute_bone_transform(1).expect("tip exists");
    assert!(
        approx_vec3(translation_of(&m), Vec3::Y),
        "Expected tip at +Y, got {}",
        translation_of(&m)
    );
}

#[test]
fn bind_pose_skinning_matrices_are_identity() {
    let skeleton = chain_skeleton();
    let (world, _) = evaluate(&skeleton, None, &[]);

    let mut skinning = Vec::new();
    skeleton
        .skinning_matrices(&world, &mut skinning)
        .expect("pose covers every bone");
    assert_eq!(skinning.len(), 3);
    for (i, m) in skinning.iter().enumerate() {
        assert!(
            m.abs_diff_eq(Mat4::IDENTITY, EPSILON),
            "Bone {i} skinning matrix should be identity in bind pose, got {m}"
        );
    }
}

#[test]
fn skinning_matrices_reject_short_pose() {
    let skeleton = chain_skeleton();
    let mut out = Vec::new();
    let err = skeleton
        .skinning_matrices(&[Mat4::IDENTITY], &mut out)
        .expect_err("pose has one matrix for three bones");
    assert!(matches!(
        err,
        AnimationError::BufferTooSmall { required: 3, actual: 1, .. }
    ));
}

// ============================================================================
// Masks
// ============================================================================

#[test]
fn mask_reports_out_of_range_as_enabled() {
    let mask = SkeletonMask::all_enabled(3);
    assert!(mask.is_enabled(3));
    assert!(mask.is_enabled(1000));
}

#[test]
fn mask_reflects_latest_bone_state() {
    let skeleton = chain_skeleton();
    let mut builder = SkeletonMaskBuilder::new(&skeleton);
    assert!(builder.set_bone_state("child", false));
    let mask = builder.build();
    assert!(mask.is_enabled(0));
    assert!(!mask.is_enabled(1));
    assert!(mask.is_enabled(2));
    assert_eq!(mask.enabled_count(), 2);

    let mut builder = SkeletonMaskBuilder::new(&skeleton);
    builder.set_bone_state("child", false);
    builder.set_bone_state("child", true);
    assert!(builder.build().is_enabled(1), "Last write should win");
}

#[test]
fn mask_builder_ignores_unknown_names() {
    let skeleton = chain_skeleton();
    let mut builder = SkeletonMaskBuilder::new(&skeleton);
    assert!(!builder.set_bone_state("tail", false));
    assert_eq!(builder.build().enabled_count(), 3);
}

#[test]
fn mask_branch_state_covers_descendants() {
    let skeleton = chain_skeleton();
    let mut builder = SkeletonMaskBuilder::new(&skeleton);
    assert!(builder.set_branch_state("child", false));
    let mask = builder.build();
    assert!(mask.is_enabled(0));
    assert!(!mask.is_enabled(1));
    assert!(!mask.is_enabled(2));
}

#[test]
fn mask_spanning_multiple_words() {
    let mut mask = SkeletonMask::all_enabled(130);
    assert_eq!(mask.enabled_count(), 130);
    mask.set_enabled(64, false);
    mask.set_enabled(129, false);
    mask.set_enabled(500, false);
    assert!(!mask.is_enabled(64));
    assert!(!mask.is_enabled(129));
    assert!(mask.is_enabled(65));
    assert_eq!(mask.enabled_count(), 128);
}

#[test]
fn mask_compatibility_checks_bone_count() {
    let skeleton = chain_skeleton();
    assert!(SkeletonMask::all_enabled(3).check_compatible(&skeleton).is_ok());
    assert_eq!(
        SkeletonMask::all_enabled(2).check_compatible(&skeleton),
        Err(AnimationError::MaskSizeMismatch {
            mask: 2,
            skeleton: 3
        })
    );
}

// ============================================================================
// Pose Evaluation
// ============================================================================

#[test]
fn get_pose_without_layers_is_bind_pose() {
    let skeleton = chain_skeleton();
    let (world, local) = evaluate(&skeleton, None, &[]);
    assert!(approx_vec3(translation_of(&world[2]), Vec3::ONE));
    assert_eq!(local[1], BoneTransform::from_translation(Vec3::Y));
}

#[test]
fn get_pose_single_state_replaces_bone() {
    let skeleton = chain_skeleton();
    let clip = clip_moving("child", Vec3::ZERO, Vec3::new(0.0, 4.0, 0.0));
    let layers = [layer_with(&skeleton, LayerBlendMode::Normalized, &[(&clip, 0.5, 1.0)])];

    let (world, local) = evaluate(&skeleton, None, &layers);
    assert!(approx_vec3(local[1].position, Vec3::new(0.0, 2.0, 0.0)));
    // Grandchild follows its parent
    assert!(
        approx_vec3(translation_of(&world[2]), Vec3::new(1.0, 2.0, 1.0)),
        "Got {}",
        translation_of(&world[2])
    );
}

#[test]
fn get_pose_normalizes_state_weights() {
    let skeleton = chain_skeleton();
    let a = clip_moving("root", Vec3::ZERO, Vec3::ZERO);
    let b = clip_moving("root", Vec3::new(4.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0));
    // Weights 2 and 2 behave like 0.5 and 0.5
    let layers = [layer_with(
        &skeleton,
        LayerBlendMode::Normalized,
        &[(&a, 0.0, 2.0), (&b, 0.0, 2.0)],
    )];

    let (_, local) = evaluate(&skeleton, None, &layers);
    assert!(
        approx_vec3(local[0].position, Vec3::new(2.0, 0.0, 0.0)),
        "Got {}",
        local[0].position
    );
}

#[test]
fn get_pose_partial_weight_mixes_with_bind_pose() {
    let skeleton = chain_skeleton();
    let clip = clip_moving("root", Vec3::new(3.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0));
    let layers = [layer_with(&skeleton, LayerBlendMode::Normalized, &[(&clip, 0.0, 0.5)])];

    let (_, local) = evaluate(&skeleton, None, &layers);
    // Halfway between bind (1,0,0) and animated (3,0,0)
    assert!(approx_vec3(local[0].position, Vec3::new(2.0, 0.0, 0.0)));
}

#[test]
fn get_pose_additive_layer_adds_delta_from_bind() {
    let skeleton = chain_skeleton();
    let base = clip_moving("root", Vec3::new(5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0));
    // Bind is (1,0,0), so this clip is a +1 Y delta
    let offset = clip_moving("root", Vec3::new(1.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 0.0));

    let layers = [
        layer_with(&skeleton, LayerBlendMode::Normalized, &[(&base, 0.0, 1.0)]),
        layer_with(&skeleton, LayerBlendMode::Additive, &[(&offset, 0.0, 0.5)]),
    ];

    let (_, local) = evaluate(&skeleton, None, &layers);
    assert!(
        approx_vec3(local[0].position, Vec3::new(5.0, 0.5, 0.0)),
        "Got {}",
        local[0].position
    );
}

#[test]
fn get_pose_rotation_blend_is_normalized() {
    let skeleton = chain_skeleton();
    let make = |angle: f32| {
        let curves = TransformCurves::new("root")
            .with_rotation(KeyframeTrack::constant(Quat::from_rotation_y(angle)));
        Arc::new(AnimationClip::new("turn", vec![curves], vec![]))
    };
    let a = make(0.0);
    let b = make(FRAC_PI_2);
    let layers = [layer_with(
        &skeleton,
        LayerBlendMode::Normalized,
        &[(&a, 0.0, 0.5), (&b, 0.0, 0.5)],
    )];

    let (_, local) = evaluate(&skeleton, None, &layers);
    let rotation = local[0].rotation;
    assert!((rotation.length() - 1.0).abs() < EPSILON);
    let expected = Quat::from_rotation_y(FRAC_PI_2 * 0.5);
    assert!(
        rotation.abs_diff_eq(expected, 1e-4),
        "Expected {expected}, got {rotation}"
    );
}

#[test]
fn get_pose_masked_bone_keeps_bind_pose() {
    let skeleton = chain_skeleton();
    let clip = clip_moving("child", Vec3::new(0.0, 9.0, 0.0), Vec3::new(0.0, 9.0, 0.0));
    let layers = [layer_with(&skeleton, LayerBlendMode::Normalized, &[(&clip, 0.0, 1.0)])];

    let mut builder = SkeletonMaskBuilder::new(&skeleton);
    builder.set_bone_state("child", false);
    let mask = builder.build();

    let (_, local) = evaluate(&skeleton, Some(&mask), &layers);
    assert_eq!(local[1], BoneTransform::from_translation(Vec3::Y));
}

#[test]
fn get_pose_rejects_undersized_buffers() {
    let skeleton = chain_skeleton();
    let mut world = vec![Mat4::IDENTITY; 2];
    let mut local = vec![BoneTransform::IDENTITY; 3];
    let err = skeleton
        .get_pose(&mut world, &mut local, None, &[])
        .expect_err("world buffer too small");
    assert!(matches!(
        err,
        AnimationError::BufferTooSmall {
            context: "world pose",
            required: 3,
            actual: 2
        }
    ));
}
