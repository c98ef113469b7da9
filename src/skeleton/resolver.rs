use std::collections::HashSet;

use crate::error::PipelineError;
use crate::skeleton::profile::{Side, SkeletonProfile};

/// 登録済みプロファイルからのフォーマット自動判別
///
/// スコア = 必須8ボーン名のうち観測集合に含まれる数。
/// 適格条件: 少なくとも片側の4ボーンが完全に揃っていること
/// （正準化は照会側の4関節すべてを必要とするため）。
/// 同点はリファレンス（軸変換なし）優先、次に登録順。判別は決定的で、
/// AmbiguousFormat は発生しない。
pub struct ProfileRegistry {
    profiles: Vec<SkeletonProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self {
            profiles: Vec::new(),
        }
    }

    /// 組み込みプロファイル（mixamo リファレンス + bvh_zup）で構築
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SkeletonProfile::mixamo());
        registry.register(SkeletonProfile::bvh_zup());
        registry
    }

    pub fn register(&mut self, profile: SkeletonProfile) {
        self.profiles.push(profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// 観測ボーン名集合に最も適合するプロファイルを返す
    pub fn detect(&self, observed: &HashSet<String>) -> Result<&SkeletonProfile, PipelineError> {
        let mut best: Option<(&SkeletonProfile, usize)> = None;
        let mut best_score = 0usize;

        for profile in &self.profiles {
            let score = profile
                .required_names()
                .iter()
                .filter(|name| observed.contains(**name))
                .count();
            best_score = best_score.max(score);

            let complete_side = [Side::Left, Side::Right].iter().any(|&side| {
                profile
                    .side_names(side)
                    .iter()
                    .all(|name| observed.contains(*name))
            });
            if !complete_side {
                continue;
            }

            let better = match best {
                None => true,
                Some((current, current_score)) => {
                    score > current_score
                        || (score == current_score
                            && profile.is_reference()
                            && !current.is_reference())
                }
            };
            if better {
                best = Some((profile, score));
            }
        }

        match best {
            Some((profile, _)) => Ok(profile),
            None => Err(PipelineError::FormatNotRecognized { best_score }),
        }
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::profile::{ArmBoneNames, Convention};
    use nalgebra::Matrix3;

    fn observed(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn full_mixamo_names() -> HashSet<String> {
        observed(&[
            "mixamorig:Hips",
            "mixamorig:LeftShoulder",
            "mixamorig:LeftArm",
            "mixamorig:LeftForeArm",
            "mixamorig:LeftHand",
            "mixamorig:RightShoulder",
            "mixamorig:RightArm",
            "mixamorig:RightForeArm",
            "mixamorig:RightHand",
        ])
    }

    #[test]
    fn test_detect_mixamo() {
        let registry = ProfileRegistry::builtin();
        let profile = registry.detect(&full_mixamo_names()).unwrap();
        assert_eq!(profile.format, "mixamo");
    }

    #[test]
    fn test_detect_bvh_zup() {
        let registry = ProfileRegistry::builtin();
        let names = observed(&[
            "Hips",
            "LeftCollar",
            "LeftShoulder",
            "LeftElbow",
            "LeftWrist",
            "RightCollar",
            "RightShoulder",
            "RightElbow",
            "RightWrist",
        ]);
        let profile = registry.detect(&names).unwrap();
        assert_eq!(profile.format, "bvh_zup");
    }

    #[test]
    fn test_detect_single_side_is_eligible() {
        // 右腕のみのクリップでも判別できること
        let registry = ProfileRegistry::builtin();
        let names = observed(&[
            "mixamorig:RightShoulder",
            "mixamorig:RightArm",
            "mixamorig:RightForeArm",
            "mixamorig:RightHand",
        ]);
        let profile = registry.detect(&names).unwrap();
        assert_eq!(profile.format, "mixamo");
    }

    #[test]
    fn test_detect_incomplete_side_not_recognized() {
        // 3/4 関節では正準化できないため不適格
        let registry = ProfileRegistry::builtin();
        let names = observed(&[
            "mixamorig:RightShoulder",
            "mixamorig:RightArm",
            "mixamorig:RightForeArm",
        ]);
        let err = registry.detect(&names).unwrap_err();
        match err {
            PipelineError::FormatNotRecognized { best_score } => assert_eq!(best_score, 3),
            other => panic!("expected FormatNotRecognized, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_unknown_names() {
        let registry = ProfileRegistry::builtin();
        let names = observed(&["Pelvis", "Spine1", "Clavicle_L"]);
        assert!(matches!(
            registry.detect(&names),
            Err(PipelineError::FormatNotRecognized { best_score: 0 })
        ));
    }

    #[test]
    fn test_tie_break_prefers_reference() {
        // mixamo と同じボーン名を持つ軸変換付きプロファイルを先に登録しても、
        // 同点ならリファレンス側が選ばれる
        let clone_with_remap = SkeletonProfile {
            format: "mixamo_rotated".to_string(),
            left: ArmBoneNames::new(
                "mixamorig:LeftShoulder",
                "mixamorig:LeftArm",
                "mixamorig:LeftForeArm",
                "mixamorig:LeftHand",
            ),
            right: ArmBoneNames::new(
                "mixamorig:RightShoulder",
                "mixamorig:RightArm",
                "mixamorig:RightForeArm",
                "mixamorig:RightHand",
            ),
            axis_remap: Some(Matrix3::identity()),
            convention: Convention::canonical(),
        };

        let mut registry = ProfileRegistry::new();
        registry.register(clone_with_remap);
        registry.register(SkeletonProfile::mixamo());

        let profile = registry.detect(&full_mixamo_names()).unwrap();
        assert_eq!(profile.format, "mixamo");
    }

    #[test]
    fn test_tie_break_registration_order() {
        // 双方リファレンスの同点は登録順が先のものを保持
        let mut registry = ProfileRegistry::new();
        let mut first = SkeletonProfile::mixamo();
        first.format = "first".to_string();
        let mut second = SkeletonProfile::mixamo();
        second.format = "second".to_string();
        registry.register(first);
        registry.register(second);

        let profile = registry.detect(&full_mixamo_names()).unwrap();
        assert_eq!(profile.format, "first");
    }
}
