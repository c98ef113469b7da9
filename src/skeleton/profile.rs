use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// 左右どちらの腕か
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// 片腕4関節の正準ジョイントロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum JointRole {
    Shoulder = 0,
    UpperArm = 1,
    LowerArm = 2,
    Hand = 3,
}

impl JointRole {
    pub const COUNT: usize = 4;

    /// 連鎖順（Shoulder → Hand）
    pub const ALL: [JointRole; Self::COUNT] = [
        JointRole::Shoulder,
        JointRole::UpperArm,
        JointRole::LowerArm,
        JointRole::Hand,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Shoulder),
            1 => Some(Self::UpperArm),
            2 => Some(Self::LowerArm),
            3 => Some(Self::Hand),
            _ => None,
        }
    }

    /// エラーメッセージ用の名前
    pub fn name(self) -> &'static str {
        match self {
            Self::Shoulder => "Shoulder",
            Self::UpperArm => "UpperArm",
            Self::LowerArm => "LowerArm",
            Self::Hand => "Hand",
        }
    }
}

/// 片側の腕に対応するソースボーン名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmBoneNames {
    pub shoulder: String,
    pub upper_arm: String,
    pub lower_arm: String,
    pub hand: String,
}

impl ArmBoneNames {
    pub fn new(shoulder: &str, upper_arm: &str, lower_arm: &str, hand: &str) -> Self {
        Self {
            shoulder: shoulder.to_string(),
            upper_arm: upper_arm.to_string(),
            lower_arm: lower_arm.to_string(),
            hand: hand.to_string(),
        }
    }

    pub fn get(&self, role: JointRole) -> &str {
        match role {
            JointRole::Shoulder => &self.shoulder,
            JointRole::UpperArm => &self.upper_arm,
            JointRole::LowerArm => &self.lower_arm,
            JointRole::Hand => &self.hand,
        }
    }

    pub fn names(&self) -> [&str; JointRole::COUNT] {
        [&self.shoulder, &self.upper_arm, &self.lower_arm, &self.hand]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Right,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// ソースフォーマットの座標系宣言
///
/// 正準系は右手系 +Y上 +Z前 センチメートル。unit_to_cm はソース単位から
/// センチメートルへの倍率で、軸変換と同じ段階で適用される。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Convention {
    pub handedness: Handedness,
    pub up: Axis,
    pub forward: Axis,
    pub unit_to_cm: f32,
}

impl Convention {
    /// 正準系の宣言
    pub fn canonical() -> Self {
        Self {
            handedness: Handedness::Right,
            up: Axis::Y,
            forward: Axis::Z,
            unit_to_cm: 1.0,
        }
    }
}

/// スケルトンフォーマットのプロファイル
///
/// ボーン名マップ・軸変換・座標系宣言を1つにまとめた不変データ。
/// 新フォーマットの対応はプロファイルデータの追加で行う（コード追加ではなく）。
/// axis_remap が None のプロファイルが正準リファレンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkeletonProfile {
    pub format: String,
    pub left: ArmBoneNames,
    pub right: ArmBoneNames,
    pub axis_remap: Option<Matrix3<f32>>,
    pub convention: Convention,
}

impl SkeletonProfile {
    pub fn is_reference(&self) -> bool {
        self.axis_remap.is_none()
    }

    pub fn bone_name(&self, side: Side, role: JointRole) -> &str {
        match side {
            Side::Left => self.left.get(role),
            Side::Right => self.right.get(role),
        }
    }

    /// 片側の必須ボーン名（連鎖順）
    pub fn side_names(&self, side: Side) -> [&str; JointRole::COUNT] {
        match side {
            Side::Left => self.left.names(),
            Side::Right => self.right.names(),
        }
    }

    /// 両側あわせた必須ボーン名（8個）
    pub fn required_names(&self) -> [&str; JointRole::COUNT * 2] {
        let l = self.left.names();
        let r = self.right.names();
        [l[0], l[1], l[2], l[3], r[0], r[1], r[2], r[3]]
    }

    /// Mixamoリグ（正準リファレンス: 右手系 +Y上 +Z前 cm、軸変換なし）
    pub fn mixamo() -> Self {
        Self {
            format: "mixamo".to_string(),
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
            axis_remap: None,
            convention: Convention::canonical(),
        }
    }

    /// Z-up・メートル単位のBVHリグ
    ///
    /// 軸変換: X軸まわり-90°回転 (x, y, z) → (x, z, -y)。
    /// Z-up の上方向が正準の +Y に移る。
    pub fn bvh_zup() -> Self {
        Self {
            format: "bvh_zup".to_string(),
            left: ArmBoneNames::new("LeftCollar", "LeftShoulder", "LeftElbow", "LeftWrist"),
            right: ArmBoneNames::new("RightCollar", "RightShoulder", "RightElbow", "RightWrist"),
            axis_remap: Some(Matrix3::new(
                1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, //
                0.0, -1.0, 0.0,
            )),
            convention: Convention {
                handedness: Handedness::Right,
                up: Axis::Z,
                forward: Axis::Y,
                unit_to_cm: 100.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_joint_role_count() {
        assert_eq!(JointRole::COUNT, 4);
        assert_eq!(JointRole::ALL.len(), 4);
    }

    #[test]
    fn test_joint_role_from_index() {
        assert_eq!(JointRole::from_index(0), Some(JointRole::Shoulder));
        assert_eq!(JointRole::from_index(3), Some(JointRole::Hand));
        assert_eq!(JointRole::from_index(4), None);
    }

    #[test]
    fn test_bone_name_lookup() {
        let profile = SkeletonProfile::mixamo();
        assert_eq!(
            profile.bone_name(Side::Left, JointRole::Hand),
            "mixamorig:LeftHand"
        );
        assert_eq!(
            profile.bone_name(Side::Right, JointRole::Shoulder),
            "mixamorig:RightShoulder"
        );
    }

    #[test]
    fn test_required_names_both_sides() {
        let profile = SkeletonProfile::mixamo();
        let names = profile.required_names();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"mixamorig:LeftArm"));
        assert!(names.contains(&"mixamorig:RightHand"));
    }

    #[test]
    fn test_reference_profile_has_no_remap() {
        assert!(SkeletonProfile::mixamo().is_reference());
        assert!(!SkeletonProfile::bvh_zup().is_reference());
    }

    #[test]
    fn test_zup_remap_is_rotation() {
        // 軸変換は正規の回転行列であること（det = 1, R·R^T = I）
        let remap = SkeletonProfile::bvh_zup().axis_remap.unwrap();
        assert!((remap.determinant() - 1.0).abs() < 1e-6);
        let id = remap * remap.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((id[(i, j)] - expected).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_zup_remap_maps_up_to_y() {
        let remap = SkeletonProfile::bvh_zup().axis_remap.unwrap();
        let up = remap * Vector3::new(0.0, 0.0, 1.0);
        assert!((up - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_profile_deserialize() {
        // 外部ローダが渡すパース済みデータ形式の確認
        let json = serde_json::to_string(&SkeletonProfile::bvh_zup()).unwrap();
        let back: SkeletonProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.format, "bvh_zup");
        assert_eq!(back.convention.unit_to_cm, 100.0);
        assert!(back.axis_remap.is_some());
    }
}
