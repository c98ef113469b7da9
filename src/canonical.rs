use std::collections::HashMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::skeleton::{JointRole, Side, SkeletonProfile};

/// 外部パーサ（BVH/FBX）から渡される1フレーム分のワールド座標
#[derive(Debug, Clone, Default)]
pub struct RawFrame {
    pub frame_index: usize,
    pub positions: HashMap<String, Vector3<f32>>,
}

impl RawFrame {
    pub fn new(frame_index: usize) -> Self {
        Self {
            frame_index,
            positions: HashMap::new(),
        }
    }

    pub fn set(&mut self, bone: &str, position: [f32; 3]) {
        self.positions.insert(
            bone.to_string(),
            Vector3::new(position[0], position[1], position[2]),
        );
    }
}

/// 正準化済み1フレーム
///
/// 正準系: 右手系 +Y上 +Z前。全位置成分は arm_length で除算済みのため
/// 無次元で、体格の異なるキャラクター間で比較可能。ミラー後は常に
/// 右側規約の幾何を保持する（native_side が元の側を記録する）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFrame {
    pub shoulder: Vector3<f32>,
    pub upper_arm: Vector3<f32>,
    pub lower_arm: Vector3<f32>,
    pub hand: Vector3<f32>,
    /// ミラー前にデータが由来した側
    pub native_side: Side,
    /// 正規化前の腕長（cm）: 連続ジョイント間距離の合計
    pub arm_length: f32,
    pub frame_index: usize,
}

impl CanonicalFrame {
    pub fn joint(&self, role: JointRole) -> Vector3<f32> {
        match role {
            JointRole::Shoulder => self.shoulder,
            JointRole::UpperArm => self.upper_arm,
            JointRole::LowerArm => self.lower_arm,
            JointRole::Hand => self.hand,
        }
    }
}

/// 正準の横軸（X）成分を反転する。2回適用で恒等
pub fn mirror_x(p: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(-p.x, p.y, p.z)
}

/// 腕長の最小値（cm）。これ未満は退化ポーズとして棄却
const MIN_ARM_LENGTH: f32 = 1e-6;

/// ワールド座標を正準フレームへ変換する
///
/// 手順は固定順（ミラーと軸変換は可換でないため入れ替え不可）:
/// 1. プロファイルのボーンマップで各ロールの生位置を参照
/// 2. 軸変換行列と単位換算（→cm）を適用
/// 3. side == Left なら X 成分を反転し右規約へ（native_side に Left を記録）
/// 4. 腕長 = Shoulder→UpperArm→LowerArm→Hand の距離合計（除算前の値で算出）
/// 5. 全位置を腕長で除算
pub fn canonicalize(
    raw: &RawFrame,
    profile: &SkeletonProfile,
    side: Side,
) -> Result<CanonicalFrame, PipelineError> {
    // 1. ボーンマップ参照
    let mut joints = [Vector3::zeros(); JointRole::COUNT];
    for (slot, &role) in joints.iter_mut().zip(JointRole::ALL.iter()) {
        let name = profile.bone_name(side, role);
        let position = raw.positions.get(name).copied().ok_or_else(|| {
            PipelineError::IncompleteFrame {
                frame_index: raw.frame_index,
                joint: role.name(),
            }
        })?;
        if !position.iter().all(|c| c.is_finite()) {
            return Err(PipelineError::IncompleteFrame {
                frame_index: raw.frame_index,
                joint: role.name(),
            });
        }
        *slot = position;
    }

    // 2. 軸変換 + 単位換算
    let scale = profile.convention.unit_to_cm;
    match &profile.axis_remap {
        Some(remap) => {
            for p in joints.iter_mut() {
                *p = remap * *p * scale;
            }
        }
        None => {
            if scale != 1.0 {
                for p in joints.iter_mut() {
                    *p *= scale;
                }
            }
        }
    }

    // 3. 左側はミラーして右規約へ
    if side == Side::Left {
        for p in joints.iter_mut() {
            *p = mirror_x(*p);
        }
    }

    // 4. 腕長
    let arm_length = (joints[1] - joints[0]).norm()
        + (joints[2] - joints[1]).norm()
        + (joints[3] - joints[2]).norm();
    if !arm_length.is_finite() || arm_length < MIN_ARM_LENGTH {
        return Err(PipelineError::DegenerateGeometry {
            frame_index: raw.frame_index,
            reason: "zero arm length",
        });
    }

    // 5. 正規化
    for p in joints.iter_mut() {
        *p /= arm_length;
    }

    Ok(CanonicalFrame {
        shoulder: joints[0],
        upper_arm: joints[1],
        lower_arm: joints[2],
        hand: joints[3],
        native_side: side,
        arm_length,
        frame_index: raw.frame_index,
    })
}
