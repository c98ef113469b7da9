use nalgebra::Vector3;

use crate::canonical::CanonicalFrame;
use crate::error::PipelineError;

/// 投影線（UpperArm→Hand）の最小長さ二乗。これ未満は投影が定義できない
const MIN_SEGMENT_LENGTH_SQ: f32 = 1e-12;

/// ポールベクトル導出
///
/// LowerArm を UpperArm→Hand の直線上に射影し、射影点から LowerArm へ向かう
/// 方向へ multiplier 倍押し出した点を返す:
///
///   projected = UpperArm + t * (Hand - UpperArm)
///   direction = LowerArm - projected
///   result    = projected + direction * multiplier
///
/// multiplier = 1.0 で結果は肘（LowerArm）位置そのもの。1.0 超で肢軸から
/// さらに離れる。multiplier は学習メタデータに記録される必須ハイパー
/// パラメータ（既定値は持たない）。
pub fn derive_pole_vector(
    frame: &CanonicalFrame,
    multiplier: f32,
) -> Result<Vector3<f32>, PipelineError> {
    let segment = frame.hand - frame.upper_arm;
    let length_sq = segment.norm_squared();
    if length_sq < MIN_SEGMENT_LENGTH_SQ {
        // UpperArm == Hand: 射影が未定義。NaNを黙って返さない
        return Err(PipelineError::DegenerateGeometry {
            frame_index: frame.frame_index,
            reason: "upper arm and hand coincide",
        });
    }

    let t = (frame.lower_arm - frame.upper_arm).dot(&segment) / length_sq;
    let projected = frame.upper_arm + segment * t;
    let direction = frame.lower_arm - projected;
    Ok(projected + direction * multiplier)
}
