use nalgebra::Vector3;

use crate::error::PipelineError;
use crate::voxel::Predictor;

/// 予測値の出所。NoCoverage フォールバックは有効なゼロベクトル予測と
/// 区別できなければならない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionSource {
    /// グリッドからの有効な予測
    Model,
    /// NoCoverage のため前フレームの値を保持
    HeldLast,
}

/// 1リムあたりの実行時ラッパ
///
/// ホストリグの評価ループから毎フレーム呼ばれる。NoCoverage 時は前
/// フレームの予測値にフォールバックし、有効な予測には EMA 平滑化を
/// 適用する。alpha = 1.0 で平滑化なし
pub struct RuntimePredictor<'a> {
    predictor: Predictor<'a>,
    alpha: f32,
    prev: Option<Vector3<f32>>,
}

impl<'a> RuntimePredictor<'a> {
    pub fn new(predictor: Predictor<'a>, alpha: f32) -> Self {
        Self {
            predictor,
            alpha,
            prev: None,
        }
    }

    /// 正規化済み手先位置から予測する
    ///
    /// まだ一度も有効な予測がない状態での NoCoverage はフォールバック
    /// できないため、そのままエラーを返す
    pub fn predict(
        &mut self,
        input: Vector3<f32>,
    ) -> Result<(Vector3<f32>, PredictionSource), PipelineError> {
        match self.predictor.predict(input) {
            Ok(raw) => {
                let smoothed = match self.prev {
                    Some(prev) => raw * self.alpha + prev * (1.0 - self.alpha),
                    None => raw,
                };
                self.prev = Some(smoothed);
                Ok((smoothed, PredictionSource::Model))
            }
            Err(PipelineError::NoCoverage { radius_cap }) => match self.prev {
                Some(prev) => Ok((prev, PredictionSource::HeldLast)),
                None => Err(PipelineError::NoCoverage { radius_cap }),
            },
            Err(other) => Err(other),
        }
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}
