use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::voxel::grid::{VoxelGrid, VoxelKey};

/// 照会パラメータ
///
/// アーティファクトに保存され、学習時と同一の値で照会すること。
/// 異なるパラメータで正規化した入力をグリッドに当ててはならない
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// 逆距離加重の距離べき指数
    pub idw_power: f32,
    /// 近傍探索のチェビシェフ半径上限。超過で NoCoverage
    pub radius_cap: u32,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            idw_power: 2.0,
            radius_cap: 3,
        }
    }
}

/// 重心一致とみなす距離二乗の閾値（ゼロ除算の迂回）
const EXACT_HIT_DIST_SQ: f32 = 1e-12;

/// 学習済みグリッドに対する実行時予測器
///
/// ホットパス要件: 非割当・非ブロッキング・&self のみ。グリッドを一切
/// 変更しないため、複数のリム/キャラクターが同一モデルをロックなしで
/// 並行照会できる。計算量は近傍サイズで抑えられ、学習サンプル数に
/// 依存しない O(1)
pub struct Predictor<'a> {
    grid: &'a VoxelGrid,
    params: QueryParams,
}

impl<'a> Predictor<'a> {
    pub fn new(grid: &'a VoxelGrid, params: QueryParams) -> Self {
        Self { grid, params }
    }

    pub fn params(&self) -> QueryParams {
        self.params
    }

    /// 正規化済み手先位置から正規化済みポールベクトルを予測する
    ///
    /// 1. ホームボクセル（floor(input / voxel_size)）を特定
    /// 2. ホームが占有なら半径1まで（自身+26近傍）を候補に。空なら占有
    ///    シェルが見つかるまで半径を1ずつ広げ、上限超過で NoCoverage
    ///    （サポート外の入力で黙って外挿しない）
    /// 3. 各候補の入力重心への距離で 1/d^p の逆距離加重平均。重心一致は
    ///    そのセルの平均をそのまま返す
    pub fn predict(&self, input: Vector3<f32>) -> Result<Vector3<f32>, PipelineError> {
        let home = VoxelKey::of(&input, self.grid.voxel_size());

        let mut weighted = Vector3::zeros();
        let mut weight_sum = 0.0f32;
        let mut hits = 0usize;

        let mut radius: u32 = 0;
        while radius <= self.params.radius_cap {
            let r = radius as i32;
            for dx in -r..=r {
                for dy in -r..=r {
                    for dz in -r..=r {
                        // チェビシェフ距離がちょうど r のシェルのみ走査
                        if dx.abs().max(dy.abs()).max(dz.abs()) != r {
                            continue;
                        }
                        let cell = match self.grid.cell(&home.offset(dx, dy, dz)) {
                            Some(cell) => cell,
                            None => continue,
                        };
                        let dist_sq = (input - cell.mean_input).norm_squared();
                        if dist_sq < EXACT_HIT_DIST_SQ {
                            return Ok(cell.mean_target);
                        }
                        let weight = dist_sq.sqrt().powf(-self.params.idw_power);
                        weighted += cell.mean_target * weight;
                        weight_sum += weight;
                        hits += 1;
                    }
                }
            }
            // 半径1まで走査済みで候補があれば確定:
            // ホーム占有時は26近傍込み、ホーム空時は最初の占有シェルまで
            if hits > 0 && radius >= 1 {
                break;
            }
            radius += 1;
        }

        if hits == 0 {
            return Err(PipelineError::NoCoverage {
                radius_cap: self.params.radius_cap,
            });
        }
        Ok(weighted / weight_sum)
    }
}
