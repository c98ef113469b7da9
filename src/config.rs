use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::NormalizationParams;
use crate::voxel::QueryParams;

/// 学習設定（TOML）
///
/// pole_multiplier のみ既定値を持たない必須項目
/// （プロダクション既定値が未確定のため、設定で常に明示する）
#[derive(Debug, Deserialize, Clone)]
pub struct TrainingConfig {
    /// ポールベクトル乗数（必須）
    pub pole_multiplier: f32,
    /// ボクセル一辺（正規化入力空間の単位）
    #[serde(default = "default_voxel_size")]
    pub voxel_size: f32,
    /// 逆距離加重のべき指数
    #[serde(default = "default_idw_power")]
    pub idw_power: f32,
    /// 近傍探索半径の上限
    #[serde(default = "default_radius_cap")]
    pub radius_cap: u32,
    /// フレーム分割時のホールドアウト比率
    #[serde(default = "default_holdout_ratio")]
    pub holdout_ratio: f32,
    /// 分割シード
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_voxel_size() -> f32 {
    0.1
}
fn default_idw_power() -> f32 {
    2.0
}
fn default_radius_cap() -> u32 {
    3
}
fn default_holdout_ratio() -> f32 {
    0.2
}
fn default_seed() -> u64 {
    1
}

impl TrainingConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: TrainingConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// アーティファクトへ保存する正規化パラメータ
    pub fn normalization(&self) -> NormalizationParams {
        NormalizationParams {
            voxel_size: self.voxel_size,
            idw_power: self.idw_power,
            radius_cap: self.radius_cap,
            pole_multiplier: self.pole_multiplier,
        }
    }

    pub fn query_params(&self) -> QueryParams {
        QueryParams {
            idw_power: self.idw_power,
            radius_cap: self.radius_cap,
        }
    }
}
