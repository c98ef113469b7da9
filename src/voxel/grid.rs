use std::collections::hash_map::Entry;
use std::collections::HashMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::corpus::TrainingSample;

/// ボクセル格子インデックス
///
/// 正規化入力空間の座標を voxel_size で割って floor した整数3つ組。
/// 負座標側も floor で一貫して割り当てられる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelKey(pub [i32; 3]);

impl VoxelKey {
    pub fn of(p: &Vector3<f32>, voxel_size: f32) -> Self {
        Self([
            (p.x / voxel_size).floor() as i32,
            (p.y / voxel_size).floor() as i32,
            (p.z / voxel_size).floor() as i32,
        ])
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self([self.0[0] + dx, self.0[1] + dy, self.0[2] + dz])
    }
}

/// 占有ボクセルの集計値
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelCell {
    /// このボクセルに入った入力の平均（重心）。照会時の距離計算に使う
    pub mean_input: Vector3<f32>,
    /// 目標ベクトルの平均
    pub mean_target: Vector3<f32>,
    /// サンプル数。占有セルは常に count >= 1
    pub count: u32,
}

/// 学習中の可変グリッド
///
/// build() で不変の VoxelGrid へ一方向に遷移する。再学習は新しいビルダで
/// 行い、既存グリッドを書き換えない
pub struct VoxelGridBuilder {
    voxel_size: f32,
    cells: HashMap<VoxelKey, VoxelCell>,
}

impl VoxelGridBuilder {
    pub fn new(voxel_size: f32) -> Self {
        Self {
            voxel_size,
            cells: HashMap::new(),
        }
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// 1サンプルを取り込む（オンライン平均更新）
    pub fn add(&mut self, input: Vector3<f32>, target: Vector3<f32>) {
        let key = VoxelKey::of(&input, self.voxel_size);
        let cell = self.cells.entry(key).or_insert(VoxelCell {
            mean_input: Vector3::zeros(),
            mean_target: Vector3::zeros(),
            count: 0,
        });
        cell.count += 1;
        let n = cell.count as f32;
        cell.mean_input += (input - cell.mean_input) / n;
        cell.mean_target += (target - cell.mean_target) / n;
    }

    pub fn add_samples(&mut self, samples: &[TrainingSample]) {
        for sample in samples {
            self.add(sample.input, sample.target);
        }
    }

    /// 並列学習パーティションの統合（部分平均マージ）
    ///
    /// 平均同士の単純加算では合成できないため、件数による重み付きで統合する
    pub fn merge(&mut self, other: VoxelGridBuilder) {
        assert_eq!(
            self.voxel_size, other.voxel_size,
            "cannot merge builders with different voxel sizes"
        );
        for (key, incoming) in other.cells {
            match self.cells.entry(key) {
                Entry::Occupied(mut entry) => {
                    let cell = entry.get_mut();
                    let total = cell.count + incoming.count;
                    let wa = cell.count as f32 / total as f32;
                    let wb = incoming.count as f32 / total as f32;
                    cell.mean_input = cell.mean_input * wa + incoming.mean_input * wb;
                    cell.mean_target = cell.mean_target * wa + incoming.mean_target * wb;
                    cell.count = total;
                }
                Entry::Vacant(entry) => {
                    entry.insert(incoming);
                }
            }
        }
    }

    /// 学習を確定し、読み取り専用グリッドへ遷移する
    pub fn build(self) -> VoxelGrid {
        VoxelGrid {
            voxel_size: self.voxel_size,
            cells: self.cells,
        }
    }
}

/// 学習済みスパースグリッド
///
/// 不変・副作用なし。ロード後は複数スレッドから同時照会できる共有
/// 読み取り専用リソース。密配列ではなく整数キーのマップで保持する
/// （正規化空間は原点近傍に密だが原理上は非有界のため）
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    voxel_size: f32,
    cells: HashMap<VoxelKey, VoxelCell>,
}

impl VoxelGrid {
    pub(crate) fn from_parts(voxel_size: f32, cells: HashMap<VoxelKey, VoxelCell>) -> Self {
        Self { voxel_size, cells }
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    pub fn cell(&self, key: &VoxelKey) -> Option<&VoxelCell> {
        self.cells.get(key)
    }

    /// 占有ボクセル数
    pub fn occupied(&self) -> usize {
        self.cells.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VoxelKey, &VoxelCell)> {
        self.cells.iter()
    }
}
