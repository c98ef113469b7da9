use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::canonical::CanonicalFrame;
use crate::pole::derive_pole_vector;
use crate::skeleton::Side;

/// キャラクターの性別タグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Neutral,
}

/// クリップ（アニメーションシリーズ）単位のメタデータ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipMeta {
    pub series: String,
    pub gender: Gender,
    /// 自由記述のスタイルタグ（カテゴリであることは保証されない）
    pub style: String,
}

impl ClipMeta {
    pub fn new(series: &str, gender: Gender, style: &str) -> Self {
        Self {
            series: series.to_string(),
            gender,
            style: style.to_string(),
        }
    }
}

/// サンプル単位のメタデータ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMeta {
    pub series: String,
    pub gender: Gender,
    pub style: String,
    pub native_side: Side,
    /// 正規化の除数（cm）。実行時の逆正規化に使う
    pub arm_length: f32,
    pub frame_index: usize,
}

/// (入力, 目標, メタデータ) の学習サンプル。構築後は不変
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSample {
    /// 正規化済み手先位置
    pub input: Vector3<f32>,
    /// 正規化済みポールベクトル
    pub target: Vector3<f32>,
    pub meta: SampleMeta,
}

/// クリップ取り込み結果（データ品質監査用）
#[derive(Debug, Clone)]
pub struct ClipReport {
    pub series: String,
    pub accepted: usize,
    pub skipped: usize,
}

/// 複数クリップの正準フレーム列を1つの学習セットへ集約するビルダ
///
/// フレーム単位の導出失敗はそのフレームだけをスキップし、クリップの残りは
/// 取り込む。スキップ数はクリップごとに報告・警告される。
pub struct CorpusBuilder {
    pole_multiplier: f32,
    samples: Vec<TrainingSample>,
}

impl CorpusBuilder {
    /// pole_multiplier は必須ハイパーパラメータ（既定値なし）
    pub fn new(pole_multiplier: f32) -> Self {
        Self {
            pole_multiplier,
            samples: Vec::new(),
        }
    }

    pub fn pole_multiplier(&self) -> f32 {
        self.pole_multiplier
    }

    pub fn add_clip(&mut self, meta: &ClipMeta, frames: &[CanonicalFrame]) -> ClipReport {
        let mut accepted = 0usize;
        let mut skipped = 0usize;

        for frame in frames {
            match derive_pole_vector(frame, self.pole_multiplier) {
                Ok(target) => {
                    self.samples.push(TrainingSample {
                        input: frame.hand,
                        target,
                        meta: SampleMeta {
                            series: meta.series.clone(),
                            gender: meta.gender,
                            style: meta.style.clone(),
                            native_side: frame.native_side,
                            arm_length: frame.arm_length,
                            frame_index: frame.frame_index,
                        },
                    });
                    accepted += 1;
                }
                // フレーム単位の失敗はクリップを中断しない
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(
                series = %meta.series,
                accepted,
                skipped,
                "skipped degenerate frames while building corpus"
            );
        }

        ClipReport {
            series: meta.series.clone(),
            accepted,
            skipped,
        }
    }

    pub fn finish(self) -> Corpus {
        Corpus {
            pole_multiplier: self.pole_multiplier,
            samples: self.samples,
        }
    }
}

/// 構築済みの学習セット。順序に意味はなく、メタデータで分割可能
#[derive(Debug, Clone)]
pub struct Corpus {
    pole_multiplier: f32,
    samples: Vec<TrainingSample>,
}

impl Corpus {
    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn pole_multiplier(&self) -> f32 {
        self.pole_multiplier
    }

    /// メタデータ述語による絞り込み（幾何の再導出なし）
    pub fn filter<F>(&self, predicate: F) -> Corpus
    where
        F: Fn(&SampleMeta) -> bool,
    {
        Corpus {
            pole_multiplier: self.pole_multiplier,
            samples: self
                .samples
                .iter()
                .filter(|s| predicate(&s.meta))
                .cloned()
                .collect(),
        }
    }

    /// シリーズ単位のホールドアウト分割。戻り値は (学習, ホールドアウト)
    ///
    /// 同一クリップ内の隣接フレームは強く相関するため、フレーム単位の
    /// ランダム分割より情報リークが起きにくい
    pub fn split_by_series(&self, holdout: &[&str]) -> (Corpus, Corpus) {
        let mut train = Vec::new();
        let mut held = Vec::new();
        for sample in &self.samples {
            if holdout.contains(&sample.meta.series.as_str()) {
                held.push(sample.clone());
            } else {
                train.push(sample.clone());
            }
        }
        (
            Corpus {
                pole_multiplier: self.pole_multiplier,
                samples: train,
            },
            Corpus {
                pole_multiplier: self.pole_multiplier,
                samples: held,
            },
        )
    }

    /// フレーム単位の決定的分割。戻り値は (学習, ホールドアウト)
    ///
    /// 同じ seed と同じサンプル列なら常に同じ割当になる
    pub fn split_frames(&self, holdout_ratio: f32, seed: u64) -> (Corpus, Corpus) {
        let mut train = Vec::new();
        let mut held = Vec::new();
        for (index, sample) in self.samples.iter().enumerate() {
            let hash = splitmix64(seed ^ (index as u64).wrapping_mul(0x9e3779b97f4a7c15));
            let fraction = (hash >> 11) as f64 / (1u64 << 53) as f64;
            if (fraction as f32) < holdout_ratio {
                held.push(sample.clone());
            } else {
                train.push(sample.clone());
            }
        }
        (
            Corpus {
                pole_multiplier: self.pole_multiplier,
                samples: train,
            },
            Corpus {
                pole_multiplier: self.pole_multiplier,
                samples: held,
            },
        )
    }
}

/// splitmix64。分割割当のための決定的ハッシュ
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(frame_index: usize, hand_y: f32) -> CanonicalFrame {
        CanonicalFrame {
            shoulder: Vector3::new(0.0, 0.0, 0.0),
            upper_arm: Vector3::new(0.3, 0.0, 0.0),
            lower_arm: Vector3::new(0.6, 0.15, 0.0),
            hand: Vector3::new(0.65, hand_y, 0.0),
            native_side: Side::Right,
            arm_length: 62.0,
            frame_index,
        }
    }

    /// UpperArm == Hand の退化フレーム
    fn make_degenerate_frame(frame_index: usize) -> CanonicalFrame {
        CanonicalFrame {
            shoulder: Vector3::new(0.0, 0.0, 0.0),
            upper_arm: Vector3::new(0.3, 0.0, 0.0),
            lower_arm: Vector3::new(0.6, 0.15, 0.0),
            hand: Vector3::new(0.3, 0.0, 0.0),
            native_side: Side::Right,
            arm_length: 62.0,
            frame_index,
        }
    }

    fn walk_meta() -> ClipMeta {
        ClipMeta::new("walk_01", Gender::Female, "casual walk")
    }

    #[test]
    fn test_add_clip_attaches_metadata() {
        let mut builder = CorpusBuilder::new(2.0);
        let frames = [make_frame(0, 0.5), make_frame(1, 0.6)];
        let report = builder.add_clip(&walk_meta(), &frames);

        assert_eq!(report.accepted, 2);
        assert_eq!(report.skipped, 0);

        let corpus = builder.finish();
        assert_eq!(corpus.len(), 2);
        let sample = &corpus.samples()[1];
        assert_eq!(sample.meta.series, "walk_01");
        assert_eq!(sample.meta.gender, Gender::Female);
        assert_eq!(sample.meta.native_side, Side::Right);
        assert_eq!(sample.meta.frame_index, 1);
        assert_eq!(sample.meta.arm_length, 62.0);
        assert_eq!(sample.input, Vector3::new(0.65, 0.6, 0.0));
    }

    #[test]
    fn test_add_clip_skips_degenerate_frames() {
        // 退化フレームはスキップされるがクリップの残りは取り込まれる
        let mut builder = CorpusBuilder::new(2.0);
        let frames = [
            make_frame(0, 0.5),
            make_degenerate_frame(1),
            make_frame(2, 0.7),
        ];
        let report = builder.add_clip(&walk_meta(), &frames);

        assert_eq!(report.accepted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(builder.finish().len(), 2);
    }

    #[test]
    fn test_filter_by_gender() {
        let mut builder = CorpusBuilder::new(1.5);
        builder.add_clip(&walk_meta(), &[make_frame(0, 0.5)]);
        builder.add_clip(
            &ClipMeta::new("run_03", Gender::Male, "sprint"),
            &[make_frame(0, 0.4), make_frame(1, 0.45)],
        );
        let corpus = builder.finish();

        let male_only = corpus.filter(|m| m.gender == Gender::Male);
        assert_eq!(male_only.len(), 2);
        assert!(male_only.samples().iter().all(|s| s.meta.series == "run_03"));
        // 元のコーパスは変化しない
        assert_eq!(corpus.len(), 3);
    }

    #[test]
    fn test_split_by_series() {
        let mut builder = CorpusBuilder::new(1.5);
        builder.add_clip(&walk_meta(), &[make_frame(0, 0.5), make_frame(1, 0.55)]);
        builder.add_clip(
            &ClipMeta::new("run_03", Gender::Male, "sprint"),
            &[make_frame(0, 0.4)],
        );
        let corpus = builder.finish();

        let (train, held) = corpus.split_by_series(&["run_03"]);
        assert_eq!(train.len(), 2);
        assert_eq!(held.len(), 1);
        assert!(train.samples().iter().all(|s| s.meta.series == "walk_01"));
        assert!(held.samples().iter().all(|s| s.meta.series == "run_03"));
    }

    #[test]
    fn test_split_frames_deterministic() {
        let mut builder = CorpusBuilder::new(1.5);
        let frames: Vec<CanonicalFrame> = (0..100)
            .map(|i| make_frame(i, 0.3 + i as f32 * 0.001))
            .collect();
        builder.add_clip(&walk_meta(), &frames);
        let corpus = builder.finish();

        let (train_a, held_a) = corpus.split_frames(0.25, 42);
        let (train_b, held_b) = corpus.split_frames(0.25, 42);

        assert_eq!(train_a.len(), train_b.len());
        assert_eq!(held_a.len(), held_b.len());
        assert_eq!(train_a.len() + held_a.len(), 100);
        for (a, b) in held_a.samples().iter().zip(held_b.samples().iter()) {
            assert_eq!(a.meta.frame_index, b.meta.frame_index);
        }
        // 比率はおおよそ守られる
        assert!(held_a.len() >= 10 && held_a.len() <= 40, "held {}", held_a.len());
    }

    #[test]
    fn test_split_frames_seed_changes_assignment() {
        let mut builder = CorpusBuilder::new(1.5);
        let frames: Vec<CanonicalFrame> = (0..200)
            .map(|i| make_frame(i, 0.3 + i as f32 * 0.001))
            .collect();
        builder.add_clip(&walk_meta(), &frames);
        let corpus = builder.finish();

        let (_, held_a) = corpus.split_frames(0.3, 1);
        let (_, held_b) = corpus.split_frames(0.3, 2);
        let idx_a: Vec<usize> = held_a.samples().iter().map(|s| s.meta.frame_index).collect();
        let idx_b: Vec<usize> = held_b.samples().iter().map(|s| s.meta.frame_index).collect();
        assert_ne!(idx_a, idx_b);
    }

    #[test]
    fn test_target_uses_multiplier() {
        // multiplier=1.0 なら target は肘位置
        let mut builder = CorpusBuilder::new(1.0);
        let frame = make_frame(0, 0.5);
        builder.add_clip(&walk_meta(), &[frame]);
        let corpus = builder.finish();
        let sample = &corpus.samples()[0];
        assert!((sample.target - frame.lower_arm).norm() < 1e-6);
    }
}
