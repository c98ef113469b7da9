use thiserror::Error;

/// パイプライン全体のエラー分類
///
/// フレーム単位 (IncompleteFrame / DegenerateGeometry) はそのフレームだけを
/// 破棄し、クリップの残りは処理を続ける。FormatNotRecognized はクリップ単位、
/// UnsupportedModelVersion はロード時に即失敗。NoCoverage は呼び出し側が
/// フォールバックを適用する（ゼロベクトル予測と区別可能であること）。
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 登録済みプロファイルのどれも観測ボーン名集合に適合しない
    #[error("no registered skeleton profile matches the observed bones (best score {best_score}/8)")]
    FormatNotRecognized { best_score: usize },

    /// 必須ジョイントの欠落または非有限値
    #[error("frame {frame_index}: required joint '{joint}' is missing or non-finite")]
    IncompleteFrame {
        frame_index: usize,
        joint: &'static str,
    },

    /// 退化した幾何（腕長ゼロ、投影線ゼロ等）
    #[error("frame {frame_index}: degenerate geometry ({reason})")]
    DegenerateGeometry {
        frame_index: usize,
        reason: &'static str,
    },

    /// 探索半径の上限まで占有ボクセルが見つからない
    #[error("no trained voxels within radius {radius_cap} of the query input")]
    NoCoverage { radius_cap: u32 },

    /// 未知のモデルバージョン（解釈を試みずに拒否する）
    #[error("unsupported model version {found} (expected {expected})")]
    UnsupportedModelVersion { found: u32, expected: u32 },

    #[error("model artifact I/O failed")]
    Io(#[from] std::io::Error),

    #[error("model artifact parse failed")]
    Json(#[from] serde_json::Error),
}
