//! Model artifact save/load.
//!
//! The artifact is self-describing JSON: version tag, canonical coordinate
//! convention, the normalization/query parameters the grid was trained
//! under, and the sparse voxel table. Loading an artifact with an unknown
//! version tag fails fast instead of attempting a best-effort parse.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::skeleton::Convention;
use crate::voxel::{Predictor, QueryParams, VoxelCell, VoxelGrid, VoxelKey};

/// Current artifact version. Bump on any layout change.
pub const MODEL_VERSION: u32 = 1;

/// Parameters the grid was trained under.
///
/// Invariant: a grid must never be queried with inputs normalized under
/// different parameters than these. They travel with the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    /// Voxel edge length in normalized input space
    pub voxel_size: f32,
    /// IDW distance exponent
    pub idw_power: f32,
    /// Neighbor search radius cap (Chebyshev)
    pub radius_cap: u32,
    /// Pole-vector multiplier used when the targets were derived
    pub pole_multiplier: f32,
}

/// One occupied voxel as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRecord {
    pub key: [i32; 3],
    pub mean_input: [f32; 3],
    pub mean_target: [f32; 3],
    pub count: u32,
}

/// On-disk artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub convention: Convention,
    pub normalization: NormalizationParams,
    pub cells: Vec<CellRecord>,
}

/// Parsed before the full artifact so an unknown version is rejected
/// without interpreting any other field.
#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Trained model: immutable grid plus the parameters it was trained under.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    grid: VoxelGrid,
    params: NormalizationParams,
    convention: Convention,
}

impl TrainedModel {
    pub fn new(grid: VoxelGrid, params: NormalizationParams, convention: Convention) -> Self {
        assert_eq!(
            grid.voxel_size(),
            params.voxel_size,
            "grid voxel size and normalization params disagree"
        );
        Self {
            grid,
            params,
            convention,
        }
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn params(&self) -> NormalizationParams {
        self.params
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// Runtime predictor bound to this model's stored query parameters.
    pub fn predictor(&self) -> Predictor<'_> {
        Predictor::new(
            &self.grid,
            QueryParams {
                idw_power: self.params.idw_power,
                radius_cap: self.params.radius_cap,
            },
        )
    }

    /// Serializable form. Cells are sorted by key so the output is stable.
    pub fn to_artifact(&self) -> ModelArtifact {
        let mut cells: Vec<CellRecord> = self
            .grid
            .iter()
            .map(|(key, cell)| CellRecord {
                key: key.0,
                mean_input: cell.mean_input.into(),
                mean_target: cell.mean_target.into(),
                count: cell.count,
            })
            .collect();
        cells.sort_by_key(|record| record.key);

        ModelArtifact {
            version: MODEL_VERSION,
            convention: self.convention,
            normalization: self.params,
            cells,
        }
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, PipelineError> {
        if artifact.version != MODEL_VERSION {
            return Err(PipelineError::UnsupportedModelVersion {
                found: artifact.version,
                expected: MODEL_VERSION,
            });
        }

        let mut cells = HashMap::with_capacity(artifact.cells.len());
        for record in artifact.cells {
            cells.insert(
                VoxelKey(record.key),
                VoxelCell {
                    mean_input: Vector3::from(record.mean_input),
                    mean_target: Vector3::from(record.mean_target),
                    count: record.count,
                },
            );
        }

        Ok(Self {
            grid: VoxelGrid::from_parts(artifact.normalization.voxel_size, cells),
            params: artifact.normalization,
            convention: artifact.convention,
        })
    }
}

pub fn save_model<P: AsRef<Path>>(path: P, model: &TrainedModel) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(&model.to_artifact())?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<TrainedModel, PipelineError> {
    let content = fs::read_to_string(path)?;
    let probe: VersionProbe = serde_json::from_str(&content)?;
    if probe.version != MODEL_VERSION {
        return Err(PipelineError::UnsupportedModelVersion {
            found: probe.version,
            expected: MODEL_VERSION,
        });
    }
    let artifact: ModelArtifact = serde_json::from_str(&content)?;
    TrainedModel::from_artifact(artifact)
}
