use serde::{Deserialize, Serialize};

use crate::logic::model::{layout_hash, FEATURE_COUNT, FEATURE_VERSION};
use crate::logic::pipeline::RiskEngine;
use crate::logic::storage::RecorderStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub version: String,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub feature_count: usize,

    pub rules: usize,
    pub policy_version: u64,
    pub model: ModelInfo,
    pub recorder: RecorderStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub engine: String, // "http" | "onnx" | "none"
    pub configured: bool,
}

impl EngineStatus {
    pub fn collect(engine: &RiskEngine) -> Self {
        let stats = engine.stats();
        let model = engine.model_name();

        Self {
            version: crate::constants::APP_VERSION.to_string(),
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            rules: stats.rules,
            policy_version: stats.policy_version,
            model: ModelInfo {
                engine: model.unwrap_or("none").to_string(),
                configured: model.is_some(),
            },
            recorder: stats.recorder,
        }
    }
}
