//! ONNX scoring oracle
//!
//! Load và chạy ONNX classifier locally (feature `onnx`).
//! Input: `[1, FEATURE_COUNT]` f32, output: last value = fraud probability.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

use super::layout::{FeatureVector, FEATURE_COUNT};
use super::oracle::ModelOracle;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub features: usize,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

pub struct OnnxModelOracle {
    session: Arc<Mutex<Session>>,
    metadata: ModelMetadata,
}

impl OnnxModelOracle {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        tracing::info!(path = %path.display(), "Loading ONNX model");

        if !path.exists() {
            return Err(ModelError::NotLoaded(format!("model not found: {}", path.display())));
        }

        let session = Session::builder()
            .map_err(|e| ModelError::NotLoaded(format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::NotLoaded(format!("optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| ModelError::NotLoaded(format!("load: {}", e)))?;

        Ok(Self::with_session(session, &path.display().to_string()))
    }

    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self, ModelError> {
        tracing::info!(bytes = model_bytes.len(), "Loading ONNX model from memory");

        let session = Session::builder()
            .map_err(|e| ModelError::NotLoaded(format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::NotLoaded(format!("optimization: {}", e)))?
            .commit_from_memory(model_bytes)
            .map_err(|e| ModelError::NotLoaded(format!("load from memory: {}", e)))?;

        Ok(Self::with_session(session, "<memory>"))
    }

    fn with_session(session: Session, model_path: &str) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            metadata: ModelMetadata {
                model_path: model_path.to_string(),
                features: FEATURE_COUNT,
                loaded_at: chrono::Utc::now(),
            },
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

fn run(session: &Mutex<Session>, values: Vec<f32>) -> Result<f64, ModelError> {
    // missing → 0.0
    let dense: Vec<f32> = values.into_iter().map(|v| if v.is_nan() { 0.0 } else { v }).collect();

    let input = Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), dense)
        .map_err(|e| ModelError::Inference(format!("array: {}", e)))?;
    let tensor = Value::from_array(input).map_err(|e| ModelError::Inference(format!("tensor: {}", e)))?;

    let mut session = session.lock();
    let output_name = session
        .outputs
        .first()
        .map(|o| o.name.clone())
        .ok_or_else(|| ModelError::Inference("model defines no output".to_string()))?;

    let outputs = session
        .run(ort::inputs![tensor])
        .map_err(|e| ModelError::Inference(e.to_string()))?;
    let output = outputs
        .get(&output_name)
        .ok_or_else(|| ModelError::Inference("missing output".to_string()))?;
    let (_, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| ModelError::Inference(format!("extract: {}", e)))?;

    data.last()
        .map(|p| *p as f64)
        .ok_or_else(|| ModelError::Inference("empty output".to_string()))
}

#[async_trait]
impl ModelOracle for OnnxModelOracle {
    fn name(&self) -> &str {
        "onnx"
    }

    async fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        if features.values.len() != FEATURE_COUNT {
            return Err(ModelError::Inference(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                features.values.len()
            )));
        }

        let session = self.session.clone();
        let values = features.values.clone();
        tokio::task::spawn_blocking(move || run(&session, values))
            .await
            .map_err(|e| ModelError::Inference(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let err = OnnxModelOracle::load(Path::new("/nonexistent/model.onnx")).err().unwrap();
        assert!(matches!(err, ModelError::NotLoaded(_)));
    }
}
