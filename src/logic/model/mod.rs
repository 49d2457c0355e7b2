//! Model Module - ML Scoring Oracle
//!
//! Tách feature layout khỏi inference backend.
//! Dễ dàng swap HTTP oracle, local ONNX model, or none.

pub mod layout;
pub mod oracle;
pub mod http;
#[cfg(feature = "onnx")]
pub mod onnx;

// Re-export common types
pub use layout::{layout_hash, FeatureVector, LayoutInfo, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use oracle::{check_probability, score_with_timeout, ModelOracle};
pub use http::HttpModelOracle;
#[cfg(feature = "onnx")]
pub use onnx::OnnxModelOracle;
