// Model catalog types returned by the model listing endpoint
// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};

/// Per-token prices, kept as the decimal strings the API returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub completion: String,
}

/// A model offered by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context_length: u64,
    #[serde(default)]
    pub pricing: Pricing,
}

/// Body of `GET /models`.
#[derive(Debug, Deserialize)]
pub struct ModelListResponse {
    pub data: Vec<ModelInfo>,
}
