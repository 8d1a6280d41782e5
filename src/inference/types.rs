use serde::{Deserialize, Serialize};

use crate::ensemble::ActionChunk;
use crate::observation::Snapshot;

/// Body of a `predict_action` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub language_instruction: String,
    pub observation: Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub actions: ActionChunk,
}
