use async_trait::async_trait;

use super::errors::InferenceError;
use super::types::InferenceRequest;
use crate::ensemble::ActionChunk;

/// Remote policy that turns an instruction plus observation history into a
/// chunk of future actions.
///
/// Latency is unknown and unbounded; callers block on the result.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn predict_action(
        &self,
        request: &InferenceRequest,
    ) -> Result<ActionChunk, InferenceError>;
}
