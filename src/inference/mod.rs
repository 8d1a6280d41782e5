mod errors;
mod http;
mod traits;
mod types;

pub use errors::InferenceError;
pub use http::{HttpInferenceClient, RetryPolicy};
pub use traits::InferenceClient;
pub use types::{InferenceRequest, PredictResponse};
