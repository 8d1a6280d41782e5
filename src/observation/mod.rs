mod adapter;
mod errors;
mod queues;
mod types;

pub use adapter::{ACTION_FIELD, IMAGE_FIELD, ObservationAdapter, PreparedObservation, STATE_FIELD};
pub use errors::ObservationError;
pub use queues::{FieldKey, ObservationQueueSet, Snapshot};
pub use types::{ColorOrder, ImageTensor, PixelLayout, Sample};
