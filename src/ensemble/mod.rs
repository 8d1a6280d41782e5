mod chunk;
mod ensembler;
mod errors;

pub use chunk::ActionChunk;
pub use ensembler::TemporalActionEnsembler;
pub use errors::EnsembleError;
