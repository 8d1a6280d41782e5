use serde::{Deserialize, Serialize};

use super::errors::EnsembleError;

/// `horizon` consecutive actions of `action_dim` values each, stored row-major.
///
/// On the wire a chunk is a list of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f32>>", into = "Vec<Vec<f32>>")]
pub struct ActionChunk {
    horizon: usize,
    action_dim: usize,
    data: Vec<f32>,
}

impl ActionChunk {
    pub fn new(horizon: usize, action_dim: usize, data: Vec<f32>) -> Result<Self, EnsembleError> {
        if horizon == 0 {
            return Err(EnsembleError::EmptyChunk);
        }
        let expected = horizon * action_dim;
        if data.len() != expected {
            return Err(EnsembleError::Shape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            horizon,
            action_dim,
            data,
        })
    }

    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, EnsembleError> {
        let action_dim = rows.first().map(Vec::len).ok_or(EnsembleError::EmptyChunk)?;
        let mut data = Vec::with_capacity(rows.len() * action_dim);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != action_dim {
                return Err(EnsembleError::RaggedRows {
                    row,
                    expected: action_dim,
                    actual: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Self::new(rows.len(), action_dim, data)
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Action at offset `i`. Panics if `i >= horizon`.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.action_dim..(i + 1) * self.action_dim]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact(0) panics; a zero-width chunk still has `horizon` empty rows
        (0..self.horizon).map(move |i| self.row(i))
    }

    /// The first `horizon` rows (or all of them, if the chunk is shorter).
    pub fn truncated(&self, horizon: usize) -> Self {
        let horizon = horizon.clamp(1, self.horizon);
        Self {
            horizon,
            action_dim: self.action_dim,
            data: self.data[..horizon * self.action_dim].to_vec(),
        }
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.rows().map(<[f32]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<f32>>> for ActionChunk {
    type Error = EnsembleError;

    fn try_from(rows: Vec<Vec<f32>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<ActionChunk> for Vec<Vec<f32>> {
    fn from(chunk: ActionChunk) -> Self {
        chunk.to_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_layout() {
        let chunk = ActionChunk::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])
            .unwrap();
        assert_eq!(chunk.horizon(), 3);
        assert_eq!(chunk.action_dim(), 2);
        assert_eq!(chunk.row(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = ActionChunk::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            EnsembleError::RaggedRows {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_empty_chunk_is_rejected() {
        assert_eq!(
            ActionChunk::from_rows(vec![]).unwrap_err(),
            EnsembleError::EmptyChunk
        );
        assert_eq!(
            ActionChunk::new(2, 3, vec![0.0; 5]).unwrap_err(),
            EnsembleError::Shape {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_truncated_keeps_leading_rows() {
        let chunk = ActionChunk::from_rows(vec![vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        assert_eq!(chunk.truncated(2).to_rows(), vec![vec![1.0], vec![2.0]]);
        assert_eq!(chunk.truncated(10).horizon(), 3);
    }

    #[test]
    fn test_deserializes_from_nested_lists() {
        let chunk: ActionChunk = serde_json::from_str("[[0.5, 1.5], [2.5, 3.5]]").unwrap();
        assert_eq!(chunk.row(1), &[2.5, 3.5]);
        assert!(serde_json::from_str::<ActionChunk>("[[0.5], [1.0, 2.0]]").is_err());
    }
}
