use std::collections::VecDeque;

use tracing::trace;

use super::chunk::ActionChunk;
use super::errors::EnsembleError;

/// Running weighted sum for one absolute step that has not been dispatched yet.
#[derive(Debug, Clone)]
struct Accumulator {
    weighted_sum: Vec<f64>,
    weight_total: f64,
    count: u32,
}

impl Accumulator {
    fn new(action_dim: usize) -> Self {
        Self {
            weighted_sum: vec![0.0; action_dim],
            weight_total: 0.0,
            count: 0,
        }
    }

    fn add(&mut self, weight: f64, action: &[f32]) {
        for (sum, value) in self.weighted_sum.iter_mut().zip(action) {
            *sum += weight * f64::from(*value);
        }
        self.weight_total += weight;
        self.count += 1;
    }
}

/// Blends overlapping action chunks into one smoothed action stream.
///
/// Every chunk predicts actions for the absolute steps `[cursor, cursor + H)`.
/// The prediction at offset `i` votes for its step with weight
/// `(1 - coeff)^i`, so near-future predictions dominate the far-future
/// guesses of older chunks. Each `update` returns the next `exe_steps`
/// blended actions and retires them; a retired step never changes again.
#[derive(Debug, Clone)]
pub struct TemporalActionEnsembler {
    coeff: f64,
    chunk_size: usize,
    exe_steps: usize,
    weights: Vec<f64>,
    cursor: u64,
    pending: VecDeque<Accumulator>,
    action_dim: Option<usize>,
}

impl TemporalActionEnsembler {
    pub fn new(coeff: f64, chunk_size: usize, exe_steps: usize) -> Result<Self, EnsembleError> {
        if !(coeff > 0.0 && coeff <= 1.0) {
            return Err(EnsembleError::InvalidConfig(format!(
                "coeff must lie in (0, 1], got {coeff}"
            )));
        }
        if chunk_size == 0 {
            return Err(EnsembleError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if exe_steps == 0 || exe_steps > chunk_size {
            return Err(EnsembleError::InvalidConfig(format!(
                "exe_steps must lie in [1, {chunk_size}], got {exe_steps}"
            )));
        }
        // With coeff == 1 every offset past 0 weighs nothing.
        if coeff == 1.0 && exe_steps > 1 {
            return Err(EnsembleError::InvalidConfig(
                "coeff of 1 only supports exe_steps of 1".to_string(),
            ));
        }

        let weights = (0..chunk_size)
            .map(|i| (1.0 - coeff).powi(i as i32))
            .collect();

        Ok(Self {
            coeff,
            chunk_size,
            exe_steps,
            weights,
            cursor: 0,
            pending: VecDeque::with_capacity(chunk_size),
            action_dim: None,
        })
    }

    pub fn coeff(&self) -> f64 {
        self.coeff
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn exe_steps(&self) -> usize {
        self.exe_steps
    }

    /// Absolute step of the next action `update` will return.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Number of future steps holding at least a placeholder accumulator.
    pub fn pending_steps(&self) -> usize {
        self.pending.len()
    }

    /// Weight given to the prediction at `offset` within a chunk.
    pub fn weight(&self, offset: usize) -> f64 {
        self.weights.get(offset).copied().unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.cursor = 0;
        self.action_dim = None;
    }

    /// Folds `chunk` into the buffer and returns the next `exe_steps` actions.
    ///
    /// Rows past `chunk_size` are ignored. The chunk's action dimension must
    /// match every chunk seen since the last reset.
    pub fn update(&mut self, chunk: &ActionChunk) -> Result<ActionChunk, EnsembleError> {
        let dim = chunk.action_dim();
        if let Some(expected) = self.action_dim {
            if expected != dim {
                return Err(EnsembleError::DimensionMismatch {
                    expected,
                    actual: dim,
                });
            }
        }

        let horizon = chunk.horizon().min(self.chunk_size);
        for j in horizon..self.exe_steps {
            let covered = self.pending.get(j).is_some_and(|acc| acc.count > 0);
            if !covered {
                return Err(EnsembleError::UncoveredStep {
                    step: self.cursor + j as u64,
                });
            }
        }

        self.action_dim = Some(dim);
        while self.pending.len() < horizon {
            self.pending.push_back(Accumulator::new(dim));
        }
        for (offset, (acc, action)) in self.pending.iter_mut().zip(chunk.rows()).take(horizon).enumerate() {
            acc.add(self.weights[offset], action);
        }

        let mut ready = Vec::with_capacity(self.exe_steps * dim);
        for (j, acc) in self.pending.iter().take(self.exe_steps).enumerate() {
            let step = self.cursor + j as u64;
            if acc.weight_total <= 0.0 {
                return Err(EnsembleError::ZeroWeight { step });
            }
            ready.extend(
                acc.weighted_sum
                    .iter()
                    .map(|sum| (sum / acc.weight_total) as f32),
            );
            trace!(step, votes = acc.count, "retiring step");
        }

        self.pending.drain(..self.exe_steps);
        self.cursor += self.exe_steps as u64;

        ActionChunk::new(self.exe_steps, dim, ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn chunk(rows: &[f32]) -> ActionChunk {
        ActionChunk::from_rows(rows.iter().map(|v| vec![*v]).collect()).unwrap()
    }

    fn blend(pairs: &[(f64, f32)]) -> f32 {
        let total: f64 = pairs.iter().map(|(w, _)| w).sum();
        let sum: f64 = pairs.iter().map(|(w, v)| w * f64::from(*v)).sum();
        (sum / total) as f32
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(TemporalActionEnsembler::new(0.0, 4, 2).is_err());
        assert!(TemporalActionEnsembler::new(1.5, 4, 2).is_err());
        assert!(TemporalActionEnsembler::new(f64::NAN, 4, 2).is_err());
        assert!(TemporalActionEnsembler::new(0.01, 0, 0).is_err());
        assert!(TemporalActionEnsembler::new(0.01, 4, 0).is_err());
        assert!(TemporalActionEnsembler::new(0.01, 4, 5).is_err());
        assert!(TemporalActionEnsembler::new(1.0, 4, 2).is_err());
        assert!(TemporalActionEnsembler::new(1.0, 4, 1).is_ok());
    }

    #[test]
    fn test_weights_decay_with_offset() {
        let ens = TemporalActionEnsembler::new(0.01, 4, 2).unwrap();
        assert_eq!(ens.weight(0), 1.0);
        assert!((ens.weight(2) - 0.9801).abs() < 1e-12);
        assert!(ens.weight(1) > ens.weight(3));
        assert_eq!(ens.weight(4), 0.0);
    }

    #[test]
    fn test_single_chunk_passes_through() {
        let mut ens = TemporalActionEnsembler::new(0.01, 3, 3).unwrap();
        ens.reset();
        let input = ActionChunk::from_rows(vec![
            vec![0.1, -2.0],
            vec![0.7, 3.25],
            vec![-1.5, 0.0],
        ])
        .unwrap();

        let out = ens.update(&input).unwrap();
        assert_eq!(out.horizon(), 3);
        for (got, want) in out.rows().zip(input.rows()) {
            for (g, w) in got.iter().zip(want) {
                assert!((g - w).abs() < EPS, "{g} != {w}");
            }
        }
        assert_eq!(ens.cursor(), 3);
        assert_eq!(ens.pending_steps(), 0);
    }

    #[test]
    fn test_every_update_returns_exe_steps_actions() {
        let mut ens = TemporalActionEnsembler::new(0.1, 8, 3).unwrap();
        for k in 0..10 {
            let rows: Vec<f32> = (0..8).map(|i| (k * 10 + i) as f32).collect();
            let out = ens.update(&chunk(&rows)).unwrap();
            assert_eq!(out.horizon(), 3);
            assert_eq!(ens.cursor(), 3 * (k + 1) as u64);
        }
    }

    #[test]
    fn test_concrete_overlap_scenario() {
        let mut ens = TemporalActionEnsembler::new(0.01, 4, 2).unwrap();
        ens.reset();

        let first = ens.update(&chunk(&[0.0, 1.0, 2.0, 3.0])).unwrap();
        assert_eq!(first.to_rows(), vec![vec![0.0], vec![1.0]]);

        let second = ens.update(&chunk(&[10.0, 11.0, 12.0, 13.0])).unwrap();
        let step2 = second.row(0)[0];
        let step3 = second.row(1)[0];

        // a2 = 2.0 (offset 2), b0 = 10.0 (offset 0)
        assert!(step2 > 2.0 && step2 < 10.0);
        assert!((step2 - 10.0).abs() < (step2 - 2.0).abs());
        assert!((step2 - blend(&[(0.9801, 2.0), (1.0, 10.0)])).abs() < EPS);

        // a3 = 3.0 (offset 3), b1 = 11.0 (offset 1)
        let w1 = 0.99;
        let w3 = 0.99f64.powi(3);
        assert!((step3 - blend(&[(w3, 3.0), (w1, 11.0)])).abs() < EPS);
    }

    #[test]
    fn test_blend_leans_towards_smaller_offset() {
        // Large coefficient makes the lean obvious.
        let mut ens = TemporalActionEnsembler::new(0.5, 4, 2).unwrap();
        ens.update(&chunk(&[0.0, 0.0, 0.0, 0.0])).unwrap();
        let out = ens.update(&chunk(&[1.0, 1.0, 1.0, 1.0])).unwrap();
        // step 2: weights 0.25 (old, offset 2) vs 1.0 (new, offset 0)
        assert!((out.row(0)[0] - 0.8).abs() < EPS);
    }

    #[test]
    fn test_retired_steps_take_no_more_votes() {
        let mut ens = TemporalActionEnsembler::new(0.01, 4, 2).unwrap();
        ens.update(&chunk(&[100.0, 100.0, 100.0, 100.0])).unwrap();
        ens.update(&chunk(&[5.0, 5.0, 5.0, 5.0])).unwrap();
        // Steps 4 and 5 are only covered by the second chunk (offsets 2, 3)
        // and the third one (offsets 0, 1); the first chunk is long gone.
        let out = ens.update(&chunk(&[7.0, 7.0, 7.0, 7.0])).unwrap();
        for row in out.rows() {
            assert!(row[0] > 5.0 && row[0] < 7.0);
        }
        assert_eq!(ens.cursor(), 6);
        assert_eq!(ens.pending_steps(), 2);
    }

    #[test]
    fn test_long_chunk_is_capped_at_chunk_size() {
        let mut ens = TemporalActionEnsembler::new(0.01, 4, 2).unwrap();
        ens.update(&chunk(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(ens.pending_steps(), 2);
    }

    #[test]
    fn test_short_chunk_covered_by_history() {
        let mut ens = TemporalActionEnsembler::new(0.01, 4, 2).unwrap();
        ens.update(&chunk(&[0.0, 1.0, 2.0, 3.0])).unwrap();
        // Only one fresh row; step 3 still has the first chunk's prediction.
        let out = ens.update(&chunk(&[2.0])).unwrap();
        assert!((out.row(1)[0] - 3.0).abs() < EPS);
    }

    #[test]
    fn test_uncovered_step_is_reported() {
        let mut ens = TemporalActionEnsembler::new(0.01, 4, 2).unwrap();
        let err = ens.update(&chunk(&[1.0])).unwrap_err();
        assert_eq!(err, EnsembleError::UncoveredStep { step: 1 });
        // The failed update left nothing behind.
        assert_eq!(ens.pending_steps(), 0);
        assert_eq!(ens.cursor(), 0);
    }

    #[test]
    fn test_dimension_change_is_rejected() {
        let mut ens = TemporalActionEnsembler::new(0.01, 2, 1).unwrap();
        ens.update(&chunk(&[1.0, 2.0])).unwrap();
        let wide = ActionChunk::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(
            ens.update(&wide).unwrap_err(),
            EnsembleError::DimensionMismatch {
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_reset_clears_history() {
        let mut ens = TemporalActionEnsembler::new(0.01, 4, 2).unwrap();
        ens.update(&chunk(&[9.0, 9.0, 9.0, 9.0])).unwrap();
        ens.reset();
        assert_eq!(ens.cursor(), 0);
        assert_eq!(ens.pending_steps(), 0);

        let out = ens.update(&chunk(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(out.to_rows(), vec![vec![1.0], vec![2.0]]);
    }
}
