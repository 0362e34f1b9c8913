//! Tabular Q-learning brain.
//!
//! One row of `num_actions` action-values per observed [`StateKey`], created
//! lazily as all zeros the first time a state is read or written. Updates are
//! one-step off-policy Q-learning; a [`Successor::Terminal`] next state
//! contributes exactly zero future value.

use crate::error::BrainError;
use crate::state::StateKey;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

pub type ActionId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearningParams {
    pub learning_rate: f64,
    pub discount: f64,
    pub exploration_rate: f64,
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount: 0.9,
            exploration_rate: 0.2,
        }
    }
}

impl LearningParams {
    pub fn clamp(&mut self) {
        self.learning_rate = self.learning_rate.clamp(0.0, 1.0);
        self.discount = self.discount.clamp(0.0, 1.0);
        self.exploration_rate = self.exploration_rate.clamp(0.0, 1.0);
    }
}

/// What followed the decision being credited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Successor<'a> {
    State(&'a StateKey),
    /// The episode ended; there is no next state.
    Terminal,
}

#[derive(Serialize, Deserialize)]
struct BrainImage {
    num_actions: usize,
    states: BTreeMap<StateKey, Vec<f64>>,
}

#[derive(Clone, Debug)]
pub struct QBrain {
    table: BTreeMap<StateKey, Vec<f64>>,
    num_actions: usize,
    params: LearningParams,
    rng: StdRng,
}

impl QBrain {
    pub fn new(num_actions: usize, params: LearningParams, seed: u64) -> Self {
        Self {
            table: BTreeMap::new(),
            num_actions: num_actions.max(1),
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Builds a brain and seeds its table from `path`, falling back to an
    /// empty table when the image is missing or unusable.
    pub fn load_or_empty(num_actions: usize, params: LearningParams, seed: u64, path: &Path) -> Self {
        let mut brain = Self::new(num_actions, params, seed);
        match brain.restore(path) {
            Ok(0) => tracing::info!(path = %path.display(), "starting with an empty brain"),
            Ok(states) => tracing::info!(path = %path.display(), states, "brain loaded"),
            Err(err) => tracing::warn!("brain load skipped, starting empty: {err}"),
        }
        brain
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn values(&self, state: &StateKey) -> Option<&[f64]> {
        self.table.get(state).map(Vec::as_slice)
    }

    pub fn states(&self) -> impl Iterator<Item = (&StateKey, &[f64])> {
        self.table.iter().map(|(k, v)| (k, v.as_slice()))
    }

    fn row_mut(&mut self, state: &StateKey) -> &mut Vec<f64> {
        let n = self.num_actions;
        self.table
            .entry(state.clone())
            .or_insert_with(|| vec![0.0; n])
    }

    /// Greedy action; ties resolve to the lowest index.
    pub fn best_action(&mut self, state: &StateKey) -> ActionId {
        argmax(self.row_mut(state))
    }

    pub fn select_action(&mut self, state: &StateKey, exploring: bool) -> ActionId {
        if exploring && self.rng.gen::<f64>() < self.params.exploration_rate {
            // Still materialize the row so every visited state is recorded.
            self.row_mut(state);
            return self.rng.gen_range(0..self.num_actions);
        }
        self.best_action(state)
    }

    /// Applies `Q[prev][action] += lr * (reward + discount * future - Q[prev][action])`.
    ///
    /// Returns the updated value, or `None` when nothing was learned (no
    /// prior state, an out-of-range action, or a non-finite reward).
    pub fn update(
        &mut self,
        prev: Option<&StateKey>,
        action: ActionId,
        reward: f64,
        next: Successor<'_>,
    ) -> Option<f64> {
        let prev = prev?;
        if action >= self.num_actions {
            tracing::warn!(action, num_actions = self.num_actions, "update with out-of-range action ignored");
            return None;
        }
        if !reward.is_finite() {
            tracing::warn!(reward, "update with non-finite reward ignored");
            return None;
        }

        let future = match next {
            Successor::Terminal => 0.0,
            Successor::State(key) => max_value(self.row_mut(key)),
        };
        let LearningParams {
            learning_rate,
            discount,
            ..
        } = self.params;

        let row = self.row_mut(prev);
        let current = row[action];
        let updated = current + learning_rate * (reward + discount * future - current);
        row[action] = updated;
        Some(updated)
    }

    pub fn persist(&self, path: &Path) -> Result<(), BrainError> {
        let image = BrainImage {
            num_actions: self.num_actions,
            states: self.table.clone(),
        };
        let bytes = serde_json::to_vec(&image).map_err(|source| BrainError::Encode { source })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| BrainError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, bytes).map_err(|source| BrainError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replaces the table with the image at `path` and returns the number of
    /// states loaded. A missing file empties the table. Any other failure,
    /// including a vector length that disagrees with `num_actions`, leaves the
    /// in-memory table untouched.
    pub fn restore(&mut self, path: &Path) -> Result<usize, BrainError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.table.clear();
                return Ok(0);
            }
            Err(source) => {
                return Err(BrainError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let image: BrainImage = serde_json::from_slice(&bytes).map_err(|source| BrainError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        if image.num_actions != self.num_actions {
            return Err(BrainError::ShapeMismatch {
                expected: self.num_actions,
                found: image.num_actions,
                state: None,
            });
        }
        if let Some((key, row)) = image
            .states
            .iter()
            .find(|(_, row)| row.len() != self.num_actions)
        {
            return Err(BrainError::ShapeMismatch {
                expected: self.num_actions,
                found: row.len(),
                state: Some(key.to_string()),
            });
        }

        self.table = image.states;
        Ok(self.table.len())
    }

    pub fn save_best_effort(&self, path: &Path) {
        match self.persist(path) {
            Ok(()) => tracing::debug!(path = %path.display(), states = self.len(), "brain saved"),
            Err(err) => tracing::warn!("brain save failed, continuing in memory: {err}"),
        }
    }
}

fn argmax(values: &[f64]) -> ActionId {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn max_value(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brain() -> QBrain {
        QBrain::new(4, LearningParams::default(), 7)
    }

    #[test]
    fn unseen_state_defaults_to_action_zero() {
        let mut brain = brain();
        let key = StateKey::from("FAR-HIGH-ALONE-CENTER");
        assert_eq!(brain.best_action(&key), 0);
        assert_eq!(brain.values(&key), Some(&[0.0; 4][..]));
    }

    #[test]
    fn bellman_update_matches_closed_form() {
        let mut brain = brain();
        let s = StateKey::from("s");
        let next = StateKey::from("s2");
        let value = brain.update(Some(&s), 2, 10.0, Successor::State(&next));
        assert!((value.unwrap_or_default() - 1.0).abs() < 1e-12);
        assert_eq!(brain.values(&s), Some(&[0.0, 0.0, 1.0, 0.0][..]));
        assert_eq!(brain.values(&next), Some(&[0.0; 4][..]));
    }

    #[test]
    fn terminal_update_ignores_other_states() {
        let mut brain = brain();
        let s = StateKey::from("s");
        let rich = StateKey::from("rich");
        brain.update(Some(&rich), 0, 1000.0, Successor::Terminal);
        brain.update(Some(&s), 1, 10.0, Successor::Terminal);
        assert!((brain.values(&s).map(|v| v[1]).unwrap_or_default() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_prior_state_is_a_no_op() {
        let mut brain = brain();
        assert_eq!(brain.update(None, 0, 50.0, Successor::Terminal), None);
        assert!(brain.is_empty());
    }

    #[test]
    fn out_of_range_action_and_nan_reward_are_ignored() {
        let mut brain = brain();
        let s = StateKey::from("s");
        assert_eq!(brain.update(Some(&s), 4, 1.0, Successor::Terminal), None);
        assert_eq!(brain.update(Some(&s), 0, f64::NAN, Successor::Terminal), None);
        assert!(brain.is_empty());
    }

    #[test]
    fn ties_break_to_lowest_index() {
        let mut brain = brain();
        let s = StateKey::from("s");
        brain.update(Some(&s), 3, 10.0, Successor::Terminal);
        brain.update(Some(&s), 1, 10.0, Successor::Terminal);
        assert_eq!(brain.best_action(&s), 1);
    }

    #[test]
    fn exploitation_is_deterministic() {
        let mut brain = brain();
        let s = StateKey::from("s");
        brain.update(Some(&s), 2, 5.0, Successor::Terminal);
        let picks: Vec<_> = (0..50).map(|_| brain.select_action(&s, false)).collect();
        assert!(picks.iter().all(|a| *a == 2));
    }

    #[test]
    fn exploration_reaches_every_action() {
        let params = LearningParams {
            exploration_rate: 1.0,
            ..LearningParams::default()
        };
        let mut brain = QBrain::new(4, params, 11);
        let s = StateKey::from("s");
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[brain.select_action(&s, true)] = true;
        }
        assert!(seen.iter().all(|x| *x));
        assert_eq!(brain.len(), 1);
    }
}
