//! The adaptive strategy selector 

use crate::features::QueryFeatures;
use crate::replay::{ReplayBuffer, Transition};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use taxorag_retrieval::SearchMode;

const ACTIONS: [SearchMode; 3] = [SearchMode::Bm25, SearchMode::Vector, SearchMode::Hybrid];

/// Learning rate for the per-(context, action) Q-value update.
const LEARNING_RATE: f32 = 0.1;

/// Pure-compute soft-Q contextual bandit over the three retrieval modes
///  Reads nothing but its own in-memory table; callers
/// persist/restore the table across process restarts if desired.
pub struct AdaptiveStrategySelector {
    q_values: Mutex<HashMap<(String, SearchMode), f32>>,
    replay: Mutex<ReplayBuffer>,
    temperature: f32,
    epsilon: Mutex<f32>,
    epsilon_decay: f32,
    epsilon_floor: f32,
}

impl AdaptiveStrategySelector {
    #[must_use]
    pub fn new(temperature: f32, initial_epsilon: f32, epsilon_decay: f32) -> Self {
        Self {
            q_values: Mutex::new(HashMap::new()),
            replay: Mutex::new(ReplayBuffer::default()),
            temperature: temperature.max(1e-3),
            epsilon: Mutex::new(initial_epsilon.clamp(0.0, 1.0)),
            epsilon_decay: epsilon_decay.clamp(0.0, 1.0),
            epsilon_floor: 0.01,
        }
    }

    /// Pick a retrieval strategy for this query ("on-policy
    /// exploration ε decays").
    pub fn select(&self, features: &QueryFeatures) -> SearchMode {
        let context = features.context_key();
        let mut epsilon_guard = self.epsilon.lock();
        let epsilon = *epsilon_guard;
        *epsilon_guard = (epsilon * self.epsilon_decay).max(self.epsilon_floor);
        drop(epsilon_guard);

        let mut rng = rand::thread_rng();
        if rng.gen::<f32>() < epsilon {
            return ACTIONS[rng.gen_range(0..ACTIONS.len())];
        }

        self.softmax_pick(&context, &mut rng)
    }

    fn softmax_pick(&self, context: &str, rng: &mut impl Rng) -> SearchMode {
        let q = self.q_values.lock();
        let scores: Vec<f32> = ACTIONS
            .iter()
            .map(|a| *q.get(&(context.to_string(), *a)).unwrap_or(&0.0) / self.temperature)
            .collect();
        drop(q);

        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        let probs: Vec<f32> = exps.iter().map(|e| e / sum).collect();

        let mut draw = rng.gen::<f32>();
        for (action, prob) in ACTIONS.iter().zip(probs.iter()) {
            if draw < *prob {
                return *action;
            }
            draw -= prob;
        }
        ACTIONS[ACTIONS.len() - 1]
    }

    /// Feed back the observed reward for a `(context, action)` pair
    /// ("reward signal is the post-response quality combined
    /// with latency penalty"). Combine the two with
    /// [`combined_reward`] before calling this.
    pub fn update(&self, features: &QueryFeatures, action: SearchMode, reward: f32) {
        let context = features.context_key();
        {
            let mut q = self.q_values.lock();
            let entry = q.entry((context.clone(), action)).or_insert(0.0);
            *entry += LEARNING_RATE * (reward - *entry);
        }
        self.replay.lock().push(Transition {
            context,
            action,
            reward,
        });
    }

    #[must_use]
    pub fn replay_len(&self) -> usize {
        self.replay.lock().len()
    }

    #[must_use]
    pub fn q_value(&self, features: &QueryFeatures, action: SearchMode) -> f32 {
        let context = features.context_key();
        *self
            .q_values
            .lock()
            .get(&(context, action))
            .unwrap_or(&0.0)
    }
}

/// `reward = quality - latency_penalty`, where the penalty grows linearly
/// once latency exceeds the step's timeout ("combined with
/// latency penalty").
#[must_use]
pub fn combined_reward(quality: f32, latency_ms: u64, timeout_ms: u64) -> f32 {
    if timeout_ms == 0 {
        return quality;
    }
    #[allow(clippy::cast_precision_loss)]
    let overrun_ratio = (latency_ms.saturating_sub(timeout_ms)) as f32 / timeout_ms as f32;
    (quality - overrun_ratio).clamp(-1.0, 1.0)
}
