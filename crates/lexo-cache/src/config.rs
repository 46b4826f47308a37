use serde::{Deserialize, Serialize};

/// Tuning for [`BatchLoader`](crate::BatchLoader).
///
/// A class group is loaded whole when the number of requested ids exceeds
/// `max_exact_ids`, or exceeds `class_fraction` of the class population.
/// Otherwise exactly the requested ids are fetched.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchLoadConfig {
    /// Largest group fetched id by id.
    pub max_exact_ids: usize,
    /// Share of the class population above which the whole class is loaded.
    pub class_fraction: f64,
}

impl Default for BatchLoadConfig {
    fn default() -> Self {
        Self {
            max_exact_ids: 400,
            class_fraction: 0.5,
        }
    }
}

impl BatchLoadConfig {
    /// Returns `true` if `requested` ids out of `population` instances should
    /// be served by loading every instance of the class.
    pub fn should_load_all(&self, requested: usize, population: usize) -> bool {
        requested > self.max_exact_ids || requested as f64 > population as f64 * self.class_fraction
    }
}
