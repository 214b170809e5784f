//! Render configuration (ambient §10.2): tunables for the annealing solver
//! and the output document, loadable from an optional TOML file and merged
//! over built-in defaults the way the teacher's world/platform configs do.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Scale factor applied to jitter along an element's own axis of
    /// movement when proposing an annealing move.
    pub primary_scale: f64,
    /// Scale factor applied to jitter along the cross axis.
    pub secondary_scale: f64,
    /// Annealing stops once temperature decays at or below this value.
    pub min_temperature: f64,
    /// Used only when the 100-sample calibration yields no positive delta.
    pub fallback_initial_temperature: f64,
    /// Temperature multiplier applied once per outer annealing step.
    pub cooling_rate: f64,
    /// Upper bound on accepted moves per temperature before advancing.
    pub max_accepts_per_temperature: usize,
    /// PRNG seed; fixed by default so renders are reproducible.
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            primary_scale: 10.0,
            secondary_scale: 1.0,
            min_temperature: 0.1,
            fallback_initial_temperature: 1000.0,
            cooling_rate: 0.95,
            max_accepts_per_temperature: 100,
            seed: 0,
        }
    }
}

impl RenderConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
