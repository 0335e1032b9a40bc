use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SimulationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of philosophers (and utensils) at the table.
    pub population: usize,
    /// Multiplier for thinking and eating times; smaller is faster.
    pub speed: u32,
    /// Upper bound in milliseconds of the random thinking roll; eating uses half.
    pub base_sleep_ms: u64,
    /// Fixed delay between taking the right and the left utensil.
    pub utensil_gap_ms: u64,
    /// Buffer size of every observation channel.
    pub event_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population: 5,
            speed: 50,
            base_sleep_ms: 100,
            utensil_gap_ms: 500,
            event_capacity: 1024,
        }
    }
}

impl SimulationConfig {
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&text)
            .map_err(|e| SimulationError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Applies `DINERS_POPULATION`, `DINERS_SPEED` and `DINERS_GAP_MS`
    /// from `lookup`. Unparseable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(population) = parse_var(&lookup, "DINERS_POPULATION") {
            self.population = population;
        }
        if let Some(speed) = parse_var(&lookup, "DINERS_SPEED") {
            self.speed = speed;
        }
        if let Some(gap) = parse_var(&lookup, "DINERS_GAP_MS") {
            self.utensil_gap_ms = gap;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.population == 0 {
            return Err(SimulationError::InvalidPopulation(self.population));
        }
        if self.event_capacity == 0 {
            return Err(SimulationError::Config(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}
