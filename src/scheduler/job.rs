use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use crate::error::{Error, Result};
use crate::price_infra::ProviderId;
use crate::types::Symbol;

pub const MIN_INTERVAL_SECS: u64 = 10;
pub const MAX_INTERVAL_SECS: u64 = 3600;
pub const MAX_SYMBOLS: usize = 10;

/// What a polling job does: which symbols, how often, from where.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub symbols: Vec<Symbol>,
    #[serde(rename = "interval")]
    pub interval_secs: u64,
    pub provider: ProviderId,
}

impl JobSpec {
    /// Normalizes raw symbols (trim, uppercase, dedup keeping first occurrence)
    /// and checks the bounds.
    pub fn new<I, S>(symbols: I, interval_secs: u64, provider: ProviderId) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut normalized = Vec::new();
        for raw in symbols {
            let symbol = Symbol::parse(raw.as_ref())
                .map_err(|e| Error::InvalidJobConfig(e.to_string()))?;
            if seen.insert(symbol.clone()) {
                normalized.push(symbol);
            }
        }

        let spec = JobSpec { symbols: normalized, interval_secs, provider };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(Error::InvalidJobConfig("at least one symbol is required".to_string()));
        }
        if self.symbols.len() > MAX_SYMBOLS {
            return Err(Error::InvalidJobConfig(format!(
                "at most {} symbols per job, got {}",
                MAX_SYMBOLS,
                self.symbols.len()
            )));
        }
        let unique: HashSet<&Symbol> = self.symbols.iter().collect();
        if unique.len() != self.symbols.len() {
            return Err(Error::InvalidJobConfig("duplicate symbols".to_string()));
        }
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&self.interval_secs) {
            return Err(Error::InvalidJobConfig(format!(
                "interval must be between {} and {} seconds, got {}",
                MIN_INTERVAL_SECS, MAX_INTERVAL_SECS, self.interval_secs
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
