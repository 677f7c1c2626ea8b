use uuid::Uuid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque polling job identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        JobId(id.into())
    }

    /// Fresh id of the form `poll_1a2b3c4d`.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        JobId(format!("poll_{}", &hex[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        JobId(id.to_string())
    }
}

/// Identifier of a stored raw provider response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecordId(pub Uuid);

impl RawRecordId {
    pub fn new() -> Self {
        RawRecordId(Uuid::new_v4())
    }
}

impl Default for RawRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RawRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_job_ids_are_prefixed_and_unique() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert!(a.as_str().starts_with("poll_"));
        assert_eq!(a.as_str().len(), "poll_".len() + 8);
        assert_ne!(a, b);
    }

    #[test]
    fn job_id_serializes_as_plain_string() {
        let id = JobId::from("job1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"job1\"");
    }
}
