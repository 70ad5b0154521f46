use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sandbox::LifecycleError;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::config::VmConfig;
use crate::error::{BenchError, BenchResult};
use crate::provider::ProviderKind;
use crate::runner::RunMode;
use crate::stats::Summary;

/// Give up after this many name collisions in one directory.
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TrialOutcome {
    Success { duration_secs: f64 },
    Failure { error: String },
}

/// One timed lifecycle attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trial {
    pub iteration: usize,
    pub warmup: bool,
    #[serde(flatten)]
    pub outcome: TrialOutcome,
}

impl Trial {
    pub fn from_result(
        iteration: usize,
        warmup: bool,
        result: Result<Duration, LifecycleError>,
    ) -> Self {
        let outcome = match result {
            Ok(elapsed) => TrialOutcome::Success {
                duration_secs: elapsed.as_secs_f64(),
            },
            Err(e) => TrialOutcome::Failure {
                error: e.to_string(),
            },
        };
        Self {
            iteration,
            warmup,
            outcome,
        }
    }

    pub fn failed(iteration: usize, warmup: bool, error: impl Into<String>) -> Self {
        Self {
            iteration,
            warmup,
            outcome: TrialOutcome::Failure {
                error: error.into(),
            },
        }
    }

    pub fn duration_secs(&self) -> Option<f64> {
        match self.outcome {
            TrialOutcome::Success { duration_secs } => Some(duration_secs),
            TrialOutcome::Failure { .. } => None,
        }
    }
}

/// Every trial of one provider, warmup first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSet {
    pub provider: String,
    /// Set when the provider could not be prepared; no trials were run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
    pub trials: Vec<Trial>,
}

impl SampleSet {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            setup_error: None,
            trials: Vec::new(),
        }
    }

    pub fn setup_failed(provider: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            setup_error: Some(error.into()),
            trials: Vec::new(),
        }
    }

    pub fn measured(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter().filter(|t| !t.warmup)
    }

    /// Durations of measured successes, in trial order.
    pub fn measured_durations(&self) -> Vec<f64> {
        self.measured().filter_map(Trial::duration_secs).collect()
    }

    pub fn measured_failures(&self) -> usize {
        self.measured()
            .filter(|t| t.duration_secs().is_none())
            .count()
    }
}

/// Configuration echoed into the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordConfig {
    pub iterations: u32,
    pub warmup: u32,
    pub providers: Vec<ProviderKind>,
    pub mode: RunMode,
    pub vm: VmConfig,
    pub script: String,
}

/// Everything one invocation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    #[serde(serialize_with = "serialize_iso")]
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_iso")]
    pub finished_at: DateTime<Utc>,
    pub config: RecordConfig,
    pub samples: Vec<SampleSet>,
    pub summaries: Vec<Summary>,
}

/// Serialize as ISO 8601 with millisecond precision.
fn serialize_iso<S: serde::Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

/// File stem derived from the run's start time.
pub fn file_stem(started_at: DateTime<Utc>) -> String {
    format!("benchmark_results_{}", started_at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Write the record as pretty JSON into `dir`, creating it if needed.
///
/// The file is created exclusively; when the timestamped name is taken a
/// `-N` suffix is appended instead of overwriting.
pub async fn persist(record: &RunRecord, dir: &Path) -> BenchResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| BenchError::Record(format!("create {}: {e}", dir.display())))?;

    let json = serde_json::to_vec_pretty(record)
        .map_err(|e| BenchError::Record(format!("serialize: {e}")))?;

    let stem = file_stem(record.started_at);
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = match attempt {
            0 => format!("{stem}.json"),
            n => format!("{stem}-{n}.json"),
        };
        let path = dir.join(name);
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(BenchError::Record(format!(
                    "create {}: {e}",
                    path.display()
                )));
            }
        };
        file.write_all(&json).await?;
        file.flush().await?;
        return Ok(path);
    }

    Err(BenchError::Record(format!(
        "no free file name for {stem} in {}",
        dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sandbox::{LifecycleStep, SandboxError};

    use super::*;

    fn record(started_at: DateTime<Utc>) -> RunRecord {
        let mut set = SampleSet::new("morph");
        set.trials.push(Trial::failed(0, true, "warmup failure"));
        set.trials.push(Trial::from_result(1, false, Ok(Duration::from_millis(250))));
        let summary = Summary::from_samples(&set);
        RunRecord {
            started_at,
            finished_at: started_at,
            config: RecordConfig {
                iterations: 1,
                warmup: 1,
                providers: vec![ProviderKind::Morph],
                mode: RunMode::Sequential,
                vm: VmConfig::default(),
                script: "print(1)".into(),
            },
            samples: vec![set],
            summaries: vec![summary],
        }
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 5, 7).unwrap() + chrono::Duration::milliseconds(42)
    }

    #[test]
    fn stem_embeds_start_time() {
        assert_eq!(file_stem(start_time()), "benchmark_results_20261018_090507_042");
    }

    #[test]
    fn failure_keeps_step_and_provider() {
        let err = LifecycleError {
            provider: "runloop".into(),
            step: LifecycleStep::Create,
            source: SandboxError::CreationFailed("quota".into()),
        };
        let trial = Trial::from_result(3, false, Err(err));
        assert_eq!(
            trial.outcome,
            TrialOutcome::Failure {
                error: "runloop: create failed: sandbox creation failed: quota".into()
            }
        );
        assert_eq!(trial.duration_secs(), None);
    }

    #[test]
    fn measured_excludes_warmup() {
        let mut set = SampleSet::new("modal");
        set.trials.push(Trial::from_result(0, true, Ok(Duration::from_secs(9))));
        set.trials.push(Trial::from_result(1, false, Ok(Duration::from_secs(1))));
        set.trials.push(Trial::failed(2, false, "boom"));
        assert_eq!(set.measured_durations(), vec![1.0]);
        assert_eq!(set.measured_failures(), 1);
    }

    #[test]
    fn trial_serializes_flat() {
        let trial = Trial::from_result(2, false, Ok(Duration::from_millis(500)));
        let value = serde_json::to_value(&trial).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "iteration": 2,
                "warmup": false,
                "status": "success",
                "duration_secs": 0.5,
            })
        );
    }

    #[tokio::test]
    async fn persist_writes_timestamped_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = persist(&record(start_time()), dir.path()).await.unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "benchmark_results_20261018_090507_042.json"
        );

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["started_at"], "2026-10-18T09:05:07.042Z");
        assert_eq!(value["config"]["providers"], serde_json::json!(["morph"]));
        assert_eq!(value["config"]["mode"]["kind"], "sequential");
        assert_eq!(value["samples"][0]["trials"][0]["status"], "failure");
        assert!(value["samples"][0].get("setup_error").is_none());
        assert_eq!(value["summaries"][0]["successes"], 1);
    }

    #[tokio::test]
    async fn persist_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let rec = record(start_time());
        let first = persist(&rec, dir.path()).await.unwrap();
        let second = persist(&rec, dir.path()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(
            second.file_name().unwrap(),
            "benchmark_results_20261018_090507_042-1.json"
        );
    }

    #[tokio::test]
    async fn persist_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("runs/2026");
        let path = persist(&record(start_time()), &nested).await.unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }
}
