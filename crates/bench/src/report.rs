//! Console rendering of a finished run.

use std::fmt;

use crate::provider::ProviderKind;
use crate::record::{RunRecord, SampleSet};
use crate::runner::RunMode;
use crate::stats::Summary;

const PROVIDER_WIDTH: usize = 10;
const NUM_WIDTH: usize = 9;
const ROW_LABEL_WIDTH: usize = 18;

/// Display name for a provider id; unknown ids are shown as-is.
fn label(provider: &str) -> &str {
    ProviderKind::from_name(provider).map_or(provider, |k| k.display_name())
}

fn secs(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.3}"))
}

/// Relative cost of one provider against the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub provider: String,
    pub ratio: f64,
    pub percent_more_time: f64,
}

impl Comparison {
    pub fn new(provider: impl Into<String>, mean: f64, baseline_mean: f64) -> Self {
        let ratio = mean / baseline_mean;
        Self {
            provider: provider.into(),
            ratio,
            percent_more_time: (ratio - 1.0) * 100.0,
        }
    }
}

/// Every provider measured against the one with the lowest mean.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparisons {
    /// `None` when no provider has a usable mean.
    pub baseline: Option<String>,
    /// Sorted fastest first.
    pub rows: Vec<Comparison>,
    /// Providers without successful trials.
    pub not_compared: Vec<String>,
}

pub fn compare(summaries: &[Summary]) -> Comparisons {
    let with_mean: Vec<(&Summary, f64)> = summaries
        .iter()
        .filter_map(|s| s.mean.filter(|m| *m > 0.0).map(|m| (s, m)))
        .collect();
    let not_compared: Vec<String> = summaries
        .iter()
        .filter(|s| !with_mean.iter().any(|(w, _)| std::ptr::eq(*w, *s)))
        .map(|s| s.provider.clone())
        .collect();

    let Some(&(baseline, baseline_mean)) = with_mean.iter().min_by(|a, b| a.1.total_cmp(&b.1))
    else {
        return Comparisons {
            baseline: None,
            rows: Vec::new(),
            not_compared,
        };
    };

    let mut rows: Vec<Comparison> = with_mean
        .iter()
        .filter(|(s, _)| !std::ptr::eq(*s, baseline))
        .map(|(s, mean)| Comparison::new(s.provider.clone(), *mean, baseline_mean))
        .collect();
    rows.sort_by(|a, b| a.ratio.total_cmp(&b.ratio));

    Comparisons {
        baseline: Some(baseline.provider.clone()),
        rows,
        not_compared,
    }
}

impl fmt::Display for Comparisons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(baseline) = &self.baseline else {
            return writeln!(
                f,
                "  Comparison omitted: no provider completed a successful measured trial."
            );
        };
        if self.rows.is_empty() && self.not_compared.is_empty() {
            return writeln!(f, "  Only {} has results; nothing to compare.", label(baseline));
        }
        for row in &self.rows {
            writeln!(
                f,
                "  {} is {:.2}x slower ({:.1}% more time) than {}",
                label(&row.provider),
                row.ratio,
                row.percent_more_time,
                label(baseline)
            )?;
        }
        for provider in &self.not_compared {
            writeln!(f, "  {}: no successful trials, not compared", label(provider))?;
        }
        Ok(())
    }
}

/// One row per provider with every statistic.
pub struct SummaryTable<'a>(pub &'a [Summary]);

impl fmt::Display for SummaryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = NUM_WIDTH;
        writeln!(
            f,
            "{:<PROVIDER_WIDTH$}{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}",
            "Provider", "Mean", "Median", "Min", "Max", "Std Dev", "P95", "P99", "OK/Fail"
        )?;
        for s in self.0 {
            writeln!(
                f,
                "{:<PROVIDER_WIDTH$}{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}{:>w$}",
                label(&s.provider),
                secs(s.mean),
                secs(s.median),
                secs(s.min),
                secs(s.max),
                secs(s.std_dev),
                secs(s.p95),
                secs(s.p99),
                format!("{}/{}", s.successes, s.failures),
            )?;
        }
        Ok(())
    }
}

/// Measured successes per provider, slowest first, side by side.
pub struct IterationsTable<'a>(pub &'a [SampleSet]);

impl fmt::Display for IterationsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<Vec<f64>> = self
            .0
            .iter()
            .map(|set| {
                let mut d = set.measured_durations();
                d.sort_by(|a, b| b.total_cmp(a));
                d
            })
            .collect();
        let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
        if rows == 0 {
            return writeln!(f, "  (no successful measured trials)");
        }

        write!(f, "{:<ROW_LABEL_WIDTH$}", "Run")?;
        for set in self.0 {
            write!(f, "{:>NUM_WIDTH$}", label(&set.provider))?;
        }
        writeln!(f)?;

        for i in 0..rows {
            let run = if i == 0 {
                "Run 1 (cold start)".to_string()
            } else {
                format!("Run {}", i + 1)
            };
            write!(f, "{run:<ROW_LABEL_WIDTH$}")?;
            for column in &columns {
                let cell = column
                    .get(i)
                    .map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
                write!(f, "{cell:>NUM_WIDTH$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Full console report for a run.
pub struct Report<'a>(pub &'a RunRecord);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        let config = &record.config;
        let mode = match config.mode {
            RunMode::Sequential => "sequential".to_string(),
            RunMode::Batched { concurrency } => format!("batches of {concurrency}"),
        };

        writeln!(f, "Sandbox startup benchmark")?;
        writeln!(
            f,
            "Iterations: {} (+{} warmup) | Mode: {mode} | VM: {} vCPU, {}MB RAM, {}GB disk",
            config.iterations, config.warmup, config.vm.vcpus, config.vm.memory_mb, config.vm.disk_gb
        )?;

        let setup_failures: Vec<&SampleSet> = record
            .samples
            .iter()
            .filter(|s| s.setup_error.is_some())
            .collect();
        if !setup_failures.is_empty() {
            writeln!(f, "\nSetup failures")?;
            for set in setup_failures {
                writeln!(
                    f,
                    "  {}: {}",
                    label(&set.provider),
                    set.setup_error.as_deref().unwrap_or_default()
                )?;
            }
        }

        writeln!(f, "\nAll iterations (sorted descending, seconds)")?;
        write!(f, "{}", IterationsTable(&record.samples))?;

        writeln!(f, "\nSummary (seconds)")?;
        write!(f, "{}", SummaryTable(&record.summaries))?;

        writeln!(f, "\nPerformance comparison")?;
        write!(f, "{}", compare(&record.summaries))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::config::VmConfig;
    use crate::record::{RecordConfig, Trial};

    fn summary(provider: &str, mean: Option<f64>) -> Summary {
        Summary {
            provider: provider.into(),
            successes: usize::from(mean.is_some()),
            failures: usize::from(mean.is_none()),
            mean,
            median: mean,
            min: mean,
            max: mean,
            std_dev: mean.map(|_| 0.0),
            p95: mean,
            p99: mean,
        }
    }

    #[test]
    fn ratio_against_lowest_mean() {
        let c = compare(&[summary("modal", Some(0.512)), summary("morph", Some(0.245))]);
        assert_eq!(c.baseline.as_deref(), Some("morph"));
        assert_eq!(c.rows.len(), 1);
        let row = &c.rows[0];
        assert_eq!(row.provider, "modal");
        assert!((row.ratio - 2.0898).abs() < 1e-4, "ratio {}", row.ratio);
        assert!(
            (row.percent_more_time - 108.98).abs() < 0.01,
            "percent {}",
            row.percent_more_time
        );
        assert_eq!(
            c.to_string(),
            "  Modal is 2.09x slower (109.0% more time) than Morph\n"
        );
    }

    #[test]
    fn rows_sorted_fastest_first() {
        let c = compare(&[
            summary("runloop", Some(3.0)),
            summary("modal", Some(2.0)),
            summary("morph", Some(1.0)),
        ]);
        let order: Vec<&str> = c.rows.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(order, ["modal", "runloop"]);
    }

    #[test]
    fn provider_without_successes_not_compared() {
        let c = compare(&[summary("morph", Some(1.0)), summary("runloop", None)]);
        assert_eq!(c.baseline.as_deref(), Some("morph"));
        assert!(c.rows.is_empty());
        assert_eq!(c.not_compared, vec!["runloop"]);
        assert!(
            c.to_string()
                .contains("Runloop: no successful trials, not compared")
        );
    }

    #[test]
    fn no_baseline_omits_comparison() {
        let c = compare(&[summary("morph", None), summary("modal", None)]);
        assert!(c.baseline.is_none());
        assert!(c.rows.is_empty());
        assert!(c.to_string().contains("Comparison omitted"));
    }

    #[test]
    fn single_provider_has_nothing_to_compare() {
        let c = compare(&[summary("morph", Some(0.3))]);
        assert_eq!(
            c.to_string(),
            "  Only Morph has results; nothing to compare.\n"
        );
    }

    #[test]
    fn summary_table_renders_na_for_absent() {
        let table = SummaryTable(&[summary("morph", Some(0.2456)), summary("runloop", None)])
            .to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Provider"));
        assert!(lines[1].starts_with("Morph"));
        assert!(lines[1].contains("0.246"));
        assert!(lines[1].trim_end().ends_with("1/0"));
        assert!(lines[2].starts_with("Runloop"));
        assert_eq!(lines[2].matches("N/A").count(), 7);
        assert!(!lines[2].contains("0.000"));
    }

    fn set(provider: &str, measured: &[f64]) -> SampleSet {
        let mut set = SampleSet::new(provider);
        set.trials.push(Trial::from_result(0, true, Ok(Duration::from_secs(99))));
        for (i, secs) in measured.iter().enumerate() {
            set.trials.push(Trial::from_result(
                i + 1,
                false,
                Ok(Duration::from_secs_f64(*secs)),
            ));
        }
        set
    }

    #[test]
    fn iterations_sorted_descending_and_padded() {
        let samples = [set("morph", &[0.2, 0.5, 0.3]), set("modal", &[1.0])];
        let table = IterationsTable(&samples).to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("Run 1 (cold start)"));
        assert!(lines[1].contains("0.500"));
        assert!(lines[1].contains("1.000"));
        assert!(lines[3].contains("0.200"));
        assert!(lines[3].trim_end().ends_with('-'));
        // warmup never shows up
        assert!(!table.contains("99.000"));
    }

    #[test]
    fn report_contains_every_section() {
        let samples = vec![
            set("morph", &[0.25, 0.23, 0.24]),
            SampleSet::setup_failed("modal", "lookup app 401 Unauthorized: bad token"),
        ];
        let summaries: Vec<Summary> = samples.iter().map(Summary::from_samples).collect();
        let record = RunRecord {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            config: RecordConfig {
                iterations: 3,
                warmup: 1,
                providers: vec![ProviderKind::Morph, ProviderKind::Modal],
                mode: RunMode::Batched { concurrency: 2 },
                vm: VmConfig::default(),
                script: String::new(),
            },
            samples,
            summaries,
        };

        let text = Report(&record).to_string();
        assert!(text.contains("Iterations: 3 (+1 warmup) | Mode: batches of 2"));
        assert!(text.contains("VM: 1 vCPU, 2048MB RAM, 2GB disk"));
        assert!(text.contains("Setup failures\n  Modal: lookup app 401"));
        assert!(text.contains("All iterations"));
        assert!(text.contains("Summary (seconds)"));
        assert!(
            text.ends_with("  Modal: no successful trials, not compared\n"),
            "got: {text}"
        );
        assert!(!text.contains("Only Morph has results"));
    }
}
