//! Job naming.
//!
//! Names look like `<algorithm>-<scenario>-<YYYYMMDD-HHMMSS>[-seed<N>]`.
//! Two requests in the same second with the same algorithm, scenario and
//! seed produce the same name; the execution service rejects the second.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::algorithm::Algorithm;

/// Remote job names longer than this are rejected.
pub const MAX_JOB_NAME_LEN: usize = 63;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const EMPTY_SCENARIO_SLUG: &str = "scenario";

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Lowercase, collapse every run of non-alphanumerics into one `-`, trim.
pub fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

fn scenario_stem(scenario: &str) -> &str {
    let lower = scenario.to_ascii_lowercase();
    for ext in [".yaml", ".yml"] {
        if lower.ends_with(ext) {
            return &scenario[..scenario.len() - ext.len()];
        }
    }
    scenario
}

/// Build a job name. The scenario slug is truncated so the result fits
/// [`MAX_JOB_NAME_LEN`] with timestamp and seed intact.
pub fn job_name(
    algorithm: Algorithm,
    scenario: &str,
    seed: Option<u64>,
    timestamp: DateTime<Utc>,
) -> String {
    let alg = slug(algorithm.id());
    let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
    let seed_part = seed.map(|s| format!("-seed{}", s)).unwrap_or_default();

    let mut scenario_slug = slug(scenario_stem(scenario));
    if scenario_slug.is_empty() {
        scenario_slug = EMPTY_SCENARIO_SLUG.to_string();
    }

    let fixed = alg.len() + stamp.len() + seed_part.len() + 2;
    let budget = MAX_JOB_NAME_LEN.saturating_sub(fixed).max(1);
    if scenario_slug.len() > budget {
        scenario_slug.truncate(budget);
        while scenario_slug.ends_with('-') {
            scenario_slug.pop();
        }
    }

    format!("{}-{}-{}{}", alg, scenario_slug, stamp, seed_part)
}

/// Names jobs from an injected clock.
#[derive(Clone)]
pub struct NamingPolicy {
    clock: Arc<dyn Clock>,
}

impl NamingPolicy {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn next_name(&self, algorithm: Algorithm, scenario: &str, seed: Option<u64>) -> String {
        job_name(algorithm, scenario, seed, self.clock.now())
    }
}

impl std::fmt::Debug for NamingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamingPolicy").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_name_format() {
        let name = job_name(Algorithm::Drqn, "drqn_scenario.yaml", None, at(9, 5, 7));
        assert_eq!(name, "drqn-drqn-scenario-20250314-090507");
    }

    #[test]
    fn test_seed_suffix_and_algorithm_slug() {
        let name = job_name(Algorithm::RecurrentPpo, "Maze  v2!", Some(7), at(0, 0, 0));
        assert_eq!(name, "recurrent-ppo-maze-v2-20250314-000000-seed7");
    }

    #[test]
    fn test_slug_rules() {
        assert_eq!(slug("--Hello__World--"), "hello-world");
        assert_eq!(slug("a.b/c"), "a-b-c");
        assert_eq!(slug("___"), "");
    }

    #[test]
    fn test_long_scenario_is_truncated() {
        let scenario = "a".repeat(40) + "-" + &"b".repeat(40);
        let name = job_name(Algorithm::RecurrentPpo, &scenario, Some(u64::MAX), at(1, 2, 3));
        assert!(name.len() <= MAX_JOB_NAME_LEN, "{} too long", name);
        assert!(name.ends_with("-20250314-010203-seed18446744073709551615"));
        assert!(!name.contains("--"));
    }

    #[test]
    fn test_empty_scenario_slug_falls_back() {
        let name = job_name(Algorithm::Dqn, "__.yml", None, at(0, 0, 0));
        assert_eq!(name, "dqn-scenario-20250314-000000");
    }

    #[test]
    fn test_names_differ_across_seconds() {
        let clock = Arc::new(FixedClock::new(at(12, 0, 0)));
        let policy = NamingPolicy::new(clock.clone());
        let first = policy.next_name(Algorithm::Ppo, "s1", Some(1));
        clock.advance(Duration::seconds(1));
        let second = policy.next_name(Algorithm::Ppo, "s1", Some(1));
        assert_ne!(first, second);
    }

    #[test]
    fn test_names_differ_across_algorithms() {
        let ts = at(12, 0, 0);
        let names: std::collections::HashSet<_> = Algorithm::ALL
            .into_iter()
            .map(|a| job_name(a, "s1", None, ts))
            .collect();
        assert_eq!(names.len(), Algorithm::ALL.len());
    }

    #[test]
    fn test_same_second_same_inputs_collide() {
        let ts = at(12, 0, 0);
        assert_eq!(
            job_name(Algorithm::Dqn, "s1", Some(3), ts),
            job_name(Algorithm::Dqn, "s1", Some(3), ts)
        );
    }
}
