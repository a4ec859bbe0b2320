use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MS: i64 = 5_000;

/// Per-call knobs for [`detect_provider`](crate::detect_provider).
///
/// `timeout_ms` is signed on purpose: zero or a negative value is accepted
/// and means the deadline has already passed, so no lookup is issued.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(default, deny_unknown_fields))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionOptions {
    pub timeout_ms: i64,
    pub enable_parallel: bool,
    pub prioritize_mx: bool,
    pub fallback_to_sequential: bool,
    pub collect_debug_info: bool,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            enable_parallel: true,
            prioritize_mx: true,
            fallback_to_sequential: true,
            collect_debug_info: false,
        }
    }
}

impl DetectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn parallel(mut self, value: bool) -> Self {
        self.enable_parallel = value;
        self
    }

    pub fn prioritize_mx(mut self, value: bool) -> Self {
        self.prioritize_mx = value;
        self
    }

    pub fn fallback_to_sequential(mut self, value: bool) -> Self {
        self.fallback_to_sequential = value;
        self
    }

    pub fn collect_debug_info(mut self, value: bool) -> Self {
        self.collect_debug_info = value;
        self
    }

    /// Time budget for the whole detection. Negative timeouts clamp to zero.
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(0).unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = DetectionOptions::default();
        assert_eq!(options.timeout_ms, 5_000);
        assert!(options.enable_parallel);
        assert!(options.prioritize_mx);
        assert!(options.fallback_to_sequential);
        assert!(!options.collect_debug_info);
        assert_eq!(options.budget(), Duration::from_secs(5));
    }

    #[test]
    fn negative_timeout_clamps_to_zero_budget() {
        let options = DetectionOptions::new().with_timeout_ms(-250);
        assert_eq!(options.budget(), Duration::ZERO);
        assert_eq!(DetectionOptions::new().with_timeout_ms(0).budget(), Duration::ZERO);
    }

    #[cfg(feature = "with-serde")]
    #[test]
    fn deserialize_fills_defaults_and_rejects_unknown_fields() {
        let options: DetectionOptions =
            serde_json::from_str(r#"{"timeout_ms": 1200, "prioritize_mx": false}"#)
                .expect("partial options parse");
        assert_eq!(options.timeout_ms, 1_200);
        assert!(!options.prioritize_mx);
        assert!(options.enable_parallel);

        let err = serde_json::from_str::<DetectionOptions>(r#"{"timeout": 10}"#);
        assert!(err.is_err());
    }
}
