use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::signature::ProviderSignature;

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionMethod {
    MxRecord,
    TxtRecord,
    ProxyDetected,
    None,
}

impl DetectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MxRecord => "mx_record",
            Self::TxtRecord => "txt_record",
            Self::ProxyDetected => "proxy_detected",
            Self::None => "none",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordSource {
    Mx,
    Txt,
}

impl RecordSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mx => "MX",
            Self::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Parallel,
    Sequential,
}

/// How one lookup settled.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(tag = "status", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStatus {
    Records { count: usize },
    Empty,
    /// Resolver error (NXDOMAIN, SERVFAIL, transport).
    Failed { reason: String },
    /// Cut off by the shared deadline or reported as a timeout by the resolver.
    TimedOut,
    /// Never started because the deadline had already passed.
    Skipped,
}

impl fmt::Display for LookupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Records { count } => write!(f, "{count} record(s)"),
            Self::Empty => f.write_str("no records"),
            Self::Failed { reason } => write!(f, "failed ({reason})"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Skipped => f.write_str("skipped, deadline already passed"),
        }
    }
}

/// Milliseconds spent per phase; a skipped phase reports 0.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timing {
    pub mx_ms: u64,
    pub txt_ms: u64,
    pub total_ms: u64,
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTrace {
    pub record_type: RecordSource,
    pub strategy: Strategy,
    pub status: LookupStatus,
    pub elapsed_ms: u64,
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEvaluation {
    pub provider_id: String,
    pub source: RecordSource,
    pub pattern: String,
    pub record: String,
    pub matched: bool,
}

/// Trace attached to a result when `collect_debug_info` is set.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DebugInfo {
    pub domain: String,
    pub queries: Vec<QueryTrace>,
    pub mx_records: Vec<String>,
    pub txt_records: Vec<String>,
    pub evaluations: Vec<PatternEvaluation>,
    pub fallback_used: bool,
    pub reasons: Vec<String>,
}

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub domain: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub provider: Option<ProviderSignature>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub proxy_service: Option<String>,
    pub confidence: f32,
    pub method: DetectionMethod,
    pub timing: Timing,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub debug: Option<DebugInfo>,
}

impl DetectionResult {
    pub(crate) fn none(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            provider: None,
            proxy_service: None,
            confidence: 0.0,
            method: DetectionMethod::None,
            timing: Timing::default(),
            debug: None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.method != DetectionMethod::None
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.provider.as_ref().map(|provider| provider.id.as_str())
    }
}
