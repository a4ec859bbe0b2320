//! Provider detection from live MX/TXT records.
//!
//! The public entry point is [`detect_provider`]: it resolves MX and TXT for
//! a domain under a single deadline, matches the answers against a
//! [`SignatureIndex`] and returns a [`DetectionResult`]. DNS trouble never
//! surfaces as an error; it degrades to a `none` result with zero confidence.

mod assemble;
mod matcher;
mod options;
mod race;
mod types;

pub use options::{DEFAULT_TIMEOUT_MS, DetectionOptions};
pub use types::{
    DebugInfo, DetectionMethod, DetectionResult, LookupStatus, PatternEvaluation, QueryTrace,
    RecordSource, Strategy, Timing,
};

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, stream};
use tokio::time::Instant;

use crate::resolver::{MailResolver, normalize_domain};
use crate::signature::SignatureIndex;

/// Detect the mail provider hosting `domain`.
///
/// The deadline is fixed at entry from `options.timeout_ms` and shared by
/// both lookups and the optional sequential retry. At most two lookups run
/// at the same time, whatever the size of the catalog.
pub async fn detect_provider<R>(
    domain: &str,
    index: &SignatureIndex,
    resolver: &R,
    options: &DetectionOptions,
) -> DetectionResult
where
    R: MailResolver + ?Sized,
{
    let started = Instant::now();
    let deadline = deadline_from(started, options.budget());

    let ascii = match normalize_domain(domain) {
        Ok(ascii) => ascii,
        Err(err) => {
            #[cfg(feature = "with-tracing")]
            tracing::debug!(domain, error = %err, "domain rejected before lookup");
            return assemble::rejected(domain, &err, options, started);
        }
    };

    let outcome = race::race(&ascii, resolver, options, deadline).await;
    assemble::assemble(&ascii, index, outcome, options, started)
}

/// Shared index, resolver and options for repeated detections.
pub struct Detector<R> {
    index: Arc<SignatureIndex>,
    resolver: R,
    options: DetectionOptions,
}

impl<R> Detector<R>
where
    R: MailResolver,
{
    pub fn new(index: impl Into<Arc<SignatureIndex>>, resolver: R) -> Self {
        Self {
            index: index.into(),
            resolver,
            options: DetectionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DetectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn index(&self) -> &SignatureIndex {
        &self.index
    }

    pub fn options(&self) -> &DetectionOptions {
        &self.options
    }

    pub async fn detect(&self, domain: &str) -> DetectionResult {
        detect_provider(domain, &self.index, &self.resolver, &self.options).await
    }

    /// Run [`detect`](Self::detect) over `domains` with at most `concurrency`
    /// detections in flight. Results keep the input order.
    pub async fn detect_batch<I, S>(&self, domains: I, concurrency: usize) -> Vec<DetectionResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        stream::iter(domains)
            .map(|domain| async move { self.detect(domain.as_ref()).await })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

fn deadline_from(started: Instant, budget: Duration) -> Instant {
    const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);
    started
        .checked_add(budget)
        .unwrap_or_else(|| started + FAR_FUTURE)
}
