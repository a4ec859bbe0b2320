use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};

use super::options::DetectionOptions;
use super::types::{LookupStatus, QueryTrace, RecordSource, Strategy};
use crate::resolver::{LookupError, MailResolver, MxRecord};

/// Records gathered for one domain, with how each lookup settled.
#[derive(Debug, Default)]
pub(crate) struct RaceOutcome {
    pub mx: Vec<MxRecord>,
    pub txt: Vec<String>,
    pub mx_elapsed: Duration,
    pub txt_elapsed: Duration,
    pub queries: Vec<QueryTrace>,
    pub fallback_used: bool,
}

impl RaceOutcome {
    fn has_records(&self) -> bool {
        !self.mx.is_empty() || !self.txt.is_empty()
    }

    fn absorb(&mut self, strategy: Strategy, mx: Phase<MxRecord>, txt: Phase<String>) {
        self.mx_elapsed += mx.elapsed;
        self.txt_elapsed += txt.elapsed;
        self.queries.push(mx.trace(RecordSource::Mx, strategy));
        self.queries.push(txt.trace(RecordSource::Txt, strategy));
        self.mx = mx.records;
        self.txt = txt.records;
    }
}

struct Phase<T> {
    records: Vec<T>,
    status: LookupStatus,
    elapsed: Duration,
}

impl<T> Phase<T> {
    fn skipped() -> Self {
        Self {
            records: Vec::new(),
            status: LookupStatus::Skipped,
            elapsed: Duration::ZERO,
        }
    }

    fn trace(&self, record_type: RecordSource, strategy: Strategy) -> QueryTrace {
        QueryTrace {
            record_type,
            strategy,
            status: self.status.clone(),
            elapsed_ms: as_millis(self.elapsed),
        }
    }
}

/// Resolve MX and TXT for `domain` before `deadline`.
///
/// Lookup failures never escape: they settle as empty phases. When the
/// parallel attempt comes back with no records at all and time remains, a
/// single sequential retry runs on the rest of the budget.
pub(crate) async fn race<R>(
    domain: &str,
    resolver: &R,
    options: &DetectionOptions,
    deadline: Instant,
) -> RaceOutcome
where
    R: MailResolver + ?Sized,
{
    let mut outcome = RaceOutcome::default();

    if !options.enable_parallel {
        let (mx, txt) = sequential(domain, resolver, deadline).await;
        outcome.absorb(Strategy::Sequential, mx, txt);
        return outcome;
    }

    let (mx, txt) = parallel(domain, resolver, deadline).await;
    outcome.absorb(Strategy::Parallel, mx, txt);

    if !outcome.has_records() && options.fallback_to_sequential && Instant::now() < deadline {
        #[cfg(feature = "with-tracing")]
        tracing::debug!(domain, "parallel lookups returned nothing, retrying sequentially");
        let (mx, txt) = sequential(domain, resolver, deadline).await;
        outcome.fallback_used = true;
        outcome.absorb(Strategy::Sequential, mx, txt);
    }

    outcome
}

async fn parallel<R>(domain: &str, resolver: &R, deadline: Instant) -> (Phase<MxRecord>, Phase<String>)
where
    R: MailResolver + ?Sized,
{
    tokio::join!(
        settle(deadline, RecordSource::Mx, resolver.resolve_mx(domain)),
        settle(deadline, RecordSource::Txt, resolver.resolve_txt(domain)),
    )
}

async fn sequential<R>(
    domain: &str,
    resolver: &R,
    deadline: Instant,
) -> (Phase<MxRecord>, Phase<String>)
where
    R: MailResolver + ?Sized,
{
    let mx = settle(deadline, RecordSource::Mx, resolver.resolve_mx(domain)).await;
    let txt = settle(deadline, RecordSource::Txt, resolver.resolve_txt(domain)).await;
    (mx, txt)
}

// The lookup future is dropped when the deadline fires, so a late answer
// can never be merged into the outcome.
#[cfg_attr(not(feature = "with-tracing"), allow(unused_variables))]
async fn settle<T, F>(deadline: Instant, source: RecordSource, lookup: F) -> Phase<T>
where
    F: Future<Output = Result<Vec<T>, LookupError>>,
{
    let started = Instant::now();
    if started >= deadline {
        return Phase::skipped();
    }

    let (records, status) = match timeout_at(deadline, lookup).await {
        Ok(Ok(records)) if records.is_empty() => (records, LookupStatus::Empty),
        Ok(Ok(records)) => {
            let count = records.len();
            (records, LookupStatus::Records { count })
        }
        Ok(Err(err)) if err.is_timeout() => (Vec::new(), LookupStatus::TimedOut),
        Ok(Err(err)) => (
            Vec::new(),
            LookupStatus::Failed {
                reason: err.to_string(),
            },
        ),
        Err(_) => (Vec::new(), LookupStatus::TimedOut),
    };
    let elapsed = started.elapsed();

    #[cfg(feature = "with-tracing")]
    tracing::debug!(
        record_type = source.as_str(),
        status = %status,
        elapsed_ms = as_millis(elapsed),
        "lookup settled"
    );
    Phase {
        records,
        status,
        elapsed,
    }
}

pub(crate) fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
