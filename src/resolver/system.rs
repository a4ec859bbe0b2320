use std::time::Duration;

use async_trait::async_trait;
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    lookup::{MxLookup, TxtLookup},
};

use super::{LookupError, MailResolver, MxRecord, ResolverInitError, normalize_exchange};

/// [`MailResolver`] backed by the tokio flavour of `trust-dns-resolver`.
#[derive(Clone)]
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    /// Build a resolver from `/etc/resolv.conf` (or the platform equivalent).
    pub fn from_system_conf() -> Result<Self, ResolverInitError> {
        let inner = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|source| ResolverInitError::SystemConf { source })?;
        Ok(Self { inner })
    }

    /// Public upstreams with a per-query timeout of `timeout_ms`.
    pub fn with_timeout(timeout_ms: u64) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_millis(timeout_ms.max(1));
        opts.attempts = 1;
        Self::with_config(ResolverConfig::default(), opts)
    }

    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        Self {
            inner: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl MailResolver for SystemResolver {
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxRecord>, LookupError> {
        match self.inner.mx_lookup(domain).await {
            Ok(lookup) => Ok(collect_mx_records(&lookup)),
            Err(err) if should_treat_as_empty(&err) => Ok(Vec::new()),
            Err(err) => Err(map_error(domain, "MX", &err)),
        }
    }

    async fn resolve_txt(&self, domain: &str) -> Result<Vec<String>, LookupError> {
        match self.inner.txt_lookup(domain).await {
            Ok(lookup) => Ok(collect_txt_records(&lookup)),
            Err(err) if should_treat_as_empty(&err) => Ok(Vec::new()),
            Err(err) => Err(map_error(domain, "TXT", &err)),
        }
    }
}

fn collect_mx_records(lookup: &MxLookup) -> Vec<MxRecord> {
    sort_and_dedup(
        lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), normalize_exchange(&mx.exchange().to_utf8())))
            .collect(),
    )
}

fn sort_and_dedup(mut records: Vec<MxRecord>) -> Vec<MxRecord> {
    records.sort();
    records.dedup();
    records
}

fn collect_txt_records(lookup: &TxtLookup) -> Vec<String> {
    lookup.iter().map(|txt| join_txt_pieces(txt.txt_data())).collect()
}

// Invalid UTF-8 is replaced rather than rejected: one odd record must not
// hide the others from the matcher.
fn join_txt_pieces<P: AsRef<[u8]>>(pieces: &[P]) -> String {
    pieces
        .iter()
        .map(|piece| String::from_utf8_lossy(piece.as_ref()))
        .collect()
}

fn should_treat_as_empty(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

fn map_error(domain: &str, record_type: &'static str, err: &ResolveError) -> LookupError {
    match err.kind() {
        ResolveErrorKind::Timeout => LookupError::timeout(domain, record_type),
        _ => LookupError::resolution(domain, record_type, err.to_string()),
    }
}
