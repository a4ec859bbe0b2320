use thiserror::Error;

/// Failure of a single MX or TXT lookup.
///
/// The detector treats both kinds as "no records" for the phase; the
/// distinction only surfaces in debug traces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{record_type} lookup for {name} timed out")]
    Timeout {
        name: String,
        record_type: &'static str,
    },
    #[error("{record_type} lookup for {name} failed: {message}")]
    Resolution {
        name: String,
        record_type: &'static str,
        message: String,
    },
}

impl LookupError {
    pub fn timeout(name: impl Into<String>, record_type: &'static str) -> Self {
        Self::Timeout {
            name: name.into(),
            record_type,
        }
    }

    pub fn resolution(
        name: impl Into<String>,
        record_type: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            name: name.into(),
            record_type,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain is empty")]
    Empty,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
}

impl DomainError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }
}

#[cfg(feature = "with-system-resolver")]
#[derive(Debug, Error)]
pub enum ResolverInitError {
    #[error("resolver initialization failed: {source}")]
    SystemConf {
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
}
