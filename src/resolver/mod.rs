//! DNS capability consumed by the detector.
//!
//! The detector never talks to the network itself: it drives a
//! [`MailResolver`], which the system adapter (feature `with-system-resolver`)
//! or a test stub implements.

mod error;
#[cfg(feature = "with-system-resolver")]
mod system;

pub use error::{DomainError, LookupError};
#[cfg(feature = "with-system-resolver")]
pub use error::ResolverInitError;
#[cfg(feature = "with-system-resolver")]
pub use system::SystemResolver;

use async_trait::async_trait;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

/// MX and TXT lookups for a single name.
///
/// Both lookups are independent and may be polled concurrently; the caller
/// bounds them with its own deadline and drops the future once it passes.
#[async_trait]
pub trait MailResolver: Send + Sync {
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxRecord>, LookupError>;

    async fn resolve_txt(&self, domain: &str) -> Result<Vec<String>, LookupError>;
}

#[async_trait]
impl<R> MailResolver for std::sync::Arc<R>
where
    R: MailResolver + ?Sized,
{
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxRecord>, LookupError> {
        (**self).resolve_mx(domain).await
    }

    async fn resolve_txt(&self, domain: &str) -> Result<Vec<String>, LookupError> {
        (**self).resolve_txt(domain).await
    }
}

/// Trim, drop the root dot and convert to the ASCII (punycode) form used on the wire.
pub fn normalize_domain(domain: &str) -> Result<String, DomainError> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(DomainError::Empty);
    }
    idna::domain_to_ascii(trimmed).map_err(DomainError::idna)
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    let trimmed = exchange.trim().trim_end_matches('.');
    trimmed.to_lowercase()
}

/// Collapse the presentation form of a TXT record into its text.
///
/// `"v=spf1 include:" "_spf.example.net ~all"` becomes
/// `v=spf1 include:_spf.example.net ~all`. Backslash escapes (`\"`, `\\`,
/// `\DDD`) are decoded inside quoted strings. Input that is not a sequence
/// of quoted strings separated by whitespace is only trimmed.
pub(crate) fn normalize_txt(record: &str) -> String {
    let trimmed = record.trim();
    if !trimmed.starts_with('"') {
        return trimmed.to_string();
    }
    match parse_character_strings(trimmed) {
        Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        None => trimmed.to_string(),
    }
}

fn parse_character_strings(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => return Some(out),
            Some('"') => {}
            Some(_) => return None,
        }
        loop {
            match chars.next()? {
                '"' => break,
                '\\' => {
                    let escaped = chars.next()?;
                    if let Some(first) = escaped.to_digit(10) {
                        let second = chars.next()?.to_digit(10)?;
                        let third = chars.next()?.to_digit(10)?;
                        out.push(u8::try_from(first * 100 + second * 10 + third).ok()?);
                    } else {
                        push_char(&mut out, escaped);
                    }
                }
                c => push_char(&mut out, c),
            }
        }
        // quoted strings must be separated by whitespace or end the record
        if chars.peek().is_some_and(|c| !c.is_whitespace()) {
            return None;
        }
    }
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
