#![forbid(unsafe_code)]
//! mailprovider_lib — détection du fournisseur de messagerie d'un domaine
//! à partir de ses enregistrements MX et TXT.
//!
//! The entry point is [`detect_provider`] (or [`Detector`] for repeated and
//! batched use). A [`SignatureIndex`] is built once from the provider catalog
//! and shared read-only between detections.

pub mod detect;
pub mod resolver;
pub mod signature;

pub use detect::{
    DEFAULT_TIMEOUT_MS, DebugInfo, DetectionMethod, DetectionOptions, DetectionResult, Detector, LookupStatus,
    PatternEvaluation, QueryTrace, RecordSource, Strategy, Timing, detect_provider,
};
pub use resolver::{DomainError, LookupError, MailResolver, MxRecord, normalize_domain};
pub use signature::{ProviderKind, ProviderSignature, SignatureIndex};

#[cfg(feature = "with-system-resolver")]
pub use resolver::{ResolverInitError, SystemResolver};
