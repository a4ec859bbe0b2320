use tokio::time::Instant;

use super::matcher::{Selection, match_records, select};
use super::options::DetectionOptions;
use super::race::{RaceOutcome, as_millis};
use super::types::{DebugInfo, DetectionResult, QueryTrace, Strategy, Timing};
use crate::resolver::{DomainError, normalize_exchange, normalize_txt};
use crate::signature::{ProviderKind, SignatureIndex};

/// Turn the gathered records into the caller-facing result.
pub(crate) fn assemble(
    domain: &str,
    index: &SignatureIndex,
    outcome: RaceOutcome,
    options: &DetectionOptions,
    started: Instant,
) -> DetectionResult {
    let collect = options.collect_debug_info;
    let matched = match_records(&outcome.mx, &outcome.txt, index, collect);
    let selection = select(&matched.candidates, options.prioritize_mx);

    let mut result = DetectionResult::none(domain);
    let mut reasons: Vec<String> = outcome.queries.iter().map(describe_query).collect();

    match selection {
        Some(selection) => apply_selection(&mut result, index, &selection, &mut reasons),
        None if outcome.mx.is_empty() && outcome.txt.is_empty() => {
            reasons.push("no MX or TXT records collected".to_string());
        }
        None => reasons.push("records collected but no signature matched".to_string()),
    }

    result.timing = Timing {
        mx_ms: as_millis(outcome.mx_elapsed),
        txt_ms: as_millis(outcome.txt_elapsed),
        total_ms: as_millis(started.elapsed()),
    };

    #[cfg(feature = "with-tracing")]
    tracing::debug!(
        domain,
        method = result.method.as_str(),
        confidence = result.confidence,
        total_ms = result.timing.total_ms,
        "detection finished"
    );

    if collect {
        result.debug = Some(DebugInfo {
            domain: domain.to_string(),
            queries: outcome.queries,
            mx_records: outcome
                .mx
                .iter()
                .map(|record| normalize_exchange(&record.exchange))
                .collect(),
            txt_records: outcome.txt.iter().map(|record| normalize_txt(record)).collect(),
            evaluations: matched.evaluations,
            fallback_used: outcome.fallback_used,
            reasons,
        });
    }

    result
}

/// Result for input that cannot be queried at all.
pub(crate) fn rejected(
    domain: &str,
    err: &DomainError,
    options: &DetectionOptions,
    started: Instant,
) -> DetectionResult {
    let mut result = DetectionResult::none(domain.trim());
    result.timing.total_ms = as_millis(started.elapsed());
    if options.collect_debug_info {
        result.debug = Some(DebugInfo {
            domain: domain.trim().to_string(),
            reasons: vec![format!("lookups not attempted: {err}")],
            ..DebugInfo::default()
        });
    }
    result
}

fn apply_selection(
    result: &mut DetectionResult,
    index: &SignatureIndex,
    selection: &Selection,
    reasons: &mut Vec<String>,
) {
    let Some(provider) = index.provider(selection.provider) else {
        reasons.push(format!(
            "selected provider #{} is missing from the index",
            selection.provider
        ));
        return;
    };

    match selection.kind {
        ProviderKind::MailProvider => result.provider = Some(provider.clone()),
        ProviderKind::ProxyService => {
            result.proxy_service = Some(provider.display_name().to_string())
        }
    }
    result.confidence = selection.confidence;
    result.method = selection.method;

    let corroboration = if selection.corroborated {
        ", corroborated by both record types"
    } else {
        ""
    };
    reasons.push(format!(
        "selected {} via {} [{}]{corroboration}",
        provider.id,
        selection.source,
        selection.evidence.join(", ")
    ));
}

fn describe_query(query: &QueryTrace) -> String {
    let strategy = match query.strategy {
        Strategy::Parallel => "parallel",
        Strategy::Sequential => "sequential",
    };
    format!(
        "{} lookup ({strategy}): {} after {} ms",
        query.record_type, query.status, query.elapsed_ms
    )
}
