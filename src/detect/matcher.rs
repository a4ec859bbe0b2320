use super::types::{DetectionMethod, PatternEvaluation, RecordSource};
use crate::resolver::{MxRecord, normalize_exchange, normalize_txt};
use crate::signature::{PatternEntry, ProviderKind, SignatureIndex};

const MAIL_CORROBORATED: f32 = 0.95;
const MAIL_MX: f32 = 0.85;
const MAIL_TXT: f32 = 0.7;
const PROXY_CORROBORATED: f32 = 0.6;
const PROXY_MX: f32 = 0.5;
const PROXY_TXT: f32 = 0.35;

/// A provider seen through one record type. Several hits of the same
/// provider on the same record type collapse into one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub provider: usize,
    pub kind: ProviderKind,
    pub source: RecordSource,
    pub evidence: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct MatchOutcome {
    pub candidates: Vec<Candidate>,
    pub evaluations: Vec<PatternEvaluation>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    pub provider: usize,
    pub kind: ProviderKind,
    pub source: RecordSource,
    pub evidence: Vec<String>,
    pub corroborated: bool,
    pub confidence: f32,
    pub method: DetectionMethod,
}

/// Test every record against every pattern of its type.
pub(crate) fn match_records(
    mx: &[MxRecord],
    txt: &[String],
    index: &SignatureIndex,
    collect_evaluations: bool,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();

    for record in mx {
        let host = normalize_exchange(&record.exchange);
        evaluate(
            &mut outcome,
            index,
            index.mx_patterns(),
            RecordSource::Mx,
            &host,
            |pattern| host.contains(pattern),
            collect_evaluations,
        );
    }

    for record in txt {
        let text = normalize_txt(record);
        let folded = text.to_lowercase();
        evaluate(
            &mut outcome,
            index,
            index.txt_patterns(),
            RecordSource::Txt,
            &text,
            |pattern| folded.starts_with(pattern),
            collect_evaluations,
        );
    }

    outcome
}

fn evaluate<F>(
    outcome: &mut MatchOutcome,
    index: &SignatureIndex,
    entries: &[PatternEntry],
    source: RecordSource,
    record: &str,
    is_match: F,
    collect_evaluations: bool,
) where
    F: Fn(&str) -> bool,
{
    for entry in entries {
        let matched = is_match(&entry.pattern);
        if collect_evaluations {
            outcome.evaluations.push(PatternEvaluation {
                provider_id: index
                    .provider(entry.provider)
                    .map(|provider| provider.id.clone())
                    .unwrap_or_default(),
                source,
                pattern: entry.pattern.clone(),
                record: record.to_string(),
                matched,
            });
        }
        if !matched {
            continue;
        }

        #[cfg(feature = "with-tracing")]
        tracing::trace!(
            record_type = source.as_str(),
            pattern = entry.pattern.as_str(),
            record,
            "pattern matched"
        );

        let existing = outcome
            .candidates
            .iter_mut()
            .find(|candidate| candidate.provider == entry.provider && candidate.source == source);
        match existing {
            Some(candidate) => {
                if !candidate.evidence.iter().any(|seen| seen == record) {
                    candidate.evidence.push(record.to_string());
                }
            }
            None => outcome.candidates.push(Candidate {
                provider: entry.provider,
                kind: entry.kind,
                source,
                evidence: vec![record.to_string()],
            }),
        }
    }
}

/// Pick the answer among `candidates`.
///
/// Ranking: mail providers before proxies, then the preferred record type,
/// then catalog order.
pub(crate) fn select(candidates: &[Candidate], prioritize_mx: bool) -> Option<Selection> {
    let best = candidates.iter().min_by_key(|candidate| {
        (
            candidate.kind.is_proxy(),
            source_rank(candidate.source, prioritize_mx),
            candidate.provider,
        )
    })?;

    let corroborated = candidates
        .iter()
        .any(|other| other.provider == best.provider && other.source != best.source);

    let method = match (best.kind, best.source) {
        (ProviderKind::ProxyService, _) => DetectionMethod::ProxyDetected,
        (ProviderKind::MailProvider, RecordSource::Mx) => DetectionMethod::MxRecord,
        (ProviderKind::MailProvider, RecordSource::Txt) => DetectionMethod::TxtRecord,
    };

    Some(Selection {
        provider: best.provider,
        kind: best.kind,
        source: best.source,
        evidence: best.evidence.clone(),
        corroborated,
        confidence: score(best.kind, best.source, corroborated),
        method,
    })
}

/// Confidence for a selected match; always strictly between 0 and 1.
pub(crate) fn score(kind: ProviderKind, source: RecordSource, corroborated: bool) -> f32 {
    match (kind, corroborated, source) {
        (ProviderKind::MailProvider, true, _) => MAIL_CORROBORATED,
        (ProviderKind::MailProvider, false, RecordSource::Mx) => MAIL_MX,
        (ProviderKind::MailProvider, false, RecordSource::Txt) => MAIL_TXT,
        (ProviderKind::ProxyService, true, _) => PROXY_CORROBORATED,
        (ProviderKind::ProxyService, false, RecordSource::Mx) => PROXY_MX,
        (ProviderKind::ProxyService, false, RecordSource::Txt) => PROXY_TXT,
    }
}

fn source_rank(source: RecordSource, prioritize_mx: bool) -> u8 {
    match (source, prioritize_mx) {
        (RecordSource::Mx, true) | (RecordSource::Txt, false) => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ProviderSignature;
    use proptest::prelude::*;

    fn catalog() -> SignatureIndex {
        SignatureIndex::build(vec![
            ProviderSignature::new("cdn-x", "CDN-X", ProviderKind::ProxyService)
                .with_mx_pattern("cdn-x.net")
                .with_txt_pattern("cdnx-site="),
            ProviderSignature::new("alpha", "Alpha Mail", ProviderKind::MailProvider)
                .with_mx_pattern("alpha-mail.com")
                .with_txt_pattern("alpha-verification="),
            ProviderSignature::new("beta", "Beta Mail", ProviderKind::MailProvider)
                .with_mx_pattern("beta-mx.net")
                .with_txt_pattern("v=spf1 include:_spf.beta"),
        ])
    }

    fn mx(hosts: &[&str]) -> Vec<MxRecord> {
        hosts
            .iter()
            .map(|host| MxRecord::new(10, *host))
            .collect()
    }

    fn txt(records: &[&str]) -> Vec<String> {
        records.iter().map(|record| record.to_string()).collect()
    }

    fn pick(mx_hosts: &[&str], txt_records: &[&str], prioritize_mx: bool) -> Option<Selection> {
        let outcome = match_records(&mx(mx_hosts), &txt(txt_records), &catalog(), false);
        select(&outcome.candidates, prioritize_mx)
    }

    #[test]
    fn mx_substring_matches_case_insensitively() {
        let selection = pick(&["MX1.Alpha-Mail.COM."], &[], true).expect("alpha match");
        assert_eq!(selection.provider, 1);
        assert_eq!(selection.method, DetectionMethod::MxRecord);
        assert!(!selection.corroborated);
    }

    #[test]
    fn txt_matches_prefix_only() {
        assert!(pick(&[], &["token alpha-verification=abc"], true).is_none());
        let selection =
            pick(&[], &["ALPHA-VERIFICATION=abc"], true).expect("prefix match");
        assert_eq!(selection.method, DetectionMethod::TxtRecord);
        assert_eq!(selection.confidence, MAIL_TXT);
    }

    #[test]
    fn non_ascii_patterns_fold_case() {
        let index = SignatureIndex::build(vec![
            ProviderSignature::new("ecole", "École Mail", ProviderKind::MailProvider)
                .with_txt_pattern("ÉCOLE-verif=")
                .with_mx_pattern("MX.ÉCOLE.example"),
        ]);

        let by_txt = match_records(&[], &txt(&["école-verif=1"]), &index, false);
        assert_eq!(by_txt.candidates.len(), 1);

        let by_mx = match_records(&mx(&["in.mx.École.example."]), &[], &index, false);
        assert_eq!(by_mx.candidates.len(), 1);
    }

    #[test]
    fn escaped_quotes_survive_into_the_txt_match() {
        let index = SignatureIndex::build(vec![
            ProviderSignature::new("quoted", "Quoted", ProviderKind::MailProvider)
                .with_txt_pattern("v=spf1 include:\"x\""),
        ]);
        let outcome = match_records(&[], &txt(&[r#""v=spf1 include:\"x\" -all""#]), &index, false);
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[test]
    fn txt_split_strings_are_joined_before_matching() {
        let selection = pick(&[], &[r#""v=spf1 include:" "_spf.beta.net ~all""#], true)
            .expect("joined SPF record matches");
        assert_eq!(selection.provider, 2);
    }

    #[test]
    fn same_provider_on_several_hosts_is_one_candidate() {
        let outcome = match_records(
            &mx(&["mx1.alpha-mail.com", "mx2.alpha-mail.com"]),
            &[],
            &catalog(),
            false,
        );
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].evidence.len(), 2);
    }

    #[test]
    fn mail_provider_outranks_proxy_regardless_of_source() {
        for prioritize_mx in [true, false] {
            let selection = pick(&["edge.cdn-x.net"], &["v=spf1 -all", "alpha-verification=1"], prioritize_mx)
                .expect("alpha via TXT");
            assert_eq!(selection.provider, 1);
            assert_eq!(selection.kind, ProviderKind::MailProvider);
            assert_eq!(selection.method, DetectionMethod::TxtRecord);
        }
    }

    #[test]
    fn prioritize_mx_decides_between_sources() {
        let hosts = ["mx.beta-mx.net"];
        let records = ["alpha-verification=1"];

        let mx_first = pick(&hosts, &records, true).expect("match");
        assert_eq!(mx_first.provider, 2);
        assert_eq!(mx_first.method, DetectionMethod::MxRecord);

        let txt_first = pick(&hosts, &records, false).expect("match");
        assert_eq!(txt_first.provider, 1);
        assert_eq!(txt_first.method, DetectionMethod::TxtRecord);
    }

    #[test]
    fn catalog_order_breaks_remaining_ties() {
        let selection =
            pick(&["mx.beta-mx.net", "mx.alpha-mail.com"], &[], true).expect("match");
        assert_eq!(selection.provider, 1);
    }

    #[test]
    fn proxy_only_is_reported_as_proxy() {
        let selection = pick(&["edge.cdn-x.net"], &[], true).expect("proxy match");
        assert_eq!(selection.method, DetectionMethod::ProxyDetected);
        assert_eq!(selection.confidence, PROXY_MX);
    }

    #[test]
    fn corroboration_raises_confidence() {
        let single = pick(&["mx.alpha-mail.com"], &[], true).expect("match");
        let both = pick(&["mx.alpha-mail.com"], &["alpha-verification=1"], true).expect("match");
        assert!(both.corroborated);
        assert!(both.confidence > single.confidence);
    }

    #[test]
    fn confidence_ordering_holds() {
        use ProviderKind::{MailProvider, ProxyService};
        use RecordSource::{Mx, Txt};

        assert!(score(MailProvider, Mx, true) > score(MailProvider, Mx, false));
        assert!(score(MailProvider, Mx, false) > score(MailProvider, Txt, false));
        assert!(score(ProxyService, Mx, true) > score(ProxyService, Mx, false));
        assert!(score(ProxyService, Mx, false) > score(ProxyService, Txt, false));
        assert!(score(ProxyService, Mx, true) < score(MailProvider, Txt, false));
        assert!(score(MailProvider, Mx, true) < 1.0);
    }

    #[test]
    fn evaluations_are_collected_on_request() {
        let records = mx(&["mx.alpha-mail.com"]);
        let quiet = match_records(&records, &[], &catalog(), false);
        assert!(quiet.evaluations.is_empty());

        let traced = match_records(&records, &[], &catalog(), true);
        assert_eq!(traced.evaluations.len(), catalog().mx_patterns().len());
        let hit = traced
            .evaluations
            .iter()
            .find(|evaluation| evaluation.matched)
            .expect("one pattern matched");
        assert_eq!(hit.provider_id, "alpha");
        assert_eq!(hit.record, "mx.alpha-mail.com");
    }

    #[test]
    fn empty_index_never_matches() {
        let outcome = match_records(
            &mx(&["mx.alpha-mail.com"]),
            &txt(&["alpha-verification=1"]),
            &SignatureIndex::default(),
            true,
        );
        assert!(outcome.candidates.is_empty());
        assert!(select(&outcome.candidates, true).is_none());
    }

    proptest! {
        #[test]
        fn selection_is_deterministic_and_bounded(
            hosts in proptest::collection::vec(
                prop_oneof![
                    Just("mx.alpha-mail.com"),
                    Just("edge.cdn-x.net"),
                    Just("in.beta-mx.net"),
                    Just("mail.unknown.org"),
                ],
                0..6,
            ),
            records in proptest::collection::vec(
                prop_oneof![
                    Just("alpha-verification=1"),
                    Just("cdnx-site=zz"),
                    Just("v=spf1 include:_spf.beta.net -all"),
                    Just("v=spf1 -all"),
                ],
                0..6,
            ),
            prioritize_mx in any::<bool>(),
        ) {
            let first = pick(&hosts, &records, prioritize_mx);
            let second = pick(&hosts, &records, prioritize_mx);
            prop_assert_eq!(&first, &second);

            if let Some(selection) = first {
                prop_assert!(selection.confidence > 0.0 && selection.confidence < 1.0);
                let mail_seen = hosts.iter().any(|h| h.contains("alpha") || h.contains("beta"))
                    || records.iter().any(|r| r.starts_with("alpha") || r.contains("_spf.beta"));
                if mail_seen {
                    prop_assert_eq!(selection.kind, ProviderKind::MailProvider);
                }
            }
        }
    }
}
