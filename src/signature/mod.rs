//! Provider signatures and the precomputed lookup index built from them.

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    #[default]
    MailProvider,
    /// Infrastructure fronting a domain's records (CDN, filtering gateway)
    /// rather than hosting its mailboxes.
    ProxyService,
}

impl ProviderKind {
    pub fn is_proxy(self) -> bool {
        matches!(self, Self::ProxyService)
    }
}

/// Detection patterns for one provider of the catalog.
///
/// `mx_patterns` match anywhere in an MX exchange hostname, `txt_patterns`
/// match the start of a TXT record. Both comparisons ignore case.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSignature {
    pub id: String,
    #[cfg_attr(feature = "with-serde", serde(default))]
    pub name: String,
    #[cfg_attr(feature = "with-serde", serde(default))]
    pub kind: ProviderKind,
    #[cfg_attr(feature = "with-serde", serde(default))]
    pub mx_patterns: Vec<String>,
    #[cfg_attr(feature = "with-serde", serde(default))]
    pub txt_patterns: Vec<String>,
}

impl ProviderSignature {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            mx_patterns: Vec::new(),
            txt_patterns: Vec::new(),
        }
    }

    pub fn with_mx_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.mx_patterns.push(pattern.into());
        self
    }

    pub fn with_txt_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.txt_patterns.push(pattern.into());
        self
    }

    /// Name reported to callers; falls back to the id when unset.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// One matcher of the index, pointing back at its provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEntry {
    /// Pattern text, lowercased.
    pub pattern: String,
    /// Position of the owning provider in [`SignatureIndex::providers`],
    /// which is also its catalog precedence.
    pub provider: usize,
    pub kind: ProviderKind,
}

/// Read-only lookup structure built once per catalog.
///
/// Pattern lists keep catalog order, so iteration order doubles as the
/// final tie-break between providers.
#[derive(Debug, Clone, Default)]
pub struct SignatureIndex {
    providers: Vec<ProviderSignature>,
    mx: Vec<PatternEntry>,
    txt: Vec<PatternEntry>,
}

impl SignatureIndex {
    /// Build the index. Signatures left without any usable pattern are
    /// skipped; an empty catalog yields an index that never matches.
    pub fn build<I>(signatures: I) -> Self
    where
        I: IntoIterator<Item = ProviderSignature>,
    {
        let mut index = Self::default();
        for signature in signatures {
            let mx_patterns = normalize_patterns(&signature.mx_patterns);
            let txt_patterns = normalize_patterns(&signature.txt_patterns);
            if mx_patterns.is_empty() && txt_patterns.is_empty() {
                continue;
            }

            let position = index.providers.len();
            let kind = signature.kind;
            index.mx.extend(mx_patterns.into_iter().map(|pattern| PatternEntry {
                pattern,
                provider: position,
                kind,
            }));
            index
                .txt
                .extend(txt_patterns.into_iter().map(|pattern| PatternEntry {
                    pattern,
                    provider: position,
                    kind,
                }));
            index.providers.push(signature);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn providers(&self) -> &[ProviderSignature] {
        &self.providers
    }

    pub fn provider(&self, position: usize) -> Option<&ProviderSignature> {
        self.providers.get(position)
    }

    pub fn mx_patterns(&self) -> &[PatternEntry] {
        &self.mx
    }

    pub fn txt_patterns(&self) -> &[PatternEntry] {
        &self.txt
    }
}

impl FromIterator<ProviderSignature> for SignatureIndex {
    fn from_iter<T: IntoIterator<Item = ProviderSignature>>(iter: T) -> Self {
        Self::build(iter)
    }
}

fn normalize_patterns(patterns: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let normalized = pattern.trim().to_lowercase();
        if normalized.is_empty() || out.contains(&normalized) {
            continue;
        }
        out.push(normalized);
    }
    out
}
