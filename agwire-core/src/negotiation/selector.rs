//! Criteria-driven format selection layered over the negotiator registry.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::accept::parse_accept_header;
use super::negotiator::{ContentNegotiator, TypeCapabilities};
use super::NegotiationError;

/// What the client says it can handle, beyond its `Accept` header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    pub supports_streaming: bool,
    #[serde(default)]
    pub compression: Vec<String>,
    /// Informational; not enforced during selection.
    #[serde(default)]
    pub max_payload_size: Option<u64>,
    /// Formats in client preference order, used to break ties.
    #[serde(default)]
    pub preferred_formats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriteria {
    /// Accept ranges below this quality are ignored.
    pub min_quality: f64,
    pub require_streaming: bool,
    /// When non-empty, candidates must share a compression algorithm with the
    /// client (or with this list when no client is described).
    #[serde(default)]
    pub preferred_compression: Vec<String>,
    #[serde(default)]
    pub client: Option<ClientCapabilities>,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            min_quality: 0.1,
            require_streaming: false,
            preferred_compression: Vec::new(),
            client: None,
        }
    }
}

struct Candidate {
    capabilities: Arc<TypeCapabilities>,
    quality: f64,
}

/// Picks a format by quality first and server priority second, filtered by
/// [`SelectionCriteria`].
#[derive(Debug, Clone)]
pub struct FormatSelector {
    negotiator: Arc<ContentNegotiator>,
    criteria: SelectionCriteria,
}

impl FormatSelector {
    /// Create a selector with default criteria.
    pub fn new(negotiator: Arc<ContentNegotiator>) -> Self {
        Self {
            negotiator,
            criteria: SelectionCriteria::default(),
        }
    }

    /// Replace the selection criteria.
    pub fn with_criteria(mut self, criteria: SelectionCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// The current selection criteria.
    pub fn criteria(&self) -> &SelectionCriteria {
        &self.criteria
    }

    /// Replace the selection criteria in place.
    pub fn set_criteria(&mut self, criteria: SelectionCriteria) {
        self.criteria = criteria;
    }

    /// Select a format for `accept_header` under the current criteria.
    pub fn select(&self, accept_header: &str) -> Result<String, NegotiationError> {
        let accept_types: Vec<_> = parse_accept_header(accept_header)?
            .into_iter()
            .filter(|a| a.quality >= self.criteria.min_quality)
            .collect();

        let registered = self.negotiator.snapshot();
        let mut candidates: Vec<Candidate> = accept_types
            .iter()
            .flat_map(|accept| {
                registered.iter().filter_map(move |caps| {
                    caps.match_quality(accept).map(|quality| Candidate {
                        capabilities: Arc::clone(caps),
                        quality,
                    })
                })
            })
            .filter(|candidate| self.admits(&candidate.capabilities))
            .collect();

        candidates.sort_by(|a, b| self.rank(a, b));

        candidates
            .first()
            .map(|c| c.capabilities.content_type.clone())
            .ok_or(NegotiationError::NoAcceptableType)
    }

    fn admits(&self, caps: &TypeCapabilities) -> bool {
        if self.criteria.require_streaming && !caps.can_stream {
            return false;
        }

        let compression = match &self.criteria.client {
            Some(client) => {
                // Streaming formats are withheld from clients that cannot consume a stream.
                if caps.can_stream && !client.supports_streaming {
                    return false;
                }
                &client.compression
            }
            None => &self.criteria.preferred_compression,
        };

        if !self.criteria.preferred_compression.is_empty() {
            return compression
                .iter()
                .any(|c| caps.compression.iter().any(|s| s.eq_ignore_ascii_case(c)));
        }
        true
    }

    fn rank(&self, a: &Candidate, b: &Candidate) -> Ordering {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.capabilities
                    .priority
                    .partial_cmp(&a.capabilities.priority)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                self.client_rank(&a.capabilities)
                    .cmp(&self.client_rank(&b.capabilities))
            })
    }

    fn client_rank(&self, caps: &TypeCapabilities) -> usize {
        self.criteria
            .client
            .as_ref()
            .and_then(|client| {
                client
                    .preferred_formats
                    .iter()
                    .position(|f| f.eq_ignore_ascii_case(&caps.content_type))
            })
            .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
