use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::accept::{base_type, parse_accept_header, AcceptType};
use super::{formats, NegotiationError};

/// Score band within which the preferred type wins over a competitor.
const PREFERENCE_BAND: f64 = 0.03;
/// Weight of server priority relative to client quality.
const PRIORITY_WEIGHT: f64 = 0.4;
/// Quality multiplier for `main/*` matches.
const SUBTYPE_WILDCARD_FACTOR: f64 = 0.9;

/// A registered wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCapabilities {
    pub content_type: String,
    #[serde(default)]
    pub can_stream: bool,
    #[serde(default)]
    pub compression: Vec<String>,
    /// Server-side preference in `[0, 1]`.
    pub priority: f64,
    /// Informational only.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Case-insensitive alternative names resolving to this record.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl TypeCapabilities {
    /// Create a non-streaming format with no compression, extensions or aliases.
    pub fn new(content_type: impl Into<String>, priority: f64) -> Self {
        Self {
            content_type: content_type.into(),
            can_stream: false,
            compression: Vec::new(),
            priority,
            extensions: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Mark the format as usable for streaming.
    pub fn streaming(mut self) -> Self {
        self.can_stream = true;
        self
    }

    /// Set the supported compression names.
    pub fn with_compression<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compression = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the informational file extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set names that resolve to this format.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Quality this format earns against one accept range, if it matches at all.
    pub(crate) fn match_quality(&self, accept: &AcceptType) -> Option<f64> {
        let content_type = self.content_type.to_ascii_lowercase();
        let range = accept.media_type.as_str();

        if content_type == range || range == "*/*" {
            return Some(accept.quality);
        }
        if let Some(main) = range.strip_suffix("/*") {
            if content_type
                .strip_prefix(main)
                .is_some_and(|rest| rest.starts_with('/'))
            {
                return Some(accept.quality * SUBTYPE_WILDCARD_FACTOR);
            }
        }
        if self.aliases.iter().any(|a| a.eq_ignore_ascii_case(range)) {
            return Some(accept.quality);
        }
        None
    }
}

fn default_formats() -> Vec<TypeCapabilities> {
    vec![
        TypeCapabilities::new(formats::JSON, 0.9)
            .streaming()
            .with_compression(["gzip", "deflate"])
            .with_extensions([".json"])
            .with_aliases(["text/json"]),
        TypeCapabilities::new(formats::PROTOBUF, 1.0)
            .streaming()
            .with_compression(["gzip", "snappy"])
            .with_extensions([".pb", ".proto"])
            .with_aliases(["application/protobuf", "application/vnd.google.protobuf"]),
        TypeCapabilities::new(formats::AGUI_JSON, 0.95)
            .streaming()
            .with_compression(["gzip", "deflate"])
            .with_extensions([".agui.json"]),
    ]
}

#[derive(Debug, Default)]
struct Registry {
    /// Canonical records in registration order.
    types: Vec<Arc<TypeCapabilities>>,
    /// Lowercased canonical names and aliases to an index in `types`.
    index: HashMap<String, usize>,
    preferred: String,
}

impl Registry {
    fn register(&mut self, capabilities: TypeCapabilities) {
        let key = capabilities.content_type.to_ascii_lowercase();
        let record = Arc::new(capabilities);

        let existing = self
            .index
            .get(&key)
            .copied()
            .filter(|&i| self.types[i].content_type.eq_ignore_ascii_case(&key));
        let slot = match existing {
            Some(i) => {
                // Aliases of the replaced record stop resolving.
                self.index.retain(|_, slot| *slot != i);
                self.types[i] = record.clone();
                i
            }
            None => {
                self.types.push(record.clone());
                self.types.len() - 1
            }
        };

        self.index.insert(key, slot);
        for alias in &record.aliases {
            self.index.insert(alias.to_ascii_lowercase(), slot);
        }
    }

    fn lookup(&self, content_type: &str) -> Option<&Arc<TypeCapabilities>> {
        self.index
            .get(&content_type.to_ascii_lowercase())
            .or_else(|| self.index.get(&base_type(content_type)))
            .map(|&i| &self.types[i])
    }

    fn is_preferred(&self, content_type: &str) -> bool {
        base_type(&self.preferred) == content_type.to_ascii_lowercase()
    }

    fn select_best(&self, accept_types: &[AcceptType]) -> Result<String, NegotiationError> {
        if let [only] = accept_types {
            if only.is_global_wildcard() && only.quality > 0.0 {
                return Ok(self.preferred.clone());
            }
        }

        let mut candidates: Vec<(&str, f64)> = Vec::new();
        for capabilities in &self.types {
            // The first non-zero match is the best one: accept_types is quality-ordered.
            let best = accept_types
                .iter()
                .filter_map(|accept| capabilities.match_quality(accept))
                .find(|quality| *quality > 0.0);
            if let Some(quality) = best {
                let score = quality + capabilities.priority * PRIORITY_WEIGHT;
                candidates.push((capabilities.content_type.as_str(), score));
            }
        }

        if candidates.is_empty() {
            if accept_types
                .iter()
                .any(|a| a.is_global_wildcard() && a.quality > 0.0)
            {
                debug!(preferred = %self.preferred, "no direct match, falling back to preferred type");
                return Ok(self.preferred.clone());
            }
            return Err(NegotiationError::NoAcceptableType);
        }

        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let (top_type, top_score) = candidates[0];
        if !self.is_preferred(top_type) {
            let preferred_in_band = candidates[1..]
                .iter()
                .find(|(ct, score)| self.is_preferred(ct) && top_score - score < PREFERENCE_BAND);
            if let Some((ct, _)) = preferred_in_band {
                debug!(winner = %ct, over = %top_type, "preferred type promoted within score band");
                return Ok(ct.to_string());
            }
        }

        Ok(top_type.to_string())
    }
}

/// RFC 7231 content negotiator over a shared format registry.
///
/// Negotiation takes a shared lock; registration and preference changes
/// take an exclusive lock.
#[derive(Debug)]
pub struct ContentNegotiator {
    registry: RwLock<Registry>,
}

impl ContentNegotiator {
    /// Create a negotiator with the default JSON, protobuf and AG-UI JSON formats.
    pub fn new(preferred_type: impl Into<String>) -> Self {
        let negotiator = Self::empty(preferred_type);
        for capabilities in default_formats() {
            negotiator.register_type(capabilities);
        }
        negotiator
    }

    /// Create a negotiator with no registered formats.
    pub fn empty(preferred_type: impl Into<String>) -> Self {
        Self {
            registry: RwLock::new(Registry {
                preferred: preferred_type.into(),
                ..Registry::default()
            }),
        }
    }

    /// Register (or replace) a format and its aliases.
    pub fn register_type(&self, capabilities: TypeCapabilities) {
        self.registry.write().register(capabilities);
    }

    /// Register a bare format with the given server priority.
    pub fn add_format(&self, content_type: &str, priority: f64) -> Result<(), NegotiationError> {
        if content_type.is_empty() {
            return Err(NegotiationError::InvalidFormat(
                "content type cannot be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&priority) {
            return Err(NegotiationError::InvalidFormat(format!(
                "priority must be between 0 and 1, got {priority}"
            )));
        }
        self.register_type(TypeCapabilities::new(content_type, priority));
        Ok(())
    }

    /// Choose a format for an `Accept` header.
    ///
    /// Always returns a registered content type or the preferred type.
    pub fn negotiate(&self, accept_header: &str) -> Result<String, NegotiationError> {
        let registry = self.registry.read();
        if registry.types.is_empty() {
            return Err(NegotiationError::NoSupportedTypes);
        }
        if accept_header.trim().is_empty() {
            return Ok(registry.preferred.clone());
        }

        let accept_types = parse_accept_header(accept_header)?;
        registry.select_best(&accept_types)
    }

    /// Sorted canonical names of all registered formats.
    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .registry
            .read()
            .types
            .iter()
            .map(|c| c.content_type.clone())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// The type returned for empty or `*/*` headers.
    pub fn preferred_type(&self) -> String {
        self.registry.read().preferred.clone()
    }

    /// Change the preferred type. It must already be registered, directly or by
    /// alias; the canonical name is stored.
    pub fn set_preferred_type(&self, content_type: &str) -> Result<(), NegotiationError> {
        let mut registry = self.registry.write();
        let canonical = registry
            .lookup(content_type)
            .map(|c| c.content_type.clone())
            .ok_or_else(|| NegotiationError::UnsupportedType(content_type.to_string()))?;
        registry.preferred = canonical;
        Ok(())
    }

    /// Whether a content type (or alias, parameters ignored) is registered.
    pub fn can_handle(&self, content_type: &str) -> bool {
        self.registry.read().lookup(content_type).is_some()
    }

    /// Capabilities registered for a content type or alias.
    pub fn capabilities(&self, content_type: &str) -> Option<Arc<TypeCapabilities>> {
        self.registry.read().lookup(content_type).cloned()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<TypeCapabilities>> {
        self.registry.read().types.clone()
    }
}

impl Default for ContentNegotiator {
    fn default() -> Self {
        Self::new(formats::JSON)
    }
}

#[cfg(test)]
#[path = "negotiator_tests.rs"]
mod tests;
