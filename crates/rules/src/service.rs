//! Classification service: owns the active rule chain.
//!
//! The only shared mutable state in the engine is the active chain handle.
//! Chains are immutable after load, so the handle is an `Arc` swapped under
//! a read/write lock: `classify` clones the `Arc` out and keeps using that
//! chain even if a reload swaps in a new one mid-call. A failed reload
//! never touches the previously active chain.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use assay_core::{build_entity_metadata, coerce_digit_fields, Entity, EngineConfig, Record};

use crate::chain::{Outcome, RuleChain};
use crate::error::{ClassifyError, ConfigError, ReloadError};
use crate::loader::RuleLoader;
use crate::schema::RuleFormat;
use crate::source::{source_for_locator, RuleSource};

pub struct ClassificationService {
    source: Arc<dyn RuleSource>,
    format: RuleFormat,
    chain: RwLock<Option<Arc<RuleChain>>>,
}

impl ClassificationService {
    pub fn new(source: Arc<dyn RuleSource>, format: RuleFormat) -> Self {
        Self {
            source,
            format,
            chain: RwLock::new(None),
        }
    }

    /// Build the service from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let locator = config
            .rule_chain_uri
            .as_deref()
            .ok_or(ConfigError::MissingUri)?;
        let format: RuleFormat = config
            .rule_chain_format
            .parse()
            .map_err(|_| ConfigError::UnknownFormat(config.rule_chain_format.clone()))?;
        Ok(Self::new(Arc::from(source_for_locator(locator)), format))
    }

    /// Fetch the rule document and replace the active chain.
    ///
    /// Fail-safe: on any fetch or syntax failure the previous chain stays
    /// active and usable by concurrent `classify` calls.
    pub async fn reload(&self) -> Result<(), ReloadError> {
        self.reload_inner().await.map(|_| ())
    }

    async fn reload_inner(&self) -> Result<Arc<RuleChain>, ReloadError> {
        let bytes = self.source.fetch().await.inspect_err(
            |e| warn!(source = %self.source.locator(), error = %e, "rule chain fetch failed"),
        )?;
        let chain = Arc::new(RuleLoader::new(&bytes, self.format).load()?);
        info!(
            rules = chain.len(),
            source = %self.source.locator(),
            "rule chain reloaded"
        );
        *self.chain.write().await = Some(Arc::clone(&chain));
        Ok(chain)
    }

    /// Classify a metadata record.
    ///
    /// Lazily loads the chain on first use. The record is digit-normalized
    /// before any rule sees it; the caller's record is never modified.
    pub async fn classify(&self, record: &Record) -> Result<Outcome, ClassifyError> {
        let chain = self.current_chain().await?;
        let normalized = coerce_digit_fields(record);
        Ok(chain.apply(&normalized)?)
    }

    /// Build metadata for an entity and classify it in one step.
    pub async fn classify_entity(&self, entity: &Entity) -> Result<Outcome, ClassifyError> {
        self.classify(&build_entity_metadata(entity)).await
    }

    /// The currently active chain, if one has been loaded.
    pub async fn chain(&self) -> Option<Arc<RuleChain>> {
        self.chain.read().await.clone()
    }

    async fn current_chain(&self) -> Result<Arc<RuleChain>, ReloadError> {
        if let Some(chain) = self.chain.read().await.as_ref() {
            return Ok(Arc::clone(chain));
        }
        // Never loaded; concurrent first calls may both reload, which is
        // harmless since loading is idempotent.
        self.reload_inner().await
    }
}

// ── Tests ───────────────────────────────────────────────────────────
