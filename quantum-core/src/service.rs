use std::sync::Arc;

use anyhow::Context;
use quantum_auth::{AuthError, Authenticator};
use quantum_components::{assemble, ComponentCatalog};
use quantum_intents::{HttpCompletionEngine, NextIntentSuggester};
use quantum_store::{AuditStore, InMemoryAuditStore, SqliteAuditStore, StoreError};
use quantum_types::{HistoryPage, PartialResponse, QuantumRequest, QuantumResponse, ValidationError};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ServiceConfig, StoreKind};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("request history is not enabled")]
    PersistenceDisabled,
}

/// The request pipeline: authenticate, resolve, assemble, persist.
pub struct QuantumService {
    authenticator: Authenticator,
    catalog: ComponentCatalog,
    suggester: NextIntentSuggester,
    store: Option<Arc<dyn AuditStore>>,
}

impl QuantumService {
    pub fn new(
        authenticator: Authenticator,
        catalog: ComponentCatalog,
        suggester: NextIntentSuggester,
        store: Option<Arc<dyn AuditStore>>,
    ) -> Self {
        Self {
            authenticator,
            catalog,
            suggester,
            store,
        }
    }

    /// Wire every collaborator named by the config. Failures here are fatal
    /// startup conditions.
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let authenticator = Authenticator::new(&cfg.api_key, cfg.auth_scheme.clone())?;

        let catalog = match &cfg.catalog_file {
            Some(path) => ComponentCatalog::from_path(path)
                .with_context(|| format!("loading catalog file {}", path.display()))?,
            None => ComponentCatalog::default(),
        };

        let suggester = match &cfg.llm {
            Some(llm) => NextIntentSuggester::completion(
                Arc::new(HttpCompletionEngine::new(
                    llm.base_url.clone(),
                    llm.model.clone(),
                    llm.api_key.clone(),
                )),
                llm.timeout,
            ),
            None => NextIntentSuggester::Static,
        };

        let store: Option<Arc<dyn AuditStore>> = match &cfg.store {
            StoreKind::None => None,
            StoreKind::Memory => Some(Arc::new(InMemoryAuditStore::new())),
            StoreKind::Sqlite(path) => Some(Arc::new(
                SqliteAuditStore::open(path)
                    .with_context(|| format!("opening sqlite store {}", path.display()))?,
            )),
        };

        Ok(Self::new(authenticator, catalog, suggester, store))
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    pub fn persistence_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn authenticate(&self, credential: Option<&str>) -> Result<(), ServiceError> {
        self.authenticator.verify(credential).map_err(|e| {
            warn!(reason = %e, "rejected credential");
            ServiceError::Unauthorized(e)
        })
    }

    /// Handle one `POST /quantum` body. Validation runs before authentication;
    /// nothing is resolved or recorded for an unauthorized caller.
    pub async fn handle(
        &self,
        credential: Option<&str>,
        req: QuantumRequest,
    ) -> Result<QuantumResponse, ServiceError> {
        req.validate()?;
        self.authenticate(credential)?;

        let components = self.catalog.resolve_all(&req);
        let micro_functions = self.catalog.micro_functions();
        let next_intents = self
            .suggester
            .suggest(&PartialResponse {
                components: &components,
                micro_functions,
            })
            .await;
        let response = assemble(components, micro_functions, next_intents);

        if let Some(store) = &self.store {
            let id = store.record(&req).await.map_err(|e| {
                error!(error = %e, intent = %req.intent, "failed to record request");
                e
            })?;
            info!(
                audit_id = id,
                intent = %req.intent,
                user_id = req.user_id,
                components = response.components.len(),
                "quantum request served"
            );
        } else {
            info!(
                intent = %req.intent,
                user_id = req.user_id,
                components = response.components.len(),
                "quantum request served"
            );
        }

        Ok(response)
    }

    /// Newest-first page of recorded requests.
    pub async fn history(
        &self,
        credential: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<HistoryPage, ServiceError> {
        self.authenticate(credential)?;
        let store = self.store.as_ref().ok_or(ServiceError::PersistenceDisabled)?;
        let rows = store.history(limit, offset).await.map_err(|e| {
            error!(error = %e, "failed to read request history");
            e
        })?;
        Ok(HistoryPage::from(rows))
    }
}
