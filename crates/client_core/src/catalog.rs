//! Catalog bootstrap: load the product list, detect an empty backing store, trigger
//! population at most once per session, and reload exactly once after a fixed delay.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{Product, StoreStatus},
    protocol::{PopulationRequest, ProductPageQuery},
};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    error::TransportError,
    transport::{CatalogTransport, PopulationTransport},
};

#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub recheck_delay: Duration,
    pub population_request: PopulationRequest,
    pub page: ProductPageQuery,
}

impl From<&ClientSettings> for BootstrapSettings {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            recheck_delay: settings.population_recheck_delay,
            population_request: settings.population_request(),
            page: ProductPageQuery {
                skip: 0,
                limit: settings.product_page_limit,
            },
        }
    }
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self::from(&ClientSettings::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogPhase {
    Loading,
    Ready,
    /// Listing failed; stays here until `retry` succeeds.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationDecision {
    Issued,
    AlreadyIssued,
    NotNeeded,
}

#[derive(Debug, Clone)]
pub struct BootstrapSnapshot {
    pub products: Vec<Product>,
    pub status: Option<StoreStatus>,
    pub trigger_issued: bool,
    pub phase: CatalogPhase,
    pub can_load_samples: bool,
}

struct BootstrapState {
    products: Vec<Product>,
    status: Option<StoreStatus>,
    trigger_issued: bool,
    phase: CatalogPhase,
    activated: bool,
    /// Bumped each time a listing is requested; only the newest listing is applied.
    listing_generation: u64,
}

impl BootstrapState {
    fn can_load_samples(&self) -> bool {
        match self.status {
            Some(status) => status.is_empty(),
            None => self.products.is_empty(),
        }
    }

    fn begin_listing(&mut self) -> u64 {
        self.listing_generation += 1;
        self.phase = CatalogPhase::Loading;
        self.listing_generation
    }

    fn apply_listing(&mut self, generation: u64, listing: Result<Vec<Product>, TransportError>) {
        if generation != self.listing_generation {
            debug!(
                generation,
                latest = self.listing_generation,
                "dropping superseded catalog listing"
            );
            return;
        }
        match listing {
            Ok(products) => {
                debug!(count = products.len(), "catalog listing loaded");
                self.products = products;
                self.phase = CatalogPhase::Ready;
            }
            Err(error) => {
                warn!(%error, "failed to load products");
                self.phase = CatalogPhase::Failed("Failed to load products".to_string());
            }
        }
    }

    fn apply_status(&mut self, status: Result<StoreStatus, TransportError>) {
        match status {
            Ok(status) => {
                debug!(
                    primary = status.primary_count,
                    index = status.index_count,
                    "store status loaded"
                );
                self.status = Some(status);
            }
            Err(error) => {
                warn!(%error, "failed to fetch store status; continuing without it");
                self.status = None;
            }
        }
    }
}

pub struct CatalogBootstrapController {
    catalog: Arc<dyn CatalogTransport>,
    population: Arc<dyn PopulationTransport>,
    settings: BootstrapSettings,
    state: Mutex<BootstrapState>,
    background: Mutex<Vec<JoinHandle<()>>>,
    lifecycle: CancellationToken,
}

impl CatalogBootstrapController {
    pub fn new(
        catalog: Arc<dyn CatalogTransport>,
        population: Arc<dyn PopulationTransport>,
        settings: BootstrapSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            population,
            settings,
            state: Mutex::new(BootstrapState {
                products: Vec::new(),
                status: None,
                trigger_issued: false,
                phase: CatalogPhase::Loading,
                activated: false,
                listing_generation: 0,
            }),
            background: Mutex::new(Vec::new()),
            lifecycle: CancellationToken::new(),
        })
    }

    pub async fn snapshot(&self) -> BootstrapSnapshot {
        let state = self.state.lock().await;
        BootstrapSnapshot {
            products: state.products.clone(),
            status: state.status,
            trigger_issued: state.trigger_issued,
            phase: state.phase.clone(),
            can_load_samples: state.can_load_samples(),
        }
    }

    /// Startup sequence. Only the first call does anything.
    pub async fn activate(self: &Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if state.activated {
                debug!("catalog bootstrap already activated");
                return;
            }
            state.activated = true;
        }

        self.reload().await;

        let store_empty = {
            let state = self.state.lock().await;
            state.status.is_some_and(|status| status.is_empty())
        };
        if store_empty {
            self.request_population("startup").await;
        }
    }

    /// Manual retry for a failed listing. Replays the listing only.
    pub async fn retry(&self) {
        if self.lifecycle.is_cancelled() {
            return;
        }
        let generation = self.state.lock().await.begin_listing();
        let listing = self.catalog.list_products(self.settings.page).await;
        if self.lifecycle.is_cancelled() {
            debug!("discarding catalog listing that arrived after teardown");
            return;
        }
        self.state.lock().await.apply_listing(generation, listing);
    }

    /// The "load sample products" action. Shares the single-trigger guard with startup.
    pub async fn load_sample_products(self: &Arc<Self>) -> PopulationDecision {
        {
            let state = self.state.lock().await;
            if state.trigger_issued {
                return PopulationDecision::AlreadyIssued;
            }
            if !state.can_load_samples() {
                return PopulationDecision::NotNeeded;
            }
        }
        self.request_population("manual").await
    }

    /// Waits for the population trigger and the scheduled reload, if any were started.
    pub async fn wait_for_recheck(&self) {
        let handles: Vec<_> = self.background.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(error) = handle.await {
                warn!(%error, "catalog background task failed");
            }
        }
    }

    pub fn shutdown(&self) {
        self.lifecycle.cancel();
    }

    async fn reload(&self) {
        let generation = self.state.lock().await.begin_listing();
        let (listing, status) = tokio::join!(
            self.catalog.list_products(self.settings.page),
            self.population.population_status()
        );
        if self.lifecycle.is_cancelled() {
            debug!("discarding catalog reload that arrived after teardown");
            return;
        }
        let mut state = self.state.lock().await;
        state.apply_listing(generation, listing);
        state.apply_status(status);
    }

    async fn request_population(self: &Arc<Self>, origin: &'static str) -> PopulationDecision {
        {
            let mut state = self.state.lock().await;
            if state.trigger_issued {
                return PopulationDecision::AlreadyIssued;
            }
            if self.lifecycle.is_cancelled() {
                return PopulationDecision::NotNeeded;
            }
            state.trigger_issued = true;
        }
        info!(origin, "catalog store is empty; triggering population");

        let population = Arc::clone(&self.population);
        let request = self.settings.population_request;
        let trigger = tokio::spawn(async move {
            match population.trigger_population(request).await {
                Ok(ack) => info!(ack = ?ack.message, "population job accepted"),
                Err(error) => warn!(%error, "population trigger failed"),
            }
        });

        let controller = Arc::clone(self);
        let recheck = tokio::spawn(async move {
            controller.recheck_after_delay().await;
        });

        self.background.lock().await.extend([trigger, recheck]);
        PopulationDecision::Issued
    }

    async fn recheck_after_delay(&self) {
        tokio::select! {
            _ = self.lifecycle.cancelled() => {
                debug!("catalog torn down before the scheduled recheck");
                return;
            }
            _ = tokio::time::sleep(self.settings.recheck_delay) => {}
        }
        info!("reloading catalog after population trigger");
        self.reload().await;
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
