//! Product hand-off from listings and chat recommendations to the detail view.
//!
//! The detail view never fetches by id: it renders whatever product was handed to it,
//! or a not-found state when it was reached without one.

use std::fmt;

use shared::domain::{Product, ProductId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRoute(String);

impl ProductRoute {
    pub fn for_product(product: &Product) -> Self {
        match product.id {
            Some(id) => Self::for_id(id),
            None => Self("/product/unlisted".to_string()),
        }
    }

    pub fn for_id(id: ProductId) -> Self {
        Self(format!("/product/{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait Navigator: Send + Sync {
    fn open_product(&self, route: ProductRoute, product: Product);
}

#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub route: ProductRoute,
    pub product: Product,
}

/// Queues navigation requests for the host loop to render.
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<NavigationRequest>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NavigationRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn open_product(&self, route: ProductRoute, product: Product) {
        debug!(%route, title = %product.title, "navigating to product detail");
        if self.tx.send(NavigationRequest { route, product }).is_err() {
            warn!("navigation receiver dropped; product hand-off discarded");
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    Found(Product),
    NotFound,
}

impl DetailView {
    pub fn resolve(handoff: Option<Product>) -> Self {
        match handoff {
            Some(product) => Self::Found(product),
            None => Self::NotFound,
        }
    }
}

impl From<Option<NavigationRequest>> for DetailView {
    fn from(request: Option<NavigationRequest>) -> Self {
        Self::resolve(request.map(|request| request.product))
    }
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;
