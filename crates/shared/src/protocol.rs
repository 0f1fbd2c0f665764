use serde::{Deserialize, Serialize};

use crate::domain::{Product, StoreStatus};

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
pub const DEFAULT_POPULATION_MAX_PRODUCTS: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Recommendation,
    Clarification,
    NoResults,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarifying_questions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ReplyKind>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProductPageQuery {
    pub skip: u32,
    pub limit: u32,
}

impl Default for ProductPageQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// The search endpoint has shipped both a bare array and a `{ "products": [...] }` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchReply {
    Bare(Vec<Product>),
    Envelope { products: Vec<Product> },
}

impl SearchReply {
    pub fn into_products(self) -> Vec<Product> {
        match self {
            Self::Bare(products) | Self::Envelope { products } => products,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PopulationRequest {
    pub max_products: u32,
    pub use_fallback: bool,
}

impl Default for PopulationRequest {
    fn default() -> Self {
        Self {
            max_products: DEFAULT_POPULATION_MAX_PRODUCTS,
            use_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PopulationStatusReply {
    pub database_products: u64,
    pub vector_products: u64,
}

impl From<PopulationStatusReply> for StoreStatus {
    fn from(value: PopulationStatusReply) -> Self {
        Self {
            primary_count: value.database_products,
            index_count: value.vector_products,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
