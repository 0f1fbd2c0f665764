//! Client core for the furniture shopping assistant: the conversation and catalog
//! bootstrap controllers, and the transports they talk through.

pub mod catalog;
pub mod config;
pub mod conversation;
pub mod error;
pub mod navigation;
pub mod render;
pub mod transport;

pub use catalog::{
    BootstrapSettings, BootstrapSnapshot, CatalogBootstrapController, CatalogPhase,
    PopulationDecision,
};
pub use config::{load_settings, normalize_base_url, ClientSettings};
pub use conversation::{
    ConversationController, ConversationEvent, SessionSnapshot, SubmitOutcome, SubmitRejection,
    Transcript, Turn,
};
pub use error::{TransportError, ValidationError};
pub use navigation::{ChannelNavigator, DetailView, NavigationRequest, Navigator, ProductRoute};
pub use transport::{CatalogTransport, ChatTransport, HttpTransport, PopulationTransport};
