//! FactCheck: AI-backed fact-checking of selected text
//!
//! Three thin layers, leaf-first:
//!
//! - **Gateway** ([`gateway`]): one schema-constrained call to a generative
//!   AI service.
//! - **Proxy** ([`proxy`]): the `POST /fact-check` endpoint. Builds the
//!   prompt, strips markdown fences, parses and validates the model output,
//!   and maps every failure to a JSON error body.
//! - **Relay** ([`relay`]) and **presenter** ([`presenter`]): the client
//!   side. The relay calls the proxy and persists a state document; the
//!   presenter is a pure function of that document.
//!
//! # Example
//!
//! ```
//! use factcheck::presenter::{present, View};
//! use factcheck::relay::ExtensionState;
//!
//! assert_eq!(present(&ExtensionState::default()), View::Idle);
//! ```

pub mod analysis;
pub mod config;
pub mod gateway;
pub mod presenter;
pub mod proxy;
pub mod relay;

pub use analysis::{AnalysisRequest, AnalysisResult, ScoreKey, ShapeError};
pub use config::{ConfigError, ProxyConfig, RelayConfig};
pub use gateway::{AiGateway, GatewayError, GeminiGateway, MockGateway};
pub use presenter::{present, View};
pub use proxy::{ErrorBody, ProxyError};
pub use relay::{
    ExtensionState, FactCheckService, HttpFactCheckClient, JsonFileStateStore, MemoryStateStore,
    Relay, RelayError, StateStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
