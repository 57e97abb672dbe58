//! Product-offer extraction: strategies, the shared validation engine, and the
//! batch orchestrator with its per-domain circuit breaker.

pub mod breaker;
pub mod browser;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod price;
pub mod proxy;
pub(crate) mod retry;
pub mod strategy;
pub mod url;
pub mod validation;

pub use breaker::DomainFailureSet;
pub use browser::{BrowserLauncher, BrowserStrategy, BrowserTimings, ChromiumLauncher, PageSession};
pub use error::ExtractError;
pub use model::{CompletionRequest, ModelClient, OpenAiClient};
pub use orchestrator::{BatchResult, Pipeline};
pub use proxy::{FieldExtractor, ModelFieldExtractor, RenderingProxyClient, RenderingProxyStrategy};
pub use strategy::{Extracted, ExtractionContext, ExtractionRequest, Strategy};
pub use validation::{CandidateOffer, ValidationEngine};
