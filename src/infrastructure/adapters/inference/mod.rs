//! Inference Adapters - 推理引擎适配器

mod fake_client;
mod http_client;

pub use fake_client::FakeInferenceClient;
pub use http_client::{HttpInferenceClient, HttpInferenceClientConfig, TUNNEL_BYPASS_HEADER};
