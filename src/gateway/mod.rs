//! Language-model gateway - the text-completion seam shared by parser and evaluator

pub mod credentials;
pub mod fence;
pub mod openai;
pub mod traits;

pub use credentials::{providers_from_config, resolve_credentials, CredentialProvider};
pub use fence::strip_code_fences;
pub use openai::OpenAiGateway;
pub use traits::{complete_with_timeout, LanguageModelGateway};

#[cfg(test)]
pub use traits::MockLanguageModelGateway;
