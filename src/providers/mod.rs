#[cfg(feature = "provider-google")]
pub mod google;
#[cfg(feature = "provider-openai-compatible")]
pub mod openai_compatible;

#[cfg(feature = "provider-google")]
pub use google::Google;
#[cfg(feature = "provider-openai-compatible")]
pub use openai_compatible::{OpenAICompatible, OpenAICompatibleImages};
