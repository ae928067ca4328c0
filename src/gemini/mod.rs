mod cache;
mod client;
#[cfg(test)]
pub(crate) mod mock;
mod types;

pub use cache::{cache_key, DescriptionCache};
pub use client::{build_http_client, GeminiClient, DEFAULT_BASE_URL};
pub use types::{
    guess_mime_type, GenerateResponse, GenerationConfig, GenerationOutcome, InlineImage, Part,
    VariantOutcome,
};
