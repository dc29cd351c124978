pub mod error;
pub mod extract;
pub mod prompts;
pub mod service;
pub mod types;

pub use error::SearchError;
pub use extract::extract_json;
pub use service::{ReferenceSearch, MAX_URLS_PER_RESULT};
pub use types::{
    ErrorResponse, GenerateTermsResponse, SearchImagesResponse, SearchResponse, SearchResult,
    SearchTerm,
};
