pub mod monolith;
pub mod sf_utils;

pub use monolith::{parse_card, retry_on_malformed, ScryfallProvider};
pub use sf_utils::build_http_header;
