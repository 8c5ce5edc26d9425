pub use self::http::{is_searchable, HTTP, MAX_SEARCH_RESULTS, MIN_SEARCH_LENGTH};

mod http;
