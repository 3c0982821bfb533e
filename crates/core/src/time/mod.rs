pub mod request_key;

pub use request_key::{derive_key, derive_key_at, RequestKey};
