pub mod cookies;
pub mod file_store;
pub mod remote_api;

pub use cookies::{CookieChannel, CookieSettings};
pub use file_store::FileStore;
pub use remote_api::RemoteApiAdapter;
