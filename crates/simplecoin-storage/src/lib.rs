pub mod json_store;
pub mod peers;

pub use json_store::JsonFileStore;
pub use peers::load_peers;
