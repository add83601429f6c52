pub mod blob;
pub mod db;
pub mod gemini;
pub mod memory;

pub use blob::LocalBlobStore;
pub use db::DbAdapter;
pub use gemini::GeminiAdapter;
pub use memory::InMemoryAdapter;
