pub mod db;
pub mod memory;
pub mod oauth;

pub use db::DbAdapter;
pub use memory::MemoryDb;
pub use oauth::OAuthProvider;
