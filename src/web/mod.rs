pub mod cache;
pub mod server;

pub use cache::ResponseCache;
pub use server::ApiServer;
