//! Signed-URL resolution for stored image paths.

mod cache;
mod resolver;

pub use cache::SignedUrlCache;
pub use resolver::SignedUrlResolver;
