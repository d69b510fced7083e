// Text layout: unit conversion, word wrap, and pagination.
// Pure and synchronous; handlers run it inside tokio::task::spawn_blocking.

pub mod handlers;
pub mod pagination;
pub mod units;
pub mod wrap;
