//! HTTP surface: routes, handlers and the serve loop.

mod handlers;
mod listener;
mod router;

pub use listener::{bind, serve};
pub use router::{router, AppState};
