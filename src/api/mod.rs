//! HTTP surface for the browser client

pub mod error;
pub mod protocol;
pub mod routes;
pub mod server;

pub use routes::AppState;
pub use server::serve;
