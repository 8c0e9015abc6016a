//! Route groups.
//!
//! Each group is built from the container by a [`Provider`] and mounts its
//! routes, with its own middleware stack, onto the shared router. Paths are
//! registered in full so a group owns exactly the routes it lists.

pub mod account;
pub mod auth;
pub mod categories;
pub mod root;
pub mod transactions;

use axum::{http::StatusCode, Router};
use validator::ValidationError;

use crate::container::Container;

/// A route group ready to be attached to the router.
pub trait Mount: Send {
    fn mount(self: Box<Self>, router: Router) -> Router;
}

/// Builds a route group from already-registered components.
pub type Provider = fn(&Container) -> Box<dyn Mount>;

/// Every route group, in mounting order.
pub const HANDLERS: &[Provider] = &[
    auth::provider,
    account::provider,
    root::provider,
    categories::provider,
    transactions::provider,
];

/// Answer for `OPTIONS` on a mounted route.
pub(crate) async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Printable ASCII only (0x20..=0x7e).
pub(crate) fn printable_ascii(value: &str) -> Result<(), ValidationError> {
    if value.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        Ok(())
    } else {
        Err(ValidationError::new("printascii"))
    }
}
