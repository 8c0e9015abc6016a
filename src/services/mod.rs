//! Business services built on top of the repository.
//!
//! Services are container components wired with `Container::provide`, so
//! they look their collaborators up once at startup.

pub mod account;

pub use account::{AccountError, AccountService};
