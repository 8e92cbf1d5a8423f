//! Register stores
//!
//! A [`CourrierStore`] binds one category to its storage partition and to
//! the sync bus.

mod courrier_store;
mod error;

pub use courrier_store::CourrierStore;
pub use error::CourrierError;
