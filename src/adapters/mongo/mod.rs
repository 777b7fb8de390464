//! MongoDB adapter
//!
//! Implements [`DocumentStore`](crate::adapters::database::DocumentStore) on top
//! of the official driver.

pub mod session;

pub use session::MongoSession;
