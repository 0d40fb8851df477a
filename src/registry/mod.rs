//! Connection registry
//!
//! Tracks the live clients of one channel. The accept task adds, write
//! completions remove, and producers iterate, all concurrently.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<ConnectionRegistry>
//!                  ┌─────────────────────────────┐
//!                  │ connections: HashMap<Id,    │
//!                  │   Arc<Connection {          │
//!                  │     send_in_flight,         │
//!                  │     stream,                 │
//!                  │   }>                        │
//!                  │ >                           │
//!                  └──────────────┬──────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   [Accept task]           [Producer]              [Write task]
//!   add()                   for_each()              remove() on error
//!                           try_begin_send() ──► spawn write ──► TCP
//! ```
//!
//! # Snapshot Iteration
//!
//! Iteration clones the `Arc`s under a short read lock and visits them with
//! the lock released, so no lock is ever held across a socket operation.

pub mod connection;
pub mod error;
pub mod store;

pub use connection::{Connection, ConnectionId, SendState};
pub use error::RegistryError;
pub use store::ConnectionRegistry;
