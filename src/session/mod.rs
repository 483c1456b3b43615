//! # Resource Session Strategies
//!
//! Policies deciding when a pooled external session (a transport session, a
//! connection handle) must be replaced, and the [`SessionManager`] that applies
//! them atomically before each message is produced.

pub mod manager;
pub mod strategy;

pub use manager::{SessionManager, SessionProvider};
pub use strategy::{
    DefaultProducerSessionFactory, MessageCountProducerSessionFactory,
    MessageSizeProducerSessionFactory, MetadataProducerSessionFactory,
    PerMessageProducerSessionFactory, ProducerSessionFactory,
    TimedInactivityProducerSessionFactory,
};
