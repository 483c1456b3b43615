//! # Endpoint Contracts
//!
//! The narrow traits through which the runtime talks to transports: polling
//! consumers, message listeners, producers, connections and error handlers,
//! plus a few in-memory implementations.

pub mod connection;
pub mod consumer;
pub mod handler;
pub mod producer;

pub use connection::{Connection, NullConnection};
pub use consumer::{ConsumerCapabilities, ConsumerLock, MessageListener, PollingConsumer};
pub use handler::{
    CapturingErrorHandler, ConnectionErrorHandler, ErrorHandler, LoggingConnectionErrorHandler,
    LoggingErrorHandler,
};
pub use producer::{CapturingProducer, NullProducer, Producer, SessionProducer, SessionSender};
