//! Integration events: transactional outbox, signed delivery, dispatcher.

pub mod dispatcher;
pub mod outbox;
pub mod signature;
pub mod types;

pub use dispatcher::{DispatcherConfig, OutboxDispatcher, RETRY_DELAYS};
pub use outbox::OutboxService;
pub use types::*;
