//! Producers that feed [`PpiRecord`](crate::record::PpiRecord)s into the
//! bounded measurement queue.

pub mod ble;
pub mod replay;

use thiserror::Error;

/// Capacity of the queue between a source and the consumer.
pub const QUEUE_CAPACITY: usize = 15;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no Bluetooth adapter available")]
    NoAdapter,
    #[error("no peripheral with a name containing {0:?}")]
    PeripheralNotFound(String),
    #[error("peripheral has no characteristic {0}")]
    MissingCharacteristic(uuid::Uuid),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("measurement queue closed")]
    QueueClosed,
}
