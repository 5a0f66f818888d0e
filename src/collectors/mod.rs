pub mod system;

use crate::state::Snapshot;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("не удалось определить корневой раздел диска")]
    NoRootDisk,
}

pub trait Collector: Send {
    fn sample(&mut self) -> Result<Snapshot, CollectError>;
}
