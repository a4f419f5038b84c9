//! POSIX IPC primitives shared by the miner cluster and the monitor pair:
//! shared-memory regions, process-shared semaphores, the block queue and the
//! signal plumbing.

pub mod mqueue;
pub mod sem;
pub mod shm;
pub mod signals;

pub use mqueue::BlockQueue;
pub use sem::Semaphore;
pub use shm::SharedRegion;
