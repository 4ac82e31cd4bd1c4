pub mod hyp3;
pub mod replicator;
pub mod storage;
pub mod traits;
