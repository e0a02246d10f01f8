pub use crate::error::StageError;
pub use crate::pipeline::{self, Barrier, Sequence, StagedMapExt, StagedMapper};
#[cfg(feature = "spawn")]
pub use crate::pipeline::Spawned;
pub use crate::stage::{self, BoxedStage, ShareStage, Stage, StageExt};
