mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::{LabelDirBackend, ScriptStep, ScriptedBackend};
pub use result::{Detection, FrameObservation};
