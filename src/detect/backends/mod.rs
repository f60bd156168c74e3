pub mod labels;
pub mod scripted;

pub use labels::LabelDirBackend;
pub use scripted::{ScriptStep, ScriptedBackend};
