//! The transformation passes, in pipeline order

pub mod remap;
pub mod shutoff;
pub mod preheat;
pub mod reinforce;
pub mod unload;

pub use preheat::PreheatPass;
pub use reinforce::ReinforceTowerPass;
pub use remap::ToolRemapPass;
pub use shutoff::ShutoffPass;
pub use unload::ToolUnloadPass;
