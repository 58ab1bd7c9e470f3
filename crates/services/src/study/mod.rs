mod engine;
mod session;
mod shuffle;
mod sync;

// Public API of the study subsystem.
pub use engine::StudyEngine;
pub use session::ActiveSession;
pub use shuffle::fisher_yates;
pub use sync::StatsSync;
