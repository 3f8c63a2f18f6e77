pub mod list;
pub mod signal;
pub mod types;

pub use list::{current_uid, is_builtin_ignored, ProcessFilter, ProcessLister};
pub use signal::{OutputLine, SigRun, SigRunner};
pub use types::{ProcessDetails, ProcessEntry, ProcessSnapshot, SignalAction};
