//! Session lifecycle, task runtime, animation playback, and the
//! cursor debouncer (C7-C9, C11-C12).

mod animation;
mod cursor;
mod error;
mod file_info;
mod manager;
mod runtime;
mod session;

pub use animation::AnimationState;
pub use cursor::{CursorDebouncer, CursorPoint};
pub use error::{Error, Result};
pub use file_info::{build_file_info, FileInfo, HeaderEntry};
pub use manager::{IdleSessions, SessionManager};
pub use runtime::{configure_compute_pool, CancelFlags, SessionRefcount, Task, TaskRuntime, DEFAULT_WORKERS};
pub use session::{OutboundQueue, Session};
