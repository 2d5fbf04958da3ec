mod id;

pub use id::*;

use tokio::runtime::{Handle, Runtime};

/// Returns the current tokio handle, or creates a new one if none exists.
pub fn get_or_create_handle() -> Handle {
    Handle::try_current()
        .ok()
        .unwrap_or_else(|| Runtime::new().unwrap().handle().clone())
}
