pub use crate::error::{ClResult, Error};
pub use crate::types::{ApiResponse, CategoryId, GroupId, Patch, SiteId, Timestamp, Viewer};

pub use tracing::{debug, error, info, warn};

// vim: ts=4
