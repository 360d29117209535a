//! Global constants for bioannot

/// Edge length of pyramid tiles in pixels
pub const TILE_SIZE: u32 = 128;

/// Default base URL of the image/annotation API
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// How long features restored by undo stay highlighted
pub const HIGHLIGHT_DURATION_MS: u64 = 1500;

/// Pan slack beyond the image extent, in tiles
pub const MAX_BOUNDS_TILE_OFFSET: u32 = 20;

/// Maximum number of vertex handles shown while reshaping a feature
pub const EDIT_MARKER_LIMIT: usize = 256;

/// Default file name of exported annotation documents
pub const EXPORT_FILENAME: &str = "export.json";

/// Notice shown when exporting with unsaved changes
pub const EXPORT_BLOCKED_MESSAGE: &str = "Changes must be saved before the mask can be exported.";
