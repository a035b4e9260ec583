/// Error code registry for grm
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Input (CSV manifest) errors
/// - 3000-3999: Clone errors
/// - 4000-4999: Cleanup and filesystem errors
/// - 5000-5999: Hook errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_INVALID_JSON: u16 = 1001;
    pub const CONFIG_INVALID_VALUE: u16 = 1002;
    pub const CONFIG_INVALID_PATTERN: u16 = 1003;
    pub const CONFIG_IO_ERROR: u16 = 1004;

    // Input errors (2000-2999)
    pub const INPUT_UNREADABLE: u16 = 2001;
    pub const INPUT_MISSING_COLUMN: u16 = 2002;
    pub const INPUT_MALFORMED_RECORD: u16 = 2003;
    pub const INPUT_INVALID_FIELD: u16 = 2004;
    pub const INPUT_TARGET_ESCAPES_ROOT: u16 = 2005;
    pub const INPUT_NO_VALID_RECORDS: u16 = 2006;

    // Clone errors (3000-3999)
    pub const CLONE_COMMAND_FAILED: u16 = 3001;
    pub const CLONE_DUPLICATE_TARGET: u16 = 3002;
    pub const CLONE_WORKER_PANICKED: u16 = 3003;

    // Cleanup errors (4000-4999)
    pub const CLEANUP_GENERIC: u16 = 4000;
    pub const CLEANUP_MISSING_ROOT: u16 = 4001;
    pub const CLEANUP_PARTIAL: u16 = 4002;
    pub const FS_REMOVE_FAILED: u16 = 4003;
    pub const FS_WALK_FAILED: u16 = 4004;

    // Hook errors (5000-5999)
    pub const HOOK_SPAWN_FAILED: u16 = 5001;
    pub const HOOK_NON_ZERO_EXIT: u16 = 5002;
}
