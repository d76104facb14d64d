/// Longest stay a single line may cover.
pub const MAX_STAY_NIGHTS: u32 = 90;

/// Most discrete dates one add-on service line may carry.
pub const MAX_SERVICE_DATES: usize = 62;

pub const MAX_CART_ITEMS: usize = 50;

pub const MAX_BOOKING_CODE_LEN: usize = 32;

/// Blocked ranges accepted from one availability response.
pub const MAX_BLOCKED_RANGES: usize = 10_000;

// ── Defaults ─────────────────────────────────────────────────────

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

pub const DEFAULT_BOOKING_PREFIX: &str = "FS-";

/// Quiet period before a typed booking code is looked up.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Hotel-local offset used to turn server instants into calendar days (UTC+7).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 420;
