//! kioskflow: session multiplexing and interaction flow for a recycling kiosk
//!
//! Camera samples → recognition service → identity resolver → session
//! registry → flow engine → view layer.

pub mod core;
pub mod types;
pub mod config;
pub mod error;

// =============================================================================
// SAMPLING
// =============================================================================

/// Interval between sampling ticks (milliseconds)
pub const SAMPLE_INTERVAL_MS: u64 = 200;

/// Recognition service and persistence collaborator base URL
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000";

/// Timeout for one call to the recognition service (milliseconds)
pub const CLASSIFIER_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// FLOW TIMINGS
// =============================================================================

/// Time given to walk to the box and drop the item (milliseconds)
pub const BOX_INSTRUCTION_MS: u64 = 5000;

/// Thank-you panel hold before offering to learn more (milliseconds)
pub const THANK_YOU_MS: u64 = 2000;

/// Delay between a VIP's return and the thank-you panel (milliseconds)
pub const WELCOME_BACK_MS: u64 = 1000;

/// First digit of the photo countdown
pub const COUNTDOWN_START: u8 = 3;

/// Time per countdown digit (milliseconds)
pub const COUNTDOWN_STEP_MS: u64 = 1000;

// =============================================================================
// RATING
// =============================================================================

/// Highest star rating
pub const MAX_RATING: u8 = 5;

/// Rating that earns the photo offer
pub const PHOTO_RATING: u8 = 5;

// =============================================================================
// REGISTRY
// =============================================================================

/// Maximum number of suspended VIP sessions kept
pub const SUSPENDED_CAPACITY: usize = 32;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
