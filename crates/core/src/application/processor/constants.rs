// Processor constants (no magic values)

/// Feature name reported to the usage recorder for each completed item
pub const DEFAULT_USAGE_FEATURE: &str = "image_generation";

/// Units of usage recorded per completed item
pub const USAGE_INCREMENT: i64 = 1;
