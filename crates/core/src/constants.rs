use rust_decimal::Decimal;

/// Deposits above this amount require an approved KYC review.
pub const KYC_REVIEW_THRESHOLD: Decimal = Decimal::ONE_THOUSAND;

/// Deposit validation window, measured from the pool start date.
pub const DEPOSIT_WINDOW_HOURS: i64 = 48;

/// Decimal precision for monetary display.
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;
