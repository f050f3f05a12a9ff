use chrono::NaiveDate;

/// Inbound LOT numbers: `MINC-YYYYMMDD-NNN`.
pub const INBOUND_PREFIX: &str = "MINC";
/// Outbound slip numbers: `MOUT-YYYYMMDD-NNN`.
pub const OUTBOUND_PREFIX: &str = "MOUT";
/// Customer goods received for coating: `LOT-YYYYMMDD-NNN`.
pub const SALES_INBOUND_PREFIX: &str = "LOT";

/// `"MINC-20250314-"`: everything before the sequence.
pub fn date_prefix(kind: &str, date: NaiveDate) -> String {
    format!("{kind}-{}-", date.format("%Y%m%d"))
}

/// `existing` is how many numbers already carry this date prefix.
/// Sequences below 1000 are zero-padded to three digits.
pub fn next_number(kind: &str, date: NaiveDate, existing: i64) -> String {
    format!("{}{:03}", date_prefix(kind, date), existing + 1)
}
