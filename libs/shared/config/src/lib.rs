use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_CANCEL_CUTOFF_HOURS: i64 = 12;
pub const DEFAULT_RESCHEDULE_CUTOFF_HOURS: i64 = 12;
pub const DEFAULT_SLOT_MINUTES: u32 = 30;

/// A cutoff window longer than a year is treated as a typo.
pub const CUTOFF_HOURS_RANGE: RangeInclusive<i64> = 0..=24 * 365;
pub const SLOT_MINUTES_RANGE: RangeInclusive<u32> = 1..=24 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    /// Offset of the clinic's wall clock from UTC. Appointment dates and
    /// times are stored as clinic-local values.
    pub clinic_utc_offset_minutes: i32,
    pub cancel_cutoff_hours: i64,
    pub reschedule_cutoff_hours: i64,
    pub default_slot_minutes: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_key: String::new(),
            clinic_utc_offset_minutes: 0,
            cancel_cutoff_hours: DEFAULT_CANCEL_CUTOFF_HOURS,
            reschedule_cutoff_hours: DEFAULT_RESCHEDULE_CUTOFF_HOURS,
            default_slot_minutes: DEFAULT_SLOT_MINUTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Loading Env Vars
        dotenv::dotenv().ok();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            clinic_utc_offset_minutes: parse_or_default("CLINIC_UTC_OFFSET_MINUTES", 0),
            cancel_cutoff_hours: parse_in_range(
                "CANCEL_CUTOFF_HOURS",
                CUTOFF_HOURS_RANGE,
                DEFAULT_CANCEL_CUTOFF_HOURS,
            ),
            reschedule_cutoff_hours: parse_in_range(
                "RESCHEDULE_CUTOFF_HOURS",
                CUTOFF_HOURS_RANGE,
                DEFAULT_RESCHEDULE_CUTOFF_HOURS,
            ),
            default_slot_minutes: parse_in_range(
                "DEFAULT_SLOT_MINUTES",
                SLOT_MINUTES_RANGE,
                DEFAULT_SLOT_MINUTES,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_key.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_in_range<T>(key: &str, range: RangeInclusive<T>, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy + PartialOrd,
{
    within_range(key, parse_or_default(key, default), range, default)
}

pub fn within_range<T>(key: &str, value: T, range: RangeInclusive<T>, default: T) -> T
where
    T: std::fmt::Display + Copy + PartialOrd,
{
    if range.contains(&value) {
        value
    } else {
        warn!(
            "{} value {} is outside {}..={}, using default {}",
            key, value, range.start(), range.end(), default
        );
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_twelve_hour_cutoffs() {
        let config = AppConfig::default();
        assert_eq!(config.cancel_cutoff_hours, 12);
        assert_eq!(config.reschedule_cutoff_hours, 12);
        assert_eq!(config.default_slot_minutes, 30);
        assert!(!config.is_configured());
    }

    #[test]
    fn invalid_numeric_value_falls_back() {
        env::set_var("TEST_ONLY_CUTOFF_VALUE", "not-a-number");
        assert_eq!(parse_or_default("TEST_ONLY_CUTOFF_VALUE", 7i64), 7);
        env::set_var("TEST_ONLY_CUTOFF_VALUE", " 24 ");
        assert_eq!(parse_or_default("TEST_ONLY_CUTOFF_VALUE", 7i64), 24);
        env::remove_var("TEST_ONLY_CUTOFF_VALUE");
    }

    #[test]
    fn out_of_range_values_fall_back() {
        assert_eq!(within_range("CANCEL_CUTOFF_HOURS", -3, CUTOFF_HOURS_RANGE, 12), 12);
        assert_eq!(
            within_range("CANCEL_CUTOFF_HOURS", i64::MAX / 1000, CUTOFF_HOURS_RANGE, 12),
            12
        );
        assert_eq!(within_range("CANCEL_CUTOFF_HOURS", 0, CUTOFF_HOURS_RANGE, 12), 0);
        assert_eq!(within_range("CANCEL_CUTOFF_HOURS", 48, CUTOFF_HOURS_RANGE, 12), 48);

        assert_eq!(within_range("DEFAULT_SLOT_MINUTES", 0, SLOT_MINUTES_RANGE, 30), 30);
        assert_eq!(within_range("DEFAULT_SLOT_MINUTES", 45, SLOT_MINUTES_RANGE, 30), 45);
    }

    #[test]
    fn zero_slot_minutes_from_env_falls_back() {
        env::set_var("TEST_ONLY_SLOT_MINUTES", "0");
        assert_eq!(parse_in_range("TEST_ONLY_SLOT_MINUTES", SLOT_MINUTES_RANGE, 30u32), 30);
        env::set_var("TEST_ONLY_SLOT_MINUTES", "15");
        assert_eq!(parse_in_range("TEST_ONLY_SLOT_MINUTES", SLOT_MINUTES_RANGE, 30u32), 15);
        env::remove_var("TEST_ONLY_SLOT_MINUTES");
    }
}
