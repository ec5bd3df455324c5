//! Key-value business settings and the per-computation rule snapshot.
//!
//! Settings are plain strings; this module owns their parsing. A missing or
//! unparsable value falls back to the documented default.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use entity::settings;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder, sea_query::OnConflict,
};
use serde::Serialize;
use tracing::warn;

use crate::error::HrResult;

pub const WORK_START_TIME: &str = "work_start_time";
pub const WORK_END_TIME: &str = "work_end_time";
pub const LATE_THRESHOLD_MINUTES: &str = "late_threshold_minutes";
pub const LATE_10_MIN_PENALTY: &str = "late_10_min_penalty";
pub const LATE_30_MIN_PENALTY: &str = "late_30_min_penalty";
/// Token printed on the shared office attendance code. No default.
pub const COMPANY_ATTENDANCE_QR: &str = "company_attendance_qr";

/// Keys consulted by the payroll core with their defaults and descriptions.
pub const PAYROLL_DEFAULTS: [(&str, &str, &str); 5] = [
    (WORK_START_TIME, "09:00:00", "Official work start time (HH:MM:SS)"),
    (WORK_END_TIME, "17:00:00", "Official work end time (HH:MM:SS)"),
    (
        LATE_THRESHOLD_MINUTES,
        "0",
        "Minutes allowed after start time before being marked as late",
    ),
    (
        LATE_10_MIN_PENALTY,
        "5",
        "Percent of daily salary deducted for 10-29 minutes late",
    ),
    (
        LATE_30_MIN_PENALTY,
        "10",
        "Percent of daily salary deducted for 30+ minutes late",
    ),
];

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get_setting(&self, key: &str) -> HrResult<Option<String>>;
}

/// Value for `key`, or `default` when the key is absent.
pub async fn get_setting(
    provider: &dyn SettingsProvider,
    key: &str,
    default: &str,
) -> HrResult<String> {
    Ok(provider
        .get_setting(key)
        .await?
        .unwrap_or_else(|| default.to_string()))
}

/// Settings snapshot used by one attendance or salary computation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PayrollRules {
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub late_threshold_minutes: i64,
    pub late_10_min_penalty: Decimal,
    pub late_30_min_penalty: Decimal,
}

impl Default for PayrollRules {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            work_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            late_threshold_minutes: 0,
            late_10_min_penalty: Decimal::from(5),
            late_30_min_penalty: Decimal::from(10),
        }
    }
}

/// Largest accepted grace period: one day.
pub const MAX_LATE_THRESHOLD_MINUTES: i64 = 24 * 60;

impl PayrollRules {
    pub async fn load(provider: &dyn SettingsProvider) -> HrResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            work_start: parse_or(
                WORK_START_TIME,
                get_setting(provider, WORK_START_TIME, "09:00:00").await?,
                parse_time,
                defaults.work_start,
            ),
            work_end: parse_or(
                WORK_END_TIME,
                get_setting(provider, WORK_END_TIME, "17:00:00").await?,
                parse_time,
                defaults.work_end,
            ),
            late_threshold_minutes: parse_or(
                LATE_THRESHOLD_MINUTES,
                get_setting(provider, LATE_THRESHOLD_MINUTES, "0").await?,
                parse_threshold,
                defaults.late_threshold_minutes,
            ),
            late_10_min_penalty: parse_or(
                LATE_10_MIN_PENALTY,
                get_setting(provider, LATE_10_MIN_PENALTY, "5").await?,
                parse_percent,
                defaults.late_10_min_penalty,
            ),
            late_30_min_penalty: parse_or(
                LATE_30_MIN_PENALTY,
                get_setting(provider, LATE_30_MIN_PENALTY, "10").await?,
                parse_percent,
                defaults.late_30_min_penalty,
            ),
        })
    }
}

fn parse_or<T>(key: &str, raw: String, parse: impl Fn(&str) -> Option<T>, default: T) -> T {
    match parse(raw.trim()) {
        Some(value) => value,
        None => {
            warn!(key, value = %raw, "unparsable setting, using default");
            default
        }
    }
}

fn parse_threshold(raw: &str) -> Option<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|minutes| (0..=MAX_LATE_THRESHOLD_MINUTES).contains(minutes))
}

/// Accepts `HH:MM:SS` and `HH:MM`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn parse_percent(raw: &str) -> Option<Decimal> {
    raw.parse::<Decimal>()
        .ok()
        .filter(|pct| !pct.is_sign_negative())
}

/// In-memory provider.
#[derive(Clone, Debug, Default)]
pub struct StaticSettings {
    values: HashMap<String, String>,
}

impl StaticSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn get_setting(&self, key: &str) -> HrResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }
}

/// Provider backed by the `settings` table.
#[derive(Clone, Debug)]
pub struct DbSettings {
    db: DatabaseConnection,
}

impl DbSettings {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert or overwrite a setting.
    pub async fn put_setting(
        &self,
        key: &str,
        value: &str,
        description: Option<String>,
    ) -> HrResult<settings::Model> {
        let row = settings::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            description: Set(description),
            updated_at: Set(Utc::now().into()),
        };
        settings::Entity::insert(row)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_columns([
                        settings::Column::Value,
                        settings::Column::Description,
                        settings::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        let stored = settings::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| sea_orm::DbErr::RecordNotFound(key.to_string()))?;
        Ok(stored)
    }

    pub async fn list_settings(&self) -> HrResult<Vec<settings::Model>> {
        Ok(settings::Entity::find()
            .order_by_asc(settings::Column::Key)
            .all(&self.db)
            .await?)
    }

    /// Writes the payroll defaults for keys that are not present yet.
    pub async fn seed_defaults(&self) -> HrResult<()> {
        for (key, value, description) in PAYROLL_DEFAULTS {
            let row = settings::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value.to_string()),
                description: Set(Some(description.to_string())),
                updated_at: Set(Utc::now().into()),
            };
            settings::Entity::insert(row)
                .on_conflict(
                    OnConflict::column(settings::Column::Key)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsProvider for DbSettings {
    async fn get_setting(&self, key: &str) -> HrResult<Option<String>> {
        Ok(settings::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?
            .map(|row| row.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn missing_settings_use_defaults() {
        let rules = PayrollRules::load(&StaticSettings::new()).await.unwrap();
        assert_eq!(rules, PayrollRules::default());
        assert_eq!(rules.work_start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(rules.late_30_min_penalty, dec!(10));
    }

    #[tokio::test]
    async fn parses_configured_values() {
        let provider = StaticSettings::new()
            .with(WORK_START_TIME, "08:30")
            .with(WORK_END_TIME, "17:30:00")
            .with(LATE_THRESHOLD_MINUTES, "10")
            .with(LATE_10_MIN_PENALTY, "2.5")
            .with(LATE_30_MIN_PENALTY, " 7 ");
        let rules = PayrollRules::load(&provider).await.unwrap();
        assert_eq!(rules.work_start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(rules.work_end, NaiveTime::from_hms_opt(17, 30, 0).unwrap());
        assert_eq!(rules.late_threshold_minutes, 10);
        assert_eq!(rules.late_10_min_penalty, dec!(2.5));
        assert_eq!(rules.late_30_min_penalty, dec!(7));
    }

    #[tokio::test]
    async fn garbage_falls_back_to_defaults() {
        let provider = StaticSettings::new()
            .with(WORK_START_TIME, "nine o'clock")
            .with(LATE_THRESHOLD_MINUTES, "-5")
            .with(LATE_10_MIN_PENALTY, "five");
        let rules = PayrollRules::load(&provider).await.unwrap();
        assert_eq!(rules, PayrollRules::default());
    }

    #[tokio::test]
    async fn oversized_threshold_falls_back_to_default() {
        let provider = StaticSettings::new().with(LATE_THRESHOLD_MINUTES, "999999999999999");
        let rules = PayrollRules::load(&provider).await.unwrap();
        assert_eq!(rules.late_threshold_minutes, 0);

        let provider = StaticSettings::new().with(LATE_THRESHOLD_MINUTES, "1440");
        let rules = PayrollRules::load(&provider).await.unwrap();
        assert_eq!(rules.late_threshold_minutes, MAX_LATE_THRESHOLD_MINUTES);
    }

    #[tokio::test]
    async fn get_setting_returns_default_when_absent() {
        let provider = StaticSettings::new().with("company_name", "Clinic");
        assert_eq!(
            get_setting(&provider, "company_name", "x").await.unwrap(),
            "Clinic"
        );
        assert_eq!(
            get_setting(&provider, WORK_END_TIME, "17:00").await.unwrap(),
            "17:00"
        );
    }
}
