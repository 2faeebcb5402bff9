use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::time_range::BookingTime;

/// Where a booking sits in its lifecycle. Active bookings live in the
/// `bookings` collection; the two terminal states live in `history`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    #[serde(alias = "completed")]
    Confirmed,
    #[serde(alias = "cancelled")]
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Canceled => "canceled",
        }
    }

    /// Accepts the canonical spellings plus the legacy `completed`/`cancelled`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" | "pending" => Some(BookingStatus::Active),
            "confirmed" | "completed" => Some(BookingStatus::Confirmed),
            "canceled" | "cancelled" => Some(BookingStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Active)
    }
}

/// A customer booking as stored under `bookings/<id>`. The id is the
/// document key and never part of the body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRecord {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub package: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: BookingTime,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl BookingRecord {
    /// Older intake wrote the creation time as `timestamp`; it is only used
    /// when `created_at` is missing.
    pub fn from_document(id: &str, body: serde_json::Value) -> Result<Self, serde_json::Error> {
        let body = carry_legacy_key(body, "timestamp", "created_at");
        let mut record: BookingRecord = serde_json::from_value(body)?;
        record.id = id.to_string();
        Ok(record)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// A finalized booking as stored under `history/<id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub booking: BookingRecord,
    #[serde(deserialize_with = "terminal_status")]
    pub status: BookingStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub action_timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    /// Callers must pass a terminal status; the lifecycle manager validates it.
    pub fn finalize(booking: BookingRecord, status: BookingStatus, at: DateTime<Utc>) -> Self {
        Self {
            booking,
            status,
            action_timestamp: at,
        }
    }

    /// Back to an active booking: status dropped, creation time reset.
    pub fn into_active(self, now: DateTime<Utc>) -> BookingRecord {
        BookingRecord {
            created_at: Some(now),
            ..self.booking
        }
    }

    pub fn id(&self) -> &str {
        &self.booking.id
    }

    /// In history a legacy `timestamp` is the action time.
    pub fn from_document(id: &str, body: serde_json::Value) -> Result<Self, serde_json::Error> {
        let body = carry_legacy_key(body, "timestamp", "action_timestamp");
        let mut record: HistoryRecord = serde_json::from_value(body)?;
        record.booking.id = id.to_string();
        Ok(record)
    }
}

/// Moves `legacy` to `canonical` unless `canonical` is already set, in which
/// case the legacy key is dropped.
pub(crate) fn carry_legacy_key(
    body: serde_json::Value,
    legacy: &str,
    canonical: &str,
) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut map) => {
            if let Some(value) = map.remove(legacy) {
                map.entry(canonical.to_string()).or_insert(value);
            }
            serde_json::Value::Object(map)
        }
        other => other,
    }
}

fn terminal_status<'de, D>(deserializer: D) -> Result<BookingStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let status = BookingStatus::deserialize(deserializer)?;
    if status.is_terminal() {
        Ok(status)
    } else {
        Err(de::Error::custom(
            "history record must be confirmed or canceled",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn body() -> serde_json::Value {
        json!({
            "first_name": "Maria",
            "last_name": "Santos",
            "contact_number": "09171234567",
            "email_address": "maria@example.com",
            "package": "Package B",
            "date": "2024-05-01",
            "time": "9:00 AM - 11:00 AM",
            "payment_method": "GCash",
            "id_image_url": "https://img.example.com/id.png",
            "receipt_url": "https://img.example.com/receipt.png",
            "created_at": 1714521600000i64
        })
    }

    #[test]
    fn test_decode_active_record() {
        let record = BookingRecord::from_document("-Nabc", body()).unwrap();
        assert_eq!(record.id, "-Nabc");
        assert_eq!(record.full_name(), "Maria Santos");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(record.time.range().is_some());
        assert_eq!(
            record.created_at,
            Some(Utc.timestamp_millis_opt(1714521600000).unwrap())
        );
    }

    #[test]
    fn test_active_record_ignores_legacy_status() {
        let mut doc = body();
        doc["status"] = json!("active");
        let record = BookingRecord::from_document("x", doc).unwrap();
        let out = serde_json::to_value(&record).unwrap();
        assert!(out.get("status").is_none());
        assert!(out.get("id").is_none());
    }

    #[test]
    fn test_history_accepts_legacy_spellings() {
        let mut doc = body();
        doc["status"] = json!("completed");
        doc["timestamp"] = json!(1714600000000i64);
        let record = HistoryRecord::from_document("h1", doc).unwrap();
        assert_eq!(record.status, BookingStatus::Confirmed);
        assert_eq!(record.id(), "h1");

        let mut doc = body();
        doc["status"] = json!("cancelled");
        doc["action_timestamp"] = json!(1714600000000i64);
        let record = HistoryRecord::from_document("h2", doc).unwrap();
        assert_eq!(record.status, BookingStatus::Canceled);
    }

    #[test]
    fn test_history_rejects_non_terminal_status() {
        let mut doc = body();
        doc["status"] = json!("active");
        doc["action_timestamp"] = json!(1714600000000i64);
        assert!(HistoryRecord::from_document("h3", doc).is_err());
    }

    #[test]
    fn test_history_writes_canonical_status() {
        let record = BookingRecord::from_document("h4", body()).unwrap();
        let at = Utc.timestamp_millis_opt(1714600000000).unwrap();
        let history = HistoryRecord::finalize(record, BookingStatus::Canceled, at);
        let doc = serde_json::to_value(&history).unwrap();
        assert_eq!(doc["status"], "canceled");
        assert_eq!(doc["action_timestamp"], 1714600000000i64);
        assert_eq!(doc["first_name"], "Maria");
    }

    #[test]
    fn test_into_active_resets_created_at() {
        let record = BookingRecord::from_document("h5", body()).unwrap();
        let at = Utc.timestamp_millis_opt(1714600000000).unwrap();
        let history = HistoryRecord::finalize(record, BookingStatus::Confirmed, at);
        let now = Utc.timestamp_millis_opt(1714700000000).unwrap();
        let active = history.into_active(now);
        assert_eq!(active.id, "h5");
        assert_eq!(active.created_at, Some(now));
    }

    #[test]
    fn test_active_record_with_both_creation_keys() {
        let mut doc = body();
        doc["status"] = json!("active");
        doc["timestamp"] = json!(1714600000000i64);
        let record = BookingRecord::from_document("b1", doc).unwrap();
        assert_eq!(
            record.created_at,
            Some(Utc.timestamp_millis_opt(1714521600000).unwrap())
        );
    }

    #[test]
    fn test_active_record_with_only_legacy_timestamp() {
        let mut doc = body();
        doc.as_object_mut().unwrap().remove("created_at");
        doc["timestamp"] = json!(1714600000000i64);
        let record = BookingRecord::from_document("b1", doc).unwrap();
        assert_eq!(
            record.created_at,
            Some(Utc.timestamp_millis_opt(1714600000000).unwrap())
        );
    }

    #[test]
    fn test_history_with_both_action_keys() {
        let mut doc = body();
        doc["status"] = json!("confirmed");
        doc["action_timestamp"] = json!(1714700000000i64);
        doc["timestamp"] = json!(1714600000000i64);
        let record = HistoryRecord::from_document("h1", doc).unwrap();
        assert_eq!(
            record.action_timestamp,
            Utc.timestamp_millis_opt(1714700000000).unwrap()
        );
        assert_eq!(
            record.booking.created_at,
            Some(Utc.timestamp_millis_opt(1714521600000).unwrap())
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(BookingStatus::parse("Cancelled"), Some(BookingStatus::Canceled));
        assert_eq!(BookingStatus::parse(" confirmed "), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("done"), None);
        assert!(!BookingStatus::Active.is_terminal());
    }
}
