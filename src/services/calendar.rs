use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{BookingStatus, HistoryRecord, ReportPeriod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
}

impl DayPart {
    pub fn of(record: &HistoryRecord) -> Self {
        if record.booking.time.is_morning() {
            DayPart::Morning
        } else {
            DayPart::Afternoon
        }
    }
}

/// Confirmed bookings grouped by event date, restricted to `period`.
pub fn confirmed_by_date(
    history: &[HistoryRecord],
    period: ReportPeriod,
) -> BTreeMap<NaiveDate, Vec<&HistoryRecord>> {
    let mut days: BTreeMap<NaiveDate, Vec<&HistoryRecord>> = BTreeMap::new();
    for record in history
        .iter()
        .filter(|r| r.status == BookingStatus::Confirmed && period.contains(r.booking.date))
    {
        days.entry(record.booking.date).or_default().push(record);
    }
    for records in days.values_mut() {
        records.sort_by_key(|r| r.booking.time.range().map(|t| t.start));
    }
    days
}

/// Morning if the day has any morning booking, otherwise afternoon.
pub fn default_day_part(records: &[&HistoryRecord]) -> DayPart {
    if records.iter().any(|r| DayPart::of(r) == DayPart::Morning) {
        DayPart::Morning
    } else {
        DayPart::Afternoon
    }
}

pub fn filter_day_part<'a>(records: &[&'a HistoryRecord], part: DayPart) -> Vec<&'a HistoryRecord> {
    records
        .iter()
        .copied()
        .filter(|r| DayPart::of(r) == part)
        .collect()
}

pub fn generate_ics(record: &HistoryRecord, business_name: &str) -> String {
    let booking = &record.booking;
    let (dtstart, dtend) = match booking.time.range() {
        Some(range) => (
            format!(
                "DTSTART:{}",
                booking.date.and_time(range.start).format("%Y%m%dT%H%M%S")
            ),
            format!(
                "DTEND:{}",
                booking.date.and_time(range.end).format("%Y%m%dT%H%M%S")
            ),
        ),
        None => (
            format!("DTSTART;VALUE=DATE:{}", booking.date.format("%Y%m%d")),
            format!(
                "DTEND;VALUE=DATE:{}",
                (booking.date + Duration::days(1)).format("%Y%m%d")
            ),
        ),
    };
    let dtstamp = record.action_timestamp.format("%Y%m%dT%H%M%SZ");
    let uid = format!("{}@boothdesk", record.id());

    let package = if booking.package.trim().is_empty() {
        "Booking"
    } else {
        booking.package.trim()
    };
    let summary = escape_text(&format!("{package} - {}", booking.full_name()));
    let description = escape_text(&format!(
        "{business_name} booking\nTime: {}\nContact: {}\nEmail: {}\nPayment: {}",
        booking.time.label(),
        booking.contact_number,
        booking.email_address,
        booking.payment_method
    ));

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Boothdesk//Booking Console//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         {dtstart}\r\n\
         {dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingRecord;
    use chrono::{TimeZone, Utc};

    fn confirmed(id: &str, date: &str, time: &str) -> HistoryRecord {
        let booking = BookingRecord {
            id: id.to_string(),
            first_name: "Carla".to_string(),
            last_name: "Cruz".to_string(),
            contact_number: "09175550000".to_string(),
            email_address: "carla@example.com".to_string(),
            package: "Package C".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: time.into(),
            payment_method: "Bank transfer".to_string(),
            id_image_url: None,
            receipt_url: None,
            created_at: None,
        };
        HistoryRecord::finalize(
            booking,
            BookingStatus::Confirmed,
            Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap(),
        )
    }

    fn may() -> ReportPeriod {
        ReportPeriod::parse("2025-05").unwrap()
    }

    #[test]
    fn test_groups_confirmed_by_date() {
        let mut canceled = confirmed("x", "2025-05-02", "9:00 AM - 10:00 AM");
        canceled.status = BookingStatus::Canceled;
        let history = vec![
            confirmed("a", "2025-05-02", "2:00 PM - 4:00 PM"),
            confirmed("b", "2025-05-02", "9:00 AM - 11:00 AM"),
            confirmed("c", "2025-05-20", "1:00 PM - 2:00 PM"),
            confirmed("d", "2025-06-01", "1:00 PM - 2:00 PM"),
            canceled,
        ];

        let days = confirmed_by_date(&history, may());
        assert_eq!(days.len(), 2);
        let second = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let ids: Vec<_> = days[&second].iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_day_parts() {
        let morning = confirmed("m", "2025-05-02", "9:00 AM - 11:00 AM");
        let afternoon = confirmed("p", "2025-05-02", "1:00 PM - 3:00 PM");
        let records = vec![&morning, &afternoon];

        assert_eq!(default_day_part(&records), DayPart::Morning);
        assert_eq!(filter_day_part(&records, DayPart::Afternoon)[0].id(), "p");

        let only_afternoon = vec![&afternoon];
        assert_eq!(default_day_part(&only_afternoon), DayPart::Afternoon);
        assert_eq!(default_day_part(&[]), DayPart::Afternoon);
    }

    #[test]
    fn test_generate_ics() {
        let record = confirmed("test-123", "2025-03-15", "2:00 PM - 3:00 PM");

        let ics = generate_ics(&record, "Maky's Photobooth");
        assert!(ics.contains("BEGIN:VCALENDAR"));
        assert!(ics.contains("BEGIN:VEVENT"));
        assert!(ics.contains("DTSTART:20250315T140000"));
        assert!(ics.contains("DTEND:20250315T150000"));
        assert!(ics.contains("DTSTAMP:20250310T100000Z"));
        assert!(ics.contains("SUMMARY:Package C - Carla Cruz"));
        assert!(ics.contains("UID:test-123@boothdesk"));
        assert!(ics.contains("Payment: Bank transfer"));
        assert!(ics.contains("END:VCALENDAR"));
    }

    #[test]
    fn test_generate_ics_unparsed_time_is_all_day() {
        let record = confirmed("test-456", "2025-04-01", "Whole day");

        let ics = generate_ics(&record, "Test Biz");
        assert!(ics.contains("DTSTART;VALUE=DATE:20250401"));
        assert!(ics.contains("DTEND;VALUE=DATE:20250402"));
        assert!(ics.contains("Time: Whole day"));
    }
}
