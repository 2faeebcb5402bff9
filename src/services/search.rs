use chrono::Datelike;

use crate::models::{BookingRecord, HistoryRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    FullName,
    /// English month name of the event date, e.g. "May".
    MonthName,
    DayOfMonth,
    Package,
}

/// What the booking list and history screens search by.
pub const DEFAULT_FIELDS: [SearchField; 3] = [
    SearchField::FullName,
    SearchField::MonthName,
    SearchField::DayOfMonth,
];

pub trait Searchable {
    fn search_text(&self, field: SearchField) -> String;
}

impl Searchable for BookingRecord {
    fn search_text(&self, field: SearchField) -> String {
        match field {
            SearchField::FullName => self.full_name(),
            SearchField::MonthName => self.date.format("%B").to_string(),
            SearchField::DayOfMonth => self.date.day().to_string(),
            SearchField::Package => self.package.clone(),
        }
    }
}

impl Searchable for HistoryRecord {
    fn search_text(&self, field: SearchField) -> String {
        self.booking.search_text(field)
    }
}

/// Case-insensitive substring match over the chosen fields. A blank query
/// matches everything.
pub fn filter_by_free_text<'a, T: Searchable>(
    records: &'a [T],
    query: &str,
    fields: &[SearchField],
) -> Vec<&'a T> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return records.iter().collect();
    }

    records
        .iter()
        .filter(|record| {
            fields
                .iter()
                .any(|field| record.search_text(*field).to_lowercase().contains(&query))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: &str, first: &str, last: &str, date: &str) -> BookingRecord {
        BookingRecord {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            contact_number: String::new(),
            email_address: String::new(),
            package: "Package A".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: "9:00 AM - 11:00 AM".into(),
            payment_method: String::new(),
            id_image_url: None,
            receipt_url: None,
            created_at: None,
        }
    }

    fn records() -> Vec<BookingRecord> {
        vec![
            record("1", "Maria", "Santos", "2024-05-01"),
            record("2", "Jose", "Rizal", "2024-06-19"),
            record("3", "Andres", "Bonifacio", "2024-11-30"),
        ]
    }

    fn ids(found: &[&BookingRecord]) -> Vec<String> {
        found.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let records = records();
        let found = filter_by_free_text(&records, "", &DEFAULT_FIELDS);
        assert_eq!(ids(&found), vec!["1", "2", "3"]);

        let found = filter_by_free_text(&records, "   ", &DEFAULT_FIELDS);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_matches_full_name_case_insensitive() {
        let records = records();
        let found = filter_by_free_text(&records, "MARIA san", &DEFAULT_FIELDS);
        assert_eq!(ids(&found), vec!["1"]);
    }

    #[test]
    fn test_matches_month_name() {
        let records = records();
        let found = filter_by_free_text(&records, "june", &DEFAULT_FIELDS);
        assert_eq!(ids(&found), vec!["2"]);
    }

    #[test]
    fn test_matches_day_of_month() {
        let records = records();
        let found = filter_by_free_text(&records, "30", &[SearchField::DayOfMonth]);
        assert_eq!(ids(&found), vec!["3"]);
    }

    #[test]
    fn test_only_requested_fields_are_searched() {
        let records = records();
        let found = filter_by_free_text(&records, "may", &[SearchField::FullName]);
        assert!(found.is_empty());

        let found = filter_by_free_text(&records, "package a", &[SearchField::Package]);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_input_is_untouched() {
        let records = records();
        let before = records.clone();
        let _ = filter_by_free_text(&records, "rizal", &DEFAULT_FIELDS);
        assert_eq!(records, before);
    }
}
