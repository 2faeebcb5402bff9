use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{BookingRecord, BookingStatus, HistoryRecord, PriceList, ReportPeriod};

const UNKNOWN_PACKAGE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub period: String,
    pub total_bookings: usize,
    pub pending_count: usize,
    pub confirmed_count: usize,
    pub canceled_count: usize,
    /// Every booking in either set, by package.
    pub bookings_by_package: BTreeMap<String, usize>,
    /// Confirmed bookings dated inside the period, priced by package.
    pub sales_by_package: BTreeMap<String, i64>,
    pub total_sales: i64,
    pub top_package: Option<String>,
}

/// Reduces a snapshot of both sets to report figures. Pure; the same inputs
/// always give the same output.
pub fn compute_aggregates(
    active: &[BookingRecord],
    history: &[HistoryRecord],
    period: ReportPeriod,
    prices: &PriceList,
) -> Aggregates {
    let mut bookings_by_package: BTreeMap<String, usize> = BTreeMap::new();
    for package in active
        .iter()
        .map(|r| r.package.as_str())
        .chain(history.iter().map(|r| r.booking.package.as_str()))
    {
        *bookings_by_package.entry(package_label(package)).or_default() += 1;
    }

    let confirmed_count = history
        .iter()
        .filter(|r| r.status == BookingStatus::Confirmed)
        .count();
    let canceled_count = history
        .iter()
        .filter(|r| r.status == BookingStatus::Canceled)
        .count();

    let mut sales_by_package: BTreeMap<String, i64> = BTreeMap::new();
    for record in history
        .iter()
        .filter(|r| r.status == BookingStatus::Confirmed && period.contains(r.booking.date))
    {
        *sales_by_package
            .entry(package_label(&record.booking.package))
            .or_default() += prices.price_of(&record.booking.package);
    }

    let total_sales = sales_by_package.values().sum();

    // BTreeMap iterates by name, so a tie keeps the alphabetically first.
    let mut top_package: Option<(&String, i64)> = None;
    for (package, &sales) in &sales_by_package {
        if sales > 0 && top_package.map_or(true, |(_, best)| sales > best) {
            top_package = Some((package, sales));
        }
    }
    let top_package = top_package.map(|(name, _)| name.clone());

    Aggregates {
        period: period.to_string(),
        total_bookings: active.len() + history.len(),
        pending_count: active.len(),
        confirmed_count,
        canceled_count,
        bookings_by_package,
        sales_by_package,
        total_sales,
        top_package,
    }
}

fn package_label(package: &str) -> String {
    let package = package.trim();
    if package.is_empty() {
        UNKNOWN_PACKAGE.to_string()
    } else {
        package.to_string()
    }
}
