pub mod booking;
pub mod package;
pub mod period;
pub mod time_range;

pub use booking::{BookingRecord, BookingStatus, HistoryRecord};
pub use package::PriceList;
pub use period::ReportPeriod;
pub use time_range::{BookingTime, TimeRange};
