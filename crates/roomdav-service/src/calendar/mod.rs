mod ordering;
pub mod sharing;

pub use sharing::{CalendarSharingService, CalendarSummary, CalendarView, FormattedCalendar};
