//! Shared test calendars and format codes

use almanac_core::prelude::*;

pub const CAL: CalendarId = CalendarId::new(1);
pub const DAY: TimeUnitId = TimeUnitId::new(1);
pub const MONTH: TimeUnitId = TimeUnitId::new(2);
pub const YEAR: TimeUnitId = TimeUnitId::new(3);
pub const WEEK: TimeUnitId = TimeUnitId::new(4);
pub const CENTURY: TimeUnitId = TimeUnitId::new(5);
pub const FORMAT: DateFormatId = DateFormatId::new(1);

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October",
    "November", "December",
];

pub const DUPLICATE_MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "January", "June", "July", "August", "September", "January",
    "March", "September",
];

fn cycle(s: &str) -> LengthCycle {
    s.parse().unwrap()
}

/// Day -> Month [30] -> Year [12] -> Century [100], plus Week [7] on Day
pub fn months_and_years(month_names: &[&str]) -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_calendar(Calendar::new(CAL, "Reckoning")).unwrap();
    store.insert_time_unit(TimeUnit::new(DAY, CAL, "Day")).unwrap();
    store
        .insert_time_unit(TimeUnit::new(MONTH, CAL, "Month").with_base(DAY, cycle("30")))
        .unwrap();
    store
        .insert_time_unit(
            TimeUnit::new(YEAR, CAL, "Year")
                .with_base(MONTH, cycle("12"))
                .with_instance_names(month_names.iter().copied()),
        )
        .unwrap();
    store
        .insert_time_unit(TimeUnit::new(WEEK, CAL, "Week").with_base(DAY, cycle("7")))
        .unwrap();
    store
        .insert_time_unit(TimeUnit::new(CENTURY, CAL, "Century").with_base(YEAR, cycle("100")))
        .unwrap();
    store
}

/// Day -> Month [31 28.25 31 30] -> Year [4] with three custom month names
pub fn leap_calendar() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_calendar(Calendar::new(CAL, "Leaping")).unwrap();
    store.insert_time_unit(TimeUnit::new(DAY, CAL, "Day")).unwrap();
    store
        .insert_time_unit(TimeUnit::new(MONTH, CAL, "Month").with_base(DAY, cycle("31 28.25 31 30")))
        .unwrap();
    store
        .insert_time_unit(
            TimeUnit::new(YEAR, CAL, "Year")
                .with_base(MONTH, cycle("4"))
                .with_instance_names(["Frost", "Thaw", "Bloom"]),
        )
        .unwrap();
    store
}

/// Adds `FORMAT` on the day unit
pub fn with_format(mut store: MemoryStore, format_string: &str) -> MemoryStore {
    store
        .insert_date_format(DateFormat::new(FORMAT, CAL, DAY, "Test format", format_string))
        .unwrap();
    store
}

pub fn code(parent: TimeUnitId, sub: TimeUnitId, display: &str) -> String {
    format!("{{{}-{}-{}}}", parent, sub, display)
}

pub fn day_i() -> String {
    code(MONTH, DAY, "i")
}

pub fn month_i() -> String {
    code(YEAR, MONTH, "i")
}

pub fn month_n() -> String {
    code(YEAR, MONTH, "n")
}

pub fn year_i() -> String {
    code(YEAR, YEAR, "i")
}
