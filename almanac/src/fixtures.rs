//! Shared test calendars

use almanac_core::prelude::*;

pub const CAL: CalendarId = CalendarId::new(1);
pub const OTHER_CAL: CalendarId = CalendarId::new(2);
pub const DAY: TimeUnitId = TimeUnitId::new(1);
pub const MONTH: TimeUnitId = TimeUnitId::new(2);
pub const YEAR: TimeUnitId = TimeUnitId::new(3);
pub const OTHER_DAY: TimeUnitId = TimeUnitId::new(10);

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October",
    "November", "December",
];

/// Day -> Month [30] -> Year [12], "New Year" on day 1 and "Fair" on day 35,
/// plus a second calendar with only a day unit
pub fn reckoning() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_calendar(Calendar::new(CAL, "Reckoning")).unwrap();
    store.insert_time_unit(TimeUnit::new(DAY, CAL, "Day")).unwrap();
    store
        .insert_time_unit(TimeUnit::new(MONTH, CAL, "Month").with_base(DAY, "30".parse().unwrap()))
        .unwrap();
    store
        .insert_time_unit(
            TimeUnit::new(YEAR, CAL, "Year")
                .with_base(MONTH, "12".parse().unwrap())
                .with_instance_names(MONTH_NAMES),
        )
        .unwrap();
    store.insert_event(Event::new(EventId::new(1), CAL, "New Year", 1)).unwrap();
    store.insert_event(Event::new(EventId::new(2), CAL, "Fair", 35)).unwrap();

    store.insert_calendar(Calendar::new(OTHER_CAL, "Elsewhere")).unwrap();
    store.insert_time_unit(TimeUnit::new(OTHER_DAY, OTHER_CAL, "Day")).unwrap();
    store
}
