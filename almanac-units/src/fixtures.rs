//! Shared test calendars

use almanac_core::prelude::*;

pub const CAL: CalendarId = CalendarId::new(1);
pub const DAY: TimeUnitId = TimeUnitId::new(1);
pub const MONTH: TimeUnitId = TimeUnitId::new(2);
pub const YEAR: TimeUnitId = TimeUnitId::new(3);
pub const WEEK: TimeUnitId = TimeUnitId::new(4);

fn cycle(s: &str) -> LengthCycle {
    s.parse().unwrap()
}

/// Day -> Month [31 28.25 31 30] -> Year [4], plus Week [7] on Day
pub fn gregorianish() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_calendar(Calendar::new(CAL, "Almanac")).unwrap();
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
        .insert_time_unit(TimeUnit::new(WEEK, CAL, "Week").with_base(DAY, cycle("7")))
        .unwrap();
    store
}

/// Day -> Month [30 30.5] -> Year [6.5]
pub fn fractional_years() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert_calendar(Calendar::new(CAL, "Odd")).unwrap();
    store.insert_time_unit(TimeUnit::new(DAY, CAL, "Day")).unwrap();
    store
        .insert_time_unit(TimeUnit::new(MONTH, CAL, "Month").with_base(DAY, cycle("30 30.5")))
        .unwrap();
    store
        .insert_time_unit(TimeUnit::new(YEAR, CAL, "Year").with_base(MONTH, cycle("6.5")))
        .unwrap();
    store
}

/// Two calendars in one world: A's day 100 lines up with B's day 50
pub fn linked_pair() -> MemoryStore {
    let world = WorldId::new(1);
    let cal_a = CalendarId::new(10);
    let cal_b = CalendarId::new(20);
    let cal_c = CalendarId::new(30);

    let mut store = MemoryStore::new();
    store.insert_world(World { id: world, name: "Arda".to_string() }).unwrap();
    store
        .insert_calendar(Calendar::new(cal_a, "A").in_world(world).with_world_link(100))
        .unwrap();
    store
        .insert_calendar(Calendar::new(cal_b, "B").in_world(world).with_world_link(50))
        .unwrap();
    // Same world, never linked
    store.insert_calendar(Calendar::new(cal_c, "C").in_world(world)).unwrap();

    store.insert_time_unit(TimeUnit::new(TimeUnitId::new(101), cal_a, "Day")).unwrap();
    store
        .insert_time_unit(
            TimeUnit::new(TimeUnitId::new(102), cal_a, "Tenday").with_base(TimeUnitId::new(101), cycle("10")),
        )
        .unwrap();
    store.insert_time_unit(TimeUnit::new(TimeUnitId::new(201), cal_b, "Sol")).unwrap();
    store.insert_time_unit(TimeUnit::new(TimeUnitId::new(301), cal_c, "Day")).unwrap();

    store
        .insert_event(Event::new(EventId::new(1), cal_b, "Eclipse", 53))
        .unwrap();
    store
        .insert_event(Event::new(EventId::new(2), cal_b, "Before the link", 1))
        .unwrap();
    store
        .insert_event(Event::new(EventId::new(3), cal_c, "Unlinked", 103))
        .unwrap();
    store
        .insert_event(Event::new(EventId::new(4), cal_a, "Home", 103))
        .unwrap();
    store
}
