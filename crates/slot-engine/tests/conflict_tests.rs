//! Tests for per-cell availability decisions.

use chrono::{NaiveDate, TimeZone, Utc, Weekday};
use slot_engine::{
    AvailabilityStatus, Conflict, ConflictManager, ExistingBooking, HolidayList, TimeSlotGrid,
    WeeklyClosure, Zone, ZoneHierarchy, ZoneRelation,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn booking(id: &str, zone: &str, date: NaiveDate, slot: &str) -> ExistingBooking {
    ExistingBooking {
        id: id.to_string(),
        zone_id: zone.to_string(),
        date,
        time_slot: slot.to_string(),
        booked_by: "club".to_string(),
    }
}

/// Sports hall split into two halves, the north half further split into courts.
fn facility() -> ZoneHierarchy {
    ZoneHierarchy::new(vec![
        Zone::new("hall", "Sports hall"),
        Zone::new("north", "North half").with_parent("hall"),
        Zone::new("south", "South half").with_parent("hall"),
        Zone::new("court-1", "Court 1").with_parent("north"),
        Zone::new("court-2", "Court 2").with_parent("north"),
        Zone::new("pool", "Pool"),
    ])
    .unwrap()
}

fn manager(bookings: Vec<ExistingBooking>) -> ConflictManager {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    ConflictManager::new(facility(), bookings, TimeSlotGrid::hourly(8, 22).unwrap(), now)
}

fn is_busy(status: &AvailabilityStatus) -> bool {
    matches!(status, AvailabilityStatus::Busy { .. })
}

// ── Hierarchy ───────────────────────────────────────────────────────────────

#[test]
fn whole_facility_booking_blocks_sub_zone() {
    let m = manager(vec![booking("b1", "hall", d(2025, 6, 2), "10:00")]);

    let status = m.check_availability("north", d(2025, 6, 2), "10:00");
    match status {
        AvailabilityStatus::Busy {
            conflict: Conflict::Booking { booking, relation },
        } => {
            assert_eq!(booking.id, "b1");
            assert_eq!(relation, ZoneRelation::Ancestor);
        }
        other => panic!("expected busy by ancestor booking, got {:?}", other),
    }
    assert!(is_busy(&m.check_availability("court-2", d(2025, 6, 2), "10:00")));
}

#[test]
fn sub_zone_booking_blocks_whole_facility() {
    let m = manager(vec![booking("b1", "court-1", d(2025, 6, 2), "10:00")]);

    let hall = m.check_availability("hall", d(2025, 6, 2), "10:00");
    assert!(matches!(
        hall.conflict(),
        Some(Conflict::Booking {
            relation: ZoneRelation::Descendant,
            ..
        })
    ));
    assert!(is_busy(&m.check_availability("north", d(2025, 6, 2), "10:00")));
    assert!(is_busy(&m.check_availability("court-1", d(2025, 6, 2), "10:00")));
}

#[test]
fn siblings_do_not_conflict_without_overlap() {
    let m = manager(vec![booking("b1", "court-1", d(2025, 6, 2), "10:00")]);

    assert!(m.is_available("court-2", d(2025, 6, 2), "10:00"));
    assert!(m.is_available("south", d(2025, 6, 2), "10:00"));
    assert!(m.is_available("pool", d(2025, 6, 2), "10:00"));
}

#[test]
fn explicitly_overlapping_siblings_conflict() {
    let zones = ZoneHierarchy::new(vec![
        Zone::new("hall", "Hall"),
        Zone::new("left", "Left half").with_parent("hall").with_overlap("centre"),
        Zone::new("centre", "Centre court").with_parent("hall"),
        Zone::new("right", "Right half").with_parent("hall"),
    ])
    .unwrap();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let m = ConflictManager::new(
        zones,
        vec![booking("b1", "centre", d(2025, 6, 2), "10:00")],
        TimeSlotGrid::hourly(8, 22).unwrap(),
        now,
    );

    let left = m.check_availability("left", d(2025, 6, 2), "10:00");
    assert!(matches!(
        left.conflict(),
        Some(Conflict::Booking {
            relation: ZoneRelation::Overlapping,
            ..
        })
    ));
    assert!(m.is_available("right", d(2025, 6, 2), "10:00"));
}

#[test]
fn isolated_zone_only_conflicts_with_itself() {
    let m = manager(vec![booking("b1", "pool", d(2025, 6, 2), "10:00")]);

    assert!(is_busy(&m.check_availability("pool", d(2025, 6, 2), "10:00")));
    assert!(m.is_available("hall", d(2025, 6, 2), "10:00"));
    assert!(m.is_available("pool", d(2025, 6, 2), "11:00"));
    assert!(m.is_available("pool", d(2025, 6, 3), "10:00"));
}

#[test]
fn first_matching_booking_is_reported() {
    let m = manager(vec![
        booking("b1", "south", d(2025, 6, 2), "10:00"),
        booking("b2", "court-1", d(2025, 6, 2), "10:00"),
        booking("b3", "north", d(2025, 6, 2), "10:00"),
    ]);

    let status = m.check_availability("court-1", d(2025, 6, 2), "10:00");
    match status.conflict() {
        Some(Conflict::Booking { booking, relation }) => {
            assert_eq!(booking.id, "b2");
            assert_eq!(*relation, ZoneRelation::SameZone);
        }
        other => panic!("unexpected conflict {:?}", other),
    }
}

// ── Time rules ──────────────────────────────────────────────────────────────

#[test]
fn past_slot_is_unavailable_even_without_bookings() {
    let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
    let m = ConflictManager::new(facility(), vec![], TimeSlotGrid::hourly(8, 22).unwrap(), now);

    assert_eq!(
        m.check_availability("pool", d(2025, 6, 2), "11:00"),
        AvailabilityStatus::Unavailable {
            conflict: Conflict::PastSlot
        }
    );
    assert_eq!(
        m.check_availability("pool", d(2025, 6, 1), "20:00"),
        AvailabilityStatus::Unavailable {
            conflict: Conflict::PastSlot
        }
    );
    // A slot starting exactly now is not in the past.
    assert!(m.is_available("pool", d(2025, 6, 2), "12:00"));
}

#[test]
fn past_rule_wins_over_bookings() {
    let now = Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap();
    let m = ConflictManager::new(
        facility(),
        vec![booking("b1", "pool", d(2025, 6, 2), "10:00")],
        TimeSlotGrid::hourly(8, 22).unwrap(),
        now,
    );
    let status = m.check_availability("pool", d(2025, 6, 2), "10:00");
    assert_eq!(status.conflict(), Some(&Conflict::PastSlot));
}

#[test]
fn past_check_respects_facility_timezone() {
    // 07:30 UTC is 09:30 in Madrid (CEST), so the 09:00 local slot has started.
    let now = Utc.with_ymd_and_hms(2025, 6, 2, 7, 30, 0).unwrap();
    let m = ConflictManager::new(facility(), vec![], TimeSlotGrid::hourly(8, 22).unwrap(), now)
        .with_timezone(chrono_tz::Europe::Madrid);

    assert!(!m.is_available("pool", d(2025, 6, 2), "09:00"));
    assert!(m.is_available("pool", d(2025, 6, 2), "10:00"));
}

#[test]
fn holiday_blocks_whole_day() {
    let m = manager(vec![]).with_blackouts(HolidayList::new().with(d(2025, 6, 9), "Whit Monday"));

    for slot in ["08:00", "14:00", "21:00"] {
        assert_eq!(
            m.check_availability("hall", d(2025, 6, 9), slot),
            AvailabilityStatus::Unavailable {
                conflict: Conflict::Blackout {
                    reason: "Whit Monday".to_string()
                }
            }
        );
    }
    assert!(m.is_available("hall", d(2025, 6, 10), "08:00"));
}

#[test]
fn holiday_wins_over_booking() {
    let m = manager(vec![booking("b1", "hall", d(2025, 6, 8), "10:00")])
        .with_blackouts(WeeklyClosure::new([Weekday::Sun]));
    assert!(matches!(
        m.check_availability("hall", d(2025, 6, 8), "10:00"),
        AvailabilityStatus::Unavailable {
            conflict: Conflict::Blackout { .. }
        }
    ));
}

// ── Stale rejections ────────────────────────────────────────────────────────

#[test]
fn recorded_rejection_marks_cell_busy() {
    let mut m = manager(vec![]);
    assert!(m.is_available("court-1", d(2025, 6, 2), "10:00"));

    m.record_rejection(slot_engine::SlotKey::new("court-1", d(2025, 6, 2), "10:00"));

    assert_eq!(
        m.check_availability("court-1", d(2025, 6, 2), "10:00"),
        AvailabilityStatus::Busy {
            conflict: Conflict::Rejected
        }
    );
    // The overlay is per zone; the hierarchy is not consulted for rejections.
    assert!(m.is_available("court-2", d(2025, 6, 2), "10:00"));
}

#[test]
fn off_grid_label_checked_against_bookings_and_date() {
    let m = manager(vec![booking("b1", "pool", d(2025, 6, 2), "late")]);
    assert!(is_busy(&m.check_availability("pool", d(2025, 6, 2), "late")));
    assert!(m.is_available("hall", d(2025, 6, 2), "late"));
    // Today is not past as a whole; earlier dates are.
    assert!(m.is_available("hall", d(2025, 6, 1), "late"));
    assert_eq!(
        m.check_availability("pool", d(2000, 1, 1), "late"),
        AvailabilityStatus::Unavailable {
            conflict: Conflict::PastSlot
        }
    );
    assert_eq!(
        m.check_availability("hall", d(2025, 5, 31), "late").conflict(),
        Some(&Conflict::PastSlot)
    );
}

#[test]
fn off_grid_label_uses_facility_today() {
    // 23:30 UTC on May 31 is already June 1 in Madrid.
    let now = Utc.with_ymd_and_hms(2025, 5, 31, 23, 30, 0).unwrap();
    let m = ConflictManager::new(facility(), vec![], TimeSlotGrid::hourly(8, 22).unwrap(), now)
        .with_timezone(chrono_tz::Europe::Madrid);
    assert_eq!(
        m.check_availability("hall", d(2025, 5, 31), "late").conflict(),
        Some(&Conflict::PastSlot)
    );
    assert!(m.is_available("hall", d(2025, 6, 1), "late"));
}
