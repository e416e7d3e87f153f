use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::AppointmentInfo;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Key-value store ──

pub fn kv_get(conn: &Connection, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()?;
    Ok(value)
}

pub fn kv_set(conn: &Connection, key: &str, value: &[u8]) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

pub fn kv_delete(conn: &Connection, key: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
    Ok(count > 0)
}

pub fn kv_list_keys(conn: &Connection, prefix: &str) -> anyhow::Result<Vec<String>> {
    // substr instead of LIKE so `_` and `%` in prefixes match literally
    let mut stmt = conn.prepare(
        "SELECT key FROM kv_store WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key ASC",
    )?;
    let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;

    let mut keys = vec![];
    for row in rows {
        keys.push(row?);
    }
    Ok(keys)
}

// ── Appointments ──

pub fn upsert_appointment(conn: &Connection, appointment: &AppointmentInfo) -> anyhow::Result<()> {
    let scheduled_at = appointment.scheduled_date.format(TS_FORMAT).to_string();
    let ends_at = appointment.ends_at().format(TS_FORMAT).to_string();
    let data = serde_json::to_string(appointment)?;

    conn.execute(
        "INSERT INTO appointments (booking_id, id, scheduled_at, ends_at, duration_minutes, status, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(booking_id) DO UPDATE SET
           id = excluded.id,
           scheduled_at = excluded.scheduled_at,
           ends_at = excluded.ends_at,
           duration_minutes = excluded.duration_minutes,
           status = excluded.status,
           data = excluded.data",
        params![
            appointment.booking_id,
            appointment.id,
            scheduled_at,
            ends_at,
            appointment.duration_minutes,
            appointment.status.as_str(),
            data,
        ],
    )?;
    Ok(())
}

pub fn delete_appointment(conn: &Connection, booking_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM appointments WHERE booking_id = ?1",
        params![booking_id],
    )?;
    Ok(count > 0)
}

/// Every appointment still holding a slot, oldest first.
pub fn list_active_appointments(conn: &Connection) -> anyhow::Result<Vec<AppointmentInfo>> {
    let mut stmt = conn.prepare(
        "SELECT data FROM appointments
         WHERE status != 'cancelled'
         ORDER BY scheduled_at ASC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(serde_json::from_str(&row?)?);
    }
    Ok(appointments)
}

/// Non-cancelled appointments whose `[start, end)` interval intersects
/// `[start, start + duration)`. Zero-length windows on either side never match.
pub fn find_overlapping_appointments(
    conn: &Connection,
    start: &NaiveDateTime,
    duration_minutes: u32,
    exclude_booking: Option<&str>,
) -> anyhow::Result<Vec<AppointmentInfo>> {
    if duration_minutes == 0 {
        return Ok(vec![]);
    }

    let end = *start + Duration::minutes(i64::from(duration_minutes));
    let start_str = start.format(TS_FORMAT).to_string();
    let end_str = end.format(TS_FORMAT).to_string();

    let mut stmt = conn.prepare(
        "SELECT data FROM appointments
         WHERE status != 'cancelled'
           AND duration_minutes > 0
           AND scheduled_at < ?2
           AND ends_at > ?1
           AND (?3 IS NULL OR booking_id != ?3)
         ORDER BY scheduled_at ASC",
    )?;

    let rows = stmt.query_map(params![start_str, end_str, exclude_booking], |row| {
        row.get::<_, String>(0)
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(serde_json::from_str(&row?)?);
    }
    Ok(appointments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{AppointmentStatus, LocationType};

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn appointment(booking_id: &str, start: &str, minutes: u32) -> AppointmentInfo {
        AppointmentInfo {
            id: format!("apt-{booking_id}"),
            booking_id: booking_id.to_string(),
            scheduled_date: dt(start),
            duration_minutes: minutes,
            location: None,
            location_type: LocationType::InPerson,
            status: AppointmentStatus::Scheduled,
            reminders: vec![],
            reschedule_history: vec![],
        }
    }

    #[test]
    fn test_kv_set_get_overwrite_delete() {
        let conn = db::init_db(":memory:").unwrap();
        assert!(kv_get(&conn, "booking:1").unwrap().is_none());

        kv_set(&conn, "booking:1", b"one").unwrap();
        kv_set(&conn, "booking:1", b"uno").unwrap();
        assert_eq!(kv_get(&conn, "booking:1").unwrap().unwrap(), b"uno");

        assert!(kv_delete(&conn, "booking:1").unwrap());
        assert!(!kv_delete(&conn, "booking:1").unwrap());
    }

    #[test]
    fn test_kv_list_keys_matches_prefix_literally() {
        let conn = db::init_db(":memory:").unwrap();
        kv_set(&conn, "booking:a", b"1").unwrap();
        kv_set(&conn, "booking:b", b"2").unwrap();
        kv_set(&conn, "bookingXc", b"3").unwrap();
        kv_set(&conn, "settings", b"4").unwrap();

        let keys = kv_list_keys(&conn, "booking:").unwrap();
        assert_eq!(keys, vec!["booking:a", "booking:b"]);

        let keys = kv_list_keys(&conn, "booking_").unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn test_find_overlapping_half_open() {
        let conn = db::init_db(":memory:").unwrap();
        upsert_appointment(&conn, &appointment("b1", "2025-06-16 10:00", 60)).unwrap();

        let hits = find_overlapping_appointments(&conn, &dt("2025-06-16 10:30"), 60, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].booking_id, "b1");

        // touching endpoints do not overlap
        let hits = find_overlapping_appointments(&conn, &dt("2025-06-16 11:00"), 60, None).unwrap();
        assert!(hits.is_empty());
        let hits = find_overlapping_appointments(&conn, &dt("2025-06-16 09:00"), 60, None).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_find_overlapping_skips_cancelled_and_excluded() {
        let conn = db::init_db(":memory:").unwrap();
        let mut cancelled = appointment("b1", "2025-06-16 10:00", 60);
        cancelled.status = AppointmentStatus::Cancelled;
        upsert_appointment(&conn, &cancelled).unwrap();
        upsert_appointment(&conn, &appointment("b2", "2025-06-16 10:00", 60)).unwrap();

        let hits = find_overlapping_appointments(&conn, &dt("2025-06-16 10:15"), 30, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].booking_id, "b2");

        let hits =
            find_overlapping_appointments(&conn, &dt("2025-06-16 10:15"), 30, Some("b2")).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_zero_duration_never_overlaps() {
        let conn = db::init_db(":memory:").unwrap();
        upsert_appointment(&conn, &appointment("b1", "2025-06-16 10:00", 60)).unwrap();
        upsert_appointment(&conn, &appointment("b2", "2025-06-16 10:30", 0)).unwrap();

        let hits = find_overlapping_appointments(&conn, &dt("2025-06-16 10:30"), 0, None).unwrap();
        assert!(hits.is_empty());

        let hits = find_overlapping_appointments(&conn, &dt("2025-06-16 10:20"), 20, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].booking_id, "b1");
    }

    #[test]
    fn test_appointment_round_trip() {
        let conn = db::init_db(":memory:").unwrap();
        let apt = appointment("b1", "2025-06-16 10:00", 45);
        upsert_appointment(&conn, &apt).unwrap();
        assert_eq!(list_active_appointments(&conn).unwrap(), vec![apt]);
        assert!(delete_appointment(&conn, "b1").unwrap());
        assert!(list_active_appointments(&conn).unwrap().is_empty());
        assert!(!delete_appointment(&conn, "b1").unwrap());
    }

    #[test]
    fn test_list_active_skips_cancelled() {
        let conn = db::init_db(":memory:").unwrap();
        let later = appointment("b2", "2025-06-16 14:00", 60);
        let earlier = appointment("b1", "2025-06-16 09:00", 60);
        let mut cancelled = appointment("b3", "2025-06-16 11:00", 60);
        cancelled.status = AppointmentStatus::Cancelled;
        for apt in [&later, &earlier, &cancelled] {
            upsert_appointment(&conn, apt).unwrap();
        }

        let ids: Vec<_> = list_active_appointments(&conn)
            .unwrap()
            .into_iter()
            .map(|a| a.booking_id)
            .collect();
        assert_eq!(ids, vec!["b1", "b2"]);
    }
}
