use crate::models::{AppointmentInfo, Booking};

const ICS_TIME: &str = "%Y%m%dT%H%M%S";

/// Escapes TEXT values per RFC 5545 section 3.3.11.
fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}

/// Renders the booking's appointment as a single-event calendar. Returns `None` when the
/// booking has no active appointment.
pub fn generate_ics(booking: &Booking, business_name: &str) -> Option<String> {
    let appointment = booking.active_appointment()?;
    Some(render_event(booking, appointment, business_name))
}

fn render_event(booking: &Booking, appointment: &AppointmentInfo, business_name: &str) -> String {
    let dtstart = appointment.scheduled_date.format(ICS_TIME).to_string();
    let dtend = appointment.ends_at().format(ICS_TIME).to_string();
    let dtstamp = booking.updated_at.format(ICS_TIME).to_string();
    let uid = format!("{}@booking-engine", appointment.id);

    let summary = escape_text(&format!("{} with {}", booking.service.label(), business_name));
    let description = if booking.notes.trim().is_empty() {
        "No additional notes".to_string()
    } else {
        escape_text(&booking.notes)
    };

    let mut ics = format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Booking Engine//Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n"
    );
    if let Some(location) = &appointment.location {
        ics.push_str(&format!("LOCATION:{}\r\n", escape_text(location)));
    }
    ics.push_str("END:VEVENT\r\nEND:VCALENDAR\r\n");
    ics
}
