//! ticket.rs
//!
//! Ticket rendering: a pure function from a completed booking to a printable
//! document. No store access, no side effects beyond producing bytes.

use crate::error::Error;
use crate::models::Booking;

#[derive(Debug)]
pub struct RenderedTicket {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

/// Render the printable ticket for a booking.
///
/// Fails with `MissingData` when the booking has no ticket code, i.e. a
/// legacy row that has not been backfilled yet. The code is the gate-check
/// credential, so rendering without it would produce a useless document.
pub fn render_ticket(booking: &Booking) -> Result<RenderedTicket, Error> {
    let ticket_code = booking
        .ticket_code
        .as_deref()
        .ok_or(Error::MissingData("Booking has no ticket code"))?;

    let title = escape_html(booking.event_title.as_deref().unwrap_or("Event"));
    let date = escape_html(booking.event_date.as_deref().unwrap_or("-"));
    let location = escape_html(booking.event_location.as_deref().unwrap_or("-"));
    let seats = escape_html(&booking.seat_ids.join(", "));
    let booked_on = booking.created_at.format("%B %e, %Y");

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: 'Inter', sans-serif; background: #F9F9F4; padding: 40px; }}
  .ticket {{ background: white; max-width: 800px; margin: 0 auto; border: 2px solid #C17C5C; border-radius: 12px; overflow: hidden; }}
  .header {{ background: linear-gradient(135deg, #C17C5C 0%, #5B7C75 100%); color: white; padding: 40px; text-align: center; }}
  .header h1 {{ font-size: 48px; margin-bottom: 10px; }}
  .content {{ padding: 50px; }}
  .event-title {{ font-size: 36px; color: #2C2C2C; margin-bottom: 30px; border-bottom: 2px solid #E0E0D8; padding-bottom: 20px; }}
  .details {{ display: grid; grid-template-columns: 1fr 1fr; gap: 30px; margin-bottom: 40px; }}
  .detail-item {{ border-left: 3px solid #C17C5C; padding-left: 20px; }}
  .detail-label {{ font-size: 11px; text-transform: uppercase; letter-spacing: 1px; color: #666; margin-bottom: 8px; }}
  .detail-value {{ font-size: 18px; color: #2C2C2C; font-weight: 600; }}
  .seats {{ background: #F9F9F4; padding: 30px; border-radius: 8px; margin-bottom: 30px; }}
  .seat-list {{ font-family: monospace; font-size: 16px; color: #2C2C2C; }}
  .footer {{ text-align: center; padding: 30px; background: #F9F9F4; border-top: 1px solid #E0E0D8; }}
  .ticket-code {{ font-family: monospace; font-size: 24px; font-weight: 700; color: #C17C5C; letter-spacing: 4px; margin-bottom: 10px; }}
  .booking-id {{ font-family: monospace; font-size: 14px; color: #666; margin-top: 10px; }}
</style>
</head>
<body>
  <div class="ticket">
    <div class="header">
      <h1>Eventopedia</h1>
      <p>YOUR EVENT TICKET</p>
    </div>
    <div class="content">
      <div class="event-title">{title}</div>
      <div class="details">
        <div class="detail-item">
          <div class="detail-label">Date</div>
          <div class="detail-value">{date}</div>
        </div>
        <div class="detail-item">
          <div class="detail-label">Location</div>
          <div class="detail-value">{location}</div>
        </div>
        <div class="detail-item">
          <div class="detail-label">Amount Paid</div>
          <div class="detail-value">${amount:.2}</div>
        </div>
        <div class="detail-item">
          <div class="detail-label">Booked On</div>
          <div class="detail-value">{booked_on}</div>
        </div>
      </div>
      <div class="seats">
        <h3>Your Seats</h3>
        <div class="seat-list">{seats}</div>
      </div>
    </div>
    <div class="footer">
      <div class="ticket-code">{ticket_code}</div>
      <div class="booking-id">Booking Ref: {booking_id}</div>
    </div>
  </div>
</body>
</html>
"#,
        amount = booking.amount,
        booking_id = booking.id,
    );

    Ok(RenderedTicket {
        bytes: html.into_bytes(),
        filename: format!("ticket-{}.html", booking.id),
        content_type: "text/html; charset=utf-8",
    })
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn booking(ticket_code: Option<&str>) -> Booking {
        Booking {
            id: 42,
            user_id: 1,
            event_id: 2,
            seat_ids: vec!["0-0".to_string(), "0-1".to_string()],
            amount: 100.0,
            ticket_code: ticket_code.map(|s| s.to_string()),
            event_title: Some("Jazz <Night>".to_string()),
            event_date: Some("2026-09-01".to_string()),
            event_location: Some("Blue Hall".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn renders_code_seats_and_reference() {
        let ticket = render_ticket(&booking(Some("A1B2C3D4"))).unwrap();
        let html = String::from_utf8(ticket.bytes).unwrap();
        assert!(html.contains("A1B2C3D4"));
        assert!(html.contains("0-0, 0-1"));
        assert!(html.contains("Booking Ref: 42"));
        assert!(html.contains("$100.00"));
        // Title is escaped, not interpolated raw.
        assert!(html.contains("Jazz &lt;Night&gt;"));
        assert!(!html.contains("Jazz <Night>"));
        assert_eq!(ticket.filename, "ticket-42.html");
    }

    #[test]
    fn missing_ticket_code_is_an_error_not_a_placeholder() {
        let err = render_ticket(&booking(None)).unwrap_err();
        assert!(matches!(err, Error::MissingData(_)));
    }
}
