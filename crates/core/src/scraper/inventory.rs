//! Canonical inventory rows and the deterministic inventory-id scheme.
//!
//! Inventory ids must be stable for identical (event, section, row, seats)
//! across runs; the sales platform de-duplicates on them.

use serde::{Deserialize, Serialize};

use crate::event::TrackedEvent;
use crate::marketplace::RawSeat;

/// Stock type written when the event does not specify one.
const DEFAULT_STOCK_TYPE: &str = "ELECTRONIC";

/// Quantity offered per row.
const DEFAULT_QUANTITY: u32 = 2;

/// One sellable seat/zone record, as written to the output artifact.
/// Field order matches the upload schema; never persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalInventoryRow {
    pub inventory_id: String,
    pub event_name: String,
    pub venue_name: String,
    pub event_date: String,
    pub event_id: String,
    pub quantity: u32,
    pub section: String,
    pub row: String,
    pub seats: String,
    pub barcodes: String,
    pub internal_notes: String,
    pub public_notes: String,
    pub tags: String,
    pub list_price: i64,
    pub face_price: f64,
    pub taxed_cost: f64,
    pub cost: f64,
    pub hide_seats: String,
    pub in_hand: String,
    pub in_hand_date: String,
    pub instant_transfer: String,
    pub files_available: String,
    pub split_type: String,
    pub custom_split: String,
    pub stock_type: String,
    pub zone: String,
    pub shown_quantity: String,
    pub passthrough: String,
}

/// 3-digit hash of the section name.
pub fn section_hash(section: &str) -> String {
    format!("{:03}", crc32fast::hash(section.as_bytes()) % 1000)
}

/// 2-digit row code: numeric rows are zero-padded, alphabetic rows map to
/// their position in the alphabet ("A" -> "01", "z" -> "26").
pub fn row_code(row: &str) -> String {
    let row = row.trim();
    if !row.is_empty() && row.chars().all(|c| c.is_ascii_digit()) {
        return format!("{:0>2}", row);
    }
    match row.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => {
            format!("{:02}", (c.to_ascii_uppercase() as u8) - b'A' + 1)
        }
        _ => "00".to_string(),
    }
}

/// First seat number from a comma-separated seat list, "00" when absent.
pub fn first_seat(seats: &str) -> String {
    match seats.split(',').next().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "00".to_string(),
    }
}

/// Deterministic inventory id:
/// event id ++ section hash ++ row code ++ first seat.
pub fn inventory_id(event_id: &str, section: &str, row: &str, seats: &str) -> String {
    format!(
        "{}{}{}{}",
        event_id,
        section_hash(section),
        row_code(row),
        first_seat(seats)
    )
}

/// Transform raw seats into canonical inventory rows for an event.
///
/// Aborts early and returns the rows accumulated so far once `should_stop`
/// reports a cancellation.
pub fn build_rows(
    event: &TrackedEvent,
    seats: &[RawSeat],
    should_stop: impl Fn() -> bool,
) -> Vec<CanonicalInventoryRow> {
    let event_date = event.event_datetime();
    let default_in_hand_date = event.date.format("%Y-%m-%d").to_string();

    let mut rows = Vec::with_capacity(seats.len());
    for seat in seats {
        if should_stop() {
            return rows;
        }

        let list_price = (seat.price * event.markup).round() as i64;
        let taxed_cost = seat.fees.map(|f| f.total()).unwrap_or(0.0);

        rows.push(CanonicalInventoryRow {
            inventory_id: inventory_id(&event.external_id, &seat.section, &seat.row, &seat.seats),
            event_name: event.name.clone(),
            venue_name: event
                .venue
                .clone()
                .unwrap_or_else(|| "Unknown Venue".to_string()),
            event_date: event_date.clone(),
            event_id: event.external_id.clone(),
            quantity: DEFAULT_QUANTITY,
            section: seat.section.clone(),
            row: seat.row.clone(),
            seats: seat.seats.clone(),
            barcodes: String::new(),
            internal_notes: String::new(),
            public_notes: String::new(),
            tags: String::new(),
            list_price,
            face_price: seat.face_value,
            taxed_cost,
            cost: seat.price,
            hide_seats: "Y".to_string(),
            in_hand: event.in_hand.clone().unwrap_or_else(|| "N".to_string()),
            in_hand_date: event
                .in_hand_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or(default_in_hand_date.clone()),
            instant_transfer: "N".to_string(),
            files_available: "N".to_string(),
            split_type: "NEVERLEAVEONE".to_string(),
            custom_split: String::new(),
            stock_type: event
                .stock_type
                .clone()
                .unwrap_or_else(|| DEFAULT_STOCK_TYPE.to_string()),
            zone: "N".to_string(),
            shown_quantity: String::new(),
            passthrough: String::new(),
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSource;
    use crate::marketplace::SeatFees;
    use chrono::NaiveDate;

    fn event() -> TrackedEvent {
        TrackedEvent {
            id: 1,
            source: EventSource::PrimaryMarketplace,
            external_id: "EV100".to_string(),
            marketplace_id: Some("AB12".to_string()),
            show_id: None,
            queue_event_id: None,
            name: "Hamlet".to_string(),
            city: Some("New York".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            time: "19:30".to_string(),
            venue: Some("The Globe".to_string()),
            markup: 1.6,
            stock_type: None,
            in_hand: None,
            in_hand_date: None,
            double_check: false,
            first_scrape_completed: false,
        }
    }

    fn seat() -> RawSeat {
        RawSeat {
            section: "Orchestra".to_string(),
            row: "A".to_string(),
            seats: "12,13".to_string(),
            price: 100.0,
            face_value: 80.0,
            fees: None,
        }
    }

    #[test]
    fn test_row_code() {
        assert_eq!(row_code("A"), "01");
        assert_eq!(row_code("z"), "26");
        assert_eq!(row_code("26"), "26");
        assert_eq!(row_code("5"), "05");
        assert_eq!(row_code("GA"), "07");
        assert_eq!(row_code(""), "00");
    }

    #[test]
    fn test_first_seat() {
        assert_eq!(first_seat("12,13,14"), "12");
        assert_eq!(first_seat(" 7 , 8"), "7");
        assert_eq!(first_seat(""), "00");
        assert_eq!(first_seat(" ,5"), "00");
    }

    #[test]
    fn test_section_hash_is_three_digits() {
        for section in ["Orchestra", "Mezzanine", "101", ""] {
            let hash = section_hash(section);
            assert_eq!(hash.len(), 3);
            assert!(hash.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_inventory_id_deterministic() {
        let id = inventory_id("EV100", "Orchestra", "A", "12,13");
        assert_eq!(id, inventory_id("EV100", "Orchestra", "A", "12,13"));
        assert!(id.starts_with("EV100"));
        assert!(id.ends_with("0112"));

        // Any input change shifts the id.
        assert_ne!(id, inventory_id("EV101", "Orchestra", "A", "12,13"));
        assert_ne!(id, inventory_id("EV100", "Mezzanine", "A", "12,13"));
        assert_ne!(id, inventory_id("EV100", "Orchestra", "B", "12,13"));
        assert_ne!(id, inventory_id("EV100", "Orchestra", "A", "14,15"));
    }

    #[test]
    fn test_build_rows_pricing_and_defaults() {
        let rows = build_rows(&event(), &[seat()], || false);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];

        assert_eq!(row.list_price, 160);
        assert_eq!(row.face_price, 80.0);
        assert_eq!(row.cost, 100.0);
        assert_eq!(row.taxed_cost, 0.0);
        assert_eq!(row.event_date, "2024-06-01T19:30:00");
        assert_eq!(row.quantity, 2);
        assert_eq!(row.stock_type, "ELECTRONIC");
        assert_eq!(row.in_hand, "N");
        assert_eq!(row.in_hand_date, "2024-06-01");
        assert_eq!(row.split_type, "NEVERLEAVEONE");
        assert_eq!(row.venue_name, "The Globe");
    }

    #[test]
    fn test_build_rows_sums_fees() {
        let mut with_fees = seat();
        with_fees.fees = Some(SeatFees {
            convenience: 5.0,
            concierge: 2.0,
            order: 1.5,
        });

        let rows = build_rows(&event(), &[with_fees], || false);
        assert_eq!(rows[0].taxed_cost, 8.5);
    }

    #[test]
    fn test_build_rows_honors_event_policy() {
        let mut ev = event();
        ev.stock_type = Some("HARD".to_string());
        ev.in_hand = Some("Y".to_string());
        ev.in_hand_date = NaiveDate::from_ymd_opt(2024, 5, 20);
        ev.venue = None;

        let rows = build_rows(&ev, &[seat()], || false);
        assert_eq!(rows[0].stock_type, "HARD");
        assert_eq!(rows[0].in_hand, "Y");
        assert_eq!(rows[0].in_hand_date, "2024-05-20");
        assert_eq!(rows[0].venue_name, "Unknown Venue");
    }

    #[test]
    fn test_build_rows_stops_early() {
        let seats = vec![seat(); 10];
        let rows = build_rows(&event(), &seats, || true);
        assert!(rows.is_empty());
    }
}
