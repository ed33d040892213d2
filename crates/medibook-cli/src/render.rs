//! Plain-text rendering of results.

use std::fmt::Write as _;

use medibook_core::booking::TimeSlot;
use medibook_core::directory::{EnrichedDoctor, FeeSchedule};
use medibook_core::favorites::FavoriteEntry;
use medibook_core::mobile::format_mobile_number;
use medibook_core::session::User;

pub fn distance(km: Option<f64>) -> String {
    km.map_or_else(|| "distance unknown".to_string(), |d| format!("{d:.1} km"))
}

pub fn doctor(result: &EnrichedDoctor) -> String {
    let doc = &result.doctor;
    let mut out = doc.name.clone();
    if !doc.specialization.is_empty() {
        let _ = write!(out, " ({})", doc.specialization);
    }
    let _ = write!(out, " [{}]", doc.id);
    if !doc.qualifications.is_empty() {
        let _ = write!(out, "\n    {}", doc.qualifications.join(", "));
    }
    for entry in &result.available_at {
        let place = &entry.dispensary;
        let _ = write!(out, "\n  - {}", place.name);
        if !place.address.is_empty() {
            let _ = write!(out, ", {}", place.address);
        }
        let _ = write!(out, " ({}) [{}]", distance(entry.distance_km), place.id);
        if let Some(fees) = entry.fees.or(place.fees) {
            let _ = write!(out, " LKR {}", fees.total_fee);
        }
    }
    out
}

pub fn favorite(entry: &FavoriteEntry) -> String {
    let doctor = entry.doctor.name.as_deref().unwrap_or("Unknown doctor");
    let mut out = format!("{}  {} @ {}", entry.id, doctor, entry.dispensary.display_name());
    let address = entry.dispensary.display_address();
    if !address.is_empty() {
        let _ = write!(out, ", {address}");
    }
    out
}

pub fn slot(index: usize, slot: &TimeSlot) -> String {
    let mut out = format!("[{index}] {} {}", slot.date, slot.range());
    if slot.is_fully_booked {
        out.push_str(" fully booked");
    } else {
        let _ = write!(out, " next #{}", slot.next_appointment_number);
        if slot.minutes_per_patient > 0 {
            let _ = write!(out, " (~{} min each)", slot.minutes_per_patient);
        }
    }
    out
}

pub fn fees(fees: &FeeSchedule) -> String {
    let mut out = format!("Doctor fee:      LKR {}", fees.doctor_fee);
    if fees.dispensary_fee > 0.0 {
        let _ = write!(out, "\nDispensary fee:  LKR {}", fees.dispensary_fee);
    }
    if fees.booking_commission > 0.0 {
        let _ = write!(out, "\nBooking fee:     LKR {}", fees.booking_commission);
    }
    let _ = write!(out, "\nTotal:           LKR {}", fees.total_fee);
    out
}

pub fn user(user: &User) -> String {
    format!("{} ({})", user.name, format_mobile_number(&user.mobile))
}
