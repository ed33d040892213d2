//! Time slots, booking form validation, and booking payloads.
//!
//! Slot allocation, fee calculation and booking persistence happen on the
//! server. The client validates what the patient typed and assembles the
//! create-booking request from the chosen slot.

use serde::{Deserialize, Serialize};

use crate::directory::FeeSchedule;
use crate::error::{MedibookError, Result};

/// Minimum patient name length, in characters, after trimming.
pub const MIN_PATIENT_NAME_LEN: usize = 2;

/// A bookable session of a doctor at a dispensary on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    /// Session date as sent by the server (ISO 8601).
    pub date: String,
    /// Session start, `HH:MM`.
    pub start_time: String,
    /// Session end, `HH:MM`.
    pub end_time: String,
    /// Number the next booking will receive.
    #[serde(default)]
    pub next_appointment_number: u32,
    /// Consultation length per patient.
    #[serde(default)]
    pub minutes_per_patient: u32,
    /// Whether no appointments remain.
    #[serde(default)]
    pub is_fully_booked: bool,
}

impl TimeSlot {
    /// `start-end`, the form the booking API expects.
    #[must_use]
    pub fn range(&self) -> String {
        format!("{}-{}", self.start_time, self.end_time)
    }
}

/// Response of the next-available-slots endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDays {
    /// Upcoming sessions, soonest first.
    #[serde(default)]
    pub available_days: Vec<TimeSlot>,
}

/// A problem with one booking form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Form field name.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: &'static str,
}

/// What the patient typed into the booking form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    /// Patient's full name.
    pub patient_name: String,
    /// Patient's contact number.
    pub patient_phone: String,
}

impl BookingForm {
    /// Every problem with the form; empty when valid.
    #[must_use]
    pub fn errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let name = self.patient_name.trim();
        if name.is_empty() {
            errors.push(FieldError {
                field: "name",
                message: "Patient name is required",
            });
        } else if name.chars().count() < MIN_PATIENT_NAME_LEN {
            errors.push(FieldError {
                field: "name",
                message: "Name must be at least 2 characters",
            });
        }
        if self.patient_phone.trim().is_empty() {
            errors.push(FieldError {
                field: "phone",
                message: "Mobile number is required",
            });
        }
        errors
    }

    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns [`MedibookError::ValidationError`] listing every problem.
    pub fn validate(&self) -> Result<()> {
        let errors = self.errors();
        if errors.is_empty() {
            return Ok(());
        }
        let messages: Vec<&str> = errors.iter().map(|e| e.message).collect();
        Err(MedibookError::ValidationError(messages.join("; ")))
    }
}

/// Body of the create-booking request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Patient's full name, trimmed.
    pub patient_name: String,
    /// Patient's contact number, trimmed.
    pub patient_phone: String,
    /// Doctor being booked.
    pub doctor_id: String,
    /// Dispensary where the session takes place.
    pub dispensary_id: String,
    /// Session date.
    pub booking_date: String,
    /// Fee breakdown shown to the patient.
    pub fees: Option<FeeSchedule>,
    /// `start-end`.
    pub time_slot: String,
    /// Appointment number being claimed.
    pub appointment_number: u32,
    /// Estimated consultation time.
    pub estimated_time: String,
    /// Minutes per patient for the session.
    pub minutes_per_patient: u32,
    /// Booking origin.
    pub booked_user: String,
    /// Booking channel.
    pub booked_by: String,
}

impl BookingRequest {
    /// Assemble a booking for `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`MedibookError::ValidationError`] if the form is invalid, an
    /// identifier is empty, or the slot is fully booked.
    pub fn new(
        form: &BookingForm,
        doctor_id: &str,
        dispensary_id: &str,
        slot: &TimeSlot,
        fees: Option<FeeSchedule>,
    ) -> Result<Self> {
        form.validate()?;
        if doctor_id.trim().is_empty() || dispensary_id.trim().is_empty() {
            return Err(MedibookError::ValidationError(
                "Invalid doctor or dispensary ID".into(),
            ));
        }
        if slot.is_fully_booked {
            return Err(MedibookError::ValidationError(format!(
                "The session on {} is fully booked",
                slot.date
            )));
        }

        Ok(Self {
            patient_name: form.patient_name.trim().to_string(),
            patient_phone: form.patient_phone.trim().to_string(),
            doctor_id: doctor_id.to_string(),
            dispensary_id: dispensary_id.to_string(),
            booking_date: slot.date.clone(),
            fees,
            time_slot: slot.range(),
            appointment_number: slot.next_appointment_number,
            estimated_time: slot.start_time.clone(),
            minutes_per_patient: slot.minutes_per_patient,
            booked_user: "online".to_string(),
            booked_by: "ONLINE".to_string(),
        })
    }
}

/// Response of the create-booking request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    /// Identifier used to fetch the booking summary.
    pub transaction_id: String,
}

/// Booking summary shown after confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    /// Transaction identifier.
    #[serde(default)]
    pub transaction_id: String,
    /// Patient name.
    #[serde(default)]
    pub patient_name: Option<String>,
    /// Appointment number.
    #[serde(default)]
    pub appointment_number: Option<u32>,
    /// Session date.
    #[serde(default)]
    pub booking_date: Option<String>,
    /// `start-end`.
    #[serde(default)]
    pub time_slot: Option<String>,
    /// Fees charged.
    #[serde(default)]
    pub fees: Option<FeeSchedule>,
    /// Remaining fields, passed through for display.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}
