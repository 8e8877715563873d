use serde::Serialize;
use tracing::{error, info, warn};

use crate::device::{detect_device, merge_device_data, ClientHints};
use crate::error::ValidationError;
use crate::storage::BlobStorage;
use crate::store::UserStore;
use crate::types::{DeviceDataPatch, NewUser, UserData};

pub const MSG_MISSING_FIELDS: &str = "All fields are required, including consent";
pub const MSG_THANK_YOU: &str = "Thank you for your submission!";
pub const MSG_TRY_AGAIN: &str = "An error occurred. Please try again.";

/// Raw fields of the registration form, as the transport hands them over.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub consent: Option<String>,
    pub screen_width: Option<String>,
    pub screen_height: Option<String>,
    /// JSON object of client-side device signals.
    pub device_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub message: String,
}

impl SubmissionOutcome {
    fn ok() -> Self {
        Self { success: true, message: MSG_THANK_YOU.to_string() }
    }

    fn failed(message: &str) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn parse_client_patch(raw: Option<&str>) -> DeviceDataPatch {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return DeviceDataPatch::default(),
    };

    match serde_json::from_str(raw) {
        Ok(patch) => patch,
        Err(e) => {
            warn!("Ignoring unreadable client device data: {}", e);
            DeviceDataPatch::default()
        }
    }
}

/// Validates the form and builds the record to store.
pub fn prepare_submission(form: &SubmissionForm, user_agent: &str) -> Result<NewUser, ValidationError> {
    let first_name = required(&form.first_name, "firstName")?;
    let last_name = required(&form.last_name, "lastName")?;
    let email = required(&form.email, "email")?;
    required(&form.consent, "consent")?;

    let hints = ClientHints::from_form(form.screen_width.as_deref(), form.screen_height.as_deref());
    let server = detect_device(user_agent, hints);
    let client = parse_client_patch(form.device_data.as_deref());

    Ok(NewUser {
        first_name,
        last_name,
        email,
        device_data: merge_device_data(server, client),
    })
}

/// Runs a submission end to end and reports the result for the submitter.
pub fn submit_user_data<S: BlobStorage>(
    store: &UserStore<S>,
    form: &SubmissionForm,
    user_agent: &str,
) -> (SubmissionOutcome, Option<UserData>) {
    let new_user = match prepare_submission(form, user_agent) {
        Ok(new_user) => new_user,
        Err(e) => {
            info!("Rejected submission: {}", e);
            return (SubmissionOutcome::failed(MSG_MISSING_FIELDS), None);
        }
    };

    match store.add_user(new_user) {
        Ok(user) => (SubmissionOutcome::ok(), Some(user)),
        Err(e) => {
            error!("Error saving user data: {}", e);
            (SubmissionOutcome::failed(MSG_TRY_AGAIN), None)
        }
    }
}
