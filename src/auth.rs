use chrono::Duration;
use tracing::{info, warn};

use crate::config::AdminConfig;
use crate::error::AuthError;
use crate::storage::BlobStorage;

const SESSION_MARKER: &str = "authenticated";

/// Gate in front of listing and exporting. The record store never calls it.
pub struct AdminAuth<S: BlobStorage> {
    email: String,
    password: String,
    session: S,
    session_max_age: Duration,
}

impl<S: BlobStorage> AdminAuth<S> {
    pub fn new(admin: &AdminConfig, session: S) -> anyhow::Result<Self> {
        Ok(Self {
            email: admin.email.clone(),
            password: admin.password.clone(),
            session,
            session_max_age: admin.session_max_age()?,
        })
    }

    pub fn validate_credentials(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err(AuthError::NotConfigured);
        }
        if email == self.email && password == self.password {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    pub fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if let Err(e) = self.validate_credentials(email, password) {
            warn!("Admin login refused: {}", e);
            return Err(e);
        }

        self.session.write(SESSION_MARKER, self.session_max_age)?;
        info!("Admin session started");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.session.clear()?;
        info!("Admin session ended");
        Ok(())
    }

    /// An unreadable session counts as logged out.
    pub fn is_authenticated(&self) -> bool {
        match self.session.read() {
            Ok(Some(marker)) => marker == SESSION_MARKER,
            Ok(None) => false,
            Err(e) => {
                warn!("Could not read admin session: {}", e);
                false
            }
        }
    }

    pub fn require_session(&self) -> Result<(), AuthError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}
