//! Injected session context.
//!
//! The host shell resolves the current user session once and passes it in as
//! an immutable snapshot. The core never reads ambient session state during
//! a submission attempt.

use chrono::{DateTime, Utc};
use forms_types::{PatientRef, ResourceRef, SessionMode};

/// Read-only view of the session a form was opened under.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub patient: PatientRef,
    pub provider: Option<ResourceRef>,
    pub location: Option<ResourceRef>,
    pub visit: Option<ResourceRef>,
    pub session_date: DateTime<Utc>,
    pub mode: SessionMode,
}

impl SessionSnapshot {
    pub fn new(patient: PatientRef, mode: SessionMode) -> Self {
        Self {
            patient,
            provider: None,
            location: None,
            visit: None,
            session_date: Utc::now(),
            mode,
        }
    }

    pub fn with_provider(mut self, provider: ResourceRef) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_location(mut self, location: ResourceRef) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_visit(mut self, visit: ResourceRef) -> Self {
        self.visit = Some(visit);
        self
    }
}
