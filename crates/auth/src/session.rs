//! Per-session application state with an explicit load lifecycle.
//!
//! `Uninitialized → Loading → Ready | NeedsSetup | Failed`, and back to
//! `Uninitialized` on sign-out.

use serde::Serialize;

use bizdesk_business::EmployeeProfile;
use bizdesk_core::{BusinessId, DomainError, DomainResult};

use crate::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Uninitialized,
    Loading,
    /// Identity resolved to an owned business or an employee profile.
    Ready,
    /// Authenticated, but no business exists for this identity yet.
    NeedsSetup,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AppSession {
    phase: SessionPhase,
    identity: Option<Identity>,
    business_id: Option<BusinessId>,
    employee: Option<EmployeeProfile>,
}

impl Default for AppSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AppSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            identity: None,
            business_id: None,
            employee: None,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn business_id(&self) -> Option<BusinessId> {
        self.business_id
    }

    pub fn employee(&self) -> Option<&EmployeeProfile> {
        self.employee.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.phase == SessionPhase::Ready
    }

    /// Ready with a business and no employee profile.
    pub fn is_owner(&self) -> bool {
        self.is_ready() && self.business_id.is_some() && self.employee.is_none()
    }

    /// Start resolving `identity`. Not allowed while a load is in flight.
    pub fn begin(&mut self, identity: Identity) -> DomainResult<()> {
        if self.phase == SessionPhase::Loading {
            return Err(DomainError::conflict("session is already loading"));
        }
        *self = Self {
            phase: SessionPhase::Loading,
            identity: Some(identity),
            business_id: None,
            employee: None,
        };
        Ok(())
    }

    pub fn resolve_owner(&mut self, business_id: BusinessId) -> DomainResult<()> {
        self.ensure_loading()?;
        self.business_id = Some(business_id);
        self.phase = SessionPhase::Ready;
        Ok(())
    }

    pub fn resolve_employee(&mut self, profile: EmployeeProfile) -> DomainResult<()> {
        self.ensure_loading()?;
        self.business_id = Some(profile.business_id);
        self.employee = Some(profile);
        self.phase = SessionPhase::Ready;
        Ok(())
    }

    pub fn resolve_needs_setup(&mut self) -> DomainResult<()> {
        self.ensure_loading()?;
        self.phase = SessionPhase::NeedsSetup;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.business_id = None;
        self.employee = None;
        self.phase = SessionPhase::Failed(message.into());
    }

    pub fn sign_out(&mut self) {
        *self = Self::new();
    }

    fn ensure_loading(&self) -> DomainResult<()> {
        if self.phase != SessionPhase::Loading {
            return Err(DomainError::invariant(format!(
                "session is not loading (phase: {:?})",
                self.phase
            )));
        }
        Ok(())
    }
}
