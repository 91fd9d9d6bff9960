//! World startup request and the session it produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use headless_core::{ControlError, ControlResult, SessionId};

/// Who may join a world session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Private,
    Lan,
    Contacts,
    ContactsPlus,
    RegisteredUsers,
    Anyone,
}

/// Parameters for starting a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldStartParameters {
    pub name: String,
    /// Record URL or template the host loads the world from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_from: Option<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
    pub max_users: u32,
    #[serde(default)]
    pub hide_from_listing: bool,
}

impl WorldStartParameters {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            load_from: None,
            access_level: AccessLevel::default(),
            max_users: 16,
            hide_from_listing: false,
        }
    }

    pub fn with_access_level(mut self, access_level: AccessLevel) -> Self {
        self.access_level = access_level;
        self
    }

    pub fn with_max_users(mut self, max_users: u32) -> Self {
        self.max_users = max_users;
        self
    }

    pub fn load_from(mut self, source: impl Into<String>) -> Self {
        self.load_from = Some(source.into());
        self
    }

    pub fn validate(&self) -> ControlResult<()> {
        if self.name.trim().is_empty() {
            return Err(ControlError::validation("world name cannot be empty"));
        }
        if self.max_users == 0 {
            return Err(ControlError::validation("max_users must be at least 1"));
        }
        Ok(())
    }
}

/// A running world, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSession {
    pub session_id: SessionId,
    pub parameters: WorldStartParameters,
    pub started_at: DateTime<Utc>,
}

impl WorldSession {
    pub fn new(session_id: SessionId, parameters: WorldStartParameters) -> Self {
        Self {
            session_id,
            parameters,
            started_at: Utc::now(),
        }
    }

    pub fn descriptor(&self) -> WorldDescriptor {
        WorldDescriptor {
            session_id: self.session_id,
            name: self.parameters.name.clone(),
            access_level: self.parameters.access_level,
            max_users: self.parameters.max_users,
            started_at: self.started_at,
        }
    }
}

/// Plain-data view of a world session, as returned through a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldDescriptor {
    pub session_id: SessionId,
    pub name: String,
    pub access_level: AccessLevel,
    pub max_users: u32,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_are_valid() {
        assert!(WorldStartParameters::new("Hub").validate().is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = WorldStartParameters::new("   ").validate().unwrap_err();
        assert!(matches!(err, ControlError::Validation(_)));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = WorldStartParameters::new("Hub").with_max_users(0).validate().unwrap_err();
        assert_eq!(err, ControlError::validation("max_users must be at least 1"));
    }

    #[test]
    fn parameters_deserialize_with_defaults() {
        let params: WorldStartParameters =
            serde_json::from_str(r#"{"name":"Gallery","max_users":4}"#).unwrap();
        assert_eq!(params.access_level, AccessLevel::Private);
        assert_eq!(params.load_from, None);
        assert!(!params.hide_from_listing);
    }

    #[test]
    fn descriptor_copies_session_fields() {
        let params = WorldStartParameters::new("Gallery")
            .with_access_level(AccessLevel::ContactsPlus)
            .with_max_users(8);
        let session = WorldSession::new(SessionId::new(), params);
        let descriptor = session.descriptor();

        assert_eq!(descriptor.session_id, session.session_id);
        assert_eq!(descriptor.name, "Gallery");
        assert_eq!(descriptor.max_users, 8);
        assert_eq!(descriptor.started_at, session.started_at);

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["access_level"], "contacts_plus");
    }
}
