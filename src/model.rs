//! Domain types: persisted companies and POCs, transient candidate records,
//! and the identities that submit and review them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PocdeskError;

/// Pipeline status of a point-of-contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PocStatus {
    #[default]
    #[serde(rename = "yet to contact")]
    YetToContact,
    #[serde(rename = "ongoing")]
    Ongoing,
    #[serde(rename = "done", alias = "onboarded")]
    Done,
    #[serde(rename = "rejected")]
    Rejected,
}

impl PocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YetToContact => "yet to contact",
            Self::Ongoing => "ongoing",
            Self::Done => "done",
            Self::Rejected => "rejected",
        }
    }

    /// Lenient parse for free-text file cells: empty means absent, unknown
    /// values fall back to the default status.
    pub fn from_cell(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse() {
            Ok(status) => Some(status),
            Err(_) => {
                log::warn!("Unknown POC status '{}', using '{}'", trimmed, Self::default());
                Some(Self::default())
            }
        }
    }
}

impl fmt::Display for PocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PocStatus {
    type Err = PocdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yet to contact" => Ok(Self::YetToContact),
            "ongoing" => Ok(Self::Ongoing),
            "done" | "onboarded" => Ok(Self::Done),
            "rejected" => Ok(Self::Rejected),
            other => Err(PocdeskError::Validation(format!(
                "Invalid POC status '{}'. Allowed: yet to contact, ongoing, done, rejected",
                other
            ))),
        }
    }
}

/// A persisted point-of-contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poc {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub status: PocStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// A persisted company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub owner_email: String,
    pub profiles: Vec<String>,
    pub pocs: Vec<Poc>,
    pub created_at: String,
    pub updated_at: String,
}

impl Company {
    /// Copy with contact details stripped according to the viewer's role.
    pub fn visible_to(&self, role: Role) -> Company {
        let mut company = self.clone();
        if role == Role::Dpr {
            for poc in &mut company.pocs {
                poc.email = None;
                poc.phone = None;
            }
        }
        company
    }
}

/// A POC as read from an upload or request body, before persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePoc {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<PocStatus>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl CandidatePoc {
    /// Non-empty email, the dedup key
    pub fn email_key(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// A company not yet reconciled against the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub name: String,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub pocs: Vec<CandidatePoc>,
}

impl CandidateRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Merge key for company names: trimmed, inner whitespace collapsed, lower-cased.
pub fn name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Trimmed cell value, `None` when empty
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Role of a recognized identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Dpr,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Dpr => "dpr",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PocdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "dpr" => Ok(Self::Dpr),
            other => Err(PocdeskError::Validation(format!("Invalid role '{}'", other))),
        }
    }
}

/// A recognized user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_key_trims_and_folds() {
        assert_eq!(name_key("  Acme   Corp "), "acme corp");
        assert_eq!(name_key("ACME corp"), name_key("acme Corp"));
        assert_eq!(name_key(""), "");
    }

    #[test]
    fn test_status_parse_and_alias() {
        assert_eq!("Yet To Contact".parse::<PocStatus>().unwrap(), PocStatus::YetToContact);
        assert_eq!("onboarded".parse::<PocStatus>().unwrap(), PocStatus::Done);
        assert_eq!(PocStatus::Done.to_string(), "done");
        assert!("maybe".parse::<PocStatus>().is_err());
    }

    #[test]
    fn test_status_from_cell() {
        assert_eq!(PocStatus::from_cell("  "), None);
        assert_eq!(PocStatus::from_cell("ONGOING"), Some(PocStatus::Ongoing));
        assert_eq!(PocStatus::from_cell("follow up"), Some(PocStatus::YetToContact));
    }

    #[test]
    fn test_status_serde_wire_values() {
        let json = serde_json::to_string(&PocStatus::YetToContact).unwrap();
        assert_eq!(json, "\"yet to contact\"");
        let parsed: PocStatus = serde_json::from_str("\"onboarded\"").unwrap();
        assert_eq!(parsed, PocStatus::Done);
    }

    #[test]
    fn test_candidate_from_json_defaults() {
        let candidate: CandidateRecord = serde_json::from_str(
            r#"{"name": "Acme", "pocs": [{"name": "Asha", "email": "a@x.com"}]}"#,
        )
        .unwrap();
        assert!(candidate.profiles.is_empty());
        assert_eq!(candidate.pocs[0].status, None);
        assert_eq!(candidate.pocs[0].email_key(), Some("a@x.com"));
    }

    #[test]
    fn test_visible_to_strips_contact_details_for_dpr() {
        let company = Company {
            id: "c1".into(),
            name: "Acme".into(),
            owner_email: "dpr@x.com".into(),
            profiles: vec!["SDE".into()],
            pocs: vec![Poc {
                id: "p1".into(),
                name: "Asha".into(),
                email: Some("a@x.com".into()),
                phone: Some("123".into()),
                status: PocStatus::Ongoing,
                remarks: Some("call back".into()),
            }],
            created_at: String::new(),
            updated_at: String::new(),
        };

        let dpr_view = company.visible_to(Role::Dpr);
        assert_eq!(dpr_view.pocs[0].email, None);
        assert_eq!(dpr_view.pocs[0].phone, None);
        assert_eq!(dpr_view.pocs[0].remarks.as_deref(), Some("call back"));

        let admin_view = company.visible_to(Role::Admin);
        assert_eq!(admin_view, company);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }
}
