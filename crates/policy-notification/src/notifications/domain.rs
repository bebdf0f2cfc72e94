use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable identifier shared by every candidate record kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything the eligibility engine can partition must expose its identity.
pub trait Identified {
    fn record_id(&self) -> RecordId;
}

/// Events that can trigger a notification to an insuree family.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ActivationOfPolicy,
    StartingOfPolicy,
    NeedForRenewal,
    ExpirationOfPolicy,
    ReminderAfterExpiration,
    RenewalOfPolicy,
}

impl NotificationType {
    pub const ALL: [NotificationType; 6] = [
        NotificationType::ActivationOfPolicy,
        NotificationType::StartingOfPolicy,
        NotificationType::NeedForRenewal,
        NotificationType::ExpirationOfPolicy,
        NotificationType::ReminderAfterExpiration,
        NotificationType::RenewalOfPolicy,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            NotificationType::ActivationOfPolicy => "activation_of_policy",
            NotificationType::StartingOfPolicy => "starting_of_policy",
            NotificationType::NeedForRenewal => "need_for_renewal",
            NotificationType::ExpirationOfPolicy => "expiration_of_policy",
            NotificationType::ReminderAfterExpiration => "reminder_after_expiration",
            NotificationType::RenewalOfPolicy => "renewal_of_policy",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification type '{0}'")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        NotificationType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownNotificationType(value.to_string()))
    }
}

/// Lifecycle status codes as stored for insurance policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Idle,
    Active,
    Suspended,
    Expired,
    Ready,
}

impl PolicyStatus {
    pub const fn code(self) -> u8 {
        match self {
            PolicyStatus::Idle => 1,
            PolicyStatus::Active => 2,
            PolicyStatus::Suspended => 4,
            PolicyStatus::Expired => 8,
            PolicyStatus::Ready => 16,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PolicyStatus::Idle),
            2 => Some(PolicyStatus::Active),
            4 => Some(PolicyStatus::Suspended),
            8 => Some(PolicyStatus::Expired),
            16 => Some(PolicyStatus::Ready),
            _ => None,
        }
    }

    /// Accepts either the status name or its numeric code.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::from_code(code);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "idle" => Some(PolicyStatus::Idle),
            "active" => Some(PolicyStatus::Active),
            "suspended" => Some(PolicyStatus::Suspended),
            "expired" => Some(PolicyStatus::Expired),
            "ready" => Some(PolicyStatus::Ready),
            _ => None,
        }
    }
}

/// Whether a policy is a first enrolment or a renewal of an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStage {
    New,
    Renewal,
}

impl PolicyStage {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "n" | "new" => Some(PolicyStage::New),
            "r" | "renewal" => Some(PolicyStage::Renewal),
            _ => None,
        }
    }
}

/// Family snapshot carrying the notification preferences of the household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRecord {
    pub id: RecordId,
    pub head_name: String,
    pub phone: Option<String>,
    pub approval_of_notification: bool,
    pub language: String,
    #[serde(default)]
    pub archived: bool,
}

impl FamilyRecord {
    /// Phone number usable as a delivery destination, if any.
    pub fn contact(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}

impl Identified for FamilyRecord {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

/// Policy candidate with its family denormalized for filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: RecordId,
    pub family: FamilyRecord,
    pub product_code: String,
    pub product_name: String,
    pub status: PolicyStatus,
    pub stage: PolicyStage,
    pub start_date: NaiveDate,
    pub effective_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
}

impl Identified for PolicyRecord {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_type_parses_snake_case_names() {
        for kind in NotificationType::ALL {
            assert_eq!(kind.as_str().parse::<NotificationType>(), Ok(kind));
        }
        assert!("expiry".parse::<NotificationType>().is_err());
    }

    #[test]
    fn policy_status_accepts_codes_and_names() {
        assert_eq!(PolicyStatus::parse("2"), Some(PolicyStatus::Active));
        assert_eq!(PolicyStatus::parse("Expired"), Some(PolicyStatus::Expired));
        assert_eq!(PolicyStatus::parse("3"), None);
        assert_eq!(PolicyStatus::Ready.code(), 16);
    }

    #[test]
    fn blank_phone_is_not_a_contact() {
        let family = FamilyRecord {
            id: RecordId(1),
            head_name: "Amina".to_string(),
            phone: Some("  ".to_string()),
            approval_of_notification: true,
            language: "en".to_string(),
            archived: false,
        };
        assert_eq!(family.contact(), None);
    }
}
