use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::domain::{
    FamilyRecord, NotificationType, PolicyRecord, PolicyStage, PolicyStatus, RecordId,
};
use crate::config::DefaultNotificationData;

/// Policies read from a CSV export together with the notifications already
/// delivered for them.
#[derive(Debug, Clone, Default)]
pub struct ImportedPolicies {
    pub policies: Vec<PolicyRecord>,
    pub notified: Vec<(RecordId, NotificationType)>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unable to read policy export: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed policy export: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

pub fn import_policies_from_path<P: AsRef<Path>>(
    path: P,
    defaults: &DefaultNotificationData,
) -> Result<ImportedPolicies, ImportError> {
    let file = File::open(path)?;
    import_policies(file, defaults)
}

pub fn import_policies<R: Read>(
    reader: R,
    defaults: &DefaultNotificationData,
) -> Result<ImportedPolicies, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut imported = ImportedPolicies::default();

    for (index, record) in csv_reader.deserialize::<PolicyRow>().enumerate() {
        // header is line 1
        let row = index + 2;
        let policy_row = record?;
        let (policy, notified) = policy_row.into_policy(defaults, row)?;
        imported
            .notified
            .extend(notified.into_iter().map(|kind| (policy.id, kind)));
        imported.policies.push(policy);
    }

    Ok(imported)
}

#[derive(Debug, Deserialize)]
struct PolicyRow {
    policy_id: u64,
    family_id: u64,
    head_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    approval_of_notification: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    language: Option<String>,
    product_code: String,
    product_name: String,
    status: String,
    stage: String,
    start_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    effective_date: Option<String>,
    expiry_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    notified: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    archived: Option<String>,
}

impl PolicyRow {
    fn into_policy(
        self,
        defaults: &DefaultNotificationData,
        row: usize,
    ) -> Result<(PolicyRecord, Vec<NotificationType>), ImportError> {
        let invalid = |message: String| ImportError::InvalidRow { row, message };

        let status = PolicyStatus::parse(&self.status)
            .ok_or_else(|| invalid(format!("unknown policy status '{}'", self.status)))?;
        let stage = PolicyStage::parse(&self.stage)
            .ok_or_else(|| invalid(format!("unknown policy stage '{}'", self.stage)))?;
        let start_date = parse_date(&self.start_date).map_err(invalid)?;
        let expiry_date = parse_date(&self.expiry_date).map_err(invalid)?;
        let effective_date = self
            .effective_date
            .as_deref()
            .map(parse_date)
            .transpose()
            .map_err(invalid)?;

        let approval_of_notification = match self.approval_of_notification.as_deref() {
            Some(raw) => parse_flag(raw).map_err(invalid)?,
            None => defaults.approval_of_notification,
        };
        let archived = match self.archived.as_deref() {
            Some(raw) => parse_flag(raw).map_err(invalid)?,
            None => false,
        };

        let notified = self
            .notified
            .as_deref()
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                name.parse::<NotificationType>()
                    .map_err(|err| invalid(err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let policy = PolicyRecord {
            id: RecordId(self.policy_id),
            family: FamilyRecord {
                id: RecordId(self.family_id),
                head_name: self.head_name,
                phone: self.phone,
                approval_of_notification,
                language: self
                    .language
                    .unwrap_or_else(|| defaults.language_of_notification.clone()),
                archived,
            },
            product_code: self.product_code,
            product_name: self.product_name,
            status,
            stage,
            start_date,
            effective_date,
            expiry_date,
        };

        Ok((policy, notified))
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        other => Err(format!("'{other}' is not a boolean flag")),
    }
}
