use super::domain::{NotificationType, PolicyRecord};

/// Produces the text delivered for a notification.
pub trait TemplateSource: Send + Sync {
    fn render(
        &self,
        notification_type: NotificationType,
        policy: &PolicyRecord,
    ) -> Result<String, TemplateError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("policy {policy} has no {field} required by the {notification_type} template")]
    MissingField {
        policy: u64,
        field: &'static str,
        notification_type: NotificationType,
    },
}

const DATE_FORMAT: &str = "%d-%m-%Y";

/// Built-in English message texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNotificationTemplates;

impl TemplateSource for DefaultNotificationTemplates {
    fn render(
        &self,
        notification_type: NotificationType,
        policy: &PolicyRecord,
    ) -> Result<String, TemplateError> {
        let head = policy.family.head_name.as_str();
        let product = policy.product_name.as_str();
        let expiry = policy.expiry_date.format(DATE_FORMAT);

        let message = match notification_type {
            NotificationType::ActivationOfPolicy => {
                let effective = effective_date(notification_type, policy)?;
                format!(
                    "Dear {head}, your {product} policy was activated on {effective}. It is valid until {expiry}."
                )
            }
            NotificationType::StartingOfPolicy => format!(
                "Dear {head}, your {product} policy starts today, {}. You are covered until {expiry}.",
                policy.start_date.format(DATE_FORMAT)
            ),
            NotificationType::NeedForRenewal => format!(
                "Dear {head}, your {product} policy expires on {expiry}. Please renew it to stay covered."
            ),
            NotificationType::ExpirationOfPolicy => format!(
                "Dear {head}, your {product} policy expires today, {expiry}."
            ),
            NotificationType::ReminderAfterExpiration => format!(
                "Dear {head}, your {product} policy expired on {expiry} and has not been renewed."
            ),
            NotificationType::RenewalOfPolicy => {
                let effective = effective_date(notification_type, policy)?;
                format!(
                    "Dear {head}, your {product} policy was renewed on {effective}. It is valid until {expiry}."
                )
            }
        };

        Ok(message)
    }
}

fn effective_date(
    notification_type: NotificationType,
    policy: &PolicyRecord,
) -> Result<String, TemplateError> {
    policy
        .effective_date
        .map(|date| date.format(DATE_FORMAT).to_string())
        .ok_or(TemplateError::MissingField {
            policy: policy.id.0,
            field: "effective date",
            notification_type,
        })
}
