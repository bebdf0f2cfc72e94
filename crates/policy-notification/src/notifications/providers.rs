use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Local;
use tracing::warn;

use crate::config::ProviderSettings;

/// Delivery channel for rendered notifications.
pub trait NotificationProvider: Debug + Send + Sync {
    fn name(&self) -> &str;
    fn send(&self, message: &str, destination: &str) -> Result<(), DeliveryError>;
}

/// Delivery failure reported by a provider.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The channel itself is down; later sends through it will fail too.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("message rejected: {0}")]
    Rejected(String),
}

impl DeliveryError {
    pub fn is_systemic(&self) -> bool {
        matches!(self, DeliveryError::Unavailable(_))
    }
}

static MESSAGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Writes each notification as a text file into a destination folder.
#[derive(Debug, Clone)]
pub struct TextNotificationProvider {
    folder: PathBuf,
}

impl TextNotificationProvider {
    pub const NAME: &'static str = "TextNotificationProvider";

    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn file_name(destination: &str) -> String {
        let sequence = MESSAGE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let sanitized: String = destination
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .collect();
        format!(
            "{}-{sequence:06}-{sanitized}.txt",
            Local::now().format("%Y%m%d%H%M%S")
        )
    }
}

impl NotificationProvider for TextNotificationProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn send(&self, message: &str, destination: &str) -> Result<(), DeliveryError> {
        fs::create_dir_all(&self.folder).map_err(|err| {
            DeliveryError::Unavailable(format!("{}: {err}", self.folder.display()))
        })?;

        let path = self.folder.join(Self::file_name(destination));
        let body = format!("To: {destination}\n\n{message}\n");
        fs::write(&path, body)
            .map_err(|err| DeliveryError::Rejected(format!("{}: {err}", path.display())))
    }
}

/// Instantiate the providers present in the module configuration.
///
/// Entries without a local implementation (such as the SMS gateway) are
/// logged and skipped.
pub fn build_providers(settings: &ProviderSettings) -> Vec<Arc<dyn NotificationProvider>> {
    let mut providers: Vec<Arc<dyn NotificationProvider>> = Vec::new();

    if let Some(text) = &settings.text {
        providers.push(Arc::new(TextNotificationProvider::new(
            &text.destination_folder,
        )));
    }

    for name in settings.unsupported.keys() {
        warn!(provider = %name, "notification provider not supported, skipping");
    }

    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_provider_writes_message_file() {
        let folder = std::env::temp_dir().join(format!(
            "policy-notification-provider-{}",
            std::process::id()
        ));
        let provider = TextNotificationProvider::new(&folder);

        provider
            .send("Dear Amina, your policy expires today.", "+255 700 000 001")
            .expect("message written");

        let files: Vec<_> = fs::read_dir(&folder)
            .expect("folder exists")
            .filter_map(Result::ok)
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().to_string_lossy().into_owned();
        assert!(name.ends_with("255700000001.txt"));
        let body = fs::read_to_string(files[0].path()).expect("readable");
        assert!(body.starts_with("To: +255 700 000 001"));

        fs::remove_dir_all(&folder).expect("cleanup");
    }

    #[test]
    fn only_systemic_errors_disable_a_provider() {
        assert!(DeliveryError::Unavailable("down".to_string()).is_systemic());
        assert!(!DeliveryError::Rejected("bad number".to_string()).is_systemic());
    }
}
