use crate::infra::{build_dispatcher, parse_date, parse_datetime};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::Args;
use policy_notification::config::AppConfig;
use policy_notification::error::AppError;
use policy_notification::notifications::{
    DispatchReport, EligibilityPreview, NotificationType, RejectionView,
};
use policy_notification::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct DispatchArgs {
    /// Policy CSV export (defaults to POLICY_NOTIFICATION_POLICIES)
    #[arg(long)]
    pub(crate) policies: Option<PathBuf>,
    /// Module configuration JSON (defaults to POLICY_NOTIFICATION_CONFIG)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Run time used for triggers and delivery stamps (YYYY-MM-DDTHH:MM:SS)
    #[arg(long, value_parser = parse_datetime)]
    pub(crate) now: Option<NaiveDateTime>,
    /// Print the full report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct EligibilityArgs {
    /// Policy CSV export (defaults to POLICY_NOTIFICATION_POLICIES)
    #[arg(long)]
    pub(crate) policies: Option<PathBuf>,
    /// Notification type to validate, e.g. need_for_renewal
    #[arg(long)]
    pub(crate) notification_type: NotificationType,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Validate families instead of the policies triggered on `today`
    #[arg(long)]
    pub(crate) families: bool,
    /// Print the preview as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_dispatch(args: DispatchArgs) -> Result<(), AppError> {
    let DispatchArgs {
        policies,
        config: module_config,
        now,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let now = now.unwrap_or_else(|| Local::now().naive_local());
    let dispatcher = build_dispatcher(&config, policies, module_config, now)?;
    let report = dispatcher.dispatch(now)?;

    if json {
        print_json(&report)?;
    } else {
        render_dispatch_report(&report);
    }
    Ok(())
}

pub(crate) fn run_eligibility(args: EligibilityArgs) -> Result<(), AppError> {
    let EligibilityArgs {
        policies,
        notification_type,
        today,
        families,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let dispatcher = build_dispatcher(&config, policies, None, Local::now().naive_local())?;
    let preview = if families {
        dispatcher.preview_families(notification_type)?
    } else {
        dispatcher.preview(notification_type, today)?
    };

    if json {
        print_json(&preview)?;
    } else {
        render_preview(&preview, families, today);
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
    println!("{rendered}");
    Ok(())
}

fn render_dispatch_report(report: &DispatchReport) {
    println!("Notification dispatch at {}", report.run_at);
    if report.types.is_empty() {
        println!("No notification types enabled");
        return;
    }

    for entry in &report.types {
        println!(
            "\n{} | {} candidates | {} sent | {} failed | {} ineligible",
            entry.notification_type,
            entry.candidates,
            entry.sent.len(),
            entry.failed.len(),
            entry.ineligible.len()
        );
        for failure in &entry.failed {
            println!("  policy {} not delivered: {}", failure.record_id, failure.errors.join("; "));
        }
        render_rejections(&entry.ineligible);
    }

    if !report.unavailable_providers.is_empty() {
        println!(
            "\nProviders unavailable during this run: {}",
            report.unavailable_providers.join(", ")
        );
    }
    println!(
        "\nTotal: {} sent, {} failed",
        report.sent_count(),
        report.failed_count()
    );
}

fn render_preview(preview: &EligibilityPreview, families: bool, today: NaiveDate) {
    let subject = if families { "families" } else { "policies" };
    println!(
        "Eligibility of {subject} for {} on {today}",
        preview.notification_type
    );
    let eligible: Vec<String> = preview.eligible.iter().map(ToString::to_string).collect();
    println!(
        "- {} eligible: {}",
        eligible.len(),
        if eligible.is_empty() {
            "none".to_string()
        } else {
            eligible.join(", ")
        }
    );
    println!("- {} ineligible", preview.ineligible.len());
    render_rejections(&preview.ineligible);
}

fn render_rejections(rejections: &[RejectionView]) {
    for rejection in rejections {
        if rejection.rejection_details.is_empty() {
            println!(
                "  {} rejected (reason {})",
                rejection.record_id, rejection.rejection_reason
            );
        } else {
            println!(
                "  {} rejected (reason {}): {}",
                rejection.record_id, rejection.rejection_reason, rejection.rejection_details
            );
        }
    }
}
