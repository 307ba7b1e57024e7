//! Destinations for run results

use crate::config::{EmailSettings, Group};
use crate::domain::CheckResult;
use crate::error::{MonitorError, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Placeholder in the email subject replaced by the largest age of the run
pub const AGE_PLACEHOLDER: &str = "{{AGE}}";

/// Receives the results of a run.
///
/// `group_result` is called right after each successful group;
/// `run_finished` once per run with every group result and the trace lines.
pub trait Notifier {
    fn name(&self) -> &str;

    fn group_result(&mut self, _group: &Group, _result: &CheckResult) -> Result<()> {
        Ok(())
    }

    fn run_finished(&mut self, _results: &[CheckResult], _trace_lines: &[String]) -> Result<()> {
        Ok(())
    }
}

/// Reports group ratings through `tracing`
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn group_result(&mut self, group: &Group, result: &CheckResult) -> Result<()> {
        if let Some(rating) = result.rating() {
            tracing::info!(
                group = %group.name,
                rating = %rating,
                age_days = result.age_days,
                "group rated"
            );
        }
        Ok(())
    }

    fn run_finished(&mut self, results: &[CheckResult], _trace_lines: &[String]) -> Result<()> {
        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(groups = results.len(), failed, "run finished");
        Ok(())
    }
}

/// Subject and body of the end-of-run email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDigest {
    pub subject: String,
    pub body: String,
}

impl EmailDigest {
    pub fn compose(subject_template: &str, results: &[CheckResult], trace_lines: &[String]) -> Self {
        let oldest = results.iter().map(|r| r.age_days).max().unwrap_or(0);
        let subject = subject_template.replace(AGE_PLACEHOLDER, &oldest.to_string());

        let mut body = String::new();
        for result in results {
            body.push_str(&result.format_for_email());
            body.push('\n');
        }

        if !trace_lines.is_empty() {
            body.push_str("\nLog:\n");
            for line in trace_lines {
                body.push_str(line);
                body.push('\n');
            }
        }

        Self { subject, body }
    }
}

/// Sends one digest email per run over SMTP.
///
/// The SMTP transport is created for each send and dropped afterwards.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    settings: EmailSettings,
}

impl EmailNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self { settings }
    }

    fn build_message(&self, digest: &EmailDigest) -> Result<Message> {
        let from: Mailbox = self
            .settings
            .from
            .parse()
            .map_err(|e| MonitorError::Email(format!("invalid sender '{}': {}", self.settings.from, e)))?;
        let to: Mailbox = self
            .settings
            .to
            .parse()
            .map_err(|e| MonitorError::Email(format!("invalid recipient '{}': {}", self.settings.to, e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(digest.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(digest.body.clone())
            .map_err(|e| MonitorError::Email(e.to_string()))
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let credentials = Credentials::new(
            self.settings.username.clone(),
            self.settings.password.clone(),
        );

        let builder = if self.settings.use_tls {
            SmtpTransport::relay(&self.settings.host)
                .map_err(|e| MonitorError::Email(e.to_string()))?
        } else {
            SmtpTransport::builder_dangerous(&self.settings.host)
        };

        Ok(builder
            .port(self.settings.port)
            .credentials(credentials)
            .build())
    }
}

impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    fn run_finished(&mut self, results: &[CheckResult], trace_lines: &[String]) -> Result<()> {
        let digest = EmailDigest::compose(&self.settings.subject, results, trace_lines);
        let message = self.build_message(&digest)?;

        tracing::info!(host = %self.settings.host, subject = %digest.subject, "sending email digest");
        self.transport()?
            .send(&message)
            .map_err(|e| MonitorError::Email(e.to_string()))?;
        tracing::info!("email digest sent");

        Ok(())
    }
}
