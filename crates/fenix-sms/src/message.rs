//! Notification request and delivery report types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use fenix_core::{MessageId, SmsProperties};

use crate::error::{Result, SmsError};

/// A text message addressed to one or more recipients.
///
/// Recipients are deduplicated at construction, keeping first-seen order;
/// blank entries are discarded. Whether the remaining content is
/// deliverable is checked when the message is handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    text: String,
    recipients: Vec<String>,
    properties: SmsProperties,
}

impl SmsMessage {
    /// Creates a message for the given recipients.
    pub fn new<T, R, S>(text: T, recipients: R, properties: SmsProperties) -> Self
    where
        T: Into<String>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduplicated: Vec<String> = Vec::new();
        for recipient in recipients {
            let recipient = recipient.into();
            if recipient.trim().is_empty() || deduplicated.contains(&recipient) {
                continue;
            }
            deduplicated.push(recipient);
        }

        Self {
            text: text.into(),
            recipients: deduplicated,
            properties,
        }
    }

    /// Message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Deduplicated recipient numbers.
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Provider credentials carried with the message.
    pub fn properties(&self) -> &SmsProperties {
        &self.properties
    }

    /// Recipients joined with `;` as the provider wire format expects.
    pub fn joined_recipients(&self) -> String {
        self.recipients.join(";")
    }

    /// Checks that the message is deliverable.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::EmptyMessage` for blank text and
    /// `SmsError::NoRecipients` when no usable recipient remains.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(SmsError::EmptyMessage);
        }
        if self.recipients.is_empty() {
            return Err(SmsError::NoRecipients);
        }
        Ok(())
    }
}

/// Terminal outcome of a dispatch attempt.
#[derive(Debug, Clone)]
pub enum SmsOutcome {
    /// Provider confirmed delivery with its success token.
    Delivered {
        /// Status token returned by the provider
        status: String,
    },
    /// Dispatch failed.
    Failed {
        /// Failure reason
        error: SmsError,
    },
}

/// Delivery report resolved exactly once per accepted request.
#[derive(Debug, Clone)]
pub struct SmsReport {
    /// Correlation id assigned when the request was accepted.
    pub message_id: MessageId,
    /// Terminal outcome of the attempt.
    pub outcome: SmsOutcome,
    /// When the outcome was determined.
    pub completed_at: DateTime<Utc>,
    /// Time spent on the attempt, including the provider call.
    pub duration: Duration,
}

impl SmsReport {
    /// Returns `true` when the provider confirmed delivery.
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, SmsOutcome::Delivered { .. })
    }

    /// Returns the failure reason for failed attempts.
    pub fn error(&self) -> Option<&SmsError> {
        match &self.outcome {
            SmsOutcome::Delivered { .. } => None,
            SmsOutcome::Failed { error } => Some(error),
        }
    }

    /// Returns the provider status token for delivered attempts.
    pub fn status(&self) -> Option<&str> {
        match &self.outcome {
            SmsOutcome::Delivered { status } => Some(status),
            SmsOutcome::Failed { .. } => None,
        }
    }
}
