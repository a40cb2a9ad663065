//! Transfer records built from a posted transfer form.
//!
//! Records are only kept for the request that built them. Nothing is
//! transferred and no balance changes.

use serde::Deserialize;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

/// Date time format for transfer records, e.g. "2024-01-31 13:45:00".
const TRANSFER_DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// The raw fields of a posted transfer form.
///
/// Fields are not validated. Missing fields default to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransferForm {
    /// Who the money should go to.
    pub recipient: String,
    /// How much to send, exactly as typed.
    pub amount: String,
}

/// A single transfer from the session's user to a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// When the transfer was requested, see [TRANSFER_DATE_FORMAT].
    pub date: String,
    /// The session's username, or an empty string if it has none.
    pub sender: String,
    /// The posted recipient.
    pub recipient: String,
    /// The posted amount.
    pub amount: String,
}

impl TransferRecord {
    /// Build a record for a transfer requested at `date`.
    ///
    /// If `date` cannot be formatted the error is logged and the record gets
    /// an empty date.
    pub fn new(date: OffsetDateTime, sender: Option<&str>, form: TransferForm) -> Self {
        let date = format_transfer_date(date).unwrap_or_else(|error| {
            tracing::error!("{error}");
            String::new()
        });

        Self {
            date,
            sender: sender.unwrap_or_default().to_owned(),
            recipient: form.recipient,
            amount: form.amount,
        }
    }
}

/// Format `date` with [TRANSFER_DATE_FORMAT].
///
/// # Errors
///
/// Returns [Error::DateFormatError] if `date` cannot be formatted.
pub fn format_transfer_date(date: OffsetDateTime) -> Result<String, Error> {
    date.format(TRANSFER_DATE_FORMAT)
        .map_err(|error| Error::DateFormatError(error.to_string()))
}

/// Append `record` to `history` and return the extended history.
pub fn record_transfer(
    mut history: Vec<TransferRecord>,
    record: TransferRecord,
) -> Vec<TransferRecord> {
    history.push(record);
    history
}
