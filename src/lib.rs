pub mod error;
pub mod parser;
pub mod report;
pub mod store;
pub mod submission;
pub mod transaction;
pub mod upload;

pub use crate::error::{CnabError, SubmissionError};
pub use crate::parser::{file_to_transactions, parse_line};
pub use crate::store::aggregator::group_by_store;
pub use crate::transaction::Transaction;
pub use crate::upload::UploadPolicy;

use log::{debug, warn};

/// Checks and reads a CNAB file, yielding its transactions in line order.
/// Empty lines are skipped.
pub fn stream_transactions(
    path: &str,
    policy: &UploadPolicy,
) -> Result<impl Iterator<Item = Transaction>, CnabError> {
    let text = upload::read_file_sync(path, policy)?;

    let lines = text.split('\n').count();
    let transactions: Vec<_> = file_to_transactions(&text).collect();

    if transactions.is_empty() {
        warn!("No transactions found in {}", path);
    } else {
        debug!(
            "Parsed {} transactions from {} lines of {}",
            transactions.len(),
            lines,
            path
        );
    }

    Ok(transactions.into_iter())
}
