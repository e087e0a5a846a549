//! Validation and persistence of parsed transactions.
//!
//! A batch is accepted or rejected as a whole. Every invalid field of every
//! record is reported, keyed by record index and field name. Records are
//! checked from the raw JSON, so a field of the wrong type is reported like
//! any other invalid field instead of aborting the batch.

use crate::error::SubmissionError;
use crate::transaction::Transaction;

use log::{error, info, warn};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::LazyLock;

static DATE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$").expect("valid date pattern"));
static HOUR_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}:[0-9]{2}$").expect("valid hour pattern"));

const REQUIRED: &str = "Required";
const RECORD: &str = "_errors";

/// Flat record as it is sent in a request body. Absent text fields are
/// omitted; a missing amount is sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub value: Option<Decimal>,
}

impl From<&Transaction> for TransactionPayload {
    fn from(tx: &Transaction) -> Self {
        Self {
            card_number: Some(tx.card_number.clone()),
            date: Some(tx.date.clone()),
            document: Some(tx.document.clone()),
            hour: Some(tx.hour.clone()),
            name: Some(tx.name.clone()),
            owner: Some(tx.owner.clone()),
            kind: Some(tx.kind.to_string()),
            value: tx.value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub transactions: Vec<TransactionPayload>,
}

impl From<&[Transaction]> for SubmissionRequest {
    fn from(transactions: &[Transaction]) -> Self {
        Self {
            transactions: transactions.iter().map(TransactionPayload::from).collect(),
        }
    }
}

/// A validated record, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewTransaction {
    pub card_number: Option<String>,
    pub date: String,
    pub document: String,
    pub hour: String,
    pub name: String,
    pub owner: String,
    pub kind: String,
    pub value: Decimal,
}

/// Errors under the `transactions` key: batch-level messages in `_errors`,
/// field messages under each record index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchErrors {
    #[serde(rename = "_errors", skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(flatten)]
    pub records: BTreeMap<usize, BTreeMap<&'static str, Vec<String>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationErrors {
    pub transactions: BatchErrors,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.transactions.errors.is_empty() && self.transactions.records.is_empty()
    }

    /// Number of records with at least one invalid field.
    pub fn invalid_records(&self) -> usize {
        self.transactions.records.len()
    }

    /// Messages about the batch as a whole, e.g. a body without a record list.
    pub fn batch(&self) -> &[String] {
        &self.transactions.errors
    }

    pub fn field(&self, index: usize, field: &str) -> &[String] {
        self.transactions
            .records
            .get(&index)
            .and_then(|fields| fields.get(field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn push(&mut self, index: usize, field: &'static str, message: impl Into<String>) {
        self.transactions
            .records
            .entry(index)
            .or_default()
            .entry(field)
            .or_default()
            .push(message.into());
    }

    fn push_batch(&mut self, message: impl Into<String>) {
        self.transactions.errors.push(message.into());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub success: bool,
    pub processed_count: usize,
}

/// Storage seam. Records already present are skipped, not inserted again.
pub trait TransactionStore {
    /// Returns how many records were actually inserted.
    fn create_many_skip_duplicates(&mut self, records: Vec<NewTransaction>) -> anyhow::Result<usize>;
}

/// Two records are duplicates when every stored field matches.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Vec<NewTransaction>,
    keys: HashSet<NewTransaction>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[NewTransaction] {
        &self.records
    }
}

impl TransactionStore for InMemoryStore {
    fn create_many_skip_duplicates(&mut self, records: Vec<NewTransaction>) -> anyhow::Result<usize> {
        let mut inserted = 0;

        for record in records {
            if self.keys.insert(record.clone()) {
                self.records.push(record);
                inserted += 1;
            }
        }

        Ok(inserted)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expected(kind: &str, found: &Value) -> String {
    format!("Expected {}, received {}", kind, json_type(found))
}

/// Present string field. Absent and wrongly typed fields are reported.
fn text<'a>(
    errors: &mut ValidationErrors,
    index: usize,
    record: &'a Map<String, Value>,
    field: &'static str,
) -> Option<&'a str> {
    match record.get(field) {
        None => {
            errors.push(index, field, REQUIRED);
            None
        }
        Some(Value::String(text)) => Some(text.as_str()),
        Some(other) => {
            errors.push(index, field, expected("string", other));
            None
        }
    }
}

fn required_text(
    errors: &mut ValidationErrors,
    index: usize,
    record: &Map<String, Value>,
    field: &'static str,
    label: &str,
) -> Option<String> {
    let text = text(errors, index, record, field)?;
    if text.is_empty() {
        errors.push(index, field, format!("{} is required", label));
        return None;
    }
    Some(text.to_string())
}

fn formatted_text(
    errors: &mut ValidationErrors,
    index: usize,
    record: &Map<String, Value>,
    field: &'static str,
    pattern: &Regex,
    message: &str,
) -> Option<String> {
    let text = text(errors, index, record, field)?;
    if !pattern.is_match(text) {
        errors.push(index, field, message);
        return None;
    }
    Some(text.to_string())
}

fn number(
    errors: &mut ValidationErrors,
    index: usize,
    record: &Map<String, Value>,
    field: &'static str,
) -> Option<Decimal> {
    match record.get(field) {
        None => {
            errors.push(index, field, REQUIRED);
            None
        }
        Some(Value::Number(n)) => {
            let raw = n.to_string();
            let parsed = Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw));
            if parsed.is_err() {
                errors.push(index, field, "Number out of range");
            }
            parsed.ok()
        }
        Some(other) => {
            errors.push(index, field, expected("number", other));
            None
        }
    }
}

fn validate_record(errors: &mut ValidationErrors, index: usize, record: &Value) -> Option<NewTransaction> {
    let Value::Object(record) = record else {
        errors.push(index, RECORD, expected("object", record));
        return None;
    };

    let card_number = match record.get("cardNumber") {
        None => None,
        Some(Value::String(card)) => Some(card.clone()),
        Some(other) => {
            errors.push(index, "cardNumber", expected("string", other));
            None
        }
    };
    let date = formatted_text(
        errors,
        index,
        record,
        "date",
        &DATE_FORMAT,
        "Date must be in format DD/MM/YYYY",
    );
    let document = required_text(errors, index, record, "document", "Document");
    let hour = formatted_text(
        errors,
        index,
        record,
        "hour",
        &HOUR_FORMAT,
        "Hour must be in format HH:MM:SS",
    );
    let name = required_text(errors, index, record, "name", "Name");
    let owner = required_text(errors, index, record, "owner", "Owner");
    let kind = required_text(errors, index, record, "type", "Type");
    let value = number(errors, index, record, "value");

    Some(NewTransaction {
        card_number,
        date: date?,
        document: document?,
        hour: hour?,
        name: name?,
        owner: owner?,
        kind: kind?,
        value: value?,
    })
}

fn validate_records(records: &[Value]) -> Result<Vec<NewTransaction>, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let validated: Vec<_> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| validate_record(&mut errors, index, record))
        .collect();

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

/// Validates a request body of the form `{ "transactions": [...] }`.
pub fn validate_json(body: &Value) -> Result<Vec<NewTransaction>, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    match body {
        Value::Object(fields) => match fields.get("transactions") {
            Some(Value::Array(records)) => return validate_records(records),
            None => errors.push_batch(REQUIRED),
            Some(other) => errors.push_batch(expected("array", other)),
        },
        other => errors.push_batch(expected("object", other)),
    }

    Err(errors)
}

/// Validates every record. Fails with all collected errors if any record is invalid.
pub fn validate_batch(payloads: &[TransactionPayload]) -> Result<Vec<NewTransaction>, ValidationErrors> {
    let records: Vec<_> = payloads
        .iter()
        .map(|payload| serde_json::to_value(payload).unwrap_or(Value::Null))
        .collect();

    validate_records(&records)
}

fn reject(errors: ValidationErrors, total: usize) -> SubmissionError {
    warn!(
        "Rejected batch of {} transactions: {} invalid records",
        total,
        errors.invalid_records()
    );
    SubmissionError::Validation(errors)
}

fn persist<S: TransactionStore>(
    records: Vec<NewTransaction>,
    store: &mut S,
) -> Result<SubmissionReceipt, SubmissionError> {
    let submitted = records.len();
    let inserted = store.create_many_skip_duplicates(records).map_err(|e| {
        error!("Failed to persist transactions: {:#}", e);
        SubmissionError::Persistence
    })?;

    info!(
        "Persisted {} of {} submitted transactions ({} duplicates skipped)",
        inserted,
        submitted,
        submitted.saturating_sub(inserted)
    );

    Ok(SubmissionReceipt {
        success: true,
        processed_count: submitted,
    })
}

pub fn submit<S: TransactionStore>(
    request: &SubmissionRequest,
    store: &mut S,
) -> Result<SubmissionReceipt, SubmissionError> {
    let records = validate_batch(&request.transactions)
        .map_err(|errors| reject(errors, request.transactions.len()))?;

    persist(records, store)
}

/// Parses a JSON request body and submits it. Only unparsable JSON is a
/// malformed request; everything else is reported as validation errors.
pub fn submit_json<S: TransactionStore>(
    body: &str,
    store: &mut S,
) -> Result<SubmissionReceipt, SubmissionError> {
    let body: Value = serde_json::from_str(body)?;
    let total = body["transactions"].as_array().map_or(0, Vec::len);

    let records = validate_json(&body).map_err(|errors| reject(errors, total))?;

    persist(records, store)
}

impl SubmissionError {
    pub fn status(&self) -> u16 {
        match self {
            SubmissionError::MalformedRequest(_) | SubmissionError::Validation(_) => 400,
            SubmissionError::Persistence => 500,
        }
    }

    /// Response body. Persistence failures never carry their cause.
    pub fn body(&self) -> Value {
        match self {
            SubmissionError::MalformedRequest(e) => {
                json!({ "error": "Malformed request", "details": e.to_string() })
            }
            SubmissionError::Validation(errors) => {
                json!({ "error": "Validation failed", "details": errors })
            }
            SubmissionError::Persistence => json!({ "error": "Internal server error" }),
        }
    }
}
