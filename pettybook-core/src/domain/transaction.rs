//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::RecordId;

/// What kind of money movement a transaction records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    PettyCash,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 3] = [
        TransactionKind::Deposit,
        TransactionKind::Withdrawal,
        TransactionKind::PettyCash,
    ];

    /// Wire/storage name ("deposit", "withdrawal", "petty-cash")
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::PettyCash => "petty-cash",
        }
    }

    /// Label of the reference field that belongs to this kind
    pub fn reference_label(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "Reference Number",
            TransactionKind::Withdrawal => "Cheque Number",
            TransactionKind::PettyCash => "Voucher Number",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            "petty-cash" | "petty_cash" | "pettycash" => Ok(TransactionKind::PettyCash),
            other => Err(Error::validation(format!("Unknown transaction type: {}", other))),
        }
    }
}

/// A recorded deposit, withdrawal or petty-cash payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category_id: RecordId,
    pub description: String,
    /// Deposits only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_number: Option<String>,
    /// Withdrawals only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cheque_number: Option<String>,
    /// Petty cash only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a stored transaction from a create payload
    pub fn from_new(id: RecordId, new: &NewTransaction, now: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: new.kind,
            amount: new.amount,
            date: new.date,
            category_id: new.category_id.clone(),
            description: new.description.clone(),
            ref_number: new.ref_number.clone(),
            cheque_number: new.cheque_number.clone(),
            voucher_number: new.voucher_number.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check a stored or merged record against the same rules as a create
    pub fn validate(&self) -> Result<()> {
        check_fields(
            self.kind,
            self.amount,
            &self.description,
            [&self.ref_number, &self.cheque_number, &self.voucher_number],
        )
    }

    /// The populated reference number, whichever field it lives in
    pub fn reference(&self) -> Option<&str> {
        match self.kind {
            TransactionKind::Deposit => self.ref_number.as_deref(),
            TransactionKind::Withdrawal => self.cheque_number.as_deref(),
            TransactionKind::PettyCash => self.voucher_number.as_deref(),
        }
    }
}

/// Payload for creating a transaction: everything except id and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category_id: RecordId,
    pub description: String,
    #[serde(default)]
    pub ref_number: Option<String>,
    #[serde(default)]
    pub cheque_number: Option<String>,
    #[serde(default)]
    pub voucher_number: Option<String>,
}

impl NewTransaction {
    pub fn new(
        kind: TransactionKind,
        amount: Decimal,
        date: NaiveDate,
        category_id: impl Into<RecordId>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            amount,
            date,
            category_id: category_id.into(),
            description: description.into(),
            ref_number: None,
            cheque_number: None,
            voucher_number: None,
        }
    }

    /// Set the reference field matching `kind`
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        let reference = Some(reference.into());
        match self.kind {
            TransactionKind::Deposit => self.ref_number = reference,
            TransactionKind::Withdrawal => self.cheque_number = reference,
            TransactionKind::PettyCash => self.voucher_number = reference,
        }
        self
    }

    /// Check the payload before it is sent to storage
    pub fn validate(&self) -> Result<()> {
        check_fields(
            self.kind,
            self.amount,
            &self.description,
            [&self.ref_number, &self.cheque_number, &self.voucher_number],
        )
    }
}

/// Amount, description and reference rules shared by new and updated records
///
/// `references` is ordered deposit, withdrawal, petty cash. Exactly the field
/// belonging to `kind` must be populated.
fn check_fields(
    kind: TransactionKind,
    amount: Decimal,
    description: &str,
    references: [&Option<String>; 3],
) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::validation("Amount must not be negative"));
    }
    if description.trim().is_empty() {
        return Err(Error::validation("Description is required"));
    }

    for (field, value) in TransactionKind::ALL.into_iter().zip(references) {
        let populated = value.as_deref().is_some_and(|v| !v.trim().is_empty());
        if field == kind && !populated {
            return Err(Error::validation(format!(
                "{} is required for a {}",
                field.reference_label(),
                kind
            )));
        }
        if field != kind && populated {
            return Err(Error::validation(format!(
                "{} does not apply to a {}",
                field.reference_label(),
                kind
            )));
        }
    }
    Ok(())
}

/// Partial update of a transaction; absent fields are left alone
///
/// The type is fixed once a transaction exists, so it has no field here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cheque_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_number: Option<String>,
}

impl TransactionUpdate {
    /// Update that only changes the amount
    pub fn amount(amount: Decimal) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }

    /// True when no field would change (only `updated_at` would move)
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set the reference field that belongs to `kind`
    pub fn reference(kind: TransactionKind, reference: impl Into<String>) -> Self {
        let reference = Some(reference.into());
        let mut update = Self::default();
        match kind {
            TransactionKind::Deposit => update.ref_number = reference,
            TransactionKind::Withdrawal => update.cheque_number = reference,
            TransactionKind::PettyCash => update.voucher_number = reference,
        }
        update
    }

    /// Merge the present fields into `tx` and stamp `updated_at`
    pub fn apply_to(&self, tx: &mut Transaction, now: DateTime<Utc>) {
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(date) = self.date {
            tx.date = date;
        }
        if let Some(category_id) = &self.category_id {
            tx.category_id = category_id.clone();
        }
        if let Some(description) = &self.description {
            tx.description = description.clone();
        }
        if let Some(v) = &self.ref_number {
            tx.ref_number = Some(v.clone());
        }
        if let Some(v) = &self.cheque_number {
            tx.cheque_number = Some(v.clone());
        }
        if let Some(v) = &self.voucher_number {
            tx.voucher_number = Some(v.clone());
        }
        tx.updated_at = now;
    }
}
