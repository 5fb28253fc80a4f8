//! Starter data written into empty stores

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::{Category, NewTransaction, TransactionKind};

/// Illustrative transactions for a fresh in-memory store
///
/// Categories are looked up by name; an entry whose category is missing is
/// skipped.
pub fn sample_transactions(categories: &[Category]) -> Vec<NewTransaction> {
    let today = Utc::now().date_naive();
    let yesterday = today - Duration::days(1);

    let samples: [(TransactionKind, i64, NaiveDate, &str, &str, &str); 3] = [
        (TransactionKind::Deposit, 5000, today, "Salary", "Monthly salary", "DEP001"),
        (TransactionKind::Withdrawal, 1500, today, "Rent", "Office rent payment", "CHQ101"),
        (TransactionKind::PettyCash, 200, yesterday, "Office Supplies", "Office stationery", "PET001"),
    ];

    samples
        .into_iter()
        .filter_map(|(kind, amount, date, category, description, reference)| {
            let category = categories.iter().find(|c| c.name == category)?;
            Some(
                NewTransaction::new(kind, Decimal::new(amount, 0), date, category.id.clone(), description)
                    .with_reference(reference),
            )
        })
        .collect()
}
