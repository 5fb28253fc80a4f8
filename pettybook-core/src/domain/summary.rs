//! Derived figures over the full transaction set
//!
//! Nothing here is persisted. The finance service recomputes the summary
//! after every change.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{Transaction, TransactionKind};

/// Dashboard totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSummary {
    pub total_deposit: Decimal,
    pub total_withdrawal: Decimal,
    pub total_petty_cash: Decimal,
    /// Deposits minus withdrawals
    pub bank_balance: Decimal,
    /// Cash withdrawn minus cash spent from the petty-cash box
    pub cash_in_hand: Decimal,
}

/// Compute the summary in one pass over `transactions`
pub fn calculate_summary(transactions: &[Transaction]) -> FinanceSummary {
    let mut total_deposit = Decimal::ZERO;
    let mut total_withdrawal = Decimal::ZERO;
    let mut total_petty_cash = Decimal::ZERO;

    for tx in transactions {
        match tx.kind {
            TransactionKind::Deposit => total_deposit += tx.amount,
            TransactionKind::Withdrawal => total_withdrawal += tx.amount,
            TransactionKind::PettyCash => total_petty_cash += tx.amount,
        }
    }

    FinanceSummary {
        total_deposit,
        total_withdrawal,
        total_petty_cash,
        bank_balance: total_deposit - total_withdrawal,
        cash_in_hand: total_withdrawal - total_petty_cash,
    }
}

/// The `count` newest transactions by date
///
/// Transactions sharing a date keep their relative order from the input.
pub fn recent_transactions(transactions: &[Transaction], count: usize) -> Vec<Transaction> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    // sort_by is stable
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.into_iter().take(count).cloned().collect()
}

/// Sort newest date first, keeping insertion order among equal dates
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewTransaction, RecordId};
    use chrono::{NaiveDate, Utc};

    fn tx(id: i64, kind: TransactionKind, amount: i64, date: (i32, u32, u32)) -> Transaction {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let new = NewTransaction::new(kind, Decimal::new(amount, 0), date, 1, format!("tx {}", id));
        Transaction::from_new(RecordId::Int(id), &new, Utc::now())
    }

    #[test]
    fn test_summary_totals() {
        let txs = vec![
            tx(1, TransactionKind::Deposit, 100, (2024, 1, 1)),
            tx(2, TransactionKind::Deposit, 200, (2024, 1, 2)),
            tx(3, TransactionKind::Withdrawal, 50, (2024, 1, 3)),
            tx(4, TransactionKind::PettyCash, 20, (2024, 1, 4)),
        ];

        let summary = calculate_summary(&txs);

        assert_eq!(summary.total_deposit, Decimal::new(300, 0));
        assert_eq!(summary.total_withdrawal, Decimal::new(50, 0));
        assert_eq!(summary.bank_balance, Decimal::new(250, 0));
        assert_eq!(summary.total_petty_cash, Decimal::new(20, 0));
        assert_eq!(summary.cash_in_hand, Decimal::new(30, 0));
    }

    #[test]
    fn test_summary_of_nothing_is_zero() {
        assert_eq!(calculate_summary(&[]), FinanceSummary::default());
    }

    #[test]
    fn test_recent_orders_by_date_with_stable_ties() {
        let txs = vec![
            tx(1, TransactionKind::Deposit, 1, (2024, 1, 5)),
            tx(2, TransactionKind::Deposit, 1, (2024, 2, 1)),
            tx(3, TransactionKind::Deposit, 1, (2024, 1, 5)),
            tx(4, TransactionKind::Deposit, 1, (2023, 12, 31)),
        ];

        let recent = recent_transactions(&txs, 3);
        let ids: Vec<_> = recent.iter().map(|t| t.id.clone()).collect();

        assert_eq!(ids, vec![RecordId::Int(2), RecordId::Int(1), RecordId::Int(3)]);
    }

    #[test]
    fn test_recent_with_count_larger_than_input() {
        let txs = vec![tx(1, TransactionKind::Deposit, 1, (2024, 1, 5))];
        assert_eq!(recent_transactions(&txs, 5).len(), 1);
        assert!(recent_transactions(&txs, 0).is_empty());
    }
}
