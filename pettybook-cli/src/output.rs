//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use rust_decimal::Decimal;

use pettybook_core::services::FinanceService;
use pettybook_core::{FinanceSummary, Transaction, TransactionKind};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format an amount with two decimals and thousands separators
pub fn format_amount(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2));
    let (sign, digits) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}.{}", sign, grouped, frac)
}

fn kind_label(kind: TransactionKind) -> String {
    match kind {
        TransactionKind::Deposit => "deposit".green().to_string(),
        TransactionKind::Withdrawal => "withdrawal".red().to_string(),
        TransactionKind::PettyCash => "petty-cash".yellow().to_string(),
    }
}

/// Transactions as a table, category ids resolved to names
pub fn transactions_table(finance: &FinanceService, transactions: &[Transaction]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["ID", "Date", "Type", "Reference", "Category", "Description", "Amount"]);

    for tx in transactions {
        table.add_row(vec![
            Cell::new(&tx.id),
            Cell::new(tx.date),
            Cell::new(kind_label(tx.kind)),
            Cell::new(tx.reference().unwrap_or("-")),
            Cell::new(finance.category_name(&tx.category_id)),
            Cell::new(&tx.description),
            Cell::new(format_amount(tx.amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Totals and balances as a two-column table
pub fn summary_table(summary: &FinanceSummary) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let rows = [
        ("Total deposits", summary.total_deposit),
        ("Total withdrawals", summary.total_withdrawal),
        ("Bank balance", summary.bank_balance),
        ("Total petty cash", summary.total_petty_cash),
        ("Cash in hand", summary.cash_in_hand),
    ];
    for (label, amount) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format_amount(amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
