// Terminal formatting for ledger data

use colored::Colorize;
use serde_json::Value;

use crate::client::{CreditsSummary, HistoryRow, PaymentRow};

/// Renders an amount that the server may send as a string or a number.
pub fn format_amount(amount: &Value) -> String {
    match amount {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => "-".to_string(),
    }
}

/// Shortens an ISO 8601 timestamp to "YYYY-MM-DD HH:MM:SS".
pub fn short_timestamp(timestamp: &str) -> String {
    let trimmed: String = timestamp.chars().take(19).collect();
    trimmed.replace('T', " ")
}

/// "+1" for credits, "0" for recorded failures.
pub fn change_label(change: i64) -> String {
    if change > 0 {
        format!("+{}", change)
    } else {
        change.to_string()
    }
}

fn history_line(row: &HistoryRow) -> String {
    let change = change_label(row.change);
    let change = if row.change > 0 {
        change.green().bold()
    } else {
        change.red()
    };
    let kind = match row.event_type.as_str() {
        "success" => row.event_type.green(),
        "failed" => row.event_type.red(),
        _ => row.event_type.normal(),
    };

    format!(
        "  {:>3}  {:<8} {}  {:>10}  {}",
        change,
        kind,
        short_timestamp(&row.timestamp).dimmed(),
        format_amount(&row.amount),
        row.order_id
    )
}

fn payment_line(row: &PaymentRow) -> String {
    format!(
        "  {}  {:>10}  {:<10} {}  {}",
        short_timestamp(&row.timestamp).dimmed(),
        format_amount(&row.amount),
        row.payment_method,
        row.order_id,
        row.transaction_id.dimmed()
    )
}

pub fn print_summary(summary: &CreditsSummary, limit: usize) {
    println!(
        "{} {}",
        "Total credits:".bold(),
        summary.total_credits.to_string().green().bold()
    );
    println!("  Payments:        {}", summary.payment_history.len());
    println!("  Failed payments: {}", summary.total_failed_payments);

    let recorded = summary.payment_history.len() as u64;
    if recorded != summary.total_credits {
        println!(
            "  {} total does not match {} recorded payments; run `credits reconcile`",
            "!".yellow().bold(),
            recorded
        );
    }

    if summary.credit_history.is_empty() {
        println!();
        println!("  {}", "No credit history yet".dimmed());
        return;
    }

    println!();
    println!("{}", "Recent activity:".bold());
    for row in summary.credit_history.iter().rev().take(limit) {
        println!("{}", history_line(row));
    }
}

pub fn print_failed(failed: &[PaymentRow]) {
    if failed.is_empty() {
        println!("{} No failed payments", "✓".green().bold());
        return;
    }

    println!("{} {}", "Failed payments:".bold(), failed.len().to_string().red());
    for row in failed {
        println!("{}", payment_line(row));
        if let Some(details) = &row.error_details {
            println!("      {}", details.to_string().dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(&json!("249.50")), "249.50");
        assert_eq!(format_amount(&json!(100)), "100");
        assert_eq!(format_amount(&Value::Null), "-");
    }

    #[test]
    fn test_short_timestamp() {
        assert_eq!(
            short_timestamp("2024-03-01T10:15:30.123Z"),
            "2024-03-01 10:15:30"
        );
        assert_eq!(short_timestamp(""), "");
    }

    #[test]
    fn test_change_label() {
        assert_eq!(change_label(1), "+1");
        assert_eq!(change_label(0), "0");
    }
}
