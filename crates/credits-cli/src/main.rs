// Credits CLI - command-line client for the CashFree credits API

mod client;
mod display;

use clap::{Parser, Subcommand};
use colored::Colorize;

use client::{ApiClient, OrderParams, TestCreditParams};

/// Inspect and administer a CashFree credits server
#[derive(Parser)]
#[command(name = "credits")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the credits server
    #[arg(
        long,
        global = true,
        env = "CREDITS_API_URL",
        default_value = "http://localhost:3000"
    )]
    url: String,

    /// Shared secret for admin commands
    #[arg(
        long,
        global = true,
        env = "CREDITS_ADMIN_SECRET",
        default_value = "test-credit-key",
        hide_env_values = true
    )]
    secret: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server is up
    Health,
    /// Show total credits and recent activity
    Show {
        /// Number of history entries to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Print the raw ledger as JSON
        #[arg(long)]
        json: bool,
    },
    /// List failed payments
    Failed,
    /// Poll the gateway for an order (credits it if paid)
    Status {
        /// Merchant order id
        order_id: String,
    },
    /// Create a checkout order
    CreateOrder {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
    /// Add a synthetic test credit
    AddTest {
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        method: Option<String>,
    },
    /// Recompute the credit total from recorded payments
    Reconcile,
    /// Clear the whole ledger
    Reset {
        /// Confirm the reset
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.url);

    let result = match cli.command {
        Commands::Health => handle_health(&client),
        Commands::Show { limit, json } => handle_show(&client, limit, json),
        Commands::Failed => handle_failed(&client),
        Commands::Status { order_id } => handle_status(&client, &order_id),
        Commands::CreateOrder {
            amount,
            name,
            email,
            phone,
        } => handle_create_order(
            &client,
            OrderParams {
                amount,
                customer_name: name,
                customer_email: email,
                customer_phone: phone,
            },
        ),
        Commands::AddTest {
            amount,
            email,
            name,
            method,
        } => handle_add_test(
            &client,
            &cli.secret,
            TestCreditParams {
                amount,
                email,
                name,
                method,
            },
        ),
        Commands::Reconcile => handle_reconcile(&client, &cli.secret),
        Commands::Reset { yes } => handle_reset(&client, &cli.secret, yes),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn handle_health(client: &ApiClient) -> anyhow::Result<()> {
    let health = client.health()?;
    println!(
        "{} {} {}",
        "✓".green().bold(),
        health["service"].as_str().unwrap_or("server"),
        health["status"].as_str().unwrap_or("unknown")
    );
    Ok(())
}

fn handle_show(client: &ApiClient, limit: usize, json: bool) -> anyhow::Result<()> {
    if json {
        let raw = client.credits_raw()?;
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    let summary = client.credits()?;
    display::print_summary(&summary, limit);
    Ok(())
}

fn handle_failed(client: &ApiClient) -> anyhow::Result<()> {
    let failed = client.failed_payments()?;
    display::print_failed(&failed.failed_payments);
    Ok(())
}

fn handle_status(client: &ApiClient, order_id: &str) -> anyhow::Result<()> {
    let status = client.payment_status(order_id)?;
    let payments = status["payments"].as_array().cloned().unwrap_or_default();

    match payments.first() {
        Some(latest) => {
            let payment_status = latest["payment_status"].as_str().unwrap_or("UNKNOWN");
            let label = match payment_status {
                "SUCCESS" => payment_status.green().bold(),
                "FAILED" => payment_status.red().bold(),
                _ => payment_status.yellow(),
            };
            println!("  Order:    {}", order_id);
            println!("  Status:   {}", label);
            println!("  Amount:   {}", display::format_amount(&latest["payment_amount"]));
            println!("  Attempts: {}", payments.len());
        }
        None => println!("No payments recorded for {}", order_id),
    }
    Ok(())
}

fn handle_create_order(client: &ApiClient, params: OrderParams) -> anyhow::Result<()> {
    let order = client.create_order(&params)?;
    println!("{} Order created", "✓".green().bold());
    println!();
    println!("  Order id:    {}", order.order_id);
    println!(
        "  Session id:  {}",
        order.payment_session_id.as_deref().unwrap_or("-")
    );
    println!("  Environment: {}", order.environment);
    Ok(())
}

fn handle_add_test(
    client: &ApiClient,
    secret: &str,
    params: TestCreditParams,
) -> anyhow::Result<()> {
    let result = client.add_test_credit(secret, &params)?;
    println!("{} {}", "✓".green().bold(), result.message);
    println!("  Total credits: {}", result.total_credits);
    Ok(())
}

fn handle_reconcile(client: &ApiClient, secret: &str) -> anyhow::Result<()> {
    let report = client.reconcile(secret)?;
    if report.adjusted {
        println!(
            "{} Credit total adjusted: {} -> {}",
            "!".yellow().bold(),
            report.previous_total,
            report.total_credits
        );
    } else {
        println!(
            "{} Ledger consistent ({} credits)",
            "✓".green().bold(),
            report.total_credits
        );
    }
    Ok(())
}

fn handle_reset(client: &ApiClient, secret: &str, yes: bool) -> anyhow::Result<()> {
    if !yes {
        return Err(anyhow::anyhow!(
            "Reset clears every payment and credit. Re-run with --yes to confirm."
        ));
    }

    let result = client.reset(secret)?;
    println!("{} {}", "✓".green().bold(), result.message);
    if !result.persisted {
        println!(
            "  {} the server could not persist the reset; it only applies until restart",
            "!".yellow().bold()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show_defaults() {
        let cli = Cli::try_parse_from(["credits", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Show {
                limit: 10,
                json: false
            }
        ));
    }

    #[test]
    fn test_parse_global_url() {
        let cli = Cli::try_parse_from(["credits", "failed", "--url", "http://example.com:8080"])
            .unwrap();
        assert_eq!(cli.url, "http://example.com:8080");
    }

    #[test]
    fn test_parse_add_test() {
        let cli = Cli::try_parse_from(["credits", "add-test", "--amount", "250", "--method", "manual"])
            .unwrap();
        match cli.command {
            Commands::AddTest { amount, method, .. } => {
                assert_eq!(amount, Some(250.0));
                assert_eq!(method.as_deref(), Some("manual"));
            }
            _ => panic!("expected add-test"),
        }
    }

    #[test]
    fn test_create_order_requires_customer() {
        assert!(Cli::try_parse_from(["credits", "create-order", "--amount", "10"]).is_err());
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = handle_reset(&client, "k", false).unwrap_err();
        assert!(err.to_string().contains("--yes"));
    }
}
