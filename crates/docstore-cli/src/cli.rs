use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "docstore",
    about = "Inspect and edit a single-document table store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Document file; overrides the path from --config
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML store configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty document file
    Init(InitArgs),
    /// List the tables in the document
    Tables,
    /// Manage customer records
    Customers(CustomersArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing document
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CustomersArgs {
    #[command(subcommand)]
    pub action: CustomerAction,
}

#[derive(Subcommand)]
pub enum CustomerAction {
    /// List every customer, ordered by id
    List,
    /// Show one customer
    Get { id: i64 },
    /// Add a customer; the id is assigned by the store
    Add { name: String },
    /// Rename an existing customer
    Update { id: i64, name: String },
    /// Delete a customer
    Remove { id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_customer_add_with_globals() {
        let cli = Cli::try_parse_from([
            "docstore", "--db", "shop.json", "customers", "add", "Alice", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("shop.json")));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Customers(CustomersArgs {
                action: CustomerAction::Add { name },
            }) => assert_eq!(name, "Alice"),
            _ => panic!("expected customers add"),
        }
    }

    #[test]
    fn update_requires_numeric_id() {
        assert!(Cli::try_parse_from(["docstore", "customers", "update", "two", "X"]).is_err());
        assert!(Cli::try_parse_from(["docstore", "customers", "update", "2", "X"]).is_ok());
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["docstore", "tables"]).unwrap();
        assert!(!cli.verbose);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.db.is_none());
        assert!(cli.config.is_none());
    }
}
