use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use docstore_repo::{CancellationToken, Repository, TableRepository};
use docstore_store::{DocumentStore, FileDocumentStore, StoreConfig};
use docstore_types::{Customer, CustomerDraft};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = store_config(&cli)?;
    match cli.command {
        Command::Init(args) => cmd_init(&config, args),
        Command::Tables => cmd_tables(&config, cli.format).await,
        Command::Customers(args) => cmd_customers(&config, cli.format, args.action).await,
    }
}

/// The config file (if any) with `--db` applied on top.
fn store_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.path = db.clone();
    }
    Ok(config)
}

fn cmd_init(config: &StoreConfig, args: InitArgs) -> anyhow::Result<()> {
    let path = &config.path;
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, "{}\n").with_context(|| format!("writing {}", path.display()))?;
    println!(
        "{} Initialized empty document at {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

async fn cmd_tables(config: &StoreConfig, format: OutputFormat) -> anyhow::Result<()> {
    let store = FileDocumentStore::new(config.clone());
    let document = store.load().await?;

    let counts: Vec<(String, Option<usize>)> = document
        .iter()
        .map(|(table, text)| {
            let count = serde_json::from_str::<Vec<serde_json::Value>>(text)
                .ok()
                .map(|records| records.len());
            (table.clone(), count)
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = counts
                .into_iter()
                .map(|(table, count)| (table, serde_json::json!(count)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        OutputFormat::Text => {
            if counts.is_empty() {
                println!("No tables.");
            }
            for (table, count) in counts {
                match count {
                    Some(n) => println!("  {:<24} {n} records", table.yellow()),
                    None => println!("  {:<24} {}", table.yellow(), "not a record list".red()),
                }
            }
        }
    }
    Ok(())
}

async fn cmd_customers(
    config: &StoreConfig,
    format: OutputFormat,
    action: CustomerAction,
) -> anyhow::Result<()> {
    let store = Arc::new(FileDocumentStore::new(config.clone()));
    let customers: TableRepository<Customer> = TableRepository::new(store);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match action {
        CustomerAction::List => {
            let all = customers.get_all(&cancel).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&all)?),
                OutputFormat::Text if all.is_empty() => println!("No customers."),
                OutputFormat::Text => all.iter().for_each(print_customer),
            }
        }
        CustomerAction::Get { id } => match customers.get_by_id(id, &cancel).await? {
            Some(customer) => match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&customer)?),
                OutputFormat::Text => print_customer(&customer),
            },
            None => bail!("customer {id} not found"),
        },
        CustomerAction::Add { name } => {
            let mut customer = CustomerDraft::named(name).into_customer(0)?;
            if !customers.add(&mut customer, &cancel).await? {
                bail!("customer {} could not be added", customer.name);
            }
            report(format, "Added", &customer)?;
        }
        CustomerAction::Update { id, name } => {
            let customer = CustomerDraft::named(name).into_customer(id)?;
            if !customers.update(customer.clone(), &cancel).await? {
                bail!("customer {id} not found or could not be saved");
            }
            report(format, "Updated", &customer)?;
        }
        CustomerAction::Remove { id } => {
            if !customers.remove(id, &cancel).await? {
                bail!("customer {id} not found or could not be removed");
            }
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "removed": id })),
                OutputFormat::Text => println!("{} Removed customer {}", "✓".green(), id.to_string().cyan()),
            }
        }
    }
    Ok(())
}

fn print_customer(customer: &Customer) {
    println!("  {:>6}  {}", customer.id.to_string().cyan(), customer.name);
}

fn report(format: OutputFormat, verb: &str, customer: &Customer) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(customer)?),
        OutputFormat::Text => println!(
            "{} {verb} customer {} ({})",
            "✓".green().bold(),
            customer.id.to_string().cyan(),
            customer.name
        ),
    }
    Ok(())
}
