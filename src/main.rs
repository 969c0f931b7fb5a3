use std::path::PathBuf;

use clap::{Parser, Subcommand};

use feedwatch::config::Config;
use feedwatch::db::Store;
use feedwatch::error::{AppError, Result};
use feedwatch::feed::RemoteFeed;
use feedwatch::pipeline::Refresher;
use feedwatch::services::{HttpExtractor, SmtpMailer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a subscriber
    AddSubscriber { name: String, email: String },
    /// Remove a subscriber along with their search terms and alert history
    RemoveSubscriber { email: String },
    /// List registered subscribers
    ListSubscribers,
    /// Add a search term for a subscriber
    AddTerm { email: String, term: String },
    /// Remove a search term from a subscriber
    RemoveTerm { email: String, term: String },
    /// List a subscriber's search terms
    ListTerms { email: String },
    /// Register subscribers from a file of comma-separated `name,email` lines
    ImportSubscribers { file: PathBuf },
    /// Add search terms for a subscriber from a file, one term per line
    ImportTerms { email: String, file: PathBuf },
    /// Run one discovery, extract, match and notify cycle
    Refresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let store = Store::open(&config.db_path).await?;

    match cli.command {
        Commands::AddSubscriber { name, email } => {
            add_subscriber(&store, name.trim(), &normalize_email(&email)).await?;
        }

        Commands::RemoveSubscriber { email } => {
            store.remove_subscriber(&normalize_email(&email)).await?;
            println!("Removed {}", email);
        }

        Commands::ListSubscribers => {
            let subscribers = store.list_subscribers().await?;
            if subscribers.is_empty() {
                println!("No subscribers registered");
            } else {
                for subscriber in subscribers {
                    println!("{} -- {}", subscriber.name, subscriber.email);
                }
            }
        }

        Commands::AddTerm { email, term } => {
            store
                .add_search_term(&normalize_email(&email), &normalize_term(&term))
                .await?;
        }

        Commands::RemoveTerm { email, term } => {
            store
                .remove_search_term(&normalize_email(&email), &normalize_term(&term))
                .await?;
        }

        Commands::ListTerms { email } => {
            let email = normalize_email(&email);
            match store.get_search_terms(&email).await {
                Ok(terms) if terms.is_empty() => {
                    println!("No search terms for {}", email);
                }
                Ok(terms) => {
                    for term in terms {
                        println!("{}", term);
                    }
                }
                Err(AppError::UnknownSubscriber(_)) => {
                    println!("{} is not registered", email);
                }
                Err(e) => return Err(e),
            }
        }

        Commands::ImportSubscribers { file } => {
            let content = std::fs::read_to_string(&file)?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                let Some((name, email)) = line.split_once(',') else {
                    eprintln!("Skipping malformed line: {}", line);
                    continue;
                };
                add_subscriber(&store, name.trim(), &normalize_email(email)).await?;
            }
        }

        Commands::ImportTerms { email, file } => {
            let email = normalize_email(&email);
            let content = std::fs::read_to_string(&file)?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                store.add_search_term(&email, &normalize_term(line)).await?;
            }
        }

        Commands::Refresh => {
            let smtp = config.smtp.as_ref().ok_or_else(|| {
                AppError::Config(format!(
                    "no [smtp] table in {}; mail settings are required for refresh",
                    Config::config_path().display()
                ))
            })?;

            let refresher = Refresher::new(
                &store,
                RemoteFeed::new(config.feed_url.clone()),
                HttpExtractor::new(),
                SmtpMailer::new(smtp)?,
            );
            let report = refresher.refresh().await?;
            println!(
                "Recorded {} new items, sent {} alerts, skipped {}",
                report.new_items, report.alerts_sent, report.skipped
            );
        }
    }

    Ok(())
}

async fn add_subscriber(store: &Store, name: &str, email: &str) -> Result<()> {
    match store.add_subscriber(name, email).await {
        Ok(_) => {
            println!("Added {} -- {}", name, email);
            Ok(())
        }
        Err(AppError::DuplicateKey(_)) => {
            println!("{} is already registered", email);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Emails are compared case-insensitively by convention: lowercased at every
/// input boundary, stored as given.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Terms are uppercased at write time so matching is a plain substring test.
fn normalize_term(term: &str) -> String {
    term.trim().to_uppercase()
}
