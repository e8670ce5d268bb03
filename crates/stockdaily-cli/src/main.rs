use std::io::Write;

use anyhow::Context;
use clap::Parser;
use stockdaily_core::{Config, Error, StockDaily};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stockdaily")]
#[command(version, about = "Watchlist client for the StockDaily news digest service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create an account and log in
    Register {
        email: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Log in
    Login {
        email: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Log out and forget the stored session
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Show the watchlist
    List,
    /// Search for companies by ticker or name
    Search {
        /// Search query
        query: String,
    },
    /// Add a company to the watchlist
    Follow {
        /// Ticker symbol, e.g. AAPL
        ticker: String,
    },
    /// Remove a company from the watchlist
    Unfollow {
        /// Ticker symbol or watchlist entry id
        target: String,
    },
    /// Daily digest operations
    #[command(subcommand)]
    Digest(DigestCommands),
}

#[derive(clap::Subcommand)]
enum DigestCommands {
    /// Show today's digest
    Today,
    /// List past digests
    History {
        #[arg(long, default_value_t = 30)]
        limit: u32,
    },
    /// Ask the server to (re)generate today's digest
    Generate {
        /// Also send the digest email
        #[arg(long)]
        send_email: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockdaily=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    tracing::debug!("using backend at {}", config.api.base_url);
    let mut app = StockDaily::new(&config)?;

    let outcome = run(&cli.command, &mut app).await;
    if let Err(err) = outcome {
        if let Some(Error::NotLoggedIn) = err.downcast_ref::<Error>() {
            eprintln!("Please log in first: stockdaily login <email>");
            std::process::exit(1);
        }
        return Err(err);
    }
    Ok(())
}

async fn run(command: &Commands, app: &mut StockDaily) -> anyhow::Result<()> {
    match command {
        Commands::Register {
            email,
            name,
            password,
        } => {
            let password = resolve_password(password)?;
            let identity = app
                .register(email, &password, name.clone())
                .await
                .map_err(friendly)?;
            println!("Registered and logged in as {}", identity.email);
        }
        Commands::Login { email, password } => {
            let password = resolve_password(password)?;
            let identity = app.login(email, &password).await.map_err(friendly)?;
            println!("Logged in as {}", identity.email);
        }
        Commands::Logout => {
            app.logout();
            println!("Logged out.");
        }
        Commands::Whoami => match app.whoami() {
            Some(identity) => {
                let name = identity.name.as_deref().unwrap_or("-");
                println!("{}  ({})", identity.email, name);
            }
            None => println!("Not logged in."),
        },
        Commands::List => {
            app.load_watchlist().await.map_err(friendly)?;
            let companies = app.watchlist.companies();
            if companies.is_empty() {
                println!("Your watchlist is empty. Try: stockdaily follow AAPL");
            } else {
                for company in companies {
                    let industry = company.industry.as_deref().unwrap_or("-");
                    println!("{:<8} {:<40} {}", company.ticker, company.name, industry);
                }
                println!("{} companies", companies.len());
            }
        }
        Commands::Search { query } => {
            tracing::info!("searching for: {}", query);
            app.search_companies(query).await.map_err(friendly)?;
            if let Some(message) = app.search.last_error() {
                println!("{}", message);
            } else if app.search.results().is_empty() {
                println!("No companies found for \"{}\"", query);
            } else {
                for result in app.search.results() {
                    let industry = result.industry.as_deref().unwrap_or("-");
                    println!("{:<8} {:<40} {}", result.ticker, result.name, industry);
                }
            }
        }
        Commands::Follow { ticker } => {
            app.load_watchlist().await.map_err(friendly)?;
            app.search_companies(ticker).await.map_err(friendly)?;

            let candidate = app
                .search
                .results()
                .iter()
                .find(|r| r.ticker.eq_ignore_ascii_case(ticker))
                .or_else(|| app.search.results().first())
                .cloned()
                .with_context(|| format!("No company found for \"{}\"", ticker))?;

            let added = app.add_from_search(&candidate).await.map_err(friendly)?;
            println!("Now following {} ({})", added.name, added.ticker);
        }
        Commands::Unfollow { target } => {
            app.load_watchlist().await.map_err(friendly)?;
            let entry = app
                .watchlist
                .companies()
                .iter()
                .find(|c| c.ticker.eq_ignore_ascii_case(target) || c.id == *target)
                .cloned()
                .with_context(|| format!("\"{}\" is not on your watchlist", target))?;

            app.remove_company(&entry.id).await.map_err(friendly)?;
            println!("Stopped following {} ({})", entry.name, entry.ticker);
        }
        Commands::Digest(digest) => match digest {
            DigestCommands::Today => {
                let digest = app.today_digest().await.map_err(friendly)?;
                print_digest(&digest);
            }
            DigestCommands::History { limit } => {
                let digests = app.digest_history(*limit).await.map_err(friendly)?;
                if digests.is_empty() {
                    println!("No digests yet.");
                }
                for digest in digests {
                    let sent = match digest.sent_at {
                        Some(at) => format!("sent {}", at.format("%Y-%m-%d %H:%M UTC")),
                        None => "not sent".to_string(),
                    };
                    println!("{}  {}", digest.date, sent);
                }
            }
            DigestCommands::Generate { send_email } => {
                let digest = app.generate_digest(*send_email).await.map_err(friendly)?;
                println!("Digest for {} generated.", digest.date);
                print_digest(&digest);
            }
        },
    }

    Ok(())
}

/// Keep server-provided messages verbatim and let structural errors keep
/// their context for `main` to inspect.
fn friendly(err: Error) -> anyhow::Error {
    match &err {
        Error::Api(api_err) => {
            let message = api_err.user_message("The server is unavailable. Please try again.");
            anyhow::Error::from(err).context(message)
        }
        _ => err.into(),
    }
}

fn resolve_password(flag: &Option<String>) -> anyhow::Result<String> {
    if let Some(password) = flag {
        return Ok(password.clone());
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Render a digest document. The content shape is owned by the digest job;
/// we print the per-company summaries when they are present and fall back to
/// raw JSON otherwise.
fn print_digest(digest: &stockdaily_api::Digest) {
    println!("Digest for {}", digest.date);

    let Some(content) = &digest.content else {
        println!("(no content)");
        return;
    };

    let company_news = content.get("company_news").and_then(|v| v.as_object());
    match company_news {
        Some(sections) if !sections.is_empty() => {
            for (ticker, section) in sections {
                let title = section
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or(ticker);
                println!("\n== {} ==", title);
                if let Some(summary) = section.get("summary").and_then(|v| v.as_str()) {
                    println!("{}", summary);
                }
            }
        }
        _ => match serde_json::to_string_pretty(content) {
            Ok(raw) => println!("{}", raw),
            Err(_) => println!("(unreadable content)"),
        },
    }
}
