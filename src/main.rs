//! Patron command line
//!
//! Each subcommand does what one dashboard page does: fetch a snapshot, or
//! have the backend build a transaction, sign it with the local keypair and
//! wait for confirmation. Toasts are printed to stderr as they appear.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use patron::config::{Config, LoggingConfig};
use patron::error_parser::{classify, normalize, ErrorReport};
use patron::notifications::{ToastEvent, ToastKind};
use patron::polling::Cooldown;
use patron::types::{
    format_base_units, format_timestamp, ui_to_base_units, CreateVestingRequest,
    InitiateSwapRequest, PostTweetRequest, RoleKind,
};
use patron::wallet::{KeypairWallet, WalletAdapter};
use patron::Dashboard;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SOL_DECIMALS: u8 = 9;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "patron.toml", env = "PATRON_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the user profile
    Profile,
    /// Show token metadata
    TokenInfo,
    /// Show the wallet's token balance
    Balance,
    /// Show the token lock position
    MiningStatus,
    /// Poll the token lock position until interrupted
    WatchMining {
        /// Poll period in seconds (defaults to the configured period)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Lock tokens for yield
    Lock {
        /// Amount in tokens, e.g. 12.5
        amount: String,
        /// Lock duration in days
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Unlock tokens after the lock period
    Unlock,
    /// Claim accumulated yield
    ClaimYield,
    /// Show the vesting schedule
    Vesting,
    /// Create a vesting schedule
    CreateVesting {
        beneficiary: String,
        /// Amount in tokens
        amount: String,
        #[arg(long, default_value_t = 0)]
        cliff_days: u32,
        #[arg(long)]
        duration_days: u32,
    },
    /// Claim vested tokens
    ClaimVested,
    /// OTC swaps
    Swaps {
        #[command(subcommand)]
        action: SwapCommand,
    },
    /// Role selection
    Role {
        #[command(subcommand)]
        action: RoleCommand,
    },
    /// Apply to become a patron
    ApplyPatron { message: String },
    /// List pending patron applications
    Applications,
    /// Register the wallet address with the backend
    SetWallet,
    /// Tweet mining
    Tweet {
        #[command(subcommand)]
        action: TweetCommand,
    },
    /// Show accumulated rewards
    Rewards,
    /// Claim every pending reward in one transaction
    BatchClaim,
    /// Print the user-facing message for an error (text or JSON)
    ExplainError { input: String },
    /// Show the RPC node version
    RpcVersion,
}

#[derive(Subcommand, Debug)]
enum SwapCommand {
    /// Open offers
    Active,
    /// Offers created by this user
    Mine,
    /// Offer tokens for SOL
    Initiate {
        /// Token amount offered
        token_amount: String,
        /// SOL asked
        sol_amount: String,
        /// Restrict the offer to one buyer
        #[arg(long)]
        buyer: Option<String>,
    },
    Accept { swap_id: String },
    Cancel { swap_id: String },
}

#[derive(Subcommand, Debug)]
enum RoleCommand {
    Show,
    Select { role: RoleKind },
    /// Keep refreshing the role and print each change
    Watch {
        /// Refresh period in seconds (defaults to the configured period)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum TweetCommand {
    /// Show tweet mining status
    Status {
        /// Count down the posting cooldown
        #[arg(long)]
        wait: bool,
    },
    Templates,
    Post {
        content: String,
        #[arg(long)]
        template_id: Option<String>,
    },
    Claim { tweet_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::ExplainError { input } = &args.command {
        explain_error(input);
        return Ok(());
    }

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    init_logging(args.verbose, args.json_logs, &config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), api = %config.api.base_url, rpc = %config.rpc.url, "Starting patron");

    let wallet = KeypairWallet::from_file(&config.keypair_path()).context("Failed to load wallet")?;
    let wallet: Arc<dyn WalletAdapter> = Arc::new(wallet);
    let dashboard = Dashboard::from_config(&config, wallet)?;

    let printer = tokio::spawn(print_toasts(dashboard.notifications().subscribe()));
    let outcome = run(&dashboard, &config, args.command).await;

    dashboard.notifications().shutdown();
    drop(dashboard);
    let _ = printer.await;

    outcome.map_err(|err| anyhow::anyhow!(normalize(&ErrorReport::from(&err))))
}

async fn run(dashboard: &Dashboard, config: &Config, command: Command) -> Result<(), patron::DashboardError> {
    match command {
        Command::Profile => print_json(&dashboard.profile().await?),
        Command::TokenInfo => print_json(&dashboard.token_info().await?),
        Command::Balance => match dashboard.token_balance().await? {
            Some(balance) => println!(
                "{} (raw {}, {} decimals)",
                balance.ui_amount.map(|a| a.to_string()).unwrap_or_else(|| balance.amount.clone()),
                balance.amount,
                balance.decimals
            ),
            None => println!("0 (no token account for mint {})", dashboard.token_mint()),
        },
        Command::MiningStatus => print_json(&dashboard.mining_status().await?),
        Command::WatchMining { interval_secs } => {
            let period = Duration::from_secs(interval_secs.unwrap_or(config.polling.mining_status_secs));
            let decimals = dashboard.token_info().await?.decimals;
            watch_mining(dashboard, period, decimals).await?;
        }
        Command::Lock { amount, days } => {
            let decimals = dashboard.token_info().await?.decimals;
            let amount = parse_amount(dashboard, &amount, decimals)?;
            print_signature(dashboard.lock_tokens(amount, days).await?);
        }
        Command::Unlock => print_signature(dashboard.unlock_tokens().await?),
        Command::ClaimYield => print_signature(dashboard.claim_yield().await?),
        Command::Vesting => {
            let schedule = dashboard.vesting_schedule().await?;
            let now = chrono::Utc::now().timestamp();
            print_json(&schedule);
            println!(
                "vested {} / claimable {} (cliff {}, end {})",
                schedule.vested_amount(now),
                schedule.claimable_amount(now),
                format_timestamp(schedule.cliff_time),
                format_timestamp(schedule.end_time)
            );
        }
        Command::CreateVesting { beneficiary, amount, cliff_days, duration_days } => {
            let decimals = dashboard.token_info().await?.decimals;
            let total_amount = parse_amount(dashboard, &amount, decimals)?;
            let request = CreateVestingRequest { beneficiary, total_amount, cliff_days, duration_days };
            print_signature(dashboard.create_vesting(request).await?);
        }
        Command::ClaimVested => print_signature(dashboard.claim_vested().await?),
        Command::Swaps { action } => match action {
            SwapCommand::Active => print_json(&dashboard.active_swaps().await?),
            SwapCommand::Mine => print_json(&dashboard.my_swaps().await?),
            SwapCommand::Initiate { token_amount, sol_amount, buyer } => {
                let decimals = dashboard.token_info().await?.decimals;
                let request = InitiateSwapRequest {
                    token_amount: parse_amount(dashboard, &token_amount, decimals)?,
                    sol_amount: parse_amount(dashboard, &sol_amount, SOL_DECIMALS)?,
                    buyer,
                };
                print_signature(dashboard.initiate_swap(request).await?);
            }
            SwapCommand::Accept { swap_id } => print_signature(dashboard.accept_swap(&swap_id).await?),
            SwapCommand::Cancel { swap_id } => print_signature(dashboard.cancel_swap(&swap_id).await?),
        },
        Command::Role { action } => match action {
            RoleCommand::Show => print_json(&dashboard.role().await?),
            RoleCommand::Select { role } => print_json(&dashboard.select_role(role).await?),
            RoleCommand::Watch { interval_secs } => {
                let period = Duration::from_secs(interval_secs.unwrap_or(config.polling.role_secs));
                watch_role(dashboard, period).await?;
            }
        },
        Command::ApplyPatron { message } => print_json(&dashboard.apply_patron(&message).await?),
        Command::Applications => print_json(&dashboard.pending_applications().await?),
        Command::SetWallet => println!("{}", dashboard.set_wallet_address().await?),
        Command::Tweet { action } => match action {
            TweetCommand::Status { wait } => {
                let status = dashboard.tweet_mining_status().await?;
                print_json(&status);
                if wait && status.cooldown_remaining_secs > 0 {
                    let tick = Duration::from_millis(config.polling.cooldown_tick_ms);
                    let cooldown = Cooldown::start(status.cooldown_remaining_secs, tick)
                        .map_err(patron::DashboardError::from)?;
                    countdown(cooldown).await;
                }
            }
            TweetCommand::Templates => print_json(&dashboard.tweet_templates().await?),
            TweetCommand::Post { content, template_id } => {
                let posted = dashboard.post_tweet(PostTweetRequest { template_id, content }).await?;
                print_json(&posted);
            }
            TweetCommand::Claim { tweet_id } => print_signature(dashboard.claim_tweet_reward(&tweet_id).await?),
        },
        Command::Rewards => {
            let rewards = dashboard.accumulated_rewards().await?;
            print_json(&rewards);
        }
        Command::BatchClaim => print_signature(dashboard.batch_claim().await?),
        Command::RpcVersion => println!("{}", dashboard.rpc_version().await?),
        Command::ExplainError { input } => explain_error(&input),
    }
    Ok(())
}

fn parse_amount(dashboard: &Dashboard, raw: &str, decimals: u8) -> Result<u64, patron::DashboardError> {
    ui_to_base_units(raw, decimals).map_err(|msg| {
        dashboard.notifications().show_error(msg.clone());
        patron::DashboardError::InvalidInput(msg)
    })
}

async fn watch_mining(dashboard: &Dashboard, period: Duration, decimals: u8) -> Result<(), patron::DashboardError> {
    let (poller, mut rx) = dashboard.watch_mining_status(period)?;
    info!(poller = poller.name(), period_secs = period.as_secs(), "Watching mining status, Ctrl-C to stop");
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(status) = rx.borrow_and_update().clone() {
                    let now = chrono::Utc::now().timestamp();
                    println!(
                        "locked {} | yield {} | unlock in {}s",
                        format_base_units(status.locked_amount, decimals),
                        format_base_units(status.accumulated_yield, decimals),
                        status.seconds_until_unlock(now)
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn watch_role(dashboard: &Dashboard, period: Duration) -> Result<(), patron::DashboardError> {
    let mut rx = dashboard.roles().subscribe();
    let poller = dashboard.watch_role(period)?;
    info!(poller = poller.name(), period_secs = period.as_secs(), "Watching role, Ctrl-C to stop");
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(role) = rx.borrow_and_update().clone() {
                    print_json(&role);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn countdown(cooldown: Cooldown) {
    let mut rx = cooldown.watch();
    while !cooldown.is_ready() {
        if rx.changed().await.is_err() {
            break;
        }
        eprint!("\rNext tweet in {:>4}s", *rx.borrow_and_update());
    }
    eprintln!("\rReady to tweet      ");
}

async fn print_toasts(mut events: broadcast::Receiver<ToastEvent>) {
    loop {
        match events.recv().await {
            Ok(ToastEvent::Shown(toast)) => {
                let marker = match toast.kind {
                    ToastKind::Success => "✔",
                    ToastKind::Error => "✖",
                    ToastKind::Warning => "!",
                    ToastKind::Info => "i",
                };
                let title = toast.title.unwrap_or_else(|| toast.kind.default_title().to_string());
                eprintln!("{} {}: {}", marker, title, toast.message);
            }
            Ok(ToastEvent::Dismissed(_)) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn explain_error(input: &str) {
    let report = match serde_json::from_str::<serde_json::Value>(input) {
        Ok(value) if value.is_object() => ErrorReport::from(&value),
        _ => ErrorReport::from(input),
    };
    println!("{}", normalize(&report));
    println!("class: {:?}", classify(&report));
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(err) => eprintln!("Failed to render output: {}", err),
    }
}

fn print_signature(signature: patron::Signature) {
    println!("{}", signature);
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json_flag: bool, config: &LoggingConfig) -> Result<()> {
    let default_filter = if verbose {
        "patron=debug,info".to_string()
    } else {
        config.filter.clone().unwrap_or_else(|| "patron=info,warn".to_string())
    };
    let json = json_flag || config.json;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
        }))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
