//! Trades CLI - Lightweight job board client
//!
//! A terminal client for a construction-trades job board: browse and post
//! jobs, apply, chat with the other party, and follow notifications.

mod api;
mod auth;
mod chat;
mod config;
mod models;
mod notify;
mod realtime;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "trades-cli")]
#[command(about = "Lightweight CLI client for a construction-trades job board", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate against the job board backend
    Login {
        /// Account email
        email: String,

        /// Account password (prompted on stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Backend base URL (stored on first login)
        #[arg(long)]
        url: Option<String>,

        /// Publishable API key (stored on first login)
        #[arg(long)]
        key: Option<String>,

        /// Force re-authentication even if a cached token is valid
        #[arg(short, long)]
        force: bool,
    },

    /// Log out and clear cached credentials
    Logout,

    /// Show current authentication status
    Status,

    /// Show current user info (verify auth works)
    Whoami,

    /// List open jobs
    Jobs {
        /// Filter by region
        #[arg(long)]
        region: Option<String>,

        /// Filter by city/district
        #[arg(long)]
        city: Option<String>,

        /// Filter by job type (e.g. full_time, part_time)
        #[arg(long)]
        job_type: Option<String>,

        /// Filter by trade category
        #[arg(long)]
        category: Option<String>,

        /// Keyword search over title/company/description
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of jobs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one job in full
    Job {
        /// Job ID (from `jobs` output)
        id: String,
    },

    /// Post a new job
    Post {
        /// Job title
        title: String,

        /// Company name
        #[arg(long)]
        company: Option<String>,

        /// Job description
        #[arg(short, long)]
        description: Option<String>,

        /// Region
        #[arg(long)]
        region: Option<String>,

        /// City/district
        #[arg(long)]
        city: Option<String>,

        /// Job type (e.g. full_time, part_time)
        #[arg(long, default_value = "full_time")]
        job_type: String,

        /// Trade category (repeatable)
        #[arg(long)]
        category: Vec<String>,

        /// Minimum salary
        #[arg(long)]
        salary_min: Option<f64>,

        /// Maximum salary
        #[arg(long)]
        salary_max: Option<f64>,

        /// Salary period (hourly, monthly, ...)
        #[arg(long, default_value = "hourly")]
        salary_period: String,
    },

    /// Close one of your job postings
    Close {
        /// Job ID
        id: String,
    },

    /// Apply to a job
    Apply {
        /// Job ID
        job_id: String,

        /// Cover note to the employer
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List applicants for one of your jobs
    Applicants {
        /// Job ID
        job_id: String,
    },

    /// List your conversations with unread counts
    Chats,

    /// Read one conversation's history (marks it read)
    Read {
        /// Job ID the conversation is about
        job_id: String,

        /// Counterpart email
        with: String,
    },

    /// Follow one conversation live; stdin lines are sent as messages
    Chat {
        /// Job ID the conversation is about
        job_id: String,

        /// Counterpart email
        with: String,
    },

    /// Send a single message
    Send {
        /// Job ID the message is about
        job_id: String,

        /// Receiver email
        #[arg(short, long)]
        to: String,

        /// Message content
        message: String,
    },

    /// List your saved-search job alerts
    Alerts,

    /// Save the given search criteria as a job alert
    AlertAdd {
        /// Alert name
        name: String,

        /// Region filter ("all" for any)
        #[arg(long)]
        region: Option<String>,

        /// City filter ("all" for any)
        #[arg(long)]
        city: Option<String>,

        /// Job type filter ("all" for any)
        #[arg(long)]
        job_type: Option<String>,

        /// Trade category filter
        #[arg(long)]
        category: Option<String>,

        /// Keyword filter
        #[arg(long)]
        keywords: Option<String>,
    },

    /// Deactivate a job alert
    AlertOff {
        /// Alert ID (from `alerts` output)
        id: String,
    },

    /// Show new-message/new-job notifications (acknowledges them); with
    /// --watch, poll and print badge changes instead
    Notifications {
        /// Keep polling instead of a one-shot check
        #[arg(short, long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Login {
            email,
            password,
            url,
            key,
            force,
        } => {
            auth::login(&email, password, url, key, force).await?;
        }
        Commands::Logout => {
            auth::logout().await?;
        }
        Commands::Status => {
            auth::status().await?;
        }
        Commands::Whoami => {
            api::whoami().await?;
        }
        Commands::Jobs {
            region,
            city,
            job_type,
            category,
            search,
            limit,
        } => {
            let query = api::jobs::JobQuery {
                region,
                city,
                job_type,
                category,
                search,
                limit,
            };
            api::list_jobs(&query).await?;
        }
        Commands::Job { id } => {
            api::show_job(&id).await?;
        }
        Commands::Post {
            title,
            company,
            description,
            region,
            city,
            job_type,
            category,
            salary_min,
            salary_max,
            salary_period,
        } => {
            let body = serde_json::json!({
                "title": title,
                "company": company,
                "description": description,
                "region": region,
                "city": city,
                "job_type": job_type,
                "categories": category,
                "salary_min": salary_min,
                "salary_max": salary_max,
                "salary_period": salary_period,
                "status": "open",
            });
            api::post_job(body).await?;
        }
        Commands::Close { id } => {
            api::close_job(&id).await?;
        }
        Commands::Apply { job_id, note } => {
            api::apply_to_job(&job_id, note).await?;
        }
        Commands::Applicants { job_id } => {
            api::list_applicants(&job_id).await?;
        }
        Commands::Chats => {
            chat::list_chats().await?;
        }
        Commands::Read { job_id, with } => {
            chat::read_conversation(&job_id, &with).await?;
        }
        Commands::Chat { job_id, with } => {
            chat::live::run(&job_id, &with).await?;
        }
        Commands::Send {
            job_id,
            to,
            message,
        } => {
            chat::send_message(&job_id, &to, &message).await?;
        }
        Commands::Alerts => {
            api::list_alerts().await?;
        }
        Commands::AlertAdd {
            name,
            region,
            city,
            job_type,
            category,
            keywords,
        } => {
            api::save_alert(name, region, city, job_type, category, keywords).await?;
        }
        Commands::AlertOff { id } => {
            api::remove_alert(&id).await?;
        }
        Commands::Notifications { watch } => {
            if watch {
                notify::watch().await?;
            } else {
                notify::show().await?;
            }
        }
    }

    Ok(())
}
