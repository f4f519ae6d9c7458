//! Rank Checker CLI
//!
//! A command-line tool for checking where a website ranks in search results.
//! Supports a one-off mode (check) and a queued mode backed by PostgreSQL
//! (submit/worker plus job inspection commands).

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rank_checker::db::{create_pool_from_config, run_migrations, PgJobStore, PgStoreProvider};
use rank_checker::worker::{setup_signal_handler, WorkerConfig};
use rank_checker::{
    check_rank_with_config, AppConfig, HttpFetcher, Job, RankCheckEngine, RankCheckQuery,
    RankCheckService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "rank-checker")]
#[command(about = "Check where a website ranks for a search term on Google, Bing or Yahoo")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct QueryArgs {
    /// Search engine URL (e.g. https://www.google.com/search)
    #[arg(short, long)]
    search_url: String,

    /// Term to search for
    #[arg(short, long)]
    term: String,

    /// Website to look for in the result citations
    #[arg(short, long)]
    website: String,

    /// Maximum number of results to scan
    #[arg(short, long, default_value = "10")]
    max: i32,
}

impl QueryArgs {
    fn into_query(self) -> RankCheckQuery {
        RankCheckQuery::new(self.search_url, self.term, self.website, self.max)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a rank check immediately without touching the database
    Check {
        #[command(flatten)]
        query: QueryArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a rank check job and wait for it to finish
    Submit {
        #[command(flatten)]
        query: QueryArgs,

        /// Only persist the job; a later `worker` run picks it up
        #[arg(long)]
        detach: bool,

        /// Job timeout in seconds (default: RANK_CHECKER_JOB_TIMEOUT_SECS or 300)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Run the worker, executing queued jobs until Ctrl+C
    Worker {
        /// Job timeout in seconds (default: RANK_CHECKER_JOB_TIMEOUT_SECS or 300)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Do not re-enqueue jobs left in queue by a previous run
        #[arg(long)]
        no_requeue: bool,
    },

    /// List all jobs
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single job
    Show {
        #[arg(short, long)]
        id: i32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show result entries, of one job or of all jobs
    Entries {
        /// Job ID (all entries when omitted)
        #[arg(short, long)]
        id: Option<i32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single result entry
    Entry {
        #[arg(short, long)]
        id: i32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a job and its entries
    Delete {
        #[arg(short, long)]
        id: i32,
    },

    /// Apply database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG takes precedence over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load .env file if present
    dotenvy::dotenv().ok();
    let mut config = AppConfig::from_env()?;

    match cli.command {
        Commands::Check { query, json } => {
            let query = query.into_query();
            info!(
                "Checking '{}' for {} on {}",
                query.term_to_search, query.website_url, query.search_url
            );

            let matches = check_rank_with_config(&query, &config.fetcher).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!(
                    "{} not found in the first {} result(s)",
                    query.website_url, query.maximum_records
                );
            } else {
                println!("=== {} match(es) for {} ===", matches.len(), query.website_url);
                for ranked in &matches {
                    println!("  #{:<4} {}", ranked.rank, ranked.url);
                }
            }
        }

        Commands::Submit {
            query,
            detach,
            timeout,
        } => {
            if let Some(secs) = timeout {
                config.job_timeout = Duration::from_secs(secs);
            }
            let worker_config = WorkerConfig::builder()
                .job_timeout(config.job_timeout)
                .requeue_on_start(false)
                .build();
            let (service, worker) = build_service(&config, &worker_config).await?;

            let job = service.submit(query.into_query()).await?;
            println!("Submitted job {} ({})", job.id, job.status);
            if detach {
                return Ok(());
            }

            let shutdown = worker.shutdown_handle();
            let handle = worker.spawn();

            let job = loop {
                let current = service.get_job(job.id).await?;
                if current.status.is_terminal() {
                    break current;
                }
                if handle.is_finished() {
                    anyhow::bail!("Worker stopped before job {} finished", job.id);
                }
                tokio::time::sleep(Duration::from_millis(500)).await;
            };

            shutdown.cancel();
            handle.await??;

            print_job(&job);
            print_entries(&service, job.id).await?;
        }

        Commands::Worker {
            timeout,
            no_requeue,
        } => {
            info!("Initializing worker...");

            if let Some(secs) = timeout {
                config.job_timeout = Duration::from_secs(secs);
            }
            let worker_config = WorkerConfig::builder()
                .job_timeout(config.job_timeout)
                .requeue_on_start(!no_requeue)
                .build();
            let (service, worker) = build_service(&config, &worker_config).await?;

            if worker_config.requeue_on_start {
                let requeued = service.requeue_pending().await?;
                info!("{} job(s) waiting in queue", requeued);
            }

            // Setup graceful shutdown
            let shutdown = worker.shutdown_handle();
            setup_signal_handler(shutdown);

            worker.run().await?;
        }

        Commands::List { json } => {
            let (service, _) = build_service(&config, &WorkerConfig::default()).await?;
            let jobs = service.list_jobs().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else {
                println!("=== Jobs ({}) ===", jobs.len());
                for job in &jobs {
                    println!(
                        "  [{}] {:<10} '{}' for {} on {}",
                        job.id, job.status, job.term_to_search, job.website_url, job.search_url
                    );
                }
            }
        }

        Commands::Show { id, json } => {
            let (service, _) = build_service(&config, &WorkerConfig::default()).await?;
            let job = service.get_job(id).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                print_job(&job);
            }
        }

        Commands::Entries { id, json } => {
            let (service, _) = build_service(&config, &WorkerConfig::default()).await?;

            match (id, json) {
                (Some(id), false) => print_entries(&service, id).await?,
                (Some(id), true) => {
                    let entries = service.list_entries(id).await?;
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                }
                (None, json) => {
                    let entries = service.list_all_entries().await?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    } else {
                        println!("=== Entries ({}) ===", entries.len());
                        for entry in &entries {
                            println!(
                                "  [{}] job {:<5} #{:<4} {}",
                                entry.id, entry.job_id, entry.rank, entry.url
                            );
                        }
                    }
                }
            }
        }

        Commands::Entry { id, json } => {
            let (service, _) = build_service(&config, &WorkerConfig::default()).await?;
            let entry = service.get_entry(id).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                println!("=== Entry {} ===", entry.id);
                println!("Job: {}", entry.job_id);
                println!("Rank: {}", entry.rank);
                println!("URL: {}", entry.url);
                println!("Created: {}", entry.created_at);
            }
        }

        Commands::Delete { id } => {
            let (service, _) = build_service(&config, &WorkerConfig::default()).await?;
            let job = service.delete_job(id).await?;
            println!("Deleted job {} ({})", job.id, job.status);
        }

        Commands::Migrate => {
            let pool = create_pool_from_config(&config).await?;
            run_migrations(&pool).await?;
            println!("Migrations applied");
        }
    }

    Ok(())
}

/// Wire the service onto PostgreSQL, with a separate pool for the worker
async fn build_service(
    config: &AppConfig,
    worker_config: &WorkerConfig,
) -> Result<(RankCheckService, rank_checker::worker::JobWorker)> {
    let pool = create_pool_from_config(config).await?;
    info!("Database connection established");

    let stores = PgStoreProvider::connect(config).await?;
    let engine = RankCheckEngine::scraping(Arc::new(HttpFetcher::with_config(&config.fetcher)?));

    Ok(RankCheckService::bootstrap(
        Arc::new(PgJobStore::new(pool)),
        Arc::new(stores),
        Arc::new(engine),
        worker_config,
    ))
}

fn print_job(job: &Job) {
    println!("=== Job {} ===", job.id);
    println!("Status: {}", job.status);
    println!("Search URL: {}", job.search_url);
    println!("Term: {}", job.term_to_search);
    println!("Website: {}", job.website_url);
    println!("Maximum records: {}", job.maximum_records);
    if let Some(message) = &job.error_message {
        println!("Error: {}", message);
    }
    println!("Created: {}", job.created_at);
    println!("Updated: {}", job.updated_at);
}

async fn print_entries(service: &RankCheckService, job_id: i32) -> Result<()> {
    let entries = service.list_entries(job_id).await?;
    println!("\n=== Entries ({}) ===", entries.len());
    for entry in &entries {
        println!("  #{:<4} {}", entry.rank, entry.url);
    }
    Ok(())
}
