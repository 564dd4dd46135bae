//! Administrative commands for the knowledge-graph backend.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kgviz_auth::UserService;
use kgviz_config::AppConfig;
use kgviz_database::Database;
use kgviz_graph::{GraphService, ImportService};
use kgviz_models::auth::RegisterRequest;
use kgviz_models::{ConflictResolution, ImportReport, ImportRequest, ImportStrategy};
use kgviz_observability::{init_tracing, TracingConfig};

use kgviz_backend::admin::read_graph_file;

#[derive(Parser)]
#[command(name = "kg-admin")]
#[command(about = "Knowledge graph administration", long_about = None)]
struct Cli {
    /// Database URL; overrides DATABASE_URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a `{nodes, links}` JSON file into one domain
    Import {
        /// Path to the JSON file containing graph data
        file: PathBuf,

        /// Domain for the imported data
        #[arg(long, default_value = "default")]
        domain: String,

        /// Relationship strategy: merge, skip, overwrite or create_new
        #[arg(long, default_value = "merge")]
        strategy: ImportStrategy,

        /// Entity id conflict handling: auto_id, merge_data or skip
        #[arg(long, default_value = "auto_id")]
        conflict_resolution: ConflictResolution,

        /// Plan the import and report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Print every conflict and the id mapping
        #[arg(short, long)]
        verbose: bool,
    },

    /// Load the demo graph into the default domain
    Seed,

    /// Apply pending schema migrations
    Migrate,

    /// Create a superuser account
    CreateSuperuser {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "KGVIZ_SUPERUSER_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(url) = cli.database_url {
        config.database.database_url = url;
    }

    init_tracing(TracingConfig::for_service("kg-admin").with_level("warn"));
    config.validate().context("invalid configuration")?;

    let db = Database::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    db.migrate().await.context("failed to run migrations")?;

    match cli.command {
        Commands::Import {
            file,
            domain,
            strategy,
            conflict_resolution,
            dry_run,
            verbose,
        } => {
            let request = import_request(&file, domain, strategy, conflict_resolution)?;
            if verbose {
                println!("Found {} nodes and {} links", request.nodes.len(), request.links.len());
                println!("Domain: {}", request.domain);
                println!("Strategy: {}", request.strategy);
                println!("Conflict resolution: {}", request.conflict_resolution);
                if dry_run {
                    println!("DRY RUN MODE - no data will be imported");
                }
            }

            let service = ImportService::new(db);
            let report = if dry_run {
                service.dry_run(&request).await?
            } else {
                service.import(&request).await?
            };
            print_report(&report, verbose);
        }
        Commands::Seed => {
            let summary = GraphService::new(db).seed().await?;
            println!(
                "Seeded {} entities, {} new relationships",
                summary.entities, summary.relationships_created
            );
        }
        Commands::Migrate => {
            println!("Migrations applied");
        }
        Commands::CreateSuperuser {
            username,
            email,
            password,
        } => {
            let users = UserService::new(db, config.auth.bcrypt_cost);
            let user = users
                .create_superuser(&RegisterRequest::new(&username, &email, &password))
                .await?;
            println!("Superuser {} created with id {}", user.username, user.id);
        }
    }

    Ok(())
}

fn import_request(
    file: &Path,
    domain: String,
    strategy: ImportStrategy,
    conflict_resolution: ConflictResolution,
) -> Result<ImportRequest> {
    if !file.exists() {
        bail!("File not found: {}", file.display());
    }
    let graph = read_graph_file(file)?;

    let mut request = ImportRequest::new(domain);
    request.nodes = graph.nodes;
    request.links = graph.links;
    request.strategy = strategy;
    request.conflict_resolution = conflict_resolution;
    Ok(request)
}

fn print_report(report: &ImportReport, verbose: bool) {
    let stats = &report.import_stats;
    let title = if report.dry_run { "Dry run results" } else { "Import results" };

    println!("{} (domain: {})", title, report.domain);
    println!(
        "  Entities: {} created, {} updated, {} skipped, {} conflicts, {} errors",
        stats.entities.created,
        stats.entities.updated,
        stats.entities.skipped,
        stats.entities.conflicts,
        stats.entities.errors
    );
    println!(
        "  Relationships: {} created, {} updated, {} skipped, {} errors",
        stats.relationships.created,
        stats.relationships.updated,
        stats.relationships.skipped,
        stats.relationships.errors
    );

    if verbose {
        for conflict in &stats.conflicts {
            match serde_json::to_string(conflict) {
                Ok(line) => println!("  conflict: {}", line),
                Err(e) => eprintln!("  conflict could not be printed: {}", e),
            }
        }
        for (incoming, stored) in &report.entity_id_mapping {
            if incoming != stored {
                println!("  id mapping: {} -> {}", incoming, stored);
            }
        }
    }
}
