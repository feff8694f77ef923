use anyhow::Context;
use clap::Parser;
use time_entry_manager::config::settings::LocalSettings;
use time_entry_manager::config::{
    ConnectionResolver, DEFAULT_CONNECTION_ENV_KEY, DEFAULT_SETTINGS_FILE,
};
use time_entry_manager::utils::{logger, validation::Validate};
use time_entry_manager::{DataverseConnector, ProvisionOutcome, TableProvisioner};

#[derive(Parser)]
#[command(name = "provision-table")]
#[command(about = "Create the time entry table and its date columns if they do not exist")]
struct Args {
    /// Path to TOML settings file
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: String,

    /// Connection string, takes precedence over the environment and the settings file
    #[arg(long)]
    connection: Option<String>,

    /// Environment variable holding the connection string
    #[arg(long, default_value = DEFAULT_CONNECTION_ENV_KEY)]
    connection_env: String,

    /// Only report whether the table exists
    #[arg(long)]
    check_only: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let resolver = ConnectionResolver::new()
        .with_env_key(args.connection_env.clone())
        .with_settings_path(&args.settings)
        .with_override(args.connection.clone());
    let (settings, load_error) = match resolver.try_load_settings() {
        Ok(settings) => (settings.unwrap_or_default(), None),
        Err(e) => (LocalSettings::default(), Some(e)),
    };

    logger::init_cli_logger(args.verbose, settings.log_level());
    if let Some(e) = load_error {
        tracing::warn!("⚠️ {}", e);
    }

    if let Err(e) = settings.validate() {
        tracing::error!("❌ Settings validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }
    let schema = settings.table_schema();

    let resolved = resolver.resolve();
    tracing::info!("🔗 Connection resolved from {:?}", resolved.source);

    let connector = match DataverseConnector::from_connection_str(&resolved.value) {
        Ok(connector) => connector,
        Err(e) => {
            tracing::error!("❌ Invalid connection string: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let store = match connector.connect_ready().await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("❌ {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(3);
        }
    };

    let provisioner = TableProvisioner::new(&store, &schema);

    if args.check_only {
        let exists = provisioner
            .table_exists()
            .await
            .with_context(|| format!("checking whether table {} exists", schema.table))?;
        println!(
            "{} table {} {}",
            if exists { "✅" } else { "❌" },
            schema.table,
            if exists { "exists" } else { "does not exist" }
        );
        if !exists {
            std::process::exit(2);
        }
        return Ok(());
    }

    match provisioner.ensure_table().await {
        Ok(ProvisionOutcome::AlreadyExists) => println!("✅ Table {} already exists", schema.table),
        Ok(ProvisionOutcome::Created) => println!("✅ Table {} created", schema.table),
        Err(e) => {
            tracing::error!(
                "❌ Provisioning failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    }

    Ok(())
}
