mod config;
mod graphql;
mod http;

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{DbSettings, HrModule, OrgClock, TracingSink};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    graphql::GraphqlData,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "clinic-server", version, about = "Clinic attendance and payroll server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert default payroll settings that are missing.
    Seed,
    /// Salary batch operations.
    #[command(subcommand)]
    Salary(SalaryCommand),
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Subcommand, Debug)]
enum SalaryCommand {
    /// Generate salaries for all active employees.
    #[command(name = "generate-monthly")]
    GenerateMonthly {
        /// Defaults to the previous month.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        /// Defaults to the year of the previous month.
        #[arg(long)]
        year: Option<i32>,
    },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::from_env())?;
    let cli = Cli::parse();
    let app_config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Seed => run_seed().await,
        Command::Salary(SalaryCommand::GenerateMonthly { month, year }) => {
            generate_monthly(&app_config, month, year).await
        }
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.map_err(Into::into)
}

fn hr_module(pool: &DbPool, config: &AppConfig) -> HrModule {
    HrModule::with_db_settings(pool.clone(), OrgClock::system(config.timezone))
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let schema = graphql::build_schema(GraphqlData {
        hr: hr_module(&pool, &config),
        settings: DbSettings::new(pool.clone()),
        alerts: Arc::new(TracingSink::new(config.timezone)),
    });
    info!(timezone = %config.timezone, "payroll core ready");
    let state = AppState {
        pool,
        schema,
        cors_allowed_origins: config.cors_allowed_origins.clone(),
    };
    http::serve((&cmd).into(), state).await
}

async fn run_seed() -> Result<()> {
    let pool = setup_pool().await?;
    DbSettings::new(pool).seed_defaults().await?;
    info!("default settings seeded");
    Ok(())
}

async fn generate_monthly(config: &AppConfig, month: Option<u32>, year: Option<i32>) -> Result<()> {
    let pool = setup_pool().await?;
    let hr = hr_module(&pool, config);
    let outcome = hr.salaries().generate_for_period(month, year).await?;
    info!(
        month = outcome.period.month(),
        year = outcome.period.year(),
        generated = outcome.generated.len(),
        failed = outcome.failures.len(),
        "monthly salaries generated"
    );
    for failure in &outcome.failures {
        warn!(
            employee_id = %failure.employee_id,
            employee = %failure.employee_name,
            error = %failure.error,
            "employee skipped"
        );
    }
    Ok(())
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `clinic-server migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_salary_batch() {
        let cli = Cli::try_parse_from([
            "clinic-server",
            "salary",
            "generate-monthly",
            "--month",
            "2",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Salary(SalaryCommand::GenerateMonthly {
                month: Some(2),
                year: None
            })
        ));
        assert!(
            Cli::try_parse_from(["clinic-server", "salary", "generate-monthly", "--month", "13"])
                .is_err()
        );
    }
}
