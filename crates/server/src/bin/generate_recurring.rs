//! Cron entrypoint: materialize upcoming recurring goal instances.
//!
//! Intended to run once a day, e.g.:
//!
//! ```text
//! 0 6 * * *  generate-recurring
//! ```
//!
//! Exits non-zero when the pass fails so the scheduler can alert.

#[tokio::main]
async fn main() {
    server::telemetry::init_telemetry();

    let pool = server::db::create_pool();
    server::db::run_migrations(&pool).await;

    match server::recurrence::generate_recurring_goals(&pool).await {
        Ok(generated) => {
            tracing::info!(generated = generated, "Recurring goal generation succeeded");
        }
        Err(err) => {
            tracing::error!(error = %err, "Recurring goal generation failed");
            std::process::exit(1);
        }
    }
}
