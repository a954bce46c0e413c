use onchain_dashboard_lib::config::Config;
use onchain_dashboard_lib::core::store::INDICATORS_KEY;
use onchain_dashboard_lib::db;
use onchain_dashboard_lib::models::PersistedIndicator;
use sqlx::sqlite::SqlitePoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let db_path = config.db_path;

    println!("Connecting to: {:?}", db_path);

    if !db_path.exists() {
        println!("DB not found, nothing persisted yet.");
        return Ok(());
    }

    let url = format!("sqlite://{}?mode=ro", db_path.to_string_lossy());
    let pool = SqlitePoolOptions::new().connect(&url).await?;

    let Some(blob) = db::get_setting(&pool, INDICATORS_KEY).await? else {
        println!("Slot '{}' is empty.", INDICATORS_KEY);
        return Ok(());
    };

    match serde_json::from_str::<Vec<PersistedIndicator>>(&blob) {
        Ok(records) => {
            println!("{:<16} | {:>14} | {:>14} | {:<8} | {}", "Id", "Value", "Value2", "Status", "Description");
            println!("{}", "-".repeat(80));
            for r in records {
                let value2 = r.value2.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
                let status = serde_json::to_value(r.status)?;
                println!(
                    "{:<16} | {:>14} | {:>14} | {:<8} | {}",
                    r.id,
                    r.value,
                    value2,
                    status.as_str().unwrap_or("?"),
                    r.description
                );
            }
        }
        Err(e) => {
            println!("Slot '{}' is corrupt ({}), the dashboard will start from defaults.", INDICATORS_KEY, e);
            println!("{}", blob);
        }
    }

    Ok(())
}
