use anyhow::Context;

use fableweaver::config::AppConfig;
use fableweaver::database::characters::CharacterPoolOps;
use fableweaver::database::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    fableweaver::core::logging::init();
    log::info!("fableweaver v{} starting", fableweaver::VERSION);

    let config = AppConfig::load();
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let db = Database::open(&config.database_path())
        .await
        .context("opening database")?;

    let seeded = db
        .seed(fableweaver::core::characters::catalog::seed_catalog())
        .await
        .context("seeding character pool")?;
    if seeded > 0 {
        log::info!("Seeded character pool with {seeded} templates");
    }

    let pool = db.list_active(None).await.context("listing pool")?;
    println!("fableweaver v{}", fableweaver::VERSION);
    println!("database: {}", config.database_path().display());
    println!("active pool characters: {}", pool.len());
    for character in &pool {
        println!(
            "  {}, {} ({}, used {}x)",
            character.id, character.name, character.role, character.total_usage_count
        );
    }

    Ok(())
}
