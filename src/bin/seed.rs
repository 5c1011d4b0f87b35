//! Seed script for development — populates a fresh database with sample data.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` (reads .env).

use sqlx::PgPool;
use uuid::Uuid;

const ADMIN_PASSWORD: &str = "Test123!";
const DEV_PASSWORD: &str = "developer123";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Run migrations first
    sqlx::migrate!("./migrations").run(&pool).await?;

    println!("=== ScanHub Seed Script ===");

    let (admin_id, dev_id) = seed_users(&pool).await?;
    let project_id = seed_project(&pool, admin_id, dev_id).await?;
    seed_scan_configuration(&pool, project_id, admin_id).await?;

    println!("\n=== Seed complete! ===");
    println!("Admin login: admin / {ADMIN_PASSWORD}");
    println!("Developer login: dev / {DEV_PASSWORD}");

    Ok(())
}

async fn seed_users(pool: &PgPool) -> anyhow::Result<(Uuid, Uuid)> {
    let admin_hash = scanhub::services::auth::hash_password(ADMIN_PASSWORD)?;
    let dev_hash = scanhub::services::auth::hash_password(DEV_PASSWORD)?;

    let admin_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (username, email, password_hash, is_superuser)
        VALUES ('admin', 'admin@scanhub.local', $1, TRUE)
        ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(&admin_hash)
    .fetch_one(pool)
    .await?;

    let dev_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (username, email, password_hash, is_superuser)
        VALUES ('dev', 'dev@scanhub.local', $1, FALSE)
        ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(&dev_hash)
    .fetch_one(pool)
    .await?;

    println!("[done] Created admin and dev users");
    Ok((admin_id, dev_id))
}

async fn seed_project(pool: &PgPool, admin_id: Uuid, dev_id: Uuid) -> anyhow::Result<Uuid> {
    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM projects WHERE name = 'Demo Project'")
        .fetch_optional(pool)
        .await?;

    if let Some(id) = existing {
        println!("[skip] Demo project already exists");
        return Ok(id);
    }

    let project_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO projects (name, description, owner_id)
        VALUES ('Demo Project', 'Sample project for local development', $1)
        RETURNING id
        "#,
    )
    .bind(admin_id)
    .fetch_one(pool)
    .await?;

    sqlx::query(
        "INSERT INTO memberships (project_id, user_id, role) VALUES ($1, $2, 'manager'), ($1, $3, 'developer')",
    )
    .bind(project_id)
    .bind(admin_id)
    .bind(dev_id)
    .execute(pool)
    .await?;

    println!("[done] Created demo project with admin (manager) and dev (developer)");
    Ok(project_id)
}

async fn seed_scan_configuration(
    pool: &PgPool,
    project_id: Uuid,
    created_by: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO scan_configurations
            (project_id, name, description, has_predefined_targets, target_details, tool_settings, created_by)
        VALUES ($1, 'default', 'Default demo configuration', TRUE, $2, $3, $4)
        ON CONFLICT (project_id, name) DO NOTHING
        "#,
    )
    .bind(project_id)
    .bind(serde_json::json!({
        "type": "repository",
        "value": "https://example.com/demo/repo.git",
        "description": "demo repository"
    }))
    .bind(serde_json::json!({ "tool": "bandit", "severity_threshold": "LOW" }))
    .bind(created_by)
    .execute(pool)
    .await?;

    println!("[done] Created default scan configuration");
    Ok(())
}
