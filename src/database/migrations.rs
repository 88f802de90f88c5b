//! Database Migrations
//!
//! Handles schema creation and versioned migrations.

use log::{info, warn};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Current database schema version
const SCHEMA_VERSION: i32 = 3;

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version = get_current_version(pool).await?;

    if current_version < SCHEMA_VERSION {
        info!(
            "Running database migrations from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        for version in (current_version + 1)..=SCHEMA_VERSION {
            run_migration(pool, version).await?;
        }
        info!("Database migrations completed successfully");
    }

    Ok(())
}

/// Get the current schema version
async fn get_current_version(pool: &SqlitePool) -> Result<i32, sqlx::Error> {
    let result = sqlx::query("SELECT MAX(version) as version FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(result
        .and_then(|row| row.try_get::<i32, _>("version").ok())
        .unwrap_or(0))
}

/// Run a specific migration version
async fn run_migration(pool: &SqlitePool, version: i32) -> Result<(), sqlx::Error> {
    let (name, sql) = match version {
        1 => ("initial_schema", MIGRATION_V1),
        2 => ("phase_logs", MIGRATION_V2),
        3 => ("score_reports", MIGRATION_V3),
        _ => {
            warn!("Unknown migration version: {}", version);
            return Ok(());
        }
    };

    info!("Applying migration v{}: {}", version, name);

    for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement.trim()).execute(pool).await?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(version)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Migration v1: Initial schema
const MIGRATION_V1: &str = r#"
-- Shared character pool
CREATE TABLE IF NOT EXISTS pool_characters (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    archetype TEXT NOT NULL,
    emotional_nature TEXT NOT NULL,
    gender TEXT NOT NULL,
    visual_profile TEXT NOT NULL,
    image_url TEXT,
    max_screen_time INTEGER NOT NULL DEFAULT 30,
    available_chapters TEXT NOT NULL DEFAULT '[]',
    canon_settings TEXT NOT NULL DEFAULT '[]',
    recent_usage_count INTEGER NOT NULL DEFAULT 0,
    total_usage_count INTEGER NOT NULL DEFAULT 0,
    last_used_at TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);

-- User avatars with evolving traits
CREATE TABLE IF NOT EXISTS avatars (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    gender TEXT NOT NULL,
    visual_profile TEXT NOT NULL,
    image_url TEXT,
    traits TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Append-only trait change records
CREATE TABLE IF NOT EXISTS avatar_memories (
    id TEXT PRIMARY KEY,
    avatar_id TEXT NOT NULL,
    content_id TEXT NOT NULL,
    content_type TEXT NOT NULL,
    applied TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(avatar_id, content_id, content_type)
);
CREATE INDEX IF NOT EXISTS idx_memories_avatar ON avatar_memories(avatar_id);

-- Generated stories
CREATE TABLE IF NOT EXISTS stories (
    id TEXT PRIMARY KEY,
    avatar_id TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    genre TEXT NOT NULL,
    setting TEXT NOT NULL,
    length TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'generating',
    fairy_tale_title TEXT,
    planned_chapters INTEGER NOT NULL DEFAULT 0,
    child_age INTEGER NOT NULL DEFAULT 0,
    cover_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_stories_avatar ON stories(avatar_id);
CREATE INDEX IF NOT EXISTS idx_stories_created ON stories(created_at);

-- Story chapters
CREATE TABLE IF NOT EXISTS chapters (
    id TEXT PRIMARY KEY,
    story_id TEXT NOT NULL,
    chapter_index INTEGER NOT NULL,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    image_url TEXT,
    image_prompt TEXT,
    audio_url TEXT,
    UNIQUE(story_id, chapter_index)
);
CREATE INDEX IF NOT EXISTS idx_chapters_story ON chapters(story_id)
"#;

/// Migration v2: Durable phase logs
const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS phase_logs (
    id TEXT PRIMARY KEY,
    story_id TEXT NOT NULL,
    phase TEXT NOT NULL,
    provenance TEXT NOT NULL DEFAULT 'live',
    request TEXT NOT NULL,
    response TEXT NOT NULL,
    duration_ms INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_phase_logs_story ON phase_logs(story_id);
CREATE INDEX IF NOT EXISTS idx_phase_logs_phase ON phase_logs(phase, created_at)
"#;

/// Migration v3: Persisted quality reports
const MIGRATION_V3: &str = r#"
CREATE TABLE IF NOT EXISTS score_reports (
    test_id TEXT PRIMARY KEY,
    story_id TEXT NOT NULL,
    overall_score REAL NOT NULL,
    report TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_score_reports_story ON score_reports(story_id)
"#;
