// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created with `IF NOT EXISTS`; set `RESET_DB=true` to drop and
/// recreate the schema.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    } else {
        info!("ℹ️  Skipping table drop (RESET_DB not set). Tables will be created if they don't exist.");
    }

    create_job_offer_tables(pool).await?;
    create_candidate_tables(pool).await?;
    create_analysis_tables(pool).await?;
    create_indexes(pool).await?;

    info!("✅ Database migration completed successfully!");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Reverse dependency order
    let tables = vec![
        "ai_processing_logs",
        "cv_analyses",
        "applications",
        "applicants",
        "job_offers",
    ];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_job_offer_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_offers (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            offer_type TEXT NOT NULL DEFAULT 'job' CHECK (offer_type IN ('job', 'internship')),
            description TEXT NOT NULL,
            requirements TEXT NOT NULL,
            location TEXT NOT NULL,
            contract_type TEXT NOT NULL,
            salary_range TEXT,
            company_name TEXT NOT NULL,
            company_description TEXT,
            experience_level TEXT NOT NULL,
            skills_required TEXT,
            application_deadline TEXT,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive', 'closed')),
            positions_available INTEGER NOT NULL DEFAULT 1 CHECK (positions_available >= 1),
            contact_email TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_candidate_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applicants (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            phone TEXT NOT NULL,
            linkedin_url TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY,
            applicant_id TEXT NOT NULL,
            job_offer_id TEXT NOT NULL,
            cv_path TEXT NOT NULL,
            cover_letter_path TEXT,
            cv_text TEXT,
            cover_letter_text TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'analyzed', 'rejected')),
            admin_notes TEXT,
            submitted_at TEXT NOT NULL,
            analyzed_at TEXT,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY (applicant_id) REFERENCES applicants(id),
            FOREIGN KEY (job_offer_id) REFERENCES job_offers(id),
            CHECK ((status = 'analyzed') = (analyzed_at IS NOT NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_analysis_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cv_analyses (
            id TEXT PRIMARY KEY,
            application_id TEXT NOT NULL,
            job_offer_id TEXT NOT NULL,
            analysis_status TEXT NOT NULL DEFAULT 'pending'
                CHECK (analysis_status IN ('pending', 'processing', 'completed', 'failed')),
            profile_summary TEXT,
            key_skills TEXT,
            education TEXT,
            experience TEXT,
            languages TEXT,
            strengths TEXT,
            weaknesses TEXT,
            job_match_score INTEGER CHECK (job_match_score BETWEEN 0 AND 100),
            job_match_analysis TEXT,
            recommendations TEXT,
            overall_rating TEXT,
            next_steps TEXT,
            raw_ai_response TEXT,
            tokens_used INTEGER,
            cost_estimate REAL,
            error_message TEXT,
            analyzed_at TEXT,
            failed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (application_id) REFERENCES applications(id) ON DELETE CASCADE,
            FOREIGN KEY (job_offer_id) REFERENCES job_offers(id),
            CHECK ((analysis_status = 'completed') = (analyzed_at IS NOT NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ai_processing_logs (
            id TEXT PRIMARY KEY,
            cv_analysis_id TEXT NOT NULL,
            api_provider TEXT NOT NULL,
            model TEXT NOT NULL,
            tokens_used INTEGER,
            processing_time_ms INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('success', 'failed')),
            error_message TEXT,
            processed_at TEXT NOT NULL,
            FOREIGN KEY (cv_analysis_id) REFERENCES cv_analyses(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = vec![
        // Job offer indexes
        "CREATE INDEX IF NOT EXISTS idx_job_offers_status ON job_offers(status)",
        "CREATE INDEX IF NOT EXISTS idx_job_offers_created_at ON job_offers(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_job_offers_status_created ON job_offers(status, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_job_offers_type ON job_offers(offer_type)",
        "CREATE INDEX IF NOT EXISTS idx_job_offers_location ON job_offers(location)",
        // Application indexes
        "CREATE INDEX IF NOT EXISTS idx_applications_applicant ON applications(applicant_id)",
        "CREATE INDEX IF NOT EXISTS idx_applications_job_offer ON applications(job_offer_id)",
        "CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status)",
        "CREATE INDEX IF NOT EXISTS idx_applications_submitted_at ON applications(submitted_at)",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_live_pair ON applications(applicant_id, job_offer_id) WHERE deleted_at IS NULL AND status IN ('pending', 'processing', 'analyzed')",
        // Analysis indexes
        "CREATE INDEX IF NOT EXISTS idx_cv_analyses_status ON cv_analyses(analysis_status)",
        "CREATE INDEX IF NOT EXISTS idx_cv_analyses_application ON cv_analyses(application_id)",
        // At most one live analysis per (application, job offer); failed rows don't count
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_cv_analyses_live_pair ON cv_analyses(application_id, job_offer_id) WHERE analysis_status != 'failed'",
        "CREATE INDEX IF NOT EXISTS idx_ai_processing_logs_analysis ON ai_processing_logs(cv_analysis_id)",
    ];

    for index in indexes {
        sqlx::query(index).execute(pool).await?;
    }

    info!("📊 Created performance indexes");
    Ok(())
}
