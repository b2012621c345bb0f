//! # CLI Command Implementations

use crate::api;
use crate::config::{AppConfig, BackendKind};
use crate::error::AppError;
use carelink_core::{EntityKind, QueryEngine, Role, User};

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), AppError> {
    println!("CareLink Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:    {}", config.server.addr());
    println!("  Backend:    {}", config.storage.backend);
    if config.storage.backend == BackendKind::Redb {
        println!("  Database:   {}", config.storage.path.display());
    }
    println!(
        "  Prediction: {}",
        config.prediction.url.as_deref().unwrap_or("(fallback list only)")
    );
    println!();
    println!("Endpoints:");
    println!("  POST /api    - Execute a query or mutation");
    println!("  GET  /health - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(config).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show record counts per entity kind.
pub fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), AppError> {
    let store = config.storage.open()?;
    let counts = EntityKind::ALL
        .into_iter()
        .map(|kind| store.count(kind).map(|n| (kind, n)))
        .collect::<Result<Vec<_>, _>>()?;

    if json_mode {
        let records: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(kind, n)| (kind.type_name().to_string(), serde_json::json!(n)))
            .collect();
        let output = serde_json::json!({
            "database": config.storage.path.to_string_lossy(),
            "backend": config.storage.backend.to_string(),
            "persistent": store.is_persistent(),
            "records": records,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("CareLink Status");
    println!("===============");
    println!("Backend:  {}", config.storage.backend);
    if store.is_persistent() {
        println!("Database: {}", config.storage.path.display());
    }
    println!();
    for (kind, n) in counts {
        println!("{:<18} {}", format!("{}:", kind.type_name()), n);
    }

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new database.
pub fn cmd_init(config: &AppConfig, force: bool) -> Result<(), AppError> {
    let path = &config.storage.path;
    if config.storage.backend == BackendKind::Memory {
        println!("Memory backend selected; nothing to initialize");
        return Ok(());
    }

    if path.exists() {
        if !force {
            return Err(AppError::Io(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| AppError::Io(format!("Cannot remove {}: {e}", path.display())))?;
    }

    config.storage.open()?;
    println!("Initialized new redb database at {}", path.display());
    Ok(())
}

// =============================================================================
// USERS COMMAND
// =============================================================================

/// List registered users, newest first.
pub fn cmd_users(config: &AppConfig, json_mode: bool, role: Option<&str>) -> Result<(), AppError> {
    let role = role.map(str::parse::<Role>).transpose()?;
    let store = config.storage.open()?;
    let users = QueryEngine::new(&store).list::<User>(role.map(Role::as_str))?;

    if json_mode {
        let output: Vec<serde_json::Value> = users
            .iter()
            .map(|u| {
                serde_json::json!({
                    "id": u.id,
                    "username": u.username,
                    "email": u.email,
                    "role": u.role,
                    "firstName": u.first_name,
                    "lastName": u.last_name,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found");
        return Ok(());
    }
    for user in &users {
        println!(
            "{:<34} {:<8} {} {} <{}>",
            user.id.as_str(),
            user.role.as_str(),
            user.first_name,
            user.last_name,
            user.email
        );
    }
    Ok(())
}
