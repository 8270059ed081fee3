use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;

use mindshub::database::{InMemoryStore, PlatformStore, SqliteStore};
use mindshub::services::mailer::LogMailer;
use mindshub::state::AppState;
use mindshub::web::build_router;

#[tokio::main]
async fn main() {
    // Laad .env bestand
    dotenv().ok();

    // 1. Start logging
    tracing_subscriber::fmt::init();

    // 2. Kies de opslag: SQLite als DATABASE_URL gezet is, anders in-memory
    let store: Arc<dyn PlatformStore> = match env::var("DATABASE_URL") {
        Ok(db_url) => {
            println!("Verbinden met database: {}", db_url);
            let pool = SqlitePoolOptions::new()
                .connect(&db_url)
                .await
                .expect("Kan niet verbinden met DB");
            let store = SqliteStore::new(pool);
            store
                .ensure_schema()
                .await
                .expect("Kan schema niet aanmaken");
            Arc::new(store)
        }
        Err(_) => {
            println!("DATABASE_URL niet gezet, in-memory opslag actief");
            Arc::new(InMemoryStore::new())
        }
    };

    // 3. Bouw de hele applicatie
    let state = AppState::new(store, Arc::new(LogMailer));
    let app = build_router(state);

    // 4. Start de server (met fallback poort)
    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Kan host/port niet parsen");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!(
                "⚠️  Kon niet binden op {}: {}. Probeer fallback {}:{}",
                addr,
                e,
                host,
                port + 1
            );
            let fallback: SocketAddr = format!("{}:{}", host, port + 1)
                .parse()
                .expect("Kan fallback niet parsen");
            tokio::net::TcpListener::bind(fallback)
                .await
                .expect("Kan niet binden op fallback poort")
        }
    };

    let bound_addr = listener.local_addr().unwrap();
    println!("🚀 MindsHub registratie-API draait op http://{}", bound_addr);

    axum::serve(listener, app).await.unwrap();
}
