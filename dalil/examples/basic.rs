//! Basic example of the Dalil service locator.

use dalil::prelude::*;
use serde_json::json;
use std::sync::Arc;

// === Define your services ===

struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[{}] {msg}", self.prefix);
    }
}

struct Database {
    url: String,
    logger: Arc<ConsoleLogger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

// Normally read from services.yaml
const SERVICES: &str = r#"
logger:
  constructor: NewConsoleLogger
  arguments: [app]
database:
  constructor: NewDatabase
  arguments: ["%logger%", "postgres://localhost/myapp"]
users:
  constructor: NewUserRepository
  arguments: ["%database%"]
"#;

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("dalil=debug")
        .init();

    let mut locator = Locator::builder()
        .source(InlineSource::new(Format::Yaml, SERVICES))
        .constructor(
            "NewConsoleLogger",
            Constructor::variadic(|args: Arguments| ConsoleLogger {
                prefix: args[0].as_str().unwrap_or("LOG").to_uppercase(),
            }),
        )
        .constructor(
            "NewDatabase",
            Constructor::fallible(|args: Arguments| -> std::result::Result<Database, BoxError> {
                Ok(Database {
                    logger: args[0].service::<ConsoleLogger>().ok_or("logger expected")?,
                    url: args[1].as_str().ok_or("database url expected")?.to_string(),
                })
            }),
        )
        .constructor(
            "NewUserRepository",
            Constructor::fallible(|args: Arguments| -> std::result::Result<UserRepository, BoxError> {
                Ok(UserRepository {
                    db: args[0].service::<Database>().ok_or("database expected")?,
                })
            }),
        )
        .build();

    println!("✅ Locator built: {locator:?}");

    // Built on first request, together with database and logger
    let users = locator.get_as::<UserRepository>("users")?;
    println!("👤 {}", users.find_user(42));

    // Same instance on every later request
    let again = locator.get_as::<UserRepository>("users")?;
    println!("🔁 Shared instance: {}", Arc::ptr_eq(&users, &again));

    // Services can also be configured at runtime
    locator.set_config("audit_db", "NewDatabase", vec![json!("%logger%"), json!("sqlite://audit.db")])?;
    println!("📋 audit_db depends on {:?}", locator.dependencies_of("audit_db")?);

    // Lenient mode: failures come back as values
    if let Err(err) = locator.get("mailer") {
        println!("⚠️  {err}");
    }

    println!("\n🎉 Everything works!");
    Ok(())
}
