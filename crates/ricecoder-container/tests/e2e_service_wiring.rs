//! End-to-End Test Suite: application wiring through the service container
//!
//! Wires a small application (config, connection pool, repository, request
//! handlers) entirely from definitions registered by service providers, then
//! checks the resulting object graph.

use std::sync::{Arc, Mutex};

use ricecoder_container::{
    Component, ComponentCatalog, Container, ContainerBuilder, DIError, DIResult, Definition,
    ServiceProvider,
};
use serde_json::{json, Value};

struct Pool {
    dsn: String,
    max_connections: u64,
}

impl Component for Pool {
    fn set_property(&mut self, name: &str, value: &Value) -> anyhow::Result<()> {
        match name {
            "max_connections" => {
                self.max_connections = value
                    .as_u64()
                    .ok_or_else(|| anyhow::anyhow!("max_connections must be a positive integer"))?;
                Ok(())
            }
            _ => anyhow::bail!("Pool has no property {}", name),
        }
    }
}

struct SessionRepository {
    pool: Arc<Pool>,
    table: String,
}

impl Component for SessionRepository {}

/// Request handler that records the routes it was mounted on
struct Handler {
    repository: Arc<SessionRepository>,
    routes: Mutex<Vec<String>>,
}

impl Component for Handler {
    fn call(&mut self, method: &str, arguments: &[Value]) -> anyhow::Result<()> {
        match method {
            "mount" => {
                let route = arguments
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow::anyhow!("mount expects a route"))?;
                self.routes.lock().unwrap().push(route.to_string());
                Ok(())
            }
            _ => anyhow::bail!("Handler has no method {}", method),
        }
    }
}

fn catalog() -> ComponentCatalog {
    ComponentCatalog::new()
        .with("db::Pool", |args| {
            Ok(Pool {
                dsn: args.string(0)?,
                max_connections: args.u64(1)?,
            })
        })
        .with("sessions::Repository", |args| {
            Ok(SessionRepository {
                pool: args.service(0)?,
                table: args
                    .optional_string(1)?
                    .unwrap_or_else(|| "sessions".to_string()),
            })
        })
        .with("http::Handler", |args| {
            Ok(Handler {
                repository: args.service(0)?,
                routes: Mutex::new(Vec::new()),
            })
        })
}

struct DatabaseProvider;

impl ServiceProvider for DatabaseProvider {
    fn name(&self) -> &'static str {
        "database"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn register(&self, container: &Container) -> DIResult<()> {
        container.set_definition(
            "db.pool",
            Definition::new("db::Pool")
                .with_argument("%database_url%")
                .with_argument("%pool_size%")
                .private(),
        );
        container.set_alias("database", "db.pool");
        Ok(())
    }
}

struct SessionProvider;

impl ServiceProvider for SessionProvider {
    fn name(&self) -> &'static str {
        "sessions"
    }

    fn register(&self, container: &Container) -> DIResult<()> {
        container.set_definition(
            "sessions.repository",
            Definition::new("sessions::Repository")
                .with_argument("@db.pool")
                .with_argument("%sessions_table%"),
        );
        container.set_definition(
            "sessions.handler",
            Definition::new("http::Handler")
                .with_argument("@sessions.repository")
                .with_call("mount", vec![json!("/sessions")])
                .with_call("mount", vec![json!("/sessions/:id")])
                .unshared(),
        );
        Ok(())
    }

    fn validate(&self, container: &Container) -> DIResult<()> {
        container.get_definition("database").map(|_| ())
    }
}

fn build(pool_size: Value) -> DIResult<Arc<Container>> {
    ContainerBuilder::new()
        .catalog(catalog())
        .parameter("database_url", "postgres://localhost/ricecoder")
        .parameter("pool_size", pool_size)
        .provider(SessionProvider)
        .provider(DatabaseProvider)
        .build()
}

#[test]
fn test_application_graph() {
    let container = build(json!(8)).unwrap();

    let first = container.get_as::<Handler>("sessions.handler").unwrap();
    let second = container.get_as::<Handler>("sessions.handler").unwrap();

    // Handlers are per request, the repository and pool are shared
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.repository, &second.repository));
    assert_eq!(
        *first.routes.lock().unwrap(),
        vec!["/sessions".to_string(), "/sessions/:id".to_string()]
    );

    let repository = container
        .get_as::<SessionRepository>("sessions.repository")
        .unwrap();
    assert_eq!(repository.table, "sessions");
    assert_eq!(repository.pool.dsn, "postgres://localhost/ricecoder");

    // The pool is private: reachable through its alias only
    assert!(matches!(
        container.get("db.pool"),
        Err(DIError::NotAccessible { .. })
    ));
    let pool = container.get_as::<Pool>("database").unwrap();
    assert!(Arc::ptr_eq(&pool, &repository.pool));
}

#[test]
fn test_bad_parameter_fails_construction() {
    let container = build(json!("eight")).unwrap();

    assert!(matches!(
        container.get("sessions.repository"),
        Err(DIError::InvalidArgument { index: 1, .. })
    ));
    // Nothing along the failed chain was cached
    assert!(container.get_as::<Pool>("database").is_err());
}

#[test]
fn test_property_values_are_literal() {
    let container = build(json!(8)).unwrap();
    container.set_definition(
        "db.pool",
        Definition::new("db::Pool")
            .with_argument("%database_url%")
            .with_argument(1)
            .with_property("max_connections", "%pool_size%"),
    );

    // Properties never go through parameter substitution
    match container.get("db.pool") {
        Err(DIError::Component { type_id, source }) => {
            assert_eq!(type_id, "db::Pool");
            assert!(source.to_string().contains("max_connections"));
        }
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_overriding_a_provider_definition() {
    let container = build(json!(8)).unwrap();
    container.set_definition(
        "db.pool",
        Definition::new("db::Pool")
            .with_argument("%database_url%")
            .with_argument(4)
            .with_property("max_connections", 16)
            .private(),
    );
    container.set_parameter("sessions_table", "user_sessions");

    let repository = container
        .get_as::<SessionRepository>("sessions.repository")
        .unwrap();
    assert_eq!(repository.pool.max_connections, 16);
    assert_eq!(repository.table, "user_sessions");
}
