use std::net::TcpListener;

use sqlx::postgres::PgPoolOptions;

use auditpro::configuration::get_configuration;
use auditpro::startup::run;
use auditpro::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    let configuration = get_configuration().expect("Failed to read configuration.");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(&configuration.database.connection_string())
        .expect("Failed to create Postgres connection pool.");

    let address = format!("127.0.0.1:{}", configuration.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!(%address, "starting server");

    run(listener, pool, configuration)?.await
}
