//! Process bootstrap for `csvql-server`: argument parsing, `.env` loading,
//! filesystem catalog discovery, logging setup, server startup. Mirrors
//! `datafusion-postgres-cli/src/main.rs`'s `Opt`/`env_logger`/`serve` shape.

mod discovery;

use std::path::PathBuf;
use std::sync::Arc;

use csvql_core::Engine;
use csvql_server::{AuthManager, ServerOptions};
use env_logger::Env;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "csvql-server", about = "A read-only SQL query service over CSV-backed tables")]
struct Opt {
    /// Root directory containing one subdirectory per database.
    #[structopt(long, env = "CSVQL_DATA_ROOT")]
    data_root: PathBuf,

    /// Path to the accounts.json file (defaults to <data-root>/accounts.json).
    #[structopt(long, env = "CSVQL_ACCOUNTS_PATH")]
    accounts_path: Option<PathBuf>,

    #[structopt(long, env = "CSVQL_HOST", default_value = "127.0.0.1")]
    host: String,

    #[structopt(long, env = "CSVQL_PORT", default_value = "8080")]
    port: u16,

    #[structopt(long, env = "CSVQL_JWT_SECRET")]
    jwt_secret: String,

    #[structopt(long, env = "CSVQL_JWT_EXPIRE_MINUTES", default_value = "15")]
    jwt_expire_minutes: i64,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("csvql_cli=info,csvql_server=info"))
        .init();

    let opt = Opt::from_args();

    let catalog = discovery::discover_catalog(&opt.data_root)?;
    log::info!(
        "discovered {} database(s) under {}",
        catalog.list_databases().len(),
        opt.data_root.display()
    );

    let accounts_path = opt.accounts_path.unwrap_or_else(|| opt.data_root.join("accounts.json"));
    let auth = AuthManager::load(&accounts_path, opt.jwt_secret, opt.jwt_expire_minutes)?;

    let engine = Engine::new(Arc::new(catalog));
    let options = ServerOptions::default().with_host(opt.host).with_port(opt.port);

    csvql_server::serve(options, engine, auth).await
}
