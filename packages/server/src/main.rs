#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Restaurant map server binary.

use restaurant_map_server::config::ServerConfig;

#[actix_web::main]
async fn main() {
    pretty_env_logger::init_custom_env("RUST_LOG");

    if let Err(e) = restaurant_map_server::run_server(ServerConfig::from_env()).await {
        log::error!("Server failed: {e}");
        std::process::exit(1);
    }
}
