use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;

/// Secrets shorter than this are accepted, with a warning.
const RECOMMENDED_SECRET_LENGTH: usize = 32;

/// Application configuration, read from `Rocket.toml` and `ROCKET_*`
/// environment variables, and placed in managed state.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Token lifetime in seconds.
    auth_ttl: u32,
    jwt_secret: String,
}

impl Config {
    /// How long an issued token stays valid.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Key used to sign and verify JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Reject settings the server cannot run with.
    fn check(&self) -> Result<(), &'static str> {
        if self.jwt_secret.is_empty() {
            return Err("`jwt_secret` must not be empty");
        }
        if self.auth_ttl == 0 {
            return Err("`auth_ttl` must be at least one second");
        }
        Ok(())
    }
}

/// Loads [`Config`] during ignition, refusing to launch if it is missing or unusable.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if let Err(reason) = config.check() {
            error!("Invalid application config: {reason}");
            return Err(rocket);
        }
        if config.jwt_secret.len() < RECOMMENDED_SECRET_LENGTH {
            warn!("`jwt_secret` is shorter than {RECOMMENDED_SECRET_LENGTH} bytes");
        }
        info!("Auth tokens expire after {}h", config.auth_ttl().num_hours());

        Ok(rocket.manage(config))
    }
}

fn default_db_name() -> String {
    "polls".to_string()
}

/// Where the polls and users live.
#[derive(Deserialize)]
struct DbConfig {
    db_uri: String,
    #[serde(default = "default_db_name")]
    db_name: String,
}

/// Connects to MongoDB during ignition, ensures the indexes exist, and
/// manages both the `Client` and the `Database`.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Connecting to database `{}`...", config.db_name);
        let client = match MongoClient::with_uri_str(&config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Invalid database URI: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        // The client connects lazily; index creation is the first round trip.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to reach database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        Ok(rocket.manage(client).manage(db))
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                auth_ttl: 60,
                jwt_secret: "test secret".to_string(),
            }
        }
    }
}
