//! Command-line and environment configuration.

use clap::Parser;
use syncroom_store::MongoConfig;

/// syncroom relay server
///
/// Every option can also be set through the environment variable shown in
/// `--help`. Command-line flags take precedence.
#[derive(Parser, Clone, Debug)]
#[command(name = "syncroom", version, about = "Real-time relay for shared video-watching rooms")]
pub struct ServerConfig {
    /// MongoDB connection string for the room store
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: String,

    /// Database holding the room collection
    #[arg(long, env = "SYNCROOM_DATABASE", default_value = "MV-LIVE")]
    pub database: String,

    /// Collection of room records
    #[arg(long, env = "SYNCROOM_COLLECTION", default_value = "rooms")]
    pub collection: String,

    /// Port to listen on
    #[arg(long, env = "SOCKET_PORT", default_value = "3001")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "SYNCROOM_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Browser origins allowed to open a socket (comma separated or repeated)
    #[arg(
        long = "allowed-origin",
        env = "SYNCROOM_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values = ["http://localhost:3000", "https://mv-live.vercel.app"]
    )]
    pub allowed_origins: Vec<String>,

    /// Accept upgrades from any origin, ignoring --allowed-origin
    #[arg(long, env = "SYNCROOM_ALLOW_ANY_ORIGIN")]
    pub allow_any_origin: bool,

    /// Enable structured JSON logging
    #[arg(long, env = "SYNCROOM_JSON_LOGS")]
    pub json_logs: bool,
}

impl ServerConfig {
    /// The `host:port` the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// The origin allow-list handed to the server. Empty turns the check off.
    pub fn origins(&self) -> Vec<String> {
        if self.allow_any_origin {
            Vec::new()
        } else {
            self.allowed_origins.clone()
        }
    }

    /// Settings for the MongoDB room store.
    pub fn mongo(&self) -> MongoConfig {
        MongoConfig {
            uri: self.mongodb_uri.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri_only_uses_defaults() {
        let config =
            ServerConfig::try_parse_from(["syncroom", "--mongodb-uri", "mongodb://db:27017"]).unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:3001");
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:3000", "https://mv-live.vercel.app"]
        );
        assert!(!config.json_logs);
        assert_eq!(config.origins(), config.allowed_origins);

        let mongo = config.mongo();
        assert_eq!(mongo.uri, "mongodb://db:27017");
        assert_eq!(mongo.database, "MV-LIVE");
        assert_eq!(mongo.collection, "rooms");
    }

    #[test]
    fn test_parse_origin_list_splits_on_comma() {
        let config = ServerConfig::try_parse_from([
            "syncroom",
            "--mongodb-uri",
            "mongodb://db",
            "--allowed-origin",
            "https://a.example,https://b.example",
            "--port",
            "4000",
        ])
        .unwrap();

        assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.port, 4000);
    }

    #[test]
    fn test_parse_allow_any_origin_disables_check() {
        let config = ServerConfig::try_parse_from([
            "syncroom",
            "--mongodb-uri",
            "mongodb://db",
            "--allowed-origin",
            "https://a.example",
            "--allow-any-origin",
        ])
        .unwrap();

        assert!(config.allow_any_origin);
        assert!(config.origins().is_empty());
    }

    #[test]
    fn test_parse_missing_uri_is_error() {
        // Only meaningful when the variable is not already set for the test run.
        if std::env::var_os("MONGODB_URI").is_some() {
            return;
        }
        assert!(ServerConfig::try_parse_from(["syncroom"]).is_err());
    }
}
