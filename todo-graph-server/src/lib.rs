pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub mongo_uri: String,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default = "default_database_name")]
        pub database_name: String,
        #[serde(default = "default_collection_name")]
        pub collection_name: String,
    }

    impl Config {
        /// Loads configuration from environment variables.
        ///
        /// A `.env` file in the working directory is read first when present.
        pub fn from_env() -> anyhow::Result<Self> {
            if let Err(err) = dotenv::dotenv() {
                tracing::debug!("No .env file loaded: {}", err);
            }

            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_database_name() -> String {
        "cluster0".to_string()
    }

    fn default_collection_name() -> String {
        "todos".to_string()
    }

}
pub mod graphql;
pub mod todo;
pub mod web;
