use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub service_account_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("JOKE_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("JOKE_API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("JOKE_API_PORT must be a valid port number"),
            service_account_path: env::var("SERVICE_ACCOUNT_PATH")
                .expect("SERVICE_ACCOUNT_PATH must point at a service account key file"),
        }
    }
}
