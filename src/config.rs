use dotenv::dotenv;
use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    /// Payment provider credentials; the client runs in simulated mode when absent.
    pub payment_api_url: Option<String>,
    pub payment_secret_key: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok(); // Load .env file if present
        Ok(Self {
            port: env::var("PORT").unwrap_or_else(|_| "5000".to_string()).parse()?,
            jwt_secret: env::var("JWT_SECRET")?,
            payment_api_url: env::var("PAYMENT_API_URL").ok(),
            payment_secret_key: env::var("PAYMENT_SECRET_KEY").ok(),
        })
    }
}
