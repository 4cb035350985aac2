use dotenvy;

use crate::utils::identity::DEFAULT_IDENTITY_HEADER;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_namespace: String,
    pub db_database: String,
    pub db_password: Option<String>,
    pub db_username: Option<String>,
    pub db_url: String,
    pub server_port: u16,
    pub is_development: bool,
    pub sentry_project_link: Option<String>,
    pub identity_header: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let db_namespace = std::env::var("DB_NAMESPACE").unwrap_or("namespace".to_string());
        let db_database = std::env::var("DB_DATABASE").unwrap_or("database".to_string());
        let db_password = std::env::var("DB_PASSWORD").ok();
        let db_username = std::env::var("DB_USERNAME").ok();
        let db_url = std::env::var("DB_URL").expect("Missing DB_URL in env");

        let server_port = std::env::var("SERVER_PORT").map_or(8080, |p| {
            p.parse::<u16>().expect("SERVER_PORT must be number")
        });

        let is_development = std::env::var("DEVELOPMENT")
            .map(|v| v.eq("true"))
            .unwrap_or(false);

        let sentry_project_link = std::env::var("SENTRY_PROJECT_LINK")
            .ok()
            .filter(|v| !v.is_empty());

        let identity_header =
            std::env::var("IDENTITY_HEADER").unwrap_or(DEFAULT_IDENTITY_HEADER.to_string());

        let default_page_size = std::env::var("DEFAULT_PAGE_SIZE").map_or(20, |t| {
            t.parse::<u32>().expect("DEFAULT_PAGE_SIZE must be number")
        });
        let max_page_size = std::env::var("MAX_PAGE_SIZE").map_or(100, |t| {
            t.parse::<u32>().expect("MAX_PAGE_SIZE must be number")
        });

        Self {
            db_namespace,
            db_database,
            db_password,
            db_username,
            db_url,
            server_port,
            is_development,
            sentry_project_link,
            identity_header,
            default_page_size,
            max_page_size,
        }
    }
}
