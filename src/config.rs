use std::{env, fmt::Display, str::FromStr};

pub const DEFAULT_DAILY_ARTICLE_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub pool_size: u32,
    pub admin_usernames: Vec<String>,
    pub anonymous_id_salt: String,
    pub daily_article_limit: i64,
    pub log_level: log::LevelFilter,
    pub log_file: Option<String>,
}

impl Config {
    /// Reads configuration from the process environment. Call
    /// `dotenv::dotenv()` first if a `.env` file should be honoured.
    /// Notices are returned for logging once the logger is set up.
    pub fn from_env() -> (Self, Vec<Notice>) {
        let mut notices = Vec::new();
        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");
        let anonymous_id_salt = var("ANONYMOUS_ID_SALT").unwrap_or_else(|_| {
            notices.push(Notice::warn(
                "ANONYMOUS_ID_SALT not set, anonymous ids are unsalted",
            ));
            String::new()
        });

        let config = Config {
            database_url,
            pool_size: try_load("DATABASE_POOL_SIZE", "10", &mut notices),
            admin_usernames: parse_list(
                &var("ADMIN_USERNAMES").unwrap_or_default(),
            ),
            anonymous_id_salt,
            daily_article_limit: try_load(
                "CONTENT_DAILY_ARTICLE_LIMIT",
                &DEFAULT_DAILY_ARTICLE_LIMIT.to_string(),
                &mut notices,
            ),
            log_level: try_load("LOG_LEVEL", "info", &mut notices),
            log_file: var("LOG_FILE").ok(),
        };
        (config, notices)
    }

    pub fn is_admin(&self, username: &str) -> bool {
        self.admin_usernames.iter().any(|admin| admin == username)
    }
}

/// A message about the environment, held until the logger exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: log::Level,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Notice {
        Notice {
            level: log::Level::Info,
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Notice {
        Notice {
            level: log::Level::Warn,
            message: message.into(),
        }
    }

    pub fn log(&self) {
        log::log!(self.level, "{}", self.message);
    }
}

fn var(key: &str) -> Result<String, env::VarError> {
    env::var(key).map(|v| v.trim().to_string())
}

fn try_load<T: FromStr>(
    key: &str,
    default: &str,
    notices: &mut Vec<Notice>,
) -> T
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|_| {
        notices.push(Notice::info(format!(
            "{} not set, using default: {}",
            key, default
        )));
        default.to_string()
    });
    match raw.parse() {
        Ok(value) => value,
        Err(e) => panic!("Invalid {} value {:?}: {}", key, raw, e),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_list_ignores_blanks_and_whitespace() {
        assert_eq!(
            parse_list(" alice, ,bob ,"),
            vec!["alice".to_string(), "bob".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn is_admin_matches_exact_usernames() {
        let config = Config {
            database_url: String::new(),
            pool_size: 1,
            admin_usernames: vec!["alice".into()],
            anonymous_id_salt: String::new(),
            daily_article_limit: DEFAULT_DAILY_ARTICLE_LIMIT,
            log_level: log::LevelFilter::Info,
            log_file: None,
        };
        assert!(config.is_admin("alice"));
        assert!(!config.is_admin("Alice"));
        assert!(!config.is_admin("bob"));
    }

    #[test]
    fn try_load_falls_back_to_default_and_says_so() {
        let mut notices = Vec::new();
        let size: u32 =
            try_load("NEWSDESK_TEST_UNSET_POOL_SIZE", "7", &mut notices);
        assert_eq!(size, 7);
        assert_eq!(
            notices,
            vec![Notice::info(
                "NEWSDESK_TEST_UNSET_POOL_SIZE not set, using default: 7"
            )]
        );
    }

    #[test]
    fn try_load_is_quiet_when_the_variable_is_set() {
        env::set_var("NEWSDESK_TEST_SET_LIMIT", " 25 ");
        let mut notices = Vec::new();
        let limit: i64 =
            try_load("NEWSDESK_TEST_SET_LIMIT", "100", &mut notices);
        assert_eq!(limit, 25);
        assert!(notices.is_empty());
    }
}
