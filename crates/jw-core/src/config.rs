use std::{
    env,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{detector::WatermarkPolicy, errors::Error, Result};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/51.0.2704.103 Safari/537.36";

/// Typed configuration for the watcher.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub store_path: PathBuf,

    // Source
    pub categories_url: String,
    pub feed_url: String,
    pub user_agent: String,
    pub fetch_timeout: Duration,

    // Polling
    pub poll_interval: Duration,
    pub partition_pacing: Duration,
    pub watermark_policy: WatermarkPolicy,
    pub event_channel_capacity: usize,

    // Delivery
    pub delivery_pacing: Duration,
    pub delivery_session_ttl: Duration,

    // Chat sessions
    pub session_ttl: Duration,
    pub flood_window: usize,
    pub flood_min_gap: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN")
            .or_else(|| env_str("TG"))
            .unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let store_path = env_str("JOBWATCH_STORE_PATH")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./jobwatch-store.json"));

        let categories_url = env_str("JOBWATCH_CATEGORIES_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://jobs.dou.ua/vacancies/".to_string());
        let feed_url = env_str("JOBWATCH_FEED_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://jobs.dou.ua/vacancies/feeds/".to_string());
        let user_agent = env_str("JOBWATCH_USER_AGENT")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let fetch_timeout = Duration::from_millis(env_u64("FETCH_TIMEOUT_MS").unwrap_or(30_000));

        let poll_interval = Duration::from_secs(env_u64("POLL_INTERVAL_SECS").unwrap_or(600).max(1));
        let partition_pacing =
            Duration::from_millis(env_u64("PARTITION_PACING_MS").unwrap_or(5_000));
        let watermark_policy = match env_str("WATERMARK_POLICY") {
            Some(raw) => raw.parse::<WatermarkPolicy>()?,
            None => WatermarkPolicy::default(),
        };
        let event_channel_capacity = env_usize("EVENT_CHANNEL_CAPACITY").unwrap_or(1).max(1);

        let delivery_pacing = Duration::from_millis(env_u64("DELIVERY_PACING_MS").unwrap_or(100));
        let delivery_session_ttl =
            Duration::from_secs(env_u64("DELIVERY_SESSION_TTL_SECS").unwrap_or(10).max(1));

        let session_ttl = Duration::from_secs(env_u64("SESSION_TTL_SECS").unwrap_or(600).max(1));
        let flood_window = env_usize("FLOOD_WINDOW").unwrap_or(3).max(2);
        let flood_min_gap = Duration::from_millis(env_u64("FLOOD_MIN_GAP_MS").unwrap_or(700));

        Ok(Self {
            telegram_bot_token,
            store_path,
            categories_url,
            feed_url,
            user_agent,
            fetch_timeout,
            poll_interval,
            partition_pacing,
            watermark_policy,
            event_channel_capacity,
            delivery_pacing,
            delivery_session_ttl,
            session_ttl,
            flood_window,
            flood_min_gap,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_parsing_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# comment\nTG=\"abc\"\n\nPOLL_INTERVAL_SECS = 60\nbroken line\n=novalue\nUA='x y'\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TG".to_string(), "abc".to_string()),
                ("POLL_INTERVAL_SECS".to_string(), "60".to_string()),
                ("UA".to_string(), "x y".to_string()),
            ]
        );
    }
}
