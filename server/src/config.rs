use anyhow::{Context, Result};
use chrono_tz::Tz;
use products_hr::clock::DEFAULT_TIMEZONE;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Timezone every attendance date and salary period is resolved in.
    pub timezone: Tz,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let timezone = match std::env::var("ORG_TIMEZONE") {
            Ok(raw) if !raw.trim().is_empty() => parse_timezone(&raw)?,
            _ => DEFAULT_TIMEZONE,
        };

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            timezone,
            cors_allowed_origins,
        })
    }
}

fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("invalid ORG_TIMEZONE {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iana_names() {
        assert_eq!(parse_timezone(" Asia/Phnom_Penh ").unwrap(), DEFAULT_TIMEZONE);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }
}
