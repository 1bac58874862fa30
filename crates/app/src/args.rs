use std::fmt;
use std::path::PathBuf;

use quiz_core::model::{
    DEFAULT_MAX_POINTS, DEFAULT_MIN_POINTS, DEFAULT_TIME_LIMIT_MS, DEFAULT_TOTAL_ROUNDS,
    QuizSettings, SettingsError,
};
use services::ResultBackend;
use storage::generator::HttpGeneratorConfig;
use storage::http::HttpSinkConfig;

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    Settings(SettingsError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::Settings(err) => write!(f, "invalid quiz settings: {err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<SettingsError> for ArgsError {
    fn from(err: SettingsError) -> Self {
        ArgsError::Settings(err)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub rounds: u32,
    pub time_limit_ms: u64,
    pub max_points: u32,
    pub min_points: u32,
    pub catalogue: Option<PathBuf>,
    pub db_url: Option<String>,
    pub report_url: Option<String>,
    pub report_token: Option<String>,
    pub generator_url: Option<String>,
    pub generator_token: Option<String>,
    pub player: Option<String>,
    pub verbose: bool,
    pub help: bool,
}

impl Args {
    /// Parse process arguments with environment fallbacks.
    pub fn parse() -> Result<Self, ArgsError> {
        Self::parse_from(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    /// Flags override `env`; `env` overrides built-in defaults.
    pub fn parse_from(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let mut parsed = Self {
            rounds: env("QUIZ_ROUNDS")
                .map(|raw| parse_number("QUIZ_ROUNDS", raw))
                .transpose()?
                .unwrap_or(DEFAULT_TOTAL_ROUNDS),
            time_limit_ms: env("QUIZ_TIME_LIMIT_MS")
                .map(|raw| parse_number("QUIZ_TIME_LIMIT_MS", raw))
                .transpose()?
                .unwrap_or(DEFAULT_TIME_LIMIT_MS),
            max_points: env("QUIZ_MAX_POINTS")
                .map(|raw| parse_number("QUIZ_MAX_POINTS", raw))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_POINTS),
            min_points: env("QUIZ_MIN_POINTS")
                .map(|raw| parse_number("QUIZ_MIN_POINTS", raw))
                .transpose()?
                .unwrap_or(DEFAULT_MIN_POINTS),
            catalogue: env("QUIZ_CATALOGUE").map(PathBuf::from),
            db_url: env("QUIZ_DB_URL").map(normalize_sqlite_url),
            report_url: env("QUIZ_REPORT_URL"),
            report_token: env("QUIZ_REPORT_TOKEN"),
            generator_url: env("QUIZ_GENERATOR_URL"),
            generator_token: env("QUIZ_GENERATOR_TOKEN"),
            player: env("QUIZ_PLAYER"),
            verbose: false,
            help: false,
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--rounds" => {
                    parsed.rounds = parse_number("--rounds", require_value(&mut args, "--rounds")?)?;
                }
                "--time-limit-ms" => {
                    let value = require_value(&mut args, "--time-limit-ms")?;
                    parsed.time_limit_ms = parse_number("--time-limit-ms", value)?;
                }
                "--max-points" => {
                    let value = require_value(&mut args, "--max-points")?;
                    parsed.max_points = parse_number("--max-points", value)?;
                }
                "--min-points" => {
                    let value = require_value(&mut args, "--min-points")?;
                    parsed.min_points = parse_number("--min-points", value)?;
                }
                "--catalogue" => {
                    parsed.catalogue = Some(PathBuf::from(require_value(&mut args, "--catalogue")?));
                }
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(normalize_sqlite_url(value));
                }
                "--report-url" => {
                    parsed.report_url = Some(require_value(&mut args, "--report-url")?);
                }
                "--report-token" => {
                    parsed.report_token = Some(require_value(&mut args, "--report-token")?);
                }
                "--generator-url" => {
                    parsed.generator_url = Some(require_value(&mut args, "--generator-url")?);
                }
                "--generator-token" => {
                    parsed.generator_token = Some(require_value(&mut args, "--generator-token")?);
                }
                "--name" => {
                    parsed.player = Some(require_value(&mut args, "--name")?);
                }
                "--verbose" | "-v" => parsed.verbose = true,
                "--help" | "-h" => parsed.help = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    /// # Errors
    ///
    /// Returns `ArgsError::Settings` when the numbers do not form a playable quiz.
    pub fn settings(&self) -> Result<QuizSettings, ArgsError> {
        Ok(QuizSettings::new(
            self.rounds,
            self.time_limit_ms,
            self.max_points,
            self.min_points,
        )?)
    }

    /// `--db` wins over `--report-url`; with neither, results only go to the log.
    #[must_use]
    pub fn backend(&self) -> ResultBackend {
        if let Some(url) = &self.db_url {
            return ResultBackend::Sqlite { url: url.clone() };
        }
        if let Some(endpoint) = &self.report_url {
            return ResultBackend::Http(HttpSinkConfig {
                endpoint: endpoint.clone(),
                api_key: self.report_token.clone(),
            });
        }
        ResultBackend::Log
    }

    /// Where to fetch generated questions from, if anywhere.
    #[must_use]
    pub fn generator(&self) -> Option<HttpGeneratorConfig> {
        self.generator_url.as_ref().map(|endpoint| HttpGeneratorConfig {
            endpoint: endpoint.clone(),
            api_key: self.generator_token.clone(),
        })
    }
}

/// Turn a relative `sqlite:` path into an absolute `sqlite://` URL that creates the file.
pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.contains("mode=memory") {
        return raw;
    }
    let trimmed = raw.trim();
    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let (path_str, query) = match path_str.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_str, None),
    };
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    match query {
        Some(query) => format!("sqlite://{}?{query}", absolute.display()),
        None => format!("sqlite://{}?mode=rwc", absolute.display()),
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --rounds <n>              Questions per session (default: {DEFAULT_TOTAL_ROUNDS})");
    eprintln!("  --time-limit-ms <ms>      Time per question (default: {DEFAULT_TIME_LIMIT_MS})");
    eprintln!("  --max-points <n>          Points for an instant answer (default: {DEFAULT_MAX_POINTS})");
    eprintln!("  --min-points <n>          Points for a last-moment answer (default: {DEFAULT_MIN_POINTS})");
    eprintln!("  --catalogue <path.json>   Load questions from a JSON file instead of the built-in bank");
    eprintln!("  --db <sqlite_url>         Record results in SQLite");
    eprintln!("  --report-url <url>        POST each result to this endpoint");
    eprintln!("  --report-token <token>    Bearer token sent with each result");
    eprintln!("  --generator-url <url>     Fetch a generated question for every round");
    eprintln!("  --generator-token <token> Bearer token sent to the question generator");
    eprintln!("  --name <name>             Player name shown in results");
    eprintln!("  -v, --verbose             Debug logging on stderr");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_ROUNDS, QUIZ_TIME_LIMIT_MS, QUIZ_MAX_POINTS, QUIZ_MIN_POINTS, QUIZ_CATALOGUE,");
    eprintln!("  QUIZ_DB_URL, QUIZ_REPORT_URL, QUIZ_REPORT_TOKEN, QUIZ_GENERATOR_URL,");
    eprintln!("  QUIZ_GENERATOR_TOKEN, QUIZ_PLAYER, QUIZ_LOG");
}
