//! Runtime Configuration
//!
//! Defaults match the production deployment. Every field can be overridden with a
//! `--flag value` pair on the command line; the store access token is only read from the
//! environment so it never shows up in process listings.

use crate::breaker::{BreakerSettings, DependencyClass};
use crate::store::http::DEFAULT_BASE_URL;
use crate::sync::DEFAULT_POLL_INTERVAL;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DOCUMENT_KEY: &str = "replies.json";
pub const LEASE_KEY: &str = "processing.lock";
pub const TOPICS_KEY: &str = "topics.json";
pub const DEFAULT_BUCKET: &str = "xposter-replies";
pub const ACCESS_TOKEN_ENV: &str = "STORE_ACCESS_TOKEN";

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub bucket: String,
    pub store_base_url: String,
    /// `None` keeps everything in process memory (demo mode).
    pub store_access_token: Option<String>,
    pub use_memory_store: bool,
    pub document_key: String,
    pub lease_key: String,
    pub topics_key: String,
    pub state_dir: PathBuf,
    pub instance_label: String,
    pub poll_interval: Duration,
    pub stale_threshold: Duration,
    pub request_timeout: Duration,
    pub storage_breaker: BreakerSettings,
    pub generation_breaker: BreakerSettings,
    pub posting_breaker: BreakerSettings,
    /// Where actions are POSTed. Without it the worker only fetches.
    pub webhook_url: Option<String>,
    pub auto_act: bool,
    pub bind_addr: SocketAddr,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            store_base_url: DEFAULT_BASE_URL.to_string(),
            store_access_token: None,
            use_memory_store: false,
            document_key: DOCUMENT_KEY.to_string(),
            lease_key: LEASE_KEY.to_string(),
            topics_key: TOPICS_KEY.to_string(),
            state_dir: PathBuf::from(".candidate-sync"),
            instance_label: "background-worker".to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            stale_threshold: crate::lease::STALE_LEASE_THRESHOLD,
            request_timeout: Duration::from_secs(30),
            storage_breaker: DependencyClass::Storage.default_settings(),
            generation_breaker: DependencyClass::Generation.default_settings(),
            posting_breaker: DependencyClass::Posting.default_settings(),
            webhook_url: None,
            auto_act: false,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl SyncConfig {
    /// Parses `--flag value` pairs on top of the defaults. Unknown flags are skipped.
    ///
    /// `args` excludes the program name.
    pub fn from_args<I, S>(args: I, access_token: Option<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let mut config = Self {
            store_access_token: access_token.filter(|token| !token.trim().is_empty()),
            ..Self::default()
        };

        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--memory-store" => config.use_memory_store = true,
                "--auto-act" => config.auto_act = true,
                "--bucket" => config.bucket = value_of(&args, &mut i, flag)?.to_string(),
                "--store-url" => config.store_base_url = value_of(&args, &mut i, flag)?.to_string(),
                "--document-key" => config.document_key = value_of(&args, &mut i, flag)?.to_string(),
                "--lease-key" => config.lease_key = value_of(&args, &mut i, flag)?.to_string(),
                "--topics-key" => config.topics_key = value_of(&args, &mut i, flag)?.to_string(),
                "--state-dir" => config.state_dir = PathBuf::from(value_of(&args, &mut i, flag)?),
                "--instance" => config.instance_label = value_of(&args, &mut i, flag)?.to_string(),
                "--poll-secs" => config.poll_interval = parse_secs(flag, value_of(&args, &mut i, flag)?)?,
                "--stale-secs" => {
                    config.stale_threshold = parse_secs(flag, value_of(&args, &mut i, flag)?)?
                }
                "--timeout-secs" => {
                    config.request_timeout = parse_secs(flag, value_of(&args, &mut i, flag)?)?
                }
                "--webhook" => config.webhook_url = Some(value_of(&args, &mut i, flag)?.to_string()),
                "--bind" => {
                    let value = value_of(&args, &mut i, flag)?;
                    config.bind_addr = value
                        .parse()
                        .with_context(|| format!("invalid --bind address '{}'", value))?;
                }
                "--breaker" => {
                    let (class, settings) = parse_breaker(value_of(&args, &mut i, flag)?)?;
                    config.set_breaker(class, settings);
                }
                _ => {}
            }
            i += 1;
        }

        if config.poll_interval.is_zero() {
            return Err(anyhow::anyhow!("--poll-secs must be greater than zero"));
        }
        Ok(config)
    }

    /// Reads the process arguments and the access token from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_args(
            std::env::args().skip(1),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        )
    }

    pub fn breaker_settings(&self) -> Vec<(DependencyClass, BreakerSettings)> {
        vec![
            (DependencyClass::Storage, self.storage_breaker),
            (DependencyClass::Generation, self.generation_breaker),
            (DependencyClass::Posting, self.posting_breaker),
        ]
    }

    fn set_breaker(&mut self, class: DependencyClass, settings: BreakerSettings) {
        match class {
            DependencyClass::Storage => self.storage_breaker = settings,
            DependencyClass::Generation => self.generation_breaker = settings,
            DependencyClass::Posting => self.posting_breaker = settings,
        }
    }
}

/// Advances past `flag` and returns the value that follows it.
fn value_of<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", flag))
}

fn parse_secs(flag: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .parse()
        .with_context(|| format!("{} expects whole seconds, got '{}'", flag, value))?;
    Ok(Duration::from_secs(secs))
}

/// `name=threshold/timeout_secs/reset_secs`, e.g. `posting=3/45/300`.
fn parse_breaker(value: &str) -> Result<(DependencyClass, BreakerSettings)> {
    let (name, numbers) = value
        .split_once('=')
        .with_context(|| format!("--breaker expects name=threshold/timeout/reset, got '{}'", value))?;
    let class = DependencyClass::parse(name)
        .with_context(|| format!("unknown breaker '{}'", name))?;

    let parts: Vec<u64> = numbers
        .split('/')
        .map(|part| part.trim().parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("invalid breaker settings '{}'", numbers))?;
    let [threshold, timeout, reset] = parts[..] else {
        return Err(anyhow::anyhow!(
            "--breaker expects three numbers, got '{}'",
            numbers
        ));
    };
    if threshold == 0 {
        return Err(anyhow::anyhow!("breaker threshold must be at least 1"));
    }

    Ok((
        class,
        BreakerSettings::new(
            threshold as u32,
            Duration::from_secs(timeout),
            Duration::from_secs(reset),
        ),
    ))
}
