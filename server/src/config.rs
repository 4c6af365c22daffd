use crate::model::enums::UserRank;
use config::{Environment, File, FileFormat};
use lettre::message::Mailbox;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use strum::Display;
use url::Url;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum ConfigError {
    Load(#[from] config::ConfigError),
    StdIo(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RegexType {
    Password,
    Username,
}

/// Governs whether posts and cars may introduce vehicle names that aren't in the reference catalog.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagPolicy {
    #[default]
    Open,
    Curated,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpInfo {
    pub relay: String,
    pub username: String,
    pub password: String,
    pub from: Mailbox,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Privileges {
    pub user_create: UserRank,
    pub user_view: UserRank,
    pub user_token_create: UserRank,
    pub user_token_delete: UserRank,
    pub post_list: UserRank,
    pub post_view: UserRank,
    pub post_create: UserRank,
    pub post_edit_own: UserRank,
    pub post_edit_any: UserRank,
    pub post_delete_own: UserRank,
    pub post_delete_any: UserRank,
    pub post_vote: UserRank,
    pub post_save: UserRank,
    pub post_hide: UserRank,
    pub post_report: UserRank,
    pub comment_view: UserRank,
    pub comment_create: UserRank,
    pub comment_edit_own: UserRank,
    pub comment_edit_any: UserRank,
    pub comment_delete_own: UserRank,
    pub comment_delete_any: UserRank,
    pub comment_vote: UserRank,
    pub comment_save: UserRank,
    pub comment_hide: UserRank,
    pub comment_report: UserRank,
    pub tag_list: UserRank,
    pub car_list: UserRank,
    pub car_create: UserRank,
    pub car_edit_own: UserRank,
    pub car_edit_any: UserRank,
    pub car_delete_own: UserRank,
    pub car_delete_any: UserRank,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub port: u16,
    pub site_name: String,
    pub domain: Option<Url>,
    pub password_secret: String,
    pub default_rank: UserRank,
    pub self_vote_karma: bool,
    pub tag_policy: TagPolicy,
    pub reference_data: Option<PathBuf>,
    #[serde(with = "serde_regex")]
    username_regex: Regex,
    #[serde(with = "serde_regex")]
    password_regex: Regex,
    pub smtp: Option<SmtpInfo>,
    privileges: Privileges,
}

impl Config {
    pub fn privileges(&self) -> &Privileges {
        &self.privileges
    }

    pub fn regex(&self, regex_type: RegexType) -> &Regex {
        match regex_type {
            RegexType::Password => &self.password_regex,
            RegexType::Username => &self.username_regex,
        }
    }
}

/// Loads the server configuration. Values in the config file can be overridden by
/// environment variables of the form `GEARBOARD__SELF_VOTE_KARMA=true`.
pub fn create() -> Result<Config, ConfigError> {
    config::Config::builder()
        .add_source(File::from(get_config_path()?).format(FileFormat::Toml))
        .add_source(Environment::with_prefix("GEARBOARD").separator("__"))
        .build()?
        .try_deserialize()
        .map_err(ConfigError::from)
}

/// Returns a url for the database using `POSTGRES_USER`, `POSTGRES_PASSWORD`, `POSTGRES_DB`,
/// and `POSTGRES_HOST` environment variables. A `.env` file one directory up is read first if present.
/// If `database_override` is not `None`, then it's value will be used in place of `POSTGRES_DB`.
pub fn database_url(database_override: Option<&str>) -> Result<String, std::env::VarError> {
    if let Err(err) = dotenvy::from_filename("../.env") {
        tracing::debug!("No .env file loaded: {err}");
    }

    let user = std::env::var("POSTGRES_USER")?;
    let password = std::env::var("POSTGRES_PASSWORD")?;
    let database = match database_override {
        Some(database) => database.to_owned(),
        None => std::env::var("POSTGRES_DB")?,
    };
    let hostname = std::env::var("POSTGRES_HOST").unwrap_or_else(|_| String::from("localhost"));
    Ok(format!("postgres://{user}:{password}@{hostname}/{database}"))
}

#[cfg(test)]
pub fn test_config(tag_policy: Option<TagPolicy>) -> Config {
    let mut config: Config = config::Config::builder()
        .add_source(File::from_str(include_str!("../config.toml.dist"), FileFormat::Toml))
        .build()
        .and_then(config::Config::try_deserialize)
        .unwrap_or_else(|err| panic!("config.toml.dist is invalid: {err}"));
    config.password_secret = String::from("test_secret");
    config.tag_policy = tag_policy.unwrap_or_default();
    config.reference_data = None;
    config
}

fn get_config_path() -> std::io::Result<PathBuf> {
    // Use config.toml.dist if in development environment, config.toml if in production
    match std::env::var("CARGO_MANIFEST_DIR") {
        Ok(var) => Ok(PathBuf::from(var).join("config.toml.dist")),
        Err(_) => {
            let exe_path = std::env::current_exe()?;
            let parent_path = exe_path.parent().map(ToOwned::to_owned).unwrap_or_default();
            Ok(parent_path.join("config.toml"))
        }
    }
}
