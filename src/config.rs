use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Server settings, from the environment with the first CLI argument
/// overriding the data source
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// CSV/XLSX path or published CSV URL
    pub source: String,
    pub bind: String,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env_and_args(args: &[String]) -> Result<Self, String> {
        Self::resolve(args, |name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env_and_args`] with an injectable lookup
    pub fn resolve<F>(args: &[String], lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let source = args
            .get(1)
            .cloned()
            .or_else(|| non_empty("FAMILY_TREE_SOURCE"))
            .ok_or_else(|| {
                "no data source: pass a CSV/XLSX path or URL, or set FAMILY_TREE_SOURCE".to_string()
            })?;

        Ok(Config {
            source,
            bind: non_empty("FAMILY_TREE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            static_dir: non_empty("FAMILY_TREE_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        })
    }
}
