use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Which recorder backs a run, or none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    Mem,
    Sqlite,
    None,
}

impl std::str::FromStr for VerifyMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mem" => Ok(VerifyMode::Mem),
            "sqlite" => Ok(VerifyMode::Sqlite),
            "none" => Ok(VerifyMode::None),
            other => anyhow::bail!("invalid verify mode '{}': use mem, sqlite, or none", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneralConfig {
    pub path: Option<String>,
    pub size: Option<String>,
    pub generate: Option<bool>,
    pub verify: Option<String>,
    pub max_parallel: Option<usize>,
    pub wait_before_exit: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileConfig {
    pub cpuprofile: Option<String>,
    pub memprofile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    pub general: Option<GeneralConfig>,
    pub profile: Option<ProfileConfig>,
}

impl RuntimeConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let p = path.as_ref();
        let mut s = String::new();
        let mut f = File::open(p)?;
        f.read_to_string(&mut s)?;
        if let Some(ext) = p.extension().and_then(|e| e.to_str()) {
            match ext.to_lowercase().as_str() {
                "toml" => Ok(toml::from_str(&s)?),
                "yaml" | "yml" => Ok(serde_yaml::from_str(&s)?),
                "json" => Ok(serde_json::from_str(&s)?),
                _ => Err(anyhow::anyhow!("unsupported config extension: {}", ext)),
            }
        } else {
            Err(anyhow::anyhow!("config file has no extension"))
        }
    }

    pub fn merge(&mut self, other: RuntimeConfig) {
        if let Some(g) = other.general {
            let target = self.general.get_or_insert_with(Default::default);
            if g.path.is_some() {
                target.path = g.path;
            }
            if g.size.is_some() {
                target.size = g.size;
            }
            if g.generate.is_some() {
                target.generate = g.generate;
            }
            if g.verify.is_some() {
                target.verify = g.verify;
            }
            if g.max_parallel.is_some() {
                target.max_parallel = g.max_parallel;
            }
            if g.wait_before_exit.is_some() {
                target.wait_before_exit = g.wait_before_exit;
            }
        }

        if let Some(p) = other.profile {
            let target = self.profile.get_or_insert_with(Default::default);
            if p.cpuprofile.is_some() {
                target.cpuprofile = p.cpuprofile;
            }
            if p.memprofile.is_some() {
                target.memprofile = p.memprofile;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(g) = &self.general {
            if let Some(verify) = g.verify.as_deref() {
                verify
                    .parse::<VerifyMode>()
                    .with_context(|| "general.verify".to_string())?;
            }
        }
        Ok(())
    }
}

const CONFIG_FILENAMES: &[&str] = &["config.toml", "config.yaml", "config.yml", "config.json"];

fn candidates_in_dir(base: &Path) -> Vec<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| base.join(name))
        .collect()
}

fn merge_if_exists(target: &mut RuntimeConfig, path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        let cfg = RuntimeConfig::load_from_file(path)
            .with_context(|| format!("loading config {:?}", path))?;
        target.merge(cfg);
    }
    Ok(())
}

/// Load runtime configuration honoring precedence:
/// system (/etc) < user (~/.config/disktest) < project (cwd) <
/// env (`DISKTEST_CONFIG`) < CLI `--config`.
pub fn load_runtime_config(cli_path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    let mut cfg = RuntimeConfig::default();

    let system_base = Path::new("/etc/disktest");
    for candidate in candidates_in_dir(system_base) {
        merge_if_exists(&mut cfg, &candidate)?;
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_base = config_dir.join("disktest");
        for candidate in candidates_in_dir(&user_base) {
            merge_if_exists(&mut cfg, &candidate)?;
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        for candidate in candidates_in_dir(&cwd) {
            merge_if_exists(&mut cfg, &candidate)?;
        }
    }

    if let Some(env_path) = env::var_os("DISKTEST_CONFIG") {
        let env_path = PathBuf::from(env_path);
        let cfg_env = RuntimeConfig::load_from_file(&env_path)
            .with_context(|| format!("loading config from DISKTEST_CONFIG ({:?})", env_path))?;
        cfg.merge(cfg_env);
    }

    if let Some(p) = cli_path {
        let cli_cfg = RuntimeConfig::load_from_file(p)
            .with_context(|| format!("loading config from --config {:?}", p))?;
        cfg.merge(cli_cfg);
    }

    apply_env_overrides(&mut cfg);
    cfg.validate()?;

    Ok(cfg)
}

fn parse_usize(val: &str) -> Option<usize> {
    val.trim().parse::<usize>().ok()
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "y" | "yes" | "on" => Some(true),
        "0" | "false" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply environment variable overrides (precedence just below CLI args).
pub fn apply_env_overrides(cfg: &mut RuntimeConfig) {
    if let Ok(path) = env::var("DISKTEST_PATH") {
        cfg.general.get_or_insert_with(Default::default).path = Some(path);
    }
    if let Ok(size) = env::var("DISKTEST_SIZE") {
        cfg.general.get_or_insert_with(Default::default).size = Some(size);
    }
    if let Ok(generate_str) = env::var("DISKTEST_GENERATE") {
        if let Some(val) = parse_bool(&generate_str) {
            cfg.general.get_or_insert_with(Default::default).generate = Some(val);
        }
    }
    if let Ok(verify) = env::var("DISKTEST_VERIFY") {
        cfg.general.get_or_insert_with(Default::default).verify = Some(verify);
    }
    if let Ok(max_parallel_str) = env::var("DISKTEST_MAXPARALLEL") {
        if let Some(val) = parse_usize(&max_parallel_str) {
            cfg.general
                .get_or_insert_with(Default::default)
                .max_parallel = Some(val);
        }
    }
    if let Ok(wait_str) = env::var("DISKTEST_WAITBEFOREEXIT") {
        if let Some(val) = parse_bool(&wait_str) {
            cfg.general
                .get_or_insert_with(Default::default)
                .wait_before_exit = Some(val);
        }
    }
    if let Ok(cpuprofile) = env::var("DISKTEST_CPUPROFILE") {
        cfg.profile.get_or_insert_with(Default::default).cpuprofile = Some(cpuprofile);
    }
    if let Ok(memprofile) = env::var("DISKTEST_MEMPROFILE") {
        cfg.profile.get_or_insert_with(Default::default).memprofile = Some(memprofile);
    }
}
