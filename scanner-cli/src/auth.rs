use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::state::ensure_scanner_home;

/// Environment variables checked for the Gemini key, in order.
pub const KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub gemini_api_key: Option<String>,
}

fn auth_path() -> Result<std::path::PathBuf> {
    Ok(ensure_scanner_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(serde_json::from_str(&s)?)
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Where the key came from, for `config show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Env(&'static str),
    AuthFile,
}

/// First non-blank key from the environment, then the stored auth file.
pub fn resolve_api_key_with(
    env: impl Fn(&str) -> Option<String>,
    stored: &AuthState,
) -> Option<(String, KeySource)> {
    for var in KEY_ENV_VARS {
        if let Some(v) = env(var).filter(|v| !v.trim().is_empty()) {
            return Some((v.trim().to_string(), KeySource::Env(var)));
        }
    }
    stored
        .gemini_api_key
        .as_ref()
        .filter(|k| !k.trim().is_empty())
        .map(|k| (k.trim().to_string(), KeySource::AuthFile))
}

pub fn resolve_api_key() -> Result<Option<(String, KeySource)>> {
    let stored = load_auth()?;
    Ok(resolve_api_key_with(|k| std::env::var(k).ok(), &stored))
}

pub fn mask_key(key: &str) -> String {
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{tail}")
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn gemini_paste_key() -> Result<()> {
    let mut auth = load_auth()?;
    let key = prompt_secret("Paste Gemini API key (starts with AIza)")?;
    if !key.starts_with("AIza") {
        bail!("key didn't look like a Gemini API key (expected prefix AIza)");
    }
    auth.gemini_api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved Gemini API key to ~/.statement-scanner/auth.json");
    Ok(())
}
