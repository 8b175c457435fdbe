use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::{
  DEFAULT_DISPLAY_TIMEZONE,
  parse_timezone
};
use crate::generator::{
  DEFAULT_LATENCY_MS,
  DEFAULT_TIMEOUT_MS,
  GeneratorSettings
};
use crate::session::SessionSettings;

pub const RC_ENV_VAR: &str =
  "PMBOARDRC";
const RC_FILE_NAME: &str =
  ".pmboardrc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("color", "on".to_string()),
      (
        "display.timezone",
        DEFAULT_DISPLAY_TIMEZONE
          .to_string()
      ),
      (
        "generator.latency_ms",
        DEFAULT_LATENCY_MS.to_string()
      ),
      (
        "generator.timeout_ms",
        DEFAULT_TIMEOUT_MS.to_string()
      ),
      (
        "default.command",
        "board".to_string()
      )
    ] {
      map.insert(key.to_string(), value);
    }

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading rc file");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no rc file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|raw| {
        parse_bool(raw).ok_or_else(|| {
          anyhow!(
            "invalid {key}: expected \
             on/off, got {raw}"
          )
        })
      })
      .transpose()
  }

  pub fn get_millis(
    &self,
    key: &str
  ) -> anyhow::Result<Option<Duration>>
  {
    self
      .map
      .get(key)
      .map(|raw| {
        raw
          .trim()
          .parse::<u64>()
          .map(Duration::from_millis)
          .map_err(|_| {
            anyhow!(
              "invalid {key}: expected \
               milliseconds, got {raw}"
            )
          })
      })
      .transpose()
  }

  pub fn generator_settings(
    &self
  ) -> anyhow::Result<GeneratorSettings>
  {
    let defaults =
      GeneratorSettings::default();
    Ok(GeneratorSettings {
      latency: self
        .get_millis(
          "generator.latency_ms"
        )?
        .unwrap_or(defaults.latency),
      timeout: self
        .get_millis(
          "generator.timeout_ms"
        )?
        .unwrap_or(defaults.timeout)
    })
  }

  pub fn display_timezone(
    &self
  ) -> anyhow::Result<Tz> {
    let raw = self
      .get("display.timezone")
      .unwrap_or_else(|| {
        DEFAULT_DISPLAY_TIMEZONE
          .to_string()
      });
    Ok(parse_timezone(&raw)?)
  }

  pub fn session_settings(
    &self
  ) -> anyhow::Result<SessionSettings> {
    Ok(SessionSettings {
      generator: self
        .generator_settings()?,
      timezone: self
        .display_timezone()?
    })
  }

  /// Seed file from `--seed`, falling back to `seed.location`.
  pub fn seed_location(
    &self,
    override_path: Option<&Path>
  ) -> Option<PathBuf> {
    if let Some(path) = override_path {
      return Some(expand_tilde(path));
    }
    self
      .get("seed.location")
      .filter(|v| !v.trim().is_empty())
      .map(|v| {
        expand_tilde(Path::new(v.trim()))
      })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    if self.loaded_files.contains(&path)
    {
      warn!(file = %path.display(), "rc file already loaded; skipping include cycle");
      return Ok(());
    }

    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping rc file"
    );
    return Ok(None);
  };
  let candidate =
    home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  s: &str
) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  #[test]
  fn defaults_cover_every_known_key()
  {
    let cfg = Config::default();
    assert_eq!(
      cfg.get("default.command")
        .as_deref(),
      Some("board")
    );
    assert_eq!(
      cfg
        .generator_settings()
        .expect("defaults parse"),
      GeneratorSettings::default()
    );
    assert_eq!(
      cfg
        .display_timezone()
        .expect("utc"),
      Tz::UTC
    );
    assert!(
      cfg.seed_location(None).is_none()
    );
  }

  #[test]
  fn rc_file_includes_and_overrides_layer()
   {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "generator.timeout_ms = 250\n"
    )
    .expect("write include");
    let main = dir.path().join("main.rc");
    fs::write(
      &main,
      "# board settings\n\
       color = off\n\
       display.timezone = \
       America/Mexico_City # local\n\
       include extra.rc\n"
    )
    .expect("write rc");

    let mut cfg = Config::load(Some(
      main.as_path()
    ))
    .expect("load rc");
    assert_eq!(
      cfg.loaded_files.len(),
      2
    );
    assert_eq!(
      cfg
        .get_bool("color")
        .expect("color"),
      Some(false)
    );
    assert_eq!(
      cfg
        .display_timezone()
        .expect("tz"),
      Tz::America__Mexico_City
    );

    cfg.apply_overrides([(
      "rc.generator.latency_ms"
        .to_string(),
      "10".to_string()
    )]);
    let settings = cfg
      .generator_settings()
      .expect("settings");
    assert_eq!(
      settings.latency,
      Duration::from_millis(10)
    );
    assert_eq!(
      settings.timeout,
      Duration::from_millis(250)
    );
  }

  #[test]
  fn malformed_values_are_errors() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "generator.latency_ms"
          .to_string(),
        "soon".to_string()
      ),
      (
        "display.timezone".to_string(),
        "Mars/Olympus".to_string()
      ),
      (
        "color".to_string(),
        "sometimes".to_string()
      )
    ]);
    assert!(
      cfg.get_bool("color").is_err()
    );
    assert!(
      cfg.generator_settings().is_err()
    );
    assert!(
      cfg.display_timezone().is_err()
    );
  }

  #[test]
  fn lines_without_equals_are_rejected()
  {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let rc = dir.path().join("bad.rc");
    fs::write(&rc, "color on\n")
      .expect("write rc");
    let err = Config::load(Some(rc.as_path()))
      .expect_err("bad line");
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }
}
