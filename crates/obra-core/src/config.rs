use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::{
  PlanningZone,
  parse_week_start,
  resolve_planning_zone
};
use crate::grid::{
  GridOptions,
  Placement,
  ViewMode
};

const RC_ENV_VAR: &str = "OBRARC";

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("tasks.file", "~/.obra/tasks.json"),
      ("calendar.view", "month"),
      ("calendar.week_start", "monday"),
      ("calendar.month_cap", "3"),
      ("calendar.week_cap", "5"),
      ("calendar.placement", "start"),
      ("calendar.created_fallback", "off"),
      ("drag.preserve_duration", "off"),
      ("color", "on")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    Config {
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

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(obrarc = %path.display(), "loading obrarc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no obrarc found; using \
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
      .map(|v| {
        parse_bool(v).ok_or_else(|| {
          anyhow!(
            "invalid boolean for \
             {key}: {v}"
          )
        })
      })
      .transpose()
  }

  pub fn get_usize(
    &self,
    key: &str
  ) -> anyhow::Result<Option<usize>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim()
          .parse::<usize>()
          .with_context(|| {
            format!(
              "invalid number for \
               {key}: {v}"
            )
          })
      })
      .transpose()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
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

/// Typed view of the planning keys.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
  pub view_mode:         ViewMode,
  pub week_start:        Weekday,
  pub month_cap:         usize,
  pub week_cap:          usize,
  pub placement:         Placement,
  pub created_fallback:  bool,
  pub preserve_duration: bool,
  pub zone:              PlanningZone,
  pub color:             bool
}

impl Default for PlannerSettings {
  fn default() -> Self {
    Self {
      view_mode:         ViewMode::Month,
      week_start:        Weekday::Mon,
      month_cap:         ViewMode::Month
        .display_cap(),
      week_cap:          ViewMode::Week
        .display_cap(),
      placement:
        Placement::StartDay,
      created_fallback:  false,
      preserve_duration: false,
      zone:              PlanningZone::Local,
      color:             true
    }
  }
}

impl PlannerSettings {
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let defaults = Self::default();

    let view_mode = match cfg
      .get("calendar.view")
    {
      | Some(raw) => {
        ViewMode::from_key(&raw)
          .ok_or_else(|| {
            anyhow!(
              "invalid calendar.view: \
               {raw} (expected month or \
               week)"
            )
          })?
      }
      | None => defaults.view_mode
    };

    let week_start = match cfg
      .get("calendar.week_start")
    {
      | Some(raw) => {
        parse_week_start(&raw)
          .ok_or_else(|| {
            anyhow!(
              "invalid \
               calendar.week_start: \
               {raw} (expected monday \
               or sunday)"
            )
          })?
      }
      | None => defaults.week_start
    };

    let placement = match cfg
      .get("calendar.placement")
    {
      | Some(raw) => {
        Placement::from_key(&raw)
          .ok_or_else(|| {
            anyhow!(
              "invalid \
               calendar.placement: \
               {raw} (expected start \
               or span)"
            )
          })?
      }
      | None => defaults.placement
    };

    let month_cap = cfg
      .get_usize("calendar.month_cap")?
      .unwrap_or(defaults.month_cap);
    let week_cap = cfg
      .get_usize("calendar.week_cap")?
      .unwrap_or(defaults.week_cap);
    if month_cap == 0 || week_cap == 0 {
      return Err(anyhow!(
        "calendar caps must be at \
         least 1"
      ));
    }

    let settings = Self {
      view_mode,
      week_start,
      month_cap,
      week_cap,
      placement,
      created_fallback: cfg
        .get_bool(
          "calendar.created_fallback"
        )?
        .unwrap_or(
          defaults.created_fallback
        ),
      preserve_duration: cfg
        .get_bool(
          "drag.preserve_duration"
        )?
        .unwrap_or(
          defaults.preserve_duration
        ),
      zone: resolve_planning_zone(
        cfg
          .get("calendar.timezone")
          .as_deref()
      ),
      color: cfg
        .get_bool("color")?
        .unwrap_or(defaults.color)
    };

    debug!(?settings, "planner settings resolved");
    Ok(settings)
  }

  #[must_use]
  pub fn grid_options(
    &self
  ) -> GridOptions {
    GridOptions {
      week_start:       self.week_start,
      placement:        self.placement,
      zone:             self.zone,
      created_fallback: self
        .created_fallback
    }
  }

  #[must_use]
  pub fn display_cap(
    &self,
    mode: ViewMode
  ) -> usize {
    match mode {
      | ViewMode::Month => self.month_cap,
      | ViewMode::Week => self.week_cap
    }
  }
}

#[tracing::instrument(skip(
  cfg,
  override_path
))]
pub fn resolve_tasks_file(
  cfg: &Config,
  override_path: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(path) = override_path {
    return Ok(path.to_path_buf());
  }

  let raw = cfg
    .get("tasks.file")
    .ok_or_else(|| {
      anyhow!("tasks.file is not set")
    })?;
  Ok(expand_tilde(Path::new(&raw)))
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
       directory; skipping obrarc"
    );
    return Ok(None);
  };
  let candidate = home.join(".obrarc");
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

fn parse_bool(s: &str) -> Option<bool> {
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
  use std::io::Write;

  use super::*;

  #[test]
  fn defaults_produce_default_settings() {
    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "rc.calendar.timezone".to_string(),
      "UTC".to_string()
    )]);
    let settings =
      PlannerSettings::from_config(&cfg)
        .expect("settings");
    assert_eq!(
      settings.view_mode,
      ViewMode::Month
    );
    assert_eq!(settings.month_cap, 3);
    assert_eq!(settings.week_cap, 5);
    assert_eq!(
      settings.placement,
      Placement::StartDay
    );
    assert!(!settings.preserve_duration);
  }

  #[test]
  fn rc_file_with_include_and_comments() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "calendar.placement = span\n"
    )
    .expect("write include");

    let rc = dir.path().join("obrarc");
    let mut file = fs::File::create(&rc)
      .expect("create rc");
    writeln!(
      file,
      "# planning defaults\n\
       calendar.view = week  # obra\n\
       calendar.week_start = sunday\n\
       include extra.rc\n\
       drag.preserve_duration = yes"
    )
    .expect("write rc");

    let cfg = Config::load(Some(rc.as_path()))
      .expect("load config");
    assert_eq!(cfg.loaded_files.len(), 2);

    let settings =
      PlannerSettings::from_config(&cfg)
        .expect("settings");
    assert_eq!(
      settings.view_mode,
      ViewMode::Week
    );
    assert_eq!(
      settings.week_start,
      Weekday::Sun
    );
    assert_eq!(
      settings.placement,
      Placement::Span
    );
    assert!(settings.preserve_duration);
  }

  #[test]
  fn rejects_bad_values() {
    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "calendar.view".to_string(),
      "year".to_string()
    )]);
    let err =
      PlannerSettings::from_config(&cfg)
        .expect_err("bad view");
    assert!(
      err
        .to_string()
        .contains("calendar.view")
    );

    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "calendar.month_cap".to_string(),
      "0".to_string()
    )]);
    assert!(
      PlannerSettings::from_config(&cfg)
        .is_err()
    );

    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "color".to_string(),
      "maybe".to_string()
    )]);
    assert!(
      PlannerSettings::from_config(&cfg)
        .is_err()
    );
  }

  #[test]
  fn malformed_line_is_an_error() {
    let dir = tempfile::tempdir()
      .expect("tempdir");
    let rc = dir.path().join("obrarc");
    fs::write(&rc, "calendar.view\n")
      .expect("write rc");
    assert!(Config::load(Some(rc.as_path())).is_err());
  }
}
