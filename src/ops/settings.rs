//! `settings-get`/`settings-set`/`settings-unset` routes (spec §6): a
//! dotted-path accessor over the settings file, local by default, mirroring
//! the global/local layering `util::config::load_settings` already reads.

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::core::command_line::CommandLineInputs;
use crate::util::config::Settings;
use crate::util::context::GlobalContext;
use crate::util::shell::Shell;

fn settings_path(ctx: &GlobalContext, inputs: &CommandLineInputs) -> std::path::PathBuf {
    inputs.settings_file.clone().unwrap_or_else(|| ctx.local_settings_path())
}

pub fn get(ctx: &GlobalContext, inputs: &CommandLineInputs, key: &str, shell: &Shell) -> Result<()> {
    let path = settings_path(ctx, inputs);
    let settings = Settings::load_or_default(&path);
    let value = serde_json::to_value(&settings)?;

    match navigate(&value, key) {
        Some(found) => {
            if shell.is_json() {
                shell.json_event(&serde_json::json!({ "key": key, "value": found }));
            } else {
                match found.as_str() {
                    Some(s) => println!("{}", s),
                    None => println!("{}", found),
                }
            }
            Ok(())
        }
        None => bail!("no settings value at `{}`", key),
    }
}

pub fn set(ctx: &GlobalContext, inputs: &CommandLineInputs, key: &str, raw_value: &str, shell: &Shell) -> Result<()> {
    let path = settings_path(ctx, inputs);
    let mut value = serde_json::to_value(Settings::load_or_default(&path))?;

    let parsed = serde_json::from_str(raw_value).unwrap_or_else(|_| Value::String(raw_value.to_string()));
    set_at(&mut value, key, parsed)?;

    let settings: Settings = serde_json::from_value(value).context("resulting settings document is invalid")?;
    settings.save(&path)?;
    shell.note(format!("set `{}`", key));
    Ok(())
}

pub fn unset(ctx: &GlobalContext, inputs: &CommandLineInputs, key: &str, shell: &Shell) -> Result<()> {
    let path = settings_path(ctx, inputs);
    let mut value = serde_json::to_value(Settings::load_or_default(&path))?;

    if !remove_at(&mut value, key) {
        bail!("no settings value at `{}`", key);
    }

    let settings: Settings = serde_json::from_value(value).context("resulting settings document is invalid")?;
    settings.save(&path)?;
    shell.note(format!("unset `{}`", key));
    Ok(())
}

fn navigate<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(value, |cur, segment| cur.get(segment))
}

fn set_at(value: &mut Value, key: &str, new_value: Value) -> Result<()> {
    let mut segments: Vec<&str> = key.split('.').collect();
    let Some(last) = segments.pop() else {
        bail!("empty settings key");
    };

    let mut cur = value;
    for segment in segments {
        if !cur.is_object() {
            *cur = Value::Object(serde_json::Map::new());
        }
        cur = cur
            .as_object_mut()
            .unwrap()
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }

    if !cur.is_object() {
        *cur = Value::Object(serde_json::Map::new());
    }
    cur.as_object_mut().unwrap().insert(last.to_string(), new_value);
    Ok(())
}

fn remove_at(value: &mut Value, key: &str) -> bool {
    let mut segments: Vec<&str> = key.split('.').collect();
    let Some(last) = segments.pop() else {
        return false;
    };

    let mut cur = value;
    for segment in segments {
        match cur.get_mut(segment) {
            Some(next) => cur = next,
            None => return false,
        }
    }

    cur.as_object_mut().map(|m| m.remove(last).is_some()).unwrap_or(false)
}
