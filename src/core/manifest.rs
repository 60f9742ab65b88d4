//! Two-phase JSON/YAML manifest parser (spec §4.1).
//!
//! Phase one substitutes `${scope:name}` variables; phase two evaluates
//! `condition` expressions and resolves `extends` abstracts, after which
//! the remaining JSON is deserialized into the typed `Target` /
//! `ExternalDependency` / `DistributionTarget` model.

use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::condition::{self, ConditionContext, ConditionError};
use crate::core::dependency::{ExternalDependency, ExternalDependencyKind};
use crate::core::distribution::{DistributionKind, DistributionTarget};
use crate::core::target::{Target, TargetKind};
use crate::core::variables::{VariableError, VariableSpace};
use crate::core::workspace::BuildConfiguration;

/// The manifest file names searched for, in order, at each directory
/// level when no `--input-file` override is given.
const MANIFEST_FILE_NAMES: [&str; 2] = ["crucible.json", "crucible.yaml"];

#[derive(Debug, Error)]
pub enum ManifestDiscoveryError {
    #[error("no manifest found in `{dir}` or any parent directory")]
    NotFound { dir: std::path::PathBuf },
    #[error("`{dir}` contains more than one manifest file ({found:?}); remove all but one")]
    Ambiguous { dir: std::path::PathBuf, found: Vec<String> },
}

/// Search `start` and its ancestors for a manifest file.
pub fn find_manifest(start: &Path) -> Result<std::path::PathBuf, ManifestDiscoveryError> {
    let mut current = start.to_path_buf();
    loop {
        let found: Vec<&str> = MANIFEST_FILE_NAMES
            .iter()
            .copied()
            .filter(|name| current.join(name).exists())
            .collect();
        match found.len() {
            0 => {
                if !current.pop() {
                    return Err(ManifestDiscoveryError::NotFound { dir: start.to_path_buf() });
                }
            }
            1 => return Ok(current.join(found[0])),
            _ => {
                return Err(ManifestDiscoveryError::Ambiguous {
                    dir: current,
                    found: found.into_iter().map(str::to_string).collect(),
                })
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{file}: failed to read manifest: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{file}: {source}")]
    Yaml {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{file}: manifest root must be an object")]
    RootNotObject { file: String },
    #[error("{file}: target `{target}`: {source}")]
    Variable {
        file: String,
        target: String,
        #[source]
        source: VariableError,
    },
    #[error("{file}: target `{target}`: invalid condition: {source}")]
    Condition {
        file: String,
        target: String,
        #[source]
        source: ConditionError,
    },
    #[error("{file}: target `{target}`: unknown kind `{kind}`")]
    UnknownKind { file: String, target: String, kind: String },
    #[error("{file}: target `{target}`: blank required field `{field}`")]
    BlankField { file: String, target: String, field: String },
    #[error("{file}: target `{target}`: extends unresolved abstract `{abstract_name}`")]
    UnresolvedExtends {
        file: String,
        target: String,
        abstract_name: String,
    },
    #[error("{file}: duplicate target name `{target}`")]
    DuplicateTarget { file: String, target: String },
    #[error("{file}: invalid target name `{target}`")]
    InvalidTargetName { file: String, target: String },
    #[error("{file}: distribution bundle `{bundle}` references non-existent build target `{target}`")]
    DistributionMissingTarget {
        file: String,
        bundle: String,
        target: String,
    },
    #[error("{file}: {source}")]
    TargetShape {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything the parser needs that is not itself part of the manifest
/// text: the variable bare-scope values and the condition context.
#[derive(Debug, Clone)]
pub struct ManifestContext {
    pub variables: VariableSpace,
    pub condition: ConditionContext,
}

impl ManifestContext {
    pub fn new(
        platform: &str,
        architecture: &str,
        toolchain: &str,
        configuration: &str,
        ci: bool,
        debug: bool,
    ) -> Self {
        let mut condition = ConditionContext::new().with_process_env();
        condition
            .set("platform", platform)
            .set("architecture", architecture)
            .set("toolchain", toolchain)
            .set("configuration", configuration);
        if ci {
            condition.set("ci", "true");
        }
        if debug {
            condition.set("debug", "true");
        }

        let mut variables = VariableSpace::new();
        variables
            .set_bare("architecture", architecture)
            .set_bare("toolchain", toolchain)
            .set_bare("configuration", configuration);
        if let Ok(cwd) = std::env::current_dir() {
            variables.set_bare("cwd", cwd.to_string_lossy());
        }
        if let Some(home) = dirs_home() {
            variables.set_bare("home", home.to_string_lossy());
        }

        ManifestContext { variables, condition }
    }
}

fn dirs_home() -> Option<std::path::PathBuf> {
    directories::UserDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// The fully-resolved, typed manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub workspace_name: String,
    pub version: String,
    pub search_paths: Vec<String>,
    pub default_configurations: Vec<String>,
    pub configurations: IndexMap<String, BuildConfiguration>,
    pub external_dependencies: Vec<ExternalDependency>,
    pub targets: IndexMap<String, Target>,
    pub distribution: IndexMap<String, DistributionTarget>,
}

impl Manifest {
    pub fn load(path: &Path, ctx: &ManifestContext, external_dir: &Path) -> Result<Manifest, ManifestError> {
        let file_label = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            file: file_label.clone(),
            source,
        })?;
        Manifest::parse(&text, &file_label, ctx, external_dir, is_yaml(path))
    }

    pub fn parse(
        text: &str,
        file_label: &str,
        ctx: &ManifestContext,
        external_dir: &Path,
        yaml: bool,
    ) -> Result<Manifest, ManifestError> {
        let root: Value = if yaml {
            let yaml_value: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|source| ManifestError::Yaml {
                    file: file_label.to_string(),
                    source,
                })?;
            serde_json::to_value(yaml_value).map_err(|source| ManifestError::Json {
                file: file_label.to_string(),
                source,
            })?
        } else {
            serde_json::from_str(text).map_err(|source| ManifestError::Json {
                file: file_label.to_string(),
                source,
            })?
        };

        if !root.is_object() {
            return Err(ManifestError::RootNotObject { file: file_label.to_string() });
        }

        // Phase one: variable substitution across every string leaf.
        let mut substituted = root;
        substitute_strings(&mut substituted, &ctx.variables).map_err(|source| ManifestError::Variable {
            file: file_label.to_string(),
            target: "<root>".to_string(),
            source,
        })?;
        let root_obj = substituted.as_object().unwrap().clone();

        let workspace_name = root_obj
            .get("workspace")
            .and_then(Value::as_str)
            .unwrap_or("workspace")
            .to_string();
        let version = root_obj.get("version").and_then(Value::as_str).unwrap_or("0.1.0").to_string();
        let search_paths = root_obj.get("searchPaths").map(string_list).unwrap_or_default();
        let default_configurations = root_obj.get("defaultConfigurations").map(string_list).unwrap_or_default();

        let configurations = if let Some(raw) = root_obj.get("configurations") {
            serde_json::from_value(raw.clone()).map_err(|source| ManifestError::Json {
                file: file_label.to_string(),
                source,
            })?
        } else {
            BuildConfiguration::defaults()
        };

        let abstracts = root_obj
            .get("abstracts")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let raw_targets = root_obj.get("targets").and_then(Value::as_object).cloned().unwrap_or_default();

        let mut seen_names = BTreeSet::new();
        let mut targets = IndexMap::new();
        for (name, raw_target) in raw_targets.iter() {
            if name.starts_with("abstracts:") {
                continue;
            }
            if !Target::validate_name(name) {
                return Err(ManifestError::InvalidTargetName {
                    file: file_label.to_string(),
                    target: name.clone(),
                });
            }
            if !seen_names.insert(name.clone()) {
                return Err(ManifestError::DuplicateTarget {
                    file: file_label.to_string(),
                    target: name.clone(),
                });
            }

            let mut resolved = resolve_extends(raw_target, &abstracts, file_label, name)?;
            apply_value_matching(&mut resolved, &ctx.condition);

            let include_in_build = evaluate_condition(&resolved, &ctx.condition, file_label, name)?;
            let output_description = resolved.get("outputDescription").and_then(Value::as_str).map(str::to_string);
            let depends_on = resolved.get("dependsOn").map(string_list).unwrap_or_default();

            let kind: TargetKind =
                serde_json::from_value(resolved.clone()).map_err(|source| classify_target_error(source, file_label, name, &resolved))?;

            targets.insert(
                name.clone(),
                Target {
                    name: name.clone(),
                    include_in_build,
                    output_description,
                    depends_on,
                    kind,
                },
            );
        }

        let raw_deps = root_obj.get("externalDependencies").and_then(Value::as_object).cloned().unwrap_or_default();
        let mut external_dependencies = Vec::new();
        for (name, raw) in raw_deps.iter() {
            let kind: ExternalDependencyKind = serde_json::from_value(raw.clone())
                .map_err(|source| ManifestError::TargetShape { file: file_label.to_string(), source })?;
            external_dependencies.push(ExternalDependency::new(name, external_dir, kind));
        }

        let raw_dist = root_obj.get("distribution").and_then(Value::as_object).cloned().unwrap_or_default();
        let mut distribution = IndexMap::new();
        for (name, raw) in raw_dist.iter() {
            let include_in_distribution = evaluate_condition(raw, &ctx.condition, file_label, name)?;
            let kind: DistributionKind = serde_json::from_value(raw.clone())
                .map_err(|source| ManifestError::TargetShape { file: file_label.to_string(), source })?;
            if let DistributionKind::Bundle(bundle) = &kind {
                match targets.get(&bundle.main_executable) {
                    Some(t) if t.is_library_or_executable() => {}
                    _ => {
                        return Err(ManifestError::DistributionMissingTarget {
                            file: file_label.to_string(),
                            bundle: name.clone(),
                            target: bundle.main_executable.clone(),
                        })
                    }
                }
            }
            distribution.insert(
                name.clone(),
                DistributionTarget { name: name.clone(), include_in_distribution, kind },
            );
        }

        Ok(Manifest {
            workspace_name,
            version,
            search_paths,
            default_configurations,
            configurations,
            external_dependencies,
            targets,
            distribution,
        })
    }
}

fn classify_target_error(source: serde_json::Error, file_label: &str, target: &str, value: &Value) -> ManifestError {
    if let Some(kind) = value.get("kind").and_then(Value::as_str) {
        let known = [
            "executable",
            "staticLibrary",
            "sharedLibrary",
            "chaletProject",
            "cmakeProject",
            "script",
            "process",
            "validation",
        ];
        if !known.contains(&kind) {
            return ManifestError::UnknownKind {
                file: file_label.to_string(),
                target: target.to_string(),
                kind: kind.to_string(),
            };
        }
    } else {
        return ManifestError::BlankField {
            file: file_label.to_string(),
            target: target.to_string(),
            field: "kind".to_string(),
        };
    }
    ManifestError::TargetShape { file: file_label.to_string(), source }
}

fn is_yaml(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"))
}

fn string_list(v: &Value) -> Vec<String> {
    match v {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().filter_map(|i| i.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

/// Evaluate a node's `condition` field, if present; absent condition means
/// "always included".
fn evaluate_condition(value: &Value, ctx: &ConditionContext, file_label: &str, target: &str) -> Result<bool, ManifestError> {
    match value.get("condition").and_then(Value::as_str) {
        Some(cond) => condition::evaluate(cond, ctx).map_err(|source| ManifestError::Condition {
            file: file_label.to_string(),
            target: target.to_string(),
            source,
        }),
        None => Ok(true),
    }
}

/// Resolve `extends: name` by copying the abstract's fields first, then
/// layering the concrete target's own fields over them (scalar: replace,
/// list: append-unique, map: merge) — spec §4.1.
fn resolve_extends(raw_target: &Value, abstracts: &Map<String, Value>, file_label: &str, target_name: &str) -> Result<Value, ManifestError> {
    let Some(extends) = raw_target.get("extends").and_then(Value::as_str) else {
        return Ok(raw_target.clone());
    };

    let abstract_value = abstracts
        .get(extends)
        .or_else(|| abstracts.get(&format!("abstracts:{extends}")))
        .ok_or_else(|| ManifestError::UnresolvedExtends {
            file: file_label.to_string(),
            target: target_name.to_string(),
            abstract_name: extends.to_string(),
        })?;

    let mut merged = abstract_value.clone();
    merge_overlay(&mut merged, raw_target);
    if let Some(obj) = merged.as_object_mut() {
        obj.remove("extends");
    }
    Ok(merged)
}

fn merge_overlay(base: &mut Value, overlay: &Value) {
    let Value::Object(overlay_map) = overlay else {
        *base = overlay.clone();
        return;
    };
    let Value::Object(mut result) = base.clone() else {
        *base = overlay.clone();
        return;
    };
    for (key, overlay_val) in overlay_map {
        match result.get_mut(key) {
            Some(existing) if existing.is_array() && overlay_val.is_array() => {
                let mut merged_arr = existing.as_array().cloned().unwrap_or_default();
                for item in overlay_val.as_array().cloned().unwrap_or_default() {
                    if !merged_arr.contains(&item) {
                        merged_arr.push(item);
                    }
                }
                *existing = Value::Array(merged_arr);
            }
            Some(existing) if existing.is_object() && overlay_val.is_object() => {
                merge_overlay(existing, overlay_val);
            }
            _ => {
                result.insert(key.clone(), overlay_val.clone());
            }
        }
    }
    *base = Value::Object(result);
}

/// Route `baseKey[condition]` decorated values into `baseKey` when the
/// filter passes, across the whole tree (spec §4.1 "value-matching
/// convention").
fn apply_value_matching(value: &mut Value, ctx: &ConditionContext) {
    if let Value::Object(map) = value {
        let decorated: Vec<(String, String, String, Value)> = map
            .iter()
            .filter_map(|(k, v)| {
                let open = k.find('[')?;
                if !k.ends_with(']') {
                    return None;
                }
                let base = k[..open].to_string();
                let filter = k[open + 1..k.len() - 1].to_string();
                Some((k.clone(), base, filter, v.clone()))
            })
            .collect();

        for (orig_key, base_key, filter, filtered_value) in decorated {
            map.remove(&orig_key);
            let passes = condition::evaluate(&format!("[{filter}]"), ctx).unwrap_or(false);
            if passes {
                map.insert(base_key, filtered_value);
            }
        }

        for v in map.values_mut() {
            apply_value_matching(v, ctx);
        }
    } else if let Value::Array(items) = value {
        for item in items {
            apply_value_matching(item, ctx);
        }
    }
}

fn substitute_strings(value: &mut Value, vars: &VariableSpace) -> Result<(), VariableError> {
    match value {
        Value::String(s) => {
            *s = vars.substitute(s)?;
        }
        Value::Array(items) => {
            for item in items {
                substitute_strings(item, vars)?;
            }
        }
        Value::Object(map) => {
            for v in map.values_mut() {
                substitute_strings(v, vars)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx() -> ManifestContext {
        ManifestContext::new("linux", "x64", "gnu", "Debug", false, true)
    }

    fn external_dir() -> PathBuf {
        PathBuf::from("/tmp/external")
    }

    #[test]
    fn hello_world_executable_parses() {
        let manifest = r#"
        {
            "workspace": "hello",
            "version": "1.0.0",
            "targets": {
                "app": {
                    "kind": "executable",
                    "language": "cxx",
                    "files": ["main.cpp"]
                }
            }
        }
        "#;
        let m = Manifest::parse(manifest, "hello.json", &ctx(), &external_dir(), false).unwrap();
        assert_eq!(m.workspace_name, "hello");
        assert!(m.targets.contains_key("app"));
        assert!(m.targets["app"].include_in_build);
    }

    #[test]
    fn condition_excludes_target() {
        let manifest = r#"
        {
            "workspace": "hello",
            "targets": {
                "app": { "kind": "executable", "language": "cxx", "files": ["main.cpp"] },
                "winonly": {
                    "kind": "executable",
                    "language": "cxx",
                    "files": ["win.cpp"],
                    "condition": "[platform:windows]"
                }
            }
        }
        "#;
        let m = Manifest::parse(manifest, "hello.json", &ctx(), &external_dir(), false).unwrap();
        assert!(m.targets["app"].include_in_build);
        assert!(!m.targets["winonly"].include_in_build);
    }

    #[test]
    fn variable_expansion_in_defines() {
        let manifest = r#"
        {
            "workspace": "hello",
            "targets": {
                "app": {
                    "kind": "executable",
                    "language": "cxx",
                    "files": ["main.cpp"],
                    "defines": ["BUILD=${configuration}"]
                }
            }
        }
        "#;
        let m = Manifest::parse(manifest, "hello.json", &ctx(), &external_dir(), false).unwrap();
        let src = m.targets["app"].as_source().unwrap();
        assert_eq!(src.defines, vec!["BUILD=Debug".to_string()]);
    }

    #[test]
    fn unknown_kind_fails() {
        let manifest = r#"
        {
            "workspace": "hello",
            "targets": { "app": { "kind": "bogus" } }
        }
        "#;
        let err = Manifest::parse(manifest, "hello.json", &ctx(), &external_dir(), false).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownKind { .. }));
    }

    #[test]
    fn extends_merges_abstract_fields() {
        let manifest = r#"
        {
            "workspace": "hello",
            "abstracts": {
                "common": {
                    "kind": "executable",
                    "language": "cxx",
                    "includeDirs": ["include"]
                }
            },
            "targets": {
                "app": {
                    "extends": "common",
                    "files": ["main.cpp"],
                    "includeDirs": ["src"]
                }
            }
        }
        "#;
        let m = Manifest::parse(manifest, "hello.json", &ctx(), &external_dir(), false).unwrap();
        let src = m.targets["app"].as_source().unwrap();
        assert_eq!(src.include_dirs.len(), 2);
    }

    #[test]
    fn unresolved_extends_fails() {
        let manifest = r#"
        {
            "workspace": "hello",
            "targets": { "app": { "extends": "missing" } }
        }
        "#;
        let err = Manifest::parse(manifest, "hello.json", &ctx(), &external_dir(), false).unwrap_err();
        assert!(matches!(err, ManifestError::UnresolvedExtends { .. }));
    }

    #[test]
    fn distribution_requires_existing_build_target() {
        let manifest = r#"
        {
            "workspace": "hello",
            "targets": {
                "app": { "kind": "executable", "language": "cxx", "files": ["main.cpp"] }
            },
            "distribution": {
                "release": {
                    "kind": "bundle",
                    "mainExecutable": "missing",
                    "configuration": "Release"
                }
            }
        }
        "#;
        let err = Manifest::parse(manifest, "hello.json", &ctx(), &external_dir(), false).unwrap_err();
        assert!(matches!(err, ManifestError::DistributionMissingTarget { .. }));
    }

    #[test]
    fn find_manifest_searches_upward() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest_path = tmp.path().join("crucible.json");
        std::fs::write(&manifest_path, "{}").unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_manifest(&nested).unwrap(), manifest_path);
    }

    #[test]
    fn find_manifest_rejects_ambiguity() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("crucible.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("crucible.yaml"), "").unwrap();

        let err = find_manifest(tmp.path()).unwrap_err();
        assert!(matches!(err, ManifestDiscoveryError::Ambiguous { .. }));
    }

    #[test]
    fn default_configurations_used_when_absent() {
        let manifest = r#"{ "workspace": "hello", "targets": {} }"#;
        let m = Manifest::parse(manifest, "hello.json", &ctx(), &external_dir(), false).unwrap();
        assert_eq!(m.configurations.len(), 5);
    }
}
