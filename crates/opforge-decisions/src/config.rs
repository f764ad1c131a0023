//! Generation configuration and the plan derived from it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::decision::DecisionSet;
use crate::error::ConfigError;
use crate::loader::load_decisions;

/// Environment variable that requests execution tracing.
pub const TRACING_ENV_VAR: &str = "OPFORGE_ENABLE_TRACING";

/// Whether tracing was requested through [`TRACING_ENV_VAR`].
pub fn tracing_requested_from_env() -> bool {
    std::env::var(TRACING_ENV_VAR)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false)
}

/// Generation options declared alongside an interpreter definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Main decisions file, relative to the declaring artifact
    pub decisions_file: Option<PathBuf>,

    /// Override decision files, merged after the main file in this order
    pub decisions_override_files: Vec<PathBuf>,

    /// Trace even when the environment did not ask for it
    pub force_tracing: bool,

    /// Types to eliminate boxing for
    pub boxing_elimination_types: Vec<String>,
}

impl GenerationConfig {
    /// Read a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Primitive types that support boxing elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxableType {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `long`
    Long,
    /// `double`
    Double,
}

impl BoxableType {
    /// The configuration spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            BoxableType::Boolean => "boolean",
            BoxableType::Byte => "byte",
            BoxableType::Int => "int",
            BoxableType::Float => "float",
            BoxableType::Long => "long",
            BoxableType::Double => "double",
        }
    }
}

impl FromStr for BoxableType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(BoxableType::Boolean),
            "byte" => Ok(BoxableType::Byte),
            "int" => Ok(BoxableType::Int),
            "float" => Ok(BoxableType::Float),
            "long" => Ok(BoxableType::Long),
            "double" => Ok(BoxableType::Double),
            other => Err(ConfigError::UnsupportedBoxingType(other.to_string())),
        }
    }
}

impl fmt::Display for BoxableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the generated interpreter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Neither tracing nor decision-driven optimization
    Plain,
    /// Record execution traces to produce a decisions file
    Tracing,
    /// Apply the loaded decisions
    Optimized,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionMode::Plain => "plain",
            ExecutionMode::Tracing => "tracing",
            ExecutionMode::Optimized => "optimized",
        })
    }
}

/// A configuration with paths resolved, mode decided and decisions loaded.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    /// Resolved main decisions file
    pub decisions_file: Option<PathBuf>,
    /// Resolved override files
    pub override_files: Vec<PathBuf>,
    /// Execution mode
    pub mode: ExecutionMode,
    /// Validated boxing elimination types
    pub boxing_types: Vec<BoxableType>,
    /// Loaded decisions, empty unless the mode is [`ExecutionMode::Optimized`]
    pub decisions: DecisionSet,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

impl GenerationPlan {
    /// Build a plan for `config` declared in the file `artifact`.
    ///
    /// Relative paths are resolved against the artifact's directory. Every
    /// configuration and decision error is returned, not just the first.
    #[instrument(skip(config), fields(artifact = %artifact.display()))]
    pub fn prepare(
        config: &GenerationConfig,
        artifact: &Path,
        tracing_requested: bool,
    ) -> Result<Self, Vec<ConfigError>> {
        let base = artifact.parent().unwrap_or_else(|| Path::new(""));
        let decisions_file = config.decisions_file.as_deref().map(|p| base.join(p));
        let override_files: Vec<PathBuf> = config
            .decisions_override_files
            .iter()
            .map(|p| base.join(p))
            .collect();

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut boxing_types = Vec::new();
        for name in &config.boxing_elimination_types {
            match name.parse::<BoxableType>() {
                Ok(ty) if !boxing_types.contains(&ty) => boxing_types.push(ty),
                Ok(_) => {}
                Err(err) => errors.push(err),
            }
        }

        let tracing_enabled = match decisions_file {
            Some(_) if tracing_requested => true,
            Some(_) if config.force_tracing => {
                let message = "execution tracing is forced on; use this only during development";
                warn!("{message}");
                warnings.push(message.to_string());
                true
            }
            _ => false,
        };
        let optimize =
            (decisions_file.is_some() || !override_files.is_empty()) && !tracing_enabled;
        let mode = if tracing_enabled {
            ExecutionMode::Tracing
        } else if optimize {
            ExecutionMode::Optimized
        } else {
            ExecutionMode::Plain
        };

        let mut decisions = DecisionSet::new();
        if optimize {
            let outcome = load_decisions(decisions_file.as_deref(), &override_files);
            for ((kind, id), sources) in outcome.decisions.duplicate_ids() {
                let places: Vec<String> = sources.iter().map(ToString::to_string).collect();
                warnings.push(format!(
                    "{kind} '{id}' is declared {} times: {}",
                    sources.len(),
                    places.join(", ")
                ));
            }
            errors.extend(outcome.errors.into_iter().map(ConfigError::from));
            decisions = outcome.decisions;
        }

        if !errors.is_empty() {
            debug!(errors = errors.len(), "Generation plan rejected");
            return Err(errors);
        }

        debug!(%mode, decisions = decisions.len(), "Prepared generation plan");
        Ok(Self {
            decisions_file,
            override_files,
            mode,
            boxing_types,
            decisions,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(decisions: Option<&str>, overrides: &[&str], force: bool) -> GenerationConfig {
        GenerationConfig {
            decisions_file: decisions.map(PathBuf::from),
            decisions_override_files: overrides.iter().map(PathBuf::from).collect(),
            force_tracing: force,
            boxing_elimination_types: Vec::new(),
        }
    }

    #[test]
    fn test_camel_case_fields() {
        let config: GenerationConfig = serde_json::from_str(
            r#"{"decisionsFile": "d.json", "decisionsOverrideFiles": ["o.json"], "forceTracing": true}"#,
        )
        .unwrap();
        assert_eq!(config.decisions_file, Some(PathBuf::from("d.json")));
        assert_eq!(config.decisions_override_files, vec![PathBuf::from("o.json")]);
        assert!(config.force_tracing);
        assert!(config.boxing_elimination_types.is_empty());
    }

    #[test]
    fn test_no_decisions_means_plain() {
        let plan = GenerationPlan::prepare(&config(None, &[], true), Path::new("a/def.json"), true)
            .unwrap();
        assert_eq!(plan.mode, ExecutionMode::Plain);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_requested_tracing_skips_loading() {
        // the decisions file does not exist; tracing must not read it
        let plan = GenerationPlan::prepare(
            &config(Some("missing.json"), &[], false),
            Path::new("a/def.json"),
            true,
        )
        .unwrap();
        assert_eq!(plan.mode, ExecutionMode::Tracing);
        assert_eq!(plan.decisions_file, Some(PathBuf::from("a/missing.json")));
        assert!(plan.decisions.is_empty());
    }

    #[test]
    fn test_forced_tracing_warns() {
        let plan = GenerationPlan::prepare(
            &config(Some("missing.json"), &[], true),
            Path::new("def.json"),
            false,
        )
        .unwrap();
        assert_eq!(plan.mode, ExecutionMode::Tracing);
        assert_eq!(
            plan.warnings,
            vec!["execution tracing is forced on; use this only during development"]
        );
    }

    #[test]
    fn test_forced_tracing_needs_decisions_file() {
        let err = GenerationPlan::prepare(
            &config(None, &["missing.json"], true),
            Path::new("def.json"),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            &err[..],
            [ConfigError::Decision(crate::DecisionError::OverrideFileMissing { .. })]
        ));
    }

    #[test]
    fn test_boxing_types_validated() {
        let mut cfg = config(None, &[], false);
        cfg.boxing_elimination_types = vec!["int".into(), "string".into(), "int".into(), "long".into()];
        let err = GenerationPlan::prepare(&cfg, Path::new("def.json"), false).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err[0].to_string().contains("'string'"));

        cfg.boxing_elimination_types.remove(1);
        let plan = GenerationPlan::prepare(&cfg, Path::new("def.json"), false).unwrap();
        assert_eq!(plan.boxing_types, vec![BoxableType::Int, BoxableType::Long]);
    }
}
