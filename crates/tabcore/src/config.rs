//! Tool kinds and their typed configuration.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use strum::{AsRefStr, Display, EnumString};
use validator::{Validate, ValidationError, ValidationErrors};

/// Closed set of tool kinds a workflow can contain.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolKind {
    /// The permanent id-0 sentinel. Never inserted, never configured.
    Root,
    InputUrl,
    DescribeData,
    JoinData,
    ConcatData,
}

impl ToolKind {
    pub fn is_root(&self) -> bool {
        matches!(self, ToolKind::Root)
    }
}

/// One field-level problem found while validating config data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigIssue {
    pub field: String,
    pub kind: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(
        field: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Flattens `validator` errors into sorted issues.
pub fn issues_from(errors: &ValidationErrors) -> Vec<ConfigIssue> {
    let mut issues: Vec<ConfigIssue> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .clone()
                    .unwrap_or_else(|| {
                        Cow::Owned(format!("Field '{}' failed '{}' validation", field, e.code))
                    });
                ConfigIssue::new(field.to_string(), e.code.to_string(), message.to_string())
            })
        })
        .collect();
    issues.sort_by(|a, b| (&a.field, &a.kind).cmp(&(&b.field, &b.kind)));
    issues
}

/// Configuration of a single tool, tagged by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolConfig {
    InputUrl(InputUrlConfig),
    DescribeData(DescribeDataConfig),
    JoinData(JoinDataConfig),
    ConcatData(ConcatDataConfig),
}

impl ToolConfig {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolConfig::InputUrl(_) => ToolKind::InputUrl,
            ToolConfig::DescribeData(_) => ToolKind::DescribeData,
            ToolConfig::JoinData(_) => ToolKind::JoinData,
            ToolConfig::ConcatData(_) => ToolKind::ConcatData,
        }
    }

    /// Input capacity injected by the registry when the config was parsed.
    pub fn max_inputs(&self) -> usize {
        match self {
            ToolConfig::InputUrl(c) => c.max_inputs,
            ToolConfig::DescribeData(c) => c.max_inputs,
            ToolConfig::JoinData(c) => c.max_inputs,
            ToolConfig::ConcatData(c) => c.max_inputs,
        }
    }

    /// Config used when a tool that needs none was never configured.
    pub fn default_for(kind: ToolKind, max_inputs: usize) -> Option<Self> {
        match kind {
            ToolKind::DescribeData => Some(ToolConfig::DescribeData(DescribeDataConfig {
                max_inputs,
                ..Default::default()
            })),
            ToolKind::ConcatData => Some(ToolConfig::ConcatData(ConcatDataConfig {
                max_inputs,
                ..Default::default()
            })),
            ToolKind::Root | ToolKind::InputUrl | ToolKind::JoinData => None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            ToolConfig::InputUrl(c) => c.validate(),
            ToolConfig::DescribeData(c) => c.validate(),
            ToolConfig::JoinData(c) => c.validate(),
            ToolConfig::ConcatData(c) => c.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InputUrlConfig {
    #[serde(default)]
    pub max_inputs: usize,

    #[validate(url(message = "Enter a valid URL."))]
    #[serde(default)]
    pub url: String,

    #[validate(custom(function = "validate_extension"))]
    #[serde(default = "default_extension")]
    pub extension: String,

    #[validate(length(equal = 1, message = "Separator must be a single character."))]
    #[serde(default)]
    pub separator: Option<String>,
}

impl InputUrlConfig {
    pub fn separator(&self) -> char {
        match self.separator.as_deref().and_then(|s| s.chars().next()) {
            Some(c) => c,
            None if self.extension == "tsv" => '\t',
            None => ',',
        }
    }
}

const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

fn default_extension() -> String {
    "csv".to_string()
}

fn validate_extension(extension: &str) -> Result<(), ValidationError> {
    if SUPPORTED_EXTENSIONS.contains(&extension) {
        return Ok(());
    }
    let mut err = ValidationError::new("choice");
    err.message = Some(Cow::Owned(format!(
        "Unsupported extension '{}', expected one of {:?}.",
        extension, SUPPORTED_EXTENSIONS
    )));
    Err(err)
}

/// Which columns a describe summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescribeMode {
    All,
    Numeric,
    Object,
    Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DescribeDataConfig {
    #[serde(default)]
    pub max_inputs: usize,

    #[validate(range(min = 0, max = 3))]
    #[serde(default = "default_data_type")]
    pub data_type: i64,
}

fn default_data_type() -> i64 {
    1
}

impl Default for DescribeDataConfig {
    fn default() -> Self {
        Self {
            max_inputs: 0,
            data_type: default_data_type(),
        }
    }
}

impl DescribeDataConfig {
    /// None when `data_type` is out of range (validation rejects that).
    pub fn mode(&self) -> Option<DescribeMode> {
        match self.data_type {
            0 => Some(DescribeMode::All),
            1 => Some(DescribeMode::Numeric),
            2 => Some(DescribeMode::Object),
            3 => Some(DescribeMode::Category),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinHow {
    #[default]
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct JoinDataConfig {
    #[serde(default)]
    pub max_inputs: usize,

    #[validate(length(min = 1, message = "Join column is required."))]
    #[serde(default)]
    pub on: String,

    #[serde(default)]
    pub how: JoinHow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ConcatDataConfig {
    #[serde(default)]
    pub max_inputs: usize,

    #[serde(default = "default_ignore_index")]
    pub ignore_index: bool,
}

fn default_ignore_index() -> bool {
    true
}

impl Default for ConcatDataConfig {
    fn default() -> Self {
        Self {
            max_inputs: 0,
            ignore_index: default_ignore_index(),
        }
    }
}
