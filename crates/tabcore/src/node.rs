use crate::{ConfigIssue, GraphError, ToolConfig, ToolKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type ToolId = u64;

/// Id of the permanent root sentinel.
pub const ROOT_ID: ToolId = 0;

/// Upper bound for both canvas axes.
pub const MAX_CANVAS_SIZE: i64 = 10_000;

/// Position of a tool on the editor canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
}

impl Coordinates {
    /// Range-checked constructor.
    pub fn new(x: i64, y: i64) -> Result<Self, GraphError> {
        let in_range = |v: i64| (0..=MAX_CANVAS_SIZE).contains(&v);
        if !in_range(x) || !in_range(y) {
            return Err(GraphError::CoordinatesOutOfRange {
                x,
                y,
                max: MAX_CANVAS_SIZE,
            });
        }
        Ok(Self { x, y })
    }

    /// Builds coordinates from loosely typed JSON, coercing integral numbers
    /// and numeric strings.
    pub fn from_json(x: &serde_json::Value, y: &serde_json::Value) -> Result<Self, GraphError> {
        Self::new(coerce_int(x)?, coerce_int(y)?)
    }
}

fn coerce_int(value: &serde_json::Value) -> Result<i64, GraphError> {
    let coerced = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    coerced.ok_or_else(|| GraphError::InvalidCoordinates(value.to_string()))
}

/// Non-fatal problems recorded on a tool.
///
/// Entries accumulate across mutations and are only cleared by
/// [`ToolNode::clean_errors`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<ConfigIssue>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.config.is_empty()
    }
}

/// A vertex of the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolNode {
    id: ToolId,
    kind: ToolKind,
    max_inputs: usize,
    inputs: BTreeSet<ToolId>,
    outputs: BTreeSet<ToolId>,
    config: Option<ToolConfig>,
    coordinates: Option<Coordinates>,
    errors: Diagnostics,
}

impl ToolNode {
    pub(crate) fn new(id: ToolId, kind: ToolKind, max_inputs: usize) -> Self {
        Self {
            id,
            kind,
            max_inputs,
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
            config: None,
            coordinates: None,
            errors: Diagnostics::default(),
        }
    }

    pub(crate) fn root() -> Self {
        Self::new(ROOT_ID, ToolKind::Root, 0)
    }

    pub fn id(&self) -> ToolId {
        self.id
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn is_root(&self) -> bool {
        self.kind.is_root()
    }

    pub fn max_inputs(&self) -> usize {
        self.max_inputs
    }

    pub fn inputs(&self) -> &BTreeSet<ToolId> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<ToolId> {
        &self.outputs
    }

    pub fn number_of_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn config(&self) -> Option<&ToolConfig> {
        self.config.as_ref()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn errors(&self) -> &Diagnostics {
        &self.errors
    }

    pub fn clean_errors(&mut self) {
        self.errors = Diagnostics::default();
    }

    /// Adds an input unless capacity is exhausted, in which case the attempt
    /// is recorded under `errors.input`. Returns whether the edge now exists.
    pub(crate) fn try_add_input(&mut self, input_id: ToolId) -> bool {
        if self.inputs.contains(&input_id) {
            return true;
        }
        if input_id == ROOT_ID {
            self.errors.input.push(format!(
                "Skipped input addition for {} - root tool cannot feed other tools.",
                input_id
            ));
            return false;
        }
        if self.inputs.len() >= self.max_inputs {
            self.errors.input.push(format!(
                "Skipped input addition for {} - max number of inputs ({}) reached.",
                input_id, self.max_inputs
            ));
            return false;
        }
        self.inputs.insert(input_id);
        true
    }

    pub(crate) fn remove_input(&mut self, input_id: ToolId) {
        self.inputs.remove(&input_id);
    }

    pub(crate) fn add_output(&mut self, output_id: ToolId) {
        self.outputs.insert(output_id);
    }

    pub(crate) fn remove_output(&mut self, output_id: ToolId) {
        self.outputs.remove(&output_id);
    }

    pub(crate) fn set_config(&mut self, config: ToolConfig) {
        self.config = Some(config);
    }

    pub(crate) fn record_config_issues(&mut self, issues: Vec<ConfigIssue>) {
        self.errors.config.extend(issues);
    }

    pub(crate) fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.coordinates = Some(coordinates);
    }
}
