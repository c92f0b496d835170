use crate::node::ROOT_ID;
use crate::ordering::ExecutionPlan;
use crate::{Coordinates, GraphError, ToolId, ToolKind, ToolNode, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

pub type WorkflowId = Uuid;

/// Request to insert a tool into a graph.
#[derive(Debug, Clone, Default)]
pub struct NewTool {
    pub tool_type: String,
    pub inputs: Vec<ToolId>,
    pub outputs: Vec<ToolId>,
    pub coordinates: Option<(i64, i64)>,
}

impl NewTool {
    pub fn new(tool_type: impl Into<String>) -> Self {
        Self {
            tool_type: tool_type.into(),
            ..Default::default()
        }
    }

    pub fn with_inputs(mut self, ids: impl IntoIterator<Item = ToolId>) -> Self {
        self.inputs.extend(ids);
        self
    }

    pub fn with_outputs(mut self, ids: impl IntoIterator<Item = ToolId>) -> Self {
        self.outputs.extend(ids);
        self
    }

    pub fn with_coordinates(mut self, x: i64, y: i64) -> Self {
        self.coordinates = Some((x, y));
        self
    }
}

/// Persisted shape of one tool, as handed over by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: ToolId,
    #[serde(rename = "type")]
    pub tool_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub inputs: Vec<ToolId>,
    #[serde(default)]
    pub x: serde_json::Value,
    #[serde(default)]
    pub y: serde_json::Value,
}

/// The tools of one workflow and the edges between them.
///
/// Always contains the root sentinel under id 0. Ids are allocated
/// monotonically and never handed out twice, even after removal.
pub struct WorkflowGraph {
    id: WorkflowId,
    registry: Arc<ToolRegistry>,
    tools: BTreeMap<ToolId, ToolNode>,
    used_ids: BTreeSet<ToolId>,
}

impl WorkflowGraph {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_id(Uuid::new_v4(), registry)
    }

    pub fn with_id(id: WorkflowId, registry: Arc<ToolRegistry>) -> Self {
        let mut tools = BTreeMap::new();
        tools.insert(ROOT_ID, ToolNode::root());
        Self {
            id,
            registry,
            tools,
            used_ids: BTreeSet::from([ROOT_ID]),
        }
    }

    /// Rebuilds a graph from persisted records, keeping their ids.
    ///
    /// Edges go through the same capacity checks as [`Self::add_input`] and
    /// configs through [`Self::set_config`], so diagnostics survive a reload.
    pub fn from_records(
        id: WorkflowId,
        registry: Arc<ToolRegistry>,
        records: &[ToolRecord],
    ) -> Result<Self, GraphError> {
        let mut graph = Self::with_id(id, registry);

        for record in records {
            let kind = ToolKind::from_str(&record.tool_type)
                .ok()
                .filter(|k| !k.is_root() && graph.registry.contains(*k))
                .ok_or_else(|| GraphError::UnknownToolType(record.tool_type.clone()))?;
            if graph.used_ids.contains(&record.id) {
                return Err(GraphError::DuplicateToolId(record.id));
            }
            let max_inputs = graph.registry.max_inputs(kind)?;
            graph.tools.insert(record.id, ToolNode::new(record.id, kind, max_inputs));
            graph.used_ids.insert(record.id);
        }

        for record in records {
            graph.add_input(record.id, record.inputs.iter().copied())?;
        }

        for record in records {
            let unset = match &record.config {
                serde_json::Value::Null => true,
                serde_json::Value::Object(map) => map.is_empty(),
                _ => false,
            };
            if !unset {
                graph.set_config(record.id, &record.config)?;
            }
            if !(record.x.is_null() && record.y.is_null()) {
                let coordinates = Coordinates::from_json(&record.x, &record.y)?;
                graph.tool_mut(record.id)?.set_coordinates(coordinates);
            }
        }

        tracing::debug!("Loaded workflow {} with {} tools", graph.id, graph.size());
        Ok(graph)
    }

    pub fn id(&self) -> WorkflowId {
        self.id
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Inserts a new tool and wires its initial edges.
    ///
    /// Ids and coordinates are checked before anything changes, so a failed
    /// insert leaves the graph untouched and consumes no id.
    pub fn insert_node(&mut self, new: NewTool) -> Result<&ToolNode, GraphError> {
        let kind = ToolKind::from_str(&new.tool_type)
            .ok()
            .filter(|k| !k.is_root() && self.registry.contains(*k))
            .ok_or_else(|| GraphError::ToolNotAvailable(new.tool_type.clone()))?;
        let max_inputs = self.registry.max_inputs(kind)?;

        let inputs = self.clean_ids(new.inputs)?;
        let outputs = self.clean_ids(new.outputs)?;
        let coordinates = new
            .coordinates
            .map(|(x, y)| Coordinates::new(x, y))
            .transpose()?;

        let id = self.next_id()?;
        self.tools.insert(id, ToolNode::new(id, kind, max_inputs));
        self.used_ids.insert(id);

        for input_id in inputs {
            self.link(id, input_id);
        }
        for output_id in outputs {
            self.link(output_id, id);
        }
        if let Some(coordinates) = coordinates {
            self.tool_mut(id)?.set_coordinates(coordinates);
        }

        tracing::debug!("Inserted {} tool {} into workflow {}", kind, id, self.id);
        self.tool(id)
    }

    /// Removes tools and detaches them from their neighbours.
    ///
    /// Every id is validated, and the batch is rejected if it names the root,
    /// before any tool is removed.
    pub fn remove_node(&mut self, ids: impl IntoIterator<Item = ToolId>) -> Result<(), GraphError> {
        let ids = self.clean_ids(ids)?;
        if ids.contains(&ROOT_ID) {
            return Err(GraphError::RootCannotBeDeleted);
        }

        for id in ids {
            let tool = self.tool(id)?;
            let outputs: Vec<ToolId> = tool.outputs().iter().copied().collect();
            let inputs: Vec<ToolId> = tool.inputs().iter().copied().collect();

            for output_id in outputs {
                self.unlink(output_id, id);
            }
            for input_id in inputs {
                self.unlink(id, input_id);
            }
            self.tools.remove(&id);
            tracing::debug!("Removed tool {} from workflow {}", id, self.id);
        }

        Ok(())
    }

    /// Adds inputs to a tool. Capacity overflows are recorded on the tool
    /// rather than returned.
    pub fn add_input(
        &mut self,
        tool_id: ToolId,
        input_ids: impl IntoIterator<Item = ToolId>,
    ) -> Result<&ToolNode, GraphError> {
        self.tool(tool_id)?;
        let input_ids = self.clean_ids(input_ids)?;

        for input_id in input_ids {
            self.link(tool_id, input_id);
        }
        self.tool(tool_id)
    }

    /// Removes inputs from a tool. Ids that are not inputs are ignored.
    pub fn remove_input(
        &mut self,
        tool_id: ToolId,
        input_ids: impl IntoIterator<Item = ToolId>,
    ) -> Result<&ToolNode, GraphError> {
        self.tool(tool_id)?;
        let input_ids = self.clean_ids(input_ids)?;

        for input_id in input_ids {
            self.unlink(tool_id, input_id);
        }
        self.tool(tool_id)
    }

    /// Validates and stores a tool's config. Invalid data leaves the previous
    /// config in place and is recorded under `errors.config`.
    pub fn set_config(
        &mut self,
        tool_id: ToolId,
        data: &serde_json::Value,
    ) -> Result<&ToolNode, GraphError> {
        let kind = self.tool(tool_id)?.kind();
        if kind.is_root() {
            return Err(GraphError::RootNotConfigurable);
        }

        let parsed = self.registry.parse_config(kind, data);
        let tool = self.tool_mut(tool_id)?;
        match parsed {
            Ok(config) => tool.set_config(config),
            Err(issues) => {
                tracing::debug!(
                    "Config for tool {} rejected with {} issue(s)",
                    tool_id,
                    issues.len()
                );
                tool.record_config_issues(issues);
            }
        }
        self.tool(tool_id)
    }

    /// Places a tool on the canvas, defaulting to the origin.
    pub fn set_coordinates(
        &mut self,
        tool_id: ToolId,
        coordinates: Option<(i64, i64)>,
    ) -> Result<&ToolNode, GraphError> {
        self.tool(tool_id)?;
        let (x, y) = coordinates.unwrap_or_default();
        let coordinates = Coordinates::new(x, y)?;
        self.tool_mut(tool_id)?.set_coordinates(coordinates);
        self.tool(tool_id)
    }

    pub fn clean_errors(&mut self, tool_id: ToolId) -> Result<&ToolNode, GraphError> {
        self.tool_mut(tool_id)?.clean_errors();
        self.tool(tool_id)
    }

    /// Runnable tools, each placed after all of its inputs.
    pub fn execution_order(&self) -> Result<Vec<&ToolNode>, GraphError> {
        let plan = self.execution_plan()?;
        Ok(plan.order().filter_map(|id| self.tools.get(&id)).collect())
    }

    pub fn execution_plan(&self) -> Result<ExecutionPlan, GraphError> {
        ExecutionPlan::build(self)
    }

    pub fn tool(&self, tool_id: ToolId) -> Result<&ToolNode, GraphError> {
        self.tools
            .get(&tool_id)
            .ok_or(GraphError::ToolDoesNotExist(tool_id))
    }

    pub fn root(&self) -> Result<&ToolNode, GraphError> {
        self.tool(ROOT_ID)
    }

    /// Every tool except the root, in ascending id order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolNode> + '_ {
        self.tools.values().filter(|t| !t.is_root())
    }

    /// Number of tools, not counting the root.
    pub fn size(&self) -> usize {
        self.tools.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Whether any tool carries input or config diagnostics.
    pub fn has_errors(&self) -> bool {
        self.tools.values().any(|t| !t.errors().is_empty())
    }

    fn tool_mut(&mut self, tool_id: ToolId) -> Result<&mut ToolNode, GraphError> {
        self.tools
            .get_mut(&tool_id)
            .ok_or(GraphError::ToolDoesNotExist(tool_id))
    }

    /// Deduplicates ids, failing if any of them is unknown.
    fn clean_ids(
        &self,
        ids: impl IntoIterator<Item = ToolId>,
    ) -> Result<BTreeSet<ToolId>, GraphError> {
        let ids: BTreeSet<ToolId> = ids.into_iter().collect();
        match ids.iter().find(|id| !self.tools.contains_key(id)) {
            Some(missing) => Err(GraphError::ToolDoesNotExist(*missing)),
            None => Ok(ids),
        }
    }

    fn next_id(&self) -> Result<ToolId, GraphError> {
        match self.used_ids.last() {
            Some(id) => id.checked_add(1).ok_or(GraphError::IdSpaceExhausted),
            None => Ok(ROOT_ID),
        }
    }

    /// The only place an edge is created; keeps `outputs` the inverse of
    /// `inputs`.
    fn link(&mut self, tool_id: ToolId, input_id: ToolId) {
        let added = match self.tools.get_mut(&tool_id) {
            Some(tool) => tool.try_add_input(input_id),
            None => false,
        };
        if added {
            if let Some(input) = self.tools.get_mut(&input_id) {
                input.add_output(tool_id);
            }
        }
    }

    fn unlink(&mut self, tool_id: ToolId, input_id: ToolId) {
        if let Some(tool) = self.tools.get_mut(&tool_id) {
            tool.remove_input(input_id);
        }
        if let Some(input) = self.tools.get_mut(&input_id) {
            input.remove_output(tool_id);
        }
    }
}

impl fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("id", &self.id)
            .field("tools", &self.tools)
            .finish()
    }
}
