use async_trait::async_trait;
use tabcore::{
    ConcatDataConfig, FieldDefinition, Table, ToolConfig, ToolContext, ToolError, ToolExecutor,
    ToolFactory, ToolKind, ToolMetadata, Value,
};

/// Stacks the rows of every input in ascending input id order
pub struct ConcatDataTool {
    config: ConcatDataConfig,
}

impl ConcatDataTool {
    pub fn new(config: ConcatDataConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolExecutor for ConcatDataTool {
    async fn run(&self, ctx: ToolContext) -> Result<Table, ToolError> {
        let inputs = ctx.require_inputs(1)?;
        Ok(concat(&inputs, self.config.ignore_index))
    }
}

/// Union of columns in first-appearance order; cells a table lacks are null.
pub fn concat(tables: &[&Table], ignore_index: bool) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for table in tables {
        for name in table.columns() {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
    }

    let mut result = Table::new(columns);
    for table in tables {
        let positions: Vec<Option<usize>> = result
            .columns()
            .iter()
            .map(|name| table.column_position(name))
            .collect();

        for (label, row) in table.index().iter().zip(table.rows()) {
            let cells: Vec<Value> = positions
                .iter()
                .map(|pos| pos.map(|p| row[p].clone()).unwrap_or(Value::Null))
                .collect();
            if ignore_index {
                result.push_row(cells);
            } else {
                result.push_labelled_row(label.clone(), cells);
            }
        }
    }

    result
}

pub struct ConcatDataFactory;

impl ToolFactory for ConcatDataFactory {
    fn kind(&self) -> ToolKind {
        ToolKind::ConcatData
    }

    fn max_inputs(&self) -> usize {
        10
    }

    fn create(&self, config: &ToolConfig) -> Result<Box<dyn ToolExecutor>, ToolError> {
        match config {
            ToolConfig::ConcatData(config) => Ok(Box::new(ConcatDataTool::new(config.clone()))),
            _ => Err(ToolError::MissingConfig),
        }
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Stack the rows of up to ten tables".to_string(),
            category: "combine".to_string(),
            fields: vec![
                FieldDefinition::new("max_inputs", "Input capacity").read_only(),
                FieldDefinition::new("ignore_index", "Renumber rows from 0 (default true)"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_unioned_and_missing_cells_are_null() {
        let a = Table::from_delimited("x,y\n1,2\n", ',').unwrap();
        let b = Table::from_delimited("y,z\n3,4\n5,6\n", ',').unwrap();

        let stacked = concat(&[&a, &b], true);
        assert_eq!(stacked.columns(), ["x", "y", "z"]);
        assert_eq!(
            stacked.rows(),
            [
                vec![Value::Integer(1), Value::Integer(2), Value::Null],
                vec![Value::Null, Value::Integer(3), Value::Integer(4)],
                vec![Value::Null, Value::Integer(5), Value::Integer(6)],
            ]
        );
        assert_eq!(stacked.index(), [Value::Integer(0), Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn input_labels_are_kept_on_request() {
        let a = Table::from_delimited("x\n1\n2\n", ',').unwrap();
        let stacked = concat(&[&a, &a], false);
        assert_eq!(
            stacked.index(),
            [Value::Integer(0), Value::Integer(1), Value::Integer(0), Value::Integer(1)]
        );
    }
}
