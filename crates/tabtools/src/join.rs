use async_trait::async_trait;
use tabcore::{
    FieldDefinition, JoinDataConfig, JoinHow, Table, ToolConfig, ToolContext, ToolError,
    ToolExecutor, ToolFactory, ToolKind, ToolMetadata, Value,
};

pub const JOIN_ERROR: &str = "join_error";

/// Suffix for right-side columns whose name is already taken on the left.
const RIGHT_SUFFIX: &str = "_right";

/// Joins the lower-id input (left) with the higher-id input (right) on one
/// key column
pub struct JoinDataTool {
    config: JoinDataConfig,
}

impl JoinDataTool {
    pub fn new(config: JoinDataConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolExecutor for JoinDataTool {
    async fn run(&self, ctx: ToolContext) -> Result<Table, ToolError> {
        let inputs = ctx.require_inputs(2)?;
        let joined = join(inputs[0], inputs[1], &self.config.on, self.config.how)?;

        ctx.events.info(format!(
            "Joined on '{}' ({:?}): {} rows",
            self.config.on,
            self.config.how,
            joined.shape().0
        ));
        Ok(joined)
    }
}

pub fn join(left: &Table, right: &Table, on: &str, how: JoinHow) -> Result<Table, ToolError> {
    let missing = || {
        ToolError::processing(
            JOIN_ERROR,
            format!("Join column '{}' is not present in both inputs.", on),
        )
    };
    let left_key = left.column_position(on).ok_or_else(missing)?;
    let right_key = right.column_position(on).ok_or_else(missing)?;

    let right_columns: Vec<usize> = (0..right.columns().len())
        .filter(|&pos| pos != right_key)
        .collect();

    let mut columns = left.columns().to_vec();
    for &pos in &right_columns {
        let name = &right.columns()[pos];
        if left.column_position(name).is_some() {
            columns.push(format!("{}{}", name, RIGHT_SUFFIX));
        } else {
            columns.push(name.clone());
        }
    }

    let mut result = Table::new(columns);
    for left_row in left.rows() {
        let key = &left_row[left_key];
        let matches: Vec<&Vec<Value>> = if key.is_null() {
            Vec::new()
        } else {
            right.rows().iter().filter(|row| &row[right_key] == key).collect()
        };

        if matches.is_empty() {
            if how == JoinHow::Left {
                result.push_row(left_row.clone());
            }
            continue;
        }
        for right_row in matches {
            let mut row = left_row.clone();
            row.extend(right_columns.iter().map(|&pos| right_row[pos].clone()));
            result.push_row(row);
        }
    }

    Ok(result)
}

pub struct JoinDataFactory;

impl ToolFactory for JoinDataFactory {
    fn kind(&self) -> ToolKind {
        ToolKind::JoinData
    }

    fn max_inputs(&self) -> usize {
        2
    }

    fn create(&self, config: &ToolConfig) -> Result<Box<dyn ToolExecutor>, ToolError> {
        match config {
            ToolConfig::JoinData(config) => Ok(Box::new(JoinDataTool::new(config.clone()))),
            _ => Err(ToolError::MissingConfig),
        }
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Join two tables on a key column".to_string(),
            category: "combine".to_string(),
            fields: vec![
                FieldDefinition::new("max_inputs", "Input capacity").read_only(),
                FieldDefinition::new("on", "Key column present in both inputs").required(),
                FieldDefinition::new("how", "inner (default) or left"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Table {
        Table::from_delimited("id,customer,total\n1,7,9.5\n2,8,3\n3,9,12\n4,7,1\n", ',').unwrap()
    }

    fn customers() -> Table {
        Table::from_delimited("customer,name,total\n7,ann,100\n8,bob,50\n", ',').unwrap()
    }

    #[test]
    fn inner_join_keeps_matching_rows_in_left_order() {
        let joined = join(&orders(), &customers(), "customer", JoinHow::Inner).unwrap();

        assert_eq!(joined.columns(), ["id", "customer", "total", "name", "total_right"]);
        assert_eq!(joined.shape(), (3, 5));
        let ids: Vec<_> = joined.rows().iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids, [Value::Integer(1), Value::Integer(2), Value::Integer(4)]);
        assert_eq!(joined.rows()[2][3], Value::from("ann"));
        assert_eq!(joined.index()[2], Value::Integer(2));
    }

    #[test]
    fn left_join_fills_unmatched_rows_with_nulls() {
        let joined = join(&orders(), &customers(), "customer", JoinHow::Left).unwrap();

        assert_eq!(joined.shape(), (4, 5));
        assert_eq!(joined.rows()[2][3], Value::Null);
        assert_eq!(joined.rows()[2][4], Value::Null);
    }

    #[test]
    fn one_left_row_can_match_several_right_rows() {
        let right = Table::from_delimited("customer,tag\n7,a\n7,b\n", ',').unwrap();
        let joined = join(&orders(), &right, "customer", JoinHow::Inner).unwrap();
        assert_eq!(joined.shape(), (4, 4));
    }

    #[test]
    fn missing_key_column_fails() {
        let err = join(&orders(), &customers(), "name", JoinHow::Inner).unwrap_err();
        assert_eq!(err.code(), JOIN_ERROR);
    }
}
