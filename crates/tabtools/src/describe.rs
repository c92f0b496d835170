//! Summary statistics in the familiar dataframe `describe` layout.
//!
//! Numeric columns get `count, mean, std, min, 25%, 50%, 75%, max`; text
//! columns get `count, unique, top, freq`. Describing both unions the two row
//! sets and leaves inapplicable cells null.

use async_trait::async_trait;
use tabcore::{
    ColumnKind, DescribeMode, FieldDefinition, Table, ToolConfig, ToolContext, ToolError,
    ToolExecutor, ToolFactory, ToolKind, ToolMetadata, Value,
};

pub const DESCRIBE_ERROR: &str = "describe_error";

const NUMERIC_ROWS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
const TEXT_ROWS: [&str; 4] = ["count", "unique", "top", "freq"];

fn describe_error() -> ToolError {
    ToolError::processing(
        DESCRIBE_ERROR,
        "Describe Tool could not process provided data. \
         Please make sure that 'describe type' is suitable for your type of data.",
    )
}

pub struct DescribeDataTool {
    mode: Option<DescribeMode>,
}

impl DescribeDataTool {
    pub fn new(mode: Option<DescribeMode>) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl ToolExecutor for DescribeDataTool {
    async fn run(&self, ctx: ToolContext) -> Result<Table, ToolError> {
        let table = ctx.first_input()?;
        let mode = self.mode.ok_or_else(describe_error)?;
        describe(table, mode)
    }
}

/// Describe the columns of `table` selected by `mode`
pub fn describe(table: &Table, mode: DescribeMode) -> Result<Table, ToolError> {
    let mut numeric = Vec::new();
    let mut text = Vec::new();
    for (pos, _) in table.columns().iter().enumerate() {
        match table.column_kind(pos) {
            ColumnKind::Numeric | ColumnKind::Empty => numeric.push(pos),
            ColumnKind::Text => text.push(pos),
        }
    }

    let (numeric, text) = match mode {
        DescribeMode::Numeric => (numeric, Vec::new()),
        DescribeMode::Object => (Vec::new(), text),
        DescribeMode::All => (numeric, text),
        // Plain tables carry no categorical columns.
        DescribeMode::Category => return Err(describe_error()),
    };
    if numeric.is_empty() && text.is_empty() {
        return Err(describe_error());
    }

    let selected: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(pos, _)| pos)
        .filter(|pos| numeric.contains(pos) || text.contains(pos))
        .collect();

    let labels: Vec<&str> = match (numeric.is_empty(), text.is_empty()) {
        (false, true) => NUMERIC_ROWS.to_vec(),
        (true, false) => TEXT_ROWS.to_vec(),
        _ => TEXT_ROWS
            .iter()
            .chain(NUMERIC_ROWS.iter().skip(1))
            .copied()
            .collect(),
    };

    let summaries: Vec<Vec<(&str, Value)>> = selected
        .iter()
        .map(|&pos| {
            if numeric.contains(&pos) {
                numeric_summary(table, pos)
            } else {
                text_summary(table, pos)
            }
        })
        .collect();

    let mut result = Table::new(selected.iter().map(|&pos| table.columns()[pos].clone()).collect());
    for label in labels {
        let row = summaries
            .iter()
            .map(|summary| {
                summary
                    .iter()
                    .find(|(name, _)| *name == label)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(Value::Null)
            })
            .collect();
        result.push_labelled_row(label, row);
    }

    Ok(result)
}

fn numeric_summary(table: &Table, pos: usize) -> Vec<(&'static str, Value)> {
    let mut values: Vec<f64> = table.column(pos).filter_map(Value::as_f64).collect();
    values.sort_by(|a, b| a.total_cmp(b));

    let count = values.len();
    let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
    let std = mean.filter(|_| count > 1).map(|mean| {
        let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (squares / (count - 1) as f64).sqrt()
    });

    vec![
        ("count", Value::from(count as f64)),
        ("mean", Value::from(mean)),
        ("std", Value::from(std)),
        ("min", Value::from(values.first().copied())),
        ("25%", Value::from(quantile(&values, 0.25))),
        ("50%", Value::from(quantile(&values, 0.5))),
        ("75%", Value::from(quantile(&values, 0.75))),
        ("max", Value::from(values.last().copied())),
    ]
}

/// Linear interpolation between the closest ranks of sorted `values`.
fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let position = q * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * fraction)
}

fn text_summary(table: &Table, pos: usize) -> Vec<(&'static str, Value)> {
    // (rendered value, first cell seen, occurrences) in first-appearance order
    let mut counts: Vec<(String, &Value, usize)> = Vec::new();
    let mut count: usize = 0;
    for cell in table.column(pos).filter(|c| !c.is_null()) {
        count += 1;
        let key = cell.to_string();
        match counts.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 += 1,
            None => counts.push((key, cell, 1)),
        }
    }

    let mut top: Option<(&Value, usize)> = None;
    for (_, cell, n) in &counts {
        if top.map_or(true, |(_, best)| *n > best) {
            top = Some((*cell, *n));
        }
    }

    vec![
        ("count", Value::from(count)),
        ("unique", Value::from(counts.len())),
        ("top", top.map(|(cell, _)| cell.clone()).unwrap_or(Value::Null)),
        ("freq", top.map(|(_, n)| Value::from(n)).unwrap_or(Value::Null)),
    ]
}

pub struct DescribeDataFactory;

impl ToolFactory for DescribeDataFactory {
    fn kind(&self) -> ToolKind {
        ToolKind::DescribeData
    }

    fn max_inputs(&self) -> usize {
        1
    }

    fn create(&self, config: &ToolConfig) -> Result<Box<dyn ToolExecutor>, ToolError> {
        match config {
            ToolConfig::DescribeData(config) => Ok(Box::new(DescribeDataTool::new(config.mode()))),
            _ => Err(ToolError::MissingConfig),
        }
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Summary statistics of the input table".to_string(),
            category: "preview".to_string(),
            fields: vec![
                FieldDefinition::new("max_inputs", "Input capacity").read_only(),
                FieldDefinition::new(
                    "data_type",
                    "0 = all, 1 = numeric (default), 2 = object, 3 = category",
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::from_delimited(
            "name,age,city\nann,31,Oslo\nbob,25,Rome\ncid,40,Oslo\ndan,,Rome\neve,28,Oslo\n",
            ',',
        )
        .unwrap()
    }

    fn cell<'a>(table: &'a Table, row: &str, column: &str) -> &'a Value {
        let r = table.index().iter().position(|l| l.as_str() == Some(row)).unwrap();
        let c = table.column_position(column).unwrap();
        &table.rows()[r][c]
    }

    #[test]
    fn numeric_columns_by_default() {
        let summary = describe(&people(), DescribeMode::Numeric).unwrap();
        assert_eq!(summary.columns(), ["age"]);
        assert_eq!(summary.shape(), (8, 1));

        assert_eq!(cell(&summary, "count", "age"), &Value::Float(4.0));
        assert_eq!(cell(&summary, "mean", "age"), &Value::Float(31.0));
        assert_eq!(cell(&summary, "min", "age"), &Value::Float(25.0));
        assert_eq!(cell(&summary, "25%", "age"), &Value::Float(27.25));
        assert_eq!(cell(&summary, "50%", "age"), &Value::Float(29.5));
        assert_eq!(cell(&summary, "75%", "age"), &Value::Float(33.25));
        assert_eq!(cell(&summary, "max", "age"), &Value::Float(40.0));

        let std = cell(&summary, "std", "age").as_f64().unwrap();
        assert!((std - 6.480740698).abs() < 1e-6);
    }

    #[test]
    fn object_columns_report_top_and_frequency() {
        let summary = describe(&people(), DescribeMode::Object).unwrap();
        assert_eq!(summary.columns(), ["name", "city"]);

        assert_eq!(cell(&summary, "count", "city"), &Value::Integer(5));
        assert_eq!(cell(&summary, "unique", "city"), &Value::Integer(2));
        assert_eq!(cell(&summary, "top", "city"), &Value::from("Oslo"));
        assert_eq!(cell(&summary, "freq", "city"), &Value::Integer(3));
    }

    #[test]
    fn ties_keep_the_first_value_seen() {
        let summary = describe(&people(), DescribeMode::Object).unwrap();
        assert_eq!(cell(&summary, "top", "name"), &Value::from("ann"));
        assert_eq!(cell(&summary, "freq", "name"), &Value::Integer(1));
    }

    #[test]
    fn all_unions_both_row_sets() {
        let summary = describe(&people(), DescribeMode::All).unwrap();
        assert_eq!(summary.columns(), ["name", "age", "city"]);
        assert_eq!(summary.shape(), (11, 3));

        assert_eq!(cell(&summary, "top", "age"), &Value::Null);
        assert_eq!(cell(&summary, "mean", "city"), &Value::Null);
        assert_eq!(cell(&summary, "count", "age"), &Value::Float(4.0));
    }

    #[test]
    fn category_and_empty_selections_fail() {
        let err = describe(&people(), DescribeMode::Category).unwrap_err();
        assert_eq!(err.code(), DESCRIBE_ERROR);

        let numbers_only = Table::from_delimited("a,b\n1,2\n", ',').unwrap();
        let err = describe(&numbers_only, DescribeMode::Object).unwrap_err();
        assert_eq!(err.code(), DESCRIBE_ERROR);
    }

    #[test]
    fn single_value_has_no_deviation() {
        let table = Table::from_delimited("x\n5\n", ',').unwrap();
        let summary = describe(&table, DescribeMode::Numeric).unwrap();
        assert_eq!(cell(&summary, "std", "x"), &Value::Null);
        assert_eq!(cell(&summary, "50%", "x"), &Value::Float(5.0));
    }
}
