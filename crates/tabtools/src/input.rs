use async_trait::async_trait;
use tabcore::{
    FieldDefinition, InputUrlConfig, Table, ToolConfig, ToolContext, ToolError, ToolExecutor,
    ToolFactory, ToolKind, ToolMetadata,
};
use url::Url;

/// Loads a delimited text table from an `http(s)://` or `file://` URL
pub struct InputUrlTool {
    config: InputUrlConfig,
    client: reqwest::Client,
}

impl InputUrlTool {
    pub fn new(config: InputUrlConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, url: &Url) -> Result<String, ToolError> {
        match url.scheme() {
            "http" | "https" => {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| ToolError::Load(format!("HTTP request failed: {}", e)))?;
                response
                    .text()
                    .await
                    .map_err(|e| ToolError::Load(format!("Failed to read response: {}", e)))
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| ToolError::Load(format!("Not a local file path: {}", url)))?;
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| ToolError::Load(format!("{}: {}", path.display(), e)))
            }
            other => Err(ToolError::Load(format!("Unsupported URL scheme: {}", other))),
        }
    }
}

#[async_trait]
impl ToolExecutor for InputUrlTool {
    async fn run(&self, ctx: ToolContext) -> Result<Table, ToolError> {
        let url = Url::parse(&self.config.url)
            .map_err(|e| ToolError::Load(format!("Invalid URL '{}': {}", self.config.url, e)))?;

        ctx.events.info(format!("GET {}", url));
        let text = self.fetch(&url).await?;
        let table = Table::from_delimited(&text, self.config.separator())?;

        let (rows, columns) = table.shape();
        tracing::debug!(
            "Tool {} loaded {} rows x {} columns from {}",
            ctx.tool_id,
            rows,
            columns,
            url
        );
        Ok(table)
    }
}

pub struct InputUrlFactory;

impl ToolFactory for InputUrlFactory {
    fn kind(&self) -> ToolKind {
        ToolKind::InputUrl
    }

    fn max_inputs(&self) -> usize {
        0
    }

    fn create(&self, config: &ToolConfig) -> Result<Box<dyn ToolExecutor>, ToolError> {
        match config {
            ToolConfig::InputUrl(config) => Ok(Box::new(InputUrlTool::new(config.clone()))),
            _ => Err(ToolError::MissingConfig),
        }
    }

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            description: "Load a delimited text file from a URL".to_string(),
            category: "input".to_string(),
            fields: vec![
                FieldDefinition::new("max_inputs", "Input capacity").read_only(),
                FieldDefinition::new("url", "http(s):// or file:// location").required(),
                FieldDefinition::new("extension", "csv, tsv or txt (default csv)"),
                FieldDefinition::new("separator", "Single field separator character"),
            ],
        }
    }
}
