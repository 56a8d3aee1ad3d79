use anyhow::{anyhow, Result};
use console::style;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;

use logo_agent::agent::{brand_request, logo_agent_request};
use logo_agent::config::{ConfigError, Settings};
use logo_agent::models::tool::Tool;
use logo_agent::platform::base::{
    AgentDefinition, AgentPlatform, ConversationSession, PlatformConnector,
};
use logo_agent::providers::base::{ToolLauncher, ToolProvider};
use logo_agent::providers::mcp::McpServerConfig;
use logo_agent::toolbox::Toolbox;

const RULE: &str = "__________________________________________________";

/// The six phases of a logo lookup: configure, connect, start tool servers, create the agent,
/// converse, tear down.
///
/// Fatal errors are written to `out` before being returned, so callers only decide the exit status.
pub struct Workflow<'a> {
    connector: &'a dyn PlatformConnector,
    launcher: &'a dyn ToolLauncher,
}

impl<'a> Workflow<'a> {
    pub fn new(connector: &'a dyn PlatformConnector, launcher: &'a dyn ToolLauncher) -> Self {
        Self { connector, launcher }
    }

    pub async fn run<W: Write>(
        &self,
        settings: Result<Settings, ConfigError>,
        brand: &str,
        out: &mut W,
    ) -> Result<()> {
        let settings = match settings {
            Ok(settings) => settings,
            Err(e) => {
                writeln!(out, "{}", e)?;
                return Err(e.into());
            }
        };

        let platform = self.connect(&settings, out).await?;
        list_connections(platform.as_ref(), out).await?;

        // Every provider that gets launched is closed here, whatever happens after launch
        let mut providers: Vec<Arc<dyn ToolProvider>> = Vec::new();
        let result = self
            .run_with_tools(&settings, platform.as_ref(), &mut providers, brand, out)
            .await;
        for provider in &providers {
            provider.close().await;
        }
        result
    }

    async fn connect<W: Write>(
        &self,
        settings: &Settings,
        out: &mut W,
    ) -> Result<Box<dyn AgentPlatform>> {
        writeln!(out, "Configuring AI Project Client...")?;
        match self.connector.connect(settings).await {
            Ok(platform) => {
                writeln!(out, "AI Project Client created successfully")?;
                Ok(platform)
            }
            Err(e) => {
                writeln!(out, "Error creating AI Project Client: {}", e)?;
                for cause in e.chain().skip(1) {
                    writeln!(out, "  Caused by: {}", cause)?;
                }
                Err(e)
            }
        }
    }

    async fn run_with_tools<W: Write>(
        &self,
        settings: &Settings,
        platform: &dyn AgentPlatform,
        providers: &mut Vec<Arc<dyn ToolProvider>>,
        brand: &str,
        out: &mut W,
    ) -> Result<()> {
        let mut discovered = Vec::new();
        for server in [settings.logo_tools_server(), settings.web_search_server()] {
            let provider = self.launch(&server, out).await?;
            providers.push(Arc::clone(&provider));
            let tools = discover_tools(provider.as_ref(), out).await?;
            discovered.push((provider, tools));
        }

        let (agent, toolbox) = create_agent(settings, platform, discovered, out).await?;
        converse_and_teardown(platform, &agent, &toolbox, brand, out).await
    }

    async fn launch<W: Write>(
        &self,
        server: &McpServerConfig,
        out: &mut W,
    ) -> Result<Arc<dyn ToolProvider>> {
        tracing::info!(server = %server.name, command = %server.command, "launching tool server");
        match self.launcher.launch(server).await {
            Ok(provider) => Ok(provider),
            Err(e) => {
                writeln!(out, "Error connecting to {} MCP server: {}", server.name, e)?;
                Err(e)
            }
        }
    }
}

async fn list_connections<W: Write>(platform: &dyn AgentPlatform, out: &mut W) -> Result<()> {
    writeln!(out, "Fetching connections to LLM services available to the Agent...")?;
    let connections = match platform.list_connections().await {
        Ok(connections) => connections,
        Err(e) => {
            writeln!(out, "Error fetching connections: {}", e)?;
            return Err(e.into());
        }
    };

    if connections.is_empty() {
        writeln!(out, "No connections found.")?;
        return Err(anyhow!("No connections found"));
    }

    for (i, connection) in connections.iter().enumerate() {
        writeln!(out, "Connection {}:", i + 1)?;
        writeln!(out, "  {} Name = {}", style("✓").green(), connection.name)?;
        writeln!(out, "  {} Category = {}", style("✓").green(), connection.category)?;
    }
    Ok(())
}

async fn discover_tools<W: Write>(provider: &dyn ToolProvider, out: &mut W) -> Result<Vec<Tool>> {
    let tools = match provider.list_tools().await {
        Ok(tools) => tools,
        Err(e) => {
            writeln!(out, "Error listing {} MCP server tools: {}", provider.name(), e)?;
            return Err(e);
        }
    };

    writeln!(out, "Available {} MCP server tools:", provider.name())?;
    for tool in &tools {
        writeln!(out, "  {} {}", style("✓").green(), tool.name)?;
    }
    Ok(tools)
}

async fn create_agent<W: Write>(
    settings: &Settings,
    platform: &dyn AgentPlatform,
    discovered: Vec<(Arc<dyn ToolProvider>, Vec<Tool>)>,
    out: &mut W,
) -> Result<(AgentDefinition, Toolbox)> {
    writeln!(out, "Creating Logo Agent...")?;

    let mut toolbox = Toolbox::new();
    for (provider, tools) in discovered {
        let name = provider.name().to_string();
        if let Err(e) = toolbox.register(provider, tools) {
            writeln!(out, "Error registering {} tools: {}", name, e)?;
            return Err(e.into());
        }
    }
    tracing::debug!(tools = toolbox.len(), "registered tools");

    let request = logo_agent_request(&settings.azure_ai_chat_model_id, &toolbox)?;
    match platform.create_agent(&request).await {
        Ok(agent) => {
            writeln!(out, "Agent {} created.", agent.name)?;
            Ok((agent, toolbox))
        }
        Err(e) => {
            writeln!(out, "Error creating agent: {}", e)?;
            Err(e.into())
        }
    }
}

/// Converse with an existing agent, then delete the thread and the agent no matter how the
/// conversation went
async fn converse_and_teardown<W: Write>(
    platform: &dyn AgentPlatform,
    agent: &AgentDefinition,
    toolbox: &Toolbox,
    brand: &str,
    out: &mut W,
) -> Result<()> {
    let mut session = None;
    let outcome = converse(platform, agent, toolbox, brand, &mut session, out).await;
    let failures = teardown(platform, session.as_ref(), agent).await;

    if let Err(e) = outcome {
        writeln!(out, "Error occurred while invoking agent: {}", e)?;
    }
    for failure in failures {
        writeln!(out, "{}", failure)?;
    }

    writeln!(out, "{}", RULE)?;
    writeln!(out, "Adios from Logo Agent! My work here is done.")?;
    Ok(())
}

async fn converse<W: Write>(
    platform: &dyn AgentPlatform,
    agent: &AgentDefinition,
    toolbox: &Toolbox,
    brand: &str,
    session: &mut Option<ConversationSession>,
    out: &mut W,
) -> Result<()> {
    let session = session.insert(platform.create_session().await?);

    writeln!(out, "Seeking logo for '{}'...", brand)?;
    writeln!(out, "{}", RULE)?;

    let message = brand_request(brand)?;
    let mut replies = platform.invoke(agent, session, message, toolbox);
    while let Some(reply) = replies.next().await {
        writeln!(out, "{}", reply?.text())?;
    }
    Ok(())
}

/// Delete the thread, then the agent. Failures are logged and reported, never retried.
async fn teardown(
    platform: &dyn AgentPlatform,
    session: Option<&ConversationSession>,
    agent: &AgentDefinition,
) -> Vec<String> {
    let mut failures = Vec::new();

    if let Some(session) = session {
        if let Err(e) = platform.delete_session(&session.id).await {
            tracing::warn!(thread_id = %session.id, "failed to delete thread: {}", e);
            failures.push(format!("Failed to delete conversation thread {}: {}", session.id, e));
        }
    }

    if let Err(e) = platform.delete_agent(&agent.id).await {
        tracing::warn!(agent_id = %agent.id, "failed to delete agent: {}", e);
        failures.push(format!("Failed to delete agent {}: {}", agent.id, e));
    }

    failures
}
