use serde::Serialize;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::platform::base::AgentRequest;
use crate::prompt_template::load_prompt;
use crate::toolbox::Toolbox;

pub const AGENT_NAME: &str = "Logo Image Finder Agent";
pub const AGENT_DESCRIPTION: &str =
    "Provides Accessible HTML referencing the logo for a technology brand, project, product, or property.";

/// Brand used when none is given on the command line
pub const DEFAULT_BRAND: &str = "Python";

/// Attempts the instructions ask the model to make before giving up. Advisory only.
pub const MAX_LOGO_ATTEMPTS: u32 = 10;

const INSTRUCTIONS_TEMPLATE: &str = include_str!("prompts/logo_agent.md");
const BRAND_REQUEST_TEMPLATE: &str = include_str!("prompts/brand_request.md");

#[derive(Serialize)]
struct InstructionsContext {
    max_attempts: u32,
}

#[derive(Serialize)]
struct BrandContext<'a> {
    brand: &'a str,
}

/// Render the logo-finding instructions
pub fn logo_agent_instructions() -> AgentResult<String> {
    load_prompt(
        INSTRUCTIONS_TEMPLATE,
        &InstructionsContext {
            max_attempts: MAX_LOGO_ATTEMPTS,
        },
    )
    .map_err(|e| AgentError::Internal(e.to_string()))
}

/// Describe the logo agent for creation on the platform, carrying every tool in the toolbox
pub fn logo_agent_request(model: &str, toolbox: &Toolbox) -> AgentResult<AgentRequest> {
    Ok(AgentRequest {
        model: model.to_string(),
        name: AGENT_NAME.to_string(),
        description: AGENT_DESCRIPTION.to_string(),
        instructions: logo_agent_instructions()?,
        tools: toolbox.tools(),
    })
}

/// The single user message asking for a brand's logo
pub fn brand_request(brand: &str) -> AgentResult<Message> {
    let text = load_prompt(BRAND_REQUEST_TEMPLATE, &BrandContext { brand })
        .map_err(|e| AgentError::Internal(e.to_string()))?;
    Ok(Message::user().with_text(text))
}
