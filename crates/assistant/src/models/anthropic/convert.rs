//! Translation between the provider-neutral message model and the
//! Anthropic Messages API schema.

use super::types::{
    ChatMessage, ChatResponse as ApiResponse, ContentBlock, ImageSource, ResponseBlock, Tool,
    ToolChoice as ApiToolChoice,
};
use crate::error::{AssistantError, Result};
use crate::models::{ChatResponse, ToolChoice, Usage};
use prompt_toolkit::{ContentPart, ImageUrl, Message, Role, ToolCall, ToolDefinition};

/// Splits system messages out of the conversation and converts the rest.
///
/// System messages are joined with a blank line. Consecutive tool results are
/// merged into one user turn, since the API only accepts alternating roles
/// for them.
pub fn convert_messages(messages: &[Message]) -> Result<(Option<String>, Vec<ChatMessage>)> {
    let mut system = Vec::new();
    let mut converted: Vec<ChatMessage> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system.push(msg.content.text()),
            Role::User => converted.push(ChatMessage {
                role: "user".to_string(),
                content: non_empty(convert_parts(&msg.content.parts())?, msg.role)?,
            }),
            Role::Assistant => {
                let mut content = convert_parts(&msg.content.parts())?;
                content.extend(msg.tool_calls.iter().map(|call| ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.arguments.clone(),
                }));
                converted.push(ChatMessage {
                    role: "assistant".to_string(),
                    content: non_empty(content, msg.role)?,
                });
            }
            Role::Tool => {
                let tool_use_id = msg.tool_call_id.clone().ok_or_else(|| {
                    AssistantError::Provider("tool message without tool_call_id".to_string())
                })?;
                let block = ContentBlock::ToolResult {
                    tool_use_id,
                    content: convert_parts(&msg.content.parts())?,
                    is_error: None,
                };

                let continues_results = matches!(
                    converted.last(),
                    Some(last) if last.role == "user" && is_tool_results(&last.content)
                );
                if !continues_results {
                    converted.push(ChatMessage {
                        role: "user".to_string(),
                        content: Vec::new(),
                    });
                }
                if let Some(last) = converted.last_mut() {
                    last.content.push(block);
                }
            }
        }
    }

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };

    Ok((system, converted))
}

/// The API rejects turns with no content blocks.
fn non_empty(content: Vec<ContentBlock>, role: Role) -> Result<Vec<ContentBlock>> {
    if content.is_empty() {
        return Err(AssistantError::Provider(format!("{role} message has no content")));
    }
    Ok(content)
}

fn is_tool_results(blocks: &[ContentBlock]) -> bool {
    !blocks.is_empty()
        && blocks
            .iter()
            .all(|b| matches!(b, ContentBlock::ToolResult { .. }))
}

fn convert_parts(parts: &[ContentPart]) -> Result<Vec<ContentBlock>> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => Ok(ContentBlock::Text { text: text.clone() }),
            ContentPart::ImageUrl { image_url } => Ok(ContentBlock::Image {
                source: image_source(image_url)?,
            }),
        })
        .collect()
}

/// `data:` URLs are sent inline as base64; anything else by reference.
pub fn image_source(image: &ImageUrl) -> Result<ImageSource> {
    let Some(rest) = image.url.strip_prefix("data:") else {
        return Ok(ImageSource::Url {
            url: image.url.clone(),
        });
    };

    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| AssistantError::InvalidImage("data URL has no payload".to_string()))?;
    let media_type = meta.strip_suffix(";base64").ok_or_else(|| {
        AssistantError::InvalidImage("only base64 data URLs are supported".to_string())
    })?;
    if media_type.is_empty() {
        return Err(AssistantError::InvalidImage(
            "data URL has no media type".to_string(),
        ));
    }

    Ok(ImageSource::Base64 {
        media_type: media_type.to_string(),
        data: data.to_string(),
    })
}

pub fn convert_tools(tools: &[ToolDefinition]) -> Vec<Tool> {
    tools
        .iter()
        .map(|tool| Tool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.parameters.clone(),
        })
        .collect()
}

pub fn convert_tool_choice(choice: &ToolChoice) -> ApiToolChoice {
    match choice {
        ToolChoice::Auto => ApiToolChoice::Auto,
        ToolChoice::Any => ApiToolChoice::Any,
        ToolChoice::None => ApiToolChoice::None,
        ToolChoice::Tool(name) => ApiToolChoice::Tool { name: name.clone() },
    }
}

pub fn convert_response(response: ApiResponse) -> ChatResponse {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ResponseBlock::Text { text: t } => text.push_str(&t),
            ResponseBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                id,
                name,
                arguments: input,
            }),
            ResponseBlock::Other => {}
        }
    }

    ChatResponse {
        message: Message::assistant(text).with_tool_calls(tool_calls),
        stop_reason: response.stop_reason,
        usage: response.usage.map(|u| Usage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        }),
    }
}
