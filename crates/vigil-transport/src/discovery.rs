//! Capability discovery: initialize, then enumerate whatever the server
//! advertises, collecting anomaly warnings along the way.

use serde_json::Value;
use tracing::{debug, info};

use vigil_types::{
    DiscoveryWarning, ServerIdentity, ToolDescriptor, TransportErrorRecord, WarningLevel,
};

use crate::client::McpClient;
use crate::error::Result;

/// Everything learned about a server before interviewing it.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    pub server: ServerIdentity,
    pub tools: Vec<ToolDescriptor>,
    pub prompts: Vec<Value>,
    pub resources: Vec<Value>,
    pub warnings: Vec<DiscoveryWarning>,
    pub transport_errors: Vec<TransportErrorRecord>,
}

/// Run the discovery sequence against an initialized-or-fresh client.
///
/// `initialize` failures abort; listing failures degrade to an empty list
/// plus a warning, since the connection is still usable for the rest of the
/// run.
pub async fn discover(client: &McpClient) -> Result<DiscoveryResult> {
    let init = client.initialize().await?;
    let capabilities = init.capabilities.advertised();
    info!(
        server = %init.server_info.name,
        capabilities = ?capabilities,
        "discovering server"
    );

    let mut warnings = Vec::new();
    let mut tools = Vec::new();
    let mut prompts = Vec::new();
    let mut resources = Vec::new();

    if init.capabilities.tools.is_some() {
        match client.list_tools().await {
            Ok(listed) => tools = listed,
            Err(err) => warnings.push(listing_failed("tools", &err.to_string())),
        }
        if tools.is_empty() {
            warnings.push(empty_capability("tools", "no tools"));
        }
    }

    if init.capabilities.prompts.is_some() {
        match client.list_prompts().await {
            Ok(listed) => prompts = listed,
            Err(err) => warnings.push(listing_failed("prompts", &err.to_string())),
        }
        if prompts.is_empty() {
            warnings.push(empty_capability("prompts", "no prompts"));
        }
    }

    if init.capabilities.resources.is_some() {
        match client.list_resources().await {
            Ok(listed) => resources = listed,
            Err(err) => warnings.push(listing_failed("resources", &err.to_string())),
        }
        if resources.is_empty() {
            warnings.push(empty_capability("resources", "no resources"));
        }
    }

    debug!(
        tools = tools.len(),
        prompts = prompts.len(),
        resources = resources.len(),
        warnings = warnings.len(),
        "discovery complete"
    );

    Ok(DiscoveryResult {
        server: ServerIdentity {
            name: init.server_info.name,
            version: init.server_info.version,
            protocol_version: init.protocol_version,
            capabilities,
        },
        tools,
        prompts,
        resources,
        warnings,
        transport_errors: client.transport_errors(),
    })
}

fn empty_capability(capability: &str, none_phrase: &str) -> DiscoveryWarning {
    DiscoveryWarning {
        level: WarningLevel::Warning,
        message: format!("server advertises {capability} capability but returned {none_phrase}"),
        recommendation: format!(
            "check whether the {capability} listing is gated on configuration or permissions"
        ),
    }
}

fn listing_failed(capability: &str, detail: &str) -> DiscoveryWarning {
    DiscoveryWarning {
        level: WarningLevel::Warning,
        message: format!("listing {capability} failed: {detail}"),
        recommendation: format!("the {capability} capability is advertised but not enumerable"),
    }
}
