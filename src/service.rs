use std::time::Duration;

use rmcp::{
    handler::server::{wrapper::Parameters, ServerHandler, tool::ToolRouter},
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    ErrorData as McpError,
};

use crate::constants::SETTLE_WAIT_SECS;
use crate::driver::FormHandle;
use crate::error::FormClosed;
use crate::formatters::{format_form, format_submit_ack};
use crate::models::{SetFieldRequest, SetLocationRequest};

/// MCP server exposing one form instance as tools
#[derive(Clone)]
pub struct AgriForm {
    form: FormHandle,
    settle_wait: Duration,
    tool_router: ToolRouter<Self>,
}

impl AgriForm {
    /// Creates a server around an already running form
    pub fn new(form: FormHandle) -> Self {
        Self {
            form,
            settle_wait: Duration::from_secs(SETTLE_WAIT_SECS),
            tool_router: Self::tool_router(),
        }
    }

    /// Waits for outstanding network work and renders the form
    async fn settled_text(&self, prefix: Option<String>) -> CallToolResult {
        let view = self.form.settled(self.settle_wait).await;
        let mut text = prefix.map(|p| format!("{}\n\n", p)).unwrap_or_default();
        text.push_str(&format_form(&view));
        CallToolResult::success(vec![Content::text(text)])
    }
}

fn closed(err: FormClosed) -> McpError {
    McpError::internal_error(format!("Form unavailable: {}", err), None)
}

#[tool_handler]
impl ServerHandler for AgriForm {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "agri-form".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                title: None,
                website_url: None,
            },
            instructions: Some(
                "A farm advisory form. Set a location (Indian state), let the weather resolve, \
                fill the remaining fields and submit for a crop recommendation or yield prediction."
                    .to_string(),
            ),
        }
    }
}

#[tool_router]
impl AgriForm {
    /// Edits the location field
    #[tool(description = "Set the location (e.g. 'Tamil Nadu'). Any previously fetched weather is discarded. Depending on configuration the weather lookup starts now or on commit_location.")]
    async fn set_location(
        &self,
        Parameters(request): Parameters<SetLocationRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Location edited: {}", request.location);

        self.form
            .edit_location(request.location)
            .await
            .map_err(closed)?;

        Ok(self.settled_text(None).await)
    }

    /// Commits the location field, which starts the lookup under the on-blur policy
    #[tool(description = "Finish editing the location and fetch its weather (temperature, humidity, rainfall).")]
    async fn commit_location(&self) -> Result<CallToolResult, McpError> {
        self.form.commit_location().await.map_err(closed)?;
        Ok(self.settled_text(None).await)
    }

    /// Retries a failed weather lookup
    #[tool(description = "Retry the weather lookup for the current location after a failure.")]
    async fn retry_weather(&self) -> Result<CallToolResult, McpError> {
        self.form.retry_weather().await.map_err(closed)?;
        Ok(self.settled_text(None).await)
    }

    /// Sets one manual field
    #[tool(description = "Set a manual field: 'ph' for crop recommendation; 'crop_type' (wheat, rice, maize) and 'land_size' for yield prediction.")]
    async fn set_field(
        &self,
        Parameters(request): Parameters<SetFieldRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Field edited: {} = {}", request.name, request.value);

        self.form
            .set_field(request.name, request.value)
            .await
            .map_err(closed)?
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        Ok(CallToolResult::success(vec![Content::text(format_form(
            &self.form.view(),
        ))]))
    }

    /// Submits the form for prediction
    #[tool(description = "Request the prediction using the current fields. Only possible once weather is resolved and all fields are valid.")]
    async fn submit_prediction(&self) -> Result<CallToolResult, McpError> {
        let ack = self.form.submit().await.map_err(closed)?;
        tracing::info!("{}", format_submit_ack(&ack));

        Ok(self.settled_text(Some(format_submit_ack(&ack))).await)
    }

    /// Shows the current state of the form
    #[tool(description = "Show the form: location, weather, fields, readiness and the last prediction.")]
    async fn form_status(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(format_form(
            &self.form.view(),
        ))]))
    }
}
