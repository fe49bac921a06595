//! Template translation between canonical and provider wire formats.
//!
//! Each provider carries two Handlebars templates. The request template is
//! rendered with the canonical request (as JSON) as its context; the response
//! template is rendered with the provider's raw decoded JSON. Both may use the
//! `json` helper to embed any sub-value as a JSON literal:
//!
//! ```text
//! {"model": "{{model_key}}", "messages": {{json messages}}, "stream": {{stream}} }
//! ```
//!
//! The registry runs in strict mode, so a reference to a field that does not
//! exist fails the render instead of producing an empty string. Output is
//! never HTML-escaped. Keep a space between an expression and a literal
//! closing brace (`{{stream}} }`), since `}}}` closes a triple-stash.

use gateway_core::{
    DecodeStage, GatewayError, GatewayRequest, GatewayResponse, GatewayResult, TemplateStage,
};
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderErrorReason,
};
use serde_json::Value;

const REQUEST: &str = "request";
const RESPONSE: &str = "response";

/// Template source that forwards its input unchanged
pub const IDENTITY_TEMPLATE: &str = "{{json this}}";

/// A provider's request and response templates, compiled.
///
/// Compilation is cheap and done once per dispatch so that template edits
/// take effect on the next request.
pub struct CompiledTemplates {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for CompiledTemplates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplates").finish_non_exhaustive()
    }
}

impl CompiledTemplates {
    /// Compile both templates; a syntax error is a template error for that stage
    pub fn compile(request_template: &str, response_template: &str) -> GatewayResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("json", Box::new(json_helper));

        registry
            .register_template_string(REQUEST, request_template)
            .map_err(|e| GatewayError::template(TemplateStage::Request, e.to_string()))?;
        registry
            .register_template_string(RESPONSE, response_template)
            .map_err(|e| GatewayError::template(TemplateStage::Response, e.to_string()))?;

        Ok(Self { registry })
    }

    /// Render the provider request body.
    ///
    /// The output must be valid JSON; anything else is a request-body decode
    /// error and nothing is sent.
    pub fn render_request(&self, request: &GatewayRequest) -> GatewayResult<String> {
        let context = serde_json::to_value(request)
            .map_err(|e| GatewayError::internal(format!("failed to encode request: {e}")))?;
        let body = self
            .registry
            .render(REQUEST, &context)
            .map_err(|e| GatewayError::template(TemplateStage::Request, e.to_string()))?;

        serde_json::from_str::<serde::de::IgnoredAny>(&body)
            .map_err(|e| GatewayError::decode(DecodeStage::RequestBody, e.to_string()))?;
        Ok(body)
    }

    /// Render a decoded provider payload into a canonical response
    pub fn render_response(&self, payload: &Value) -> GatewayResult<GatewayResponse> {
        let rendered = self
            .registry
            .render(RESPONSE, payload)
            .map_err(|e| GatewayError::template(TemplateStage::Response, e.to_string()))?;

        serde_json::from_str(&rendered)
            .map_err(|e| GatewayError::decode(DecodeStage::ResponseBody, e.to_string()))
    }
}

fn json_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param = h
        .param(0)
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("json", 0))?;
    if param.is_value_missing() {
        return Err(RenderErrorReason::MissingVariable(param.relative_path().cloned()).into());
    }

    let encoded = serde_json::to_string(param.value())
        .map_err(|e| RenderErrorReason::Other(format!("json helper: {e}")))?;
    out.write(&encoded)?;
    Ok(())
}
