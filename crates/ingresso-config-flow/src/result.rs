//! Flow result types returned to the caller after every step

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Kind of a flow result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowResultType {
    Form,
    CreateEntry,
    Abort,
}

/// Result type for a config flow step
#[derive(Debug, Clone, Serialize)]
pub struct FlowResult {
    /// Flow ID
    pub flow_id: String,
    /// Handler (integration domain)
    pub handler: String,
    #[serde(rename = "type")]
    pub result_type: FlowResultType,
    /// Current step ID (for form type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Always present, empty when the form has no fields
    pub data_schema: Vec<FormField>,
    /// Errors from the previous submission (null if none)
    pub errors: Option<HashMap<String, String>>,
    /// Description placeholders for the form (null if none)
    pub description_placeholders: Option<HashMap<String, String>>,
    /// Title (for create_entry type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Abort reason (for abort type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Result data (for create_entry - the config entry data)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Entry created or updated by a finished flow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

impl FlowResult {
    fn base(flow_id: &str, handler: &str, result_type: FlowResultType) -> Self {
        Self {
            flow_id: flow_id.to_string(),
            handler: handler.to_string(),
            result_type,
            step_id: None,
            data_schema: Vec::new(),
            errors: None,
            description_placeholders: None,
            title: None,
            reason: None,
            result: None,
            entry_id: None,
        }
    }

    /// A form for `step_id`
    pub fn form(flow_id: &str, handler: &str, step_id: &str) -> Self {
        Self {
            step_id: Some(step_id.to_string()),
            ..Self::base(flow_id, handler, FlowResultType::Form)
        }
    }

    /// A finished flow
    pub fn create_entry(flow_id: &str, handler: &str, title: String, data: Value) -> Self {
        Self {
            title: Some(title),
            result: Some(data),
            ..Self::base(flow_id, handler, FlowResultType::CreateEntry)
        }
    }

    pub fn abort(flow_id: &str, handler: &str, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::base(flow_id, handler, FlowResultType::Abort)
        }
    }

    /// Whether the flow is over after this result
    pub fn is_finished(&self) -> bool {
        self.result_type != FlowResultType::Form
    }

    /// Error shown for `field`, `base` being the form-wide slot
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.as_ref()?.get(field).map(String::as_str)
    }
}

/// Form field schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Choices of a `select` field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl FormField {
    /// Required single-choice field
    pub fn select(name: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self {
            name: name.into(),
            field_type: "select".to_string(),
            required: Some(true),
            default: None,
            options,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// One choice of a `select` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}
