//! Config Flow Manager
//!
//! Tracks running wizards by flow id and applies finished flows to the
//! config entries store.

use std::collections::HashMap;
use std::sync::Arc;

use ingresso_api::IngressoApi;
use ingresso_config_entries::{
    ConfigEntries, ConfigEntriesError, ConfigEntry, ConfigEntryUpdate, IngressoConfig,
    CONFIG_ENTRY_VERSION,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::flow::{FlowMode, FormSpec, IngressoFlow, StepOutcome};
use crate::result::FlowResult;

/// Flow manager errors
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Flow {0} not found")]
    UnknownFlow(String),

    #[error("Config entry {0} not found")]
    UnknownEntry(String),

    #[error(transparent)]
    ConfigEntries(#[from] ConfigEntriesError),
}

pub type FlowManagerResult<T> = Result<T, FlowError>;

/// Summary of a running flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowInfo {
    pub flow_id: String,
    pub handler: String,
    pub step_id: String,
    /// `user` or `options`
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

/// Active flow state, `None` once a step has finished the flow
struct ActiveFlow {
    flow: Mutex<Option<IngressoFlow>>,
}

/// Manages active configuration flows
pub struct FlowManager {
    /// Active flows: flow_id -> flow state
    flows: RwLock<HashMap<String, Arc<ActiveFlow>>>,
    api: Arc<dyn IngressoApi>,
    entries: Arc<ConfigEntries>,
    partnership: String,
}

impl FlowManager {
    pub fn new(
        api: Arc<dyn IngressoApi>,
        entries: Arc<ConfigEntries>,
        partnership: impl Into<String>,
    ) -> Self {
        Self {
            flows: RwLock::new(HashMap::new()),
            api,
            entries,
            partnership: partnership.into(),
        }
    }

    /// Start the initial setup wizard
    pub async fn start_user_flow(&self) -> FlowManagerResult<FlowResult> {
        self.start(FlowMode::User).await
    }

    /// Start reconfiguring an existing entry
    pub async fn start_options_flow(&self, entry_id: &str) -> FlowManagerResult<FlowResult> {
        let entry = self
            .entries
            .get(entry_id)
            .ok_or_else(|| FlowError::UnknownEntry(entry_id.to_string()))?;
        let current = IngressoConfig::from_data(&entry.data)?;

        self.start(FlowMode::Reconfigure {
            entry_id: entry.entry_id,
            current,
        })
        .await
    }

    async fn start(&self, mode: FlowMode) -> FlowManagerResult<FlowResult> {
        let flow_id = Ulid::new().to_string().to_lowercase();
        info!(
            "Starting config flow for {} with flow_id {}",
            self.entries.domain(),
            flow_id
        );

        let active = Arc::new(ActiveFlow {
            flow: Mutex::new(Some(IngressoFlow::new(
                self.api.clone(),
                self.partnership.clone(),
                mode,
            ))),
        });
        self.flows
            .write()
            .await
            .insert(flow_id.clone(), active.clone());

        self.run_step(&flow_id, &active, None).await
    }

    /// Continue a flow with user input
    pub async fn progress_flow(
        &self,
        flow_id: &str,
        user_input: Option<Value>,
    ) -> FlowManagerResult<FlowResult> {
        let active = self
            .flows
            .read()
            .await
            .get(flow_id)
            .cloned()
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?;

        self.run_step(flow_id, &active, user_input.as_ref()).await
    }

    /// Drop a running flow
    pub async fn abort_flow(&self, flow_id: &str) -> FlowManagerResult<FlowResult> {
        self.flows
            .write()
            .await
            .remove(flow_id)
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?;

        info!("Flow {} aborted", flow_id);
        Ok(FlowResult::abort(flow_id, self.entries.domain(), "user_aborted"))
    }

    /// Get list of active flows
    pub async fn list_flows(&self) -> Vec<FlowInfo> {
        let flows = self.flows.read().await;
        let mut infos = Vec::with_capacity(flows.len());

        for (flow_id, active) in flows.iter() {
            let slot = active.flow.lock().await;
            let Some(flow) = slot.as_ref() else {
                continue;
            };
            let (source, entry_id) = match flow.mode() {
                FlowMode::User => ("user", None),
                FlowMode::Reconfigure { entry_id, .. } => ("options", Some(entry_id.clone())),
            };
            infos.push(FlowInfo {
                flow_id: flow_id.clone(),
                handler: self.entries.domain().to_string(),
                step_id: flow.step_id().to_string(),
                source: source.to_string(),
                entry_id,
            });
        }

        infos.sort_by(|a, b| a.flow_id.cmp(&b.flow_id));
        infos
    }

    async fn run_step(
        &self,
        flow_id: &str,
        active: &ActiveFlow,
        user_input: Option<&Value>,
    ) -> FlowManagerResult<FlowResult> {
        let outcome = {
            let mut slot = active.flow.lock().await;
            let flow = slot
                .as_mut()
                .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?;
            debug!("Progressing flow {} at step {}", flow_id, flow.step_id());
            let outcome = flow.step(user_input).await;
            if !matches!(outcome, StepOutcome::Form(_)) {
                // Later submissions see an unknown flow
                *slot = None;
            }
            outcome
        };
        if !matches!(outcome, StepOutcome::Form(_)) {
            self.flows.write().await.remove(flow_id);
        }

        let handler = self.entries.domain().to_string();
        let result = match outcome {
            StepOutcome::Form(form) => return Ok(form_result(flow_id, &handler, form)),
            StepOutcome::CreateEntry { title, config } => {
                let data = config.to_data();
                let entry = ConfigEntry::new(handler.clone(), title.clone())
                    .with_data(data.clone())
                    .with_version(CONFIG_ENTRY_VERSION);
                let entry = self.entries.add(entry).await?;

                if let Err(e) = self.entries.setup(&entry.entry_id).await {
                    warn!("Setup of new entry {} failed: {}", entry.entry_id, e);
                }

                let mut result =
                    FlowResult::create_entry(flow_id, &handler, title, to_object(data));
                result.entry_id = Some(entry.entry_id);
                result
            }
            StepOutcome::UpdateEntry { entry_id, config } => {
                let existing = self
                    .entries
                    .get(&entry_id)
                    .ok_or_else(|| FlowError::UnknownEntry(entry_id.clone()))?;
                let data = config.merge_into(&existing.data);
                self.entries
                    .update(&entry_id, ConfigEntryUpdate::new().data(data))
                    .await?;

                if let Err(e) = self.entries.reload(&entry_id).await {
                    warn!("Reload of entry {} failed: {}", entry_id, e);
                }

                let mut result = FlowResult::create_entry(
                    flow_id,
                    &handler,
                    String::new(),
                    Value::Object(Default::default()),
                );
                result.entry_id = Some(entry_id);
                result
            }
        };

        info!(
            "Flow {} completed with result type: {:?}",
            flow_id, result.result_type
        );
        Ok(result)
    }
}

fn form_result(flow_id: &str, handler: &str, form: FormSpec) -> FlowResult {
    let mut result = FlowResult::form(flow_id, handler, form.step_id);
    result.data_schema = form.fields;
    result.errors = (!form.errors.is_empty()).then_some(form.errors);
    result.description_placeholders = (!form.placeholders.is_empty()).then_some(form.placeholders);
    result
}

fn to_object(data: HashMap<String, Value>) -> Value {
    Value::Object(data.into_iter().collect())
}
