//! The city → theater wizard
//!
//! One [`IngressoFlow`] drives both the initial setup (first step `user`)
//! and the reconfiguration of an existing entry (first step `init`). The
//! flow only decides what to show next; persisting the outcome is up to
//! the caller.

use std::collections::HashMap;
use std::sync::Arc;

use ingresso_api::{City, IngressoApi, Theater};
use ingresso_config_entries::IngressoConfig;
use ingresso_core::conf;
use serde_json::Value;
use tracing::{debug, error};

use crate::result::{FormField, SelectOption};

pub const STEP_USER: &str = "user";
pub const STEP_INIT: &str = "init";
pub const STEP_THEATER: &str = "theater";

pub const ERROR_BASE: &str = "base";
pub const ERROR_CANNOT_CONNECT: &str = "cannot_connect";
pub const ERROR_NO_THEATERS: &str = "no_theaters";
pub const ERROR_INVALID_CITY: &str = "invalid_city";
pub const ERROR_INVALID_THEATER: &str = "invalid_theater";

/// What the flow configures
#[derive(Debug, Clone)]
pub enum FlowMode {
    /// Create a new entry
    User,
    /// Replace the selection of an existing entry
    Reconfigure {
        entry_id: String,
        current: IngressoConfig,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    City,
    Theater,
}

/// Form to display, as decided by the flow
#[derive(Debug, Clone, Default)]
pub struct FormSpec {
    pub step_id: &'static str,
    pub fields: Vec<FormField>,
    pub errors: HashMap<String, String>,
    pub placeholders: HashMap<String, String>,
}

/// Outcome of one step
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Show a form and wait for input
    Form(FormSpec),
    /// Initial setup finished
    CreateEntry { title: String, config: IngressoConfig },
    /// Reconfiguration finished
    UpdateEntry { entry_id: String, config: IngressoConfig },
}

/// State of one wizard run
pub struct IngressoFlow {
    api: Arc<dyn IngressoApi>,
    partnership: String,
    mode: FlowMode,
    step: Step,
    cities: Vec<City>,
    theaters: Vec<Theater>,
    selected_city: Option<City>,
}

impl IngressoFlow {
    pub fn new(api: Arc<dyn IngressoApi>, partnership: impl Into<String>, mode: FlowMode) -> Self {
        Self {
            api,
            partnership: partnership.into(),
            mode,
            step: Step::City,
            cities: Vec::new(),
            theaters: Vec::new(),
            selected_city: None,
        }
    }

    pub fn mode(&self) -> &FlowMode {
        &self.mode
    }

    /// Id of the step waiting for input
    pub fn step_id(&self) -> &'static str {
        match (self.step, &self.mode) {
            (Step::City, FlowMode::User) => STEP_USER,
            (Step::City, FlowMode::Reconfigure { .. }) => STEP_INIT,
            (Step::Theater, _) => STEP_THEATER,
        }
    }

    /// Run the current step, with the user's submission if any
    pub async fn step(&mut self, user_input: Option<&Value>) -> StepOutcome {
        match self.step {
            Step::City => self.step_city(user_input).await,
            Step::Theater => self.step_theater(user_input).await,
        }
    }

    async fn step_city(&mut self, user_input: Option<&Value>) -> StepOutcome {
        let step_id = self.step_id();

        if self.cities.is_empty() {
            match self.api.fetch_cities().await {
                Ok(cities) if !cities.is_empty() => self.cities = cities,
                Ok(_) => {
                    error!("City list came back empty");
                    return StepOutcome::Form(FormSpec::error(step_id, ERROR_BASE, ERROR_CANNOT_CONNECT));
                }
                Err(e) => {
                    error!("Error fetching cities: {}", e);
                    return StepOutcome::Form(FormSpec::error(step_id, ERROR_BASE, ERROR_CANNOT_CONNECT));
                }
            }
        }

        let Some(input) = user_input else {
            return StepOutcome::Form(self.city_form(HashMap::new()));
        };

        let city_id = input_id(input, conf::CITY_ID);
        let selected = self
            .cities
            .iter()
            .find(|c| Some(&c.id) == city_id.as_ref())
            .cloned();
        match selected {
            Some(city) => {
                debug!("Selected city {} ({})", city.name, city.id);
                self.selected_city = Some(city);
                self.step = Step::Theater;
                self.step_theater(None).await
            }
            None => {
                let mut errors = HashMap::new();
                errors.insert(conf::CITY_ID.to_string(), ERROR_INVALID_CITY.to_string());
                StepOutcome::Form(self.city_form(errors))
            }
        }
    }

    async fn step_theater(&mut self, user_input: Option<&Value>) -> StepOutcome {
        let Some(city) = self.selected_city.clone() else {
            // Unreachable through `step`, the city step always comes first
            self.step = Step::City;
            return StepOutcome::Form(self.city_form(HashMap::new()));
        };

        if self.theaters.is_empty() {
            match self.api.fetch_theaters(&city.id, &self.partnership).await {
                Ok(theaters) if !theaters.is_empty() => self.theaters = theaters,
                Ok(_) => {
                    return StepOutcome::Form(
                        FormSpec::error(STEP_THEATER, ERROR_BASE, ERROR_NO_THEATERS)
                            .with_city_name(&city.name),
                    );
                }
                Err(e) => {
                    error!("Error fetching theaters for {}: {}", city.id, e);
                    return StepOutcome::Form(
                        FormSpec::error(STEP_THEATER, ERROR_BASE, ERROR_CANNOT_CONNECT)
                            .with_city_name(&city.name),
                    );
                }
            }
        }

        let Some(input) = user_input else {
            return StepOutcome::Form(self.theater_form(&city, HashMap::new()));
        };

        let theater_id = input_id(input, conf::THEATER);
        let Some(theater) = self
            .theaters
            .iter()
            .find(|t| Some(&t.id) == theater_id.as_ref())
        else {
            let mut errors = HashMap::new();
            errors.insert(conf::THEATER.to_string(), ERROR_INVALID_THEATER.to_string());
            return StepOutcome::Form(self.theater_form(&city, errors));
        };

        let config = IngressoConfig {
            city_id: city.id.clone(),
            city_name: city.name.clone(),
            partnership: self.partnership.clone(),
            theater: Some(theater.id.clone()),
            theater_name: Some(theater.name.clone()),
        };

        match &self.mode {
            FlowMode::User => StepOutcome::CreateEntry {
                title: config.title(),
                config,
            },
            FlowMode::Reconfigure { entry_id, .. } => StepOutcome::UpdateEntry {
                entry_id: entry_id.clone(),
                config,
            },
        }
    }

    fn city_form(&self, errors: HashMap<String, String>) -> FormSpec {
        let options = self
            .cities
            .iter()
            .map(|c| SelectOption::new(c.id.clone(), c.label()))
            .collect();

        FormSpec {
            step_id: self.step_id(),
            fields: vec![FormField::select(conf::CITY_ID, options)],
            errors,
            placeholders: HashMap::new(),
        }
    }

    fn theater_form(&self, city: &City, errors: HashMap<String, String>) -> FormSpec {
        let options = self
            .theaters
            .iter()
            .map(|t| SelectOption::new(t.id.clone(), t.name.clone()))
            .collect();
        let mut field = FormField::select(conf::THEATER, options);

        // Keep the current theater pre-selected while it is still offered
        if let FlowMode::Reconfigure { current, .. } = &self.mode {
            if let Some(theater) = &current.theater {
                if self.theaters.iter().any(|t| &t.id == theater) {
                    field = field.with_default(theater.clone());
                }
            }
        }

        FormSpec {
            step_id: STEP_THEATER,
            fields: vec![field],
            errors,
            placeholders: HashMap::new(),
        }
        .with_city_name(&city.name)
    }
}

impl FormSpec {
    /// Field-less form carrying one error
    fn error(step_id: &'static str, field: &str, error: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), error.to_string());
        Self {
            step_id,
            errors,
            ..Default::default()
        }
    }

    fn with_city_name(mut self, city_name: &str) -> Self {
        self.placeholders
            .insert(conf::CITY_NAME.to_string(), city_name.to_string());
        self
    }
}

/// Submitted id as a string; select values may come back as numbers
fn input_id(input: &Value, key: &str) -> Option<String> {
    match input.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
