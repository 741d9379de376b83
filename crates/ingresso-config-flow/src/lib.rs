//! Config Flow
//!
//! The two-step wizard that creates or reconfigures an Ingresso entry:
//! pick a city, then a theater of that city.
//!
//! - [`IngressoFlow`] - Step logic of one wizard run
//! - [`FlowManager`] - Runs flows by id and persists their outcome
//! - [`FlowResult`] - What the caller renders after each step

pub mod flow;
pub mod manager;
pub mod result;

pub use flow::{
    FlowMode, FormSpec, IngressoFlow, StepOutcome, ERROR_BASE, ERROR_CANNOT_CONNECT,
    ERROR_INVALID_CITY, ERROR_INVALID_THEATER, ERROR_NO_THEATERS, STEP_INIT, STEP_THEATER,
    STEP_USER,
};
pub use manager::{FlowError, FlowInfo, FlowManager, FlowManagerResult};
pub use result::{FlowResult, FlowResultType, FormField, SelectOption};
