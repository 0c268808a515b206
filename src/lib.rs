//! Document wizard: turns a free-text description of a formal document into
//! a field list, a filled-in form and finally rendered HTML, delegating all
//! content generation to a text-completion endpoint.

pub mod clients;
pub mod config;
pub mod credentials;
pub mod error;
pub mod export;
pub mod generators;
pub mod normalize;
pub mod prompts;
pub mod schemas;
pub mod wizard;

pub use error::{Result, WizardError};
pub use wizard::{Step, Transition, WizardSession, WizardState};
