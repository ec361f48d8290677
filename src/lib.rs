//! Screenshot-driven browser navigation: a vision model looks at the page,
//! proposes one action, the browser performs it, repeat until the latest
//! release of a repository has been read off the screen.

pub mod brain;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod guardrail;
pub mod hands;
pub mod history;
pub mod navigator;
pub mod result;
pub mod types;

pub use brain::{Decision, DecisionClient, DecisionMode, VisionBrain, VisionProvider};
pub use config::{NavigatorConfig, ProviderKind, ProviderSettings};
pub use error::{NavError, ProviderError};
pub use executor::Executor;
pub use hands::{Browser, ChromeBrowser, Session};
pub use history::History;
pub use navigator::{NavigationRun, Navigator};
pub use result::{FailureReason, NavigationResult, ReleaseInfo, ReleaseReport};
pub use types::{Action, ActionRecord, Direction, Goal, Outcome, PlannedAction, Screenshot, StepIndex, Viewport};
