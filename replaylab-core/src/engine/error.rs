use super::state::EngineState;
use crate::domain::Event;
use crate::portfolio::PortfolioError;
use crate::strategy::StrategyError;
use chrono::NaiveDateTime;
use thiserror::Error;

/// Collaborator that raised a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Engine,
    Strategy,
    Portfolio,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::Engine => write!(f, "engine"),
            Component::Strategy => write!(f, "strategy"),
            Component::Portfolio => write!(f, "portfolio"),
        }
    }
}

/// Fatal run errors. The engine moves to `Failed` and stops dispatching.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is {state}; build a new engine to replay again")]
    AlreadyStarted { state: EngineState },

    #[error("strategy '{strategy}' failed at {timestamp} on [{event}]: {source}")]
    Strategy {
        strategy: String,
        timestamp: NaiveDateTime,
        event: Box<Event>,
        #[source]
        source: StrategyError,
    },

    #[error("strategy '{strategy}' emitted an invalid signal at {timestamp} [{event}]: {reason}")]
    ContractViolation {
        strategy: String,
        timestamp: NaiveDateTime,
        event: Box<Event>,
        reason: String,
    },

    #[error("accounting invariant violated at {timestamp} on [{event}]: {source}")]
    Accounting {
        timestamp: NaiveDateTime,
        event: Box<Event>,
        #[source]
        source: PortfolioError,
    },
}

impl EngineError {
    pub fn component(&self) -> Component {
        match self {
            EngineError::AlreadyStarted { .. } => Component::Engine,
            EngineError::Strategy { .. } | EngineError::ContractViolation { .. } => {
                Component::Strategy
            }
            EngineError::Accounting { .. } => Component::Portfolio,
        }
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            EngineError::AlreadyStarted { .. } => None,
            EngineError::Strategy { timestamp, .. }
            | EngineError::ContractViolation { timestamp, .. }
            | EngineError::Accounting { timestamp, .. } => Some(*timestamp),
        }
    }

    /// The event being dispatched (or, for contract violations, the bad signal).
    pub fn event(&self) -> Option<&Event> {
        match self {
            EngineError::AlreadyStarted { .. } => None,
            EngineError::Strategy { event, .. }
            | EngineError::ContractViolation { event, .. }
            | EngineError::Accounting { event, .. } => Some(event),
        }
    }
}
