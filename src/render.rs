//! Render strategy
//!
//! Applies response content to a target element using one of three
//! placement modes. Mode literals come from the `render-method` attribute;
//! an unknown literal is rejected at parse time so an invalid mode can
//! never reach [`apply`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::element::ElementRef;

/// Errors raised while resolving a render mode
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("unknown render method: {0:?}")]
    UnknownMethod(String),
}

/// How response content merges into the target element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMethod {
    /// Content added before existing target content
    Prepend,
    /// Target content fully replaced
    #[default]
    Replace,
    /// Content added after existing target content
    Append,
}

impl RenderMethod {
    /// Parse a `render-method` attribute literal
    pub fn parse(literal: &str) -> Result<Self, RenderError> {
        match literal.trim() {
            "prepend" => Ok(Self::Prepend),
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            other => Err(RenderError::UnknownMethod(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepend => "prepend",
            Self::Replace => "replace",
            Self::Append => "append",
        }
    }
}

/// Apply content to the target using the given mode
///
/// An absent payload (the confirmation-declined completion path) performs
/// no mutation; the rest of the completion pipeline still runs.
pub fn apply(method: RenderMethod, target: &ElementRef, content: Option<&str>) {
    let Some(content) = content else {
        debug!(target = %target.key(), "render::apply: no content, skipping mutation");
        return;
    };
    debug!(target = %target.key(), method = method.as_str(), "render::apply: called");
    match method {
        RenderMethod::Append => target.append(content),
        RenderMethod::Replace => target.replace(content),
        RenderMethod::Prepend => target.prepend(content),
    }
}
