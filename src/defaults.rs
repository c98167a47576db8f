//! Process-wide default configuration
//!
//! Built-in defaults live in `Default` impls; the host seeds overrides once
//! at startup from its metadata entries (the `<meta name="async:...">`
//! namespace). Seeded values sit between built-ins and attribute-derived
//! values in the resolution precedence chain.

use serde::Serialize;
use tracing::{debug, warn};

use crate::options::parse::parse_poll_repeats;
use crate::render::RenderMethod;

/// Default text table (nested defaults, seeded via dotted meta paths)
#[derive(Debug, Clone, Serialize)]
pub struct Texts {
    /// Shown by the host when the user leaves the page mid-request
    pub confirm_exit: String,
}

impl Default for Texts {
    fn default() -> Self {
        Self {
            confirm_exit:
                "A request is in progress, do you really want to exit and cancel the current process?"
                    .to_string(),
        }
    }
}

/// Global defaults applied beneath attribute-derived values
#[derive(Debug, Clone, Default, Serialize)]
pub struct Defaults {
    /// Nested text table
    pub texts: Texts,

    /// Selector for the default busy indicator
    pub process_indicator: Option<String>,

    /// Default render method (built-in fallback is `Replace`)
    pub render_method: Option<RenderMethod>,

    /// Default post-completion action list
    pub action_done: Option<String>,

    /// Default post-action target selector
    pub action_target: Option<String>,

    /// Default maximum poll repeats
    pub poll_repeats: Option<u32>,
}

impl Defaults {
    /// Seed defaults from metadata entries
    ///
    /// Entries are `(name, content)` pairs; only names in the `async:`
    /// namespace are consumed. A `:` inside the remainder addresses a
    /// nested table by dotted path (`async:texts:ConfirmExit`). Unknown
    /// names and unparseable values are logged and skipped.
    pub fn seed_from_meta<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, content) in entries {
            let Some(rest) = name.strip_prefix("async:") else {
                continue;
            };
            let path = rest.replace(':', ".");
            debug!(%path, %content, "Defaults::seed_from_meta: entry");
            match path.as_str() {
                "texts.ConfirmExit" => self.texts.confirm_exit = content.to_string(),
                "processIndicator" => self.process_indicator = Some(content.to_string()),
                "renderMethod" => match RenderMethod::parse(content) {
                    Ok(method) => self.render_method = Some(method),
                    Err(e) => warn!(%path, error = %e, "Defaults::seed_from_meta: skipping"),
                },
                "actionDone" => self.action_done = Some(content.to_string()),
                "actionTarget" => self.action_target = Some(content.to_string()),
                "pollRepeats" => self.poll_repeats = parse_poll_repeats(content),
                other => warn!(path = %other, "Defaults::seed_from_meta: unknown default, skipping"),
            }
        }
    }
}
