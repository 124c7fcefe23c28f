//! Published directory layout for detail documents and run artifacts.
//!
//! Model runs:     {base}/{vendor}/{model}/{run_id}/request-{00001}/...
//! Strategy runs:  {base}/{strategy}/{model}/{run_id}/request-{00001}/...

use crate::{EntryIdentity, REQUEST_ID_WIDTH, TOOL_CALL_FILE};

/// Zero padded request id, e.g. `7` -> `"00007"`.
pub fn format_request_id(index: u32) -> String {
    format!("{index:0width$}", width = REQUEST_ID_WIDTH)
}

/// Location of the detail document for one entry.
pub fn detail_path(detail_base: &str, identity: &EntryIdentity) -> String {
    match identity {
        EntryIdentity::Model { vendor, model } => format!("{detail_base}/{vendor}/{model}.json"),
        EntryIdentity::Strategy { name, .. } => format!("{detail_base}/{name}/runs.json"),
    }
}

/// Everything needed to address the recorded requests of an entry's runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLocator {
    pub base_path: String,
    pub vendor: String,
    pub model: String,
    /// Set in community mode; switches the directory template.
    pub strategy: Option<String>,
}

impl RunLocator {
    pub fn for_identity(base_path: &str, identity: &EntryIdentity) -> Self {
        Self {
            base_path: base_path.to_string(),
            vendor: identity.vendor().to_string(),
            model: identity.model().to_string(),
            strategy: identity.strategy().map(str::to_string),
        }
    }

    pub fn run_dir(&self, run_id: &str) -> String {
        match &self.strategy {
            Some(strategy) => format!("{}/{}/{}/{}", self.base_path, strategy, self.model, run_id),
            None => format!("{}/{}/{}/{}", self.base_path, self.vendor, self.model, run_id),
        }
    }

    pub fn request_dir(&self, run_id: &str, index: u32) -> String {
        format!("{}/request-{}", self.run_dir(run_id), format_request_id(index))
    }

    pub fn artifact_path(&self, run_id: &str, index: u32, file: &str) -> String {
        format!("{}/{}", self.request_dir(run_id, index), file)
    }

    /// The artifact whose presence marks a request as recorded.
    pub fn marker_path(&self, run_id: &str, index: u32) -> String {
        self.artifact_path(run_id, index, TOOL_CALL_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_padded_to_five_digits() {
        assert_eq!(format_request_id(1), "00001");
        assert_eq!(format_request_id(431), "00431");
        assert_eq!(format_request_id(123456), "123456");
    }

    #[test]
    fn model_and_strategy_templates_differ() {
        let model = RunLocator {
            base_path: "/data".into(),
            vendor: "openai".into(),
            model: "gpt-5".into(),
            strategy: None,
        };
        assert_eq!(
            model.marker_path("r1", 1),
            "/data/openai/gpt-5/r1/request-00001/tool_call.json"
        );

        let community = RunLocator {
            strategy: Some("aggressive".into()),
            ..model
        };
        assert_eq!(
            community.request_dir("r1", 12),
            "/data/aggressive/gpt-5/r1/request-00012"
        );
    }
}
