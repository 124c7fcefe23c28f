//! Dataset version resolution and the path templates of both display modes.

use benchboard_protocol::{BoardError, DisplayMode, Manifest, ModelRef};

use crate::fetcher::{fetch_json, DataFetcher};

/// Paths of one dataset version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDataset {
    pub version: String,
    pub leaderboard_path: String,
    pub detail_base_path: String,
}

#[derive(Debug, Clone)]
pub struct ManifestResolver {
    data_root: String,
    mode: DisplayMode,
    /// Model the community strategies were played with.
    community: ModelRef,
}

impl ManifestResolver {
    pub fn new(data_root: impl Into<String>, mode: DisplayMode, community: ModelRef) -> Self {
        Self {
            data_root: data_root.into(),
            mode,
            community,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn community_model(&self) -> &ModelRef {
        &self.community
    }

    fn benchmark_root(&self) -> String {
        let kind = match self.mode {
            DisplayMode::Model => "models",
            DisplayMode::Community => "strategies",
        };
        format!("{}/benchmarks/{kind}", self.data_root)
    }

    pub fn manifest_path(&self) -> String {
        format!("{}/manifest.json", self.benchmark_root())
    }

    /// Leaderboard and detail base paths for `version`.
    pub fn paths_for(&self, version: &str) -> ResolvedDataset {
        let root = self.benchmark_root();
        let detail_base_path = match self.mode {
            DisplayMode::Model => format!("{root}/{version}/default"),
            DisplayMode::Community => format!(
                "{root}/{version}/{}/{}",
                self.community.vendor, self.community.model
            ),
        };
        ResolvedDataset {
            version: version.to_string(),
            leaderboard_path: format!("{detail_base_path}/leaderboard.json"),
            detail_base_path,
        }
    }

    /// Pick the requested version when the manifest lists it, otherwise the
    /// manifest default.
    pub fn resolve(
        &self,
        manifest: &Manifest,
        requested: Option<&str>,
    ) -> Result<ResolvedDataset, BoardError> {
        if manifest.versions.is_empty() {
            return Err(BoardError::Manifest("manifest lists no versions".into()));
        }
        let default = manifest
            .default_version()
            .ok_or_else(|| BoardError::Manifest("manifest declares no default version".into()))?;
        if !manifest.contains(default) {
            return Err(BoardError::Manifest(format!(
                "default version '{default}' is not listed"
            )));
        }

        let version = match requested {
            Some(v) if manifest.contains(v) => v,
            Some(v) => {
                tracing::warn!(requested = %v, default = %default, "Requested version not in manifest, using default");
                default
            }
            None => default,
        };
        Ok(self.paths_for(version))
    }

    pub async fn load_manifest(&self, fetcher: &dyn DataFetcher) -> Result<Manifest, BoardError> {
        let path = self.manifest_path();
        let manifest: Manifest = fetch_json(fetcher, &path).await?;
        tracing::debug!(path = %path, versions = manifest.versions.len(), "Loaded manifest");
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_mode_templates() {
        let resolver = ManifestResolver::new("", DisplayMode::Model, ModelRef::new("openai", "gpt-oss-20b"));
        assert_eq!(resolver.manifest_path(), "/benchmarks/models/manifest.json");
        let paths = resolver.paths_for("v1.0.0");
        assert_eq!(paths.leaderboard_path, "/benchmarks/models/v1.0.0/default/leaderboard.json");
        assert_eq!(paths.detail_base_path, "/benchmarks/models/v1.0.0/default");
    }

    #[test]
    fn community_mode_templates() {
        let resolver = ManifestResolver::new(
            "https://cdn.example",
            DisplayMode::Community,
            ModelRef::new("openai", "gpt-oss-20b"),
        );
        assert_eq!(
            resolver.manifest_path(),
            "https://cdn.example/benchmarks/strategies/manifest.json"
        );
        assert_eq!(
            resolver.paths_for("v2").leaderboard_path,
            "https://cdn.example/benchmarks/strategies/v2/openai/gpt-oss-20b/leaderboard.json"
        );
    }
}
