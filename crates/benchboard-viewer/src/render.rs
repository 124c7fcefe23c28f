//! Chart surface seam.
//!
//! Mounting is two-phase: every container is inserted before any chart is
//! attached, so a renderer never sees a chart for a surface it does not have.

use std::fmt;

use benchboard_protocol::BoardError;
use benchboard_state::ChartSpec;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(String);

impl SurfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `{prefix}-{name}` with every non-alphanumeric character of `name`
    /// replaced by `-`.
    pub fn for_chart(prefix: &str, name: &str) -> Self {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        Self(format!("{prefix}-{sanitized}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders declarative chart specs onto named surfaces.
pub trait ChartRenderer {
    fn insert_container(&mut self, id: &SurfaceId);

    /// Only called for containers that were inserted.
    fn attach_chart(&mut self, id: &SurfaceId, spec: &ChartSpec) -> Result<(), BoardError>;

    fn remove_container(&mut self, id: &SurfaceId);
}

/// Insert all containers, then attach each chart. A failing chart is logged
/// and does not stop the others; the first failure is returned.
pub fn mount<'a>(
    renderer: &mut dyn ChartRenderer,
    charts: impl IntoIterator<Item = (&'a SurfaceId, &'a ChartSpec)>,
) -> Result<(), BoardError> {
    let charts: Vec<_> = charts.into_iter().collect();
    for (id, _) in &charts {
        renderer.insert_container(id);
    }
    let mut first_err = None;
    for (id, spec) in charts {
        if let Err(e) = renderer.attach_chart(id, spec) {
            tracing::warn!(surface = %id, error = %e, "Chart could not be attached");
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

pub fn unmount<'a>(
    renderer: &mut dyn ChartRenderer,
    ids: impl IntoIterator<Item = &'a SurfaceId>,
) {
    for id in ids {
        renderer.remove_container(id);
    }
}
