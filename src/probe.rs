//! Selection Probe
//!
//! On-demand inspection of the desktop's current selection. One shared
//! routine serves both the resident watcher and the popup's direct fallback,
//! so the two paths can never drift apart.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::snapshot::SelectionSnapshot;
use crate::sources::{CommandSource, SelectionSource, WaylandPrimarySource, X11PrimarySource};

/// Probes an ordered ladder of selection sources.
pub struct SelectionProbe {
    sources: Vec<Box<dyn SelectionSource>>,
}

impl SelectionProbe {
    pub fn new(sources: Vec<Box<dyn SelectionSource>>) -> Self {
        Self { sources }
    }

    /// Build the production ladder: Wayland primary, then X11 primary, then
    /// any user-configured source commands in configured order.
    pub fn from_config(config: &Config) -> Self {
        let mut sources: Vec<Box<dyn SelectionSource>> = Vec::new();

        if let Some(source) = WaylandPrimarySource::from_env() {
            sources.push(Box::new(source));
        }
        if let Some(source) = X11PrimarySource::from_env() {
            sources.push(Box::new(source));
        }
        for spec in &config.extra_source_commands {
            match CommandSource::parse(spec) {
                Some(source) => sources.push(Box::new(source)),
                None => warn!("ignoring empty source command in config"),
            }
        }

        let probe = Self::new(sources);
        if probe.sources.is_empty() {
            warn!("no selection sources available; every probe will come up empty");
        } else {
            info!("selection sources: {:?}", probe.source_names());
        }
        probe
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Inspect the current selection state.
    ///
    /// Deterministic ordered ladder, first non-empty trimmed result wins. A
    /// faulting source is skipped and the ladder continues; nothing raised
    /// here ever escapes. Safe to call at arbitrary frequency; no side
    /// effects.
    pub async fn detect(&self) -> SelectionSnapshot {
        for source in &self.sources {
            match source.read().await {
                Ok(Some(text)) => {
                    let snapshot = SelectionSnapshot::captured(&text, source.origin());
                    if snapshot.has_text() {
                        debug!("selection found via {}", source.name());
                        return snapshot;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("source {} skipped: {}", source.name(), e);
                }
            }
        }
        SelectionSnapshot::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SelectionOrigin;
    use crate::sources::testing::{ScriptStep, ScriptedSource};
    use std::sync::Arc;

    fn boxed(source: Arc<ScriptedSource>) -> Box<dyn SelectionSource> {
        struct Shared(Arc<ScriptedSource>);

        #[async_trait::async_trait]
        impl SelectionSource for Shared {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn origin(&self) -> SelectionOrigin {
                self.0.origin()
            }
            async fn read(&self) -> crate::error::RelayResult<Option<String>> {
                self.0.read().await
            }
        }

        Box::new(Shared(source))
    }

    #[tokio::test]
    async fn test_first_non_empty_source_wins() {
        let first = Arc::new(ScriptedSource::new(
            SelectionOrigin::WaylandPrimary,
            vec![ScriptStep::Text("Hello world")],
        ));
        let second = Arc::new(ScriptedSource::new(
            SelectionOrigin::X11Primary,
            vec![ScriptStep::Text("shadowed")],
        ));
        let probe = SelectionProbe::new(vec![boxed(first.clone()), boxed(second.clone())]);

        let snap = probe.detect().await;
        assert_eq!(snap.text, "Hello world");
        assert_eq!(snap.origin, SelectionOrigin::WaylandPrimary);
        // The ladder stops at the first hit
        assert_eq!(second.reads(), 0);
    }

    #[tokio::test]
    async fn test_faulting_source_is_skipped() {
        let broken = Arc::new(ScriptedSource::new(
            SelectionOrigin::WaylandPrimary,
            vec![ScriptStep::Fault],
        ));
        let working = Arc::new(ScriptedSource::new(
            SelectionOrigin::X11Primary,
            vec![ScriptStep::Text("still here")],
        ));
        let probe = SelectionProbe::new(vec![boxed(broken.clone()), boxed(working)]);

        let snap = probe.detect().await;
        assert_eq!(snap.text, "still here");
        assert_eq!(snap.origin, SelectionOrigin::X11Primary);
        assert_eq!(broken.reads(), 1);
    }

    #[tokio::test]
    async fn test_all_empty_yields_none() {
        let a = Arc::new(ScriptedSource::new(
            SelectionOrigin::WaylandPrimary,
            vec![ScriptStep::Empty],
        ));
        let b = Arc::new(ScriptedSource::new(
            SelectionOrigin::X11Primary,
            vec![ScriptStep::Text("   ")],
        ));
        let probe = SelectionProbe::new(vec![boxed(a), boxed(b)]);

        let snap = probe.detect().await;
        assert_eq!(snap.origin, SelectionOrigin::None);
        assert_eq!(snap.text, "");
    }

    #[tokio::test]
    async fn test_probe_is_idempotent_without_mutation() {
        let source = Arc::new(ScriptedSource::new(
            SelectionOrigin::WaylandPrimary,
            vec![ScriptStep::Text("stable")],
        ));
        let probe = SelectionProbe::new(vec![boxed(source)]);

        let first = probe.detect().await;
        let second = probe.detect().await;
        assert!(first.same_text(&second));
        assert_eq!(first.origin, second.origin);
    }

    #[tokio::test]
    async fn test_no_sources_yields_none() {
        let probe = SelectionProbe::new(Vec::new());
        let snap = probe.detect().await;
        assert_eq!(snap.origin, SelectionOrigin::None);
    }
}
