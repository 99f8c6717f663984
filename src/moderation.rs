use crate::filter;
use crate::llm::TextProvider;
use crate::types::ModerationVerdict;
use tracing::{debug, warn};

/// Banned and promotional terms found in `text`, one issue per term.
pub fn heuristic(text: &str, banned: &[String]) -> ModerationVerdict {
    let issues = filter::find_terms(text, banned)
        .iter()
        .map(filter::TermMatch::issue)
        .collect();
    ModerationVerdict::from_issues(issues)
}

/// Produces a verdict for a final post.
///
/// The heuristic scan always runs. When a provider with a moderation endpoint
/// is attached it is asked exactly once and its issues are appended to the
/// heuristic ones; if that call fails the heuristic verdict stands alone.
#[derive(Clone, Copy, Default)]
pub struct ModerationEvaluator<'a> {
    provider: Option<&'a dyn TextProvider>,
}

impl<'a> ModerationEvaluator<'a> {
    pub fn heuristic_only() -> Self {
        Self { provider: None }
    }

    pub fn with_provider(provider: &'a dyn TextProvider) -> Self {
        Self {
            provider: provider.supports_moderation().then_some(provider),
        }
    }

    pub async fn evaluate(&self, text: &str, banned: &[String]) -> ModerationVerdict {
        let local = heuristic(text, banned);
        let Some(provider) = self.provider else {
            return local;
        };
        match provider.moderate(text).await {
            Ok(remote) => {
                debug!(
                    provider = provider.name(),
                    flagged = !remote.ok(),
                    "provider moderation verdict"
                );
                local.merge(remote)
            }
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    error = %e,
                    "provider moderation failed, using heuristic verdict"
                );
                local
            }
        }
    }
}
