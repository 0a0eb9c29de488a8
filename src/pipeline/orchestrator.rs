//! Scan Pipeline
//!
//! Sequences one scan request:
//!
//! 1. allocate a session and store the uploaded photo
//! 2. run the spine cropper and wait for it to exit
//! 3. for every fragment, concurrently up to a bound: recognize, filter, and
//!    look up the text
//! 4. collect the title groups in fragment order
//!
//! Steps 1-2 fail the request. Failures in step 3 only affect their own
//! fragment.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::filter::TextFilter;
use super::lookup::{CustomSearchClient, TitleSearch};
use super::recognize::{Recognizer, TesseractRecognizer};
use super::segment::{Segmenter, SpineCropper};
use super::types::{Fragment, LookupError, PipelineError, SessionResult, TitleGroup};
use crate::config::Config;
use crate::session::{Session, SessionStore};

/// The stages a scan runs through
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    sessions: SessionStore,
    segmenter: Arc<dyn Segmenter>,
    recognizer: Arc<dyn Recognizer>,
    search: Arc<dyn TitleSearch>,
    filter: TextFilter,
    /// Candidates kept per fragment
    max_results: usize,
    /// Fragments in flight at once
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        sessions: SessionStore,
        segmenter: Arc<dyn Segmenter>,
        recognizer: Arc<dyn Recognizer>,
        search: Arc<dyn TitleSearch>,
        filter: TextFilter,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                sessions,
                segmenter,
                recognizer,
                search,
                filter,
                max_results: 3,
                concurrency: 4,
            }),
        }
    }

    /// Build the production pipeline from configuration
    pub fn from_config(config: &Config, sessions: SessionStore) -> Result<Self, LookupError> {
        let pipeline = Self::new(
            sessions,
            Arc::new(SpineCropper::new(
                &config.pipeline.segmenter_bin,
                config.pipeline.tool_timeout,
            )),
            Arc::new(TesseractRecognizer::new(
                &config.pipeline.recognizer_bin,
                config.pipeline.tool_timeout,
            )),
            Arc::new(CustomSearchClient::new(&config.search)?),
            TextFilter::from_config(&config.filter),
        );

        Ok(pipeline
            .with_max_results(config.search.max_results)
            .with_concurrency(config.pipeline.max_concurrent_fragments))
    }

    pub fn with_max_results(self, max_results: usize) -> Self {
        self.map_inner(|inner| inner.max_results = max_results)
    }

    pub fn with_concurrency(self, concurrency: usize) -> Self {
        self.map_inner(|inner| inner.concurrency = concurrency.max(1))
    }

    fn map_inner(self, f: impl FnOnce(&mut PipelineInner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => PipelineInner {
                sessions: shared.sessions.clone(),
                segmenter: shared.segmenter.clone(),
                recognizer: shared.recognizer.clone(),
                search: shared.search.clone(),
                filter: shared.filter.clone(),
                max_results: shared.max_results,
                concurrency: shared.concurrency,
            },
        };
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// Run a full scan over one uploaded photo
    pub async fn process(
        &self,
        image: &[u8],
        file_name: &str,
    ) -> Result<SessionResult, PipelineError> {
        let inner = &self.inner;

        let session = inner.sessions.create().await?;
        let image_path = inner.sessions.write(&session, file_name, image).await?;

        let fragments = inner.segmenter.segment(&session, &image_path).await?;
        let fragment_count = fragments.len();

        let (fragments, foreign): (Vec<_>, Vec<_>) = fragments.into_iter().partition(|fragment| {
            session.owns(fragment.path()) && fragment.path() != image_path.as_path()
        });
        for fragment in &foreign {
            tracing::warn!(
                session_id = %session.key(),
                fragment = %fragment.path().display(),
                "Ignoring fragment that is not cropper output"
            );
        }

        let groups: Vec<Option<TitleGroup>> = stream::iter(fragments)
            .map(|fragment| self.process_fragment(&session, fragment))
            .buffered(inner.concurrency)
            .collect()
            .await;

        let titles: Vec<TitleGroup> = groups.into_iter().flatten().collect();

        tracing::info!(
            session_id = %session.key(),
            fragments = fragment_count,
            titles = titles.len(),
            "Scan complete"
        );

        Ok(SessionResult { titles })
    }

    /// Recognize, filter and look up one fragment.
    ///
    /// `None` when recognition fails or leaves no text; a failed lookup keeps
    /// the text with an empty candidate list.
    async fn process_fragment(&self, session: &Session, fragment: Fragment) -> Option<TitleGroup> {
        let inner = &self.inner;

        let raw = match inner.recognizer.recognize(&fragment).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.key(),
                    fragment = %fragment.path().display(),
                    error = %e,
                    "Recognition failed, skipping fragment"
                );
                return None;
            }
        };

        let text = inner.filter.filter(&raw);
        if text.is_empty() {
            tracing::debug!(
                session_id = %session.key(),
                fragment = %fragment.path().display(),
                "No usable text on fragment"
            );
            return None;
        }

        let results = match inner.search.search(&text, inner.max_results).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.key(),
                    fragment = %fragment.path().display(),
                    query = %text,
                    error = %e,
                    "Title lookup failed"
                );
                Vec::new()
            }
        };

        Some(TitleGroup {
            img: fragment.reference(),
            results,
            text,
        })
    }
}
