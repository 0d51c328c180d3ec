//! Crawl controller - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Starting a fresh crawl or resuming a checkpointed one
//! - Consuming the frontier breadth-first
//! - Filter, robots.txt and content-type checks before a page counts
//! - Operator decisions at page-count thresholds
//! - Checkpointing on pause or interrupt, finalization on completion

use crate::config::Config;
use crate::crawler::operator::{Decision, Operator, Threshold};
use crate::crawler::parser::extract_links;
use crate::crawler::session::Session;
use crate::output::{finalize_crawl, FinalizedOutput};
use crate::robots::RobotsChecker;
use crate::state::{CrawlPhase, CrawlState};
use crate::storage::{CheckpointHandle, CheckpointStore};
use crate::url::{in_scope, network_location, normalize_url, validate_seed, UrlFilter};
use crate::{CrawlError, FetchError, UrlError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Added to `max_pages` when the operator continues past the limit
pub const MAX_PAGES_INCREMENT: u32 = 100;

/// The operator is also consulted at every positive multiple of this count
pub const CHECKPOINT_INTERVAL: u32 = 20;

/// Why a dequeued URL was not fetched or not counted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyVisited,
    Filtered,
    RobotsDisallowed,
    InvalidUrl,
    NotHtml { content_type: Option<String> },
}

/// Outcome of one loop iteration
#[derive(Debug)]
pub enum Step {
    /// The frontier was empty
    Exhausted,

    Skipped { url: String, reason: SkipReason },

    FetchFailed { url: String, error: FetchError },

    /// Page counted; `links_enqueued` in-scope links were queued
    Visited { url: String, links_enqueued: usize },
}

/// How a crawl run ended and what it left behind
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub phase: CrawlPhase,

    /// State at exit
    pub state: CrawlState,

    /// Written on pause or interrupt when state saving is enabled
    pub checkpoint: Option<CheckpointHandle>,

    /// Crawled URL list, written on completion or stop
    pub crawled_file: Option<PathBuf>,

    pub exports: Vec<PathBuf>,
}

/// Returns the threshold reached at `page_count`, if any
///
/// The page limit takes precedence over the interval.
pub fn threshold_for(page_count: u32, max_pages: u32) -> Option<Threshold> {
    if page_count >= max_pages {
        Some(Threshold::MaxPages {
            page_count,
            max_pages,
        })
    } else if page_count > 0 && page_count % CHECKPOINT_INTERVAL == 0 {
        Some(Threshold::Interval { page_count })
    } else {
        None
    }
}

/// Drives one crawl from start (or resume) to an exit phase
pub struct Controller {
    config: Arc<Config>,
    session: Session,
    robots: RobotsChecker,
    filter: UrlFilter,
    store: Box<dyn CheckpointStore + Send>,
    operator: Box<dyn Operator + Send>,
    state: CrawlState,
    phase: CrawlPhase,
    config_hash: Option<String>,
    robots_exempt: Option<String>,
    interrupt: Arc<AtomicBool>,
}

impl Controller {
    /// Prepares a fresh crawl from `seed`
    ///
    /// The seed must have a scheme and a host; its network location becomes
    /// the crawl's domain. If robots.txt disallows the seed the operator is
    /// asked whether to go on; when it agrees, the seed itself is exempt from
    /// later robots checks.
    ///
    /// # Errors
    ///
    /// * `CrawlError::InvalidUrl` - The seed is malformed
    /// * `CrawlError::RobotsDenied` - The seed is disallowed and the operator declined
    /// * `CrawlError::Fetch` - The HTTP client could not be built
    pub async fn start(
        seed: &str,
        config: Arc<Config>,
        store: Box<dyn CheckpointStore + Send>,
        mut operator: Box<dyn Operator + Send>,
    ) -> Result<Self, CrawlError> {
        let mut seed = validate_seed(seed)?;
        if config.crawler.normalize_urls {
            seed = normalize_url(&seed);
        }
        let domain =
            network_location(&seed).ok_or_else(|| UrlError::MissingHost(seed.to_string()))?;

        let session = Session::from_config(&config.session)?;
        let mut robots = RobotsChecker::from_config(&config);

        let mut robots_exempt = None;
        if !robots.is_allowed(&seed, &session).await {
            if !operator.override_robots(&seed) {
                return Err(CrawlError::RobotsDenied {
                    url: seed.to_string(),
                });
            }
            warn!(url = %seed, "Crawling seed despite robots.txt");
            robots_exempt = Some(seed.to_string());
        }

        let state = CrawlState::fresh(domain, seed.as_str(), config.crawler.max_pages);
        info!(seed = %seed, domain = %state.domain, "Starting crawl");

        Ok(Self {
            filter: UrlFilter::from_config(&config.filter),
            config,
            session,
            robots,
            store,
            operator,
            state,
            phase: CrawlPhase::Idle,
            config_hash: None,
            robots_exempt,
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Prepares a crawl that continues from a restored state
    pub fn resume(
        mut state: CrawlState,
        config: Arc<Config>,
        store: Box<dyn CheckpointStore + Send>,
        operator: Box<dyn Operator + Send>,
    ) -> Result<Self, CrawlError> {
        let session = Session::from_config(&config.session)?;
        state.touch();

        info!(
            domain = %state.domain,
            pages = state.page_count,
            pending = state.frontier.len(),
            "Resuming crawl"
        );

        Ok(Self {
            filter: UrlFilter::from_config(&config.filter),
            robots: RobotsChecker::from_config(&config),
            config,
            session,
            store,
            operator,
            state,
            phase: CrawlPhase::Idle,
            config_hash: None,
            robots_exempt: None,
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Records the configuration hash stored with checkpoints
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Flag that, once raised, makes the loop checkpoint and exit
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<(), CrawlError> {
        if !self.phase.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        debug!(from = %self.phase, to = %next, "Crawl phase change");
        self.phase = next;
        Ok(())
    }

    /// Runs one loop iteration
    ///
    /// # Iteration
    ///
    /// 1. Dequeue; an empty frontier yields `Step::Exhausted`
    /// 2. Skip if already visited, filtered out or disallowed by robots.txt
    /// 3. Fetch; a failure yields `Step::FetchFailed`
    /// 4. Skip non-HTML responses without marking them visited
    /// 5. Mark visited, count the page, enqueue in-scope links
    ///
    /// Thresholds and delays are handled by [`Controller::run`].
    pub async fn step(&mut self) -> Result<Step, CrawlError> {
        match self.phase {
            CrawlPhase::Idle => self.transition(CrawlPhase::Running)?,
            CrawlPhase::Running => {}
            other => {
                return Err(CrawlError::InvalidTransition {
                    from: other,
                    to: CrawlPhase::Running,
                })
            }
        }

        let url = match self.state.frontier.dequeue() {
            Ok(url) => url,
            Err(CrawlError::EmptyFrontier) => return Ok(Step::Exhausted),
            Err(e) => return Err(e),
        };

        if self.state.frontier.is_visited(&url) {
            debug!(url = %url, "Already visited");
            return Ok(Step::Skipped {
                url,
                reason: SkipReason::AlreadyVisited,
            });
        }

        if !self.filter.is_allowed(&url) {
            debug!(url = %url, "Skipping filtered URL");
            return Ok(Step::Skipped {
                url,
                reason: SkipReason::Filtered,
            });
        }

        let parsed = match Url::parse(&url) {
            Ok(parsed) => parsed,
            Err(e) => {
                let err = CrawlError::InvalidUrl(UrlError::Parse(format!("{}: {}", url, e)));
                warn!(error = %err, "Skipping queued URL");
                return Ok(Step::Skipped {
                    url,
                    reason: SkipReason::InvalidUrl,
                });
            }
        };

        let exempt = self.robots_exempt.as_deref() == Some(url.as_str());
        if !exempt && !self.robots.is_allowed(&parsed, &self.session).await {
            return Ok(Step::Skipped {
                url,
                reason: SkipReason::RobotsDisallowed,
            });
        }

        let page = match self
            .session
            .get(&parsed, self.config.session.timeout())
            .await
        {
            Ok(page) => page,
            Err(error) => {
                error!(url = %url, status = ?error.status(), error = %error, "Fetch failed");
                return Ok(Step::FetchFailed { url, error });
            }
        };

        if !page.is_html() {
            debug!(url = %url, content_type = ?page.content_type, "Skipping non-HTML response");
            return Ok(Step::Skipped {
                url,
                reason: SkipReason::NotHtml {
                    content_type: page.content_type,
                },
            });
        }

        self.state.frontier.mark_visited(&url);
        self.state.page_count += 1;

        let mut links_enqueued = 0;
        for link in extract_links(&page.text(), &parsed) {
            let link = if self.config.crawler.normalize_urls {
                normalize_url(&link)
            } else {
                link
            };

            if in_scope(&link, &self.state.domain)
                && self.state.frontier.enqueue_if_new(link.as_str())
            {
                links_enqueued += 1;
            }
        }

        info!(
            url = %url,
            pages = self.state.page_count,
            new_links = links_enqueued,
            pending = self.state.frontier.len(),
            "Crawled page"
        );

        Ok(Step::Visited {
            url,
            links_enqueued,
        })
    }

    /// Runs the loop until the frontier is exhausted or the operator exits
    ///
    /// A pause (or interrupt) writes a checkpoint and skips finalization. A
    /// completed or stopped crawl writes the crawled URL list and exports.
    pub async fn run(&mut self) -> Result<CrawlReport, CrawlError> {
        if self.phase == CrawlPhase::Idle {
            self.transition(CrawlPhase::Running)?;
        } else if self.phase != CrawlPhase::Running {
            return Err(CrawlError::InvalidTransition {
                from: self.phase,
                to: CrawlPhase::Running,
            });
        }

        let crawl_delay = self.config.crawler.crawl_delay();
        let error_cooldown = self.config.crawler.error_cooldown();

        loop {
            if self.interrupt.load(Ordering::SeqCst) {
                warn!(pages = self.state.page_count, "Crawl interrupted");
                return self.pause();
            }

            match self.step().await? {
                Step::Exhausted => {
                    info!(pages = self.state.page_count, "Frontier is empty, crawl complete");
                    self.transition(CrawlPhase::Completed)?;
                    break;
                }
                Step::Skipped { .. } => continue,
                Step::FetchFailed { .. } => {
                    tokio::time::sleep(error_cooldown).await;
                    continue;
                }
                Step::Visited { .. } => {}
            }

            if let Some(threshold) = threshold_for(self.state.page_count, self.state.max_pages) {
                let decision = self.operator.on_threshold(&threshold);
                info!(%threshold, %decision, "Operator decision");

                match decision {
                    Decision::Continue => {
                        if let Threshold::MaxPages { .. } = threshold {
                            self.state.max_pages =
                                self.state.max_pages.saturating_add(MAX_PAGES_INCREMENT);
                            info!(max_pages = self.state.max_pages, "Raised page limit");
                        }
                    }
                    Decision::Pause => return self.pause(),
                    Decision::Stop => {
                        self.transition(CrawlPhase::Stopped)?;
                        break;
                    }
                }
            }

            tokio::time::sleep(crawl_delay).await;
        }

        let output = finalize_crawl(
            &self.config.output,
            &self.state.domain,
            self.state.discovered(),
        );
        Ok(self.report(None, output))
    }

    fn pause(&mut self) -> Result<CrawlReport, CrawlError> {
        self.transition(CrawlPhase::Paused)?;
        self.state.touch();

        let checkpoint = if self.config.crawler.save_crawl_state {
            self.store.save(&self.state, self.config_hash.as_deref())
        } else {
            info!("Crawl state saving is disabled, nothing to resume from");
            None
        };

        Ok(self.report(checkpoint, FinalizedOutput::default()))
    }

    fn report(&self, checkpoint: Option<CheckpointHandle>, output: FinalizedOutput) -> CrawlReport {
        CrawlReport {
            phase: self.phase,
            state: self.state.clone(),
            checkpoint,
            crawled_file: output.crawled_file,
            exports: output.exports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::operator::FixedOperator;
    use crate::storage::SqliteCheckpointStore;

    fn offline_config() -> Arc<Config> {
        let mut config = Config::default();
        config.crawler.respect_robots_txt = false;
        config.crawler.crawl_delay = 0.0;
        config.crawler.error_cooldown = 0.0;
        Arc::new(config)
    }

    fn store() -> Box<dyn CheckpointStore + Send> {
        Box::new(SqliteCheckpointStore::new_in_memory().unwrap())
    }

    fn operator() -> Box<dyn Operator + Send> {
        Box::new(FixedOperator::new(Decision::Continue))
    }

    #[test]
    fn test_threshold_none_below_interval() {
        assert_eq!(threshold_for(0, 100), None);
        assert_eq!(threshold_for(1, 100), None);
        assert_eq!(threshold_for(19, 100), None);
        assert_eq!(threshold_for(21, 100), None);
    }

    #[test]
    fn test_threshold_interval() {
        assert_eq!(
            threshold_for(20, 100),
            Some(Threshold::Interval { page_count: 20 })
        );
        assert_eq!(
            threshold_for(80, 100),
            Some(Threshold::Interval { page_count: 80 })
        );
    }

    #[test]
    fn test_threshold_max_pages_takes_precedence() {
        assert_eq!(
            threshold_for(100, 100),
            Some(Threshold::MaxPages {
                page_count: 100,
                max_pages: 100
            })
        );
        assert_eq!(
            threshold_for(7, 5),
            Some(Threshold::MaxPages {
                page_count: 7,
                max_pages: 5
            })
        );
    }

    #[tokio::test]
    async fn test_start_rejects_relative_seed() {
        let result = Controller::start("/just/a/path", offline_config(), store(), operator()).await;
        assert!(matches!(
            result,
            Err(CrawlError::InvalidUrl(UrlError::MissingScheme(_)))
        ));
    }

    #[tokio::test]
    async fn test_start_rejects_hostless_seed() {
        let result =
            Controller::start("mailto:a@example.com", offline_config(), store(), operator()).await;
        assert!(matches!(result, Err(CrawlError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_start_derives_domain() {
        let controller = Controller::start(
            "http://127.0.0.1:9/start",
            offline_config(),
            store(),
            operator(),
        )
        .await
        .unwrap();

        assert_eq!(controller.state().domain, "127.0.0.1:9");
        assert_eq!(controller.phase(), CrawlPhase::Idle);
        assert_eq!(controller.state().frontier.len(), 1);
    }

    #[tokio::test]
    async fn test_filtered_seed_completes_without_fetching() {
        let mut config = Config::default();
        config.crawler.respect_robots_txt = false;
        config.filter.blacklist = vec!["127.0.0.1".to_string()];
        let dir = tempfile::tempdir().unwrap();
        config.output.crawled_dir = dir.path().join("c").to_string_lossy().to_string();
        config.output.exports_dir = dir.path().join("e").to_string_lossy().to_string();

        let mut controller =
            Controller::start("http://127.0.0.1:9/", Arc::new(config), store(), operator())
                .await
                .unwrap();

        let report = controller.run().await.unwrap();
        assert_eq!(report.phase, CrawlPhase::Completed);
        assert_eq!(report.state.page_count, 0);
        assert!(report.crawled_file.is_some());
        assert_eq!(report.exports.len(), 3);
    }

    #[tokio::test]
    async fn test_interrupt_pauses_with_checkpoint() {
        let mut controller = Controller::start(
            "http://127.0.0.1:9/",
            offline_config(),
            store(),
            operator(),
        )
        .await
        .unwrap();

        controller.interrupt_handle().store(true, Ordering::SeqCst);
        let report = controller.run().await.unwrap();

        assert_eq!(report.phase, CrawlPhase::Paused);
        assert!(report.checkpoint.is_some());
        assert!(report.crawled_file.is_none());
        assert_eq!(report.state.frontier.len(), 1);
    }

    #[tokio::test]
    async fn test_run_after_exit_is_rejected() {
        let mut controller = Controller::start(
            "http://127.0.0.1:9/",
            offline_config(),
            store(),
            operator(),
        )
        .await
        .unwrap();

        controller.interrupt_handle().store(true, Ordering::SeqCst);
        controller.run().await.unwrap();

        assert!(matches!(
            controller.run().await,
            Err(CrawlError::InvalidTransition {
                from: CrawlPhase::Paused,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_resume_keeps_state() {
        let mut state = CrawlState::fresh("example.com", "https://example.com/a", 100);
        state.page_count = 20;
        state.frontier.mark_visited("https://example.com/");

        let controller =
            Controller::resume(state.clone(), offline_config(), store(), operator()).unwrap();

        assert_eq!(controller.state().page_count, 20);
        assert_eq!(controller.state().frontier, state.frontier);
        assert_eq!(controller.phase(), CrawlPhase::Idle);
    }
}
