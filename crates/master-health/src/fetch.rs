//! Paginated Fetcher.
//!
//! Collections are read page by page (at most [`MAX_PAGE_SIZE`] items each)
//! until the server stops handing out continuation tokens. Each page request
//! is retried on its own, so a failure on page three never throws away pages
//! one and two.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use k8s_openapi::api::core::v1::{ConfigMap, Node, Pod};
use tracing::{debug, instrument, warn};

use crate::cluster::{ClusterOperator, ClusterQuery, ListQuery, Page, MAX_PAGE_SIZE};
use crate::error::{FetchError, QueryError};

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 3;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}

/// Run `op` until it succeeds or the policy's attempts are used up.
///
/// The delay is a `tokio::time::sleep`, so only the calling task waits and
/// tests can run with paused time.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, QueryError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                warn!(
                    what,
                    attempt,
                    max_attempts,
                    error = %e,
                    "API call failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(FetchError {
                    attempts: attempt,
                    source: e,
                })
            }
        }
    }
}

/// Reads complete collections through a [`ClusterQuery`].
#[derive(Clone, Copy)]
pub struct Fetcher<'a> {
    cluster: &'a dyn ClusterQuery,
    policy: RetryPolicy,
    page_size: u32,
}

impl<'a> Fetcher<'a> {
    pub fn new(cluster: &'a dyn ClusterQuery, policy: RetryPolicy, page_size: u32) -> Self {
        Self {
            cluster,
            policy,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn nodes(&self, query: &ListQuery) -> Result<Vec<Node>, FetchError> {
        let query = self.bounded(query);
        self.collect("nodes", |token| self.cluster.list_nodes(&query, token))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn pods(&self, query: &ListQuery) -> Result<Vec<Pod>, FetchError> {
        let query = self.bounded(query);
        self.collect("pods", |token| self.cluster.list_pods(&query, token))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn config_maps(&self, query: &ListQuery) -> Result<Vec<ConfigMap>, FetchError> {
        let query = self.bounded(query);
        self.collect("configmaps", |token| {
            self.cluster.list_config_maps(&query, token)
        })
        .await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn cluster_operators(
        &self,
        query: &ListQuery,
    ) -> Result<Vec<ClusterOperator>, FetchError> {
        let query = self.bounded(query);
        self.collect("clusteroperators", |token| {
            self.cluster.list_cluster_operators(&query, token)
        })
        .await
    }

    /// Single cluster operator by name, retried like a page.
    #[instrument(skip(self), level = "debug")]
    pub async fn cluster_operator(&self, name: &str) -> Result<Option<ClusterOperator>, FetchError> {
        with_retry(self.policy, "clusteroperator", || {
            self.cluster.get_cluster_operator(name)
        })
        .await
    }

    fn bounded(&self, query: &ListQuery) -> ListQuery {
        let size = query.page_size.min(self.page_size);
        query.clone().page_size(size)
    }

    async fn collect<T, F, Fut>(&self, kind: &str, mut list_page: F) -> Result<Vec<T>, FetchError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page<T>, QueryError>>,
    {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        let mut seen = HashSet::new();
        let mut pages = 0_u32;

        loop {
            let page = with_retry(self.policy, kind, || list_page(token.clone())).await?;
            pages += 1;

            let next = page.next_token().map(str::to_owned);
            items.extend(page.items);

            match next {
                // Any token handed out twice means the chain cycles
                Some(next) if !seen.insert(next.clone()) => {
                    warn!(kind, token = %next, pages, "Continuation token repeated, stopping");
                    break;
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!(kind, pages, items = items.len(), "Fetched collection");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockClusterQuery;
    use crate::testing::{node, running_pod};
    use mockall::Sequence;

    fn names(pods: &[Pod]) -> Vec<String> {
        pods.iter()
            .filter_map(|pod| pod.metadata.name.clone())
            .collect()
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_pages_are_concatenated_in_order() {
        let mut cluster = MockClusterQuery::new();
        let mut seq = Sequence::new();
        cluster
            .expect_list_pods()
            .withf(|_, token| token.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(Page::with_continue(
                    vec![running_pod("a"), running_pod("b")],
                    "page-2",
                ))
            });
        cluster
            .expect_list_pods()
            .withf(|_, token| token.as_deref() == Some("page-2"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Page::with_continue(vec![running_pod("c")], "page-3")));
        cluster
            .expect_list_pods()
            .withf(|_, token| token.as_deref() == Some("page-3"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Page::last(vec![running_pod("d"), running_pod("e")])));

        let fetcher = Fetcher::new(&cluster, policy(), 2);
        let pods = fetcher.pods(&ListQuery::namespaced("default")).await.unwrap();

        assert_eq!(names(&pods), vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_page_size_never_exceeds_limit() {
        let mut cluster = MockClusterQuery::new();
        cluster
            .expect_list_nodes()
            .withf(|query, _| query.page_size == 40)
            .times(1)
            .returning(|_, _| Ok(Page::last(vec![node("master-0", vec![])])));

        let fetcher = Fetcher::new(&cluster, policy(), 40);
        let nodes = fetcher.nodes(&ListQuery::cluster_wide()).await.unwrap();
        assert_eq!(nodes.len(), 1);

        let mut cluster = MockClusterQuery::new();
        cluster
            .expect_list_nodes()
            .withf(|query, _| query.page_size == MAX_PAGE_SIZE)
            .times(1)
            .returning(|_, _| Ok(Page::last(vec![])));

        let fetcher = Fetcher::new(&cluster, policy(), 10_000);
        assert!(fetcher.nodes(&ListQuery::cluster_wide()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_first_page_is_not_an_error() {
        let mut cluster = MockClusterQuery::new();
        cluster
            .expect_list_pods()
            .times(1)
            .returning(|_, _| Ok(Page::last(vec![])));

        let fetcher = Fetcher::new(&cluster, policy(), 100);
        let pods = fetcher.pods(&ListQuery::namespaced("empty")).await.unwrap();
        assert!(pods.is_empty());
    }

    #[tokio::test]
    async fn test_blank_token_means_no_more_pages() {
        let mut cluster = MockClusterQuery::new();
        cluster
            .expect_list_pods()
            .times(1)
            .returning(|_, _| Ok(Page::with_continue(vec![running_pod("only")], "")));

        let fetcher = Fetcher::new(&cluster, policy(), 100);
        let pods = fetcher.pods(&ListQuery::namespaced("default")).await.unwrap();
        assert_eq!(names(&pods), vec!["only"]);
    }

    #[tokio::test]
    async fn test_repeated_token_stops_listing() {
        let mut cluster = MockClusterQuery::new();
        cluster
            .expect_list_pods()
            .times(2)
            .returning(|_, _| Ok(Page::with_continue(vec![running_pod("loop")], "same")));

        let fetcher = Fetcher::new(&cluster, policy(), 100);
        let pods = fetcher.pods(&ListQuery::namespaced("default")).await.unwrap();
        assert_eq!(pods.len(), 2);
    }

    #[tokio::test]
    async fn test_cycling_tokens_stop_listing() {
        let mut cluster = MockClusterQuery::new();
        cluster
            .expect_list_nodes()
            .times(3)
            .returning(|_, token| {
                let next = match token.as_deref() {
                    None | Some("B") => "A",
                    _ => "B",
                };
                Ok(Page::with_continue(vec![node("master-0", vec![])], next))
            });

        let fetcher = Fetcher::new(&cluster, policy(), 100);
        let nodes = fetcher.nodes(&ListQuery::cluster_wide()).await.unwrap();
        assert_eq!(nodes.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_retried_until_success_keeps_earlier_pages() {
        let mut cluster = MockClusterQuery::new();
        let mut seq = Sequence::new();
        cluster
            .expect_list_pods()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Page::with_continue(vec![running_pod("a")], "page-2")));
        cluster
            .expect_list_pods()
            .withf(|_, token| token.as_deref() == Some("page-2"))
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(QueryError::Other("connection reset".to_string())));
        cluster
            .expect_list_pods()
            .withf(|_, token| token.as_deref() == Some("page-2"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Page::last(vec![running_pod("b")])));

        let started = tokio::time::Instant::now();
        let fetcher = Fetcher::new(&cluster, policy(), 100);
        let pods = fetcher.pods(&ListQuery::namespaced("default")).await.unwrap();

        assert_eq!(names(&pods), vec!["a", "b"]);
        // Two backoff delays, no more
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_the_fetch() {
        let mut cluster = MockClusterQuery::new();
        cluster
            .expect_list_config_maps()
            .times(3)
            .returning(|_, _| Err(QueryError::Other("service unavailable".to_string())));

        let fetcher = Fetcher::new(&cluster, policy(), 100);
        let err = fetcher
            .config_maps(&ListQuery::namespaced("openshift-config-managed"))
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert!(err.to_string().contains("service unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_object_lookup_is_retried() {
        let mut cluster = MockClusterQuery::new();
        let mut seq = Sequence::new();
        cluster
            .expect_get_cluster_operator()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(QueryError::Other("timeout".to_string())));
        cluster
            .expect_get_cluster_operator()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));

        let fetcher = Fetcher::new(&cluster, policy(), 100);
        assert!(fetcher.cluster_operator("etcd").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_single_attempt_policy_does_not_retry() {
        let mut cluster = MockClusterQuery::new();
        cluster
            .expect_list_nodes()
            .times(1)
            .returning(|_, _| Err(QueryError::Other("forbidden".to_string())));

        let fetcher = Fetcher::new(&cluster, RetryPolicy::new(1, Duration::from_secs(60)), 100);
        let err = fetcher.nodes(&ListQuery::cluster_wide()).await.unwrap_err();
        assert_eq!(err.attempts, 1);
    }
}
