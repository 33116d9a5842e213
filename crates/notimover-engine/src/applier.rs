//! Position mutation with read-back verification.

use std::{fmt, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::{
    error::{AxError, AxResult, DetectionError, Result},
    geom::{Point, Rect, Size},
    ids::ElementRef,
    platform::{AxMutate, AxQuery},
};

/// Extra read attempts after the first one fails.
pub const READ_RETRIES: u32 = 2;
/// Delay between read attempts.
pub const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Read retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub retries: u32,
    /// Delay before each extra attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: READ_RETRIES,
            delay: READ_RETRY_DELAY,
        }
    }
}

/// Writes element positions and reads them back.
#[derive(Clone)]
pub struct PositionApplier {
    /// Attribute reads.
    query: Arc<dyn AxQuery>,
    /// Attribute writes.
    mutate: Arc<dyn AxMutate>,
    /// Read retry policy.
    policy: RetryPolicy,
}

impl fmt::Debug for PositionApplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionApplier")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PositionApplier {
    /// Create an applier with the default retry policy.
    pub fn new(query: Arc<dyn AxQuery>, mutate: Arc<dyn AxMutate>) -> Self {
        Self::with_policy(query, mutate, RetryPolicy::default())
    }

    /// Create an applier with an explicit retry policy.
    pub fn with_policy(
        query: Arc<dyn AxQuery>,
        mutate: Arc<dyn AxMutate>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            query,
            mutate,
            policy,
        }
    }

    /// Issue one position write. Returns whether the collaborator accepted it.
    pub fn apply(&self, el: ElementRef, p: Point) -> bool {
        match self.mutate.set_position(el, p) {
            Ok(()) => true,
            Err(e) => {
                debug!(el = %el, target = %p, error = %e, "apply: write rejected");
                false
            }
        }
    }

    /// Read the position back and compare exactly.
    pub async fn verify(&self, el: ElementRef, expected: Point) -> bool {
        matches!(self.read_position(el).await, Ok(p) if p == expected)
    }

    /// Read `AXPosition`, retrying transient failures.
    pub async fn read_position(&self, el: ElementRef) -> Result<Point> {
        self.retry(|| self.query.position(el)).await
    }

    /// Read `AXSize`, retrying transient failures.
    pub async fn read_size(&self, el: ElementRef) -> Result<Size> {
        self.retry(|| self.query.size(el)).await
    }

    /// Read position and size, retrying transient failures.
    pub async fn read_frame(&self, el: ElementRef) -> Result<Rect> {
        let pos = self.read_position(el).await?;
        let size = self.read_size(el).await?;
        Ok(Rect::from_parts(pos, size))
    }

    /// Revalidate, write once, then verify.
    ///
    /// Returns the confirmed position. Nothing is retried within the call;
    /// callers re-attempt on a later pass.
    pub async fn reposition(&self, el: ElementRef, target: Point) -> Result<Point> {
        if !self.query.is_alive(el) {
            return Err(DetectionError::WindowGone);
        }
        match self.query.is_position_settable(el) {
            Ok(true) => {}
            Ok(false) => return Err(DetectionError::AttributeUnsettable),
            Err(e) => return Err(e.into()),
        }
        if let Err(e) = self.mutate.set_position(el, target) {
            warn!(el = %el, target = %target, error = %e, "reposition: write failed");
            return Err(match e {
                AxError::Gone => DetectionError::WindowGone,
                AxError::Permission => DetectionError::PermissionDenied,
                AxError::NotReady | AxError::Code(_) => DetectionError::AttributeUnsettable,
            });
        }
        let actual = self.read_position(el).await.ok();
        if actual == Some(target) {
            trace!(el = %el, target = %target, "reposition: verified");
            Ok(target)
        } else {
            Err(DetectionError::VerificationMismatch {
                expected: target,
                actual,
            })
        }
    }

    /// Run `read` up to `1 + retries` times. Missing values and transient
    /// errors are retried; a gone element or missing permission is final.
    async fn retry<T, F>(&self, read: F) -> Result<T>
    where
        F: Fn() -> AxResult<Option<T>>,
    {
        let mut attempt = 0;
        loop {
            match read() {
                Ok(Some(v)) => return Ok(v),
                Err(AxError::Gone) => return Err(DetectionError::WindowGone),
                Err(AxError::Permission) => return Err(DetectionError::PermissionDenied),
                Ok(None) | Err(AxError::NotReady | AxError::Code(_)) => {}
            }
            if attempt >= self.policy.retries {
                return Err(DetectionError::NotReady);
            }
            attempt += 1;
            trace!(attempt, "read: retrying");
            sleep(self.policy.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeAxTree, NodeSpec};

    fn setup(spec: NodeSpec) -> (Arc<FakeAxTree>, PositionApplier, ElementRef) {
        let tree = Arc::new(FakeAxTree::new());
        let el = tree.add_root(spec);
        let applier = PositionApplier::new(tree.clone(), tree.clone());
        (tree, applier, el)
    }

    fn banner() -> NodeSpec {
        NodeSpec::new()
            .role("AXGroup")
            .frame(Point::new(1560.0, 40.0), Size::new(344.0, 64.0))
    }

    #[tokio::test(start_paused = true)]
    async fn apply_then_verify_round_trips() {
        let (_tree, applier, el) = setup(banner());
        let p = Point::new(1556.0, 966.0);
        assert!(applier.apply(el, p));
        assert!(applier.verify(el, p).await);
        assert!(!applier.verify(el, Point::new(0.0, 0.0)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn reads_retry_twice_then_give_up() {
        let (tree, applier, el) = setup(banner());
        tree.fail_position_reads(el, 2);
        assert_eq!(
            applier.read_position(el).await,
            Ok(Point::new(1560.0, 40.0))
        );
        tree.fail_position_reads(el, 3);
        assert_eq!(applier.read_position(el).await, Err(DetectionError::NotReady));
        assert_eq!(tree.position_reads(el), 2 + 1 + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gone_element_is_not_retried() {
        let (tree, applier, el) = setup(banner());
        tree.kill(el);
        assert_eq!(
            applier.read_position(el).await,
            Err(DetectionError::WindowGone)
        );
        assert_eq!(tree.position_reads(el), 1);
        assert_eq!(
            applier.reposition(el, Point::new(0.0, 0.0)).await,
            Err(DetectionError::WindowGone)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unsettable_element_is_not_written() {
        let (tree, applier, el) = setup(banner().settable(false));
        assert_eq!(
            applier.reposition(el, Point::new(10.0, 10.0)).await,
            Err(DetectionError::AttributeUnsettable)
        );
        assert!(tree.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn mismatch_reports_actual_position() {
        let (tree, applier, el) = setup(banner());
        tree.snap_writes_to(el, Point::new(5.0, 5.0));
        let err = applier
            .reposition(el, Point::new(100.0, 100.0))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DetectionError::VerificationMismatch {
                expected: Point::new(100.0, 100.0),
                actual: Some(Point::new(5.0, 5.0)),
            }
        );
        assert_eq!(tree.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn read_frame_combines_position_and_size() {
        let (_tree, applier, el) = setup(banner());
        assert_eq!(
            applier.read_frame(el).await,
            Ok(Rect::new(1560.0, 40.0, 344.0, 64.0))
        );
    }
}
