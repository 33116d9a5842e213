//! Finds the positionable content element inside a notification window.
//!
//! One bounded traversal captures the window's accessibility tree as flat
//! [`NodeInfo`] records. The strategies in [`strategy`] then run in a fixed
//! order over those records; the first strategy that yields a
//! position-settable candidate wins:
//!
//! 1. [`Strategy::SubroleMatch`]: scored subrole match.
//! 2. [`Strategy::IdentifierMatch`]: known identifier prefix.
//! 3. [`Strategy::RoleAndSize`]: container role within size bounds.
//! 4. [`Strategy::DeepestSized`]: deepest sized element with a role.
//! 5. [`Strategy::AnySized`]: first sized element of any role.
//!
//! Exhausting the chain is not an error; the window is simply not
//! repositionable.

pub mod classify;
pub mod strategy;
pub mod tree;

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub use self::{
    classify::{classify, is_center_panel_sized},
    strategy::{Candidate, SearchCtx},
    tree::NodeInfo,
};
use crate::{
    error::AxResult,
    geom::Rect,
    ids::ElementRef,
    model::{FilterCriteria, NotificationKind, ScreenGeometry},
    platform::AxQuery,
};

/// Search strategy, in fallback order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Subrole match, scored by exactness, depth and size.
    SubroleMatch,
    /// Identifier prefix match.
    IdentifierMatch,
    /// Container role plus size bounds.
    RoleAndSize,
    /// Deepest element with a role inside the size bounds.
    DeepestSized,
    /// Any element inside the size bounds.
    AnySized,
}

impl Strategy {
    /// The fallback chain.
    pub const CHAIN: [Self; 5] = [
        Self::SubroleMatch,
        Self::IdentifierMatch,
        Self::RoleAndSize,
        Self::DeepestSized,
        Self::AnySized,
    ];

    /// True for strategies that matched notification markers rather than
    /// geometry alone.
    #[must_use]
    pub const fn is_content_match(self) -> bool {
        matches!(self, Self::SubroleMatch | Self::IdentifierMatch)
    }

    /// 1-based position in the chain.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::SubroleMatch => 1,
            Self::IdentifierMatch => 2,
            Self::RoleAndSize => 3,
            Self::DeepestSized => 4,
            Self::AnySized => 5,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SubroleMatch => "subrole",
            Self::IdentifierMatch => "identifier",
            Self::RoleAndSize => "role+size",
            Self::DeepestSized => "deepest-sized",
            Self::AnySized => "any-sized",
        };
        f.write_str(s)
    }
}

/// Tunables for the locator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorCfg {
    /// Maximum traversal depth below the window root.
    pub max_depth: usize,
    /// Maximum number of elements visited per window.
    pub max_nodes: usize,
    /// Subroles that count as exact matches when the filter has no allow-list.
    pub known_subroles: Vec<String>,
    /// Identifier prefixes for the identifier strategy.
    pub identifier_prefixes: Vec<String>,
    /// Roles accepted by the role + size strategy.
    pub container_roles: Vec<String>,
}

impl Default for LocatorCfg {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_nodes: 512,
            known_subroles: vec![
                "AXNotificationCenterBanner".into(),
                "AXNotificationCenterAlert".into(),
            ],
            identifier_prefixes: vec!["notification".into()],
            container_roles: vec!["AXWindow".into(), "AXGroup".into()],
        }
    }
}

/// A located content element.
#[derive(Clone, Debug, PartialEq)]
pub struct Located {
    /// Element handle.
    pub element: ElementRef,
    /// Strategy that found it.
    pub strategy: Strategy,
    /// Depth below the window root.
    pub depth: usize,
    /// Frame in AX coordinates.
    pub frame: Rect,
    /// Classification of the content.
    pub kind: NotificationKind,
}

/// What one strategy contributed to a search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    /// Strategy tried.
    pub strategy: Strategy,
    /// Number of ranked candidates it produced.
    pub candidates: usize,
    /// Candidates skipped because their position was not settable.
    pub unsettable: usize,
}

/// Full outcome of a search, kept for diagnostics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocateReport {
    /// The winning element, if any.
    pub located: Option<Located>,
    /// Strategies tried, in order.
    pub attempts: Vec<Attempt>,
    /// Number of elements visited.
    pub visited: usize,
}

impl LocateReport {
    /// Strategies that were tried.
    pub fn tried(&self) -> Vec<Strategy> {
        self.attempts.iter().map(|a| a.strategy).collect()
    }
}

/// Runs the fallback chain against an accessibility collaborator.
#[derive(Clone)]
pub struct ElementLocator {
    /// Attribute reads.
    query: Arc<dyn AxQuery>,
    /// Traversal bounds and match tables.
    cfg: LocatorCfg,
}

impl ElementLocator {
    /// Create a locator over `query`.
    pub fn new(query: Arc<dyn AxQuery>, cfg: LocatorCfg) -> Self {
        Self { query, cfg }
    }

    /// Active configuration.
    pub fn cfg(&self) -> &LocatorCfg {
        &self.cfg
    }

    /// Locate content under `root`. `Ok(None)` means no strategy matched.
    pub fn locate(
        &self,
        root: ElementRef,
        filter: &FilterCriteria,
        screen: Option<&ScreenGeometry>,
    ) -> AxResult<Option<Located>> {
        Ok(self.locate_report(root, filter, screen)?.located)
    }

    /// Like [`locate`](Self::locate), also returning per-strategy attempts.
    pub fn locate_report(
        &self,
        root: ElementRef,
        filter: &FilterCriteria,
        screen: Option<&ScreenGeometry>,
    ) -> AxResult<LocateReport> {
        let nodes = tree::collect(
            self.query.as_ref(),
            root,
            self.cfg.max_depth,
            self.cfg.max_nodes,
        )?;
        let ctx = SearchCtx {
            filter,
            cfg: &self.cfg,
        };
        let mut report = LocateReport {
            visited: nodes.len(),
            ..LocateReport::default()
        };
        for strat in Strategy::CHAIN {
            let ranked = strategy::run(strat, &nodes, &ctx);
            let mut attempt = Attempt {
                strategy: strat,
                candidates: ranked.len(),
                unsettable: 0,
            };
            trace!(strategy = %strat, candidates = ranked.len(), "locate: strategy ran");
            for cand in ranked {
                let node = &nodes[cand.index];
                let Some(frame) = node.frame else { continue };
                if !self.settable(node.element) {
                    attempt.unsettable += 1;
                    continue;
                }
                let kind = classify(frame.size(), frame.origin(), screen);
                debug!(
                    strategy = %strat,
                    el = %node.element,
                    depth = node.depth,
                    frame = %frame,
                    kind = %kind,
                    "locate: found"
                );
                report.attempts.push(attempt);
                report.located = Some(Located {
                    element: node.element,
                    strategy: strat,
                    depth: node.depth,
                    frame,
                    kind,
                });
                return Ok(report);
            }
            report.attempts.push(attempt);
        }
        debug!(visited = report.visited, "locate: chain exhausted");
        Ok(report)
    }

    /// Settability check; read failures count as not settable.
    fn settable(&self, el: ElementRef) -> bool {
        match self.query.is_position_settable(el) {
            Ok(v) => v,
            Err(e) => {
                trace!(el = %el, error = %e, "locate: settable check failed");
                false
            }
        }
    }
}

impl fmt::Debug for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementLocator")
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geom::{Point, Size},
        test_support::{FakeAxTree, NodeSpec},
    };

    fn locator(tree: &Arc<FakeAxTree>) -> ElementLocator {
        ElementLocator::new(tree.clone(), LocatorCfg::default())
    }

    fn group(w: f64, h: f64) -> NodeSpec {
        NodeSpec::new()
            .role("AXGroup")
            .frame(Point::new(1560.0, 40.0), Size::new(w, h))
    }

    #[test]
    fn role_and_size_match_at_depth_three_wins_before_deeper_fallbacks() {
        let tree = Arc::new(FakeAxTree::new());
        let root = tree.add_root(
            NodeSpec::new()
                .role("AXWindow")
                .frame(Point::new(0.0, 0.0), Size::new(1920.0, 1080.0)),
        );
        let d1 = tree.add_child(root, NodeSpec::new().role("AXScrollArea"));
        let d2 = tree.add_child(d1, NodeSpec::new().role("AXList"));
        let target = tree.add_child(d2, group(344.0, 64.0).settable(true));
        tree.add_child(
            target,
            NodeSpec::new()
                .role("AXStaticText")
                .frame(Point::new(1570.0, 50.0), Size::new(300.0, 40.0))
                .settable(true),
        );

        let report = locator(&tree)
            .locate_report(root, &FilterCriteria::default(), None)
            .unwrap();
        let found = report.located.clone().expect("located");
        assert_eq!(found.strategy, Strategy::RoleAndSize);
        assert_eq!(found.element, target);
        assert_eq!(found.depth, 3);
        assert_eq!(
            report.tried(),
            vec![
                Strategy::SubroleMatch,
                Strategy::IdentifierMatch,
                Strategy::RoleAndSize
            ]
        );
    }

    #[test]
    fn subrole_match_never_returns_panel_as_banner() {
        let tree = Arc::new(FakeAxTree::new());
        let root = tree.add_root(NodeSpec::new().role("AXWindow"));
        let panel = tree.add_child(
            root,
            group(700.0, 500.0)
                .subrole("AXNotificationCenterBanner")
                .settable(true),
        );
        tree.add_child(
            panel,
            group(344.0, 64.0)
                .subrole("AXNotificationCenterBannerItem")
                .settable(true),
        );
        let found = locator(&tree)
            .locate(root, &FilterCriteria::default(), None)
            .unwrap()
            .expect("located");
        assert_ne!(found.kind, NotificationKind::CenterPanel);
        assert_eq!(found.frame.size(), Size::new(344.0, 64.0));

        // With only the panel present the result is classified as panel.
        let tree = Arc::new(FakeAxTree::new());
        let root = tree.add_root(NodeSpec::new().role("AXWindow"));
        tree.add_child(
            root,
            group(700.0, 500.0)
                .subrole("AXNotificationCenterBanner")
                .settable(true),
        );
        let found = locator(&tree)
            .locate(root, &FilterCriteria::default(), None)
            .unwrap()
            .expect("located");
        assert_eq!(found.kind, NotificationKind::CenterPanel);
    }

    #[test]
    fn unsettable_candidate_yields_to_next() {
        let tree = Arc::new(FakeAxTree::new());
        let root = tree.add_root(NodeSpec::new().role("AXWindow"));
        tree.add_child(
            root,
            group(344.0, 64.0)
                .subrole("AXNotificationCenterBanner")
                .settable(false),
        );
        let ok = tree.add_child(root, group(344.0, 64.0).identifier("notification-1").settable(true));
        let report = locator(&tree)
            .locate_report(root, &FilterCriteria::default(), None)
            .unwrap();
        let found = report.located.expect("located");
        assert_eq!(found.element, ok);
        assert_eq!(found.strategy, Strategy::IdentifierMatch);
        assert_eq!(report.attempts[0].unsettable, 1);
    }

    #[test]
    fn exhausted_chain_is_absent() {
        let tree = Arc::new(FakeAxTree::new());
        let root = tree.add_root(NodeSpec::new().role("AXWindow"));
        tree.add_child(root, group(20.0, 10.0).settable(true));
        let report = locator(&tree)
            .locate_report(root, &FilterCriteria::default(), None)
            .unwrap();
        assert!(report.located.is_none());
        assert_eq!(report.tried(), Strategy::CHAIN.to_vec());
    }

    #[test]
    fn any_sized_falls_back_to_root() {
        let tree = Arc::new(FakeAxTree::new());
        let root = tree.add_root(
            NodeSpec::new()
                .frame(Point::new(1560.0, 40.0), Size::new(344.0, 64.0))
                .settable(true),
        );
        let found = locator(&tree)
            .locate(root, &FilterCriteria::default(), None)
            .unwrap()
            .expect("located");
        assert_eq!(found.strategy, Strategy::AnySized);
        assert_eq!(found.element, root);
        assert_eq!(found.depth, 0);
    }
}
