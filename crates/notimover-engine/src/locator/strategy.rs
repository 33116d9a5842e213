//! The ordered search strategies, as pure functions over node records.
//!
//! Each strategy returns candidate indices into the record list, best first.
//! An empty result means the strategy did not apply and the next one is tried.

use std::cmp::Ordering;

use crate::{
    locator::{LocatorCfg, Strategy, classify::is_center_panel_sized, tree::NodeInfo},
    model::FilterCriteria,
};

/// Score for an exact subrole match.
pub const SCORE_EXACT_SUBROLE: i64 = 100;
/// Score for a partial subrole match.
pub const SCORE_PARTIAL_SUBROLE: i64 = 40;
/// Score added per level of depth.
pub const SCORE_PER_DEPTH: i64 = 5;
/// Score added when the frame lies within the filter bounds.
pub const SCORE_SIZE_WITHIN: i64 = 20;

/// Substring that marks a subrole as notification-related.
const PARTIAL_SUBROLE_MARKER: &str = "notification";

/// A ranked candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Index into the node list.
    pub index: usize,
    /// Strategy-specific score; higher is better.
    pub score: i64,
    /// Candidate frame is large enough to be the center panel.
    pub panel_sized: bool,
}

/// Inputs shared by all strategies.
#[derive(Clone, Copy, Debug)]
pub struct SearchCtx<'a> {
    /// Size bounds and subrole allow-list.
    pub filter: &'a FilterCriteria,
    /// Known subroles, identifier prefixes and container roles.
    pub cfg: &'a LocatorCfg,
}

impl SearchCtx<'_> {
    /// True when the node's frame satisfies the size bounds.
    fn size_ok(&self, n: &NodeInfo) -> bool {
        n.frame.is_some_and(|f| self.filter.size_within(f.size()))
    }

    /// True when the node's frame is panel-sized.
    fn panel_sized(&self, n: &NodeInfo) -> bool {
        n.frame.is_some_and(|f| is_center_panel_sized(f.size()))
    }

    /// Exact subroles: the filter allow-list when set, otherwise the
    /// configured known subroles.
    fn exact_subrole(&self, subrole: &str) -> bool {
        match &self.filter.allowed_subroles {
            Some(set) => set.contains(subrole),
            None => self.cfg.known_subroles.iter().any(|s| s == subrole),
        }
    }

    /// Partial subroles: contains the notification marker, or shares a
    /// prefix with an allowed subrole.
    fn partial_subrole(&self, subrole: &str) -> bool {
        if subrole.to_ascii_lowercase().contains(PARTIAL_SUBROLE_MARKER) {
            return true;
        }
        self.filter
            .allowed_subroles
            .as_ref()
            .is_some_and(|set| set.iter().any(|s| s.starts_with(subrole) || subrole.starts_with(s.as_str())))
    }

    /// Build a candidate, applying the common depth and size bonuses.
    fn candidate(&self, index: usize, n: &NodeInfo, base: i64) -> Candidate {
        let mut score = base + SCORE_PER_DEPTH * n.depth as i64;
        if self.size_ok(n) {
            score += SCORE_SIZE_WITHIN;
        }
        Candidate {
            index,
            score,
            panel_sized: self.panel_sized(n),
        }
    }

    /// Sort best first. Panel-sized candidates go last when the filter
    /// excludes the center panel; ties keep pre-order.
    fn rank(&self, mut v: Vec<Candidate>) -> Vec<Candidate> {
        let demote = self.filter.exclude_center_panel;
        v.sort_by(|a, b| {
            let pa = demote && a.panel_sized;
            let pb = demote && b.panel_sized;
            pa.cmp(&pb)
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| a.index.cmp(&b.index))
        });
        v
    }
}

/// Run one strategy over the node list.
pub fn run(strategy: Strategy, nodes: &[NodeInfo], ctx: &SearchCtx<'_>) -> Vec<Candidate> {
    match strategy {
        Strategy::SubroleMatch => by_subrole(nodes, ctx),
        Strategy::IdentifierMatch => by_identifier(nodes, ctx),
        Strategy::RoleAndSize => by_role_and_size(nodes, ctx),
        Strategy::DeepestSized => deepest_sized(nodes, ctx),
        Strategy::AnySized => any_sized(nodes, ctx),
    }
}

/// Elements whose subrole matches exactly or partially, scored.
pub fn by_subrole(nodes: &[NodeInfo], ctx: &SearchCtx<'_>) -> Vec<Candidate> {
    let v = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.has_size())
        .filter_map(|(i, n)| {
            let sr = n.subrole.as_deref()?;
            let base = if ctx.exact_subrole(sr) {
                SCORE_EXACT_SUBROLE
            } else if ctx.partial_subrole(sr) {
                SCORE_PARTIAL_SUBROLE
            } else {
                return None;
            };
            Some(ctx.candidate(i, n, base))
        })
        .collect();
    ctx.rank(v)
}

/// Elements whose identifier starts with a known prefix (case-insensitive).
pub fn by_identifier(nodes: &[NodeInfo], ctx: &SearchCtx<'_>) -> Vec<Candidate> {
    let prefixes: Vec<String> = ctx
        .cfg
        .identifier_prefixes
        .iter()
        .map(|p| p.to_ascii_lowercase())
        .collect();
    let v = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.has_size())
        .filter(|(_, n)| {
            n.identifier.as_deref().is_some_and(|id| {
                let id = id.to_ascii_lowercase();
                prefixes.iter().any(|p| id.starts_with(p.as_str()))
            })
        })
        .map(|(i, n)| ctx.candidate(i, n, 0))
        .collect();
    ctx.rank(v)
}

/// Elements with a container role whose size satisfies the bounds.
pub fn by_role_and_size(nodes: &[NodeInfo], ctx: &SearchCtx<'_>) -> Vec<Candidate> {
    let v = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| {
            n.role
                .as_deref()
                .is_some_and(|r| ctx.cfg.container_roles.iter().any(|c| c == r))
        })
        .filter(|(_, n)| ctx.size_ok(n))
        .map(|(i, n)| ctx.candidate(i, n, 0))
        .collect();
    ctx.rank(v)
}

/// The deepest non-root element with a role whose size satisfies the
/// bounds; ties resolve to the first in pre-order.
pub fn deepest_sized(nodes: &[NodeInfo], ctx: &SearchCtx<'_>) -> Vec<Candidate> {
    let mut v: Vec<Candidate> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.depth >= 1 && n.role.is_some() && ctx.size_ok(n))
        .map(|(i, n)| Candidate {
            index: i,
            score: n.depth as i64,
            panel_sized: ctx.panel_sized(n),
        })
        .collect();
    v.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => a.index.cmp(&b.index),
        o => o,
    });
    v
}

/// Any element, root included and role ignored, whose size satisfies the
/// bounds, in pre-order.
pub fn any_sized(nodes: &[NodeInfo], ctx: &SearchCtx<'_>) -> Vec<Candidate> {
    nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| ctx.size_ok(n))
        .map(|(i, n)| Candidate {
            index: i,
            score: 0,
            panel_sized: ctx.panel_sized(n),
        })
        .collect()
}
