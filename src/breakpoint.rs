//! Breakpoint rules and the matching strategies that select one of them
//! for a measured container size.

use std::fmt;

use bitflags::bitflags;
use peniko::kurbo::Size;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Substituted for absent maxima (and for a missing size) in the area-based
/// strategies, so that "unbounded" still produces a finite, comparable area.
const UNBOUNDED: f64 = 1e6;

/// The axis a bound applies to. Used to pinpoint validation failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Width => f.write_str("width"),
            Axis::Height => f.write_str("height"),
        }
    }
}

/// A malformed breakpoint rule, reported when a rule set is accepted and
/// before any matching runs.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum BreakpointError {
    #[error("breakpoint {index}: {axis} bound {value} must be a finite non-negative number")]
    InvalidBound { index: usize, axis: Axis, value: f64 },
    #[error("breakpoint {index}: {axis} range has min {min} greater than max {max}")]
    InvertedRange {
        index: usize,
        axis: Axis,
        min: f64,
        max: f64,
    },
}

/// How a [`BreakpointSet`] picks one rule for a size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchBy {
    /// Scan rules from last to first and return the first one containing the
    /// size, like css media queries where the last declared match wins.
    #[default]
    Order,
    /// Among the rules containing the size, the one covering the smallest
    /// area wins; the most specific rule is the narrowest one.
    BreakpointArea,
    /// The rule whose rectangle overlaps the size rectangle the most wins.
    /// Rules don't have to contain the size to be candidates.
    IntersectionArea,
}

bitflags! {
    /// Which axes a rule set constrains. A size change on an unconstrained
    /// axis can never move the selection, so watchers skip re-matching then.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    #[must_use]
    pub struct Sensitivity: u8 {
        const WIDTH = 1;
        const HEIGHT = 2;
    }
}

/// Identifies a selected rule within a set. `Fallback` is the synthetic
/// full-range rule owned by the set, never part of the supplied sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RuleIndex {
    Fallback,
    Rule(usize),
}

/// One breakpoint rule: a rectangular width/height range plus the data and
/// attributes handed to the consumer when the rule is selected.
///
/// Bounds are optional; an absent bound means the axis is unconstrained on
/// that side. Rules are built with chained setters:
///
/// ```
/// use size_watcher::Breakpoint;
///
/// let narrow: Breakpoint<&str> = Breakpoint::new()
///     .max_width(400.0)
///     .with_attr("layout", "stacked")
///     .with_data("narrow");
/// ```
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Breakpoint<T> {
    pub(crate) min_width: Option<f64>,
    pub(crate) max_width: Option<f64>,
    pub(crate) min_height: Option<f64>,
    pub(crate) max_height: Option<f64>,
    data: Option<T>,
    attrs: FxHashMap<String, String>,
}

impl<T> Breakpoint<T> {
    /// An unconstrained rule with no data and no attributes.
    pub fn new() -> Self {
        Breakpoint {
            min_width: None,
            max_width: None,
            min_height: None,
            max_height: None,
            data: None,
            attrs: FxHashMap::default(),
        }
    }

    pub fn min_width(mut self, px: f64) -> Self {
        self.min_width = Some(px);
        self
    }

    pub fn max_width(mut self, px: f64) -> Self {
        self.max_width = Some(px);
        self
    }

    pub fn min_height(mut self, px: f64) -> Self {
        self.min_height = Some(px);
        self
    }

    pub fn max_height(mut self, px: f64) -> Self {
        self.max_height = Some(px);
        self
    }

    /// Attach payload data that the render layer receives on selection.
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    /// Add a key/value attribute to merge into the rendered container.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn attrs(&self) -> &FxHashMap<String, String> {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    fn min_w(&self) -> f64 {
        self.min_width.unwrap_or(0.0)
    }

    fn max_w(&self) -> f64 {
        self.max_width.unwrap_or(f64::INFINITY)
    }

    fn min_h(&self) -> f64 {
        self.min_height.unwrap_or(0.0)
    }

    fn max_h(&self) -> f64 {
        self.max_height.unwrap_or(f64::INFINITY)
    }

    fn validate(&self, index: usize) -> Result<(), BreakpointError> {
        let axes = [
            (Axis::Width, self.min_width, self.max_width),
            (Axis::Height, self.min_height, self.max_height),
        ];
        for (axis, min, max) in axes {
            for value in [min, max].into_iter().flatten() {
                if !value.is_finite() || value < 0.0 {
                    return Err(BreakpointError::InvalidBound { index, axis, value });
                }
            }
            if let (Some(min), Some(max)) = (min, max)
                && min > max
            {
                return Err(BreakpointError::InvertedRange {
                    index,
                    axis,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// An ordered, validated set of breakpoint rules bound to one matching
/// strategy.
///
/// Validation happens here, once, when the set is built; matching never
/// fails. The set also derives which axes the rules constrain so watchers
/// can skip re-matching when only an unconstrained axis changed.
#[derive(Clone, Debug)]
pub struct BreakpointSet<T> {
    rules: Vec<Breakpoint<T>>,
    match_by: MatchBy,
    sensitivity: Sensitivity,
    fallback: Breakpoint<T>,
}

impl<T> BreakpointSet<T> {
    /// Validate `rules` and bind them to `match_by`.
    ///
    /// Every present bound must be a finite non-negative number, and where
    /// both ends of an axis are present, `min` must not exceed `max`.
    pub fn new(rules: Vec<Breakpoint<T>>, match_by: MatchBy) -> Result<Self, BreakpointError> {
        let mut sensitivity = Sensitivity::empty();
        for (index, rule) in rules.iter().enumerate() {
            rule.validate(index)?;
            if rule.min_w() > 0.0 || rule.max_w().is_finite() {
                sensitivity |= Sensitivity::WIDTH;
            }
            if rule.min_h() > 0.0 || rule.max_h().is_finite() {
                sensitivity |= Sensitivity::HEIGHT;
            }
        }
        Ok(BreakpointSet {
            rules,
            match_by,
            sensitivity,
            fallback: Breakpoint::new(),
        })
    }

    pub fn match_by(&self) -> MatchBy {
        self.match_by
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn rules(&self) -> &[Breakpoint<T>] {
        &self.rules
    }

    /// The synthetic full-range rule returned when nothing matches.
    pub fn fallback(&self) -> &Breakpoint<T> {
        &self.fallback
    }

    /// Select the rule for `size`. `None` means the container has not been
    /// measured yet; each strategy substitutes its own unmeasured defaults.
    ///
    /// Pure and referentially stable: identical inputs return the same rule
    /// reference every time.
    pub fn select(&self, size: Option<Size>) -> &Breakpoint<T> {
        self.rule(self.select_index(size))
    }

    pub(crate) fn rule(&self, index: RuleIndex) -> &Breakpoint<T> {
        match index {
            RuleIndex::Fallback => &self.fallback,
            RuleIndex::Rule(i) => &self.rules[i],
        }
    }

    pub(crate) fn select_index(&self, size: Option<Size>) -> RuleIndex {
        match self.match_by {
            MatchBy::Order => self.by_order(size),
            MatchBy::BreakpointArea => self.by_breakpoint_area(size),
            MatchBy::IntersectionArea => self.by_intersection_area(size),
        }
    }

    // Last rule containing the size wins. A missing size counts as infinite
    // on both axes, so only a rule unbounded above on both axes can match an
    // unmeasured container.
    fn by_order(&self, size: Option<Size>) -> RuleIndex {
        let (width, height) = match size {
            Some(size) => (size.width, size.height),
            None => (f64::INFINITY, f64::INFINITY),
        };
        for (i, rule) in self.rules.iter().enumerate().rev() {
            if width >= rule.min_w()
                && width <= rule.max_w()
                && height >= rule.min_h()
                && height <= rule.max_h()
            {
                return RuleIndex::Rule(i);
            }
        }
        RuleIndex::Fallback
    }

    // Smallest containing rule wins; ties go to the later rule.
    fn by_breakpoint_area(&self, size: Option<Size>) -> RuleIndex {
        let (width, height) = match size {
            Some(size) => (size.width, size.height),
            None => (UNBOUNDED, UNBOUNDED),
        };
        let mut best = RuleIndex::Fallback;
        let mut best_area = f64::INFINITY;
        for (i, rule) in self.rules.iter().enumerate() {
            let max_w = rule.max_width.unwrap_or(UNBOUNDED);
            let max_h = rule.max_height.unwrap_or(UNBOUNDED);
            let (min_w, min_h) = (rule.min_w(), rule.min_h());
            if width >= min_w && width <= max_w && height >= min_h && height <= max_h {
                let area = (max_w - min_w) * (max_h - min_h);
                if area <= best_area {
                    best_area = area;
                    best = RuleIndex::Rule(i);
                }
            }
        }
        best
    }

    // Largest rule/size overlap wins; ties go to the later rule. The
    // fallback seeds the scan with area zero, so any rule ties with it and
    // takes precedence, even with no overlap at all.
    fn by_intersection_area(&self, size: Option<Size>) -> RuleIndex {
        let (width, height) = match size {
            Some(size) => (size.width, size.height),
            None => (UNBOUNDED, UNBOUNDED),
        };
        let mut best = RuleIndex::Fallback;
        let mut best_area = 0.0;
        for (i, rule) in self.rules.iter().enumerate() {
            let max_w = rule.max_width.unwrap_or(UNBOUNDED);
            let max_h = rule.max_height.unwrap_or(UNBOUNDED);
            let overlap_w = (max_w.min(width) - rule.min_w()).max(0.0);
            let overlap_h = (max_h.min(height) - rule.min_h()).max(0.0);
            let area = overlap_w * overlap_h;
            if area >= best_area {
                best_area = area;
                best = RuleIndex::Rule(i);
            }
        }
        best
    }
}
