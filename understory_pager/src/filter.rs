// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Combinable query predicates.
//!
//! The pager treats filters as opaque values it can AND together. It only
//! looks inside for two things: whether a filter selects features by id (such
//! filters cannot be combined with a bounding box upstream, so spatial
//! subdivision is skipped), and which bounding box a filter already carries
//! (to shrink the root page).

use std::fmt;
use std::sync::Arc;

use kurbo::Point;
use understory_page_tree::Extent;

/// Read access to a feature, for evaluating a [`Filter`] in process.
pub trait FeatureRef {
    /// Feature id.
    fn id(&self) -> &str;
    /// Representative position of the feature geometry.
    fn position(&self) -> Point;
    /// Value of a property, if the feature has it.
    fn property(&self, name: &str) -> Option<&str>;
}

/// A query predicate.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Filter {
    /// Matches every feature.
    #[default]
    All,
    /// Property equality.
    Equals {
        /// Property name.
        property: Arc<str>,
        /// Expected value.
        value: Arc<str>,
    },
    /// Matches the features with these ids.
    FeatureId(Vec<Arc<str>>),
    /// Matches features inside the extent (edges inclusive).
    BBox(Extent),
    /// Logical AND of all parts.
    And(Vec<Filter>),
}

impl Filter {
    /// Property equality filter.
    pub fn equals(property: impl Into<Arc<str>>, value: impl Into<Arc<str>>) -> Self {
        Self::Equals {
            property: property.into(),
            value: value.into(),
        }
    }

    /// Feature-id filter.
    pub fn feature_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self::FeatureId(ids.into_iter().map(Into::into).collect())
    }

    /// Logical AND, flattening nested conjunctions. [`Filter::All`] is the identity.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::All, f) | (f, Self::All) => f,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), f) => {
                a.push(f);
                Self::And(a)
            }
            (f, Self::And(b)) => {
                let mut parts = Vec::with_capacity(b.len() + 1);
                parts.push(f);
                parts.extend(b);
                Self::And(parts)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Whether this filter selects features purely by id.
    pub fn is_feature_id(&self) -> bool {
        matches!(self, Self::FeatureId(_))
    }

    /// The bounding box this filter already constrains results to.
    ///
    /// Looks at top-level bbox predicates only. Several are intersected;
    /// disjoint ones keep the first, since the filter then matches nothing
    /// anyway.
    pub fn bbox(&self) -> Option<Extent> {
        match self {
            Self::BBox(e) => Some(*e),
            Self::And(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    Self::BBox(e) => Some(*e),
                    _ => None,
                })
                .reduce(|a, b| a.intersect(&b).unwrap_or(a)),
            _ => None,
        }
    }

    /// Evaluate the filter against one feature.
    pub fn matches<F: FeatureRef + ?Sized>(&self, feature: &F) -> bool {
        match self {
            Self::All => true,
            Self::Equals { property, value } => {
                feature.property(property) == Some(&**value)
            }
            Self::FeatureId(ids) => ids.iter().any(|id| &**id == feature.id()),
            Self::BBox(e) => e.contains(feature.position()),
            Self::And(parts) => parts.iter().all(|p| p.matches(feature)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("INCLUDE"),
            Self::Equals { property, value } => write!(f, "{property} = '{value}'"),
            Self::FeatureId(ids) => {
                f.write_str("IN (")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{id}'")?;
                }
                f.write_str(")")
            }
            Self::BBox(e) => write!(
                f,
                "BBOX({}, {}, {}, {})",
                e.min_x, e.min_y, e.max_x, e.max_y
            ),
            Self::And(parts) => {
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    if matches!(p, Self::And(_)) {
                        write!(f, "({p})")?;
                    } else {
                        write!(f, "{p}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_flattens_and_drops_identity() {
        let a = Filter::equals("kind", "tree");
        let b = Filter::BBox(Extent::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(Filter::All.and(a.clone()), a);
        assert_eq!(a.clone().and(Filter::All), a);
        let ab = a.clone().and(b.clone());
        assert_eq!(ab, Filter::And(vec![a.clone(), b.clone()]));
        let c = Filter::equals("height", "10");
        assert_eq!(
            ab.clone().and(c.clone()),
            Filter::And(vec![a.clone(), b.clone(), c.clone()])
        );
        assert_eq!(
            c.clone().and(ab),
            Filter::And(vec![c, a, b]),
            "prepending keeps the conjunction flat"
        );
    }

    #[test]
    fn bbox_intersects_top_level_boxes() {
        let f = Filter::equals("kind", "tree")
            .and(Filter::BBox(Extent::new(0.0, 0.0, 10.0, 10.0)))
            .and(Filter::BBox(Extent::new(5.0, -5.0, 20.0, 8.0)));
        assert_eq!(f.bbox(), Some(Extent::new(5.0, 0.0, 10.0, 8.0)));
        assert_eq!(Filter::equals("kind", "tree").bbox(), None);
        assert_eq!(Filter::All.bbox(), None);
    }

    #[test]
    fn only_pure_id_filters_bypass() {
        assert!(Filter::feature_ids(["a", "b"]).is_feature_id());
        let mixed = Filter::feature_ids(["a"]).and(Filter::equals("kind", "tree"));
        assert!(!mixed.is_feature_id());
    }

    struct Tree {
        id: &'static str,
        at: Point,
        kind: &'static str,
    }

    impl FeatureRef for Tree {
        fn id(&self) -> &str {
            self.id
        }

        fn position(&self) -> Point {
            self.at
        }

        fn property(&self, name: &str) -> Option<&str> {
            (name == "kind").then_some(self.kind)
        }
    }

    #[test]
    fn matches_evaluates_every_part() {
        let oak = Tree {
            id: "oak",
            at: Point::new(5.0, 5.0),
            kind: "tree",
        };
        let f = Filter::equals("kind", "tree").and(Filter::BBox(Extent::new(0.0, 0.0, 5.0, 5.0)));
        assert!(f.matches(&oak), "bbox edges are inclusive");
        assert!(!f.clone().and(Filter::BBox(Extent::new(6.0, 6.0, 9.0, 9.0))).matches(&oak));
        assert!(Filter::feature_ids(["elm", "oak"]).matches(&oak));
        assert!(!Filter::equals("height", "3").matches(&oak));
        assert!(Filter::All.matches(&oak));
    }

    #[test]
    fn display_is_cql_like() {
        let f = Filter::equals("kind", "tree").and(Filter::BBox(Extent::new(0.0, 0.0, 5.0, 5.0)));
        assert_eq!(f.to_string(), "kind = 'tree' AND BBOX(0, 0, 5, 5)");
        assert_eq!(Filter::feature_ids(["a", "b"]).to_string(), "IN ('a', 'b')");
        assert_eq!(Filter::default().to_string(), "INCLUDE");
    }
}
