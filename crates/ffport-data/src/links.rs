//! Resolution of companies to fundamentals records through link spans.

use crate::ids::{CompanyId, FundamentalsId};
use crate::panel::{LinkPrimary, LinkSpan, LinkType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Which links are eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Accepted link types
    pub allowed_types: Vec<LinkType>,
    /// Accepted primary markers
    pub allowed_primaries: Vec<LinkPrimary>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            allowed_types: vec![LinkType::Lu, LinkType::Lc],
            allowed_primaries: vec![LinkPrimary::Primary, LinkPrimary::CrspPrimary],
        }
    }
}

/// Outcome of resolving one company at one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMatch<'a> {
    /// Chosen fundamentals record
    pub fundamentals_id: &'a FundamentalsId,
    /// Number of active links the choice was made from
    pub candidates: usize,
}

impl LinkMatch<'_> {
    /// More than one link was active, so a tie-break was applied.
    pub const fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

/// Index of eligible link spans by company.
///
/// When several spans are active at the same date the preferred one is the
/// first by primary marker (P, then C), link type (LC, then LU), latest
/// start date, and lowest fundamentals identifier.
#[derive(Debug, Clone, Default)]
pub struct LinkResolver {
    by_company: HashMap<CompanyId, Vec<LinkSpan>>,
}

impl LinkResolver {
    /// Build the index, dropping ineligible spans.
    pub fn new(links: &[LinkSpan], config: &LinkConfig) -> Self {
        let mut by_company: HashMap<CompanyId, Vec<LinkSpan>> = HashMap::new();
        let mut dropped = 0usize;
        for link in links {
            if config.allowed_types.contains(&link.link_type)
                && config.allowed_primaries.contains(&link.primary)
            {
                by_company.entry(link.company_id).or_default().push(link.clone());
            } else {
                dropped += 1;
            }
        }
        for spans in by_company.values_mut() {
            spans.sort_by(|a, b| {
                a.primary
                    .rank()
                    .cmp(&b.primary.rank())
                    .then(a.link_type.rank().cmp(&b.link_type.rank()))
                    .then(b.link_start.cmp(&a.link_start))
                    .then(a.fundamentals_id.cmp(&b.fundamentals_id))
            });
        }
        debug!(
            companies = by_company.len(),
            dropped, "Built link index"
        );
        Self { by_company }
    }

    /// Fundamentals record linked to `company` on `date`, if any.
    pub fn resolve(&self, company: CompanyId, date: NaiveDate) -> Option<LinkMatch<'_>> {
        let spans = self.by_company.get(&company)?;
        let mut active = spans.iter().filter(|s| s.is_active(date));
        let best = active.next()?;
        Some(LinkMatch {
            fundamentals_id: &best.fundamentals_id,
            candidates: 1 + active.count(),
        })
    }

    /// Number of companies with at least one eligible link.
    pub fn len(&self) -> usize {
        self.by_company.len()
    }

    /// Whether no eligible link exists.
    pub fn is_empty(&self) -> bool {
        self.by_company.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn span(
        id: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        link_type: LinkType,
        primary: LinkPrimary,
    ) -> LinkSpan {
        LinkSpan {
            fundamentals_id: FundamentalsId::from(id),
            company_id: CompanyId(1),
            link_start: start,
            link_end: end,
            link_type,
            primary,
        }
    }

    #[test]
    fn test_single_active_link() {
        let links = vec![span(
            "001000",
            d(1990, 1, 1),
            Some(d(1999, 12, 31)),
            LinkType::Lc,
            LinkPrimary::Primary,
        )];
        let resolver = LinkResolver::new(&links, &LinkConfig::default());
        let found = resolver.resolve(CompanyId(1), d(1995, 6, 30)).unwrap();
        assert_eq!(found.fundamentals_id.0, "001000");
        assert!(!found.is_ambiguous());
        assert!(resolver.resolve(CompanyId(1), d(2000, 6, 30)).is_none());
        assert!(resolver.resolve(CompanyId(2), d(1995, 6, 30)).is_none());
    }

    #[test]
    fn test_ineligible_links_are_dropped() {
        let links = vec![span("001000", d(1990, 1, 1), None, LinkType::Ls, LinkPrimary::Primary)];
        let resolver = LinkResolver::new(&links, &LinkConfig::default());
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_overlap_prefers_primary_then_type_then_latest_start() {
        let links = vec![
            span("000003", d(1990, 1, 1), None, LinkType::Lc, LinkPrimary::CrspPrimary),
            span("000002", d(1990, 1, 1), None, LinkType::Lu, LinkPrimary::Primary),
            span("000001", d(1985, 1, 1), None, LinkType::Lc, LinkPrimary::Primary),
            span("000004", d(1992, 1, 1), None, LinkType::Lc, LinkPrimary::Primary),
        ];
        let resolver = LinkResolver::new(&links, &LinkConfig::default());

        let found = resolver.resolve(CompanyId(1), d(1995, 6, 30)).unwrap();
        assert_eq!(found.fundamentals_id.0, "000004");
        assert_eq!(found.candidates, 4);
        assert!(found.is_ambiguous());

        let earlier = resolver.resolve(CompanyId(1), d(1991, 6, 30)).unwrap();
        assert_eq!(earlier.fundamentals_id.0, "000001");
    }
}
