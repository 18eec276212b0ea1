//! # Proposal Ranking (read side)
//!
//! Orders proposals for display. Nothing here affects which proposal can be
//! accepted. All sorts are stable, so ties keep submission order.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use frete_core::CarrierId;

use crate::proposal::Proposal;

/// Source of carrier ratings used by [`ProposalOrdering::RatingDescending`].
pub trait CarrierRatings {
    /// Average rating of `carrier`, or `None` if unrated.
    fn rating_of(&self, carrier: &CarrierId) -> Option<f64>;
}

impl CarrierRatings for HashMap<CarrierId, f64> {
    fn rating_of(&self, carrier: &CarrierId) -> Option<f64> {
        self.get(carrier).copied()
    }
}

/// Display order for a cargo's proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProposalOrdering {
    /// Cheapest first.
    #[serde(rename = "value")]
    ValueAscending,
    /// Best-rated carrier first; unrated carriers last.
    #[serde(rename = "rating")]
    RatingDescending,
    /// Most recent submission first.
    #[serde(rename = "newest")]
    NewestFirst,
    /// Submission order.
    #[default]
    #[serde(rename = "oldest")]
    OldestFirst,
}

impl ProposalOrdering {
    /// Parse the query-string name (`value`, `rating`, `newest`, `oldest`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "value" => Some(Self::ValueAscending),
            "rating" => Some(Self::RatingDescending),
            "newest" => Some(Self::NewestFirst),
            "oldest" => Some(Self::OldestFirst),
            _ => None,
        }
    }
}

/// Return `proposals` in the requested order.
pub fn rank_proposals<'a>(
    proposals: &'a [Proposal],
    ordering: ProposalOrdering,
    ratings: &impl CarrierRatings,
) -> Vec<&'a Proposal> {
    let mut ranked: Vec<&Proposal> = proposals.iter().collect();
    match ordering {
        ProposalOrdering::ValueAscending => ranked.sort_by_key(|p| p.value),
        ProposalOrdering::RatingDescending => ranked.sort_by(|a, b| {
            compare_ratings(
                ratings.rating_of(&b.carrier_id),
                ratings.rating_of(&a.carrier_id),
            )
        }),
        ProposalOrdering::NewestFirst => ranked.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        ProposalOrdering::OldestFirst => ranked.sort_by_key(|p| p.created_at),
    }
    ranked
}

/// The proposal with the lowest value; the earliest on ties.
pub fn best_value(proposals: &[Proposal]) -> Option<&Proposal> {
    proposals.iter().min_by_key(|p| p.value)
}

/// The proposal whose carrier has the highest rating; the earliest on ties.
/// Proposals from unrated carriers are never chosen.
pub fn best_rating<'a>(
    proposals: &'a [Proposal],
    ratings: &impl CarrierRatings,
) -> Option<&'a Proposal> {
    let mut best: Option<(&Proposal, f64)> = None;
    for proposal in proposals {
        let Some(rating) = ratings.rating_of(&proposal.carrier_id) else {
            continue;
        };
        match best {
            Some((_, current)) if rating <= current => {}
            _ => best = Some((proposal, rating)),
        }
    }
    best.map(|(p, _)| p)
}

/// `Some` sorts before `None`; ratings compare numerically.
fn compare_ratings(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cargo::{Cargo, CargoDetails};
    use crate::proposal::ProposalDraft;
    use frete_core::{Amount, CargoId, ShipperId, Timestamp};

    fn cargo_with(offers: &[(CarrierId, u64, i64)]) -> Cargo {
        let base = Timestamp::parse("2026-10-01T08:00:00Z").unwrap();
        let details = CargoDetails {
            title: "Móveis".to_string(),
            description: String::new(),
            origin: "Curitiba, PR".to_string(),
            destination: "Porto Alegre, RS".to_string(),
            weight_kg: 800,
            vehicle_type: "van".to_string(),
            offered_value: Amount::from_reais(1500).unwrap(),
            deadline: base.plus_days(7),
        };
        let mut cargo = Cargo::publish(CargoId::new(), ShipperId::new(), details, base).unwrap();
        for (carrier_id, value, day) in offers {
            let draft = ProposalDraft {
                carrier_id: *carrier_id,
                value: Amount::from_reais(*value).unwrap(),
                message: String::new(),
                estimated_delivery: None,
                vehicle: None,
            };
            cargo.submit_proposal(draft, base.plus_days(*day)).unwrap();
        }
        cargo
    }

    fn values(ranked: &[&Proposal]) -> Vec<u64> {
        ranked.iter().map(|p| p.value.cents() / 100).collect()
    }

    #[test]
    fn value_ascending_is_stable() {
        let (a, b, c) = (CarrierId::new(), CarrierId::new(), CarrierId::new());
        let cargo = cargo_with(&[(a, 1600, 0), (b, 1400, 1), (c, 1400, 2)]);
        let ranked =
            rank_proposals(&cargo.proposals, ProposalOrdering::ValueAscending, &HashMap::new());
        assert_eq!(values(&ranked), vec![1400, 1400, 1600]);
        assert_eq!(ranked[0].carrier_id, b);
        assert_eq!(ranked[1].carrier_id, c);
    }

    #[test]
    fn rating_descending_puts_unrated_last() {
        let (a, b, c) = (CarrierId::new(), CarrierId::new(), CarrierId::new());
        let cargo = cargo_with(&[(a, 1600, 0), (b, 1400, 1), (c, 1500, 2)]);
        let ratings = HashMap::from([(a, 3.5), (c, 4.8)]);
        let ranked = rank_proposals(&cargo.proposals, ProposalOrdering::RatingDescending, &ratings);
        let carriers: Vec<_> = ranked.iter().map(|p| p.carrier_id).collect();
        assert_eq!(carriers, vec![c, a, b]);
    }

    #[test]
    fn newest_and_oldest() {
        let (a, b) = (CarrierId::new(), CarrierId::new());
        let cargo = cargo_with(&[(a, 1600, 0), (b, 1400, 3)]);
        let newest =
            rank_proposals(&cargo.proposals, ProposalOrdering::NewestFirst, &HashMap::new());
        assert_eq!(newest[0].carrier_id, b);
        let oldest =
            rank_proposals(&cargo.proposals, ProposalOrdering::OldestFirst, &HashMap::new());
        assert_eq!(oldest[0].carrier_id, a);
    }

    #[test]
    fn best_value_picks_minimum_first_on_tie() {
        let (a, b, c) = (CarrierId::new(), CarrierId::new(), CarrierId::new());
        let cargo = cargo_with(&[(a, 1600, 0), (b, 1400, 1), (c, 1400, 2)]);
        assert_eq!(best_value(&cargo.proposals).unwrap().carrier_id, b);
        assert!(best_value(&[]).is_none());
    }

    #[test]
    fn best_rating_picks_maximum_first_on_tie() {
        let (a, b, c) = (CarrierId::new(), CarrierId::new(), CarrierId::new());
        let cargo = cargo_with(&[(a, 1600, 0), (b, 1400, 1), (c, 1500, 2)]);
        let ratings = HashMap::from([(a, 4.0), (b, 4.5), (c, 4.5)]);
        assert_eq!(best_rating(&cargo.proposals, &ratings).unwrap().carrier_id, b);
    }

    #[test]
    fn best_rating_none_when_nobody_rated() {
        let cargo = cargo_with(&[(CarrierId::new(), 1600, 0)]);
        assert!(best_rating(&cargo.proposals, &HashMap::new()).is_none());
    }

    #[test]
    fn ordering_names() {
        for (name, ordering) in [
            ("value", ProposalOrdering::ValueAscending),
            ("rating", ProposalOrdering::RatingDescending),
            ("newest", ProposalOrdering::NewestFirst),
            ("oldest", ProposalOrdering::OldestFirst),
        ] {
            assert_eq!(ProposalOrdering::from_name(name), Some(ordering));
            assert_eq!(
                serde_json::to_string(&ordering).unwrap(),
                format!("\"{name}\"")
            );
        }
        assert_eq!(ProposalOrdering::from_name("price"), None);
    }
}
