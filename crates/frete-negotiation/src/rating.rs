//! # Carrier Ratings
//!
//! After delivery the shipper rates the carrier whose proposal was
//! accepted. One rating per cargo. Averages feed proposal ranking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use frete_core::{CargoId, CarrierId, ShipperId, Timestamp};

use crate::cargo::{Cargo, CargoStatus};
use crate::ranking::CarrierRatings;

/// Upper bound on rating comments.
pub const MAX_COMMENT_LEN: usize = 1000;

/// Errors raised when recording a rating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// Score outside 1..=5.
    #[error("score must be between 1 and 5, got {0}")]
    InvalidScore(u8),

    /// Only delivered cargos can be rated.
    #[error("{cargo_id} is {status}; only delivered cargos can be rated")]
    NotDelivered {
        cargo_id: CargoId,
        status: CargoStatus,
    },

    /// Delivered cargo without an accepted proposal (corrupt aggregate).
    #[error("{0} has no contracted carrier")]
    NoContractedCarrier(CargoId),

    /// The cargo was already rated.
    #[error("{0} has already been rated")]
    AlreadyRated(CargoId),

    /// Comment too long.
    #[error("comment must not exceed {MAX_COMMENT_LEN} characters")]
    CommentTooLong,
}

/// A score from 1 to 5 stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    /// Validate a star count.
    pub fn new(stars: u8) -> Result<Self, RatingError> {
        if (1..=5).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(RatingError::InvalidScore(stars))
        }
    }

    /// The star count.
    pub fn stars(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

/// A shipper's rating of the carrier that delivered a cargo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierRating {
    pub cargo_id: CargoId,
    pub carrier_id: CarrierId,
    pub shipper_id: ShipperId,
    pub score: Score,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: Timestamp,
}

/// Aggregate view of a carrier's ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub carrier_id: CarrierId,
    pub count: usize,
    /// `None` when the carrier has no ratings.
    pub average: Option<f64>,
}

/// Build a rating for a delivered cargo's contracted carrier.
pub fn rate_delivery(
    cargo: &Cargo,
    score: Score,
    comment: Option<String>,
    now: Timestamp,
) -> Result<CarrierRating, RatingError> {
    if cargo.status != CargoStatus::Delivered {
        return Err(RatingError::NotDelivered {
            cargo_id: cargo.id,
            status: cargo.status,
        });
    }
    let winner = cargo
        .accepted_proposal()
        .ok_or(RatingError::NoContractedCarrier(cargo.id))?;
    let comment = comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if comment
        .as_ref()
        .is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN)
    {
        return Err(RatingError::CommentTooLong);
    }
    Ok(CarrierRating {
        cargo_id: cargo.id,
        carrier_id: winner.carrier_id,
        shipper_id: cargo.shipper_id,
        score,
        comment,
        created_at: now,
    })
}

/// All ratings, keyed by cargo.
#[derive(Debug, Clone, Default)]
pub struct RatingBook {
    by_cargo: HashMap<CargoId, CarrierRating>,
}

impl RatingBook {
    /// An empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a rating. Each cargo can be rated once.
    pub fn record(&mut self, rating: CarrierRating) -> Result<(), RatingError> {
        if self.by_cargo.contains_key(&rating.cargo_id) {
            return Err(RatingError::AlreadyRated(rating.cargo_id));
        }
        self.by_cargo.insert(rating.cargo_id, rating);
        Ok(())
    }

    /// The rating given for `cargo_id`, if any.
    pub fn for_cargo(&self, cargo_id: &CargoId) -> Option<&CarrierRating> {
        self.by_cargo.get(cargo_id)
    }

    /// Ratings received by `carrier_id`, oldest first.
    pub fn for_carrier(&self, carrier_id: &CarrierId) -> Vec<&CarrierRating> {
        let mut ratings: Vec<&CarrierRating> = self
            .by_cargo
            .values()
            .filter(|r| &r.carrier_id == carrier_id)
            .collect();
        ratings.sort_by_key(|r| r.created_at);
        ratings
    }

    /// Mean score of `carrier_id`.
    pub fn average(&self, carrier_id: &CarrierId) -> Option<f64> {
        let (sum, count) = self
            .by_cargo
            .values()
            .filter(|r| &r.carrier_id == carrier_id)
            .fold((0u64, 0u64), |(sum, count), r| {
                (sum + u64::from(r.score.stars()), count + 1)
            });
        (count > 0).then(|| sum as f64 / count as f64)
    }

    /// Count and average for `carrier_id`.
    pub fn summary(&self, carrier_id: &CarrierId) -> RatingSummary {
        RatingSummary {
            carrier_id: *carrier_id,
            count: self.for_carrier(carrier_id).len(),
            average: self.average(carrier_id),
        }
    }

    /// Number of stored ratings.
    pub fn len(&self) -> usize {
        self.by_cargo.len()
    }

    /// Whether no rating is stored.
    pub fn is_empty(&self) -> bool {
        self.by_cargo.is_empty()
    }
}

impl CarrierRatings for RatingBook {
    fn rating_of(&self, carrier: &CarrierId) -> Option<f64> {
        self.average(carrier)
    }
}
