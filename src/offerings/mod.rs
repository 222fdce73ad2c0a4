//! Offering statistics
//!
//! Offerings (a professor teaching a subject over some years) are stored as
//! documents under their subject, each with a collection of rated comments.
//! This module counts the ratings per offering, derives the rates, and
//! ranks the offerings.

mod aggregate;
mod model;

pub use aggregate::{aggregate_offerings, OfferingsReport, SubjectKey};
pub use model::{
    compare_offerings, rank_offerings, Offering, OfferingStats, OfferingView, Rates,
};
