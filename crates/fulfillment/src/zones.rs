//! Delivery zone matching.
//!
//! Decides whether the last-mile option is offered for an address by
//! fuzzy-matching customer-entered neighborhood/city text against the
//! configured zones. Pure functions, no I/O; no match simply means the
//! option is hidden, never an error.

use jabuticaba_core::text::normalize;

use crate::models::DeliveryZone;

/// Return the active zones covering the given neighborhood/city, in the
/// order the zones were supplied. The first match is the pre-selected
/// default at checkout.
///
/// A configured neighborhood matches when, after normalization, it equals
/// the customer's neighborhood or city, or one contains the other.
/// Malformed input normalizes to the empty string and matches nothing.
#[must_use]
pub fn match_zones<'a>(
    neighborhood: &str,
    city: &str,
    zones: &'a [DeliveryZone],
) -> Vec<&'a DeliveryZone> {
    let neighborhood = normalize(neighborhood);
    let city = normalize(city);

    zones
        .iter()
        .filter(|zone| zone.is_active)
        .filter(|zone| {
            zone.neighborhoods
                .iter()
                .any(|configured| matches_text(&normalize(configured), &neighborhood, &city))
        })
        .collect()
}

/// Whether a normalized configured neighborhood covers either side of the
/// customer input.
fn matches_text(configured: &str, neighborhood: &str, city: &str) -> bool {
    if configured.is_empty() {
        return false;
    }
    contains_either(configured, neighborhood) || contains_either(configured, city)
}

fn contains_either(configured: &str, entered: &str) -> bool {
    if entered.is_empty() {
        return false;
    }
    configured == entered || configured.contains(entered) || entered.contains(configured)
}
