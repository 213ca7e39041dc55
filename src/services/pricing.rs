//! Distance-based delivery pricing.
//!
//! The single authority for delivery fees: everything that shows or charges a
//! delivery cost goes through [`assess`] with a tariff snapshot taken from the
//! service settings row.

use rust_decimal::Decimal;

use crate::entities::service_settings;
use crate::models::order::GeoPoint;

/// Mean Earth radius used by the haversine formula
const EARTH_RADIUS_KM: f64 = 6371.0;

/// The base fee covers this many kilometres
const INCLUDED_KM: f64 = 1.0;

/// Snapshot of the delivery-related settings
#[derive(Debug, Clone)]
pub struct DeliveryTariff {
    pub base_cost: Decimal,
    pub cost_per_extra_km: Decimal,
    pub max_radius_km: f64,
}

impl DeliveryTariff {
    pub fn from_settings(settings: &service_settings::Model) -> DeliveryTariff {
        DeliveryTariff {
            base_cost: settings.delivery_base_cost,
            cost_per_extra_km: settings.delivery_cost_per_km,
            max_radius_km: settings.max_delivery_radius_km,
        }
    }
}

/// Outcome of pricing a shared location
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryQuote {
    Feasible { distance_km: f64, cost: Decimal },
    OutOfRange { distance_km: f64, max_radius_km: f64 },
}

impl DeliveryQuote {
    pub fn is_feasible(&self) -> bool {
        matches!(self, DeliveryQuote::Feasible { .. })
    }
}

/// Great-circle distance between two points, in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Fee for a given distance: the base fee within the included kilometre, then
/// the per-km rate for every started kilometre beyond it
pub fn delivery_cost(tariff: &DeliveryTariff, distance_km: f64) -> Decimal {
    if distance_km <= INCLUDED_KM {
        return tariff.base_cost;
    }
    let extra_blocks = (distance_km - INCLUDED_KM).ceil() as i64;
    tariff.base_cost + tariff.cost_per_extra_km * Decimal::from(extra_blocks)
}

/// Classify a known distance against the tariff. The radius boundary itself
/// is deliverable; only strictly beyond it is refused.
pub fn quote_at_distance(tariff: &DeliveryTariff, distance_km: f64) -> DeliveryQuote {
    if distance_km > tariff.max_radius_km {
        DeliveryQuote::OutOfRange {
            distance_km,
            max_radius_km: tariff.max_radius_km,
        }
    } else {
        DeliveryQuote::Feasible {
            distance_km,
            cost: delivery_cost(tariff, distance_km),
        }
    }
}

/// Price a customer location against the store location
pub fn assess(tariff: &DeliveryTariff, store: GeoPoint, customer: GeoPoint) -> DeliveryQuote {
    quote_at_distance(tariff, haversine_km(store, customer))
}
