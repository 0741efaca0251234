//! Delivery rate engine for the SingPost carrier.
//!
//! Pure functions over weights (kg) and dimensions (mm). All bracket
//! comparisons are inclusive: a parcel exactly on a threshold takes that
//! threshold's price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery type that is priced by this engine rather than a flat fee.
pub const SINGPOST: &str = "singpost";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone { Domestic, ZoneA, ZoneB, ZoneC, ZoneD }

impl Zone {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::ZoneA => "zone_a",
            Self::ZoneB => "zone_b",
            Self::ZoneC => "zone_c",
            Self::ZoneD => "zone_d",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

const ZONE_B_COUNTRIES: &[&str] = &[
    "bangladesh", "bhutan", "brunei", "cambodia", "china", "hong kong", "india", "indonesia", "japan",
    "south korea", "korea", "laos", "macau", "maldives", "myanmar", "nepal", "pakistan", "philippines",
    "sri lanka", "taiwan", "thailand", "timor-leste", "vietnam",
];

const ZONE_C_COUNTRIES: &[&str] = &[
    "australia", "new zealand", "austria", "belgium", "denmark", "finland", "france", "germany", "greece",
    "ireland", "italy", "luxembourg", "netherlands", "norway", "poland", "portugal", "spain", "sweden",
    "switzerland", "united kingdom", "uk", "united states", "usa", "canada",
];

/// Classifies a destination country. Unknown or missing input is `ZoneD`.
pub fn zone_of(country: Option<&str>) -> Zone {
    let country = country.unwrap_or_default().trim().to_lowercase();
    match country.as_str() {
        "singapore" => Zone::Domestic,
        "malaysia" => Zone::ZoneA,
        c if ZONE_B_COUNTRIES.contains(&c) => Zone::ZoneB,
        c if ZONE_C_COUNTRIES.contains(&c) => Zone::ZoneC,
        _ => Zone::ZoneD,
    }
}

/// Result of a rate lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "price", rename_all = "snake_case")]
pub enum RateQuote { Available(Decimal), Unavailable }

impl RateQuote {
    pub fn price(self) -> Option<Decimal> {
        match self { Self::Available(p) => Some(p), Self::Unavailable => None }
    }
    /// Contribution to a fee: an unavailable rate adds nothing.
    pub fn or_zero(self) -> Decimal { self.price().unwrap_or(Decimal::ZERO) }
}

// (max weight kg, price in cents)
type Brackets = [(f64, i64); 4];

const SMALL_PACKET_MM: [f64; 3] = [324.0, 229.0, 65.0];
const PARCEL_MM: [f64; 3] = [600.0, 400.0, 300.0];
const SMALL_PACKET_MAX_KG: f64 = 2.0;
const PARCEL_MAX_KG: f64 = 30.0;
const OVERSIZE_SUM_MM: f64 = 3000.0;
const OVERSIZE_SIDE_MM: f64 = 1500.0;
const DOMESTIC_SMALL_PACKET: i64 = 300;
const DOMESTIC_PARCEL: i64 = 600;
const DOMESTIC_OVERSIZE: i64 = 1200;

fn standard_brackets(zone: Zone) -> Option<&'static Brackets> {
    const A: Brackets = [(0.25, 350), (0.5, 570), (1.0, 1000), (2.0, 1750)];
    const B: Brackets = [(0.25, 450), (0.5, 790), (1.0, 1450), (2.0, 2600)];
    const C: Brackets = [(0.25, 550), (0.5, 1000), (1.0, 1850), (2.0, 3400)];
    const D: Brackets = [(0.25, 650), (0.5, 1250), (1.0, 2400), (2.0, 4500)];
    match zone {
        Zone::ZoneA => Some(&A),
        Zone::ZoneB => Some(&B),
        Zone::ZoneC => Some(&C),
        Zone::ZoneD => Some(&D),
        Zone::Domestic => None,
    }
}

fn expedited_brackets(zone: Zone) -> Option<&'static Brackets> {
    const A: Brackets = [(2.0, 2000), (5.0, 3200), (10.0, 4800), (20.0, 8000)];
    const B: Brackets = [(2.0, 2600), (5.0, 4200), (10.0, 6400), (20.0, 11000)];
    const C: Brackets = [(2.0, 3800), (5.0, 6200), (10.0, 9800), (20.0, 17000)];
    const D: Brackets = [(2.0, 4800), (5.0, 8000), (10.0, 13000), (20.0, 23000)];
    match zone {
        Zone::ZoneA => Some(&A),
        Zone::ZoneB => Some(&B),
        Zone::ZoneC => Some(&C),
        Zone::ZoneD => Some(&D),
        Zone::Domestic => None,
    }
}

fn lookup(brackets: &Brackets, weight_kg: f64) -> Option<Decimal> {
    brackets.iter().find(|(max, _)| weight_kg <= *max).map(|(_, cents)| Decimal::new(*cents, 2))
}

fn fits(dims_mm: &[f64; 3], envelope: &[f64; 3]) -> bool {
    dims_mm.iter().zip(envelope).all(|(d, max)| d <= max)
}

/// Shipping price for a package, or `Unavailable` if no bracket accepts it.
///
/// Domestic rules run first. Anything they reject falls through to the zone
/// tables, which hold no domestic entry, so oversized domestic parcels are
/// unavailable. For international zones the standard table is tried before
/// the expedited one.
pub fn rate(zone: Zone, weight_kg: f64, dims_mm: [f64; 3], prefer_expedited: bool) -> RateQuote {
    if zone == Zone::Domestic {
        if weight_kg <= SMALL_PACKET_MAX_KG && fits(&dims_mm, &SMALL_PACKET_MM) {
            return RateQuote::Available(Decimal::new(DOMESTIC_SMALL_PACKET, 2));
        }
        if prefer_expedited && weight_kg <= PARCEL_MAX_KG {
            if fits(&dims_mm, &PARCEL_MM) {
                return RateQuote::Available(Decimal::new(DOMESTIC_PARCEL, 2));
            }
            let sum: f64 = dims_mm.iter().sum();
            let longest = dims_mm.iter().copied().fold(0.0_f64, f64::max);
            if sum <= OVERSIZE_SUM_MM && longest <= OVERSIZE_SIDE_MM {
                return RateQuote::Available(Decimal::new(DOMESTIC_OVERSIZE, 2));
            }
        }
    }

    if let Some(price) = standard_brackets(zone).and_then(|b| lookup(b, weight_kg)) {
        return RateQuote::Available(price);
    }
    if prefer_expedited {
        if let Some(price) = expedited_brackets(zone).and_then(|b| lookup(b, weight_kg)) {
            return RateQuote::Available(price);
        }
    }
    RateQuote::Unavailable
}
