//! Waterway geometry and the river-proximity risk prior.
//!
//! Risk formula: `river_risk = type_weight × exp(−distance_m / 200)`
//!
//! - at the riverbank (0 m): risk = type_weight (1.0 for rivers)
//! - at 200 m: ≈ 0.37 × type_weight
//! - at 600 m: ≈ 0.05 × type_weight

use masfro_core::GeoPoint;

/// Exponential decay distance of waterway influence, metres.
pub const RIVER_DECAY_M: f32 = 200.0;

/// OSM waterway classification, ordered by flood influence.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WaterwayKind {
    River,
    TidalChannel,
    Stream,
    Canal,
    Drain,
    Ditch,
}

impl WaterwayKind {
    /// Risk weight at zero distance.
    #[inline]
    pub fn weight(self) -> f32 {
        match self {
            WaterwayKind::River | WaterwayKind::TidalChannel => 1.0,
            WaterwayKind::Stream                             => 0.7,
            WaterwayKind::Canal | WaterwayKind::Drain        => 0.4,
            WaterwayKind::Ditch                              => 0.3,
        }
    }

    /// Parse an OSM `waterway=*` tag value.
    pub fn parse(tag: &str) -> Option<WaterwayKind> {
        match tag {
            "river"         => Some(WaterwayKind::River),
            "tidal_channel" => Some(WaterwayKind::TidalChannel),
            "stream"        => Some(WaterwayKind::Stream),
            "canal"         => Some(WaterwayKind::Canal),
            "drain"         => Some(WaterwayKind::Drain),
            "ditch"         => Some(WaterwayKind::Ditch),
            _               => None,
        }
    }
}

/// One waterway centreline as an ordered polyline.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waterway {
    pub kind: WaterwayKind,
    pub points: Vec<GeoPoint>,
}

impl Waterway {
    pub fn new(kind: WaterwayKind, points: Vec<GeoPoint>) -> Self {
        Self { kind, points }
    }
}

/// The decayed proximity prior for a point `distance_m` from a waterway of
/// the given kind.
#[inline]
pub(crate) fn proximity_risk(kind: WaterwayKind, distance_m: f32) -> f32 {
    kind.weight() * (-distance_m / RIVER_DECAY_M).exp()
}
