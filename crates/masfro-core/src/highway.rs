//! Road classification.

use std::fmt;

/// OSM-style highway class of a road segment.
///
/// Carries the two per-class tables the core needs: the imputed base speed
/// used when the graph file lacks one, and the infrastructure flood
/// vulnerability used by the risk model.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HighwayClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Unclassified,
    Service,
}

impl HighwayClass {
    /// Imputed free-flow speed in km/h.
    #[inline]
    pub fn base_speed_kmh(self) -> f32 {
        match self {
            HighwayClass::Motorway     => 80.0,
            HighwayClass::Trunk        => 70.0,
            HighwayClass::Primary      => 50.0,
            HighwayClass::Secondary    => 40.0,
            HighwayClass::Tertiary     => 30.0,
            HighwayClass::Residential  => 25.0,
            HighwayClass::Unclassified => 20.0,
            HighwayClass::Service      => 15.0,
        }
    }

    /// Base flood vulnerability of the class — how readily the roadway fails
    /// under inundation.  Motorways drain well and sit high; service roads
    /// and unclassified streets flood first.
    #[inline]
    pub fn vulnerability(self) -> f32 {
        match self {
            HighwayClass::Motorway | HighwayClass::Trunk => 0.1,
            HighwayClass::Primary                        => 0.2,
            HighwayClass::Secondary                      => 0.3,
            HighwayClass::Tertiary                       => 0.4,
            HighwayClass::Residential                    => 0.5,
            HighwayClass::Unclassified                   => 0.6,
            HighwayClass::Service                        => 0.5,
        }
    }

    /// Parse an OSM `highway=*` tag value.  Link variants collapse onto their
    /// parent class; unknown values fall back to `Unclassified`.
    pub fn parse(tag: &str) -> HighwayClass {
        match tag {
            "motorway" | "motorway_link"       => HighwayClass::Motorway,
            "trunk" | "trunk_link"             => HighwayClass::Trunk,
            "primary" | "primary_link"         => HighwayClass::Primary,
            "secondary" | "secondary_link"     => HighwayClass::Secondary,
            "tertiary" | "tertiary_link"       => HighwayClass::Tertiary,
            "residential" | "living_street"    => HighwayClass::Residential,
            "service"                          => HighwayClass::Service,
            _                                  => HighwayClass::Unclassified,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HighwayClass::Motorway     => "motorway",
            HighwayClass::Trunk        => "trunk",
            HighwayClass::Primary      => "primary",
            HighwayClass::Secondary    => "secondary",
            HighwayClass::Tertiary     => "tertiary",
            HighwayClass::Residential  => "residential",
            HighwayClass::Unclassified => "unclassified",
            HighwayClass::Service      => "service",
        }
    }
}

impl fmt::Display for HighwayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
