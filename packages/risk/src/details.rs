//! Human-readable risk description bands.
//!
//! Each hazard has eleven `[from, to)` bands covering 0-100. Percentages are
//! clamped into `[0, 99]` before lookup so that 100 lands in the last band.

use crate::Hazard;

/// A percentage range and the description shown for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskBand {
    /// Inclusive lower bound.
    pub from: f64,
    /// Exclusive upper bound.
    pub to: f64,
    /// Canned description for this band.
    pub description: &'static str,
}

const fn band(from: f64, to: f64, description: &'static str) -> RiskBand {
    RiskBand {
        from,
        to,
        description,
    }
}

/// Flood description bands.
pub const FLOOD_BANDS: [RiskBand; 11] = [
    band(0.0, 5.0, "Practically no flood risk. The parcel lies outside any known flood zone."),
    band(5.0, 15.0, "Very low flood risk. Flooding is not expected under normal conditions."),
    band(15.0, 25.0, "Low flood risk. Only exceptional events could reach the parcel."),
    band(25.0, 35.0, "Slightly elevated flood risk. Basic precautions are advisable."),
    band(35.0, 45.0, "Moderate flood risk. Occasional flooding of low-lying parts is possible."),
    band(45.0, 55.0, "Medium flood risk. Consider flood-resistant construction and insurance."),
    band(55.0, 65.0, "Considerable flood risk. Floods can reach the parcel during heavy rain."),
    band(65.0, 75.0, "High flood risk. The parcel lies in an area that floods periodically."),
    band(75.0, 85.0, "Very high flood risk. Flood protection measures are strongly recommended."),
    band(85.0, 95.0, "Severe flood risk. The parcel is regularly affected by flooding."),
    band(95.0, 100.0, "Extreme flood risk. Building on this parcel is not recommended."),
];

/// Landslide description bands.
pub const LANDSLIDE_BANDS: [RiskBand; 11] = [
    band(0.0, 5.0, "Practically no landslide risk. The terrain is stable."),
    band(5.0, 15.0, "Very low landslide risk. No signs of slope instability are known."),
    band(15.0, 25.0, "Low landslide risk. Instability is unlikely without major earthworks."),
    band(25.0, 35.0, "Slightly elevated landslide risk. Watch drainage on sloped parts."),
    band(35.0, 45.0, "Moderate landslide risk. A geotechnical check is advisable before building."),
    band(45.0, 55.0, "Medium landslide risk. Slope movements occur in the wider area."),
    band(55.0, 65.0, "Considerable landslide risk. Retaining structures may be required."),
    band(65.0, 75.0, "High landslide risk. The parcel lies in a landslide-prone area."),
    band(75.0, 85.0, "Very high landslide risk. A geotechnical survey is strongly recommended."),
    band(85.0, 95.0, "Severe landslide risk. Active slope movements are likely."),
    band(95.0, 100.0, "Extreme landslide risk. Building on this parcel is not recommended."),
];

/// Earthquake description bands.
pub const EARTHQUAKE_BANDS: [RiskBand; 11] = [
    band(0.0, 5.0, "Practically no seismic hazard data for this location."),
    band(5.0, 15.0, "Very low seismic hazard."),
    band(15.0, 25.0, "Low seismic hazard. Standard construction is sufficient."),
    band(25.0, 35.0, "Slightly elevated seismic hazard."),
    band(35.0, 45.0, "Moderate seismic hazard. Earthquake-resistant design is advisable."),
    band(45.0, 55.0, "Medium seismic hazard. Follow seismic design rules for new buildings."),
    band(55.0, 65.0, "Considerable seismic hazard. Older buildings may need reinforcement."),
    band(65.0, 75.0, "High seismic hazard. Strong ground shaking has been recorded nearby."),
    band(75.0, 85.0, "Very high seismic hazard. Earthquake-resistant construction is required."),
    band(85.0, 95.0, "Severe seismic hazard. Damaging earthquakes are expected."),
    band(95.0, 100.0, "Extreme seismic hazard. Among the most exposed areas in the country."),
];

/// Returns the description bands for a hazard.
#[must_use]
pub const fn bands(hazard: Hazard) -> &'static [RiskBand; 11] {
    match hazard {
        Hazard::Flood => &FLOOD_BANDS,
        Hazard::LandSlide => &LANDSLIDE_BANDS,
        Hazard::Earthquake => &EARTHQUAKE_BANDS,
    }
}

/// Returns the description for a risk percentage of the given hazard.
#[must_use]
pub fn describe(hazard: Hazard, percentage: f64) -> &'static str {
    let percentage = if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, 99.0)
    };

    let bands = bands(hazard);
    bands
        .iter()
        .find(|b| percentage >= b.from && percentage < b.to)
        .unwrap_or(&bands[0])
        .description
}

/// Flood risk description for a percentage.
#[must_use]
pub fn flood_details(percentage: f64) -> &'static str {
    describe(Hazard::Flood, percentage)
}

/// Landslide risk description for a percentage.
#[must_use]
pub fn landslide_details(percentage: f64) -> &'static str {
    describe(Hazard::LandSlide, percentage)
}

/// Earthquake risk description for a percentage.
#[must_use]
pub fn earthquake_details(percentage: f64) -> &'static str {
    describe(Hazard::Earthquake, percentage)
}
