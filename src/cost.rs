use serde::Serialize;

use crate::errors::InputError;
use crate::pipeline::FuelKind;

/// Cost figures for one station/efficiency pair. Values are raw; rounding
/// happens only in the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub cost_per_mile: f64,
    pub cost_per_100_miles: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub station: String,
    pub area: String,
    pub fuel: &'static str,
    pub price: f64,
    pub efficiency: f64,
    pub cost_per_mile: f64,
    pub cost_per_100_miles: f64,
    pub summary: String,
}

/// Pure: identical inputs always yield identical outputs.
pub fn breakdown(price: f64, efficiency: f64) -> CostBreakdown {
    let cost_per_mile = price / efficiency;
    CostBreakdown {
        cost_per_mile,
        cost_per_100_miles: cost_per_mile * 100.0,
    }
}

/// Efficiency text must be present and parse as a finite number > 0.
pub fn parse_efficiency(text: &str) -> Result<f64, InputError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InputError::MissingEfficiency);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| InputError::InvalidEfficiency)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(InputError::InvalidEfficiency);
    }
    Ok(value)
}

pub fn report(
    station: &str,
    area: &str,
    fuel: FuelKind,
    price: f64,
    efficiency: f64,
) -> CostReport {
    let costs = breakdown(price, efficiency);
    let summary = format!(
        "Fuel Cost Analysis\n{}\n\n\
         Station: {station} (Area: {area})\n\
         Fuel Type: {}\n\
         Vehicle MPG: {efficiency}\n\n\
         Price: ${price:.2} per gallon\n\
         Cost per Mile: ${:.3}\n\
         Cost per 100 Miles: ${:.2}",
        "-".repeat(40),
        fuel.label(),
        costs.cost_per_mile,
        costs.cost_per_100_miles,
    );
    CostReport {
        station: station.to_string(),
        area: area.to_string(),
        fuel: fuel.label(),
        price,
        efficiency,
        cost_per_mile: round_to(costs.cost_per_mile, 3),
        cost_per_100_miles: round_to(costs.cost_per_100_miles, 2),
        summary,
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_matches_hand_computation() {
        let costs = breakdown(3.50, 25.0);
        assert!((costs.cost_per_mile - 0.14).abs() < 1e-9);
        assert!((costs.cost_per_100_miles - 14.0).abs() < 1e-9);
    }

    #[test]
    fn breakdown_is_idempotent() {
        assert_eq!(breakdown(3.59, 31.5), breakdown(3.59, 31.5));
    }

    #[test]
    fn efficiency_validation_taxonomy() {
        assert_eq!(parse_efficiency(""), Err(InputError::MissingEfficiency));
        assert_eq!(parse_efficiency("   "), Err(InputError::MissingEfficiency));
        assert_eq!(parse_efficiency("abc"), Err(InputError::InvalidEfficiency));
        assert_eq!(parse_efficiency("0"), Err(InputError::InvalidEfficiency));
        assert_eq!(parse_efficiency("-3"), Err(InputError::InvalidEfficiency));
        assert_eq!(parse_efficiency("NaN"), Err(InputError::InvalidEfficiency));
        assert_eq!(parse_efficiency("inf"), Err(InputError::InvalidEfficiency));
        assert_eq!(parse_efficiency("25"), Ok(25.0));
        assert_eq!(parse_efficiency(" 31.5 "), Ok(31.5));
    }

    #[test]
    fn report_rounds_for_display() {
        let report = report("Shell", "Hartford", FuelKind::Gasoline, 3.50, 25.0);
        assert_eq!(report.cost_per_mile, 0.14);
        assert_eq!(report.cost_per_100_miles, 14.0);
        assert!(report.summary.contains("Station: Shell (Area: Hartford)"));
        assert!(report.summary.contains("Cost per Mile: $0.140"));
        assert!(report.summary.contains("Cost per 100 Miles: $14.00"));
        assert!(report.summary.contains("Fuel Type: Gasoline"));
    }
}
