//! Per-period growth and inflation factors

/// Convert an annual percentage rate into a factor for a fraction of a year
///
/// `(1 + annual_percent / 100) ^ period_fraction`
pub fn annual_to_period(annual_percent: f64, period_fraction: f64) -> f64 {
    (1.0 + annual_percent / 100.0).powf(period_fraction)
}

/// Combined growth and CPI factor for one period
///
/// Growth and CPI compound independently over the period and are then multiplied.
/// CPI-immune items only see their own growth.
pub fn period_factor(
    annual_growth_percent: f64,
    cpi_immune: bool,
    annual_cpi_percent: f64,
    period_fraction: f64,
) -> f64 {
    let growth = annual_to_period(annual_growth_percent, period_fraction);
    let cpi = if cpi_immune {
        1.0
    } else {
        annual_to_period(annual_cpi_percent, period_fraction)
    };
    growth * cpi
}
