use super::ValuationError;

/// Gordon growth value: `d0 (1 + g) / (k - g)`.
pub fn gordon_growth(d0: f64, k: f64, g: f64) -> Result<f64, ValuationError> {
    if !(d0.is_finite() && k.is_finite() && g.is_finite()) {
        return Err(ValuationError::InvalidInput("non-finite Gordon input".into()));
    }
    if d0 < 0.0 {
        return Err(ValuationError::InvalidInput(format!(
            "dividend must not be negative, got {d0}"
        )));
    }
    if k <= g {
        return Err(ValuationError::RateNotAboveGrowth { rate: k, growth: g });
    }
    Ok(d0 * (1.0 + g) / (k - g))
}

/// CAPM cost of equity: `rf + beta * erp`.
pub fn capm_discount_rate(risk_free: f64, beta: f64, equity_risk_premium: f64) -> f64 {
    risk_free + beta * equity_risk_premium
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textbook_value() {
        let v = gordon_growth(2.0, 0.08, 0.03).unwrap();
        assert!((v - 41.2).abs() < 1e-9);
    }

    #[test]
    fn zero_dividend_is_zero() {
        assert_eq!(gordon_growth(0.0, 0.08, 0.03).unwrap(), 0.0);
    }

    #[test]
    fn rate_must_exceed_growth() {
        assert_eq!(
            gordon_growth(1.0, 0.03, 0.03),
            Err(ValuationError::RateNotAboveGrowth {
                rate: 0.03,
                growth: 0.03
            })
        );
        assert!(gordon_growth(-1.0, 0.08, 0.03).is_err());
    }

    #[test]
    fn capm() {
        let r = capm_discount_rate(0.04, 1.2, 0.055);
        assert!((r - 0.106).abs() < 1e-12);
    }
}
