//! Stream-day / calendar-day rate handling.
//!
//! Stream-day rates are the instantaneous throughput while the equipment is
//! running; calendar-day rates are averaged over all elapsed time. The two
//! are related through the regularity (uptime fraction):
//! `calendar_day = stream_day * regularity`.

use crate::error::{GtError, GtResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RateType {
    StreamDay,
    CalendarDay,
}

/// Validate a regularity value: an uptime fraction in (0, 1].
pub fn validate_regularity(regularity: f64) -> GtResult<()> {
    if !regularity.is_finite() || regularity <= 0.0 || regularity > 1.0 {
        return Err(GtError::InvalidArg {
            what: "regularity must be in (0, 1]",
        });
    }
    Ok(())
}

/// Convert a stream-day rate to a calendar-day rate.
pub fn to_calendar_day(stream_day_rate: f64, regularity: f64) -> GtResult<f64> {
    validate_regularity(regularity)?;
    Ok(stream_day_rate * regularity)
}

/// Convert a calendar-day rate to a stream-day rate.
pub fn to_stream_day(calendar_day_rate: f64, regularity: f64) -> GtResult<f64> {
    validate_regularity(regularity)?;
    Ok(calendar_day_rate / regularity)
}

/// Convert a slice of rates between rate types.
///
/// Converting to the type the rates already have is the identity.
pub fn convert_rates(
    rates: &[f64],
    from: RateType,
    to: RateType,
    regularity: f64,
) -> GtResult<Vec<f64>> {
    validate_regularity(regularity)?;
    let converted = match (from, to) {
        (RateType::StreamDay, RateType::CalendarDay) => {
            rates.iter().map(|r| r * regularity).collect()
        }
        (RateType::CalendarDay, RateType::StreamDay) => {
            rates.iter().map(|r| r / regularity).collect()
        }
        _ => rates.to_vec(),
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_to_calendar_and_back() {
        let stream = 1000.0;
        let calendar = to_calendar_day(stream, 0.95).unwrap();
        assert!((calendar - 950.0).abs() < 1e-12);
        let back = to_stream_day(calendar, 0.95).unwrap();
        assert!((back - stream).abs() / stream < 1e-12);
    }

    #[test]
    fn regularity_bounds() {
        assert!(validate_regularity(1.0).is_ok());
        assert!(validate_regularity(0.0).is_err());
        assert!(validate_regularity(1.5).is_err());
        assert!(validate_regularity(f64::NAN).is_err());
    }

    #[test]
    fn convert_identity() {
        let rates = [1.0, 2.0, 3.0];
        let out = convert_rates(&rates, RateType::StreamDay, RateType::StreamDay, 0.5).unwrap();
        assert_eq!(out, rates.to_vec());
    }

    #[test]
    fn convert_slice() {
        let rates = [100.0, 200.0];
        let out = convert_rates(&rates, RateType::StreamDay, RateType::CalendarDay, 0.5).unwrap();
        assert_eq!(out, vec![50.0, 100.0]);
    }
}
