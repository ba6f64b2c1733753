//! Command-line arguments for the `rentbook` binary.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rentbook_core::{RenterId, RenterProfile};
use rust_decimal::Decimal;

use crate::error::CliError;

pub const USAGE: &str =
    "rentbook --config <path> --renter <id> --rent <amount> [--month <1-12>] [--year <yyyy>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub renter_id: RenterId,
    pub monthly_rent: Decimal,
    pub month: u32,
    pub year: i32,
}

impl CliArgs {
    /// Parse everything after the program name. `--config` is consumed by
    /// [`crate::config::ClientConfig::load`] and skipped here. Month and
    /// year default to `today`'s.
    pub fn parse<I>(args: I, today: NaiveDate) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut renter_id = None;
        let mut monthly_rent = None;
        let mut month = today.month();
        let mut year = today.year();

        let mut args = args.into_iter();
        while let Some(flag) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| CliError::Usage(format!("{} needs a value; {}", flag, USAGE)))
            };
            match flag.as_str() {
                "--config" => {
                    value()?;
                }
                "--renter" => renter_id = Some(parse_value::<RenterId>("--renter", &value()?)?),
                "--rent" => monthly_rent = Some(parse_value::<Decimal>("--rent", &value()?)?),
                "--month" => month = parse_value("--month", &value()?)?,
                "--year" => year = parse_value("--year", &value()?)?,
                other => {
                    return Err(CliError::Usage(format!("unknown argument {}; {}", other, USAGE)));
                }
            }
        }

        Ok(Self {
            renter_id: renter_id
                .ok_or_else(|| CliError::Usage(format!("--renter is required; {}", USAGE)))?,
            monthly_rent: monthly_rent
                .ok_or_else(|| CliError::Usage(format!("--rent is required; {}", USAGE)))?,
            month,
            year,
        })
    }

    pub fn renter(&self) -> RenterProfile {
        RenterProfile::new(self.renter_id, self.monthly_rent)
    }
}

fn parse_value<T: FromStr>(flag: &str, raw: &str) -> Result<T, CliError> {
    raw.parse()
        .map_err(|_| CliError::Usage(format!("invalid value {:?} for {}", raw, flag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).expect("date should be valid")
    }

    #[test]
    fn test_parse_full_arguments() {
        let parsed = CliArgs::parse(
            args(&["--config", "rb.toml", "--renter", "4", "--rent", "9000.50", "--month", "2", "--year", "2023"]),
            today(),
        )
        .expect("parse should succeed");
        assert_eq!(parsed.renter_id, 4);
        assert_eq!(parsed.monthly_rent, Decimal::new(900050, 2));
        assert_eq!((parsed.month, parsed.year), (2, 2023));
    }

    #[test]
    fn test_month_and_year_default_to_today() {
        let parsed = CliArgs::parse(args(&["--renter", "4", "--rent", "9000"]), today())
            .expect("parse should succeed");
        assert_eq!((parsed.month, parsed.year), (6, 2024));
        assert_eq!(parsed.renter().monthly_rent, Decimal::new(9000, 0));
    }

    #[test]
    fn test_missing_and_bad_values_are_usage_errors() {
        assert!(matches!(
            CliArgs::parse(args(&["--rent", "9000"]), today()),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            CliArgs::parse(args(&["--renter", "x", "--rent", "9000"]), today()),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            CliArgs::parse(args(&["--renter", "4", "--rent"]), today()),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            CliArgs::parse(args(&["--renter", "4", "--rent", "1", "--verbose"]), today()),
            Err(CliError::Usage(_))
        ));
    }
}
