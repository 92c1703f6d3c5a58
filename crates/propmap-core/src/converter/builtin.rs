//! Built-in leaf converters
//!
//! Copyright (c) 2025 Propmap Team
//! Licensed under the MIT OR Apache-2.0 license

use anyhow::Context;
use chrono::NaiveDate;

use super::Converter;

/// Date format used by the built-in date converters
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `String` property into a [`NaiveDate`]
#[derive(Debug, Default, Clone)]
pub struct StringToDateConverter;

impl Converter for StringToDateConverter {
    type Input = String;
    type Output = NaiveDate;

    fn convert(&self, input: String) -> anyhow::Result<NaiveDate> {
        NaiveDate::parse_from_str(&input, DEFAULT_DATE_FORMAT)
            .with_context(|| format!("'{input}' does not match {DEFAULT_DATE_FORMAT}"))
    }
}

/// Renders a [`NaiveDate`] property as a `String`
#[derive(Debug, Default, Clone)]
pub struct DateToStringConverter;

impl Converter for DateToStringConverter {
    type Input = NaiveDate;
    type Output = String;

    fn convert(&self, input: NaiveDate) -> anyhow::Result<String> {
        Ok(input.format(DEFAULT_DATE_FORMAT).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_date() {
        let date = StringToDateConverter
            .convert("2020-01-01".to_string())
            .unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }

    #[test]
    fn test_date_to_string() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(DateToStringConverter.convert(date).unwrap(), "2020-01-01");
    }

    #[test]
    fn test_unparsable_date_is_an_error() {
        let err = StringToDateConverter
            .convert("01/01/2020".to_string())
            .unwrap_err();
        assert!(err.to_string().contains("01/01/2020"));
    }
}
