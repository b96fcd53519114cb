//! Query Parser Module
//!
//! Parsers for the text forms accepted at the request boundary.
//!
//! # Supported Syntax
//!
//! ## Range expressions
//! ```text
//! [2038-01-19 03:14:07,2038-01-19 03:14:07]@Europe/Berlin
//! (2038-01-19 03:14:07,2038-01-19 03:14:07)@Europe/Berlin
//! ```
//!
//! See [`range`] for the grammar.

pub mod range;

pub use range::{parse_range, ParsedRange, RangeExpr, DATE_TIME_FORMAT};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexported_parser() {
        let parsed = parse_range("[2020-11-13 12:55:52,2020-11-13 12:56:26]@Etc/UTC").unwrap();
        assert_eq!(parsed.interval.min, 1605272152);
        assert_eq!(parsed.interval.max, 1605272186);
    }
}
