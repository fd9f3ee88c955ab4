//! Relay set notation parsing.
//!
//! A relay set names the relays a run drives, in exactly one of three
//! notations: a single relay (`4`), an inclusive range (`4:10`), or a comma
//! separated group (`2,7,11`). Every number must be a valid chain index and
//! the parsed indices keep their written order, which is also their order on
//! the wire.

use crate::constants::{MAX_RELAYS_IN_CHAIN, MIN_RELAY_NUMBER};
use crate::error::{RelayError, Result};

/// Parse a relay set argument into the list of relay indices to drive.
pub fn parse_selection(input: &str) -> Result<Vec<u8>> {
    if input.contains(':') {
        parse_range(input)
    } else if input.contains(',') {
        parse_group(input)
    } else {
        Ok(vec![parse_relay_number(input)?])
    }
}

fn parse_range(input: &str) -> Result<Vec<u8>> {
    let mut parts = input.split(':');
    let (Some(begin), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(RelayError::BadSelection(input.to_string()));
    };
    let begin = parse_relay_number(begin)?;
    let end = parse_relay_number(end)?;
    if end <= begin {
        return Err(RelayError::BadRange { begin, end });
    }
    Ok((begin..=end).collect())
}

fn parse_group(input: &str) -> Result<Vec<u8>> {
    input.split(',').map(parse_relay_number).collect()
}

fn parse_relay_number(token: &str) -> Result<u8> {
    let value: u32 = token
        .parse()
        .map_err(|_| RelayError::BadSelection(token.to_string()))?;
    if value < u32::from(MIN_RELAY_NUMBER) || value > u32::from(MAX_RELAYS_IN_CHAIN) {
        return Err(RelayError::InvalidRelayNumber { value });
    }
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_relay() {
        assert_eq!(parse_selection("4").unwrap(), vec![4]);
        assert_eq!(parse_selection("120").unwrap(), vec![120]);
    }

    #[test]
    fn range_expands_inclusively() {
        assert_eq!(parse_selection("4:10").unwrap(), vec![4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn group_keeps_written_order() {
        assert_eq!(parse_selection("2,7,11").unwrap(), vec![2, 7, 11]);
        assert_eq!(parse_selection("11,3").unwrap(), vec![11, 3]);
        assert_eq!(parse_selection("4,4").unwrap(), vec![4, 4]);
    }

    #[test]
    fn range_order_must_be_ascending() {
        assert!(matches!(
            parse_selection("10:4"),
            Err(RelayError::BadRange { begin: 10, end: 4 })
        ));
        assert!(matches!(
            parse_selection("4:4"),
            Err(RelayError::BadRange { .. })
        ));
    }

    #[test]
    fn out_of_chain_numbers_are_rejected() {
        assert!(matches!(
            parse_selection("0"),
            Err(RelayError::InvalidRelayNumber { value: 0 })
        ));
        assert!(matches!(
            parse_selection("121"),
            Err(RelayError::InvalidRelayNumber { value: 121 })
        ));
        assert!(matches!(
            parse_selection("2,121"),
            Err(RelayError::InvalidRelayNumber { value: 121 })
        ));
    }

    #[test]
    fn mixed_or_malformed_notations_are_rejected() {
        assert!(parse_selection("").is_err());
        assert!(parse_selection("abc").is_err());
        assert!(parse_selection("1:2:3").is_err());
        assert!(parse_selection("2:4,6").is_err());
        assert!(parse_selection("2,,3").is_err());
        assert!(parse_selection("2,").is_err());
        assert!(parse_selection("-3").is_err());
    }
}
