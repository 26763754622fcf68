//! Mock reader roster read from the environment.
//!
//! Format: comma-separated `transport:name[@address]` entries, for example
//! `serial:ReaderA,bluetooth:RFD40@00:11:22:33:44:55`.

use anyhow::{Context, Result, bail};
use rfidlink_hardware::TransportKind;
use rfidlink_hardware::mock::{MockCapabilityHandle, MockReader};

/// Environment variable holding the roster.
pub const ROSTER_ENV: &str = "RFIDLINK_MOCK_READERS";

/// Roster used when the environment variable is unset.
pub const DEFAULT_ROSTER: &str = "serial:ReaderA,serial:ReaderB@/dev/ttyUSB1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub transport: TransportKind,
    pub name: String,
    pub address: Option<String>,
}

pub fn parse(listing: &str) -> Result<Vec<RosterEntry>> {
    let entries = listing
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_entry)
        .collect::<Result<Vec<_>>>()?;

    if entries.is_empty() {
        bail!("{ROSTER_ENV} lists no readers");
    }
    Ok(entries)
}

fn parse_entry(entry: &str) -> Result<RosterEntry> {
    let (transport, rest) = entry
        .split_once(':')
        .with_context(|| format!("expected transport:name, got '{entry}'"))?;

    let transport = transport
        .parse::<TransportKind>()
        .map_err(anyhow::Error::msg)?;

    let (name, address) = match rest.split_once('@') {
        Some((name, address)) => (name, Some(address.to_owned())),
        None => (rest, None),
    };

    if name.is_empty() {
        bail!("reader name missing in '{entry}'");
    }

    Ok(RosterEntry {
        transport,
        name: name.to_owned(),
        address,
    })
}

/// Register every entry with the mock capability.
pub fn install(entries: &[RosterEntry], capability: &MockCapabilityHandle) -> Vec<MockReader> {
    entries
        .iter()
        .map(|entry| {
            let reader = MockReader::new(entry.name.clone());
            capability.add_reader(entry.transport, reader.clone(), entry.address.as_deref());
            reader
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_default_roster() {
        let entries = parse(DEFAULT_ROSTER).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].transport, TransportKind::Serial);
        assert_eq!(entries[0].address, None);
        assert_eq!(entries[1].name, "ReaderB");
        assert_eq!(entries[1].address.as_deref(), Some("/dev/ttyUSB1"));
    }

    #[test]
    fn test_address_may_contain_colons() {
        let entries = parse("bt:RFD40@00:11:22:33:44:55").unwrap();
        assert_eq!(entries[0].transport, TransportKind::Bluetooth);
        assert_eq!(entries[0].name, "RFD40");
        assert_eq!(entries[0].address.as_deref(), Some("00:11:22:33:44:55"));
    }

    #[rstest]
    #[case("")]
    #[case("ReaderA")]
    #[case("nfc:ReaderA")]
    #[case("usb:@addr")]
    fn test_rejects_malformed(#[case] listing: &str) {
        assert!(parse(listing).is_err());
    }

    #[test]
    fn test_install_populates_capability() {
        let (_capability, handle) = rfidlink_hardware::mock::MockCapability::new();
        let readers = install(&parse("usb:A,usb:B").unwrap(), &handle);
        assert_eq!(readers.len(), 2);
    }
}
