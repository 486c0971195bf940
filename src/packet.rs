use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use log::{trace, warn};

use crate::error::MasterQueryError;
use crate::parse::ResponseCursor;

/// Marks a connectionless (out-of-band) packet, in both directions.
pub const OUT_OF_BAND_MARKER: [u8; 2] = [0xff, 0xff];

/// Command string of the server list request.
pub const GET_SERVERS: &str = "getServers";

/// Command string the master server answers a list request with.
pub const SERVERS: &str = "servers";

/// Size of one address + port record in a server list response.
pub const RECORD_SIZE: usize = 6;

/// The idTech4 dialects a master server may speak.
///
/// They only differ in the version constant sent with the request and in the
/// master server used when none is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolVariant {
    /// Doom 3 and Prey
    #[default]
    Doom3Prey,
    Quake4,
    Dhewm3,
}

impl ProtocolVariant {
    /// Map a numeric selector (0, 1 or 2) to a variant.
    ///
    /// Anything else falls back to [ProtocolVariant::Doom3Prey]; the returned
    /// flag is `true` when that happened.
    pub fn from_selector(selector: i64) -> (Self, bool) {
        match selector {
            0 => (ProtocolVariant::Doom3Prey, false),
            1 => (ProtocolVariant::Quake4, false),
            2 => (ProtocolVariant::Dhewm3, false),
            _ => (ProtocolVariant::Doom3Prey, true),
        }
    }

    /// Version constant embedded in the request.
    pub fn version(&self) -> u32 {
        match self {
            ProtocolVariant::Doom3Prey => (1 << 16) + 41,
            // 0x00020055
            ProtocolVariant::Quake4 => 131157,
            ProtocolVariant::Dhewm3 => (1 << 16) + 42,
        }
    }

    /// Master server queried when the configuration names none.
    pub fn default_master(&self) -> &'static str {
        match self {
            ProtocolVariant::Doom3Prey | ProtocolVariant::Dhewm3 => "idnet.ua-corp.com",
            ProtocolVariant::Quake4 => "q4master.idsoftware.com",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProtocolVariant::Doom3Prey => "Doom 3 / Prey",
            ProtocolVariant::Quake4 => "Quake 4",
            ProtocolVariant::Dhewm3 => "DHEWM3",
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `getServers` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPacket {
    protocol: ProtocolVariant,
    mod_filter: String,
}

impl RequestPacket {
    pub fn new(protocol: ProtocolVariant, mod_filter: &str) -> Self {
        RequestPacket {
            protocol,
            mod_filter: mod_filter.to_owned(),
        }
    }

    /// Serializes the request into an array of bytes.
    pub fn pack(&self) -> Vec<u8> {
        // packet structure: marker, command, version, mod filter, 3 reserved bytes
        let mut payload: Vec<u8> =
            Vec::with_capacity(2 + GET_SERVERS.len() + 1 + 4 + self.mod_filter.len() + 1 + 3);
        payload.extend_from_slice(&OUT_OF_BAND_MARKER);
        payload.extend_from_slice(GET_SERVERS.as_bytes());
        payload.push(0);
        payload.extend_from_slice(&self.protocol.version().to_le_bytes());
        payload.extend_from_slice(self.mod_filter.as_bytes());
        payload.push(0);
        payload.extend_from_slice(&[0, 0, 0]);

        payload
    }

    pub fn protocol(&self) -> ProtocolVariant {
        self.protocol
    }

    pub fn mod_filter(&self) -> &str {
        &self.mod_filter
    }
}

/// A game server registered with the master server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerEntry {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl ServerEntry {
    /// Read one record: 4 address bytes followed by a little-endian port.
    ///
    /// The cursor only moves if the whole record could be read.
    fn read(cursor: &mut ResponseCursor<'_>) -> Result<ServerEntry, MasterQueryError> {
        let mut probe = cursor.clone();
        let a = probe.read_u8()?;
        let b = probe.read_u8()?;
        let c = probe.read_u8()?;
        let d = probe.read_u8()?;
        let port = probe.read_u16()?;
        *cursor = probe;

        Ok(ServerEntry {
            ip: Ipv4Addr::new(a, b, c, d),
            port,
        })
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip, self.port)
    }
}

impl fmt::Display for ServerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Decode a `servers` response into the list of servers it carries.
///
/// The header (a short and the `servers` string) must be complete. After it,
/// records are read until the next one no longer fits; leftover bytes are
/// dropped.
pub fn decode_server_list(data: &[u8]) -> Result<Vec<ServerEntry>, MasterQueryError> {
    let mut cursor = ResponseCursor::new(data, data.len());
    if cursor.is_empty() {
        return Err(MasterQueryError::EmptyResponse);
    }

    // leading short carries nothing we use
    cursor
        .read_u16()
        .map_err(|e| MasterQueryError::MalformedResponse(Box::new(e)))?;

    let kind = match cursor.read_string() {
        Ok(kind) => kind,
        Err(_) => {
            let rest: String = cursor.rest().iter().map(|&c| char::from(c)).collect();
            return Err(MasterQueryError::UnexpectedResponseType(rest));
        }
    };
    if kind != SERVERS {
        return Err(MasterQueryError::UnexpectedResponseType(kind));
    }

    // no count or terminator on the wire: a short read is the end of the list
    let mut list: Vec<ServerEntry> = Vec::with_capacity(cursor.remaining() / RECORD_SIZE);
    while let Ok(entry) = ServerEntry::read(&mut cursor) {
        trace!("decoded server {entry}");
        list.push(entry);
    }

    let leftover = cursor.remaining();
    if leftover != 0 {
        warn!("dropping {leftover} trailing byte(s) after the last server record");
    }

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(records: &[u8]) -> Vec<u8> {
        let mut data = vec![0xff, 0xff];
        data.extend_from_slice(b"servers\0");
        data.extend_from_slice(records);
        data
    }

    #[test]
    fn packs_doom3_request() {
        let packet = RequestPacket::new(ProtocolVariant::Doom3Prey, "");
        let mut expected = vec![0xff, 0xff];
        expected.extend_from_slice(b"getServers\0");
        expected.extend_from_slice(&[0x29, 0x00, 0x01, 0x00]);
        expected.extend_from_slice(&[0, 0, 0, 0]);

        assert_eq!(packet.pack(), expected);
    }

    #[test]
    fn request_keeps_its_inputs() {
        let packet = RequestPacket::new(ProtocolVariant::Dhewm3, "d3xp");

        assert_eq!(packet.protocol(), ProtocolVariant::Dhewm3);
        assert_eq!(packet.mod_filter(), "d3xp");
    }

    #[test]
    fn version_per_variant() {
        let version = |p| {
            let bytes = RequestPacket::new(p, "").pack();
            u32::from_le_bytes(bytes[13..17].try_into().unwrap())
        };

        assert_eq!(version(ProtocolVariant::Doom3Prey), 65577);
        assert_eq!(version(ProtocolVariant::Quake4), 131157);
        assert_eq!(version(ProtocolVariant::Dhewm3), 65578);
    }

    #[test]
    fn mod_filter_only_changes_its_segment() {
        let plain = RequestPacket::new(ProtocolVariant::Quake4, "").pack();
        let modded = RequestPacket::new(ProtocolVariant::Quake4, "q4ctf").pack();

        assert_eq!(modded.len(), plain.len() + 5);
        assert_eq!(modded[..17], plain[..17]);
        assert_eq!(&modded[17..22], b"q4ctf");
        assert_eq!(modded[22..], plain[17..]);
        assert_eq!(modded, RequestPacket::new(ProtocolVariant::Quake4, "q4ctf").pack());
    }

    #[test]
    fn selector_coerces_unknown_values() {
        assert_eq!(
            ProtocolVariant::from_selector(1),
            (ProtocolVariant::Quake4, false)
        );
        assert_eq!(
            ProtocolVariant::from_selector(2),
            (ProtocolVariant::Dhewm3, false)
        );
        assert_eq!(
            ProtocolVariant::from_selector(7),
            (ProtocolVariant::Doom3Prey, true)
        );
        assert_eq!(
            ProtocolVariant::from_selector(-1),
            (ProtocolVariant::Doom3Prey, true)
        );
    }

    #[test]
    fn default_masters() {
        assert_eq!(ProtocolVariant::Dhewm3.default_master(), "idnet.ua-corp.com");
        assert_eq!(
            ProtocolVariant::Quake4.default_master(),
            "q4master.idsoftware.com"
        );
    }

    #[test]
    fn decodes_single_server() {
        let data = [
            0x00, 0x00, b's', b'e', b'r', b'v', b'e', b'r', b's', 0x00, 0x7f, 0x00, 0x00, 0x01,
            0x34, 0x92,
        ];
        let list = decode_server_list(&data).unwrap();

        assert_eq!(
            list,
            vec![ServerEntry {
                ip: Ipv4Addr::LOCALHOST,
                port: 37428
            }]
        );
        assert_eq!(list[0].to_string(), "127.0.0.1:37428");
    }

    #[test]
    fn keeps_order_and_duplicates() {
        let data = response(&[
            10, 0, 0, 2, 0x42, 0x6c, 10, 0, 0, 1, 0x42, 0x6c, 10, 0, 0, 2, 0x42, 0x6c,
        ]);
        let list = decode_server_list(&data).unwrap();
        let addrs: Vec<String> = list.iter().map(|s| s.to_string()).collect();

        assert_eq!(addrs, ["10.0.0.2:27714", "10.0.0.1:27714", "10.0.0.2:27714"]);
    }

    #[test]
    fn drops_partial_trailing_record() {
        let data = response(&[192, 168, 1, 20, 0x5a, 0x6b, 1, 2, 3]);
        let list = decode_server_list(&data).unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].socket_addr().to_string(), "192.168.1.20:27482");
    }

    #[test]
    fn empty_list_is_ok() {
        assert!(decode_server_list(&response(&[])).unwrap().is_empty());
    }

    #[test]
    fn rejects_other_response_types() {
        let mut data = vec![0, 0];
        data.extend_from_slice(b"nope\0");
        data.extend_from_slice(&[127, 0, 0, 1, 0x34, 0x92]);

        match decode_server_list(&data) {
            Err(MasterQueryError::UnexpectedResponseType(kind)) => assert_eq!(kind, "nope"),
            other => panic!("expected unexpected response type, got {other:?}"),
        }
    }

    #[test]
    fn truncated_header_is_fatal() {
        assert!(matches!(
            decode_server_list(&[0]),
            Err(MasterQueryError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_server_list(&[0, 0, b's', b'e', b'r']),
            Err(MasterQueryError::UnexpectedResponseType(ref s)) if s == "ser"
        ));
        assert!(matches!(
            decode_server_list(&[]),
            Err(MasterQueryError::EmptyResponse)
        ));
    }
}
