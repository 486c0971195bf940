use std::time::Duration;

use crate::packet::ProtocolVariant;

/// Port idTech4 master servers listen on.
pub const DEFAULT_PORT: u16 = 27650;

/// Time allowed to set up the UDP association.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Time allowed to hand the request to the socket. UDP sends rarely block, so
/// this mostly guards against a stuck local network stack.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Time allowed for the master server to answer.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Everything a single master server query needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// Master server hostname or address
    pub master: String,
    pub port: u16,
    /// Only list servers running this mod. Empty lists everything.
    pub mod_filter: String,
    pub protocol: ProtocolVariant,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub read_timeout: Duration,
}

impl QueryConfig {
    /// Build a configuration with default port, filter and timeouts.
    ///
    /// If `master` is `None` or empty, the protocol's default master server is used.
    pub fn new(master: Option<String>, protocol: ProtocolVariant) -> Self {
        let master = master
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| protocol.default_master().to_owned());

        QueryConfig {
            master,
            port: DEFAULT_PORT,
            mod_filter: String::new(),
            protocol,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_mod_filter(mut self, mod_filter: impl Into<String>) -> Self {
        self.mod_filter = mod_filter.into();
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn with_write_timeout(mut self, write: Duration) -> Self {
        self.write_timeout = write;
        self
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig::new(None, ProtocolVariant::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = QueryConfig::default();

        assert_eq!(config.master, "idnet.ua-corp.com");
        assert_eq!(config.port, 27650);
        assert_eq!(config.mod_filter, "");
        assert_eq!(config.protocol, ProtocolVariant::Doom3Prey);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.write_timeout, Duration::from_secs(2));
        assert_eq!(config.read_timeout, Duration::from_secs(3));
    }

    #[test]
    fn timeouts_are_set_independently() {
        let config = QueryConfig::default()
            .with_timeouts(Duration::from_secs(5), Duration::from_secs(7))
            .with_write_timeout(Duration::from_millis(500));

        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.write_timeout, Duration::from_millis(500));
        assert_eq!(config.read_timeout, Duration::from_secs(7));
    }

    #[test]
    fn master_follows_protocol_unless_given() {
        assert_eq!(
            QueryConfig::new(None, ProtocolVariant::Quake4).master,
            "q4master.idsoftware.com"
        );
        assert_eq!(
            QueryConfig::new(Some(String::new()), ProtocolVariant::Dhewm3).master,
            "idnet.ua-corp.com"
        );
        assert_eq!(
            QueryConfig::new(Some("master.example.org".into()), ProtocolVariant::Quake4).master,
            "master.example.org"
        );
    }
}
