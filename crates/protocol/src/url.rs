//! Connection parameters and signaling URL assembly (§3 `ConnectionParams`,
//! §6 URL grammar).

use thiserror::Error;
use url::Url;

use crate::ids::ParticipantSid;
use crate::model::ClientInfo;

/// The three reconnect shapes §4.2's table names, derived purely from
/// which optional [`ConnectionParams`] fields are set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectMode {
    /// Fresh session; the server issues a new participant SID.
    FullJoin,
    /// Resume an existing participant session; track SIDs survive.
    QuickReconnect,
    /// One-way publisher endpoint.
    PublishOnly,
}

/// §3 `ConnectionParams`: mutable only while disconnected (enforced by
/// `nova_client::engine::SignalingEngine`, not by this type itself).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub auth_token: String,
    pub auto_subscribe: bool,
    pub adaptive_stream: bool,
    pub publish_only: Option<String>,
    pub participant_sid: Option<ParticipantSid>,
}

impl ConnectionParams {
    #[must_use]
    pub fn new(host: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            auth_token: auth_token.into(),
            auto_subscribe: true,
            adaptive_stream: false,
            publish_only: None,
            participant_sid: None,
        }
    }

    #[must_use]
    pub fn with_auto_subscribe(mut self, auto_subscribe: bool) -> Self {
        self.auto_subscribe = auto_subscribe;
        self
    }

    #[must_use]
    pub fn with_adaptive_stream(mut self, adaptive_stream: bool) -> Self {
        self.adaptive_stream = adaptive_stream;
        self
    }

    #[must_use]
    pub fn with_publish_only(mut self, target: impl Into<String>) -> Self {
        self.publish_only = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_participant_sid(mut self, sid: ParticipantSid) -> Self {
        self.participant_sid = Some(sid);
        self
    }

    /// §4.2's reconnect-shape table, computed from which optional
    /// fields are set.
    #[must_use]
    pub fn reconnect_mode(&self) -> ReconnectMode {
        match (&self.participant_sid, &self.publish_only) {
            (Some(_), _) => ReconnectMode::QuickReconnect,
            (None, Some(_)) => ReconnectMode::PublishOnly,
            (None, None) => ReconnectMode::FullJoin,
        }
    }

    /// `connect()`'s precondition (§4.2): host and auth token non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty() && !self.auth_token.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("invalid host URL: {0}")]
    InvalidHost(#[from] url::ParseError),
}

/// Assembles the signaling URL per §6's grammar. Parameter order is
/// stable and matches §8 scenario 1 exactly; unset optionals
/// (`publish`, `reconnect`/`sid`) are omitted rather than emitted
/// empty.
pub fn build_signaling_url(
    params: &ConnectionParams,
    client: &ClientInfo,
) -> Result<Url, UrlError> {
    let mut host = params.host.clone();
    if !host.ends_with('/') {
        host.push('/');
    }
    host.push_str("rtc");

    let mut url = Url::parse(&host)?;
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.append_pair("access_token", &params.auth_token);
        query.append_pair("auto_subscribe", bool_flag(params.auto_subscribe));
        query.append_pair("adaptive_stream", bool_flag(params.adaptive_stream));
        if let Some(target) = &params.publish_only {
            query.append_pair("publish", target);
        }
        if let Some(sid) = &params.participant_sid {
            query.append_pair("reconnect", "1");
            query.append_pair("sid", sid.as_str());
        }
        query.append_pair("sdk", &client.sdk);
        query.append_pair("version", &client.version);
        query.append_pair("protocol", &client.protocol.to_string());
        query.append_pair("os", &client.os);
        query.append_pair("os_version", &client.os_version);
        query.append_pair("device_model", &client.device_model);
        query.append_pair("network", &client.network);
    }
    Ok(url)
}

fn bool_flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientInfo {
        ClientInfo::new("1.2.3", "linux", "6.9", "generic-pc", "wired")
    }

    #[test]
    fn fresh_join_url_matches_grammar_order() {
        let params = ConnectionParams::new("wss://sfu.example/", "T")
            .with_auto_subscribe(true)
            .with_adaptive_stream(false);
        let url = build_signaling_url(&params, &client()).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://sfu.example/rtc?access_token=T&auto_subscribe=1&adaptive_stream=0&\
             sdk=rust&version=1.2.3&protocol=15&os=linux&os_version=6.9&\
             device_model=generic-pc&network=wired"
        );
        assert_eq!(params.reconnect_mode(), ReconnectMode::FullJoin);
    }

    #[test]
    fn host_without_trailing_slash_gets_one_inserted() {
        let params = ConnectionParams::new("wss://sfu.example", "T");
        let url = build_signaling_url(&params, &client()).unwrap();
        assert!(url.path().starts_with("/rtc"));
    }

    #[test]
    fn quick_reconnect_adds_reconnect_and_sid() {
        let params = ConnectionParams::new("wss://sfu.example/", "T")
            .with_participant_sid(ParticipantSid::from("P1".to_string()));
        let url = build_signaling_url(&params, &client()).unwrap();
        assert!(url.as_str().contains("reconnect=1"));
        assert!(url.as_str().contains("sid=P1"));
        assert_eq!(params.reconnect_mode(), ReconnectMode::QuickReconnect);
    }

    #[test]
    fn publish_only_mode_sets_publish_param() {
        let params = ConnectionParams::new("wss://sfu.example/", "T").with_publish_only("cam-1");
        let url = build_signaling_url(&params, &client()).unwrap();
        assert!(url.as_str().contains("publish=cam-1"));
        assert_eq!(params.reconnect_mode(), ReconnectMode::PublishOnly);
    }

    #[test]
    fn unset_optionals_are_absent_from_url() {
        let params = ConnectionParams::new("wss://sfu.example/", "T");
        let url = build_signaling_url(&params, &client()).unwrap();
        assert!(!url.as_str().contains("publish="));
        assert!(!url.as_str().contains("reconnect="));
        assert!(!url.as_str().contains("sid="));
    }

    #[test]
    fn empty_host_or_token_is_invalid() {
        assert!(!ConnectionParams::new("", "T").is_valid());
        assert!(!ConnectionParams::new("wss://sfu.example/", "").is_valid());
    }
}
