//! # WNS notification model.
//!
//! A [`WnsNotification`] targets one channel URI and carries a [`WnsKind`] (closed set of
//! notification types with their kind-specific metadata) and a [`WnsBody`].
//!
//! Header mapping per kind:
//! ```text
//! Toast ─► X-WNS-Type: wns/toast, X-WindowsPhone-Target: toast
//! Tile  ─► X-WNS-Type: wns/tile,  X-WNS-Cache-Policy (opt), X-WNS-Tag (opt)
//! Badge ─► X-WNS-Type: wns/badge, X-WNS-Cache-Policy (opt)
//! Raw   ─► X-WNS-Type: wns/raw,   body sent as application/octet-stream
//! ```
//!
//! ## Example
//! ```rust
//! use pushvisor::wns::{WnsCachePolicy, WnsNotification};
//!
//! let tile = WnsNotification::tile(
//!     "https://db5.notify.windows.com/?token=AwYAAAB",
//!     "<tile><visual><binding template=\"TileSmall\"/></visual></tile>",
//! )
//! .with_cache_policy(WnsCachePolicy::Cache)
//! .with_tag("scores")
//! .with_time_to_live(600);
//!
//! assert_eq!(tile.kind.wns_type(), "wns/tile");
//! ```

use crate::connection::Notification;

/// Whether WNS should cache a tile/badge for an offline device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WnsCachePolicy {
    /// `cache`
    Cache,
    /// `no-cache`
    NoCache,
}

impl WnsCachePolicy {
    /// Header value for `X-WNS-Cache-Policy`.
    pub fn as_header(&self) -> &'static str {
        match self {
            WnsCachePolicy::Cache => "cache",
            WnsCachePolicy::NoCache => "no-cache",
        }
    }
}

/// Notification type with its kind-specific metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WnsKind {
    /// Toast notification.
    Toast,
    /// Live tile update.
    Tile {
        /// Optional cache policy.
        cache_policy: Option<WnsCachePolicy>,
        /// Optional tag (tile queue slot).
        tag: Option<String>,
    },
    /// Badge update.
    Badge {
        /// Optional cache policy.
        cache_policy: Option<WnsCachePolicy>,
    },
    /// Raw application payload.
    Raw,
}

impl WnsKind {
    /// Header value for `X-WNS-Type`.
    pub fn wns_type(&self) -> &'static str {
        match self {
            WnsKind::Toast => "wns/toast",
            WnsKind::Tile { .. } => "wns/tile",
            WnsKind::Badge { .. } => "wns/badge",
            WnsKind::Raw => "wns/raw",
        }
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WnsBody {
    /// XML payload, sent as `text/xml`.
    Xml(String),
    /// Opaque bytes, sent as `application/octet-stream`.
    Raw(Vec<u8>),
}

/// One notification for one WNS channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WnsNotification {
    /// Channel URI the notification is POSTed to.
    pub channel_uri: String,
    /// Type and kind-specific metadata.
    pub kind: WnsKind,
    /// Body sent as-is.
    pub body: WnsBody,
    /// Time to live in seconds (`X-WNS-TTL`).
    pub time_to_live: Option<u32>,
    /// Ask WNS to report device connection status (`X-WNS-RequestForStatus`).
    pub request_for_status: Option<bool>,
}

impl WnsNotification {
    fn with_kind(channel_uri: impl Into<String>, kind: WnsKind, body: WnsBody) -> Self {
        Self {
            channel_uri: channel_uri.into(),
            kind,
            body,
            time_to_live: None,
            request_for_status: None,
        }
    }

    /// Toast with an XML payload.
    pub fn toast(channel_uri: impl Into<String>, xml: impl Into<String>) -> Self {
        Self::with_kind(channel_uri, WnsKind::Toast, WnsBody::Xml(xml.into()))
    }

    /// Tile update with an XML payload.
    pub fn tile(channel_uri: impl Into<String>, xml: impl Into<String>) -> Self {
        Self::with_kind(
            channel_uri,
            WnsKind::Tile {
                cache_policy: None,
                tag: None,
            },
            WnsBody::Xml(xml.into()),
        )
    }

    /// Badge update with an XML payload.
    pub fn badge(channel_uri: impl Into<String>, xml: impl Into<String>) -> Self {
        Self::with_kind(
            channel_uri,
            WnsKind::Badge { cache_policy: None },
            WnsBody::Xml(xml.into()),
        )
    }

    /// Raw notification carrying opaque bytes.
    pub fn raw(channel_uri: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::with_kind(channel_uri, WnsKind::Raw, WnsBody::Raw(data.into()))
    }

    /// Sets `X-WNS-TTL` (seconds).
    #[must_use]
    pub fn with_time_to_live(mut self, seconds: u32) -> Self {
        self.time_to_live = Some(seconds);
        self
    }

    /// Sets `X-WNS-RequestForStatus`.
    #[must_use]
    pub fn with_request_for_status(mut self, enabled: bool) -> Self {
        self.request_for_status = Some(enabled);
        self
    }

    /// Sets the cache policy; ignored for kinds without one (toast, raw).
    #[must_use]
    pub fn with_cache_policy(mut self, policy: WnsCachePolicy) -> Self {
        match &mut self.kind {
            WnsKind::Tile { cache_policy, .. } | WnsKind::Badge { cache_policy } => {
                *cache_policy = Some(policy);
            }
            WnsKind::Toast | WnsKind::Raw => {}
        }
        self
    }

    /// Sets the tile tag; ignored for every kind but tile.
    #[must_use]
    pub fn with_tag(mut self, value: impl Into<String>) -> Self {
        if let WnsKind::Tile { tag, .. } = &mut self.kind {
            *tag = Some(value.into());
        }
        self
    }
}

impl Notification for WnsNotification {
    fn target(&self) -> &str {
        &self.channel_uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_specific_setters() {
        let badge = WnsNotification::badge("uri", "<badge value=\"3\"/>")
            .with_cache_policy(WnsCachePolicy::NoCache)
            .with_tag("ignored");
        assert_eq!(
            badge.kind,
            WnsKind::Badge {
                cache_policy: Some(WnsCachePolicy::NoCache)
            }
        );

        let toast = WnsNotification::toast("uri", "<toast/>").with_cache_policy(WnsCachePolicy::Cache);
        assert_eq!(toast.kind, WnsKind::Toast);
    }

    #[test]
    fn test_raw_carries_bytes() {
        let raw = WnsNotification::raw("uri", vec![0u8, 1, 2]).with_request_for_status(true);
        assert_eq!(raw.body, WnsBody::Raw(vec![0, 1, 2]));
        assert_eq!(raw.kind.wns_type(), "wns/raw");
        assert_eq!(raw.request_for_status, Some(true));
        assert_eq!(raw.target(), "uri");
    }
}
