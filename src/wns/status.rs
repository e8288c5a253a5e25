//! # WNS response status and outcome classification.
//!
//! [`WnsNotificationStatus::parse`] reads the response headers WNS returns:
//!
//! | Header                          | Values                                     | Default             |
//! |---------------------------------|--------------------------------------------|---------------------|
//! | `X-WNS-Debug-Trace`             | string                                     | empty               |
//! | `X-WNS-DeviceConnectionStatus`  | connected / disconnected / tempdisconnected| connected           |
//! | `X-WNS-Error-Description`       | string                                     | empty               |
//! | `X-WNS-Msg-ID`                  | string (max 16 chars)                      | none                |
//! | `X-WNS-NotificationStatus`      | received / dropped / channelthrottled      | channel-throttled   |
//!
//! Header names and values are matched case-insensitively. `X-NotificationStatus` is
//! accepted as a fallback for the notification status; an unrecognized device status
//! is taken as disconnected.
//!
//! [`classify`] maps a parsed status onto the send contract:
//! ```text
//! 200 + received ─► Ok(())
//! 401            ─► SendError::RetryAfter (now + 5s)
//! 404 | 410      ─► SendError::TargetExpired
//! otherwise      ─► SendError::Protocol(status)
//! ```

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{StatusCode, header::HeaderMap};

use crate::error::SendError;

const DEBUG_TRACE: &str = "x-wns-debug-trace";
const DEVICE_CONNECTION_STATUS: &str = "x-wns-deviceconnectionstatus";
const ERROR_DESCRIPTION: &str = "x-wns-error-description";
const MSG_ID: &str = "x-wns-msg-id";
const NOTIFICATION_STATUS: &str = "x-wns-notificationstatus";
const NOTIFICATION_STATUS_FALLBACK: &str = "x-notificationstatus";

/// Seconds before a resend makes sense after an authentication failure.
pub const AUTH_RETRY_DELAY_SECS: i64 = 5;

/// Outcome WNS reports for the notification itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WnsSendStatus {
    /// Accepted for delivery.
    Received,
    /// Dropped (e.g. explicit error or device offline without caching).
    Dropped,
    /// Dropped because the channel is throttled; also used when the header is absent.
    ChannelThrottled,
}

/// Device connectivity reported when `RequestForStatus` was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WnsDeviceConnectionStatus {
    /// Device is online.
    Connected,
    /// Device is offline.
    Disconnected,
    /// Device is temporarily unreachable.
    TempDisconnected,
}

/// Full structured status of one WNS send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WnsNotificationStatus {
    /// Channel URI the attempt targeted.
    pub channel_uri: String,
    /// HTTP status code of the response.
    pub http_status: StatusCode,
    /// WNS notification status.
    pub notification_status: WnsSendStatus,
    /// Device connectivity hint.
    pub device_connection_status: WnsDeviceConnectionStatus,
    /// WNS message id, if returned.
    pub message_id: Option<String>,
    /// Debug trace for support requests.
    pub debug_trace: String,
    /// Human-readable error description.
    pub error_description: String,
}

impl WnsNotificationStatus {
    /// Parses status code and headers of a WNS response.
    pub fn parse(channel_uri: &str, http_status: StatusCode, headers: &HeaderMap) -> Self {
        let notification_status = header(headers, NOTIFICATION_STATUS)
            .or_else(|| header(headers, NOTIFICATION_STATUS_FALLBACK))
            .map(parse_send_status)
            .unwrap_or(WnsSendStatus::ChannelThrottled);

        let device_connection_status = header(headers, DEVICE_CONNECTION_STATUS)
            .map(parse_device_status)
            .unwrap_or(WnsDeviceConnectionStatus::Connected);

        Self {
            channel_uri: channel_uri.to_string(),
            http_status,
            notification_status,
            device_connection_status,
            message_id: header(headers, MSG_ID).map(str::to_string),
            debug_trace: header(headers, DEBUG_TRACE).unwrap_or_default().to_string(),
            error_description: header(headers, ERROR_DESCRIPTION)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl fmt::Display for WnsNotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "msg_id={} http_status={} notification_status={} device_status={:?} debug={} error={}",
            self.message_id.as_deref().unwrap_or("-"),
            self.http_status.as_u16(),
            self.notification_status,
            self.device_connection_status,
            self.debug_trace,
            self.error_description,
        )
    }
}

impl std::error::Error for WnsNotificationStatus {}

impl fmt::Display for WnsSendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WnsSendStatus::Received => "received",
            WnsSendStatus::Dropped => "dropped",
            WnsSendStatus::ChannelThrottled => "channelthrottled",
        })
    }
}

/// Maps a parsed status onto the send contract.
pub fn classify(status: WnsNotificationStatus, now: DateTime<Utc>) -> Result<(), SendError> {
    match status.http_status {
        StatusCode::OK if status.notification_status == WnsSendStatus::Received => Ok(()),
        StatusCode::UNAUTHORIZED => Err(SendError::RetryAfter {
            reason: "access token expired".to_string(),
            retry_not_before: now + TimeDelta::seconds(AUTH_RETRY_DELAY_SECS),
        }),
        StatusCode::NOT_FOUND | StatusCode::GONE => Err(SendError::TargetExpired {
            old_target: status.channel_uri,
            expired_at: now,
        }),
        _ => Err(SendError::protocol(status)),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn parse_send_status(raw: &str) -> WnsSendStatus {
    if raw.eq_ignore_ascii_case("received") {
        WnsSendStatus::Received
    } else if raw.eq_ignore_ascii_case("dropped") {
        WnsSendStatus::Dropped
    } else {
        WnsSendStatus::ChannelThrottled
    }
}

fn parse_device_status(raw: &str) -> WnsDeviceConnectionStatus {
    if raw.eq_ignore_ascii_case("connected") {
        WnsDeviceConnectionStatus::Connected
    } else if raw.eq_ignore_ascii_case("tempdisconnected") {
        WnsDeviceConnectionStatus::TempDisconnected
    } else {
        WnsDeviceConnectionStatus::Disconnected
    }
}
