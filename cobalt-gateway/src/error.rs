//! Gateway error types and the close-code recovery policy.

use thiserror::Error;

/// Errors that can occur during Gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// WebSocket connection or protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Malformed payload, missing required field, or undecodable frame.
    /// Fatal for the session; the shard reconnects with a fresh identify.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Session was invalidated by Discord.
    /// The boolean indicates if the session is resumable.
    #[error("session invalidated, resumable: {resumable}")]
    InvalidSession {
        /// Whether the session can be resumed.
        resumable: bool,
    },

    /// Connection was closed.
    #[error("connection closed: code={code:?}, reason={reason}")]
    Closed {
        /// WebSocket close code, if one was delivered.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },

    /// Two consecutive heartbeats went unacknowledged.
    #[error("heartbeat acknowledgment timeout")]
    HeartbeatTimeout,

    /// Authentication failed (close code 4004: invalid token).
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The gateway rejected this shard configuration (4010/4011).
    #[error("invalid shard configuration: {0}")]
    InvalidShardConfig(String),

    /// Unrecoverable close code; the shard is dead.
    #[error("fatal close code {code}: {reason}")]
    FatalClose {
        /// WebSocket close code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// Failed to send through a channel (receiver dropped).
    #[error("channel send error: {0}")]
    ChannelSend(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shard is not running or not found.
    #[error("shard {0} not available")]
    ShardUnavailable(u16),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Protocol(err.to_string())
    }
}

impl<T> From<flume::SendError<T>> for GatewayError {
    fn from(err: flume::SendError<T>) -> Self {
        GatewayError::ChannelSend(err.to_string())
    }
}

/// What a shard should do after its socket closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Reconnect and resume with the held session ID and sequence.
    Resume,
    /// Reconnect, discard the session, send a fresh identify.
    Reidentify,
    /// Do not reconnect; the shard is dead.
    Fatal,
}

/// Discord Gateway close codes.
///
/// See: <https://discord.com/developers/docs/topics/opcodes-and-status-codes#gateway-gateway-close-event-codes>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred.
    UnknownError = 4000,
    /// Invalid opcode sent.
    UnknownOpcode = 4001,
    /// Invalid payload (decode error).
    DecodeError = 4002,
    /// Payload sent before identifying.
    NotAuthenticated = 4003,
    /// Invalid token.
    AuthenticationFailed = 4004,
    /// Already authenticated.
    AlreadyAuthenticated = 4005,
    /// Invalid sequence number for resume.
    InvalidSeq = 4007,
    /// Rate limited on the gateway.
    RateLimited = 4008,
    /// Session timed out.
    SessionTimedOut = 4009,
    /// Invalid shard configuration.
    InvalidShard = 4010,
    /// Too many guilds (sharding required).
    ShardingRequired = 4011,
    /// Invalid API version.
    InvalidApiVersion = 4012,
    /// Invalid intents.
    InvalidIntents = 4013,
    /// Disallowed intents (privileged intent not enabled).
    DisallowedIntents = 4014,
}

impl CloseCode {
    /// Whether this close code can never be recovered from.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            CloseCode::AuthenticationFailed
                | CloseCode::InvalidShard
                | CloseCode::ShardingRequired
                | CloseCode::InvalidApiVersion
                | CloseCode::InvalidIntents
                | CloseCode::DisallowedIntents
        )
    }

    /// Whether the session must be discarded before reconnecting.
    pub const fn drops_session(self) -> bool {
        matches!(self, CloseCode::InvalidSeq | CloseCode::SessionTimedOut)
    }

    /// Try to convert a u16 close code to this enum.
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            4000 => Some(CloseCode::UnknownError),
            4001 => Some(CloseCode::UnknownOpcode),
            4002 => Some(CloseCode::DecodeError),
            4003 => Some(CloseCode::NotAuthenticated),
            4004 => Some(CloseCode::AuthenticationFailed),
            4005 => Some(CloseCode::AlreadyAuthenticated),
            4007 => Some(CloseCode::InvalidSeq),
            4008 => Some(CloseCode::RateLimited),
            4009 => Some(CloseCode::SessionTimedOut),
            4010 => Some(CloseCode::InvalidShard),
            4011 => Some(CloseCode::ShardingRequired),
            4012 => Some(CloseCode::InvalidApiVersion),
            4013 => Some(CloseCode::InvalidIntents),
            4014 => Some(CloseCode::DisallowedIntents),
            _ => None,
        }
    }

    /// Decide the recovery action for a close code.
    ///
    /// `None` covers local failures and unknown codes, both of which keep
    /// the session and resume.
    pub fn action(code: Option<u16>) -> ReconnectAction {
        match code.and_then(Self::from_code) {
            Some(cc) if cc.is_fatal() => ReconnectAction::Fatal,
            Some(cc) if cc.drops_session() => ReconnectAction::Reidentify,
            _ => ReconnectAction::Resume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_codes() {
        for code in [4000, 4001, 4002, 4003, 4005, 4008] {
            assert_eq!(
                CloseCode::action(Some(code)),
                ReconnectAction::Resume,
                "code {code}"
            );
        }
    }

    #[test]
    fn reidentify_codes() {
        assert_eq!(CloseCode::action(Some(4007)), ReconnectAction::Reidentify);
        assert_eq!(CloseCode::action(Some(4009)), ReconnectAction::Reidentify);
    }

    #[test]
    fn fatal_codes() {
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert_eq!(
                CloseCode::action(Some(code)),
                ReconnectAction::Fatal,
                "code {code}"
            );
        }
    }

    #[test]
    fn unknown_and_local_failures_resume() {
        assert_eq!(CloseCode::action(Some(1006)), ReconnectAction::Resume);
        assert_eq!(CloseCode::action(Some(4999)), ReconnectAction::Resume);
        assert_eq!(CloseCode::action(None), ReconnectAction::Resume);
    }

    #[test]
    fn authentication_failure_never_reconnects() {
        assert!(CloseCode::AuthenticationFailed.is_fatal());
        assert_eq!(CloseCode::action(Some(4004)), ReconnectAction::Fatal);
    }
}
