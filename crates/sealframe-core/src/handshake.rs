//! Key exchange state machine.
//!
//! Pure (sans-IO) state machine in the action pattern: methods consume
//! records and return actions for the driver to execute. This keeps the
//! machine independent of the transport and makes every transition directly
//! testable.
//!
//! Both roles run the same record sequence - Hello, then ExchangeValue and
//! ExchangeSignature - so either peer may initiate; the role only decides
//! the salt concatenation order during key derivation.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ send Hello ┌─────────────┐ recv Hello ┌─────────────────┐
//! │ Init │───────────>│ SentAuthKey │───────────>│ ReceivedAuthKey │
//! └──────┘            └─────────────┘            └────────┬────────┘
//!                                                         │ send value+sig
//!                                                         ▼
//!      ┌────────────┐  derive  ┌───────────────────────┐ recv value+sig
//!      │ KeyDerived │<─────────│ ReceivedExchangeValue │<──(verified)────┐
//!      └─────┬──────┘          └───────────────────────┘                 │
//!            │ into_cipher                               ┌───────────────┴───┐
//!            ▼                                           │ SentExchangeValue │
//!      ┌──────┐                                          └───────────────────┘
//!      │ Done │     Any state ──(bad record / bad signature / suite
//!      └──────┘      mismatch)──> Aborted
//! ```
//!
//! # Security
//!
//! - The peer's signature is verified before its exchange value is combined
//!   with ours; an invalid signature aborts with no partial key material.
//! - Abort is terminal: an aborted machine refuses every further operation,
//!   so no degraded key can ever be released.

use rand::{CryptoRng, RngCore};

use sealframe_crypto::{
    CipherSuite, ConfigError, EphemeralExchange, FrameCipher, SessionIdentity, SessionKey,
    derive_session_key, exchange_transcript, verify_exchange_signature,
};
use sealframe_proto::{
    ExchangeSignature, ExchangeValue, HandshakeRecord, Hello, ProtocolError, RecordKind,
};

use crate::error::SessionError;

/// Which side of the connection this peer is.
///
/// The initiator is the peer that dialed; the responder accepted. The role
/// fixes the salt concatenation order so both peers derive identical keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Dialing peer; its salt sorts first in key derivation
    Initiator,
    /// Accepting peer
    Responder,
}

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing sent or received yet
    Init,
    /// Our Hello (identity key + salt) is on the wire
    SentAuthKey,
    /// Peer's Hello accepted (version and suite verified)
    ReceivedAuthKey,
    /// Our exchange value and signature are on the wire
    SentExchangeValue,
    /// Peer's exchange value accepted (signature verified)
    ReceivedExchangeValue,
    /// Session key derived and ready to hand over
    KeyDerived,
    /// Session key handed to the streaming layer
    Done,
    /// Terminal failure; no key was or will be released
    Aborted,
}

/// Actions returned by the state machine for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Send this record to the peer as one framed message
    Send(HandshakeRecord),
}

/// Key exchange engine for one session.
///
/// Owns the per-session identity and ephemeral exchange secrets. The
/// ephemeral secret is consumed during derivation and the session key is
/// surrendered exactly once via [`into_cipher`](Self::into_cipher).
pub struct Handshake {
    role: Role,
    suite: CipherSuite,
    state: HandshakeState,
    identity: SessionIdentity,
    exchange: Option<EphemeralExchange>,
    local_salt: [u8; 32],
    peer_identity: Option<[u8; 32]>,
    peer_salt: Option<[u8; 32]>,
    peer_exchange: Option<[u8; 32]>,
    session_key: Option<SessionKey>,
}

impl Handshake {
    /// Create a handshake with fresh identity, ephemeral, and salt.
    pub fn new<R: RngCore + CryptoRng>(role: Role, suite: CipherSuite, rng: &mut R) -> Self {
        let identity = SessionIdentity::generate(rng);
        let exchange = EphemeralExchange::generate(rng);
        let mut local_salt = [0u8; 32];
        rng.fill_bytes(&mut local_salt);

        Self {
            role,
            suite,
            state: HandshakeState::Init,
            identity,
            exchange: Some(exchange),
            local_salt,
            peer_identity: None,
            peer_salt: None,
            peer_exchange: None,
            session_key: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// This peer's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// True once the session key is derived and ready to hand over.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == HandshakeState::KeyDerived
    }

    /// Begin the handshake by emitting our Hello.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` if not in `Init`
    pub fn start(&mut self) -> Result<Vec<HandshakeAction>, SessionError> {
        if self.state != HandshakeState::Init {
            return Err(SessionError::InvalidState { state: self.state, operation: "start" });
        }

        self.state = HandshakeState::SentAuthKey;

        let hello = HandshakeRecord::Hello(Hello {
            suite: self.suite.to_wire(),
            identity_key: self.identity.verifying_key_bytes(),
            salt: self.local_salt,
        });

        Ok(vec![HandshakeAction::Send(hello)])
    }

    /// Process one record from the peer.
    ///
    /// On any error the machine moves to `Aborted` and refuses further
    /// operations.
    ///
    /// # Errors
    ///
    /// - `SessionError::Config` on suite mismatch or unknown suite byte
    /// - `SessionError::Crypto` on signature failure or degenerate exchange
    ///   value
    /// - `SessionError::Protocol` on an out-of-sequence record
    /// - `SessionError::InvalidState` if no record is expected in this state
    pub fn handle_record(
        &mut self,
        record: HandshakeRecord,
    ) -> Result<Vec<HandshakeAction>, SessionError> {
        match (self.state, record) {
            (HandshakeState::SentAuthKey, HandshakeRecord::Hello(hello)) => {
                self.handle_hello(&hello)
            },
            (HandshakeState::SentExchangeValue, HandshakeRecord::ExchangeValue(value))
                if self.peer_exchange.is_none() =>
            {
                self.peer_exchange = Some(value.value);
                Ok(vec![])
            },
            (HandshakeState::SentExchangeValue, HandshakeRecord::ExchangeSignature(sig))
                if self.peer_exchange.is_some() =>
            {
                self.handle_exchange_signature(&sig)
            },
            (
                HandshakeState::Init
                | HandshakeState::ReceivedAuthKey
                | HandshakeState::ReceivedExchangeValue
                | HandshakeState::KeyDerived
                | HandshakeState::Done
                | HandshakeState::Aborted,
                _,
            ) => {
                let state = self.state;
                Err(self.abort(SessionError::InvalidState { state, operation: "handle_record" }))
            },
            (state, record) => {
                let expected = match state {
                    HandshakeState::SentAuthKey => RecordKind::Hello,
                    _ if self.peer_exchange.is_none() => RecordKind::ExchangeValue,
                    _ => RecordKind::ExchangeSignature,
                };
                Err(self.abort(ProtocolError::UnexpectedRecord {
                    expected,
                    actual: record.kind(),
                }))
            },
        }
    }

    /// Surrender the derived key as a ready frame cipher.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` if the key has not been derived
    pub fn into_cipher(mut self) -> Result<FrameCipher, SessionError> {
        if self.state != HandshakeState::KeyDerived {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "into_cipher",
            });
        }

        let Some(key) = self.session_key.take() else {
            unreachable!("KeyDerived state always holds a session key");
        };

        self.state = HandshakeState::Done;
        Ok(FrameCipher::new(self.suite, &key))
    }

    fn handle_hello(&mut self, hello: &Hello) -> Result<Vec<HandshakeAction>, SessionError> {
        let Some(peer_suite) = CipherSuite::from_wire(hello.suite) else {
            return Err(self.abort(ConfigError::UnknownSuite { wire: hello.suite }));
        };

        if peer_suite != self.suite {
            let local = self.suite;
            return Err(self.abort(ConfigError::SuiteMismatch { local, peer: peer_suite }));
        }

        self.peer_identity = Some(hello.identity_key);
        self.peer_salt = Some(hello.salt);
        self.state = HandshakeState::ReceivedAuthKey;

        // Emit our exchange value, signed over the now-complete salt pair.
        let Some(exchange) = self.exchange.as_ref() else {
            unreachable!("ephemeral exchange is present until derivation");
        };
        let value = exchange.public_value();

        let (initiator_salt, responder_salt) = self.ordered_salts();
        let transcript =
            exchange_transcript(self.suite, &initiator_salt, &responder_salt, &value);
        let signature = self.identity.sign(&transcript);

        self.state = HandshakeState::SentExchangeValue;

        Ok(vec![
            HandshakeAction::Send(HandshakeRecord::ExchangeValue(ExchangeValue { value })),
            HandshakeAction::Send(HandshakeRecord::ExchangeSignature(ExchangeSignature {
                signature,
            })),
        ])
    }

    fn handle_exchange_signature(
        &mut self,
        sig: &ExchangeSignature,
    ) -> Result<Vec<HandshakeAction>, SessionError> {
        let (Some(peer_identity), Some(peer_value)) = (self.peer_identity, self.peer_exchange)
        else {
            unreachable!("SentExchangeValue with peer_exchange set implies a completed Hello");
        };

        // Verify before the peer's value touches our secret.
        let (initiator_salt, responder_salt) = self.ordered_salts();
        let transcript =
            exchange_transcript(self.suite, &initiator_salt, &responder_salt, &peer_value);

        if let Err(err) = verify_exchange_signature(&peer_identity, &transcript, &sig.signature) {
            return Err(self.abort(err));
        }

        self.state = HandshakeState::ReceivedExchangeValue;

        let Some(exchange) = self.exchange.take() else {
            unreachable!("ephemeral exchange is present until derivation");
        };
        let shared = match exchange.agree(&peer_value) {
            Ok(shared) => shared,
            Err(err) => return Err(self.abort(err)),
        };

        let key = derive_session_key(&shared, &initiator_salt, &responder_salt, self.suite);
        self.session_key = Some(key);
        self.state = HandshakeState::KeyDerived;

        Ok(vec![])
    }

    /// Both salts in derivation order: initiator's contribution first.
    fn ordered_salts(&self) -> ([u8; 32], [u8; 32]) {
        let Some(peer_salt) = self.peer_salt else {
            unreachable!("ordered_salts is only called after the peer Hello was accepted");
        };
        match self.role {
            Role::Initiator => (self.local_salt, peer_salt),
            Role::Responder => (peer_salt, self.local_salt),
        }
    }

    fn abort(&mut self, err: impl Into<SessionError>) -> SessionError {
        self.state = HandshakeState::Aborted;
        self.exchange = None;
        self.session_key = None;
        err.into()
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("role", &self.role)
            .field("suite", &self.suite)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
