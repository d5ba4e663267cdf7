//! Server hello / client auth handshake records and the SHA-256 token
//! derivation used to authenticate against a remote analyzer.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::buffer::{Cursor, GrowBuf};
use crate::codec::{WireRead, WireWrite};
use crate::error::{RemoteError, Result};

pub const PROTOCOL_VERSION_MAJOR: u8 = 1;
pub const PROTOCOL_VERSION_MINOR: u8 = 0;

pub const AUTH_MODE_USER_PASSWORD: u8 = 1;
pub const ENC_TYPE_NONE: u8 = 0;

/// Size of the auth salt and the derived token, both SHA-256 blocks.
pub const SHA256_BLOCK_SIZE: usize = 32;

/// The first PDU a server sends: its identity, protocol version, and the
/// salt the client must fold into its auth token.
#[derive(Debug, Clone)]
pub struct ServerHello {
    pub server_name: String,
    pub protocol_version_major: u8,
    pub protocol_version_minor: u8,
    pub auth_mode: u8,
    pub enc_type: u8,
    pub salt: [u8; SHA256_BLOCK_SIZE],
}

impl ServerHello {
    /// Builds a hello for `name`, generating a fresh salt from a
    /// cryptographically secure RNG (the design notes flag the original
    /// `rand()`-seeded salt as inadequate; this upgrades it).
    pub fn new(name: impl Into<String>) -> Self {
        let mut salt = [0u8; SHA256_BLOCK_SIZE];
        OsRng.fill_bytes(&mut salt);
        Self {
            server_name: name.into(),
            protocol_version_major: PROTOCOL_VERSION_MAJOR,
            protocol_version_minor: PROTOCOL_VERSION_MINOR,
            auth_mode: AUTH_MODE_USER_PASSWORD,
            enc_type: ENC_TYPE_NONE,
            salt,
        }
    }

    pub fn serialize(&self, buf: &mut GrowBuf) {
        buf.put_str(&self.server_name);
        buf.put_u8(self.protocol_version_major);
        buf.put_u8(self.protocol_version_minor);
        buf.put_u8(self.auth_mode);
        buf.put_u8(self.enc_type);
        buf.put_blob(&self.salt);
    }

    pub fn deserialize(cur: &mut Cursor<'_>) -> Result<Self> {
        let server_name = cur.get_str()?;
        let protocol_version_major = cur.get_u8()?;
        let protocol_version_minor = cur.get_u8()?;
        let auth_mode = cur.get_u8()?;
        let enc_type = cur.get_u8()?;
        let salt_vec = cur.get_blob()?;
        let salt: [u8; SHA256_BLOCK_SIZE] = salt_vec.try_into().map_err(|v: Vec<u8>| {
            RemoteError::Protocol(format!(
                "invalid salt size {} (expected {SHA256_BLOCK_SIZE})",
                v.len()
            ))
        })?;

        Ok(Self {
            server_name,
            protocol_version_major,
            protocol_version_minor,
            auth_mode,
            enc_type,
            salt,
        })
    }
}

/// The client's reply to a [`ServerHello`]: identity plus the derived
/// auth token.
#[derive(Debug, Clone)]
pub struct ClientAuth {
    pub client_name: String,
    pub protocol_version_major: u8,
    pub protocol_version_minor: u8,
    pub user: String,
    pub token: [u8; SHA256_BLOCK_SIZE],
}

impl ClientAuth {
    pub fn new(hello: &ServerHello, client_name: impl Into<String>, user: &str, password: &str) -> Self {
        Self {
            client_name: client_name.into(),
            protocol_version_major: PROTOCOL_VERSION_MAJOR,
            protocol_version_minor: PROTOCOL_VERSION_MINOR,
            user: user.to_string(),
            token: compute_auth_token(user, password, &hello.salt),
        }
    }

    pub fn serialize(&self, buf: &mut GrowBuf) {
        buf.put_str(&self.client_name);
        buf.put_u8(self.protocol_version_major);
        buf.put_u8(self.protocol_version_minor);
        buf.put_str(&self.user);
        buf.put_blob(&self.token);
    }

    pub fn deserialize(cur: &mut Cursor<'_>) -> Result<Self> {
        let client_name = cur.get_str()?;
        let protocol_version_major = cur.get_u8()?;
        let protocol_version_minor = cur.get_u8()?;
        let user = cur.get_str()?;
        let token_vec = cur.get_blob()?;
        let token: [u8; SHA256_BLOCK_SIZE] = token_vec.try_into().map_err(|v: Vec<u8>| {
            RemoteError::Protocol(format!(
                "invalid token size {} (expected {SHA256_BLOCK_SIZE})",
                v.len()
            ))
        })?;

        Ok(Self {
            client_name,
            protocol_version_major,
            protocol_version_minor,
            user,
            token,
        })
    }
}

/// `token = SHA-256(user || 0x00 || password || 0x00 || salt)`.
pub fn compute_auth_token(user: &str, password: &str, salt: &[u8; SHA256_BLOCK_SIZE]) -> [u8; SHA256_BLOCK_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(user.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hasher.update([0u8]);
    hasher.update(salt);
    hasher.finalize().into()
}
