// src/providers/wallet.rs

use crate::schema::TypedValidator;
use crate::tools::{ToolDescriptor, ToolError, ToolProvider};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use tracing::info;
use validator::Validate;
use zeroize::Zeroizing;

lazy_static! {
    static ref PRIVATE_KEY_RE: Regex = Regex::new(r"^(0x)?[0-9a-fA-F]{64}$").unwrap();
    static ref ADDRESS_RE: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();
}

#[derive(Deserialize, Serialize, Validate, JsonSchema)]
pub struct DeriveAddressArgs {
    /// 32-byte secp256k1 private key, hex encoded, `0x` prefix optional.
    #[validate(regex(path = "PRIVATE_KEY_RE", message = "must be a 32-byte hex private key"))]
    pub private_key: String,
}

#[derive(Deserialize, Serialize, Validate, JsonSchema)]
pub struct ChecksumAddressArgs {
    /// 0x-prefixed EVM address in any letter case.
    #[validate(regex(path = "ADDRESS_RE", message = "must be a 0x-prefixed 20-byte hex address"))]
    pub address: String,
}

#[derive(Deserialize, Serialize, Validate, JsonSchema)]
pub struct GenerateWalletArgs {}

/// Offline key and address helpers. Arguments are checked by typed structs,
/// and the advertised schemas are generated from those structs.
#[derive(Default)]
pub struct WalletProvider;

impl WalletProvider {
    pub fn new() -> Self {
        Self
    }
}

/// EIP-55 mixed-case checksum of an address.
pub fn to_checksum_address(address: &str) -> String {
    let lower = address.trim_start_matches("0x").to_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(lower.len() + 2);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Address derived from a secp256k1 signing key: last 20 bytes of the
/// keccak256 hash of the uncompressed public key.
fn address_of(signing_key: &SigningKey) -> String {
    let public_key = PublicKey::from(signing_key.verifying_key());
    let point = public_key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    to_checksum_address(&hex::encode(&hash[12..]))
}

fn signing_key_from_hex(private_key: &str) -> Result<SigningKey, ToolError> {
    let bytes = Zeroizing::new(
        hex::decode(private_key.trim_start_matches("0x"))
            .map_err(|e| ToolError::InvalidArguments(format!("private_key: {}", e)))?,
    );
    SigningKey::from_slice(&bytes)
        .map_err(|_| ToolError::InvalidArguments("private_key: not a valid secp256k1 scalar".to_string()))
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

#[async_trait]
impl ToolProvider for WalletProvider {
    fn provider_name(&self) -> &str {
        "wallet"
    }

    fn list_tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::native(
                "derive_address",
                "Derive Address",
                "Derive the checksummed EVM address for a private key. Nothing is stored.",
                TypedValidator::<DeriveAddressArgs>::shared(),
            ),
            ToolDescriptor::native(
                "checksum_address",
                "Checksum Address",
                "Return the EIP-55 checksummed form of an EVM address.",
                TypedValidator::<ChecksumAddressArgs>::shared(),
            ),
            ToolDescriptor::native(
                "generate_wallet",
                "Generate Wallet",
                "Generate a fresh EVM key pair. The private key is returned once and not stored.",
                TypedValidator::<GenerateWalletArgs>::shared(),
            ),
        ]
    }

    async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match name {
            "derive_address" => {
                let args: DeriveAddressArgs = parse_args(args)?;
                let signing_key = signing_key_from_hex(&args.private_key)?;
                let address = address_of(&signing_key);
                Ok(json!({
                    "address": address,
                    "address_lowercase": address.to_lowercase(),
                }))
            }
            "checksum_address" => {
                let args: ChecksumAddressArgs = parse_args(args)?;
                let checksummed = to_checksum_address(&args.address);
                Ok(json!({
                    "address": checksummed,
                    "matches_input": checksummed == args.address,
                }))
            }
            "generate_wallet" => {
                let _: GenerateWalletArgs = parse_args(args)?;
                let signing_key = SigningKey::random(&mut OsRng);
                let address = address_of(&signing_key);
                info!(address = %address, "Generated new wallet");
                Ok(json!({
                    "address": address,
                    "private_key": format!("0x{}", hex::encode(signing_key.to_bytes())),
                }))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}
