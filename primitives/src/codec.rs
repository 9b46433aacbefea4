//! Signed transaction envelope and its deterministic binary encoding.
//!
//! ## Wire Format (little-endian)
//!
//! ```text
//! [sender: 32 bytes]
//! [nonce: 8 bytes LE]
//! [payload_type: 1 byte]
//!   0x01 = Transfer          { to: 32, amount: 16 }
//!   0x02 = TransferToCluster { amount: 16 }
//!   0x03 = Instantiate       { code_hash: 32, salt: var, call_data: var,
//!                              gas_limit: (kind: 1, raw: 16),
//!                              storage_deposit_limit: 16, value: 16 }
//! [public_key: 32 bytes]
//! [signature: 64 bytes]
//! ```
//!
//! `var` fields are a u32 LE length followed by the bytes, so a field longer
//! than `u32::MAX` cannot be encoded. The signature covers everything before
//! the public key field. The transaction hash is SHA-256 over the full
//! envelope.

use serde::Serialize;

use crate::cost::GasLimit;
use crate::crypto::{hash_sha256, verify_ed25519, Account};
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::types::{Address, Balance, CodeHash, Hash, TxHash};

const PAYLOAD_TRANSFER: u8 = 0x01;
const PAYLOAD_TRANSFER_TO_CLUSTER: u8 = 0x02;
const PAYLOAD_INSTANTIATE: u8 = 0x03;

const GAS_LIMIT_VALUE: u8 = 0;
const GAS_LIMIT_UNITS: u8 = 1;

/// Operations this client submits to the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPayload {
    /// Move funds between base-chain accounts.
    Transfer { to: Address, amount: Balance },
    /// Move funds from the sender's base-chain account into its cluster balance.
    TransferToCluster { amount: Balance },
    /// Create a contract instance from uploaded code.
    Instantiate {
        code_hash: CodeHash,
        salt: Vec<u8>,
        call_data: Vec<u8>,
        gas_limit: GasLimit,
        storage_deposit_limit: Balance,
        value: Balance,
    },
}

/// A transaction signed by its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub sender: Address,
    pub nonce: u64,
    pub payload: TransactionPayload,
    pub public_key: [u8; 32],
    pub signature: [u8; 64],
}

impl SignedTransaction {
    /// Sign `payload` as `account` with the given nonce.
    pub fn sign(
        account: &Account,
        nonce: u64,
        payload: TransactionPayload,
    ) -> PrimitiveResult<Self> {
        let sender = account.address();
        let signed = encode_signed_portion(&sender, nonce, &payload)?;
        Ok(Self {
            sender,
            nonce,
            payload,
            public_key: account.public_key(),
            signature: account.sign(&signed),
        })
    }

    /// The bytes covered by the signature.
    pub fn signed_data(&self) -> PrimitiveResult<Vec<u8>> {
        encode_signed_portion(&self.sender, self.nonce, &self.payload)
    }

    /// Verify the signature against the embedded public key.
    /// An unencodable payload never verifies.
    pub fn verify(&self) -> bool {
        match self.signed_data() {
            Ok(signed) => {
                self.sender == self.public_key
                    && verify_ed25519(&signed, &self.signature, &self.public_key)
            }
            Err(_) => false,
        }
    }

    /// Encode the full envelope.
    pub fn encode(&self) -> PrimitiveResult<Vec<u8>> {
        let mut raw = self.signed_data()?;
        raw.extend_from_slice(&self.public_key);
        raw.extend_from_slice(&self.signature);
        Ok(raw)
    }

    /// SHA-256 of the encoded envelope.
    pub fn hash(&self) -> PrimitiveResult<TxHash> {
        Ok(hash_sha256(&self.encode()?))
    }

    /// Decode an envelope produced by [`encode`](Self::encode).
    pub fn decode(raw: &[u8]) -> PrimitiveResult<Self> {
        let mut reader = Reader::new(raw);
        let sender = reader.read_hash()?;
        let nonce = reader.read_u64()?;
        let payload_type = reader.read_u8()?;

        let payload = match payload_type {
            PAYLOAD_TRANSFER => TransactionPayload::Transfer {
                to: reader.read_hash()?,
                amount: reader.read_u128()?,
            },
            PAYLOAD_TRANSFER_TO_CLUSTER => TransactionPayload::TransferToCluster {
                amount: reader.read_u128()?,
            },
            PAYLOAD_INSTANTIATE => {
                let code_hash = reader.read_hash()?;
                let salt = reader.read_var_bytes()?;
                let call_data = reader.read_var_bytes()?;
                let gas_limit = match reader.read_u8()? {
                    GAS_LIMIT_VALUE => GasLimit::Value(reader.read_u128()?),
                    GAS_LIMIT_UNITS => {
                        let raw = reader.read_u128()?;
                        let units = u64::try_from(raw).map_err(|_| {
                            PrimitiveError::SerializationError("gas units exceed u64".into())
                        })?;
                        GasLimit::Units(units)
                    }
                    other => {
                        return Err(PrimitiveError::SerializationError(format!(
                            "unknown gas limit kind: 0x{:02x}",
                            other
                        )))
                    }
                };
                TransactionPayload::Instantiate {
                    code_hash,
                    salt,
                    call_data,
                    gas_limit,
                    storage_deposit_limit: reader.read_u128()?,
                    value: reader.read_u128()?,
                }
            }
            other => {
                return Err(PrimitiveError::SerializationError(format!(
                    "unknown payload type: 0x{:02x}",
                    other
                )))
            }
        };

        let public_key = reader.read_hash()?;
        let signature = reader.read_signature()?;
        if reader.remaining() != 0 {
            return Err(PrimitiveError::SerializationError(format!(
                "{} trailing bytes",
                reader.remaining()
            )));
        }

        Ok(Self {
            sender,
            nonce,
            payload,
            public_key,
            signature,
        })
    }
}

fn encode_signed_portion(
    sender: &Address,
    nonce: u64,
    payload: &TransactionPayload,
) -> PrimitiveResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(128);
    buf.extend_from_slice(sender);
    write_u64(&mut buf, nonce);
    match payload {
        TransactionPayload::Transfer { to, amount } => {
            buf.push(PAYLOAD_TRANSFER);
            buf.extend_from_slice(to);
            write_u128(&mut buf, *amount);
        }
        TransactionPayload::TransferToCluster { amount } => {
            buf.push(PAYLOAD_TRANSFER_TO_CLUSTER);
            write_u128(&mut buf, *amount);
        }
        TransactionPayload::Instantiate {
            code_hash,
            salt,
            call_data,
            gas_limit,
            storage_deposit_limit,
            value,
        } => {
            buf.push(PAYLOAD_INSTANTIATE);
            buf.extend_from_slice(code_hash);
            write_var_bytes(&mut buf, salt)?;
            write_var_bytes(&mut buf, call_data)?;
            match gas_limit {
                GasLimit::Value(v) => {
                    buf.push(GAS_LIMIT_VALUE);
                    write_u128(&mut buf, *v);
                }
                GasLimit::Units(u) => {
                    buf.push(GAS_LIMIT_UNITS);
                    write_u128(&mut buf, u128::from(*u));
                }
            }
            write_u128(&mut buf, *storage_deposit_limit);
            write_u128(&mut buf, *value);
        }
    }
    Ok(buf)
}

// ── Encoding helpers ──

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u128(buf: &mut Vec<u8>, v: u128) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_var_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> PrimitiveResult<()> {
    write_u32(buf, length_prefix(bytes.len())?);
    buf.extend_from_slice(bytes);
    Ok(())
}

fn length_prefix(len: usize) -> PrimitiveResult<u32> {
    u32::try_from(len).map_err(|_| {
        PrimitiveError::SerializationError(format!(
            "field of {} bytes exceeds the u32 length prefix",
            len
        ))
    })
}

/// A cursor for reading bytes during decoding.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_bytes(&mut self, n: usize) -> PrimitiveResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(PrimitiveError::SerializationError(
                "unexpected end of data".into(),
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> PrimitiveResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_u8(&mut self) -> PrimitiveResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> PrimitiveResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> PrimitiveResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_u128(&mut self) -> PrimitiveResult<u128> {
        Ok(u128::from_le_bytes(self.read_array()?))
    }

    fn read_hash(&mut self) -> PrimitiveResult<Hash> {
        self.read_array()
    }

    fn read_signature(&mut self) -> PrimitiveResult<[u8; 64]> {
        self.read_array()
    }

    fn read_var_bytes(&mut self) -> PrimitiveResult<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }
}
