//! Wire encoding of [`Eip712Envelope`].
//!
//! ```text
//! 0x71 ‖ rlp([
//!     nonce, max_priority_fee_per_gas, max_fee_per_gas, gas_limit,
//!     to | "", value, input,
//!     chain_id, "", "",
//!     chain_id, from, gas_per_pubdata_limit,
//!     [factory_dep, ..], custom_signature | "",
//!     [] | [paymaster, paymaster_input],
//! ])
//! ```
//!
//! The conventional `v, r, s` slots are kept for compatibility with other
//! typed transactions: `v` repeats the chain id and `r`, `s` stay empty.
//! Decoding is strict. Integers must be canonical and fit their declared
//! width, and nothing may follow the last field.

use alloy_rlp::{
    EMPTY_LIST_CODE,
    EMPTY_STRING_CODE,
    Encodable,
    Header,
};
use tracing::trace;

use super::{
    Eip712Envelope,
    FactoryDeps,
    PaymasterParams,
    TxType,
};
use crate::{
    bytecode::hash_bytecode,
    error::{
        CodecError,
        MalformedReason,
    },
    primitives::{
        Address,
        Bytes,
        CustomSignature,
        U256,
    },
};

const ADDRESS_LEN: usize = 20;

/// Encodes the envelope into its canonical wire form.
pub fn encode(envelope: &Eip712Envelope) -> Bytes {
    let mut fields = Vec::with_capacity(envelope.input.len() + 256);

    envelope.nonce.encode(&mut fields);
    envelope.max_priority_fee_per_gas.encode(&mut fields);
    envelope.gas_price.encode(&mut fields);
    envelope.gas_limit.encode(&mut fields);
    match &envelope.to {
        Some(to) => to.encode(&mut fields),
        None => fields.push(EMPTY_STRING_CODE),
    }
    envelope.value.encode(&mut fields);
    envelope.input.encode(&mut fields);

    envelope.chain_id.encode(&mut fields);
    fields.push(EMPTY_STRING_CODE);
    fields.push(EMPTY_STRING_CODE);

    envelope.chain_id.encode(&mut fields);
    envelope.from.encode(&mut fields);
    envelope.gas_per_pubdata_limit.encode(&mut fields);

    let mut deps = Vec::new();
    for code in envelope.factory_deps.codes() {
        code.encode(&mut deps);
    }
    encode_list(&deps, &mut fields);

    match &envelope.custom_signature {
        Some(signature) => signature.as_bytes().encode(&mut fields),
        None => fields.push(EMPTY_STRING_CODE),
    }

    match &envelope.paymaster {
        Some(params) => {
            let mut paymaster = Vec::new();
            params.paymaster.encode(&mut paymaster);
            params.input.encode(&mut paymaster);
            encode_list(&paymaster, &mut fields);
        }
        None => fields.push(EMPTY_LIST_CODE),
    }

    let mut out = Vec::with_capacity(fields.len() + 10);
    out.push(envelope.tx_type.marker());
    encode_list(&fields, &mut out);
    trace!(target: "envelope::codec", len = out.len(), "Encoded envelope");
    out.into()
}

/// Decodes an envelope, rejecting anything [`encode`] would not produce.
pub fn decode(raw: &[u8]) -> Result<Eip712Envelope, CodecError> {
    let (&marker, mut buf) = raw.split_first().ok_or(MalformedReason::Empty)?;
    let tx_type = TxType::try_from(marker)?;

    let mut fields = list(&mut buf, "envelope")?;
    if !buf.is_empty() {
        return Err(MalformedReason::TrailingBytes(buf.len()).into());
    }

    let nonce = uint_u64(&mut fields, "nonce")?;
    let max_priority_fee_per_gas = uint_u128(&mut fields, "max_priority_fee_per_gas")?;
    let gas_price = uint_u128(&mut fields, "max_fee_per_gas")?;
    let gas_limit = uint_u64(&mut fields, "gas_limit")?;
    let to = match string(&mut fields, "to")? {
        [] => None,
        raw => Some(address(raw, "to")?),
    };
    let value = uint_u256(&mut fields, "value")?;
    let input = Bytes::copy_from_slice(string(&mut fields, "input")?);

    let signature_chain_id = uint_u64(&mut fields, "v")?;
    let r = string(&mut fields, "r")?;
    let s = string(&mut fields, "s")?;
    if !r.is_empty() || !s.is_empty() {
        return Err(MalformedReason::ConventionalSignature.into());
    }

    let chain_id = uint_u64(&mut fields, "chain_id")?;
    if signature_chain_id != chain_id {
        return Err(MalformedReason::ChainIdMismatch {
            signature_slot: signature_chain_id,
            chain_id,
        }
        .into());
    }
    let from = address(string(&mut fields, "from")?, "from")?;
    let gas_per_pubdata_limit = uint_u64(&mut fields, "gas_per_pubdata_limit")?;

    let mut deps = list(&mut fields, "factory_deps")?;
    let mut factory_deps = FactoryDeps::new();
    let mut index = 0;
    while !deps.is_empty() {
        let code = string(&mut deps, "factory_dep")?;
        let hash = hash_bytecode(code)
            .map_err(|error| MalformedReason::InvalidFactoryDep { index, error })?;
        if !factory_deps.insert_hashed(hash, Bytes::copy_from_slice(code)) {
            return Err(MalformedReason::DuplicateFactoryDep(hash).into());
        }
        index += 1;
    }

    let custom_signature = CustomSignature::new(Bytes::copy_from_slice(string(
        &mut fields,
        "custom_signature",
    )?))
    .ok();

    let mut paymaster_fields = list(&mut fields, "paymaster")?;
    let paymaster = if paymaster_fields.is_empty() {
        None
    } else {
        let paymaster = string(&mut paymaster_fields, "paymaster")?;
        if paymaster.len() != ADDRESS_LEN {
            return Err(MalformedReason::Paymaster.into());
        }
        let input = string(&mut paymaster_fields, "paymaster_input")?;
        if !paymaster_fields.is_empty() {
            return Err(MalformedReason::Paymaster.into());
        }
        Some(PaymasterParams {
            paymaster: Address::from_slice(paymaster),
            input: Bytes::copy_from_slice(input),
        })
    };

    if !fields.is_empty() {
        return Err(MalformedReason::ExtraFields(fields.len()).into());
    }

    trace!(target: "envelope::codec", %from, nonce, chain_id, "Decoded envelope");
    Ok(Eip712Envelope {
        tx_type,
        chain_id,
        nonce,
        from,
        to,
        value,
        input,
        gas_limit,
        gas_price,
        max_priority_fee_per_gas,
        gas_per_pubdata_limit,
        factory_deps,
        custom_signature,
        paymaster,
    })
}

fn encode_list(payload: &[u8], out: &mut Vec<u8>) {
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(out);
    out.extend_from_slice(payload);
}

fn header(buf: &mut &[u8], field: &'static str) -> Result<Header, CodecError> {
    Ok(Header::decode(buf).map_err(|error| MalformedReason::Rlp { field, error })?)
}

fn take<'a>(buf: &mut &'a [u8], len: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
    if buf.len() < len {
        return Err(MalformedReason::Rlp {
            field,
            error: alloy_rlp::Error::InputTooShort,
        }
        .into());
    }
    let (payload, rest) = buf.split_at(len);
    *buf = rest;
    Ok(payload)
}

fn list<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a [u8], CodecError> {
    let header = header(buf, field)?;
    if !header.list {
        return Err(MalformedReason::ExpectedList(field).into());
    }
    take(buf, header.payload_length, field)
}

fn string<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a [u8], CodecError> {
    let header = header(buf, field)?;
    if header.list {
        return Err(MalformedReason::ExpectedString(field).into());
    }
    take(buf, header.payload_length, field)
}

fn address(raw: &[u8], field: &'static str) -> Result<Address, CodecError> {
    if raw.len() != ADDRESS_LEN {
        return Err(MalformedReason::InvalidAddress {
            field,
            len: raw.len(),
        }
        .into());
    }
    Ok(Address::from_slice(raw))
}

/// Big-endian integer of at most `bits` bits without leading zero bytes.
fn uint<'a>(buf: &mut &'a [u8], field: &'static str, bits: usize) -> Result<&'a [u8], CodecError> {
    let raw = string(buf, field)?;
    if raw.first() == Some(&0) {
        return Err(MalformedReason::LeadingZero(field).into());
    }
    if raw.len() * 8 > bits {
        return Err(CodecError::FieldOutOfRange { field, bits });
    }
    Ok(raw)
}

fn uint_u64(buf: &mut &[u8], field: &'static str) -> Result<u64, CodecError> {
    let raw = uint(buf, field, 64)?;
    let mut word = [0u8; 8];
    word[8 - raw.len()..].copy_from_slice(raw);
    Ok(u64::from_be_bytes(word))
}

fn uint_u128(buf: &mut &[u8], field: &'static str) -> Result<u128, CodecError> {
    let raw = uint(buf, field, 128)?;
    let mut word = [0u8; 16];
    word[16 - raw.len()..].copy_from_slice(raw);
    Ok(u128::from_be_bytes(word))
}

fn uint_u256(buf: &mut &[u8], field: &'static str) -> Result<U256, CodecError> {
    Ok(U256::from_be_slice(uint(buf, field, 256)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bytecode::pad_bytecode,
        constants::CONTRACT_DEPLOYER_ADDRESS,
        envelope::NonceSession,
        primitives::{
            Salt,
            address,
            bytes,
            hex,
        },
        system::{
            AccountAbstractionVersion,
            DeployKind,
            DeployerCall,
        },
    };
    use rand::{
        Rng,
        SeedableRng,
        rngs::StdRng,
    };

    const GOLDEN_RAW: &str = "71f84f03840ee6b280840ee6b280830f424094543a5fbe705d040efd63d9095054558fb4498f888084deadbeef82012c808082012c944944dece0b3ae884eddd9b8c6b316b889dadedd782c350c0821337c0";

    fn sample_envelope() -> Eip712Envelope {
        Eip712Envelope::builder(address!("4944DECe0b3ae884edDd9B8C6b316b889DADEDD7"))
            .to(address!("543A5fBE705d040EFD63D9095054558FB4498F88"))
            .input(bytes!("deadbeef"))
            .nonce(3)
            .chain_id(300)
            .gas_limit(1_000_000)
            .gas_price(250_000_000)
            .custom_signature(bytes!("1337"))
            .build(&mut NonceSession::new())
            .unwrap()
    }

    fn deployment_envelope() -> Eip712Envelope {
        let account = pad_bytecode(b"account implementation");
        let factory = pad_bytecode(&[0x42; 100]);
        let factory_hash = hash_bytecode(&factory).unwrap();
        let call = DeployerCall::new(
            DeployKind::Create2Account(AccountAbstractionVersion::Version1),
            Salt::from([9u8; 32]),
            factory_hash,
            bytes!("0102"),
        );

        Eip712Envelope::builder(Address::random())
            .to(CONTRACT_DEPLOYER_ADDRESS)
            .input(call.encode())
            .value(U256::from(10).pow(U256::from(18)))
            .nonce(0)
            .chain_id(260)
            .gas_limit(8_000_000)
            .gas_price(100_000_000)
            .max_priority_fee_per_gas(1)
            .gas_per_pubdata_limit(800)
            .factory_dep(factory)
            .factory_dep(account)
            .paymaster(Address::random(), bytes!("8c5a3445"))
            .custom_signature(vec![0xaa; 65])
            .build(&mut NonceSession::new())
            .unwrap()
    }

    #[test]
    fn test_golden_wire_vector() {
        let encoded = encode(&sample_envelope());
        assert_eq!(hex::encode(&encoded), GOLDEN_RAW);
        assert_eq!(encoded.len(), 82);
    }

    #[test]
    fn test_decode_golden_vector() {
        let decoded = decode(&hex::decode(GOLDEN_RAW).unwrap()).unwrap();
        assert_eq!(decoded, sample_envelope());
    }

    #[test]
    fn test_round_trip_deployment_envelope() {
        let envelope = deployment_envelope();
        let decoded = decode(&encode(&envelope)).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.factory_deps().len(), 2);
        assert!(decoded.paymaster().is_some());
    }

    #[test]
    fn test_round_trip_unstamped_contract_creation() {
        let envelope = Eip712Envelope::builder(Address::random())
            .nonce(u64::MAX)
            .chain_id(u64::MAX)
            .gas_limit(u64::MAX)
            .gas_price(u128::MAX)
            .value(U256::MAX)
            .build(&mut NonceSession::new())
            .unwrap();

        let decoded = decode(&encode(&envelope)).unwrap();
        assert_eq!(decoded.to(), None);
        assert_eq!(decoded.custom_signature(), None);
        assert_eq!(decoded, envelope);
    }

    fn random_u64(rng: &mut StdRng, min: u64) -> u64 {
        match rng.random_range(0..3) {
            0 => min,
            1 => u64::MAX,
            _ => rng.random_range(min..=u64::MAX),
        }
    }

    fn random_u128(rng: &mut StdRng, min: u128, max: u128) -> u128 {
        match rng.random_range(0..3) {
            0 => min,
            1 => max,
            _ => rng.random_range(min..=max),
        }
    }

    fn random_bytes(rng: &mut StdRng, max_len: usize) -> Vec<u8> {
        let len = rng.random_range(1..=max_len);
        (0..len).map(|_| rng.random()).collect()
    }

    fn random_envelope(rng: &mut StdRng) -> Eip712Envelope {
        let from = Address::from(rng.random::<[u8; 20]>());
        let nonce = random_u64(rng, 0);
        let gas_price = random_u128(rng, 1, u128::MAX);
        let value = match rng.random_range(0..3) {
            0 => U256::ZERO,
            1 => U256::MAX,
            _ => U256::from_be_bytes(rng.random::<[u8; 32]>()),
        };

        let mut builder = Eip712Envelope::builder(from)
            .nonce(nonce)
            .chain_id(random_u64(rng, 1))
            .gas_limit(random_u64(rng, 1))
            .gas_price(gas_price)
            .max_priority_fee_per_gas(random_u128(rng, 0, gas_price))
            .gas_per_pubdata_limit(random_u64(rng, 1))
            .value(value);
        if rng.random_bool(0.5) {
            builder = builder.to(Address::from(rng.random::<[u8; 20]>()));
        }
        if rng.random_bool(0.5) {
            builder = builder.input(random_bytes(rng, 100));
        }
        for _ in 0..rng.random_range(0..=3) {
            builder = builder.factory_dep(pad_bytecode(&random_bytes(rng, 200)));
        }
        if rng.random_bool(0.5) {
            builder = builder.custom_signature(random_bytes(rng, 80));
        }
        builder = match rng.random_range(0..3) {
            0 => builder,
            1 => builder.paymaster(Address::from(rng.random::<[u8; 20]>()), Bytes::new()),
            _ => {
                let input = random_bytes(rng, 64);
                builder.paymaster(Address::from(rng.random::<[u8; 20]>()), input)
            }
        };

        let mut session = NonceSession::new();
        if rng.random_bool(0.25) {
            builder.clone().build(&mut session).unwrap();
            builder = builder.replacing();
        }
        builder.build(&mut session).unwrap()
    }

    #[test]
    fn test_round_trip_random_envelopes() {
        let mut rng = StdRng::seed_from_u64(0x71);
        for _ in 0..500 {
            let envelope = random_envelope(&mut rng);
            let raw = encode(&envelope);
            assert_eq!(decode(&raw).unwrap(), envelope, "raw {}", hex::encode(&raw));
        }
    }

    #[test]
    fn test_every_truncation_is_malformed() {
        let raw = encode(&deployment_envelope());
        for len in 0..raw.len() {
            assert!(
                matches!(decode(&raw[..len]), Err(CodecError::MalformedEnvelope(_))),
                "prefix of {len} bytes"
            );
        }
    }

    #[test]
    fn test_unknown_type_marker() {
        let mut raw = hex::decode(GOLDEN_RAW).unwrap();
        raw[0] = 0x02;
        assert_eq!(decode(&raw), Err(CodecError::UnknownTypeMarker(0x02)));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut raw = hex::decode(GOLDEN_RAW).unwrap();
        raw.push(0x00);
        assert_eq!(
            decode(&raw),
            Err(CodecError::MalformedEnvelope(MalformedReason::TrailingBytes(1)))
        );
    }

    /// Re-encodes the golden envelope with `nonce` replaced by raw field bytes.
    fn with_raw_nonce(nonce_field: &[u8]) -> Vec<u8> {
        let raw = hex::decode(GOLDEN_RAW).unwrap();
        // Skip marker, two byte list header and the one byte nonce.
        let rest = &raw[4..];
        let mut fields = nonce_field.to_vec();
        fields.extend_from_slice(rest);

        let mut out = vec![0x71];
        encode_list(&fields, &mut out);
        out
    }

    #[test]
    fn test_nonce_wider_than_u64() {
        let raw = with_raw_nonce(&[0x89, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            decode(&raw),
            Err(CodecError::FieldOutOfRange {
                field: "nonce",
                bits: 64
            })
        );
    }

    #[test]
    fn test_non_canonical_integer() {
        let raw = with_raw_nonce(&[0x82, 0x00, 0x03]);
        assert_eq!(
            decode(&raw),
            Err(CodecError::MalformedEnvelope(MalformedReason::LeadingZero(
                "nonce"
            )))
        );
    }

    #[test]
    fn test_extra_field() {
        let mut raw = hex::decode(GOLDEN_RAW).unwrap();
        let mut fields = raw.split_off(3);
        fields.push(EMPTY_STRING_CODE);
        let mut out = vec![0x71];
        encode_list(&fields, &mut out);

        assert_eq!(
            decode(&out),
            Err(CodecError::MalformedEnvelope(MalformedReason::ExtraFields(1)))
        );
    }

    #[test]
    fn test_duplicate_factory_dep() {
        let code = Bytes::from(pad_bytecode(b"dup"));
        let mut envelope = sample_envelope();
        envelope.factory_deps.insert(code.clone()).unwrap();
        let raw = encode(&envelope);

        // Duplicate the single dependency inside the encoded list.
        let mut dep = Vec::new();
        code.encode(&mut dep);
        let mut deps = dep.clone();
        deps.extend_from_slice(&dep);
        let mut doubled = Vec::new();
        encode_list(&deps, &mut doubled);
        let mut single = Vec::new();
        encode_list(&dep, &mut single);

        let raw = hex::encode(&raw).replacen(&hex::encode(&single), &hex::encode(&doubled), 1);
        let fields = hex::decode(&raw[6..]).unwrap();
        let mut out = vec![0x71];
        encode_list(&fields, &mut out);

        let hash = hash_bytecode(&code).unwrap();
        assert_eq!(
            decode(&out),
            Err(CodecError::MalformedEnvelope(
                MalformedReason::DuplicateFactoryDep(hash)
            ))
        );
    }

    #[test]
    fn test_conventional_signature_rejected() {
        let raw = hex::encode(hex::decode(GOLDEN_RAW).unwrap());
        // v, r, s of the golden vector are `82012c 80 80`.
        let tampered = raw.replacen("82012c8080", "82012c0180", 1);
        let fields = hex::decode(&tampered[6..]).unwrap();
        let mut out = vec![0x71];
        encode_list(&fields, &mut out);
        assert_eq!(
            decode(&out),
            Err(CodecError::MalformedEnvelope(
                MalformedReason::ConventionalSignature
            ))
        );
    }

    #[test]
    fn test_chain_id_slots_must_agree() {
        let raw = hex::encode(hex::decode(GOLDEN_RAW).unwrap());
        let tampered = raw.replacen("82012c8080", "82012d8080", 1);
        let fields = hex::decode(&tampered[6..]).unwrap();
        let mut out = vec![0x71];
        encode_list(&fields, &mut out);
        assert_eq!(
            decode(&out),
            Err(CodecError::MalformedEnvelope(MalformedReason::ChainIdMismatch {
                signature_slot: 301,
                chain_id: 300,
            }))
        );
    }
}
