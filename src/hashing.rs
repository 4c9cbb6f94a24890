// 3.0 hashing.rs: EIP-712 typed-data hashes for every order kind.
// field order in the encoders must match the type strings exactly.

use crate::order::{LimitOrder, OtcOrder, RfqOrder};
use crate::types::{Address, Domain, OrderHash, B256, U256};
use alloy_primitives::keccak256;

pub const DOMAIN_NAME: &str = "NativeOrders";
pub const DOMAIN_VERSION: &str = "1.0.0";

pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

pub const LIMIT_ORDER_TYPE: &str = "LimitOrder(address baseToken,address quoteToken,uint128 baseAmount,uint128 quoteAmount,uint128 quoteFeeAmount,address maker,address taker,address sender,address feeRecipient,bytes32 pool,uint64 expiry,uint256 salt)";

pub const RFQ_ORDER_TYPE: &str = "RfqOrder(address baseToken,address quoteToken,uint128 baseAmount,uint128 quoteAmount,address maker,address taker,address origin,bytes32 pool,uint64 expiry,uint256 salt)";

pub const OTC_ORDER_TYPE: &str = "OtcOrder(address baseToken,address quoteToken,uint128 baseAmount,uint128 quoteAmount,address maker,address taker,address origin,uint256 expiryAndNonce)";

// abi encoder for static words. every field is one 32 byte slot.
struct WordEncoder {
    buf: Vec<u8>,
}

impl WordEncoder {
    fn new(type_hash: B256, fields: usize) -> Self {
        let mut buf = Vec::with_capacity(32 * (fields + 1));
        buf.extend_from_slice(type_hash.as_slice());
        Self { buf }
    }

    fn address(mut self, value: Address) -> Self {
        self.buf.extend_from_slice(&[0u8; 12]);
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    fn uint(mut self, value: U256) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    fn uint128(self, value: u128) -> Self {
        self.uint(U256::from(value))
    }

    fn uint64(self, value: u64) -> Self {
        self.uint(U256::from(value))
    }

    fn word(mut self, value: B256) -> Self {
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    fn finish(self) -> B256 {
        keccak256(&self.buf)
    }
}

pub fn type_hash(type_string: &str) -> B256 {
    keccak256(type_string.as_bytes())
}

pub fn domain_separator(domain: &Domain) -> B256 {
    WordEncoder::new(type_hash(DOMAIN_TYPE), 4)
        .word(keccak256(DOMAIN_NAME.as_bytes()))
        .word(keccak256(DOMAIN_VERSION.as_bytes()))
        .uint64(domain.chain_id)
        .address(domain.verifying_contract)
        .finish()
}

/// `keccak256(0x19 0x01 || domainSeparator || structHash)`
pub fn order_hash(domain: &Domain, struct_hash: B256) -> OrderHash {
    let mut buf = [0u8; 66];
    buf[0] = 0x19;
    buf[1] = 0x01;
    buf[2..34].copy_from_slice(domain_separator(domain).as_slice());
    buf[34..66].copy_from_slice(struct_hash.as_slice());
    OrderHash(keccak256(buf))
}

pub fn limit_order_struct_hash(order: &LimitOrder) -> B256 {
    let c = &order.common;
    WordEncoder::new(type_hash(LIMIT_ORDER_TYPE), 12)
        .address(c.base_token)
        .address(c.quote_token)
        .uint128(c.base_amount)
        .uint128(c.quote_amount)
        .uint128(order.quote_fee_amount)
        .address(c.maker)
        .address(c.taker)
        .address(order.sender)
        .address(order.fee_recipient)
        .word(order.pool.0)
        .uint64(order.expiry.as_secs())
        .uint(order.salt)
        .finish()
}

pub fn rfq_order_struct_hash(order: &RfqOrder) -> B256 {
    let c = &order.common;
    WordEncoder::new(type_hash(RFQ_ORDER_TYPE), 10)
        .address(c.base_token)
        .address(c.quote_token)
        .uint128(c.base_amount)
        .uint128(c.quote_amount)
        .address(c.maker)
        .address(c.taker)
        .address(order.origin)
        .word(order.pool.0)
        .uint64(order.expiry.as_secs())
        .uint(order.salt)
        .finish()
}

pub fn otc_order_struct_hash(order: &OtcOrder) -> B256 {
    let c = &order.common;
    WordEncoder::new(type_hash(OTC_ORDER_TYPE), 8)
        .address(c.base_token)
        .address(c.quote_token)
        .uint128(c.base_amount)
        .uint128(c.quote_amount)
        .address(c.maker)
        .address(c.taker)
        .address(order.origin)
        .uint(order.expiry_and_nonce)
        .finish()
}
