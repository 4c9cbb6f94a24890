//! End to end settlement scenarios.
//!
//! Each test drives the engine against the in-memory backend and checks both
//! the ledgers and the resulting balances.

use k256::ecdsa::SigningKey;
use settlement_core::*;

const BASE: Address = Address::new([0xaa; 20]);
const QUOTE: Address = Address::new([0xbb; 20]);
const WRAPPED: Address = Address::new([0xee; 20]);
const FEE_RECIPIENT: Address = Address::new([0xfe; 20]);
const COLLECTOR: Address = Address::new([0xfc; 20]);
const ORIGIN: Address = Address::new([0x33; 20]);
const STRANGER: Address = Address::new([0x77; 20]);

fn key(seed: u8) -> SigningKey {
    SigningKey::from_bytes((&[seed; 32]).into()).unwrap()
}

fn addr_of(key: &SigningKey) -> Address {
    address_of(key.verifying_key())
}

fn sign(key: &SigningKey, hash: OrderHash) -> Signature {
    Signature::sign(key, hash, SignatureType::Eip712).unwrap()
}

struct Fixture {
    engine: Engine,
    backend: InMemorySettlement,
    maker: SigningKey,
    maker_addr: Address,
    taker: Address,
}

fn fixture_with(config: ExchangeConfig) -> Fixture {
    let mut engine = Engine::new(EngineConfig::new(config));
    engine.set_time(Timestamp::from_secs(1_000));

    let maker = key(1);
    let maker_addr = addr_of(&maker);
    let taker = Address::new([0x22; 20]);

    let mut backend = InMemorySettlement::new();
    backend.set_balance(BASE, maker_addr, 1_000_000);
    backend.set_balance(QUOTE, taker, 1_000_000);

    Fixture {
        engine,
        backend,
        maker,
        maker_addr,
        taker,
    }
}

fn fixture() -> Fixture {
    fixture_with(ExchangeConfig::default())
}

impl Fixture {
    fn common(&self, base_amount: u128, quote_amount: u128) -> CommonOrderFields {
        CommonOrderFields {
            base_token: BASE,
            quote_token: QUOTE,
            base_amount,
            quote_amount,
            maker: self.maker_addr,
            taker: Address::ZERO,
            domain: *self.engine.domain(),
        }
    }

    fn limit(&self, base_amount: u128, quote_amount: u128, salt: u64) -> LimitOrder {
        LimitOrder {
            common: self.common(base_amount, quote_amount),
            quote_fee_amount: 0,
            sender: Address::ZERO,
            fee_recipient: FEE_RECIPIENT,
            pool: PoolId::default(),
            expiry: Timestamp::from_secs(2_000),
            salt: U256::from(salt),
        }
    }

    fn rfq(&self, base_amount: u128, quote_amount: u128, salt: u64) -> RfqOrder {
        RfqOrder {
            common: self.common(base_amount, quote_amount),
            origin: Address::ZERO,
            pool: PoolId::default(),
            expiry: Timestamp::from_secs(2_000),
            salt: U256::from(salt),
        }
    }

    fn otc(&self, base_amount: u128, quote_amount: u128, bucket: u64, nonce: u128) -> OtcOrder {
        let packed = OtcOrder::pack_expiry_and_nonce(Timestamp::from_secs(2_000), bucket, nonce);
        OtcOrder::new(self.common(base_amount, quote_amount), Address::ZERO, packed)
    }

    fn sign(&self, hash: OrderHash) -> Signature {
        sign(&self.maker, hash)
    }

    fn taker_ctx(&self) -> CallContext {
        CallContext::external(self.taker)
    }

    fn maker_ctx(&self) -> CallContext {
        CallContext::external(self.maker_addr)
    }
}

// limit fills

#[test]
fn limit_partial_fill_moves_balances() {
    let mut f = fixture();
    let order = f.limit(500, 1_000, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    let result = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 400, 0).unwrap();
    assert_eq!(result.fill.quote_filled, 400);
    assert_eq!(result.fill.base_filled, 200);

    assert_eq!(f.backend.balance(QUOTE, f.maker_addr), 400);
    assert_eq!(f.backend.balance(BASE, f.taker), 200);
    assert_eq!(f.backend.balance(BASE, f.maker_addr), 999_800);

    let info = f.engine.get_limit_order_info(&order);
    assert_eq!(info.status, OrderStatus::Fillable);
    assert_eq!(info.quote_filled_amount, 400);
    assert_eq!(f.engine.events().len(), 1);
}

#[test]
fn fill_is_clamped_to_remaining() {
    let mut f = fixture();
    let order = f.limit(500, 1_000, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 700, 0).unwrap();
    let second = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 700, 0).unwrap();
    assert_eq!(second.fill.quote_filled, 300);

    let info = f.engine.get_limit_order_info(&order);
    assert_eq!(info.status, OrderStatus::Filled);
    assert_eq!(info.quote_filled_amount, 1_000);

    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 1, 0).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotFillable { status: OrderStatus::Filled, .. }));
}

#[test]
fn limit_fee_is_paid_by_taker() {
    let mut f = fixture();
    let mut order = f.limit(500, 1_000, 1);
    order.quote_fee_amount = 10;
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    let result = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 500, 0).unwrap();
    assert_eq!(result.fill.quote_fee_filled, 5);
    assert_eq!(f.backend.balance(QUOTE, FEE_RECIPIENT), 5);
    assert_eq!(f.backend.balance(QUOTE, f.taker), 1_000_000 - 505);
}

#[test]
fn protocol_fee_is_charged_and_excess_refunded() {
    let mut f = fixture_with(ExchangeConfig::default().with_protocol_fee(10, COLLECTOR));
    f.backend.set_native_balance(f.taker, 100);
    let order = f.limit(500, 1_000, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx().with_gas_price(5);

    let result = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 100, 80).unwrap();
    assert_eq!(result.protocol_fee_paid, 50);
    assert_eq!(result.refund, 30);
    assert_eq!(f.backend.native_balance(f.taker), 50);
    assert_eq!(f.backend.native_balance(COLLECTOR), 50);
    assert_eq!(f.backend.escrow(), 0);
}

#[test]
fn insufficient_protocol_fee_leaves_no_trace() {
    let mut f = fixture_with(ExchangeConfig::default().with_protocol_fee(10, COLLECTOR));
    f.backend.set_native_balance(f.taker, 100);
    let order = f.limit(500, 1_000, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx().with_gas_price(5);

    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 100, 40).unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientProtocolFee {
            required: 50,
            available: 40
        }
    );
    assert_eq!(f.backend.native_balance(f.taker), 100);
    assert_eq!(f.backend.escrow(), 0);
    assert_eq!(f.engine.get_limit_order_info(&order).quote_filled_amount, 0);
    assert!(f.engine.events().is_empty());
}

#[test]
fn fill_or_kill_rejects_short_fill() {
    let mut f = fixture();
    let order = f.limit(500, 1_000, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 600, 0).unwrap();
    let err = f
        .engine
        .fill_or_kill_limit_order(&mut f.backend, ctx, &order, &sig, 600, 0)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::FillOrKillFailed {
            requested: 600,
            available: 400,
            ..
        }
    ));
    assert_eq!(f.engine.get_limit_order_info(&order).quote_filled_amount, 600);

    let result = f
        .engine
        .fill_or_kill_limit_order(&mut f.backend, ctx, &order, &sig, 400, 0)
        .unwrap();
    assert_eq!(result.fill.quote_filled, 400);
}

#[test]
fn settlement_failure_rolls_back_fill() {
    let mut f = fixture();
    f.backend.set_balance(BASE, f.maker_addr, 0);
    let order = f.limit(500, 1_000, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 400, 0).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Settlement(SettlementError::InsufficientBalance { .. })
    ));
    assert_eq!(f.engine.get_limit_order_info(&order).quote_filled_amount, 0);
    // quote leg had already moved before the base leg failed
    assert_eq!(f.backend.balance(QUOTE, f.taker), 1_000_000);
    assert_eq!(f.backend.balance(QUOTE, f.maker_addr), 0);
    assert!(f.engine.events().is_empty());
}

// status

#[test]
fn filled_is_sticky() {
    let mut f = fixture();
    let order = f.limit(500, 1_000, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();
    f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 1_000, 0).unwrap();

    let maker_ctx = f.maker_ctx();
    f.engine.cancel_limit_order(maker_ctx, &order).unwrap();
    f.engine
        .cancel_pair_limit_orders(maker_ctx, BASE, QUOTE, U256::from(100u8))
        .unwrap();
    f.engine.set_time(Timestamp::from_secs(5_000));

    let info = f.engine.get_limit_order_info(&order);
    assert_eq!(info.status, OrderStatus::Filled);
    assert_eq!(info.quote_filled_amount, 1_000);
}

#[test]
fn expiry_boundary() {
    let mut f = fixture();
    let order = f.rfq(100, 100, 1);

    f.engine.set_time(Timestamp::from_secs(1_999));
    assert_eq!(f.engine.get_rfq_order_info(&order).status, OrderStatus::Fillable);
    f.engine.set_time(Timestamp::from_secs(2_000));
    assert_eq!(f.engine.get_rfq_order_info(&order).status, OrderStatus::Expired);

    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();
    let err = f.engine.fill_rfq_order(&mut f.backend, ctx, &order, &sig, 10).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotFillable { status: OrderStatus::Expired, .. }));
}

#[test]
fn zero_quote_amount_is_filled() {
    let f = fixture();
    let order = f.limit(100, 0, 1);
    assert_eq!(f.engine.get_limit_order_info(&order).status, OrderStatus::Filled);
}

#[test]
fn foreign_domain_is_invalid() {
    let mut f = fixture();
    let mut order = f.limit(100, 100, 1);
    order.common.domain = Domain::new(999, Address::new([0x01; 20]));
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    assert_eq!(f.engine.get_limit_order_info(&order).status, OrderStatus::Invalid);
    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 10, 0).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotFillable { status: OrderStatus::Invalid, .. }));
}

// signatures

#[test]
fn signature_for_another_order_is_rejected() {
    let mut f = fixture();
    let order = f.limit(100, 100, 1);
    let other = f.limit(100, 100, 2);
    let sig = f.sign(other.order_hash());
    let ctx = f.taker_ctx();

    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 10, 0).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotSignedByMaker { .. }));
}

#[test]
fn eth_sign_signature_is_accepted() {
    let mut f = fixture();
    let order = f.rfq(100, 100, 1);
    let sig = Signature::sign(&f.maker, order.order_hash(), SignatureType::EthSign).unwrap();
    let ctx = f.taker_ctx();

    let fill = f.engine.fill_rfq_order(&mut f.backend, ctx, &order, &sig, 100).unwrap();
    assert_eq!(fill.quote_filled, 100);
}

#[test]
fn delegated_signer_lifecycle() {
    let mut f = fixture();
    let delegate = key(9);
    let delegate_addr = addr_of(&delegate);
    let order = f.limit(100, 100, 1);
    let sig = sign(&delegate, order.order_hash());
    let ctx = f.taker_ctx();
    let maker_ctx = f.maker_ctx();

    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 10, 0).unwrap_err();
    assert_eq!(
        err,
        EngineError::OrderNotSignedByMaker {
            order_hash: order.order_hash(),
            signer: Some(delegate_addr),
            maker: f.maker_addr,
        }
    );

    f.engine.register_allowed_order_signer(maker_ctx, delegate_addr, true);
    assert!(f.engine.is_valid_order_signer(f.maker_addr, delegate_addr));
    f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 10, 0).unwrap();

    f.engine.register_allowed_order_signer(maker_ctx, delegate_addr, false);
    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 10, 0).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotSignedByMaker { .. }));
}

#[test]
fn contract_signature_asks_the_account() {
    let mut f = fixture();
    let contract_maker = Address::new([0xc0; 20]);
    f.backend.set_balance(BASE, contract_maker, 1_000);
    let mut order = f.limit(100, 100, 1);
    order.common.maker = contract_maker;
    let sig = Signature::contract();
    let ctx = f.taker_ctx();

    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 50, 0).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotSignedByMaker { signer: None, .. }));

    f.backend.approve_hash(contract_maker, order.order_hash());
    let result = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 50, 0).unwrap();
    assert_eq!(result.fill.base_filled, 50);
}

// restrictions

#[test]
fn taker_and_sender_restrictions() {
    let mut f = fixture();
    let ctx = f.taker_ctx();

    let mut order = f.limit(100, 100, 1);
    order.common.taker = STRANGER;
    let sig = f.sign(order.order_hash());
    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 10, 0).unwrap_err();
    assert_eq!(
        err,
        EngineError::OrderNotFillableByTaker {
            order_hash: order.order_hash(),
            taker: f.taker,
            expected: STRANGER,
        }
    );

    let mut order = f.limit(100, 100, 2);
    order.sender = STRANGER;
    let sig = f.sign(order.order_hash());
    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 10, 0).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotFillableBySender { .. }));
}

#[test]
fn rfq_origin_allowlist() {
    let mut f = fixture();
    let mut order = f.rfq(100, 100, 1);
    order.origin = ORIGIN;
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    let err = f.engine.fill_rfq_order(&mut f.backend, ctx, &order, &sig, 10).unwrap_err();
    assert_eq!(
        err,
        EngineError::OrderNotFillableByOrigin {
            order_hash: order.order_hash(),
            origin: f.taker,
            expected: ORIGIN,
        }
    );

    // registration has to come straight from the origin
    let err = f
        .engine
        .register_allowed_origins(CallContext::relayed(STRANGER, ORIGIN), &[f.taker], true)
        .unwrap_err();
    assert!(matches!(err, EngineError::ContractOriginNotAllowed { .. }));

    f.engine
        .register_allowed_origins(CallContext::external(ORIGIN), &[f.taker], true)
        .unwrap();
    assert!(f.engine.is_allowed_origin(ORIGIN, f.taker));
    f.engine.fill_rfq_order(&mut f.backend, ctx, &order, &sig, 10).unwrap();
}

#[test]
fn rfq_base_rounds_down_when_inexact() {
    let mut f = fixture();
    let order = f.rfq(100, 300, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    let fill = f.engine.fill_rfq_order(&mut f.backend, ctx, &order, &sig, 100).unwrap();
    assert_eq!(fill.base_filled, 32);
}

// cancellation

#[test]
fn direct_cancel_requires_maker_or_delegate() {
    let mut f = fixture();
    let order = f.limit(100, 100, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();
    f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 30, 0).unwrap();

    let err = f.engine.cancel_limit_order(ctx, &order).unwrap_err();
    assert_eq!(
        err,
        EngineError::OnlyMakerAllowed {
            order_hash: order.order_hash(),
            sender: f.taker,
            maker: f.maker_addr,
        }
    );

    f.engine
        .register_allowed_order_signer(f.maker_ctx(), STRANGER, true);
    f.engine.cancel_limit_order(CallContext::external(STRANGER), &order).unwrap();

    let info = f.engine.get_limit_order_info(&order);
    assert_eq!(info.status, OrderStatus::Cancelled);
    assert_eq!(info.quote_filled_amount, 30);

    let err = f.engine.fill_limit_order(&mut f.backend, ctx, &order, &sig, 10, 0).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotFillable { status: OrderStatus::Cancelled, .. }));
}

#[test]
fn cancel_is_idempotent() {
    let mut f = fixture();
    let order = f.rfq(100, 100, 1);
    let maker_ctx = f.maker_ctx();

    f.engine.cancel_rfq_order(maker_ctx, &order).unwrap();
    f.engine.cancel_rfq_order(maker_ctx, &order).unwrap();
    let cancels = f
        .engine
        .events()
        .iter()
        .filter(|e| matches!(e.payload, EventPayload::OrderCancelled(_)))
        .count();
    assert_eq!(cancels, 2);
    assert_eq!(f.engine.get_rfq_order_info(&order).status, OrderStatus::Cancelled);
}

#[test]
fn batch_cancel_is_all_or_nothing() {
    let mut f = fixture();
    let mine = f.limit(100, 100, 1);
    let mut theirs = f.limit(100, 100, 2);
    theirs.common.maker = STRANGER;
    let maker_ctx = f.maker_ctx();

    let err = f.engine.batch_cancel_limit_orders(maker_ctx, &[mine, theirs]).unwrap_err();
    assert!(matches!(err, EngineError::OnlyMakerAllowed { .. }));
    assert_eq!(f.engine.get_limit_order_info(&mine).status, OrderStatus::Fillable);
    assert!(f.engine.events().is_empty());
}

#[test]
fn pair_cancel_scope() {
    let mut f = fixture();
    let low = f.limit(100, 100, 5);
    let high = f.limit(100, 100, 10);
    let mut reversed = f.limit(100, 100, 5);
    reversed.common.base_token = QUOTE;
    reversed.common.quote_token = BASE;
    let rfq = f.rfq(100, 100, 5);
    let mut other_maker = f.limit(100, 100, 5);
    other_maker.common.maker = STRANGER;

    let maker_ctx = f.maker_ctx();
    f.engine
        .cancel_pair_limit_orders(maker_ctx, BASE, QUOTE, U256::from(10u8))
        .unwrap();

    assert_eq!(f.engine.get_limit_order_info(&low).status, OrderStatus::Cancelled);
    assert_eq!(f.engine.get_limit_order_info(&high).status, OrderStatus::Fillable);
    assert_eq!(f.engine.get_limit_order_info(&reversed).status, OrderStatus::Fillable);
    assert_eq!(f.engine.get_rfq_order_info(&rfq).status, OrderStatus::Fillable);
    assert_eq!(f.engine.get_limit_order_info(&other_maker).status, OrderStatus::Fillable);

    // lowering the threshold brings orders back
    f.engine
        .cancel_pair_limit_orders(maker_ctx, BASE, QUOTE, U256::ZERO)
        .unwrap();
    assert_eq!(f.engine.get_limit_order_info(&low).status, OrderStatus::Fillable);
}

#[test]
fn pair_cancel_with_signer() {
    let mut f = fixture();
    let order = f.rfq(100, 100, 4);
    let delegate_ctx = CallContext::external(STRANGER);

    let err = f
        .engine
        .cancel_pair_rfq_orders_with_signer(delegate_ctx, f.maker_addr, BASE, QUOTE, U256::from(5u8))
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidSigner {
            maker: f.maker_addr,
            signer: STRANGER
        }
    );

    f.engine
        .register_allowed_order_signer(f.maker_ctx(), STRANGER, true);
    f.engine
        .cancel_pair_rfq_orders_with_signer(delegate_ctx, f.maker_addr, BASE, QUOTE, U256::from(5u8))
        .unwrap();
    assert_eq!(f.engine.get_rfq_order_info(&order).status, OrderStatus::Cancelled);
    assert_eq!(
        f.engine.get_pair_min_valid_salt(OrderKind::Rfq, f.maker_addr, BASE, QUOTE),
        U256::from(5u8)
    );
}

#[test]
fn batch_pair_cancel_checks_lengths() {
    let mut f = fixture();
    let err = f
        .engine
        .batch_cancel_pair_limit_orders(f.maker_ctx(), &[BASE, QUOTE], &[QUOTE], &[U256::from(1u8)])
        .unwrap_err();
    assert!(matches!(err, EngineError::MismatchedArrayLengths { .. }));

    f.engine
        .batch_cancel_pair_limit_orders(
            f.maker_ctx(),
            &[BASE, QUOTE],
            &[QUOTE, BASE],
            &[U256::from(3u8), U256::from(4u8)],
        )
        .unwrap();
    assert_eq!(
        f.engine.get_pair_min_valid_salt(OrderKind::Limit, f.maker_addr, QUOTE, BASE),
        U256::from(4u8)
    );
}

// otc

#[test]
fn otc_nonce_is_single_use() {
    let mut f = fixture();
    let first = f.otc(100, 100, 0, 5);
    let same_nonce = f.otc(50, 50, 0, 5);
    let ctx = f.taker_ctx();

    let sig = f.sign(first.order_hash());
    f.engine.fill_otc_order(&mut f.backend, ctx, &first, &sig, 40).unwrap();
    // partial fill still burns it
    assert_eq!(f.engine.get_otc_order_info(&first).status, OrderStatus::Invalid);

    let sig = f.sign(same_nonce.order_hash());
    let err = f.engine.fill_otc_order(&mut f.backend, ctx, &same_nonce, &sig, 50).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotFillable { status: OrderStatus::Invalid, .. }));

    assert_eq!(f.engine.get_otc_order_info(&f.otc(1, 1, 0, 3)).status, OrderStatus::Invalid);
    assert_eq!(f.engine.get_otc_order_info(&f.otc(1, 1, 0, 6)).status, OrderStatus::Fillable);
    assert_eq!(f.engine.get_otc_order_info(&f.otc(1, 1, 1, 1)).status, OrderStatus::Fillable);
}

#[test]
fn otc_same_nonce_fills_once_whichever_comes_first() {
    for first_is_big in [true, false] {
        let mut f = fixture();
        let big = f.otc(100, 100, 0, 5);
        let small = f.otc(10, 10, 0, 5);
        let (first, second) = if first_is_big { (big, small) } else { (small, big) };
        let ctx = f.taker_ctx();

        let sig = f.sign(first.order_hash());
        f.engine.fill_otc_order(&mut f.backend, ctx, &first, &sig, first.common.quote_amount).unwrap();

        let sig = f.sign(second.order_hash());
        let err = f
            .engine
            .fill_otc_order(&mut f.backend, ctx, &second, &sig, second.common.quote_amount)
            .unwrap_err();
        assert!(matches!(err, EngineError::OrderNotFillable { status: OrderStatus::Invalid, .. }));
        assert_eq!(f.backend.balance(BASE, f.taker), first.common.base_amount);
    }
}

#[test]
fn otc_fields_come_from_the_signed_word() {
    let mut f = fixture();
    let signed = f.otc(100, 100, 0, 1);
    let sig = f.sign(signed.order_hash());
    let ctx = f.taker_ctx();
    f.engine.fill_otc_order(&mut f.backend, ctx, &signed, &sig, 100).unwrap();

    // same signed word carried by orders built for other lanes
    for bucket in 1..=3u64 {
        let mut replay = f.otc(100, 100, bucket, 9);
        replay.expiry_and_nonce = signed.expiry_and_nonce;
        assert_eq!(replay.order_hash(), signed.order_hash());
        assert_eq!(replay.nonce_bucket(), 0);

        let err = f.engine.fill_otc_order(&mut f.backend, ctx, &replay, &sig, 100).unwrap_err();
        assert!(matches!(err, EngineError::OrderNotFillable { status: OrderStatus::Invalid, .. }));
    }

    // an unused signed order past its expiry stays expired whatever lane is asked for
    let late = f.otc(100, 100, 0, 2);
    let late_sig = f.sign(late.order_hash());
    f.engine.set_time(Timestamp::from_secs(2_000));
    let mut replay = OtcOrder::new(
        late.common,
        late.origin,
        OtcOrder::pack_expiry_and_nonce(Timestamp::from_secs(u64::MAX), 7, 1),
    );
    replay.expiry_and_nonce = late.expiry_and_nonce;
    let err = f.engine.fill_otc_order(&mut f.backend, ctx, &replay, &late_sig, 100).unwrap_err();
    assert!(matches!(err, EngineError::OrderNotFillable { status: OrderStatus::Expired, .. }));

    assert_eq!(f.backend.balance(BASE, f.maker_addr), 1_000_000 - 100);
    assert_eq!(f.backend.balance(BASE, f.taker), 100);
}

#[test]
fn order_info_dispatches_on_kind() {
    let mut f = fixture();
    let limit = f.limit(500, 1_000, 1);
    let rfq = f.rfq(100, 100, 1);
    let otc = f.otc(100, 100, 0, 1);
    let ctx = f.taker_ctx();

    let sig = f.sign(limit.order_hash());
    f.engine.fill_limit_order(&mut f.backend, ctx, &limit, &sig, 400, 0).unwrap();
    let sig = f.sign(otc.order_hash());
    f.engine.fill_otc_order(&mut f.backend, ctx, &otc, &sig, 100).unwrap();

    let limit_info = f.engine.get_order_info(&NativeOrder::from(limit));
    assert_eq!(limit_info, f.engine.get_limit_order_info(&limit));
    assert_eq!(limit_info.quote_filled_amount, 400);

    let rfq_info = f.engine.get_order_info(&rfq.into());
    assert_eq!(rfq_info.status, OrderStatus::Fillable);
    assert_eq!(f.engine.get_order_hash(&rfq.into()), rfq.order_hash());

    let otc_info = f.engine.get_order_info(&otc.into());
    assert_eq!(otc_info.status, f.engine.get_otc_order_info(&otc).status);
    assert_eq!(otc_info.quote_filled_amount, 0);
}

#[test]
fn otc_fill_or_kill_and_expiry() {
    let mut f = fixture();
    let order = f.otc(100, 100, 0, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    let err = f
        .engine
        .fill_or_kill_otc_order(&mut f.backend, ctx, &order, &sig, 150)
        .unwrap_err();
    assert!(matches!(err, EngineError::FillOrKillFailed { available: 100, .. }));
    assert_eq!(f.engine.get_otc_order_info(&order).status, OrderStatus::Fillable);

    f.engine.advance_time(1_000);
    assert_eq!(f.engine.get_otc_order_info(&order).status, OrderStatus::Expired);
}

#[test]
fn taker_signed_otc_fill() {
    let mut f = fixture();
    let taker_key = key(3);
    let taker = addr_of(&taker_key);
    f.backend.set_balance(QUOTE, taker, 1_000);
    let relayer = CallContext::external(Address::new([0x44; 20]));

    let mut order = f.otc(100, 200, 0, 1);
    let maker_sig = f.sign(order.order_hash());
    let err = f
        .engine
        .fill_taker_signed_otc_order(&mut f.backend, relayer, &order, &maker_sig, &maker_sig, false)
        .unwrap_err();
    assert!(matches!(err, EngineError::TakerNotSet { .. }));

    order.common.taker = taker;
    let maker_sig = f.sign(order.order_hash());
    let wrong = sign(&key(4), order.order_hash());
    let err = f
        .engine
        .fill_taker_signed_otc_order(&mut f.backend, relayer, &order, &maker_sig, &wrong, false)
        .unwrap_err();
    assert!(matches!(err, EngineError::OrderNotSignedByTaker { .. }));

    let err = f
        .engine
        .fill_taker_signed_otc_order(
            &mut f.backend,
            relayer,
            &order,
            &maker_sig,
            &sign(&taker_key, order.order_hash()),
            true,
        )
        .unwrap_err();
    assert_eq!(err, EngineError::UnwrapNotSupported { token: BASE });

    let taker_sig = sign(&taker_key, order.order_hash());
    let fill = f
        .engine
        .fill_taker_signed_otc_order(&mut f.backend, relayer, &order, &maker_sig, &taker_sig, false)
        .unwrap();
    assert_eq!(fill.quote_filled, 200);
    assert_eq!(f.backend.balance(QUOTE, taker), 800);
    assert_eq!(f.backend.balance(BASE, taker), 100);
}

#[test]
fn taker_signed_otc_unwraps_native() {
    let mut f = fixture();
    let taker_key = key(3);
    let taker = addr_of(&taker_key);
    f.backend.set_balance(QUOTE, taker, 1_000);
    f.backend.set_balance(WRAPPED, f.maker_addr, 1_000);

    let mut order = f.otc(100, 200, 0, 1);
    order.common.base_token = WRAPPED;
    order.common.taker = taker;
    let maker_sig = f.sign(order.order_hash());
    let taker_sig = sign(&taker_key, order.order_hash());

    let ctx = f.taker_ctx();
    f.engine
        .fill_taker_signed_otc_order(&mut f.backend, ctx, &order, &maker_sig, &taker_sig, true)
        .unwrap();
    assert_eq!(f.backend.native_balance(taker), 100);
    assert_eq!(f.backend.balance(WRAPPED, f.maker_addr), 900);
}

#[test]
fn batch_taker_signed_otc_reports_flags() {
    let mut f = fixture();
    let taker_key = key(3);
    let taker = addr_of(&taker_key);
    f.backend.set_balance(QUOTE, taker, 1_000);

    let mut orders = vec![f.otc(10, 10, 0, 1), f.otc(10, 10, 1, 1)];
    for order in orders.iter_mut() {
        order.common.taker = taker;
    }
    let maker_sigs: Vec<Signature> = orders.iter().map(|o| f.sign(o.order_hash())).collect();
    let taker_sigs = vec![sign(&taker_key, orders[0].order_hash()), Signature::invalid()];
    let ctx = f.taker_ctx();

    let flags = f
        .engine
        .batch_fill_taker_signed_otc_orders(&mut f.backend, ctx, &orders, &maker_sigs, &taker_sigs, &[false, false])
        .unwrap();
    assert_eq!(flags, vec![true, false]);
    assert_eq!(f.engine.get_otc_order_info(&orders[1]).status, OrderStatus::Fillable);

    let err = f
        .engine
        .batch_fill_taker_signed_otc_orders(&mut f.backend, ctx, &orders, &maker_sigs, &taker_sigs, &[false])
        .unwrap_err();
    assert!(matches!(err, EngineError::MismatchedArrayLengths { .. }));
}

// batches

fn three_rfq_orders(f: &Fixture) -> (Vec<RfqOrder>, Vec<Signature>) {
    let orders: Vec<RfqOrder> = (1..=3).map(|salt| f.rfq(100, 100, salt)).collect();
    let mut sigs: Vec<Signature> = orders.iter().map(|o| f.sign(o.order_hash())).collect();
    sigs[1] = Signature::invalid();
    (orders, sigs)
}

#[test]
fn best_effort_batch_skips_failures() {
    let mut f = fixture();
    let (orders, sigs) = three_rfq_orders(&f);
    let ctx = f.taker_ctx();

    let results = f
        .engine
        .batch_fill_rfq_orders(&mut f.backend, ctx, &orders, &sigs, &[100, 100, 100], false)
        .unwrap();
    assert!(results.entries[0].outcome.is_filled());
    assert!(matches!(
        results.entries[1].outcome,
        FillOutcome::Skipped(EngineError::OrderNotSignedByMaker { .. })
    ));
    assert!(results.entries[2].outcome.is_filled());
    assert_eq!(results.total_quote_filled(), 200);
    assert_eq!(f.engine.get_rfq_order_info(&orders[1]).quote_filled_amount, 0);
}

#[test]
fn atomic_batch_rolls_back_everything() {
    let mut f = fixture();
    let (orders, sigs) = three_rfq_orders(&f);
    let ctx = f.taker_ctx();

    let err = f
        .engine
        .batch_fill_rfq_orders(&mut f.backend, ctx, &orders, &sigs, &[100, 100, 100], true)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::BatchFillIncomplete {
            order_hash: orders[1].order_hash(),
            filled: 0,
            requested: 100,
        }
    );
    assert_eq!(f.engine.get_rfq_order_info(&orders[0]).quote_filled_amount, 0);
    assert_eq!(f.backend.balance(QUOTE, f.taker), 1_000_000);
    assert!(f.engine.events().is_empty());
}

// three fillable orders and one expired
fn batch_with_expired(f: &mut Fixture) -> (Vec<RfqOrder>, Vec<Signature>) {
    let mut orders: Vec<RfqOrder> = (1..=4).map(|salt| f.rfq(100, 100, salt)).collect();
    orders[2].expiry = Timestamp::from_secs(1_500);
    let sigs = orders.iter().map(|o| f.sign(o.order_hash())).collect();
    f.engine.set_time(Timestamp::from_secs(1_600));
    (orders, sigs)
}

#[test]
fn best_effort_batch_skips_expired_order() {
    let mut f = fixture();
    let (orders, sigs) = batch_with_expired(&mut f);
    let ctx = f.taker_ctx();

    let results = f
        .engine
        .batch_fill_rfq_orders(&mut f.backend, ctx, &orders, &sigs, &[100; 4], false)
        .unwrap();
    let filled: Vec<u128> = results.entries.iter().map(|e| e.outcome.quote_filled()).collect();
    assert_eq!(filled, vec![100, 100, 0, 100]);
    assert!(matches!(
        results.entries[2].outcome,
        FillOutcome::Skipped(EngineError::OrderNotFillable {
            status: OrderStatus::Expired,
            ..
        })
    ));
    assert_eq!(f.backend.balance(BASE, f.taker), 300);
    assert_eq!(f.engine.get_rfq_order_info(&orders[2]).quote_filled_amount, 0);
}

#[test]
fn atomic_batch_with_expired_order_fills_nothing() {
    let mut f = fixture();
    let (orders, sigs) = batch_with_expired(&mut f);
    let ctx = f.taker_ctx();

    let err = f
        .engine
        .batch_fill_rfq_orders(&mut f.backend, ctx, &orders, &sigs, &[100; 4], true)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::BatchFillIncomplete {
            order_hash: orders[2].order_hash(),
            filled: 0,
            requested: 100,
        }
    );
    for order in &orders {
        assert_eq!(f.engine.get_rfq_order_info(order).quote_filled_amount, 0);
    }
    assert_eq!(f.backend.balance(BASE, f.taker), 0);
    assert_eq!(f.backend.balance(QUOTE, f.taker), 1_000_000);
    assert!(f.engine.events().is_empty());
}

#[test]
fn atomic_batch_rejects_clamped_fill() {
    let mut f = fixture();
    let order = f.rfq(100, 100, 1);
    let sig = f.sign(order.order_hash());
    let ctx = f.taker_ctx();

    let err = f
        .engine
        .batch_fill_rfq_orders(&mut f.backend, ctx, &[order], &[sig], &[150], true)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::BatchFillIncomplete {
            filled: 100,
            requested: 150,
            ..
        }
    ));
}

#[test]
fn limit_batch_shares_protocol_fee_payment() {
    let mut f = fixture_with(ExchangeConfig::default().with_protocol_fee(10, COLLECTOR));
    f.backend.set_native_balance(f.taker, 100);
    let orders = vec![f.limit(100, 100, 1), f.limit(100, 100, 2)];
    let sigs: Vec<Signature> = orders.iter().map(|o| f.sign(o.order_hash())).collect();
    let ctx = f.taker_ctx().with_gas_price(1);

    let results = f
        .engine
        .batch_fill_limit_orders(&mut f.backend, ctx, &orders, &sigs, &[50, 50], 15, false)
        .unwrap();
    assert!(results.entries[0].outcome.is_filled());
    assert_eq!(
        results.entries[1].outcome,
        FillOutcome::Skipped(EngineError::InsufficientProtocolFee {
            required: 10,
            available: 5
        })
    );
    assert_eq!(results.protocol_fee_paid, 10);
    assert_eq!(results.refund, 5);
    assert_eq!(f.backend.native_balance(f.taker), 90);
    assert_eq!(f.backend.native_balance(COLLECTOR), 10);
}

// queries

#[test]
fn relevant_state_is_capped_by_maker_funds() {
    let mut f = fixture();
    f.backend.set_balance(BASE, f.maker_addr, 30);
    let order = f.limit(100, 200, 1);
    let sig = f.sign(order.order_hash());

    let state = f.engine.get_limit_order_relevant_state(&f.backend, &order, &sig);
    assert_eq!(state.fillable_quote_amount, 60);
    assert!(state.is_signature_valid);

    // computed the same way for a bad signature
    let state = f
        .engine
        .get_limit_order_relevant_state(&f.backend, &order, &Signature::invalid());
    assert_eq!(state.fillable_quote_amount, 60);
    assert!(!state.is_signature_valid);

    f.backend.set_allowance(BASE, f.maker_addr, 10);
    let state = f.engine.get_limit_order_relevant_state(&f.backend, &order, &sig);
    assert_eq!(state.fillable_quote_amount, 20);

    f.engine.cancel_limit_order(f.maker_ctx(), &order).unwrap();
    let state = f.engine.get_limit_order_relevant_state(&f.backend, &order, &sig);
    assert_eq!(state.info.status, OrderStatus::Cancelled);
    assert_eq!(state.fillable_quote_amount, 0);
}

#[test]
fn batch_relevant_states() {
    let f = fixture();
    let orders = vec![f.rfq(100, 100, 1), f.rfq(100, 100, 2)];
    let sigs: Vec<Signature> = orders.iter().map(|o| f.sign(o.order_hash())).collect();

    let states = f
        .engine
        .batch_get_rfq_order_relevant_states(&f.backend, &orders, &sigs)
        .unwrap();
    assert_eq!(states.len(), 2);
    assert!(states.iter().all(|s| s.is_signature_valid && s.fillable_quote_amount == 100));

    assert!(f
        .engine
        .batch_get_rfq_order_relevant_states(&f.backend, &orders, &sigs[..1])
        .is_err());
}

#[test]
fn order_hash_queries_match_orders() {
    let f = fixture();
    let limit = f.limit(1, 2, 3);
    let rfq = f.rfq(1, 2, 3);
    let otc = f.otc(1, 2, 0, 3);
    assert_eq!(f.engine.get_limit_order_hash(&limit), limit.order_hash());
    assert_eq!(f.engine.get_rfq_order_hash(&rfq), rfq.order_hash());
    assert_eq!(f.engine.get_otc_order_hash(&otc), otc.order_hash());
    assert_ne!(limit.order_hash(), rfq.order_hash());
}
