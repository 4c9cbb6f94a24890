//! Signed order settlement simulation.
//!
//! Walks makers and takers through limit, rfq and otc fills, cancels and
//! batches against the in-memory settlement backend.

use std::error::Error;

use k256::ecdsa::SigningKey;
use settlement_core::*;

type SimResult = Result<(), Box<dyn Error>>;

const BASE: Address = Address::new([0xaa; 20]);
const QUOTE: Address = Address::new([0xbb; 20]);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info,settlement_core=info".into()))
        .with_target(true)
        .compact()
        .init();

    println!("Signed Order Settlement Simulation\n");

    let scenarios: [(&str, fn() -> SimResult); 5] = [
        ("limit partial fill", scenario_1_limit_partial_fill),
        ("rfq via allowed relayer", scenario_2_rfq_relayed),
        ("otc nonce burn", scenario_3_otc_nonce),
        ("pair cancel", scenario_4_pair_cancel),
        ("batch fill", scenario_5_batch_fill),
    ];

    for (name, scenario) in scenarios {
        if let Err(e) = scenario() {
            println!("  scenario '{}' failed: {}", name, e);
            std::process::exit(1);
        }
    }

    println!("\nAll simulations completed successfully.");
}

struct Trader {
    key: SigningKey,
    address: Address,
}

impl Trader {
    fn new(seed: u8) -> Result<Self, Box<dyn Error>> {
        let key = SigningKey::from_bytes((&[seed; 32]).into())?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    fn sign(&self, hash: OrderHash) -> Result<Signature, Box<dyn Error>> {
        Signature::sign(&self.key, hash, SignatureType::Eip712).ok_or_else(|| "signing failed".into())
    }
}

fn setup(config: ExchangeConfig) -> Result<(Engine, InMemorySettlement), Box<dyn Error>> {
    config.validate()?;
    let mut engine = Engine::new(EngineConfig::new(config));
    engine.set_time(Timestamp::now());
    let backend = InMemorySettlement::new();
    tracing::debug!(backend = backend.backend_type(), time = %engine.time(), "simulation ready");
    Ok((engine, backend))
}

fn common(engine: &Engine, maker: Address, base_amount: u128, quote_amount: u128) -> CommonOrderFields {
    CommonOrderFields {
        base_token: BASE,
        quote_token: QUOTE,
        base_amount,
        quote_amount,
        maker,
        taker: Address::ZERO,
        domain: *engine.domain(),
    }
}

/// A maker posts a limit order with a taker fee, a taker fills part of it.
fn scenario_1_limit_partial_fill() -> SimResult {
    println!("Scenario 1: Limit Order Partial Fill\n");

    let collector = Address::repeat_byte(0xfc);
    let (mut engine, mut backend) =
        setup(ExchangeConfig::default().with_protocol_fee(1_000, collector))?;
    let maker = Trader::new(1)?;
    let taker = Address::repeat_byte(0x22);

    backend.set_balance(BASE, maker.address, 1_000);
    backend.set_balance(QUOTE, taker, 10_000);
    backend.set_native_balance(taker, 1_000_000);

    let order = LimitOrder {
        common: common(&engine, maker.address, 1_000, 2_000),
        quote_fee_amount: 20,
        sender: Address::ZERO,
        fee_recipient: Address::repeat_byte(0xfe),
        pool: PoolId::default(),
        expiry: engine.time().plus_secs(3_600),
        salt: U256::from(1u8),
    };
    let signature = maker.sign(order.order_hash())?;

    let ctx = CallContext::external(taker).with_gas_price(100);
    let result = engine.fill_limit_order(&mut backend, ctx, &order, &signature, 500, 150_000)?;
    println!(
        "  Filled {} quote for {} base, fee {}, protocol fee {}, refund {}",
        result.fill.quote_filled,
        result.fill.base_filled,
        result.fill.quote_fee_filled,
        result.protocol_fee_paid,
        result.refund
    );

    // asks for more than remains, gets clamped
    let result = engine.fill_limit_order(&mut backend, ctx, &order, &signature, 5_000, 100_000)?;
    println!("  Second fill clamped to {}", result.fill.quote_filled);

    let info = engine.get_limit_order_info(&order);
    println!("  Status: {}, filled {}\n", info.status, info.quote_filled_amount);
    Ok(())
}

/// An rfq order restricted to a market maker's origin, filled by a relayer
/// the origin registered.
fn scenario_2_rfq_relayed() -> SimResult {
    println!("Scenario 2: RFQ Through An Allowed Relayer\n");

    let (mut engine, mut backend) = setup(ExchangeConfig::default())?;
    let maker = Trader::new(2)?;
    let origin = Address::repeat_byte(0x33);
    let relayer = Address::repeat_byte(0x44);

    backend.set_balance(BASE, maker.address, 300);
    backend.set_balance(QUOTE, relayer, 1_000);

    let order = RfqOrder {
        common: common(&engine, maker.address, 300, 1_000),
        origin,
        pool: PoolId::default(),
        expiry: engine.time().plus_secs(60),
        salt: U256::from(7u8),
    };
    let signature = maker.sign(order.order_hash())?;

    let relayed = CallContext::relayed(relayer, relayer);
    match engine.fill_rfq_order(&mut backend, relayed, &order, &signature, 1_000) {
        Err(e) => println!("  Before registration: {}", e),
        Ok(_) => println!("  Before registration: unexpectedly filled"),
    }

    engine.register_allowed_origins(CallContext::external(origin), &[relayer], true)?;
    let fill = engine.fill_rfq_order(&mut backend, relayed, &order, &signature, 1_000)?;
    println!("  After registration: {} quote for {} base\n", fill.quote_filled, fill.base_filled);
    Ok(())
}

/// Otc orders are single use: the nonce is burned by the first fill.
fn scenario_3_otc_nonce() -> SimResult {
    println!("Scenario 3: OTC Nonce Burn\n");

    let (mut engine, mut backend) = setup(ExchangeConfig::default())?;
    let maker = Trader::new(3)?;
    let taker = Address::repeat_byte(0x55);

    backend.set_balance(BASE, maker.address, 1_000);
    backend.set_balance(QUOTE, taker, 1_000);

    let packed = OtcOrder::pack_expiry_and_nonce(engine.time().plus_secs(60), 0, 1);
    let order = OtcOrder::new(common(&engine, maker.address, 100, 400), Address::ZERO, packed);
    let signature = maker.sign(order.order_hash())?;

    let ctx = CallContext::external(taker);
    let fill = engine.fill_otc_order(&mut backend, ctx, &order, &signature, 200)?;
    println!("  Partial fill of {} quote burns nonce {}", fill.quote_filled, order.nonce());
    println!("  Status now: {}", engine.get_otc_order_info(&order).status);

    if let Err(e) = engine.fill_otc_order(&mut backend, ctx, &order, &signature, 200) {
        println!("  Refill rejected: {}\n", e);
    }
    Ok(())
}

/// Raising the pair threshold cancels every lower salt at once.
fn scenario_4_pair_cancel() -> SimResult {
    println!("Scenario 4: Pair Cancel\n");

    let (mut engine, _backend) = setup(ExchangeConfig::default())?;
    let maker = Trader::new(4)?;

    let orders: Vec<LimitOrder> = (1..=3u8)
        .map(|salt| LimitOrder {
            common: common(&engine, maker.address, 10, 10),
            quote_fee_amount: 0,
            sender: Address::ZERO,
            fee_recipient: Address::ZERO,
            pool: PoolId::default(),
            expiry: engine.time().plus_secs(60),
            salt: U256::from(salt),
        })
        .collect();

    engine.cancel_pair_limit_orders(CallContext::external(maker.address), BASE, QUOTE, U256::from(3u8))?;
    for order in orders.into_iter().map(NativeOrder::from) {
        let info = engine.get_order_info(&order);
        println!("  salt {:?}: {} ({})", order.salt(), info.status, info.order_hash);
    }
    println!();
    Ok(())
}

/// Best-effort batches skip bad elements, atomic batches roll back.
fn scenario_5_batch_fill() -> SimResult {
    println!("Scenario 5: Batch Fill\n");

    let (mut engine, mut backend) = setup(ExchangeConfig::default())?;
    let maker = Trader::new(5)?;
    let taker = Address::repeat_byte(0x66);

    backend.set_balance(BASE, maker.address, 1_000);
    backend.set_balance(QUOTE, taker, 1_000);

    let orders: Vec<RfqOrder> = (1..=3u8)
        .map(|salt| RfqOrder {
            common: common(&engine, maker.address, 100, 100),
            origin: Address::ZERO,
            pool: PoolId::default(),
            expiry: engine.time().plus_secs(60),
            salt: U256::from(salt),
        })
        .collect();
    let mut signatures = orders
        .iter()
        .map(|o| maker.sign(o.order_hash()))
        .collect::<Result<Vec<_>, _>>()?;
    signatures[1] = Signature::invalid();

    let ctx = CallContext::external(taker);
    let amounts = [100, 100, 100];

    match engine.batch_fill_rfq_orders(&mut backend, ctx, &orders, &signatures, &amounts, true) {
        Err(e) => println!("  Atomic batch: {}", e),
        Ok(_) => println!("  Atomic batch: unexpectedly filled"),
    }
    println!("  Taker quote balance after rollback: {}", backend.balance(QUOTE, taker));

    let results = engine.batch_fill_rfq_orders(&mut backend, ctx, &orders, &signatures, &amounts, false)?;
    for entry in &results.entries {
        match &entry.outcome {
            FillOutcome::Filled(fill) => println!("  {}: filled {}", entry.order_hash, fill.quote_filled),
            FillOutcome::Skipped(e) => println!("  {}: skipped ({})", entry.order_hash, e),
        }
    }
    println!("  Total filled: {}", results.total_quote_filled());
    Ok(())
}
