//! End-to-end charge runs over the in-memory adapters.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crm_payments::adapters::{
    InMemoryEventBus, InMemoryPaymentLog, InMemoryPaymentStore, InMemorySubscriptionTypeReader,
    MockGatewayClient, StaticGatewayRegistry, SubscriptionLengthCalculator,
};
use crm_payments::application::{
    ChargeRecurrentPaymentsCommand, ChargeRecurrentPaymentsHandler, ChargeRunSummary,
};
use crm_payments::domain::charging::ChargingSettings;
use crm_payments::domain::foundation::{
    PaymentId, PaymentToken, SubscriptionTypeId, Timestamp, UserId,
};
use crm_payments::domain::payment::{
    generate_variable_symbol, AdditionalType, NewPayment, Payment, PaymentItemType, PaymentStatus,
};
use crm_payments::domain::recurrent::{
    NewRecurrentPayment, RecurrentPayment, RecurrentPaymentChargeFailed, RecurrentPaymentState,
};
use crm_payments::domain::subscription::{SubscriptionType, SubscriptionTypeItem};
use crm_payments::ports::{
    ChargeOutcome, GatewayResponse, PaymentRepository, RecurrentPaymentRepository,
};

const GATEWAY: &str = "comfortpay";

struct World {
    store: InMemoryPaymentStore,
    log: InMemoryPaymentLog,
    bus: Arc<InMemoryEventBus>,
    gateway: Arc<MockGatewayClient>,
    catalogue: InMemorySubscriptionTypeReader,
    handler: ChargeRecurrentPaymentsHandler,
    settings: ChargingSettings,
}

impl World {
    fn new() -> Self {
        let store = InMemoryPaymentStore::new();
        let log = InMemoryPaymentLog::new();
        let bus = Arc::new(InMemoryEventBus::new());
        let gateway = Arc::new(MockGatewayClient::new(GATEWAY));
        let catalogue = InMemorySubscriptionTypeReader::new();
        let handler = ChargeRecurrentPaymentsHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(catalogue.clone()),
            Arc::new(StaticGatewayRegistry::new().with(gateway.clone())),
            Arc::new(log.clone()),
            Arc::new(SubscriptionLengthCalculator::default()),
            bus.clone(),
        );
        Self {
            store,
            log,
            bus,
            gateway,
            catalogue,
            handler,
            settings: ChargingSettings {
                donation_vat_rate: Some(dec!(0)),
                ..ChargingSettings::default()
            },
        }
    }

    fn subscription_type(&self, code: &str, items: &[(&str, Decimal, Decimal)]) -> SubscriptionType {
        let subscription_type = SubscriptionType {
            id: SubscriptionTypeId::new(),
            code: code.to_string(),
            name: code.to_string(),
            price: items.iter().map(|(_, amount, _)| *amount).sum(),
            length_days: 30,
            items: items
                .iter()
                .map(|(name, amount, vat)| SubscriptionTypeItem {
                    name: name.to_string(),
                    amount: *amount,
                    vat: *vat,
                })
                .collect(),
            next_subscription_type_id: None,
            active: true,
        };
        self.catalogue.insert(subscription_type.clone());
        subscription_type
    }

    async fn recurrent(&self, new: NewRecurrentPayment, now: Timestamp) -> RecurrentPayment {
        let rp = RecurrentPayment::create(new, now).unwrap();
        RecurrentPaymentRepository::save(&self.store, &rp).await.unwrap();
        rp
    }

    async fn run(&self, now: Timestamp) -> ChargeRunSummary {
        self.handler
            .handle(ChargeRecurrentPaymentsCommand {
                now,
                settings: self.settings.clone(),
            })
            .await
            .unwrap()
    }

    async fn payment(&self, id: PaymentId) -> Payment {
        PaymentRepository::find_by_id(&self.store, &id)
            .await
            .unwrap()
            .unwrap()
    }
}

fn token(value: &str) -> PaymentToken {
    PaymentToken::new(value).unwrap()
}

fn due_row(subscription_type: &SubscriptionType, cid: &str, retries: i32, now: Timestamp) -> NewRecurrentPayment {
    NewRecurrentPayment {
        token: token(cid),
        user_id: UserId::new("user-1").unwrap(),
        gateway_code: GATEWAY.to_string(),
        subscription_type_id: subscription_type.id,
        next_subscription_type_id: None,
        parent_payment_id: None,
        charge_at: now.add_minutes(-5),
        expires_at: None,
        retries,
        custom_amount: None,
    }
}

#[tokio::test]
async fn soft_declines_retry_once_then_stop() {
    let world = World::new();
    let monthly = world.subscription_type("monthly", &[("Web", dec!(5.00), dec!(20))]);
    world
        .gateway
        .set_default_outcome(ChargeOutcome::TransientFailure(GatewayResponse::new("51", "Insufficient funds")));
    let t0 = Timestamp::now();
    let original = world.recurrent(due_row(&monthly, "cid-1", 2, t0), t0).await;

    // First attempt: one retry row is scheduled.
    let first = world.run(t0).await;
    assert_eq!(first.selected, 1);
    assert_eq!(first.failed, 1);

    let chain = world.store.chain_of(&token("cid-1"));
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].id, original.id);
    assert_eq!(chain[0].state, RecurrentPaymentState::ChargeFailed);
    assert_eq!(chain[0].status.as_deref(), Some("51"));
    let retry = &chain[1];
    assert_eq!(retry.state, RecurrentPaymentState::Active);
    assert_eq!(retry.retries, 1);
    assert!(retry.status.is_none());
    // Two of four default retries used up: third delay entry.
    assert_eq!(retry.charge_at, t0.add_hours(48));
    let failed: Vec<RecurrentPaymentChargeFailed> =
        world.bus.payloads_of("recurrent_payment.charge_failed.v1");
    assert_eq!(failed[0].retry_recurrent_payment_id, retry.id);

    // Nothing is due before the retry date.
    assert_eq!(world.run(t0.add_hours(1)).await.selected, 0);

    // Second attempt: no retries left.
    let second = world.run(t0.add_hours(49)).await;
    assert_eq!(second.selected, 1);
    assert_eq!(second.stopped, 1);

    let chain = world.store.chain_of(&token("cid-1"));
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[1].state, RecurrentPaymentState::SystemStop);
    assert!(chain[1].note.as_deref().unwrap().contains("No retries left"));

    let payments = world.store.payments();
    assert_eq!(payments.len(), 2);
    assert!(payments.iter().all(|p| p.status == PaymentStatus::Fail));
    assert_eq!(world.log.entries().len(), 2);
    assert_eq!(world.run(t0.add_days(30)).await.selected, 0);
}

#[tokio::test]
async fn success_schedules_next_cycle_from_charge_time() {
    let world = World::new();
    let monthly = world.subscription_type("monthly", &[("Web", dec!(5.00), dec!(20))]);
    let now = Timestamp::now();
    let rp = world.recurrent(due_row(&monthly, "cid-1", 3, now), now).await;

    let summary = world.run(now).await;

    assert_eq!(summary.charged, 1);
    let chain = world.store.chain_of(&token("cid-1"));
    assert_eq!(chain.len(), 2);
    let charged = &chain[0];
    assert_eq!(charged.state, RecurrentPaymentState::Charged);
    assert_eq!(charged.charged_at, Some(now));
    let next = &chain[1];
    assert_eq!(next.state, RecurrentPaymentState::Active);
    assert_eq!(next.retries, world.settings.default_retries);
    assert_eq!(next.charge_at, now.add_days(30));
    assert_eq!(next.parent_payment_id, charged.payment_id);
    assert_ne!(next.id, rp.id);

    let payment = world.payment(charged.payment_id.unwrap()).await;
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert!(payment.recurrent_charge);
    assert_eq!(payment.amount, dec!(5.00));
}

#[tokio::test]
async fn resumed_record_reuses_its_linked_payment() {
    let world = World::new();
    let monthly = world.subscription_type("monthly", &[("Web", dec!(5.00), dec!(20))]);
    let now = Timestamp::now();
    let mut rp = world.recurrent(due_row(&monthly, "cid-1", 3, now), now).await;

    // A previous run linked a payment and stopped before charging.
    let linked = Payment::create(
        NewPayment {
            id: PaymentId::new(),
            variable_symbol: generate_variable_symbol(),
            user_id: rp.user_id.clone(),
            gateway_code: GATEWAY.to_string(),
            subscription_type_id: Some(monthly.id),
            subscription_id: None,
            items: monthly.payment_items(),
            amount: None,
            additional_amount: None,
            additional_type: None,
            recurrent_charge: true,
            note: None,
        },
        now,
    )
    .unwrap();
    PaymentRepository::save(&world.store, &linked).await.unwrap();
    rp.attach_payment(linked.id, now);
    RecurrentPaymentRepository::update(&world.store, &rp).await.unwrap();

    let summary = world.run(now).await;

    assert_eq!(summary.charged, 1);
    assert_eq!(world.store.payments().len(), 1);
    assert_eq!(world.gateway.calls()[0].args[0], linked.id.to_string());
    assert_eq!(world.payment(linked.id).await.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn duplicate_rows_for_one_token_charge_once() {
    let world = World::new();
    let monthly = world.subscription_type("monthly", &[("Web", dec!(5.00), dec!(20))]);
    let now = Timestamp::now();
    world.recurrent(due_row(&monthly, "cid-1", 3, now), now).await;
    world.recurrent(due_row(&monthly, "cid-1", 3, now), now).await;

    let summary = world.run(now).await;

    assert_eq!(summary.selected, 2);
    assert_eq!(summary.charged, 1);
    assert_eq!(summary.stopped, 1);
    assert_eq!(world.gateway.call_count("charge"), 1);
    let stopped: Vec<RecurrentPayment> = world
        .store
        .chain_of(&token("cid-1"))
        .into_iter()
        .filter(|rp| rp.state == RecurrentPaymentState::SystemStop)
        .collect();
    assert_eq!(stopped.len(), 1);
    assert!(stopped[0].note.as_deref().unwrap().contains("Fast charge"));
    assert!(stopped[0].payment_id.is_none());
}

#[tokio::test]
async fn custom_amount_is_split_and_donation_repeated() {
    let world = World::new();
    let bundle = world.subscription_type(
        "print_web",
        &[("Print", dec!(4.00), dec!(10)), ("Web", dec!(1.00), dec!(20))],
    );
    let now = Timestamp::now();
    let parent = Payment::create(
        NewPayment {
            id: PaymentId::new(),
            variable_symbol: generate_variable_symbol(),
            user_id: UserId::new("user-1").unwrap(),
            gateway_code: GATEWAY.to_string(),
            subscription_type_id: Some(bundle.id),
            subscription_id: None,
            items: bundle.payment_items(),
            amount: None,
            additional_amount: Some(dec!(2.00)),
            additional_type: Some(AdditionalType::Recurrent),
            recurrent_charge: false,
            note: None,
        },
        now,
    )
    .unwrap();
    PaymentRepository::save(&world.store, &parent).await.unwrap();
    let rp = world
        .recurrent(
            NewRecurrentPayment {
                parent_payment_id: Some(parent.id),
                custom_amount: Some(dec!(6.00)),
                ..due_row(&bundle, "cid-1", 3, now)
            },
            now,
        )
        .await;

    let summary = world.run(now).await;

    assert_eq!(summary.charged, 1);
    let charged = RecurrentPaymentRepository::find_by_id(&world.store, &rp.id)
        .await
        .unwrap()
        .unwrap();
    let payment = world.payment(charged.payment_id.unwrap()).await;
    assert_eq!(payment.amount, dec!(8.00));
    assert_eq!(payment.additional_amount, Some(dec!(2.00)));
    let subscription_total: Decimal = payment
        .items
        .items()
        .iter()
        .filter(|item| item.item_type == PaymentItemType::Subscription)
        .map(|item| item.total_price())
        .sum();
    assert_eq!(subscription_total, dec!(6.00));
    let donation = payment.items.donation().unwrap();
    assert_eq!(donation.total_price(), dec!(2.00));

    // The custom amount carries over to the next cycle.
    let chain = world.store.chain_of(&token("cid-1"));
    assert_eq!(chain[1].custom_amount, Some(dec!(6.00)));
    assert_eq!(chain[1].parent_payment_id, Some(payment.id));
}

#[tokio::test]
async fn scheduled_upgrade_bills_the_new_type() {
    let world = World::new();
    let basic = world.subscription_type("basic", &[("Web", dec!(5.00), dec!(20))]);
    let premium = world.subscription_type("premium", &[("Web premium", dec!(9.00), dec!(20))]);
    let now = Timestamp::now();
    world
        .recurrent(
            NewRecurrentPayment {
                next_subscription_type_id: Some(premium.id),
                custom_amount: Some(dec!(2.50)),
                ..due_row(&basic, "cid-1", 3, now)
            },
            now,
        )
        .await;

    world.run(now).await;

    let chain = world.store.chain_of(&token("cid-1"));
    let payment = world.payment(chain[0].payment_id.unwrap()).await;
    assert_eq!(payment.amount, dec!(2.50));
    assert_eq!(payment.subscription_type_id, Some(premium.id));
    let next = &chain[1];
    assert_eq!(next.subscription_type_id, premium.id);
    assert!(next.next_subscription_type_id.is_none());
    assert!(next.custom_amount.is_none());
}

#[tokio::test]
async fn permanent_decline_stops_without_follow_up() {
    let world = World::new();
    let monthly = world.subscription_type("monthly", &[("Web", dec!(5.00), dec!(20))]);
    world
        .gateway
        .set_default_outcome(ChargeOutcome::PermanentFailure(GatewayResponse::new("14", "Invalid card")));
    let now = Timestamp::now();
    let rp = world.recurrent(due_row(&monthly, "cid-1", 3, now), now).await;

    let summary = world.run(now).await;

    assert_eq!(summary.stopped, 1);
    let stored = RecurrentPaymentRepository::find_by_id(&world.store, &rp.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, RecurrentPaymentState::SystemStop);
    assert_eq!(stored.status.as_deref(), Some("14"));
    assert_eq!(world.store.chain_of(&token("cid-1")).len(), 1);
    assert!(world.bus.has_event("recurrent_payment.stopped.v1"));
}

#[tokio::test]
async fn pending_answer_leaves_row_active_but_unselected() {
    let world = World::new();
    let monthly = world.subscription_type("monthly", &[("Web", dec!(5.00), dec!(20))]);
    world
        .gateway
        .set_default_outcome(ChargeOutcome::Pending(GatewayResponse::new("P", "Awaiting bank")));
    let now = Timestamp::now();
    let rp = world.recurrent(due_row(&monthly, "cid-1", 3, now), now).await;

    let summary = world.run(now).await;

    assert_eq!(summary.pending, 1);
    let stored = RecurrentPaymentRepository::find_by_id(&world.store, &rp.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.state, RecurrentPaymentState::Active);
    assert_eq!(stored.status.as_deref(), Some("P"));
    assert_eq!(world.payment(stored.payment_id.unwrap()).await.status, PaymentStatus::Form);
    assert_eq!(world.store.chain_of(&token("cid-1")).len(), 1);
    assert_eq!(world.run(now.add_hours(1)).await.selected, 0);
}
