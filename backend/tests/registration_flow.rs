//! Coordination behaviour across several electors sharing one store.
//!
//! These tests run the domain services against the in-memory doubles from
//! `test_support`, which mirror the PostgreSQL adapter's lease, serialisation
//! and staleness rules without needing a database.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use webhook_receiver::domain::ports::{
    CoordinationStore, DatabaseProvisioning, SubscriptionMappingRepository,
};
use webhook_receiver::domain::{
    AppName, CreationReason, DEFAULT_LEASE_WINDOW, DEFAULT_STALE_AFTER, HeartbeatStatus,
    InstanceId, InstanceRecord, LeaderElector, ReconcileOutcome, RemoteSubscription,
    SchemaInitializer, SubscriptionFilter, SubscriptionMapping, SubscriptionReconciler,
    SubscriptionTarget, WILDCARD_TARGET,
};
use webhook_receiver::test_support::{
    InMemoryCoordinationStore, InMemorySubscriptionMappings, MutableClock,
    ScriptedSubscriptionRegistry,
};

const CALLBACK: &str = "http://host/cb";

struct Fleet {
    clock: Arc<MutableClock>,
    store: Arc<InMemoryCoordinationStore>,
}

impl Fleet {
    async fn heartbeat_of(&self, id: &InstanceId) -> DateTime<Utc> {
        self.store
            .find_instance(id)
            .await
            .expect("store reachable")
            .expect("row exists")
            .heartbeat_at
    }

    fn elector(&self) -> Arc<LeaderElector> {
        Arc::new(LeaderElector::new(
            self.store.clone(),
            app_name(),
            DEFAULT_LEASE_WINDOW,
        ))
    }
}

fn app_name() -> AppName {
    AppName::new("Svc").expect("valid app name")
}

fn target() -> SubscriptionTarget {
    SubscriptionTarget {
        app_name: app_name(),
        callback_url: CALLBACK.to_owned(),
        action: "RUN".to_owned(),
        event_type: "MACRO".to_owned(),
    }
}

#[fixture]
fn fleet() -> Fleet {
    let start = Utc
        .with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
        .single()
        .expect("valid start time");
    let clock = Arc::new(MutableClock::new(start));
    Fleet {
        store: Arc::new(InMemoryCoordinationStore::new(clock.clone())),
        clock,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_elect_exactly_one_leader(fleet: Fleet) {
    let electors: Vec<_> = (0..8).map(|_| fleet.elector()).collect();

    let handles: Vec<_> = electors
        .iter()
        .cloned()
        .map(|elector| tokio::spawn(async move { elector.try_become_leader().await }))
        .collect();
    let mut winners = 0;
    for handle in handles {
        if handle.await.expect("claim task") {
            winners += 1;
        }
    }

    assert_eq!(winners, 1, "exactly one claim should win");
    assert_eq!(fleet.store.flagged_leaders(&app_name()).len(), 1);
    assert_eq!(
        electors
            .iter()
            .filter(|elector| elector.leadership().is_leader())
            .count(),
        1,
        "only the winner publishes leadership"
    );
}

#[rstest]
#[tokio::test]
async fn repeated_claims_by_the_leader_keep_leadership(fleet: Fleet) {
    let leader = fleet.elector();
    let follower = fleet.elector();

    assert!(leader.try_become_leader().await);
    assert!(!follower.try_become_leader().await);
    assert!(leader.try_become_leader().await, "leader retains its role");

    assert_eq!(
        fleet.store.flagged_leaders(&app_name()),
        vec![leader.instance_id()]
    );
}

#[rstest]
#[case::inside_lease(29, false)]
#[case::at_lease_boundary(30, true)]
#[case::after_lease(31, true)]
#[tokio::test]
async fn silent_leader_is_replaced_once_its_lease_lapses(
    fleet: Fleet,
    #[case] silence_secs: i64,
    #[case] follower_takes_over: bool,
) {
    let incumbent = fleet.elector();
    let challenger = fleet.elector();
    assert!(incumbent.try_become_leader().await);

    fleet.clock.advance_seconds(silence_secs);

    assert_eq!(challenger.try_become_leader().await, follower_takes_over);
    assert_eq!(fleet.store.flagged_leaders(&app_name()).len(), 1);
}

#[rstest]
#[tokio::test]
async fn heartbeats_hold_the_lease(fleet: Fleet) {
    let leader = fleet.elector();
    let follower = fleet.elector();
    assert!(leader.try_become_leader().await);

    for _ in 0..6 {
        fleet.clock.advance_seconds(10);
        assert_eq!(
            leader.update_heartbeat().await.expect("heartbeat"),
            HeartbeatStatus::Leader
        );
        assert!(!follower.try_become_leader().await);
    }
}

#[rstest]
#[tokio::test]
async fn deposed_leader_learns_of_demotion_on_next_heartbeat(fleet: Fleet) {
    let deposed = fleet.elector();
    let successor = fleet.elector();
    assert!(deposed.try_become_leader().await);

    fleet.clock.advance_seconds(45);
    assert!(successor.try_become_leader().await);

    assert_eq!(
        deposed.update_heartbeat().await.expect("heartbeat"),
        HeartbeatStatus::Follower
    );
    assert!(!deposed.leadership().is_leader());
    assert!(!deposed.is_leader().await);
    assert!(successor.is_leader().await);
}

#[rstest]
#[tokio::test]
async fn heartbeat_timestamps_never_move_backwards(fleet: Fleet) {
    let leader = fleet.elector();
    assert!(leader.try_become_leader().await);
    fleet.clock.advance_seconds(20);
    leader.update_heartbeat().await.expect("heartbeat");
    let recorded = fleet.heartbeat_of(&leader.instance_id()).await;

    fleet.clock.advance_seconds(-15);
    leader.update_heartbeat().await.expect("heartbeat");

    let after = fleet.heartbeat_of(&leader.instance_id()).await;
    assert_eq!(after, recorded, "an earlier clock must not rewind the lease");
}

#[rstest]
#[tokio::test]
async fn startup_purge_removes_only_stale_rows(fleet: Fleet) {
    let now = fleet.clock.utc();
    let stale = InstanceId::generate();
    let fresh = InstanceId::generate();
    for (id, age_secs) in [(stale, 301), (fresh, 299)] {
        let heartbeat_at = now - TimeDelta::seconds(age_secs);
        fleet.store.insert_record(InstanceRecord {
            id,
            app_name: app_name(),
            is_leader: false,
            heartbeat_at,
            created_at: heartbeat_at,
        });
    }

    let report = SchemaInitializer::new(fleet.store.clone(), DEFAULT_STALE_AFTER)
        .initialize()
        .expect("initialization succeeds");

    assert_eq!(report.database, DatabaseProvisioning::Created);
    assert_eq!(report.purged_instances, 1);
    let remaining: Vec<_> = fleet.store.records().into_iter().map(|row| row.id).collect();
    assert_eq!(remaining, vec![fresh]);
}

#[rstest]
#[tokio::test]
async fn empty_registry_and_store_create_one_subscription(fleet: Fleet) {
    let registry = Arc::new(ScriptedSubscriptionRegistry::new());
    let mappings = Arc::new(InMemorySubscriptionMappings::new(fleet.clock.clone()));
    let reconciler = SubscriptionReconciler::new(registry.clone(), mappings.clone(), target());

    let id = reconciler
        .get_or_create_subscription()
        .await
        .expect("subscription id");

    let created = registry.subscriptions();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].id, id);
    assert_eq!(created[0].callback, CALLBACK);
    assert_eq!(created[0].filter.target_id.as_deref(), Some(WILDCARD_TARGET));
    let mapping = mappings.get(&app_name()).expect("mapping persisted");
    assert_eq!(mapping.external_subscription_id, id);
    assert_eq!(mapping.callback_url, CALLBACK);
}

#[rstest]
#[tokio::test]
async fn reconciliation_is_idempotent(fleet: Fleet) {
    let registry = Arc::new(ScriptedSubscriptionRegistry::new());
    let mappings = Arc::new(InMemorySubscriptionMappings::new(fleet.clock.clone()));
    let reconciler = SubscriptionReconciler::new(registry.clone(), mappings.clone(), target());

    let first = reconciler.reconcile().await.expect("first pass");
    let second = reconciler.reconcile().await.expect("second pass");

    assert!(matches!(
        first,
        ReconcileOutcome::Created {
            reason: CreationReason::RegistryEmpty,
            ..
        }
    ));
    assert_eq!(
        second,
        ReconcileOutcome::Consistent {
            subscription_id: first.subscription_id().to_owned()
        }
    );
    assert_eq!(registry.create_calls(), 1, "no second remote subscription");
}

#[rstest]
#[tokio::test]
async fn registry_id_overrides_a_stale_local_mapping(fleet: Fleet) {
    let registry = Arc::new(ScriptedSubscriptionRegistry::with_subscriptions(vec![
        RemoteSubscription {
            id: "sub-42".to_owned(),
            callback: CALLBACK.to_owned(),
            filter: SubscriptionFilter::default(),
        },
    ]));
    let mappings = Arc::new(InMemorySubscriptionMappings::new(fleet.clock.clone()));
    let now = fleet.clock.utc();
    mappings.insert(SubscriptionMapping {
        app_name: app_name(),
        external_subscription_id: "sub-7".to_owned(),
        callback_url: CALLBACK.to_owned(),
        created_at: now,
        updated_at: now,
    });
    let reconciler = SubscriptionReconciler::new(registry.clone(), mappings.clone(), target());

    let outcome = reconciler.reconcile().await.expect("reconciled");

    assert_eq!(
        outcome,
        ReconcileOutcome::Replaced {
            subscription_id: "sub-42".to_owned(),
            stale_id: "sub-7".to_owned(),
        }
    );
    let stored = mappings
        .find_by_app(&app_name())
        .await
        .expect("lookup")
        .expect("mapping");
    assert_eq!(stored.external_subscription_id, "sub-42");
    assert_eq!(registry.create_calls(), 0);
}

#[rstest]
#[tokio::test]
async fn only_the_leader_reconciles(fleet: Fleet) {
    let registry = Arc::new(ScriptedSubscriptionRegistry::new());
    let mappings = Arc::new(InMemorySubscriptionMappings::new(fleet.clock.clone()));
    let electors = [fleet.elector(), fleet.elector(), fleet.elector()];

    for elector in &electors {
        if elector.try_become_leader().await {
            SubscriptionReconciler::new(registry.clone(), mappings.clone(), target())
                .get_or_create_subscription()
                .await
                .expect("leader reconciles");
        }
    }

    assert_eq!(registry.create_calls(), 1);
    assert!(mappings.get(&app_name()).is_some());
}
