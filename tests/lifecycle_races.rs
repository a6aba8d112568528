//! Integration tests for concurrent lifecycle operations: quota admission,
//! competing deleters and ownership transfer.

use std::sync::Arc;
use std::time::Duration;
use tempchan::error::LifecycleError;
use tempchan::platform::MemoryPlatform;
use tempchan::state::ids::{ChannelKind, GuildId, Member, Permissions, UserId};
use tempchan::state::managers::{LifecycleManager, Limits};
use tempchan::store::DurableStore;

const G: GuildId = GuildId(1);

fn setup(limits: Limits) -> (Arc<MemoryPlatform>, Arc<LifecycleManager>) {
    let (platform, _) = MemoryPlatform::new();
    let platform = Arc::new(platform);
    let manager = LifecycleManager::new(platform.clone(), DurableStore::ephemeral(), limits, None);
    (platform, manager)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creations_never_exceed_the_quota() {
    let (platform, manager) = setup(Limits::default());
    // Slow creations keep every request in flight at once.
    platform.set_create_latency(Duration::from_millis(50));
    let alice = Member::new(UserId(10), "alice");

    let tasks: Vec<_> = (0..8)
        .map(|n| {
            let manager = manager.clone();
            let alice = alice.clone();
            tokio::spawn(async move {
                manager
                    .create_temp(G, &alice, ChannelKind::Text, &format!("room-{n}"), None)
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut refused = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(LifecycleError::QuotaExceeded { max: 3 }) => refused += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!((created, refused), (3, 5));
    assert_eq!(platform.creates(), 3);
    assert_eq!(manager.count(G, alice.id), 3);
    assert!(manager.index_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_creations_release_their_slot() {
    let limits = Limits {
        max_temp_per_user: 1,
        ..Limits::default()
    };
    let (platform, manager) = setup(limits);
    let alice = Member::new(UserId(10), "alice");

    platform.fail_next_create(tempchan::platform::PlatformError::Timeout);
    let first = manager
        .create_temp(G, &alice, ChannelKind::Text, "first", None)
        .await;
    assert!(matches!(first, Err(LifecycleError::Platform(_))));

    let second = manager
        .create_temp(G, &alice, ChannelKind::Text, "second", None)
        .await
        .unwrap();
    assert_eq!(second.count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_deleters_delete_once() {
    let (platform, manager) = setup(Limits::default());
    let alice = Member::new(UserId(10), "alice");
    let created = manager
        .create_temp(G, &alice, ChannelKind::Voice, "room", None)
        .await
        .unwrap();

    let reclaimers: Vec<_> = (0..6)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.reclaim_if_empty(created.channel).await })
        })
        .collect();
    let owner = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .delete_temp(G, created.channel, UserId(10), Permissions::NONE)
                .await
                .is_ok()
        })
    };

    let mut winners = usize::from(owner.await.unwrap());
    for task in reclaimers {
        winners += usize::from(task.await.unwrap());
    }

    assert_eq!(winners, 1);
    assert_eq!(platform.deletes(), 1);
    assert!(!platform.exists(created.channel));
    assert_eq!(manager.count(G, alice.id), 0);
    assert!(manager.index_consistent());
}

#[tokio::test]
async fn transfer_moves_the_quota_charge() {
    let (_platform, manager) = setup(Limits::default());
    let alice = Member::new(UserId(10), "alice");
    let bob = Member::new(UserId(11), "bob");

    let mut bobs = Vec::new();
    for n in 0..3 {
        let created = manager
            .create_temp(G, &bob, ChannelKind::Text, &format!("bob-{n}"), None)
            .await
            .unwrap();
        bobs.push(created.channel);
    }
    let gift = manager
        .create_temp(G, &alice, ChannelKind::Text, "gift", None)
        .await
        .unwrap();

    // Strangers cannot transfer.
    assert!(matches!(
        manager.transfer_ownership(G, gift.channel, bob.id, bob.id),
        Err(LifecycleError::NotAuthorized)
    ));

    // The receiver's quota is not checked.
    manager
        .transfer_ownership(G, gift.channel, alice.id, bob.id)
        .unwrap();
    assert_eq!(manager.count(G, alice.id), 0);
    assert_eq!(manager.count(G, bob.id), 4);
    assert_eq!(manager.record_of(gift.channel).unwrap().owner_id, bob.id);
    assert!(manager.index_consistent());

    // Alice's freed slot is usable again; bob is over quota until he closes
    // enough channels.
    assert!(
        manager
            .create_temp(G, &alice, ChannelKind::Text, "again", None)
            .await
            .is_ok()
    );
    assert!(matches!(
        manager
            .create_temp(G, &bob, ChannelKind::Text, "more", None)
            .await,
        Err(LifecycleError::QuotaExceeded { max: 3 })
    ));
    for channel in bobs.iter().take(2) {
        manager
            .delete_temp(G, *channel, bob.id, Permissions::NONE)
            .await
            .unwrap();
    }
    assert!(
        manager
            .create_temp(G, &bob, ChannelKind::Text, "more", None)
            .await
            .is_ok()
    );
}
