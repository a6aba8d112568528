//! Integration tests for reclamation driven by platform events and
//! watchers, on a paused clock.

use std::sync::Arc;
use std::time::Duration;
use tempchan::handlers::spawn_event_router;
use tempchan::platform::MemoryPlatform;
use tempchan::state::ids::{ChannelKind, GuildId, Member, UserId};
use tempchan::state::managers::{LifecycleManager, Limits};
use tempchan::store::DurableStore;
use tokio::time::sleep;

const G: GuildId = GuildId(1);

fn setup() -> (Arc<MemoryPlatform>, Arc<LifecycleManager>) {
    let (platform, events) = MemoryPlatform::new();
    let platform = Arc::new(platform);
    let manager = LifecycleManager::new(
        platform.clone(),
        DurableStore::ephemeral(),
        Limits::default(),
        None,
    );
    spawn_event_router(manager.clone(), events);
    (platform, manager)
}

#[tokio::test(start_paused = true)]
async fn occupied_channels_survive_until_their_last_member_leaves() {
    let (platform, manager) = setup();
    let lobby = platform.add_channel(G, ChannelKind::Voice, "lobby");
    manager.setup_hosting(G, lobby, ChannelKind::Voice, None, UserId(1));
    let alice = Member::new(UserId(10), "alice");
    let bob = Member::new(UserId(11), "bob");

    platform.join_voice(G, alice.clone(), lobby).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    let channel = manager.list_owned(G, alice.id)[0];
    platform.join_voice(G, bob.clone(), channel).await.unwrap();

    // Many poll intervals pass with members inside.
    sleep(Duration::from_secs(120)).await;
    assert!(platform.exists(channel));
    assert!(manager.watchers().contains(channel));

    // The owner leaving is not enough while bob stays.
    platform.leave_voice(G, alice.clone()).await;
    sleep(Duration::from_secs(1)).await;
    assert!(platform.exists(channel));

    platform.leave_voice(G, bob.clone()).await;
    sleep(Duration::from_secs(1)).await;
    assert!(!platform.exists(channel));
    assert_eq!(manager.count(G, alice.id), 0);
    assert_eq!(platform.deletes(), 1);

    // The watcher notices the missing record and stops.
    sleep(Duration::from_secs(15)).await;
    assert!(manager.watchers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn channels_nobody_enters_are_reclaimed_by_the_watcher() {
    let (platform, manager) = setup();
    let lobby = platform.add_channel(G, ChannelKind::Voice, "lobby");
    manager.setup_hosting(G, lobby, ChannelKind::Voice, None, UserId(1));
    let alice = Member::new(UserId(10), "alice");

    // The move into the new channel fails, so no departure ever fires
    // for it.
    platform.fail_moves(true);
    platform.join_voice(G, alice.clone(), lobby).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    let channel = manager.list_owned(G, alice.id)[0];
    assert_eq!(platform.voice_members(lobby), vec![alice.id]);

    // One empty observation is not enough.
    sleep(Duration::from_secs(10)).await;
    assert!(platform.exists(channel));

    sleep(Duration::from_secs(10)).await;
    assert!(!platform.exists(channel));
    assert_eq!(manager.count(G, alice.id), 0);
    assert!(manager.watchers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn externally_deleted_channels_drop_their_record() {
    let (platform, manager) = setup();
    let alice = Member::new(UserId(10), "alice");
    let channel = manager
        .create_temp(G, &alice, ChannelKind::Voice, "talk", None)
        .await
        .unwrap()
        .channel;

    platform.remove_channel_externally(channel);
    sleep(Duration::from_secs(11)).await;

    assert_eq!(manager.record_of(channel), None);
    assert_eq!(manager.count(G, alice.id), 0);
    assert_eq!(platform.deletes(), 0);
    assert!(manager.watchers().is_empty());
}
