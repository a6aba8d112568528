//! Platform event handlers.
//!
//! Voice joins into a voice hosting channel and posts in a text hosting
//! channel provision a temporary channel for the member. Voice departures
//! trigger an immediate reclamation check of the channel left behind, after
//! records of unknown kind are confirmed as voice. Each event runs in its
//! own task.

use crate::error::LifecycleError;
use crate::i18n::{self, Key};
use crate::platform::PlatformEvent;
use crate::state::ids::{ChannelId, ChannelKind, GuildId, Member};
use crate::state::managers::LifecycleManager;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawn the router that fans platform events out to handler tasks.
pub fn spawn_event_router(
    manager: Arc<LifecycleManager>,
    mut events: mpsc::Receiver<PlatformEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let manager = manager.clone();
            tokio::spawn(async move { handle_event(&manager, event).await });
        }
        debug!("Platform event stream closed");
    })
}

/// Handle one platform event to completion.
pub async fn handle_event(manager: &Arc<LifecycleManager>, event: PlatformEvent) {
    match event {
        PlatformEvent::VoiceStateUpdate {
            guild,
            member,
            before,
            after,
        } => {
            // Mute, deafen and similar updates keep the channel.
            if before == after {
                return;
            }
            // Both ends of a voice update are voice channels.
            for channel in before.iter().chain(after.iter()) {
                manager.confirm_voice(*channel);
            }
            // Departure first: reclaiming the old channel may free a quota
            // slot for the join below.
            if let Some(left) = before {
                on_voice_departure(manager, left).await;
            }
            if let Some(joined) = after {
                on_voice_join(manager, guild, &member, joined).await;
            }
        }
        PlatformEvent::MessagePosted {
            guild,
            channel,
            author,
            ..
        } => on_message(manager, guild, channel, &author).await,
    }
}

async fn on_voice_departure(manager: &LifecycleManager, channel: ChannelId) {
    if manager.reclaim_if_empty(channel).await {
        debug!(channel = %channel, "Reclaimed on departure");
    }
}

async fn on_voice_join(
    manager: &LifecycleManager,
    guild: GuildId,
    member: &Member,
    channel: ChannelId,
) {
    if member.bot {
        return;
    }
    let Some(hosting) = manager
        .hosting(guild, channel)
        .filter(|h| h.kind == ChannelKind::Voice)
    else {
        return;
    };

    let name = format!("{}'s Channel", member.display_name);
    match manager
        .create_temp(guild, member, ChannelKind::Voice, &name, hosting.temp_category_id)
        .await
    {
        Ok(created) => {
            if let Err(e) = manager
                .platform()
                .move_member(guild, member.id, created.channel)
                .await
            {
                // The channel stays; the watcher reclaims it if nobody joins.
                warn!(
                    guild = %guild,
                    user = %member.id,
                    channel = %created.channel,
                    error = %e,
                    "Failed to move member into new channel"
                );
            }
        }
        Err(e) => refuse(manager, guild, member, channel, e).await,
    }
}

async fn on_message(manager: &LifecycleManager, guild: GuildId, channel: ChannelId, author: &Member) {
    if author.bot {
        return;
    }
    let Some(hosting) = manager
        .hosting(guild, channel)
        .filter(|h| h.kind == ChannelKind::Text)
    else {
        return;
    };

    let name = format!("{}-temp", author.display_name);
    let created = match manager
        .create_temp(guild, author, ChannelKind::Text, &name, hosting.temp_category_id)
        .await
    {
        Ok(created) => created,
        Err(e) => return refuse(manager, guild, author, channel, e).await,
    };

    let platform = manager.platform();
    let lang = manager.effective_language(Some(guild), Some(author.id), Some(channel));
    let announce = i18n::tr(
        lang,
        Key::TempCreated,
        &[("channel", &platform.mention(created.channel))],
    );
    let welcome = i18n::tr(lang, Key::Welcome, &[("user", &platform.user_mention(author.id))]);

    for (target, text) in [(channel, announce), (created.channel, welcome)] {
        if let Err(e) = platform.send_message(target, &text).await {
            warn!(guild = %guild, channel = %target, error = %e, "Failed to post message");
        }
    }
    info!(guild = %guild, user = %author.id, channel = %created.channel, "Text channel opened from hosting channel");
}

/// Tell the member why no channel was created. Only quota refusals are
/// reported; platform failures are already logged by the manager.
async fn refuse(
    manager: &LifecycleManager,
    guild: GuildId,
    member: &Member,
    hosting: ChannelId,
    error: LifecycleError,
) {
    let LifecycleError::QuotaExceeded { max } = error else {
        debug!(guild = %guild, user = %member.id, error = %error, "Trigger did not create a channel");
        return;
    };
    let lang = manager.effective_language(Some(guild), Some(member.id), Some(hosting));
    let text = i18n::tr(lang, Key::AlreadyMaxTemp, &[("max", &max)]);
    if let Err(e) = manager.platform().direct_message(member.id, &text).await {
        debug!(user = %member.id, error = %e, "Quota notice not delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Lang;
    use crate::platform::MemoryPlatform;
    use crate::state::ids::UserId;
    use crate::state::managers::{LangScope, Limits};
    use crate::store::DurableStore;
    use std::time::Duration;

    const G: GuildId = GuildId(1);

    fn setup(limits: Limits) -> (Arc<MemoryPlatform>, Arc<LifecycleManager>) {
        let (platform, events) = MemoryPlatform::new();
        let platform = Arc::new(platform);
        let manager = LifecycleManager::new(platform.clone(), DurableStore::ephemeral(), limits, None);
        manager.set_lang(LangScope::Guild(G), Lang::En);
        spawn_event_router(manager.clone(), events);
        (platform, manager)
    }

    async fn eventually(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn joining_a_voice_hosting_channel_provisions_and_moves() {
        let (platform, manager) = setup(Limits::default());
        let lobby = platform.add_channel(G, ChannelKind::Voice, "lobby");
        manager.setup_hosting(G, lobby, ChannelKind::Voice, None, UserId(1));
        let alice = Member::new(UserId(10), "alice");

        platform.join_voice(G, alice.clone(), lobby).await.unwrap();
        eventually(|| manager.count(G, alice.id) == 1).await;

        let channel = manager.list_owned(G, alice.id)[0];
        assert_eq!(platform.channel(channel).unwrap().name, "alice's Channel");
        eventually(|| platform.voice_members(channel) == vec![alice.id]).await;

        // Leaving reclaims immediately, without waiting for the watcher.
        platform.leave_voice(G, alice.clone()).await;
        eventually(|| !platform.exists(channel)).await;
        assert_eq!(manager.count(G, alice.id), 0);
    }

    #[tokio::test]
    async fn posting_in_a_text_hosting_channel_opens_a_private_channel() {
        let (platform, manager) = setup(Limits::default());
        let desk = platform.add_channel(G, ChannelKind::Text, "desk");
        manager.setup_hosting(G, desk, ChannelKind::Text, None, UserId(1));
        let bob = Member::new(UserId(11), "bob");

        platform.post(G, desk, bob.clone(), "hello").await.unwrap();
        eventually(|| manager.count(G, bob.id) == 1).await;

        let channel = manager.list_owned(G, bob.id)[0];
        eventually(|| platform.messages(desk).len() == 2).await;
        assert_eq!(
            platform.messages(desk)[1],
            "Temporary channel created: #bob-temp"
        );
        assert_eq!(
            platform.messages(channel),
            vec!["Welcome <@11>! This is your temporary channel."]
        );
    }

    #[tokio::test]
    async fn quota_refusals_are_sent_privately() {
        let limits = Limits {
            max_temp_per_user: 1,
            ..Limits::default()
        };
        let (platform, manager) = setup(limits);
        let desk = platform.add_channel(G, ChannelKind::Text, "desk");
        manager.setup_hosting(G, desk, ChannelKind::Text, None, UserId(1));
        let bob = Member::new(UserId(11), "bob");

        platform.post(G, desk, bob.clone(), "one").await.unwrap();
        eventually(|| manager.count(G, bob.id) == 1).await;
        platform.post(G, desk, bob.clone(), "two").await.unwrap();
        eventually(|| !platform.direct_messages(bob.id).is_empty()).await;

        assert_eq!(
            platform.direct_messages(bob.id),
            vec!["You already have 1 active temporary channels. Close one to create a new one."]
        );
        assert_eq!(manager.count(G, bob.id), 1);
    }

    #[tokio::test]
    async fn bots_and_plain_channels_are_ignored() {
        let (platform, manager) = setup(Limits::default());
        let desk = platform.add_channel(G, ChannelKind::Text, "desk");
        let general = platform.add_channel(G, ChannelKind::Text, "general");
        manager.setup_hosting(G, desk, ChannelKind::Text, None, UserId(1));
        let mut helper = Member::new(UserId(99), "helper");
        helper.bot = true;

        handle_event(
            &manager,
            PlatformEvent::MessagePosted {
                guild: G,
                channel: desk,
                author: helper,
                content: "beep".into(),
            },
        )
        .await;
        handle_event(
            &manager,
            PlatformEvent::MessagePosted {
                guild: G,
                channel: general,
                author: Member::new(UserId(11), "bob"),
                content: "hi".into(),
            },
        )
        .await;

        assert_eq!(platform.creates(), 0);
    }
}
