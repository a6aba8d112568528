//! Language preference commands: set_lang_* and clear_lang_*.
//!
//! The user scope is open to everyone; channel and server scopes require
//! the administrator permission.

use super::core::{CommandError, CommandHandler, CommandResult, Context};
use crate::i18n::{self, Key, Lang};
use crate::state::managers::LangScope;
use async_trait::async_trait;

/// Which preference a command edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    Channel,
    Server,
}

impl Scope {
    fn usage(self) -> &'static str {
        match self {
            Self::User => "set_lang_user <en|fr|ar>",
            Self::Channel => "set_lang_channel <en|fr|ar>",
            Self::Server => "set_lang_server <en|fr|ar>",
        }
    }

    /// Check permissions and resolve the concrete scope for the invoker.
    fn resolve(self, ctx: &Context<'_>) -> Result<LangScope, CommandError> {
        match self {
            Self::User => Ok(LangScope::User(ctx.user())),
            Self::Channel => {
                ctx.require_admin()?;
                ctx.invoker
                    .channel
                    .map(LangScope::Channel)
                    .ok_or(CommandError::Usage(self.usage()))
            }
            Self::Server => {
                ctx.require_admin()?;
                Ok(LangScope::Guild(ctx.guild()))
            }
        }
    }
}

/// Handler for `set_lang_{user,channel,server} <code>`.
pub struct SetLangHandler(pub Scope);

#[async_trait]
impl CommandHandler for SetLangHandler {
    async fn handle(&self, ctx: &Context<'_>, args: &[&str]) -> CommandResult {
        let scope = self.0.resolve(ctx)?;
        let lang: Lang = args
            .first()
            .ok_or(CommandError::Usage(self.0.usage()))?
            .parse()
            .map_err(|()| CommandError::InvalidLang)?;

        ctx.manager.set_lang(scope, lang);

        // Confirm in the language now in effect.
        let effective = ctx.manager.effective_language(
            Some(ctx.guild()),
            Some(ctx.user()),
            ctx.invoker.channel,
        );
        let key = match self.0 {
            Scope::User => Key::LangSetUser,
            Scope::Channel => Key::LangSetChannel,
            Scope::Server => Key::LangSetServer,
        };
        Ok(i18n::tr(effective, key, &[("lang", &lang.native_name())]))
    }
}

/// Handler for `clear_lang_{user,channel,server}`.
pub struct ClearLangHandler(pub Scope);

#[async_trait]
impl CommandHandler for ClearLangHandler {
    async fn handle(&self, ctx: &Context<'_>, _args: &[&str]) -> CommandResult {
        let scope = self.0.resolve(ctx)?;
        ctx.manager.clear_lang(scope);
        Ok(ctx.tr(Key::LangCleared, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::super::core::Registry;
    use crate::i18n::Lang;
    use crate::platform::MemoryPlatform;
    use crate::state::ids::{ChannelId, GuildId, Invoker, Member, Permissions, UserId};
    use crate::state::managers::{LifecycleManager, Limits};
    use crate::store::DurableStore;
    use std::sync::Arc;

    fn setup() -> Arc<LifecycleManager> {
        let (platform, _) = MemoryPlatform::new();
        LifecycleManager::new(
            Arc::new(platform),
            DurableStore::ephemeral(),
            Limits::default(),
            None,
        )
    }

    fn invoker(permissions: Permissions) -> Invoker {
        Invoker {
            guild: GuildId(1),
            member: Member::new(UserId(10), "alice"),
            channel: Some(ChannelId(3)),
            permissions,
        }
    }

    #[tokio::test]
    async fn user_language_applies_to_the_confirmation() {
        let manager = setup();
        let registry = Registry::new();
        let alice = invoker(Permissions::NONE);

        let reply = registry
            .dispatch(&manager, &alice, "set_lang_user", &["en"])
            .await;
        assert_eq!(reply, "Your language preference has been set to English.");

        let reply = registry
            .dispatch(&manager, &alice, "set_lang_user", &["xx"])
            .await;
        assert_eq!(reply, "Invalid language. Choose: en, fr, ar.");

        let reply = registry.dispatch(&manager, &alice, "clear_lang_user", &[]).await;
        assert_eq!(reply, "Language preference cleared.");
        assert_eq!(
            manager.effective_language(Some(GuildId(1)), Some(UserId(10)), None),
            Lang::Fr
        );
    }

    #[tokio::test]
    async fn server_language_needs_administrator() {
        let manager = setup();
        let registry = Registry::new();

        let reply = registry
            .dispatch(&manager, &invoker(Permissions::NONE), "set_lang_server", &["ar"])
            .await;
        assert_eq!(reply, "Vous n'avez pas la permission.");

        registry
            .dispatch(&manager, &invoker(Permissions::ADMIN), "set_lang_server", &["ar"])
            .await;
        assert_eq!(
            manager.effective_language(Some(GuildId(1)), None, None),
            Lang::Ar
        );
    }
}
