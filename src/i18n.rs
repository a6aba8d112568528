//! Localized reply strings.
//!
//! Three languages; the effective language is resolved per invocation
//! (user, then channel, then guild, then [`Lang::DEFAULT`]).

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    En,
    Fr,
    Ar,
}

impl Lang {
    pub const DEFAULT: Self = Self::Fr;
    pub const ALL: [Self; 3] = [Self::En, Self::Fr, Self::Ar];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
            Self::Ar => "ar",
        }
    }

    /// Name of the language in itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Fr => "Français",
            Self::Ar => "العربية",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            "ar" => Ok(Self::Ar),
            _ => Err(()),
        }
    }
}

/// Every reply the command surface can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    SetupHostingSuccess,
    NoPermission,
    LangSetUser,
    LangSetChannel,
    LangSetServer,
    LangCleared,
    InvalidLang,
    InvalidKind,
    HostingNotFound,
    TempCreated,
    HostingRemoved,
    ListHostingEmpty,
    ListHostingTitle,
    ListTempEmpty,
    ListTempTitle,
    InviteSuccessVoice,
    InviteSuccessText,
    ChangeHostSuccess,
    NotOwner,
    KeepaliveSet,
    KeepaliveRemoved,
    KeepaliveStatus,
    KeepaliveMissing,
    KeepaliveInterval,
    NotTempOrHosting,
    UserNotConnectedVoice,
    AlreadyMaxTemp,
    CreatedTempVoice,
    CreatedTempText,
    DeletedTemp,
    DeletedAllTemp,
    NoTempToDelete,
    Welcome,
    PlatformFailure,
    Usage,
    UnknownCommand,
}

impl Key {
    fn table(self) -> [&'static str; 3] {
        // [en, fr, ar]
        match self {
            Self::SetupHostingSuccess => [
                "Hosting channel configured successfully.",
                "Canal d'hébergement configuré avec succès.",
                "تم إعداد قناة الاستضافة بنجاح.",
            ],
            Self::NoPermission => [
                "You don't have permission to do that.",
                "Vous n'avez pas la permission.",
                "ليس لديك الصلاحية للقيام بذلك.",
            ],
            Self::LangSetUser => [
                "Your language preference has been set to {lang}.",
                "Votre langue a été définie sur : {lang}.",
                "تم تعيين لغتك المفضلة إلى {lang}.",
            ],
            Self::LangSetChannel => [
                "Channel language set to: {lang}",
                "Langue du canal définie sur : {lang}",
                "تم تعيين لغة القناة إلى: {lang}",
            ],
            Self::LangSetServer => [
                "Server language set to: {lang}",
                "Langue du serveur définie sur : {lang}",
                "تم تعيين لغة الخادم إلى: {lang}",
            ],
            Self::LangCleared => [
                "Language preference cleared.",
                "Langue réinitialisée.",
                "تمت إعادة تعيين اللغة.",
            ],
            Self::InvalidLang => [
                "Invalid language. Choose: en, fr, ar.",
                "Langue invalide. Choisissez : en, fr, ar.",
                "لغة غير صالحة. اختر: en, fr, ar.",
            ],
            Self::InvalidKind => [
                "Channel type must be 'text' or 'voice'.",
                "Le type de canal doit être 'text' ou 'voice'.",
                "يجب أن يكون نوع القناة 'text' أو 'voice'.",
            ],
            Self::HostingNotFound => [
                "Hosting channel not found.",
                "Canal d'hébergement introuvable.",
                "قناة الاستضافة غير موجودة.",
            ],
            Self::TempCreated => [
                "Temporary channel created: {channel}",
                "Canal temporaire créé : {channel}",
                "تم إنشاء القناة المؤقتة: {channel}",
            ],
            Self::HostingRemoved => [
                "Hosting channel removed successfully.",
                "Canal d'hébergement supprimé avec succès.",
                "تمت إزالة قناة الاستضافة بنجاح.",
            ],
            Self::ListHostingEmpty => [
                "No hosting channels configured.",
                "Aucun canal d'hébergement configuré.",
                "لا توجد قنوات استضافة مهيأة.",
            ],
            Self::ListHostingTitle => [
                "Hosting Channels:",
                "Canaux d'hébergement :",
                "قنوات الاستضافة:",
            ],
            Self::ListTempEmpty => [
                "You have no active temporary channels.",
                "Tu n'as aucun canal temporaire actif.",
                "ليس لديك قنوات مؤقتة نشطة.",
            ],
            Self::ListTempTitle => [
                "Your temporary channels:",
                "Vos canaux temporaires :",
                "قنواتك المؤقتة:",
            ],
            Self::InviteSuccessVoice => [
                "{user} has been moved to the voice channel {channel}.",
                "{user} a été déplacé dans le salon vocal {channel}.",
                "{user} تم نقله إلى قناة الصوت {channel}.",
            ],
            Self::InviteSuccessText => [
                "{user} has been invited to the text channel {channel}.",
                "{user} a été invité dans le salon textuel {channel}.",
                "{user} تمت دعوته إلى قناة النص {channel}.",
            ],
            Self::ChangeHostSuccess => [
                "Ownership transferred to {new_host}.",
                "Propriété transférée à {new_host}.",
                "تم نقل الملكية إلى {new_host}.",
            ],
            Self::NotOwner => [
                "Only the current owner can transfer ownership.",
                "Seul le propriétaire actuel peut transférer la propriété.",
                "فقط المالك الحالي يمكنه نقل الملكية.",
            ],
            Self::KeepaliveSet => [
                "Keepalive configured for {channel} every {interval} minutes.",
                "Keepalive configuré pour {channel} toutes les {interval} minutes.",
                "تم إعداد Keepalive لـ {channel} كل {interval} دقيقة.",
            ],
            Self::KeepaliveRemoved => [
                "Keepalive configuration removed.",
                "Configuration Keepalive supprimée.",
                "تمت إزالة إعداد Keepalive.",
            ],
            Self::KeepaliveStatus => [
                "Keepalive active in {channel}, every {interval} minutes, message: {message}",
                "Keepalive actif dans {channel}, toutes les {interval} minutes, message : {message}",
                "Keepalive نشط في {channel}، كل {interval} دقيقة، الرسالة: {message}",
            ],
            Self::KeepaliveMissing => [
                "No keepalive configuration found.",
                "Aucune configuration keepalive trouvée.",
                "لا يوجد إعداد Keepalive.",
            ],
            Self::KeepaliveInterval => [
                "The interval must be at least 1 minute.",
                "L'intervalle doit être d'au moins 1 minute.",
                "يجب أن تكون الفترة دقيقة واحدة على الأقل.",
            ],
            Self::NotTempOrHosting => [
                "This channel is not a temporary or hosting channel.",
                "Ce canal n'est pas un canal temporaire ou d'hébergement.",
                "هذه القناة ليست قناة مؤقتة أو قناة استضافة.",
            ],
            Self::UserNotConnectedVoice => [
                "{user} is not connected to any voice channel.",
                "{user} n'est pas connecté à un salon vocal.",
                "{user} غير متصل بأي قناة صوتية.",
            ],
            Self::AlreadyMaxTemp => [
                "You already have {max} active temporary channels. Close one to create a new one.",
                "Tu as déjà {max} canaux temporaires actifs. Ferme-en un pour en créer un nouveau.",
                "لديك بالفعل {max} قنوات مؤقتة نشطة. أغلق واحدة لإنشاء جديدة.",
            ],
            Self::CreatedTempVoice => [
                "Created a temporary voice channel: {channel}. ({count}/{max})",
                "Canal vocal temporaire créé : {channel}. ({count}/{max})",
                "تم إنشاء قناة صوتية مؤقتة: {channel}. ({count}/{max})",
            ],
            Self::CreatedTempText => [
                "Created a temporary text channel: {channel}. ({count}/{max})",
                "Canal textuel temporaire créé : {channel}. ({count}/{max})",
                "تم إنشاء قناة نصية مؤقتة: {channel}. ({count}/{max})",
            ],
            Self::DeletedTemp => [
                "Temporary channel {channel} deleted.",
                "Canal temporaire {channel} supprimé.",
                "تم حذف القناة المؤقتة {channel}.",
            ],
            Self::DeletedAllTemp => [
                "All your temporary channels have been deleted.",
                "Tous tes salons temporaires ont été supprimés.",
                "تم حذف جميع قنواتك المؤقتة.",
            ],
            Self::NoTempToDelete => [
                "You have no temporary channel to delete.",
                "Tu n'as aucun canal temporaire à supprimer.",
                "ليس لديك قناة مؤقتة للحذف.",
            ],
            Self::Welcome => [
                "Welcome {user}! This is your temporary channel.",
                "Bienvenue {user} ! Ceci est ton canal temporaire.",
                "مرحبًا {user}! هذه قناتك المؤقتة.",
            ],
            Self::PlatformFailure => [
                "The platform refused the request, please try again later.",
                "La plateforme a refusé la requête, réessaie plus tard.",
                "رفضت المنصة الطلب، حاول مرة أخرى لاحقًا.",
            ],
            Self::Usage => [
                "Usage: {usage}",
                "Utilisation : {usage}",
                "الاستخدام: {usage}",
            ],
            Self::UnknownCommand => [
                "Unknown command: {command}",
                "Commande inconnue : {command}",
                "أمر غير معروف: {command}",
            ],
        }
    }

    /// Raw template in `lang`.
    pub fn template(self, lang: Lang) -> &'static str {
        let [en, fr, ar] = self.table();
        match lang {
            Lang::En => en,
            Lang::Fr => fr,
            Lang::Ar => ar,
        }
    }
}

/// Render `key` in `lang`, substituting `{name}` placeholders.
///
/// Unknown placeholders are left as-is.
pub fn tr(lang: Lang, key: Key, args: &[(&str, &dyn fmt::Display)]) -> String {
    let mut text = key.template(lang).to_string();
    for (name, value) in args {
        let placeholder = format!("{{{name}}}");
        if text.contains(&placeholder) {
            text = text.replace(&placeholder, &value.to_string());
        }
    }
    text
}

/// Pick the first language that is set, in user, channel, guild order.
pub fn resolve(user: Option<&str>, channel: Option<&str>, guild: Option<&str>) -> Lang {
    [user, channel, guild]
        .into_iter()
        .flatten()
        .find_map(|code| code.parse().ok())
        .unwrap_or(Lang::DEFAULT)
}
