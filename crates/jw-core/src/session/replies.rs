use crate::{
    catalog::EXPERIENCE_FILTERS,
    formatting::escape_html,
    messaging::types::ReplyMenu,
    session::machine::Reply,
};

const MENU_COLUMNS: usize = 3;

/// Render a reply into Telegram HTML plus an optional reply-keyboard menu.
pub fn render(reply: &Reply) -> (String, Option<ReplyMenu>) {
    match reply {
        Reply::Help => (
            "👇<b>Список команд</b>👇\n\n\
             <i>/follow</i> Підписатися на розсилку та отримувати нові вакансії за категоріями, які ви самі оберете\n\n\
             <i>/unfollow</i> Відписатися від розсилки за категоріями\n\n\
             <i>/myfollows</i> Ваші поточні підписки"
                .to_string(),
            None,
        ),
        Reply::CategoryMenu(names) => (
            "🎯 Оберіть категорію, за якою ви бажаєте отримувати повідомлення про нові вакансії, щойно вони з'являються на DOU"
                .to_string(),
            Some(ReplyMenu::grid(names.iter().cloned(), MENU_COLUMNS)),
        ),
        Reply::FilterMenu { category } => (
            format!("📈 <b>{}</b>: оберіть досвід", escape_html(category)),
            Some(ReplyMenu::grid(
                EXPERIENCE_FILTERS.iter().map(|f| f.label),
                MENU_COLUMNS,
            )),
        ),
        Reply::CategoryNotFound => ("🚫 Ви обрали не існуючу категорію".to_string(), None),
        Reply::FilterNotFound => ("🚫 Ви обрали не існуючий досвід".to_string(), None),
        Reply::Subscribed { category, filter } => (
            format!(
                "✅ Ви вдало підписалися на <b>{}({})</b>, щойно з'явиться нова вакансія - я одразу вас сповіщу👍",
                escape_html(category),
                escape_html(filter)
            ),
            None,
        ),
        Reply::AlreadySubscribed { category, filter } => (
            format!(
                "‼️ Ви вже підписані на <b>{}({})</b>",
                escape_html(category),
                escape_html(filter)
            ),
            None,
        ),
        Reply::SubscribeFailed => ("🚫 Не вдалося підписатися, спробуйте ще".to_string(), None),
        Reply::NoSubscriptions => (
            "🚫 Ви не підписані на жодну з категорій, скористайтеся командою <b>/follow</b>"
                .to_string(),
            None,
        ),
        Reply::LoadFailed => (
            "🚫 Не вдалося отримати ваші підписки, спробуйте ще".to_string(),
            None,
        ),
        Reply::UnsubscribeMenu(names) => (
            "👁 Оберіть категорію для відписки".to_string(),
            Some(ReplyMenu::grid(names.iter().cloned(), MENU_COLUMNS)),
        ),
        Reply::Subscriptions(entries) => {
            let list = entries
                .iter()
                .map(|(category, filter)| format!("{}({})", escape_html(category), escape_html(filter)))
                .collect::<Vec<_>>()
                .join(", ");
            (format!("✅ Ви підписані на: <b>{list}</b>"), None)
        }
        Reply::Unsubscribed { category } => (
            format!("✅ Підписка на <b>{}</b> видалена", escape_html(category)),
            None,
        ),
        Reply::NotSubscribedTo { category } => (
            format!("🚫 У вас немає підписки на: {}", escape_html(category)),
            None,
        ),
        Reply::UnsubscribeFailed => (
            "🚫 Не вдалося видалити підписку, спробуйте ще".to_string(),
            None,
        ),
        Reply::Flood => ("не спамь будь ласка😉".to_string(), None),
    }
}
