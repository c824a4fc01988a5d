//! Telegram HTML formatting for outbound notifications.

use crate::domain::NewItem;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Notification pushed to every subscriber of the item's partition.
pub fn format_notification(item: &NewItem) -> String {
    format!(
        "🔥<b>Нова вакансія</b>🔥\n\n<b>Категорія</b>: <i>{}</i> ({}) 👀\n\n➡️ {}\n{}",
        escape_html(&item.category_name),
        escape_html(&item.filter_label),
        escape_html(&item.title),
        escape_html(&item.link),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn escape_html_escapes_special_chars() {
        assert_eq!(escape_html("<a&b>\""), "&lt;a&amp;b&gt;&quot;");
    }

    #[test]
    fn notification_contains_title_link_and_partition() {
        let item = NewItem {
            title: "Senior <Rust> Engineer".to_string(),
            link: "https://jobs.dou.ua/companies/acme/vacancies/1/".to_string(),
            published_at: Utc::now(),
            category_id: "Backend".to_string(),
            category_name: "Backend".to_string(),
            filter_id: "3-5".to_string(),
            filter_label: "3-5 років".to_string(),
        };
        let html = format_notification(&item);
        assert!(html.contains("Senior &lt;Rust&gt; Engineer"));
        assert!(html.contains("https://jobs.dou.ua/companies/acme/vacancies/1/"));
        assert!(html.contains("<i>Backend</i> (3-5 років)"));
    }
}
